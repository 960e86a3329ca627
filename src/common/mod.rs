//! Foundational types shared across the crate: identifiers, containers,
//! and the error taxonomy.

pub mod containers;
pub mod error;
pub mod ident;
