//! A cycle-accurate simulator for a configurable in-order pipelined
//! processor.
//!
//! A processor is described as a directed graph of functional units
//! ([`microarch`]), each unit advertising the instruction capabilities
//! and register-access locks it supports. A program ([`program`]) is
//! compiled against an instruction-set mapping ([`isa`]) into a sequence
//! of capability-tagged instructions, and [`sim`] drives them through
//! the graph one cycle at a time, producing a per-cycle utilization
//! table or failing with a diagnosable [`common::error::SimError`].
//!
//! [`orchestrate`] wires the pieces together for the common case of
//! loading a configuration document and a program from disk and running
//! them to completion.

pub mod common;
pub mod config;
pub mod isa;
pub mod microarch;
pub mod orchestrate;
pub mod planner;
pub mod program;
pub mod reg_access;
pub mod sim;

pub use common::error::SimError;
pub use microarch::ProcessorDesc;
pub use orchestrate::{compile_program, load_config, run_from_files, simulate, LoadedProcessor};
pub use sim::UtilizationTable;
