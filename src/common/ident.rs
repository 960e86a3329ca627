//! Case-insensitive identifiers.
//!
//! Unit names and capability names are compared and hashed on a
//! case-folded canonical form, but every diagnostic (warnings, error
//! messages) reports the spelling the user actually wrote. [`IcaseStr`]
//! carries both.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A string compared case-insensitively, with the original spelling kept
/// for display.
///
/// Two `IcaseStr`s are equal, hash identically, and order the same
/// whenever their lowercase forms match, regardless of original casing.
#[derive(Debug, Clone)]
pub struct IcaseStr {
    canonical: String,
    display: String,
}

impl IcaseStr {
    /// Builds an identifier from its as-written spelling.
    pub fn new(original: impl Into<String>) -> Self {
        let display = original.into();
        let canonical = display.to_lowercase();
        Self { canonical, display }
    }

    /// The case-folded form used for comparisons.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The spelling as originally supplied, for diagnostics.
    #[must_use]
    pub fn display_form(&self) -> &str {
        &self.display
    }
}

impl fmt::Display for IcaseStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl PartialEq for IcaseStr {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for IcaseStr {}

impl Hash for IcaseStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for IcaseStr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IcaseStr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl From<&str> for IcaseStr {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for IcaseStr {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A named class of operation a unit can perform, or an instruction
/// requires. Identical in representation to [`IcaseStr`]; kept as a
/// distinct type alias so call sites read in terms of the domain concept.
pub type Capability = IcaseStr;
