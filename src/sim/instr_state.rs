//! Per-instruction simulation state.

use std::fmt;

/// Why an instruction did not advance this cycle, if it didn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StallState {
    /// Advanced normally; eligible to retire if at an output boundary.
    NoStall,
    /// Blocked because the unit it occupies could not free a downstream
    /// slot.
    Structural,
    /// Blocked on a register dependency the access plan hasn't cleared
    /// yet.
    Data,
}

impl fmt::Display for StallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StallState::NoStall => "NO_STALL",
            StallState::Structural => "STRUCTURAL",
            StallState::Data => "DATA",
        };
        f.write_str(s)
    }
}

/// One instruction's program index and its current stall state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrState {
    /// Index of this instruction within the program.
    pub instr: usize,
    /// Current stall state.
    pub stalled: StallState,
}

impl InstrState {
    /// A freshly-placed instruction, not stalled.
    #[must_use]
    pub fn new(instr: usize) -> Self {
        Self {
            instr,
            stalled: StallState::NoStall,
        }
    }
}

impl fmt::Display for InstrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstrState({}, {})", self.instr, self.stalled)
    }
}
