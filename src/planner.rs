//! Builds the per-register access plan from a compiled program: every
//! source read and destination write, in program order, coalesced per
//! [`RegAccessQueue`]'s rules.

use crate::program::HwInstruction;
use crate::reg_access::{AccessType, RegAccQBuilder, RegAccessQueue};
use std::collections::HashMap;

/// Register name to its planned access queue.
pub type AccessPlan = HashMap<String, RegAccessQueue>;

/// Walks `program` in order, appending a read for every source register
/// and a write for the destination register of each instruction.
#[must_use]
pub fn build_access_plan(program: &[HwInstruction]) -> AccessPlan {
    let mut builders: HashMap<String, RegAccQBuilder> = HashMap::new();
    for (i, instr) in program.iter().enumerate() {
        for src in &instr.sources {
            builders.entry(src.clone()).or_default().append(AccessType::Read, i);
        }
        builders
            .entry(instr.destination.clone())
            .or_default()
            .append(AccessType::Write, i);
    }
    builders.into_iter().map(|(reg, b)| (reg, b.create())).collect()
}
