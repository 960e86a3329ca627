//! The utilization table: one [`BagValDict`] entry per simulated cycle.

use crate::common::containers::BagValDict;
use crate::microarch::model::{ProcessorDesc, UnitId};
use crate::sim::instr_state::InstrState;
use std::collections::BTreeMap;

/// The instructions occupying every unit at the end of one cycle.
pub type CycleUtil = BagValDict<UnitId, InstrState>;

/// The accumulated per-cycle utilization record for one simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtilizationTable(Vec<CycleUtil>);

impl UtilizationTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next cycle's snapshot.
    pub fn push(&mut self, cycle: CycleUtil) {
        self.0.push(cycle);
    }

    /// The most recently recorded cycle, if any.
    #[must_use]
    pub fn last(&self) -> Option<&CycleUtil> {
        self.0.last()
    }

    /// Number of recorded cycles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no cycle has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates recorded cycles in order.
    pub fn iter(&self) -> impl Iterator<Item = &CycleUtil> {
        self.0.iter()
    }

    /// Renders one cycle's entry keyed by display-form unit name, for
    /// output formatting. Units with no occupants are omitted.
    #[must_use]
    pub fn display_cycle(&self, index: usize, processor: &ProcessorDesc) -> BTreeMap<String, Vec<InstrState>> {
        let mut out = BTreeMap::new();
        if let Some(cycle) = self.0.get(index) {
            for (&unit_id, instrs) in cycle.items() {
                out.insert(processor.unit(unit_id).name().display_form().to_string(), instrs.to_vec());
            }
        }
        out
    }
}
