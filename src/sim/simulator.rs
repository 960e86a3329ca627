//! The per-cycle state machine: forward flight, hazard marking, and
//! full-stall detection.

use crate::common::error::SimError;
use crate::microarch::model::{ProcessorDesc, UnitId};
use crate::planner::AccessPlan;
use crate::program::HwInstruction;
use crate::reg_access::AccessType;
use crate::sim::instr_state::{InstrState, StallState};
use crate::sim::util_table::{CycleUtil, UtilizationTable};
use std::collections::{HashMap, HashSet};

/// Drives a validated processor through a compiled program, producing
/// the utilization table or a [`SimError::Stall`].
#[derive(Debug)]
pub struct Simulator<'a> {
    processor: &'a ProcessorDesc,
    program: &'a [HwInstruction],
    acc_queues: AccessPlan,
    util_tbl: UtilizationTable,
    entered: usize,
    exited: usize,
}

impl<'a> Simulator<'a> {
    /// Builds a simulator for `program` against `processor`, with
    /// `acc_queues` as the register access plan (component J's output).
    #[must_use]
    pub fn new(processor: &'a ProcessorDesc, program: &'a [HwInstruction], acc_queues: AccessPlan) -> Self {
        Self {
            processor,
            program,
            acc_queues,
            util_tbl: UtilizationTable::new(),
            entered: 0,
            exited: 0,
        }
    }

    /// Runs until every instruction has retired, or a cycle makes no
    /// progress.
    pub fn run(mut self) -> Result<UtilizationTable, SimError> {
        while self.entered < self.program.len() || self.entered > self.exited {
            self.run_cycle()?;
        }
        Ok(self.util_tbl)
    }

    fn run_cycle(&mut self) -> Result<(), SimError> {
        let old_util = self.util_tbl.last().cloned().unwrap_or_default();
        let mut cp_util = old_util.clone();
        let mut mem_busy = false;

        self.flush_outputs(&mut cp_util);
        self.forward_flight(&mut cp_util, &mut mem_busy);
        self.fetch_inputs(&mut cp_util, &mut mem_busy);
        self.mark_hazards(&old_util, &mut cp_util);

        if cp_util == old_util {
            return Err(SimError::Stall {
                processor_state: self.util_tbl.clone(),
            });
        }

        let retired: usize = self
            .processor
            .output_boundary()
            .map(|uid| cp_util.get(&uid).iter().filter(|s| s.stalled == StallState::NoStall).count())
            .sum();
        self.exited += retired;
        self.util_tbl.push(cp_util);
        Ok(())
    }

    /// Phase 1 — remove every retired (`NO_STALL`) instruction from
    /// output-boundary units; stalled ones remain.
    fn flush_outputs(&self, cp_util: &mut CycleUtil) {
        for uid in self.processor.output_boundary() {
            cp_util.get_mut_or_default(uid).retain(|s| s.stalled != StallState::NoStall);
        }
    }

    /// Phase 2 — move eligible instructions from each unit's
    /// predecessors into it, in the post-order the parser established.
    fn forward_flight(&self, cp_util: &mut CycleUtil, mem_busy: &mut bool) {
        for u in self.processor.forward_flight_order() {
            let unit = self.processor.unit(u);
            let mut candidates: Vec<(UnitId, usize, InstrState)> = Vec::new();
            for &pred in self.processor.predecessors(u) {
                for (pos, state) in cp_util.get(&pred).iter().enumerate() {
                    if state.stalled == StallState::Data {
                        continue;
                    }
                    let instr = &self.program[state.instr];
                    if unit.supports(&instr.category) {
                        candidates.push((pred, pos, *state));
                    }
                }
            }
            candidates.sort_by(|a, b| {
                a.2.instr
                    .cmp(&b.2.instr)
                    .then_with(|| self.processor.unit(a.0).name().cmp(self.processor.unit(b.0).name()))
                    .then_with(|| a.1.cmp(&b.1))
            });

            let space = unit.width().saturating_sub(cp_util.get(&u).len());
            let mut moved: Vec<(UnitId, usize)> = Vec::new();
            let mut accepted = 0usize;
            for (pred, pos, mut state) in candidates {
                if accepted >= space {
                    break;
                }
                let instr = &self.program[state.instr];
                let needs_mem = unit.requires_mem(&instr.category) || self.processor.unit(pred).requires_mem(&instr.category);
                if needs_mem && *mem_busy {
                    continue;
                }
                state.stalled = StallState::NoStall;
                cp_util.push(u, state);
                moved.push((pred, pos));
                accepted += 1;
                if needs_mem {
                    *mem_busy = true;
                }
            }

            // Remove moved entries from their original hosts, highest
            // index first so earlier removals don't shift later ones.
            moved.sort_by(|a, b| b.1.cmp(&a.1));
            for (pred, pos) in moved {
                cp_util.remove_at(&pred, pos);
            }
        }
    }

    /// Phase 3 — admit new program instructions at input-capable units,
    /// in program order, stopping at the first unaccepted instruction.
    fn fetch_inputs(&mut self, cp_util: &mut CycleUtil, mem_busy: &mut bool) {
        let mut cap_to_units: HashMap<String, Vec<UnitId>> = HashMap::new();
        for &uid in self.processor.in_ports().iter().chain(self.processor.in_out_ports()) {
            let unit = self.processor.unit(uid);
            for cap in unit.capabilities() {
                cap_to_units.entry(cap.canonical().to_string()).or_default().push(uid);
            }
        }
        for units in cap_to_units.values_mut() {
            units.sort_by_key(|id| self.processor.unit(*id).name().canonical().to_string());
        }

        while self.entered < self.program.len() {
            let i = self.entered;
            let category = &self.program[i].category;
            let Some(acceptors) = cap_to_units.get(category.canonical()) else {
                break;
            };
            let mut accepted = false;
            for &acceptor in acceptors {
                let unit = self.processor.unit(acceptor);
                let free = unit.width().saturating_sub(cp_util.get(&acceptor).len());
                if free == 0 {
                    continue;
                }
                let needs_mem = unit.requires_mem(category);
                if needs_mem && *mem_busy {
                    continue;
                }
                cp_util.push(acceptor, InstrState::new(i));
                self.entered += 1;
                if needs_mem {
                    *mem_busy = true;
                }
                accepted = true;
                break;
            }
            if !accepted {
                break;
            }
        }
    }

    /// Phase 4 — mark structural/data stalls for every occupied unit,
    /// then apply the access-plan dequeues those checks produced.
    fn mark_hazards(&mut self, old_util: &CycleUtil, cp_util: &mut CycleUtil) {
        let unit_ids: Vec<UnitId> = cp_util.items().map(|(&id, _)| id).collect();
        let mut dequeues: Vec<(String, usize)> = Vec::new();

        for uid in unit_ids {
            let not_data_before: HashSet<usize> = old_util
                .get(&uid)
                .iter()
                .filter(|s| s.stalled != StallState::Data)
                .map(|s| s.instr)
                .collect();
            let lock = self.processor.unit(uid).lock_info();
            let list = cp_util.get_mut_or_default(uid);
            for state in list.iter_mut() {
                if not_data_before.contains(&state.instr) {
                    state.stalled = StallState::Structural;
                    continue;
                }
                let instr = &self.program[state.instr];
                let mut ok = true;
                if lock.read_lock {
                    for src in &instr.sources {
                        let ready = self
                            .acc_queues
                            .get(src)
                            .is_some_and(|q| q.can_access(AccessType::Read, state.instr));
                        if !ready {
                            ok = false;
                        }
                    }
                }
                if lock.write_lock {
                    let ready = self
                        .acc_queues
                        .get(&instr.destination)
                        .is_some_and(|q| q.can_access(AccessType::Write, state.instr));
                    if !ready {
                        ok = false;
                    }
                }
                if ok {
                    state.stalled = StallState::NoStall;
                    if lock.read_lock {
                        for src in &instr.sources {
                            dequeues.push((src.clone(), state.instr));
                        }
                    }
                    if lock.write_lock {
                        dequeues.push((instr.destination.clone(), state.instr));
                    }
                } else {
                    state.stalled = StallState::Data;
                }
            }
        }

        for (reg, instr) in dequeues {
            if let Some(queue) = self.acc_queues.get_mut(&reg) {
                queue.dequeue(instr);
            }
        }
    }
}
