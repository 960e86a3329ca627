//! Per-register access plan: the serial order in which instructions may
//! read from or write to one register, with adjacent reads coalesced.

use std::collections::VecDeque;

/// The kind of access an instruction makes to a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    /// A source-register read.
    Read,
    /// A destination-register write.
    Write,
}

/// A single instruction's access to a register, as planned (not yet
/// necessarily granted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    /// Whether this is a read or a write.
    pub kind: AccessType,
    /// The program index of the requesting instruction.
    pub instr: usize,
}

impl Access {
    /// Builds an access request.
    #[must_use]
    pub fn new(kind: AccessType, instr: usize) -> Self {
        Self { kind, instr }
    }
}

/// A maximal run of same-kind, jointly-granted accesses: either one or
/// more coalesced reads, or exactly one write.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Group {
    kind: AccessType,
    instrs: Vec<usize>,
}

/// The planned, ordered sequence of accesses to one register.
///
/// Reads that arrive back-to-back coalesce into a single group (none of
/// them stall one another); any write starts a fresh group and acts as a
/// barrier against the accesses before and after it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegAccessQueue {
    groups: VecDeque<Group>,
}

impl RegAccessQueue {
    /// Builds a queue directly from a flat sequence of accesses, applying
    /// the same coalescing rule [`RegAccQBuilder`] does.
    #[must_use]
    pub fn from_accesses(accesses: impl IntoIterator<Item = Access>) -> Self {
        let mut builder = RegAccQBuilder::new();
        for access in accesses {
            builder.append(access.kind, access.instr);
        }
        builder.create()
    }

    /// True iff the head group matches `kind` and contains `instr`.
    #[must_use]
    pub fn can_access(&self, kind: AccessType, instr: usize) -> bool {
        self.groups
            .front()
            .is_some_and(|g| g.kind == kind && g.instrs.contains(&instr))
    }

    /// Removes `instr` from the head group, popping the group if it
    /// becomes empty. No-op if `instr` is not at the head.
    pub fn dequeue(&mut self, instr: usize) {
        let Some(front) = self.groups.front_mut() else {
            return;
        };
        if let Some(pos) = front.instrs.iter().position(|&i| i == instr) {
            front.instrs.remove(pos);
            if front.instrs.is_empty() {
                self.groups.pop_front();
            }
        }
    }

    /// Whether every group has been drained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Flattens the queue back into its constituent accesses, in order.
    pub fn accesses(&self) -> impl Iterator<Item = Access> + '_ {
        self.groups
            .iter()
            .flat_map(|g| g.instrs.iter().map(move |&i| Access::new(g.kind, i)))
    }
}

/// Builds a [`RegAccessQueue`] by appending accesses one at a time in
/// program order, coalescing adjacent reads.
#[derive(Debug, Clone, Default)]
pub struct RegAccQBuilder {
    groups: VecDeque<Group>,
}

impl RegAccQBuilder {
    /// A builder with no accesses recorded yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an access. A read extends the trailing group if that
    /// group is also a read; a write always starts a new group.
    pub fn append(&mut self, kind: AccessType, instr: usize) {
        if kind == AccessType::Read {
            if let Some(last) = self.groups.back_mut() {
                if last.kind == AccessType::Read {
                    last.instrs.push(instr);
                    return;
                }
            }
        }
        self.groups.push_back(Group {
            kind,
            instrs: vec![instr],
        });
    }

    /// Finalizes the queue.
    #[must_use]
    pub fn create(self) -> RegAccessQueue {
        RegAccessQueue { groups: self.groups }
    }
}
