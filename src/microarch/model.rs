//! The validated processor graph: unit identity, capability/lock
//! attributes, and the four structural roles a unit may play.

use crate::common::ident::Capability;
use crate::common::ident::IcaseStr;
use crate::config::{RawProcessor, RawUnit};

/// A stable handle to a unit within one [`ProcessorDesc`]. Cheap to copy
/// and to use as a map/vec index, unlike carrying the unit's name or a
/// reference around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub usize);

impl UnitId {
    /// The raw index into [`ProcessorDesc`]'s unit table.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A unit's register-access locking discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockInfo {
    /// Whether the unit gates source-register reads through the access
    /// plan.
    pub read_lock: bool,
    /// Whether the unit gates destination-register writes through the
    /// access plan.
    pub write_lock: bool,
}

impl LockInfo {
    /// Convenience constructor.
    #[must_use]
    pub fn new(read_lock: bool, write_lock: bool) -> Self {
        Self { read_lock, write_lock }
    }

    /// Whether either lock is set.
    #[must_use]
    pub fn any(self) -> bool {
        self.read_lock || self.write_lock
    }
}

/// A processing unit's static description.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitModel {
    id: UnitId,
    name: IcaseStr,
    width: usize,
    capabilities: Vec<Capability>,
    lock_info: LockInfo,
    mem_acl: Vec<Capability>,
}

impl UnitModel {
    /// Builds a unit model. `width` must be positive and `mem_acl` must
    /// be a subset of `capabilities` — both are enforced by the parser
    /// before this constructor is called, not re-checked here.
    #[must_use]
    pub fn new(
        id: UnitId,
        name: IcaseStr,
        width: usize,
        capabilities: Vec<Capability>,
        lock_info: LockInfo,
        mem_acl: Vec<Capability>,
    ) -> Self {
        Self {
            id,
            name,
            width,
            capabilities,
            lock_info,
            mem_acl,
        }
    }

    /// This unit's identity.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// The unit's case-insensitive name.
    #[must_use]
    pub fn name(&self) -> &IcaseStr {
        &self.name
    }

    /// Maximum number of instructions this unit may hold at once.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// The capabilities this unit supports.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Whether this unit supports `cap`.
    #[must_use]
    pub fn supports(&self, cap: &Capability) -> bool {
        self.capabilities.iter().any(|c| c == cap)
    }

    /// The unit's register-locking discipline.
    #[must_use]
    pub fn lock_info(&self) -> LockInfo {
        self.lock_info
    }

    /// Whether handling `cap` on this unit requires memory access.
    #[must_use]
    pub fn requires_mem(&self, cap: &Capability) -> bool {
        self.mem_acl.iter().any(|c| c == cap)
    }

    /// Whether this unit ever requires memory access, for any capability.
    #[must_use]
    pub fn has_mem_access(&self) -> bool {
        !self.mem_acl.is_empty()
    }
}

/// A validated processor: every unit, its predecessor/successor edges,
/// and the four structural roles derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorDesc {
    units: Vec<UnitModel>,
    predecessors: Vec<Vec<UnitId>>,
    successors: Vec<Vec<UnitId>>,
    in_ports: Vec<UnitId>,
    out_ports: Vec<UnitId>,
    in_out_ports: Vec<UnitId>,
    internal_units: Vec<UnitId>,
}

impl ProcessorDesc {
    /// Assembles a processor from its unit table, edge lists (indexed in
    /// parallel with `units`), and pre-classified roles. Called only by
    /// the parser, which has already established every invariant in the
    /// data model.
    #[must_use]
    pub fn new(
        units: Vec<UnitModel>,
        predecessors: Vec<Vec<UnitId>>,
        successors: Vec<Vec<UnitId>>,
        in_ports: Vec<UnitId>,
        out_ports: Vec<UnitId>,
        in_out_ports: Vec<UnitId>,
        internal_units: Vec<UnitId>,
    ) -> Self {
        Self {
            units,
            predecessors,
            successors,
            in_ports,
            out_ports,
            in_out_ports,
            internal_units,
        }
    }

    /// The unit identified by `id`.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> &UnitModel {
        &self.units[id.index()]
    }

    /// All units, in id order.
    #[must_use]
    pub fn units(&self) -> &[UnitModel] {
        &self.units
    }

    /// `id`'s direct predecessors.
    #[must_use]
    pub fn predecessors(&self, id: UnitId) -> &[UnitId] {
        &self.predecessors[id.index()]
    }

    /// `id`'s direct successors.
    #[must_use]
    pub fn successors(&self, id: UnitId) -> &[UnitId] {
        &self.successors[id.index()]
    }

    /// Units with no predecessors that aren't also terminals.
    #[must_use]
    pub fn in_ports(&self) -> &[UnitId] {
        &self.in_ports
    }

    /// Units with at least one predecessor and no successor.
    #[must_use]
    pub fn out_ports(&self) -> &[UnitId] {
        &self.out_ports
    }

    /// Units that are simultaneously a source and a sink.
    #[must_use]
    pub fn in_out_ports(&self) -> &[UnitId] {
        &self.in_out_ports
    }

    /// Units with both predecessors and successors, in topological
    /// post-order (every unit before its predecessors).
    #[must_use]
    pub fn internal_units(&self) -> &[UnitId] {
        &self.internal_units
    }

    /// Finds a unit by case-insensitive name.
    #[must_use]
    pub fn find_by_name(&self, name: &IcaseStr) -> Option<UnitId> {
        self.units.iter().find(|u| u.name() == name).map(UnitModel::id)
    }

    /// Output-boundary units: `in_out_ports` plus `out_ports`, the set
    /// Phase 1 flushes and Phase 5 counts retirements over.
    pub fn output_boundary(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.in_out_ports.iter().copied().chain(self.out_ports.iter().copied())
    }

    /// The simulation-order unit sequence: `out_ports` then
    /// `internal_units`, per the post-order layout the parser produced.
    pub fn forward_flight_order(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.out_ports.iter().copied().chain(self.internal_units.iter().copied())
    }

    /// Renders this validated processor back into the raw record the
    /// parser reads, for round-tripping through a config file. Edges are
    /// emitted from `successors` in unit-id order, so re-parsing the
    /// result and re-validating reproduces the same `ProcessorDesc` (up
    /// to whatever this processor's own construction already pruned).
    #[must_use]
    pub fn to_raw_processor(&self) -> RawProcessor {
        let units = self
            .units
            .iter()
            .map(|u| RawUnit {
                name: u.name.display_form().to_string(),
                width: i64::try_from(u.width).unwrap_or(i64::MAX),
                capabilities: u.capabilities.iter().map(|c| c.display_form().to_string()).collect(),
                read_lock: u.lock_info.read_lock,
                write_lock: u.lock_info.write_lock,
                memory_access: u.mem_acl.iter().map(|c| c.display_form().to_string()).collect(),
            })
            .collect();

        let mut data_path = Vec::new();
        for (from_idx, targets) in self.successors.iter().enumerate() {
            let from_name = self.units[from_idx].name.display_form();
            for &to in targets {
                data_path.push(vec![from_name.to_string(), self.units[to.index()].name.display_form().to_string()]);
            }
        }

        RawProcessor { units, data_path }
    }
}
