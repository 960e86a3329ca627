//! Parses and validates a raw processor description into a
//! [`ProcessorDesc`]: unit ingestion, capability canonicalization, edge
//! construction, cycle/width/lock checks, and role classification.

use crate::common::containers::IndexedSet;
use crate::common::error::{ComponentInfo, SimError};
use crate::common::ident::{Capability, IcaseStr};
use crate::config::{RawProcessor, RawUnit};
use crate::microarch::model::{LockInfo, ProcessorDesc, UnitId, UnitModel};
use crate::microarch::optimize;
use std::collections::{HashMap, HashSet};

/// A unit as tracked while the graph is being built and pruned; mutable
/// where [`UnitModel`] is not, since pruning may remove it from the graph
/// entirely.
#[derive(Debug, Clone)]
pub(crate) struct WorkingUnit {
    pub name: IcaseStr,
    pub width: usize,
    pub capabilities: Vec<Capability>,
    pub lock_info: LockInfo,
    pub mem_acl: Vec<Capability>,
}

/// The graph under construction: units plus adjacency, with `alive`
/// tracking which units survived pruning so indices stay stable.
pub(crate) struct Graph {
    pub units: Vec<WorkingUnit>,
    pub alive: Vec<bool>,
    pub successors: Vec<Vec<UnitId>>,
    pub predecessors: Vec<Vec<UnitId>>,
}

impl Graph {
    pub(crate) fn alive_ids(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, &a)| a)
            .map(|(i, _)| UnitId(i))
    }

    pub(crate) fn remove_edge(&mut self, from: UnitId, to: UnitId) {
        self.successors[from.index()].retain(|&id| id != to);
        self.predecessors[to.index()].retain(|&id| id != from);
    }

    pub(crate) fn kill(&mut self, id: UnitId) {
        self.alive[id.index()] = false;
        let succs = std::mem::take(&mut self.successors[id.index()]);
        for s in succs {
            self.predecessors[s.index()].retain(|&p| p != id);
        }
        let preds = std::mem::take(&mut self.predecessors[id.index()]);
        for p in preds {
            self.successors[p.index()].retain(|&s| s != id);
        }
    }
}

/// Parses and validates `raw` into a canonical [`ProcessorDesc`].
pub fn parse(raw: &RawProcessor) -> Result<ProcessorDesc, SimError> {
    let mut canon_caps: HashMap<String, Capability> = HashMap::new();
    let (units, name_index) = ingest_units(raw, &mut canon_caps)?;

    let mut graph = Graph {
        successors: vec![Vec::new(); units.len()],
        predecessors: vec![Vec::new(); units.len()],
        alive: vec![true; units.len()],
        units,
    };

    let mut had_original_successor = vec![false; graph.units.len()];
    build_edges(raw, &name_index, &mut graph, &mut had_original_successor)?;
    check_acyclic(&graph)?;

    optimize::prune_incompatible_edges(&mut graph);
    optimize::prune_dead_ends(&mut graph, &had_original_successor);

    check_width(&graph)?;
    check_dead_inputs(&graph)?;
    check_multi_lock(&graph)?;

    build_processor_desc(graph)
}

fn ingest_units(
    raw: &RawProcessor,
    canon_caps: &mut HashMap<String, Capability>,
) -> Result<(Vec<WorkingUnit>, HashMap<String, UnitId>), SimError> {
    let mut set: IndexedSet<WorkingUnit, String, _> = IndexedSet::new(|u: &WorkingUnit| u.name.canonical().to_string());

    for record in &raw.units {
        let width = record.width;
        if width <= 0 {
            return Err(SimError::BadWidth {
                unit: record.name.clone(),
                width,
            });
        }
        let name = IcaseStr::new(record.name.clone());
        let capabilities: Vec<Capability> = record
            .capabilities
            .iter()
            .map(|c| canonicalize(canon_caps, c))
            .collect();
        let mem_acl: Vec<Capability> = record
            .memory_access
            .iter()
            .map(|c| canonicalize(canon_caps, c))
            .collect();

        let working = WorkingUnit {
            name,
            width: usize::try_from(width).unwrap_or(1),
            capabilities,
            lock_info: LockInfo::new(record.read_lock, record.write_lock),
            mem_acl,
        };
        if let Err((existing, rejected)) = set.try_insert(working) {
            return Err(SimError::DupElem {
                old: existing.name.display_form().to_string(),
                new: rejected.name.display_form().to_string(),
            });
        }
    }

    let units: Vec<WorkingUnit> = set.iter().cloned().collect();
    let name_index: HashMap<String, UnitId> = units
        .iter()
        .enumerate()
        .map(|(i, u)| (u.name.canonical().to_string(), UnitId(i)))
        .collect();
    Ok((units, name_index))
}

/// Resolves a capability spelling against the first-seen spelling for its
/// case-folded form, warning on a second, different spelling of the same
/// fold.
fn canonicalize(canon_caps: &mut HashMap<String, Capability>, raw: &str) -> Capability {
    let folded = raw.to_lowercase();
    if let Some(existing) = canon_caps.get(&folded) {
        if existing.display_form() != raw {
            tracing::warn!(
                canonical = existing.display_form(),
                alias = raw,
                "capability spelling {raw} treated as alias of {}",
                existing.display_form()
            );
        }
        existing.clone()
    } else {
        let cap = Capability::new(raw.to_string());
        canon_caps.insert(folded, cap.clone());
        cap
    }
}

fn build_edges(
    raw: &RawProcessor,
    name_index: &HashMap<String, UnitId>,
    graph: &mut Graph,
    had_original_successor: &mut [bool],
) -> Result<(), SimError> {
    let mut seen_edges: HashSet<(UnitId, UnitId)> = HashSet::new();
    for edge in &raw.data_path {
        if edge.len() != 2 {
            return Err(SimError::BadEdge { edge: edge.clone() });
        }
        let from = resolve(name_index, &edge[0])?;
        let to = resolve(name_index, &edge[1])?;
        if !seen_edges.insert((from, to)) {
            tracing::warn!(from = %edge[0], to = %edge[1], "duplicate edge ignored");
            continue;
        }
        graph.successors[from.index()].push(to);
        graph.predecessors[to.index()].push(from);
        had_original_successor[from.index()] = true;
    }
    Ok(())
}

fn resolve(name_index: &HashMap<String, UnitId>, name: &str) -> Result<UnitId, SimError> {
    name_index
        .get(&name.to_lowercase())
        .copied()
        .ok_or_else(|| SimError::UndefElem {
            element: name.to_string(),
        })
}

/// Kahn's algorithm; returns a source-first topological order of the
/// alive units, or `Err` naming a unit still blocked by a cycle.
pub(crate) fn topological_order(graph: &Graph) -> Result<Vec<UnitId>, SimError> {
    let mut indegree: HashMap<UnitId, usize> = graph
        .alive_ids()
        .map(|id| {
            let count = graph.predecessors[id.index()]
                .iter()
                .filter(|&&p| graph.alive[p.index()])
                .count();
            (id, count)
        })
        .collect();

    let mut queue: Vec<UnitId> = indegree
        .iter()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();
    queue.sort_by_key(|id| graph.units[id.index()].name.canonical().to_string());

    let mut order = Vec::with_capacity(indegree.len());
    while !queue.is_empty() {
        let id = queue.remove(0);
        order.push(id);
        for &succ in &graph.successors[id.index()] {
            if !graph.alive[succ.index()] {
                continue;
            }
            let entry = indegree.get_mut(&succ).expect("successor tracked");
            *entry -= 1;
            if *entry == 0 {
                queue.push(succ);
            }
        }
        queue.sort_by_key(|id| graph.units[id.index()].name.canonical().to_string());
    }

    if order.len() != indegree.len() {
        let stuck: Vec<String> = indegree
            .keys()
            .filter(|id| !order.contains(id))
            .map(|id| graph.units[id.index()].name.display_form().to_string())
            .collect();
        return Err(SimError::Cycle { units: stuck });
    }
    Ok(order)
}

fn check_acyclic(graph: &Graph) -> Result<(), SimError> {
    topological_order(graph).map(|_| ())
}

/// `capacity(u, c)` — the most instructions of capability `c` that can
/// drain through `u` and its downstream successors at once: `u`'s own
/// width if `u` is a sink for `c`, otherwise the narrower of `u`'s own
/// width and the summed downstream capacity.
fn capacity(graph: &Graph, id: UnitId, cap: &Capability, memo: &mut HashMap<(UnitId, String), usize>) -> usize {
    let key = (id, cap.canonical().to_string());
    if let Some(&v) = memo.get(&key) {
        return v;
    }
    let unit = &graph.units[id.index()];
    if !unit.capabilities.iter().any(|c| c == cap) {
        memo.insert(key, 0);
        return 0;
    }
    let downstream: Vec<UnitId> = graph.successors[id.index()]
        .iter()
        .copied()
        .filter(|&s| graph.units[s.index()].capabilities.iter().any(|c| c == cap))
        .collect();
    let value = if downstream.is_empty() {
        unit.width
    } else {
        let sum: usize = downstream.iter().map(|&s| capacity(graph, s, cap, memo)).sum();
        unit.width.min(sum)
    };
    memo.insert(key, value);
    value
}

fn check_width(graph: &Graph) -> Result<(), SimError> {
    let mut memo = HashMap::new();
    for id in graph.alive_ids() {
        if !graph.predecessors[id.index()].is_empty() {
            continue; // not an in_port
        }
        let unit = &graph.units[id.index()];
        for cap in &unit.capabilities {
            if capacity(graph, id, cap, &mut memo) < unit.width {
                return Err(SimError::BlockedCap {
                    capability_info: ComponentInfo::new(cap),
                    port_info: ComponentInfo::new(&unit.name),
                });
            }
        }
    }
    Ok(())
}

fn check_dead_inputs(graph: &Graph) -> Result<(), SimError> {
    for id in graph.alive_ids() {
        if !graph.predecessors[id.index()].is_empty() || graph.successors[id.index()].is_empty() {
            // Either not an in_port, or an in_out_port that is trivially
            // its own sink.
            continue;
        }
        let unit = &graph.units[id.index()];
        let reachable = reachable_from(graph, id);
        let served = unit.capabilities.iter().any(|cap| {
            reachable
                .iter()
                .any(|&r| r != id && graph.units[r.index()].capabilities.iter().any(|c| c == cap))
        });
        if !served {
            return Err(SimError::DeadInput {
                port: unit.name.display_form().to_string(),
            });
        }
    }
    Ok(())
}

fn reachable_from(graph: &Graph, start: UnitId) -> HashSet<UnitId> {
    let mut seen = HashSet::new();
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        for &succ in &graph.successors[id.index()] {
            if graph.alive[succ.index()] {
                stack.push(succ);
            }
        }
    }
    seen
}

fn check_multi_lock(graph: &Graph) -> Result<(), SimError> {
    let sources: Vec<UnitId> = graph.alive_ids().filter(|&id| graph.predecessors[id.index()].is_empty()).collect();
    for &start in &sources {
        let mut path = Vec::new();
        let mut read_locks = 0usize;
        let mut write_locks = 0usize;
        walk_lock_paths(graph, start, &mut path, &mut read_locks, &mut write_locks)?;
    }
    Ok(())
}

fn walk_lock_paths(
    graph: &Graph,
    id: UnitId,
    path: &mut Vec<UnitId>,
    read_locks: &mut usize,
    write_locks: &mut usize,
) -> Result<(), SimError> {
    let unit = &graph.units[id.index()];
    let added_read = unit.lock_info.read_lock;
    let added_write = unit.lock_info.write_lock;
    if added_read {
        *read_locks += 1;
    }
    if added_write {
        *write_locks += 1;
    }
    path.push(id);

    if *read_locks > 1 || *write_locks > 1 {
        let segment = path.iter().map(|&u| graph.units[u.index()].name.display_form().to_string()).collect();
        return Err(SimError::MultiLock { segment });
    }

    for &succ in &graph.successors[id.index()] {
        if graph.alive[succ.index()] {
            walk_lock_paths(graph, succ, path, read_locks, write_locks)?;
        }
    }

    path.pop();
    if added_read {
        *read_locks -= 1;
    }
    if added_write {
        *write_locks -= 1;
    }
    Ok(())
}

fn build_processor_desc(graph: Graph) -> Result<ProcessorDesc, SimError> {
    let alive_count = graph.alive.iter().filter(|&&a| a).count();
    if alive_count == 0 {
        return Err(SimError::EmptyProc);
    }

    // Remap to dense ids so removed units don't leave gaps.
    let mut remap: HashMap<UnitId, UnitId> = HashMap::new();
    for (new_idx, old_id) in graph.alive_ids().enumerate() {
        remap.insert(old_id, UnitId(new_idx));
    }

    let mut units = Vec::with_capacity(alive_count);
    let mut predecessors = vec![Vec::new(); alive_count];
    let mut successors = vec![Vec::new(); alive_count];

    for old_id in graph.alive_ids() {
        let new_id = remap[&old_id];
        let w = &graph.units[old_id.index()];
        units.push(UnitModel::new(
            new_id,
            w.name.clone(),
            w.width,
            w.capabilities.clone(),
            w.lock_info,
            w.mem_acl.clone(),
        ));
        predecessors[new_id.index()] = graph.predecessors[old_id.index()].iter().map(|p| remap[p]).collect();
        successors[new_id.index()] = graph.successors[old_id.index()].iter().map(|s| remap[s]).collect();
    }

    let mut in_ports = Vec::new();
    let mut out_ports = Vec::new();
    let mut in_out_ports = Vec::new();
    let mut internal_mask = vec![false; alive_count];

    for (idx, _unit) in units.iter().enumerate() {
        let id = UnitId(idx);
        let has_pred = !predecessors[idx].is_empty();
        let has_succ = !successors[idx].is_empty();
        match (has_pred, has_succ) {
            (false, true) => in_ports.push(id),
            (true, false) => out_ports.push(id),
            (false, false) => in_out_ports.push(id),
            (true, true) => internal_mask[idx] = true,
        }
    }

    // Topological order over the dense graph, to derive the post-order
    // layout for internal units.
    let dense_graph = Graph {
        units: units
            .iter()
            .map(|u| WorkingUnit {
                name: u.name().clone(),
                width: u.width(),
                capabilities: u.capabilities().to_vec(),
                lock_info: u.lock_info(),
                mem_acl: Vec::new(),
            })
            .collect(),
        alive: vec![true; alive_count],
        successors: successors.clone(),
        predecessors: predecessors.clone(),
    };
    let topo = topological_order(&dense_graph)?;

    let internal_units: Vec<UnitId> = topo.into_iter().rev().filter(|id| internal_mask[id.index()]).collect();

    in_ports.sort_by_key(|id| units[id.index()].name().canonical().to_string());
    out_ports.sort_by_key(|id| units[id.index()].name().canonical().to_string());
    in_out_ports.sort_by_key(|id| units[id.index()].name().canonical().to_string());

    Ok(ProcessorDesc::new(
        units,
        predecessors,
        successors,
        in_ports,
        out_ports,
        in_out_ports,
        internal_units,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawUnit;

    fn unit(name: &str, width: i64, caps: &[&str], rl: bool, wl: bool) -> RawUnit {
        RawUnit {
            name: name.to_string(),
            width,
            capabilities: caps.iter().map(|s| (*s).to_string()).collect(),
            read_lock: rl,
            write_lock: wl,
            memory_access: Vec::new(),
        }
    }

    fn edge(a: &str, b: &str) -> Vec<String> {
        vec![a.to_string(), b.to_string()]
    }

    #[test]
    fn single_unit_processor_becomes_in_out_port() {
        let raw = RawProcessor {
            units: vec![unit("fullSys", 1, &["ALU"], true, true)],
            data_path: vec![],
        };
        let desc = parse(&raw).unwrap();
        assert_eq!(desc.in_out_ports().len(), 1);
        assert!(desc.in_ports().is_empty());
        assert!(desc.out_ports().is_empty());
    }

    #[test]
    fn bad_width_is_rejected() {
        let raw = RawProcessor {
            units: vec![unit("u", 0, &["ALU"], false, false)],
            data_path: vec![],
        };
        assert!(matches!(parse(&raw), Err(SimError::BadWidth { .. })));
    }

    #[test]
    fn duplicate_name_case_insensitive_is_rejected() {
        let raw = RawProcessor {
            units: vec![unit("Input", 1, &["ALU"], false, false), unit("input", 1, &["ALU"], false, false)],
            data_path: vec![],
        };
        assert!(matches!(parse(&raw), Err(SimError::DupElem { .. })));
    }

    #[test]
    fn undefined_edge_endpoint_is_rejected() {
        let raw = RawProcessor {
            units: vec![unit("u", 1, &["ALU"], false, false)],
            data_path: vec![edge("u", "ghost")],
        };
        assert!(matches!(parse(&raw), Err(SimError::UndefElem { .. })));
    }

    #[test]
    fn two_unit_pipeline_splits_into_in_and_out_ports() {
        let raw = RawProcessor {
            units: vec![unit("input", 1, &["ALU"], true, false), unit("output", 1, &["ALU"], false, true)],
            data_path: vec![edge("input", "output")],
        };
        let desc = parse(&raw).unwrap();
        assert_eq!(desc.in_ports().len(), 1);
        assert_eq!(desc.out_ports().len(), 1);
        assert!(desc.internal_units().is_empty());
    }

    #[test]
    fn cycle_is_rejected() {
        let raw = RawProcessor {
            units: vec![unit("a", 1, &["ALU"], false, false), unit("b", 1, &["ALU"], false, false)],
            data_path: vec![edge("a", "b"), edge("b", "a")],
        };
        assert!(matches!(parse(&raw), Err(SimError::Cycle { .. })));
    }

    #[test]
    fn multi_lock_path_is_rejected() {
        let raw = RawProcessor {
            units: vec![
                unit("input", 1, &["ALU"], true, false),
                unit("mid", 1, &["ALU"], true, false),
                unit("output", 1, &["ALU"], false, true),
            ],
            data_path: vec![edge("input", "mid"), edge("mid", "output")],
        };
        assert!(matches!(parse(&raw), Err(SimError::MultiLock { .. })));
    }

    #[test]
    fn internal_units_are_in_post_order() {
        let raw = RawProcessor {
            units: vec![
                unit("input", 1, &["ALU"], true, false),
                unit("mid", 1, &["ALU"], false, false),
                unit("output", 1, &["ALU"], false, true),
            ],
            data_path: vec![edge("input", "mid"), edge("mid", "output")],
        };
        let desc = parse(&raw).unwrap();
        assert_eq!(desc.internal_units().len(), 1);
        let mid = desc.internal_units()[0];
        assert_eq!(desc.unit(mid).name().display_form(), "mid");
    }
}
