//! Graph optimization: prunes edges between capability-incompatible
//! units and units left as dead ends by that pruning, warning for every
//! removal. Never raises an error — optimization only discards structure
//! that validation would otherwise have to reject.

use crate::microarch::parser::Graph;
use crate::microarch::model::UnitId;

/// Removes edges whose endpoints share no capability — an instruction
/// that enters one end could never be accepted at the other.
pub(crate) fn prune_incompatible_edges(graph: &mut Graph) {
    let alive_ids: Vec<UnitId> = graph.alive_ids().collect();
    for &from in &alive_ids {
        let targets: Vec<UnitId> = graph.successors[from.index()].clone();
        for to in targets {
            let shares_capability = graph.units[from.index()]
                .capabilities
                .iter()
                .any(|c| graph.units[to.index()].capabilities.iter().any(|d| d == c));
            if !shares_capability {
                tracing::warn!(
                    from = %graph.units[from.index()].name,
                    to = %graph.units[to.index()].name,
                    "removing edge between capability-incompatible units"
                );
                graph.remove_edge(from, to);
            }
        }
    }
}

/// Iteratively removes units with no capabilities, and units that lost
/// every outgoing edge during [`prune_incompatible_edges`] despite having
/// been declared with one (a path cut off before reaching its output).
pub(crate) fn prune_dead_ends(graph: &mut Graph, had_original_successor: &[bool]) {
    loop {
        let mut changed = false;
        let candidates: Vec<UnitId> = graph.alive_ids().collect();
        for id in candidates {
            if graph.units[id.index()].capabilities.is_empty() {
                tracing::warn!(unit = %graph.units[id.index()].name, "removing unit with no capabilities");
                graph.kill(id);
                changed = true;
                continue;
            }
            let became_dead_end = had_original_successor[id.index()]
                && graph.successors[id.index()].is_empty()
                && !graph.predecessors[id.index()].is_empty();
            if became_dead_end {
                tracing::warn!(unit = %graph.units[id.index()].name, "removing unit cut off from its output");
                graph.kill(id);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}
