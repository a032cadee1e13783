//! Pure graph algorithms over a [`GraphSpec`]: cycle detection, topological
//! ordering, and execution waves.
//!
//! Nothing here touches run state or I/O; the runner drives execution using
//! these as a starting point plus the live [`RunState`](crate::domain::models::run_state::RunState).

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::graph::GraphSpec;

/// Kahn's algorithm: a topological order of node ids, or `CycleDetected`
/// naming the ids left unresolved when no more nodes have zero in-degree.
pub fn topological_order(graph: &GraphSpec) -> DomainResult<Vec<Uuid>> {
    let mut in_degree: BTreeMap<Uuid, usize> = graph.nodes.iter().map(|n| (n.id, 0)).collect();
    let mut dependents: BTreeMap<Uuid, Vec<Uuid>> = BTreeMap::new();

    for node in &graph.nodes {
        for dep in &node.dependencies {
            *in_degree.get_mut(&node.id).expect("node id present by construction") += 1;
            dependents.entry(*dep).or_default().push(node.id);
        }
    }

    // Stable order for nodes that become ready simultaneously.
    let mut initial: Vec<Uuid> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(id, _)| *id)
        .collect();
    initial.sort();
    let mut queue: VecDeque<Uuid> = initial.into();

    let mut order = Vec::with_capacity(graph.nodes.len());
    while let Some(id) = queue.pop_front() {
        order.push(id);
        if let Some(next) = dependents.get(&id) {
            let mut newly_ready = Vec::new();
            for dependent in next {
                let deg = in_degree.get_mut(dependent).expect("tracked in-degree");
                *deg -= 1;
                if *deg == 0 {
                    newly_ready.push(*dependent);
                }
            }
            newly_ready.sort();
            for id in newly_ready {
                queue.push_back(id);
            }
        }
    }

    if order.len() != graph.nodes.len() {
        let remaining: BTreeSet<Uuid> = in_degree
            .iter()
            .filter(|(_, deg)| **deg > 0)
            .map(|(id, _)| *id)
            .collect();
        let names: Vec<String> = remaining.iter().map(Uuid::to_string).collect();
        return Err(DomainError::CycleDetected(names.join(", ")));
    }

    Ok(order)
}

/// Group nodes into waves by dependency depth: wave 0 has no dependencies,
/// wave N depends only on nodes in waves < N. Used for `emit-status`
/// snapshots and to report the theoretical parallel speedup of a graph.
pub fn execution_waves(graph: &GraphSpec) -> DomainResult<Vec<Vec<Uuid>>> {
    let order = topological_order(graph)?;
    let by_id: BTreeMap<Uuid, &crate::domain::models::graph::NodeSpec> =
        graph.nodes.iter().map(|n| (n.id, n)).collect();

    let mut depth: BTreeMap<Uuid, usize> = BTreeMap::new();
    for id in &order {
        let node = by_id[id];
        let d = node
            .dependencies
            .iter()
            .map(|dep| depth.get(dep).copied().unwrap_or(0) + 1)
            .max()
            .unwrap_or(0);
        depth.insert(*id, d);
    }

    let max_depth = depth.values().copied().max().unwrap_or(0);
    let mut waves = vec![Vec::new(); max_depth + 1];
    for (id, d) in depth {
        waves[d].push(id);
    }
    for wave in &mut waves {
        wave.sort();
    }

    Ok(waves)
}
