//! Network-topology-preserving background sampler.
//!
//! The embedder's [`EntityNetwork`] is adapted into a `petgraph::UnGraph` so
//! connected-component discovery and the degree-matched walk reuse
//! petgraph's traversal primitives rather than a hand-rolled adjacency scan.
//! All `n_random` replacement modules are generated in one precomputation
//! phase, each seeded deterministically from `(seed, run_index)` via
//! [`crate::core::rng::child_rng`] so repeated `validate` calls with the
//! same seed reproduce the same modules.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{NodeIndex, UnGraph};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::errors::{CoherenceError, Result};
use crate::core::io_traits::EntityNetwork;
use crate::core::rng::child_rng;
use crate::domain::EntityIndex;

/// Precomputed replacement modules, one per randomized run.
pub struct NetworkPreservingState {
    modules: Vec<Vec<EntityIndex>>,
}

struct Adjacency {
    graph: UnGraph<EntityIndex, ()>,
    node_of: HashMap<EntityIndex, NodeIndex>,
}

impl Adjacency {
    fn build(network: &dyn EntityNetwork) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut node_of = HashMap::new();
        for vertex in network.vertices() {
            node_of.entry(vertex).or_insert_with(|| graph.add_node(vertex));
        }
        let mut seen_edges = HashSet::new();
        for vertex in network.vertices() {
            let a = node_of[&vertex];
            for neighbor in network.neighbors(vertex) {
                let b = *node_of.entry(neighbor).or_insert_with(|| graph.add_node(neighbor));
                let key = (a.min(b), a.max(b));
                if seen_edges.insert(key) {
                    graph.add_edge(a, b, ());
                }
            }
        }
        Self { graph, node_of }
    }

    fn degree(&self, entity: EntityIndex) -> usize {
        self.node_of
            .get(&entity)
            .map(|&node| self.graph.neighbors(node).count())
            .unwrap_or(0)
    }

    fn neighbors_of(&self, entity: EntityIndex) -> Vec<EntityIndex> {
        let Some(&node) = self.node_of.get(&entity) else {
            return Vec::new();
        };
        self.graph
            .neighbors(node)
            .map(|n| self.graph[n])
            .collect()
    }

    fn vertices(&self) -> Vec<EntityIndex> {
        self.node_of.keys().copied().collect()
    }
}

/// Number of connected components of the subgraph induced by `original`.
fn induced_component_count(adjacency: &Adjacency, original: &[EntityIndex]) -> usize {
    let members: HashSet<EntityIndex> = original.iter().copied().collect();
    let mut visited: HashSet<EntityIndex> = HashSet::new();
    let mut components = 0;

    for &start in original {
        if visited.contains(&start) {
            continue;
        }
        components += 1;
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(current) = stack.pop() {
            for neighbor in adjacency.neighbors_of(current) {
                if members.contains(&neighbor) && visited.insert(neighbor) {
                    stack.push(neighbor);
                }
            }
        }
    }
    components
}

pub(super) fn prepare(
    network: &dyn EntityNetwork,
    original: &[EntityIndex],
    n_random: u32,
    seed: u64,
) -> Result<NetworkPreservingState> {
    let adjacency = Adjacency::build(network);
    let component_count = induced_component_count(&adjacency, original).max(1);
    let target_size = original.len();
    let all_vertices = adjacency.vertices();

    if all_vertices.len() < target_size {
        return Err(CoherenceError::insufficient_background(target_size, all_vertices.len()));
    }

    let mut modules = Vec::with_capacity(n_random as usize);
    for run in 0..n_random {
        let mut rng = child_rng(seed, run);
        modules.push(grow_module(&adjacency, &all_vertices, component_count, target_size, &mut rng)?);
    }

    Ok(NetworkPreservingState { modules })
}

fn grow_module(
    adjacency: &Adjacency,
    all_vertices: &[EntityIndex],
    seed_count: usize,
    target_size: usize,
    rng: &mut impl Rng,
) -> Result<Vec<EntityIndex>> {
    let mut shuffled = all_vertices.to_vec();
    shuffled.shuffle(rng);

    let mut module: Vec<EntityIndex> = Vec::new();
    let mut in_module: HashSet<EntityIndex> = HashSet::new();
    for &candidate in &shuffled {
        if module.len() >= seed_count.min(target_size) {
            break;
        }
        if in_module.iter().any(|&m| adjacency.neighbors_of(m).contains(&candidate)) {
            continue; // seeds must be pairwise non-adjacent
        }
        module.push(candidate);
        in_module.insert(candidate);
    }
    // Not enough mutually non-adjacent vertices in a dense network: top up
    // with whatever is left so the walk still has somewhere to start from.
    for &candidate in &shuffled {
        if module.len() >= seed_count.min(target_size) {
            break;
        }
        if in_module.insert(candidate) {
            module.push(candidate);
        }
    }

    while module.len() < target_size {
        let target_degree = if module.is_empty() {
            0.0
        } else {
            module.iter().map(|&e| adjacency.degree(e) as f64).sum::<f64>() / module.len() as f64
        };

        let mut frontier: Vec<EntityIndex> = module
            .iter()
            .flat_map(|&e| adjacency.neighbors_of(e))
            .filter(|e| !in_module.contains(e))
            .collect();
        frontier.sort_unstable();
        frontier.dedup();

        let next = if frontier.is_empty() {
            all_vertices.iter().copied().find(|e| !in_module.contains(e))
        } else {
            frontier.shuffle(rng);
            frontier
                .into_iter()
                .min_by(|a, b| {
                    let da = (adjacency.degree(*a) as f64 - target_degree).abs();
                    let db = (adjacency.degree(*b) as f64 - target_degree).abs();
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                })
        };

        match next {
            Some(entity) => {
                in_module.insert(entity);
                module.push(entity);
            }
            None => {
                return Err(CoherenceError::insufficient_background(target_size, module.len()));
            }
        }
    }

    Ok(module)
}

pub(super) fn draw(state: &NetworkPreservingState, run: u32) -> Result<Vec<crate::domain::EntityIndex>> {
    state
        .modules
        .get(run as usize)
        .cloned()
        .ok_or_else(|| CoherenceError::invalid_request(format!("no precomputed network module for run {run}")))
}
