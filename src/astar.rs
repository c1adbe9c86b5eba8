// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Multi-terminal A* router over one `Stack`'s track graph.
//!
//! Grounded on `original_source/Src/Include/Algorithms.hpp`. `multi_terminal_path`
//! grows a Steiner-like tree one terminal at a time: repeatedly pick the
//! nearest not-yet-connected terminal (by heuristic distance to the current
//! tree) and A*-search a path to it, committing that path's nodes to the
//! shared obstacle set before moving to the next terminal. `find_path` is
//! single-pair A* with a 3D Manhattan heuristic; a node blocked by another
//! net's committed path is impassable unless it is itself one of this net's
//! own terminals (so other terminals of the same net never wall each other
//! off). The original's raw-pointer `Node::m_parent` chain becomes a flat
//! index-addressed arena here, per the arena-addressing re-architecture
//! direction.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::error::{Result, RoutingError};
use crate::graph::Graph;

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenEntry {
    f: f64,
    node: usize,
}

impl Eq for OpenEntry {}
impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: reverse the natural f64 ordering.
        other.f.partial_cmp(&self.f).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct AStar<'a> {
    pub graph: &'a Graph,
    /// Node index -> `(x, y, z)`, used only for the search heuristic.
    pub coords: &'a [(usize, usize, usize)],
}

impl<'a> AStar<'a> {
    pub fn new(graph: &'a Graph, coords: &'a [(usize, usize, usize)]) -> Self {
        AStar { graph, coords }
    }

    fn heuristic(&self, a: usize, b: usize) -> f64 {
        let (ax, ay, az) = self.coords[a];
        let (bx, by, bz) = self.coords[b];
        (ax as i64 - bx as i64).unsigned_abs() as f64
            + (ay as i64 - by as i64).unsigned_abs() as f64
            + (az as i64 - bz as i64).unsigned_abs() as f64
    }

    /// Connect every terminal in `terminals` with a tree of shortest paths,
    /// avoiding nodes in `obstacles` (unless they belong to this net's own
    /// terminal set). On success, every node used is added to `obstacles`.
    pub fn multi_terminal_path(
        &self,
        net: &str,
        terminals: &[usize],
        obstacles: &mut HashSet<usize>,
    ) -> Result<Vec<usize>> {
        if terminals.len() < 2 {
            return Ok(terminals.to_vec());
        }
        let own: HashSet<usize> = terminals.iter().copied().collect();

        let mut tree_nodes: HashSet<usize> = HashSet::new();
        tree_nodes.insert(terminals[0]);
        let mut full_path = vec![terminals[0]];
        let mut remaining: Vec<usize> = terminals[1..].to_vec();

        while !remaining.is_empty() {
            let mut best: Option<(usize, usize, f64)> = None; // (remaining_index, source, heuristic)
            for (i, &target) in remaining.iter().enumerate() {
                for &source in &tree_nodes {
                    let h = self.heuristic(source, target);
                    let better = match best {
                        Some((_, _, bh)) => h < bh,
                        None => true,
                    };
                    if better {
                        best = Some((i, source, h));
                    }
                }
            }
            let (idx, source, _) = best.expect("tree_nodes is non-empty");
            let target = remaining.remove(idx);

            let path = self
                .find_path(source, target, obstacles, &own)
                .ok_or_else(|| RoutingError::RoutingInfeasible {
                    net: net.to_string(),
                    reason: format!("no path from node {source} to terminal {target}"),
                })?;

            for &n in &path {
                tree_nodes.insert(n);
                obstacles.insert(n);
            }
            full_path.extend(path.into_iter().skip(1));
        }

        Ok(full_path)
    }

    /// Single-pair A*, obstacle-aware. Returns the node sequence from
    /// `source` to `target`, inclusive, or `None` if unreachable.
    fn find_path(
        &self,
        source: usize,
        target: usize,
        obstacles: &HashSet<usize>,
        own_terminals: &HashSet<usize>,
    ) -> Option<Vec<usize>> {
        let mut open = BinaryHeap::new();
        let mut g_score: HashMap<usize, f64> = HashMap::new();
        let mut parent: HashMap<usize, usize> = HashMap::new();
        let mut closed: HashSet<usize> = HashSet::new();

        g_score.insert(source, 0.0);
        open.push(OpenEntry {
            f: self.heuristic(source, target),
            node: source,
        });

        while let Some(OpenEntry { node, .. }) = open.pop() {
            if node == target {
                return Some(self.reconstruct(node, &parent));
            }
            if !closed.insert(node) {
                continue;
            }
            let g = g_score[&node];
            for edge in self.graph.get_adj(node) {
                let next = edge.destination;
                if next != target
                    && next != source
                    && obstacles.contains(&next)
                    && !own_terminals.contains(&next)
                {
                    continue;
                }
                let tentative = g + edge.weight;
                if tentative < *g_score.get(&next).unwrap_or(&f64::INFINITY) {
                    g_score.insert(next, tentative);
                    parent.insert(next, node);
                    open.push(OpenEntry {
                        f: tentative + self.heuristic(next, target),
                        node: next,
                    });
                }
            }
        }
        None
    }

    fn reconstruct(&self, mut node: usize, parent: &HashMap<usize, usize>) -> Vec<usize> {
        let mut path = vec![node];
        while let Some(&p) = parent.get(&node) {
            path.push(p);
            node = p;
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_graph(n: usize) -> (Graph, Vec<(usize, usize, usize)>) {
        let mut g = Graph::new();
        let coords: Vec<_> = (0..n).map(|i| (i, 0, 0)).collect();
        for i in 0..n - 1 {
            g.add_edge(i, i + 1, 1.0);
        }
        (g, coords)
    }

    #[test]
    fn finds_straight_line_path() {
        let (g, coords) = line_graph(5);
        let astar = AStar::new(&g, &coords);
        let mut obstacles = HashSet::new();
        let path = astar.multi_terminal_path("n1", &[0, 4], &mut obstacles).unwrap();
        assert_eq!(path, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn detours_around_committed_obstacle() {
        // 3x1 grid with a bypass: 0-1-2 direct, plus 0-3-2 detour.
        let mut g = Graph::new();
        g.add_edge(0, 1, 1.0);
        g.add_edge(1, 2, 1.0);
        g.add_edge(0, 3, 1.0);
        g.add_edge(3, 2, 1.0);
        let coords = vec![(0, 0, 0), (1, 0, 0), (2, 0, 0), (1, 1, 0)];
        let astar = AStar::new(&g, &coords);
        let mut obstacles = HashSet::new();
        obstacles.insert(1);
        let path = astar.multi_terminal_path("n1", &[0, 2], &mut obstacles).unwrap();
        assert_eq!(path, vec![0, 3, 2]);
    }

    #[test]
    fn unreachable_terminal_is_infeasible() {
        let mut g = Graph::new();
        g.place_node(1);
        let coords = vec![(0, 0, 0), (5, 5, 0)];
        let astar = AStar::new(&g, &coords);
        let mut obstacles = HashSet::new();
        let err = astar
            .multi_terminal_path("n1", &[0, 1], &mut obstacles)
            .unwrap_err();
        assert!(!err.is_fatal());
    }
}
