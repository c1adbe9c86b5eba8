// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Net-connectivity verifier.
//!
//! Grounded on `original_source/Src/App/Python/lib/connectivity/net_connectivity.cpp`.
//! That file indexes its path buffer with a broken line,
//! `cpp_path_matrix[y][x] = path_buf(b, 0 y, x);` — a missing comma between
//! `0` and `y` that neither compiles as written nor matches the intended 4D
//! `[batch][net][y][x]` shape. Read as intent rather than transcribed
//! verbatim: every net's path is verified independently against its own 2D
//! slice of a genuine 4D `[batch][net][y][x]` array, which is exactly what
//! `PathGrid` below does. A cell value of `2` marks a via (both layers
//! present, free to switch); `1` marks a plain in-layer track cell; `0` is
//! absent. `get_neighbors` there only steps along x on layer 0 and along y
//! on layer 1 — a layer switch happens only by standing on a `2` cell.
//! `traverse_and_check` is a BFS from the first terminal with parent
//! tracking: reaching an already-visited cell through any edge other than
//! its own parent means the path is not a tree, i.e. contains a cycle.
//!
//! Neither a cycle nor a disconnected net aborts the pipeline — both are
//! score deductions the caller can act on, not `RoutingError`s.

use std::collections::{HashMap, VecDeque};

use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Point {
    x: usize,
    y: usize,
    layer: usize,
}

/// One net's routed footprint within one batch, as a dense 2D grid.
#[derive(Debug, Clone)]
pub struct PathGrid {
    pub width: usize,
    pub height: usize,
    cells: Vec<u8>,
}

impl PathGrid {
    pub fn new(width: usize, height: usize) -> Self {
        PathGrid {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        if x >= self.width || y >= self.height {
            0
        } else {
            self.cells[self.idx(x, y)]
        }
    }

    /// Mark a plain in-layer track cell, or escalate it to a via cell (`2`)
    /// if the other layer is already present there.
    pub fn mark(&mut self, x: usize, y: usize) {
        let i = self.idx(x, y);
        self.cells[i] = if self.cells[i] == 0 { 1 } else { 2 };
    }

    /// Build a `PathGrid` from a `Stack` node path: each `(x, y, z)` node
    /// marks `(x, y)`, escalating to a via cell when both planes are hit.
    pub fn from_path(width: usize, height: usize, path: &[(usize, usize, usize)]) -> Self {
        let mut seen_plane: HashMap<(usize, usize), [bool; 2]> = HashMap::new();
        let mut grid = PathGrid::new(width, height);
        for &(x, y, z) in path {
            let planes = seen_plane.entry((x, y)).or_insert([false, false]);
            if !planes[z] {
                planes[z] = true;
                grid.mark(x, y);
            }
        }
        grid
    }
}

fn get_neighbors(grid: &PathGrid, p: Point) -> Vec<Point> {
    let mut out = Vec::new();
    if p.layer == 0 {
        for dx in [-1i64, 1] {
            let nx = p.x as i64 + dx;
            if nx >= 0 && grid.get(nx as usize, p.y) != 0 {
                out.push(Point {
                    x: nx as usize,
                    y: p.y,
                    layer: 0,
                });
            }
        }
    } else {
        for dy in [-1i64, 1] {
            let ny = p.y as i64 + dy;
            if ny >= 0 && grid.get(p.x, ny as usize) != 0 {
                out.push(Point {
                    x: p.x,
                    y: ny as usize,
                    layer: 1,
                });
            }
        }
    }
    if grid.get(p.x, p.y) == 2 {
        out.push(Point {
            x: p.x,
            y: p.y,
            layer: 1 - p.layer,
        });
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Connected,
    Disconnected,
    Cycle,
}

impl VerifyOutcome {
    /// `1.0` for a clean tree, `0.0` for either failure mode — matches the
    /// original's boolean-as-double score.
    pub fn score(self) -> f64 {
        if self == VerifyOutcome::Connected {
            1.0
        } else {
            0.0
        }
    }
}

/// BFS from the first terminal, tracking parents for cycle detection, then
/// checking every terminal was reached.
fn traverse_and_check(grid: &PathGrid, terminals: &[(usize, usize, usize)]) -> VerifyOutcome {
    if terminals.len() < 2 {
        return VerifyOutcome::Connected;
    }
    let start = Point {
        x: terminals[0].0,
        y: terminals[0].1,
        layer: terminals[0].2,
    };
    let mut visited: HashMap<Point, Option<Point>> = HashMap::new();
    visited.insert(start, None);
    let mut queue = VecDeque::from([start]);
    let mut cycle = false;

    while let Some(cur) = queue.pop_front() {
        for next in get_neighbors(grid, cur) {
            match visited.get(&next) {
                None => {
                    visited.insert(next, Some(cur));
                    queue.push_back(next);
                }
                Some(parent) => {
                    if *parent != Some(cur) && next != cur && Some(next) != visited[&cur] {
                        cycle = true;
                    }
                }
            }
        }
    }

    let all_reached = terminals.iter().all(|&(x, y, z)| {
        visited.contains_key(&Point { x, y, layer: z })
    });

    if cycle {
        VerifyOutcome::Cycle
    } else if !all_reached {
        VerifyOutcome::Disconnected
    } else {
        VerifyOutcome::Connected
    }
}

/// One net's verification input: its routed grid plus its terminal points
/// `(x, y, layer)`.
pub struct NetCheck<'a> {
    pub net: &'a str,
    pub grid: &'a PathGrid,
    pub terminals: &'a [(usize, usize, usize)],
}

/// Verify every net independently and in parallel. Each net's result is
/// `(net name, outcome)`; order matches the input slice.
pub fn verify_batch<'a>(checks: &[NetCheck<'a>]) -> Vec<(&'a str, VerifyOutcome)> {
    checks
        .par_iter()
        .map(|c| (c.net, traverse_and_check(c.grid, c.terminals)))
        .collect()
}

/// Aggregate per-batch net outcomes into the two scalar scores `spec.md`
/// §4.7 defines: `overall` is the mean, across batches, of the fraction of
/// a batch's nets that verified clean; `general` is the fraction of batches
/// where *every* net in the batch verified clean. A batch with no nets
/// contributes nothing to either average.
pub fn aggregate_scores(batches: &[Vec<(&str, VerifyOutcome)>]) -> (f64, f64) {
    let mut overall = 0.0;
    let mut general = 0.0;
    let mut counted = 0usize;

    for batch in batches {
        if batch.is_empty() {
            continue;
        }
        let nets_per_batch = batch.len() as f64;
        let tmp = batch
            .iter()
            .filter(|(_, outcome)| *outcome == VerifyOutcome::Connected)
            .count() as f64;
        overall += tmp / nets_per_batch;
        general += if tmp == nets_per_batch { 1.0 } else { 0.0 };
        counted += 1;
    }

    if counted == 0 {
        (0.0, 0.0)
    } else {
        (overall / counted as f64, general / counted as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_track_is_connected() {
        let mut grid = PathGrid::new(5, 1);
        for x in 0..5 {
            grid.mark(x, 0);
        }
        let terminals = [(0, 0, 0), (4, 0, 0)];
        assert_eq!(traverse_and_check(&grid, &terminals), VerifyOutcome::Connected);
    }

    #[test]
    fn missing_segment_is_disconnected() {
        let mut grid = PathGrid::new(5, 1);
        grid.mark(0, 0);
        grid.mark(1, 0);
        grid.mark(3, 0);
        grid.mark(4, 0);
        let terminals = [(0, 0, 0), (4, 0, 0)];
        assert_eq!(
            traverse_and_check(&grid, &terminals),
            VerifyOutcome::Disconnected
        );
    }

    #[test]
    fn via_cell_switches_layer() {
        let mut grid = PathGrid::new(3, 3);
        grid.mark(0, 1); // layer0 track toward via
        grid.mark(1, 1); // via cell: marked twice below
        grid.mark(1, 1);
        grid.mark(1, 0); // layer1 track leaving via
        let terminals = [(0, 1, 0), (1, 0, 1)];
        assert_eq!(traverse_and_check(&grid, &terminals), VerifyOutcome::Connected);
    }

    #[test]
    fn aggregate_scores_rewards_fully_clean_batches() {
        let batches = vec![
            vec![("a", VerifyOutcome::Connected), ("b", VerifyOutcome::Connected)],
            vec![("a", VerifyOutcome::Connected), ("b", VerifyOutcome::Cycle)],
        ];
        let (overall, general) = aggregate_scores(&batches);
        assert_eq!(overall, 0.75);
        assert_eq!(general, 0.5);
    }

    #[test]
    fn ring_of_vias_is_a_cycle() {
        // Four via corners of a 2x2 grid, each reachable from two others on
        // both layers: a closed ring rather than a tree.
        let mut grid = PathGrid::new(2, 2);
        for &(x, y) in &[(0, 0), (1, 0), (0, 1), (1, 1)] {
            grid.mark(x, y);
            grid.mark(x, y);
        }
        let terminals = [(0, 0, 0), (1, 1, 0)];
        assert_eq!(traverse_and_check(&grid, &terminals), VerifyOutcome::Cycle);
    }
}
