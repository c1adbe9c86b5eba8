// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Per-terminal cost-map encoder: multi-source Dijkstra over a `Stack`'s
//! source matrix, producing the two normalized 2D probability fields that
//! are the learner's training input.
//!
//! Grounded on `original_source/Src/Include/Process.hpp`'s
//! `distance_cost_map`/`compute_edge_cost_horizontal`/`compute_edge_cost_vertical`.
//! The original keys its open set on `matrix::Node` (x, y, z, source_x,
//! source_y, cost) ordered by a `CompareNode` min-heap; here the open set is
//! a `BinaryHeap` of `DijkstraEntry` with the same fields, and the two output
//! planes are the `Matrix` type already used by `Stack`.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::matrix::{Matrix, Shape};

pub const LAMBDA: f64 = 0.125;
pub const MU: f64 = 1.0;
pub const VIA_SWITCH_COST: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct DijkstraEntry {
    cost: f64,
    x: usize,
    y: usize,
    z: usize,
    source_x: usize,
    source_y: usize,
}

impl Eq for DijkstraEntry {}
impl Ord for DijkstraEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for DijkstraEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// `source`-relative Manhattan distance to `(x, y)`, with the spec's
/// off-row/off-column `+1` jog penalty baked in exactly as
/// `compute_edge_cost_horizontal`'s `d_source_*` terms do.
fn source_distance_same_row(source_x: usize, source_y: usize, x: usize, y: usize) -> f64 {
    let dx = (x as i64 - source_x as i64).abs();
    let dy = (y as i64 - source_y as i64).abs();
    if y == source_y {
        dx as f64
    } else {
        (dx + dy + 1) as f64
    }
}

fn source_distance_same_col(source_x: usize, source_y: usize, x: usize, y: usize) -> f64 {
    let dx = (x as i64 - source_x as i64).abs();
    let dy = (y as i64 - source_y as i64).abs();
    if x == source_x {
        dy as f64
    } else {
        (dx + dy + 1) as f64
    }
}

fn edge_cost_horizontal(source_x: usize, source_y: usize, cx: usize, cy: usize, nx: usize, ny: usize) -> f64 {
    let d_cur = source_distance_same_row(source_x, source_y, cx, cy);
    let d_nbr = source_distance_same_row(source_x, source_y, nx, ny);
    let detour = d_nbr - d_cur;
    let cost_distance = 1.0 + LAMBDA * detour;
    let aligned = if ny == source_y { 1.0 } else { 0.0 };
    let cost_direction = 1.0 + MU * (1.0 - aligned);
    cost_distance * cost_direction
}

fn edge_cost_vertical(source_x: usize, source_y: usize, cx: usize, cy: usize, nx: usize, ny: usize) -> f64 {
    let d_cur = source_distance_same_col(source_x, source_y, cx, cy);
    let d_nbr = source_distance_same_col(source_x, source_y, nx, ny);
    let detour = d_nbr - d_cur;
    let cost_distance = 1.0 + LAMBDA * detour;
    let aligned = if nx == source_x { 1.0 } else { 0.0 };
    let cost_direction = 1.0 + MU * (1.0 - aligned);
    cost_distance * cost_direction
}

/// Run multi-source Dijkstra from `terminals` over `source`'s two planes,
/// respecting `obs` (nodes committed to other nets), and return the
/// normalized `(horizontal, vertical)` cost maps, each shape `(X, Y, 1)`.
pub fn encode_cost_maps(
    source: &Matrix,
    terminals: &[(usize, usize, usize)],
    obs: &HashSet<(usize, usize, usize)>,
) -> (Matrix, Matrix) {
    let shape = source.shape();
    let out_shape = Shape::new(shape.x, shape.y, 1);
    let mut horizontal = Matrix::new(out_shape, f64::INFINITY);
    let mut vertical = Matrix::new(out_shape, f64::INFINITY);

    let mut heap = BinaryHeap::new();
    for &(x, y, z) in terminals {
        if z == 0 {
            horizontal.set(x, y, 0, 0.0);
        } else {
            vertical.set(x, y, 0, 0.0);
        }
        heap.push(DijkstraEntry {
            cost: 0.0,
            x,
            y,
            z,
            source_x: x,
            source_y: y,
        });
    }

    while let Some(cur) = heap.pop() {
        let plane_cost = if cur.z == 0 {
            horizontal.get(cur.x, cur.y, 0)
        } else {
            vertical.get(cur.x, cur.y, 0)
        };
        if cur.cost > plane_cost {
            continue;
        }

        if cur.z == 0 {
            for nx in [cur.x.wrapping_sub(1), cur.x + 1] {
                if nx == usize::MAX || nx >= shape.x {
                    continue;
                }
                let ny = cur.y;
                if source.get(nx, ny, 0) == 0.0 || obs.contains(&(nx, ny, 0)) {
                    continue;
                }
                let edge = edge_cost_horizontal(cur.source_x, cur.source_y, cur.x, cur.y, nx, ny);
                let new_cost = cur.cost + edge;
                if new_cost < horizontal.get(nx, ny, 0) {
                    horizontal.set(nx, ny, 0, new_cost);
                    heap.push(DijkstraEntry {
                        cost: new_cost,
                        x: nx,
                        y: ny,
                        z: 0,
                        source_x: cur.source_x,
                        source_y: cur.source_y,
                    });
                }
            }
        } else {
            for ny in [cur.y.wrapping_sub(1), cur.y + 1] {
                if ny == usize::MAX || ny >= shape.y {
                    continue;
                }
                let nx = cur.x;
                if source.get(nx, ny, 1) == 0.0 || obs.contains(&(nx, ny, 1)) {
                    continue;
                }
                let edge = edge_cost_vertical(cur.source_x, cur.source_y, cur.x, cur.y, nx, ny);
                let new_cost = cur.cost + edge;
                if new_cost < vertical.get(nx, ny, 0) {
                    vertical.set(nx, ny, 0, new_cost);
                    heap.push(DijkstraEntry {
                        cost: new_cost,
                        x: nx,
                        y: ny,
                        z: 1,
                        source_x: cur.source_x,
                        source_y: cur.source_y,
                    });
                }
            }
        }

        // Layer switch at the same (x, y), fixed cost, no detour/alignment terms.
        let (switch_z, other_plane_cost) = if cur.z == 0 {
            (1usize, vertical.get(cur.x, cur.y, 0))
        } else {
            (0usize, horizontal.get(cur.x, cur.y, 0))
        };
        let switch_cost = cur.cost + VIA_SWITCH_COST;
        if source.get(cur.x, cur.y, switch_z) != 0.0
            && !obs.contains(&(cur.x, cur.y, switch_z))
            && switch_cost < other_plane_cost
        {
            if switch_z == 1 {
                vertical.set(cur.x, cur.y, 0, switch_cost);
            } else {
                horizontal.set(cur.x, cur.y, 0, switch_cost);
            }
            heap.push(DijkstraEntry {
                cost: switch_cost,
                x: cur.x,
                y: cur.y,
                z: switch_z,
                source_x: cur.source_x,
                source_y: cur.source_y,
            });
        }
    }

    normalize(&mut horizontal, &mut vertical);
    for &(x, y, z) in terminals {
        if z == 0 {
            horizontal.set(x, y, 0, 1.0);
        } else {
            vertical.set(x, y, 0, 1.0);
        }
    }

    (horizontal, vertical)
}

/// Joint min/max normalization across both planes: reached cells map to
/// `0.9 * (1 - (cost - min) / (max - min))` (or flat `0.9` if `max == min`);
/// unreached cells (still `INFINITY`) become `0.0`.
fn normalize(horizontal: &mut Matrix, vertical: &mut Matrix) {
    let shape = horizontal.shape();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for y in 0..shape.y {
        for x in 0..shape.x {
            for plane in [horizontal.get(x, y, 0), vertical.get(x, y, 0)] {
                if plane.is_finite() {
                    min = min.min(plane);
                    max = max.max(plane);
                }
            }
        }
    }

    let norm = |cost: f64| -> f64 {
        if !cost.is_finite() {
            0.0
        } else if max > min {
            0.9 * (1.0 - (cost - min) / (max - min))
        } else {
            0.9
        }
    };

    for y in 0..shape.y {
        for x in 0..shape.x {
            let h = norm(horizontal.get(x, y, 0));
            horizontal.set(x, y, 0, h);
            let v = norm(vertical.get(x, y, 0));
            vertical.set(x, y, 0, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_matrix(x: usize, y: usize) -> Matrix {
        let mut m = Matrix::new(Shape::new(x, y, 2), 0.0);
        for yy in 0..y {
            for xx in 0..x {
                m.set(xx, yy, 0, 1.0);
                m.set(xx, yy, 1, 1.0);
            }
        }
        m
    }

    #[test]
    fn terminal_cells_are_exactly_one() {
        let source = open_matrix(5, 5);
        let terminals = [(1, 1, 0), (3, 3, 1)];
        let obs = HashSet::new();
        let (h, v) = encode_cost_maps(&source, &terminals, &obs);
        assert_eq!(h.get(1, 1, 0), 1.0);
        assert_eq!(v.get(3, 3, 0), 1.0);
    }

    #[test]
    fn unreached_cells_are_zero_when_plane_blocked() {
        let mut source = open_matrix(4, 4);
        // Block the whole vertical plane so it's never reached.
        for y in 0..4 {
            for x in 0..4 {
                source.set(x, y, 1, 0.0);
            }
        }
        let terminals = [(0, 0, 0)];
        let obs = HashSet::new();
        let (_, v) = encode_cost_maps(&source, &terminals, &obs);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(v.get(x, y, 0), 0.0);
            }
        }
    }

    #[test]
    fn normalized_values_stay_in_unit_range() {
        let source = open_matrix(6, 6);
        let terminals = [(0, 0, 0)];
        let obs = HashSet::new();
        let (h, _) = encode_cost_maps(&source, &terminals, &obs);
        for y in 0..6 {
            for x in 0..6 {
                let c = h.get(x, y, 0);
                assert!((0.0..=1.0).contains(&c));
            }
        }
    }
}
