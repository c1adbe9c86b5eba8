// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Access-Point Grid: per-GCell, per-metal grid of claimable pin access
//! points.
//!
//! Grounded on `original_source/Src/Include/DEF/AccessPointGrid.hpp`. Each
//! metal layer inside a GCell holds one `AccessLine` per horizontal track row
//! and one per vertical track column; a pin claims the access node nearest
//! its geometry. `AccessNode::m_ptr` (a raw pointer to the claiming pin) and
//! the `m_left/m_right/m_top/m_bottom` neighbor-APG pointers become, here, a
//! `PinId` owner field and an explicit `Neighbors` handle passed into the
//! cross-pin methods — no pointers, no global registry.

use crate::design::PinId;
use crate::error::{Result, RoutingError};
use crate::geom::Rect;
use crate::grid::AxisGrid;
use crate::metal::Metal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Free,
    Occupied,
    ViaBlockage,
}

#[derive(Debug, Clone, Copy)]
pub struct AccessNode {
    pub status: AccessStatus,
    pub owner: Option<PinId>,
}

impl AccessNode {
    fn free() -> Self {
        AccessNode {
            status: AccessStatus::Free,
            owner: None,
        }
    }
}

/// One track line (all nodes sharing a fixed coordinate), with the running
/// load used by `line_heuristic`.
#[derive(Debug, Clone)]
pub struct AccessLine {
    pub fixed_coord: f64,
    pub nodes: Vec<AccessNode>,
    pub assigned: usize,
}

impl AccessLine {
    fn new(fixed_coord: f64, len: usize) -> Self {
        AccessLine {
            fixed_coord,
            nodes: vec![AccessNode::free(); len],
            assigned: 0,
        }
    }

    /// `size²`: a line that already carries many pins becomes quadratically
    /// less attractive to new claims, spreading load across the grid.
    pub fn load_cost(&self) -> f64 {
        (self.assigned * self.assigned) as f64
    }
}

/// Handles to the four neighboring GCells' access-point grids on the same
/// metal, used by `add_cross_pin` to mirror a boundary claim instead of
/// re-deciding it independently on each side.
#[derive(Debug, Default)]
pub struct Neighbors<'a> {
    pub left: Option<&'a AccessPointGrid>,
    pub right: Option<&'a AccessPointGrid>,
    pub top: Option<&'a AccessPointGrid>,
    pub bottom: Option<&'a AccessPointGrid>,
}

#[derive(Debug, Clone)]
pub struct AccessPointGrid {
    pub metal: Metal,
    pub x_grid: AxisGrid,
    pub y_grid: AxisGrid,
    /// One line per row, indexed by y-grid index; `nodes[i]` sits at x-grid index `i`.
    pub horizontal: Vec<AccessLine>,
    /// One line per column, indexed by x-grid index; `nodes[i]` sits at y-grid index `i`.
    pub vertical: Vec<AccessLine>,
}

impl AccessPointGrid {
    pub fn new(metal: Metal, x_grid: AxisGrid, y_grid: AxisGrid) -> Self {
        let horizontal = (0..y_grid.count)
            .map(|i| AccessLine::new(y_grid.line(i as i64), x_grid.count))
            .collect();
        let vertical = (0..x_grid.count)
            .map(|i| AccessLine::new(x_grid.line(i as i64), y_grid.count))
            .collect();
        AccessPointGrid {
            metal,
            x_grid,
            y_grid,
            horizontal,
            vertical,
        }
    }

    fn index_range(&self, rect: &Rect) -> (i64, i64, i64, i64) {
        let xl = self.x_grid.nearest_index(rect.xl);
        let xh = self.x_grid.nearest_index(rect.xh);
        let yl = self.y_grid.nearest_index(rect.yl);
        let yh = self.y_grid.nearest_index(rect.yh);
        (xl.min(xh), xl.max(xh), yl.min(yh), yl.max(yh))
    }

    /// Mark every node under `rect` as OCCUPIED (or VIA_BLOCKAGE, for a
    /// via-cut obstacle) with no owning pin.
    pub fn add_obstacle(&mut self, rect: &Rect, via_blockage: bool) {
        let (xl, xh, yl, yh) = self.index_range(rect);
        let status = if via_blockage {
            AccessStatus::ViaBlockage
        } else {
            AccessStatus::Occupied
        };
        for y in yl..=yh {
            if let Some(line) = self.horizontal.get_mut(y as usize) {
                for x in xl..=xh {
                    if let Some(node) = line.nodes.get_mut(x as usize) {
                        node.status = status;
                    }
                }
            }
        }
        for x in xl..=xh {
            if let Some(line) = self.vertical.get_mut(x as usize) {
                for y in yl..=yh {
                    if let Some(node) = line.nodes.get_mut(y as usize) {
                        node.status = status;
                    }
                }
            }
        }
    }

    pub fn get_obstacles(&self) -> Vec<(f64, f64)> {
        let mut out = Vec::new();
        for (yi, line) in self.horizontal.iter().enumerate() {
            for (xi, node) in line.nodes.iter().enumerate() {
                if node.status != AccessStatus::Free {
                    out.push((self.x_grid.line(xi as i64), self.y_grid.line(yi as i64)));
                }
            }
        }
        out
    }

    /// Candidate nodes under `rect`, as `(x_index, y_index, line_cost)`,
    /// ranked ascending by `find_optimal`: FREE nodes first by line load,
    /// VIA_BLOCKAGE nodes only as a fallback if no FREE node exists.
    fn find_optimal(&self, rect: &Rect) -> Option<(usize, usize)> {
        let (xl, xh, yl, yh) = self.index_range(rect);
        let mut best_free: Option<(usize, usize, f64)> = None;
        let mut best_via: Option<(usize, usize, f64)> = None;

        for y in yl..=yh {
            let Some(line) = self.horizontal.get(y as usize) else {
                continue;
            };
            for x in xl..=xh {
                let Some(node) = line.nodes.get(x as usize) else {
                    continue;
                };
                let cost = line.load_cost()
                    + self
                        .vertical
                        .get(x as usize)
                        .map_or(0.0, AccessLine::load_cost);
                match node.status {
                    AccessStatus::Free => {
                        let better = match best_free {
                            Some((_, _, c)) => cost < c,
                            None => true,
                        };
                        if better {
                            best_free = Some((x as usize, y as usize, cost));
                        }
                    }
                    AccessStatus::ViaBlockage => {
                        let better = match best_via {
                            Some((_, _, c)) => cost < c,
                            None => true,
                        };
                        if better {
                            best_via = Some((x as usize, y as usize, cost));
                        }
                    }
                    AccessStatus::Occupied => {}
                }
            }
        }

        best_free
            .or(best_via)
            .map(|(x, y, _)| (x, y))
    }

    fn claim(&mut self, x: usize, y: usize, pin: PinId) {
        if let Some(line) = self.horizontal.get_mut(y) {
            if let Some(node) = line.nodes.get_mut(x) {
                if node.owner.is_none() {
                    line.assigned += 1;
                }
                node.status = AccessStatus::Occupied;
                node.owner = Some(pin);
            }
        }
        if let Some(line) = self.vertical.get_mut(x) {
            if let Some(node) = line.nodes.get_mut(y) {
                if node.owner.is_none() {
                    line.assigned += 1;
                }
                node.status = AccessStatus::Occupied;
                node.owner = Some(pin);
            }
        }
    }

    /// Total APG cost: `Σ_lines heuristic(line.assigned)`, the quadratic
    /// line-load sum `spec.md` §4.3/§8 requires stay consistent after every
    /// claim.
    pub fn total_cost(&self) -> f64 {
        self.horizontal.iter().map(AccessLine::load_cost).sum::<f64>()
            + self.vertical.iter().map(AccessLine::load_cost).sum::<f64>()
    }

    /// Claim an access point for an ordinary (INNER) pin: nearest FREE node
    /// under its geometry, falling back to a VIA_BLOCKAGE node if no FREE
    /// node exists under the pin's footprint.
    pub fn add_pin(&mut self, net: &str, pin: PinId, rect: &Rect) -> Result<(f64, f64)> {
        let (x, y) = self
            .find_optimal(rect)
            .ok_or_else(|| RoutingError::PinUnplaceable {
                net: net.to_string(),
                pin: format!("{pin:?}"),
            })?;
        self.claim(x, y, pin);
        Ok((self.x_grid.line(x as i64), self.y_grid.line(y as i64)))
    }

    /// Claim an access point for a CROSS pin (a pin whose port degenerates to
    /// a single boundary point shared with a neighboring GCell). If the
    /// neighboring APG already placed this same pin on the shared boundary
    /// line, mirror that exact node; otherwise prefer a node already
    /// carrying the same net, falling back to the minimum-cost node under the
    /// pin's own rect, and finally relocating along the shared boundary line
    /// if that rect's only candidate is occupied by a different net.
    pub fn add_cross_pin(
        &mut self,
        net: &str,
        pin: PinId,
        rect: &Rect,
        neighbors: &Neighbors,
        same_net_nodes: &[(usize, usize)],
    ) -> Result<(f64, f64)> {
        let mirrored = [neighbors.left, neighbors.right, neighbors.top, neighbors.bottom]
            .into_iter()
            .flatten()
            .find_map(|n| n.find_owned_boundary_node(pin));

        if let Some((x, y)) = mirrored {
            self.claim(x, y, pin);
            return Ok((self.x_grid.line(x as i64), self.y_grid.line(y as i64)));
        }

        if let Some(&(x, y)) = same_net_nodes.first() {
            self.claim(x, y, pin);
            return Ok((self.x_grid.line(x as i64), self.y_grid.line(y as i64)));
        }

        if let Some((x, y)) = self.find_optimal(rect) {
            self.claim(x, y, pin);
            return Ok((self.x_grid.line(x as i64), self.y_grid.line(y as i64)));
        }

        let boundary = self.boundary_line_rect(rect);
        let (x, y) = self
            .find_optimal(&boundary)
            .ok_or_else(|| RoutingError::PinUnplaceable {
                net: net.to_string(),
                pin: format!("{pin:?}"),
            })?;
        self.claim(x, y, pin);
        Ok((self.x_grid.line(x as i64), self.y_grid.line(y as i64)))
    }

    /// Widen a (possibly degenerate) cross-pin rect to the full shared
    /// boundary line it sits on: the whole column if the rect pins a single
    /// x, the whole row if it pins a single y. Lets a cross pin relocate to
    /// another slot on the same boundary when its preferred node is occupied
    /// by a different net, instead of failing outright.
    fn boundary_line_rect(&self, rect: &Rect) -> Rect {
        if (rect.xh - rect.xl).abs() < f64::EPSILON {
            Rect::new(rect.xl, self.y_grid.start, rect.xl, self.y_grid.end())
        } else {
            Rect::new(self.x_grid.start, rect.yl, self.x_grid.end(), rect.yl)
        }
    }

    /// Mark the node nearest `(x, y)` OCCUPIED under a claim decided by a
    /// neighbor APG, mirroring its boundary decision onto this grid's
    /// matching node (`spec.md` §4.3's "mirror to the neighbor APG").
    pub fn mark_occupied_at(&mut self, x: f64, y: f64, pin: PinId) {
        let xi = self.x_grid.nearest_index(x).max(0) as usize;
        let yi = self.y_grid.nearest_index(y).max(0) as usize;
        self.claim(xi, yi, pin);
    }

    fn find_owned_boundary_node(&self, pin: PinId) -> Option<(usize, usize)> {
        for (yi, line) in self.horizontal.iter().enumerate() {
            for (xi, node) in line.nodes.iter().enumerate() {
                if node.owner == Some(pin) {
                    return Some((xi, yi));
                }
            }
        }
        None
    }

    /// Claim a shared access point for a BETWEEN_STACKS synthetic pin pair:
    /// the intersection node of two adjacent stacks' regions. A FREE node is
    /// preferred, ranked by line-load cost; a node already OCCUPIED by this
    /// same net (per `same_net_nodes`) is reused; a node OCCUPIED by a
    /// different net is never claimed; a VIA_BLOCKAGE node is claimed only
    /// when no FREE or same-net node exists under the rect.
    pub fn add_between_stack_pin(
        &mut self,
        net: &str,
        pin: PinId,
        rect: &Rect,
        same_net_nodes: &[(usize, usize)],
    ) -> Result<(f64, f64)> {
        let (xl, xh, yl, yh) = self.index_range(rect);
        let mut best_free: Option<(usize, usize, f64)> = None;
        let mut best_same_net: Option<(usize, usize, f64)> = None;
        let mut best_via: Option<(usize, usize, f64)> = None;
        let mut any_candidate = false;

        for y in yl..=yh {
            let Some(line) = self.horizontal.get(y as usize) else {
                continue;
            };
            for x in xl..=xh {
                let Some(node) = line.nodes.get(x as usize) else {
                    continue;
                };
                any_candidate = true;
                let cost = line.load_cost()
                    + self
                        .vertical
                        .get(x as usize)
                        .map_or(0.0, AccessLine::load_cost);
                match node.status {
                    AccessStatus::Free => {
                        let better = match best_free {
                            Some((_, _, c)) => cost < c,
                            None => true,
                        };
                        if better {
                            best_free = Some((x as usize, y as usize, cost));
                        }
                    }
                    AccessStatus::ViaBlockage => {
                        let better = match best_via {
                            Some((_, _, c)) => cost < c,
                            None => true,
                        };
                        if better {
                            best_via = Some((x as usize, y as usize, cost));
                        }
                    }
                    AccessStatus::Occupied => {
                        if !same_net_nodes.contains(&(x as usize, y as usize)) {
                            continue;
                        }
                        let better = match best_same_net {
                            Some((_, _, c)) => cost < c,
                            None => true,
                        };
                        if better {
                            best_same_net = Some((x as usize, y as usize, cost));
                        }
                    }
                }
            }
        }

        if !any_candidate {
            return Err(RoutingError::BetweenStackUnplaceable {
                net: net.to_string(),
            });
        }

        let (x, y) = best_free
            .or(best_same_net)
            .or(best_via)
            .map(|(x, y, _)| (x, y))
            .ok_or_else(|| RoutingError::BetweenStackUnplaceable {
                net: net.to_string(),
            })?;
        self.claim(x, y, pin);
        Ok((self.x_grid.line(x as i64), self.y_grid.line(y as i64)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> AccessPointGrid {
        AccessPointGrid::new(Metal::M1, AxisGrid::new(0.0, 10.0, 5), AxisGrid::new(0.0, 10.0, 5))
    }

    #[test]
    fn inner_pin_claims_free_node() {
        let mut apg = grid();
        let pin = PinId(0);
        let rect = Rect::new(18.0, 18.0, 22.0, 22.0);
        let pt = apg.add_pin("n1", pin, &rect).unwrap();
        assert_eq!(pt, (20.0, 20.0));
        assert_eq!(apg.horizontal[2].assigned, 1);
    }

    #[test]
    fn obstacle_blocks_subsequent_claim_elsewhere_on_line() {
        let mut apg = grid();
        apg.add_obstacle(&Rect::new(0.0, 20.0, 40.0, 20.0), false);
        let rect = Rect::new(18.0, 18.0, 22.0, 22.0);
        let pt = apg.add_pin("n1", PinId(1), &rect).unwrap();
        // row y=20 fully occupied; claim must land on a different row.
        assert_ne!(pt.1, 20.0);
    }

    #[test]
    fn line_load_cost_is_quadratic() {
        let mut line = AccessLine::new(0.0, 4);
        line.assigned = 3;
        assert_eq!(line.load_cost(), 9.0);
    }

    #[test]
    fn between_stack_pin_prefers_free_over_occupied_same_net() {
        let mut apg = grid();
        let rect = Rect::new(18.0, 18.0, 22.0, 22.0);
        apg.add_pin("netA", PinId(0), &rect).unwrap();

        let pt = apg
            .add_between_stack_pin("netA", PinId(1), &Rect::new(8.0, 8.0, 32.0, 32.0), &[(2, 2)])
            .unwrap();
        assert_ne!(pt, (20.0, 20.0));
    }

    #[test]
    fn between_stack_pin_reuses_same_net_node_when_no_free_node_remains() {
        let mut apg = grid();
        let rect = Rect::new(18.0, 18.0, 22.0, 22.0);
        apg.add_pin("netA", PinId(0), &rect).unwrap();

        let pt = apg
            .add_between_stack_pin("netA", PinId(1), &rect, &[(2, 2)])
            .unwrap();
        assert_eq!(pt, (20.0, 20.0));
    }

    #[test]
    fn between_stack_pin_rejects_different_net_occupied_node() {
        let mut apg = grid();
        let rect = Rect::new(18.0, 18.0, 22.0, 22.0);
        apg.add_pin("netA", PinId(0), &rect).unwrap();

        let err = apg
            .add_between_stack_pin("netB", PinId(1), &rect, &[])
            .unwrap_err();
        assert!(matches!(err, RoutingError::BetweenStackUnplaceable { .. }));
    }
}
