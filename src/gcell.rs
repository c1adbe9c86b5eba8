// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! GCell: one cell of the coarse routing grid, owning a per-metal
//! access-point grid and the Stacks realized from its placed pins.
//!
//! Grounded on `original_source/Src/Include/DEF/GCell.hpp`. The stage order
//! (`setup_global_obstacles`, `setup_inner_pins`, `setup_cross_pins`,
//! `setup_between_stack_pins`, `setup_stacks`) follows that file, as does the
//! inner-pin metal-escalation retry and the CROSS-vs-INNER split by whether a
//! pin's port degenerates to a single boundary line. `m_access_point_grid`
//! there is one grid reused loosely across metals; here, per `apg.rs`'s own
//! per-metal design, a GCell owns one `AccessPointGrid` per routing metal it
//! sees, keyed by `Metal`. Synthetic `BETWEEN_STACKS` pins in the original are
//! brand-new heap `Pin` objects; since this crate's pins live in `Design`'s
//! fixed arena, a between-stack claim here is booked under the net's first
//! real `PinId` instead of minting a phantom one.

use std::collections::HashMap;

use crate::apg::{AccessPointGrid, Neighbors};
use crate::design::{Design, NetId, PinId};
use crate::error::RoutingError;
use crate::geom::Rect;
use crate::grid::AxisGrid;
use crate::logging::log_warn;
use crate::metal::Metal;
use crate::stack::{Plane, Stack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GCellState {
    Created,
    Obstacled,
    InnerPlaced,
    CrossPlaced,
    BetweenStacksPlaced,
    StacksRealized,
    Error,
}

#[derive(Debug, Clone)]
struct ClassifiedPin {
    pin: PinId,
    net: NetId,
    metal: Metal,
    rect: Rect,
}

#[derive(Debug, Clone, Copy)]
pub struct PlacedPin {
    pub pin: PinId,
    pub net: NetId,
    pub metal: Metal,
    pub x: f64,
    pub y: f64,
}

/// `(ri * 2 + 3)`: ordinal of the routing metal at routing-index `ri`,
/// inverse of `Metal::routing_index`.
fn routing_metal_at(ri: usize) -> Option<Metal> {
    Metal::from_ordinal((ri * 2 + 3) as u8)
}

pub struct GCell {
    pub gx: usize,
    pub gy: usize,
    pub bounds: Rect,
    pub state: GCellState,
    apgs: HashMap<Metal, AccessPointGrid>,
    stacks: HashMap<usize, Stack>,
    inner_pins: Vec<ClassifiedPin>,
    cross_pins: Vec<ClassifiedPin>,
    between_stack_pins: Vec<(ClassifiedPin, ClassifiedPin)>,
    net_bounds: HashMap<NetId, (f64, f64, f64, f64)>,
    placements: Vec<PlacedPin>,
    claimed: HashMap<(Metal, NetId), Vec<(usize, usize)>>,
    pub errors: Vec<RoutingError>,
}

impl GCell {
    pub fn new(gx: usize, gy: usize, bounds: Rect, routing_metals: &[Metal], design: &Design) -> Self {
        let mut apgs = HashMap::new();
        for &metal in routing_metals {
            let x_grid = design
                .tracks
                .vertical
                .get(&metal)
                .or(design.tracks.gcell_x.as_ref())
                .map(|g| local_axis(g, bounds.xl, bounds.xh))
                .unwrap_or_else(|| AxisGrid::new(bounds.xl, bounds.width().max(1.0), 1));
            let y_grid = design
                .tracks
                .horizontal
                .get(&metal)
                .or(design.tracks.gcell_y.as_ref())
                .map(|g| local_axis(g, bounds.yl, bounds.yh))
                .unwrap_or_else(|| AxisGrid::new(bounds.yl, bounds.height().max(1.0), 1));
            apgs.insert(metal, AccessPointGrid::new(metal, x_grid, y_grid));
        }

        GCell {
            gx,
            gy,
            bounds,
            state: GCellState::Created,
            apgs,
            stacks: HashMap::new(),
            inner_pins: Vec::new(),
            cross_pins: Vec::new(),
            between_stack_pins: Vec::new(),
            net_bounds: HashMap::new(),
            placements: Vec::new(),
            claimed: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn apg(&self, metal: Metal) -> Option<&AccessPointGrid> {
        self.apgs.get(&metal)
    }

    pub fn metals(&self) -> impl Iterator<Item = &Metal> {
        self.apgs.keys()
    }

    pub fn placements(&self) -> &[PlacedPin] {
        &self.placements
    }

    /// Mirror a neighbor GCell's boundary claim onto this grid's matching
    /// node, per `spec.md` §4.3/§8's boundary-mirror invariant. Used by the
    /// pipeline's serial cross-pin reconciliation pass.
    pub fn mirror_claim(&mut self, metal: Metal, x: f64, y: f64, pin: PinId) {
        if let Some(apg) = self.apgs.get_mut(&metal) {
            apg.mark_occupied_at(x, y, pin);
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.state, GCellState::Error)
    }

    /// Mark component-obstacle geometry onto every metal's access-point grid,
    /// then classify this GCell's pins into INNER (extended port) and CROSS
    /// (single-point port) sets, tracking a running bounding box per net as
    /// the original's `setup_inner_pins`/`setup_cross_pins` do inline.
    pub fn setup_global_obstacles(&mut self, design: &Design) {
        for comp in &design.components {
            if !comp.bbox.intersects(&self.bounds) {
                continue;
            }
            for obs in &comp.obstacles {
                if let Some(apg) = self.apgs.get_mut(&obs.metal) {
                    apg.add_obstacle(&obs.rect, false);
                }
            }
        }
        self.classify_pins(design);
        self.state = GCellState::Obstacled;
    }

    fn classify_pins(&mut self, design: &Design) {
        for (net_idx, net) in design.nets.iter().enumerate() {
            let net_id = NetId(net_idx);
            for &pin_id in &net.pins {
                let pin = design.pin(pin_id);
                if !pin.use_kind.is_routable() {
                    // POWER/GROUND polygons become obstacles rather than
                    // routable pins, per `spec.md` §6.
                    for port in &pin.ports {
                        if port.rect.intersects(&self.bounds) {
                            if let Some(apg) = self.apgs.get_mut(&port.metal) {
                                apg.add_obstacle(&port.rect, false);
                            }
                        }
                    }
                    continue;
                }
                let Some(port) = pin.ports.first() else {
                    continue;
                };
                if !self.apgs.contains_key(&port.metal) {
                    continue;
                }
                if !port.rect.intersects(&self.bounds) && !self.bounds.contains_point(port.rect.center()) {
                    continue;
                }

                let degenerate = port.rect.width() <= f64::EPSILON || port.rect.height() <= f64::EPSILON;
                let classified = ClassifiedPin {
                    pin: pin_id,
                    net: net_id,
                    metal: port.metal,
                    rect: port.rect,
                };
                if degenerate {
                    self.cross_pins.push(classified);
                } else {
                    self.inner_pins.push(classified);
                }
            }
        }
    }

    /// Place INNER pins, highest access-point-candidate-count first.
    /// On `PinUnplaceable` escalate the pin's metal to the next routing layer
    /// and retry against that layer's grid (if this GCell tracks it), up to
    /// the topmost routing metal this GCell has a grid for.
    pub fn setup_inner_pins(&mut self, design: &Design) {
        self.inner_pins.sort_by(|a, b| {
            candidate_count(&self.apgs, a).cmp(&candidate_count(&self.apgs, b)).reverse()
        });

        let top_ri = self.apgs.keys().map(|m| m.routing_index()).max().unwrap_or(0);

        let pins = std::mem::take(&mut self.inner_pins);
        for mut cp in pins {
            let net_name = design.net(cp.net).name.clone();
            let mut ri = cp.metal.routing_index();
            loop {
                let Some(apg) = self.apgs.get_mut(&cp.metal) else {
                    self.errors.push(RoutingError::PinUnplaceable {
                        net: net_name.clone(),
                        pin: format!("{:?}", cp.pin),
                    });
                    break;
                };
                match apg.add_pin(&net_name, cp.pin, &cp.rect) {
                    Ok((x, y)) => {
                        self.record_placement(cp.pin, cp.net, cp.metal, x, y);
                        break;
                    }
                    Err(_) if ri < top_ri => {
                        ri += 1;
                        if let Some(next) = routing_metal_at(ri) {
                            cp.metal = next;
                            continue;
                        }
                        self.errors.push(RoutingError::PinUnplaceable {
                            net: net_name.clone(),
                            pin: format!("{:?}", cp.pin),
                        });
                        break;
                    }
                    Err(e) => {
                        log_warn!("gcell ({},{}) net {}: {e}", self.gx, self.gy, net_name);
                        self.errors.push(e);
                        break;
                    }
                }
            }
            self.absorb_net_bounds(cp.net);
        }

        self.state = if self.errors.is_empty() {
            GCellState::InnerPlaced
        } else {
            GCellState::Error
        };
    }

    /// Place CROSS pins, already-placed (top-level, boundary-fixed) pins
    /// first so a neighbor GCell's mirrored claim has something to latch
    /// onto. `neighbors_by_metal` holds, per metal this GCell routes, handles
    /// to the up-to-four adjacent GCells' grids on that same metal.
    pub fn setup_cross_pins(&mut self, design: &Design, neighbors_by_metal: &HashMap<Metal, Neighbors>) {
        self.cross_pins.sort_by_key(|cp| std::cmp::Reverse(design.pin(cp.pin).is_top_level()));

        let empty = Neighbors::default();
        let pins = std::mem::take(&mut self.cross_pins);
        for cp in pins {
            let net_name = design.net(cp.net).name.clone();
            let same_net_nodes = self
                .claimed
                .get(&(cp.metal, cp.net))
                .cloned()
                .unwrap_or_default();
            let neighbors = neighbors_by_metal.get(&cp.metal).unwrap_or(&empty);

            let Some(apg) = self.apgs.get_mut(&cp.metal) else {
                self.errors.push(RoutingError::CrossPinUnplaceable {
                    net: net_name,
                    pin: format!("{:?}", cp.pin),
                });
                continue;
            };
            match apg.add_cross_pin(&net_name, cp.pin, &cp.rect, neighbors, &same_net_nodes) {
                Ok((x, y)) => self.record_placement(cp.pin, cp.net, cp.metal, x, y),
                Err(e) => {
                    log_warn!("gcell ({},{}) net {}: {e}", self.gx, self.gy, net_name);
                    self.errors.push(e);
                }
            }
            self.absorb_net_bounds(cp.net);
        }

        self.state = if self.errors.is_empty() {
            GCellState::CrossPlaced
        } else {
            GCellState::Error
        };
    }

    /// Synthesize and place BETWEEN_STACKS bridge pins for every net whose
    /// placements in this GCell span two adjacent stacks.
    pub fn setup_between_stack_pins(&mut self, design: &Design) {
        let mut touched_stacks: HashMap<NetId, Vec<usize>> = HashMap::new();
        for p in &self.placements {
            let stacks = touched_stacks.entry(p.net).or_default();
            let si = p.metal.stack_index();
            if !stacks.contains(&si) {
                stacks.push(si);
            }
        }

        for (&net_id, stacks) in &touched_stacks {
            let mut sorted = stacks.clone();
            sorted.sort_unstable();
            let net_name = design.net(net_id).name.clone();
            let Some(&representative) = self
                .placements
                .iter()
                .find(|p| p.net == net_id)
                .map(|p| &p.pin)
            else {
                continue;
            };

            for w in sorted.windows(2) {
                let (lo_stack, hi_stack) = (w[0], w[1]);
                if hi_stack != lo_stack + 1 {
                    continue;
                }
                let Some(bottom_metal) = routing_metal_at(2 * lo_stack + 1) else {
                    continue;
                };
                let Some(top_metal) = routing_metal_at(2 * (lo_stack + 1)) else {
                    continue;
                };
                if !self.apgs.contains_key(&bottom_metal) || !self.apgs.contains_key(&top_metal) {
                    continue;
                }

                let rect = self.bridge_rect(net_id, top_metal);

                let bottom = ClassifiedPin {
                    pin: representative,
                    net: net_id,
                    metal: bottom_metal,
                    rect,
                };
                let top = ClassifiedPin {
                    pin: representative,
                    net: net_id,
                    metal: top_metal,
                    rect,
                };

                for side in [&bottom, &top] {
                    let same_net_nodes = self
                        .claimed
                        .get(&(side.metal, side.net))
                        .cloned()
                        .unwrap_or_default();
                    let Some(apg) = self.apgs.get_mut(&side.metal) else {
                        continue;
                    };
                    match apg.add_between_stack_pin(&net_name, side.pin, &side.rect, &same_net_nodes) {
                        Ok((x, y)) => self.record_placement(side.pin, side.net, side.metal, x, y),
                        Err(e) => {
                            log_warn!("gcell ({},{}) net {}: {e}", self.gx, self.gy, net_name);
                            self.errors.push(e);
                        }
                    }
                }
                self.between_stack_pins.push((bottom, top));
            }
        }

        self.state = if self.errors.is_empty() {
            GCellState::BetweenStacksPlaced
        } else {
            GCellState::Error
        };
    }

    fn bridge_rect(&self, net_id: NetId, top_metal: Metal) -> Rect {
        let step = self.apgs.get(&top_metal).map_or(0.0, |a| a.x_grid.step);
        let (xl, yl, xh, yh) = self
            .net_bounds
            .get(&net_id)
            .copied()
            .unwrap_or((self.bounds.xl, self.bounds.yl, self.bounds.xh, self.bounds.yh));
        let padded = Rect::new(xl - step, yl - step, xh + step, yh + step);
        padded.clip_to(&self.bounds).unwrap_or(padded)
    }

    /// Build each stack this GCell actually uses: its matrix obstacles come
    /// from the two metals' access-point grids, its terminals from every
    /// placement landing on either of its two metals.
    pub fn realize_stacks(&mut self, design: &Design) {
        let mut stack_indices: Vec<usize> = self.placements.iter().map(|p| p.metal.stack_index()).collect();
        stack_indices.sort_unstable();
        stack_indices.dedup();

        for si in stack_indices {
            let Some(lo_metal) = routing_metal_at(2 * si) else { continue };
            let Some(hi_metal) = routing_metal_at(2 * si + 1) else { continue };
            let Some(lo_apg) = self.apgs.get(&lo_metal) else { continue };
            let Some(hi_apg) = self.apgs.get(&hi_metal) else { continue };

            let mut stack = Stack::new(lo_metal, hi_metal, lo_apg.x_grid, lo_apg.y_grid);

            for (x, y) in lo_apg.get_obstacles() {
                stack.add_obstacle(&Rect::new(x, y, x, y), Plane::Lo);
            }
            for (x, y) in hi_apg.get_obstacles() {
                stack.add_obstacle(&Rect::new(x, y, x, y), Plane::Hi);
            }

            for p in self.placements.iter().filter(|p| p.metal.stack_index() == si) {
                if let Err(e) = stack.add_terminal(p.pin, p.metal, p.x, p.y) {
                    log_warn!(
                        "gcell ({},{}) net {}: {e}",
                        self.gx,
                        self.gy,
                        design.net(p.net).name
                    );
                    self.errors.push(e);
                }
            }

            stack.build_graph();
            self.stacks.insert(si, stack);
        }

        self.state = if self.errors.is_empty() {
            GCellState::StacksRealized
        } else {
            GCellState::Error
        };
    }

    pub fn stacks(&self) -> &HashMap<usize, Stack> {
        &self.stacks
    }

    pub fn stacks_mut(&mut self) -> &mut HashMap<usize, Stack> {
        &mut self.stacks
    }

    /// Every net that placed a terminal into stack `si`, mapped to its pins.
    pub fn net_terminals(&self, si: usize) -> HashMap<NetId, Vec<PinId>> {
        let mut out: HashMap<NetId, Vec<PinId>> = HashMap::new();
        for p in self.placements.iter().filter(|p| p.metal.stack_index() == si) {
            out.entry(p.net).or_default().push(p.pin);
        }
        out
    }

    fn record_placement(&mut self, pin: PinId, net: NetId, metal: Metal, x: f64, y: f64) {
        self.placements.push(PlacedPin { pin, net, metal, x, y });
        if let Some(apg) = self.apgs.get(&metal) {
            let xi = apg.x_grid.nearest_index(x).max(0) as usize;
            let yi = apg.y_grid.nearest_index(y).max(0) as usize;
            self.claimed.entry((metal, net)).or_default().push((xi, yi));
        }
    }

    fn absorb_net_bounds(&mut self, net: NetId) {
        let Some(&PlacedPin { x, y, .. }) = self.placements.last() else {
            return;
        };
        self.net_bounds
            .entry(net)
            .and_modify(|(xl, yl, xh, yh)| {
                *xl = xl.min(x);
                *yl = yl.min(y);
                *xh = xh.max(x);
                *yh = yh.max(y);
            })
            .or_insert((x, y, x, y));
    }
}

fn candidate_count(apgs: &HashMap<Metal, AccessPointGrid>, cp: &ClassifiedPin) -> usize {
    let Some(apg) = apgs.get(&cp.metal) else {
        return 0;
    };
    let xl = apg.x_grid.nearest_index(cp.rect.xl);
    let xh = apg.x_grid.nearest_index(cp.rect.xh);
    let yl = apg.y_grid.nearest_index(cp.rect.yl);
    let yh = apg.y_grid.nearest_index(cp.rect.yh);
    ((xh - xl).unsigned_abs() as usize + 1) * ((yh - yl).unsigned_abs() as usize + 1)
}

/// Sub-grid of `global`'s track lines falling inside `[lo, hi]`.
fn local_axis(global: &AxisGrid, lo: f64, hi: f64) -> AxisGrid {
    if global.count == 0 || global.step == 0.0 {
        return AxisGrid::new(lo, (hi - lo).max(1.0), 1);
    }
    let first = global.nearest_index(lo);
    let last = global.nearest_index(hi);
    let count = ((last - first).unsigned_abs() as usize) + 1;
    AxisGrid::new(global.line(first.min(last)), global.step, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{Net, Pin, Port};
    use crate::grid::TrackGrid;
    use crate::metal::PinUse;

    fn design_with_nets(pins: Vec<Pin>, nets: Vec<Net>) -> Design {
        let mut tracks = TrackGrid::new();
        tracks.horizontal.insert(Metal::M1, AxisGrid::new(0.0, 10.0, 20));
        tracks.vertical.insert(Metal::M1, AxisGrid::new(0.0, 10.0, 20));
        tracks.horizontal.insert(Metal::M2, AxisGrid::new(0.0, 10.0, 20));
        tracks.vertical.insert(Metal::M2, AxisGrid::new(0.0, 10.0, 20));
        Design {
            die_area: Rect::new(0.0, 0.0, 200.0, 200.0),
            gcell_grid_x: None,
            gcell_grid_y: None,
            tracks,
            components: Vec::new(),
            pins,
            nets,
        }
    }

    fn inner_pin(name: &str, net: NetId, rect: Rect) -> Pin {
        Pin {
            name: name.to_string(),
            component: None,
            net: Some(net),
            use_kind: PinUse::Signal,
            ports: vec![Port { metal: Metal::M1, rect }],
        }
    }

    #[test]
    fn classifies_inner_vs_cross_by_degenerate_port() {
        let net = NetId(0);
        let pins = vec![
            inner_pin("p0", net, Rect::new(10.0, 10.0, 30.0, 30.0)),
            inner_pin("p1", net, Rect::new(50.0, 50.0, 50.0, 50.0)),
        ];
        let nets = vec![Net {
            name: "n1".to_string(),
            pins: vec![PinId(0), PinId(1)],
        }];
        let design = design_with_nets(pins, nets);
        let mut gcell = GCell::new(0, 0, Rect::new(0.0, 0.0, 100.0, 100.0), &[Metal::M1, Metal::M2], &design);
        gcell.setup_global_obstacles(&design);
        assert_eq!(gcell.inner_pins.len(), 1);
        assert_eq!(gcell.cross_pins.len(), 1);
    }

    #[test]
    fn inner_pin_places_without_escalation() {
        let net = NetId(0);
        let pins = vec![inner_pin("p0", net, Rect::new(10.0, 10.0, 30.0, 30.0))];
        let nets = vec![Net {
            name: "n1".to_string(),
            pins: vec![PinId(0)],
        }];
        let design = design_with_nets(pins, nets);
        let mut gcell = GCell::new(0, 0, Rect::new(0.0, 0.0, 100.0, 100.0), &[Metal::M1, Metal::M2], &design);
        gcell.setup_global_obstacles(&design);
        gcell.setup_inner_pins(&design);
        assert_eq!(gcell.state, GCellState::InnerPlaced);
        assert_eq!(gcell.placements.len(), 1);
    }

    #[test]
    fn realize_stacks_builds_graph_for_touched_stack() {
        let net = NetId(0);
        let pins = vec![
            inner_pin("p0", net, Rect::new(10.0, 10.0, 30.0, 30.0)),
            inner_pin("p1", net, Rect::new(60.0, 10.0, 80.0, 30.0)),
        ];
        let nets = vec![Net {
            name: "n1".to_string(),
            pins: vec![PinId(0), PinId(1)],
        }];
        let design = design_with_nets(pins, nets);
        let mut gcell = GCell::new(0, 0, Rect::new(0.0, 0.0, 100.0, 100.0), &[Metal::M1, Metal::M2], &design);
        gcell.setup_global_obstacles(&design);
        gcell.setup_inner_pins(&design);
        gcell.setup_cross_pins(&design, &HashMap::new());
        gcell.setup_between_stack_pins(&design);
        gcell.realize_stacks(&design);
        assert_eq!(gcell.state, GCellState::StacksRealized);
        assert_eq!(gcell.stacks().len(), 1);
        let terminals = gcell.net_terminals(0);
        assert_eq!(terminals.get(&net).map(|v| v.len()), Some(2));
    }
}
