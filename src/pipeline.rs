// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Pipeline orchestrator: the Rust analogue of `original_source`'s `Process`
//! class (`original_source/Src/Include/Process.hpp`), driving the per-design
//! control flow `spec.md` §2 names: *fill GCells → setup obstacles → setup
//! inner pins → setup cross pins → setup between-stack pins → setup stacks →
//! for each stack: route nets (A*) → verify → encode cost maps → emit*.
//!
//! Cross-GCell APG neighbor mirroring is the one place GCells are not fully
//! independent (`spec.md` §5). Rather than holding live `&mut` neighbor
//! references (which the borrow checker cannot express for 4 simultaneous
//! neighbors of a `Vec<GCell>`), each GCell's cross-pin stage reads a cloned
//! snapshot of its neighbors' access-point grids, decides its own claims
//! against that snapshot, and the pipeline then mirrors any claim landing on
//! a shared boundary back into the real neighbor GCells in a second, serial
//! step — the "deferred and reconciled in a serial pass" strategy `spec.md`
//! §5 calls for.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::apg::{AccessPointGrid, Neighbors};
use crate::astar::AStar;
use crate::design::{Design, NetId, PinId};
use crate::encoder::encode_cost_maps;
use crate::gcell::GCell;
use crate::geom::Rect;
use crate::grid::AxisGrid;
use crate::guide::Guide;
use crate::io::tensor::TensorPair;
use crate::logging::{log_fail, log_info};
use crate::metal::Metal;
use crate::verify::{aggregate_scores, verify_batch, NetCheck, PathGrid, VerifyOutcome};

const EDGE_EPS: f64 = 1e-6;

/// One net's routing outcome inside one GCell/stack, logged with the
/// `(gcell_x, gcell_y, net_name, cause)` tuple `spec.md` §7 requires for
/// recoverable errors.
#[derive(Debug, Clone)]
pub struct NetRouteError {
    pub gx: usize,
    pub gy: usize,
    pub net: String,
    pub cause: String,
}

/// One stack's emitted training tensors for one net.
pub struct StackEmission {
    pub gx: usize,
    pub gy: usize,
    pub stack_index: usize,
    pub metal_lo: Metal,
    pub metal_hi: Metal,
    pub net: String,
    pub cost_maps: TensorPair,
}

/// The end-of-run report: counts, recoverable errors, and the verifier's two
/// aggregate scores, mirroring `spec.md` §7's "final pipeline summary".
#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub gcells_total: usize,
    pub gcells_errored: usize,
    pub nets_routed: usize,
    pub nets_failed: usize,
    pub errors: Vec<NetRouteError>,
    pub verify_overall: f64,
    pub verify_general: f64,
}

pub struct Pipeline {
    design: Design,
    guide: Guide,
    width: usize,
    height: usize,
    gcells: Vec<GCell>,
}

impl Pipeline {
    /// Build the GCell grid from the design's `GCELLGRID` axes (falling back
    /// to a single synthetic cell spaced by `grid_quantum` design units when
    /// the DEF carries none), then size one `GCell` per cell.
    pub fn new(design: Design, guide: Guide, grid_quantum: f64) -> Self {
        let die = design.die_area;
        let (gx_axis, gy_axis) = match (&design.gcell_grid_x, &design.gcell_grid_y) {
            (Some(gx), Some(gy)) if gx.count >= 2 && gy.count >= 2 => (*gx, *gy),
            _ => (
                synthetic_axis(die.xl, die.xh, grid_quantum),
                synthetic_axis(die.yl, die.yh, grid_quantum),
            ),
        };

        let width = gx_axis.count.saturating_sub(1).max(1);
        let height = gy_axis.count.saturating_sub(1).max(1);
        let metals = routing_metals(&design);
        let guide_metals = guide_metals_by_box(&guide);

        let mut gcells = Vec::with_capacity(width * height);
        for gy in 0..height {
            let yl = gy_axis.line(gy as i64);
            let yh = gy_axis.line(gy as i64 + 1);
            for gx in 0..width {
                let xl = gx_axis.line(gx as i64);
                let xh = gx_axis.line(gx as i64 + 1);
                let bounds = Rect::new(xl, yl, xh, yh);
                let cell_metals = restrict_to_guide(&metals, &guide_metals, &bounds);
                gcells.push(GCell::new(gx, gy, bounds, &cell_metals, &design));
            }
        }

        Pipeline {
            design,
            guide,
            width,
            height,
            gcells,
        }
    }

    fn index(&self, gx: usize, gy: usize) -> usize {
        gy * self.width + gx
    }

    fn neighbor_indices(&self, gx: usize, gy: usize) -> (Option<usize>, Option<usize>, Option<usize>, Option<usize>) {
        let left = (gx > 0).then(|| self.index(gx - 1, gy));
        let right = (gx + 1 < self.width).then(|| self.index(gx + 1, gy));
        let bottom = (gy > 0).then(|| self.index(gx, gy - 1));
        let top = (gy + 1 < self.height).then(|| self.index(gx, gy + 1));
        (left, right, bottom, top)
    }

    /// Run the full per-design control flow and return the summary plus
    /// every stack's emitted cost-map tensors.
    pub fn run(&mut self) -> (PipelineSummary, Vec<StackEmission>) {
        self.setup_global_obstacles();
        self.setup_inner_pins();
        self.setup_cross_pins();
        self.setup_between_stack_pins();
        self.realize_stacks();
        self.route_verify_and_encode()
    }

    fn setup_global_obstacles(&mut self) {
        let design = &self.design;
        self.gcells.iter_mut().for_each(|g| g.setup_global_obstacles(design));
    }

    fn setup_inner_pins(&mut self) {
        let design = &self.design;
        self.gcells.iter_mut().for_each(|g| g.setup_inner_pins(design));
    }

    /// Cross-pin placement with cross-GCell boundary mirroring, per
    /// `spec.md` §4.3/§8. Processed in row-major (serial) order so each
    /// GCell's mirror snapshot reflects every earlier GCell's final claims,
    /// and its own new boundary claims are mirrored forward immediately.
    fn setup_cross_pins(&mut self) {
        for idx in 0..self.gcells.len() {
            let (gx, gy) = (self.gcells[idx].gx, self.gcells[idx].gy);
            let (left_idx, right_idx, bottom_idx, top_idx) = self.neighbor_indices(gx, gy);

            let metals: Vec<Metal> = self.gcells[idx].metals().copied().collect();
            let mut snapshots: HashMap<Metal, NeighborSnapshot> = HashMap::new();
            for metal in metals {
                snapshots.insert(
                    metal,
                    NeighborSnapshot {
                        left: left_idx.and_then(|i| self.gcells[i].apg(metal)).cloned(),
                        right: right_idx.and_then(|i| self.gcells[i].apg(metal)).cloned(),
                        top: top_idx.and_then(|i| self.gcells[i].apg(metal)).cloned(),
                        bottom: bottom_idx.and_then(|i| self.gcells[i].apg(metal)).cloned(),
                    },
                );
            }
            let neighbors_by_metal: HashMap<Metal, Neighbors> = snapshots
                .iter()
                .map(|(&metal, snap)| (metal, snap.as_neighbors()))
                .collect();

            self.gcells[idx].setup_cross_pins(&self.design, &neighbors_by_metal);

            let bounds = self.gcells[idx].bounds;
            let boundary_claims: Vec<(Metal, f64, f64, PinId)> = self.gcells[idx]
                .placements()
                .iter()
                .filter(|p| {
                    (p.x - bounds.xl).abs() < EDGE_EPS
                        || (p.x - bounds.xh).abs() < EDGE_EPS
                        || (p.y - bounds.yl).abs() < EDGE_EPS
                        || (p.y - bounds.yh).abs() < EDGE_EPS
                })
                .map(|p| (p.metal, p.x, p.y, p.pin))
                .collect();

            for (metal, x, y, pin) in boundary_claims {
                if (x - bounds.xl).abs() < EDGE_EPS {
                    if let Some(i) = left_idx {
                        self.gcells[i].mirror_claim(metal, x, y, pin);
                    }
                }
                if (x - bounds.xh).abs() < EDGE_EPS {
                    if let Some(i) = right_idx {
                        self.gcells[i].mirror_claim(metal, x, y, pin);
                    }
                }
                if (y - bounds.yl).abs() < EDGE_EPS {
                    if let Some(i) = bottom_idx {
                        self.gcells[i].mirror_claim(metal, x, y, pin);
                    }
                }
                if (y - bounds.yh).abs() < EDGE_EPS {
                    if let Some(i) = top_idx {
                        self.gcells[i].mirror_claim(metal, x, y, pin);
                    }
                }
            }
        }
    }

    fn setup_between_stack_pins(&mut self) {
        let design = &self.design;
        self.gcells.iter_mut().for_each(|g| g.setup_between_stack_pins(design));
    }

    fn realize_stacks(&mut self) {
        let design = &self.design;
        self.gcells.iter_mut().for_each(|g| g.realize_stacks(design));
    }

    /// Per `spec.md` §5, GCells route independently once linking is done:
    /// parallelize across GCells, each driving its own stacks' A*/verify/
    /// encode sequence single-threaded (a stack's obstacle set accumulates
    /// net by net and cannot itself be parallelized).
    fn route_verify_and_encode(&mut self) -> (PipelineSummary, Vec<StackEmission>) {
        let design = &self.design;
        let results: Vec<GCellRouteResult> = self
            .gcells
            .par_iter_mut()
            .map(|gcell| route_gcell(gcell, design))
            .collect();

        let mut summary = PipelineSummary {
            gcells_total: results.len(),
            ..Default::default()
        };
        let mut emissions = Vec::new();
        let mut verify_batches: Vec<Vec<(&str, VerifyOutcome)>> = Vec::new();
        let mut owned_batches: Vec<Vec<(String, VerifyOutcome)>> = Vec::new();

        for (_gx, _gy, routed, failed, errors, batches, stack_emissions) in results {
            summary.nets_routed += routed;
            summary.nets_failed += failed;
            if !errors.is_empty() {
                summary.gcells_errored += 1;
            }
            summary.errors.extend(errors);
            owned_batches.extend(batches);
            emissions.extend(stack_emissions);
        }
        for batch in &owned_batches {
            verify_batches.push(batch.iter().map(|(n, o)| (n.as_str(), *o)).collect());
        }
        let (overall, general) = aggregate_scores(&verify_batches);
        summary.verify_overall = overall;
        summary.verify_general = general;

        for err in &summary.errors {
            log_fail!("gcell ({},{}) net {}: {}", err.gx, err.gy, err.net, err.cause);
        }
        log_info!(
            "routed {} nets, {} failed, verify overall={:.3} general={:.3}",
            summary.nets_routed,
            summary.nets_failed,
            summary.verify_overall,
            summary.verify_general
        );

        (summary, emissions)
    }

    pub fn grid_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

struct NeighborSnapshot {
    left: Option<AccessPointGrid>,
    right: Option<AccessPointGrid>,
    top: Option<AccessPointGrid>,
    bottom: Option<AccessPointGrid>,
}

impl NeighborSnapshot {
    fn as_neighbors(&self) -> Neighbors<'_> {
        Neighbors {
            left: self.left.as_ref(),
            right: self.right.as_ref(),
            top: self.top.as_ref(),
            bottom: self.bottom.as_ref(),
        }
    }
}

/// `m.ordinal() % 2 == 1`: every routing-layer (non-via) metal the design's
/// tracks mention, `L1` included.
fn routing_metals(design: &Design) -> Vec<Metal> {
    let mut set: std::collections::BTreeSet<Metal> = design.tracks.horizontal.keys().copied().collect();
    set.extend(design.tracks.vertical.keys().copied());
    set.into_iter().filter(|m| m.ordinal() % 2 == 1).collect()
}

/// Every `(rect, metal)` box the guide assigns to any net, flattened across
/// nets: the guide's "this net uses this metal in this region" record read
/// as a coarse per-region metal mask, per `spec.md` §6's description of the
/// guide as the mechanism that "assigns nets to a coarse grid of rectangular
/// regions".
fn guide_metals_by_box(guide: &Guide) -> Vec<(Rect, Metal)> {
    guide
        .nets
        .iter()
        .flat_map(|net| net.boxes.iter().map(|b| (b.rect, b.metal)))
        .collect()
}

/// Restrict `metals` to the subset the guide actually assigns within
/// `bounds`, when the guide says anything about this region at all. An empty
/// guide (no file given, or no box anywhere near this GCell) leaves `metals`
/// untouched, so the unguided geometric-obstacle classification in
/// `gcell::GCell` is exactly today's behavior.
fn restrict_to_guide(metals: &[Metal], guide_metals: &[(Rect, Metal)], bounds: &Rect) -> Vec<Metal> {
    let overlapping: std::collections::BTreeSet<Metal> = guide_metals
        .iter()
        .filter(|(rect, _)| rect.intersects(bounds))
        .map(|(_, metal)| *metal)
        .collect();
    if overlapping.is_empty() {
        metals.to_vec()
    } else {
        metals.iter().copied().filter(|m| overlapping.contains(m)).collect()
    }
}

fn synthetic_axis(lo: f64, hi: f64, step: f64) -> AxisGrid {
    let step = if step > 0.0 { step } else { 1.0 };
    let span = (hi - lo).max(step);
    let count = (span / step).ceil() as usize + 1;
    AxisGrid::new(lo, step, count.max(2))
}

type GCellRouteResult = (
    usize,
    usize,
    usize,
    usize,
    Vec<NetRouteError>,
    Vec<Vec<(String, VerifyOutcome)>>,
    Vec<StackEmission>,
);

/// Route, verify, and encode every stack this GCell realized.
fn route_gcell(gcell: &mut GCell, design: &Design) -> GCellRouteResult {
    let (gx, gy) = (gcell.gx, gcell.gy);
    let mut routed = 0usize;
    let mut failed = 0usize;
    let mut errors = Vec::new();
    let mut batches = Vec::new();
    let mut emissions = Vec::new();

    let stack_indices: Vec<usize> = gcell.stacks().keys().copied().collect();
    for si in stack_indices {
        let net_pins = gcell.net_terminals(si);
        let mut net_ids: Vec<NetId> = net_pins.keys().copied().collect();
        net_ids.sort_by_key(|n| n.0);

        let stack = gcell.stacks_mut().get_mut(&si).expect("stack index just listed");
        let coords = stack.node_coords_slice().to_vec();
        let (metal_lo, metal_hi) = (stack.metal_lo, stack.metal_hi);
        let (width, height) = (stack.x_grid.count, stack.y_grid.count);

        let terminal_by_pin: HashMap<PinId, usize> = stack.terminal_nodes().collect();
        let mut obstacles: std::collections::HashSet<usize> = std::collections::HashSet::new();
        let mut net_terminal_nodes: HashMap<NetId, Vec<usize>> = HashMap::new();
        let mut net_paths: HashMap<NetId, Vec<usize>> = HashMap::new();
        let mut batch = Vec::new();

        for &net_id in &net_ids {
            let net_name = design.net(net_id).name.clone();
            let terminal_nodes: Vec<usize> = net_pins[&net_id]
                .iter()
                .filter_map(|pin| terminal_by_pin.get(pin).copied())
                .collect();
            net_terminal_nodes.insert(net_id, terminal_nodes.clone());

            if terminal_nodes.len() < 2 {
                routed += 1;
                batch.push((net_name, VerifyOutcome::Connected));
                continue;
            }

            let astar = AStar::new(&stack.graph, &coords);
            match astar.multi_terminal_path(&net_name, &terminal_nodes, &mut obstacles) {
                Ok(path) => {
                    routed += 1;
                    net_paths.insert(net_id, path);
                }
                Err(e) => {
                    failed += 1;
                    errors.push(NetRouteError {
                        gx,
                        gy,
                        net: net_name.clone(),
                        cause: e.to_string(),
                    });
                    batch.push((net_name, VerifyOutcome::Disconnected));
                }
            }
        }

        // Verify every routed net's path independently, in parallel over nets.
        let grids: Vec<(NetId, PathGrid)> = net_paths
            .iter()
            .map(|(&net_id, path)| {
                let node_coords: Vec<(usize, usize, usize)> = path.iter().map(|&n| coords[n]).collect();
                (net_id, PathGrid::from_path(width, height, &node_coords))
            })
            .collect();
        let terminal_sets: Vec<Vec<(usize, usize, usize)>> = grids
            .iter()
            .map(|(net_id, _)| net_terminal_nodes[net_id].iter().map(|&n| coords[n]).collect())
            .collect();
        let checks: Vec<NetCheck> = grids
            .iter()
            .zip(terminal_sets.iter())
            .map(|((net_id, grid), terminals)| NetCheck {
                net: design.net(*net_id).name.as_str(),
                grid,
                terminals: terminals.as_slice(),
            })
            .collect();
        let outcomes = verify_batch(&checks);
        for (name, outcome) in &outcomes {
            batch.push((name.to_string(), *outcome));
        }

        // Encode a cost map per net, obstacles drawn from every *other*
        // net's committed nodes on this stack, per `spec.md` §4.8.
        let all_committed: HashMap<NetId, std::collections::HashSet<(usize, usize, usize)>> = net_paths
            .iter()
            .map(|(&net_id, path)| (net_id, path.iter().map(|&n| coords[n]).collect()))
            .collect();

        for (&net_id, terminal_nodes) in &net_terminal_nodes {
            if terminal_nodes.is_empty() {
                continue;
            }
            let terminals: Vec<(usize, usize, usize)> = terminal_nodes.iter().map(|&n| coords[n]).collect();
            let mut obs: std::collections::HashSet<(usize, usize, usize)> = std::collections::HashSet::new();
            for (&other_net, nodes) in &all_committed {
                if other_net != net_id {
                    obs.extend(nodes.iter().copied());
                }
            }
            let (h, v) = encode_cost_maps(stack.matrix(), &terminals, &obs);
            emissions.push(StackEmission {
                gx,
                gy,
                stack_index: si,
                metal_lo,
                metal_hi,
                net: design.net(net_id).name.clone(),
                cost_maps: TensorPair::from_matrices(&h, &v),
            });
        }

        batches.push(batch);
    }

    if !gcell.errors.is_empty() {
        for e in &gcell.errors {
            errors.push(NetRouteError {
                gx,
                gy,
                net: String::new(),
                cause: format!("{e}"),
            });
        }
    }

    (gx, gy, routed, failed, errors, batches, emissions)
}
