// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Track-grid projection.
//!
//! Grounded on `original_source/Src/Include/DEF/Utils.hpp`: `MetalGrid` is a
//! `(start, end, step)` triple describing one metal's track lines along one
//! axis; `project` rounds an arbitrary coordinate to the nearest track line
//! and clamps to range; `project_down` repeats that projection layer by
//! layer from a source metal down to a target metal, so a point escalated to
//! a higher layer can be brought back down onto every intermediate layer's
//! own track grid.

use crate::metal::Metal;
use std::collections::BTreeMap;

/// One axis's evenly spaced track (or GCell) lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisGrid {
    pub start: f64,
    pub step: f64,
    pub count: usize,
}

impl AxisGrid {
    pub fn new(start: f64, step: f64, count: usize) -> Self {
        AxisGrid { start, step, count }
    }

    pub fn end(&self) -> f64 {
        if self.count == 0 {
            self.start
        } else {
            self.start + self.step * (self.count - 1) as f64
        }
    }

    pub fn line(&self, index: i64) -> f64 {
        self.start + self.step * index as f64
    }

    /// Index of the nearest line to `coord`, clamped to `[0, count - 1]`.
    pub fn nearest_index(&self, coord: f64) -> i64 {
        if self.count == 0 || self.step == 0.0 {
            return 0;
        }
        let raw = ((coord - self.start) / self.step).round() as i64;
        raw.clamp(0, self.count as i64 - 1)
    }

    /// Project an arbitrary coordinate onto the nearest line, clamped to
    /// range. Corresponds to `Utils.hpp`'s `project<Tp>`.
    pub fn project(&self, coord: f64) -> f64 {
        self.line(self.nearest_index(coord))
    }
}

/// Per-metal track grids along both axes, built from the DEF `TRACKS`
/// statements (falling back to the GCell grid when a layer has no explicit
/// tracks, matching how `original_source` treats sparse PDK layers).
#[derive(Debug, Clone, Default)]
pub struct TrackGrid {
    pub horizontal: BTreeMap<Metal, AxisGrid>,
    pub vertical: BTreeMap<Metal, AxisGrid>,
    pub gcell_x: Option<AxisGrid>,
    pub gcell_y: Option<AxisGrid>,
}

impl TrackGrid {
    pub fn new() -> Self {
        Self::default()
    }

    fn axis_for(&self, metal: Metal, axis_is_x: bool) -> Option<&AxisGrid> {
        let grid = if axis_is_x {
            self.vertical.get(&metal)
        } else {
            self.horizontal.get(&metal)
        };
        grid.or(if axis_is_x {
            self.gcell_x.as_ref()
        } else {
            self.gcell_y.as_ref()
        })
    }

    /// Snap `(x, y)` onto `metal`'s nearest track intersection.
    pub fn project(&self, metal: Metal, x: f64, y: f64) -> (f64, f64) {
        let px = self.axis_for(metal, true).map_or(x, |g| g.project(x));
        let py = self.axis_for(metal, false).map_or(y, |g| g.project(y));
        (px, py)
    }

    /// Project `(x, y)` down through every routing metal strictly between
    /// `to` and `from` (inclusive of both ends), snapping to each layer's
    /// own grid in turn. Mirrors `Utils.hpp`'s `project_down<Tp>` walking an
    /// ordered grid map from the source metal to the base metal.
    pub fn project_down(&self, from: Metal, to: Metal, x: f64, y: f64) -> (f64, f64) {
        let (mut px, mut py) = (x, y);
        let (lo, hi) = if from.ordinal() <= to.ordinal() {
            (from, to)
        } else {
            (to, from)
        };
        let mut ord = hi.ordinal();
        while ord >= lo.ordinal() {
            if let Some(metal) = Metal::from_ordinal(ord) {
                let (nx, ny) = self.project(metal, px, py);
                px = nx;
                py = ny;
            }
            if ord == 0 {
                break;
            }
            ord -= 1;
        }
        (px, py)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_index_clamps_to_range() {
        let g = AxisGrid::new(0.0, 10.0, 5);
        assert_eq!(g.nearest_index(-100.0), 0);
        assert_eq!(g.nearest_index(1000.0), 4);
        assert_eq!(g.nearest_index(24.0), 2);
    }

    #[test]
    fn project_rounds_to_nearest_line() {
        let g = AxisGrid::new(0.0, 10.0, 5);
        assert_eq!(g.project(23.0), 20.0);
        assert_eq!(g.project(26.0), 30.0);
    }

    #[test]
    fn track_grid_falls_back_to_gcell_grid() {
        let mut tg = TrackGrid::new();
        tg.gcell_x = Some(AxisGrid::new(0.0, 100.0, 10));
        tg.gcell_y = Some(AxisGrid::new(0.0, 100.0, 10));
        let (x, y) = tg.project(Metal::M1, 140.0, 260.0);
        assert_eq!((x, y), (100.0, 300.0));
    }
}
