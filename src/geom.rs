// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Axis-aligned geometry kernel.
//!
//! `original_source/Src/Include/Geometry.hpp` wraps Clipper2 polygon boolean
//! ops behind operator overloads (`operator+` union, `operator-` intersect,
//! `operator/` intersects-test). Detailed-routing geometry here never needs
//! general polygons, only axis-aligned rectangles, so this reimplements the
//! same small operation set directly instead of pulling in a polygon-clipping
//! dependency. Operators become plain functions per the pure-function
//! re-architecture direction.

pub const EPSILON: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// An axis-aligned rectangle, normalized so `lo <= hi` on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub xl: f64,
    pub yl: f64,
    pub xh: f64,
    pub yh: f64,
}

impl Rect {
    pub fn new(xl: f64, yl: f64, xh: f64, yh: f64) -> Self {
        Rect {
            xl: xl.min(xh),
            yl: yl.min(yh),
            xh: xl.max(xh),
            yh: yl.max(yh),
        }
    }

    pub fn width(&self) -> f64 {
        self.xh - self.xl
    }

    pub fn height(&self) -> f64 {
        self.yh - self.yl
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::new((self.xl + self.xh) / 2.0, (self.yl + self.yh) / 2.0)
    }

    /// Translate this rectangle by `(dx, dy)`.
    pub fn move_by(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.xl + dx, self.yl + dy, self.xh + dx, self.yh + dy)
    }

    /// Scale in place around the origin.
    pub fn scale_by(&self, sx: f64, sy: f64) -> Rect {
        Rect::new(self.xl * sx, self.yl * sy, self.xh * sx, self.yh * sy)
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.xl - EPSILON
            && p.x <= self.xh + EPSILON
            && p.y >= self.yl - EPSILON
            && p.y <= self.yh + EPSILON
    }

    /// True if the two rectangles overlap with positive area (touching edges
    /// do not count), matching `Polygon::operator/` used for overlap tests in
    /// `GCell::find_overlaps`.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.xl < other.xh - EPSILON
            && other.xl < self.xh - EPSILON
            && self.yl < other.yh - EPSILON
            && other.yl < self.yh - EPSILON
    }

    /// Intersection rectangle, or `None` if the rectangles don't overlap.
    /// Corresponds to `Polygon::operator-`.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let xl = self.xl.max(other.xl);
        let yl = self.yl.max(other.yl);
        let xh = self.xh.min(other.xh);
        let yh = self.yh.min(other.yh);
        if xh - xl > EPSILON && yh - yl > EPSILON {
            Some(Rect::new(xl, yl, xh, yh))
        } else {
            None
        }
    }

    /// Bounding-box union. Corresponds to `Polygon::operator+`; unlike the
    /// original's Clipper2 union this does not track concave shapes, which
    /// the routing core never needs for its axis-aligned pin/obstacle boxes.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.xl.min(other.xl),
            self.yl.min(other.yl),
            self.xh.max(other.xh),
            self.yh.max(other.yh),
        )
    }

    /// Clip this rectangle to fit inside `bounds`, or `None` if disjoint.
    pub fn clip_to(&self, bounds: &Rect) -> Option<Rect> {
        self.intersect(bounds)
    }

    pub fn extreme_points(&self) -> (Point, Point) {
        (Point::new(self.xl, self.yl), Point::new(self.xh, self.yh))
    }
}
