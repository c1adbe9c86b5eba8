// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Metal layer classification shared across the geometry, grid, and routing
//! modules.
//!
//! Layers alternate between routing layers and the vias that connect them:
//! `L1, L1M1_V, M1, M1M2_V, M2, ..., M9`. Even positions in this ordering are
//! via layers; odd positions are routing layers. Parity of a routing layer's
//! position further decides its preferred routing direction (horizontal for
//! even-indexed routing layers, vertical for odd).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metal {
    None,
    L1,
    L1M1V,
    M1,
    M1M2V,
    M2,
    M2M3V,
    M3,
    M3M4V,
    M4,
    M4M5V,
    M5,
    M5M6V,
    M6,
    M6M7V,
    M7,
    M7M8V,
    M8,
    M8M9V,
    M9,
}

impl Metal {
    /// Ordinal position in the `NONE, L1, L1M1_V, M1, ...` sequence, matching
    /// the discrete ordering `spec.md` §3 describes.
    pub fn ordinal(self) -> u8 {
        match self {
            Metal::None => 0,
            Metal::L1 => 1,
            Metal::L1M1V => 2,
            Metal::M1 => 3,
            Metal::M1M2V => 4,
            Metal::M2 => 5,
            Metal::M2M3V => 6,
            Metal::M3 => 7,
            Metal::M3M4V => 8,
            Metal::M4 => 9,
            Metal::M4M5V => 10,
            Metal::M5 => 11,
            Metal::M5M6V => 12,
            Metal::M6 => 13,
            Metal::M6M7V => 14,
            Metal::M7 => 15,
            Metal::M7M8V => 16,
            Metal::M8 => 17,
            Metal::M8M9V => 18,
            Metal::M9 => 19,
        }
    }

    pub fn from_ordinal(ord: u8) -> Option<Metal> {
        Some(match ord {
            0 => Metal::None,
            1 => Metal::L1,
            2 => Metal::L1M1V,
            3 => Metal::M1,
            4 => Metal::M1M2V,
            5 => Metal::M2,
            6 => Metal::M2M3V,
            7 => Metal::M3,
            8 => Metal::M3M4V,
            9 => Metal::M4,
            10 => Metal::M4M5V,
            11 => Metal::M5,
            12 => Metal::M5M6V,
            13 => Metal::M6,
            14 => Metal::M6M7V,
            15 => Metal::M7,
            16 => Metal::M7M8V,
            17 => Metal::M8,
            18 => Metal::M8M9V,
            19 => Metal::M9,
            _ => return None,
        })
    }

    /// `(ordinal - 1) / 2 - 1` from `original_source/Src/Include/DEF/AccessPointGrid.hpp`:
    /// the zero-based index of a *routing* metal among M1..M9. Only
    /// meaningful for routing layers (odd ordinal, >= M1).
    pub fn routing_index(self) -> usize {
        ((self.ordinal() as isize - 1) / 2 - 1).max(0) as usize
    }

    /// Even routing index => prefers horizontal tracks (z = 0 plane);
    /// odd => vertical (z = 1 plane). Matches `spec.md` §3.
    pub fn is_horizontal(self) -> bool {
        self.routing_index() % 2 == 0
    }

    pub fn is_vertical(self) -> bool {
        !self.is_horizontal()
    }

    /// Next routing metal two steps up in the ordinal sequence (skips the via
    /// layer in between), used by the inner-pin metal-escalation retry in
    /// `gcell::setup_inner_pins`.
    pub fn next_routing_metal(self) -> Option<Metal> {
        Metal::from_ordinal(self.ordinal() + 2)
    }

    /// Which stack (pair of routing layers `L_{2k+1}/L_{2k+2}`) this metal
    /// belongs to, per `spec.md` §3/§4.5.
    pub fn stack_index(self) -> usize {
        self.routing_index() / 2
    }

    /// Parse a PDK layer name such as `"li1"`, `"metal3"`, `"via2"` into a
    /// `Metal`. Layer-naming conventions vary across PDKs; this follows the
    /// common SkyWater/ASAP-style convention the original source assumes
    /// (`li1` = local interconnect = `L1`; `metalN` = `MN`; `viaN` = the via
    /// between `MN` and `M(N+1)`, with `via0`/`li1m1` = the L1-M1 via).
    pub fn parse(name: &str) -> Option<Metal> {
        let lower = name.trim().to_ascii_lowercase();
        let lower = lower.as_str();

        if lower == "li1" || lower == "l1" || lower == "licon1" {
            return Some(Metal::L1);
        }

        if let Some(rest) = lower.strip_prefix("metal") {
            return Self::parse_indexed_metal(rest);
        }
        if let Some(rest) = lower.strip_prefix('m') {
            if rest.chars().all(|c| c.is_ascii_digit()) && !rest.is_empty() {
                return Self::parse_indexed_metal(rest);
            }
        }

        if let Some(rest) = lower.strip_prefix("via") {
            return Self::parse_indexed_via(rest);
        }
        if lower == "l1m1_v" || lower == "mcon" {
            return Some(Metal::L1M1V);
        }

        None
    }

    fn parse_indexed_metal(digits: &str) -> Option<Metal> {
        let n: u8 = digits.parse().ok()?;
        if n == 0 || n > 9 {
            return None;
        }
        Metal::from_ordinal(1 + 2 * n)
    }

    fn parse_indexed_via(digits: &str) -> Option<Metal> {
        let n: u8 = digits.parse().ok()?;
        // via0 connects L1-M1; viaN (N>=1) connects MN-M(N+1).
        if n == 0 {
            return Some(Metal::L1M1V);
        }
        if n > 8 {
            return None;
        }
        Metal::from_ordinal(2 + 2 * n)
    }
}

impl fmt::Display for Metal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Component placement orientation, per `spec.md` §6 Design input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    N,
    E,
    S,
    W,
    FN,
    FE,
    FS,
    FW,
}

impl Orientation {
    pub fn parse(name: &str) -> Option<Orientation> {
        Some(match name.trim().to_ascii_uppercase().as_str() {
            "N" => Orientation::N,
            "E" => Orientation::E,
            "S" => Orientation::S,
            "W" => Orientation::W,
            "FN" => Orientation::FN,
            "FE" => Orientation::FE,
            "FS" => Orientation::FS,
            "FW" => Orientation::FW,
            _ => return None,
        })
    }

    /// Transform a point relative to a macro origin under this orientation,
    /// with `size` the macro's (width, height) bounding box. Rotation and
    /// mirroring follow the standard DEF/LEF orientation convention.
    pub fn transform(self, p: (f64, f64), size: (f64, f64)) -> (f64, f64) {
        let (x, y) = p;
        let (w, h) = size;
        match self {
            Orientation::N => (x, y),
            Orientation::S => (w - x, h - y),
            Orientation::E => (y, w - x),
            Orientation::W => (h - y, x),
            Orientation::FN => (w - x, y),
            Orientation::FS => (x, h - y),
            Orientation::FE => (y, x),
            Orientation::FW => (h - y, w - x),
        }
    }
}

/// Pin usage classification, per `spec.md` §6: only SIGNAL and CLOCK pins
/// participate in detailed routing; POWER/GROUND polygons become obstacles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinUse {
    Signal,
    Clock,
    Power,
    Ground,
    Other,
}

impl PinUse {
    pub fn parse(name: &str) -> PinUse {
        match name.trim().to_ascii_uppercase().as_str() {
            "SIGNAL" => PinUse::Signal,
            "CLOCK" => PinUse::Clock,
            "POWER" => PinUse::Power,
            "GROUND" => PinUse::Ground,
            _ => PinUse::Other,
        }
    }

    pub fn is_routable(self) -> bool {
        matches!(self, PinUse::Signal | PinUse::Clock)
    }
}
