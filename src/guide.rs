// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Guide-file reader: the externally produced coarse routing plan that
//! assigns each net to a sequence of GCells and metals.
//!
//! Grounded on `original_source/Src/Library/Guide.cpp`/`Src/Include/Guide.hpp`.
//! Format: per-net entries delimited by `(` and `)`, each line after the net
//! name header holding `xl yl xh yh metal_name` in design units. The default
//! grid quantum dividing design units into base-grid cells is 6900, matching
//! the original's `left = min(x1, x2) / 6900` normalization.

use crate::error::{Result, RoutingError};
use crate::geom::Rect;
use crate::metal::Metal;

pub const DEFAULT_GRID_QUANTUM: f64 = 6900.0;

#[derive(Debug, Clone)]
pub struct GuideBox {
    pub rect: Rect,
    pub metal: Metal,
}

#[derive(Debug, Clone)]
pub struct GuideNet {
    pub name: String,
    pub boxes: Vec<GuideBox>,
}

#[derive(Debug, Clone, Default)]
pub struct Guide {
    pub nets: Vec<GuideNet>,
}

impl Guide {
    pub fn net(&self, name: &str) -> Option<&GuideNet> {
        self.nets.iter().find(|n| n.name == name)
    }
}

/// Parse a guide stream. Lines are free-form whitespace-separated tokens;
/// `(` opens a net entry (the preceding bare identifier line is the net
/// name), `)` closes it. An entirely empty line also ends the stream, since
/// the original format is not required to close its last `)`.
pub fn parse_guide(input: &str) -> Result<Guide> {
    let mut nets = Vec::new();
    let mut current_name: Option<String> = None;
    let mut current_boxes: Vec<GuideBox> = Vec::new();

    for raw_line in input.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            break;
        }
        if line == "(" {
            continue;
        }
        if line == ")" {
            if let Some(name) = current_name.take() {
                nets.push(GuideNet {
                    name,
                    boxes: std::mem::take(&mut current_boxes),
                });
            }
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() == 1 {
            current_name = Some(parts[0].to_string());
            continue;
        }
        if parts.len() < 5 {
            return Err(RoutingError::InputMalformed(format!(
                "malformed guide line: {line}"
            )));
        }

        let (x1, y1, x2, y2) = match (
            parts[0].parse::<f64>(),
            parts[1].parse::<f64>(),
            parts[2].parse::<f64>(),
            parts[3].parse::<f64>(),
        ) {
            (Ok(a), Ok(b), Ok(c), Ok(d)) => (a, b, c, d),
            _ => {
                return Err(RoutingError::InputMalformed(format!(
                    "non-numeric guide coordinates: {line}"
                )))
            }
        };
        let metal = Metal::parse(parts[4]).ok_or_else(|| {
            RoutingError::InputMalformed(format!("unknown guide metal: {}", parts[4]))
        })?;

        current_boxes.push(GuideBox {
            rect: Rect::new(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)),
            metal,
        });
    }

    if let Some(name) = current_name {
        nets.push(GuideNet {
            name,
            boxes: current_boxes,
        });
    }

    Ok(Guide { nets })
}
