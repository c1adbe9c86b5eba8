// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use std::fs;
use std::path::Path;

use super::{def_parser::parse_def, Def};
use crate::error::{Result, RoutingError};
use crate::logging::{log_fail, log_info, log_load, log_pass, log_warn};

pub struct DefReader;

impl DefReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<Def> {
        let path_str = path.as_ref().display().to_string();
        log_load!("Loading DEF file: {path_str}");

        let content = fs::read_to_string(&path)
            .map_err(|e| RoutingError::InputNotFound(format!("{path_str}: {e}")))?;
        log_info!("DEF file size: {} bytes", content.len());

        match parse_def(&content) {
            Ok((remaining, def)) => {
                log_pass!("DEF parsed successfully!");
                log_info!("Die area points: {}", def.die_area_points.len());
                log_info!("Components: {}", def.components.len());
                log_info!("Pins: {}", def.pins.len());
                log_info!("Nets: {}", def.nets.len());
                if !remaining.trim().is_empty() {
                    log_warn!("Unparsed content remaining: {} chars", remaining.len());
                }
                Ok(def)
            }
            Err(e) => {
                log_fail!("Failed to parse DEF file: {e:?}");
                Err(RoutingError::InputMalformed(format!(
                    "{path_str}: {e:?}"
                )))
            }
        }
    }
}

impl Default for DefReader {
    fn default() -> Self {
        Self::new()
    }
}
