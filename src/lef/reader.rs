// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use std::fs;
use std::path::Path;

use super::Lef;
use crate::error::{Result, RoutingError};
use crate::logging::{log_fail, log_info, log_load, log_pass};

pub struct LefReader;

impl LefReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<Lef> {
        let path_str = path.as_ref().display().to_string();
        log_load!("Loading LEF file: {path_str}");

        let content = fs::read_to_string(&path)
            .map_err(|e| RoutingError::InputNotFound(format!("{path_str}: {e}")))?;
        log_info!("LEF file size: {} bytes", content.len());

        match super::lef_parser::parse_lef(&content) {
            Ok((_, lef)) => {
                log_pass!("LEF parsed successfully!");
                log_info!("Found {} macros with complete PIN geometry data", lef.macros.len());

                let mut total_pins = 0;
                let mut total_rects = 0;
                let mut total_polygons = 0;
                for macro_def in &lef.macros {
                    total_pins += macro_def.pins.len();
                    for pin in &macro_def.pins {
                        for port in &pin.ports {
                            total_rects += port.rects.len();
                            total_polygons += port.polygons.len();
                        }
                    }
                }
                log_info!(
                    "Statistics: {total_pins} pins, {total_rects} rects, {total_polygons} polygons"
                );

                Ok(lef)
            }
            Err(e) => {
                log_fail!("Failed to parse LEF file: {e:?}");
                Err(RoutingError::InputMalformed(format!(
                    "{path_str}: {e:?}"
                )))
            }
        }
    }
}

impl Default for LefReader {
    fn default() -> Self {
        Self::new()
    }
}
