// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! CLI driver: the Rust analogue of `original_source`'s `main.cpp`, minus
//! the PNG/GUI emission `spec.md` scopes out as an external collaborator.
//! Reads a project config, parses LEF/DEF/guide, runs the routing
//! `Pipeline`, and writes each stack's encoded cost-map tensors to an
//! output directory.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use layout_router::config::read_config;
use layout_router::def::DefReader;
use layout_router::error::RoutingError;
use layout_router::guide::parse_guide;
use layout_router::lef::LefReader;
use layout_router::logging::{log_fail, log_info, log_pass};
use layout_router::{design, logging, Pipeline};

fn run(config_path: &Path) -> Result<(), RoutingError> {
    let config = read_config(config_path)?;

    let pdk_path = config
        .pdk_path()
        .ok_or_else(|| RoutingError::InputMalformed("config missing [PDK] PATH".to_string()))?;
    let design_path = config
        .design_path()
        .ok_or_else(|| RoutingError::InputMalformed("config missing [DESIGN] PATH".to_string()))?;
    let guide_path = config.guide_path();

    let lef = LefReader::new().read(pdk_path)?;
    let def = DefReader::new().read(design_path)?;
    let design = design::build_design(&def, &lef)?;

    let guide = match guide_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|_| RoutingError::InputNotFound(path.to_string()))?;
            parse_guide(&text)?
        }
        None => Default::default(),
    };

    let mut pipeline = Pipeline::new(design, guide, config.grid_quantum);
    let (gx, gy) = pipeline.grid_size();
    log_info!("built {gx}x{gy} GCell grid, routing...");

    let (summary, emissions) = pipeline.run();

    log_info!(
        "{} gcells, {} errored, {} nets routed, {} nets failed",
        summary.gcells_total, summary.gcells_errored, summary.nets_routed, summary.nets_failed
    );
    log_info!(
        "verify: overall={:.3} general={:.3}",
        summary.verify_overall, summary.verify_general
    );

    let out_dir = config
        .section("OUTPUT")
        .and_then(|s| s.get("PATH"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./routing-out"));
    std::fs::create_dir_all(&out_dir)
        .map_err(|e| RoutingError::InputMalformed(format!("creating {}: {e}", out_dir.display())))?;

    for emission in &emissions {
        let file_name = format!(
            "gcell_{}_{}_stack{}_{}.tensor",
            emission.gx, emission.gy, emission.stack_index, emission.net
        );
        let file_path = out_dir.join(file_name);
        let file = std::fs::File::create(&file_path)
            .map_err(|e| RoutingError::InputMalformed(format!("creating {}: {e}", file_path.display())))?;
        emission
            .cost_maps
            .write_to(file)
            .map_err(|e| RoutingError::InputMalformed(format!("writing {}: {e}", file_path.display())))?;
    }
    log_pass!("wrote {} cost-map tensors to {}", emissions.len(), out_dir.display());

    Ok(())
}

fn main() -> ExitCode {
    logging::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "routing.ini".to_string());

    match run(Path::new(&config_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_fail!("{e}");
            ExitCode::FAILURE
        }
    }
}
