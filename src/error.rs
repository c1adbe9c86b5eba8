// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Closed error taxonomy for the routing pipeline.
//!
//! Per-GCell placement/routing failures (`PinUnplaceable`, `RoutingInfeasible`,
//! ...) are recoverable: the pipeline logs them and continues with the next
//! GCell. Only the input-stage variants are fatal to the whole run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("input file not found: {0}")]
    InputNotFound(String),

    #[error("input file malformed: {0}")]
    InputMalformed(String),

    #[error("pin {pin} of net {net} could not be placed on an access point")]
    PinUnplaceable { net: String, pin: String },

    #[error("cross-stack pin {pin} of net {net} could not be placed")]
    CrossPinUnplaceable { net: String, pin: String },

    #[error("no shared access point found between stacks for net {net}")]
    BetweenStackUnplaceable { net: String },

    #[error("gcell ({x}, {y}) has no access points on layer {layer}")]
    NoAccessPoints { x: i64, y: i64, layer: String },

    #[error("net {net} could not be fully routed: {reason}")]
    RoutingInfeasible { net: String, reason: String },
}

impl RoutingError {
    /// Fatal errors abort the whole pipeline; all other variants are
    /// recoverable at the GCell/net level and only degrade the result.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RoutingError::InputNotFound(_) | RoutingError::InputMalformed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RoutingError>;
