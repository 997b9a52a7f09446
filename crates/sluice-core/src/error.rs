// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Total capacity would exceed what a signed 64-bit excess can hold.
    #[error("Total capacity {total} exceeds 2^63 - 1")]
    CapacityOverflow { total: u128 },

    /// Detected by the verifier; the computation cannot recover from this.
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },
}

pub type Result<T> = std::result::Result<T, FlowError>;
