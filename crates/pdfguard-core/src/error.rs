// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for pdfguard.

use thiserror::Error;

use crate::types::ErrorClass;

/// Top-level error type for all pdfguard operations.
#[derive(Debug, Error)]
pub enum GuardError {
    // -- Overlay / document errors --
    #[error("invalid overlay geometry: {width}x{height}")]
    InvalidGeometry { width: f32, height: f32 },

    #[error("unreadable source document: {0}")]
    UnreadableSource(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    // -- Filesystem --
    #[error("backup failed: {0}")]
    Backup(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    // -- External helper --
    #[error("helper command failed: {0}")]
    Helper(String),

    #[error("helper command timed out after {0}s")]
    HelperTimeout(u64),

    // -- Configuration --
    #[error("invalid protection policy: {0}")]
    InvalidPolicy(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GuardError>;

/// Classify a `GuardError` for outcome reporting.
///
/// Nothing is retried automatically; the class only tells the operator whether
/// re-running the batch could plausibly change the result.
pub fn classify_error(err: &GuardError) -> ErrorClass {
    match err {
        GuardError::InvalidGeometry { .. } => ErrorClass::Permanent,
        GuardError::UnreadableSource(_) => ErrorClass::Permanent,
        GuardError::Encryption(_) => ErrorClass::Permanent,
        GuardError::InvalidPolicy(_) => ErrorClass::Permanent,
        GuardError::Config(_) => ErrorClass::Permanent,
        GuardError::Serialization(_) => ErrorClass::Permanent,
        GuardError::IntegrityMismatch { .. } => ErrorClass::Permanent,

        GuardError::Backup(_) => ErrorClass::Transient,
        GuardError::Helper(_) => ErrorClass::Transient,
        GuardError::HelperTimeout(_) => ErrorClass::Transient,

        GuardError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound
            | std::io::ErrorKind::PermissionDenied
            | std::io::ErrorKind::InvalidData => ErrorClass::Permanent,
            _ => ErrorClass::Transient,
        },
    }
}
