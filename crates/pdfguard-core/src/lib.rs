// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfguard — Core types, protection policy and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod policy;
pub mod sanitize;
pub mod types;

pub use config::{GuardConfig, HelperConfig, OutputMode, root_label};
pub use error::{GuardError, Result};
pub use policy::{Permissions, Placement, ProtectionPolicy, WatermarkStyle};
pub use sanitize::sanitize_filename;
pub use types::*;
