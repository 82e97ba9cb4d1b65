// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfguard-batch — Batch orchestration for pdfguard.
//
// Discovers documents under the configured roots, mirrors each original into
// the backup tree, runs the optional helper and the document transformer, and
// writes results through staged atomic replacements. Failures restore the
// original from its backup and are reported in the run summary.

pub mod backup;
pub mod discover;
pub mod driver;
pub mod helper;
pub mod integrity;
pub mod report;
pub mod staging;

pub use backup::BackupManager;
pub use discover::discover;
pub use driver::{BatchDriver, PlannedFile};
pub use helper::HelperRunner;
pub use report::{log_summary, render_summary, write_json_report};
pub use staging::{StagedFile, write_atomic};
