// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the pdfguard batch pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Page dimensions in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    pub const A4: PageSize = PageSize {
        width: 595.0,
        height: 842.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Bit-exact key for caching overlays per page size.
    pub fn cache_key(&self) -> (u32, u32) {
        (self.width.to_bits(), self.height.to_bits())
    }
}

/// Classification of per-file failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Filesystem hiccup or helper timeout; a later run may succeed.
    Transient,
    /// Unreadable or unencryptable document; re-running will not help.
    Permanent,
}

/// The pipeline stage a file reached before its outcome was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Backup,
    Helper,
    Transform,
    Write,
    Restore,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Backup => "backup",
            Self::Helper => "helper",
            Self::Transform => "transform",
            Self::Write => "write",
            Self::Restore => "restore",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Final status of one file in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Succeeded,
    Failed,
}

/// A document found under one of the configured roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredFile {
    /// The configured root the file was found under.
    pub root: PathBuf,
    /// Absolute (or root-joined) path of the file.
    pub path: PathBuf,
    /// `path` relative to `root`.
    pub relative: PathBuf,
}

/// Mapping from a file to its pre-mutation mirrored copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub original: PathBuf,
    pub backup: PathBuf,
    /// True when an existing backup was kept instead of copying again.
    pub reused: bool,
}

/// Per-file outcome log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    pub stage: Stage,
    pub error: Option<String>,
    pub error_class: Option<ErrorClass>,
    /// Suggested next step for the operator.
    pub suggestion: Option<String>,
    /// Whether the original was restored from its backup.
    pub restored: bool,
    pub pages: Option<usize>,
}

impl FileOutcome {
    pub fn succeeded(path: PathBuf, pages: usize) -> Self {
        Self {
            path,
            status: FileStatus::Succeeded,
            stage: Stage::Done,
            error: None,
            error_class: None,
            suggestion: None,
            restored: false,
            pages: Some(pages),
        }
    }

    pub fn failed(path: PathBuf, stage: Stage, err: &crate::GuardError, restored: bool) -> Self {
        Self {
            path,
            status: FileStatus::Failed,
            stage,
            error: Some(err.to_string()),
            error_class: Some(crate::error::classify_error(err)),
            suggestion: Some(crate::human_errors::humanize_error(err).suggestion),
            restored,
            pages: None,
        }
    }
}

/// Aggregate result of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<FileOutcome>,
}

impl BatchResult {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            processed: 0,
            succeeded: 0,
            failed: 0,
            outcomes: Vec::new(),
        }
    }

    /// Fold one file outcome into the counters.
    pub fn record(&mut self, outcome: FileOutcome) {
        self.processed += 1;
        match outcome.status {
            FileStatus::Succeeded => self.succeeded += 1,
            FileStatus::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Percentage of processed files that succeeded (0.0 when nothing ran).
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.processed as f64 * 100.0
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == FileStatus::Failed)
    }
}
