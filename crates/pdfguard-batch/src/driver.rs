// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch driver — discovers documents and runs backup, optional helper,
// transform and staged write for each one, restoring the original on any
// failure. No per-file error ever stops the run.

use std::fs;
use std::path::{Path, PathBuf};

use pdfguard_core::error::{GuardError, Result};
use pdfguard_core::{
    BackupRecord, BatchResult, DiscoveredFile, FileOutcome, GuardConfig, OutputMode, RunId,
    Stage, root_label,
};
use pdfguard_document::{Protector, is_encrypted};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::backup::BackupManager;
use crate::discover::discover;
use crate::helper::HelperRunner;
use crate::staging::{StagedFile, write_atomic};

/// What a run would do to one file.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedFile {
    pub source: PathBuf,
    pub backup: PathBuf,
    pub destination: PathBuf,
}

/// Drives one batch run over the configured library.
pub struct BatchDriver {
    config: GuardConfig,
    protector: Protector,
    backups: BackupManager,
    helper: Option<HelperRunner>,
}

impl BatchDriver {
    /// Validate `config` and prepare the run. Configuration errors are the
    /// only errors that surface before any file is touched.
    pub fn new(config: GuardConfig) -> Result<Self> {
        config.validate()?;
        let protector = Protector::new(config.policy.clone())?;
        let backups = BackupManager::new(&config.backup_root);
        let helper = config.helper.clone().map(HelperRunner::new);
        Ok(Self {
            config,
            protector,
            backups,
            helper,
        })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Discover files and report their backup and output paths without
    /// touching anything.
    #[instrument(skip(self))]
    pub fn plan(&self) -> Vec<PlannedFile> {
        let planned: Vec<PlannedFile> = discover(&self.config)
            .iter()
            .map(|file| PlannedFile {
                source: file.path.clone(),
                backup: self.backups.mirror_path(file),
                destination: self.destination(file),
            })
            .collect();

        for entry in &planned {
            info!(
                source = %entry.source.display(),
                backup = %entry.backup.display(),
                destination = %entry.destination.display(),
                "Would protect"
            );
        }
        info!(files = planned.len(), "Dry run complete, nothing was changed");
        planned
    }

    /// Process every discovered file and return the aggregate result.
    #[instrument(skip(self), fields(parallel = self.config.parallel))]
    pub fn run(&self) -> BatchResult {
        let run_id = RunId::new();
        let mut result = BatchResult::new(run_id);
        let files = discover(&self.config);
        let total = files.len();

        info!(%run_id, files = total, "Starting protection run");

        let outcomes: Vec<FileOutcome> = if self.config.parallel {
            files.par_iter().map(|file| self.process_file(file)).collect()
        } else {
            files
                .iter()
                .enumerate()
                .map(|(index, file)| {
                    info!("[{}/{}] {}", index + 1, total, file.relative.display());
                    self.process_file(file)
                })
                .collect()
        };

        for outcome in outcomes {
            result.record(outcome);
        }
        result.finish();
        result
    }

    /// Backup, transform and write one file. Never fails; errors become a
    /// failed outcome after the original has been restored.
    #[instrument(skip_all, fields(path = %file.path.display()))]
    pub fn process_file(&self, file: &DiscoveredFile) -> FileOutcome {
        let original = match fs::read(&file.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                let err =
                    GuardError::Backup(format!("cannot read {}: {}", file.path.display(), err));
                error!(%err, "Backup failed, leaving file untouched");
                return FileOutcome::failed(file.path.clone(), Stage::Backup, &err, false);
            }
        };

        // Encrypted sources are turned away before backup and never restored
        // over, unless a helper is there to decrypt them.
        if self.helper.is_none() && is_encrypted(&original) {
            let err = GuardError::UnreadableSource(
                "file is already encrypted and has not been decrypted".to_string(),
            );
            warn!(%err, "Leaving encrypted file untouched");
            return FileOutcome::failed(file.path.clone(), Stage::Transform, &err, false);
        }

        let record = match self.backups.backup(file) {
            Ok(record) => record,
            Err(err) => {
                error!(%err, "Backup failed, leaving file untouched");
                return FileOutcome::failed(file.path.clone(), Stage::Backup, &err, false);
            }
        };

        match self.transform_and_write(file, &original) {
            Ok(pages) => {
                info!(pages, "Protected");
                FileOutcome::succeeded(file.path.clone(), pages)
            }
            Err((stage, err)) => {
                error!(%stage, %err, "Protection failed");
                let restored = self.restore_after_failure(&record, &original);
                FileOutcome::failed(file.path.clone(), stage, &err, restored)
            }
        }
    }

    // -- Helpers --------------------------------------------------------------

    fn transform_and_write(
        &self,
        file: &DiscoveredFile,
        original: &[u8],
    ) -> std::result::Result<usize, (Stage, GuardError)> {
        let helped;
        let source = match &self.helper {
            Some(helper) => {
                helped = self
                    .run_helper(helper, &file.path)
                    .map_err(|err| (Stage::Helper, err))?;
                helped.as_slice()
            }
            None => original,
        };

        let protected = self
            .protector
            .protect_bytes(source)
            .map_err(|err| (Stage::Transform, err))?;

        let destination = self.destination(file);
        write_atomic(&destination, &protected.bytes).map_err(|err| (Stage::Write, err))?;

        if protected.watermarked_pages < protected.pages {
            warn!(
                pages = protected.pages,
                watermarked = protected.watermarked_pages,
                "Some pages have no usable MediaBox and were left without a watermark"
            );
        }
        Ok(protected.pages)
    }

    /// Copy the backup over the original. A backup kept from an earlier run
    /// is only copied back when this run changed the file.
    fn restore_after_failure(&self, record: &BackupRecord, original: &[u8]) -> bool {
        if record.reused && fs::read(&record.original).is_ok_and(|now| now == original) {
            warn!(
                backup = %record.backup.display(),
                "Original unchanged by this run, not restoring the older backup"
            );
            return false;
        }

        match self.backups.restore(record) {
            Ok(()) => true,
            Err(restore_err) => {
                error!(
                    %restore_err,
                    backup = %record.backup.display(),
                    "Restore failed, copy the backup back by hand"
                );
                false
            }
        }
    }

    /// Run the helper into a staging sibling and return what it produced.
    fn run_helper(&self, helper: &HelperRunner, input: &Path) -> Result<Vec<u8>> {
        let staged = StagedFile::new(input)?;
        helper.run(input, staged.path())?;
        let bytes = fs::read(staged.path())?;
        if bytes.is_empty() {
            return Err(GuardError::Helper(format!(
                "{} produced no output",
                helper.program()
            )));
        }
        Ok(bytes)
    }

    /// Output path for `file` under the configured output mode.
    fn destination(&self, file: &DiscoveredFile) -> PathBuf {
        match &self.config.output {
            OutputMode::InPlace => file.path.clone(),
            OutputMode::Mirror { root, suffix } => {
                let stem = file
                    .relative
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let name = match file.relative.extension() {
                    Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
                    None => format!("{stem}{suffix}"),
                };
                let parent = file.relative.parent().unwrap_or(Path::new(""));
                root.join(root_label(&file.root)).join(parent).join(name)
            }
        }
    }
}
