// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Two-phase writes — content goes to a temporary sibling of the destination,
// is flushed to disk, then renamed over the destination in one step. Every
// file replacement in the pipeline (protected output, backups, restores,
// reports) goes through here.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use pdfguard_core::error::{GuardError, Result};
use tempfile::NamedTempFile;
use tracing::debug;

/// A pending replacement of `destination`.
///
/// The temporary file is removed if the `StagedFile` is dropped without
/// [`StagedFile::commit`] being called.
pub struct StagedFile {
    temp: NamedTempFile,
    destination: PathBuf,
}

impl StagedFile {
    /// Stage a replacement for `destination`, creating its parent directory.
    pub fn new(destination: impl Into<PathBuf>) -> Result<Self> {
        let destination = destination.into();
        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let temp = tempfile::Builder::new()
            .prefix(".pdfguard-")
            .suffix(".tmp")
            .tempfile_in(&parent)?;

        Ok(Self { temp, destination })
    }

    /// Path of the temporary file; external helpers may write here directly.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.temp.as_file_mut().write_all(bytes)?;
        Ok(())
    }

    /// Take the permissions of `source` instead of the restrictive temp-file
    /// defaults.
    pub fn copy_permissions_from(&self, source: &Path) -> Result<()> {
        let permissions = fs::metadata(source)?.permissions();
        fs::set_permissions(self.temp.path(), permissions)?;
        Ok(())
    }

    /// Flush and atomically rename over the destination.
    ///
    /// When the destination already exists its permissions carry over to the
    /// new file.
    pub fn commit(self) -> Result<PathBuf> {
        if self.destination.exists() {
            self.copy_permissions_from(&self.destination)?;
        }
        self.temp.as_file().sync_all()?;
        self.temp
            .persist(&self.destination)
            .map_err(|err| GuardError::Io(err.error))?;
        debug!(path = %self.destination.display(), "Staged file committed");
        Ok(self.destination)
    }
}

/// Replace `destination` with `bytes` in one step.
pub fn write_atomic(destination: impl Into<PathBuf>, bytes: &[u8]) -> Result<PathBuf> {
    let mut staged = StagedFile::new(destination)?;
    staged.write_all(bytes)?;
    staged.commit()
}
