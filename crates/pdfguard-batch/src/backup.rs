// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Backup manager — mirrors each original under the backup root before it is
// touched, and copies it back when protection fails.
//
// Layout: `<backup_root>/<root dir name>/<path relative to root>`. Root
// directory names are unique within a run (checked by `GuardConfig::validate`).

use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use pdfguard_core::error::{GuardError, Result};
use pdfguard_core::{BackupRecord, DiscoveredFile, root_label};
use tracing::{debug, info, instrument, warn};

use crate::integrity;
use crate::staging::StagedFile;

/// Creates and restores mirrored backups.
#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_root: PathBuf,
}

impl BackupManager {
    pub fn new(backup_root: impl Into<PathBuf>) -> Self {
        Self {
            backup_root: backup_root.into(),
        }
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Where the backup of `file` lives (or would live).
    pub fn mirror_path(&self, file: &DiscoveredFile) -> PathBuf {
        self.backup_root
            .join(root_label(&file.root))
            .join(&file.relative)
    }

    /// Copy `file` into the backup tree with its permissions and timestamps.
    ///
    /// An existing backup is authoritative: it is never overwritten, so a
    /// file already mutated by an earlier partial run cannot replace the
    /// known-good original.
    #[instrument(skip_all, fields(path = %file.path.display()))]
    pub fn backup(&self, file: &DiscoveredFile) -> Result<BackupRecord> {
        let backup = self.mirror_path(file);

        if backup.exists() {
            debug!(backup = %backup.display(), "Backup already present, keeping it");
            return Ok(BackupRecord {
                original: file.path.clone(),
                backup,
                reused: true,
            });
        }

        copy_with_metadata(&file.path, &backup).map_err(|err| {
            GuardError::Backup(format!(
                "{} -> {}: {}",
                file.path.display(),
                backup.display(),
                err
            ))
        })?;

        info!(backup = %backup.display(), "Backed up original");
        Ok(BackupRecord {
            original: file.path.clone(),
            backup,
            reused: false,
        })
    }

    /// Copy the backup over the original, byte for byte, and verify the
    /// result hashes the same as the backup.
    ///
    /// Works whatever state the original is in, including already encrypted
    /// or truncated.
    #[instrument(skip_all, fields(path = %record.original.display()))]
    pub fn restore(&self, record: &BackupRecord) -> Result<()> {
        let expected = integrity::hash_file(&record.backup)?;
        copy_with_metadata(&record.backup, &record.original)?;

        let restored = fs::read(&record.original)?;
        integrity::verify_hash(&restored, &expected)?;

        warn!(backup = %record.backup.display(), "Original restored from backup");
        Ok(())
    }
}

/// Staged copy of `from` to `to`, then carry over permissions and
/// access/modification times.
fn copy_with_metadata(from: &Path, to: &Path) -> Result<()> {
    let bytes = fs::read(from)?;
    let mut staged = StagedFile::new(to)?;
    staged.write_all(&bytes)?;
    staged.copy_permissions_from(from)?;
    staged.commit()?;

    let metadata = fs::metadata(from)?;
    let accessed = FileTime::from_last_access_time(&metadata);
    let modified = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_times(to, accessed, modified)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovered(root: &Path, relative: &str) -> DiscoveredFile {
        DiscoveredFile {
            root: root.to_path_buf(),
            path: root.join(relative),
            relative: PathBuf::from(relative),
        }
    }

    #[test]
    fn mirror_path_reroots_under_backup() {
        let manager = BackupManager::new("/srv/backup_original");
        let file = discovered(Path::new("/srv/Document Library"), "claims/Form A.pdf");
        assert_eq!(
            manager.mirror_path(&file),
            PathBuf::from("/srv/backup_original/Document Library/claims/Form A.pdf")
        );
    }

    #[test]
    fn backup_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("library");
        fs::create_dir_all(root.join("deep/nested")).unwrap();
        fs::write(root.join("deep/nested/a.pdf"), b"%PDF original").unwrap();

        let manager = BackupManager::new(dir.path().join("does/not/exist/yet"));
        let record = manager
            .backup(&discovered(&root, "deep/nested/a.pdf"))
            .unwrap();

        assert!(!record.reused);
        assert_eq!(fs::read(&record.backup).unwrap(), b"%PDF original");
        assert!(record.backup.ends_with("library/deep/nested/a.pdf"));
    }

    #[test]
    fn second_backup_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("library");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.pdf"), b"first version").unwrap();

        let manager = BackupManager::new(dir.path().join("backups"));
        let file = discovered(&root, "a.pdf");
        let first = manager.backup(&file).unwrap();

        fs::write(root.join("a.pdf"), b"mutated by a partial run").unwrap();
        let second = manager.backup(&file).unwrap();

        assert!(second.reused);
        assert_eq!(first.backup, second.backup);
        assert_eq!(fs::read(&second.backup).unwrap(), b"first version");
    }

    #[test]
    fn backup_keeps_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("library");
        fs::create_dir_all(&root).unwrap();
        let source = root.join("a.pdf");
        fs::write(&source, b"bytes").unwrap();
        let stamp = FileTime::from_unix_time(1_700_000_000, 0);
        filetime::set_file_mtime(&source, stamp).unwrap();

        let manager = BackupManager::new(dir.path().join("backups"));
        let record = manager.backup(&discovered(&root, "a.pdf")).unwrap();

        let copied = fs::metadata(&record.backup).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&copied), stamp);
    }

    #[test]
    fn restore_overwrites_whatever_is_there() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("library");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.pdf"), b"%PDF good").unwrap();

        let manager = BackupManager::new(dir.path().join("backups"));
        let record = manager.backup(&discovered(&root, "a.pdf")).unwrap();

        fs::write(root.join("a.pdf"), b"\x00\x01 half encrypted garbage").unwrap();
        manager.restore(&record).unwrap();
        assert_eq!(fs::read(root.join("a.pdf")).unwrap(), b"%PDF good");
    }

    #[test]
    fn backup_of_missing_file_is_backup_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().join("backups"));
        let err = manager
            .backup(&discovered(dir.path(), "missing.pdf"))
            .unwrap_err();
        assert!(matches!(err, GuardError::Backup(_)));
    }
}
