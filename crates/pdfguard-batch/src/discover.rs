// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document discovery — recursive scan of the configured roots for files with
// the configured extension.

use std::fs;
use std::path::{Path, PathBuf};

use pdfguard_core::{DiscoveredFile, GuardConfig, OutputMode};
use tracing::{debug, info, instrument, warn};

/// Find every matching file under the configured roots, sorted by path.
///
/// Missing roots are logged and skipped. The backup tree and mirrored output
/// tree are never descended into, even when they sit inside a root.
#[instrument(skip_all, fields(roots = config.roots.len(), extension = %config.extension))]
pub fn discover(config: &GuardConfig) -> Vec<DiscoveredFile> {
    let mut excluded = vec![absolute(&config.backup_root)];
    if let OutputMode::Mirror { root, .. } = &config.output {
        excluded.push(absolute(root));
    }

    let mut files = Vec::new();
    for root in &config.roots {
        if !root.is_dir() {
            warn!(root = %root.display(), "Document root does not exist, skipping");
            continue;
        }

        let before = files.len();
        walk(config, root, root, &excluded, &mut files);
        info!(
            root = %root.display(),
            found = files.len() - before,
            "Scanned document root"
        );
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

fn walk(
    config: &GuardConfig,
    root: &Path,
    dir: &Path,
    excluded: &[PathBuf],
    files: &mut Vec<DiscoveredFile>,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), %err, "Cannot read directory, skipping");
            return;
        }
    };

    for entry in entries.filter_map(|entry| entry.ok()) {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if excluded.contains(&absolute(&path)) {
                debug!(dir = %path.display(), "Skipping backup/output tree");
                continue;
            }
            walk(config, root, &path, excluded, files);
        } else if file_type.is_file() && config.matches_extension(&path) {
            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            files.push(DiscoveredFile {
                root: root.to_path_buf(),
                path,
                relative,
            });
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
