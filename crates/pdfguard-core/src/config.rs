// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{GuardError, Result};
use crate::policy::ProtectionPolicy;

/// Where protected output is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutputMode {
    /// Replace each source file with its protected version.
    InPlace,
    /// Write `<root>/<relative dir>/<stem><suffix>.<ext>` and leave sources alone.
    Mirror { root: PathBuf, suffix: String },
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::InPlace
    }
}

/// An external command run against each document before protection.
///
/// `{input}` and `{output}` in `args` are replaced with the source path and a
/// staging path; the command must write its result to `{output}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Wall-clock limit; the child is killed and the file fails when exceeded.
    #[serde(default = "default_helper_timeout")]
    pub timeout_secs: u64,
}

fn default_helper_timeout() -> u64 {
    60
}

impl HelperConfig {
    /// Arguments with the `{input}` / `{output}` placeholders filled in.
    pub fn render_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.display().to_string();
        let output = output.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

/// Everything a batch run needs; passed explicitly into each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Library directories scanned recursively for documents.
    pub roots: Vec<PathBuf>,
    /// File extension to match, without the dot (case-insensitive).
    pub extension: String,
    /// Originals are mirrored here before mutation.
    pub backup_root: PathBuf,
    pub output: OutputMode,
    pub policy: ProtectionPolicy,
    /// Append-only event log in addition to stderr.
    pub log_file: Option<PathBuf>,
    pub helper: Option<HelperConfig>,
    /// Process files on the rayon pool instead of one at a time.
    pub parallel: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            extension: "pdf".to_string(),
            backup_root: PathBuf::from("backup_original"),
            output: OutputMode::default(),
            policy: ProtectionPolicy::default(),
            log_file: Some(PathBuf::from("pdf_protection.log")),
            helper: None,
            parallel: false,
        }
    }
}

impl GuardConfig {
    /// Read a JSON configuration file. Missing keys take their defaults.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            GuardError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        let config: GuardConfig = serde_json::from_str(&raw)?;
        debug!(roots = config.roots.len(), "configuration loaded");
        Ok(config)
    }

    /// Write this configuration as pretty JSON (passwords are never written).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// True when `path` carries the configured document extension.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }

    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(GuardError::Config(
                "no document roots configured".to_string(),
            ));
        }
        if self.extension.is_empty() || self.extension.starts_with('.') {
            return Err(GuardError::Config(format!(
                "extension '{}' must be non-empty and given without a dot",
                self.extension
            )));
        }
        let mut labels: HashMap<PathBuf, &Path> = HashMap::new();
        for root in &self.roots {
            if let Some(first) = labels.insert(root_label(root), root) {
                return Err(GuardError::Config(format!(
                    "roots {} and {} share the directory name '{}' and would \
                     overwrite each other's backups",
                    first.display(),
                    root.display(),
                    root_label(root).display()
                )));
            }
        }
        if let OutputMode::Mirror { root, .. } = &self.output
            && *root == self.backup_root
        {
            return Err(GuardError::Config(
                "output root and backup root must differ".to_string(),
            ));
        }
        if let Some(helper) = &self.helper
            && helper.timeout_secs == 0
        {
            return Err(GuardError::Config(
                "helper timeout must be at least one second".to_string(),
            ));
        }
        self.policy.validate()
    }
}

/// Directory name a root is filed under inside the backup and output trees.
pub fn root_label(root: &Path) -> PathBuf {
    root.file_name()
        .map(PathBuf::from)
        .or_else(|| {
            root.canonicalize()
                .ok()
                .and_then(|abs| abs.file_name().map(PathBuf::from))
        })
        .unwrap_or_else(|| PathBuf::from("root"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Permissions, Placement};

    #[test]
    fn defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.extension, "pdf");
        assert_eq!(config.backup_root, PathBuf::from("backup_original"));
        assert_eq!(config.output, OutputMode::InPlace);
        assert!(!config.parallel);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let config = GuardConfig::default();
        assert!(config.matches_extension(Path::new("lib/Claim Form.PDF")));
        assert!(config.matches_extension(Path::new("a.pdf")));
        assert!(!config.matches_extension(Path::new("notes.txt")));
        assert!(!config.matches_extension(Path::new("pdf")));
    }

    #[test]
    fn load_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pdfguard.json");
        std::fs::write(
            &path,
            r#"{
                "roots": ["./Document Library - Final English"],
                "output": { "mode": "mirror", "root": "protected", "suffix": "-protected" },
                "policy": {
                    "user_password": "ClaimNav1",
                    "permissions": "PRINT | COPY",
                    "watermark": { "placement": "diagonal", "opacity": 0.2 }
                },
                "helper": { "program": "qpdf", "args": ["{input}", "{output}"] }
            }"#,
        )
        .unwrap();

        let config = GuardConfig::load(&path).unwrap();
        assert_eq!(config.roots.len(), 1);
        assert_eq!(config.extension, "pdf");
        assert_eq!(
            config.output,
            OutputMode::Mirror {
                root: PathBuf::from("protected"),
                suffix: "-protected".to_string()
            }
        );
        assert_eq!(config.policy.user_password, "ClaimNav1");
        assert_eq!(
            config.policy.permissions,
            Permissions::PRINT | Permissions::COPY
        );
        assert_eq!(config.policy.watermark.placement, Placement::Diagonal);
        assert_eq!(config.policy.watermark.font_size, 14.0);
        assert_eq!(config.helper.as_ref().unwrap().timeout_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = GuardConfig::load("/nonexistent/pdfguard.json").unwrap_err();
        assert!(matches!(err, GuardError::Config(_)));
    }

    #[test]
    fn validate_requires_roots() {
        let mut config = GuardConfig::default();
        config.policy.user_password = "P1".into();
        assert!(matches!(config.validate(), Err(GuardError::Config(_))));
        config.roots.push(PathBuf::from("docs"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn roots_with_the_same_name_are_rejected() {
        let mut config = GuardConfig::default();
        config.policy.user_password = "P1".into();
        config.roots = vec![PathBuf::from("en/docs"), PathBuf::from("es/docs")];
        match config.validate() {
            Err(GuardError::Config(detail)) => assert!(detail.contains("'docs'")),
            other => panic!("unexpected result {other:?}"),
        }

        config.roots = vec![PathBuf::from("en/docs"), PathBuf::from("es/docs-es")];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn root_label_uses_last_component() {
        assert_eq!(
            root_label(Path::new("./Document Library - Final English")),
            PathBuf::from("Document Library - Final English")
        );
    }

    #[test]
    fn helper_args_are_rendered() {
        let helper = HelperConfig {
            program: "qpdf".into(),
            args: vec!["--decrypt".into(), "{input}".into(), "{output}".into()],
            timeout_secs: 60,
        };
        let args = helper.render_args(Path::new("in.pdf"), Path::new("out.pdf"));
        assert_eq!(args, vec!["--decrypt", "in.pdf", "out.pdf"]);
    }

    #[test]
    fn save_then_load_keeps_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.json");
        let mut config = GuardConfig::default();
        config.roots.push(PathBuf::from("docs"));
        config.policy.user_password = "never-written".into();
        config.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("never-written"));

        let loaded = GuardConfig::load(&path).unwrap();
        assert_eq!(loaded.roots, config.roots);
        assert!(loaded.policy.user_password.is_empty());
    }
}
