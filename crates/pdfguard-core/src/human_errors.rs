// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator-facing explanations for per-file failures, printed under the run
// summary so whoever maintains the document library knows what to do next.

use crate::error::GuardError;

/// A plain-language failure summary with a suggested next step.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
}

/// Map a `GuardError` to something actionable.
pub fn humanize_error(err: &GuardError) -> HumanError {
    match err {
        GuardError::UnreadableSource(detail) if detail.contains("decrypted") => HumanError {
            message: "The document is already password-protected.".into(),
            suggestion: "Remove the existing protection (or restore the unprotected original from \
                         the backup tree) and run again."
                .into(),
        },

        GuardError::UnreadableSource(detail) => HumanError {
            message: "The document could not be parsed as a PDF.".into(),
            suggestion: format!(
                "Re-export it from its source application, or configure a repair helper. ({detail})"
            ),
        },

        GuardError::Encryption(detail) => HumanError {
            message: "Protection could not be applied.".into(),
            suggestion: format!("The original was restored; check the policy settings. ({detail})"),
        },

        GuardError::InvalidGeometry { width, height } => HumanError {
            message: "A page has an invalid size.".into(),
            suggestion: format!("Fix the page MediaBox ({width}x{height}) and run again."),
        },

        GuardError::Backup(detail) => HumanError {
            message: "The original could not be backed up, so it was left untouched.".into(),
            suggestion: format!("Check free space and permissions on the backup directory. ({detail})"),
        },

        GuardError::IntegrityMismatch { .. } => HumanError {
            message: "The restored file does not match its backup.".into(),
            suggestion: "Copy the file back from the backup tree by hand before the next run.".into(),
        },

        GuardError::Helper(detail) => HumanError {
            message: "The helper command failed.".into(),
            suggestion: format!("Run the helper by hand on this file to see why. ({detail})"),
        },

        GuardError::HelperTimeout(secs) => HumanError {
            message: "The helper command took too long and was stopped.".into(),
            suggestion: format!("The limit is {secs}s; raise helper.timeout_secs if the file is large."),
        },

        GuardError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "Permission denied.".into(),
                suggestion: "Make sure the file and its directory are writable.".into(),
            },
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file disappeared during the run.".into(),
                suggestion: "Something else is modifying the library; run again once it is idle."
                    .into(),
            },
            _ => HumanError {
                message: "A filesystem error occurred.".into(),
                suggestion: format!("Run again; if it persists check the disk. ({io_err})"),
            },
        },

        GuardError::InvalidPolicy(detail) | GuardError::Config(detail) => HumanError {
            message: "The configuration is invalid.".into(),
            suggestion: detail.clone(),
        },

        GuardError::Serialization(err) => HumanError {
            message: "The configuration file is not valid JSON.".into(),
            suggestion: err.to_string(),
        },
    }
}
