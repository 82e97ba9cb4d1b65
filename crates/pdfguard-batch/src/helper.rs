// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External helper — runs a configured command (e.g. a PDF repair or decrypt
// tool) against a document before protection, under a wall-clock limit.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use pdfguard_core::HelperConfig;
use pdfguard_core::error::{GuardError, Result};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Runs the helper command for one file at a time.
#[derive(Debug, Clone)]
pub struct HelperRunner {
    config: HelperConfig,
}

impl HelperRunner {
    pub fn new(config: HelperConfig) -> Self {
        Self { config }
    }

    pub fn program(&self) -> &str {
        &self.config.program
    }

    /// Run the helper with `{input}` = `input` and `{output}` = `output`,
    /// blocking until it exits or the timeout expires.
    ///
    /// The child is killed when the timeout expires; the call then fails with
    /// `HelperTimeout`.
    #[instrument(skip(self), fields(program = %self.config.program))]
    pub fn run(&self, input: &Path, output: &Path) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run_async(input, output))
    }

    async fn run_async(&self, input: &Path, output: &Path) -> Result<()> {
        let program = &self.config.program;
        let args = self.config.render_args(input, output);
        debug!(?args, "Starting helper");

        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| GuardError::Helper(format!("failed to start {program}: {err}")))?;

        let timeout_secs = self.config.timeout_secs;
        let result = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| {
            warn!(timeout_secs, "Helper timed out, killing it");
            GuardError::HelperTimeout(timeout_secs)
        })?
        .map_err(|err| GuardError::Helper(format!("{program}: {err}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(GuardError::Helper(format!(
                "{program} exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        debug!("Helper finished");
        Ok(())
    }
}
