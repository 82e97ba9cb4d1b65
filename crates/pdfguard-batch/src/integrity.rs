// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File integrity — SHA-256 fingerprints used to prove a restored original is
// byte-identical to its backup.

use std::path::Path;

use pdfguard_core::error::{GuardError, Result};
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hash the contents of the file at `path`.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String> {
    let data = std::fs::read(path.as_ref())?;
    Ok(hash_bytes(&data))
}

/// Verify that `data` matches the expected SHA-256 hex digest.
///
/// Returns `Err(GuardError::IntegrityMismatch)` with both values when it does not.
pub fn verify_hash(data: &[u8], expected_hex: &str) -> Result<()> {
    let actual = hash_bytes(data);
    if actual == expected_hex {
        Ok(())
    } else {
        Err(GuardError::IntegrityMismatch {
            expected: expected_hex.to_owned(),
            actual,
        })
    }
}
