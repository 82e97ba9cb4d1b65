// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Standard security handler, revision 3 (RC4, 128-bit key), applied through
// lopdf's encryption support.

use lopdf::{Document, EncryptionState, EncryptionVersion, Object, StringFormat};
use pdfguard_core::Permissions;
use pdfguard_core::error::{GuardError, Result};
use tracing::debug;

/// File key length in bits.
const KEY_BITS: usize = 128;

/// Passwords, permissions and file identifier for one document.
#[derive(Debug, Clone)]
pub struct StandardSecurityHandler {
    user_password: String,
    owner_password: String,
    permissions: Permissions,
    file_id: Vec<u8>,
}

impl StandardSecurityHandler {
    /// Handler for `file_id` (written as both elements of the trailer /ID).
    ///
    /// An empty owner password falls back to the user password.
    pub fn new(
        user_password: &str,
        owner_password: &str,
        permissions: Permissions,
        file_id: &[u8],
    ) -> Self {
        let owner_password = if owner_password.is_empty() {
            user_password
        } else {
            owner_password
        };
        Self {
            user_password: user_password.to_string(),
            owner_password: owner_password.to_string(),
            permissions,
            file_id: file_id.to_vec(),
        }
    }

    /// Install /ID, then encrypt every string and stream in `doc` and add the
    /// /Encrypt dictionary.
    ///
    /// The document must not already carry encryption state.
    pub fn apply(&self, doc: &mut Document) -> Result<()> {
        let id = Object::String(self.file_id.clone(), StringFormat::Hexadecimal);
        doc.trailer.set("ID", Object::Array(vec![id.clone(), id]));

        let state = EncryptionState::try_from(EncryptionVersion::V2 {
            document: &*doc,
            owner_password: &self.owner_password,
            user_password: &self.user_password,
            key_length: KEY_BITS,
            permissions: lopdf_permissions(self.permissions),
        })
        .map_err(|err| GuardError::Encryption(format!("cannot derive keys: {err}")))?;

        doc.encrypt(&state)
            .map_err(|err| GuardError::Encryption(format!("cannot encrypt document: {err}")))?;

        debug!(permissions = ?self.permissions.names(), "Document encrypted");
        Ok(())
    }
}

/// The same flags as lopdf's permission set; bit positions match `/P`.
pub fn lopdf_permissions(permissions: Permissions) -> lopdf::Permissions {
    lopdf::Permissions::from_bits_truncate(u64::from(permissions.bits()))
}
