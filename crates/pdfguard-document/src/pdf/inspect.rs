// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Protection inspector — reports whether a document is encrypted, whether a
// password opens it, its page count and the permission flags it grants.

use std::path::Path;

use lopdf::{Document, Object};
use pdfguard_core::Permissions;
use pdfguard_core::error::Result;
use serde::Serialize;
use tracing::{debug, instrument};

use super::reader::{is_sealed, load};

/// What a protected (or unprotected) document looks like from the outside.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub encrypted: bool,
    /// The document could be opened: either it is not encrypted, or the
    /// supplied password was accepted.
    pub opened: bool,
    pub pages: usize,
    /// Flags from the encryption dictionary; `None` for unencrypted files.
    pub permissions: Option<Permissions>,
    pub version: String,
}

impl Inspection {
    /// Permission names for display, or `["unrestricted"]` for plain files.
    pub fn permission_names(&self) -> Vec<&'static str> {
        match self.permissions {
            Some(perms) => perms.names(),
            None => vec!["unrestricted"],
        }
    }
}

/// Inspect `bytes`, trying `password` when the document is encrypted.
#[instrument(skip_all, fields(bytes_len = bytes.len(), with_password = password.is_some()))]
pub fn inspect_bytes(bytes: &[u8], password: Option<&str>) -> Result<Inspection> {
    let mut doc = load(bytes)?;
    let encrypted = doc.is_encrypted();
    let permissions = if encrypted {
        permission_entry(&doc).map(Permissions::from_p_value)
    } else {
        None
    };

    let opened = match (is_sealed(&doc), password) {
        (false, _) => true,
        (true, Some(password)) => match doc.decrypt(password) {
            Ok(()) => true,
            Err(err) => {
                debug!(%err, "Password rejected");
                false
            }
        },
        (true, None) => false,
    };

    let inspection = Inspection {
        encrypted,
        opened,
        pages: doc.get_pages().len(),
        permissions,
        version: doc.version.clone(),
    };
    debug!(?inspection, "Inspected document");
    Ok(inspection)
}

/// Read and inspect a file.
pub fn inspect_file(path: impl AsRef<Path>, password: Option<&str>) -> Result<Inspection> {
    let bytes = std::fs::read(path.as_ref())?;
    inspect_bytes(&bytes, password)
}

/// The raw `/P` value of the document's encryption dictionary.
fn permission_entry(doc: &Document) -> Option<i64> {
    let encrypt = match doc.trailer.get(b"Encrypt").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };
    encrypt.get(b"P").ok()?.as_i64().ok()
}
