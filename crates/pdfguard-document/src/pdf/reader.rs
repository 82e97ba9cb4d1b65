// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — parses documents with lopdf, including files sealed with a
// user password, and opens them with or without that password.

use std::collections::{BTreeMap, HashSet};

use lopdf::xref::XrefEntry;
use lopdf::{Document, Object, ObjectId, Reader};
use pdfguard_core::error::{GuardError, Result};
use tracing::debug;

/// Parse `bytes` into a document.
///
/// When the document needs a non-empty user password, lopdf only hands back
/// the encryption dictionary. The remaining objects are then read as stored
/// (still encrypted) so a later [`Document::decrypt`] has them to work on.
pub fn load(bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes)
        .map_err(|err| GuardError::UnreadableSource(format!("failed to parse PDF: {err}")))?;

    if is_sealed(&doc) {
        return Ok(read_sealed_objects(bytes, doc));
    }
    Ok(doc)
}

/// The document is encrypted and still needs a password to read it.
pub fn is_sealed(doc: &Document) -> bool {
    doc.is_encrypted() && doc.encryption_state.is_none()
}

/// The bytes parse as a document carrying an /Encrypt dictionary. Input
/// that does not parse counts as not encrypted.
pub fn is_encrypted(bytes: &[u8]) -> bool {
    Document::load_mem(bytes).is_ok_and(|doc| doc.is_encrypted())
}

/// Open a document that needs no password. Sealed ones fail with
/// `UnreadableSource`.
pub fn open(bytes: &[u8]) -> Result<Document> {
    let doc = load(bytes)?;
    if is_sealed(&doc) {
        return Err(GuardError::UnreadableSource(
            "document is encrypted and no password was given".to_string(),
        ));
    }
    Ok(doc)
}

/// Open a document, decrypting it with `password` when it is sealed.
pub fn open_with_password(bytes: &[u8], password: &str) -> Result<Document> {
    let mut doc = load(bytes)?;
    if is_sealed(&doc) {
        doc.decrypt(password)
            .map_err(|err| GuardError::UnreadableSource(format!("decryption failed: {err}")))?;
    }
    Ok(doc)
}

fn read_sealed_objects(bytes: &[u8], doc: Document) -> Document {
    let start = bytes
        .windows(5)
        .position(|window| window == b"%PDF-")
        .unwrap_or(0);
    let encrypt_id = doc
        .trailer
        .get(b"Encrypt")
        .and_then(Object::as_reference)
        .ok();

    let ids: Vec<ObjectId> = doc
        .reference_table
        .entries
        .iter()
        .filter_map(|(&number, entry)| match *entry {
            XrefEntry::Normal { generation, .. } => Some((number, generation)),
            _ => None,
        })
        .filter(|id| Some(*id) != encrypt_id && !doc.objects.contains_key(id))
        .collect();

    let reader = Reader {
        buffer: &bytes[start..],
        document: doc,
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    };

    let mut objects = Vec::with_capacity(ids.len());
    for id in ids {
        match reader.get_object(id, &mut HashSet::new()) {
            Ok(object) => objects.push((id, object)),
            Err(err) => debug!(?id, %err, "Skipping unreadable object"),
        }
    }

    let mut doc = reader.document;
    debug!(objects = objects.len(), "Read sealed objects");
    doc.objects.extend(objects);
    doc
}
