// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document transformer — composites the watermark overlay onto every page and
// re-applies access restrictions with the standard security handler.
//
// The transformer only returns bytes; where they are persisted is the caller's
// decision.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use pdfguard_core::error::{GuardError, Result};
use pdfguard_core::{PageSize, ProtectionPolicy};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use super::security::StandardSecurityHandler;
use super::watermark::{Overlay, render_overlay};

/// Trailer entries that describe the source file's cross-reference layout or
/// encryption and must not survive into the rewritten document.
const STALE_TRAILER_KEYS: [&str; 9] = [
    "Prev", "XRefStm", "Encrypt", "W", "Index", "Filter", "DecodeParms", "Length", "Type",
];

/// Guard against cyclic /Parent chains in malformed page trees.
const MAX_TREE_DEPTH: usize = 64;

/// Output of one transformation.
#[derive(Debug, Clone)]
pub struct ProtectedDocument {
    /// The encrypted, watermarked document.
    pub bytes: Vec<u8>,
    /// Page count, identical to the source's.
    pub pages: usize,
    /// Pages that received the overlay (pages with unusable geometry are
    /// left without one).
    pub watermarked_pages: usize,
}

/// Applies one [`ProtectionPolicy`] to any number of documents.
///
/// Overlays are rendered once per distinct page size and reused for the rest
/// of the run, so a `Protector` should live as long as the batch. It is
/// `Sync` and can be shared across worker threads.
pub struct Protector {
    policy: ProtectionPolicy,
    overlays: Mutex<HashMap<(u32, u32), Arc<Overlay>>>,
}

/// Per-document bookkeeping while stamping pages.
struct Stamping {
    /// Form XObject id and resource name per page size, embedded once per document.
    embedded: HashMap<(u32, u32), (ObjectId, String)>,
    /// Shared stream holding a single `q`.
    save_state: Option<ObjectId>,
}

impl Protector {
    /// Create a protector for `policy`. Fails with `InvalidPolicy` when the
    /// policy is incomplete.
    pub fn new(policy: ProtectionPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            policy,
            overlays: Mutex::new(HashMap::new()),
        })
    }

    /// Number of distinct page sizes rendered so far in this run.
    pub fn cached_overlays(&self) -> usize {
        self.overlays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Read `path` and transform its contents. Nothing is written.
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn protect_file(&self, path: impl AsRef<Path>) -> Result<ProtectedDocument> {
        let source = std::fs::read(path.as_ref())?;
        self.protect_bytes(&source)
    }

    /// Watermark every page of `source` and encrypt the result.
    #[instrument(skip_all, fields(bytes_len = source.len()))]
    pub fn protect_bytes(&self, source: &[u8]) -> Result<ProtectedDocument> {
        let loaded = Document::load_mem(source)
            .map_err(|err| GuardError::UnreadableSource(format!("failed to parse PDF: {err}")))?;

        if loaded.is_encrypted() {
            return Err(GuardError::UnreadableSource(
                "file has not been decrypted".to_string(),
            ));
        }

        let file_id =
            existing_file_id(&loaded).unwrap_or_else(|| Sha256::digest(source)[..16].to_vec());
        let mut doc = detach(loaded);

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(GuardError::UnreadableSource(
                "document has no pages".to_string(),
            ));
        }

        let mut stamping = Stamping {
            embedded: HashMap::new(),
            save_state: None,
        };
        let mut watermarked_pages = 0usize;

        for (&number, &page_id) in &pages {
            let (size, origin) = match page_geometry(&doc, page_id) {
                Ok(geometry) => geometry,
                Err(err) => {
                    warn!(page = number, %err, "Skipping overlay for page");
                    continue;
                }
            };

            let overlay = match self.overlay_for(size) {
                Ok(overlay) => overlay,
                Err(err) => {
                    warn!(page = number, %err, "Skipping overlay for page");
                    continue;
                }
            };

            self.stamp_page(&mut doc, &mut stamping, page_id, &overlay, origin)?;
            watermarked_pages += 1;
        }

        let handler = StandardSecurityHandler::new(
            &self.policy.user_password,
            &self.policy.owner_password,
            self.policy.permissions,
            &file_id,
        );
        handler.apply(&mut doc)?;

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|err| GuardError::Encryption(format!("failed to serialise document: {err}")))?;

        info!(
            pages = pages.len(),
            watermarked_pages,
            sizes = stamping.embedded.len(),
            output_bytes = bytes.len(),
            "Document protected"
        );

        Ok(ProtectedDocument {
            bytes,
            pages: pages.len(),
            watermarked_pages,
        })
    }

    // -- Helpers --------------------------------------------------------------

    /// Fetch the overlay for `size` from the run cache, rendering it on first use.
    fn overlay_for(&self, size: PageSize) -> Result<Arc<Overlay>> {
        let mut cache = self.overlays.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(overlay) = cache.get(&size.cache_key()) {
            return Ok(Arc::clone(overlay));
        }
        let overlay = Arc::new(render_overlay(size, &self.policy.watermark)?);
        cache.insert(size.cache_key(), Arc::clone(&overlay));
        debug!(width = size.width, height = size.height, "Overlay cached");
        Ok(overlay)
    }

    /// Paint `overlay` over the page's existing content.
    ///
    /// The page ends up with contents `[q] <original...> [Q q 1 0 0 1 x y cm /Wm Do Q]`
    /// and inline resources that include the overlay XObject.
    fn stamp_page(
        &self,
        doc: &mut Document,
        stamping: &mut Stamping,
        page_id: ObjectId,
        overlay: &Overlay,
        origin: (f32, f32),
    ) -> Result<()> {
        let key = overlay.size().cache_key();
        let (xobject_id, name) = match stamping.embedded.get(&key) {
            Some(entry) => entry.clone(),
            None => {
                let name = format!("Wm{}", stamping.embedded.len());
                let id = overlay.embed(doc);
                stamping.embedded.insert(key, (id, name.clone()));
                (id, name)
            }
        };

        let save_state = match stamping.save_state {
            Some(id) => id,
            None => {
                let id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
                stamping.save_state = Some(id);
                id
            }
        };

        let paint = Content {
            operations: vec![
                Operation::new("Q", vec![]),
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        1.into(),
                        0.into(),
                        0.into(),
                        1.into(),
                        Object::Real(origin.0),
                        Object::Real(origin.1),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        }
        .encode()
        .map_err(|err| GuardError::Encryption(format!("failed to encode overlay call: {err}")))?;
        let paint_id = doc.add_object(Stream::new(dictionary! {}, paint));

        let mut resources = inherited_resources(doc, page_id);
        let mut xobjects = match resources.get(b"XObject") {
            Ok(value) => resolve(doc, value).as_dict().cloned().unwrap_or_default(),
            Err(_) => Dictionary::new(),
        };
        xobjects.set(name.as_bytes().to_vec(), Object::Reference(xobject_id));
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut contents = vec![Object::Reference(save_state)];
        contents.extend(original_contents(doc, page_id));
        contents.push(Object::Reference(paint_id));

        let page = doc
            .get_object_mut(page_id)
            .and_then(|object| object.as_dict_mut())
            .map_err(|err| {
                GuardError::UnreadableSource(format!("page object {page_id:?}: {err}"))
            })?;
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(contents));
        Ok(())
    }
}

/// Copy the loaded objects into a fresh document with no cross-reference or
/// encryption state carried over from the source file.
fn detach(loaded: Document) -> Document {
    let mut doc = Document::with_version(loaded.version.clone());
    doc.max_id = loaded.max_id;
    doc.trailer = loaded.trailer;
    doc.objects = loaded.objects;

    doc.objects.retain(|_, object| match object {
        Object::Stream(stream) => !matches!(
            stream.dict.get(b"Type").and_then(|t| t.as_name()),
            Ok(b"XRef") | Ok(b"ObjStm")
        ),
        _ => true,
    });
    for key in STALE_TRAILER_KEYS {
        doc.trailer.remove(key.as_bytes());
    }
    doc
}

/// First element of the trailer /ID, when the source has one.
fn existing_file_id(doc: &Document) -> Option<Vec<u8>> {
    let ids = doc.trailer.get(b"ID").ok()?.as_array().ok()?;
    match ids.first()? {
        Object::String(bytes, _) if !bytes.is_empty() => Some(bytes.clone()),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Look `key` up on the page, then up its /Parent chain.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

/// The page's size and lower-left corner from its (possibly inherited) MediaBox.
fn page_geometry(doc: &Document, page_id: ObjectId) -> Result<(PageSize, (f32, f32))> {
    let corners: Vec<f32> = inherited(doc, page_id, b"MediaBox")
        .and_then(|object| object.as_array().ok())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| number(resolve(doc, item)))
                .collect()
        })
        .unwrap_or_default();

    let [x0, y0, x1, y1] = corners[..] else {
        return Err(GuardError::InvalidGeometry {
            width: 0.0,
            height: 0.0,
        });
    };

    let size = PageSize::new((x1 - x0).abs(), (y1 - y0).abs());
    if !size.is_valid() {
        return Err(GuardError::InvalidGeometry {
            width: size.width,
            height: size.height,
        });
    }
    Ok((size, (x0.min(x1), y0.min(y1))))
}

/// The page's effective resources as an inline dictionary.
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited(doc, page_id, b"Resources")
        .and_then(|object| object.as_dict().ok())
        .cloned()
        .unwrap_or_default()
}

/// The page's content stream references, flattened into one list.
fn original_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Ok(contents) = doc
        .get_dictionary(page_id)
        .and_then(|page| page.get(b"Contents"))
    else {
        return Vec::new();
    };

    match contents {
        Object::Array(items) => items.clone(),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfguard_core::{Permissions, Placement, WatermarkStyle};
    use crate::pdf::reader::open_with_password;

    /// Build an unencrypted document with one page per entry in `boxes`.
    /// A `None` box leaves the page to inherit the Letter MediaBox from /Pages.
    fn fixture(boxes: &[Option<[i64; 4]>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for (index, media_box) in boxes.iter().enumerate() {
            let text = format!("BT /F1 12 Tf 72 720 Td (Original page {}) Tj ET", index + 1);
            let content_id = doc.add_object(Stream::new(dictionary! {}, text.into_bytes()));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            };
            if let Some(corners) = media_box {
                page.set(
                    "MediaBox",
                    corners.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
                );
            }
            kids.push(Object::Reference(doc.add_object(page)));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Claim Form"),
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn letter_pages(count: usize) -> Vec<u8> {
        fixture(&vec![Some([0, 0, 612, 792]); count])
    }

    fn policy() -> ProtectionPolicy {
        ProtectionPolicy::new("P1", "owner-secret")
            .with_permissions(Permissions::PRINT | Permissions::COPY)
    }

    fn encrypt_dictionary(doc: &Document) -> Dictionary {
        match doc.trailer.get(b"Encrypt").unwrap() {
            Object::Reference(id) => doc.get_dictionary(*id).unwrap().clone(),
            Object::Dictionary(dict) => dict.clone(),
            other => panic!("unexpected /Encrypt {other:?}"),
        }
    }

    #[test]
    fn three_page_document_with_print_and_copy() {
        let protector = Protector::new(policy()).unwrap();
        let protected = protector.protect_bytes(&letter_pages(3)).unwrap();
        assert_eq!(protected.pages, 3);
        assert_eq!(protected.watermarked_pages, 3);

        let doc = Document::load_mem(&protected.bytes).unwrap();
        assert!(doc.is_encrypted());
        let p = encrypt_dictionary(&doc).get(b"P").unwrap().as_i64().unwrap();
        let perms = Permissions::from_p_value(p);
        assert!(perms.contains(Permissions::PRINT));
        assert!(perms.contains(Permissions::COPY));
        assert!(!perms.contains(Permissions::MODIFY));

        let doc = open_with_password(&protected.bytes, "P1").unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn cannot_open_without_password() {
        let protector = Protector::new(policy()).unwrap();
        let protected = protector.protect_bytes(&letter_pages(1)).unwrap();

        assert!(Document::load_mem(&protected.bytes).unwrap().is_encrypted());
        assert!(open_with_password(&protected.bytes, "").is_err());
        assert!(open_with_password(&protected.bytes, "wrong").is_err());
    }

    #[test]
    fn original_content_is_kept_under_overlay() {
        let protector = Protector::new(policy()).unwrap();
        let protected = protector.protect_bytes(&letter_pages(2)).unwrap();

        let doc = open_with_password(&protected.bytes, "P1").unwrap();
        let pages = doc.get_pages();
        let first = *pages.get(&1).unwrap();
        let content = String::from_utf8_lossy(&doc.get_page_content(first).unwrap()).into_owned();

        let original = content.find("Original page 1").unwrap();
        let overlay = content.find("Do").unwrap();
        assert!(original < overlay);
        assert!(content.trim_start().starts_with('q'));
    }

    #[test]
    fn page_count_is_preserved_across_sizes() {
        let source = fixture(&[
            Some([0, 0, 612, 792]),
            Some([0, 0, 595, 842]),
            Some([0, 0, 792, 612]),
            None,
        ]);
        let protector = Protector::new(policy()).unwrap();
        let protected = protector.protect_bytes(&source).unwrap();
        assert_eq!(protected.pages, 4);
        assert_eq!(protected.watermarked_pages, 4);
        // Letter, A4 and landscape Letter; the inherited box reuses Letter.
        assert_eq!(protector.cached_overlays(), 3);
    }

    #[test]
    fn overlays_are_reused_across_documents() {
        let protector = Protector::new(policy()).unwrap();
        protector.protect_bytes(&letter_pages(2)).unwrap();
        protector.protect_bytes(&letter_pages(5)).unwrap();
        assert_eq!(protector.cached_overlays(), 1);
    }

    #[test]
    fn degenerate_page_is_left_without_overlay() {
        let source = fixture(&[Some([0, 0, 612, 792]), Some([0, 0, 0, 792])]);
        let protector = Protector::new(policy()).unwrap();
        let protected = protector.protect_bytes(&source).unwrap();
        assert_eq!(protected.pages, 2);
        assert_eq!(protected.watermarked_pages, 1);
    }

    #[test]
    fn offset_media_box_uses_its_origin() {
        let source = fixture(&[Some([100, 200, 712, 992])]);
        let protector = Protector::new(policy()).unwrap();
        let protected = protector.protect_bytes(&source).unwrap();

        let doc = open_with_password(&protected.bytes, "P1").unwrap();
        let page = *doc.get_pages().get(&1).unwrap();
        let ops = Content::decode(&doc.get_page_content(page).unwrap())
            .unwrap()
            .operations;
        let cm = ops.iter().find(|op| op.operator == "cm").unwrap();
        assert_eq!(number(&cm.operands[4]), Some(100.0));
        assert_eq!(number(&cm.operands[5]), Some(200.0));
    }

    #[test]
    fn already_encrypted_source_is_rejected() {
        let protector = Protector::new(policy()).unwrap();
        let protected = protector.protect_bytes(&letter_pages(1)).unwrap();

        let err = protector.protect_bytes(&protected.bytes).unwrap_err();
        match err {
            GuardError::UnreadableSource(detail) => assert!(detail.contains("decrypted")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn garbage_is_unreadable() {
        let protector = Protector::new(policy()).unwrap();
        assert!(matches!(
            protector.protect_bytes(b"definitely not a pdf"),
            Err(GuardError::UnreadableSource(_))
        ));
    }

    #[test]
    fn empty_page_tree_is_unreadable() {
        let protector = Protector::new(policy()).unwrap();
        assert!(matches!(
            protector.protect_bytes(&fixture(&[])),
            Err(GuardError::UnreadableSource(_))
        ));
    }

    #[test]
    fn metadata_is_carried_forward() {
        let protector = Protector::new(policy()).unwrap();
        let protected = protector.protect_bytes(&letter_pages(1)).unwrap();
        let doc = open_with_password(&protected.bytes, "P1").unwrap();
        let info = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        assert!(doc.get_dictionary(info).unwrap().has(b"Title"));
    }

    #[test]
    fn every_placement_protects() {
        for placement in [Placement::Bottom, Placement::Center, Placement::Diagonal] {
            let style = WatermarkStyle {
                placement,
                ..WatermarkStyle::default()
            };
            let protector = Protector::new(policy().with_watermark(style)).unwrap();
            let protected = protector.protect_bytes(&letter_pages(1)).unwrap();
            assert_eq!(protected.pages, 1);
        }
    }

    #[test]
    fn incomplete_policy_is_rejected() {
        assert!(matches!(
            Protector::new(ProtectionPolicy::default()),
            Err(GuardError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn protect_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letter.pdf");
        let source = letter_pages(2);
        std::fs::write(&path, &source).unwrap();

        let protector = Protector::new(policy()).unwrap();
        let protected = protector.protect_file(&path).unwrap();
        assert_eq!(protected.pages, 2);
        assert_eq!(std::fs::read(&path).unwrap(), source);
    }
}
