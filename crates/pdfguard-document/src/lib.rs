// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfguard-document — Document operations for the pdfguard batch pipeline.
//
// Renders watermark overlays, composites them onto every page, applies the
// standard security handler, and inspects or generates documents for trial runs.

pub mod pdf;

// Re-export the primary types so callers can use `pdfguard_document::Protector` etc.
pub use pdf::inspect::{Inspection, inspect_bytes, inspect_file};
pub use pdf::protect::{ProtectedDocument, Protector};
pub use pdf::reader::{is_encrypted, open, open_with_password};
pub use pdf::sample::SampleWriter;
pub use pdf::security::StandardSecurityHandler;
pub use pdf::watermark::{Overlay, render_overlay};
