// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sample document writer — generates plain multi-page claim letters with
// `printpdf` 0.8 so a library can be trial-run before real documents are
// protected.

use std::path::Path;

use pdfguard_core::PageSize;
use pdfguard_core::error::{GuardError, Result};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, TextItem,
};
use tracing::{debug, info, instrument};

const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Body text placed on every sample page.
const SAMPLE_BODY: &str = "My property was damaged by a severe storm. I have submitted all \
required documentation but have not received any response from your claims department. \
I am requesting immediate processing of my claim and payment of the covered damages.\n\n\
Policy number: POL-123456789\nClaim number: CLM-987654321\nDate of loss: 2024-01-15";

/// Creates unencrypted sample documents.
pub struct SampleWriter {
    page_size: PageSize,
    title: String,
}

impl SampleWriter {
    /// Create a writer producing pages of `page_size`.
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            title: "Payment Demand Letter".to_string(),
        }
    }

    /// Create a writer defaulting to US Letter.
    pub fn letter() -> Self {
        Self::new(PageSize::LETTER)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    // -- Generation -----------------------------------------------------------

    /// Build a document with `pages` pages, each carrying a heading and the
    /// sample letter body.
    #[instrument(skip(self), fields(title = %self.title))]
    pub fn create(&self, pages: usize) -> Result<Vec<u8>> {
        if pages == 0 {
            return Err(GuardError::Config(
                "a sample document needs at least one page".to_string(),
            ));
        }
        if !self.page_size.is_valid() {
            return Err(GuardError::InvalidGeometry {
                width: self.page_size.width,
                height: self.page_size.height,
            });
        }

        info!(pages, "Creating sample PDF");

        let page_w = Mm(self.page_size.width / POINTS_PER_MM);
        let page_h = Mm(self.page_size.height / POINTS_PER_MM);

        let heading_size: f32 = 18.0;
        let font_size: f32 = 11.0;
        let line_height: f32 = 14.0;
        let margin: f32 = 72.0;

        // Helvetica averages roughly half an em per glyph.
        let max_chars = ((self.page_size.width - 2.0 * margin) / (0.5 * font_size)) as usize;
        let lines = wrap_text(SAMPLE_BODY, max_chars.max(1));

        let mut doc = PdfDocument::new(&self.title);
        let mut rendered = Vec::with_capacity(pages);

        for index in 0..pages {
            let mut ops: Vec<Op> = Vec::new();
            let top = self.page_size.height - margin;

            let heading = format!("{} - page {} of {}", self.title, index + 1, pages);
            push_line(&mut ops, &heading, margin, top, heading_size, BuiltinFont::HelveticaBold);

            for (line_idx, line) in lines.iter().enumerate() {
                let y = top - 2.0 * line_height - line_idx as f32 * line_height;
                if y < margin {
                    break;
                }
                push_line(&mut ops, line, margin, y, font_size, BuiltinFont::Helvetica);
            }

            rendered.push(PdfPage::new(page_w, page_h, ops));
        }

        doc.with_pages(rendered);
        debug!(lines = lines.len(), pages = doc.pages.len(), "Sample layout complete");

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        Ok(doc.save(&PdfSaveOptions::default(), &mut warnings))
    }

    /// Create a sample document and write it to `path`.
    pub fn write_to_file(&self, pages: usize, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.create(pages)?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!("Wrote sample PDF to {}", path.as_ref().display());
        Ok(())
    }
}

fn push_line(ops: &mut Vec<Op>, text: &str, x: f32, y: f32, size: f32, font: BuiltinFont) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point { x: Pt(x), y: Pt(y) },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size),
        font,
    });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(text.to_string())],
        font,
    });
    ops.push(Op::EndTextSection);
}

// -- Text wrapping helper -----------------------------------------------------

/// Wrap text so that no line exceeds `max_width` characters.
///
/// Existing newlines are kept; words longer than `max_width` are force-broken.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current = String::with_capacity(max_width);
        for word in words {
            let mut word = word;
            while word.chars().count() > max_width {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
                let split = word
                    .char_indices()
                    .nth(max_width)
                    .map_or(word.len(), |(idx, _)| idx);
                let (chunk, rest) = word.split_at(split);
                result.push(chunk.to_string());
                word = rest;
            }
            if word.is_empty() {
                continue;
            }
            if current.is_empty() {
                current.push_str(word);
            } else if current.chars().count() + 1 + word.chars().count() <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                result.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        if !current.is_empty() {
            result.push(current);
        }
    }

    result
}
