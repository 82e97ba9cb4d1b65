// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark generator — renders the policy's text into a single-page overlay
// sized for one page size. Overlays are embedded into documents as Form
// XObjects so one rendering can be painted onto any number of pages.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};
use pdfguard_core::error::{GuardError, Result};
use pdfguard_core::{PageSize, Placement, WatermarkStyle};
use tracing::{debug, instrument};

use super::font;

/// Rotation used by `center` placement when none is configured.
const DEFAULT_CENTER_ROTATION: f32 = 45.0;

/// Vertical spacing between the stacked copies of `diagonal` placement.
const DIAGONAL_SPACING: f32 = 100.0;

/// Copies are drawn at offsets -3..=3 times the spacing.
const DIAGONAL_STEPS: i32 = 3;

/// Resource names inside the overlay's own resource dictionary.
const FONT_NAME: &str = "FWm";
const GSTATE_NAME: &str = "GSWm";

/// A rendered watermark layer for one page size.
#[derive(Debug, Clone)]
pub struct Overlay {
    size: PageSize,
    opacity: f32,
    content: Vec<u8>,
}

impl Overlay {
    pub fn size(&self) -> PageSize {
        self.size
    }

    /// The encoded content stream operators.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Add this overlay to `doc` as a Form XObject (with its font and
    /// transparency state) and return the XObject's id.
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let gstate_id = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => Object::Real(self.opacity),
            "CA" => Object::Real(self.opacity),
        });

        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "FormType" => 1,
                "BBox" => vec![
                    0.into(),
                    0.into(),
                    Object::Real(self.size.width),
                    Object::Real(self.size.height),
                ],
                "Resources" => dictionary! {
                    "Font" => dictionary! { FONT_NAME => font_id },
                    "ExtGState" => dictionary! { GSTATE_NAME => gstate_id },
                },
            },
            self.content.clone(),
        );
        doc.add_object(form)
    }
}

/// Render `style` into an overlay of exactly `size`.
///
/// Fails with `InvalidGeometry` when either dimension is not a positive,
/// finite number.
#[instrument(skip(style), fields(width = size.width, height = size.height, placement = ?style.placement))]
pub fn render_overlay(size: PageSize, style: &WatermarkStyle) -> Result<Overlay> {
    if !size.is_valid() {
        return Err(GuardError::InvalidGeometry {
            width: size.width,
            height: size.height,
        });
    }

    let text = font::to_win_ansi(&style.text);
    let text_width = font::text_width(&text, style.font_size);

    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(GSTATE_NAME.as_bytes().to_vec())]),
        Operation::new("g", vec![Object::Real(style.gray)]),
    ];

    match style.placement {
        Placement::Bottom => {
            let x = (size.width - text_width) / 2.0;
            ops.extend(draw_text(&text, style.font_size, x, style.bottom_offset));
        }
        Placement::Center => {
            let degrees = style.rotation.unwrap_or(DEFAULT_CENTER_ROTATION);
            ops.push(rotate_about(size.width / 2.0, size.height / 2.0, degrees));
            ops.extend(draw_text(&text, style.font_size, -text_width / 2.0, 0.0));
        }
        Placement::Diagonal => {
            ops.push(rotate_about(
                size.width / 2.0,
                size.height / 2.0,
                DEFAULT_CENTER_ROTATION,
            ));
            for step in -DIAGONAL_STEPS..=DIAGONAL_STEPS {
                ops.extend(draw_text(
                    &text,
                    style.font_size,
                    -text_width / 2.0,
                    step as f32 * DIAGONAL_SPACING,
                ));
            }
        }
    }

    ops.push(Operation::new("Q", vec![]));

    let content = Content { operations: ops }
        .encode()
        .map_err(|err| GuardError::Encryption(format!("failed to encode overlay: {err}")))?;

    debug!(bytes = content.len(), text_width, "overlay rendered");

    Ok(Overlay {
        size,
        opacity: style.opacity,
        content,
    })
}

/// `cm` operator translating to (cx, cy) and rotating counter-clockwise.
fn rotate_about(cx: f32, cy: f32, degrees: f32) -> Operation {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Operation::new(
        "cm",
        vec![
            Object::Real(cos),
            Object::Real(sin),
            Object::Real(-sin),
            Object::Real(cos),
            Object::Real(cx),
            Object::Real(cy),
        ],
    )
}

/// One text object drawing `text` with its baseline starting at (x, y).
fn draw_text(text: &[u8], font_size: f32, x: f32, y: f32) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_NAME.as_bytes().to_vec()),
                Object::Real(font_size),
            ],
        ),
        Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
        Operation::new(
            "Tj",
            vec![Object::String(text.to_vec(), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops_of(overlay: &Overlay) -> Vec<Operation> {
        Content::decode(overlay.content()).unwrap().operations
    }

    fn count(ops: &[Operation], operator: &str) -> usize {
        ops.iter().filter(|op| op.operator == operator).count()
    }

    fn real(obj: &Object) -> f32 {
        match obj {
            Object::Real(v) => *v as f32,
            Object::Integer(v) => *v as f32,
            other => panic!("not a number: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        let style = WatermarkStyle::default();
        for size in [
            PageSize::new(0.0, 792.0),
            PageSize::new(612.0, 0.0),
            PageSize::new(-5.0, 100.0),
            PageSize::new(f32::INFINITY, 100.0),
        ] {
            assert!(matches!(
                render_overlay(size, &style),
                Err(GuardError::InvalidGeometry { .. })
            ));
        }
    }

    #[test]
    fn bottom_is_centred_and_unrotated() {
        let style = WatermarkStyle::default();
        let overlay = render_overlay(PageSize::LETTER, &style).unwrap();
        assert_eq!(overlay.size(), PageSize::LETTER);

        let ops = ops_of(&overlay);
        assert_eq!(count(&ops, "cm"), 0);
        assert_eq!(count(&ops, "Tj"), 1);

        let td = ops.iter().find(|op| op.operator == "Td").unwrap();
        let x = real(&td.operands[0]);
        let y = real(&td.operands[1]);
        let text = font::to_win_ansi(&style.text);
        let width = font::text_width(&text, style.font_size);
        assert!((x - (612.0 - width) / 2.0).abs() < 0.01);
        assert!((y - 50.0).abs() < 0.01);
    }

    #[test]
    fn center_defaults_to_45_degrees() {
        let style = WatermarkStyle {
            placement: Placement::Center,
            ..WatermarkStyle::default()
        };
        let overlay = render_overlay(PageSize::LETTER, &style).unwrap();
        let ops = ops_of(&overlay);

        let cm = ops.iter().find(|op| op.operator == "cm").unwrap();
        let a = real(&cm.operands[0]);
        let b = real(&cm.operands[1]);
        assert!((a - 45f32.to_radians().cos()).abs() < 1e-3);
        assert!((b - 45f32.to_radians().sin()).abs() < 1e-3);
        assert!((real(&cm.operands[4]) - 306.0).abs() < 0.01);
        assert!((real(&cm.operands[5]) - 396.0).abs() < 0.01);
    }

    #[test]
    fn center_honours_explicit_rotation() {
        let style = WatermarkStyle {
            placement: Placement::Center,
            rotation: Some(0.0),
            ..WatermarkStyle::default()
        };
        let overlay = render_overlay(PageSize::A4, &style).unwrap();
        let ops = ops_of(&overlay);
        let cm = ops.iter().find(|op| op.operator == "cm").unwrap();
        assert!((real(&cm.operands[0]) - 1.0).abs() < 1e-6);
        assert!(real(&cm.operands[1]).abs() < 1e-6);
    }

    #[test]
    fn diagonal_stacks_seven_copies() {
        let style = WatermarkStyle {
            placement: Placement::Diagonal,
            ..WatermarkStyle::default()
        };
        let overlay = render_overlay(PageSize::LETTER, &style).unwrap();
        let ops = ops_of(&overlay);
        assert_eq!(count(&ops, "Tj"), 7);
        assert_eq!(count(&ops, "cm"), 1);

        let offsets: Vec<f32> = ops
            .iter()
            .filter(|op| op.operator == "Td")
            .map(|op| real(&op.operands[1]))
            .collect();
        assert_eq!(offsets.first().copied(), Some(-300.0));
        assert_eq!(offsets.last().copied(), Some(300.0));
    }

    #[test]
    fn graphics_state_is_balanced() {
        for placement in [Placement::Bottom, Placement::Center, Placement::Diagonal] {
            let style = WatermarkStyle {
                placement,
                ..WatermarkStyle::default()
            };
            let ops = ops_of(&render_overlay(PageSize::LETTER, &style).unwrap());
            assert_eq!(count(&ops, "q"), count(&ops, "Q"));
            assert_eq!(count(&ops, "BT"), count(&ops, "ET"));
        }
    }

    #[test]
    fn embed_creates_form_xobject() {
        let overlay = render_overlay(PageSize::LETTER, &WatermarkStyle::default()).unwrap();
        let mut doc = Document::with_version("1.5");
        let id = overlay.embed(&mut doc);

        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(stream.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Form");
        let resources = stream.dict.get(b"Resources").unwrap().as_dict().unwrap();
        assert!(resources.get(b"Font").is_ok());
        assert!(resources.get(b"ExtGState").is_ok());
        assert_eq!(stream.content, overlay.content());
    }
}
