// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the pdfguard-document crate: overlay rendering and
// full document protection on a generated sample.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use pdfguard_core::{PageSize, Placement, ProtectionPolicy, WatermarkStyle};
use pdfguard_document::{Protector, SampleWriter, render_overlay};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Render the diagonal overlay, the placement with the most text objects.
fn bench_render_overlay(c: &mut Criterion) {
    let style = WatermarkStyle {
        placement: Placement::Diagonal,
        ..WatermarkStyle::default()
    };

    c.bench_function("render_overlay (letter, diagonal)", |b| {
        b.iter(|| {
            let overlay = render_overlay(black_box(PageSize::LETTER), &style);
            black_box(overlay.map(|o| o.content().len()).unwrap_or_default());
        });
    });
}

/// Protect a 10-page sample. The overlay cache is warm after the first
/// iteration, so this measures compositing plus encryption.
fn bench_protect_sample(c: &mut Criterion) {
    let Ok(source) = SampleWriter::letter().create(10) else {
        return;
    };
    let Ok(protector) = Protector::new(ProtectionPolicy::new("bench-user", "bench-owner")) else {
        return;
    };

    c.bench_function("protect_bytes (10 letter pages)", |b| {
        b.iter(|| {
            let result = protector.protect_bytes(black_box(&source));
            black_box(result.map(|doc| doc.bytes.len()).unwrap_or_default());
        });
    });
}

criterion_group!(benches, bench_render_overlay, bench_protect_sample);
criterion_main!(benches);
