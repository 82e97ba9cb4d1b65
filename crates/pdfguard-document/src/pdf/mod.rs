// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading, overlays, protection, inspection and sample generation.

pub mod font;
pub mod inspect;
pub mod protect;
pub mod reader;
pub mod sample;
pub mod security;
pub mod watermark;

pub use protect::Protector;
pub use sample::SampleWriter;
