// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Helvetica metrics and WinAnsi encoding for overlay text.
//
// Overlays use the standard-14 Helvetica font so nothing has to be embedded;
// centring the text needs its advance widths, which are fixed by the AFM.

/// Advance widths (1/1000 em) for WinAnsi codes 32..=126.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Characters WinAnsi places in 0x80..=0x9F, with their codes and Helvetica
/// widths. 0x81, 0x8D, 0x8F, 0x90 and 0x9D are unassigned.
const WIN_ANSI_HIGH: [(char, u8, u16); 27] = [
    ('\u{20AC}', 0x80, 556), // €
    ('\u{201A}', 0x82, 222), // ‚
    ('\u{0192}', 0x83, 556), // ƒ
    ('\u{201E}', 0x84, 333), // „
    ('\u{2026}', 0x85, 1000), // …
    ('\u{2020}', 0x86, 556), // †
    ('\u{2021}', 0x87, 556), // ‡
    ('\u{02C6}', 0x88, 333), // ˆ
    ('\u{2030}', 0x89, 1000), // ‰
    ('\u{0160}', 0x8A, 667), // Š
    ('\u{2039}', 0x8B, 333), // ‹
    ('\u{0152}', 0x8C, 1000), // Œ
    ('\u{017D}', 0x8E, 611), // Ž
    ('\u{2018}', 0x91, 222), // ‘
    ('\u{2019}', 0x92, 222), // ’
    ('\u{201C}', 0x93, 333), // “
    ('\u{201D}', 0x94, 333), // ”
    ('\u{2022}', 0x95, 350), // •
    ('\u{2013}', 0x96, 556), // –
    ('\u{2014}', 0x97, 1000), // —
    ('\u{02DC}', 0x98, 333), // ˜
    ('\u{2122}', 0x99, 1000), // ™
    ('\u{0161}', 0x9A, 500), // š
    ('\u{203A}', 0x9B, 333), // ›
    ('\u{0153}', 0x9C, 944), // œ
    ('\u{017E}', 0x9E, 500), // ž
    ('\u{0178}', 0x9F, 667), // Ÿ
];

/// Width used for Latin-1 letters outside ASCII (accented vowels, ñ, ç...).
const HELVETICA_LATIN1_DEFAULT: u16 = 556;

/// Encode text for a WinAnsi simple font. Characters WinAnsi cannot
/// represent become `?`.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if (0x20..=0x7E).contains(&code) || (0xA0..=0xFF).contains(&code) {
                return code as u8;
            }
            WIN_ANSI_HIGH
                .iter()
                .find(|(ch, _, _)| *ch == c)
                .map_or(b'?', |&(_, byte, _)| byte)
        })
        .collect()
}

/// Advance width of one WinAnsi byte in 1/1000 em.
fn glyph_width(byte: u8) -> u16 {
    match byte {
        32..=126 => HELVETICA_ASCII[(byte - 32) as usize],
        0x80..=0x9F => WIN_ANSI_HIGH
            .iter()
            .find(|(_, code, _)| *code == byte)
            .map_or(HELVETICA_LATIN1_DEFAULT, |&(_, _, width)| width),
        0xA0 => 278,
        _ => HELVETICA_LATIN1_DEFAULT,
    }
}

/// Width in points of `encoded` set in Helvetica at `font_size`.
pub fn text_width(encoded: &[u8], font_size: f32) -> f32 {
    let units: u32 = encoded.iter().map(|b| glyph_width(*b) as u32).sum();
    units as f32 * font_size / 1000.0
}
