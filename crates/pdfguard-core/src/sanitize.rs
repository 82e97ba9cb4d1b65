// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filename sanitization — a pure string transformation, independent of the
// filesystem and of any pipeline stage.

use unicode_normalization::UnicodeNormalization;

/// Strip or replace characters that trip up shells, URLs and some PDF tools,
/// then apply Unicode NFKD normalization.
///
/// Brackets of every kind, `?`, `*`, `<` and `>` are removed; `:` and `|`
/// become `-`; `"` becomes `'`.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .filter_map(|c| match c {
            '(' | ')' | '[' | ']' | '{' | '}' | '?' | '*' | '<' | '>' => None,
            ':' | '|' => Some('-'),
            '"' => Some('\''),
            other => Some(other),
        })
        .collect();

    replaced.nfkd().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_brackets_and_wildcards() {
        assert_eq!(
            sanitize_filename("Claim (Final) [v2] {draft}?*.pdf"),
            "Claim Final v2 draft.pdf"
        );
    }

    #[test]
    fn replaces_separators_and_quotes() {
        assert_eq!(
            sanitize_filename("Index: \"Master\" | Spanish.pdf"),
            "Index- 'Master' - Spanish.pdf"
        );
    }

    #[test]
    fn removes_angle_brackets() {
        assert_eq!(sanitize_filename("<tmp>.pdf"), "tmp.pdf");
    }

    #[test]
    fn applies_nfkd() {
        let out = sanitize_filename("Índice.pdf");
        assert_eq!(out, "I\u{301}ndice.pdf");
        // Compatibility characters decompose too.
        assert_eq!(sanitize_filename("ﬁle.pdf"), "file.pdf");
    }

    #[test]
    fn clean_names_are_unchanged() {
        assert_eq!(sanitize_filename("demand-letter.pdf"), "demand-letter.pdf");
    }
}
