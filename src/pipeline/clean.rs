//! Normalization of generated test code.
//!
//! Providers hand code back in uneven shapes: wrapped in markdown fences,
//! with escape sequences delivered literally (`\n` as two characters), or
//! padded with blank lines. The normalized form is plain source text.

/// Clean a raw code reply into displayable, committable source.
pub fn clean_code_response(code: &str) -> String {
    if code.is_empty() {
        return String::new();
    }

    let cleaned = strip_fence_markers(code);

    // Literal escape sequences show up when the provider double-encodes
    // its output. Windows and old-Mac line endings both normalize to \n.
    let cleaned = cleaned
        .replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\\r", "\n")
        .replace("\\t", "\t")
        .replace("\\'", "'")
        .replace("\\\"", "\"")
        .replace("\\\\", "\\");

    trim_blank_edges(&cleaned)
}

/// Remove every ``` marker together with its language tag. Markers may
/// appear mid-line when the reply uses literal `\n` separators.
fn strip_fence_markers(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;
    while let Some(idx) = rest.find("```") {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 3..];
        let tag_end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        rest = &rest[tag_end..];
        if let Some(stripped) = rest.strip_prefix('\n') {
            rest = stripped;
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Drop blank lines at the start and end, keeping interior ones.
fn trim_blank_edges(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let Some(start) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return String::new();
    };
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map(|i| i + 1)
        .unwrap_or(lines.len());
    lines[start..end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fences_with_language_tag() {
        let raw = "```javascript\ntest('x', () => {});\n```";
        assert_eq!(clean_code_response(raw), "test('x', () => {});");
    }

    #[test]
    fn test_strips_fences_with_literal_escapes() {
        // Fences and newlines both arrive as literal text.
        let raw = "```javascript\\ntest('x', () => {});\\n```";
        assert_eq!(clean_code_response(raw), "test('x', () => {});");
    }

    #[test]
    fn test_unescapes_common_sequences() {
        let raw = r#"const s = \"a\";\n\tconst t = \'b\';"#;
        assert_eq!(clean_code_response(raw), "const s = \"a\";\n\tconst t = 'b';");
    }

    #[test]
    fn test_windows_line_endings_normalize() {
        let raw = "line1\\r\\nline2\\rline3";
        assert_eq!(clean_code_response(raw), "line1\nline2\nline3");
    }

    #[test]
    fn test_interior_blank_lines_survive() {
        let raw = "\n\nfirst();\n\nsecond();\n\n\n";
        assert_eq!(clean_code_response(raw), "first();\n\nsecond();");
    }

    #[test]
    fn test_double_backslash_collapses_last() {
        assert_eq!(clean_code_response(r"path = 'a\\b';"), r"path = 'a\b';");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_code_response(""), "");
        assert_eq!(clean_code_response("\n  \n"), "");
    }

    #[test]
    fn test_plain_code_passes_through() {
        let raw = "def test_add():\n    assert add(1, 2) == 3";
        assert_eq!(clean_code_response(raw), raw);
    }
}
