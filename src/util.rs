//! Small text helpers shared across the gateway and pipeline.

/// Truncate a string for display (Unicode-safe).
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    if s.chars().count() <= max_chars {
        s
    } else {
        let byte_idx = s
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        &s[..byte_idx]
    }
}

/// Truncate file contents for prompt safety, keeping the beginning and end.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let head: String = content.chars().take(max_chars / 2).collect();
        let tail: String = content
            .chars()
            .rev()
            .take(max_chars / 2)
            .collect::<String>()
            .chars()
            .rev()
            .collect();
        format!("{}\n\n... [truncated] ...\n\n{}", head, tail)
    }
}
