//! Small helpers shared across the codebase.

/// Truncate a string to at most `max_chars` characters, appending "..." when
/// anything was cut. Counts characters, not bytes, so multi-byte input never
/// splits a UTF-8 sequence.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    // Byte length bounds char count from above.
    if s.len() <= max_chars || s.chars().count() <= max_chars {
        return s.to_string();
    }

    let suffix = "...";
    if max_chars <= suffix.len() {
        return suffix.chars().take(max_chars).collect();
    }

    let kept: String = s.chars().take(max_chars - suffix.len()).collect();
    format!("{}{}", kept, suffix)
}
