//! String helpers shared by the normalizer, the adapters and the presenters.

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and byte count indicator appended.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Shorten `s` to at most `max_chars` characters, ending with `…` when cut.
///
/// Counts characters, not bytes: Greek text is multi-byte.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

/// Convert a source name to an HTML anchor id.
///
/// ```ignore
/// assert_eq!(slugify("Proto Thema"), "proto-thema");
/// ```
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // each Greek letter is two bytes
        let result = truncate_for_log("αβγδ", 3);
        assert!(result.starts_with('α'));
        assert!(result.contains("(+6 bytes)"));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Title  "), "Title");
        assert_eq!(collapse_whitespace("a\n\t  b   c"), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("Καλημέρα κόσμε", 9), "Καλημέρα…");
        assert_eq!(truncate_chars("abcdef", 4).chars().count(), 4);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Proto Thema"), "proto-thema");
        assert_eq!(slugify("In.gr"), "ingr");
        assert_eq!(slugify("To  Vima"), "to-vima");
    }
}
