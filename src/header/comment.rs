//! Comment-string detection and stripping.

/// The header marker token.
pub const MARKER: &str = "---";

/// Characters a comment string may be built from (besides blanks).
pub const COMMENT_CHARS: [char; 5] = ['#', ';', '%', '/', '!'];

/// Decide whether `line` opens a header block and, if so, which comment string it uses.
///
/// The line opens a block when, after dropping its terminator and trailing whitespace, it is a
/// valid comment string immediately followed by [`MARKER`]. Only this one line is examined.
///
/// ```rust
/// use csvy::header::detect_comment;
///
/// assert_eq!(detect_comment("---\n"), Some(""));
/// assert_eq!(detect_comment("# ---\r\n"), Some("# "));
/// assert_eq!(detect_comment("a,b,c\n"), None);
/// assert_eq!(detect_comment("----\n"), None);
/// ```
pub fn detect_comment(line: &str) -> Option<&str> {
    let line = line.strip_prefix('\u{feff}').unwrap_or(line);
    let prefix = line.trim_end().strip_suffix(MARKER)?;
    is_valid_comment(prefix).then_some(prefix)
}

/// A comment string is empty or made of blanks and repetitions of one of [`COMMENT_CHARS`].
///
/// Strings outside this set could not be told apart from payload on read, so writers refuse
/// them.
pub fn is_valid_comment(comment: &str) -> bool {
    let mut seen: Option<char> = None;
    for c in comment.chars() {
        if c == ' ' || c == '\t' {
            continue;
        }
        if !COMMENT_CHARS.contains(&c) {
            return false;
        }
        match seen {
            Some(prev) if prev != c => return false,
            _ => seen = Some(c),
        }
    }
    true
}

/// Strip `comment` from a header line (terminator already removed).
///
/// A line whose prefix differs from `comment` only by trailing blanks is accepted when the rest
/// is blank or the marker, so `#---` closes a block opened with `# ---`.
pub(crate) fn strip_comment<'a>(line: &'a str, comment: &str) -> Option<&'a str> {
    if let Some(rest) = line.strip_prefix(comment) {
        return Some(rest);
    }
    let rest = line.strip_prefix(comment.trim_end())?;
    let trimmed = rest.trim();
    (trimmed.is_empty() || trimmed == MARKER).then_some(rest)
}

/// Drop a trailing `\n` or `\r\n`.
pub(crate) fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_plain_and_prefixed_markers() {
        assert_eq!(detect_comment("---"), Some(""));
        assert_eq!(detect_comment("---   \n"), Some(""));
        assert_eq!(detect_comment("#---\n"), Some("#"));
        assert_eq!(detect_comment("## ---\n"), Some("## "));
        assert_eq!(detect_comment(";---\n"), Some(";"));
        assert_eq!(detect_comment("//---\n"), Some("//"));
    }

    #[test]
    fn strips_byte_order_mark() {
        assert_eq!(detect_comment("\u{feff}#---\n"), Some("#"));
    }

    #[test]
    fn rejects_non_marker_lines() {
        assert_eq!(detect_comment(""), None);
        assert_eq!(detect_comment("\n"), None);
        assert_eq!(detect_comment("--- Something else\n"), None);
        assert_eq!(detect_comment("x---\n"), None);
        assert_eq!(detect_comment("#;---\n"), None);
        assert_eq!(detect_comment("-----\n"), None);
    }

    #[test]
    fn valid_comments() {
        assert!(is_valid_comment(""));
        assert!(is_valid_comment("# "));
        assert!(is_valid_comment("%%"));
        assert!(!is_valid_comment("#;"));
        assert!(!is_valid_comment("a"));
        assert!(!is_valid_comment("#\n"));
    }

    #[test]
    fn strip_comment_requires_uniform_prefix() {
        assert_eq!(strip_comment("#name: demo", "#"), Some("name: demo"));
        assert_eq!(strip_comment(";---", "#"), None);
        assert_eq!(strip_comment("---", "#"), None);
        assert_eq!(strip_comment("#---", "# "), Some("---"));
        assert_eq!(strip_comment("#", "# "), Some(""));
        assert_eq!(strip_comment("#x: 1", "# "), None);
        assert_eq!(strip_comment("anything", ""), Some("anything"));
    }

    #[test]
    fn trims_line_endings() {
        assert_eq!(trim_line_ending("a\r\n"), "a");
        assert_eq!(trim_line_ending("a\n"), "a");
        assert_eq!(trim_line_ending("a"), "a");
    }
}
