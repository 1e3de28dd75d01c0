use std::borrow::Cow;
use std::iter::Peekable;
use std::str::Chars;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Flatten feed-supplied text to one terminal-safe line.
///
/// ANSI escape sequences (CSI `ESC [ ... final`, OSC `ESC ] ... BEL|ST`) and
/// other control characters are dropped; runs of whitespace, newlines
/// included, collapse to a single space. Leading and trailing whitespace is
/// trimmed.
pub fn to_display_line(s: &str) -> Cow<'_, str> {
    let clean = s
        .chars()
        .all(|c| !c.is_control() && (c == ' ' || !c.is_whitespace()))
        && !s.contains("  ")
        && s.trim() == s;
    if clean {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            skip_escape(&mut chars);
            continue;
        }
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if c.is_control() {
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }

    Cow::Owned(out)
}

fn skip_escape(chars: &mut Peekable<Chars<'_>>) {
    match chars.peek() {
        Some('[') => {
            chars.next();
            for c in chars.by_ref() {
                if ('\u{40}'..='\u{7e}').contains(&c) {
                    break;
                }
            }
        }
        Some(']') => {
            chars.next();
            while let Some(c) = chars.next() {
                if c == '\u{7}' {
                    break;
                }
                if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                    chars.next();
                    break;
                }
            }
        }
        // Bare ESC
        _ => {}
    }
}

/// Cut `s` to at most `max_width` terminal columns, ending in "..." when
/// anything was removed. Wide characters (CJK, emoji) count as two columns.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if UnicodeWidthStr::width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    // Too narrow for an ellipsis: plain cut
    let budget = if max_width > ELLIPSIS_WIDTH {
        max_width - ELLIPSIS_WIDTH
    } else {
        max_width
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    if max_width > ELLIPSIS_WIDTH {
        Cow::Owned(format!("{}{}", &s[..end], ELLIPSIS))
    } else {
        Cow::Owned(s[..end].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clean_line_is_borrowed() {
        assert!(matches!(to_display_line("Plain title"), Cow::Borrowed(_)));
        assert!(matches!(to_display_line("日本語のタイトル"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_whitespace_collapses() {
        assert_eq!(to_display_line("  one\n\ttwo   three \r\n"), "one two three");
    }

    #[test]
    fn test_ansi_sequences_removed() {
        assert_eq!(to_display_line("\x1b[31mred\x1b[0m text"), "red text");
        assert_eq!(to_display_line("a\x1b]0;evil title\x07b"), "ab");
        assert_eq!(to_display_line("a\x1b]8;;http://x\x1b\\b"), "ab");
        assert_eq!(to_display_line("bare\x1b esc"), "bare esc");
    }

    #[test]
    fn test_control_chars_removed() {
        assert_eq!(to_display_line("bell\x07 and\x00 del\x7f"), "bell and del");
    }

    #[test]
    fn test_truncate_fits() {
        assert_eq!(truncate_to_width("Short", 10), "Short");
        assert_eq!(truncate_to_width("Exact", 5), "Exact");
    }

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // 2 columns each: 4 columns of text + ellipsis
        assert_eq!(truncate_to_width("你好世界", 7), "你好...");
    }

    #[test]
    fn test_truncate_narrow_widths() {
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Test", 2), "Te");
        assert_eq!(truncate_to_width("Test", 3), "Tes");
    }

    proptest! {
        #[test]
        fn prop_truncate_respects_width(s in "\\PC{0,40}", width in 0usize..30) {
            let out = truncate_to_width(&s, width);
            prop_assert!(UnicodeWidthStr::width(out.as_ref()) <= width);
        }

        #[test]
        fn prop_display_line_has_no_controls(s in ".{0,60}") {
            let out = to_display_line(&s);
            prop_assert!(!out.chars().any(|c| c.is_control()));
        }
    }
}
