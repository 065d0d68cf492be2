use std::borrow::Cow;

/// Ellipsis appended to summaries that were shortened.
const ELLIPSIS: &str = "...";

/// Sentence boundary used as the preferred cut point.
const SENTENCE_BREAK: &str = ". ";

/// Shortens a summary to at most `max_chars` characters (plus ellipsis).
///
/// - Summaries of `max_chars` characters or fewer are returned borrowed and unchanged.
/// - Longer summaries are cut after the last `". "` boundary whose period still
///   falls within the limit, keeping the period, and `"..."` is appended.
/// - With no such boundary, the text is hard-cut at `max_chars` characters and
///   `"..."` is appended.
///
/// Lengths are counted in `char`s, so multi-byte text (Korean titles, emoji) is
/// never split inside a code point.
///
/// # Examples
///
/// ```
/// use passwatch::util::truncate_summary;
///
/// assert_eq!(truncate_summary("Short one.", 300), "Short one.");
/// assert_eq!(truncate_summary("First. Second part", 10), "First....");
/// assert_eq!(truncate_summary("abcdefghijkl", 5), "abcde...");
/// ```
pub fn truncate_summary(s: &str, max_chars: usize) -> Cow<'_, str> {
    // Byte offset of the char at index `max_chars` (or None when the text fits)
    let Some((limit_byte, _)) = s.char_indices().nth(max_chars) else {
        return Cow::Borrowed(s);
    };

    // Look one char past the limit so a ". " straddling the limit still counts:
    // the period itself is then the last kept character.
    let window_end = s[limit_byte..]
        .chars()
        .next()
        .map(|c| limit_byte + c.len_utf8())
        .unwrap_or(limit_byte);
    let window = &s[..window_end];

    match window.rfind(SENTENCE_BREAK) {
        Some(pos) if pos > 0 => Cow::Owned(format!("{}{}", &s[..=pos], ELLIPSIS)),
        _ => Cow::Owned(format!("{}{}", &s[..limit_byte], ELLIPSIS)),
    }
}

/// Strips control characters from feed-provided text and collapses runs of
/// whitespace into single spaces.
///
/// Feed titles frequently arrive with embedded newlines and tabs from CMS
/// templates; this keeps subjects, log lines and the digest readable.
/// Returns `Cow::Borrowed` when nothing needs changing.
pub fn clean_text(s: &str) -> Cow<'_, str> {
    let trimmed = s.trim();
    let needs_work = trimmed.contains("  ")
        || trimmed
            .chars()
            .any(|c| c.is_control() || (c.is_whitespace() && c != ' '));

    if !needs_work {
        return Cow::Borrowed(trimmed);
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut pending_space = false;
    for c in trimmed.chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else if c.is_control() {
            continue;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Tags that separate blocks of text; removing them leaves a space.
const BLOCK_TAGS: &[&str] = &[
    "p", "br", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "tr",
    "td",
];

/// Converts an HTML fragment from a feed into plain text.
///
/// Tags are dropped (block-level ones become a space), entities are decoded
/// after the tags are gone so escaped markup survives as literal text, and the
/// result goes through [`clean_text`]. A `<` not followed by a tag-like
/// character is kept as text.
///
/// # Examples
///
/// ```
/// use passwatch::util::strip_html;
///
/// assert_eq!(
///     strip_html("<p>Three <strong>great</strong> games</p><p>Tom &amp; Jerry</p>"),
///     "Three great games Tom & Jerry"
/// );
/// ```
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        let starts_tag = c == '<'
            && chars
                .peek()
                .is_some_and(|n| n.is_ascii_alphabetic() || matches!(n, '/' | '!' | '?'));
        if !starts_tag {
            text.push(c);
            continue;
        }

        let mut tag = String::new();
        for t in chars.by_ref() {
            if t == '>' {
                break;
            }
            tag.push(t);
        }
        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if BLOCK_TAGS.contains(&name.as_str()) {
            text.push(' ');
        }
    }

    let decoded = html_escape::decode_html_entities(&text);
    clean_text(&decoded).into_owned()
}

/// Returns at most the first `max_chars` characters of `s`, for log context.
pub fn prefix(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_summary_unchanged() {
        let s = "Hollow Knight: Silksong joins Game Pass today.";
        let out = truncate_summary(s, 300);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, s);
    }

    #[test]
    fn test_exactly_at_limit_unchanged() {
        let s = "a".repeat(300);
        assert_eq!(truncate_summary(&s, 300), s.as_str());
    }

    #[test]
    fn test_cut_at_last_sentence_boundary() {
        let first = "a".repeat(150);
        let second = "b".repeat(100);
        let tail = "c".repeat(200);
        let s = format!("{first}. {second}. {tail}");

        let out = truncate_summary(&s, 300);
        assert_eq!(out, format!("{first}. {second}...."));
        assert!(out.chars().count() <= 303);
    }

    #[test]
    fn test_boundary_straddling_limit_is_used() {
        // Period is the 300th char, the space the 301st
        let head = "a".repeat(299);
        let s = format!("{head}. {}", "z".repeat(50));
        assert_eq!(truncate_summary(&s, 300), format!("{head}...."));
    }

    #[test]
    fn test_boundary_beyond_limit_ignored() {
        let s = format!("{}. tail", "a".repeat(320));
        assert_eq!(truncate_summary(&s, 300), format!("{}...", "a".repeat(300)));
    }

    #[test]
    fn test_hard_cut_without_boundary() {
        let s = "x".repeat(400);
        let out = truncate_summary(&s, 300);
        assert_eq!(out.chars().count(), 303);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_multibyte_hard_cut() {
        let s = "게임".repeat(200);
        let out = truncate_summary(&s, 300);
        assert_eq!(out.chars().count(), 303);
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Coming\n\tto   Game Pass "), "Coming to Game Pass");
        assert_eq!(clean_text("bell\u{7}char"), "bellchar");
    }

    #[test]
    fn test_clean_text_borrows_clean_input() {
        assert!(matches!(clean_text("Already clean"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_html_drops_tags_and_decodes_entities() {
        let html = "<p>Three <strong>great</strong> games are coming.</p>\
                    <p>The post <a href=\"https://news.xbox.com/gamepass/x\">Wire</a> \
                    appeared first on Xbox&nbsp;Wire &#8217;25.</p>";
        assert_eq!(
            strip_html(html),
            "Three great games are coming. The post Wire appeared first on Xbox Wire \u{2019}25."
        );
    }

    #[test]
    fn test_strip_html_keeps_escaped_markup_as_text() {
        assert_eq!(strip_html("Use &lt;b&gt; for bold"), "Use <b> for bold");
        assert_eq!(strip_html("1 < 2 and 3 > 2"), "1 < 2 and 3 > 2");
    }

    #[test]
    fn test_strip_html_plain_text_unchanged() {
        assert_eq!(strip_html("Out now."), "Out now.");
        assert_eq!(strip_html("line<br/>break"), "line break");
    }

    #[test]
    fn test_prefix() {
        assert_eq!(prefix("Game Pass", 4), "Game");
        assert_eq!(prefix("짧음", 50), "짧음");
    }
}
