use feed_rs::parser;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::util::strip_html;

/// One item as it came out of a feed. Lives only for the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    pub summary: Option<String>,
    pub published: Option<String>,
}

/// Entries parsed from one feed document, plus how many items were dropped.
#[derive(Debug, Default)]
pub struct ParseResult {
    pub entries: Vec<RawEntry>,
    /// Items without a usable link
    pub skipped: usize,
}

/// Root elements accepted as syndication markup.
const FEED_ROOTS: &[&[u8]] = &[b"rss", b"feed", b"RDF"];

/// Checks that `bytes` is well-formed XML with an RSS, Atom or RDF root.
///
/// Block pages and captchas are usually served as HTML with a 200 status;
/// they fail here instead of producing an empty feed.
pub fn validate_markup(bytes: &[u8]) -> Result<(), String> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut root_seen = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    if root_seen {
                        return Err("multiple root elements".to_string());
                    }
                    check_root(e.local_name().as_ref())?;
                    root_seen = true;
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    check_root(e.local_name().as_ref())?;
                    root_seen = true;
                }
            }
            Ok(Event::End(_)) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unexpected closing tag".to_string())?;
            }
            Ok(Event::Text(t)) if depth == 0 => {
                if !t.iter().all(u8::is_ascii_whitespace) {
                    return Err("text outside root element".to_string());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "malformed XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
        }
        buf.clear();
    }

    if !root_seen {
        return Err("no root element".to_string());
    }
    if depth != 0 {
        return Err(format!("{depth} unclosed element(s) at end of document"));
    }
    Ok(())
}

fn check_root(name: &[u8]) -> Result<(), String> {
    if FEED_ROOTS.contains(&name) {
        Ok(())
    } else {
        Err(format!(
            "unexpected root element <{}>",
            String::from_utf8_lossy(name)
        ))
    }
}

/// Parses RSS/Atom bytes into raw entries.
///
/// Items without a link cannot be deduplicated and are skipped (counted in
/// [`ParseResult::skipped`]). Titles and summaries are reduced to plain text
/// before anything matches or truncates them. Missing titles become
/// `"Untitled"`; the summary falls back to the content body; `published`
/// prefers the published date and falls back to the updated date, rendered
/// as RFC 2822.
pub fn parse_feed(bytes: &[u8]) -> Result<ParseResult, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let mut result = ParseResult::default();
    for entry in feed.entries {
        let link = entry
            .links
            .iter()
            .map(|l| l.href.trim())
            .find(|href| !href.is_empty())
            .map(str::to_string);

        let Some(link) = link else {
            result.skipped += 1;
            continue;
        };

        let title = entry
            .title
            .map(|t| strip_html(&t.content))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());
        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .map(|s| strip_html(&s))
            .filter(|s| !s.is_empty());
        let published = entry.published.or(entry.updated).map(|dt| dt.to_rfc2822());

        result.entries.push(RawEntry {
            title,
            link,
            summary,
            published,
        });
    }

    Ok(result)
}
