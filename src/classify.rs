//! Relevance filtering and addition/removal classification of feed entries.
//!
//! Relevance and classification are driven by separate rule lists and are
//! evaluated independently: an entry can be relevant yet match neither
//! pattern list, and can match both lists at once.
use regex::{Regex, RegexBuilder};

use crate::config::{Rules, RulesError};

/// Outcome of pattern matching for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub is_addition: bool,
    pub is_removal: bool,
}

/// Compiled form of [`Rules`]. Cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Classifier {
    keywords: Vec<String>,
    add_patterns: Vec<Regex>,
    remove_patterns: Vec<Regex>,
}

impl Classifier {
    /// Compile rules into a classifier.
    ///
    /// Keywords are lowercased once here (whitespace kept, empty ones dropped);
    /// patterns compile case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::Pattern`] naming the first pattern that fails to compile.
    pub fn new(rules: &Rules) -> Result<Self, RulesError> {
        let keywords = rules
            .keywords
            .iter()
            .filter(|k| !k.is_empty())
            .map(|k| k.to_lowercase())
            .collect();

        Ok(Self {
            keywords,
            add_patterns: compile_all(&rules.add_patterns)?,
            remove_patterns: compile_all(&rules.remove_patterns)?,
        })
    }

    /// True if any keyword occurs as a substring of the lowercased
    /// `title + " " + summary`.
    pub fn is_relevant(&self, title: &str, summary: Option<&str>) -> bool {
        self.matches_keywords(&match_text(title, summary))
    }

    /// Tests the entry against the addition and removal pattern lists.
    pub fn classify(&self, title: &str, summary: Option<&str>) -> Classification {
        self.classify_text(&match_text(title, summary))
    }

    /// Relevance check followed by classification, sharing one lowercase pass.
    ///
    /// Returns `None` for irrelevant entries.
    pub fn evaluate(&self, title: &str, summary: Option<&str>) -> Option<Classification> {
        let text = match_text(title, summary);
        self.matches_keywords(&text).then(|| self.classify_text(&text))
    }

    // Both helpers expect text already built by `match_text`
    fn matches_keywords(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }

    fn classify_text(&self, text: &str) -> Classification {
        Classification {
            is_addition: self.add_patterns.iter().any(|re| re.is_match(text)),
            is_removal: self.remove_patterns.iter().any(|re| re.is_match(text)),
        }
    }
}

fn match_text(title: &str, summary: Option<&str>) -> String {
    format!("{} {}", title, summary.unwrap_or("")).to_lowercase()
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, RulesError> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|source| RulesError::Pattern {
                    pattern: p.clone(),
                    source,
                })
        })
        .collect()
}
