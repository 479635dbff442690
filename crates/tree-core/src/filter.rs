//! Filter queries.
//!
//! A [`FilterQuery`] is the canonical form of whatever the host passes to `set_filter`: a bare
//! string is sugar for a `contains` query over its text, and a query whose every part is empty
//! normalizes to `None` ("no filter"). [`CompiledQuery`] turns a query into reusable matchers for
//! the default matching rules and the default highlight ranges.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How query terms are compared against a node's search text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Every term must occur as a substring. Text is split on whitespace.
    #[default]
    Contains,
    /// Every term must equal the whole search text. Text is never tokenized.
    Exact,
}

/// A canonical filter query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterQuery {
    /// Free text.
    pub text: Option<String>,
    /// Extra terms, each of which must match.
    pub tokens: Vec<String>,
    /// Data fields the host wants matched (interpreted by adapter matchers only).
    pub fields: Vec<String>,
    /// Host-specific switches (interpreted by adapter matchers only).
    pub flags: BTreeMap<String, bool>,
    /// Compare case-sensitively.
    pub case_sensitive: bool,
    /// Term comparison mode.
    pub mode: MatchMode,
}

impl FilterQuery {
    /// A `contains` query over `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// An `exact` query over `text`.
    pub fn exact(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            mode: MatchMode::Exact,
            ..Self::default()
        }
    }

    /// Builder: add a token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.tokens.push(token.into());
        self
    }

    /// Builder: set case sensitivity.
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Builder: set a host flag.
    pub fn with_flag(mut self, flag: impl Into<String>, value: bool) -> Self {
        self.flags.insert(flag.into(), value);
        self
    }

    /// Terms every match must satisfy.
    pub fn terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = match (&self.text, self.mode) {
            (Some(text), MatchMode::Exact) => vec![text.clone()],
            (Some(text), MatchMode::Contains) => {
                text.split_whitespace().map(str::to_string).collect()
            }
            (None, _) => Vec::new(),
        };
        terms.extend(self.tokens.iter().cloned());
        terms
    }

    /// Serialized form used as a cache key.
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }

    fn is_empty(&self) -> bool {
        self.text.is_none() && self.tokens.is_empty() && self.fields.is_empty() && self.flags.is_empty()
    }
}

/// Raw filter input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterInput {
    /// No filter.
    #[default]
    None,
    /// Free text (a `contains` query).
    Text(String),
    /// A possibly partial query.
    Query(FilterQuery),
}

impl From<&str> for FilterInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FilterInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<FilterQuery> for FilterInput {
    fn from(query: FilterQuery) -> Self {
        Self::Query(query)
    }
}

impl<I: Into<FilterInput>> From<Option<I>> for FilterInput {
    fn from(input: Option<I>) -> Self {
        input.map(Into::into).unwrap_or_default()
    }
}

/// Canonicalize filter input.
///
/// Text and tokens are trimmed; empty text, tokens and fields are dropped. A query left with no
/// text, tokens, fields or flags is `None`.
pub fn normalize_filter_query(input: impl Into<FilterInput>) -> Option<FilterQuery> {
    let mut query = match input.into() {
        FilterInput::None => return None,
        FilterInput::Text(text) => FilterQuery::text(text),
        FilterInput::Query(query) => query,
    };

    query.text = query
        .text
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());
    query.tokens = query
        .tokens
        .into_iter()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .collect();
    query.fields = query
        .fields
        .into_iter()
        .map(|field| field.trim().to_string())
        .filter(|field| !field.is_empty())
        .collect();

    if query.is_empty() { None } else { Some(query) }
}

/// A half-open character range to highlight within a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HighlightRange {
    /// Inclusive start character offset.
    pub start: usize,
    /// Exclusive end character offset.
    pub end: usize,
}

impl HighlightRange {
    /// Create a range.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` for empty ranges.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

#[derive(Debug)]
enum Term {
    Pattern(Regex),
    Literal(String),
}

/// A query prepared for the default matching rules.
#[derive(Debug)]
pub struct CompiledQuery {
    query: FilterQuery,
    terms: Vec<Term>,
    highlight: Vec<Term>,
}

impl CompiledQuery {
    /// Compile `query`.
    pub fn new(query: &FilterQuery) -> Self {
        let terms = query
            .terms()
            .iter()
            .map(|term| Self::compile_term(term, query))
            .collect();

        // Highlight the whole text first, then fall back to the individual terms.
        let mut highlight = Vec::new();
        if query.mode == MatchMode::Contains {
            if let Some(text) = &query.text {
                highlight.push(Self::compile_term(text, query));
            }
            highlight.extend(query.terms().iter().map(|term| Self::compile_term(term, query)));
        }

        Self {
            query: query.clone(),
            terms,
            highlight,
        }
    }

    fn compile_term(term: &str, query: &FilterQuery) -> Term {
        let pattern = match query.mode {
            MatchMode::Contains => regex::escape(term),
            MatchMode::Exact => format!("^(?:{})$", regex::escape(term)),
        };
        match RegexBuilder::new(&pattern)
            .case_insensitive(!query.case_sensitive)
            .build()
        {
            Ok(regex) => Term::Pattern(regex),
            Err(err) => {
                log::debug!("filter term {term:?} falls back to literal matching: {err}");
                Term::Literal(Self::fold(term, query.case_sensitive))
            }
        }
    }

    fn fold(text: &str, case_sensitive: bool) -> String {
        if case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        }
    }

    /// The query this was compiled from.
    pub fn query(&self) -> &FilterQuery {
        &self.query
    }

    /// Returns `true` if every term matches `text`. A query without terms matches everything.
    pub fn matches_text(&self, text: &str) -> bool {
        let folded = self
            .terms
            .iter()
            .any(|term| matches!(term, Term::Literal(_)))
            .then(|| Self::fold(text, self.query.case_sensitive));

        self.terms.iter().all(|term| match term {
            Term::Pattern(regex) => regex.is_match(text),
            Term::Literal(needle) => {
                let haystack = folded.as_deref().unwrap_or(text);
                match self.query.mode {
                    MatchMode::Contains => haystack.contains(needle.as_str()),
                    MatchMode::Exact => haystack == needle,
                }
            }
        })
    }

    /// Default highlight for a matching `label`.
    ///
    /// Exact queries highlight the whole label; contains queries highlight the first occurrence
    /// of the query text (or, failing that, of the first term found in the label).
    pub fn highlight_ranges(&self, label: &str) -> Option<Vec<HighlightRange>> {
        if self.query.mode == MatchMode::Exact {
            let len = label.chars().count();
            return (len > 0).then(|| vec![HighlightRange::new(0, len)]);
        }

        self.highlight.iter().find_map(|term| {
            let (start, end) = match term {
                Term::Pattern(regex) => {
                    let found = regex.find(label)?;
                    (found.start(), found.end())
                }
                Term::Literal(needle) => {
                    let folded = Self::fold(label, self.query.case_sensitive);
                    // Folding can change byte lengths; only trust positions when it did not.
                    if folded.len() != label.len() {
                        return None;
                    }
                    let start = folded.find(needle.as_str())?;
                    (start, start + needle.len())
                }
            };
            if start == end {
                return None;
            }
            let start_char = label[..start].chars().count();
            let end_char = start_char + label[start..end].chars().count();
            Some(vec![HighlightRange::new(start_char, end_char)])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_string_and_empty() {
        assert_eq!(normalize_filter_query("  report "), Some(FilterQuery::text("report")));
        assert_eq!(normalize_filter_query("   "), None);
        assert_eq!(normalize_filter_query(FilterInput::None), None);
        assert_eq!(
            normalize_filter_query(FilterQuery {
                tokens: vec![" ".into()],
                ..FilterQuery::default()
            }),
            None
        );
        assert_eq!(normalize_filter_query(None::<&str>), None);
    }

    #[test]
    fn test_flags_alone_survive_normalization() {
        let query = FilterQuery::default().with_flag("starred", true);
        assert_eq!(normalize_filter_query(query.clone()), Some(query));
    }

    #[test]
    fn test_contains_requires_every_term() {
        let compiled = CompiledQuery::new(&FilterQuery::text("annual report"));
        assert!(compiled.matches_text("Report (Annual) 2024"));
        assert!(!compiled.matches_text("Annual budget"));
    }

    #[test]
    fn test_exact_never_tokenizes() {
        let compiled = CompiledQuery::new(&FilterQuery::exact("annual report"));
        assert!(compiled.matches_text("Annual Report"));
        assert!(!compiled.matches_text("annual report 2024"));
    }

    #[test]
    fn test_case_sensitive() {
        let compiled = CompiledQuery::new(&FilterQuery::text("Src").with_case_sensitive(true));
        assert!(compiled.matches_text("Src"));
        assert!(!compiled.matches_text("src"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let compiled = CompiledQuery::new(&FilterQuery::text("a.b"));
        assert!(compiled.matches_text("a.b.c"));
        assert!(!compiled.matches_text("axb"));
    }

    #[test]
    fn test_highlight_first_occurrence_in_chars() {
        let compiled = CompiledQuery::new(&FilterQuery::text("bar"));
        assert_eq!(
            compiled.highlight_ranges("übar bar"),
            Some(vec![HighlightRange::new(1, 4)])
        );
        assert_eq!(compiled.highlight_ranges("nothing"), None);
    }

    #[test]
    fn test_highlight_exact_whole_label() {
        let compiled = CompiledQuery::new(&FilterQuery::exact("readme"));
        assert_eq!(
            compiled.highlight_ranges("README"),
            Some(vec![HighlightRange::new(0, 6)])
        );
    }

    #[test]
    fn test_fingerprint_distinguishes_queries() {
        assert_eq!(
            FilterQuery::text("a").fingerprint(),
            FilterQuery::text("a").fingerprint()
        );
        assert_ne!(
            FilterQuery::text("a").fingerprint(),
            FilterQuery::exact("a").fingerprint()
        );
    }
}
