//! Fuzzy ranking and highlighting for completion lists.
//!
//! Scoring is skim's, via [`SkimMatcherV2`]; this module only orders the
//! hits and marks up the matched characters.

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

/// Markup placed around matched characters.
pub const HIGHLIGHT_OPEN: &str = "<em>";
pub const HIGHLIGHT_CLOSE: &str = "</em>";

/// A successful match of a query against one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub score: i64,
    /// Char indices of the matched characters in the candidate.
    pub indices: Vec<usize>,
}

/// A candidate that survived ranking, with its highlighted form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked<'a> {
    pub name: &'a str,
    pub html: String,
}

fn matcher() -> SkimMatcherV2 {
    SkimMatcherV2::default().ignore_case()
}

/// Match `query` against `candidate`, ignoring case. Returns `None`
/// unless every query character appears in order.
#[must_use]
pub fn fuzzy_match(query: &str, candidate: &str) -> Option<Match> {
    matcher()
        .fuzzy_indices(candidate, query)
        .map(|(score, indices)| Match { score, indices })
}

/// Wrap each run of matched characters in `open`/`close`.
#[must_use]
pub fn highlight(candidate: &str, indices: &[usize], open: &str, close: &str) -> String {
    let mut out = String::with_capacity(candidate.len() + indices.len() * (open.len() + close.len()));
    let mut inside = false;
    let mut matched = indices.iter().peekable();
    for (i, c) in candidate.chars().enumerate() {
        let hit = matched.next_if(|&&m| m == i).is_some();
        if hit && !inside {
            out.push_str(open);
        } else if !hit && inside {
            out.push_str(close);
        }
        inside = hit;
        out.push(c);
    }
    if inside {
        out.push_str(close);
    }
    out
}

/// Rank candidates against `query`.
///
/// An empty query keeps the given order with plain names. Otherwise
/// non-matching candidates are dropped and the rest are ordered by
/// descending score, then by name.
#[must_use]
pub fn rank<'a>(query: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<Ranked<'a>> {
    if query.is_empty() {
        return candidates
            .into_iter()
            .map(|name| Ranked {
                name,
                html: name.to_string(),
            })
            .collect();
    }

    let matcher = matcher();
    let mut scored: Vec<(i64, Ranked<'a>)> = candidates
        .into_iter()
        .filter_map(|name| {
            let (score, indices) = matcher.fuzzy_indices(name, query)?;
            let html = highlight(name, &indices, HIGHLIGHT_OPEN, HIGHLIGHT_CLOSE);
            Some((score, Ranked { name, html }))
        })
        .collect();
    scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| a.name.cmp(b.name)));
    scored.into_iter().map(|(_, r)| r).collect()
}
