//! Keyword search over parsed pages.
//!
//! ### Matching
//! - Case-insensitive substring match of the trimmed query against title,
//!   body text and path. The query is matched literally, never as a pattern.
//!
//! ### Scoring
//! - Title match: [`TITLE_WEIGHT`]
//! - First body match: [`BODY_WEIGHT`]; the k-th further match adds `1/k`,
//!   capped at [`BODY_BONUS_CAP`] so long pages cannot outrank a title hit
//! - Path match: [`PATH_WEIGHT`]
//!
//! ### Link Targets
//! - Links on searched pages stand in for target pages not in the corpus:
//!   anchor text match [`LINK_TEXT_WEIGHT`], target path match
//!   [`LINK_PATH_WEIGHT`]. A target linked from several pages keeps its
//!   best score.
//!
//! Pages scoring zero are dropped. Hits are ordered by score, then by path.

mod snippet;

pub use snippet::snippet;

use idfdocs_core::{DocLink, DocLocation, Error, ParsedPage};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const TITLE_WEIGHT: f64 = 10.0;
pub const BODY_WEIGHT: f64 = 3.0;
pub const BODY_BONUS_CAP: f64 = 5.0;
pub const PATH_WEIGHT: f64 = 2.0;
pub const LINK_TEXT_WEIGHT: f64 = 10.0;
pub const LINK_PATH_WEIGHT: f64 = 5.0;

/// Body matches counted per page at most.
const MAX_COUNTED_MATCHES: usize = 256;

/// A validated search query.
#[derive(Debug, Clone)]
pub struct Query {
    text: String,
    pattern: Regex,
}

impl Query {
    /// Trim and validate `raw`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuery` if the trimmed query is empty or longer
    /// than `max_len` characters.
    pub fn parse(raw: &str, max_len: usize) -> Result<Self, Error> {
        let text = raw.trim();

        if text.is_empty() {
            return Err(Error::InvalidQuery("query cannot be empty".into()));
        }
        let len = text.chars().count();
        if len > max_len {
            return Err(Error::InvalidQuery(format!("query is {len} characters; the limit is {max_len}")));
        }

        let pattern = RegexBuilder::new(&regex::escape(text))
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::InvalidQuery(e.to_string()))?;

        Ok(Self { text: text.to_string(), pattern })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.pattern.is_match(haystack)
    }

    /// Non-overlapping matches in `haystack`, counted up to a fixed limit.
    pub fn count(&self, haystack: &str) -> usize {
        self.pattern.find_iter(haystack).take(MAX_COUNTED_MATCHES).count()
    }

    /// Byte range of the first match in `haystack`.
    pub fn find(&self, haystack: &str) -> Option<(usize, usize)> {
        self.pattern.find(haystack).map(|m| (m.start(), m.end()))
    }

    /// Relevance of `page` for this query; zero means no match.
    pub fn score(&self, page: &ParsedPage) -> f64 {
        let mut score = 0.0;

        if self.is_match(&page.title) {
            score += TITLE_WEIGHT;
        }

        score += body_score(self.count(&page.text));

        if self.is_match(page.location.path()) {
            score += PATH_WEIGHT;
        }

        score
    }
}

/// First match is worth [`BODY_WEIGHT`]; each further one less than the last.
fn body_score(matches: usize) -> f64 {
    if matches == 0 {
        return 0.0;
    }
    let bonus: f64 = (1..matches).map(|k| 1.0 / k as f64).sum();
    BODY_WEIGHT + bonus.min(BODY_BONUS_CAP)
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub location: DocLocation,
    pub title: String,
    pub snippet: String,
    pub score: f64,
}

/// Rank `corpus` against `query`.
///
/// Pages appearing more than once in the corpus (by path) are scored once.
/// Link targets outside the corpus are ranked by their anchors.
pub fn rank(query: &Query, corpus: &[Arc<ParsedPage>]) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    let mut hits: Vec<SearchHit> = corpus
        .iter()
        .filter(|page| seen.insert(page.location.path().to_string()))
        .filter_map(|page| {
            let score = query.score(page);
            (score > 0.0).then(|| SearchHit {
                location: page.location.clone(),
                title: page.title.clone(),
                snippet: snippet(query, &page.text),
                score,
            })
        })
        .collect();

    let mut targets: HashMap<&str, SearchHit> = HashMap::new();
    for link in corpus.iter().flat_map(|page| &page.links) {
        let path = link.location.path();
        if seen.contains(path) {
            continue;
        }
        let Some(hit) = link_hit(query, link) else { continue };
        if targets.get(path).is_none_or(|best| hit.score > best.score) {
            targets.insert(path, hit);
        }
    }
    hits.extend(targets.into_values());

    sort_hits(&mut hits);
    hits
}

fn link_hit(query: &Query, link: &DocLink) -> Option<SearchHit> {
    let path = link.location.path();
    let in_text = query.is_match(&link.text);
    let in_path = query.is_match(path);

    let mut score = 0.0;
    if in_text {
        score += LINK_TEXT_WEIGHT;
    }
    if in_path {
        score += LINK_PATH_WEIGHT;
    }
    if score <= 0.0 {
        return None;
    }

    let title = if link.text.is_empty() { path } else { link.text.as_str() };
    let context = if in_text { link.text.as_str() } else { path };

    Some(SearchHit {
        location: link.location.clone(),
        title: title.to_string(),
        snippet: snippet(query, context),
        score,
    })
}

/// Parse `raw` and rank `corpus` against it.
pub fn search(raw: &str, corpus: &[Arc<ParsedPage>], max_query_length: usize) -> Result<Vec<SearchHit>, Error> {
    let query = Query::parse(raw, max_query_length)?;
    Ok(rank(&query, corpus))
}

/// Order by score descending, then path ascending.
pub fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.location.path().cmp(b.location.path()))
    });
}
