use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use storage::{Document, StorageAdapter, StorageStats};
use tracing::debug;

use crate::error::Result;
use crate::fuzzy::fuzzy_word_match;
use crate::query::{Query, QueryTerm, SortField, TermField, TermKind};

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document: Document,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMetadata {
    pub total: u64,
    pub query_time: DateTime<Utc>,
    pub facets: HashMap<String, Vec<FacetCount>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub metadata: SearchMetadata,
}

/// Scores stored documents against parsed queries.
///
/// The engine makes one pass over `get_all()`: filters and excluded terms
/// prune the candidate set, the required gate zeroes documents missing any
/// required term, and the survivors are ranked by the per-term weights.
pub struct SearchEngine {
    storage: Arc<dyn StorageAdapter>,
}

impl SearchEngine {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    pub async fn search(&self, query: &Query) -> Result<SearchResults> {
        let docs = self.storage.get_all().await?;
        debug!(candidates = docs.len(), terms = query.terms.len(), "scoring");

        // Index in `matched` is insertion order, the stable tie-break.
        let mut matched: Vec<(Document, f64)> = Vec::new();
        for doc in docs {
            if !matches_filters(&doc, &query.filters) {
                continue;
            }
            if is_excluded(&doc, &query.terms) {
                continue;
            }
            let score = score_document(&doc, query);
            if score > 0.0 {
                matched.push((doc, score));
            }
        }

        sort_hits(&mut matched, query);

        let total = matched.len() as u64;
        let facets = facet_by_type(&matched);

        let start = query.page.max(1).saturating_sub(1) * query.page_size;
        let hits: Vec<SearchHit> = matched
            .into_iter()
            .skip(start)
            .take(query.page_size)
            .map(|(document, score)| SearchHit { document, score })
            .collect();

        Ok(SearchResults {
            hits,
            metadata: SearchMetadata {
                total,
                query_time: Utc::now(),
                facets,
            },
        })
    }

    pub async fn list(&self) -> Result<Vec<Document>> {
        Ok(self.storage.list().await?)
    }

    pub async fn clear(&self) -> Result<()> {
        Ok(self.storage.clear().await?)
    }

    pub async fn stats(&self) -> Result<StorageStats> {
        Ok(self.storage.stats().await?)
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// True when the term hits the document's title or content through its own
/// matching mode (substring, or bounded edit distance for fuzzy terms).
fn term_matches_text(doc: &Document, term: &QueryTerm) -> bool {
    if term.kind == TermKind::Fuzzy {
        let needle = term.text.to_lowercase();
        let max = term.fuzzy_distance as usize;
        return contains_ci(&doc.title, &term.text)
            || contains_ci(&doc.content, &term.text)
            || fuzzy_word_match(&doc.title.to_lowercase(), &needle, max)
            || fuzzy_word_match(&doc.content.to_lowercase(), &needle, max);
    }
    contains_ci(&doc.title, &term.text) || contains_ci(&doc.content, &term.text)
}

fn is_excluded(doc: &Document, terms: &[QueryTerm]) -> bool {
    terms
        .iter()
        .filter(|t| t.excluded)
        .any(|t| contains_ci(&doc.title, &t.text) || contains_ci(&doc.content, &t.text))
}

fn matches_filters(doc: &Document, filters: &HashMap<String, String>) -> bool {
    for (key, value) in filters {
        let matched = match key.as_str() {
            "type" => doc.doc_type == *value,
            "url" => doc.url == *value,
            "title" => doc.title == *value,
            // Unknown filter keys are ignored rather than excluding
            // everything.
            _ => true,
        };
        if !matched {
            return false;
        }
    }
    true
}

fn score_document(doc: &Document, query: &Query) -> f64 {
    let scoreable: Vec<&QueryTerm> = query.terms.iter().filter(|t| !t.excluded).collect();
    if scoreable.is_empty() {
        return 0.0;
    }

    // A document missing any required term is out, whatever else matches.
    for term in query.required_terms() {
        if !term_matches_text(doc, term) {
            return 0.0;
        }
    }

    let mut score = 0.0;
    for term in scoreable {
        score += score_term(doc, term);
    }
    score
}

fn score_term(doc: &Document, term: &QueryTerm) -> f64 {
    match term.kind {
        TermKind::Phrase => {
            let mut score = 0.0;
            if contains_ci(&doc.title, &term.text) {
                score += 3.0;
            }
            if contains_ci(&doc.content, &term.text) {
                score += 2.0;
            }
            score
        }
        TermKind::Fuzzy => {
            let needle = term.text.to_lowercase();
            let max = term.fuzzy_distance as usize;
            let mut score = 0.0;
            if contains_ci(&doc.title, &term.text)
                || fuzzy_word_match(&doc.title.to_lowercase(), &needle, max)
            {
                score += 2.0;
            }
            if contains_ci(&doc.content, &term.text)
                || fuzzy_word_match(&doc.content.to_lowercase(), &needle, max)
            {
                score += 1.0;
            }
            score
        }
        _ => match term.field {
            Some(TermField::Title) => {
                if contains_ci(&doc.title, &term.text) {
                    2.0
                } else {
                    0.0
                }
            }
            Some(TermField::Content) => {
                if contains_ci(&doc.content, &term.text) {
                    1.0
                } else {
                    0.0
                }
            }
            Some(TermField::Type) => {
                if contains_ci(&doc.doc_type, &term.text) {
                    1.0
                } else {
                    0.0
                }
            }
            Some(TermField::Url) => {
                if contains_ci(&doc.url, &term.text) {
                    1.0
                } else {
                    0.0
                }
            }
            None => {
                let mut score = 0.0;
                if contains_ci(&doc.title, &term.text) {
                    score += 2.0;
                }
                if contains_ci(&doc.content, &term.text) {
                    score += 1.0;
                }
                score
            }
        },
    }
}

fn sort_hits(matched: &mut [(Document, f64)], query: &Query) {
    let descending = query.sort.descending;
    match query.sort.field {
        // Stable sort: equal scores keep insertion order.
        SortField::Score => matched.sort_by(|a, b| {
            let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }),
        SortField::Date => matched.sort_by(|a, b| {
            let ord = a
                .0
                .created_at
                .cmp(&b.0.created_at)
                .then_with(|| a.0.url.cmp(&b.0.url));
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }),
        SortField::Title => matched.sort_by(|a, b| {
            let ord = a
                .0
                .title
                .to_lowercase()
                .cmp(&b.0.title.to_lowercase())
                .then_with(|| a.0.url.cmp(&b.0.url));
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }),
    }
}

/// Value → count over the pre-paginated matching set, keyed by document
/// type. Sorted by value so output is deterministic.
fn facet_by_type(matched: &[(Document, f64)]) -> HashMap<String, Vec<FacetCount>> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for (doc, _) in matched {
        *counts.entry(doc.doc_type.clone()).or_insert(0) += 1;
    }

    let mut type_facets: Vec<FacetCount> = counts
        .into_iter()
        .map(|(value, count)| FacetCount { value, count })
        .collect();
    type_facets.sort_by(|a, b| a.value.cmp(&b.value));

    let mut facets = HashMap::new();
    facets.insert("type".to_string(), type_facets);
    facets
}
