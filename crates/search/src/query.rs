use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How a term matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    Simple,
    Phrase,
    Fuzzy,
    Boolean,
}

/// Document attribute a fielded term is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermField {
    Title,
    Content,
    Type,
    Url,
}

impl TermField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "title" => Some(TermField::Title),
            "content" => Some(TermField::Content),
            "type" => Some(TermField::Type),
            "url" => Some(TermField::Url),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TermField::Title => "title",
            TermField::Content => "content",
            TermField::Type => "type",
            TermField::Url => "url",
        }
    }
}

/// A single parsed term of a search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTerm {
    pub text: String,
    pub kind: TermKind,
    pub field: Option<TermField>,
    pub required: bool,
    pub excluded: bool,
    pub fuzzy_distance: u32,
}

impl QueryTerm {
    pub fn simple(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: TermKind::Simple,
            field: None,
            required: false,
            excluded: false,
            fuzzy_distance: 0,
        }
    }

    pub fn phrase(text: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Phrase,
            required: true,
            ..Self::simple(text)
        }
    }

    fn render(&self) -> String {
        match self.kind {
            TermKind::Phrase => format!("\"{}\"", self.text),
            TermKind::Fuzzy => format!("{}~{}", self.text, self.fuzzy_distance),
            _ => match self.field {
                Some(field) => format!("{}:{}", field.as_str(), self.text),
                None => self.text.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Score,
    Date,
    Title,
}

impl SortField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "score" => Some(SortField::Score),
            "date" => Some(SortField::Date),
            "title" => Some(SortField::Title),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub descending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::Score,
            descending: true,
        }
    }
}

/// A fully parsed search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub terms: Vec<QueryTerm>,
    pub page: usize,
    pub page_size: usize,
    pub filters: HashMap<String, String>,
    pub has_and_operator: bool,
    pub sort: SortSpec,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
            page: 1,
            page_size: 10,
            filters: HashMap::new(),
            has_and_operator: false,
            sort: SortSpec::default(),
        }
    }

    pub fn add_term(&mut self, term: QueryTerm) {
        self.terms.push(term);
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn set_page_size(&mut self, size: usize) {
        self.page_size = if size < 1 { 10 } else { size };
    }

    pub fn add_filter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.filters.insert(key.into(), value.into());
    }

    /// All terms a hit must contain.
    pub fn required_terms(&self) -> impl Iterator<Item = &QueryTerm> {
        self.terms.iter().filter(|t| t.required && !t.excluded)
    }

    /// Renders the query back into a normalized string form. Parsing that
    /// string reproduces the same term sequence and flags.
    pub fn serialize(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut emitted = 0usize;
        for term in &self.terms {
            if term.excluded {
                parts.push("NOT".to_string());
            } else {
                if self.has_and_operator && emitted > 0 {
                    parts.push("AND".to_string());
                }
                emitted += 1;
            }
            parts.push(term.render());
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_setters_clamp() {
        let mut q = Query::new();
        q.set_page(0);
        q.set_page_size(0);
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, 10);
    }

    #[test]
    fn serialize_renders_each_term_kind() {
        let mut q = Query::new();
        q.add_term(QueryTerm::phrase("go programming"));
        q.add_term(QueryTerm {
            field: Some(TermField::Title),
            ..QueryTerm::simple("python")
        });
        q.add_term(QueryTerm {
            kind: TermKind::Fuzzy,
            fuzzy_distance: 2,
            ..QueryTerm::simple("serch")
        });
        q.add_term(QueryTerm {
            excluded: true,
            ..QueryTerm::simple("java")
        });

        assert_eq!(q.serialize(), "\"go programming\" title:python serch~2 NOT java");
    }

    #[test]
    fn serialize_inserts_and_between_required_terms() {
        let mut q = Query::new();
        q.has_and_operator = true;
        q.add_term(QueryTerm {
            required: true,
            ..QueryTerm::simple("go")
        });
        q.add_term(QueryTerm {
            required: true,
            ..QueryTerm::simple("web")
        });
        assert_eq!(q.serialize(), "go AND web");
    }
}
