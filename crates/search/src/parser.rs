use crate::error::{Result, SearchError};
use crate::query::{Query, QueryTerm, TermField, TermKind};

const MAX_TERMS: usize = 10;
const MAX_TERM_LENGTH: usize = 100;

/// Largest accepted fuzzy edit distance; `x~9` is clamped down to this.
const MAX_FUZZY_DISTANCE: u32 = 2;

/// Turns raw query strings into structured [`Query`] values.
///
/// The pipeline is sanitize → validate → tokenize → classify. Quoted
/// substrings survive tokenization as single phrase tokens; `AND` and `NOT`
/// steer the required/excluded flags of the token that follows them.
pub struct QueryParser;

impl QueryParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, raw: &str) -> Result<Query> {
        let sanitized = sanitize(raw);
        validate(&sanitized)?;

        let tokens = split_keeping_quotes(&sanitized);
        let has_and = tokens
            .iter()
            .any(|t| t.eq_ignore_ascii_case("AND"));

        let mut query = Query::new();
        query.has_and_operator = has_and;

        let mut next_excluded = false;
        for token in &tokens {
            if token.eq_ignore_ascii_case("AND") || token.eq_ignore_ascii_case("OR") {
                continue;
            }
            if token.eq_ignore_ascii_case("NOT") {
                next_excluded = true;
                continue;
            }

            let mut term = classify_token(token)?;
            if next_excluded {
                term.excluded = true;
                term.required = false;
                next_excluded = false;
            } else if query.terms.is_empty() {
                // The first real token is required even without an AND.
                term.required = true;
            } else if has_and {
                term.required = true;
            }
            validate_term(&term)?;
            query.add_term(term);
        }

        if query.terms.len() > MAX_TERMS {
            return Err(SearchError::InvalidInput(format!(
                "query exceeds maximum of {MAX_TERMS} terms"
            )));
        }

        // AND semantics span the whole query: one required term makes every
        // non-excluded term required.
        if query.terms.iter().any(|t| t.required) {
            for term in &mut query.terms {
                if !term.excluded {
                    term.required = true;
                }
            }
        }

        Ok(query)
    }
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Trims, collapses whitespace and blanks out everything outside the query
/// alphabet. `:` and `~` stay in so fielded and fuzzy terms survive.
fn sanitize(raw: &str) -> String {
    let collapsed = raw.trim().split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' => c,
            '"' | ' ' | '+' | '-' | ':' | '~' => c,
            _ => ' ',
        })
        .collect()
}

fn validate(query: &str) -> Result<()> {
    // Sanitization can reduce an all-symbol query to bare spaces.
    if query.trim().is_empty() {
        return Err(SearchError::InvalidInput("empty query".to_string()));
    }

    let quotes = query.chars().filter(|c| *c == '"').count();
    if quotes % 2 != 0 {
        return Err(SearchError::InvalidInput(
            "unmatched quotes in query".to_string(),
        ));
    }

    let tokens: Vec<&str> = query.split_whitespace().collect();
    for (i, token) in tokens.iter().enumerate() {
        if is_operator(token) && (i == 0 || i == tokens.len() - 1) {
            return Err(SearchError::InvalidInput(format!(
                "operator '{token}' at invalid position"
            )));
        }
    }
    Ok(())
}

fn is_operator(token: &str) -> bool {
    token.eq_ignore_ascii_case("AND")
        || token.eq_ignore_ascii_case("OR")
        || token.eq_ignore_ascii_case("NOT")
}

/// Whitespace split that keeps quoted substrings together, quotes included.
fn split_keeping_quotes(s: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in s.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ' ' if !in_quotes => {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}

fn classify_token(token: &str) -> Result<QueryTerm> {
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        return Ok(QueryTerm::phrase(token.trim_matches('"')));
    }

    if let Some((field, rest)) = token.split_once(':') {
        let field = TermField::parse(field).ok_or_else(|| {
            SearchError::InvalidInput(format!("unknown field '{field}'"))
        })?;
        let mut term = QueryTerm::simple(rest);
        term.field = Some(field);
        return Ok(term);
    }

    if let Some((text, distance)) = token.split_once('~') {
        let distance = if distance.is_empty() {
            Some(1)
        } else {
            distance.parse::<u32>().ok()
        };
        if let Some(distance) = distance {
            let mut term = QueryTerm::simple(text);
            term.kind = TermKind::Fuzzy;
            term.fuzzy_distance = distance.min(MAX_FUZZY_DISTANCE);
            return Ok(term);
        }
        // A malformed suffix falls through as a plain term.
    }

    Ok(QueryTerm::simple(token))
}

fn validate_term(term: &QueryTerm) -> Result<()> {
    if term.text.trim().is_empty() {
        return Err(SearchError::InvalidInput(
            "term text cannot be empty".to_string(),
        ));
    }
    if term.text.len() > MAX_TERM_LENGTH {
        return Err(SearchError::InvalidInput(format!(
            "term exceeds maximum length of {MAX_TERM_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Query {
        QueryParser::new().parse(raw).unwrap()
    }

    #[test]
    fn single_term_is_required_simple() {
        let q = parse("go");
        assert_eq!(q.terms.len(), 1);
        assert_eq!(q.terms[0].text, "go");
        assert_eq!(q.terms[0].kind, TermKind::Simple);
        assert!(q.terms[0].required);
        assert!(!q.has_and_operator);
    }

    #[test]
    fn quoted_token_becomes_phrase() {
        let q = parse("\"go programming\"");
        assert_eq!(q.terms.len(), 1);
        assert_eq!(q.terms[0].text, "go programming");
        assert_eq!(q.terms[0].kind, TermKind::Phrase);
        assert!(q.terms[0].required);
    }

    #[test]
    fn and_sets_operator_flag_and_requires_both() {
        let q = parse("go AND web");
        assert!(q.has_and_operator);
        assert_eq!(q.terms.len(), 2);
        assert!(q.terms.iter().all(|t| t.required));
    }

    #[test]
    fn and_is_case_insensitive() {
        assert!(parse("go and web").has_and_operator);
    }

    #[test]
    fn not_marks_the_next_term_excluded() {
        let q = parse("go NOT web");
        assert_eq!(q.terms.len(), 2);
        assert!(q.terms[0].required);
        assert!(!q.terms[0].excluded);
        assert!(q.terms[1].excluded);
        assert!(!q.terms[1].required);
    }

    #[test]
    fn fielded_term_keeps_its_field() {
        let q = parse("title:python");
        assert_eq!(q.terms[0].field, Some(TermField::Title));
        assert_eq!(q.terms[0].text, "python");
        assert_eq!(q.terms[0].kind, TermKind::Simple);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = QueryParser::new().parse("author:me").unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
    }

    #[test]
    fn fuzzy_suffix_sets_distance() {
        let q = parse("serch~2");
        assert_eq!(q.terms[0].kind, TermKind::Fuzzy);
        assert_eq!(q.terms[0].fuzzy_distance, 2);
        assert_eq!(q.terms[0].text, "serch");
    }

    #[test]
    fn fuzzy_distance_defaults_to_one_and_is_capped() {
        assert_eq!(parse("serch~").terms[0].fuzzy_distance, 1);
        assert_eq!(parse("serch~9").terms[0].fuzzy_distance, 2);
    }

    #[test]
    fn empty_query_is_rejected() {
        for raw in ["", "   ", "&&&"] {
            let err = QueryParser::new().parse(raw).unwrap_err();
            assert!(matches!(err, SearchError::InvalidInput(_)), "raw: {raw:?}");
        }
    }

    #[test]
    fn unmatched_quotes_are_rejected() {
        let err = QueryParser::new().parse("\"go programming").unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
    }

    #[test]
    fn leading_or_trailing_operators_are_rejected() {
        for raw in ["AND go", "go AND", "NOT", "go NOT"] {
            let err = QueryParser::new().parse(raw).unwrap_err();
            assert!(matches!(err, SearchError::InvalidInput(_)), "raw: {raw:?}");
        }
    }

    #[test]
    fn special_characters_become_spaces() {
        let q = parse("go&web");
        assert_eq!(q.terms.len(), 2);
        assert_eq!(q.terms[0].text, "go");
        assert_eq!(q.terms[1].text, "web");
    }

    #[test]
    fn first_required_term_spreads_to_all_non_excluded() {
        let q = parse("go web NOT java");
        assert!(q.terms[0].required);
        assert!(q.terms[1].required);
        assert!(q.terms[2].excluded);
        assert!(!q.terms[2].required);
    }

    #[test]
    fn too_many_terms_are_rejected() {
        let raw = (0..11).map(|i| format!("t{i}")).collect::<Vec<_>>().join(" ");
        let err = QueryParser::new().parse(&raw).unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
    }

    #[test]
    fn overlong_term_is_rejected() {
        let raw = "a".repeat(101);
        let err = QueryParser::new().parse(&raw).unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let cases = [
            "go",
            "\"go programming\"",
            "go AND web",
            "go NOT web",
            "title:python",
            "serch~2",
            "go web NOT java",
        ];
        for raw in cases {
            let parsed = parse(raw);
            let reparsed = parse(&parsed.serialize());
            assert_eq!(parsed.terms, reparsed.terms, "raw: {raw:?}");
            assert_eq!(
                parsed.has_and_operator, reparsed.has_and_operator,
                "raw: {raw:?}"
            );
        }
    }
}
