use url::Url;

/// Query parameters that never change page identity.
const TRACKING_PARAMS: [&str; 5] = [
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "fbclid",
    "gclid",
];

/// Resolves `candidate` against `base` and reduces it to canonical form.
///
/// The canonical string is the visited-set key and the storage primary key,
/// so this must be idempotent: feeding a normalized URL back in yields the
/// same URL.
///
/// Returns `None` for values that do not resolve to a crawlable http(s) URL.
pub fn normalize(base: &Url, candidate: &str) -> Option<Url> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Protocol-relative references default to https.
    let mut url = if let Some(rest) = trimmed.strip_prefix("//") {
        Url::parse(&format!("https://{rest}")).ok()?
    } else {
        Url::options().base_url(Some(base)).parse(trimmed).ok()?
    };

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str()?;

    url.set_fragment(None);
    strip_tracking_params(&mut url);
    canonicalize_path(&mut url);

    Some(url)
}

fn strip_tracking_params(url: &mut Url) {
    if url.query().is_none() {
        return;
    }
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept)
            .finish();
        url.set_query(Some(&query));
    }
}

fn canonicalize_path(url: &mut Url) {
    let mut path = url.path().to_string();
    if let Some(prefix) = path.strip_suffix("index.html") {
        path = prefix.to_string();
    }
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    url.set_path(&path);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.test/docs/").unwrap()
    }

    #[test]
    fn resolves_relative_references() {
        let url = normalize(&base(), "guide/intro").unwrap();
        assert_eq!(url.as_str(), "https://example.test/docs/guide/intro");
    }

    #[test]
    fn strips_fragment() {
        let url = normalize(&base(), "https://example.test/page#section-2").unwrap();
        assert_eq!(url.as_str(), "https://example.test/page");
    }

    #[test]
    fn strips_tracking_params_keeps_others() {
        let url = normalize(
            &base(),
            "https://example.test/page?utm_source=feed&id=7&fbclid=xyz",
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://example.test/page?id=7");
    }

    #[test]
    fn drops_query_when_only_tracking_params() {
        let url = normalize(&base(), "https://example.test/page?gclid=abc").unwrap();
        assert_eq!(url.as_str(), "https://example.test/page");
    }

    #[test]
    fn trims_trailing_slash_and_index_html() {
        let url = normalize(&base(), "https://example.test/a/b/").unwrap();
        assert_eq!(url.as_str(), "https://example.test/a/b");

        let url = normalize(&base(), "https://example.test/a/index.html").unwrap();
        assert_eq!(url.as_str(), "https://example.test/a");
    }

    #[test]
    fn root_path_is_stable() {
        let url = normalize(&base(), "https://example.test/").unwrap();
        assert_eq!(url.as_str(), "https://example.test/");
    }

    #[test]
    fn protocol_relative_defaults_to_https() {
        let url = normalize(&base(), "//other.test/page").unwrap();
        assert_eq!(url.as_str(), "https://other.test/page");
    }

    #[test]
    fn rejects_unparseable_and_non_http() {
        assert!(normalize(&base(), "").is_none());
        assert!(normalize(&base(), "mailto:someone@example.test").is_none());
        assert!(normalize(&base(), "javascript:void(0)").is_none());
    }

    #[test]
    fn normalization_is_idempotent() {
        let candidates = [
            "https://example.test/a/b/?utm_source=x&page=2#frag",
            "guide/intro/index.html",
            "//example.test/c/",
            "https://example.test/",
        ];
        for candidate in candidates {
            let once = normalize(&base(), candidate).unwrap();
            let twice = normalize(&base(), once.as_str()).unwrap();
            assert_eq!(once, twice, "normalize not idempotent for {candidate}");
        }
    }
}
