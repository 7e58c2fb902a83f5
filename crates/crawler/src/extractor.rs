use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::normalize::normalize;

/// Extraction output for one page, handed to the page handler and mined for
/// links by the scheduler.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub url: Url,
    pub title: String,
    pub content: String,
    pub links: Vec<Url>,
    pub fetched_at: DateTime<Utc>,
}

/// Parses an HTML body into title, visible text and normalized outbound
/// links.
pub struct PageExtractor;

impl PageExtractor {
    pub fn extract(url: &Url, body: &[u8]) -> ExtractedPage {
        let html = String::from_utf8_lossy(body);
        let doc = Html::parse_document(&html);

        ExtractedPage {
            title: Self::title(&doc, url),
            content: Self::visible_text(&doc),
            links: Self::links(&doc, url),
            url: url.clone(),
            fetched_at: Utc::now(),
        }
    }

    /// `<title>`, else `og:title`, else the URL itself as a label.
    fn title(doc: &Html, url: &Url) -> String {
        let title_sel = Selector::parse("title").unwrap();
        if let Some(el) = doc.select(&title_sel).next() {
            let text = el.text().collect::<String>();
            let text = text.trim();
            if !text.is_empty() {
                return text.to_string();
            }
        }

        let og_sel = Selector::parse(r#"meta[property="og:title"]"#).unwrap();
        if let Some(content) = doc
            .select(&og_sel)
            .next()
            .and_then(|el| el.value().attr("content"))
        {
            let content = content.trim();
            if !content.is_empty() {
                return content.to_string();
            }
        }

        url.to_string()
    }

    fn visible_text(doc: &Html) -> String {
        let body_sel = Selector::parse("body").unwrap();
        let mut text = String::new();
        if let Some(body) = doc.select(&body_sel).next() {
            Self::push_visible_text(body, &mut text);
        }
        // Collapse runs of whitespace left behind by markup boundaries.
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn push_visible_text(el: ElementRef, out: &mut String) {
        for child in el.children() {
            if let Some(text) = child.value().as_text() {
                out.push_str(text);
                out.push(' ');
            } else if let Some(child_el) = ElementRef::wrap(child) {
                let name = child_el.value().name();
                if name != "script" && name != "style" && name != "noscript" {
                    Self::push_visible_text(child_el, out);
                }
            }
        }
    }

    fn links(doc: &Html, base: &Url) -> Vec<Url> {
        let anchor_sel = Selector::parse("a[href]").unwrap();
        doc.select(&anchor_sel)
            .filter_map(|el| el.value().attr("href"))
            .filter_map(|href| normalize(base, href))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> ExtractedPage {
        let url = Url::parse("https://example.test/docs/").unwrap();
        PageExtractor::extract(&url, html.as_bytes())
    }

    #[test]
    fn extracts_title_text_and_links() {
        let page = extract(
            r#"
            <html>
            <head><title> Example Docs </title></head>
            <body>
                <h1>Welcome</h1>
                <p>Read the <a href="guide">guide</a> or the
                   <a href="https://example.test/api#auth">API reference</a>.</p>
                <script>ignore_me();</script>
            </body>
            </html>
            "#,
        );

        assert_eq!(page.title, "Example Docs");
        assert!(page.content.contains("Welcome"));
        assert!(page.content.contains("Read the guide"));
        assert!(!page.content.contains("ignore_me"));

        let links: Vec<_> = page.links.iter().map(|u| u.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://example.test/docs/guide",
                "https://example.test/api",
            ]
        );
    }

    #[test]
    fn falls_back_to_og_title() {
        let page = extract(
            r#"<html><head>
                 <meta property="og:title" content="Social Title">
               </head><body></body></html>"#,
        );
        assert_eq!(page.title, "Social Title");
    }

    #[test]
    fn falls_back_to_url_when_untitled() {
        let page = extract("<html><body><p>bare</p></body></html>");
        assert_eq!(page.title, "https://example.test/docs/");
    }

    #[test]
    fn discards_unresolvable_hrefs() {
        let page = extract(
            r#"<body>
                 <a href="mailto:x@example.test">mail</a>
                 <a href="javascript:void(0)">js</a>
                 <a href="/ok">ok</a>
               </body>"#,
        );
        let links: Vec<_> = page.links.iter().map(|u| u.as_str()).collect();
        assert_eq!(links, vec!["https://example.test/ok"]);
    }

    #[test]
    fn collapses_whitespace_in_content() {
        let page = extract("<body><p>a\n\n   b</p>\t<p>c</p></body>");
        assert_eq!(page.content, "a b c");
    }
}
