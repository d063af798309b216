use chrono::Utc;
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::crawler::task::CrawledContent;
use crate::fetch::http::PageBody;

/// Errors from turning a page body into content
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid selector '{0}'")]
    Selector(String),
}

/// Turns a fetched body into title, text and absolute links
pub trait Extractor: Send + Sync {
    /// Consumes `body`; it is dropped once parsing finishes, successfully or not
    fn parse(&self, body: PageBody, base_url: &str) -> Result<CrawledContent, ExtractError>;
}

const TEXT_BLOCKS: &str = "p, div, span, h1, h2, h3, h4, h5, h6";

/// scraper-backed extractor
#[derive(Debug, Default, Clone)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::Selector(css.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text of the element's first child, when that child is a text node
fn first_text_child(element: ElementRef<'_>) -> Option<String> {
    match element.first_child()?.value() {
        Node::Text(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}

impl Extractor for HtmlExtractor {
    fn parse(&self, body: PageBody, base_url: &str) -> Result<CrawledContent, ExtractError> {
        let base = Url::parse(base_url).map_err(|source| ExtractError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;

        let document = Html::parse_document(&body.content);
        drop(body);

        let title = document
            .select(&selector("title")?)
            .next()
            .or_else(|| document.select(&selector("h1").ok()?).next())
            .map(element_text)
            .unwrap_or_default();

        let mut links = Vec::new();
        for element in document.select(&selector("a[href]")?) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            match base.join(href) {
                Ok(link) => links.push(link.to_string()),
                Err(e) => debug!("Skipping link '{}' on {}: {}", href, base, e),
            }
        }

        let mut text_content = String::new();
        for element in document.select(&selector(TEXT_BLOCKS)?) {
            if let Some(text) = first_text_child(element) {
                text_content.push_str(&text);
                text_content.push(' ');
            }
        }

        Ok(CrawledContent {
            url: base_url.to_string(),
            title,
            text_content,
            links,
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head><title> Example Page </title></head>
          <body>
            <h1>Welcome</h1>
            <div><p>First paragraph.</p></div>
            <p>Second <b>bold</b> paragraph.</p>
            <span>   </span>
            <a href="/about">About</a>
            <a href="contact.html#form">Contact</a>
            <a href="https://other.org/x">Elsewhere</a>
            <a>No href</a>
          </body>
        </html>
    "#;

    fn parse(html: &str, base: &str) -> CrawledContent {
        HtmlExtractor::new().parse(PageBody::new(base, html), base).unwrap()
    }

    #[test]
    fn test_title_from_title_tag() {
        let content = parse(PAGE, "https://example.com/docs/index.html");
        assert_eq!(content.title, "Example Page");
        assert_eq!(content.url, "https://example.com/docs/index.html");
    }

    #[test]
    fn test_title_falls_back_to_h1() {
        let content = parse("<body><h1>Heading</h1></body>", "https://example.com/");
        assert_eq!(content.title, "Heading");

        let content = parse("<body><p>x</p></body>", "https://example.com/");
        assert_eq!(content.title, "");
    }

    #[test]
    fn test_links_resolved_against_base() {
        let content = parse(PAGE, "https://example.com/docs/index.html");
        assert_eq!(
            content.links,
            vec![
                "https://example.com/about",
                "https://example.com/docs/contact.html#form",
                "https://other.org/x",
            ]
        );
    }

    #[test]
    fn test_text_takes_leading_text_of_blocks() {
        let content = parse(PAGE, "https://example.com/");
        assert_eq!(content.text_content, "Welcome First paragraph. Second ");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HtmlExtractor::new().parse(PageBody::new("x", "<p>x</p>"), "not a url");
        assert!(matches!(result, Err(ExtractError::InvalidBaseUrl { .. })));
    }
}
