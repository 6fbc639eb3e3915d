use async_trait::async_trait;
use reqwest::Client as HttpClient;
use scraper::{ElementRef, Html, Selector};

use crate::error::AppResult;
use crate::models::SearchHit;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Hard cap on parsed hits per search
const MAX_RESULTS: usize = 10;

/// Scraped page text is bounded to this many characters
const MAX_CONTENT_CHARS: usize = 2000;

/// Fallback snippets are cut to this many characters
const SNIPPET_CHARS: usize = 200;

/// Best-effort web search and page scraping.
///
/// Both operations swallow every failure: `search` returns an empty list and
/// `scrape` an empty string when the upstream misbehaves. Searches are
/// ephemeral input for prompt building, never part of the response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Runs one query against the search results page
    async fn search(&self, query: &str) -> Vec<SearchHit>;

    /// Fetches a page and returns its readable text, bounded to ~2000 chars
    async fn scrape(&self, url: &str) -> String;
}

/// Searcher over the DuckDuckGo HTML endpoint
pub struct DuckDuckGoSearcher {
    http_client: HttpClient,
    base_url: String,
}

impl DuckDuckGoSearcher {
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url,
        }
    }

    async fn fetch_results(&self, query: &str) -> AppResult<Vec<SearchHit>> {
        let url = format!("{}/html/", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("q", query)])
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?;

        let html = response.text().await?;
        Ok(parse_search_results(&html))
    }

    async fn fetch_page(&self, url: &str) -> AppResult<String> {
        let response = self
            .http_client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        let html = response.text().await?;
        Ok(extract_page_text(&html))
    }
}

#[async_trait]
impl WebSearcher for DuckDuckGoSearcher {
    async fn search(&self, query: &str) -> Vec<SearchHit> {
        match self.fetch_results(query).await {
            Ok(hits) => {
                tracing::info!(query = %query, results = hits.len(), "Web search completed");
                hits
            }
            Err(e) => {
                tracing::warn!(error = %e, query = %query, "Web search failed");
                Vec::new()
            }
        }
    }

    async fn scrape(&self, url: &str) -> String {
        match self.fetch_page(url).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, url = %url, "Page scrape failed");
                String::new()
            }
        }
    }
}

/// Extracts (title, url, snippet) tuples from a search results page.
///
/// Result markup varies, so candidate selectors are tried in order and the
/// first one that yields any matches wins. Sync on purpose: `scraper::Html`
/// is `!Send` and must not live across an await point.
fn parse_search_results(html: &str) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);

    let anchor_sel = Selector::parse("a[href]").unwrap();
    let title_link_sel = Selector::parse(".result__title a").unwrap();
    let h3_sel = Selector::parse("h3").unwrap();
    let snippet_sel = Selector::parse(".result__snippet").unwrap();
    let alt_snippet_sel = Selector::parse(".snippet").unwrap();

    let candidate_selectors = [".result", ".results_links", ".web-result", ".result__body"];

    let mut hits = Vec::new();

    for candidate in &candidate_selectors {
        let result_sel = Selector::parse(candidate).unwrap();

        for element in doc.select(&result_sel) {
            if hits.len() >= MAX_RESULTS {
                break;
            }

            let title = first_text(&element, &anchor_sel)
                .or_else(|| first_text(&element, &title_link_sel))
                .or_else(|| first_text(&element, &h3_sel))
                .unwrap_or_default();

            let url = element
                .select(&anchor_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .or_else(|| {
                    element
                        .select(&title_link_sel)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                })
                .unwrap_or_default()
                .to_string();

            let snippet = first_text(&element, &snippet_sel)
                .or_else(|| first_text(&element, &alt_snippet_sel))
                .unwrap_or_else(|| {
                    let full: String = element.text().collect();
                    truncate_chars(full.replace(&title, "").trim(), SNIPPET_CHARS)
                });

            if title.len() > 3 && !url.is_empty() && !snippet.is_empty() {
                hits.push(SearchHit {
                    title,
                    url,
                    snippet,
                    content: None,
                });
            }
        }

        // First selector strategy that produced anything wins
        if !hits.is_empty() {
            break;
        }
    }

    hits
}

/// Readable-text extraction for scraped pages.
///
/// Prefers a main/article/content container, falls back to the whole body,
/// skips script/style/nav chrome, collapses whitespace and bounds the result.
fn extract_page_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let content_selectors = ["main", "article", ".content", "#content", ".main"];

    for candidate in &content_selectors {
        let sel = Selector::parse(candidate).unwrap();
        if let Some(element) = doc.select(&sel).next() {
            let text = element_text(&element);
            if !text.is_empty() {
                return truncate_chars(&text, MAX_CONTENT_CHARS);
            }
        }
    }

    let body_sel = Selector::parse("body").unwrap();
    if let Some(body) = doc.select(&body_sel).next() {
        return truncate_chars(&element_text(&body), MAX_CONTENT_CHARS);
    }

    String::new()
}

fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Collects an element's text, skipping noise subtrees, with collapsed
/// whitespace.
fn element_text(element: &ElementRef<'_>) -> String {
    const SKIP_TAGS: &[&str] = &["script", "style", "nav", "footer", "header"];

    let mut buf = String::new();
    collect_text(element, SKIP_TAGS, &mut buf);
    buf.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: &ElementRef<'_>, skip_tags: &[&str], buf: &mut String) {
    for child in element.children() {
        match child.value() {
            scraper::Node::Text(text) => {
                buf.push_str(text);
                buf.push(' ');
            }
            scraper::Node::Element(el) if !skip_tags.contains(&el.name()) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(&child_ref, skip_tags, buf);
                }
            }
            _ => {}
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
