//! URL discovery and readable-text extraction from HTML

use crate::config::ScraperSettings;
use crate::util::truncate_text;
use regex::Regex;
use scraper::{node::Node, ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Elements whose text never counts as page content
const IGNORED_TAGS: [&str; 8] = [
    "script", "style", "nav", "header", "footer", "aside", "ads", "noscript",
];

/// Candidate main-content containers, most specific first
const CONTENT_SELECTORS: [&str; 11] = [
    "main",
    "article",
    ".content",
    "#content",
    ".post",
    ".entry-content",
    ".article-body",
    ".story-body",
    ".post-content",
    ".entry",
    ".text",
];

const URL_TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', '*', '\''];

#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    pub title: String,
    pub content: String,
}

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| {
        Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).expect("url regex is valid")
    })
}

/// Every http(s) URL in `text`, in order of first appearance
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    url_regex()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(URL_TRAILING_PUNCTUATION))
        .filter(|url| !url.ends_with("://") && seen.insert(url.to_string()))
        .map(str::to_string)
        .collect()
}

fn is_ignored(element: &ElementRef) -> bool {
    IGNORED_TAGS.contains(&element.value().name())
}

fn inside_ignored(element: &ElementRef) -> bool {
    is_ignored(element)
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| is_ignored(&ancestor))
}

fn collect_text(element: ElementRef, out: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let text: &str = text;
                out.push(text.to_string());
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    if !is_ignored(&child_element) {
                        collect_text(child_element, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).find(|el| !inside_ignored(el))
}

/// Pull the title and main text out of an HTML page
///
/// Returns `None` when the page has no body or its text is shorter than
/// `settings.min_content_length`.
pub fn extract_content(html: &str, url: &str, settings: &ScraperSettings) -> Option<PageContent> {
    let document = Html::parse_document(html);

    let title = select_first(&document, "title")
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            url::Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
        })
        .unwrap_or_else(|| url.to_string());

    let root = CONTENT_SELECTORS
        .iter()
        .find_map(|selector| select_first(&document, selector))
        .or_else(|| select_first(&document, "body"))?;

    let mut pieces = Vec::new();
    collect_text(root, &mut pieces);
    let text = pieces
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let content = truncate_text(&text, settings.max_content_length, "...");
    if content.chars().count() < settings.min_content_length {
        return None;
    }

    Some(PageContent { title, content })
}
