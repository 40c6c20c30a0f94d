use crate::dates::normalize_date;
use crate::types::{Article, FeedSource, RawItem, DESCRIPTION_LIMIT};
use feed_rs::parser;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// How far into the document the Atom markers are looked for.
const FORMAT_SNIFF_CHARS: usize = 1000;

const KNOWN_TAGS: &[&str] = &[
    "title",
    "link",
    "guid",
    "published",
    "updated",
    "summary",
    "content",
    "pubDate",
    "dc:date",
    "date",
    "description",
    "content:encoded",
];

static ATOM_ROOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<feed[\s>]").expect("valid regex"));
static ATOM_NAMESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)xmlns\s*=\s*["']http://www\.w3\.org/2005/Atom["']"#).expect("valid regex"));
static ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<entry(?:\s[^>]*)?>(.*?)</entry\s*>").expect("valid regex"));
static ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<item(?:\s[^>]*)?>(.*?)</item\s*>").expect("valid regex"));
static LINK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<link\b([^>]*)>").expect("valid regex"));
static HREF_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex"));
static REL_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\brel\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex"));
static CDATA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"));
static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[/!?a-zA-Z][^>]*>").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static TAG_CONTENT: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    KNOWN_TAGS
        .iter()
        .map(|tag| {
            let pattern = format!(r"(?is)<{tag}(?:\s[^>]*)?>(.*?)</{tag}\s*>", tag = regex::escape(tag));
            (*tag, Regex::new(&pattern).expect("valid regex"))
        })
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Atom,
    Rss,
}

/// Cheap sniff: an Atom root element or default namespace near the top.
pub fn detect_format(xml: &str) -> FeedFormat {
    let head_end = xml
        .char_indices()
        .nth(FORMAT_SNIFF_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(xml.len());
    let head = &xml[..head_end];

    if ATOM_ROOT.is_match(head) || ATOM_NAMESPACE.is_match(head) {
        FeedFormat::Atom
    } else {
        FeedFormat::Rss
    }
}

/// Something that can pull raw items out of a feed document.
///
/// Implementations must not panic on malformed input; a document they cannot
/// make sense of yields an empty list.
pub trait ItemExtractor: Send + Sync {
    fn extractor_name(&self) -> &'static str;

    fn extract(&self, xml: &str) -> Vec<RawItem>;
}

/// Regex-driven tag scanner. Ignores attributes, case, and overall document
/// validity, which is what most real-world feeds need.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagScanExtractor;

impl ItemExtractor for TagScanExtractor {
    fn extractor_name(&self) -> &'static str {
        "tag-scan"
    }

    fn extract(&self, xml: &str) -> Vec<RawItem> {
        match detect_format(xml) {
            FeedFormat::Atom => ENTRY
                .captures_iter(xml)
                .filter_map(|caps| caps.get(1))
                .filter_map(|block| scan_atom_entry(block.as_str()))
                .collect(),
            FeedFormat::Rss => ITEM
                .captures_iter(xml)
                .filter_map(|caps| caps.get(1))
                .filter_map(|block| scan_rss_item(block.as_str()))
                .collect(),
        }
    }
}

fn scan_atom_entry(block: &str) -> Option<RawItem> {
    let title = clean_text(&tag_content(block, "title"));
    let link = match atom_href(block) {
        Some(href) => href,
        None => tag_content(block, "link"),
    };
    let pub_date = first_non_empty(block, &["published", "updated"]);
    let description = first_non_empty(block, &["summary", "content"]);

    build_item(title, link, pub_date, description)
}

fn scan_rss_item(block: &str) -> Option<RawItem> {
    let title = clean_text(&tag_content(block, "title"));
    let link = first_non_empty(block, &["link", "guid"]);
    let pub_date = first_non_empty(block, &["pubDate", "dc:date", "date"]);
    let description = first_non_empty(block, &["description", "content:encoded"]);

    build_item(title, link, pub_date, description)
}

fn build_item(title: String, link: String, pub_date: String, description: String) -> Option<RawItem> {
    let link = clean_link(&link);
    if title.is_empty() && link.is_empty() {
        return None;
    }
    Some(RawItem {
        title,
        link,
        pub_date: unwrap_cdata(&pub_date).trim().to_string(),
        description: truncate_chars(&clean_text(&description), DESCRIPTION_LIMIT),
    })
}

/// Content of the first `<tag>` in `block`, CDATA unwrapped, untrimmed markup.
fn tag_content(block: &str, tag: &str) -> String {
    TAG_CONTENT
        .get(tag)
        .and_then(|re| re.captures(block))
        .and_then(|caps| caps.get(1))
        .map(|m| unwrap_cdata(m.as_str()))
        .unwrap_or_default()
}

fn first_non_empty(block: &str, tags: &[&str]) -> String {
    tags.iter()
        .map(|tag| tag_content(block, tag))
        .find(|content| !content.trim().is_empty())
        .unwrap_or_default()
}

/// Prefer an `alternate` (or rel-less) link, else any href-bearing link.
fn atom_href(block: &str) -> Option<String> {
    let mut fallback = None;
    for caps in LINK_TAG.captures_iter(block) {
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let Some(href) = attr_value(&HREF_ATTR, attrs) else {
            continue;
        };
        let rel = attr_value(&REL_ATTR, attrs);
        match rel.as_deref() {
            None | Some("alternate") => return Some(href),
            Some(_) => {
                fallback.get_or_insert(href);
            }
        }
    }
    fallback
}

fn attr_value(re: &Regex, attrs: &str) -> Option<String> {
    re.captures(attrs)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
}

fn unwrap_cdata(text: &str) -> String {
    if text.contains("<![CDATA[") {
        CDATA.replace_all(text, "$1").into_owned()
    } else {
        text.to_string()
    }
}

/// Remove markup, decode the fixed entity table, and collapse whitespace.
pub fn strip_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let without_tags = MARKUP.replace_all(text, "");
    let decoded = decode_entities(&without_tags);
    // Escaped markup only becomes markup after decoding.
    let without_tags = MARKUP.replace_all(&decoded, "");
    WHITESPACE.replace_all(without_tags.trim(), " ").into_owned()
}

pub fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
}

fn clean_text(text: &str) -> String {
    strip_html(&unwrap_cdata(text))
}

fn clean_link(link: &str) -> String {
    decode_entities(unwrap_cdata(link).trim())
}

pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Schema-aware parse via `feed-rs`. Only consulted when the tag scan came up
/// empty, e.g. for documents that prefix every element with a namespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictExtractor;

impl ItemExtractor for StrictExtractor {
    fn extractor_name(&self) -> &'static str {
        "feed-rs"
    }

    fn extract(&self, xml: &str) -> Vec<RawItem> {
        let feed = match parser::parse(xml.as_bytes()) {
            Ok(feed) => feed,
            Err(e) => {
                debug!("Strict parse failed: {}", e);
                return Vec::new();
            }
        };

        feed.entries
            .into_iter()
            .filter_map(|entry| {
                let title = entry.title.map(|t| clean_text(&t.content)).unwrap_or_default();
                let link = entry
                    .links
                    .iter()
                    .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
                    .or_else(|| entry.links.first())
                    .map(|l| l.href.clone())
                    .unwrap_or_default();
                let pub_date = entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_default();
                let description = entry
                    .summary
                    .map(|s| s.content)
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .unwrap_or_default();

                build_item(title, link, pub_date, description)
            })
            .collect()
    }
}

/// Runs extractors in order; the first one that finds anything wins.
pub struct FeedParser {
    extractors: Vec<Box<dyn ItemExtractor>>,
}

impl FeedParser {
    pub fn new() -> Self {
        Self {
            extractors: vec![Box::new(TagScanExtractor), Box::new(StrictExtractor)],
        }
    }

    pub fn with_extractors(extractors: Vec<Box<dyn ItemExtractor>>) -> Self {
        Self { extractors }
    }

    pub fn parse_items(&self, xml: &str) -> Vec<RawItem> {
        if xml.trim().is_empty() {
            return Vec::new();
        }
        for extractor in &self.extractors {
            let items = extractor.extract(xml);
            if !items.is_empty() {
                debug!("{} extracted {} items", extractor.extractor_name(), items.len());
                return items;
            }
        }
        Vec::new()
    }

    /// Items of one source's document as articles with normalized dates.
    pub fn parse_articles(&self, xml: &str, source: &FeedSource) -> Vec<Article> {
        self.parse_items(xml)
            .into_iter()
            .map(|item| Article {
                published_at: normalize_date(&item.pub_date),
                title: item.title,
                link: item.link,
                description: item.description,
                source_name: source.name.clone(),
                source_url: source.html_url.clone(),
            })
            .collect()
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}
