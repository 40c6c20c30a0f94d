use daily_digest::parser::{detect_format, strip_html, FeedFormat, ItemExtractor, TagScanExtractor};
use daily_digest::{FeedParser, FeedSource, RawItem, DESCRIPTION_LIMIT};
use proptest::prelude::*;
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .try_init()
            .ok();
    });
}

const RSS_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom" xmlns:dc="http://purl.org/dc/elements/1.1/">
<channel>
  <title>Example Blog</title>
  <link>https://example.com</link>
  <atom:link href="https://example.com/rss.xml" rel="self" type="application/rss+xml"/>
  <item>
    <title>Hello &amp; World</title>
    <link>https://example.com/hello</link>
    <pubDate>Sat, 17 Oct 2026 10:00:00 +0000</pubDate>
    <description>Some &lt;b&gt;bold&lt;/b&gt; text</description>
  </item>
  <item>
    <title><![CDATA[Rust <3 & friends]]></title>
    <guid isPermaLink="true">https://example.com/rust</guid>
    <dc:date>2026-10-16T08:30:00Z</dc:date>
    <content:encoded><![CDATA[<p>First paragraph.</p>
      <p>Second   paragraph.</p>]]></content:encoded>
  </item>
  <item>
    <description>An item with neither a title nor a link</description>
  </item>
</channel>
</rss>"#;

const ATOM_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Atom</title>
  <entry>
    <title type="html">Hello &amp; World</title>
    <link rel="replies" href="https://example.com/hello#comments"/>
    <link rel="alternate" type="text/html" href="https://example.com/hello"/>
    <published>2026-10-17T10:00:00Z</published>
    <updated>2026-10-17T12:00:00Z</updated>
    <summary type="html">Some &lt;b&gt;bold&lt;/b&gt; text</summary>
  </entry>
  <ENTRY>
    <TITLE>Shouting feed</TITLE>
    <LINK HREF='https://example.com/loud'/>
    <UPDATED>2026-10-15T00:00:00+02:00</UPDATED>
    <CONTENT type="html">&lt;p&gt;Loud content&lt;/p&gt;</CONTENT>
  </ENTRY>
</feed>"#;

fn triple(item: &RawItem) -> (String, String, String) {
    (item.title.clone(), item.link.clone(), item.description.clone())
}

#[test]
fn test_format_detection() {
    assert_eq!(detect_format(ATOM_FEED), FeedFormat::Atom);
    assert_eq!(detect_format(RSS_FEED), FeedFormat::Rss);
    assert_eq!(detect_format("<feedburner:info/>"), FeedFormat::Rss);
    assert_eq!(detect_format(""), FeedFormat::Rss);
}

#[test]
fn test_rss_items() {
    init_tracing();
    let items = FeedParser::new().parse_items(RSS_FEED);
    info!("Parsed {} RSS items", items.len());

    assert_eq!(items.len(), 2, "untitled, unlinked item is dropped");

    assert_eq!(items[0].title, "Hello & World");
    assert_eq!(items[0].link, "https://example.com/hello");
    assert_eq!(items[0].pub_date, "Sat, 17 Oct 2026 10:00:00 +0000");
    assert_eq!(items[0].description, "Some bold text");

    assert_eq!(items[1].title, "Rust <3 & friends");
    assert_eq!(items[1].link, "https://example.com/rust", "guid stands in for a missing link");
    assert_eq!(items[1].pub_date, "2026-10-16T08:30:00Z");
    assert_eq!(items[1].description, "First paragraph. Second paragraph.");
}

#[test]
fn test_atom_entries() {
    let items = FeedParser::new().parse_items(ATOM_FEED);
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].link, "https://example.com/hello", "alternate link wins over replies");
    assert_eq!(items[0].pub_date, "2026-10-17T10:00:00Z", "published preferred over updated");

    assert_eq!(items[1].title, "Shouting feed");
    assert_eq!(items[1].link, "https://example.com/loud");
    assert_eq!(items[1].pub_date, "2026-10-15T00:00:00+02:00");
    assert_eq!(items[1].description, "Loud content");
}

#[test]
fn test_atom_and_rss_describe_the_same_article() {
    let rss = FeedParser::new().parse_items(RSS_FEED);
    let atom = FeedParser::new().parse_items(ATOM_FEED);
    assert_eq!(triple(&rss[0]), triple(&atom[0]));
}

#[test]
fn test_articles_carry_source_and_normalized_date() {
    let source = FeedSource::new("example.com", "https://example.com/rss.xml", "https://example.com");
    let articles = FeedParser::new().parse_articles(RSS_FEED, &source);

    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].source_name, "example.com");
    assert_eq!(articles[0].source_url, "https://example.com");
    assert_eq!(articles[0].published_at.to_rfc3339(), "2026-10-17T10:00:00+00:00");
}

#[test]
fn test_description_truncated_to_limit() {
    let long = "é".repeat(DESCRIPTION_LIMIT + 50);
    let xml = format!(
        "<rss><channel><item><title>Long</title><link>https://e.com/l</link><description>{}</description></item></channel></rss>",
        long
    );
    let items = FeedParser::new().parse_items(&xml);
    assert_eq!(items[0].description.chars().count(), DESCRIPTION_LIMIT);
}

#[test]
fn test_malformed_input_yields_nothing() {
    let parser = FeedParser::new();
    assert!(parser.parse_items("").is_empty());
    assert!(parser.parse_items("<html><body>Not a feed</body></html>").is_empty());
    assert!(parser.parse_items("<rss><channel><item><title>unterminated").is_empty());
    assert!(parser.parse_items("\u{0}\u{1}<<<>>>&&&;").is_empty());
}

#[test]
fn test_entity_table_and_markup_stripping() {
    assert_eq!(strip_html("&quot;quoted&quot; &apos;a&apos; &#39;b&#39;"), "\"quoted\" 'a' 'b'");
    assert_eq!(strip_html("<p>one</p>\n\n<p>two</p>"), "one two");
    assert_eq!(strip_html("  a < b and c > d  "), "a < b and c > d");
}

struct FixedExtractor;

impl ItemExtractor for FixedExtractor {
    fn extractor_name(&self) -> &'static str {
        "fixed"
    }

    fn extract(&self, _xml: &str) -> Vec<RawItem> {
        vec![RawItem {
            title: "from fallback".to_string(),
            link: "https://e.com/f".to_string(),
            pub_date: String::new(),
            description: String::new(),
        }]
    }
}

#[test]
fn test_later_extractors_only_run_when_earlier_find_nothing() {
    let parser = FeedParser::with_extractors(vec![Box::new(TagScanExtractor), Box::new(FixedExtractor)]);

    let items = parser.parse_items(RSS_FEED);
    assert_eq!(items[0].title, "Hello & World");

    let items = parser.parse_items("<unknown-format/>");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "from fallback");
}

proptest! {
    #[test]
    fn arbitrary_input_never_panics(input in any::<String>()) {
        let items = FeedParser::new().parse_items(&input);
        for item in items {
            prop_assert!(!item.title.is_empty() || !item.link.is_empty());
            prop_assert!(item.description.chars().count() <= DESCRIPTION_LIMIT);
        }
    }

    #[test]
    fn item_shaped_noise_keeps_invariants(
        title in "[a-zA-Z0-9 <>&;/!\\[\\]]{0,40}",
        link in "[a-z:/.&;]{0,30}",
        description in "[a-zA-Z <>&;/]{0,800}",
        atom in any::<bool>(),
    ) {
        let xml = if atom {
            format!(
                "<feed xmlns=\"http://www.w3.org/2005/Atom\"><entry><title>{}</title><link href=\"{}\"/><summary>{}</summary></entry></feed>",
                title, link, description
            )
        } else {
            format!(
                "<rss><channel><item><title>{}</title><link>{}</link><description>{}</description></item></channel></rss>",
                title, link, description
            )
        };
        for item in FeedParser::new().parse_items(&xml) {
            prop_assert!(!item.title.is_empty() || !item.link.is_empty());
            prop_assert!(item.description.chars().count() <= DESCRIPTION_LIMIT);
        }
    }
}
