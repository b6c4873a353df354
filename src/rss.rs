//! Headline feeds per interest category, with a short-lived cache.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{NaaradError, Result};
use crate::preferences::Alert;
use crate::taxonomy::CategoryKey;

const FEED_TIMEOUT_SECS: u64 = 20;

/// Characters of description kept per item
const DESCRIPTION_LIMIT: usize = 300;

/// Characters of description shown in prompts
const PROMPT_DESCRIPTION_LIMIT: usize = 200;

pub const CATEGORY_FEEDS: [(&str, &[&str]); 4] = [
    (
        "sports",
        &[
            "https://www.thehindu.com/sport/feeder/default.rss",
            "https://www.thehindu.com/sport/football/feeder/default.rss",
            "https://feeds.bbci.co.uk/sport/rss.xml",
            "https://rss.cnn.com/rss/edition_sport.rss",
        ],
    ),
    (
        "news",
        &[
            "https://www.thehindu.com/news/feeder/default.rss",
            "https://rss.cnn.com/rss/edition.rss",
            "https://feeds.reuters.com/reuters/topNews",
        ],
    ),
    (
        "moviesTV",
        &[
            "https://www.thehindu.com/entertainment/movies/feeder/default.rss",
            "https://variety.com/feed/",
            "https://feeds.feedburner.com/TheMovieBlog",
        ],
    ),
    (
        "technology",
        &[
            "https://feeds.feedburner.com/TechCrunch",
            "https://rss.cnn.com/rss/edition_technology.rss",
            "https://feeds.reuters.com/reuters/technologyNews",
        ],
    ),
];

static FEED_AGENT: Lazy<ureq::Agent> = Lazy::new(|| {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(FEED_TIMEOUT_SECS)))
        .build()
        .into()
});

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("Invalid HTML tag regex"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

static IMG_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).expect("Invalid img src regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub link: String,
    pub pub_date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Feed URLs for a category name, matched case-insensitively
pub fn feeds_for(category: &str) -> &'static [&'static str] {
    CATEGORY_FEEDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category.trim()))
        .map(|(_, urls)| *urls)
        .unwrap_or(&[])
}

/// Strip HTML tags from text
fn strip_html_tags(html: &str) -> String {
    let text = HTML_TAG_RE.replace_all(html, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

fn take_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Parse RSS or Atom into items. Entries without a title are dropped.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>> {
    let feed = feed_rs::parser::parse(xml.as_bytes())
        .map_err(|e| NaaradError::FeedParseError(format!("Failed to parse feed: {}", e)))?;

    let items = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry
                .title
                .as_ref()
                .map(|t| t.content.trim().to_string())
                .filter(|t| !t.is_empty())?;

            let raw_description = entry
                .summary
                .as_ref()
                .map(|s| s.content.clone())
                .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
                .unwrap_or_default();

            let image_url = entry
                .media
                .iter()
                .flat_map(|m| m.thumbnails.iter().map(|t| t.image.uri.clone()))
                .chain(
                    entry
                        .media
                        .iter()
                        .flat_map(|m| m.content.iter().filter_map(|c| c.url.as_ref().map(|u| u.to_string()))),
                )
                .next()
                .or_else(|| {
                    IMG_SRC_RE
                        .captures(&raw_description)
                        .map(|c| c[1].to_string())
                });

            Some(FeedItem {
                title,
                description: take_chars(&strip_html_tags(&raw_description), DESCRIPTION_LIMIT),
                link: entry.links.first().map(|l| l.href.clone()).unwrap_or_default(),
                pub_date: entry.published.or(entry.updated),
                category: entry.categories.first().map(|c| c.term.clone()),
                image_url,
            })
        })
        .collect();

    Ok(items)
}

/// Source of raw feed documents
pub trait FeedFetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFeedFetcher;

impl FeedFetcher for HttpFeedFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let response = FEED_AGENT
            .get(url)
            .header("User-Agent", concat!("naarad/", env!("CARGO_PKG_VERSION")))
            .call()?;
        Ok(response.into_body().read_to_string()?)
    }
}

/// Time-bounded memoization of fetched items. Entries only leave by expiring.
#[derive(Debug)]
pub struct FeedCache {
    ttl: chrono::Duration,
    entries: HashMap<String, (DateTime<Utc>, Vec<FeedItem>)>,
}

impl FeedCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::minutes(5)),
            entries: HashMap::new(),
        }
    }

    /// Sorted, comma-joined category names
    pub fn key(categories: &[&str]) -> String {
        let mut sorted: Vec<&str> = categories.to_vec();
        sorted.sort_unstable();
        sorted.join(",")
    }

    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<&[FeedItem]> {
        self.entries
            .get(key)
            .filter(|(stored, _)| now - *stored < self.ttl)
            .map(|(_, items)| items.as_slice())
    }

    pub fn insert(&mut self, key: String, items: Vec<FeedItem>, now: DateTime<Utc>) {
        self.entries.insert(key, (now, items));
    }
}

pub struct RssService<F: FeedFetcher> {
    fetcher: F,
    cache: FeedCache,
    items_per_feed: usize,
    clock: fn() -> DateTime<Utc>,
}

impl RssService<HttpFeedFetcher> {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            HttpFeedFetcher,
            Duration::from_secs(config.rss_cache_ttl_secs),
            config.rss_items_per_feed,
        )
    }
}

impl<F: FeedFetcher> RssService<F> {
    pub fn new(fetcher: F, ttl: Duration, items_per_feed: usize) -> Self {
        Self {
            fetcher,
            cache: FeedCache::new(ttl),
            items_per_feed,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Items for every feed of the given categories.
    ///
    /// A feed that fails to download or parse is logged and skipped.
    pub fn fetch_by_categories(&mut self, categories: &[&str]) -> Vec<FeedItem> {
        let key = FeedCache::key(categories);
        let now = (self.clock)();
        if let Some(items) = self.cache.get(&key, now) {
            tracing::debug!(%key, count = items.len(), "feed cache hit");
            return items.to_vec();
        }

        let urls: Vec<&str> = categories
            .iter()
            .flat_map(|c| feeds_for(c).iter().copied())
            .collect();
        if urls.is_empty() {
            return Vec::new();
        }

        let mut all = Vec::new();
        for url in urls {
            match self.fetcher.fetch(url).and_then(|xml| parse_feed(&xml)) {
                Ok(mut items) => {
                    items.truncate(self.items_per_feed);
                    tracing::debug!(url, count = items.len(), "fetched feed");
                    all.extend(items);
                }
                Err(e) => tracing::warn!(url, error = %e, "skipping feed"),
            }
        }

        self.cache.insert(key, all.clone(), now);
        all
    }
}

/// Newest first; items without a date go last
pub fn recent_items(mut items: Vec<FeedItem>, limit: usize) -> Vec<FeedItem> {
    items.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
    items.truncate(limit);
    items
}

/// Feed categories implied by an alert's selected tags
pub fn categories_for_alert(alert: &Alert) -> Vec<&'static str> {
    [
        (CategoryKey::Sports, "sports"),
        (CategoryKey::MoviesTv, "moviesTV"),
        (CategoryKey::News, "news"),
        (CategoryKey::YouTube, "technology"),
    ]
    .into_iter()
    .filter(|(key, _)| !alert.category(*key).selected_tags.is_empty())
    .map(|(_, name)| name)
    .collect()
}

pub fn format_for_prompt(items: &[FeedItem]) -> String {
    if items.is_empty() {
        return "No recent news available.".to_string();
    }

    let mut out = String::from("Recent News & Updates from RSS Feeds:\n\n");
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, item.title));
        let short = take_chars(&item.description, PROMPT_DESCRIPTION_LIMIT);
        let ellipsis = if item.description.chars().count() > PROMPT_DESCRIPTION_LIMIT { "..." } else { "" };
        out.push_str(&format!("   {}{}\n", short, ellipsis));
        let published = item.pub_date.map(|d| d.to_rfc2822()).unwrap_or_default();
        out.push_str(&format!("   Published: {}\n", published));
        if let Some(image) = &item.image_url {
            out.push_str(&format!("   Image URL: {}\n", image));
        }
        out.push('\n');
    }
    out
}
