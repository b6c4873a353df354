//! Turn a web page into a custom interest topic.

use std::time::Duration;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{NaaradError, Result};

const CAPTURE_TIMEOUT_SECS: u64 = 20;

/// Longest topic kept from a page title
const MAX_TOPIC_CHARS: usize = 120;

static CAPTURE_AGENT: Lazy<ureq::Agent> = Lazy::new(|| {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(CAPTURE_TIMEOUT_SECS)))
        .build()
        .into()
});

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("Invalid title selector"));

static OG_TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:title"]"#).expect("Invalid og:title selector")
});

static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("Invalid h1 selector"));

fn clean(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.chars().take(MAX_TOPIC_CHARS).collect())
    }
}

/// Page topic: `<title>`, then `og:title`, then the first `<h1>`
pub fn page_topic(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    document
        .select(&TITLE_SELECTOR)
        .next()
        .and_then(|el| clean(&el.text().collect::<String>()))
        .or_else(|| {
            document
                .select(&OG_TITLE_SELECTOR)
                .next()
                .and_then(|el| el.value().attr("content"))
                .and_then(clean)
        })
        .or_else(|| {
            document
                .select(&H1_SELECTOR)
                .next()
                .and_then(|el| clean(&el.text().collect::<String>()))
        })
}

/// Fetch `url` and return its topic. Only http and https are accepted.
pub fn capture_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(NaaradError::InvalidInput(format!(
            "Cannot capture '{}' pages, only http and https",
            parsed.scheme()
        )));
    }

    tracing::debug!(url = %parsed, "capturing page topic");
    let response = CAPTURE_AGENT
        .get(parsed.as_str())
        .header("User-Agent", concat!("naarad/", env!("CARGO_PKG_VERSION")))
        .call()?;
    let html = response.into_body().read_to_string()?;

    page_topic(&html).ok_or_else(|| NaaradError::InvalidInput(format!("No title found on {}", parsed)))
}
