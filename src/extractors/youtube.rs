use anyhow::Result;
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::extractors::video_id::VideoId;

/// Collection-level pages (playlists, channels, profiles, search results,
/// feeds). These are rejected before any id extraction is attempted, even
/// when a path segment happens to look like a video id.
const COLLECTION_PATTERN: &str =
    r"(?i)youtube\.com/(?:playlist|channel/|user/|c/|@|results|feed)";

/// URL extraction patterns in priority order. Every pattern binds exactly
/// 11 id characters immediately followed by a parameter/path boundary
/// (`&`, `?`, `#`, `/`) or the end of the string, so a longer run can never
/// yield a truncated match.
const URL_PATTERNS: &[&str] = &[
    // Canonical watch form: youtube.com/watch?v=ID
    r"[?&]v=([A-Za-z0-9_-]{11})(?:[&?#/]|$)",
    // Short link: youtu.be/ID
    r"youtu\.be/([A-Za-z0-9_-]{11})(?:[&?#/]|$)",
    // Live form: youtube.com/live/ID
    r"youtube\.com/live/([A-Za-z0-9_-]{11})(?:[&?#/]|$)",
    // Embed form: youtube.com/embed/ID
    r"youtube\.com/embed/([A-Za-z0-9_-]{11})(?:[&?#/]|$)",
    // Suspended-tab URLs (tab-discard extensions) wrap the original address
    // in their own query string; the id still sits behind `=` or `/`.
    r"[=/]([A-Za-z0-9_-]{11})(?:[&?#/]|$)",
];

/// Title extraction patterns, weaker heuristics used only when the URL
/// yields nothing. Listed in priority order.
const TITLE_PATTERNS: &[&str] = &[
    r"\(([A-Za-z0-9_-]{11})\)",
    r"\[([A-Za-z0-9_-]{11})\]",
    r" - ([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    r" \| ([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    // Last resort: any delimited 11-character run.
    r"(?:^|[^A-Za-z0-9_-])([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
];

/// Decide whether a tab holds a single playable video and extract its id.
///
/// URL patterns run first; the title heuristics are a fallback for tabs
/// whose URL is unavailable (discarded/suspended tabs). Returns `None` for
/// collection pages and anything that fails validation.
pub fn extract_from_tab(url: &str, title: &str) -> Option<VideoId> {
    if url.is_empty() && title.is_empty() {
        return None;
    }
    extract_from_url(url).or_else(|| extract_from_title(title))
}

pub fn extract_from_url(url: &str) -> Option<VideoId> {
    if url.is_empty() || is_collection_url(url) {
        return None;
    }
    first_valid_capture(url, URL_PATTERNS)
}

pub fn extract_from_title(title: &str) -> Option<VideoId> {
    if title.is_empty() {
        return None;
    }
    first_valid_capture(title, TITLE_PATTERNS)
}

pub fn is_collection_url(url: &str) -> bool {
    if let Ok(parsed) = Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            if host == "youtube.com" || host.ends_with(".youtube.com") {
                let path = parsed.path();
                return path.starts_with("/playlist")
                    || path.starts_with("/channel/")
                    || path.starts_with("/user/")
                    || path.starts_with("/c/")
                    || path.starts_with("/@")
                    || path.starts_with("/results")
                    || path.starts_with("/feed");
            }
        }
    }
    // Suspended-tab URLs wrap the real address in another scheme, so the
    // structured check above never sees it. The raw scan catches those.
    Regex::new(COLLECTION_PATTERN)
        .map(|re| re.is_match(url))
        .unwrap_or(false)
}

fn first_valid_capture(text: &str, patterns: &[&str]) -> Option<VideoId> {
    for pattern in patterns {
        if let Ok(re) = Regex::new(pattern) {
            if let Some(captures) = re.captures(text) {
                if let Some(id) = captures.get(1).and_then(|m| VideoId::parse(m.as_str())) {
                    return Some(id);
                }
            }
        }
    }
    None
}

/// Resolves display titles through the public oEmbed endpoint. Title lookup
/// is cosmetic: every failure is swallowed and the caller falls back to the
/// bare id.
pub struct OEmbedClient {
    client: reqwest::Client,
}

impl OEmbedClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!("gathertube/{}", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    pub async fn fetch_title(&self, id: &VideoId) -> Option<String> {
        match self.try_fetch_title(id).await {
            Ok(title) => Some(title),
            Err(e) => {
                tracing::warn!("Failed to load title for {}: {}", id, e);
                None
            }
        }
    }

    async fn try_fetch_title(&self, id: &VideoId) -> Result<String> {
        let oembed_url = format!(
            "https://www.youtube.com/oembed?url={}&format=json",
            urlencoding::encode(&id.watch_url())
        );

        let response = self.client.get(&oembed_url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("oEmbed returned HTTP {}", response.status());
        }

        let body: Value = response.json().await?;
        body.get("title")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string())
            .ok_or_else(|| anyhow::anyhow!("oEmbed response has no title"))
    }
}

impl Default for OEmbedClient {
    fn default() -> Self {
        Self::new()
    }
}
