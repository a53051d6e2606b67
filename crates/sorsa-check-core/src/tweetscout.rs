//! TweetScout metrics client.
//!
//! Five independent reads per handle (info, score, follower stats, about, top followers)
//! plus the paginated weekly mention search. The API key travels in the `ApiKey` header.
//! Every read resolves to a [`Fetch`]; transport errors, timeouts and bad payloads are
//! logged here and never propagated.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::BotConfig;
use crate::error::{BotError, BotResult};
use crate::handle::Handle;

/// Trailing window for mention search.
pub const MENTION_WINDOW_DAYS: i64 = 7;

/// Upper bound on mention pages per search.
const MAX_MENTION_PAGES: usize = 50;

/// Outcome of one upstream read.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch<T> {
    Found(T),
    /// Upstream answered but has nothing for this handle (404 or `null` body).
    Absent,
    /// Transport error, timeout, unexpected status or undecodable body.
    Failed(String),
}

impl<T> Fetch<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Fetch::Found(v) => Some(v),
            Fetch::Absent | Fetch::Failed(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Fetch::Found(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub screen_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub followers_count: Option<u64>,
    #[serde(default)]
    pub tweets_count: Option<u64>,
    #[serde(default)]
    pub register_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowerStats {
    #[serde(default)]
    pub influencers_count: Option<u64>,
    #[serde(default)]
    pub venture_capitals_count: Option<u64>,
    #[serde(default)]
    pub projects_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AboutInfo {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub username_change_count: Option<u64>,
    #[serde(default)]
    pub last_username_change_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopFollower {
    /// The endpoint has shipped both spellings.
    #[serde(default, alias = "screeName")]
    pub screen_name: String,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    #[serde(default, alias = "id_str")]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, alias = "full_text")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetPage {
    #[serde(default)]
    pub tweets: Vec<Tweet>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Serialize)]
struct SearchTweetsRequest<'a> {
    query: String,
    order: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_cursor: Option<&'a str>,
}

/// The five per-handle reads the report is built from.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn account_info(&self, handle: &Handle) -> Fetch<AccountInfo>;
    async fn score(&self, handle: &Handle) -> Fetch<ScoreResult>;
    async fn follower_stats(&self, handle: &Handle) -> Fetch<FollowerStats>;
    async fn about(&self, handle: &Handle) -> Fetch<AboutInfo>;
    async fn top_followers(&self, handle: &Handle) -> Fetch<Vec<TopFollower>>;
}

/// HTTP client for the TweetScout v2 API.
#[derive(Debug, Clone)]
pub struct TweetScoutClient {
    base_url: String,
    client: reqwest::Client,
}

impl TweetScoutClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> BotResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(api_key.trim())
            .map_err(|e| BotError::Config(format!("TW_APIKEY is not a valid header value: {}", e)))?;
        headers.insert(HeaderName::from_static("apikey"), key);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &BotConfig) -> BotResult<Self> {
        Self::new(
            &config.tweetscout_base_url,
            &config.tweetscout_api_key,
            config.request_timeout,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        what: &str,
        handle: &Handle,
        path: &str,
        query: &[(&str, &str)],
    ) -> Fetch<T> {
        tracing::debug!("[TweetScout] Fetching {} for @{}...", what, handle);
        let sent = self.client.get(self.url(path)).query(query).send().await;
        let fetched = match sent {
            Ok(res) => decode_response(res).await,
            Err(e) => Fetch::Failed(e.to_string()),
        };
        match &fetched {
            Fetch::Found(_) => tracing::debug!("[TweetScout] {} for @{} received.", what, handle),
            Fetch::Absent => tracing::info!("[TweetScout] No {} for @{}.", what, handle),
            Fetch::Failed(reason) => {
                tracing::warn!(handle = %handle, "[TweetScout] Error fetching {}: {}", what, reason)
            }
        }
        fetched
    }

    /// Every mention of `handle` from the last seven days, excluding replies, newest first.
    ///
    /// Pages until an empty page, a page reaching past the window, or no cursor.
    pub async fn mentions_last_week(&self, handle: &Handle) -> Fetch<Vec<Tweet>> {
        let mut window = MentionWindow::ending_at(Utc::now());
        let mut cursor: Option<String> = None;

        for page_no in 1..=MAX_MENTION_PAGES {
            tracing::debug!("[TweetScout] Requesting mentions page {} for @{}", page_no, handle);
            let sent = {
                let body = SearchTweetsRequest {
                    query: format!("(@{}) -filter:replies", handle),
                    order: "latest",
                    next_cursor: cursor.as_deref(),
                };
                self.client
                    .post(self.url("/search-tweets"))
                    .json(&body)
                    .send()
                    .await
            };
            let page = match sent {
                Ok(res) => decode_response::<TweetPage>(res).await,
                Err(e) => Fetch::Failed(e.to_string()),
            };
            let page = match page {
                Fetch::Found(p) => p,
                Fetch::Absent => TweetPage::default(),
                Fetch::Failed(reason) => {
                    tracing::warn!(handle = %handle, "[TweetScout] Error fetching mentions: {}", reason);
                    return Fetch::Failed(reason);
                }
            };
            match window.absorb(page) {
                PageStep::Next(next) => cursor = Some(next),
                PageStep::Done => break,
            }
            if page_no == MAX_MENTION_PAGES {
                tracing::warn!(
                    handle = %handle,
                    "[TweetScout] Mention search hit the {} page cap",
                    MAX_MENTION_PAGES
                );
            }
        }

        let tweets = window.into_tweets();
        tracing::info!(
            "[TweetScout] Total mentions for @{} in last {} days: {}",
            handle,
            MENTION_WINDOW_DAYS,
            tweets.len()
        );
        Fetch::Found(tweets)
    }
}

#[async_trait]
impl MetricsSource for TweetScoutClient {
    async fn account_info(&self, handle: &Handle) -> Fetch<AccountInfo> {
        self.get_json("info", handle, &format!("/info/{}", handle), &[])
            .await
    }

    async fn score(&self, handle: &Handle) -> Fetch<ScoreResult> {
        self.get_json("score", handle, &format!("/score/{}", handle), &[])
            .await
    }

    async fn follower_stats(&self, handle: &Handle) -> Fetch<FollowerStats> {
        self.get_json(
            "follower stats",
            handle,
            "/followers-stats",
            &[("user_handle", handle.as_str())],
        )
        .await
    }

    async fn about(&self, handle: &Handle) -> Fetch<AboutInfo> {
        self.get_json("about info", handle, "/about", &[("link", handle.as_str())])
            .await
    }

    async fn top_followers(&self, handle: &Handle) -> Fetch<Vec<TopFollower>> {
        self.get_json(
            "top followers",
            handle,
            &format!("/top-followers/{}", handle),
            &[("from", "db")],
        )
        .await
    }
}

async fn decode_response<T: DeserializeOwned>(res: reqwest::Response) -> Fetch<T> {
    let status = res.status();
    if status == StatusCode::NOT_FOUND {
        return Fetch::Absent;
    }
    let text = match res.text().await {
        Ok(t) => t,
        Err(e) => return Fetch::Failed(e.to_string()),
    };
    if !status.is_success() {
        let snippet: String = text.chars().take(200).collect();
        return Fetch::Failed(format!("HTTP {}: {}", status.as_u16(), snippet));
    }
    if text.trim().is_empty() {
        return Fetch::Absent;
    }
    match serde_json::from_str::<Option<T>>(&text) {
        Ok(Some(v)) => Fetch::Found(v),
        Ok(None) => Fetch::Absent,
        Err(e) => Fetch::Failed(format!("decode: {}", e)),
    }
}

/// What to do after absorbing a mention page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStep {
    Next(String),
    Done,
}

/// Accumulates mention pages, newest first, within the trailing window.
#[derive(Debug)]
pub struct MentionWindow {
    cutoff: DateTime<Utc>,
    tweets: Vec<Tweet>,
}

impl MentionWindow {
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        Self {
            cutoff: now - chrono::Duration::days(MENTION_WINDOW_DAYS),
            tweets: Vec::new(),
        }
    }

    /// Keep in-window tweets and decide whether to request another page.
    ///
    /// Results are newest first, so a single tweet older than the cutoff means every
    /// later page is out of the window too. Tweets with unreadable timestamps are dropped
    /// without ending the search.
    pub fn absorb(&mut self, page: TweetPage) -> PageStep {
        if page.tweets.is_empty() {
            return PageStep::Done;
        }
        let mut reached_older = false;
        for tweet in page.tweets {
            match tweet.created_at.as_deref().and_then(parse_timestamp) {
                Some(at) if at > self.cutoff => self.tweets.push(tweet),
                Some(at) if at < self.cutoff => reached_older = true,
                _ => {}
            }
        }
        if reached_older {
            return PageStep::Done;
        }
        match page.next_cursor.filter(|c| !c.is_empty()) {
            Some(next) => PageStep::Next(next),
            None => PageStep::Done,
        }
    }

    pub fn len(&self) -> usize {
        self.tweets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweets.is_empty()
    }

    pub fn into_tweets(self) -> Vec<Tweet> {
        self.tweets
    }
}

/// Parse the timestamp shapes TweetScout returns: RFC 3339, the classic Twitter
/// `Tue Mar 21 20:50:14 +0000 2006`, or a bare `YYYY-MM-DD[ HH:MM:SS]` taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
