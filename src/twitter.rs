/// Twitter Module
///
/// Thin client for the two X (Twitter) API v2 endpoints the bot needs:
/// recent search and posting a reply. Both sit behind traits so the
/// rest of the bot can run against fakes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Legacy (v1.1) `created_at` layout, e.g. "Wed May 01 12:00:00 +0000 2024"
const LEGACY_TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// A post returned by the search collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub author: TweetAuthor,
    /// Creation time in the offset the service reported it in
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetAuthor {
    /// Stable user id
    pub id: String,
    /// Handle without the leading '@'
    pub screen_name: String,
}

/// Search collaborator
#[async_trait]
pub trait TweetSource: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Tweet>>;
}

/// Post collaborator
#[async_trait]
pub trait StatusPoster: Send + Sync {
    async fn reply(&self, status: &str, in_reply_to: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<Vec<RawTweet>>,
    includes: Option<SearchIncludes>,
    meta: Option<SearchMeta>,
}

#[derive(Debug, Deserialize)]
struct RawTweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchIncludes {
    users: Option<Vec<RawUser>>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct SearchMeta {
    result_count: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
    reply: ReplySettings<'a>,
}

#[derive(Debug, Serialize)]
struct ReplySettings<'a> {
    in_reply_to_tweet_id: &'a str,
}

/// Parse a post timestamp in either RFC 3339 or the legacy RFC-822-like form
pub fn parse_created_at(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT))
        .ok()
}

/// reqwest-backed client for the X API
pub struct TwitterClient {
    http_client: reqwest::Client,
    api_base: String,
    bearer_token: String,
    user_token: Option<String>,
}

impl TwitterClient {
    pub fn new(api_base: &str, bearer_token: &str, user_token: Option<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.trim().to_string(),
            user_token,
        }
    }
}

#[async_trait]
impl TweetSource for TwitterClient {
    /// Fetch one page of recent posts matching `query`
    ///
    /// Uses Bearer Token authentication (app-only)
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Tweet>> {
        let url = format!("{}/2/tweets/search/recent", self.api_base);
        let max_results = max_results.to_string();

        log::debug!("Searching tweets with query: {} (max: {})", query, max_results);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", query),
                ("max_results", max_results.as_str()),
                ("tweet.fields", "created_at,author_id"),
                ("expansions", "author_id"),
                ("user.fields", "username"),
            ])
            .send()
            .await
            .context("Failed to fetch tweets from Twitter API")?;

        let rate_limit_remaining = response
            .headers()
            .get("x-rate-limit-remaining")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok());

        let rate_limit_reset = response
            .headers()
            .get("x-rate-limit-reset")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<i64>().ok());

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("{}", describe_failure(status, &text, rate_limit_reset));
        }

        if let Some(remaining) = rate_limit_remaining {
            log::info!("Twitter API rate limit: {} requests remaining", remaining);
            if remaining < 5 {
                log::warn!("Low search rate limit remaining ({})", remaining);
            }
        }

        let search: SearchResponse = response
            .json()
            .await
            .context("Failed to parse Twitter search response")?;

        Ok(search.into_tweets())
    }
}

#[async_trait]
impl StatusPoster for TwitterClient {
    async fn reply(&self, status: &str, in_reply_to: &str) -> Result<()> {
        let token = self
            .user_token
            .as_ref()
            .context("TWITTER_USER_ACCESS_TOKEN not set")?;

        let request = CreateTweetRequest {
            text: status,
            reply: ReplySettings {
                in_reply_to_tweet_id: in_reply_to,
            },
        };

        let response = self
            .http_client
            .post(format!("{}/2/tweets", self.api_base))
            .bearer_auth(token.trim())
            .json(&request)
            .send()
            .await
            .context("Failed to send reply to Twitter API")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("{}", describe_failure(status, &text, None));
        }

        Ok(())
    }
}

/// Logs replies instead of posting them (DRY_RUN)
pub struct DryRunPoster;

#[async_trait]
impl StatusPoster for DryRunPoster {
    async fn reply(&self, status: &str, in_reply_to: &str) -> Result<()> {
        log::info!("[dry run] would reply to {}: {}", in_reply_to, status);
        Ok(())
    }
}

impl SearchResponse {
    /// Join posts with their expanded authors, dropping anything unusable
    fn into_tweets(self) -> Vec<Tweet> {
        let handles: HashMap<String, String> = self
            .includes
            .and_then(|i| i.users)
            .unwrap_or_default()
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        if let Some(count) = self.meta.and_then(|m| m.result_count) {
            log::debug!("Search reported {} results", count);
        }

        self.data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| {
                let author_id = raw.author_id?;
                let Some(screen_name) = handles.get(&author_id) else {
                    log::debug!("Dropping tweet {}: author {} not expanded", raw.id, author_id);
                    return None;
                };
                let Some(created_at) = raw.created_at.as_deref().and_then(parse_created_at) else {
                    log::debug!("Dropping tweet {}: unparseable created_at", raw.id);
                    return None;
                };
                Some(Tweet {
                    id: raw.id,
                    text: raw.text,
                    author: TweetAuthor {
                        id: author_id,
                        screen_name: screen_name.clone(),
                    },
                    created_at,
                })
            })
            .collect()
    }
}

fn describe_failure(status: reqwest::StatusCode, body: &str, rate_limit_reset: Option<i64>) -> String {
    match status.as_u16() {
        401 => format!(
            "Unauthorized (401): invalid or expired token. API Response: {}",
            body
        ),
        403 => format!(
            "Forbidden (403): token lacks access to this endpoint. API Response: {}",
            body
        ),
        429 => {
            let reset_info = match rate_limit_reset {
                Some(reset_timestamp) => {
                    let reset_time = DateTime::<Utc>::from_timestamp(reset_timestamp, 0)
                        .unwrap_or_else(Utc::now);
                    let wait_seconds = reset_timestamp.saturating_sub(Utc::now().timestamp()).max(0);
                    format!(
                        "Rate limit resets at {} (in approximately {} seconds)",
                        reset_time.format("%Y-%m-%d %H:%M:%S UTC"),
                        wait_seconds
                    )
                }
                None => "Rate limit reset time unknown".to_string(),
            };
            format!("Rate Limited (429): too many requests. {}", reset_info)
        }
        _ => format!("Twitter API error: {} - {}", status, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use mockito::Matcher;

    #[test]
    fn parses_rfc3339_and_legacy_timestamps() {
        let v2 = parse_created_at("2024-05-01T12:34:56.000Z").unwrap();
        assert_eq!((v2.hour(), v2.minute(), v2.second()), (12, 34, 56));

        let legacy = parse_created_at("Wed May 01 23:30:00 -0500 2024").unwrap();
        assert_eq!(legacy.day(), 1);
        assert_eq!(legacy.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(legacy.with_timezone(&Utc).day(), 2);

        assert!(parse_created_at("yesterday-ish").is_none());
    }

    #[tokio::test]
    async fn search_joins_expanded_authors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/2/tweets/search/recent")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "#LearnToCode".into()),
                Matcher::UrlEncoded("max_results".into(), "100".into()),
                Matcher::UrlEncoded("expansions".into(), "author_id".into()),
            ]))
            .match_header("authorization", "Bearer app-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("x-rate-limit-remaining", "170")
            .with_body(
                serde_json::json!({
                    "data": [
                        {"id": "1", "text": "day 3 #LearnToCode", "author_id": "42", "created_at": "2024-05-01T12:00:00.000Z"},
                        {"id": "2", "text": "no author", "author_id": "99", "created_at": "2024-05-01T12:00:00.000Z"},
                        {"id": "3", "text": "bad date", "author_id": "42", "created_at": "soon"}
                    ],
                    "includes": {"users": [{"id": "42", "username": "alice", "name": "Alice"}]},
                    "meta": {"result_count": 3}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = TwitterClient::new(&server.url(), "app-token", None);
        let tweets = client.search("#LearnToCode", 100).await.unwrap();

        mock.assert_async().await;
        assert_eq!(tweets.len(), 1);
        assert_eq!(tweets[0].id, "1");
        assert_eq!(tweets[0].author.id, "42");
        assert_eq!(tweets[0].author.screen_name, "alice");
    }

    #[tokio::test]
    async fn search_with_no_results_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/2/tweets/search/recent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"meta": {"result_count": 0}}"#)
            .create_async()
            .await;

        let client = TwitterClient::new(&server.url(), "app-token", None);
        assert!(client.search("#LearnToCode", 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rate_limited_search_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/2/tweets/search/recent")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"title": "Too Many Requests"}"#)
            .create_async()
            .await;

        let client = TwitterClient::new(&server.url(), "app-token", None);
        let err = client.search("#LearnToCode", 100).await.unwrap_err();

        assert!(err.to_string().contains("Rate Limited (429)"));
    }

    #[test]
    fn rate_limit_message_tolerates_garbage_reset_header() {
        for reset in [i64::MIN, i64::MAX, 0] {
            let message = describe_failure(reqwest::StatusCode::TOO_MANY_REQUESTS, "", Some(reset));
            assert!(message.starts_with("Rate Limited (429)"), "{}", reset);
        }
    }

    #[tokio::test]
    async fn reply_posts_with_user_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2/tweets")
            .match_header("authorization", "Bearer user-token")
            .match_body(Matcher::Json(serde_json::json!({
                "text": "nice streak",
                "reply": {"in_reply_to_tweet_id": "1"}
            })))
            .with_status(201)
            .with_body(r#"{"data": {"id": "2", "text": "nice streak"}}"#)
            .create_async()
            .await;

        let client = TwitterClient::new(&server.url(), "app-token", Some("user-token".into()));
        client.reply("nice streak", "1").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn reply_without_user_token_fails() {
        let client = TwitterClient::new("http://127.0.0.1:9", "app-token", None);
        let err = client.reply("nice streak", "1").await.unwrap_err();

        assert!(err.to_string().contains("TWITTER_USER_ACCESS_TOKEN"));
    }
}
