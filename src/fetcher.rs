/// Fetcher Module
///
/// Finds the posts a run should count: one search call, then the
/// self-post and recency filters.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::config::SinceWindow;
use crate::twitter::{Tweet, TweetSource};

/// What to search for and which results to keep
#[derive(Debug, Clone)]
pub struct SearchSpec {
    pub query: String,
    pub bot_screen_name: String,
    pub since: SinceWindow,
    pub limit: u32,
}

/// Search for `spec.query` and keep the qualifying posts
///
/// Any search failure is returned as-is; nothing is retried.
pub async fn find_tweets(
    source: &dyn TweetSource,
    spec: &SearchSpec,
    now: DateTime<Utc>,
) -> Result<Vec<Tweet>> {
    let cutoff = spec
        .since
        .cutoff(now)
        .context("Recency window reaches before the representable time range")?;

    let tweets = source.search(&spec.query, spec.limit).await?;
    let fetched = tweets.len();

    let qualifying = filter_tweets(tweets, &spec.bot_screen_name, cutoff);
    log::debug!(
        "Kept {} of {} tweets newer than {}",
        qualifying.len(),
        fetched,
        cutoff.to_rfc3339()
    );

    Ok(qualifying)
}

/// Drop the bot's own posts and anything not strictly newer than `cutoff`
pub fn filter_tweets(tweets: Vec<Tweet>, bot_screen_name: &str, cutoff: DateTime<Utc>) -> Vec<Tweet> {
    tweets
        .into_iter()
        .filter(|tweet| !tweet.author.screen_name.eq_ignore_ascii_case(bot_screen_name))
        .filter(|tweet| tweet.created_at.with_timezone(&Utc) > cutoff)
        .collect()
}
