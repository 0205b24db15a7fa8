/// Bot module
///
/// One invocation of the streak bot: find qualifying posts, then run the
/// streak tracker over all of them concurrently. This is the single entry
/// point every trigger (one-shot, timer, HTTP) goes through.

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::fetcher::{find_tweets, SearchSpec};
use crate::notifier::Notifier;
use crate::store::{AuthorRecord, StreakStore};
use crate::streaks::{StreakTracker, Tally};
use crate::twitter::{StatusPoster, TweetSource};

/// Payload a trigger hands to the bot; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Who fired the run (e.g. "scheduler", "http"), for the logs
    #[serde(default)]
    pub source: Option<String>,
}

impl TriggerEvent {
    pub fn from_source(source: &str) -> Self {
        Self {
            source: Some(source.to_string()),
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub tweets_found: usize,
    #[serde(flatten)]
    pub tally: Tally,
    pub finished_at: DateTime<Utc>,
}

/// Bookkeeping across runs within this process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStatus {
    pub last_success: Option<RunSummary>,
    pub last_error: Option<String>,
    pub total_runs: u32,
}

pub struct StreakBot {
    search: SearchSpec,
    source: Arc<dyn TweetSource>,
    tracker: StreakTracker,
    // Keeps the timer and HTTP triggers from overlapping a run
    run_lock: Mutex<()>,
    status: RwLock<RunStatus>,
}

impl StreakBot {
    pub fn new(
        search: SearchSpec,
        source: Arc<dyn TweetSource>,
        store: Arc<dyn StreakStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            search,
            source,
            tracker: StreakTracker::new(store, notifier),
            run_lock: Mutex::new(()),
            status: RwLock::new(RunStatus::default()),
        }
    }

    /// Wire the bot from configuration and already-constructed clients
    pub fn from_config(
        config: &Config,
        source: Arc<dyn TweetSource>,
        poster: Arc<dyn StatusPoster>,
        store: Arc<dyn StreakStore>,
    ) -> Self {
        let search = SearchSpec {
            query: config.search_query.clone(),
            bot_screen_name: config.bot_screen_name.clone(),
            since: config.since,
            limit: config.search_limit,
        };
        Self::new(search, source, store, Notifier::new(poster))
    }

    /// Trigger entry point: `Ok(())` on success, the fetch error otherwise
    pub async fn handle(&self, event: TriggerEvent) -> Result<()> {
        log::info!(
            "Streak run triggered by {}",
            event.source.as_deref().unwrap_or("unknown")
        );
        self.run(Utc::now()).await.map(|_| ())
    }

    /// Process every qualifying post as of `now`
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let _lock = self.run_lock.lock().await;

        let outcome = self.run_once(now).await;

        let mut status = self.status.write().await;
        status.total_runs += 1;
        match &outcome {
            Ok(summary) => {
                status.last_success = Some(summary.clone());
                status.last_error = None;
            }
            Err(e) => {
                log::error!("Streak run failed: {:#}", e);
                status.last_error = Some(format!("{:#}", e));
            }
        }

        outcome
    }

    async fn run_once(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let tweets = find_tweets(self.source.as_ref(), &self.search, now).await?;

        log::info!("{}", serde_json::json!({ "foundTweets": tweets.len() }));

        // Unordered fan-out; each post settles on its own
        let tallies = join_all(tweets.iter().map(|tweet| self.tracker.process(tweet))).await;

        let mut tally = Tally::default();
        for t in tallies {
            tally.absorb(t);
        }

        if tally.suppressed_errors > 0 {
            log::info!(
                "{}",
                serde_json::json!({ "suppressedErrors": tally.suppressed_errors })
            );
        }

        log::info!(
            "Run complete: {} tweets, {} updates applied, {} skipped, {} replies",
            tweets.len(),
            tally.updates_applied,
            tally.updates_skipped,
            tally.replies_posted
        );

        Ok(RunSummary {
            tweets_found: tweets.len(),
            tally,
            finished_at: Utc::now(),
        })
    }

    pub async fn status(&self) -> RunStatus {
        self.status.read().await.clone()
    }

    pub async fn author(&self, author_id: &str) -> Result<Option<AuthorRecord>> {
        self.tracker.store().get(author_id).await
    }
}
