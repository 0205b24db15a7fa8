/// Streak Tracker
///
/// Applies both conditional updates for a post. A successful total
/// update is checked against the every-fifth-post rule, a successful
/// streak update against the Fibonacci rule. Nothing here fails the batch:
/// unmet preconditions are skipped quietly, anything else is counted
/// and logged at debug level.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::milestones;
use crate::notifier::Notifier;
use crate::store::{Counters, PostDay, StreakStore};
use crate::twitter::Tweet;

/// What happened while processing one or more posts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub updates_applied: usize,
    pub updates_skipped: usize,
    pub replies_posted: usize,
    pub suppressed_errors: usize,
}

impl Tally {
    pub fn absorb(&mut self, other: Tally) {
        self.updates_applied += other.updates_applied;
        self.updates_skipped += other.updates_skipped;
        self.replies_posted += other.replies_posted;
        self.suppressed_errors += other.suppressed_errors;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateKind {
    Total,
    Streak,
}

pub struct StreakTracker {
    store: Arc<dyn StreakStore>,
    notifier: Notifier,
}

impl StreakTracker {
    pub fn new(store: Arc<dyn StreakStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &Arc<dyn StreakStore> {
        &self.store
    }

    /// Run the total and streak updates for one post, independently
    pub async fn process(&self, tweet: &Tweet) -> Tally {
        let post = PostDay {
            author_id: tweet.author.id.clone(),
            screen_name: tweet.author.screen_name.clone(),
            // Day boundary in the offset the post was stamped with
            day: tweet.created_at.date_naive(),
        };

        let (total, streak) = tokio::join!(
            self.apply(UpdateKind::Total, tweet, &post),
            self.apply(UpdateKind::Streak, tweet, &post),
        );

        let mut tally = total;
        tally.absorb(streak);
        tally
    }

    async fn apply(&self, kind: UpdateKind, tweet: &Tweet, post: &PostDay) -> Tally {
        let mut tally = Tally::default();

        let result = match kind {
            UpdateKind::Total => self.store.record_total(post).await,
            UpdateKind::Streak => self.store.extend_streak(post).await,
        };

        let counters: Counters = match result {
            Ok(Some(counters)) => counters,
            Ok(None) => {
                tally.updates_skipped += 1;
                return tally;
            }
            Err(e) => {
                log::debug!("{:?} update for tweet {} suppressed: {:#}", kind, tweet.id, e);
                tally.suppressed_errors += 1;
                return tally;
            }
        };
        tally.updates_applied += 1;

        let milestone = match kind {
            UpdateKind::Total => milestones::total_milestone(counters.total),
            UpdateKind::Streak => milestones::streak_milestone(counters.streak),
        };

        if let Some(milestone) = milestone {
            match self.notifier.celebrate(tweet, milestone).await {
                Ok(()) => tally.replies_posted += 1,
                Err(e) => {
                    log::debug!("Reply for tweet {} suppressed: {:#}", tweet.id, e);
                    tally.suppressed_errors += 1;
                }
            }
        }

        tally
    }
}
