/// Notifier Module
///
/// Turns a milestone into a reply under the post that earned it.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};

use crate::messages;
use crate::milestones::Milestone;
use crate::twitter::{StatusPoster, Tweet};

pub struct Notifier {
    poster: Arc<dyn StatusPoster>,
    rng: Mutex<StdRng>,
}

impl Notifier {
    pub fn new(poster: Arc<dyn StatusPoster>) -> Self {
        Self::with_rng(poster, StdRng::from_entropy())
    }

    /// Use a fixed random source, e.g. a seeded one in tests
    pub fn with_rng(poster: Arc<dyn StatusPoster>, rng: StdRng) -> Self {
        Self {
            poster,
            rng: Mutex::new(rng),
        }
    }

    /// Compose the reply text for a milestone
    pub fn compose(&self, tweet: &Tweet, milestone: &Milestone) -> Result<String> {
        let template = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| anyhow::anyhow!("message RNG lock poisoned"))?;
            messages::pick(messages::pool_for(milestone), &mut *rng)
                .context("Message pool is empty")?
        };
        Ok(messages::render(
            template,
            &tweet.author.screen_name,
            milestone.count(),
        ))
    }

    /// Post one celebratory reply
    pub async fn celebrate(&self, tweet: &Tweet, milestone: Milestone) -> Result<()> {
        let text = self.compose(tweet, &milestone)?;

        log::info!(
            "{}",
            serde_json::json!({ "reply": text, "inReplyTo": tweet.id })
        );
        let flag = match milestone {
            Milestone::Total(_) => serde_json::json!({ "totalTweet": 1 }),
            Milestone::Streak(_) => serde_json::json!({ "chainTweet": 1 }),
        };
        log::info!("{}", flag);

        self.poster
            .reply(&text, &tweet.id)
            .await
            .with_context(|| format!("Failed to reply to tweet {}", tweet.id))
    }
}
