/// Hashtag Streak Bot
///
/// Counts #LearnToCode posts per author, keeps daily streaks, and
/// celebrates every fifth post and every Fibonacci-length streak with a
/// reply.
///
/// Runs once by default. Set RUN_INTERVAL_MINUTES to keep running on a
/// timer and HTTP_PORT to accept runs over HTTP.

use anyhow::Result;
use hashtag_streak_bot::{
    bot::{StreakBot, TriggerEvent},
    config,
    http_server::{self, AppState},
    scheduler,
    store::PgStreakStore,
    twitter::{DryRunPoster, StatusPoster, TwitterClient},
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    pretty_env_logger::init();

    log::info!("Starting Hashtag Streak Bot...");

    // Load configuration from environment
    let cfg = config::Config::from_env()?;

    let twitter = Arc::new(TwitterClient::new(
        &cfg.twitter_api_base,
        &cfg.twitter_bearer_token,
        cfg.twitter_user_token.clone(),
    ));
    let poster: Arc<dyn StatusPoster> = if cfg.dry_run {
        log::info!("DRY_RUN enabled - replies will only be logged");
        Arc::new(DryRunPoster)
    } else {
        twitter.clone()
    };

    let store = PgStreakStore::connect(&cfg.database_url).await?;
    store.initialize_table().await?;

    let bot = Arc::new(StreakBot::from_config(&cfg, twitter, poster, Arc::new(store)));

    match (cfg.http_port, cfg.run_interval_minutes) {
        (None, None) => bot.handle(TriggerEvent::from_source("cli")).await?,
        (Some(port), None) => {
            http_server::start_server(AppState { bot }, port).await?;
        }
        (None, Some(minutes)) => scheduler::start_scheduler(bot, minutes).await,
        (Some(port), Some(minutes)) => {
            tokio::spawn(scheduler::start_scheduler(bot.clone(), minutes));
            http_server::start_server(AppState { bot }, port).await?;
        }
    }

    Ok(())
}
