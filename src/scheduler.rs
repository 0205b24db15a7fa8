/// Scheduler Module
///
/// Timer trigger: runs the bot at a fixed interval.

use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use crate::bot::{StreakBot, TriggerEvent};

/// One year; longer periods would overflow the timer's deadline arithmetic
const MAX_INTERVAL_MINUTES: u64 = 60 * 24 * 365;

fn tick_period(interval_minutes: u64) -> Duration {
    Duration::from_secs(interval_minutes.min(MAX_INTERVAL_MINUTES).saturating_mul(60))
}

/// Start the run scheduler
///
/// The first run happens immediately. A failed run is logged and the
/// next tick runs as usual; nothing is retried early.
pub async fn start_scheduler(bot: Arc<StreakBot>, interval_minutes: u64) {
    let mut interval = time::interval(tick_period(interval_minutes));
    // A slow run should not cause a burst of catch-up runs
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    log::info!("Starting streak scheduler (interval: {} minutes)", interval_minutes);

    loop {
        interval.tick().await;

        log::info!("Scheduled streak run triggered");

        if let Err(e) = bot.handle(TriggerEvent::from_source("scheduler")).await {
            let error_str = e.to_string();
            if error_str.contains("429") || error_str.contains("Rate Limited") {
                log::warn!("Rate limit hit during scheduled run. Will run again at next interval.");
            } else {
                log::error!("Scheduled run failed: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_period_is_minutes_in_seconds() {
        assert_eq!(tick_period(15), Duration::from_secs(900));
    }

    #[test]
    fn huge_intervals_are_capped() {
        assert_eq!(tick_period(u64::MAX), Duration::from_secs(MAX_INTERVAL_MINUTES * 60));
        assert_eq!(tick_period(MAX_INTERVAL_MINUTES + 1), tick_period(MAX_INTERVAL_MINUTES));
    }
}
