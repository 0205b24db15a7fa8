/// Hashtag Streak Bot Library
///
/// Scans a hashtag search feed, tracks per-author totals and
/// consecutive-day streaks in PostgreSQL, and replies to posts that
/// reach a milestone.

pub mod bot;
pub mod config;
pub mod fetcher;
pub mod http_server;
pub mod messages;
pub mod milestones;
pub mod notifier;
pub mod scheduler;
pub mod store;
pub mod streaks;
pub mod twitter;
