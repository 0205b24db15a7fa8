/// Reply text pools
///
/// Templates use `{name}` for the author's handle and `{count}` for the
/// milestone value.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::milestones::Milestone;

pub const TOTAL_MESSAGES: &[&str] = &[
    "@{name} that's {count} #LearnToCode posts! Keep shipping.",
    "Look at you go, @{name}: {count} #LearnToCode updates and counting.",
    "@{name} just logged #LearnToCode post number {count}. Every line counts!",
    "{count} posts in, @{name}. Your future self says thanks. #LearnToCode",
    "High five, @{name}! {count} #LearnToCode check-ins so far.",
];

pub const STREAK_MESSAGES: &[&str] = &[
    "@{name} {count} days in a row! That #LearnToCode streak is on fire.",
    "Day {count} of your streak, @{name}. Don't break the chain! #LearnToCode",
    "@{name} has coded {count} days straight. Consistency wins. #LearnToCode",
    "{count}-day #LearnToCode streak for @{name}. See you tomorrow!",
    "Streak check: @{name} is at {count} consecutive days. Keep it rolling!",
];

pub fn pool_for(milestone: &Milestone) -> &'static [&'static str] {
    match milestone {
        Milestone::Total(_) => TOTAL_MESSAGES,
        Milestone::Streak(_) => STREAK_MESSAGES,
    }
}

/// Pick a template uniformly at random; `None` only for an empty pool
pub fn pick<'a, R>(pool: &[&'a str], rng: &mut R) -> Option<&'a str>
where
    R: Rng + ?Sized,
{
    pool.choose(rng).copied()
}

pub fn render(template: &str, screen_name: &str, count: i64) -> String {
    template
        .replace("{name}", screen_name)
        .replace("{count}", &count.to_string())
}
