/// Milestone rules
///
/// Pure checks over the counters an update returned. The total update
/// celebrates every fifth post; the streak update celebrates any streak
/// longer than one day whose length is a Fibonacci number.

use serde::{Deserialize, Serialize};

/// Totals divisible by this are celebrated
pub const TOTAL_MILESTONE_EVERY: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Milestone {
    Total(i64),
    Streak(i64),
}

impl Milestone {
    pub fn count(&self) -> i64 {
        match self {
            Milestone::Total(n) | Milestone::Streak(n) => *n,
        }
    }
}

/// Milestone reached by the total update, if any
pub fn total_milestone(total: i64) -> Option<Milestone> {
    is_total_milestone(total).then_some(Milestone::Total(total))
}

/// Milestone reached by the streak update, if any
pub fn streak_milestone(streak: i64) -> Option<Milestone> {
    is_streak_milestone(streak).then_some(Milestone::Streak(streak))
}

pub fn is_total_milestone(total: i64) -> bool {
    total > 0 && total % TOTAL_MILESTONE_EVERY == 0
}

pub fn is_streak_milestone(streak: i64) -> bool {
    match u64::try_from(streak) {
        Ok(n) => n > 1 && is_fibonacci(n),
        Err(_) => false,
    }
}

/// n is Fibonacci iff 5n² + 4 or 5n² − 4 is a perfect square
pub fn is_fibonacci(n: u64) -> bool {
    let n = u128::from(n);
    let Some(five_n_squared) = n.checked_mul(n).and_then(|sq| sq.checked_mul(5)) else {
        return is_fibonacci_by_walk(n);
    };
    let plus = five_n_squared.checked_add(4).map_or(false, is_perfect_square);
    plus || (five_n_squared >= 4 && is_perfect_square(five_n_squared - 4))
}

pub fn is_perfect_square(x: u128) -> bool {
    let root = isqrt(x);
    root * root == x
}

/// Floor of the square root, exact for every u128
fn isqrt(x: u128) -> u128 {
    if x < 2 {
        return x;
    }
    // Float estimate, then correct the rounding in either direction
    let mut root = (x as f64).sqrt() as u128;
    while root.checked_mul(root).map_or(true, |sq| sq > x) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).map_or(false, |sq| sq <= x) {
        root += 1;
    }
    root
}

/// Walks the sequence; only reached when 5n² overflows u128
fn is_fibonacci_by_walk(n: u128) -> bool {
    let (mut a, mut b) = (0u128, 1u128);
    while b < n {
        let Some(next) = a.checked_add(b) else {
            return false;
        };
        a = b;
        b = next;
    }
    b == n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fibonacci_members_are_detected() {
        for n in [1, 2, 3, 5, 8, 13, 21, 34] {
            assert!(is_fibonacci(n), "{} should be Fibonacci", n);
        }
        for n in [4, 6, 7, 9, 10, 12] {
            assert!(!is_fibonacci(n), "{} should not be Fibonacci", n);
        }
    }

    #[test]
    fn fibonacci_holds_for_large_terms() {
        // F(80), F(90) and F(93), the largest that fits in u64
        assert!(is_fibonacci(23_416_728_348_467_685));
        assert!(is_fibonacci(2_880_067_194_370_816_120));
        assert!(is_fibonacci(12_200_160_415_121_876_738));
        assert!(!is_fibonacci(2_880_067_194_370_816_121));
        assert!(!is_fibonacci(u64::MAX));
    }

    #[test]
    fn perfect_squares_near_float_precision_limits() {
        let big = (1u128 << 60) + 7;
        assert!(is_perfect_square(big * big));
        assert!(!is_perfect_square(big * big - 1));
        assert!(!is_perfect_square(big * big + 1));
        assert!(is_perfect_square(0));
        assert!(is_perfect_square(1));
        assert!(!is_perfect_square(2));
    }

    #[test]
    fn every_fifth_total_fires() {
        for total in [5, 10, 15] {
            assert!(is_total_milestone(total));
        }
        for total in [0, 1, 6, 7, 8, 9] {
            assert!(!is_total_milestone(total));
        }
    }

    #[test]
    fn streak_rule_needs_more_than_one_day() {
        assert!(!is_streak_milestone(0));
        assert!(!is_streak_milestone(1));
        assert!(is_streak_milestone(2));
        assert!(is_streak_milestone(3));
        assert!(!is_streak_milestone(4));
        assert!(is_streak_milestone(5));
        assert!(!is_streak_milestone(-3));
    }

    #[test]
    fn each_update_reports_only_its_own_rule() {
        assert_eq!(total_milestone(10), Some(Milestone::Total(10)));
        assert_eq!(total_milestone(11), None);
        assert_eq!(streak_milestone(8), Some(Milestone::Streak(8)));
        assert_eq!(streak_milestone(4), None);
        assert_eq!(streak_milestone(1), None);
    }
}
