use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate};

use crate::models::mood_entry::{DailyMood, MoodEntry};

/// How far back the streak scan looks.
pub const STREAK_WINDOW_DAYS: i64 = 365;

/// Days shown on the weekly trend chart.
pub const TREND_DAYS: usize = 7;

/// Per-day averages over UTC calendar days, oldest first, keeping the last `days`.
pub fn daily_averages(entries: &[MoodEntry], days: usize) -> Vec<DailyMood> {
    let mut by_day: BTreeMap<NaiveDate, (i64, usize)> = BTreeMap::new();
    for entry in entries {
        let slot = by_day.entry(entry.logged_at.date_naive()).or_insert((0, 0));
        slot.0 += entry.mood_score as i64;
        slot.1 += 1;
    }

    let skip = by_day.len().saturating_sub(days);
    by_day
        .into_iter()
        .skip(skip)
        .map(|(date, (sum, count))| DailyMood {
            date,
            average: round_one(sum as f64 / count as f64),
            entries: count,
        })
        .collect()
}

/// Consecutive days with at least one entry, counting back from `today`.
///
/// Today may be missing (the user has not checked in yet); any other gap ends
/// the streak.
pub fn current_streak(logged_days: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut count = 0;
    for offset in 0..STREAK_WINDOW_DAYS {
        let day = today - Duration::days(offset);
        if logged_days.contains(&day) {
            count += 1;
        } else if offset == 0 {
            continue;
        } else {
            break;
        }
    }
    count
}

pub fn logged_days(entries: &[MoodEntry]) -> HashSet<NaiveDate> {
    entries.iter().map(|e| e.logged_at.date_naive()).collect()
}

pub fn streak_message(streak: u32) -> &'static str {
    if streak >= 14 {
        "You're unstoppable! 🏆"
    } else if streak >= 7 {
        "Amazing consistency! 🌟"
    } else if streak >= 3 {
        "Great momentum! 💪"
    } else if streak >= 1 {
        "Keep it going! 🔥"
    } else {
        "Start your streak today! ✨"
    }
}

/// Mean score rounded to one decimal, `None` for no entries.
pub fn average_score(entries: &[MoodEntry]) -> Option<f64> {
    if entries.is_empty() {
        return None;
    }
    let sum: i64 = entries.iter().map(|e| e.mood_score as i64).sum();
    Some(round_one(sum as f64 / entries.len() as f64))
}

pub fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
