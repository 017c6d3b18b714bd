//! Temporal statistics over a period's daily activity map
//!
//! Every function here takes the already period-filtered map; dates with a
//! zero count are treated as inactive.

use crate::types::{DayCount, Distribution, HeatmapCell, Period};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Streaks {
    pub max_streak: u32,
    /// Dates of the longest run (the earliest one on ties)
    pub max_streak_days: Vec<NaiveDate>,
    pub current_streak: u32,
}

pub fn streaks(daily: &BTreeMap<NaiveDate, u64>, today: NaiveDate) -> Streaks {
    let active: Vec<NaiveDate> = active_dates(daily).collect();
    let (max_streak, max_streak_days) = longest_run(&active);
    Streaks {
        max_streak,
        max_streak_days,
        current_streak: current_streak(daily, today),
    }
}

fn active_dates(daily: &BTreeMap<NaiveDate, u64>) -> impl Iterator<Item = NaiveDate> + '_ {
    daily.iter().filter(|&(_, &c)| c > 0).map(|(d, _)| *d)
}

/// Longest run of consecutive days in ascending `dates`
fn longest_run(dates: &[NaiveDate]) -> (u32, Vec<NaiveDate>) {
    if dates.is_empty() {
        return (0, Vec::new());
    }

    let mut best_start = 0usize;
    let mut best_len = 1usize;
    let mut run_start = 0usize;

    for i in 1..dates.len() {
        if (dates[i] - dates[i - 1]).num_days() != 1 {
            run_start = i;
        }
        let run_len = i - run_start + 1;
        // Strictly longer only: an equal later run does not replace the first
        if run_len > best_len {
            best_start = run_start;
            best_len = run_len;
        }
    }

    (
        best_len as u32,
        dates[best_start..best_start + best_len].to_vec(),
    )
}

/// Consecutive active days ending today, or ending yesterday if today is idle
pub fn current_streak(daily: &BTreeMap<NaiveDate, u64>, today: NaiveDate) -> u32 {
    let is_active = |d: NaiveDate| daily.get(&d).is_some_and(|&c| c > 0);

    let yesterday = today - Duration::days(1);
    let mut cursor = if is_active(today) {
        today
    } else if is_active(yesterday) {
        yesterday
    } else {
        return 0;
    };

    let mut streak = 0u32;
    while is_active(cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

/// Date with the highest count; the earliest date wins ties
pub fn most_active_day(daily: &BTreeMap<NaiveDate, u64>) -> Option<DayCount> {
    let mut best: Option<DayCount> = None;
    for (&date, &count) in daily {
        if count == 0 {
            continue;
        }
        match best {
            Some(b) if count <= b.count => {}
            _ => best = Some(DayCount { date, count }),
        }
    }
    best
}

pub fn weekday_distribution(daily: &BTreeMap<NaiveDate, u64>) -> Distribution {
    let mut counts = vec![0u64; 7];
    for (date, &count) in daily {
        let idx = date.weekday().num_days_from_sunday() as usize;
        counts[idx] = counts[idx].saturating_add(count);
    }
    distribution(WEEKDAY_LABELS.to_vec(), counts)
}

pub fn monthly_distribution(daily: &BTreeMap<NaiveDate, u64>) -> Distribution {
    let mut counts = vec![0u64; 12];
    for (date, &count) in daily {
        let idx = date.month0() as usize;
        counts[idx] = counts[idx].saturating_add(count);
    }
    distribution(MONTH_LABELS.to_vec(), counts)
}

fn distribution(labels: Vec<&'static str>, counts: Vec<u64>) -> Distribution {
    let mut most_active = None;
    let mut max = 0u64;
    for (i, &c) in counts.iter().enumerate() {
        if c > max {
            max = c;
            most_active = Some(i);
        }
    }
    Distribution {
        labels,
        counts,
        most_active,
    }
}

/// Percentile thresholds for intensity mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Percentiles {
    pub p25: u64,
    pub p50: u64,
    pub p75: u64,
}

impl Percentiles {
    /// 0 for no activity, else 1..=4 by quartile
    pub fn level(self, count: u64) -> u8 {
        if count == 0 {
            0
        } else if count <= self.p25 {
            1
        } else if count <= self.p50 {
            2
        } else if count <= self.p75 {
            3
        } else {
            4
        }
    }
}

/// Percentiles over non-zero values; `None` when every value is zero
pub fn calculate_percentiles(values: &[u64]) -> Option<Percentiles> {
    let mut non_zero: Vec<u64> = values.iter().copied().filter(|&v| v > 0).collect();
    if non_zero.is_empty() {
        return None;
    }

    non_zero.sort_unstable();
    let len = non_zero.len();
    let at = |q: f64| non_zero[((len as f64 * q).ceil() as usize).saturating_sub(1).min(len - 1)];

    Some(Percentiles {
        p25: at(0.25),
        p50: at(0.50),
        p75: at(0.75),
    })
}

/// One cell per calendar day of `period`
pub fn heatmap(daily: &BTreeMap<NaiveDate, u64>, period: Period) -> Vec<HeatmapCell> {
    let values: Vec<u64> = daily.values().copied().collect();
    let percentiles = calculate_percentiles(&values);

    period
        .days()
        .map(|date| {
            let count = daily.get(&date).copied().unwrap_or(0);
            HeatmapCell {
                date,
                count,
                level: percentiles.map_or(0, |p| p.level(count)),
            }
        })
        .collect()
}
