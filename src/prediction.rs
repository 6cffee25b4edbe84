use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};

use crate::models::{
    CycleRecord, CycleStats, FertilityWindow, PeriodEpisode, StockReminder, DEFAULT_CYCLE_LENGTH,
};

/// Marked days further apart than this start a new period.
pub const EPISODE_GAP_DAYS: i64 = 7;

/// Days before the next period on which ovulation is estimated.
const LUTEAL_PHASE_DAYS: u64 = 14;

/// Stock reminders fire this many days ahead of the next period.
const STOCK_REMINDER_DAYS: i64 = 7;

/// Derived fields of a [`CycleRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub period_starts: Vec<NaiveDate>,
    pub cycle_length_days: u32,
    pub last_period_start: Option<NaiveDate>,
    pub next_expected_date: Option<NaiveDate>,
}

/// Group marked days into periods. A gap of more than
/// [`EPISODE_GAP_DAYS`] between neighbours opens a new episode.
pub fn episodes(dates: &BTreeSet<NaiveDate>) -> Vec<PeriodEpisode> {
    let mut iter = dates.iter().copied();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut episodes = Vec::new();
    let mut current = PeriodEpisode {
        start: first,
        end: first,
    };

    for day in iter {
        if (day - current.end).num_days() > EPISODE_GAP_DAYS {
            episodes.push(current);
            current = PeriodEpisode {
                start: day,
                end: day,
            };
        } else {
            current.end = day;
        }
    }
    episodes.push(current);
    episodes
}

pub fn period_starts(dates: &BTreeSet<NaiveDate>) -> Vec<NaiveDate> {
    episodes(dates).into_iter().map(|e| e.start).collect()
}

/// Recompute the cycle summary from scratch.
pub fn summarize(dates: &BTreeSet<NaiveDate>) -> Summary {
    let starts = period_starts(dates);

    let gaps = start_gaps(&starts);
    let cycle_length_days = if gaps.is_empty() {
        DEFAULT_CYCLE_LENGTH
    } else {
        let avg = mean(&gaps).round();
        u32::try_from(avg as i64).unwrap_or(u32::MAX)
    };

    let last_period_start = starts.last().copied();
    let next_expected_date = last_period_start
        .and_then(|start| start.checked_add_days(Days::new(u64::from(cycle_length_days))));

    Summary {
        period_starts: starts,
        cycle_length_days,
        last_period_start,
        next_expected_date,
    }
}

/// Estimate the fertility window from the predicted next period.
/// Ovulation ~14 days before it, fertile window is the five days leading up
/// to ovulation, peak is the last two.
pub fn fertility_window(record: &CycleRecord) -> Option<FertilityWindow> {
    let next = record.next_expected_date?;

    let ovulation_day = next.checked_sub_days(Days::new(LUTEAL_PHASE_DAYS))?;
    let fertile_start = ovulation_day.checked_sub_days(Days::new(5))?;
    let peak_start = ovulation_day.checked_sub_days(Days::new(2))?;

    Some(FertilityWindow {
        fertile_start,
        fertile_end: ovulation_day,
        ovulation_day,
        peak_start,
        peak_end: ovulation_day,
    })
}

pub fn cycle_stats(dates: &BTreeSet<NaiveDate>) -> CycleStats {
    let episodes = episodes(dates);

    let Some(last) = episodes.last() else {
        return CycleStats {
            total_episodes: 0,
            avg_cycle_length: None,
            avg_period_length: None,
            shortest_cycle: None,
            longest_cycle: None,
            last_period_start: None,
            last_period_end: None,
        };
    };

    let period_lengths: Vec<f64> = episodes.iter().map(|e| e.length_days() as f64).collect();
    let starts: Vec<NaiveDate> = episodes.iter().map(|e| e.start).collect();
    let cycle_lengths: Vec<i64> = starts
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .collect();

    CycleStats {
        total_episodes: episodes.len(),
        avg_cycle_length: if cycle_lengths.is_empty() {
            None
        } else {
            Some(cycle_lengths.iter().sum::<i64>() as f32 / cycle_lengths.len() as f32)
        },
        avg_period_length: Some(mean(&period_lengths) as f32),
        shortest_cycle: cycle_lengths.iter().copied().min(),
        longest_cycle: cycle_lengths.iter().copied().max(),
        last_period_start: Some(last.start),
        last_period_end: Some(last.end),
    }
}

/// How far away the next period is, and whether it is time to restock.
pub fn stock_reminder(record: &CycleRecord, today: NaiveDate) -> Option<StockReminder> {
    let next = record.next_expected_date?;
    let days_until_next = (next - today).num_days();
    Some(StockReminder {
        days_until_next,
        due: (1..=STOCK_REMINDER_DAYS).contains(&days_until_next),
    })
}

fn start_gaps(starts: &[NaiveDate]) -> Vec<f64> {
    starts
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days() as f64)
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
