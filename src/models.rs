use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::prediction;

/// Cycle length assumed until at least two period starts have been marked.
pub const DEFAULT_CYCLE_LENGTH: u32 = 28;

/// The persisted tracker state. Only `marked_dates` is authoritative; the
/// other fields are derived and rebuilt by [`CycleRecord::recompute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleRecord {
    #[serde(default, alias = "dates")]
    pub marked_dates: BTreeSet<NaiveDate>,
    #[serde(default = "default_cycle_length", alias = "cycleLength")]
    pub cycle_length_days: u32,
    #[serde(default)]
    pub last_period_start: Option<NaiveDate>,
    #[serde(default)]
    pub next_expected_date: Option<NaiveDate>,
}

fn default_cycle_length() -> u32 {
    DEFAULT_CYCLE_LENGTH
}

impl Default for CycleRecord {
    fn default() -> Self {
        Self {
            marked_dates: BTreeSet::new(),
            cycle_length_days: DEFAULT_CYCLE_LENGTH,
            last_period_start: None,
            next_expected_date: None,
        }
    }
}

impl CycleRecord {
    /// Build a record from a set of marked dates.
    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut record = Self {
            marked_dates: dates.into_iter().collect(),
            ..Self::default()
        };
        record.recompute();
        record
    }

    /// Mark the date if it is unmarked, unmark it otherwise. Returns whether
    /// the date is marked afterwards.
    pub fn toggle_date(&mut self, date: NaiveDate) -> bool {
        let marked = if self.marked_dates.remove(&date) {
            false
        } else {
            self.marked_dates.insert(date)
        };
        self.recompute();
        marked
    }

    pub fn is_period_date(&self, date: NaiveDate) -> bool {
        self.marked_dates.contains(&date)
    }

    pub fn cycle_status(&self) -> CycleStatus {
        CycleStatus::classify(self.cycle_length_days)
    }

    /// Rebuild every derived field from `marked_dates`.
    pub fn recompute(&mut self) {
        let summary = prediction::summarize(&self.marked_dates);
        self.cycle_length_days = summary.cycle_length_days;
        self.last_period_start = summary.last_period_start;
        self.next_expected_date = summary.next_expected_date;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleStatus {
    Normal,
    Delayed,
    NeedsAttention,
}

impl CycleStatus {
    pub fn classify(cycle_length_days: u32) -> Self {
        match cycle_length_days {
            21..=35 => CycleStatus::Normal,
            36..=45 => CycleStatus::Delayed,
            _ => CycleStatus::NeedsAttention,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CycleStatus::Normal => "Normal",
            CycleStatus::Delayed => "Delayed",
            CycleStatus::NeedsAttention => "Needs Attention",
        }
    }
}

/// A run of marked days grouped into one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodEpisode {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodEpisode {
    pub fn length_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilityWindow {
    pub fertile_start: NaiveDate,
    pub fertile_end: NaiveDate,
    pub ovulation_day: NaiveDate,
    pub peak_start: NaiveDate,
    pub peak_end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleStats {
    pub total_episodes: usize,
    pub avg_cycle_length: Option<f32>,
    pub avg_period_length: Option<f32>,
    pub shortest_cycle: Option<i64>,
    pub longest_cycle: Option<i64>,
    pub last_period_start: Option<NaiveDate>,
    pub last_period_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReminder {
    pub days_until_next: i64,
    pub due: bool,
}

/// A crisis phrase match. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistressEvent {
    pub raw_text: String,
    pub matched_keyword: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Author {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub author: Author,
    pub text: String,
    #[serde(default)]
    pub is_alert: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author: Author::User,
            text: text.into(),
            is_alert: false,
        }
    }

    pub fn bot(text: impl Into<String>, is_alert: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            author: Author::Bot,
            text: text.into(),
            is_alert,
        }
    }
}
