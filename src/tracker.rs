use chrono::NaiveDate;

use crate::models::{CycleRecord, CycleStats, CycleStatus, FertilityWindow, StockReminder};
use crate::prediction;
use crate::storage::{self, RecordStore, StorageError, PERIOD_DATA_KEY};

/// Owns the user's cycle record and writes it back after every change.
pub struct CycleTracker<S> {
    store: S,
    record: CycleRecord,
}

impl<S: RecordStore> CycleTracker<S> {
    /// Read the stored record, or start empty on first use. Derived fields
    /// are rebuilt from the marked dates rather than trusted.
    pub fn load(store: S) -> Result<Self, StorageError> {
        let mut record: CycleRecord =
            storage::load_json(&store, PERIOD_DATA_KEY)?.unwrap_or_default();
        record.recompute();
        tracing::debug!(dates = record.marked_dates.len(), "cycle record loaded");
        Ok(Self { store, record })
    }

    /// Flip a date in or out of the marked set and persist the result.
    /// On a failed write the in-memory record is rolled back.
    pub fn toggle_date(&mut self, date: NaiveDate) -> Result<bool, StorageError> {
        let marked = self.record.toggle_date(date);
        if let Err(e) = storage::save_json(&self.store, PERIOD_DATA_KEY, &self.record) {
            self.record.toggle_date(date);
            return Err(e);
        }
        tracing::info!(
            %date,
            marked,
            cycle_length = self.record.cycle_length_days,
            "period date toggled"
        );
        Ok(marked)
    }

    pub fn cycle_status(&self) -> CycleStatus {
        self.record.cycle_status()
    }

    pub fn is_period_date(&self, date: NaiveDate) -> bool {
        self.record.is_period_date(date)
    }

    pub fn record(&self) -> &CycleRecord {
        &self.record
    }

    pub fn stats(&self) -> CycleStats {
        prediction::cycle_stats(&self.record.marked_dates)
    }

    pub fn fertility_window(&self) -> Option<FertilityWindow> {
        prediction::fertility_window(&self.record)
    }

    pub fn stock_reminder(&self, today: NaiveDate) -> Option<StockReminder> {
        prediction::stock_reminder(&self.record, today)
    }

    /// Delete the stored record and start over empty.
    pub fn wipe(&mut self) -> Result<(), StorageError> {
        self.store.remove(PERIOD_DATA_KEY)?;
        self.record = CycleRecord::default();
        tracing::warn!("cycle record wiped");
        Ok(())
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Accepts reads, refuses every write.
    struct ReadOnlyStore;

    impl RecordStore for ReadOnlyStore {
        fn read(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Ok(None)
        }
        fn write(&self, _key: &str, _bytes: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn starts_empty_on_first_use() {
        let tracker = CycleTracker::load(MemoryStore::new()).unwrap();
        assert!(tracker.record().marked_dates.is_empty());
        assert_eq!(tracker.record().cycle_length_days, 28);
        assert_eq!(tracker.record().next_expected_date, None);
        assert_eq!(tracker.cycle_status(), CycleStatus::Normal);
    }

    #[test]
    fn toggles_are_persisted() {
        let mut tracker = CycleTracker::load(MemoryStore::new()).unwrap();
        for day in 1..=5 {
            tracker.toggle_date(d(&format!("2024-01-0{day}"))).unwrap();
        }
        for day in ["2024-01-29", "2024-01-30", "2024-01-31", "2024-02-01", "2024-02-02"] {
            tracker.toggle_date(d(day)).unwrap();
        }

        let reloaded = CycleTracker::load(tracker.into_store()).unwrap();
        let record = reloaded.record();
        assert_eq!(record.marked_dates.len(), 10);
        assert_eq!(record.cycle_length_days, 28);
        assert_eq!(record.last_period_start, Some(d("2024-01-29")));
        assert_eq!(record.next_expected_date, Some(d("2024-02-26")));
        assert!(reloaded.is_period_date(d("2024-01-03")));
        assert!(!reloaded.is_period_date(d("2024-01-10")));
    }

    #[test]
    fn stale_derived_fields_are_rebuilt_on_load() {
        let store = MemoryStore::new();
        store
            .write(
                PERIOD_DATA_KEY,
                br#"{"markedDates":["2024-01-01"],"cycleLengthDays":99,"lastPeriodStart":null,"nextExpectedDate":null}"#,
            )
            .unwrap();

        let tracker = CycleTracker::load(store).unwrap();
        assert_eq!(tracker.record().cycle_length_days, 28);
        assert_eq!(tracker.record().next_expected_date, Some(d("2024-01-29")));
    }

    #[test]
    fn failed_write_rolls_back() {
        let mut tracker = CycleTracker::load(ReadOnlyStore).unwrap();
        assert!(tracker.toggle_date(d("2024-01-01")).is_err());
        assert!(!tracker.is_period_date(d("2024-01-01")));
        assert_eq!(tracker.record(), &CycleRecord::default());
    }

    #[test]
    fn wipe_clears_store() {
        let mut tracker = CycleTracker::load(MemoryStore::new()).unwrap();
        tracker.toggle_date(d("2024-01-01")).unwrap();
        tracker.wipe().unwrap();

        assert!(tracker.record().marked_dates.is_empty());
        let reloaded = CycleTracker::load(tracker.into_store()).unwrap();
        assert!(reloaded.record().marked_dates.is_empty());
    }
}
