//! Read-only browsing of past workout days.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::models::WorkoutEntry;
use crate::store::Database;
use crate::workouts::{self, DayDetail};

/// Completion and time statistics for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total_exercises: usize,
    pub completed_exercises: usize,
    pub completion_percent: f64,
    pub total_time_seconds: u64,
}

impl DaySummary {
    pub fn from_entries(date: NaiveDate, entries: &[WorkoutEntry]) -> Self {
        let total_exercises = entries.len();
        let completed_exercises = entries.iter().filter(|e| e.is_completed).count();
        let completion_percent = if total_exercises == 0 {
            0.0
        } else {
            completed_exercises as f64 / total_exercises as f64 * 100.0
        };
        Self {
            date,
            total_exercises,
            completed_exercises,
            completion_percent,
            total_time_seconds: entries.iter().map(|e| e.total_time_seconds as u64).sum(),
        }
    }
}

/// What the history view currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum HistoryState {
    #[default]
    Loading,
    Loaded {
        detail: DayDetail,
        summary: DaySummary,
    },
    NotFound(NaiveDate),
    Error(String),
}

/// Load one day for display. Errors become [`HistoryState::Error`].
pub fn load_day(db: &Database, date: NaiveDate) -> HistoryState {
    match workouts::day_detail(db, date) {
        Ok(Some(detail)) => {
            let summary = DaySummary::from_entries(date, &detail.entries);
            HistoryState::Loaded { detail, summary }
        }
        Ok(None) => HistoryState::NotFound(date),
        Err(e) => {
            log::error!("Failed to load workout for {date}: {e}");
            HistoryState::Error(format!("Could not load workout for {date}: {e}"))
        }
    }
}

/// Summaries of every recorded day, newest first.
pub fn summaries(db: &Database) -> Result<Vec<DaySummary>> {
    let mut out = Vec::new();
    for date in workouts::workout_dates(db)? {
        if let Some(detail) = workouts::day_detail(db, date)? {
            out.push(DaySummary::from_entries(date, &detail.entries));
        }
    }
    Ok(out)
}

/// Forward/backward traversal over workout dates.
///
/// "Next" moves toward more recent days and "previous" toward older ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryNavigator {
    /// Sorted newest first, without duplicates.
    dates: Vec<NaiveDate>,
}

impl HistoryNavigator {
    pub fn load(db: &Database) -> Result<Self> {
        Ok(Self::from_dates(workouts::workout_dates(db)?))
    }

    pub fn from_dates(mut dates: Vec<NaiveDate>) -> Self {
        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates.dedup();
        Self { dates }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn latest(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    /// The closest workout date after `current`.
    pub fn next(&self, current: NaiveDate) -> Option<NaiveDate> {
        // Dates before this index are newer than `current`.
        let idx = self.dates.partition_point(|d| *d > current);
        idx.checked_sub(1).map(|i| self.dates[i])
    }

    /// The closest workout date before `current`.
    pub fn previous(&self, current: NaiveDate) -> Option<NaiveDate> {
        let idx = self.dates.partition_point(|d| *d >= current);
        self.dates.get(idx).copied()
    }

    pub fn has_next(&self, current: NaiveDate) -> bool {
        self.next(current).is_some()
    }

    pub fn has_previous(&self, current: NaiveDate) -> bool {
        self.previous(current).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::models::DATE_FORMAT;
    use crate::workouts::SetResult;
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn navigator() -> HistoryNavigator {
        HistoryNavigator::from_dates(vec![
            date("2024-01-03"),
            date("2024-01-01"),
            date("2024-01-05"),
            date("2024-01-03"),
        ])
    }

    #[test]
    fn dates_are_sorted_newest_first() {
        assert_eq!(
            navigator().dates(),
            &[date("2024-01-05"), date("2024-01-03"), date("2024-01-01")]
        );
        assert_eq!(navigator().latest(), Some(date("2024-01-05")));
    }

    #[test]
    fn next_and_previous() {
        let nav = navigator();
        assert!(nav.has_next(date("2024-01-03")));
        assert_eq!(nav.next(date("2024-01-03")), Some(date("2024-01-05")));
        assert_eq!(nav.previous(date("2024-01-03")), Some(date("2024-01-01")));
        assert!(!nav.has_previous(date("2024-01-01")));
        assert!(nav.has_next(date("2024-01-01")));
        assert!(!nav.has_next(date("2024-01-05")));
    }

    #[test]
    fn navigation_from_a_date_without_workout() {
        let nav = navigator();
        assert_eq!(nav.next(date("2024-01-04")), Some(date("2024-01-05")));
        assert_eq!(nav.previous(date("2024-01-04")), Some(date("2024-01-03")));
        assert!(!HistoryNavigator::default().has_next(date("2024-01-04")));
    }

    #[test]
    fn load_day_states_and_summaries() {
        let mut db = Database::open_in_memory().unwrap();
        catalog::seed_with(&mut db, &catalog::bundled().unwrap()).unwrap();
        assert_eq!(HistoryState::default(), HistoryState::Loading);
        assert_eq!(
            load_day(&db, date("2024-01-01")),
            HistoryState::NotFound(date("2024-01-01"))
        );

        let day = workouts::get_or_create_day(&mut db, date("2024-01-01")).unwrap();
        let first = workouts::entries_for_day(&db, day.id).unwrap()[0].clone();
        workouts::ensure_sets(&mut db, first.id).unwrap();
        for n in 1..=first.sets {
            workouts::complete_set(
                &mut db,
                first.id,
                n,
                SetResult {
                    reps: 8,
                    weight: 135.0,
                    elapsed_seconds: 45,
                },
                Utc::now(),
            )
            .unwrap();
        }
        workouts::get_or_create_day(&mut db, date("2024-01-07")).unwrap();

        match load_day(&db, date("2024-01-01")) {
            HistoryState::Loaded { detail, summary } => {
                assert_eq!(detail.entries.len(), 6);
                assert_eq!(summary.completed_exercises, 1);
                assert!((summary.completion_percent - 100.0 / 6.0).abs() < 1e-9);
                assert_eq!(summary.total_time_seconds, 45 * first.sets as u64);
            }
            other => panic!("unexpected state: {other:?}"),
        }

        let all = summaries(&db).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].date, date("2024-01-07"));
        assert_eq!(all[0].total_exercises, 0);
        assert_eq!(all[0].completion_percent, 0.0);

        let nav = HistoryNavigator::load(&db).unwrap();
        assert_eq!(nav.next(date("2024-01-01")), Some(date("2024-01-07")));
    }

    #[test]
    fn load_errors_become_messages() {
        let db = Database::open_in_memory().unwrap();
        db.conn().execute_batch("DROP TABLE set_entries; DROP TABLE workout_entries").unwrap();
        db.conn()
            .execute("INSERT INTO workout_days (date) VALUES ('2024-01-01')", [])
            .unwrap();
        match load_day(&db, date("2024-01-01")) {
            HistoryState::Error(msg) => assert!(msg.contains("2024-01-01")),
            other => panic!("unexpected state: {other:?}"),
        }
    }
}
