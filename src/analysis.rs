// Module for analyzing recorded set performance
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog;
use crate::error::{Error, Result};
use crate::store::Database;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Share of points averaged at each end of a long series.
const TREND_SAMPLE_FRACTION: f64 = 0.3;

/// A completed set as read for analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletedSet {
    pub reps: u32,
    pub weight: f64,
    /// Epoch milliseconds.
    pub completed_at: i64,
}

impl CompletedSet {
    pub fn volume(&self) -> f64 {
        self.weight * self.reps as f64
    }
}

/// Best set of one training day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPoint {
    pub date: NaiveDate,
    pub weight: f64,
    pub reps: u32,
    pub volume: f64,
}

/// Summary of an exercise over a trailing window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExercisePerformance {
    pub exercise_id: i64,
    pub exercise_name: String,
    /// Number of distinct training days.
    pub sessions_count: usize,
    pub max_weight: f64,
    pub max_reps: u32,
    pub total_volume: f64,
    /// Percent change of the daily best volume.
    pub volume_progress: f64,
    /// Percent change of the daily best weight.
    pub weight_progress: f64,
    pub last_performed: Option<NaiveDate>,
    pub progress: Vec<ProgressPoint>,
    /// Set when this exercise could not be analyzed.
    pub has_error: bool,
}

impl ExercisePerformance {
    pub fn empty(exercise_id: i64, exercise_name: &str) -> Self {
        Self {
            exercise_id,
            exercise_name: exercise_name.to_string(),
            ..Default::default()
        }
    }

    fn failed(exercise_id: i64, exercise_name: &str) -> Self {
        Self {
            has_error: true,
            ..Self::empty(exercise_id, exercise_name)
        }
    }
}

fn epoch_day_to_date(day: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(day.checked_mul(86_400)?, 0).map(|dt| dt.date_naive())
}

/// Percentage change across a series of values.
///
/// Only positive finite values count. With fewer than two of them the trend
/// is 0. Up to five points compare the last against the first. Longer series
/// compare the average of the last `ceil(30%)` points (at least two) with
/// the average of the first as many. A zero baseline yields 0.
pub fn trend_percent(values: &[f64]) -> f64 {
    let valid: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    let n = valid.len();
    if n < 2 {
        return 0.0;
    }

    let (first, last) = if n <= 5 {
        (valid[0], valid[n - 1])
    } else {
        let sample = ((n as f64 * TREND_SAMPLE_FRACTION).ceil() as usize).max(2);
        let avg = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
        (avg(&valid[..sample]), avg(&valid[n - sample..]))
    };

    if first == 0.0 {
        0.0
    } else {
        (last - first) / first * 100.0
    }
}

/// Build the performance summary for one exercise from its qualifying sets.
pub fn summarize(
    exercise_id: i64,
    exercise_name: &str,
    sets: &[CompletedSet],
) -> Result<ExercisePerformance> {
    if sets.is_empty() {
        return Ok(ExercisePerformance::empty(exercise_id, exercise_name));
    }

    // Day index -> best set of that day by volume.
    let mut best_per_day: BTreeMap<i64, CompletedSet> = BTreeMap::new();
    for set in sets {
        let day = set.completed_at.div_euclid(MILLIS_PER_DAY);
        best_per_day
            .entry(day)
            .and_modify(|best| {
                if set.volume() > best.volume() {
                    *best = *set;
                }
            })
            .or_insert(*set);
    }

    let mut progress = Vec::with_capacity(best_per_day.len());
    for (day, set) in best_per_day {
        let date = epoch_day_to_date(day).ok_or_else(|| {
            Error::Invalid(format!(
                "completion time {} of {exercise_name} is out of range",
                set.completed_at
            ))
        })?;
        progress.push(ProgressPoint {
            date,
            weight: set.weight,
            reps: set.reps,
            volume: set.volume(),
        });
    }

    let max_weight = sets
        .iter()
        .filter(|s| s.reps > 0)
        .map(|s| s.weight)
        .fold(0.0_f64, f64::max);
    let max_reps = sets
        .iter()
        .filter(|s| s.weight > 0.0)
        .map(|s| s.reps)
        .max()
        .unwrap_or(0);
    let total_volume = sets.iter().map(CompletedSet::volume).sum();

    let volumes: Vec<f64> = progress.iter().map(|p| p.volume).collect();
    let weights: Vec<f64> = progress.iter().map(|p| p.weight).collect();

    Ok(ExercisePerformance {
        exercise_id,
        exercise_name: exercise_name.to_string(),
        sessions_count: progress.len(),
        max_weight,
        max_reps,
        total_volume,
        volume_progress: trend_percent(&volumes),
        weight_progress: trend_percent(&weights),
        last_performed: progress.last().map(|p| p.date),
        progress,
        has_error: false,
    })
}

/// Completed sets of an exercise finished at or after `since` (epoch ms).
pub fn completed_sets(db: &Database, exercise_id: i64, since: i64) -> Result<Vec<CompletedSet>> {
    let mut stmt = db.conn().prepare(
        "SELECT s.reps_performed, s.weight_used, s.completed_at
         FROM set_entries s
         JOIN workout_entries we ON we.id = s.entry_id
         WHERE we.exercise_id = ?1
           AND s.is_completed = 1
           AND s.completed_at IS NOT NULL
           AND s.completed_at >= ?2
         ORDER BY s.completed_at",
    )?;
    let rows = stmt.query_map([exercise_id, since], |row| {
        Ok(CompletedSet {
            reps: row.get(0)?,
            weight: row.get(1)?,
            completed_at: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Earliest qualifying completion time. A window reaching past the
/// representable range has no lower bound.
fn window_start(now: DateTime<Utc>, window_days: u32) -> i64 {
    Duration::try_days(window_days as i64)
        .and_then(|window| now.checked_sub_signed(window))
        .map_or(i64::MIN, |start| start.timestamp_millis())
}

/// Performance of one exercise over the last `window_days` days.
pub fn performance(db: &Database, exercise_id: i64, window_days: u32) -> Result<ExercisePerformance> {
    performance_at(db, exercise_id, window_days, Utc::now())
}

pub fn performance_at(
    db: &Database,
    exercise_id: i64,
    window_days: u32,
    now: DateTime<Utc>,
) -> Result<ExercisePerformance> {
    let exercise = catalog::exercise_by_id(db, exercise_id)?;
    let sets = completed_sets(db, exercise_id, window_start(now, window_days))?;
    summarize(exercise.id, &exercise.name, &sets)
}

/// Performance of every exercise with completed sets in the window.
///
/// An exercise that fails to load or summarize is reported as an empty
/// result with `has_error` set; the others are unaffected.
pub fn all_performance(db: &Database, window_days: u32) -> Result<Vec<ExercisePerformance>> {
    all_performance_at(db, window_days, Utc::now())
}

pub fn all_performance_at(
    db: &Database,
    window_days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<ExercisePerformance>> {
    let since = window_start(now, window_days);
    let mut stmt = db.conn().prepare(
        "SELECT DISTINCT e.id, e.name
         FROM set_entries s
         JOIN workout_entries we ON we.id = s.entry_id
         JOIN exercises e ON e.id = we.exercise_id
         WHERE s.is_completed = 1 AND s.completed_at >= ?1
         ORDER BY e.name COLLATE NOCASE",
    )?;
    let exercises = stmt
        .query_map([since], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    log::info!("Computing performance for {} exercises", exercises.len());

    let results = exercises
        .into_iter()
        .map(|(id, name)| {
            completed_sets(db, id, since)
                .and_then(|sets| summarize(id, &name, &sets))
                .unwrap_or_else(|e| {
                    log::error!("Failed to analyze {name}: {e}");
                    ExercisePerformance::failed(id, &name)
                })
        })
        .collect();
    Ok(results)
}
