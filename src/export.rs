use std::io::Write;

use serde::Serialize;

use crate::analysis::ExercisePerformance;
use crate::error::Result;
use crate::history::DaySummary;
use crate::models::WorkoutEntry;

pub fn write_json<T: Serialize + ?Sized>(writer: impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

pub fn write_csv<T: Serialize>(writer: impl Write, records: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Flat CSV form of [`ExercisePerformance`] without the progress series.
#[derive(Debug, Serialize)]
struct PerformanceRow<'a> {
    exercise: &'a str,
    sessions: usize,
    max_weight: f64,
    max_reps: u32,
    total_volume: f64,
    volume_progress: f64,
    weight_progress: f64,
    last_performed: Option<String>,
    error: bool,
}

pub fn write_performance_csv(writer: impl Write, results: &[ExercisePerformance]) -> Result<()> {
    let rows: Vec<PerformanceRow> = results
        .iter()
        .map(|p| PerformanceRow {
            exercise: &p.exercise_name,
            sessions: p.sessions_count,
            max_weight: p.max_weight,
            max_reps: p.max_reps,
            total_volume: p.total_volume,
            volume_progress: p.volume_progress,
            weight_progress: p.weight_progress,
            last_performed: p.last_performed.map(|d| d.to_string()),
            error: p.has_error,
        })
        .collect();
    write_csv(writer, &rows)
}

pub fn write_history_csv(writer: impl Write, days: &[DaySummary]) -> Result<()> {
    write_csv(writer, days)
}

#[derive(Debug, Serialize)]
struct EntryRow<'a> {
    id: i64,
    exercise: &'a str,
    sets: u32,
    reps: u32,
    rest_seconds: u32,
    completed: bool,
    total_time_seconds: u32,
}

pub fn write_entries_csv(writer: impl Write, entries: &[WorkoutEntry]) -> Result<()> {
    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            id: e.id,
            exercise: &e.exercise_name,
            sets: e.sets,
            reps: e.reps,
            rest_seconds: e.rest_seconds,
            completed: e.is_completed,
            total_time_seconds: e.total_time_seconds,
        })
        .collect();
    write_csv(writer, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn performance_csv_has_header_and_rows() {
        let mut perf = ExercisePerformance::empty(1, "Deadlift");
        perf.sessions_count = 2;
        perf.max_weight = 315.0;
        perf.max_reps = 5;
        perf.last_performed = NaiveDate::from_ymd_opt(2024, 1, 2);
        let mut out = Vec::new();
        write_performance_csv(&mut out, &[perf]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "exercise,sessions,max_weight,max_reps,total_volume,volume_progress,weight_progress,last_performed,error"
        );
        assert_eq!(lines.next().unwrap(), "Deadlift,2,315.0,5,0.0,0.0,0.0,2024-01-02,false");
    }

    #[test]
    fn history_csv_serializes_dates() {
        let day = DaySummary {
            date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            total_exercises: 5,
            completed_exercises: 5,
            completion_percent: 100.0,
            total_time_seconds: 1800,
        };
        let mut out = Vec::new();
        write_history_csv(&mut out, &[day]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("2024-01-03,5,5,100.0,1800"), "{text}");
    }

    #[test]
    fn json_is_pretty_printed() {
        let mut out = Vec::new();
        write_json(&mut out, &ExercisePerformance::empty(4, "Leg Press")).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\n  \"exercise_name\": \"Leg Press\""));
    }
}
