//! Workout days, their entries and per-set records.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{DATE_FORMAT, SetEntry, WorkoutDay, WorkoutEntry};
use crate::schedule::DayPlan;
use crate::store::Database;
use crate::templates;
use crate::watch::Table;

/// A day together with its entries in plan order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayDetail {
    pub day: WorkoutDay,
    pub entries: Vec<WorkoutEntry>,
}

/// Performance recorded when a set is completed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetResult {
    pub reps: u32,
    pub weight: f64,
    pub elapsed_seconds: u32,
}

const ENTRY_COLUMNS: &str = "we.id, we.day_id, we.exercise_id, e.name, we.order_index, we.sets, \
     we.reps, we.rest_seconds, we.is_completed, we.total_time_seconds, we.completed_at";

const SET_COLUMNS: &str = "id, entry_id, set_number, is_completed, elapsed_seconds, \
     reps_performed, weight_used, completed_at";

fn map_row_to_day(row: &Row) -> rusqlite::Result<WorkoutDay> {
    let date: String = row.get(1)?;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(WorkoutDay {
        id: row.get(0)?,
        date,
        template_id: row.get(2)?,
    })
}

fn map_row_to_entry(row: &Row) -> rusqlite::Result<WorkoutEntry> {
    Ok(WorkoutEntry {
        id: row.get(0)?,
        day_id: row.get(1)?,
        exercise_id: row.get(2)?,
        exercise_name: row.get(3)?,
        order_index: row.get(4)?,
        sets: row.get(5)?,
        reps: row.get(6)?,
        rest_seconds: row.get(7)?,
        is_completed: row.get(8)?,
        total_time_seconds: row.get(9)?,
        completed_at: row.get(10)?,
    })
}

fn map_row_to_set(row: &Row) -> rusqlite::Result<SetEntry> {
    Ok(SetEntry {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        set_number: row.get(2)?,
        is_completed: row.get(3)?,
        elapsed_seconds: row.get(4)?,
        reps_performed: row.get(5)?,
        weight_used: row.get(6)?,
        completed_at: row.get(7)?,
    })
}

fn query_day(conn: &Connection, date: NaiveDate) -> Result<Option<WorkoutDay>> {
    Ok(conn
        .query_row(
            "SELECT id, date, template_id FROM workout_days WHERE date = ?1",
            [date.format(DATE_FORMAT).to_string()],
            map_row_to_day,
        )
        .optional()?)
}

fn query_sets(conn: &Connection, entry_id: i64) -> Result<Vec<SetEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SET_COLUMNS} FROM set_entries WHERE entry_id = ?1 ORDER BY set_number"
    ))?;
    let rows = stmt.query_map([entry_id], map_row_to_set)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn find_day(db: &Database, date: NaiveDate) -> Result<Option<WorkoutDay>> {
    query_day(db.conn(), date)
}

/// Return the day for `date`, creating it from the weekly plan if needed.
///
/// A new day receives one entry per exercise of the template the plan
/// assigns to its weekday. Rest days, or a plan template that no longer
/// exists, produce a day with no entries. Repeated calls return the same
/// day and never duplicate entries.
pub fn get_or_create_day(db: &mut Database, date: NaiveDate) -> Result<WorkoutDay> {
    if let Some(day) = find_day(db, date)? {
        return Ok(day);
    }
    let plan = DayPlan::for_date(date);
    let template_id = match plan.template_name() {
        Some(name) => match templates::template_by_name(db, name)? {
            Some(t) => Some(t.id),
            None => {
                log::warn!("Template '{name}' for {date} is missing, creating an empty day");
                None
            }
        },
        None => None,
    };
    materialize(db, date, template_id)
}

/// Like [`get_or_create_day`] but uses a user-selected template for a day
/// that does not exist yet. An existing day is returned untouched.
pub fn get_or_create_day_with_template(
    db: &mut Database,
    date: NaiveDate,
    template_id: i64,
) -> Result<WorkoutDay> {
    if let Some(day) = find_day(db, date)? {
        return Ok(day);
    }
    templates::template_by_id(db, template_id)?;
    materialize(db, date, Some(template_id))
}

fn materialize(db: &mut Database, date: NaiveDate, template_id: Option<i64>) -> Result<WorkoutDay> {
    let (day, created) = db.write(&[Table::WorkoutDays, Table::WorkoutEntries], |tx| {
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO workout_days (date, template_id) VALUES (?1, ?2)",
            params![date.format(DATE_FORMAT).to_string(), template_id],
        )?;
        let day = query_day(tx, date)?
            .ok_or_else(|| Error::Invalid(format!("workout day {date} vanished")))?;
        if inserted == 1 {
            if let Some(template_id) = template_id {
                tx.execute(
                    "INSERT INTO workout_entries
                         (day_id, exercise_id, order_index, sets, reps, rest_seconds)
                     SELECT ?1, exercise_id, order_index, sets, reps, rest_seconds
                     FROM template_exercises WHERE template_id = ?2
                     ORDER BY order_index",
                    params![day.id, template_id],
                )?;
            }
        }
        Ok((day, inserted == 1))
    })?;
    if created {
        log::info!("Created workout day {date} ({})", DayPlan::for_date(date).label());
    }
    Ok(day)
}

pub fn entries_for_day(db: &Database, day_id: i64) -> Result<Vec<WorkoutEntry>> {
    let mut stmt = db.conn().prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM workout_entries we
         JOIN exercises e ON e.id = we.exercise_id
         WHERE we.day_id = ?1
         ORDER BY we.order_index, we.id"
    ))?;
    let rows = stmt.query_map([day_id], map_row_to_entry)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn entry(db: &Database, entry_id: i64) -> Result<WorkoutEntry> {
    db.conn()
        .query_row(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM workout_entries we
                 JOIN exercises e ON e.id = we.exercise_id
                 WHERE we.id = ?1"
            ),
            [entry_id],
            map_row_to_entry,
        )
        .optional()?
        .ok_or(Error::EntryNotFound(entry_id))
}

/// The day for `date` with its entries, if that day exists.
pub fn day_detail(db: &Database, date: NaiveDate) -> Result<Option<DayDetail>> {
    match find_day(db, date)? {
        Some(day) => {
            let entries = entries_for_day(db, day.id)?;
            Ok(Some(DayDetail { day, entries }))
        }
        None => Ok(None),
    }
}

pub fn sets_for_entry(db: &Database, entry_id: i64) -> Result<Vec<SetEntry>> {
    query_sets(db.conn(), entry_id)
}

/// Return the entry's sets, creating `sets` pending rows the first time the
/// entry is opened.
pub fn ensure_sets(db: &mut Database, entry_id: i64) -> Result<Vec<SetEntry>> {
    let existing = sets_for_entry(db, entry_id)?;
    if !existing.is_empty() {
        return Ok(existing);
    }
    let planned = entry(db, entry_id)?.sets;
    db.write(&[Table::SetEntries, Table::WorkoutEntries], |tx| {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO set_entries (entry_id, set_number) VALUES (?1, ?2)",
        )?;
        for set_number in 1..=planned {
            stmt.execute(params![entry_id, set_number])?;
        }
        drop(stmt);
        refresh_entry(tx, entry_id)?;
        query_sets(tx, entry_id)
    })
}

/// Mark a set completed with the given performance.
pub fn complete_set(
    db: &mut Database,
    entry_id: i64,
    set_number: u32,
    result: SetResult,
    completed_at: DateTime<Utc>,
) -> Result<SetEntry> {
    if !result.weight.is_finite() || result.weight < 0.0 {
        return Err(Error::Invalid(format!("weight {} is not valid", result.weight)));
    }
    update_set(db, entry_id, set_number, |tx| {
        tx.execute(
            "UPDATE set_entries
             SET is_completed = 1, elapsed_seconds = ?3, reps_performed = ?4,
                 weight_used = ?5, completed_at = ?6
             WHERE entry_id = ?1 AND set_number = ?2",
            params![
                entry_id,
                set_number,
                result.elapsed_seconds,
                result.reps,
                result.weight,
                completed_at.timestamp_millis()
            ],
        )
    })
}

/// Return a set to pending, clearing its recorded performance.
pub fn reset_set(db: &mut Database, entry_id: i64, set_number: u32) -> Result<SetEntry> {
    update_set(db, entry_id, set_number, |tx| {
        tx.execute(
            "UPDATE set_entries
             SET is_completed = 0, elapsed_seconds = 0, reps_performed = 0,
                 weight_used = 0, completed_at = NULL
             WHERE entry_id = ?1 AND set_number = ?2",
            params![entry_id, set_number],
        )
    })
}

/// Change the reps and weight of a set without touching its state.
pub fn edit_set(
    db: &mut Database,
    entry_id: i64,
    set_number: u32,
    reps: u32,
    weight: f64,
) -> Result<SetEntry> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(Error::Invalid(format!("weight {weight} is not valid")));
    }
    update_set(db, entry_id, set_number, |tx| {
        tx.execute(
            "UPDATE set_entries SET reps_performed = ?3, weight_used = ?4
             WHERE entry_id = ?1 AND set_number = ?2",
            params![entry_id, set_number, reps, weight],
        )
    })
}

fn update_set(
    db: &mut Database,
    entry_id: i64,
    set_number: u32,
    update: impl FnOnce(&Connection) -> rusqlite::Result<usize>,
) -> Result<SetEntry> {
    db.write(&[Table::SetEntries, Table::WorkoutEntries], |tx| {
        if update(&**tx)? == 0 {
            return Err(Error::SetNotFound {
                entry_id,
                set_number,
            });
        }
        refresh_entry(tx, entry_id)?;
        let set = tx.query_row(
            &format!("SELECT {SET_COLUMNS} FROM set_entries WHERE entry_id = ?1 AND set_number = ?2"),
            params![entry_id, set_number],
            map_row_to_set,
        )?;
        Ok(set)
    })
}

/// Recompute an entry's completion flag, total time and completion time
/// from its sets. An entry is completed iff it has sets and all of them
/// are completed.
fn refresh_entry(conn: &Connection, entry_id: i64) -> Result<()> {
    let (total, done, elapsed, last): (i64, i64, i64, Option<i64>) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(is_completed), 0), COALESCE(SUM(elapsed_seconds), 0),
                MAX(completed_at)
         FROM set_entries WHERE entry_id = ?1",
        [entry_id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;
    let completed = total > 0 && done == total;
    conn.execute(
        "UPDATE workout_entries SET is_completed = ?2, total_time_seconds = ?3, completed_at = ?4
         WHERE id = ?1",
        params![
            entry_id,
            completed,
            elapsed,
            if completed { last } else { None }
        ],
    )?;
    Ok(())
}

/// All workout dates, newest first.
pub fn workout_dates(db: &Database) -> Result<Vec<NaiveDate>> {
    let mut stmt = db
        .conn()
        .prepare("SELECT DISTINCT date FROM workout_days ORDER BY date DESC")?;
    let rows = stmt.query_map([], |row| {
        let date: String = row.get(0)?;
        NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
