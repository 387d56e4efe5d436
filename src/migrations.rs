//! Schema creation and additive upgrades keyed on `PRAGMA user_version`.

use rusqlite::{Connection, Transaction};

use crate::error::{Error, Result};

/// Latest schema version this crate knows how to open.
pub const SCHEMA_VERSION: i64 = 2;

const BASE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS exercises (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE COLLATE NOCASE,
        is_compound INTEGER NOT NULL DEFAULT 0,
        primary_muscles TEXT NOT NULL DEFAULT '',
        secondary_muscles TEXT NOT NULL DEFAULT '',
        equipment TEXT NOT NULL DEFAULT 'other',
        instructions TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS workout_templates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE COLLATE NOCASE,
        category TEXT NOT NULL CHECK(category IN ('push', 'pull', 'legs')),
        difficulty TEXT NOT NULL,
        is_custom INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS template_exercises (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        template_id INTEGER NOT NULL REFERENCES workout_templates(id) ON DELETE CASCADE,
        exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
        order_index INTEGER NOT NULL,
        sets INTEGER NOT NULL,
        reps INTEGER NOT NULL,
        rest_seconds INTEGER NOT NULL DEFAULT 90
    );

    CREATE TABLE IF NOT EXISTS workout_days (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL UNIQUE,
        template_id INTEGER REFERENCES workout_templates(id) ON DELETE SET NULL
    );

    CREATE TABLE IF NOT EXISTS workout_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        day_id INTEGER NOT NULL REFERENCES workout_days(id) ON DELETE CASCADE,
        exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
        order_index INTEGER NOT NULL,
        sets INTEGER NOT NULL,
        reps INTEGER NOT NULL,
        rest_seconds INTEGER NOT NULL DEFAULT 90,
        is_completed INTEGER NOT NULL DEFAULT 0,
        total_time_seconds INTEGER NOT NULL DEFAULT 0,
        completed_at INTEGER
    );

    CREATE TABLE IF NOT EXISTS set_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        entry_id INTEGER NOT NULL REFERENCES workout_entries(id) ON DELETE CASCADE,
        set_number INTEGER NOT NULL,
        is_completed INTEGER NOT NULL DEFAULT 0,
        elapsed_seconds INTEGER NOT NULL DEFAULT 0,
        reps_performed INTEGER NOT NULL DEFAULT 0,
        weight_used REAL NOT NULL DEFAULT 0,
        completed_at INTEGER,
        UNIQUE(entry_id, set_number)
    );

    CREATE INDEX IF NOT EXISTS idx_template_exercises_template ON template_exercises(template_id);
    CREATE INDEX IF NOT EXISTS idx_workout_entries_day ON workout_entries(day_id);
    CREATE INDEX IF NOT EXISTS idx_workout_entries_exercise ON workout_entries(exercise_id);
    CREATE INDEX IF NOT EXISTS idx_set_entries_entry ON set_entries(entry_id);
    CREATE INDEX IF NOT EXISTS idx_set_entries_completed_at ON set_entries(completed_at);
";

/// Metadata columns added to `exercises` in version 2.
const EXERCISE_METADATA_COLUMNS: [(&str, &str); 7] = [
    ("difficulty", "TEXT NOT NULL DEFAULT ''"),
    ("category", "TEXT NOT NULL DEFAULT ''"),
    ("force", "TEXT NOT NULL DEFAULT ''"),
    ("mechanic", "TEXT NOT NULL DEFAULT ''"),
    ("tips", "TEXT NOT NULL DEFAULT ''"),
    ("common_mistakes", "TEXT NOT NULL DEFAULT ''"),
    ("video_url", "TEXT NOT NULL DEFAULT ''"),
];

pub fn user_version(conn: &Connection) -> Result<i64> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Bring the schema up to [`SCHEMA_VERSION`].
///
/// Every step is additive and the whole upgrade runs in one transaction.
/// A database written by a newer version is refused rather than rebuilt, so
/// existing rows are never dropped.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let current = user_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(Error::UnsupportedSchema {
            found: current,
            supported: SCHEMA_VERSION,
        });
    }
    if current == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for version in (current + 1)..=SCHEMA_VERSION {
        log::info!("Migrating database schema to version {version}");
        match version {
            1 => tx.execute_batch(BASE_SCHEMA)?,
            2 => add_exercise_metadata_columns(&tx)?,
            _ => unreachable!("no migration registered for version {version}"),
        }
        tx.pragma_update(None, "user_version", version)?;
    }
    tx.commit()?;
    Ok(())
}

fn column_exists(tx: &Transaction<'_>, table: &str, column: &str) -> Result<bool> {
    let mut stmt = tx.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn add_exercise_metadata_columns(tx: &Transaction<'_>) -> Result<()> {
    for (column, decl) in EXERCISE_METADATA_COLUMNS {
        if !column_exists(tx, "exercises", column)? {
            log::debug!("Adding '{column}' column to exercises table");
            tx.execute(
                &format!("ALTER TABLE exercises ADD COLUMN {column} {decl}"),
                [],
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_latest_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(user_version(&conn).unwrap(), SCHEMA_VERSION);

        // Running again is a no-op.
        migrate(&mut conn).unwrap();
        assert_eq!(user_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn version_one_rows_survive_upgrade() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(BASE_SCHEMA).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();
        conn.execute(
            "INSERT INTO exercises (name, is_compound) VALUES ('Barbell Row', 1)",
            [],
        )
        .unwrap();

        migrate(&mut conn).unwrap();

        let (name, tips, video): (String, String, String) = conn
            .query_row(
                "SELECT name, tips, video_url FROM exercises WHERE name = 'Barbell Row'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(name, "Barbell Row");
        assert_eq!(tips, "");
        assert_eq!(video, "");
        assert_eq!(user_version(&conn).unwrap(), 2);
    }

    #[test]
    fn newer_schema_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        match migrate(&mut conn) {
            Err(Error::UnsupportedSchema { found, supported }) => {
                assert_eq!(found, SCHEMA_VERSION + 1);
                assert_eq!(supported, SCHEMA_VERSION);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
