//! Exercise catalog: seed data and exercise lookups.

use rusqlite::{Connection, OptionalExtension, Row, named_params};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{
    Category, Difficulty, Equipment, Exercise, NewExercise, join_list, split_list,
};
use crate::store::Database;
use crate::templates::{self, NewTemplate, TemplateSlot};
use crate::watch::Table;

const SEED_JSON: &str = include_str!("../data/catalog.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCatalog {
    pub exercises: Vec<NewExercise>,
    pub templates: Vec<SeedTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedTemplate {
    pub name: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub exercises: Vec<SeedSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedSlot {
    pub exercise: String,
    pub sets: u32,
    pub reps: u32,
    #[serde(default = "default_rest_seconds")]
    pub rest_seconds: u32,
}

fn default_rest_seconds() -> u32 {
    90
}

/// Parse the catalog bundled with the crate.
pub fn bundled() -> Result<SeedCatalog> {
    Ok(serde_json::from_str(SEED_JSON)?)
}

/// Populate an empty database with the bundled catalog.
///
/// Failures are logged and swallowed; the tracker keeps working with
/// whatever rows already exist.
pub fn seed(db: &mut Database) {
    match bundled().and_then(|catalog| seed_with(db, &catalog)) {
        Ok(0) => log::debug!("Catalog already present, skipping seed"),
        Ok(n) => log::info!("Seeded {n} catalog records"),
        Err(e) => log::error!("Failed to seed exercise catalog: {e}"),
    }
}

/// Insert the exercises of `catalog` if the exercise table is empty and its
/// templates if the template table is empty, all in one transaction.
/// Returns how many exercises and templates were inserted.
pub fn seed_with(db: &mut Database, catalog: &SeedCatalog) -> Result<usize> {
    let touched = [
        Table::Exercises,
        Table::WorkoutTemplates,
        Table::TemplateExercises,
    ];
    db.write(&touched, |tx| {
        let count = |table: &str| -> Result<i64> {
            Ok(tx.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?)
        };
        let mut inserted = 0;

        if count("exercises")? == 0 {
            for exercise in &catalog.exercises {
                insert_exercise_row(tx, exercise)?;
            }
            inserted += catalog.exercises.len();
        }

        if count("workout_templates")? == 0 {
            for template in &catalog.templates {
                let mut slots = Vec::with_capacity(template.exercises.len());
                for slot in &template.exercises {
                    slots.push(TemplateSlot {
                        exercise_id: exercise_id_by_name(tx, &slot.exercise)?,
                        sets: slot.sets,
                        reps: slot.reps,
                        rest_seconds: slot.rest_seconds,
                    });
                }
                templates::insert_template(
                    tx,
                    &NewTemplate {
                        name: template.name.clone(),
                        category: template.category,
                        difficulty: template.difficulty,
                        is_custom: false,
                        exercises: slots,
                    },
                )?;
            }
            inserted += catalog.templates.len();
        }

        Ok(inserted)
    })
}

fn exercise_id_by_name(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM exercises WHERE name = ?1 COLLATE NOCASE",
        [name.trim()],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| Error::ExerciseNotFound(name.to_string()))
}

const EXERCISE_COLUMNS: &str = "id, name, is_compound, primary_muscles, secondary_muscles, \
     equipment, instructions, difficulty, category, force, mechanic, tips, common_mistakes, video_url";

fn map_row_to_exercise(row: &Row) -> rusqlite::Result<Exercise> {
    let primary: String = row.get(3)?;
    let secondary: String = row.get(4)?;
    let equipment: String = row.get(5)?;
    let difficulty: String = row.get(7)?;
    Ok(Exercise {
        id: row.get(0)?,
        name: row.get(1)?,
        is_compound: row.get(2)?,
        primary_muscles: split_list(&primary),
        secondary_muscles: split_list(&secondary),
        equipment: Equipment::parse(&equipment),
        instructions: row.get(6)?,
        difficulty: Difficulty::parse(&difficulty),
        category: row.get(8)?,
        force: row.get(9)?,
        mechanic: row.get(10)?,
        tips: row.get(11)?,
        common_mistakes: row.get(12)?,
        video_url: row.get(13)?,
    })
}

pub fn insert_exercise(db: &mut Database, exercise: &NewExercise) -> Result<i64> {
    db.write(&[Table::Exercises], |tx| insert_exercise_row(tx, exercise))
}

fn insert_exercise_row(conn: &Connection, exercise: &NewExercise) -> Result<i64> {
    conn.execute(
        "INSERT INTO exercises (name, is_compound, primary_muscles, secondary_muscles,
             equipment, instructions, difficulty, category, force, mechanic, tips,
             common_mistakes, video_url)
         VALUES (:name, :compound, :primary, :secondary, :equipment, :instructions,
             :difficulty, :category, :force, :mechanic, :tips, :mistakes, :video)",
        named_params! {
            ":name": exercise.name.trim(),
            ":compound": exercise.is_compound,
            ":primary": join_list(&exercise.primary_muscles),
            ":secondary": join_list(&exercise.secondary_muscles),
            ":equipment": exercise.equipment.as_str(),
            ":instructions": exercise.instructions,
            ":difficulty": exercise.difficulty.map(Difficulty::as_str).unwrap_or(""),
            ":category": exercise.category,
            ":force": exercise.force,
            ":mechanic": exercise.mechanic,
            ":tips": exercise.tips,
            ":mistakes": exercise.common_mistakes,
            ":video": exercise.video_url,
        },
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_exercises(db: &Database) -> Result<Vec<Exercise>> {
    let mut stmt = db.conn().prepare(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises ORDER BY name COLLATE NOCASE"
    ))?;
    let rows = stmt.query_map([], map_row_to_exercise)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn exercise_by_id(db: &Database, id: i64) -> Result<Exercise> {
    db.conn()
        .query_row(
            &format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = ?1"),
            [id],
            map_row_to_exercise,
        )
        .optional()?
        .ok_or_else(|| Error::ExerciseNotFound(format!("ID {id}")))
}

/// Look up an exercise by exact (case-insensitive) name.
///
/// On a miss the error names the closest catalog entry when one is
/// reasonably similar.
pub fn find_exercise(db: &Database, name: &str) -> Result<Exercise> {
    let found = db
        .conn()
        .query_row(
            &format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE name = ?1 COLLATE NOCASE"),
            [name.trim()],
            map_row_to_exercise,
        )
        .optional()?;
    match found {
        Some(exercise) => Ok(exercise),
        None => {
            let names: Vec<String> = list_exercises(db)?.into_iter().map(|e| e.name).collect();
            Err(Error::ExerciseNotFound(match closest_name(name, &names) {
                Some(best) => format!("{name} (did you mean '{best}'?)"),
                None => name.to_string(),
            }))
        }
    }
}

/// Exercises whose name or muscle lists contain `query`.
pub fn search_exercises(db: &Database, query: &str) -> Result<Vec<Exercise>> {
    let pattern = format!("%{}%", query.trim());
    let mut stmt = db.conn().prepare(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises
         WHERE name LIKE ?1 OR primary_muscles LIKE ?1 OR secondary_muscles LIKE ?1
         ORDER BY name COLLATE NOCASE"
    ))?;
    let rows = stmt.query_map([pattern], map_row_to_exercise)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn closest_name<'a>(query: &str, names: &'a [String]) -> Option<&'a str> {
    let query = query.to_lowercase();
    names
        .iter()
        .map(|n| (n, strsim::jaro_winkler(&query, &n.to_lowercase())))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(n, _)| n.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        let n = seed_with(&mut db, &bundled().unwrap()).unwrap();
        assert!(n > 0);
        db
    }

    #[test]
    fn bundled_catalog_parses_and_templates_reference_known_exercises() {
        let catalog = bundled().unwrap();
        let names: Vec<&str> = catalog.exercises.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(catalog.templates.len(), 6);
        for template in &catalog.templates {
            assert!(!template.exercises.is_empty(), "{} is empty", template.name);
            for slot in &template.exercises {
                assert!(names.contains(&slot.exercise.as_str()), "{}", slot.exercise);
            }
        }
    }

    #[test]
    fn seeding_twice_does_not_duplicate() {
        let mut db = seeded();
        let before = list_exercises(&db).unwrap().len();
        assert_eq!(seed_with(&mut db, &bundled().unwrap()).unwrap(), 0);
        assert_eq!(list_exercises(&db).unwrap().len(), before);
    }

    #[test]
    fn broken_seed_reports_error() {
        let mut db = Database::open_in_memory().unwrap();
        let broken = SeedCatalog {
            exercises: vec![],
            templates: vec![SeedTemplate {
                name: "Broken".into(),
                category: Category::Push,
                difficulty: Difficulty::Beginner,
                exercises: vec![SeedSlot {
                    exercise: "Nope".into(),
                    sets: 3,
                    reps: 10,
                    rest_seconds: 60,
                }],
            }],
        };
        assert!(matches!(
            seed_with(&mut db, &broken),
            Err(Error::ExerciseNotFound(_))
        ));
    }

    #[test]
    fn failed_seed_leaves_no_partial_catalog() {
        let mut db = Database::open_in_memory().unwrap();
        db.conn()
            .execute_batch("DROP TABLE template_exercises")
            .unwrap();

        seed(&mut db);

        assert!(list_exercises(&db).unwrap().is_empty());
        assert!(templates::list_templates(&db).unwrap().is_empty());
    }

    #[test]
    fn missing_templates_are_seeded_on_next_run() {
        let mut db = seeded();
        let exercises = list_exercises(&db).unwrap().len();
        db.conn()
            .execute_batch("DELETE FROM workout_templates")
            .unwrap();

        assert_eq!(seed_with(&mut db, &bundled().unwrap()).unwrap(), 6);

        assert_eq!(list_exercises(&db).unwrap().len(), exercises);
        let push = templates::template_by_name(&db, "Push 1").unwrap().unwrap();
        let slots = templates::template_exercises(&db, push.id).unwrap();
        assert_eq!(slots[0].exercise_name, "Barbell Bench Press");
    }

    #[test]
    fn metadata_round_trips() {
        let mut db = Database::open_in_memory().unwrap();
        let id = insert_exercise(
            &mut db,
            &NewExercise {
                name: "Cable Crunch".into(),
                primary_muscles: vec!["abs".into()],
                secondary_muscles: vec!["obliques".into()],
                equipment: Equipment::Cable,
                difficulty: Some(Difficulty::Beginner),
                tips: "Round the spine".into(),
                video_url: "https://example.com/crunch".into(),
                ..Default::default()
            },
        )
        .unwrap();

        let ex = exercise_by_id(&db, id).unwrap();
        assert_eq!(ex.name, "Cable Crunch");
        assert!(!ex.is_compound);
        assert_eq!(ex.primary_muscles, vec!["abs"]);
        assert_eq!(ex.secondary_muscles, vec!["obliques"]);
        assert_eq!(ex.equipment, Equipment::Cable);
        assert_eq!(ex.difficulty, Some(Difficulty::Beginner));
        assert_eq!(ex.tips, "Round the spine");
        assert_eq!(ex.video_url, "https://example.com/crunch");
    }

    #[test]
    fn find_is_case_insensitive_and_suggests_on_miss() {
        let db = seeded();
        assert_eq!(
            find_exercise(&db, "barbell bench press").unwrap().name,
            "Barbell Bench Press"
        );
        match find_exercise(&db, "Barbell Bench Pres") {
            Err(Error::ExerciseNotFound(msg)) => {
                assert!(msg.contains("did you mean 'Barbell Bench Press'"), "{msg}")
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            exercise_by_id(&db, 10_000),
            Err(Error::ExerciseNotFound(_))
        ));
    }

    #[test]
    fn search_matches_muscles() {
        let db = seeded();
        let hits = search_exercises(&db, "hamstrings").unwrap();
        assert!(hits.iter().any(|e| e.name == "Romanian Deadlift"));
        assert!(hits.iter().all(|e| {
            e.primary_muscles.iter().chain(&e.secondary_muscles).any(|m| m.contains("hamstrings"))
                || e.name.to_lowercase().contains("hamstrings")
        }));
    }
}
