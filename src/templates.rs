//! Workout templates and their ordered exercise lists.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{Error, Result};
use crate::models::{Category, Difficulty, TemplateExercise, WorkoutTemplate};
use crate::store::Database;
use crate::watch::Table;

/// One exercise placement in a template being created.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSlot {
    pub exercise_id: i64,
    pub sets: u32,
    pub reps: u32,
    pub rest_seconds: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplate {
    pub name: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub is_custom: bool,
    /// Stored in this order.
    pub exercises: Vec<TemplateSlot>,
}

fn map_row_to_template(row: &Row) -> rusqlite::Result<WorkoutTemplate> {
    let category: String = row.get(2)?;
    let difficulty: String = row.get(3)?;
    let category = Category::parse(&category).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("invalid category '{category}'").into(),
        )
    })?;
    Ok(WorkoutTemplate {
        id: row.get(0)?,
        name: row.get(1)?,
        category,
        difficulty: Difficulty::parse(&difficulty).unwrap_or(Difficulty::Intermediate),
        is_custom: row.get(4)?,
    })
}

/// Insert a template and its exercises atomically.
pub fn create_template(db: &mut Database, template: &NewTemplate) -> Result<i64> {
    db.write(&[Table::WorkoutTemplates, Table::TemplateExercises], |tx| {
        insert_template(tx, template)
    })
}

/// Validate and insert a template inside the caller's transaction.
pub(crate) fn insert_template(conn: &Connection, template: &NewTemplate) -> Result<i64> {
    let name = template.name.trim();
    if name.is_empty() {
        return Err(Error::Invalid("template name must not be empty".into()));
    }
    if query_template_by_name(conn, name)?.is_some() {
        return Err(Error::TemplateNameNotUnique(name.to_string()));
    }
    if let Some(slot) = template.exercises.iter().find(|s| s.sets == 0) {
        return Err(Error::Invalid(format!(
            "exercise {} needs at least one set",
            slot.exercise_id
        )));
    }

    conn.execute(
        "INSERT INTO workout_templates (name, category, difficulty, is_custom)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            name,
            template.category.as_str(),
            template.difficulty.as_str(),
            template.is_custom
        ],
    )?;
    let template_id = conn.last_insert_rowid();
    let mut stmt = conn.prepare(
        "INSERT INTO template_exercises
             (template_id, exercise_id, order_index, sets, reps, rest_seconds)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (index, slot) in template.exercises.iter().enumerate() {
        stmt.execute(params![
            template_id,
            slot.exercise_id,
            index as u32,
            slot.sets,
            slot.reps,
            slot.rest_seconds
        ])?;
    }
    Ok(template_id)
}

/// Delete a template; its exercise placements go with it.
pub fn delete_template(db: &mut Database, id: i64) -> Result<()> {
    let removed = db.write(&[Table::WorkoutTemplates, Table::TemplateExercises], |tx| {
        Ok(tx.execute("DELETE FROM workout_templates WHERE id = ?1", [id])?)
    })?;
    if removed == 0 {
        return Err(Error::TemplateNotFound(format!("ID {id}")));
    }
    Ok(())
}

pub fn list_templates(db: &Database) -> Result<Vec<WorkoutTemplate>> {
    let mut stmt = db.conn().prepare(
        "SELECT id, name, category, difficulty, is_custom FROM workout_templates ORDER BY id",
    )?;
    let rows = stmt.query_map([], map_row_to_template)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn template_by_name(db: &Database, name: &str) -> Result<Option<WorkoutTemplate>> {
    query_template_by_name(db.conn(), name)
}

fn query_template_by_name(conn: &Connection, name: &str) -> Result<Option<WorkoutTemplate>> {
    Ok(conn
        .query_row(
            "SELECT id, name, category, difficulty, is_custom FROM workout_templates
             WHERE name = ?1 COLLATE NOCASE",
            [name.trim()],
            map_row_to_template,
        )
        .optional()?)
}

pub fn template_by_id(db: &Database, id: i64) -> Result<WorkoutTemplate> {
    db.conn()
        .query_row(
            "SELECT id, name, category, difficulty, is_custom FROM workout_templates WHERE id = ?1",
            [id],
            map_row_to_template,
        )
        .optional()?
        .ok_or_else(|| Error::TemplateNotFound(format!("ID {id}")))
}

/// Exercises of a template in their stored order.
pub fn template_exercises(db: &Database, template_id: i64) -> Result<Vec<TemplateExercise>> {
    let mut stmt = db.conn().prepare(
        "SELECT te.id, te.template_id, te.exercise_id, e.name, te.order_index, te.sets,
                te.reps, te.rest_seconds
         FROM template_exercises te
         JOIN exercises e ON e.id = te.exercise_id
         WHERE te.template_id = ?1
         ORDER BY te.order_index",
    )?;
    let rows = stmt.query_map([template_id], |row| {
        Ok(TemplateExercise {
            id: row.get(0)?,
            template_id: row.get(1)?,
            exercise_id: row.get(2)?,
            exercise_name: row.get(3)?,
            order_index: row.get(4)?,
            sets: row.get(5)?,
            reps: row.get(6)?,
            rest_seconds: row.get(7)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    fn seeded() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        catalog::seed_with(&mut db, &catalog::bundled().unwrap()).unwrap();
        db
    }

    #[test]
    fn seeded_templates_cover_every_plan_day() {
        let db = seeded();
        let names: Vec<String> = list_templates(&db)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(
            names,
            vec!["Push 1", "Pull 1", "Legs 1", "Push 2", "Pull 2", "Legs 2"]
        );

        let push = template_by_name(&db, "push 1").unwrap().unwrap();
        assert_eq!(push.category, Category::Push);
        assert!(!push.is_custom);
        let exercises = template_exercises(&db, push.id).unwrap();
        assert_eq!(exercises[0].exercise_name, "Barbell Bench Press");
        assert_eq!(exercises[0].sets, 4);
        assert_eq!(exercises[0].rest_seconds, 120);
        assert!(exercises.windows(2).all(|w| w[0].order_index < w[1].order_index));
    }

    #[test]
    fn custom_template_keeps_order_and_cascades_on_delete() {
        let mut db = seeded();
        let curl = catalog::find_exercise(&db, "Barbell Curl").unwrap();
        let row = catalog::find_exercise(&db, "Barbell Row").unwrap();

        let id = create_template(
            &mut db,
            &NewTemplate {
                name: "Arms & Back".into(),
                category: Category::Pull,
                difficulty: Difficulty::Beginner,
                is_custom: true,
                exercises: vec![
                    TemplateSlot {
                        exercise_id: row.id,
                        sets: 3,
                        reps: 8,
                        rest_seconds: 120,
                    },
                    TemplateSlot {
                        exercise_id: curl.id,
                        sets: 2,
                        reps: 12,
                        rest_seconds: 45,
                    },
                ],
            },
        )
        .unwrap();

        let names: Vec<String> = template_exercises(&db, id)
            .unwrap()
            .into_iter()
            .map(|e| e.exercise_name)
            .collect();
        assert_eq!(names, vec!["Barbell Row", "Barbell Curl"]);
        assert!(template_by_id(&db, id).unwrap().is_custom);

        delete_template(&mut db, id).unwrap();
        let orphans: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM template_exercises WHERE template_id = ?1",
                [id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
        assert!(matches!(
            delete_template(&mut db, id),
            Err(Error::TemplateNotFound(_))
        ));
    }

    #[test]
    fn duplicate_and_empty_names_are_rejected() {
        let mut db = seeded();
        let template = NewTemplate {
            name: "PUSH 1".into(),
            category: Category::Push,
            difficulty: Difficulty::Advanced,
            is_custom: true,
            exercises: vec![],
        };
        assert!(matches!(
            create_template(&mut db, &template),
            Err(Error::TemplateNameNotUnique(_))
        ));
        let blank = NewTemplate {
            name: "  ".into(),
            ..template
        };
        assert!(matches!(
            create_template(&mut db, &blank),
            Err(Error::Invalid(_))
        ));
    }
}
