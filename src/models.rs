//! Persisted entities and the small enums stored alongside them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Storage format for workout day dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Movement category of a template day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Push,
    Pull,
    Legs,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Push => "push",
            Category::Pull => "pull",
            Category::Legs => "legs",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "push" => Some(Category::Push),
            "pull" => Some(Category::Pull),
            "legs" => Some(Category::Legs),
            _ => None,
        }
    }
}

/// General difficulty level for an exercise or template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "beginner" => Some(Difficulty::Beginner),
            "intermediate" => Some(Difficulty::Intermediate),
            "advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

/// Typical equipment used for an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Equipment {
    Barbell,
    Dumbbell,
    Machine,
    Cable,
    Bodyweight,
    #[default]
    Other,
}

impl Equipment {
    pub fn as_str(self) -> &'static str {
        match self {
            Equipment::Barbell => "barbell",
            Equipment::Dumbbell => "dumbbell",
            Equipment::Machine => "machine",
            Equipment::Cable => "cable",
            Equipment::Bodyweight => "bodyweight",
            Equipment::Other => "other",
        }
    }

    /// Unknown values map to [`Equipment::Other`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "barbell" => Equipment::Barbell,
            "dumbbell" => Equipment::Dumbbell,
            "machine" => Equipment::Machine,
            "cable" => Equipment::Cable,
            "bodyweight" => Equipment::Bodyweight,
            _ => Equipment::Other,
        }
    }
}

/// Unit used when displaying weights. Values are stored as entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightUnit {
    #[default]
    Lbs,
    Kg,
}

impl WeightUnit {
    pub fn label(self) -> &'static str {
        match self {
            WeightUnit::Lbs => "lbs",
            WeightUnit::Kg => "kg",
        }
    }
}

/// A movement in the exercise catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub is_compound: bool,
    pub primary_muscles: Vec<String>,
    pub secondary_muscles: Vec<String>,
    pub equipment: Equipment,
    pub instructions: String,
    pub difficulty: Option<Difficulty>,
    pub category: String,
    pub force: String,
    pub mechanic: String,
    pub tips: String,
    pub common_mistakes: String,
    pub video_url: String,
}

/// Fields required to insert an exercise. Also the shape of seed records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewExercise {
    pub name: String,
    pub is_compound: bool,
    pub primary_muscles: Vec<String>,
    pub secondary_muscles: Vec<String>,
    pub equipment: Equipment,
    pub instructions: String,
    pub difficulty: Option<Difficulty>,
    pub category: String,
    pub force: String,
    pub mechanic: String,
    pub tips: String,
    pub common_mistakes: String,
    pub video_url: String,
}

/// A reusable day plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTemplate {
    pub id: i64,
    pub name: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub is_custom: bool,
}

/// Placement of an exercise within a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateExercise {
    pub id: i64,
    pub template_id: i64,
    pub exercise_id: i64,
    pub exercise_name: String,
    pub order_index: u32,
    pub sets: u32,
    pub reps: u32,
    pub rest_seconds: u32,
}

/// One calendar day's workout instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutDay {
    pub id: i64,
    pub date: NaiveDate,
    pub template_id: Option<i64>,
}

/// One exercise instance within a [`WorkoutDay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutEntry {
    pub id: i64,
    pub day_id: i64,
    pub exercise_id: i64,
    pub exercise_name: String,
    pub order_index: u32,
    pub sets: u32,
    pub reps: u32,
    pub rest_seconds: u32,
    pub is_completed: bool,
    pub total_time_seconds: u32,
    /// Epoch milliseconds.
    pub completed_at: Option<i64>,
}

/// One set within a [`WorkoutEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetEntry {
    pub id: i64,
    pub entry_id: i64,
    pub set_number: u32,
    pub is_completed: bool,
    pub elapsed_seconds: u32,
    pub reps_performed: u32,
    pub weight_used: f64,
    /// Epoch milliseconds.
    pub completed_at: Option<i64>,
}

/// Split a comma separated muscle column into names.
pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn join_list(values: &[String]) -> String {
    values.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muscle_lists_skip_blanks() {
        assert_eq!(
            split_list("chest, triceps,,shoulders "),
            vec!["chest", "triceps", "shoulders"]
        );
        assert!(split_list("").is_empty());
        assert_eq!(join_list(&["lats".into(), "biceps".into()]), "lats,biceps");
    }

    #[test]
    fn enum_text_forms_parse_back() {
        assert_eq!(Category::parse("PUSH"), Some(Category::Push));
        assert_eq!(Category::parse("arms"), None);
        assert_eq!(Difficulty::parse(" advanced"), Some(Difficulty::Advanced));
        assert_eq!(Equipment::parse("Cable"), Equipment::Cable);
        assert_eq!(Equipment::parse("kettlebell"), Equipment::Other);
    }
}
