//! Weekly Push/Pull/Legs plan and date parsing helpers.

use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use phf::phf_map;

use crate::models::{Category, DATE_FORMAT};

/// What a calendar day is assigned in the weekly plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayPlan {
    Push1,
    Pull1,
    Legs1,
    Push2,
    Pull2,
    Legs2,
    Rest,
}

impl DayPlan {
    pub fn for_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayPlan::Push1,
            Weekday::Tue => DayPlan::Pull1,
            Weekday::Wed => DayPlan::Legs1,
            Weekday::Thu => DayPlan::Push2,
            Weekday::Fri => DayPlan::Pull2,
            Weekday::Sat => DayPlan::Legs2,
            Weekday::Sun => DayPlan::Rest,
        }
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self::for_weekday(date.weekday())
    }

    /// Name of the seeded template backing this plan. `None` on rest days.
    pub fn template_name(self) -> Option<&'static str> {
        match self {
            DayPlan::Push1 => Some("Push 1"),
            DayPlan::Pull1 => Some("Pull 1"),
            DayPlan::Legs1 => Some("Legs 1"),
            DayPlan::Push2 => Some("Push 2"),
            DayPlan::Pull2 => Some("Pull 2"),
            DayPlan::Legs2 => Some("Legs 2"),
            DayPlan::Rest => None,
        }
    }

    pub fn category(self) -> Option<Category> {
        match self {
            DayPlan::Push1 | DayPlan::Push2 => Some(Category::Push),
            DayPlan::Pull1 | DayPlan::Pull2 => Some(Category::Pull),
            DayPlan::Legs1 | DayPlan::Legs2 => Some(Category::Legs),
            DayPlan::Rest => None,
        }
    }

    pub fn is_rest(self) -> bool {
        self == DayPlan::Rest
    }

    pub fn label(self) -> &'static str {
        self.template_name().unwrap_or("Rest")
    }
}

static WEEKDAYS: phf::Map<&'static str, Weekday> = phf_map! {
    "monday" => Weekday::Mon,
    "mon" => Weekday::Mon,
    "tuesday" => Weekday::Tue,
    "tue" => Weekday::Tue,
    "wednesday" => Weekday::Wed,
    "wed" => Weekday::Wed,
    "thursday" => Weekday::Thu,
    "thu" => Weekday::Thu,
    "friday" => Weekday::Fri,
    "fri" => Weekday::Fri,
    "saturday" => Weekday::Sat,
    "sat" => Weekday::Sat,
    "sunday" => Weekday::Sun,
    "sun" => Weekday::Sun,
};

/// Parse a weekday name such as `"Monday"` or `"thu"`.
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    WEEKDAYS.get(value.trim().to_lowercase().as_str()).copied()
}

/// Parse `today`, `yesterday`, `tomorrow` or an ISO date relative to `today`.
pub fn parse_date(value: &str, today: NaiveDate) -> Option<NaiveDate> {
    match value.trim().to_lowercase().as_str() {
        "today" => Some(today),
        "yesterday" => Some(today - Duration::days(1)),
        "tomorrow" => Some(today + Duration::days(1)),
        other => NaiveDate::parse_from_str(other, DATE_FORMAT).ok(),
    }
}

/// Like [`parse_date`] but falls back to the current local date when the
/// value cannot be parsed.
pub fn parse_date_or_today(value: &str) -> NaiveDate {
    let today = Local::now().date_naive();
    parse_date(value, today).unwrap_or_else(|| {
        log::warn!("Could not parse date '{value}', using {today}");
        today
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn weekly_plan_is_fixed() {
        // 2024-01-01 was a Monday.
        let expected = [
            DayPlan::Push1,
            DayPlan::Pull1,
            DayPlan::Legs1,
            DayPlan::Push2,
            DayPlan::Pull2,
            DayPlan::Legs2,
            DayPlan::Rest,
        ];
        let monday = date("2024-01-01");
        for week in 0..4 {
            for (offset, plan) in expected.iter().enumerate() {
                let day = monday + Duration::days(week * 7 + offset as i64);
                assert_eq!(DayPlan::for_date(day), *plan, "{day}");
            }
        }
    }

    #[test]
    fn plan_metadata() {
        assert_eq!(DayPlan::Legs2.template_name(), Some("Legs 2"));
        assert_eq!(DayPlan::Pull1.category(), Some(Category::Pull));
        assert_eq!(DayPlan::Rest.template_name(), None);
        assert_eq!(DayPlan::Rest.label(), "Rest");
        assert!(DayPlan::Rest.is_rest());
        assert!(!DayPlan::Push2.is_rest());
    }

    #[test]
    fn weekday_names_parse() {
        assert_eq!(parse_weekday("Monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday(" SUN "), Some(Weekday::Sun));
        assert_eq!(parse_weekday("someday"), None);
    }

    #[test]
    fn date_shorthands() {
        let today = date("2024-03-10");
        assert_eq!(parse_date("today", today), Some(today));
        assert_eq!(parse_date("Yesterday", today), Some(date("2024-03-09")));
        assert_eq!(parse_date("2024-02-29", today), Some(date("2024-02-29")));
        assert_eq!(parse_date("2024-13-01", today), None);
    }

    #[test]
    fn unparsable_date_falls_back_to_today() {
        let before = Local::now().date_naive();
        let parsed = parse_date_or_today("not-a-date");
        let after = Local::now().date_naive();
        assert!(parsed == before || parsed == after);
    }
}
