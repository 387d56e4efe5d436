//! Command line front end for the tracker.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use chrono::{Local, NaiveDate, Weekday};
use clap::{Parser, Subcommand};
use log::info;

use ppl_tracker::analysis::{self, ExercisePerformance};
use ppl_tracker::history::{self, HistoryNavigator, HistoryState};
use ppl_tracker::models::{SetEntry, WeightUnit, WorkoutEntry};
use ppl_tracker::schedule::{self, DayPlan};
use ppl_tracker::session::SetSession;
use ppl_tracker::workouts::{self, DayDetail, SetResult};
use ppl_tracker::{Database, Result, Settings, catalog, export, templates};

/// Upper bound for window arguments, roughly a century.
const MAX_WINDOW_DAYS: i64 = 36_500;

#[derive(Parser, Debug)]
#[command(author, version, about = "Offline Push/Pull/Legs workout tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print tabular output as CSV
    #[arg(long, global = true, conflicts_with = "json")]
    csv: bool,

    /// Print output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show (and create if needed) today's workout
    Today,
    /// Show (and create if needed) the workout for a date
    Day {
        #[arg(value_parser = parse_date_arg, default_value = "today")]
        date: NaiveDate,
    },
    /// Create a day from a specific template
    Template {
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,
        /// Template name, e.g. "Pull 2"
        name: String,
    },
    /// Show which template a weekday follows
    Plan {
        #[arg(value_parser = parse_weekday_arg)]
        weekday: Option<Weekday>,
    },
    /// Time a set interactively and save it when Enter is pressed
    RunSet {
        #[arg(short, long)]
        entry: i64,
        #[arg(short, long)]
        set: u32,
        #[arg(short, long)]
        reps: u32,
        #[arg(short, long)]
        weight: f64,
    },
    /// Record a completed set without timing it
    CompleteSet {
        #[arg(short, long)]
        entry: i64,
        #[arg(short, long)]
        set: u32,
        #[arg(short, long)]
        reps: u32,
        #[arg(short, long)]
        weight: f64,
        #[arg(long, default_value_t = 0)]
        seconds: u32,
    },
    /// Correct reps and weight of a set
    EditSet {
        #[arg(short, long)]
        entry: i64,
        #[arg(short, long)]
        set: u32,
        #[arg(short, long)]
        reps: u32,
        #[arg(short, long)]
        weight: f64,
    },
    /// Return a set to pending
    ResetSet {
        #[arg(short, long)]
        entry: i64,
        #[arg(short, long)]
        set: u32,
    },
    /// Browse past workouts
    History {
        /// Day to show; defaults to the most recent workout
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        /// List every recorded day instead of one day's detail
        #[arg(short, long, conflicts_with = "date")]
        list: bool,
    },
    /// Performance trends over a trailing window
    Performance {
        /// Restrict to one exercise
        #[arg(short, long)]
        exercise: Option<String>,
        /// Window length in days; defaults to the configured window
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=MAX_WINDOW_DAYS))]
        days: Option<u32>,
    },
    /// List or search the exercise catalog
    Exercises {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// List templates and their exercises
    Templates,
    /// Show or change persistent settings
    Config {
        /// Default performance window in days
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_WINDOW_DAYS))]
        window: Option<u32>,
        /// Weight unit used for display (lbs or kg)
        #[arg(long, value_parser = parse_unit_arg)]
        unit: Option<WeightUnit>,
        /// Database file location
        #[arg(long)]
        database: Option<std::path::PathBuf>,
    },
}

fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    schedule::parse_date(s, Local::now().date_naive()).ok_or_else(|| {
        format!("Invalid date '{s}'. Use 'today', 'yesterday', 'tomorrow' or YYYY-MM-DD.")
    })
}

fn parse_unit_arg(s: &str) -> std::result::Result<WeightUnit, String> {
    match s.trim().to_lowercase().as_str() {
        "lbs" | "lb" => Ok(WeightUnit::Lbs),
        "kg" | "kgs" => Ok(WeightUnit::Kg),
        _ => Err(format!("Unknown weight unit '{s}'. Use 'lbs' or 'kg'.")),
    }
}

fn parse_weekday_arg(s: &str) -> std::result::Result<Weekday, String> {
    schedule::parse_weekday(s).ok_or_else(|| format!("Unknown weekday '{s}'"))
}

#[derive(Clone, Copy)]
enum Format {
    Text,
    Csv,
    Json,
}

struct Output {
    format: Format,
    unit: WeightUnit,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load();
    if let Commands::Config {
        window,
        unit,
        database,
    } = &cli.command
    {
        return configure(&mut settings, *window, *unit, database.clone());
    }
    let path = settings.database_path()?;
    let mut db = Database::open(&path)?;
    if settings.seed_catalog {
        catalog::seed(&mut db);
    }

    let out = Output {
        format: if cli.json {
            Format::Json
        } else if cli.csv {
            Format::Csv
        } else {
            Format::Text
        },
        unit: settings.weight_unit,
    };

    match cli.command {
        Commands::Today => {
            let today = Local::now().date_naive();
            show_day(&mut db, &out, today)?;
        }
        Commands::Day { date } => show_day(&mut db, &out, date)?,
        Commands::Template { date, name } => {
            let template = templates::template_by_name(&db, &name)?
                .ok_or_else(|| ppl_tracker::Error::TemplateNotFound(name.clone()))?;
            let day = workouts::get_or_create_day_with_template(&mut db, date, template.id)?;
            if day.template_id != Some(template.id) {
                println!("{date} already has a workout; leaving it unchanged.");
            }
            show_day(&mut db, &out, date)?;
        }
        Commands::Plan { weekday } => match weekday {
            Some(w) => println!("{w}: {}", plan_line(DayPlan::for_weekday(w))),
            None => {
                for w in [
                    Weekday::Mon,
                    Weekday::Tue,
                    Weekday::Wed,
                    Weekday::Thu,
                    Weekday::Fri,
                    Weekday::Sat,
                    Weekday::Sun,
                ] {
                    println!("{w}: {}", plan_line(DayPlan::for_weekday(w)));
                }
            }
        },
        Commands::RunSet {
            entry,
            set,
            reps,
            weight,
        } => {
            let mut session = SetSession::open(&mut db, entry)?;
            session.start(set)?;
            println!(
                "{} set {set} running. Press Enter when done.",
                session.entry().exercise_name
            );
            wait_for_enter(&session)?;
            let saved = session.stop(&mut db, reps, weight)?;
            print_set(&out, &saved);
            if session.is_entry_completed() {
                println!("{} completed.", session.entry().exercise_name);
            }
        }
        Commands::CompleteSet {
            entry,
            set,
            reps,
            weight,
            seconds,
        } => {
            workouts::ensure_sets(&mut db, entry)?;
            let saved = workouts::complete_set(
                &mut db,
                entry,
                set,
                SetResult {
                    reps,
                    weight,
                    elapsed_seconds: seconds,
                },
                chrono::Utc::now(),
            )?;
            print_set(&out, &saved);
        }
        Commands::EditSet {
            entry,
            set,
            reps,
            weight,
        } => {
            workouts::ensure_sets(&mut db, entry)?;
            let saved = workouts::edit_set(&mut db, entry, set, reps, weight)?;
            print_set(&out, &saved);
        }
        Commands::ResetSet { entry, set } => {
            let saved = workouts::reset_set(&mut db, entry, set)?;
            print_set(&out, &saved);
        }
        Commands::History { date, list } => show_history(&db, &out, date, list)?,
        Commands::Performance { exercise, days } => {
            let window = days.unwrap_or(settings.performance_window_days);
            let results = match exercise {
                Some(name) => {
                    let ex = catalog::find_exercise(&db, &name)?;
                    vec![analysis::performance(&db, ex.id, window)?]
                }
                None => analysis::all_performance(&db, window)?
                    .into_iter()
                    .filter(|p| p.sessions_count > 0 || p.has_error)
                    .collect(),
            };
            info!("Computed performance for {} exercises", results.len());
            show_performance(&out, window, &results)?;
        }
        Commands::Exercises { search } => {
            let exercises = match search {
                Some(q) => catalog::search_exercises(&db, &q)?,
                None => catalog::list_exercises(&db)?,
            };
            match out.format {
                Format::Json => export::write_json(io::stdout().lock(), &exercises)?,
                _ => {
                    for ex in exercises {
                        println!(
                            "{:>4}  {:<32} {:<10} {}",
                            ex.id,
                            ex.name,
                            ex.equipment.as_str(),
                            ex.primary_muscles.join(", ")
                        );
                    }
                }
            }
        }
        Commands::Config { .. } => {}
        Commands::Templates => {
            for t in templates::list_templates(&db)? {
                let slots = templates::template_exercises(&db, t.id)?;
                println!("{} ({}, {})", t.name, t.category.as_str(), t.difficulty.as_str());
                for s in slots {
                    println!(
                        "    {}x{} {:<32} rest {}s",
                        s.sets, s.reps, s.exercise_name, s.rest_seconds
                    );
                }
            }
        }
    }

    db.close()
}

/// Redraw the running set's elapsed time on every tick until a line is
/// read from stdin.
fn wait_for_enter(session: &SetSession) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = tx.send(io::stdin().lock().read_line(&mut line));
    });

    let mut shown = None;
    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(read) => {
                read?;
                println!();
                return Ok(());
            }
            Err(RecvTimeoutError::Timeout) => {
                let ticks = session.running_ticks();
                if ticks != shown {
                    shown = ticks;
                    let secs = ticks.unwrap_or(0);
                    print!("\r  {:02}:{:02}", secs / 60, secs % 60);
                    io::stdout().flush()?;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

fn configure(
    settings: &mut Settings,
    window: Option<u32>,
    unit: Option<WeightUnit>,
    database: Option<std::path::PathBuf>,
) -> Result<()> {
    let changed = window.is_some() || unit.is_some() || database.is_some();
    if let Some(days) = window {
        settings.performance_window_days = days;
    }
    if let Some(unit) = unit {
        settings.weight_unit = unit;
    }
    if database.is_some() {
        settings.database_path = database;
    }
    if changed {
        settings.save()?;
        info!("Settings saved");
    }
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

fn show_day(db: &mut Database, out: &Output, date: NaiveDate) -> Result<()> {
    workouts::get_or_create_day(db, date)?;
    match workouts::day_detail(db, date)? {
        Some(detail) => print_detail(out, &detail),
        None => Ok(()),
    }
}

fn print_detail(out: &Output, detail: &DayDetail) -> Result<()> {
    match out.format {
        Format::Json => export::write_json(io::stdout().lock(), detail),
        Format::Csv => export::write_entries_csv(io::stdout().lock(), &detail.entries),
        Format::Text => {
            let plan = DayPlan::for_date(detail.day.date);
            println!("{} ({})", detail.day.date, plan_line(plan));
            if detail.entries.is_empty() {
                if plan.is_rest() && detail.day.template_id.is_none() {
                    println!("  Rest day.");
                } else {
                    println!("  No exercises scheduled.");
                }
            }
            for e in &detail.entries {
                print_entry(e);
            }
            Ok(())
        }
    }
}

fn plan_line(plan: DayPlan) -> String {
    match plan.category() {
        Some(category) => format!("{}, {} day", plan.label(), category.as_str()),
        None => plan.label().to_string(),
    }
}

fn print_entry(e: &WorkoutEntry) {
    let mark = if e.is_completed { "x" } else { " " };
    println!(
        "  [{mark}] #{:<4} {:<32} {}x{}  rest {}s  time {}s",
        e.id, e.exercise_name, e.sets, e.reps, e.rest_seconds, e.total_time_seconds
    );
}

fn print_set(out: &Output, set: &SetEntry) {
    let state = if set.is_completed { "done" } else { "pending" };
    println!(
        "Set {} {state}: {} reps @ {} {} ({}s)",
        set.set_number,
        set.reps_performed,
        set.weight_used,
        out.unit.label(),
        set.elapsed_seconds
    );
}

fn show_history(db: &Database, out: &Output, date: Option<NaiveDate>, list: bool) -> Result<()> {
    if list {
        let days = history::summaries(db)?;
        return match out.format {
            Format::Json => export::write_json(io::stdout().lock(), &days),
            Format::Csv => export::write_history_csv(io::stdout().lock(), &days),
            Format::Text => {
                for d in days {
                    println!(
                        "{}  {}/{} exercises ({:.0}%)  {}s",
                        d.date,
                        d.completed_exercises,
                        d.total_exercises,
                        d.completion_percent,
                        d.total_time_seconds
                    );
                }
                Ok(())
            }
        };
    }

    let nav = HistoryNavigator::load(db)?;
    let Some(current) = date.or_else(|| nav.latest()) else {
        println!("No workouts recorded yet.");
        return Ok(());
    };
    match history::load_day(db, current) {
        HistoryState::Loaded { detail, summary } => {
            print_detail(out, &detail)?;
            if let Format::Text = out.format {
                println!(
                    "  {}/{} completed ({:.0}%), {}s total",
                    summary.completed_exercises,
                    summary.total_exercises,
                    summary.completion_percent,
                    summary.total_time_seconds
                );
            }
        }
        HistoryState::NotFound(d) => println!("No workout recorded on {d}."),
        HistoryState::Error(msg) => eprintln!("{msg}"),
        HistoryState::Loading => {}
    }
    if let Format::Text = out.format {
        let prev = nav.previous(current).map(|d| d.to_string());
        let next = nav.next(current).map(|d| d.to_string());
        println!(
            "  previous: {}  next: {}",
            prev.as_deref().unwrap_or("-"),
            next.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn show_performance(out: &Output, window: u32, results: &[ExercisePerformance]) -> Result<()> {
    match out.format {
        Format::Json => export::write_json(io::stdout().lock(), results),
        Format::Csv => export::write_performance_csv(io::stdout().lock(), results),
        Format::Text => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "Last {window} days")?;
            if results.is_empty() {
                writeln!(stdout, "  No completed sets in this window.")?;
            }
            for p in results {
                if p.has_error {
                    writeln!(stdout, "  {:<32} could not be analyzed", p.exercise_name)?;
                    continue;
                }
                writeln!(
                    stdout,
                    "  {:<32} {} sessions  max {} {} x {}  volume {:.0} ({:+.1}%)  weight {:+.1}%",
                    p.exercise_name,
                    p.sessions_count,
                    p.max_weight,
                    out.unit.label(),
                    p.max_reps,
                    p.total_volume,
                    p.volume_progress,
                    p.weight_progress
                )?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_relative_dates_and_weekdays() {
        let cli = Cli::try_parse_from(["ppl-tracker", "template", "2024-01-02", "Push 2"]).unwrap();
        match cli.command {
            Commands::Template { date, name } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
                assert_eq!(name, "Push 2");
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["ppl-tracker", "plan", "thu"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Plan {
                weekday: Some(Weekday::Thu)
            }
        ));

        assert!(Cli::try_parse_from(["ppl-tracker", "day", "13/45/2024"]).is_err());
        assert!(Cli::try_parse_from(["ppl-tracker", "history", "--date", "today", "--list"]).is_err());
    }

    #[test]
    fn output_format_flags_are_global() {
        let cli = Cli::try_parse_from(["ppl-tracker", "performance", "--csv", "-d", "7"]).unwrap();
        assert!(cli.csv);
        assert!(matches!(cli.command, Commands::Performance { days: Some(7), .. }));
        assert!(Cli::try_parse_from(["ppl-tracker", "today", "--csv", "--json"]).is_err());
    }

    #[test]
    fn plan_lines_name_the_category() {
        assert_eq!(plan_line(DayPlan::Pull2), "Pull 2, pull day");
        assert_eq!(plan_line(DayPlan::Rest), "Rest");
    }

    #[test]
    fn config_accepts_units() {
        let cli = Cli::try_parse_from(["ppl-tracker", "config", "--unit", "KG", "--window", "14"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                window: Some(14),
                unit: Some(WeightUnit::Kg),
                database: None
            }
        ));
        assert!(Cli::try_parse_from(["ppl-tracker", "config", "--unit", "stone"]).is_err());
        assert!(Cli::try_parse_from(["ppl-tracker", "config", "--window", "0"]).is_err());
        assert!(Cli::try_parse_from(["ppl-tracker", "config", "--window", "200000000"]).is_err());
        assert!(Cli::try_parse_from(["ppl-tracker", "performance", "-d", "36501"]).is_err());
    }
}
