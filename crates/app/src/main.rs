use std::fmt;

use lift_core::model::{ProgressSort, TemplateExercise, Workout, format_weight};
use services::{ActiveSession, AppServices, Clock};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidSort { raw: String },
    MissingExercise,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidSort { raw } => write!(f, "invalid --sort value: {raw}"),
            ArgsError::MissingExercise => write!(f, "history requires --exercise <name>"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- progress [--db <sqlite_url>] [--sort alphabetical|weight|recent] [--json]");
    eprintln!("  cargo run -p app -- history  [--db <sqlite_url>] --exercise <name> [--json]");
    eprintln!("  cargo run -p app -- logs     [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- plans    [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- seed     [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:lift.sqlite3");
    eprintln!("  --sort alphabetical");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LIFT_DB_URL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Progress,
    History,
    Logs,
    Plans,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "progress" => Some(Self::Progress),
            "history" => Some(Self::History),
            "logs" => Some(Self::Logs),
            "plans" => Some(Self::Plans),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    sort: ProgressSort,
    json: bool,
    exercise: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("LIFT_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://lift.sqlite3".into(), normalize_sqlite_url),
            sort: ProgressSort::default(),
            json: false,
            exercise: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--sort" => {
                    let value = require_value(args, "--sort")?;
                    parsed.sort = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSort { raw: value.clone() })?;
                }
                "--exercise" => parsed.exercise = Some(require_value(args, "--exercise")?),
                "--json" => parsed.json = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand shows the progress view.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Progress,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Progress,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::default_clock()).await?;
    tracing::debug!(db = %parsed.db_url, ?cmd, "storage ready");

    match cmd {
        Command::Progress => show_progress(&services, &parsed).await,
        Command::History => {
            let name = parsed.exercise.as_deref().ok_or(ArgsError::MissingExercise)?;
            show_history(&services, name, parsed.json).await
        }
        Command::Logs => {
            let logs = services.workouts().fetch_logged_workouts().await?;
            print_workouts(&services, &logs);
            Ok(())
        }
        Command::Plans => {
            let plans = services.workouts().fetch_workout_plans().await?;
            print_workouts(&services, &plans);
            Ok(())
        }
        Command::Seed => seed(&services).await,
    }
}

async fn show_progress(
    services: &AppServices,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut tracker = services.progress_tracker();
    tracker.recompute().await?;
    let rows = tracker.sorted(args.sort);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let unit = services.settings().current().weight_unit;
    if rows.is_empty() {
        println!("No logged workouts yet.");
    }
    for row in rows {
        let recent: Vec<String> = row
            .recent_weights()
            .into_iter()
            .map(format_weight)
            .collect();
        println!(
            "{:<24} best {:>7} {unit}  latest {:>7} {unit}  [{}]",
            row.name(),
            format_weight(row.best_lift()),
            format_weight(row.latest_lift()),
            recent.join(", "),
        );
    }
    Ok(())
}

async fn show_history(
    services: &AppServices,
    name: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let sets = services.workouts().exercise_set_history(name).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&sets)?);
        return Ok(());
    }

    let unit = services.settings().current().weight_unit;
    for set in sets {
        let weight = set
            .weight
            .map_or_else(|| "-".to_string(), |w| format!("{} {unit}", format_weight(w)));
        let reps = set.reps.map_or_else(|| "-".to_string(), |r| r.to_string());
        let mark = if set.is_complete { "x" } else { " " };
        println!(
            "{}  #{:<3} set {}  {weight} x {reps} [{mark}]",
            set.completed_at.format("%Y-%m-%d %H:%M"),
            set.workout_id,
            set.set_index + 1,
        );
    }
    Ok(())
}

fn print_workouts(services: &AppServices, workouts: &[Workout]) {
    let unit = services.settings().current().weight_unit;
    if workouts.is_empty() {
        println!("Nothing here yet.");
    }
    for workout in workouts {
        let when = workout.created_at().map_or_else(
            || format!("plan {}", workout.index() + 1),
            |at| at.format("%Y-%m-%d %H:%M").to_string(),
        );
        println!("{}  ({when})", workout.title());
        for line in workout.exercises().iter().filter_map(|e| e.summary_line(unit)) {
            println!("    {line}");
        }
    }
}

/// Fill every set from its hint and mark it done, as if the lifter had
/// accepted the suggestions.
fn accept_hints(session: &mut ActiveSession) -> Result<(), Box<dyn std::error::Error>> {
    for exercise in 0..session.exercises().len() {
        for set in 0..session.exercises()[exercise].sets().len() {
            let filled = &session.exercises()[exercise].sets()[set];
            let (weight, reps) = (filled.weight(), filled.reps());
            let hint = session.hint(exercise, set);
            if let Some(weight) = weight.or(hint.map(|h| h.weight)) {
                session.set_weight_text(exercise, set, &format_weight(weight))?;
            }
            if let Some(reps) = reps.or(hint.map(|h| h.reps)) {
                session.set_reps_text(exercise, set, &reps.to_string())?;
            }
            session.toggle_set(exercise, set)?;
        }
    }
    Ok(())
}

async fn seed(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let templates = services.templates();
    if !templates.list().await?.is_empty() {
        println!("seed: templates already present, nothing to do.");
        return Ok(());
    }

    let push = templates
        .create(
            "Push",
            vec![
                TemplateExercise::new("Bench Press", 3, 5)?,
                TemplateExercise::new("Overhead Press", 3, 8)?,
            ],
        )
        .await?;
    templates
        .create("Pull", vec![TemplateExercise::new("Row", 3, 8)?])
        .await?;

    let mut legs = Workout::new("Leg Day")?;
    legs.add_exercise(lift_core::model::Exercise::planned("Squat", 5, Some(5))?)?;
    services.workouts().save_plan(&mut legs).await?;

    if let Some(id) = push.id() {
        let settings = services.settings().current();
        let flow = services.sessions();
        let mut session = flow.start_from_template(id, &settings).await?;
        accept_hints(&mut session)?;
        let logged = flow.finish(&mut session).await?;
        println!("seed: logged {:?}", logged.title());
        for line in session.summary_lines(settings.weight_unit) {
            println!("  {line}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
