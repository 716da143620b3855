//! Command-line front end for the calorie tracker.
//!
//! # Responsibility
//! - Drive one `CalorieScreen` from the terminal: add, list, delete, chart.
//! - Keep output deterministic so it can be diffed in scripts.

use calorie_core::db::open_db;
use calorie_core::logging::init_from_config;
use calorie_core::{
    init_logging, load_config, summarize, AppContext, CalorieScreen, ChartSurface, DietLevel,
    FixedDietPolicy, RecordStore, SqliteEntryRepository,
};
use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

const CHART_WIDTH: usize = 40;

#[derive(Parser, Debug)]
#[command(name = "calorie", version, about = "Log calorie intake by diet level")]
struct Cli {
    /// SQLite database file (overrides `[database] path`).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// TOML config file.
    #[arg(long, global = true, value_name = "PATH", default_value = "calorie.toml")]
    config: PathBuf,

    /// Absolute directory for rolling log files (overrides `[logging] dir`).
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a calorie intake.
    Add {
        /// Amount as typed into the prompt.
        calories: String,
        /// Diet level label; derived from the configured thresholds when omitted.
        #[arg(long)]
        level: Option<String>,
    },
    /// Print entries grouped by diet level.
    List,
    /// Delete one entry by id.
    Delete { id: Uuid },
    /// Print the calorie bar chart.
    Chart,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::List => "list",
            Self::Delete { .. } => "delete",
            Self::Chart => "chart",
        }
    }
}

/// Horizontal bar chart written to stdout.
struct TextChart {
    print: bool,
}

impl ChartSurface for TextChart {
    fn render(&mut self, series: &[f64]) {
        if !self.print {
            return;
        }
        let summary = summarize(series);
        if summary.count == 0 {
            println!("(no entries)");
            return;
        }
        for value in series {
            let width = ((value / summary.max) * CHART_WIDTH as f64).round() as usize;
            println!("{:>8.1} | {}", value, "#".repeat(width.max(1)));
        }
        println!("{:>8.1} total over {} entries", summary.total, summary.count);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(&cli.config)?;
    match &cli.log_dir {
        Some(dir) => init_logging(&config.logging.level, dir)?,
        None => {
            init_from_config(&config.logging)?;
        }
    }

    let db_path = cli.db.clone().unwrap_or_else(|| config.database.path.clone());
    let conn = open_db(&db_path)?;
    let repo = SqliteEntryRepository::new(&conn);
    let context = AppContext::new();

    let store = match &cli.command {
        Command::Add {
            level: Some(level), ..
        } => RecordStore::new(repo, FixedDietPolicy(DietLevel::new(level)?)),
        _ => RecordStore::new(repo, config.diet.policy()),
    };
    let chart = TextChart {
        print: matches!(cli.command, Command::Chart),
    };
    let mut screen = CalorieScreen::new(store, &context, config.index.grouping, chart);
    screen.load()?;

    let name = cli.command.name();
    match cli.command {
        Command::Add { calories, .. } => {
            let entry = screen.submit_input(&calories)?;
            println!("added {} ({} kcal, {})", entry.id, entry.calories, entry.diet_level);
        }
        Command::List => print_sections(&screen),
        Command::Delete { id } => match screen.delete_entry(id)? {
            Some(entry) => println!("deleted {}", entry.id),
            None => println!("no entry {id}"),
        },
        Command::Chart => {}
    }

    info!("event=cli_command module=cli status=ok command={name}");
    Ok(())
}

fn print_sections(screen: &CalorieScreen<SqliteEntryRepository<'_>>) {
    if screen.section_count() == 0 {
        println!("(no entries)");
        return;
    }
    for section in 0..screen.section_count() {
        println!("{}", screen.section_title(section).unwrap_or_default());
        for row in 0..screen.row_count(section) {
            if let Some(entry) = screen.entry_at(section, row) {
                println!(
                    "  {}  {:>8.1} kcal  t={}",
                    entry.id, entry.calories, entry.timestamp_ms
                );
            }
        }
    }
}
