// Gridiron admin CLI.
//
// Startup sequence:
// 1. Initialize tracing (log to file; stdout carries the JSON report)
// 2. Load config, writing defaults on first run
// 3. Open the database
// 4. Run the subcommand on a blocking thread; Ctrl+C cancels it

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn};

use gridiron_core::config::{self, Config};
use gridiron_core::import::{self, GameImport, TeamImport};
use gridiron_core::model::{SeasonCandidate, UserCandidate};
use gridiron_core::reconcile::UpsertPolicy;
use gridiron_core::translate::TeamNaming;
use gridiron_core::{CancelFlag, Database};

#[derive(Parser, Debug)]
#[command(name = "gridiron", version, about = "Season data import for the picks database")]
struct Cli {
    /// Directory holding config/ and logs/ (default: current directory)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Create the configured conferences, seasons and users
    Seed,
    /// Import a games CSV for one season
    Games {
        file: PathBuf,
        #[arg(long)]
        year: i32,
        /// Week for files without a Week column
        #[arg(long)]
        week: Option<u32>,
        /// detect, full or short (default from config)
        #[arg(long)]
        team_names: Option<TeamNaming>,
        /// Owner of the imported games (default from config)
        #[arg(long)]
        user: Option<String>,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Import a teams CSV for one season, creating its divisions
    Teams {
        file: PathBuf,
        #[arg(long)]
        year: i32,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Create or update one season
    Season {
        #[arg(long)]
        name: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        weeks: Option<u32>,
        #[arg(long)]
        playoff_teams: Option<u32>,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Create or update one user
    User {
        #[arg(long)]
        name: String,
        /// actual, season-long, playoff-pool or bet
        #[arg(long = "type")]
        user_type: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Bankroll for bet users
        #[arg(long)]
        money: Option<f64>,
        #[command(flatten)]
        policy: PolicyArgs,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct PolicyArgs {
    /// Fail instead of creating rows that do not exist yet
    #[arg(long, default_value_t = false)]
    no_insert: bool,
    /// Fail instead of changing rows that already exist
    #[arg(long, default_value_t = false)]
    no_update: bool,
}

impl PolicyArgs {
    fn apply(self, base: UpsertPolicy) -> UpsertPolicy {
        UpsertPolicy {
            allow_insert: base.allow_insert && !self.no_insert,
            allow_update: base.allow_update && !self.no_update,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let base_dir = match cli.base_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read current directory")?,
    };

    // 1. Initialize tracing
    init_tracing(&base_dir)?;
    info!("gridiron starting: {:?}", cli.command);

    // 2. Load config
    let config = config::load_config(&base_dir).context("failed to load configuration")?;

    // 3. Open database
    let db_path = config.database.resolved_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db = Database::open(&db_path.to_string_lossy())
        .and_then(|db| db.with_busy_timeout(config.database.busy_timeout_ms))
        .context("failed to open database")?;
    info!("Database opened at {}", db_path.display());

    // 4. Run the command off the async runtime so Ctrl+C stays responsive.
    let cancel = CancelFlag::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling import");
                eprintln!("cancelling; nothing will be saved");
                cancel.cancel();
            }
        })
    };

    let command = cli.command;
    let outcome = tokio::task::spawn_blocking(move || run(&db, &config, command, &cancel))
        .await
        .context("import task panicked")?;
    watcher.abort();

    match outcome {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            info!("gridiron finished");
            Ok(())
        }
        Err(e) => {
            error!("command failed: {e:#}");
            Err(e)
        }
    }
}

fn run(
    db: &Database,
    config: &Config,
    command: Commands,
    cancel: &CancelFlag,
) -> anyhow::Result<serde_json::Value> {
    match command {
        Commands::Seed => to_json(import::seed(db, &config.seed)?),
        Commands::Games {
            file,
            year,
            week,
            team_names,
            user,
            policy,
        } => {
            let mut options = GameImport::new(year, &config.import);
            options.week = week;
            options.team_naming = team_names.unwrap_or(options.team_naming);
            if let Some(user) = user {
                options.user = user;
            }
            options.policy = policy.apply(options.policy);
            to_json(import::import_games(db, open(&file)?, &options, cancel)?)
        }
        Commands::Teams { file, year, policy } => {
            let options = TeamImport {
                year,
                policy: policy.apply(config.import.policy()),
            };
            to_json(import::import_teams(db, open(&file)?, &options, cancel)?)
        }
        Commands::Season {
            name,
            year,
            weeks,
            playoff_teams,
            policy,
        } => {
            let candidate = SeasonCandidate {
                id: 0,
                name: Some(name),
                year: Some(year),
                regular_season_weeks: weeks,
                playoff_teams,
            };
            to_json(import::upsert_season(
                db,
                candidate,
                policy.apply(UpsertPolicy::default()),
            )?)
        }
        Commands::User {
            name,
            user_type,
            first_name,
            last_name,
            money,
            policy,
        } => {
            let candidate = UserCandidate {
                id: 0,
                first_name,
                last_name,
                name: Some(name),
                user_type: Some(user_type),
                money,
            };
            to_json(import::upsert_users(
                db,
                &[candidate],
                policy.apply(UpsertPolicy::default()),
            )?)
        }
    }
}

fn open(path: &Path) -> anyhow::Result<File> {
    File::open(path).with_context(|| format!("failed to open {}", path.display()))
}

fn to_json(value: impl Serialize) -> anyhow::Result<serde_json::Value> {
    serde_json::to_value(value).context("failed to serialize report")
}

/// Initialize tracing to log to a file, keeping stdout for the report.
fn init_tracing(base_dir: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("gridiron.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gridiron_core=info,gridiron=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
