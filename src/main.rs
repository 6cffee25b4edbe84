use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use femcare::commands::{self, App, CommandError};
use femcare::{logging, Config};

#[derive(Parser)]
#[command(name = "femcare")]
#[command(about = "Private period tracker and wellness companion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Passphrase for encrypted data
    #[arg(long, global = true, env = "FEMCARE_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Mark or unmark period days (YYYY-MM-DD)
    Mark {
        #[arg(required = true, value_parser = parse_date)]
        dates: Vec<NaiveDate>,

        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,
    },

    /// Show cycle length, status and the next expected period
    Status {
        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,
    },

    /// Talk to the wellness companion
    Chat {
        /// Send one message and exit; omit for an interactive session
        message: Option<String>,
    },

    /// PCOD/PCOS symptom screening
    Screen {
        /// Six comma-separated answers, e.g. y,n,n,y,n,n
        #[arg(long, value_delimiter = ',', value_parser = parse_answer)]
        answers: Vec<bool>,
    },

    /// Print the stored cycle record as JSON
    Export,

    /// Delete all stored period data
    Wipe {
        #[arg(long)]
        yes: bool,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("{s:?} is not a YYYY-MM-DD date: {e}"))
}

fn parse_answer(s: &str) -> Result<bool, String> {
    match s.trim().to_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Ok(true),
        "n" | "no" | "false" | "0" => Ok(false),
        other => Err(format!("expected yes or no, got {other:?}")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let app = App::new(config, cli.data_dir, cli.passphrase)?;
    let today = chrono::Local::now().date_naive();
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Mark { dates, today: at } => {
            commands::mark(&app, &dates, at.unwrap_or(today), &mut stdout)
        }
        Commands::Status { today: at } => commands::status(&app, at.unwrap_or(today), &mut stdout),
        Commands::Chat { message } => {
            let mut session = app.chat_session()?;
            match message {
                Some(message) => commands::chat_single(&mut session, &message, &mut stdout).await,
                None => commands::chat_interactive(&mut session, io::stdin().lock(), &mut stdout).await,
            }
        }
        Commands::Screen { answers } => commands::screen(&answers, &mut stdout),
        Commands::Export => commands::export(&app, &mut stdout),
        Commands::Wipe { yes } => commands::wipe(&app, yes, &mut stdout),
    }
}
