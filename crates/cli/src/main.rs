// hourgrid CLI - view and edit per-day hour bookings
// Talks to the hours API through hourgrid-client; all grid rules live in
// hourgrid-engine.

mod account;
mod exit_codes;
mod grid_ops;
mod render;
mod tui;

use std::process::ExitCode;

use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use hourgrid_config::Settings;
use hourgrid_engine::ViewMode;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "hgrid")]
#[command(about = "Sparse per-day hour grid: view, edit and sync time bookings")]
#[command(version)]
#[command(long_version = long_version())]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Which subject/window to work on.
#[derive(clap::Args, Debug, Clone)]
pub struct WindowArgs {
    /// Subject whose hours are shown (e.g. a vehicle or employee id)
    #[arg(long, short = 's')]
    pub subject: String,

    /// Category context (defaults to grid.categoryContext)
    #[arg(long, short = 'c')]
    pub context: Option<String>,

    /// Year (defaults to the current year)
    #[arg(long, short = 'y')]
    pub year: Option<i32>,

    /// Month 1-12 the window is anchored on (defaults to the current month)
    #[arg(long, short = 'm', value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,

    /// Window length (defaults to grid.defaultView)
    #[arg(long)]
    pub mode: Option<ModeArg>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an API token for later commands
    #[command(after_help = "\
Examples:
  hgrid login --token $TOKEN
  hgrid login --token $TOKEN --api-base https://hours.example.com")]
    Login {
        /// API token (prompted for when omitted on a TTY)
        #[arg(long, env = "HOURGRID_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// API base URL (defaults to api.baseUrl)
        #[arg(long)]
        api_base: Option<String>,
    },

    /// Forget the stored token
    Logout,

    /// List or create categories
    Categories {
        /// Category context (defaults to grid.categoryContext)
        #[arg(long, short = 'c')]
        context: Option<String>,

        #[command(subcommand)]
        command: Option<CategoryCommands>,
    },

    /// Print one view window of a subject's hours
    #[command(after_help = "\
Examples:
  hgrid show -s truck-7 -m 3
  hgrid show -s truck-7 -m 3 --mode week --json")]
    Show {
        #[command(flatten)]
        window: WindowArgs,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Set the hours of one cell and save
    #[command(after_help = "\
Examples:
  hgrid set -s truck-7 --date 2024-03-10 --category Transport --value 5 --owner D2")]
    Set {
        #[arg(long, short = 's')]
        subject: String,

        #[arg(long, short = 'c')]
        context: Option<String>,

        /// Day (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Category id or name
        #[arg(long)]
        category: String,

        /// Hours
        #[arg(long)]
        value: f64,

        /// Owner reference (e.g. the driver)
        #[arg(long)]
        owner: Option<String>,
    },

    /// Remove the booking of one cell and save
    Delete {
        #[arg(long, short = 's')]
        subject: String,

        #[arg(long, short = 'c')]
        context: Option<String>,

        /// Day (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Category id or name
        #[arg(long)]
        category: String,
    },

    /// Interactive grid editor
    Edit {
        #[command(flatten)]
        window: WindowArgs,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Create a category
    Add {
        /// Display name
        name: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    Week,
    #[value(name = "fifteen-day", alias = "15")]
    FifteenDay,
    Month,
}

impl From<ModeArg> for ViewMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Week => ViewMode::Week,
            ModeArg::FifteenDay => ViewMode::FifteenDay,
            ModeArg::Month => ViewMode::Month,
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  hourgrid-engine ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = Settings::load();

    let result = match cli.command {
        Commands::Login { token, api_base } => account::cmd_login(&settings, token, api_base),
        Commands::Logout => account::cmd_logout(),
        Commands::Categories { context, command } => match command {
            None => grid_ops::cmd_categories(&settings, context),
            Some(CategoryCommands::Add { name }) => grid_ops::cmd_category_add(&settings, context, name),
        },
        Commands::Show { window, json } => grid_ops::cmd_show(&settings, window, json),
        Commands::Set { subject, context, date, category, value, owner } => {
            grid_ops::cmd_set(&settings, subject, context, date, category, value, owner)
        }
        Commands::Delete { subject, context, date, category } => {
            grid_ops::cmd_delete(&settings, subject, context, date, category)
        }
        Commands::Edit { window } => grid_ops::cmd_edit(&settings, window),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<hourgrid_core::BackendError> for CliError {
    fn from(err: hourgrid_core::BackendError) -> Self {
        let code = exit_codes::backend_exit_code(&err);
        let cli = Self::new(code, err.to_string());
        match err {
            hourgrid_core::BackendError::NotAuthenticated => cli.with_hint("run `hgrid login` first"),
            _ => cli,
        }
    }
}

impl From<hourgrid_engine::GridError> for CliError {
    fn from(err: hourgrid_engine::GridError) -> Self {
        Self::new(exit_codes::grid_exit_code(&err), err.to_string())
    }
}

impl From<hourgrid_engine::EditError> for CliError {
    fn from(err: hourgrid_engine::EditError) -> Self {
        let code = exit_codes::edit_exit_code(&err);
        let hint = match &err {
            hourgrid_engine::EditError::Capacity(cap) => Some(format!("at most {}h fit on that day", cap.remaining())),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

/// Today's year and month, used when the window flags are omitted.
pub fn current_year_month() -> (i32, u32) {
    let today = Local::now().date_naive();
    (today.year(), today.month())
}
