//! CLI entry point for timegrid.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use timegrid_app::{AppConfig, Planner};
use timegrid_store_file::FileStore;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

/// Weekly half-hour planner for billable and internal work.
#[derive(Parser, Debug)]
#[command(
    name = "timegrid",
    version,
    about = "timegrid: plan Monday-Saturday, 07:00-20:00, in half-hour slots"
)]
struct Cli {
    /// Configuration file (defaults to <config_dir>/timegrid/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data file (overrides [storage] path).
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Schedule a new task.
    New {
        /// Day, as YYYY-MM-DD.
        #[arg(long)]
        date: String,
        /// Start time, as HH:MM on the half hour.
        #[arg(long)]
        start: String,
        /// End time, as HH:MM on the half hour.
        #[arg(long)]
        end: String,
        /// Client of billable work.
        #[arg(long, conflicts_with = "work_type", required_unless_present = "work_type")]
        client: Option<String>,
        #[arg(long, requires = "client")]
        project: Option<String>,
        #[arg(long, requires = "client")]
        quote: Option<String>,
        /// Mark billable work as already invoiced.
        #[arg(long, requires = "client")]
        billed: bool,
        /// Kind of non-billable work.
        #[arg(long = "type")]
        work_type: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// List tasks.
    Ls {
        /// Only the Monday-Saturday week containing this date.
        #[arg(long)]
        week: Option<String>,
        #[arg(short = 'c', long = "client")]
        clients: Vec<String>,
        #[arg(short = 't', long = "type")]
        types: Vec<String>,
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,
        #[arg(long, value_enum, default_value_t = LsFormat::Table)]
        format: LsFormat,
    },

    /// Delete a task (unknown ids are ignored).
    Rm {
        #[arg(long)]
        task: String,
    },

    /// Import tasks from a semicolon-separated file; all or nothing.
    Import {
        file: PathBuf,
    },

    /// Export every task; writes to stdout when no file is given.
    Export {
        file: Option<PathBuf>,
    },

    /// Show known clients, types, projects and quotes.
    Options,

    /// Show the card colors of every known client.
    Colors,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum CategoryArg {
    Billable,
    NonBillable,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LsFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let Cli { config, data, cmd } = Cli::parse();
    install_tracing();

    let config = AppConfig::load(config.as_deref())?;
    let data_path = match data {
        Some(path) => path,
        None => config.data_path()?,
    };
    let files = FileStore::open(&data_path)
        .with_context(|| format!("failed to open data file {}", data_path.display()))?;
    let mut planner = Planner::open(files);

    let mut stdout = io::stdout().lock();
    commands::run(cmd, &mut planner, &config.palette(), &mut stdout)?;
    planner
        .flush()
        .with_context(|| format!("failed to save tasks to {}", data_path.display()))
}

fn install_tracing() {
    // RUST_LOG is honoured; INFO by default.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .try_init();
}
