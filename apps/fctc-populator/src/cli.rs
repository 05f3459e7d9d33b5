//! Command-line interface

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use fctc_core::{
    CancelFlag, Engine, FctcConfig, ItemGraph, ItemTree, OracleConfig, RepairMode, RunRequest,
};
use fctc_oracle::{LlmOracle, OracleSettings};
use tracing_subscriber::EnvFilter;

use crate::error::{AppError, EXIT_NO_ACTION};
use crate::output;

#[derive(Debug, Parser)]
#[command(
    name = "fctc-populator",
    version,
    about = "From Caves To Cars populator. Queries an LLM for the steps, tools and raw materials needed to build an item."
)]
pub struct Cli {
    /// Increase log detail (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML, or JSON with a .json extension)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding the item graph, cache and tool files
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decompose items into steps, tools and raw materials
    Populate(PopulateArgs),
    /// Show what a user requested item needs, as a tree
    Tree {
        /// A user requested item, or "all"
        item: String,
    },
    /// Tool and raw material counts for every user requested item
    Stats,
    /// Remove step references that lead back to an ancestor
    RepairCycles,
}

#[derive(Debug, Args, Clone, Default)]
struct PopulateArgs {
    /// The item you want to build
    #[arg(short = 'q', long = "query", value_name = "ITEM")]
    query: Option<String>,

    /// A file listing items to build, one per line
    #[arg(short = 'f', long = "query-file", value_name = "FILE")]
    query_file: Option<PathBuf>,

    /// Rebuild unfinished items (-rr reprocesses every item)
    #[arg(short = 'r', long = "rebuild", action = ArgAction::Count)]
    rebuild: u8,

    /// Run even if the item graph holds unfinished items
    #[arg(short = 'i', long)]
    ignore_corruption: bool,

    /// Describe items and steps
    #[arg(short = 'd', long)]
    describe: bool,

    /// Decompose every dependency with its own primitive age
    #[arg(short = 'p', long = "primitive-age-for-all")]
    primitive_age_for_all: bool,
}

impl PopulateArgs {
    /// The requested roots; a query string wins over a query file
    fn roots(&self) -> Result<Vec<String>, AppError> {
        if let Some(query) = &self.query {
            return Ok(vec![query.trim().to_string()]);
        }
        match &self.query_file {
            Some(path) => read_query_file(path),
            None => Ok(Vec::new()),
        }
    }
}

fn read_query_file(path: &Path) -> Result<Vec<String>, AppError> {
    let text = std::fs::read_to_string(path).map_err(|source| AppError::QueryFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Install the tracing subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,fctc_core={level},fctc_oracle={level},fctc_populator={level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

impl Cli {
    pub fn run(self) -> Result<ExitCode, AppError> {
        let mut config = FctcConfig::load(self.config.as_deref())?;
        if let Some(dir) = self.data_dir {
            config.storage.data_dir = dir;
        }

        match self.command {
            Command::Populate(args) => populate(config, &args),
            Command::Tree { item } => tree(&config, &item),
            Command::Stats => stats(&config),
            Command::RepairCycles => repair_cycles(&config),
        }
    }
}

fn populate(mut config: FctcConfig, args: &PopulateArgs) -> Result<ExitCode, AppError> {
    let roots = args.roots()?;
    let repair = RepairMode::from_count(args.rebuild);
    if roots.is_empty() && repair == RepairMode::None {
        println!("No action provided. Use -h for help.");
        return Ok(ExitCode::from(EXIT_NO_ACTION));
    }

    config.engine.describe |= args.describe;
    config.engine.primitive_age_for_all |= args.primitive_age_for_all;

    tracing::info!("Loading saved state from {}", config.storage.data_dir.display());
    let oracle = build_oracle(&config.oracle)?;
    let mut engine = Engine::from_config(&config, Box::new(oracle))?;
    watch_ctrl_c(engine.cancel_flag())?;

    let summary = engine.run(&RunRequest {
        roots,
        repair,
        ignore_corruption: args.ignore_corruption,
    })?;
    output::print_summary(&summary);
    Ok(ExitCode::SUCCESS)
}

fn build_oracle(config: &OracleConfig) -> Result<LlmOracle, AppError> {
    let api_key = std::env::var(&config.api_key_env)
        .map_err(|_| AppError::MissingApiKey(config.api_key_env.clone()))?;

    let mut settings = OracleSettings::for_provider(&config.provider, api_key)?;
    if let Some(model) = &config.model {
        settings.model = model.clone();
    }
    settings.max_tokens = config.max_tokens;
    settings.temperature = config.temperature;
    settings.timeout_seconds = config.timeout_seconds;

    tracing::debug!("Using {} model {}", settings.provider, settings.model);
    Ok(LlmOracle::new(settings)?)
}

/// First Ctrl-C requests a stop at the next checkpoint; a second one exits.
fn watch_ctrl_c(cancel: CancelFlag) -> Result<(), AppError> {
    let runtime = fctc_oracle::runtime()?;
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Ctrl-C pressed, stopping after the current item");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(i32::from(crate::error::EXIT_CANCELLED));
        }
    });
    Ok(())
}

fn open_graph(config: &FctcConfig) -> Result<ItemGraph, AppError> {
    Ok(ItemGraph::open(config.storage.item_db_path(), false)?)
}

fn tree(config: &FctcConfig, item: &str) -> Result<ExitCode, AppError> {
    let graph = open_graph(config)?;
    let requested = graph.requested();

    let items = if item == "all" {
        requested
    } else if requested.iter().any(|name| name == item) {
        vec![item.to_string()]
    } else {
        return Err(AppError::NotRequested(item.to_string()));
    };

    for name in &items {
        output::print_tree(&ItemTree::build(&graph, name)?);
    }
    Ok(ExitCode::SUCCESS)
}

fn stats(config: &FctcConfig) -> Result<ExitCode, AppError> {
    let graph = open_graph(config)?;
    for name in graph.requested() {
        output::print_counts(&name, &graph.dependency_counts(&name));
    }
    Ok(ExitCode::SUCCESS)
}

fn repair_cycles(config: &FctcConfig) -> Result<ExitCode, AppError> {
    let mut graph = open_graph(config)?;
    let removed = graph.repair_cycles();
    graph.save()?;
    println!("Removed {} cyclic references", removed);
    Ok(ExitCode::SUCCESS)
}
