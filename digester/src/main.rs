//! `digester` command line entry point.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use digester::core::period::compute_period;
use digester::core::schema::validate_header;
use digester::exit_codes;
use digester::images::select_image;
use digester::io::asset_store::AssetStore;
use digester::io::client::AnthropicClient;
use digester::io::config::{CONFIG_FILE_NAME, DigestConfig, load_config};
use digester::io::documents::DocumentStore;
use digester::io::escalation::{Escalator, GhIssueEscalator, NoopEscalator};
use digester::io::retry::ThreadSleeper;
use digester::logging;
use digester::run::{RunContext, record_missing_api_key, run_digest};

#[derive(Parser)]
#[command(
    name = "digester",
    version,
    about = "Weekly research digest agent"
)]
struct Cli {
    /// Project root; configured paths resolve against it.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Config file (defaults to `digester.toml` under the root).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Research, review and save the digest for last week.
    Run {
        /// Run as if today were this date (YYYY-MM-DD, UTC by default).
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Never open issues on failure.
        #[arg(long)]
        no_escalate: bool,
    },
    /// Print the reporting period as JSON.
    Period {
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Check a digest's header against the reporting period.
    Validate {
        file: PathBuf,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Print the header image the next digest would use.
    SelectImage,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FAILED);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.root.join(CONFIG_FILE_NAME));
    let config = load_config(&config_path)?;
    match cli.command {
        Command::Run { today, no_escalate } => cmd_run(&cli.root, &config, today, no_escalate),
        Command::Period { today } => cmd_period(today),
        Command::Validate { file, today } => cmd_validate(&file, today),
        Command::SelectImage => cmd_select_image(&cli.root, &config),
    }
}

fn today_or_now(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Utc::now().date_naive())
}

fn cmd_run(
    root: &Path,
    config: &DigestConfig,
    today: Option<NaiveDate>,
    no_escalate: bool,
) -> Result<i32> {
    let Some(client) = AnthropicClient::from_env(config)? else {
        let outcome = record_missing_api_key(root, config)?;
        eprintln!(
            "ANTHROPIC_API_KEY not set (log: {})",
            outcome.log_path.display()
        );
        return Ok(exit_codes::FAILED);
    };

    let escalator: Box<dyn Escalator> = if no_escalate || !config.escalation.enabled {
        Box::new(NoopEscalator)
    } else {
        Box::new(GhIssueEscalator::new(&config.escalation))
    };
    let ctx = RunContext {
        root,
        config,
        client: &client,
        sleeper: &ThreadSleeper,
        escalator: escalator.as_ref(),
    };
    let outcome = run_digest(&ctx, today_or_now(today))?;

    let status = serde_json::to_value(outcome.status).context("serialize status")?;
    println!("status: {}", status.as_str().unwrap_or("unknown"));
    if let Some(path) = &outcome.document_path {
        println!("digest: {}", path.display());
    }
    println!("log: {}", outcome.log_path.display());

    Ok(if outcome.status.is_failure() {
        exit_codes::FAILED
    } else {
        exit_codes::OK
    })
}

fn cmd_period(today: Option<NaiveDate>) -> Result<i32> {
    let period = compute_period(today_or_now(today));
    let json = serde_json::to_string_pretty(&period).context("serialize period")?;
    println!("{json}");
    Ok(exit_codes::OK)
}

fn cmd_validate(file: &Path, today: Option<NaiveDate>) -> Result<i32> {
    let document =
        fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let period = compute_period(today_or_now(today));
    let errors = validate_header(&document, &period);
    if errors.is_empty() {
        println!("valid: {}", file.display());
        return Ok(exit_codes::OK);
    }
    for error in &errors {
        println!("{error}");
    }
    Ok(exit_codes::INVALID)
}

fn cmd_select_image(root: &Path, config: &DigestConfig) -> Result<i32> {
    let assets = AssetStore::new(root.join(&config.paths.images_dir), &config.images);
    let documents = DocumentStore::new(root.join(&config.paths.digests_dir));
    match select_image(&assets, &documents, &config.images.url_prefix)? {
        Some(image) => println!("{image}"),
        None => eprintln!("no images available in {}", assets.dir().display()),
    }
    Ok(exit_codes::OK)
}
