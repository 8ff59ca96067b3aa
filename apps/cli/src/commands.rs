//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use leadscout_core::pipeline::{
    PipelineResult, ProgressReporter, harvest_from_file, ingest_audits, rescore_from_csv,
    run_pipeline,
};
use leadscout_discovery::{Discoverer, write_domains_file};
use leadscout_harvest::BrowserRenderer;
use leadscout_shared::{Manifest, init_config, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadScout — find, qualify, and score organization leads.
#[derive(Parser)]
#[command(
    name = "leadscout",
    version,
    about = "Discover candidate domains, harvest contacts, enrich, and score leads.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Manifest path (defaults to ~/.leadscout/leadscout.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Write a default manifest to ~/.leadscout/leadscout.toml.
    Init,

    /// Run the full pipeline: discover, harvest, enrich, persist, score.
    Run,

    /// Discover candidate domains and write the domains file.
    Discover,

    /// Harvest and enrich contacts for the domains file.
    Harvest,

    /// Ingest existing audit reports and recompute scores.
    Audit,

    /// Reload the audits CSV and recompute lead scores.
    Score,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadscout=info",
        1 => "leadscout=debug",
        _ => "leadscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let manifest = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Init => cmd_init(),
        Command::Run => cmd_run(&manifest).await,
        Command::Discover => cmd_discover(&manifest).await,
        Command::Harvest => cmd_harvest(&manifest).await,
        Command::Audit => cmd_audit(&manifest).await,
        Command::Score => cmd_score(&manifest).await,
    }
}

fn cmd_init() -> Result<()> {
    let path = init_config()?;
    println!("Wrote default manifest to {}", path.display());
    Ok(())
}

async fn cmd_run(manifest: &Manifest) -> Result<()> {
    let renderer = BrowserRenderer::launch(&manifest.scrape.user_agent).await?;
    let progress = CliProgress::new();

    let result = run_pipeline(manifest, renderer, &progress).await?;

    println!(
        "Pipeline complete: {} domains, {} contacts, {} audits, {} scores in {:.1}s",
        result.domains_found,
        result.contacts_found,
        result.audits_ingested,
        result.scores_computed,
        result.elapsed.as_secs_f64(),
    );
    println!("Results → {}", manifest.io.contacts_csv);
    Ok(())
}

async fn cmd_discover(manifest: &Manifest) -> Result<()> {
    let discoverer = Discoverer::from_manifest(manifest)?;
    let domains = discoverer
        .discover(
            &manifest.discovery.keywords,
            &manifest.discovery.query_variants,
        )
        .await;
    write_domains_file(&domains, Path::new(&manifest.io.domains_file))?;

    info!(count = domains.len(), "discovery finished");
    for domain in &domains {
        println!("{domain}");
    }
    println!(
        "{} domains → {}",
        domains.len(),
        manifest.io.domains_file
    );
    Ok(())
}

async fn cmd_harvest(manifest: &Manifest) -> Result<()> {
    let renderer = BrowserRenderer::launch(&manifest.scrape.user_agent).await?;
    let leads = harvest_from_file(manifest, renderer).await?;

    println!(
        "{} contacts → {}",
        leads.len(),
        manifest.io.contacts_csv
    );
    Ok(())
}

async fn cmd_audit(manifest: &Manifest) -> Result<()> {
    let (ingested, scores) = ingest_audits(manifest).await?;
    println!(
        "{} audit rows ingested, {} domains scored",
        ingested,
        scores.len()
    );
    Ok(())
}

async fn cmd_score(manifest: &Manifest) -> Result<()> {
    let scores = rescore_from_csv(manifest).await?;
    for score in &scores {
        println!("{}\t{:.1}\t{}", score.domain, score.score, score.priority);
    }
    println!("{} domains scored", scores.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}").expect("spinner template"),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &PipelineResult) {
        self.spinner.finish_and_clear();
    }
}
