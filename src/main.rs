use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use transmatch_core::config::{self, Config, LanguagePreference};
use transmatch_core::protocol::BridgeClient;
use transmatch_core::services::pipeline::{self, PipelineConfig, PipelineReport};
use transmatch_core::services::ranking::RankingStrategy;
use transmatch_core::services::reconcile::ReconcileOutcome;
use transmatch_core::services::{indexer, store};

#[derive(Parser)]
#[command(name = "transmatch-core", version, about = "Translation pack discovery and subscription")]
struct Cli {
    /// Config file (defaults: $TRANSMATCH_CONFIG, ./transmatch.toml, user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the translation index from crawler chunk files
    Index {
        /// Directory holding the chunk *.json files
        #[arg(long)]
        input: Option<PathBuf>,

        /// Index file to write
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Pick the best translation per subscribed item and subscribe to it
    Subscribe {
        /// Index file written by `index`
        #[arg(long)]
        index: Option<PathBuf>,

        /// 1 = simplified, 2 = traditional
        #[arg(long)]
        lang: Option<LanguagePreference>,

        /// Print what would be subscribed without subscribing
        #[arg(long)]
        dry_run: bool,

        /// tiered or raw-metric
        #[arg(long)]
        ranking: Option<RankingStrategy>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Index { input, output } => {
            if let Some(input) = input {
                config.index.input_dir = input;
            }
            if let Some(output) = output {
                config.index.output = output;
            }
            run_index(&config)
        }
        Commands::Subscribe {
            index,
            lang,
            dry_run,
            ranking,
        } => {
            if let Some(index) = index {
                config.subscribe.index_file = index;
            }
            if let Some(lang) = lang {
                config.subscribe.language = lang;
            }
            if let Some(ranking) = ranking {
                config.subscribe.ranking = ranking;
            }
            config.subscribe.dry_run |= dry_run;
            run_subscribe(&config).await
        }
    }
}

fn run_index(config: &Config) -> Result<ExitCode> {
    let (index, report) = indexer::build_from_dir(
        &config.index.input_dir,
        config.classifier,
        config.index.skip_duplicate_chunks,
    )?;

    store::save(&config.index.output, &index)
        .with_context(|| format!("failed to write {}", config.index.output.display()))?;

    println!(
        "Indexed {} originals with {} candidate translations ({} chunks read, {} skipped, {} duplicates).",
        report.originals,
        index.candidate_count(),
        report.chunks_read,
        report.chunks_skipped,
        report.duplicate_chunks
    );
    if !report.warnings.is_empty() {
        println!("{} warnings, see log output.", report.warnings.len());
    }
    println!("Index written to {}", config.index.output.display());

    Ok(ExitCode::SUCCESS)
}

async fn run_subscribe(config: &Config) -> Result<ExitCode> {
    let sub = &config.subscribe;
    let language = sub.language.variant();
    info!(%language, app_id = sub.app_id, dry_run = sub.dry_run, "Starting subscription run");

    let client = BridgeClient::spawn(&sub.bridge, config.bridge_timeout())
        .context("subscription client unavailable")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current cycle");
            on_signal.cancel();
        }
    });

    let ranking = config.ranking_policy();
    let report = pipeline::run(
        &client,
        PipelineConfig {
            app_id: sub.app_id,
            index_file: &sub.index_file,
            classifier: config.classifier,
            language,
            ranking: &*ranking,
            verify: config.verify_policy(),
            dry_run: sub.dry_run,
        },
        cancel,
    )
    .await?;

    Ok(print_report(&report))
}

fn print_report(report: &PipelineReport) -> ExitCode {
    println!(
        "{} subscribed items, {} with known translations, {} picks.",
        report.subscribed_before, report.originals_considered, report.selected
    );

    if report.plan.is_empty() {
        println!("No missing translations found.");
        return ExitCode::SUCCESS;
    }

    if report.dry_run {
        for item in &report.plan.pending {
            println!("[dry-run] {} -> {} (ID: {})", item.origin, item.title, item.id);
        }
        println!("{} subscriptions would be requested.", report.plan.pending.len());
        return ExitCode::SUCCESS;
    }

    let Some(reconcile) = &report.reconcile else {
        return ExitCode::SUCCESS;
    };

    match &reconcile.outcome {
        ReconcileOutcome::Converged { cycle } => {
            println!(
                "Subscribed {} translations (confirmed after {} checks).",
                report.plan.targets.len(),
                cycle
            );
            ExitCode::SUCCESS
        }
        ReconcileOutcome::PartiallyFailed { missing } | ReconcileOutcome::Cancelled { missing } => {
            println!("{} translations were not confirmed:", missing.len());
            for id in missing {
                println!("  {} ({})", id, report.plan.title_of(id));
            }
            println!("Re-run later to retry.");
            ExitCode::FAILURE
        }
    }
}
