//! ndcg-eval - Command-line NDCG evaluation of search pipelines.
//!
//! # Usage
//!
//! ```bash
//! # Evaluate a pipeline against the stored ideal rankings
//! ndcg-eval --pipeline ./pipelines/text-search.json
//!
//! # Custom cutoff, scoring method and store location
//! ndcg-eval --pipeline ./pipelines/text-search.json --k 5 --scoring decay --uri /srv/evals
//!
//! # Per-query scores and every DCG/IDCG step
//! ndcg-eval --pipeline ./pipelines/text-search.json --debug
//!
//! # Machine-readable report
//! ndcg-eval --pipeline ./pipelines/text-search.json --json
//! ```

mod config;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ndcg_core::config::{
    DEFAULT_EVAL_DATABASE, DEFAULT_K, DEFAULT_SEARCH_COLLECTION, DEFAULT_SEARCH_DATABASE,
    DEFAULT_SEARCH_INDEX, JUDGMENT_COLLECTION,
};
use ndcg_core::evaluation::{LogTrace, NoopTrace, TraceSink};
use ndcg_core::pipeline::{EvaluationRunner, JsonJudgmentStore, QueryTemplate, RecordedBackend};
use ndcg_core::{EvalOptions, ScoringMethod};
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Evaluate a search pipeline with NDCG against stored ideal rankings.
///
/// Judgments are read from `<store>/<eval-database>/ideal_rankings.json`;
/// engine responses are replayed from
/// `<store>/<search-database>/<search-collection>.results.json`.
#[derive(Parser)]
#[command(name = "ndcg-eval", version, about)]
struct Cli {
    /// Path to JSON file containing the query template
    #[arg(long)]
    pipeline: PathBuf,

    /// Number of top results to evaluate
    #[arg(long, default_value_t = DEFAULT_K, value_parser = parse_k)]
    k: usize,

    /// Relevance scoring method: binary, inverse_rank, decay or score
    #[arg(long, default_value = "binary")]
    scoring: ScoringMethod,

    /// Database holding the ideal rankings
    #[arg(long, short = 'd', default_value = DEFAULT_EVAL_DATABASE)]
    eval_database: String,

    /// Database holding the searched documents
    #[arg(long, alias = "sdb", default_value = DEFAULT_SEARCH_DATABASE)]
    search_database: String,

    /// Collection holding the searched documents
    #[arg(long, alias = "scol", default_value = DEFAULT_SEARCH_COLLECTION)]
    search_collection: String,

    /// Search index name substituted for {{INDEX_NAME}}
    #[arg(long, short = 'i', default_value = DEFAULT_SEARCH_INDEX)]
    search_index: String,

    /// Filter selecting which ideal rankings to evaluate, as JSON
    #[arg(long, short = 'q', alias = "qf", default_value = r#"{"type":"text"}"#)]
    query_filter: Value,

    /// Store location: directory path or file:// URI (default: $NDCG_STORE_URI, then platform data dir)
    #[arg(long)]
    uri: Option<String>,

    /// Show per-query scores and trace every DCG/IDCG step
    #[arg(long)]
    debug: bool,

    /// Output the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_k(s: &str) -> Result<usize, String> {
    let k: usize = s.parse().map_err(|e| format!("{e}"))?;
    if k == 0 {
        return Err("k must be at least 1".to_string());
    }
    Ok(k)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = config::store_root(cli.uri.as_deref())?;
    info!("Using store at {}", root.display());

    let template = QueryTemplate::load(&cli.pipeline)
        .with_context(|| format!("Failed to load pipeline: {}", cli.pipeline.display()))?;
    info!("Loaded pipeline with {} stages", template.len());

    let store = JsonJudgmentStore::new(&root, &cli.eval_database, JUDGMENT_COLLECTION);
    let recordings =
        config::recordings_path(&root, &cli.search_database, &cli.search_collection);
    let backend = RecordedBackend::load(&recordings)
        .with_context(|| format!("Failed to load recorded results: {}", recordings.display()))?;

    let options = EvalOptions::new(cli.k, cli.scoring);
    let runner = EvaluationRunner::new(&template, &store, &backend, &cli.search_index, options);

    let pb = if cli.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")
            .context("Invalid progress bar template")?,
    );
    pb.set_message("Queries");

    let mut log_trace = LogTrace;
    let mut noop_trace = NoopTrace;
    let sink: &mut dyn TraceSink = if cli.debug {
        &mut log_trace
    } else {
        &mut noop_trace
    };

    let run = runner
        .run_with(&cli.query_filter, sink, |progress| {
            pb.set_length(progress.total as u64);
            pb.set_position(progress.completed as u64);
        })
        .with_context(|| format!("Failed to read judgments from {}", store.path().display()))?;
    pb.finish_and_clear();

    let report = if cli.json {
        output::format_json(&run, cli.k, cli.scoring)?
    } else {
        output::format_human(&run, cli.k, cli.scoring, cli.debug)
    };
    println!("{}", report);

    Ok(())
}
