//! `deepvocab` CLI: load a corpus, maintain its aggregates, and query it.

use std::path::PathBuf;
use std::process::ExitCode;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use deepvocab::core::types::LemmaId;
use deepvocab::ranking::{CoreBand, LemmaOrder, LemmaQuery, PageRequest, WordListQuery, WordOrder};
use deepvocab::{Config, CorpusDatabase, Result};

#[derive(Debug, Parser)]
#[command(name = "deepvocab", about = "Corpus frequency and ranking engine")]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage directory (overrides the config file)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// `urn|label` file naming text groups and works
    #[arg(long, global = true)]
    labels: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load the editions, dictionary and passage-lemma files in order
    Import {
        editions: PathBuf,
        dictionary: PathBuf,
        passage_lemmas: PathBuf,
        /// Source label stored on every definition
        #[arg(long)]
        source: String,
        /// Delete existing passage facts first
        #[arg(long)]
        reload: bool,
    },
    /// Flag editions matching each URN prefix in the file as core
    MarkCore { prefixes: PathBuf },
    /// Recompute lemma counts, edition token counts and normalized forms
    Recompute,
    /// Delete every passage fact
    TruncatePassages,
    /// Snapshot the catalog and start a new WAL
    Checkpoint,
    Stats,
    /// List lemmas, optionally filtered by `*`-wildcard query and core band
    Lemmas {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        mincore: Option<f64>,
        #[arg(long)]
        maxcore: Option<f64>,
        #[arg(long, default_value = "core")]
        order: String,
        #[arg(long, default_value = "1")]
        page: String,
    },
    Lemma {
        id: u32,
        /// Only passages from this edition
        #[arg(long)]
        edition: Option<String>,
    },
    LemmaByText { text: String },
    Editions {
        #[arg(long)]
        core_only: bool,
    },
    /// Ranked vocabulary of an edition or a reference scope (`1.2`, `1.2*`, `1.1-1.5`)
    WordList {
        cts_urn: String,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        mincore: Option<f64>,
        #[arg(long)]
        maxcore: Option<f64>,
        #[arg(long, default_value = "count")]
        order: String,
    },
}

impl Command {
    fn writes(&self) -> bool {
        matches!(
            self,
            Command::Import { .. }
                | Command::MarkCore { .. }
                | Command::Recompute
                | Command::TruncatePassages
                | Command::Checkpoint
        )
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(data) = cli.data {
        config.storage_path = data;
    }

    let db = if cli.command.writes() {
        CorpusDatabase::open(config)?
    } else {
        CorpusDatabase::open_read_only(config)?
    };
    if let Some(labels) = &cli.labels {
        let count = db.load_labels(labels)?;
        tracing::debug!(count, "loaded catalog labels");
    }

    match cli.command {
        Command::Import { editions, dictionary, passage_lemmas, source, reload } => {
            if reload {
                db.truncate_passages()?;
            }
            let report = db.import_data(editions, dictionary, passage_lemmas, &source)?;
            db.checkpoint()?;
            print_json(&report)
        }
        Command::MarkCore { prefixes } => {
            let report = db.mark_core_file(prefixes)?;
            db.checkpoint()?;
            print_json(&report)
        }
        Command::Recompute => {
            let report = db.recompute_aggregates()?;
            db.checkpoint()?;
            print_json(&report)
        }
        Command::TruncatePassages => {
            let removed = db.truncate_passages()?;
            db.checkpoint()?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
        Command::Checkpoint => db.checkpoint(),
        Command::Stats => print_json(&db.stats()?),
        Command::Lemmas { query, mincore, maxcore, order, page } => {
            let query = LemmaQuery {
                query,
                band: CoreBand::new(mincore, maxcore),
                order: order.parse::<LemmaOrder>()?,
                page: PageRequest::parse(&page),
            };
            print_json(&db.list_lemmas(&query)?)
        }
        Command::Lemma { id, edition } => print_json(&db.lemma_detail(LemmaId(id), edition.as_deref())?),
        Command::LemmaByText { text } => print_json(&db.find_lemma_by_text(&text)?),
        Command::Editions { core_only } => print_json(&db.list_editions(core_only)),
        Command::WordList { cts_urn, scope, mincore, maxcore, order } => {
            let mut query = WordListQuery::new(cts_urn)
                .band(CoreBand::new(mincore, maxcore))
                .order(order.parse::<WordOrder>()?);
            if let Some(scope) = scope {
                query = query.scope(scope);
            }
            print_json(&*db.word_list(&query)?)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = ?e.kind, "{}", e.context);
            ExitCode::FAILURE
        }
    }
}
