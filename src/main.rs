use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mnemos::config::config::StorageBackend;
use mnemos::config::{AppConfig, ConfigLoader};
use mnemos::engine::Engine;
use mnemos::models::review::{Difficulty, DueFilter};
use mnemos::observability::init_logging;
use serde::Serialize;
use tracing::info;

#[derive(Parser)]
#[command(name = "mnemos", about = "Vocabulary sessions and spaced review", version)]
struct Cli {
    /// Configuration file (default: ./mnemos.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Vocabulary corpus JSON, overrides the configured path
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Directory for the file-backed store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the sessions of one category, or of all of them
    Sessions {
        category: Option<String>,
    },

    /// Rate an item
    Rate {
        item_id: String,
        /// hard, medium or easy
        difficulty: Difficulty,
    },

    /// Items due for review, hardest first
    Due {
        /// all, hard, medium or easy
        #[arg(long, default_value = "all")]
        filter: DueFilter,
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Review counts per difficulty
    Stats,

    /// Completion per category
    Progress {
        category: Option<String>,
    },

    /// Mark a session completed
    Complete {
        /// Session id, e.g. "animals:2"
        session_id: String,
    },

    /// Suggest the next mode to study with
    Recommend,

    /// Registered modes and their usage
    Modes,

    /// Delete all review records and completed sessions
    Reset {
        /// Required, the reset cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

fn print<T: Serialize>(json: bool, value: &T, plain: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        plain(value);
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ConfigLoader::load().context("loading config")?,
    };
    ConfigLoader::validate(&config)?;

    if let Some(corpus) = &cli.corpus {
        config.session.corpus_path = corpus.clone();
    }
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    // state has to outlive a single invocation
    config.storage.backend = StorageBackend::File;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _guard = init_logging(&config.logging);

    info!("Starting {} ({})", config.app_name, config.environment);

    let engine = Engine::from_config(config)
        .await
        .context("initializing engine")?;

    run(&engine, cli.command, cli.json).await
}

async fn run(engine: &Engine, command: Command, json: bool) -> anyhow::Result<()> {
    match command {
        Command::Sessions { category } => {
            if let Some(category) = &category {
                if engine.corpus.category(category).is_none() {
                    anyhow::bail!("unknown category: {}", category);
                }
            }
            let mut rows = Vec::new();
            for (category_id, sessions) in engine.partitioner.partition_corpus(&engine.corpus) {
                if category.as_deref().is_some_and(|c| c != category_id) {
                    continue;
                }
                for session in sessions {
                    let completed = engine.progress.is_completed(&session.id()).await;
                    rows.push(serde_json::json!({
                        "session_id": session.id(),
                        "items": session.len(),
                        "tier_range": session.tier_range,
                        "primary_tier": session.primary_tier,
                        "completed": completed,
                    }));
                }
            }
            print(json, &rows, |rows| {
                for row in rows {
                    println!(
                        "{:<24} {:>3} items  tier {:<5} {}",
                        row["session_id"].as_str().unwrap_or_default(),
                        row["items"],
                        row["tier_range"].as_str().unwrap_or_default(),
                        if row["completed"] == true { "done" } else { "" }
                    );
                }
            })
        }
        Command::Rate {
            item_id,
            difficulty,
        } => {
            let record = engine.scheduler.rate(&item_id, difficulty).await?;
            print(json, &record, |r| {
                println!(
                    "{} rated {} ({} ratings), next due {}",
                    r.item_id, r.difficulty, r.rating_count, r.next_due
                );
            })
        }
        Command::Due { filter, limit } => {
            let records = engine.scheduler.due_records(filter, limit).await;
            print(json, &records, |records| {
                if records.is_empty() {
                    println!("Nothing due");
                }
                for r in records {
                    let text = engine
                        .corpus
                        .find_item(&r.item_id)
                        .map(|item| item.text.as_str())
                        .unwrap_or("?");
                    println!("{:<8} {:<20} {}", r.difficulty, r.item_id, text);
                }
            })
        }
        Command::Stats => {
            let stats = engine.scheduler.stats().await;
            print(json, &stats, |stats| {
                for (difficulty, bucket) in stats {
                    println!(
                        "{:<8} total {:>4}  due {:>4}  upcoming {:>4}",
                        difficulty, bucket.total, bucket.due, bucket.upcoming_within_24h
                    );
                }
            })
        }
        Command::Progress { category } => {
            let ids: Vec<String> = match category {
                Some(category) => vec![category],
                None => engine.corpus.category_ids().map(str::to_string).collect(),
            };
            let mut rows = Vec::new();
            for id in ids {
                let progress = engine.progress.progress_for(&id).await?;
                rows.push((id, progress));
            }
            print(json, &rows, |rows| {
                for (id, p) in rows {
                    println!(
                        "{:<20} {:>3}/{:<3} {:>5.1}%",
                        id, p.completed, p.total, p.percentage
                    );
                }
            })
        }
        Command::Complete { session_id } => {
            let (session, _) = engine
                .partitioner
                .find_session(&engine.corpus, &session_id)?;
            engine
                .progress
                .mark_completed(&session_id, &session.item_ids())
                .await?;
            print(json, &session_id, |id| println!("Completed {}", id))
        }
        Command::Recommend => {
            let recommendation = engine.manager.recommend().await;
            print(json, &recommendation, |r| {
                println!("{}: {}", r.mode_id, r.reason)
            })
        }
        Command::Modes => {
            let mut rows = Vec::new();
            for descriptor in engine.manager.registry().list() {
                let metrics = engine.manager.metrics().get(&descriptor.id).await;
                rows.push((descriptor, metrics));
            }
            print(json, &rows, |rows| {
                for (d, m) in rows {
                    println!(
                        "{:<12} {:<12} runs {:>3}  interactions {:>4}",
                        d.id, d.label, m.sessions_run, m.interactions
                    );
                }
            })
        }
        Command::Reset { yes } => {
            if !yes {
                anyhow::bail!("refusing to reset without --yes");
            }
            engine.scheduler.reset().await?;
            print(json, &"reset", |_| println!("Review records and progress cleared"))
        }
    }
}
