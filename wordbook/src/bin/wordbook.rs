//! Command-line front end: look words up and manage search history
//!
//! Run: cargo run --bin wordbook -- lookup serendipity

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordbook::reconcile::HistoryReconciler;
use wordbook::similarity::similarity_score;
use wordbook::{
    FreeDictionaryClient, HistoryStore, LookupStatus, SearchCoordinator, SearchEvent,
    SqliteHistoryStore, WordItem, WordbookConfig,
};

#[derive(Parser)]
#[command(name = "wordbook", version, about = "Dictionary lookups with ranked search history")]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// History database, overrides the config file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look a word up and record it in history
    Lookup { word: String },
    /// Show history ranked against a query, or most recent first without one
    History {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Remove a word from history
    Delete { word: String },
    /// Remove every word from history
    Clear,
    /// Similarity score of a candidate against a query
    Score { candidate: String, query: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordbook=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score { candidate, query } => {
            println!("{}", similarity_score(&candidate, &query));
            Ok(())
        }
        Commands::Lookup { word } => {
            let (config, store) = open_store(cli.config, cli.db)?;
            lookup(&config, store, word).await
        }
        Commands::History { query, limit } => {
            let (config, store) = open_store(cli.config, cli.db)?;
            let limit = limit.unwrap_or(config.history_display_limit);
            let reconciler = HistoryReconciler::new(store);
            let words = if query.is_empty() {
                reconciler.by_recency().await?
            } else {
                reconciler.reconcile(&query).await?
            };
            for word in words.iter().take(limit) {
                println!("{word}");
            }
            Ok(())
        }
        Commands::Delete { word } => {
            let (_, store) = open_store(cli.config, cli.db)?;
            if !store.delete(word.clone()).await? {
                bail!("'{word}' is not in history");
            }
            println!("Deleted {word}");
            Ok(())
        }
        Commands::Clear => {
            let (_, store) = open_store(cli.config, cli.db)?;
            let removed = store.clear().await?;
            println!("Removed {removed} entries");
            Ok(())
        }
    }
}

/// Load configuration, apply `--db`, and open the history database
fn open_store(
    config_path: Option<PathBuf>,
    db: Option<PathBuf>,
) -> Result<(WordbookConfig, Arc<SqliteHistoryStore>)> {
    let mut config = WordbookConfig::load(config_path.as_deref())?;
    if let Some(db) = db {
        config.database_path = db;
    }

    let store = SqliteHistoryStore::new(config.database_path.to_string_lossy().into_owned())
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    Ok((config, Arc::new(store)))
}

async fn lookup(
    config: &WordbookConfig,
    store: Arc<SqliteHistoryStore>,
    word: String,
) -> Result<()> {
    let client = FreeDictionaryClient::new(&config.api_base_url, config.request_timeout())?;
    let coordinator = SearchCoordinator::new(Arc::new(client), store, "");

    coordinator.set_query(word, false)?;
    coordinator.confirm_search()?;
    let state = coordinator.wait_for_lookup().await?;

    coordinator.submit(SearchEvent::DeferredResortTrigger)?;
    coordinator.flush().await?;
    let history = coordinator.snapshot();

    if let Some(error) = &history.history_error {
        tracing::warn!(error = %error, "search history not updated");
    }

    match state.lookup_status {
        LookupStatus::Success(item) => print_item(&item),
        LookupStatus::Error(message) => bail!(message),
        LookupStatus::Idle | LookupStatus::Loading => bail!("lookup did not finish"),
    }

    let recent = history.visible_history(config.history_display_limit);
    if !recent.is_empty() {
        println!();
        println!("History: {}", recent.join(", "));
    }
    Ok(())
}

fn print_item(item: &WordItem) {
    if item.phonetic.is_empty() {
        println!("{}", item.word);
    } else {
        println!("{}  {}", item.word, item.phonetic);
    }
    if let Some(audio) = &item.audio_url {
        println!("  audio: {audio}");
    }
    for meaning in &item.meanings {
        println!();
        println!("  {}", meaning.part_of_speech);
        println!("    {}", meaning.definition.definition);
        if !meaning.definition.example.is_empty() {
            println!("    \"{}\"", meaning.definition.example);
        }
    }
}
