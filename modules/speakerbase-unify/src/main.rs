use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use speakerbase_common::Config;
use speakerbase_store::{DocumentStore, MongoStore};
use speakerbase_unify::{CanonicalReport, Pipeline, SourceInventory, TopicVocabulary};

#[derive(Parser)]
#[command(name = "speakerbase", about = "Unify scraped speaker profiles into one collection")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform, resolve and write every source (default)
    Run,
    /// List source collections and their sizes
    Inventory,
    /// Summarize the unified collection
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("speakerbase=info".parse()?))
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    let store = MongoStore::connect(
        &config.mongo_uri,
        &config.target_database,
        &config.target_collection,
        config.store_timeout,
    )
    .await?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(store, config).await,
        Commands::Inventory => {
            store.ping().await?;
            let inventory = SourceInventory::collect(&store).await?;
            println!("{inventory}");
            Ok(())
        }
        Commands::Report => {
            store.ping().await?;
            let report = CanonicalReport::collect(&store).await?;
            println!("{report}");
            Ok(())
        }
    }
}

async fn run(store: MongoStore, config: Config) -> Result<()> {
    info!("Speaker unification starting...");

    let vocabulary = TopicVocabulary::load(&config.topic_mapping_path)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current batch");
            flag.store(true, Ordering::Relaxed);
        }
    });

    let pipeline = Pipeline::new(Arc::new(store), vocabulary, config);
    let stats = pipeline.run(cancel).await?;
    info!("{stats}");
    Ok(())
}
