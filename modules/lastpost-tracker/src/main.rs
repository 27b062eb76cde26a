use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lastpost_common::Config;
use lastpost_tracker::{merge, roster, stats, tracker::Tracker};
use lastpost_tracker::pool::SessionPool;
use lastpost_tracker::snapshot::SnapshotStore;
use wikidata_client::WikidataClient;

#[derive(Debug, Parser)]
#[command(name = "lastpost-tracker", about = "Refresh the last-post snapshot and stats")]
struct Args {
    /// Snapshot file (overrides SNAPSHOT_PATH).
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Stats output file (overrides STATS_PATH).
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Active-window in days for stats (overrides ACTIVE_WINDOW_DAYS).
    #[arg(long)]
    active_window_days: Option<i64>,

    /// Merge the roster and recompute stats without fetching anything.
    #[arg(long)]
    skip_refresh: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("lastpost_tracker=info".parse()?)
                .add_directive("wikidata_client=info".parse()?),
        )
        .init();

    let args = Args::parse();
    info!(run_id = %uuid::Uuid::new_v4(), "Lastpost tracker starting...");

    let mut config = Config::from_env();
    if let Some(path) = args.snapshot {
        config.snapshot_path = path;
    }
    if let Some(path) = args.stats {
        config.stats_path = path;
    }
    if let Some(days) = args.active_window_days {
        config.active_window_days = days;
    }
    config.log_effective();

    let store = SnapshotStore::new(&config.snapshot_path, &config.stats_path);
    let persisted = store
        .load()
        .context("Failed to load previous snapshot")?
        .unwrap_or_default();
    info!(entities = persisted.len(), "Loaded previous snapshot");

    // Discovery failures are fatal before any mutation: the previous
    // snapshot stays exactly as it was.
    let client = WikidataClient::new(&config.sparql_endpoint, &config.user_agent);
    let rows = client
        .fetch_roster()
        .await
        .context("Roster discovery failed")?;
    let discovered = roster::entities_from_rows(rows);
    info!(discovered = discovered.len(), "Roster discovery complete");

    let mut entities = merge::merge_roster(discovered, &persisted);
    info!(entities = entities.len(), "Merged roster against snapshot");

    if args.skip_refresh {
        entities.sort_by(|a, b| a.name.cmp(&b.name));
        let now = Utc::now();
        store.save(&entities)?;
        store.save_stats(&stats::compute(
            &entities,
            chrono::Duration::days(config.active_window_days),
            now,
        ))?;
        info!("Snapshot and stats written (refresh skipped)");
        return Ok(());
    }

    let pool = match &config.x_sessions_path {
        Some(path) => SessionPool::load(path)?,
        None => SessionPool::empty(),
    };

    let mut tracker = Tracker::new(&config, pool, store);
    let run = tracker.run(&mut entities).await?;
    info!("{run}");

    Ok(())
}
