//! The refresh loop.
//!
//! Entities are processed strictly sequentially, in roster order, and
//! platforms within an entity in registry order. All network access is
//! serialized on purpose: the third parties rate-limit aggressively and
//! a paced single-file crawl is the polite shape for a roster this size.
//! After every entity that actually changed, the full snapshot and the
//! stats are re-persisted so a killed run keeps everything but the entity
//! in flight.

use std::collections::BTreeMap;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use lastpost_common::{Activity, Config, Entity, Platform};

use crate::platforms::{self, FetchError, PlatformFetcher};
use crate::pool::SessionPool;
use crate::scheduler::RefreshPolicy;
use crate::snapshot::SnapshotStore;
use crate::stats;

/// Stats from a tracker run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub entities: u32,
    pub skipped: u32,
    pub refreshed: u32,
    pub unchanged: u32,
    pub closed_found: u32,
    pub protected_found: u32,
    pub fetched: BTreeMap<Platform, u32>,
    pub failed: BTreeMap<Platform, u32>,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Tracker Run Complete ===")?;
        writeln!(f, "Entities:        {}", self.entities)?;
        writeln!(f, "Skipped:         {}", self.skipped)?;
        writeln!(f, "Refreshed:       {}", self.refreshed)?;
        writeln!(f, "Unchanged:       {}", self.unchanged)?;
        writeln!(f, "Closed found:    {}", self.closed_found)?;
        writeln!(f, "Protected found: {}", self.protected_found)?;
        writeln!(f, "\nBy platform:")?;
        for platform in Platform::ALL {
            let fetched = self.fetched.get(&platform).copied().unwrap_or(0);
            let failed = self.failed.get(&platform).copied().unwrap_or(0);
            if fetched + failed > 0 {
                writeln!(f, "  {platform}: {fetched} fetched, {failed} failed")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RefreshOutcome {
    /// At least one account produced a definitive result this run.
    probed: bool,
    /// At least one `last_post` actually changed.
    mutated: bool,
}

pub struct Tracker {
    fetchers: Vec<Box<dyn PlatformFetcher>>,
    pool: SessionPool,
    policy: RefreshPolicy,
    store: SnapshotStore,
    window: Duration,
    fetch_delay: StdDuration,
    x_fetch_delay: StdDuration,
}

impl Tracker {
    pub fn new(config: &Config, pool: SessionPool, store: SnapshotStore) -> Self {
        if pool.is_empty() && config.platforms.contains(&Platform::X) {
            warn!("No X sessions configured; X accounts will not be refreshed");
        }
        Self {
            fetchers: platforms::registry(&config.platforms),
            pool,
            policy: RefreshPolicy::default(),
            store,
            window: Duration::days(config.active_window_days),
            fetch_delay: StdDuration::from_millis(config.fetch_delay_ms),
            x_fetch_delay: StdDuration::from_millis(config.x_fetch_delay_ms),
        }
    }

    /// Refresh every due entity in place, persisting incrementally, then
    /// sort by name and write the final snapshot and stats.
    pub async fn run(&mut self, entities: &mut Vec<Entity>) -> Result<RunStats> {
        let mut run_stats = RunStats {
            entities: entities.len() as u32,
            ..RunStats::default()
        };
        let total = entities.len();

        for idx in 0..total {
            let now = Utc::now();
            if self.policy.should_skip(&entities[idx], now) {
                debug!(id = %entities[idx].id, "Recently checked and dormant, skipping");
                run_stats.skipped += 1;
                continue;
            }

            let outcome = {
                let entity = &mut entities[idx];
                info!(i = idx + 1, total, id = %entity.id, name = %entity.name, "Refreshing");
                self.refresh_entity(entity, &mut run_stats).await
            };

            if outcome.probed {
                entities[idx].last_check = Some(now);
            }
            if outcome.mutated {
                run_stats.refreshed += 1;
                self.persist(entities, now)
                    .context("Incremental persistence failed")?;
            } else if outcome.probed {
                run_stats.unchanged += 1;
            }
        }

        entities.sort_by(|a, b| a.name.cmp(&b.name));
        self.persist(entities, Utc::now())
            .context("Final persistence failed")?;

        Ok(run_stats)
    }

    async fn refresh_entity(&mut self, entity: &mut Entity, run_stats: &mut RunStats) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::default();

        for fetcher in &self.fetchers {
            let platform = fetcher.platform();
            let Some(account) = entity.accounts.get(&platform) else {
                continue;
            };
            if account.last_post.is_closed() {
                continue;
            }
            let handle = account.handle.clone();

            let session = if fetcher.needs_session() {
                match self.pool.current() {
                    Some(s) => Some(s.clone()),
                    None => {
                        debug!(%platform, handle, "No session available, leaving account untouched");
                        continue;
                    }
                }
            } else {
                None
            };

            let result = fetcher.last_post(&handle, session.as_ref()).await;
            if session.is_some() {
                self.pool.advance();
            }

            let resolved = match result {
                Ok(activity) => Some(activity),
                Err(FetchError::NotFound) => Some(Activity::Closed),
                Err(FetchError::Forbidden) => Some(Activity::Protected),
                Err(FetchError::Transient(e)) => {
                    warn!(%platform, handle, error = %e, "Fetch failed, keeping existing value");
                    *run_stats.failed.entry(platform).or_insert(0) += 1;
                    None
                }
            };

            if let Some(new_post) = resolved {
                outcome.probed = true;
                *run_stats.fetched.entry(platform).or_insert(0) += 1;
                if let Some(slot) = entity.accounts.get_mut(&platform) {
                    if slot.last_post != new_post {
                        info!(%platform, handle, last_post = ?new_post, "Account updated");
                        match new_post {
                            Activity::Closed => run_stats.closed_found += 1,
                            Activity::Protected => run_stats.protected_found += 1,
                            _ => {}
                        }
                        slot.last_post = new_post;
                        outcome.mutated = true;
                    }
                }
            }

            let delay = if platform == Platform::X {
                self.x_fetch_delay
            } else {
                self.fetch_delay
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        outcome
    }

    fn persist(&self, entities: &[Entity], now: DateTime<Utc>) -> Result<()> {
        self.store.save(entities)?;
        let activity_stats = stats::compute(entities, self.window, now);
        self.store.save_stats(&activity_stats)?;
        Ok(())
    }
}
