use std::env;
use std::path::PathBuf;

use tracing::info;

use crate::types::Platform;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Persistence
    pub snapshot_path: PathBuf,
    pub stats_path: PathBuf,

    // Roster discovery
    pub sparql_endpoint: String,
    pub user_agent: String,

    // Refresh
    pub platforms: Vec<Platform>,
    pub x_sessions_path: Option<PathBuf>,
    pub fetch_delay_ms: u64,
    pub x_fetch_delay_ms: u64,

    // Stats
    pub active_window_days: i64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if a variable fails to parse.
    pub fn from_env() -> Self {
        Self {
            snapshot_path: env_or("SNAPSHOT_PATH", "data.json").into(),
            stats_path: env_or("STATS_PATH", "stats.json").into(),
            sparql_endpoint: env_or("SPARQL_ENDPOINT", "https://query.wikidata.org/sparql"),
            user_agent: env_or("USER_AGENT", "lastpost/0.1"),
            platforms: parse_platforms(&env_or("PLATFORMS", "x,bluesky,mastodon")),
            x_sessions_path: env::var("X_SESSIONS_FILE").ok().map(PathBuf::from),
            fetch_delay_ms: env_or("FETCH_DELAY_MS", "200")
                .parse()
                .expect("FETCH_DELAY_MS must be a number"),
            x_fetch_delay_ms: env_or("X_FETCH_DELAY_MS", "1000")
                .parse()
                .expect("X_FETCH_DELAY_MS must be a number"),
            active_window_days: env_or("ACTIVE_WINDOW_DAYS", "90")
                .parse()
                .expect("ACTIVE_WINDOW_DAYS must be a number"),
        }
    }

    /// Log the effective configuration. Session credentials live in the
    /// sessions file, never in env, so only the path's presence is logged.
    pub fn log_effective(&self) {
        info!(
            snapshot = %self.snapshot_path.display(),
            stats = %self.stats_path.display(),
            platforms = ?self.platforms,
            x_sessions = self.x_sessions_path.is_some(),
            active_window_days = self.active_window_days,
            "Configuration loaded"
        );
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_platforms(raw: &str) -> Vec<Platform> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.parse()
                .unwrap_or_else(|e| panic!("PLATFORMS is invalid: {e}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_platforms_splits_and_trims() {
        assert_eq!(
            parse_platforms("x, bluesky,mastodon"),
            vec![Platform::X, Platform::Bluesky, Platform::Mastodon]
        );
        assert_eq!(parse_platforms("bluesky"), vec![Platform::Bluesky]);
        assert!(parse_platforms("").is_empty());
    }

    #[test]
    #[should_panic(expected = "PLATFORMS is invalid")]
    fn parse_platforms_rejects_unknown() {
        parse_platforms("x,myspace");
    }
}
