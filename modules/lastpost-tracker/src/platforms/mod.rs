//! Platform fetchers.
//!
//! One fetcher per platform, all behind [`PlatformFetcher`]. The
//! orchestrator iterates a registry built from the configured platform
//! list instead of hardcoding per-platform branches.

pub mod bluesky;
pub mod mastodon;
pub mod x;

use async_trait::async_trait;
use thiserror::Error;

use lastpost_common::{Activity, Platform};

use crate::pool::XSession;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The account does not exist (deleted, suspended, renamed away).
    #[error("account not found")]
    NotFound,

    /// The account exists but its posts are not visible to us.
    #[error("account is protected")]
    Forbidden,

    /// Anything that may succeed next run: timeouts, 5xx, rate limits.
    #[error("transient fetch failure: {0}")]
    Transient(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transient(err.to_string())
    }
}

pub type FetchResult = std::result::Result<Activity, FetchError>;

#[async_trait]
pub trait PlatformFetcher: Send + Sync {
    fn platform(&self) -> Platform;

    /// Whether this fetcher needs an authenticated session from the pool.
    fn needs_session(&self) -> bool {
        false
    }

    /// Probe one account for its most recent activity. `session` is
    /// `Some` exactly when [`needs_session`] is true and the pool had one
    /// to give.
    ///
    /// [`needs_session`]: PlatformFetcher::needs_session
    async fn last_post(&self, handle: &str, session: Option<&XSession>) -> FetchResult;
}

/// Build the fetcher registry for the enabled platforms, in probe order.
pub fn registry(enabled: &[Platform]) -> Vec<Box<dyn PlatformFetcher>> {
    Platform::ALL
        .into_iter()
        .filter(|p| enabled.contains(p))
        .map(|p| -> Box<dyn PlatformFetcher> {
            match p {
                Platform::X => Box::new(x::XFetcher::new()),
                Platform::Bluesky => Box::new(bluesky::BlueskyFetcher::new()),
                Platform::Mastodon => Box::new(mastodon::MastodonFetcher::new()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_follows_probe_order_not_config_order() {
        let fetchers = registry(&[Platform::Mastodon, Platform::X]);
        let platforms: Vec<_> = fetchers.iter().map(|f| f.platform()).collect();
        assert_eq!(platforms, vec![Platform::X, Platform::Mastodon]);
    }

    #[test]
    fn registry_of_disabled_platform_is_empty() {
        assert!(registry(&[]).is_empty());
    }

    #[test]
    fn only_x_needs_a_session() {
        for fetcher in registry(&Platform::ALL) {
            assert_eq!(fetcher.needs_session(), fetcher.platform() == Platform::X);
        }
    }
}
