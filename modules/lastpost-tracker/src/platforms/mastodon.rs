//! Mastodon fetcher. Two-step: resolve the account id on the handle's
//! home instance, then read its most recent status.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use lastpost_common::{Activity, Platform};

use super::{FetchError, FetchResult, PlatformFetcher};
use crate::pool::XSession;

pub struct MastodonFetcher {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Account {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    created_at: String,
}

impl MastodonFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }
}

impl Default for MastodonFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformFetcher for MastodonFetcher {
    fn platform(&self) -> Platform {
        Platform::Mastodon
    }

    async fn last_post(&self, handle: &str, _session: Option<&XSession>) -> FetchResult {
        let Some((user, instance)) = parse_handle(handle) else {
            return Err(FetchError::Transient(format!(
                "unrecognized mastodon handle format: {handle}"
            )));
        };

        // Step 1: resolve the account id.
        let lookup_url = format!("https://{instance}/api/v1/accounts/lookup");
        let resp = self
            .client
            .get(&lookup_url)
            .query(&[("acct", user)])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Transient(format!("lookup status {status}")));
        }
        let account: Account = resp.json().await?;

        // Step 2: most recent status.
        let statuses_url = format!("https://{instance}/api/v1/accounts/{}/statuses", account.id);
        let resp = self
            .client
            .get(&statuses_url)
            .query(&[("limit", "1")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Transient(format!("statuses status {status}")));
        }

        let statuses: Vec<Status> = resp.json().await?;
        match statuses.into_iter().next() {
            Some(s) => Ok(Activity::Posted(s.created_at)),
            None => {
                debug!(handle, "Account has no statuses");
                Ok(Activity::Unknown)
            }
        }
    }
}

/// Accepts `user@instance` and `@user@instance`.
fn parse_handle(handle: &str) -> Option<(&str, &str)> {
    let parts: Vec<&str> = handle.split('@').collect();
    match parts.as_slice() {
        [user, instance] => Some((*user, *instance)),
        ["", user, instance] => Some((*user, *instance)),
        _ => None,
    }
    .filter(|(user, instance)| !user.is_empty() && !instance.is_empty())
}
