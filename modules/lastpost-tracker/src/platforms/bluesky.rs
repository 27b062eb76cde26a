//! Bluesky fetcher. Uses the public AppView, no authentication.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use lastpost_common::{Activity, Platform};

use super::{FetchError, FetchResult, PlatformFetcher};
use crate::pool::XSession;

const FEED_URL: &str = "https://public.api.bsky.app/xrpc/app.bsky.feed.getAuthorFeed";

pub struct BlueskyFetcher {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AuthorFeed {
    #[serde(default)]
    feed: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    post: FeedPost,
}

#[derive(Debug, Deserialize)]
struct FeedPost {
    #[serde(rename = "indexedAt")]
    indexed_at: String,
}

/// XRPC error body, e.g. `{"error":"InvalidRequest","message":"Profile not found"}`.
#[derive(Debug, Deserialize)]
struct XrpcError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

impl BlueskyFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }
}

impl Default for BlueskyFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformFetcher for BlueskyFetcher {
    fn platform(&self) -> Platform {
        Platform::Bluesky
    }

    async fn last_post(&self, handle: &str, _session: Option<&XSession>) -> FetchResult {
        let resp = self
            .client
            .get(FEED_URL)
            .query(&[("actor", handle), ("limit", "1")])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_xrpc_error(&body));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Transient(format!("status {status}: {body}")));
        }

        let feed: AuthorFeed = resp.json().await?;
        match feed.feed.into_iter().next() {
            Some(item) => Ok(Activity::Posted(item.post.indexed_at)),
            None => {
                debug!(handle, "Author feed is empty");
                Ok(Activity::Unknown)
            }
        }
    }
}

/// The AppView reports gone accounts through 400-level XRPC errors rather
/// than a 404.
fn classify_xrpc_error(body: &str) -> FetchError {
    let parsed: XrpcError = serde_json::from_str(body).unwrap_or(XrpcError {
        error: String::new(),
        message: String::new(),
    });

    let gone = matches!(
        parsed.error.as_str(),
        "AccountDeactivated" | "AccountTakedown" | "AccountSuspended"
    ) || parsed.message.to_ascii_lowercase().contains("not found");

    if gone {
        FetchError::NotFound
    } else {
        FetchError::Transient(format!("{}: {}", parsed.error, parsed.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_not_found_maps_to_not_found() {
        let err = classify_xrpc_error(r#"{"error":"InvalidRequest","message":"Profile not found"}"#);
        assert!(matches!(err, FetchError::NotFound));
    }

    #[test]
    fn deactivated_account_maps_to_not_found() {
        let err = classify_xrpc_error(
            r#"{"error":"AccountDeactivated","message":"Account is deactivated"}"#,
        );
        assert!(matches!(err, FetchError::NotFound));
    }

    #[test]
    fn other_bad_requests_are_transient() {
        let err = classify_xrpc_error(r#"{"error":"InvalidRequest","message":"actor is invalid"}"#);
        assert!(matches!(err, FetchError::Transient(_)));
    }

    #[test]
    fn garbage_body_is_transient() {
        assert!(matches!(classify_xrpc_error("<html>"), FetchError::Transient(_)));
    }

    #[test]
    fn feed_parses_to_indexed_at() {
        let feed: AuthorFeed = serde_json::from_str(
            r#"{"feed":[{"post":{"uri":"at://x","indexedAt":"2026-03-01T10:00:00.000Z"}}]}"#,
        )
        .unwrap();
        assert_eq!(feed.feed[0].post.indexed_at, "2026-03-01T10:00:00.000Z");
    }
}
