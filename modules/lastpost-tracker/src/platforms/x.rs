//! X fetcher. Talks to the GraphQL API of the web client using the
//! cookie pair from a pooled session; there is no public unauthenticated
//! endpoint left for timelines.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::debug;

use lastpost_common::{Activity, Platform};

use super::{FetchError, FetchResult, PlatformFetcher};
use crate::pool::XSession;

const API_BASE: &str = "https://x.com/i/api/graphql";

/// The web client's public bearer token; authorization actually comes
/// from the session cookies.
const BEARER: &str = "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";

/// GraphQL operation ids rotate with front-end deploys; update these when
/// the API starts returning 404 for them.
const USER_BY_SCREEN_NAME_OP: &str = "G3KGOASz96M-Qu0nwmGXNg/UserByScreenName";
const USER_TWEETS_OP: &str = "E3opETHurmVJflFsUBVuUQ/UserTweets";

const USER_FEATURES: &str = r#"{"hidden_profile_subscriptions_enabled":true,"subscriptions_verification_info_is_identity_verified_enabled":true,"highlights_tweets_tab_ui_enabled":true,"creator_subscriptions_tweet_preview_api_enabled":true,"responsive_web_graphql_exclude_directive_enabled":true,"verified_phone_label_enabled":false,"responsive_web_graphql_skip_user_profile_image_extensions_enabled":false,"responsive_web_graphql_timeline_navigation_enabled":true}"#;

const TWEETS_FEATURES: &str = r#"{"creator_subscriptions_tweet_preview_api_enabled":true,"communities_web_enable_tweet_community_results_fetch":true,"tweetypie_unmention_optimization_enabled":true,"responsive_web_edit_tweet_api_enabled":true,"graphql_is_translatable_rweb_tweet_is_translatable_enabled":true,"view_counts_everywhere_api_enabled":true,"longform_notetweets_consumption_enabled":true,"freedom_of_speech_not_reach_fetch_enabled":true,"standardized_nudges_misinfo":true,"longform_notetweets_rich_text_read_enabled":true,"responsive_web_graphql_exclude_directive_enabled":true,"verified_phone_label_enabled":false,"responsive_web_graphql_skip_user_profile_image_extensions_enabled":false,"responsive_web_graphql_timeline_navigation_enabled":true,"responsive_web_enhance_cards_enabled":false}"#;

pub struct XFetcher {
    client: reqwest::Client,
}

struct XUser {
    rest_id: String,
    protected: bool,
}

impl XFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }

    async fn call(&self, op: &str, variables: Value, features: &str, session: &XSession) -> Result<Value, FetchError> {
        let url = format!("{API_BASE}/{op}");
        let variables = variables.to_string();
        let resp = self
            .client
            .get(&url)
            .bearer_auth(BEARER)
            .header(
                reqwest::header::COOKIE,
                format!("auth_token={}; ct0={}", session.auth_token, session.csrf_token),
            )
            .header("x-csrf-token", &session.csrf_token)
            .query(&[("variables", variables.as_str()), ("features", features)])
            .send()
            .await?;

        let status = resp.status();
        match status.as_u16() {
            200 => {}
            404 => return Err(FetchError::NotFound),
            401 | 403 => return Err(FetchError::Forbidden),
            429 => return Err(FetchError::Transient("rate limited".into())),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                return Err(FetchError::Transient(format!("status {status}: {body}")));
            }
        }

        Ok(resp.json().await?)
    }
}

impl Default for XFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformFetcher for XFetcher {
    fn platform(&self) -> Platform {
        Platform::X
    }

    fn needs_session(&self) -> bool {
        true
    }

    async fn last_post(&self, handle: &str, session: Option<&XSession>) -> FetchResult {
        let session = session.ok_or_else(|| {
            FetchError::Transient("no X session available".into())
        })?;

        let variables = serde_json::json!({ "screen_name": handle });
        let response = self
            .call(USER_BY_SCREEN_NAME_OP, variables, USER_FEATURES, session)
            .await?;
        let user = user_from_response(&response)?;
        if user.protected {
            return Err(FetchError::Forbidden);
        }

        let variables = serde_json::json!({
            "userId": user.rest_id,
            "count": 5,
            "includePromotedContent": false,
            "withVoice": false,
        });
        let response = self
            .call(USER_TWEETS_OP, variables, TWEETS_FEATURES, session)
            .await?;

        match latest_created_at(&response) {
            Some(at) => Ok(Activity::Posted(at)),
            None => {
                debug!(handle, "Timeline has no tweets");
                Ok(Activity::Unknown)
            }
        }
    }
}

fn user_from_response(response: &Value) -> Result<XUser, FetchError> {
    let result = &response["data"]["user"]["result"];
    if result.is_null() {
        // Nonexistent screen names come back as an empty data object.
        return Err(FetchError::NotFound);
    }
    if result["__typename"] == "UserUnavailable" {
        // Suspended or withheld; either way there is no timeline anymore.
        return Err(FetchError::NotFound);
    }

    let rest_id = result["rest_id"]
        .as_str()
        .ok_or_else(|| FetchError::Transient("user result missing rest_id".into()))?;

    Ok(XUser {
        rest_id: rest_id.to_string(),
        protected: result["legacy"]["protected"].as_bool().unwrap_or(false),
    })
}

/// Walk the timeline response for tweet `created_at` values and return
/// the most recent one, normalized to RFC 3339. Scanning all entries
/// instead of taking the first skips past pinned tweets.
fn latest_created_at(response: &Value) -> Option<String> {
    let instructions = response["data"]["user"]["result"]["timeline_v2"]["timeline"]
        ["instructions"]
        .as_array()?;

    let mut latest: Option<DateTime<Utc>> = None;
    for instruction in instructions {
        let Some(entries) = instruction["entries"].as_array() else {
            continue;
        };
        for entry in entries {
            let created_at =
                &entry["content"]["itemContent"]["tweet_results"]["result"]["legacy"]["created_at"];
            let Some(raw) = created_at.as_str() else {
                continue;
            };
            if let Some(at) = parse_legacy_timestamp(raw) {
                latest = Some(latest.map_or(at, |prev| prev.max(at)));
            }
        }
    }

    latest.map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// X's legacy format: `Wed Oct 10 20:19:24 +0000 2018`.
fn parse_legacy_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
