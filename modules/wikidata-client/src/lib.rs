pub mod error;
pub mod types;

pub use error::{Result, WikidataError};
pub use types::{RosterHandle, RosterRow};

use std::time::Duration;

use types::{RosterBinding, SparqlResponse, Term};

pub const DEFAULT_ENDPOINT: &str = "https://query.wikidata.org/sparql";

/// Current members of the Riksdag (Q10655178) with per-platform handles.
/// Membership and party statements must be current, but handle statements
/// keep their end-date qualifier as a column: an end-dated handle is a
/// roster-level signal that the account is already gone, which downstream
/// merging needs to see rather than have filtered away.
const ROSTER_QUERY: &str = r#"
SELECT ?mp ?mpLabel ?partyLabel ?x ?xEnd ?bluesky ?bskyEnd ?mastodon ?mastEnd WHERE {
    SERVICE wikibase:label { bd:serviceParam wikibase:language "sv,en". }

    ?mp wdt:P31 wd:Q5;
        p:P39 ?statement.
    ?statement ps:P39 wd:Q10655178.
    FILTER NOT EXISTS { ?statement pq:P582 ?endTime. }

    OPTIONAL {
        ?mp p:P102 ?partyStatement.
        ?partyStatement ps:P102 ?party.
        FILTER(NOT EXISTS { ?partyStatement pq:P582 ?partyEndDate. })
    }

    OPTIONAL {
        ?mp p:P2002 ?xStmt.
        ?xStmt ps:P2002 ?x.
        OPTIONAL { ?xStmt pq:P582 ?xEnd. }
    }

    OPTIONAL {
        ?mp p:P12361 ?bskyStmt.
        ?bskyStmt ps:P12361 ?bluesky.
        OPTIONAL { ?bskyStmt pq:P582 ?bskyEnd. }
    }

    OPTIONAL {
        ?mp p:P4033 ?mastStmt.
        ?mastStmt ps:P4033 ?mastodon.
        OPTIONAL { ?mastStmt pq:P582 ?mastEnd. }
    }
}
"#;

pub struct WikidataClient {
    client: reqwest::Client,
    endpoint: String,
}

impl WikidataClient {
    /// The endpoint defaults to [`DEFAULT_ENDPOINT`]; Wikidata requires a
    /// descriptive User-Agent, so one must be supplied.
    pub fn new(endpoint: &str, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(user_agent.to_string())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }

    /// Run the roster query and return one row per result binding.
    /// Bindings missing the id or label are skipped with a warning.
    pub async fn fetch_roster(&self) -> Result<Vec<RosterRow>> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("query", ROSTER_QUERY), ("format", "json")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(WikidataError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SparqlResponse = resp
            .json()
            .await
            .map_err(|e| WikidataError::Malformed(e.to_string()))?;

        let total = parsed.results.bindings.len();
        let rows: Vec<RosterRow> = parsed
            .results
            .bindings
            .into_iter()
            .filter_map(row_from_binding)
            .collect();

        tracing::info!(rows = rows.len(), skipped = total - rows.len(), "Fetched roster");
        Ok(rows)
    }
}

fn row_from_binding(binding: RosterBinding) -> Option<RosterRow> {
    let (Some(mp), Some(label)) = (binding.mp, binding.mp_label) else {
        tracing::warn!("Roster binding missing ?mp or ?mpLabel, skipping");
        return None;
    };

    Some(RosterRow {
        id: qid(&mp.value),
        name: label.value,
        party: binding.party_label.map(|t| t.value),
        x: handle_from(binding.x, binding.x_end),
        bluesky: handle_from(binding.bluesky, binding.bsky_end),
        mastodon: handle_from(binding.mastodon, binding.mast_end),
    })
}

fn handle_from(handle: Option<Term>, end: Option<Term>) -> Option<RosterHandle> {
    handle.map(|t| RosterHandle {
        handle: t.value,
        ended: end.is_some(),
    })
}

/// Entity URIs look like `http://www.wikidata.org/entity/Q4935104`;
/// the Q-id is the last path segment.
fn qid(entity_uri: &str) -> String {
    entity_uri
        .rsplit('/')
        .next()
        .unwrap_or(entity_uri)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binding(value: serde_json::Value) -> RosterBinding {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn qid_takes_last_path_segment() {
        assert_eq!(qid("http://www.wikidata.org/entity/Q4935104"), "Q4935104");
        assert_eq!(qid("Q1"), "Q1");
    }

    #[test]
    fn binding_maps_to_row() {
        let row = row_from_binding(binding(json!({
            "mp": { "type": "uri", "value": "http://www.wikidata.org/entity/Q4935104" },
            "mpLabel": { "type": "literal", "value": "Anna Andersson" },
            "partyLabel": { "type": "literal", "value": "Miljöpartiet" },
            "bluesky": { "type": "literal", "value": "anna.bsky.social" },
        })))
        .unwrap();

        assert_eq!(row.id, "Q4935104");
        assert_eq!(row.name, "Anna Andersson");
        assert_eq!(row.party.as_deref(), Some("Miljöpartiet"));
        assert_eq!(
            row.bluesky,
            Some(RosterHandle { handle: "anna.bsky.social".into(), ended: false })
        );
        assert_eq!(row.x, None);
        assert_eq!(row.mastodon, None);
    }

    #[test]
    fn end_date_qualifier_sets_ended() {
        let row = row_from_binding(binding(json!({
            "mp": { "type": "uri", "value": "http://www.wikidata.org/entity/Q2" },
            "mpLabel": { "type": "literal", "value": "Bertil" },
            "x": { "type": "literal", "value": "bertil" },
            "xEnd": { "type": "literal", "value": "2025-03-01T00:00:00Z" },
        })))
        .unwrap();

        assert_eq!(row.x, Some(RosterHandle { handle: "bertil".into(), ended: true }));
    }

    #[test]
    fn binding_without_label_is_skipped() {
        let result = row_from_binding(binding(json!({
            "mp": { "type": "uri", "value": "http://www.wikidata.org/entity/Q3" },
        })));
        assert!(result.is_none());
    }

    #[test]
    fn sparql_response_parses() {
        let parsed: SparqlResponse = serde_json::from_value(json!({
            "head": { "vars": ["mp", "mpLabel"] },
            "results": { "bindings": [
                {
                    "mp": { "type": "uri", "value": "http://www.wikidata.org/entity/Q1" },
                    "mpLabel": { "type": "literal", "xml:lang": "sv", "value": "Namn" },
                }
            ] }
        }))
        .unwrap();
        assert_eq!(parsed.results.bindings.len(), 1);
    }
}
