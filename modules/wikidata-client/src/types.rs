use serde::Deserialize;

/// One roster row: a member of parliament and their known handles.
/// A member appears in multiple rows when a statement (party, handle)
/// has several bindings; callers collapse rows by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    /// Wikidata Q-id, e.g. "Q4935104".
    pub id: String,
    pub name: String,
    pub party: Option<String>,
    pub x: Option<RosterHandle>,
    pub bluesky: Option<RosterHandle>,
    pub mastodon: Option<RosterHandle>,
}

/// A handle statement, with the end-date qualifier surfaced as a flag:
/// an end-dated handle is an account the roster already knows is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterHandle {
    pub handle: String,
    pub ended: bool,
}

// --- SPARQL JSON results wire format ---

#[derive(Debug, Deserialize)]
pub struct SparqlResponse {
    pub results: SparqlResults,
}

#[derive(Debug, Deserialize)]
pub struct SparqlResults {
    pub bindings: Vec<RosterBinding>,
}

/// An RDF term in the results. Only `value` matters here; `type` and
/// `xml:lang` are ignored.
#[derive(Debug, Deserialize)]
pub struct Term {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct RosterBinding {
    pub mp: Option<Term>,
    #[serde(rename = "mpLabel")]
    pub mp_label: Option<Term>,
    #[serde(rename = "partyLabel")]
    pub party_label: Option<Term>,
    pub x: Option<Term>,
    #[serde(rename = "xEnd")]
    pub x_end: Option<Term>,
    pub bluesky: Option<Term>,
    #[serde(rename = "bskyEnd")]
    pub bsky_end: Option<Term>,
    pub mastodon: Option<Term>,
    #[serde(rename = "mastEnd")]
    pub mast_end: Option<Term>,
}
