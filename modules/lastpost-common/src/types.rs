use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tracked social platforms. Declaration order is probe order: the
/// rate-limited platform goes first so its session rotation sees a
/// predictable cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    X,
    Bluesky,
    Mastodon,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::X, Platform::Bluesky, Platform::Mastodon];
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::X => write!(f, "x"),
            Platform::Bluesky => write!(f, "bluesky"),
            Platform::Mastodon => write!(f, "mastodon"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Platform::X),
            "bluesky" => Ok(Platform::Bluesky),
            "mastodon" => Ok(Platform::Mastodon),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// Outcome of probing one account on one platform.
///
/// `Posted` keeps the platform's own timestamp string verbatim so that
/// re-serializing a snapshot we did not touch is byte-stable; consumers
/// parse it on demand via [`Activity::parsed_at`]. JSON form is the bare
/// string, the sentinels `"closed"` / `"protected"`, or `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Activity {
    Posted(String),
    Closed,
    Protected,
    #[default]
    Unknown,
}

const CLOSED: &str = "closed";
const PROTECTED: &str = "protected";

impl Activity {
    /// Parse the `Posted` timestamp. `None` for sentinels and for strings
    /// that are not valid RFC 3339 — callers decide how to fail.
    pub fn parsed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Activity::Posted(raw) => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Activity::Closed)
    }
}

impl Serialize for Activity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Activity::Posted(raw) => serializer.serialize_str(raw),
            Activity::Closed => serializer.serialize_str(CLOSED),
            Activity::Protected => serializer.serialize_str(PROTECTED),
            Activity::Unknown => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Activity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw {
            None => Activity::Unknown,
            Some(s) if s == CLOSED => Activity::Closed,
            Some(s) if s == PROTECTED => Activity::Protected,
            Some(s) if s.is_empty() => {
                return Err(D::Error::custom("last_post must not be an empty string"))
            }
            Some(s) => Activity::Posted(s),
        })
    }
}

/// One tracked account on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialAccount {
    pub handle: String,
    #[serde(default)]
    pub last_post: Activity,
}

impl SocialAccount {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            last_post: Activity::Unknown,
        }
    }
}

/// A tracked public figure with zero or more social accounts.
///
/// `id` is the stable external identifier (a Wikidata Q-id) and is unique
/// across the roster. `last_check` records the most recent run in which at
/// least one of the entity's accounts was actually probed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub group: Option<String>,
    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accounts: BTreeMap<Platform, SocialAccount>,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, group: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group,
            last_check: None,
            accounts: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_json_round_trip() {
        let cases = [
            (Activity::Posted("2026-01-02T03:04:05.000Z".into()), "\"2026-01-02T03:04:05.000Z\""),
            (Activity::Closed, "\"closed\""),
            (Activity::Protected, "\"protected\""),
            (Activity::Unknown, "null"),
        ];
        for (activity, json) in cases {
            assert_eq!(serde_json::to_string(&activity).unwrap(), json);
            assert_eq!(serde_json::from_str::<Activity>(json).unwrap(), activity);
        }
    }

    #[test]
    fn posted_keeps_raw_string_verbatim() {
        let json = "\"2026-01-02T03:04:05+01:00\"";
        let activity: Activity = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&activity).unwrap(), json);
    }

    #[test]
    fn parsed_at_handles_offsets_and_garbage() {
        let posted = Activity::Posted("2026-01-02T03:04:05+01:00".into());
        assert_eq!(
            posted.parsed_at().unwrap(),
            DateTime::parse_from_rfc3339("2026-01-02T02:04:05Z").unwrap()
        );
        assert!(Activity::Posted("not a timestamp".into()).parsed_at().is_none());
        assert!(Activity::Closed.parsed_at().is_none());
        assert!(Activity::Unknown.parsed_at().is_none());
    }

    #[test]
    fn entity_round_trip_preserves_account_order() {
        let mut entity = Entity::new("Q1", "Test Person", Some("Party".into()));
        entity.accounts.insert(Platform::Mastodon, SocialAccount::new("a@b.example"));
        entity.accounts.insert(Platform::X, SocialAccount::new("test"));

        let json = serde_json::to_string(&entity).unwrap();
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entity);
        // X sorts before Mastodon: probe order, not alphabetical
        let keys: Vec<_> = back.accounts.keys().copied().collect();
        assert_eq!(keys, vec![Platform::X, Platform::Mastodon]);
    }

    #[test]
    fn platform_from_str() {
        assert_eq!("x".parse::<Platform>().unwrap(), Platform::X);
        assert_eq!(" Bluesky ".parse::<Platform>().unwrap(), Platform::Bluesky);
        assert!("threads".parse::<Platform>().is_err());
    }
}
