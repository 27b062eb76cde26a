//! Discovery rows → entities.
//!
//! A SPARQL result carries one row per binding combination, so a member
//! with several statements shows up more than once. Rows collapse by id:
//! the first occurrence fixes name and group, and later rows may only
//! fill platform slots that are still absent.

use std::collections::HashMap;

use lastpost_common::{Activity, Entity, Platform, SocialAccount};
use wikidata_client::{RosterHandle, RosterRow};

/// Collapse discovery rows into entities, preserving first-encounter order.
pub fn entities_from_rows(rows: Vec<RosterRow>) -> Vec<Entity> {
    let mut entities: Vec<Entity> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let slots = [
            (Platform::X, row.x),
            (Platform::Bluesky, row.bluesky),
            (Platform::Mastodon, row.mastodon),
        ];

        let idx = match index.get(&row.id) {
            Some(&idx) => idx,
            None => {
                let entity = Entity::new(row.id.clone(), row.name, row.party);
                index.insert(row.id, entities.len());
                entities.push(entity);
                entities.len() - 1
            }
        };

        for (platform, handle) in slots {
            let Some(handle) = handle else { continue };
            entities[idx]
                .accounts
                .entry(platform)
                .or_insert_with(|| account_from(handle));
        }
    }

    entities
}

fn account_from(handle: RosterHandle) -> SocialAccount {
    SocialAccount {
        handle: handle.handle,
        last_post: if handle.ended {
            Activity::Closed
        } else {
            Activity::Unknown
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, name: &str) -> RosterRow {
        RosterRow {
            id: id.to_string(),
            name: name.to_string(),
            party: None,
            x: None,
            bluesky: None,
            mastodon: None,
        }
    }

    fn handle(h: &str) -> Option<RosterHandle> {
        Some(RosterHandle { handle: h.to_string(), ended: false })
    }

    #[test]
    fn duplicate_rows_collapse_and_fill_slots() {
        let mut first = row("Q1", "Anna");
        first.x = handle("anna");
        let mut second = row("Q1", "Anna (dup)");
        second.bluesky = handle("anna.bsky.social");

        let entities = entities_from_rows(vec![first, second]);
        assert_eq!(entities.len(), 1);
        let entity = &entities[0];
        // first occurrence wins for name
        assert_eq!(entity.name, "Anna");
        assert_eq!(entity.accounts[&Platform::X].handle, "anna");
        assert_eq!(entity.accounts[&Platform::Bluesky].handle, "anna.bsky.social");
    }

    #[test]
    fn duplicate_rows_never_overwrite_existing_slots() {
        let mut first = row("Q1", "Anna");
        first.x = Some(RosterHandle { handle: "anna".into(), ended: true });
        let mut second = row("Q1", "Anna");
        second.x = handle("anna_other");

        let entities = entities_from_rows(vec![first, second]);
        let account = &entities[0].accounts[&Platform::X];
        assert_eq!(account.handle, "anna");
        assert_eq!(account.last_post, Activity::Closed);
    }

    #[test]
    fn ended_handle_preseeds_closed() {
        let mut r = row("Q2", "Bertil");
        r.mastodon = Some(RosterHandle { handle: "bertil@example.social".into(), ended: true });

        let entities = entities_from_rows(vec![r]);
        assert_eq!(
            entities[0].accounts[&Platform::Mastodon].last_post,
            Activity::Closed
        );
    }

    #[test]
    fn discovery_order_is_preserved() {
        let entities = entities_from_rows(vec![row("Q3", "C"), row("Q1", "A"), row("Q2", "B")]);
        let ids: Vec<_> = entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["Q3", "Q1", "Q2"]);
    }
}
