//! Reconcile a fresh roster against the persisted snapshot.
//!
//! Discovery is authoritative for identity (names, groups, handles);
//! the snapshot is authoritative for accumulated history (`last_check`,
//! `last_post`). The merge carries history forward wherever the handle
//! is unchanged, and resets the slot when the upstream handle changed.

use std::collections::{HashMap, HashSet};

use lastpost_common::Entity;

/// Merge discovered entities with the previous snapshot.
///
/// Output order: discovered entities in discovery order, then entities
/// that exist only in the snapshot, in snapshot order. Nothing is ever
/// deleted; an entity that fell off the roster keeps its state and simply
/// stops being refreshed once its accounts go stale.
///
/// Merging a roster against its own prior output is a no-op.
pub fn merge_roster(discovered: Vec<Entity>, persisted: &[Entity]) -> Vec<Entity> {
    let index: HashMap<&str, &Entity> = persisted.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut merged: Vec<Entity> = Vec::with_capacity(discovered.len());
    for mut entity in discovered {
        if let Some(prev) = index.get(entity.id.as_str()) {
            carry_history(&mut entity, prev);
        }
        merged.push(entity);
    }

    let seen: HashSet<&str> = merged.iter().map(|e| e.id.as_str()).collect();
    let retained: Vec<Entity> = persisted
        .iter()
        .filter(|e| !seen.contains(e.id.as_str()))
        .cloned()
        .collect();
    merged.extend(retained);

    merged
}

fn carry_history(entity: &mut Entity, prev: &Entity) {
    entity.last_check = prev.last_check;

    for (platform, account) in entity.accounts.iter_mut() {
        let Some(old) = prev.accounts.get(platform) else {
            // Slot is new; the discovered value (Unknown, or Closed when
            // the roster flags an end date) stands.
            continue;
        };
        if old.handle != account.handle {
            // Account replaced upstream: history belongs to the old
            // handle and is discarded with it.
            continue;
        }
        // Same handle. The roster's explicit end-date still wins over a
        // non-closed persisted value; otherwise history carries forward,
        // which also keeps a persisted Closed terminal.
        if !account.last_post.is_closed() {
            account.last_post = old.last_post.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lastpost_common::{Activity, Platform, SocialAccount};

    fn entity(id: &str, name: &str) -> Entity {
        Entity::new(id, name, None)
    }

    fn with_account(mut e: Entity, platform: Platform, handle: &str, last_post: Activity) -> Entity {
        e.accounts.insert(
            platform,
            SocialAccount { handle: handle.to_string(), last_post },
        );
        e
    }

    #[test]
    fn history_carried_for_unchanged_handle() {
        let discovered = vec![with_account(
            entity("Q1", "Anna"),
            Platform::Bluesky,
            "anna.bsky.social",
            Activity::Unknown,
        )];
        let mut prev = with_account(
            entity("Q1", "Anna"),
            Platform::Bluesky,
            "anna.bsky.social",
            Activity::Posted("2026-01-01T00:00:00Z".into()),
        );
        prev.last_check = Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());

        let merged = merge_roster(discovered, &[prev.clone()]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].last_check, prev.last_check);
        assert_eq!(
            merged[0].accounts[&Platform::Bluesky].last_post,
            Activity::Posted("2026-01-01T00:00:00Z".into())
        );
    }

    #[test]
    fn changed_handle_resets_history() {
        let discovered = vec![with_account(
            entity("Q1", "Anna"),
            Platform::X,
            "anna_new",
            Activity::Unknown,
        )];
        let prev = with_account(
            entity("Q1", "Anna"),
            Platform::X,
            "anna_old",
            Activity::Closed,
        );

        let merged = merge_roster(discovered, &[prev]);
        let account = &merged[0].accounts[&Platform::X];
        assert_eq!(account.handle, "anna_new");
        assert_eq!(account.last_post, Activity::Unknown);
    }

    #[test]
    fn closed_is_never_downgraded() {
        let discovered = vec![with_account(
            entity("Q1", "Anna"),
            Platform::X,
            "anna",
            Activity::Unknown,
        )];
        let prev = with_account(entity("Q1", "Anna"), Platform::X, "anna", Activity::Closed);

        let merged = merge_roster(discovered, &[prev]);
        assert_eq!(merged[0].accounts[&Platform::X].last_post, Activity::Closed);
    }

    #[test]
    fn roster_end_date_closes_over_persisted_timestamp() {
        let discovered = vec![with_account(
            entity("Q1", "Anna"),
            Platform::X,
            "anna",
            Activity::Closed,
        )];
        let prev = with_account(
            entity("Q1", "Anna"),
            Platform::X,
            "anna",
            Activity::Posted("2026-01-01T00:00:00Z".into()),
        );

        let merged = merge_roster(discovered, &[prev]);
        assert_eq!(merged[0].accounts[&Platform::X].last_post, Activity::Closed);
    }

    #[test]
    fn unknown_entity_starts_fresh() {
        let discovered = vec![with_account(
            entity("Q9", "New Person"),
            Platform::Mastodon,
            "new@example.social",
            Activity::Unknown,
        )];

        let merged = merge_roster(discovered, &[]);
        assert_eq!(merged[0].last_check, None);
        assert_eq!(
            merged[0].accounts[&Platform::Mastodon].last_post,
            Activity::Unknown
        );
    }

    #[test]
    fn disappeared_entities_are_retained_after_discovered() {
        let discovered = vec![entity("Q2", "B")];
        let persisted = vec![entity("Q1", "A"), entity("Q2", "B"), entity("Q3", "C")];

        let merged = merge_roster(discovered, &persisted);
        let ids: Vec<_> = merged.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["Q2", "Q1", "Q3"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let discovered = vec![
            with_account(
                entity("Q1", "Anna"),
                Platform::Bluesky,
                "anna.bsky.social",
                Activity::Unknown,
            ),
            with_account(entity("Q2", "Bertil"), Platform::X, "bertil", Activity::Closed),
        ];

        let once = merge_roster(discovered.clone(), &[]);
        let twice = merge_roster(discovered, &once);
        assert_eq!(
            serde_json::to_string(&once).unwrap(),
            serde_json::to_string(&twice).unwrap()
        );
    }
}
