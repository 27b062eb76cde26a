//! Decides which entities are worth refreshing this run.

use chrono::{DateTime, Duration, Utc};

use lastpost_common::{Activity, Entity};

/// Skip policy: an entity checked recently whose accounts are all dormant
/// is unlikely to have new activity, so the network calls are saved.
#[derive(Debug, Clone, Copy)]
pub struct RefreshPolicy {
    /// Entities checked within this many days are candidates for skipping.
    pub recheck_days: i64,
    /// A post older than this many days marks its account as dormant.
    pub dormant_after_days: i64,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            recheck_days: 30,
            dormant_after_days: 365,
        }
    }
}

impl RefreshPolicy {
    /// True when this entity's refresh can be skipped this run.
    ///
    /// Never skips an entity that was never checked, was checked outside
    /// the recheck window, or has no accounts. Within the window, skips
    /// only when every account is dormant.
    pub fn should_skip(&self, entity: &Entity, now: DateTime<Utc>) -> bool {
        let Some(last_check) = entity.last_check else {
            return false;
        };

        let age = now - last_check;
        if age < Duration::zero() || age >= Duration::days(self.recheck_days) {
            return false;
        }

        if entity.accounts.is_empty() {
            return false;
        }

        entity
            .accounts
            .values()
            .all(|account| self.is_dormant(&account.last_post, now))
    }

    /// Closed accounts never block a skip. Unknown and protected accounts
    /// always force a refresh, as does a timestamp that fails to parse.
    fn is_dormant(&self, activity: &Activity, now: DateTime<Utc>) -> bool {
        match activity {
            Activity::Closed => true,
            Activity::Unknown | Activity::Protected => false,
            Activity::Posted(_) => match activity.parsed_at() {
                Some(at) => now - at > Duration::days(self.dormant_after_days),
                None => false,
            },
        }
    }
}
