//! Aggregate engagement statistics.
//!
//! Every (entity, platform) pair lands in exactly one bucket, plus an
//! "all platforms combined" bucket per entity. One block is produced for
//! the whole population and one per group label found in the data.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use lastpost_common::{Activity, Entity, Platform, SocialAccount};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Active,
    Inactive,
    Closed,
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    pub active: u32,
    pub inactive: u32,
    pub closed: u32,
    pub none: u32,
    pub total: u32,
}

impl BucketCounts {
    fn record(&mut self, bucket: Bucket) {
        match bucket {
            Bucket::Active => self.active += 1,
            Bucket::Inactive => self.inactive += 1,
            Bucket::Closed => self.closed += 1,
            Bucket::None => self.none += 1,
        }
        self.total += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub combined: BucketCounts,
    pub platforms: BTreeMap<Platform, BucketCounts>,
}

impl GroupStats {
    fn record(&mut self, entity: &Entity, window: Duration, now: DateTime<Utc>) {
        let mut buckets = Vec::with_capacity(Platform::ALL.len());
        for platform in Platform::ALL {
            let bucket = classify(entity.accounts.get(&platform), window, now);
            self.platforms.entry(platform).or_default().record(bucket);
            buckets.push(bucket);
        }
        self.combined.record(combined_bucket(&buckets));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityStats {
    pub generated_at: DateTime<Utc>,
    pub window_days: i64,
    pub global: GroupStats,
    pub groups: BTreeMap<String, GroupStats>,
}

/// Classify every entity and roll the counts up globally and per group.
/// `window` is how recent a post must be to count as active; it is a
/// parameter because the product has changed its mind about it before.
pub fn compute(entities: &[Entity], window: Duration, now: DateTime<Utc>) -> ActivityStats {
    let mut global = GroupStats::default();
    let mut groups: BTreeMap<String, GroupStats> = BTreeMap::new();

    for entity in entities {
        global.record(entity, window, now);
        if let Some(group) = &entity.group {
            groups
                .entry(group.clone())
                .or_default()
                .record(entity, window, now);
        }
    }

    ActivityStats {
        generated_at: now,
        window_days: window.num_days(),
        global,
        groups,
    }
}

fn classify(account: Option<&SocialAccount>, window: Duration, now: DateTime<Utc>) -> Bucket {
    let Some(account) = account else {
        return Bucket::None;
    };

    match &account.last_post {
        Activity::Closed => Bucket::Closed,
        // Protected and never-probed accounts are tracked but yield no
        // usable timestamp; so does an unparseable one.
        Activity::Protected | Activity::Unknown => Bucket::Inactive,
        posted @ Activity::Posted(_) => match posted.parsed_at() {
            Some(at) if now - at < window => Bucket::Active,
            _ => Bucket::Inactive,
        },
    }
}

fn combined_bucket(buckets: &[Bucket]) -> Bucket {
    if buckets.contains(&Bucket::Active) {
        Bucket::Active
    } else if buckets.contains(&Bucket::Inactive) {
        Bucket::Inactive
    } else if buckets.contains(&Bucket::Closed) {
        Bucket::Closed
    } else {
        Bucket::None
    }
}
