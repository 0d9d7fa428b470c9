// src/pipeline/cache.rs

//! Short-lived snapshot cache.
//!
//! Snapshots are keyed by a coarse time bucket (`unix_secs / bucket_secs`).
//! The cache holds a single slot; the first request of a new bucket
//! replaces it, so entries expire by key rotation.
//!
//! A miss starts one fetch and publishes its outcome on a `watch` channel.
//! Requests arriving while it runs wait on that channel and receive the same
//! outcome, errors included. A failed fetch clears the slot, so the next
//! request after it settles tries again. If the fetching request is dropped
//! mid-flight, the next request to notice takes over.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};

use crate::error::FetchError;
use crate::models::StockSnapshot;
use crate::utils::log::{EventSink, PipelineEvent};

/// Something that can produce a fresh snapshot.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<StockSnapshot, FetchError>;
}

type Outcome = Result<Arc<StockSnapshot>, FetchError>;

enum Entry {
    Ready(Arc<StockSnapshot>),
    InFlight(watch::Receiver<Option<Outcome>>),
}

struct Slot {
    bucket: u64,
    /// Identifies the fetch that owns an in-flight entry
    generation: u64,
    entry: Entry,
}

/// What a request does after looking at the slot.
enum Role {
    Hit(Arc<StockSnapshot>),
    Wait(watch::Receiver<Option<Outcome>>),
    Fetch {
        generation: u64,
        publish: watch::Sender<Option<Outcome>>,
    },
}

/// Time-bucketed, single-flight snapshot cache.
pub struct SnapshotCache {
    bucket_secs: u64,
    slot: Mutex<Option<Slot>>,
    generations: AtomicU64,
    events: Arc<dyn EventSink>,
}

impl SnapshotCache {
    pub fn new(bucket_secs: u64, events: Arc<dyn EventSink>) -> Self {
        Self {
            bucket_secs: bucket_secs.max(1),
            slot: Mutex::new(None),
            generations: AtomicU64::new(0),
            events,
        }
    }

    /// Bucket key for an instant.
    pub fn bucket_for(&self, now: DateTime<Utc>) -> u64 {
        let secs = u64::try_from(now.timestamp()).unwrap_or(0);
        secs / self.bucket_secs
    }

    /// Cached snapshot for the current bucket, fetching it on a miss.
    pub async fn get_or_fetch(
        &self,
        source: &dyn SnapshotSource,
    ) -> Result<Arc<StockSnapshot>, FetchError> {
        self.get_or_fetch_at(Utc::now(), source).await
    }

    pub async fn get_or_fetch_at(
        &self,
        now: DateTime<Utc>,
        source: &dyn SnapshotSource,
    ) -> Result<Arc<StockSnapshot>, FetchError> {
        let bucket = self.bucket_for(now);

        loop {
            match self.join(bucket).await {
                Role::Hit(snapshot) => {
                    self.events.record(PipelineEvent::CacheHit { bucket });
                    return Ok(snapshot);
                }
                Role::Wait(mut outcome) => {
                    let shared = outcome
                        .wait_for(Option::is_some)
                        .await
                        .ok()
                        .and_then(|settled| (*settled).clone());
                    if let Some(result) = shared {
                        return result;
                    }
                    // The fetching request went away without an outcome.
                }
                Role::Fetch {
                    generation,
                    publish,
                } => {
                    self.events.record(PipelineEvent::CacheMiss { bucket });
                    let result = source.fetch_snapshot().await.map(Arc::new);
                    self.settle(generation, &result).await;
                    publish.send_replace(Some(result.clone()));
                    return result;
                }
            }
        }
    }

    /// Look at the slot for `bucket` and decide this request's role.
    ///
    /// A request still carrying an older bucket uses the newer slot.
    async fn join(&self, bucket: u64) -> Role {
        let mut slot = self.slot.lock().await;

        if let Some(current) = slot.as_ref().filter(|s| s.bucket >= bucket) {
            match &current.entry {
                Entry::Ready(snapshot) => return Role::Hit(Arc::clone(snapshot)),
                Entry::InFlight(outcome) if outcome.has_changed().is_ok() => {
                    return Role::Wait(outcome.clone());
                }
                // Abandoned: the sender is gone without publishing.
                Entry::InFlight(_) => {}
            }
        }

        let bucket = slot.as_ref().map_or(bucket, |s| s.bucket.max(bucket));
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let (publish, outcome) = watch::channel(None);
        *slot = Some(Slot {
            bucket,
            generation,
            entry: Entry::InFlight(outcome),
        });
        Role::Fetch {
            generation,
            publish,
        }
    }

    /// Store a successful outcome, or clear the slot after a failure.
    ///
    /// No-op when the slot has moved on to another fetch.
    async fn settle(&self, generation: u64, result: &Outcome) {
        let mut slot = self.slot.lock().await;
        let bucket = match slot.as_ref() {
            Some(current) if current.generation == generation => current.bucket,
            _ => return,
        };
        *slot = match result {
            Ok(snapshot) => Some(Slot {
                bucket,
                generation,
                entry: Entry::Ready(Arc::clone(snapshot)),
            }),
            Err(_) => None,
        };
    }
}
