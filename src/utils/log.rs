// src/utils/log.rs

//! Pipeline event sink.
//!
//! Pipeline components report progress through an [`EventSink`] handed to
//! their constructors. [`LogSink`] forwards to the `log` facade; tests use
//! [`RecordingSink`] to assert on what happened.

use std::fmt;
use std::sync::{Arc, Mutex};

use log::Level;

use crate::models::Category;

/// Something worth reporting during a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    AttemptStarted {
        attempt: u32,
        max_attempts: u32,
        user_agent: String,
    },
    AttemptFailed {
        attempt: u32,
        reason: String,
    },
    ChallengeDetected {
        attempt: u32,
        marker: String,
    },
    PageFetched {
        status: u16,
        bytes: usize,
    },
    LocatorMatched {
        strategy: &'static str,
        sections: usize,
    },
    SectionIgnored {
        heading: String,
    },
    EntrySkipped {
        category: Category,
        reason: String,
    },
    CategoryParsed {
        category: Category,
        items: usize,
        updates_in: String,
    },
    CacheHit {
        bucket: u64,
    },
    CacheMiss {
        bucket: u64,
    },
}

impl PipelineEvent {
    /// Level the event is logged at by [`LogSink`].
    pub fn level(&self) -> Level {
        match self {
            PipelineEvent::AttemptFailed { .. } | PipelineEvent::ChallengeDetected { .. } => {
                Level::Warn
            }
            PipelineEvent::AttemptStarted { .. }
            | PipelineEvent::PageFetched { .. }
            | PipelineEvent::CategoryParsed { .. } => Level::Info,
            PipelineEvent::LocatorMatched { .. }
            | PipelineEvent::SectionIgnored { .. }
            | PipelineEvent::EntrySkipped { .. }
            | PipelineEvent::CacheHit { .. }
            | PipelineEvent::CacheMiss { .. } => Level::Debug,
        }
    }
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineEvent::AttemptStarted {
                attempt,
                max_attempts,
                user_agent,
            } => write!(f, "Fetch attempt {attempt}/{max_attempts} (UA: {user_agent})"),
            PipelineEvent::AttemptFailed { attempt, reason } => {
                write!(f, "Attempt {attempt} failed: {reason}")
            }
            PipelineEvent::ChallengeDetected { attempt, marker } => {
                write!(f, "Challenge page detected on attempt {attempt} (marker '{marker}')")
            }
            PipelineEvent::PageFetched { status, bytes } => {
                write!(f, "Fetched stock page: HTTP {status}, {bytes} bytes")
            }
            PipelineEvent::LocatorMatched { strategy, sections } => {
                write!(f, "Locator '{strategy}' found {sections} candidate sections")
            }
            PipelineEvent::SectionIgnored { heading } => {
                write!(f, "Ignoring section with heading '{heading}'")
            }
            PipelineEvent::EntrySkipped { category, reason } => {
                write!(f, "Skipped {category} entry: {reason}")
            }
            PipelineEvent::CategoryParsed {
                category,
                items,
                updates_in,
            } => write!(f, "Parsed {category}: {items} items, updates in {updates_in}"),
            PipelineEvent::CacheHit { bucket } => write!(f, "Snapshot cache hit (bucket {bucket})"),
            PipelineEvent::CacheMiss { bucket } => {
                write!(f, "Snapshot cache miss (bucket {bucket})")
            }
        }
    }
}

/// Receiver for pipeline events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: PipelineEvent);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&self, event: PipelineEvent) {
        log::log!(event.level(), "{event}");
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: PipelineEvent) {}
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, predicate: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Default sink used when callers do not supply one.
pub fn default_sink() -> Arc<dyn EventSink> {
    Arc::new(LogSink)
}
