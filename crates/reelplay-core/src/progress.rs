//! Resume and progress bridge.
//!
//! [`WatchHistory`] is the local newest-first cache of what the user watched,
//! one entry per title. [`ProgressBridge`] records progress into it and
//! debounces the remote write: each update re-arms the timer, so a burst of
//! updates produces one request carrying the latest values. Pending writes
//! are flushed with a keep-alive request on teardown.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{BridgeConfig, ResumePolicy};
use crate::error::HistoryError;
use crate::session::{ProgressSnapshot, ResumeHint};
use crate::timer::Deadline;

/// One title in the watch history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub movie_slug: String,
    #[serde(default)]
    pub movie_name: String,
    #[serde(default)]
    pub poster_url: String,
    pub episode_slug: String,
    #[serde(default)]
    pub episode_name: String,
    pub current_time: f64,
    pub duration: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        movie_slug: impl Into<String>,
        episode_slug: impl Into<String>,
        progress: ProgressSnapshot,
    ) -> Self {
        Self {
            movie_slug: movie_slug.into(),
            movie_name: String::new(),
            poster_url: String::new(),
            episode_slug: episode_slug.into(),
            episode_name: String::new(),
            current_time: progress.current_time,
            duration: progress.duration,
            updated_at: Utc::now(),
        }
    }

    pub fn with_movie_name(mut self, name: impl Into<String>) -> Self {
        self.movie_name = name.into();
        self
    }

    pub fn with_poster_url(mut self, url: impl Into<String>) -> Self {
        self.poster_url = url.into();
        self
    }

    pub fn with_episode_name(mut self, name: impl Into<String>) -> Self {
        self.episode_name = name.into();
        self
    }

    /// Watched fraction, for "continue watching" bars.
    pub fn progress_ratio(&self) -> f32 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0) as f32
        } else {
            0.0
        }
    }
}

/// Newest-first watch history, one entry per title.
#[derive(Debug, Clone)]
pub struct WatchHistory {
    entries: Vec<HistoryEntry>,
    max_entries: usize,
}

impl Default for WatchHistory {
    fn default() -> Self {
        Self::new(BridgeConfig::default().max_history)
    }
}

impl WatchHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores `entry` as the newest one, replacing any entry of the same title.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.retain(|e| e.movie_slug != entry.movie_slug);
        self.entries.insert(0, entry);
        self.entries.truncate(self.max_entries);
    }

    pub fn find(&self, movie_slug: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.movie_slug == movie_slug)
    }

    /// Resume hint for an episode, if its saved position passes `policy`.
    pub fn resume_for(
        &self,
        movie_slug: &str,
        episode_slug: &str,
        policy: &ResumePolicy,
    ) -> Option<ResumeHint> {
        let entry = self.find(movie_slug)?;
        if entry.episode_slug != episode_slug {
            return None;
        }
        policy
            .resume_position(entry.current_time, entry.duration)
            .map(|current_time| ResumeHint {
                episode_slug: Some(entry.episode_slug.clone()),
                current_time,
                duration: entry.duration,
            })
    }

    pub fn remove(&mut self, movie_slug: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.movie_slug != movie_slug);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_json(&self) -> Result<String, HistoryError> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    pub fn from_json(json: &str, max_entries: usize) -> Result<Self, HistoryError> {
        let mut history = Self::new(max_entries);
        history.entries = serde_json::from_str(json)?;
        history.entries.truncate(history.max_entries);
        Ok(history)
    }
}

/// Source of the current user's credential.
///
/// Read synchronously at write time; unload flushes cannot wait for a refresh.
pub trait SessionContext {
    fn access_token(&self) -> Option<String>;
}

/// A session whose token is fixed (or absent) for its whole lifetime.
#[derive(Debug, Clone, Default)]
pub struct StaticSession(pub Option<String>);

impl SessionContext for StaticSession {
    fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// An outbound history write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub endpoint: String,
    pub bearer_token: String,
    /// JSON-encoded [`HistoryEntry`]
    pub body: String,
    /// Must survive page teardown
    pub keepalive: bool,
}

/// Delivers history writes. Implementations hand the request off and return;
/// errors only cover failures to dispatch.
pub trait HistoryTransport {
    fn send(&self, request: HistoryRequest) -> Result<(), HistoryError>;
}

/// Local history plus debounced remote writes.
pub struct ProgressBridge {
    config: BridgeConfig,
    session: Box<dyn SessionContext>,
    transport: Box<dyn HistoryTransport>,
    history: WatchHistory,
    /// Latest entry not yet written remotely
    pending: Option<HistoryEntry>,
    debounce: Deadline,
}

impl ProgressBridge {
    pub fn new(
        config: BridgeConfig,
        session: Box<dyn SessionContext>,
        transport: Box<dyn HistoryTransport>,
    ) -> Self {
        Self {
            history: WatchHistory::new(config.max_history),
            config,
            session,
            transport,
            pending: None,
            debounce: Deadline::new(),
        }
    }

    /// Seeds the local cache (e.g. from persisted storage).
    pub fn with_history(mut self, history: WatchHistory) -> Self {
        self.history = history;
        self
    }

    pub fn history(&self) -> &WatchHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut WatchHistory {
        &mut self.history
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Records progress locally and (re)schedules the remote write.
    pub fn record(&mut self, entry: HistoryEntry, now: Duration) {
        self.history.record(entry.clone());
        self.pending = Some(entry);
        self.debounce.arm(now, self.config.debounce);
    }

    /// Writes the pending entry once the debounce delay has elapsed.
    pub fn tick(&mut self, now: Duration) {
        if self.debounce.fire(now) {
            self.write(false);
        }
    }

    /// Writes any pending entry immediately with a keep-alive request.
    pub fn flush(&mut self) {
        self.debounce.cancel();
        self.write(true);
    }

    pub fn next_wake(&self, now: Duration) -> Option<Duration> {
        self.debounce.remaining(now)
    }

    fn write(&mut self, keepalive: bool) {
        let Some(entry) = self.pending.take() else {
            return;
        };
        let Some(token) = self.session.access_token() else {
            tracing::debug!("No session, keeping {} in local history only", entry.movie_slug);
            return;
        };
        if let Err(e) = self.dispatch(&entry, token, keepalive) {
            tracing::warn!("Failed to save watch progress for {}: {e}", entry.movie_slug);
        }
    }

    fn dispatch(
        &self,
        entry: &HistoryEntry,
        bearer_token: String,
        keepalive: bool,
    ) -> Result<(), HistoryError> {
        let request = HistoryRequest {
            endpoint: self.config.endpoint.clone(),
            bearer_token,
            body: serde_json::to_string(entry)?,
            keepalive,
        };
        self.transport.send(request)
    }
}

impl Drop for ProgressBridge {
    fn drop(&mut self) {
        self.flush();
    }
}
