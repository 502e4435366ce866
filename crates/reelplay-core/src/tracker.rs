//! Playback state tracker.
//!
//! Mirrors media sink events into a [`PlaybackSession`] and decides when a
//! [`ProgressSnapshot`] is due. The only policy here is the one-shot resume
//! seek:
//!
//! ```text
//! mount(resume?)          → Loading
//! Ready (first)           → Ready, seek to resume position once
//! Waiting                 → Buffering
//! Ready (again)           → Ready, no seek
//! reload after media error → Loading, restore previous position on Ready
//! ```

use std::time::Duration;

use crate::media::{MediaEvent, MediaObserver};
use crate::session::{PlaybackPhase, PlaybackSession, ProgressSnapshot};

/// Side effects requested by the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerAction {
    /// Hand the snapshot to the progress callback
    Persist(ProgressSnapshot),
    /// Move the media sink's playhead
    SeekTo(f64),
}

pub struct PlaybackTracker {
    session: PlaybackSession,
    /// Resume position for this mount, consumed by the first Ready
    resume: Option<f64>,
    /// Set on the first Ready so later ready cycles never seek again
    resume_applied: bool,
    /// Position to restore after the source was reassigned
    pending_restore: Option<f64>,
    progress_interval: Duration,
    /// Start of the current throttle window
    last_persist: Option<Duration>,
    torn_down: bool,
    now: Duration,
    actions: Vec<TrackerAction>,
}

impl PlaybackTracker {
    pub fn new(source_url: &str, resume: Option<f64>, progress_interval: Duration) -> Self {
        Self {
            session: PlaybackSession::new(source_url),
            resume,
            resume_applied: false,
            pending_restore: None,
            progress_interval,
            last_persist: None,
            torn_down: false,
            now: Duration::ZERO,
            actions: Vec::new(),
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PlaybackSession {
        &mut self.session
    }

    pub fn resume_applied(&self) -> bool {
        self.resume_applied
    }

    /// Feeds one sink event through the tracker.
    pub fn observe(&mut self, event: &MediaEvent, now: Duration) -> Vec<TrackerAction> {
        self.now = now;
        event.dispatch(self);
        std::mem::take(&mut self.actions)
    }

    /// The source was reassigned; go back to loading and restore the
    /// current position once the media is ready again.
    pub fn prepare_reload(&mut self) {
        if self.session.current_time > 0.0 {
            self.pending_restore = Some(self.session.current_time);
        }
        self.session.playing = false;
        self.session.phase = PlaybackPhase::Loading;
    }

    pub fn mark_unavailable(&mut self, reason: impl Into<String>) {
        self.session.playing = false;
        self.session.phase = PlaybackPhase::Unavailable {
            reason: reason.into(),
        };
    }

    /// Final snapshot taken before listeners are detached. Only the first
    /// call returns a value.
    pub fn teardown(&mut self) -> Option<ProgressSnapshot> {
        if std::mem::replace(&mut self.torn_down, true) {
            return None;
        }
        self.session.snapshot()
    }

    fn persist(&mut self) {
        if let Some(snapshot) = self.session.snapshot() {
            self.last_persist = Some(self.now);
            self.actions.push(TrackerAction::Persist(snapshot));
        }
    }
}

impl MediaObserver for PlaybackTracker {
    fn on_play(&mut self) {
        self.session.playing = true;
    }

    fn on_pause(&mut self, position: f64) {
        self.session.playing = false;
        self.session.set_current_time(position);
        self.persist();
    }

    /// Periodic snapshots while playing. The first update after playback
    /// starts only opens the throttle window and persists nothing; later
    /// updates persist once per `progress_interval`. Pauses persist
    /// immediately and restart the window.
    fn on_time_update(&mut self, position: f64) {
        self.session.set_current_time(position);
        if !self.session.playing || !self.session.has_duration() {
            return;
        }
        match self.last_persist {
            None => self.last_persist = Some(self.now),
            Some(last) if self.now.saturating_sub(last) >= self.progress_interval => {
                self.persist();
            }
            Some(_) => {}
        }
    }

    fn on_duration_change(&mut self, duration: f64) {
        self.session.set_duration(duration);
    }

    fn on_ready(&mut self) {
        if !self.resume_applied {
            self.resume_applied = true;
            if let Some(position) = self.resume.take() {
                let position = self.session.clamp_position(position);
                tracing::debug!("Resuming at {position:.1}s");
                self.session.set_current_time(position);
                self.actions.push(TrackerAction::SeekTo(position));
            }
        }
        if let Some(position) = self.pending_restore.take() {
            let position = self.session.clamp_position(position);
            tracing::debug!("Restoring position {position:.1}s after reload");
            self.session.set_current_time(position);
            self.actions.push(TrackerAction::SeekTo(position));
        }
    }

    fn on_buffering_change(&mut self, buffering: bool) {
        match (&self.session.phase, buffering) {
            (PlaybackPhase::Unavailable { .. }, _) => {}
            (PlaybackPhase::Ready, true) => self.session.phase = PlaybackPhase::Buffering,
            (_, true) => {}
            (_, false) => self.session.phase = PlaybackPhase::Ready,
        }
    }

    fn on_buffered(&mut self, buffered_end: f64) {
        if buffered_end.is_finite() {
            self.session.buffered_end = buffered_end.max(0.0);
        }
    }

    fn on_volume_change(&mut self, volume: f32, muted: bool) {
        self.session.volume = volume.clamp(0.0, 1.0);
        self.session.muted = muted;
    }

    fn on_ended(&mut self) {
        self.session.playing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(v: u64) -> Duration {
        Duration::from_secs(v)
    }

    fn ready_tracker(resume: Option<f64>) -> (PlaybackTracker, Vec<TrackerAction>) {
        let mut tracker = PlaybackTracker::new("ep-1.m3u8", resume, secs(5));
        tracker.observe(&MediaEvent::DurationChange { duration: 1200.0 }, secs(0));
        let actions = tracker.observe(&MediaEvent::Ready, secs(0));
        (tracker, actions)
    }

    #[test]
    fn test_resume_seek_happens_once() {
        let (mut tracker, actions) = ready_tracker(Some(650.0));
        assert_eq!(actions, vec![TrackerAction::SeekTo(650.0)]);
        assert!(tracker.resume_applied());

        tracker.observe(&MediaEvent::Waiting, secs(1));
        assert_eq!(tracker.session().phase, PlaybackPhase::Buffering);
        let actions = tracker.observe(&MediaEvent::Ready, secs(2));
        assert!(actions.is_empty());
        assert_eq!(tracker.session().phase, PlaybackPhase::Ready);
    }

    #[test]
    fn test_no_resume_without_hint() {
        let (tracker, actions) = ready_tracker(None);
        assert!(actions.is_empty());
        assert_eq!(tracker.session().current_time, 0.0);
    }

    #[test]
    fn test_pause_persists_immediately() {
        let (mut tracker, _) = ready_tracker(None);
        tracker.observe(&MediaEvent::Play, secs(0));
        let actions = tracker.observe(&MediaEvent::Pause { position: 650.0 }, secs(1));
        assert_eq!(
            actions,
            vec![TrackerAction::Persist(ProgressSnapshot {
                current_time: 650.0,
                duration: 1200.0,
            })]
        );
        assert!(!tracker.session().playing);
    }

    #[test]
    fn test_pause_without_duration_persists_nothing() {
        let mut tracker = PlaybackTracker::new("live.m3u8", None, secs(5));
        tracker.observe(&MediaEvent::Ready, secs(0));
        let actions = tracker.observe(&MediaEvent::Pause { position: 3.0 }, secs(1));
        assert!(actions.is_empty());
    }

    #[test]
    fn test_time_updates_are_throttled() {
        let (mut tracker, _) = ready_tracker(None);
        tracker.observe(&MediaEvent::Play, secs(0));

        let mut persisted = 0;
        for t in 0..=12u64 {
            let position = t as f64;
            let actions = tracker.observe(&MediaEvent::TimeUpdate { position }, secs(t));
            persisted += actions
                .iter()
                .filter(|a| matches!(a, TrackerAction::Persist(_)))
                .count();
        }
        // Windows start at 0s, then persist at 5s and 10s.
        assert_eq!(persisted, 2);
    }

    #[test]
    fn test_first_time_update_opens_window_without_persisting() {
        let (mut tracker, _) = ready_tracker(None);
        tracker.observe(&MediaEvent::Play, secs(0));
        let actions = tracker.observe(&MediaEvent::TimeUpdate { position: 40.0 }, secs(40));
        assert!(!actions.iter().any(|a| matches!(a, TrackerAction::Persist(_))));

        let actions = tracker.observe(&MediaEvent::TimeUpdate { position: 45.0 }, secs(45));
        assert!(actions
            .iter()
            .any(|a| matches!(a, TrackerAction::Persist(s) if s.current_time == 45.0)));
    }

    #[test]
    fn test_time_updates_while_paused_do_not_persist() {
        let (mut tracker, _) = ready_tracker(None);
        for t in 0..20u64 {
            let actions = tracker.observe(&MediaEvent::TimeUpdate { position: 1.0 }, secs(t));
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn test_reload_restores_position() {
        let (mut tracker, _) = ready_tracker(None);
        tracker.observe(&MediaEvent::TimeUpdate { position: 300.0 }, secs(1));
        tracker.prepare_reload();
        assert_eq!(tracker.session().phase, PlaybackPhase::Loading);
        let actions = tracker.observe(&MediaEvent::Ready, secs(2));
        assert_eq!(actions, vec![TrackerAction::SeekTo(300.0)]);
    }

    #[test]
    fn test_teardown_snapshot_only_once() {
        let (mut tracker, _) = ready_tracker(None);
        tracker.observe(&MediaEvent::TimeUpdate { position: 42.0 }, secs(1));
        assert_eq!(
            tracker.teardown(),
            Some(ProgressSnapshot {
                current_time: 42.0,
                duration: 1200.0,
            })
        );
        assert_eq!(tracker.teardown(), None);
    }

    #[test]
    fn test_unavailable_is_sticky() {
        let (mut tracker, _) = ready_tracker(None);
        tracker.mark_unavailable("network error");
        tracker.observe(&MediaEvent::Ready, secs(1));
        assert!(matches!(
            tracker.session().phase,
            PlaybackPhase::Unavailable { .. }
        ));
    }
}
