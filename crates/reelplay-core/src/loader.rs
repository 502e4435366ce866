//! Adaptive stream loader.
//!
//! Decides how a URL reaches the media sink and owns the adaptive-bitrate
//! engine for segmented manifests:
//!
//! | URL | Platform | Transport |
//! |-----|----------|-----------|
//! | `.m3u8` | plays manifests natively | [`Transport::NativeManifest`] |
//! | `.m3u8` | adaptive engine available | [`Transport::Adaptive`] |
//! | anything else | any | [`Transport::Direct`] |
//!
//! Fatal errors get exactly one automatic recovery attempt each (manifest
//! reload for network errors, decoder recovery for media errors). When a
//! budget is already spent the loader reports the stream as unavailable.
//! Budgets refill once the media reports it can play again.

use std::time::Duration;

use crate::config::PlayerConfig;
use crate::error::LoaderError;
use crate::media::MediaSink;
use crate::session::{QualityLevel, AUTO_LEVEL};

/// Returns true if the URL points to a segmented (HLS) manifest.
pub fn is_manifest_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.to_ascii_lowercase().ends_with(".m3u8")
}

/// How a source reaches the media sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Client-side adaptive engine feeding the sink
    Adaptive,
    /// Manifest assigned directly; the platform handles adaptation
    NativeManifest,
    /// Plain media file assigned directly
    Direct,
}

impl Transport {
    pub fn select(url: &str, native_manifest: bool, engine_supported: bool) -> Self {
        if !is_manifest_url(url) {
            Transport::Direct
        } else if native_manifest {
            Transport::NativeManifest
        } else if engine_supported {
            Transport::Adaptive
        } else {
            tracing::warn!("No manifest support on this platform, assigning {url} directly");
            Transport::Direct
        }
    }
}

/// Buffer tuning handed to the adaptive engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_buffer_length: Duration,
    pub max_max_buffer_length: Duration,
}

impl From<&PlayerConfig> for EngineConfig {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            max_buffer_length: config.max_buffer_length,
            max_max_buffer_length: config.max_max_buffer_length,
        }
    }
}

/// A rendition advertised by the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelInfo {
    pub height: Option<u32>,
    pub bitrate: u32,
}

/// Category of an engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Network,
    Media,
    Other,
}

/// Events reported by the adaptive engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ManifestParsed { levels: Vec<LevelInfo> },
    Error {
        kind: EngineErrorKind,
        fatal: bool,
        details: String,
    },
}

/// A client-side adaptive-bitrate engine (hls.js on the web).
pub trait AdaptiveEngine {
    fn load_source(&mut self, url: &str);
    /// Binds the engine to the media sink it was created for.
    fn attach_media(&mut self);
    /// Pins a level, or [`AUTO_LEVEL`] to re-enable automatic selection.
    fn set_current_level(&mut self, level: i32);
    /// Restarts loading after a fatal network error.
    fn start_load(&mut self);
    /// Flushes and re-attaches the decoder after a fatal media error.
    fn recover_media_error(&mut self);
    /// Releases network connections and decoders. Idempotent.
    fn destroy(&mut self);
    fn poll_events(&mut self) -> Vec<EngineEvent>;
}

/// Creates adaptive engines bound to the player's media sink.
pub trait EngineFactory {
    fn is_supported(&self) -> bool;
    fn create(&self, config: &EngineConfig) -> Option<Box<dyn AdaptiveEngine>>;
}

/// Factory for platforms without a client-side adaptive engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAdaptiveEngine;

impl EngineFactory for NoAdaptiveEngine {
    fn is_supported(&self) -> bool {
        false
    }

    fn create(&self, _config: &EngineConfig) -> Option<Box<dyn AdaptiveEngine>> {
        None
    }
}

/// What the controller must do in response to loader activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderAction {
    /// The source is ready to start; attempt (auto)playback
    StartPlayback,
    /// The source was reassigned after a media error; restore the position
    Reloaded,
    /// Recovery is exhausted
    Unavailable(String),
}

/// Owns the transport for one source URL.
pub struct StreamLoader {
    url: String,
    transport: Transport,
    engine: Option<Box<dyn AdaptiveEngine>>,
    levels: Vec<QualityLevel>,
    active_level: i32,
    auto_label: String,
    network_retry_spent: bool,
    media_recovery_spent: bool,
    source_reload_spent: bool,
    /// Recoveries attempted since attach; never refilled
    recoveries: u32,
    max_recoveries: u32,
    failed: bool,
}

impl StreamLoader {
    /// Attaches `url` to the sink, creating an adaptive engine when needed.
    ///
    /// Returns the loader and any actions that are due immediately.
    pub fn attach(
        url: &str,
        sink: &mut dyn MediaSink,
        engines: &dyn EngineFactory,
        config: &PlayerConfig,
    ) -> (Self, Vec<LoaderAction>) {
        let mut transport =
            Transport::select(url, sink.supports_native_manifest(), engines.is_supported());

        let mut engine = None;
        if transport == Transport::Adaptive {
            match engines.create(&EngineConfig::from(config)) {
                Some(mut created) => {
                    created.load_source(url);
                    created.attach_media();
                    engine = Some(created);
                }
                None => {
                    tracing::warn!("Adaptive engine unavailable, falling back to direct playback");
                    transport = Transport::Direct;
                }
            }
        }

        let mut actions = Vec::new();
        if engine.is_none() {
            sink.set_source(url);
            actions.push(LoaderAction::StartPlayback);
        }
        tracing::info!("Attached {url} via {transport:?}");

        let loader = Self {
            url: url.to_string(),
            transport,
            engine,
            levels: Vec::new(),
            active_level: AUTO_LEVEL,
            auto_label: config.auto_quality_label.clone(),
            network_retry_spent: false,
            media_recovery_spent: false,
            source_reload_spent: false,
            recoveries: 0,
            max_recoveries: config.max_recoveries_per_source,
            failed: false,
        };
        (loader, actions)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Selectable levels, "Automatic" first. Empty until the manifest is parsed.
    pub fn available_qualities(&self) -> &[QualityLevel] {
        &self.levels
    }

    pub fn active_level(&self) -> i32 {
        self.active_level
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Pins a quality level, or re-enables automatic selection with [`AUTO_LEVEL`].
    pub fn set_quality(&mut self, level: i32) -> Result<(), LoaderError> {
        let engine = self.engine.as_mut().ok_or(LoaderError::NoAdaptiveEngine)?;
        if !self.levels.iter().any(|l| l.level_index == level) {
            return Err(LoaderError::UnknownLevel(level));
        }
        engine.set_current_level(level);
        self.active_level = level;
        tracing::debug!("Quality level set to {level}");
        Ok(())
    }

    /// Drains and handles pending engine events.
    pub fn poll(&mut self) -> Vec<LoaderAction> {
        let events = match self.engine.as_mut() {
            Some(engine) => engine.poll_events(),
            None => return Vec::new(),
        };
        events
            .into_iter()
            .filter_map(|event| self.handle_engine_event(event))
            .collect()
    }

    pub fn handle_engine_event(&mut self, event: EngineEvent) -> Option<LoaderAction> {
        match event {
            EngineEvent::ManifestParsed { levels } => {
                self.levels = quality_ladder(&self.auto_label, &levels);
                self.active_level = AUTO_LEVEL;
                tracing::info!("Manifest parsed with {} renditions", levels.len());
                Some(LoaderAction::StartPlayback)
            }
            EngineEvent::Error {
                kind,
                fatal: false,
                details,
            } => {
                tracing::debug!("Non-fatal {kind:?} engine error: {details}");
                None
            }
            EngineEvent::Error {
                kind,
                fatal: true,
                details,
            } => self.recover(kind, details),
        }
    }

    fn recover(&mut self, kind: EngineErrorKind, details: String) -> Option<LoaderAction> {
        let budget_left = self.recoveries < self.max_recoveries;
        let engine = self.engine.as_mut()?;
        match kind {
            EngineErrorKind::Network if budget_left && !self.network_retry_spent => {
                tracing::warn!("Fatal network error, reloading manifest: {details}");
                self.network_retry_spent = true;
                self.recoveries += 1;
                engine.start_load();
                None
            }
            EngineErrorKind::Media if budget_left && !self.media_recovery_spent => {
                tracing::warn!("Fatal media error, recovering decoder: {details}");
                self.media_recovery_spent = true;
                self.recoveries += 1;
                engine.recover_media_error();
                None
            }
            _ => self.fail(format!("{kind:?} error: {details}")),
        }
    }

    /// Handles an error reported by the media element itself.
    ///
    /// With an adaptive engine the engine reports (and recovers) decode
    /// failures, so this only acts on natively assigned sources.
    pub fn on_media_error(
        &mut self,
        message: &str,
        sink: &mut dyn MediaSink,
    ) -> Option<LoaderAction> {
        if self.engine.is_some() || self.failed {
            tracing::debug!("Media element error ignored: {message}");
            return None;
        }
        if self.source_reload_spent || self.recoveries >= self.max_recoveries {
            return self.fail(format!("media error: {message}"));
        }
        tracing::warn!("Media error, reassigning source once: {message}");
        self.source_reload_spent = true;
        self.recoveries += 1;
        sink.set_source(&self.url);
        Some(LoaderAction::Reloaded)
    }

    /// Refills the per-error-kind budgets after the media became playable
    /// again. The per-source cap from
    /// [`PlayerConfig::max_recoveries_per_source`] is not refilled, so a
    /// stream that keeps failing after each recovery ends up unavailable.
    pub fn mark_healthy(&mut self) {
        if !self.failed {
            self.network_retry_spent = false;
            self.media_recovery_spent = false;
            self.source_reload_spent = false;
        }
    }

    fn fail(&mut self, reason: String) -> Option<LoaderAction> {
        tracing::warn!("Playback unavailable for {}: {reason}", self.url);
        self.failed = true;
        Some(LoaderAction::Unavailable(reason))
    }

    /// Destroys the adaptive engine. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
            tracing::info!("Released adaptive engine for {}", self.url);
        }
    }
}

impl Drop for StreamLoader {
    fn drop(&mut self) {
        self.release();
    }
}

/// Builds the quality menu entries, automatic selection first.
pub fn quality_ladder(auto_label: &str, levels: &[LevelInfo]) -> Vec<QualityLevel> {
    std::iter::once(QualityLevel {
        label: auto_label.to_string(),
        level_index: AUTO_LEVEL,
    })
    .chain(levels.iter().enumerate().map(|(idx, level)| QualityLevel {
        label: match level.height {
            Some(height) if height > 0 => format!("{height}p"),
            _ => format!("Level {idx}"),
        },
        level_index: idx as i32,
    }))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedEngineFactory, SimulatedMedia};

    fn levels() -> Vec<LevelInfo> {
        vec![
            LevelInfo {
                height: Some(480),
                bitrate: 800_000,
            },
            LevelInfo {
                height: Some(1080),
                bitrate: 4_000_000,
            },
            LevelInfo {
                height: None,
                bitrate: 64_000,
            },
        ]
    }

    fn adaptive_loader() -> (StreamLoader, SimulatedEngineFactory) {
        let media = SimulatedMedia::new();
        let factory = SimulatedEngineFactory::new();
        let (loader, actions) = StreamLoader::attach(
            "https://cdn.example/movie/index.m3u8?token=1",
            &mut media.sink(),
            &factory,
            &PlayerConfig::default(),
        );
        assert!(actions.is_empty());
        (loader, factory)
    }

    #[test]
    fn test_manifest_detection() {
        assert!(is_manifest_url("https://a.b/c/index.m3u8"));
        assert!(is_manifest_url("https://a.b/c/INDEX.M3U8?sig=abc#t=3"));
        assert!(!is_manifest_url("https://a.b/c/movie.mp4"));
        assert!(!is_manifest_url("https://a.b/m3u8/movie.mp4"));
    }

    #[test]
    fn test_transport_selection() {
        assert_eq!(Transport::select("a.m3u8", true, true), Transport::NativeManifest);
        assert_eq!(Transport::select("a.m3u8", false, true), Transport::Adaptive);
        assert_eq!(Transport::select("a.m3u8", false, false), Transport::Direct);
        assert_eq!(Transport::select("a.mp4", false, true), Transport::Direct);
    }

    #[test]
    fn test_direct_source_assigned_and_started_immediately() {
        let media = SimulatedMedia::new();
        let (loader, actions) = StreamLoader::attach(
            "https://cdn.example/movie.mp4",
            &mut media.sink(),
            &SimulatedEngineFactory::new(),
            &PlayerConfig::default(),
        );
        assert_eq!(loader.transport(), Transport::Direct);
        assert_eq!(actions, vec![LoaderAction::StartPlayback]);
        assert_eq!(media.source().as_deref(), Some("https://cdn.example/movie.mp4"));
    }

    #[test]
    fn test_quality_ladder_labels() {
        let ladder = quality_ladder("Automatic", &levels());
        let labels: Vec<_> = ladder.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["Automatic", "480p", "1080p", "Level 2"]);
        assert_eq!(ladder[0].level_index, AUTO_LEVEL);
        assert_eq!(ladder[3].level_index, 2);
    }

    #[test]
    fn test_manifest_parsed_populates_levels_and_starts() {
        let (mut loader, factory) = adaptive_loader();
        factory.engine().emit(EngineEvent::ManifestParsed { levels: levels() });
        assert_eq!(loader.poll(), vec![LoaderAction::StartPlayback]);
        assert_eq!(loader.available_qualities().len(), 4);
        assert_eq!(loader.active_level(), AUTO_LEVEL);
    }

    #[test]
    fn test_quality_selection_round_trip() {
        let (mut loader, factory) = adaptive_loader();
        factory.engine().emit(EngineEvent::ManifestParsed { levels: levels() });
        loader.poll();

        loader.set_quality(1).unwrap();
        assert_eq!(loader.active_level(), 1);
        assert_eq!(factory.engine().current_level(), 1);

        loader.set_quality(AUTO_LEVEL).unwrap();
        assert_eq!(loader.active_level(), AUTO_LEVEL);
        assert_eq!(factory.engine().current_level(), AUTO_LEVEL);

        assert_eq!(loader.set_quality(9), Err(LoaderError::UnknownLevel(9)));
        assert_eq!(loader.active_level(), AUTO_LEVEL);
    }

    #[test]
    fn test_quality_selection_needs_engine() {
        let media = SimulatedMedia::new();
        let (mut loader, _) = StreamLoader::attach(
            "movie.mp4",
            &mut media.sink(),
            &SimulatedEngineFactory::new(),
            &PlayerConfig::default(),
        );
        assert_eq!(loader.set_quality(0), Err(LoaderError::NoAdaptiveEngine));
    }

    #[test]
    fn test_fatal_network_error_retries_once() {
        let (mut loader, factory) = adaptive_loader();
        let fatal = || EngineEvent::Error {
            kind: EngineErrorKind::Network,
            fatal: true,
            details: "manifestLoadError".into(),
        };
        assert_eq!(loader.handle_engine_event(fatal()), None);
        assert_eq!(factory.engine().start_load_calls(), 1);

        let action = loader.handle_engine_event(fatal());
        assert!(matches!(action, Some(LoaderAction::Unavailable(_))));
        assert_eq!(factory.engine().start_load_calls(), 1);
        assert!(loader.is_failed());
    }

    #[test]
    fn test_fatal_media_error_recovers_decoder() {
        let (mut loader, factory) = adaptive_loader();
        let fatal = EngineEvent::Error {
            kind: EngineErrorKind::Media,
            fatal: true,
            details: "bufferAppendError".into(),
        };
        assert_eq!(loader.handle_engine_event(fatal.clone()), None);
        assert_eq!(factory.engine().recover_calls(), 1);
        assert!(!factory.engine().is_destroyed());

        loader.mark_healthy();
        assert_eq!(loader.handle_engine_event(fatal), None);
        assert_eq!(factory.engine().recover_calls(), 2);
    }

    #[test]
    fn test_recovery_cap_outlives_healthy_cycles() {
        let media = SimulatedMedia::new();
        let factory = SimulatedEngineFactory::new();
        let (mut loader, _) = StreamLoader::attach(
            "https://cdn.example/movie/index.m3u8",
            &mut media.sink(),
            &factory,
            &PlayerConfig::default().with_max_recoveries(2),
        );
        let fatal = || EngineEvent::Error {
            kind: EngineErrorKind::Network,
            fatal: true,
            details: "levelLoadError".into(),
        };

        // Each ready cycle refills the per-kind budget, up to the cap
        assert_eq!(loader.handle_engine_event(fatal()), None);
        loader.mark_healthy();
        assert_eq!(loader.handle_engine_event(fatal()), None);
        loader.mark_healthy();
        assert_eq!(factory.engine().start_load_calls(), 2);

        let action = loader.handle_engine_event(fatal());
        assert!(matches!(action, Some(LoaderAction::Unavailable(_))));
        assert_eq!(factory.engine().start_load_calls(), 2);
        assert!(loader.is_failed());

        // A failed loader stays failed
        loader.mark_healthy();
        assert!(matches!(
            loader.handle_engine_event(fatal()),
            Some(LoaderAction::Unavailable(_))
        ));
    }

    #[test]
    fn test_recovery_cap_shared_across_error_kinds() {
        let media = SimulatedMedia::new();
        let factory = SimulatedEngineFactory::new();
        let (mut loader, _) = StreamLoader::attach(
            "https://cdn.example/movie/index.m3u8",
            &mut media.sink(),
            &factory,
            &PlayerConfig::default().with_max_recoveries(1),
        );
        let network = EngineEvent::Error {
            kind: EngineErrorKind::Network,
            fatal: true,
            details: "manifestLoadError".into(),
        };
        let media_err = EngineEvent::Error {
            kind: EngineErrorKind::Media,
            fatal: true,
            details: "bufferAppendError".into(),
        };
        assert_eq!(loader.handle_engine_event(network), None);
        assert!(matches!(
            loader.handle_engine_event(media_err),
            Some(LoaderAction::Unavailable(_))
        ));
        assert_eq!(factory.engine().recover_calls(), 0);
    }

    #[test]
    fn test_non_fatal_errors_are_swallowed() {
        let (mut loader, factory) = adaptive_loader();
        let event = EngineEvent::Error {
            kind: EngineErrorKind::Network,
            fatal: false,
            details: "fragLoadTimeOut".into(),
        };
        assert_eq!(loader.handle_engine_event(event), None);
        assert_eq!(factory.engine().start_load_calls(), 0);
    }

    #[test]
    fn test_direct_media_error_reloads_once() {
        let media = SimulatedMedia::new();
        let mut sink = media.sink();
        let (mut loader, _) = StreamLoader::attach(
            "movie.mp4",
            &mut sink,
            &SimulatedEngineFactory::new(),
            &PlayerConfig::default(),
        );
        assert_eq!(
            loader.on_media_error("decode", &mut sink),
            Some(LoaderAction::Reloaded)
        );
        assert_eq!(media.source_assignments(), 2);
        assert!(matches!(
            loader.on_media_error("decode", &mut sink),
            Some(LoaderAction::Unavailable(_))
        ));
    }

    #[test]
    fn test_release_destroys_engine_once() {
        let (mut loader, factory) = adaptive_loader();
        loader.release();
        loader.release();
        drop(loader);
        assert!(factory.engine().is_destroyed());
        assert_eq!(factory.engine().destroy_calls(), 1);
    }
}
