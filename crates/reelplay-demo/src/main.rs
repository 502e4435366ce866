//! reelplay Demo Application
//!
//! Drives the player against the simulated media sink so every control,
//! gesture and recovery path can be exercised without a browser: episode
//! switching, resume from watch history, stalls and stream errors.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use eframe::egui;
use reelplay::{VideoPlayer, VideoPlayerExt};
use reelplay_core::drawer::{Episode, NoScrollLock};
use reelplay_core::loader::{EngineErrorKind, EngineEvent, LevelInfo};
use reelplay_core::progress::{HistoryEntry, ProgressBridge, StaticSession};
use reelplay_core::sim::{
    AutoplayPolicy, RecordingShell, RecordingTransport, SimulatedEngineFactory, SimulatedMedia,
};
use reelplay_core::{
    BridgeConfig, Clock, PlayerController, ResumePolicy, StreamSource, SystemClock,
};

const SHOW_SLUG: &str = "big-buck-bunny";
const SHOW_NAME: &str = "Big Buck Bunny";
const EPISODE_COUNT: usize = 12;

fn episode_url(slug: &str) -> String {
    format!("https://cdn.example/{SHOW_SLUG}/{slug}/index.m3u8")
}

/// Which episode the progress callback should attribute snapshots to.
#[derive(Default)]
struct NowPlaying {
    episode_slug: String,
    episode_name: String,
}

struct DemoApp {
    player: VideoPlayer,
    media: SimulatedMedia,
    engines: SimulatedEngineFactory,
    clock: SystemClock,
    last_frame: Duration,
    bridge: Rc<RefCell<ProgressBridge>>,
    transport: RecordingTransport,
    now_playing: Rc<RefCell<NowPlaying>>,
    episodes: Vec<Episode>,
    resume_policy: ResumePolicy,
    autoplay_policy: AutoplayPolicy,
}

impl DemoApp {
    fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let clock = SystemClock::new();
        let media = SimulatedMedia::new()
            .with_duration(596.0)
            .with_load_latency(Duration::from_millis(600));
        let engines = SimulatedEngineFactory::new().with_media(&media).with_ladder(vec![
            LevelInfo {
                height: Some(360),
                bitrate: 800_000,
            },
            LevelInfo {
                height: Some(720),
                bitrate: 2_500_000,
            },
            LevelInfo {
                height: Some(1080),
                bitrate: 5_000_000,
            },
        ]);

        let transport = RecordingTransport::new();
        let bridge = Rc::new(RefCell::new(ProgressBridge::new(
            BridgeConfig::default(),
            Box::new(StaticSession(Some("demo-token".to_string()))),
            Box::new(transport.clone()),
        )));
        let now_playing = Rc::new(RefCell::new(NowPlaying::default()));

        let resume_policy = ResumePolicy::default();
        let controller = {
            let bridge = bridge.clone();
            let now_playing = now_playing.clone();
            let clock = clock.clone();
            PlayerController::new(
                Box::new(media.sink()),
                Box::new(RecordingShell::new()),
                Box::new(engines.clone()),
                Box::new(clock.clone()),
            )
            .with_resume_policy(resume_policy)
            .with_progress_callback(move |snapshot| {
                let now_playing = now_playing.borrow();
                let entry = HistoryEntry::new(SHOW_SLUG, &now_playing.episode_slug, snapshot)
                    .with_movie_name(SHOW_NAME)
                    .with_episode_name(&now_playing.episode_name);
                bridge.borrow_mut().record(entry, clock.now());
            })
        };

        let episodes: Vec<Episode> = (1..=EPISODE_COUNT)
            .map(|n| {
                let episode = Episode::new(format!("tap-{n:02}"));
                // Leave a few unnamed to show the fallback label
                if n % 4 == 0 {
                    episode
                } else {
                    episode.with_name(format!("Chapter {n}"))
                }
            })
            .collect();

        let player = VideoPlayer::new(controller)
            .with_episodes(Box::new(NoScrollLock), episodes.clone());

        let mut app = Self {
            player,
            media,
            engines,
            last_frame: clock.now(),
            clock,
            bridge,
            transport,
            now_playing,
            episodes,
            resume_policy,
            autoplay_policy: AutoplayPolicy::Allow,
        };
        app.play_episode(0);
        app
    }

    fn play_episode(&mut self, index: usize) {
        let Some(episode) = self.episodes.get(index) else {
            return;
        };
        let slug = episode.slug.clone();
        let name = episode.display_name(index);

        // Flush progress for the episode being left before switching attribution
        self.player.controller_mut().unmount();
        {
            let mut now_playing = self.now_playing.borrow_mut();
            now_playing.episode_slug = slug.clone();
            now_playing.episode_name = name.clone();
        }

        let resume = self
            .bridge
            .borrow()
            .history()
            .resume_for(SHOW_SLUG, &slug, &self.resume_policy);
        if let Some(hint) = &resume {
            tracing::info!("Resuming {slug} at {:.0}s", hint.current_time);
        }

        let source = StreamSource::new(episode_url(&slug))
            .with_title(format!("{SHOW_NAME} · {name}"))
            .with_episodes(self.episodes.len() > 1);
        self.player.load(source, resume);
        self.player.set_current_episode(Some(slug));
    }

    fn play_slug(&mut self, slug: &str) {
        if let Some(index) = self.episodes.iter().position(|e| e.slug == slug) {
            self.play_episode(index);
        }
    }

    fn step_simulation(&mut self) {
        let now = self.clock.now();
        let dt = now.saturating_sub(self.last_frame);
        self.last_frame = now;
        self.media.advance(dt);
        self.bridge.borrow_mut().tick(now);
    }

    fn side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("demo_panel")
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Simulation");
                ui.horizontal(|ui| {
                    if ui.button("Stall").clicked() {
                        self.media.stall();
                    }
                    if ui.button("Ready").clicked() {
                        self.media.make_ready();
                    }
                });
                ui.horizontal(|ui| {
                    if ui.button("Network error").clicked() {
                        self.engines.engine().emit(EngineEvent::Error {
                            kind: EngineErrorKind::Network,
                            fatal: true,
                            details: "manifestLoadError".to_string(),
                        });
                    }
                    if ui.button("Media error").clicked() {
                        self.engines.engine().emit(EngineEvent::Error {
                            kind: EngineErrorKind::Media,
                            fatal: true,
                            details: "bufferAppendError".to_string(),
                        });
                    }
                });

                ui.separator();
                ui.label("Autoplay policy");
                let before = self.autoplay_policy;
                ui.radio_value(&mut self.autoplay_policy, AutoplayPolicy::Allow, "Allow");
                ui.radio_value(
                    &mut self.autoplay_policy,
                    AutoplayPolicy::RequireMuted,
                    "Muted only",
                );
                ui.radio_value(&mut self.autoplay_policy, AutoplayPolicy::Deny, "Deny");
                if before != self.autoplay_policy {
                    self.media.set_autoplay_policy(self.autoplay_policy);
                }

                ui.separator();
                ui.heading("Session");
                if let Some(session) = self.player.controller().session() {
                    ui.monospace(format!("phase     {:?}", session.phase));
                    ui.monospace(format!(
                        "position  {:.1} / {:.1}",
                        session.current_time, session.duration
                    ));
                    ui.monospace(format!("buffered  {:.1}", session.buffered_end));
                    ui.monospace(format!(
                        "volume    {:.2}{}",
                        session.volume,
                        if session.muted { " (muted)" } else { "" }
                    ));
                    ui.monospace(format!("brightness {:.2}", session.brightness));
                    ui.monospace(format!("level     {}", session.active_level));
                }
                ui.monospace(format!(
                    "gestures  {:?}",
                    self.player.controller().gesture_phase()
                ));

                ui.separator();
                ui.heading("Watch history");
                ui.label(format!("remote writes: {}", self.transport.requests().len()));
                let bridge = self.bridge.borrow();
                for entry in bridge.history().entries() {
                    ui.label(format!(
                        "{} / {}  {:.0}s",
                        entry.movie_name, entry.episode_name, entry.current_time
                    ));
                    ui.add(egui::ProgressBar::new(entry.progress_ratio()).desired_height(4.0));
                }
            });
    }
}

impl eframe::App for DemoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.step_simulation();
        self.side_panel(ctx);

        let mut navigate = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            let width = ui.available_width();
            let size = egui::vec2(width, (width * 9.0 / 16.0).min(ui.available_height()));
            let response = ui.video_player(&mut self.player, size);
            navigate = response.navigate;
        });

        if let Some(slug) = navigate {
            self.play_slug(&slug);
        }

        // The simulation advances with wall time
        ctx.request_repaint_after(Duration::from_millis(50));
    }
}

impl Drop for DemoApp {
    fn drop(&mut self) {
        self.player.controller_mut().unmount();
        self.bridge.borrow_mut().flush();
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "reelplay=debug,reelplay_core=debug,reelplay_demo=debug",
                )
            }),
        )
        .init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("reelplay Demo"),
        ..Default::default()
    };

    eframe::run_native(
        "reelplay Demo",
        options,
        Box::new(|cc| Ok(Box::new(DemoApp::new(cc)))),
    )
}
