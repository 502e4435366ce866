//! Compile-time regression test for the reelplay public API surface.
//!
//! The widget crate re-exports the engine so hosts depend on one crate. If
//! this file compiles, the re-exports work.

#[allow(unused_imports)]
use reelplay::{
    EpisodeDrawerStyle, PageLifecycleEvent, SeekInput, UnloadFlush, VideoControls,
    VideoControlsConfig, VideoControlsResponse, VideoPlayer, VideoPlayerExt, VideoPlayerResponse,
};

#[allow(unused_imports)]
use reelplay::reelplay_core::{
    PlaybackPhase, PlayerConfig, PlayerController, ResumeHint, ResumePolicy, StreamSource,
};

use reelplay::reelplay_core::drawer::{Episode, NoScrollLock};
use reelplay::reelplay_core::sim::{RecordingShell, SimulatedEngineFactory, SimulatedMedia};
use reelplay::reelplay_core::ManualClock;

fn controller(media: &SimulatedMedia) -> PlayerController {
    PlayerController::new(
        Box::new(media.sink()),
        Box::new(RecordingShell::new()),
        Box::new(SimulatedEngineFactory::new().with_media(media)),
        Box::new(ManualClock::new()),
    )
}

#[test]
fn public_types_are_accessible() {
    fn _assert_types() {
        let _: fn() -> VideoControlsConfig = VideoControlsConfig::default;
        let _: fn() -> EpisodeDrawerStyle = EpisodeDrawerStyle::default;
        let _: fn() -> SeekInput = || SeekInput::Leave;
    }
}

#[test]
fn video_player_constructors() {
    let media = SimulatedMedia::new();
    let mut player = VideoPlayer::new(controller(&media))
        .with_controls(true)
        .with_picture_in_picture(false)
        .with_episodes(
            Box::new(NoScrollLock),
            vec![Episode::new("ep-1"), Episode::new("ep-2")],
        );
    assert!(player.controller().session().is_none());

    player.load(
        StreamSource::new("https://cdn.example/show/ep-1/index.m3u8").with_episodes(true),
        None,
    );
    let session = player.controller().session().unwrap();
    assert_eq!(session.phase, PlaybackPhase::Loading);
    assert!(!player.is_drawer_open());
}

#[test]
fn unload_flush_writes_latest_player_progress() {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use reelplay::reelplay_core::progress::{HistoryEntry, ProgressBridge, StaticSession};
    use reelplay::reelplay_core::sim::RecordingTransport;
    use reelplay::reelplay_core::BridgeConfig;

    let transport = RecordingTransport::new();
    let bridge = Rc::new(RefCell::new(ProgressBridge::new(
        BridgeConfig::default(),
        Box::new(StaticSession(Some("token".into()))),
        Box::new(transport.clone()),
    )));

    let media = SimulatedMedia::new().with_duration(1200.0);
    let feed = Rc::clone(&bridge);
    let controller = controller(&media).with_progress_callback(move |snapshot| {
        let entry = HistoryEntry::new("movie-a", "ep-1", snapshot);
        feed.borrow_mut().record(entry, Duration::ZERO);
    });
    let player = Rc::new(RefCell::new(VideoPlayer::new(controller)));
    player
        .borrow_mut()
        .load(StreamSource::new("https://cdn.example/movie-a/ep-1.mp4"), None);
    media.make_ready();
    player.borrow_mut().controller_mut().tick();
    media.set_position(300.0);

    let (flush_player, flush_bridge) = (Rc::clone(&player), Rc::clone(&bridge));
    let mut unload = UnloadFlush::new(move || {
        flush_player.borrow_mut().controller_mut().snapshot_progress();
        flush_bridge.borrow_mut().flush();
    });
    assert!(unload.handle(PageLifecycleEvent::VisibilityChange { hidden: true }));
    assert!(!unload.handle(PageLifecycleEvent::PageHide));

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].keepalive);
    assert!(requests[0].body.contains("\"currentTime\":300.0"), "{}", requests[0].body);
    // Hiding the page does not tear the player down
    assert!(player.borrow().controller().session().is_some());
}
