//! egui video player widget.
//!
//! [`VideoPlayer`] owns a [`PlayerController`] and maps egui input onto it:
//! pointer and keyboard events go to the transport controls, touch events go
//! to the gesture interpreter. Each frame it pumps the controller, paints the
//! overlays (loading, unavailable, seek and swipe feedback, brightness
//! filter), draws the controls bar and the episode drawer, and schedules the
//! next repaint from the controller's timers.

use std::time::Duration;

use egui::{Align2, Color32, CornerRadius, FontId, Pos2, Rect, Response, Sense, Ui, Vec2};
use reelplay_core::controller::{GestureIndicator, SeekIndicator};
use reelplay_core::controls::Key;
use reelplay_core::drawer::{DrawerEvent, Episode, EpisodeDrawer, ScrollLockHost};
use reelplay_core::gesture::{Side, SurfaceRect, TouchPoint};
use reelplay_core::{PlaybackPhase, PlayerController, ResumeHint, StreamSource};

use super::episode_drawer::{show_episode_drawer, EpisodeDrawerStyle};
use super::video_controls::{SeekInput, VideoControls, VideoControlsConfig, VideoControlsResponse};

/// Repaint interval while a source is mounted, so position and buffered
/// range stay current even when no timer is due.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Maps an egui key to a player shortcut key.
pub(crate) fn map_key(key: egui::Key) -> Option<Key> {
    Some(match key {
        egui::Key::Space => Key::Space,
        egui::Key::K => Key::K,
        egui::Key::M => Key::M,
        egui::Key::F => Key::F,
        egui::Key::ArrowLeft => Key::ArrowLeft,
        egui::Key::ArrowRight => Key::ArrowRight,
        egui::Key::ArrowUp => Key::ArrowUp,
        egui::Key::ArrowDown => Key::ArrowDown,
        egui::Key::Escape => Key::Escape,
        _ => return None,
    })
}

/// Tint approximating a CSS `brightness()` filter over the video.
pub(crate) fn brightness_overlay(factor: f32) -> Option<Color32> {
    if factor < 1.0 {
        let alpha = ((1.0 - factor) * 255.0).round().clamp(0.0, 255.0) as u8;
        Some(Color32::from_black_alpha(alpha))
    } else if factor > 1.0 {
        let alpha = ((factor - 1.0) * 64.0).round().clamp(0.0, 255.0) as u8;
        Some(Color32::from_white_alpha(alpha))
    } else {
        None
    }
}

fn surface_of(rect: Rect) -> SurfaceRect {
    SurfaceRect::new(rect.min.x, rect.min.y, rect.width(), rect.height())
}

fn touch_point(pos: Pos2) -> TouchPoint {
    TouchPoint::new(pos.x, pos.y)
}

/// An egui widget around a [`PlayerController`].
pub struct VideoPlayer {
    controller: PlayerController,
    controls_config: VideoControlsConfig,
    drawer_style: EpisodeDrawerStyle,
    drawer: Option<EpisodeDrawer<Box<dyn ScrollLockHost>>>,
    drawer_open: bool,
    show_controls: bool,
    picture_in_picture: bool,
    keyboard_shortcuts: bool,
    /// Paint an opaque backdrop. Off on the web, where the `<video>` element
    /// sits behind a transparent canvas.
    paint_background: bool,
    /// Touch currently tracked by the gesture layer
    active_touch: Option<egui::TouchId>,
    /// Set once touch input is seen; suppresses emulated mouse clicks
    touch_device: bool,
    /// Control hit areas from the previous frame
    last_controls: VideoControlsResponse,
}

impl VideoPlayer {
    pub fn new(controller: PlayerController) -> Self {
        Self {
            controller,
            controls_config: VideoControlsConfig::default(),
            drawer_style: EpisodeDrawerStyle::default(),
            drawer: None,
            drawer_open: false,
            show_controls: true,
            picture_in_picture: true,
            keyboard_shortcuts: true,
            paint_background: !cfg!(target_arch = "wasm32"),
            active_touch: None,
            touch_device: false,
            last_controls: VideoControlsResponse::default(),
        }
    }

    /// Enables or disables the controls overlay.
    pub fn with_controls(mut self, show_controls: bool) -> Self {
        self.show_controls = show_controls;
        self
    }

    pub fn with_controls_config(mut self, config: VideoControlsConfig) -> Self {
        self.controls_config = config;
        self
    }

    pub fn with_drawer_style(mut self, style: EpisodeDrawerStyle) -> Self {
        self.drawer_style = style;
        self
    }

    /// Attaches an episode list. The drawer button is shown for sources that
    /// have multiple episodes.
    pub fn with_episodes(
        mut self,
        scroll_lock: Box<dyn ScrollLockHost>,
        episodes: Vec<Episode>,
    ) -> Self {
        self.drawer = Some(EpisodeDrawer::new(scroll_lock, episodes));
        self
    }

    pub fn with_picture_in_picture(mut self, available: bool) -> Self {
        self.picture_in_picture = available;
        self
    }

    pub fn with_keyboard_shortcuts(mut self, enabled: bool) -> Self {
        self.keyboard_shortcuts = enabled;
        self
    }

    pub fn with_background(mut self, paint_background: bool) -> Self {
        self.paint_background = paint_background;
        self
    }

    /// Loads a source, replacing the current one.
    pub fn load(&mut self, source: StreamSource, resume: Option<ResumeHint>) {
        self.active_touch = None;
        self.controller.load(source, resume);
    }

    /// Marks the episode being played in the drawer.
    pub fn set_current_episode(&mut self, slug: Option<String>) {
        if let Some(drawer) = self.drawer.as_mut() {
            drawer.set_current(slug);
        }
    }

    pub fn set_episodes(&mut self, episodes: Vec<Episode>) {
        if let Some(drawer) = self.drawer.as_mut() {
            drawer.set_episodes(episodes);
        }
    }

    pub fn is_drawer_open(&self) -> bool {
        self.drawer_open
    }

    pub fn set_drawer_open(&mut self, open: bool) {
        self.drawer_open = open && self.drawer.is_some();
        if let Some(drawer) = self.drawer.as_mut() {
            drawer.sync(self.drawer_open);
        }
    }

    pub fn controller(&self) -> &PlayerController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlayerController {
        &mut self.controller
    }

    /// Shows the player in a rect of the given size.
    pub fn show(&mut self, ui: &mut Ui, size: Vec2) -> VideoPlayerResponse {
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());

        self.controller.tick();
        let swiping = self.handle_touch(ui, rect);
        self.handle_keys(ui, &response);
        if response.hovered() && ui.input(|i| i.pointer.delta() != Vec2::ZERO) {
            self.controller.pointer_moved();
        }

        self.render(ui, rect);

        let controls_response = self.show_controls_bar(ui, rect);
        let toggle_fullscreen = controls_response.toggle_fullscreen;
        self.apply_controls(&controls_response);

        let clicked = response.clicked()
            && !controls_response.used()
            && !self.touch_device
            && !self.drawer_open;
        if clicked {
            if self.controller.quality_menu_open() {
                self.controller.close_quality_menu();
            } else {
                self.controller.click_surface();
            }
        }
        self.last_controls = controls_response;

        let navigate = self.show_drawer(ui, rect);

        if self.controller.session().is_some() {
            let wake = self
                .controller
                .next_wake()
                .map_or(POLL_INTERVAL, |wake| wake.min(POLL_INTERVAL));
            ui.ctx().request_repaint_after(wake);
        }

        VideoPlayerResponse {
            response,
            clicked,
            swiping,
            toggle_fullscreen,
            navigate,
        }
    }

    /// Feeds the first touch in the video rect to the gesture layer.
    ///
    /// Returns true while the touch is a swipe, so the host can suppress
    /// scrolling.
    fn handle_touch(&mut self, ui: &Ui, rect: Rect) -> bool {
        let touches: Vec<_> = ui.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Touch { id, phase, pos, .. } => Some((*id, *phase, *pos)),
                    _ => None,
                })
                .collect()
        });

        let surface = surface_of(rect);
        let mut swiping = false;
        for (id, phase, pos) in touches {
            self.touch_device = true;
            match phase {
                egui::TouchPhase::Start if self.active_touch.is_none() && rect.contains(pos) => {
                    self.active_touch = Some(id);
                    let in_control = self.drawer_open || self.last_controls.contains(pos);
                    self.controller
                        .touch_start(touch_point(pos), surface, in_control);
                }
                egui::TouchPhase::Move if self.active_touch == Some(id) => {
                    swiping = self.controller.touch_move(touch_point(pos), surface);
                }
                egui::TouchPhase::End if self.active_touch == Some(id) => {
                    self.active_touch = None;
                    self.controller.touch_end();
                }
                egui::TouchPhase::Cancel if self.active_touch == Some(id) => {
                    self.active_touch = None;
                    self.controller.touch_cancel();
                }
                _ => {}
            }
        }
        swiping
    }

    fn handle_keys(&mut self, ui: &Ui, response: &Response) {
        if !self.keyboard_shortcuts || ui.ctx().wants_keyboard_input() {
            return;
        }
        let keys: Vec<_> = ui.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key, pressed: true, ..
                    } => map_key(*key),
                    _ => None,
                })
                .collect()
        });

        let fullscreen = self.controller.session().is_some_and(|s| s.fullscreen);
        for key in keys {
            if let Some(DrawerEvent::Close) =
                self.drawer.as_mut().and_then(|d| d.handle_key(key))
            {
                self.set_drawer_open(false);
                continue;
            }
            if response.hovered() || response.has_focus() || fullscreen {
                self.controller.handle_key(key);
            }
        }
    }

    fn render(&self, ui: &Ui, rect: Rect) {
        let painter = ui.painter_at(rect);
        if self.paint_background {
            painter.rect_filled(rect, CornerRadius::ZERO, Color32::BLACK);
        }

        let Some(session) = self.controller.session() else {
            return;
        };

        if let Some(tint) = brightness_overlay(session.brightness) {
            painter.rect_filled(rect, CornerRadius::ZERO, tint);
        }

        match &session.phase {
            PlaybackPhase::Unavailable { .. } => self.render_unavailable(ui, rect),
            phase if phase.is_loading() => self.render_loading(ui, rect),
            _ => {}
        }

        if self.controller.controls_visible() {
            if let Some(title) = self.controller.source().and_then(|s| s.title.as_deref()) {
                self.render_title(ui, rect, title);
            }
        }
        if let Some(indicator) = self.controller.seek_indicator() {
            self.render_seek_indicator(ui, rect, indicator);
        }
        if let Some(indicator) = self.controller.gesture_indicator() {
            self.render_gesture_indicator(ui, rect, indicator);
        }
    }

    /// Renders a loading spinner while the source starts or stalls.
    fn render_loading(&self, ui: &Ui, rect: Rect) {
        let center = rect.center();
        let time = ui.input(|i| i.time);
        let spinner_radius = 20.0;
        let num_dots = 8;

        for i in 0..num_dots {
            let angle = (i as f64 / num_dots as f64) * std::f64::consts::TAU + time * 2.0;
            let x = center.x + (angle.cos() * spinner_radius as f64) as f32;
            let y = center.y + (angle.sin() * spinner_radius as f64) as f32;

            // Fade dots based on position in rotation
            let alpha = ((i as f64 / num_dots as f64 + time * 2.0).fract() * 255.0) as u8;
            ui.painter().circle_filled(
                egui::pos2(x, y),
                4.0,
                Color32::from_rgba_unmultiplied(200, 200, 200, alpha),
            );
        }

        ui.ctx().request_repaint();
    }

    fn render_unavailable(&self, ui: &Ui, rect: Rect) {
        ui.painter()
            .rect_filled(rect, CornerRadius::ZERO, Color32::from_rgb(30, 30, 30));

        let center = rect.center();
        let icon_size = 40.0;
        let stroke = egui::Stroke::new(4.0, Color32::from_rgb(255, 100, 100));
        ui.painter().line_segment(
            [
                egui::pos2(center.x - icon_size / 2.0, center.y - icon_size / 2.0),
                egui::pos2(center.x + icon_size / 2.0, center.y + icon_size / 2.0),
            ],
            stroke,
        );
        ui.painter().line_segment(
            [
                egui::pos2(center.x + icon_size / 2.0, center.y - icon_size / 2.0),
                egui::pos2(center.x - icon_size / 2.0, center.y + icon_size / 2.0),
            ],
            stroke,
        );
        ui.painter().text(
            egui::pos2(center.x, center.y + icon_size),
            Align2::CENTER_TOP,
            "Playback unavailable",
            FontId::proportional(14.0),
            Color32::from_rgb(200, 200, 200),
        );
    }

    fn render_title(&self, ui: &Ui, rect: Rect, title: &str) {
        let band = Rect::from_min_size(rect.min, Vec2::new(rect.width(), 40.0));
        ui.painter()
            .rect_filled(band, CornerRadius::ZERO, Color32::from_black_alpha(120));
        ui.painter().text(
            band.left_center() + Vec2::new(12.0, 0.0),
            Align2::LEFT_CENTER,
            title,
            FontId::proportional(16.0),
            Color32::WHITE,
        );
    }

    /// Double-tap badge on the tapped half.
    fn render_seek_indicator(&self, ui: &Ui, rect: Rect, indicator: &SeekIndicator) {
        let x = match indicator.side {
            Side::Left => rect.min.x + rect.width() * 0.25,
            Side::Right => rect.min.x + rect.width() * 0.75,
        };
        let center = Pos2::new(x, rect.center().y);
        ui.painter()
            .circle_filled(center, 36.0, Color32::from_black_alpha(140));
        ui.painter().text(
            center,
            Align2::CENTER_CENTER,
            format!("{:+}s", indicator.seconds.round() as i64),
            FontId::proportional(16.0),
            Color32::WHITE,
        );
    }

    fn render_gesture_indicator(&self, ui: &Ui, rect: Rect, indicator: &GestureIndicator) {
        let text = match indicator {
            GestureIndicator::Volume(volume) => format!("Volume {:.0}%", volume * 100.0),
            GestureIndicator::Brightness(factor) => format!("Brightness {:.0}%", factor * 100.0),
        };
        let center = Pos2::new(rect.center().x, rect.min.y + rect.height() * 0.2);
        let pill = Rect::from_center_size(center, Vec2::new(150.0, 32.0));
        ui.painter()
            .rect_filled(pill, CornerRadius::same(16), Color32::from_black_alpha(160));
        ui.painter().text(
            center,
            Align2::CENTER_CENTER,
            text,
            FontId::proportional(14.0),
            Color32::WHITE,
        );
    }

    fn show_controls_bar(&self, ui: &mut Ui, rect: Rect) -> VideoControlsResponse {
        if !self.show_controls {
            return VideoControlsResponse::default();
        }
        let Some(session) = self.controller.session() else {
            return VideoControlsResponse::default();
        };
        if matches!(session.phase, PlaybackPhase::Unavailable { .. }) {
            return VideoControlsResponse::default();
        }

        let has_episodes = self.drawer.is_some()
            && self
                .controller
                .source()
                .is_some_and(|s| s.has_multiple_episodes);
        VideoControls::new(session)
            .with_config(self.controls_config.clone())
            .with_visibility(self.controller.controls_visible())
            .with_seek_bar(self.controller.seek_bar())
            .with_quality_menu(self.controller.quality_menu_open())
            .with_episodes(has_episodes)
            .with_picture_in_picture(self.picture_in_picture)
            .show(ui, rect)
    }

    fn apply_controls(&mut self, response: &VideoControlsResponse) {
        let controller = &mut self.controller;
        if response.toggle_playback {
            controller.toggle_play();
        }
        match response.seek {
            Some(SeekInput::Hover(ratio)) => controller.seek_hover(ratio),
            Some(SeekInput::Leave) => controller.seek_leave(),
            Some(SeekInput::Click(ratio)) => controller.seek_click(ratio),
            Some(SeekInput::DragStart(ratio)) => controller.seek_drag_start(ratio),
            Some(SeekInput::DragMove(ratio)) => controller.seek_drag_move(ratio),
            Some(SeekInput::DragEnd) => controller.seek_drag_end(),
            None => {}
        }
        if let Some(volume) = response.set_volume {
            controller.set_volume(volume);
        }
        if response.toggle_mute {
            controller.toggle_mute();
        }
        if response.toggle_quality_menu {
            controller.toggle_quality_menu();
        }
        if let Some(level) = response.select_quality {
            if let Err(err) = controller.select_quality(level) {
                tracing::warn!("Quality selection failed: {err}");
            }
        }
        if response.toggle_picture_in_picture {
            controller.toggle_picture_in_picture();
        }
        if response.toggle_fullscreen {
            controller.toggle_fullscreen();
        }
        if response.toggle_episodes {
            let open = !self.drawer_open;
            self.set_drawer_open(open);
        }
    }

    fn show_drawer(&mut self, ui: &mut Ui, rect: Rect) -> Option<String> {
        let drawer = self.drawer.as_mut()?;
        let mut navigate = None;
        let mut close = false;
        for event in show_episode_drawer(ui, rect, drawer, &self.drawer_style) {
            match event {
                DrawerEvent::Close => close = true,
                DrawerEvent::Navigate(slug) => navigate = Some(slug),
            }
        }
        if close {
            self.set_drawer_open(false);
        }
        navigate
    }
}

/// Response from showing a video player widget.
pub struct VideoPlayerResponse {
    /// The egui response from the widget allocation
    pub response: Response,
    /// Whether the video surface was clicked (desktop pointer only)
    pub clicked: bool,
    /// Whether a vertical swipe is in progress; scrolling should be suppressed
    pub swiping: bool,
    /// Whether fullscreen was toggled from the controls
    pub toggle_fullscreen: bool,
    /// Episode the user picked in the drawer
    pub navigate: Option<String>,
}

/// Extension trait for easily adding video players to egui.
pub trait VideoPlayerExt {
    fn video_player(&mut self, player: &mut VideoPlayer, size: Vec2) -> VideoPlayerResponse;
}

impl VideoPlayerExt for Ui {
    fn video_player(&mut self, player: &mut VideoPlayer, size: Vec2) -> VideoPlayerResponse {
        player.show(self, size)
    }
}
