//! Video player controls UI.
//!
//! Overlay controls drawn at the bottom of the video rect:
//! - Play/Pause button
//! - Mute button and volume slider
//! - Time display (current position / duration)
//! - Seek bar with buffered range, hover preview and drag support
//! - Quality picker (adaptive sources only)
//! - Picture-in-picture, episodes and fullscreen buttons
//!
//! The widget is stateless: it paints from a [`PlaybackSession`] and reports
//! what the user did in a [`VideoControlsResponse`]. Scrub state and menu
//! state live in the controller.

use egui::{Align2, Color32, CornerRadius, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2};
use reelplay_core::controls::{format_time, SeekBar, SeekPreview};
use reelplay_core::{PlaybackSession, AUTO_LEVEL};

/// Configuration for video controls appearance.
#[derive(Clone)]
pub struct VideoControlsConfig {
    /// Height of the controls bar
    pub bar_height: f32,
    /// Background color of the controls bar
    pub bar_color: Color32,
    /// Icon color for buttons
    pub icon_color: Color32,
    /// Progress bar fill color
    pub progress_color: Color32,
    /// Buffered range color
    pub buffered_color: Color32,
    /// Progress bar background color
    pub progress_bg_color: Color32,
    /// Text color for time display
    pub text_color: Color32,
    /// Font size for time display
    pub font_size: f32,
    /// Width of the volume slider track
    pub volume_width: f32,
}

impl Default for VideoControlsConfig {
    fn default() -> Self {
        Self {
            bar_height: 44.0,
            bar_color: Color32::from_rgba_unmultiplied(0, 0, 0, 180),
            icon_color: Color32::WHITE,
            progress_color: Color32::from_rgb(229, 9, 20),
            buffered_color: Color32::from_rgba_unmultiplied(255, 255, 255, 140),
            progress_bg_color: Color32::from_rgba_unmultiplied(255, 255, 255, 60),
            text_color: Color32::WHITE,
            font_size: 12.0,
            volume_width: 64.0,
        }
    }
}

/// Seek bar input for the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekInput {
    Hover(f32),
    Leave,
    Click(f32),
    DragStart(f32),
    DragMove(f32),
    DragEnd,
}

/// Response from video controls interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoControlsResponse {
    /// Whether the play/pause button was clicked
    pub toggle_playback: bool,
    /// Seek bar activity
    pub seek: Option<SeekInput>,
    /// New volume if the slider was used
    pub set_volume: Option<f32>,
    /// Whether the mute button was clicked
    pub toggle_mute: bool,
    /// Whether the quality button was clicked
    pub toggle_quality_menu: bool,
    /// Level picked from the open quality menu
    pub select_quality: Option<i32>,
    /// Whether the picture-in-picture button was clicked
    pub toggle_picture_in_picture: bool,
    /// Whether the episodes button was clicked
    pub toggle_episodes: bool,
    /// Whether fullscreen was toggled
    pub toggle_fullscreen: bool,
    /// Area covered by the controls, `None` while hidden
    pub bar_rect: Option<Rect>,
    /// Area covered by the open quality menu
    pub menu_rect: Option<Rect>,
}

impl VideoControlsResponse {
    /// Whether any control consumed a click or drag this frame.
    pub fn used(&self) -> bool {
        self.toggle_playback
            || self.toggle_mute
            || self.toggle_quality_menu
            || self.toggle_picture_in_picture
            || self.toggle_episodes
            || self.toggle_fullscreen
            || self.set_volume.is_some()
            || self.select_quality.is_some()
            || matches!(
                self.seek,
                Some(
                    SeekInput::Click(_)
                        | SeekInput::DragStart(_)
                        | SeekInput::DragMove(_)
                        | SeekInput::DragEnd
                )
            )
    }

    /// Whether `pos` lies on the controls (bar or quality menu).
    pub fn contains(&self, pos: Pos2) -> bool {
        self.bar_rect.is_some_and(|r| r.contains(pos))
            || self.menu_rect.is_some_and(|r| r.contains(pos))
    }
}

/// Label of the quality button: the pinned rendition, or "Auto".
pub fn quality_button_label(session: &PlaybackSession) -> String {
    if session.active_level == AUTO_LEVEL {
        return "Auto".to_string();
    }
    session
        .quality_levels
        .iter()
        .find(|q| q.level_index == session.active_level)
        .map_or_else(|| "Auto".to_string(), |q| q.label.clone())
}

/// Video player controls widget.
pub struct VideoControls<'a> {
    session: &'a PlaybackSession,
    config: VideoControlsConfig,
    visible: bool,
    /// Played fraction to draw (follows the drag while scrubbing)
    display_ratio: f32,
    preview: Option<SeekPreview>,
    dragging: bool,
    quality_menu_open: bool,
    has_episodes: bool,
    picture_in_picture: bool,
}

impl<'a> VideoControls<'a> {
    /// Creates new video controls.
    pub fn new(session: &'a PlaybackSession) -> Self {
        Self {
            session,
            config: VideoControlsConfig::default(),
            visible: true,
            display_ratio: session.progress_ratio(),
            preview: None,
            dragging: false,
            quality_menu_open: false,
            has_episodes: false,
            picture_in_picture: true,
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: VideoControlsConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets whether controls are visible.
    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Draws the seek bar from the controller's scrub state.
    pub fn with_seek_bar(mut self, seek_bar: &SeekBar) -> Self {
        self.display_ratio = seek_bar.display_ratio(self.session.progress_ratio());
        self.preview = seek_bar.preview();
        self.dragging = seek_bar.is_dragging();
        self
    }

    pub fn with_quality_menu(mut self, open: bool) -> Self {
        self.quality_menu_open = open;
        self
    }

    /// Shows the episodes button.
    pub fn with_episodes(mut self, has_episodes: bool) -> Self {
        self.has_episodes = has_episodes;
        self
    }

    /// Shows the picture-in-picture button.
    pub fn with_picture_in_picture(mut self, available: bool) -> Self {
        self.picture_in_picture = available;
        self
    }

    fn has_quality_menu(&self) -> bool {
        self.session.quality_levels.len() > 1
    }

    /// Shows the video controls.
    ///
    /// The controls are rendered as an overlay at the bottom of the given rect.
    pub fn show(&self, ui: &mut Ui, video_rect: Rect) -> VideoControlsResponse {
        let mut response = VideoControlsResponse::default();

        if !self.visible {
            return response;
        }

        let controls_rect = Rect::from_min_size(
            Pos2::new(video_rect.min.x, video_rect.max.y - self.config.bar_height),
            Vec2::new(video_rect.width(), self.config.bar_height),
        );
        response.bar_rect = Some(controls_rect);

        ui.painter()
            .rect_filled(controls_rect, CornerRadius::ZERO, self.config.bar_color);

        // Layout: [Play] [Mute] [Volume] [Time] [Seek Bar] [Quality] [PiP] [Episodes] [Fullscreen]
        let padding = 8.0;
        let button_size = self.config.bar_height - padding * 2.0;
        let top = controls_rect.min.y + padding;

        let mut left = controls_rect.min.x + padding;
        let mut take_left = |width: f32| {
            let rect = Rect::from_min_size(Pos2::new(left, top), Vec2::new(width, button_size));
            left += width + padding / 2.0;
            rect
        };
        let play_rect = take_left(button_size);
        let mute_rect = take_left(button_size);
        let volume_rect = take_left(self.config.volume_width);
        let time_rect = take_left(96.0);

        let mut right = controls_rect.max.x - padding;
        let mut take_right = |width: f32| {
            let rect = Rect::from_min_size(
                Pos2::new(right - width, top),
                Vec2::new(width, button_size),
            );
            right -= width + padding / 2.0;
            rect
        };
        let fullscreen_rect = take_right(button_size);
        let episodes_rect = self.has_episodes.then(|| take_right(button_size));
        let pip_rect = self.picture_in_picture.then(|| take_right(button_size));
        let quality_rect = self.has_quality_menu().then(|| take_right(56.0));

        let seek_bar_height = 4.0;
        let seek_bar_rect = Rect::from_min_max(
            Pos2::new(left + padding / 2.0, controls_rect.center().y - seek_bar_height / 2.0),
            Pos2::new(
                (right - padding / 2.0).max(left + padding / 2.0),
                controls_rect.center().y + seek_bar_height / 2.0,
            ),
        );

        response.toggle_playback = self.draw_play_button(ui, play_rect);
        response.toggle_mute = self.draw_mute_button(ui, mute_rect);
        response.set_volume = self.draw_volume_slider(ui, volume_rect);
        self.draw_time_display(ui, time_rect);
        if seek_bar_rect.width() > 0.0 {
            response.seek = self.draw_seek_bar(ui, seek_bar_rect);
        }

        if let Some(rect) = quality_rect {
            response.toggle_quality_menu = self.draw_quality_button(ui, rect);
            if self.quality_menu_open {
                let (menu_rect, selected) = self.draw_quality_menu(ui, rect);
                response.menu_rect = Some(menu_rect);
                response.select_quality = selected;
            }
        }
        if let Some(rect) = pip_rect {
            response.toggle_picture_in_picture = self.draw_pip_button(ui, rect);
        }
        if let Some(rect) = episodes_rect {
            response.toggle_episodes = self.draw_episodes_button(ui, rect);
        }
        response.toggle_fullscreen = self.draw_fullscreen_button(ui, fullscreen_rect);

        response
    }

    fn hover_background(&self, ui: &Ui, rect: Rect, hovered: bool) {
        if hovered {
            ui.painter().rect_filled(
                rect,
                CornerRadius::same(4),
                Color32::from_rgba_unmultiplied(255, 255, 255, 30),
            );
        }
    }

    /// Draws the play/pause button.
    fn draw_play_button(&self, ui: &mut Ui, rect: Rect) -> bool {
        let response = ui.allocate_rect(rect, Sense::click());
        self.hover_background(ui, rect, response.hovered());

        let center = rect.center();
        let icon_size = rect.width() * 0.5;

        if self.session.playing {
            // Pause icon (two vertical bars)
            let bar_width = icon_size * 0.25;
            let gap = icon_size * 0.25;
            for dx in [-(gap + bar_width) / 2.0, (gap + bar_width) / 2.0] {
                let bar = Rect::from_center_size(
                    Pos2::new(center.x + dx, center.y),
                    Vec2::new(bar_width, icon_size),
                );
                ui.painter()
                    .rect_filled(bar, CornerRadius::same(2), self.config.icon_color);
            }
        } else {
            let points = vec![
                Pos2::new(center.x - icon_size * 0.4, center.y - icon_size * 0.5),
                Pos2::new(center.x - icon_size * 0.4, center.y + icon_size * 0.5),
                Pos2::new(center.x + icon_size * 0.5, center.y),
            ];
            ui.painter().add(egui::Shape::convex_polygon(
                points,
                self.config.icon_color,
                Stroke::NONE,
            ));
        }

        response.clicked()
    }

    /// Draws the seek bar and reports hover, click and drag activity.
    fn draw_seek_bar(&self, ui: &mut Ui, rect: Rect) -> Option<SeekInput> {
        // Expand the clickable area for easier interaction
        let hit_rect = rect.expand2(Vec2::new(0.0, 10.0));
        let response = ui.allocate_rect(hit_rect, Sense::click_and_drag());
        let painter = ui.painter();

        painter.rect_filled(rect, CornerRadius::same(2), self.config.progress_bg_color);

        let buffered = self.session.buffered_ratio();
        if buffered > 0.0 {
            let buffered_rect =
                Rect::from_min_size(rect.min, Vec2::new(rect.width() * buffered, rect.height()));
            painter.rect_filled(buffered_rect, CornerRadius::same(2), self.config.buffered_color);
        }

        let progress_width = rect.width() * self.display_ratio;
        let progress_rect = Rect::from_min_size(rect.min, Vec2::new(progress_width, rect.height()));
        painter.rect_filled(progress_rect, CornerRadius::same(2), self.config.progress_color);

        if response.hovered() || self.dragging {
            let handle_center = Pos2::new(rect.min.x + progress_width, rect.center().y);
            painter.circle_filled(handle_center, 7.0, self.config.progress_color);
        }

        if let Some(preview) = self.preview {
            let anchor = Pos2::new(rect.min.x + rect.width() * preview.ratio, rect.min.y - 14.0);
            let galley = painter.layout_no_wrap(
                format_time(preview.time),
                FontId::proportional(self.config.font_size),
                self.config.text_color,
            );
            let label_rect = Rect::from_center_size(anchor, galley.size() + Vec2::new(10.0, 6.0));
            painter.rect_filled(
                label_rect,
                CornerRadius::same(4),
                Color32::from_rgba_unmultiplied(0, 0, 0, 200),
            );
            painter.galley(
                label_rect.center() - galley.size() / 2.0,
                galley,
                self.config.text_color,
            );
        }

        let ratio_at = |pos: Pos2| SeekBar::ratio_at(pos.x, rect.min.x, rect.width());
        if response.drag_started() {
            response
                .interact_pointer_pos()
                .map(|pos| SeekInput::DragStart(ratio_at(pos)))
        } else if response.drag_stopped() {
            Some(SeekInput::DragEnd)
        } else if response.dragged() {
            response
                .interact_pointer_pos()
                .map(|pos| SeekInput::DragMove(ratio_at(pos)))
        } else if response.clicked() {
            response
                .interact_pointer_pos()
                .map(|pos| SeekInput::Click(ratio_at(pos)))
        } else if let Some(pos) = response.hover_pos() {
            Some(SeekInput::Hover(ratio_at(pos)))
        } else if self.preview.is_some() {
            Some(SeekInput::Leave)
        } else {
            None
        }
    }

    /// Draws the time display.
    fn draw_time_display(&self, ui: &mut Ui, rect: Rect) {
        let current = format_time(self.session.current_time);
        let total = if self.session.has_duration() {
            format_time(self.session.duration)
        } else {
            "--:--".to_string()
        };

        ui.painter().text(
            rect.left_center(),
            Align2::LEFT_CENTER,
            format!("{current} / {total}"),
            FontId::proportional(self.config.font_size),
            self.config.text_color,
        );
    }

    /// Draws the mute/unmute button.
    fn draw_mute_button(&self, ui: &mut Ui, rect: Rect) -> bool {
        let response = ui.allocate_rect(rect, Sense::click());
        self.hover_background(ui, rect, response.hovered());

        let center = rect.center();
        let icon_size = rect.width() * 0.4;

        let speaker_width = icon_size * 0.3;
        let speaker_height = icon_size * 0.5;
        let speaker_rect = Rect::from_center_size(
            Pos2::new(center.x - icon_size * 0.2, center.y),
            Vec2::new(speaker_width, speaker_height),
        );
        ui.painter()
            .rect_filled(speaker_rect, CornerRadius::same(1), self.config.icon_color);

        let cone_points = vec![
            Pos2::new(center.x - icon_size * 0.05, center.y - speaker_height / 2.0),
            Pos2::new(center.x - icon_size * 0.05, center.y + speaker_height / 2.0),
            Pos2::new(center.x + icon_size * 0.3, center.y + icon_size * 0.5),
            Pos2::new(center.x + icon_size * 0.3, center.y - icon_size * 0.5),
        ];
        ui.painter().add(egui::Shape::convex_polygon(
            cone_points,
            self.config.icon_color,
            Stroke::NONE,
        ));

        if self.session.muted || self.session.volume == 0.0 {
            let stroke = Stroke::new(2.0, Color32::from_rgb(255, 100, 100));
            let x = center.x + icon_size * 0.7;
            let r = icon_size * 0.25;
            ui.painter().line_segment(
                [Pos2::new(x - r, center.y - r), Pos2::new(x + r, center.y + r)],
                stroke,
            );
            ui.painter().line_segment(
                [Pos2::new(x - r, center.y + r), Pos2::new(x + r, center.y - r)],
                stroke,
            );
        } else {
            // Quiet volume draws a single wave
            let waves = (self.session.volume * 3.0).ceil().clamp(1.0, 2.0) as usize;
            let wave_stroke = Stroke::new(1.5, self.config.icon_color);
            for i in 0..waves {
                let radius = icon_size * (0.5 + i as f32 * 0.3);
                let origin = Pos2::new(center.x, center.y);
                let points: Vec<Pos2> = (0..=6)
                    .map(|j| {
                        let angle = (j as f32 / 6.0 - 0.5) * std::f32::consts::FRAC_PI_2;
                        Pos2::new(
                            origin.x + radius * angle.cos(),
                            origin.y + radius * angle.sin(),
                        )
                    })
                    .collect();
                ui.painter().add(egui::Shape::line(points, wave_stroke));
            }
        }

        response.clicked()
    }

    /// Draws the volume slider. Returns the new volume while clicked or dragged.
    fn draw_volume_slider(&self, ui: &mut Ui, rect: Rect) -> Option<f32> {
        let response = ui.allocate_rect(rect, Sense::click_and_drag());
        let track = Rect::from_center_size(rect.center(), Vec2::new(rect.width(), 4.0));
        let level = if self.session.muted {
            0.0
        } else {
            self.session.volume.clamp(0.0, 1.0)
        };

        ui.painter()
            .rect_filled(track, CornerRadius::same(2), self.config.progress_bg_color);
        let filled = Rect::from_min_size(track.min, Vec2::new(track.width() * level, track.height()));
        ui.painter()
            .rect_filled(filled, CornerRadius::same(2), self.config.icon_color);
        ui.painter().circle_filled(
            Pos2::new(track.min.x + track.width() * level, track.center().y),
            if response.hovered() || response.dragged() { 6.0 } else { 4.0 },
            self.config.icon_color,
        );

        if response.clicked() || response.dragged() {
            response
                .interact_pointer_pos()
                .map(|pos| SeekBar::ratio_at(pos.x, track.min.x, track.width()))
        } else {
            None
        }
    }

    fn draw_quality_button(&self, ui: &mut Ui, rect: Rect) -> bool {
        let response = ui.allocate_rect(rect, Sense::click());
        self.hover_background(ui, rect, response.hovered() || self.quality_menu_open);
        ui.painter().text(
            rect.center(),
            Align2::CENTER_CENTER,
            quality_button_label(self.session),
            FontId::proportional(self.config.font_size),
            self.config.text_color,
        );
        response.clicked()
    }

    /// Draws the quality menu above its button.
    fn draw_quality_menu(&self, ui: &mut Ui, button_rect: Rect) -> (Rect, Option<i32>) {
        let row_height = 26.0;
        let width = 128.0;
        let levels = &self.session.quality_levels;
        let height = row_height * levels.len() as f32 + 8.0;
        let menu_rect = Rect::from_min_size(
            Pos2::new(button_rect.max.x - width, button_rect.min.y - height - 12.0),
            Vec2::new(width, height),
        );

        ui.painter().rect_filled(
            menu_rect,
            CornerRadius::same(6),
            Color32::from_rgba_unmultiplied(20, 20, 20, 235),
        );

        let mut selected = None;
        for (row, level) in levels.iter().enumerate() {
            let row_rect = Rect::from_min_size(
                Pos2::new(menu_rect.min.x + 4.0, menu_rect.min.y + 4.0 + row as f32 * row_height),
                Vec2::new(width - 8.0, row_height),
            );
            let response = ui.allocate_rect(row_rect, Sense::click());
            let active = level.level_index == self.session.active_level;
            self.hover_background(ui, row_rect, response.hovered());

            let color = if active {
                self.config.progress_color
            } else {
                self.config.text_color
            };
            ui.painter().text(
                Pos2::new(row_rect.min.x + 10.0, row_rect.center().y),
                Align2::LEFT_CENTER,
                &level.label,
                FontId::proportional(self.config.font_size + 1.0),
                color,
            );
            if response.clicked() {
                selected = Some(level.level_index);
            }
        }

        (menu_rect, selected)
    }

    /// Draws the picture-in-picture button (small window inside a frame).
    fn draw_pip_button(&self, ui: &mut Ui, rect: Rect) -> bool {
        let response = ui.allocate_rect(rect, Sense::click());
        self.hover_background(ui, rect, response.hovered());

        let outer = Rect::from_center_size(rect.center(), rect.size() * Vec2::new(0.6, 0.45));
        ui.painter().rect_stroke(
            outer,
            CornerRadius::same(2),
            Stroke::new(1.5, self.config.icon_color),
            egui::StrokeKind::Inside,
        );
        let inner = Rect::from_min_max(
            Pos2::new(outer.center().x + 1.0, outer.center().y + 1.0),
            outer.max - Vec2::splat(2.0),
        );
        let fill = if self.session.picture_in_picture {
            self.config.progress_color
        } else {
            self.config.icon_color
        };
        ui.painter().rect_filled(inner, CornerRadius::same(1), fill);

        response.clicked()
    }

    /// Draws the episodes button (list icon).
    fn draw_episodes_button(&self, ui: &mut Ui, rect: Rect) -> bool {
        let response = ui.allocate_rect(rect, Sense::click());
        self.hover_background(ui, rect, response.hovered());

        let center = rect.center();
        let half = rect.width() * 0.25;
        let stroke = Stroke::new(2.0, self.config.icon_color);
        for dy in [-half * 0.7, 0.0, half * 0.7] {
            ui.painter().line_segment(
                [
                    Pos2::new(center.x - half, center.y + dy),
                    Pos2::new(center.x + half, center.y + dy),
                ],
                stroke,
            );
        }

        response.clicked()
    }

    /// Draws the fullscreen button. Corners point outward to enter, inward to exit.
    fn draw_fullscreen_button(&self, ui: &mut Ui, rect: Rect) -> bool {
        let response = ui.allocate_rect(rect, Sense::click());
        self.hover_background(ui, rect, response.hovered());

        let center = rect.center();
        let icon_size = rect.width() * 0.3;
        let corner_len = icon_size * 0.6;
        let stroke = Stroke::new(2.0, self.config.icon_color);
        let inward = if self.session.fullscreen { -1.0 } else { 1.0 };

        for (sx, sy) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
            let corner = if inward > 0.0 {
                Pos2::new(center.x + sx * icon_size, center.y + sy * icon_size)
            } else {
                Pos2::new(
                    center.x + sx * (icon_size - corner_len),
                    center.y + sy * (icon_size - corner_len),
                )
            };
            let arm = corner_len * inward;
            ui.painter()
                .line_segment([corner, Pos2::new(corner.x - sx * arm, corner.y)], stroke);
            ui.painter()
                .line_segment([corner, Pos2::new(corner.x, corner.y - sy * arm)], stroke);
        }

        response.clicked()
    }
}
