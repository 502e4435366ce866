//! Episode drawer rendering.
//!
//! Draws an [`EpisodeDrawer`] as a panel sliding over the right side of the
//! video, with a dimmed backdrop that closes it on click. The active episode
//! is highlighted and scrolled to the center when the drawer opens.

use egui::{Align, Align2, Color32, CornerRadius, FontId, Layout, Rect, RichText, Sense, Ui};
use reelplay_core::drawer::{DrawerEvent, EpisodeDrawer, ScrollLockHost};

/// Appearance of the episode drawer.
#[derive(Clone)]
pub struct EpisodeDrawerStyle {
    /// Panel width; capped at 85% of the video width
    pub width: f32,
    pub title: String,
    pub backdrop_color: Color32,
    pub panel_color: Color32,
    /// Highlight color of the episode being played
    pub accent_color: Color32,
    pub row_height: f32,
}

impl Default for EpisodeDrawerStyle {
    fn default() -> Self {
        Self {
            width: 320.0,
            title: "Episodes".to_string(),
            backdrop_color: Color32::from_rgba_unmultiplied(0, 0, 0, 140),
            panel_color: Color32::from_rgb(24, 24, 27),
            accent_color: Color32::from_rgb(229, 9, 20),
            row_height: 36.0,
        }
    }
}

impl EpisodeDrawerStyle {
    fn panel_rect(&self, video_rect: Rect) -> Rect {
        let width = self.width.min(video_rect.width() * 0.85);
        Rect::from_min_max(
            egui::pos2(video_rect.max.x - width, video_rect.min.y),
            video_rect.max,
        )
    }
}

/// Shows the drawer over `video_rect` if it is open.
///
/// Returns the requests made this frame, in order. Nothing is drawn and no
/// input is taken while the drawer is closed.
pub fn show_episode_drawer<H: ScrollLockHost>(
    ui: &mut Ui,
    video_rect: Rect,
    drawer: &mut EpisodeDrawer<H>,
    style: &EpisodeDrawerStyle,
) -> Vec<DrawerEvent> {
    let mut events = Vec::new();
    if !drawer.is_open() {
        return events;
    }

    let id = ui.id().with("episode_drawer");
    let backdrop = ui.interact(video_rect, id.with("backdrop"), Sense::click());
    ui.painter()
        .rect_filled(video_rect, CornerRadius::ZERO, style.backdrop_color);

    let panel_rect = style.panel_rect(video_rect);
    // Swallow clicks on the panel background so they don't reach the backdrop
    ui.interact(panel_rect, id.with("panel"), Sense::click());
    ui.painter()
        .rect_filled(panel_rect, CornerRadius::ZERO, style.panel_color);

    if backdrop.clicked() {
        events.extend(drawer.dismiss());
    }

    let scroll_target = drawer.take_scroll_target();
    let mut child = ui.new_child(
        egui::UiBuilder::new()
            .max_rect(panel_rect.shrink(12.0))
            .layout(Layout::top_down(Align::LEFT)),
    );

    child.horizontal(|ui| {
        ui.label(RichText::new(&style.title).strong().size(16.0).color(Color32::WHITE));
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui.button("✕").on_hover_text("Close").clicked() {
                events.extend(drawer.dismiss());
            }
        });
    });
    child.add_space(8.0);

    egui::ScrollArea::vertical()
        .id_salt(id.with("list"))
        .auto_shrink([false, false])
        .show(&mut child, |ui| {
            for (index, episode) in drawer.episodes().iter().enumerate() {
                let active = drawer.is_active(episode);
                let name = episode.display_name(index);
                let text = if active {
                    RichText::new(name).strong().color(style.accent_color)
                } else {
                    RichText::new(name).color(Color32::from_gray(220))
                };

                let response = ui.add_sized(
                    [ui.available_width(), style.row_height],
                    egui::SelectableLabel::new(active, text),
                );
                if let Some(filename) = episode.filename.as_deref().filter(|f| !f.is_empty()) {
                    ui.label(
                        RichText::new(filename)
                            .size(11.0)
                            .color(Color32::from_gray(140)),
                    );
                }
                if active {
                    ui.painter().text(
                        response.rect.right_center() - egui::vec2(8.0, 0.0),
                        Align2::RIGHT_CENTER,
                        "Now playing",
                        FontId::proportional(11.0),
                        style.accent_color,
                    );
                }
                if scroll_target == Some(index) {
                    response.scroll_to_me(Some(Align::Center));
                }
                if response.clicked() {
                    events.extend(drawer.select(&episode.slug));
                }
            }
        });

    events
}
