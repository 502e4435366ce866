//! Episode navigation drawer.
//!
//! A controlled component: the host owns the open flag and passes it in via
//! [`EpisodeDrawer::sync`]. The drawer reports what the user asked for
//! ([`DrawerEvent`]) and manages the background scroll lock, which is
//! released on close and on drop.

use serde::{Deserialize, Serialize};

use crate::controls::Key;

/// A playable item of the current title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl Episode {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: None,
            filename: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// The episode name, or "Episode N" (1-based) when it has none.
    pub fn display_name(&self, index: usize) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Episode {}", index + 1),
        }
    }
}

/// Requests emitted by the drawer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawerEvent {
    Close,
    /// Switch to the episode with this slug
    Navigate(String),
}

/// Locks scrolling of the page behind the drawer.
pub trait ScrollLockHost {
    fn lock_scroll(&mut self);
    fn restore_scroll(&mut self);
}

impl<H: ScrollLockHost + ?Sized> ScrollLockHost for Box<H> {
    fn lock_scroll(&mut self) {
        (**self).lock_scroll();
    }

    fn restore_scroll(&mut self) {
        (**self).restore_scroll();
    }
}

/// Host without a scrollable background.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScrollLock;

impl ScrollLockHost for NoScrollLock {
    fn lock_scroll(&mut self) {}
    fn restore_scroll(&mut self) {}
}

pub struct EpisodeDrawer<H: ScrollLockHost> {
    host: H,
    episodes: Vec<Episode>,
    current: Option<String>,
    open: bool,
    scroll_locked: bool,
    /// Index to scroll into centered view on the next frame
    scroll_target: Option<usize>,
}

impl<H: ScrollLockHost> EpisodeDrawer<H> {
    pub fn new(host: H, episodes: Vec<Episode>) -> Self {
        Self {
            host,
            episodes,
            current: None,
            open: false,
            scroll_locked: false,
            scroll_target: None,
        }
    }

    pub fn with_current(mut self, slug: impl Into<String>) -> Self {
        self.current = Some(slug.into());
        self
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn set_episodes(&mut self, episodes: Vec<Episode>) {
        self.episodes = episodes;
        if self.open {
            self.scroll_target = self.active_index();
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn set_current(&mut self, slug: Option<String>) {
        if self.current == slug {
            return;
        }
        self.current = slug;
        if self.open {
            self.scroll_target = self.active_index();
        }
    }

    pub fn active_index(&self) -> Option<usize> {
        let current = self.current.as_deref()?;
        self.episodes.iter().position(|e| e.slug == current)
    }

    pub fn is_active(&self, episode: &Episode) -> bool {
        self.current.as_deref() == Some(episode.slug.as_str())
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Applies the host's open flag.
    pub fn sync(&mut self, open: bool) {
        if open == self.open {
            return;
        }
        self.open = open;
        if open {
            self.host.lock_scroll();
            self.scroll_locked = true;
            self.scroll_target = self.active_index();
        } else {
            self.release_scroll();
            self.scroll_target = None;
        }
    }

    pub fn handle_key(&mut self, key: Key) -> Option<DrawerEvent> {
        (self.open && key == Key::Escape).then_some(DrawerEvent::Close)
    }

    /// Backdrop or close button.
    pub fn dismiss(&self) -> Option<DrawerEvent> {
        self.open.then_some(DrawerEvent::Close)
    }

    /// An item was clicked. The current item only closes the drawer.
    pub fn select(&self, slug: &str) -> Vec<DrawerEvent> {
        if !self.open || !self.episodes.iter().any(|e| e.slug == slug) {
            return Vec::new();
        }
        if self.current.as_deref() == Some(slug) {
            vec![DrawerEvent::Close]
        } else {
            tracing::debug!("Episode selected: {slug}");
            vec![DrawerEvent::Navigate(slug.to_string()), DrawerEvent::Close]
        }
    }

    /// Consumes the pending scroll-into-view request.
    pub fn take_scroll_target(&mut self) -> Option<usize> {
        self.scroll_target.take()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn release_scroll(&mut self) {
        if std::mem::replace(&mut self.scroll_locked, false) {
            self.host.restore_scroll();
        }
    }
}

impl<H: ScrollLockHost> Drop for EpisodeDrawer<H> {
    fn drop(&mut self) {
        self.release_scroll();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Body {
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl ScrollLockHost for Body {
        fn lock_scroll(&mut self) {
            self.log.borrow_mut().push("lock");
        }
        fn restore_scroll(&mut self) {
            self.log.borrow_mut().push("restore");
        }
    }

    fn episodes() -> Vec<Episode> {
        vec![
            Episode::new("ep-1").with_name("Pilot"),
            Episode::new("ep-2"),
            Episode::new("ep-3").with_filename("s01e03.mp4"),
        ]
    }

    #[test]
    fn test_display_name_falls_back_to_number() {
        let eps = episodes();
        assert_eq!(eps[0].display_name(0), "Pilot");
        assert_eq!(eps[1].display_name(1), "Episode 2");
        assert_eq!(Episode::new("x").with_name("  ").display_name(4), "Episode 5");
    }

    #[test]
    fn test_open_locks_scroll_and_targets_active() {
        let body = Body::default();
        let mut drawer = EpisodeDrawer::new(body.clone(), episodes()).with_current("ep-2");
        drawer.sync(true);
        assert_eq!(drawer.take_scroll_target(), Some(1));
        assert_eq!(drawer.take_scroll_target(), None);
        drawer.sync(false);
        assert_eq!(*body.log.borrow(), vec!["lock", "restore"]);
    }

    #[test]
    fn test_escape_closes_only_when_open() {
        let mut drawer = EpisodeDrawer::new(NoScrollLock, episodes());
        assert_eq!(drawer.handle_key(Key::Escape), None);
        drawer.sync(true);
        assert_eq!(drawer.handle_key(Key::Escape), Some(DrawerEvent::Close));
        assert_eq!(drawer.handle_key(Key::Space), None);
    }

    #[test]
    fn test_select_other_episode_navigates_and_closes() {
        let mut drawer = EpisodeDrawer::new(NoScrollLock, episodes()).with_current("ep-1");
        drawer.sync(true);
        assert_eq!(
            drawer.select("ep-3"),
            vec![DrawerEvent::Navigate("ep-3".into()), DrawerEvent::Close]
        );
        assert_eq!(drawer.select("ep-1"), vec![DrawerEvent::Close]);
        assert!(drawer.select("missing").is_empty());
    }

    #[test]
    fn test_drop_while_open_restores_scroll() {
        let body = Body::default();
        {
            let mut drawer = EpisodeDrawer::new(body.clone(), episodes());
            drawer.sync(true);
        }
        assert_eq!(*body.log.borrow(), vec!["lock", "restore"]);
    }

    #[test]
    fn test_drop_while_closed_does_not_restore() {
        let body = Body::default();
        drop(EpisodeDrawer::new(body.clone(), episodes()));
        assert!(body.log.borrow().is_empty());
    }

    #[test]
    fn test_current_change_while_open_rescrolls() {
        let mut drawer = EpisodeDrawer::new(NoScrollLock, episodes()).with_current("ep-1");
        drawer.sync(true);
        drawer.take_scroll_target();
        drawer.set_current(Some("ep-3".into()));
        assert_eq!(drawer.take_scroll_target(), Some(2));
    }
}
