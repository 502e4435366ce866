//! Progress persistence across page hide and unload.
//!
//! Browsers close, freeze or discard pages without running destructors, so
//! the player's teardown flush cannot be relied on. [`UnloadFlush`] decides
//! when the host's flush callback runs; on the web the `UnloadGuard` feeds
//! it DOM lifecycle events.

/// A page lifecycle signal relevant to progress persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLifecycleEvent {
    /// Navigation away, tab close, or entry into the back/forward cache
    PageHide,
    /// Restored from the back/forward cache, or first shown
    PageShow,
    /// Visibility changed to the given hidden state
    VisibilityChange { hidden: bool },
}

impl PageLifecycleEvent {
    /// Maps a DOM event type. Unrelated events map to `None`.
    pub fn from_dom(event_type: &str, document_hidden: bool) -> Option<Self> {
        match event_type {
            "pagehide" => Some(Self::PageHide),
            "pageshow" => Some(Self::PageShow),
            "visibilitychange" => Some(Self::VisibilityChange {
                hidden: document_hidden,
            }),
            _ => None,
        }
    }
}

/// Runs a flush callback once each time the page goes away.
///
/// Leaving a page usually fires a hidden `visibilitychange` and then
/// `pagehide`; only the first flushes. Becoming visible or being restored
/// from the back/forward cache re-arms it.
pub struct UnloadFlush<F> {
    on_hide: F,
    flushed: bool,
}

impl<F: FnMut()> UnloadFlush<F> {
    pub fn new(on_hide: F) -> Self {
        Self {
            on_hide,
            flushed: false,
        }
    }

    /// Returns whether the flush callback ran.
    pub fn handle(&mut self, event: PageLifecycleEvent) -> bool {
        match event {
            PageLifecycleEvent::PageShow | PageLifecycleEvent::VisibilityChange { hidden: false } => {
                self.flushed = false;
                false
            }
            PageLifecycleEvent::PageHide | PageLifecycleEvent::VisibilityChange { hidden: true } => {
                if self.flushed {
                    return false;
                }
                self.flushed = true;
                tracing::debug!("Page going away ({event:?}), flushing progress");
                (self.on_hide)();
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting() -> (UnloadFlush<impl FnMut()>, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        (UnloadFlush::new(move || seen.set(seen.get() + 1)), count)
    }

    #[test]
    fn test_dom_event_mapping() {
        assert_eq!(
            PageLifecycleEvent::from_dom("pagehide", false),
            Some(PageLifecycleEvent::PageHide)
        );
        assert_eq!(
            PageLifecycleEvent::from_dom("visibilitychange", true),
            Some(PageLifecycleEvent::VisibilityChange { hidden: true })
        );
        assert_eq!(
            PageLifecycleEvent::from_dom("pageshow", false),
            Some(PageLifecycleEvent::PageShow)
        );
        assert_eq!(PageLifecycleEvent::from_dom("beforeunload", true), None);
    }

    #[test]
    fn test_navigation_flushes_once() {
        let (mut flush, count) = counting();
        assert!(flush.handle(PageLifecycleEvent::VisibilityChange { hidden: true }));
        assert!(!flush.handle(PageLifecycleEvent::PageHide));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_pagehide_alone_flushes() {
        let (mut flush, count) = counting();
        assert!(flush.handle(PageLifecycleEvent::PageHide));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_returning_to_tab_rearms() {
        let (mut flush, count) = counting();
        flush.handle(PageLifecycleEvent::VisibilityChange { hidden: true });
        flush.handle(PageLifecycleEvent::VisibilityChange { hidden: false });
        flush.handle(PageLifecycleEvent::VisibilityChange { hidden: true });
        assert_eq!(count.get(), 2);

        flush.handle(PageLifecycleEvent::PageHide);
        flush.handle(PageLifecycleEvent::PageShow);
        flush.handle(PageLifecycleEvent::PageHide);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_becoming_visible_never_flushes() {
        let (mut flush, count) = counting();
        assert!(!flush.handle(PageLifecycleEvent::VisibilityChange { hidden: false }));
        assert!(!flush.handle(PageLifecycleEvent::PageShow));
        assert_eq!(count.get(), 0);
    }
}
