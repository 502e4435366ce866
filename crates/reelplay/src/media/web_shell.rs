//! Browser platform bindings: fullscreen, picture-in-picture, orientation
//! lock, page scroll lock, history writes over `fetch`, the page-unload
//! progress flush, and a `performance.now()` clock.
//!
//! Vendor-prefixed and not-yet-standard APIs (`webkitEnterFullscreen`,
//! `screen.orientation.lock`, `requestPictureInPicture`) are reached through
//! `js_sys::Reflect` so missing support degrades to an `Unsupported` error.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use js_sys::{Function, Promise, Reflect};
use reelplay_core::drawer::ScrollLockHost;
use reelplay_core::error::{HistoryError, PlatformError};
use reelplay_core::media::{PlatformEvent, PlatformShell};
use reelplay_core::progress::{HistoryRequest, HistoryTransport};
use reelplay_core::Clock;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, HtmlElement, HtmlVideoElement};

use super::page_lifecycle::{PageLifecycleEvent, UnloadFlush};

type Listener = Closure<dyn FnMut(web_sys::Event)>;
type Registered = (JsValue, &'static str, Listener);

fn add_listener(
    listeners: &mut Vec<Registered>,
    target: JsValue,
    name: &'static str,
    listener: Listener,
) {
    let Some(event_target) = target.dyn_ref::<web_sys::EventTarget>() else {
        return;
    };
    if let Err(err) =
        event_target.add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
    {
        tracing::warn!("Failed to listen for {name}: {err:?}");
        return;
    }
    listeners.push((target, name, listener));
}

fn remove_listeners(listeners: &mut Vec<Registered>) {
    for (target, name, listener) in listeners.drain(..) {
        if let Some(target) = target.dyn_ref::<web_sys::EventTarget>() {
            let _ = target.remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref());
        }
    }
}

fn document() -> Result<Document, PlatformError> {
    window()
        .and_then(|w| w.document())
        .ok_or_else(|| PlatformError::Rejected("No document available".to_string()))
}

/// Looks up `target[name]` and calls it if it is a function.
fn call_method(target: &JsValue, name: &'static str, args: &[JsValue]) -> Result<JsValue, PlatformError> {
    let method = Reflect::get(target, &name.into())
        .ok()
        .and_then(|m| m.dyn_into::<Function>().ok())
        .ok_or(PlatformError::Unsupported(name))?;
    let result = match args {
        [] => method.call0(target),
        [a] => method.call1(target, a),
        [a, b, ..] => method.call2(target, a, b),
    };
    result.map_err(|e| PlatformError::Rejected(format!("{name}: {e:?}")))
}

/// Logs a rejected promise instead of surfacing it.
fn settle_quietly(value: JsValue, what: &'static str) {
    if let Ok(promise) = value.dyn_into::<Promise>() {
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = wasm_bindgen_futures::JsFuture::from(promise).await {
                tracing::debug!("{what} rejected: {err:?}");
            }
        });
    }
}

/// Platform shell for a player container and its `<video>` element.
pub struct WebShell {
    container: HtmlElement,
    video: HtmlVideoElement,
    events: Rc<RefCell<Vec<PlatformEvent>>>,
    listeners: Vec<Registered>,
}

impl WebShell {
    pub fn new(container: HtmlElement, video: HtmlVideoElement) -> Result<Self, PlatformError> {
        let mut shell = Self {
            container,
            video,
            events: Rc::new(RefCell::new(Vec::new())),
            listeners: Vec::new(),
        };
        shell.setup_event_listeners()?;
        Ok(shell)
    }

    /// Tracks state changes the user makes outside the controls (Esc, the
    /// browser's own PiP button).
    fn setup_event_listeners(&mut self) -> Result<(), PlatformError> {
        let document = document()?;

        let events = self.events.clone();
        let doc = document.clone();
        let fullscreen: Listener = Closure::new(move |_event: web_sys::Event| {
            let active = doc.fullscreen_element().is_some();
            events
                .borrow_mut()
                .push(PlatformEvent::FullscreenChanged(active));
        });
        self.listen(document.into(), "fullscreenchange", fullscreen);

        for (name, active) in [("enterpictureinpicture", true), ("leavepictureinpicture", false)] {
            let events = self.events.clone();
            let listener: Listener = Closure::new(move |_event: web_sys::Event| {
                events
                    .borrow_mut()
                    .push(PlatformEvent::PictureInPictureChanged(active));
            });
            self.listen(self.video.clone().into(), name, listener);
        }
        Ok(())
    }

    fn listen(&mut self, target: JsValue, name: &'static str, listener: Listener) {
        add_listener(&mut self.listeners, target, name, listener);
    }
}

impl PlatformShell for WebShell {
    fn supports_container_fullscreen(&self) -> bool {
        document().is_ok_and(|d| d.fullscreen_enabled())
    }

    fn request_container_fullscreen(&mut self) -> Result<(), PlatformError> {
        let result = call_method(&self.container, "requestFullscreen", &[])?;
        settle_quietly(result, "requestFullscreen");
        Ok(())
    }

    fn request_element_fullscreen(&mut self) -> Result<(), PlatformError> {
        call_method(&self.video, "webkitEnterFullscreen", &[]).map(|_| ())
    }

    fn exit_fullscreen(&mut self) -> Result<(), PlatformError> {
        let document = document()?;
        if document.fullscreen_element().is_none() {
            return call_method(&self.video, "webkitExitFullscreen", &[]).map(|_| ());
        }
        let result = call_method(&document, "exitFullscreen", &[])?;
        settle_quietly(result, "exitFullscreen");
        Ok(())
    }

    fn lock_landscape(&mut self) -> Result<(), PlatformError> {
        let orientation = orientation()?;
        let result = call_method(&orientation, "lock", &["landscape".into()])?;
        settle_quietly(result, "orientation lock");
        Ok(())
    }

    fn unlock_orientation(&mut self) -> Result<(), PlatformError> {
        call_method(&orientation()?, "unlock", &[]).map(|_| ())
    }

    fn request_picture_in_picture(&mut self) -> Result<(), PlatformError> {
        let result = call_method(&self.video, "requestPictureInPicture", &[])?;
        settle_quietly(result, "requestPictureInPicture");
        Ok(())
    }

    fn exit_picture_in_picture(&mut self) -> Result<(), PlatformError> {
        let result = call_method(&document()?, "exitPictureInPicture", &[])?;
        settle_quietly(result, "exitPictureInPicture");
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<PlatformEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl Drop for WebShell {
    fn drop(&mut self) {
        remove_listeners(&mut self.listeners);
    }
}

fn orientation() -> Result<JsValue, PlatformError> {
    let screen = window()
        .and_then(|w| w.screen().ok())
        .ok_or(PlatformError::Unsupported("orientation lock"))?;
    Reflect::get(&screen, &"orientation".into())
        .ok()
        .filter(|o| !o.is_undefined())
        .ok_or(PlatformError::Unsupported("orientation lock"))
}

/// Locks page scrolling by hiding `body` overflow.
#[derive(Default)]
pub struct BodyScrollLock {
    previous: Option<String>,
}

impl BodyScrollLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScrollLockHost for BodyScrollLock {
    fn lock_scroll(&mut self) {
        let Some(body) = document().ok().and_then(|d| d.body()) else {
            return;
        };
        let style = body.style();
        self.previous = Some(style.get_property_value("overflow").unwrap_or_default());
        let _ = style.set_property("overflow", "hidden");
    }

    fn restore_scroll(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        if let Some(body) = document().ok().and_then(|d| d.body()) {
            let _ = body.style().set_property("overflow", &previous);
        }
    }
}

/// Flushes progress when the page is hidden or unloaded.
///
/// Closing or navigating away from a tab does not run destructors, so the
/// player's own teardown never happens. The callback should snapshot the
/// player and flush the progress bridge, whose keep-alive write outlives
/// the page:
///
/// ```ignore
/// let guard = UnloadGuard::new(move || {
///     player.borrow_mut().controller_mut().snapshot_progress();
///     bridge.borrow_mut().flush();
/// })?;
/// ```
///
/// Listeners are removed when the guard is dropped.
pub struct UnloadGuard {
    listeners: Vec<Registered>,
}

impl UnloadGuard {
    pub fn new(on_hide: impl FnMut() + 'static) -> Result<Self, PlatformError> {
        let window =
            window().ok_or_else(|| PlatformError::Rejected("No window available".to_string()))?;
        let document = document()?;
        let flush = Rc::new(RefCell::new(UnloadFlush::new(on_hide)));
        let mut listeners = Vec::new();

        for (target, name) in [
            (JsValue::from(window.clone()), "pagehide"),
            (JsValue::from(window), "pageshow"),
            (JsValue::from(document.clone()), "visibilitychange"),
        ] {
            let flush = flush.clone();
            let doc = document.clone();
            let listener: Listener = Closure::new(move |event: web_sys::Event| {
                let Some(lifecycle) = PageLifecycleEvent::from_dom(&event.type_(), doc.hidden())
                else {
                    return;
                };
                match flush.try_borrow_mut() {
                    Ok(mut flush) => {
                        flush.handle(lifecycle);
                    }
                    Err(_) => tracing::warn!("Ignoring {name} raised during a flush"),
                }
            });
            add_listener(&mut listeners, target, name, listener);
        }
        Ok(Self { listeners })
    }
}

impl Drop for UnloadGuard {
    fn drop(&mut self) {
        remove_listeners(&mut self.listeners);
    }
}

/// History transport over `fetch`.
///
/// Requests are fire-and-forget; `keepalive` lets the final write outlive
/// the page.
#[derive(Debug, Clone, Default)]
pub struct FetchHistoryTransport;

impl HistoryTransport for FetchHistoryTransport {
    fn send(&self, request: HistoryRequest) -> Result<(), HistoryError> {
        let window = window().ok_or_else(|| HistoryError::Transport("no window".to_string()))?;

        let headers = web_sys::Headers::new()
            .map_err(|e| HistoryError::Transport(format!("{e:?}")))?;
        headers
            .set("Content-Type", "application/json")
            .and_then(|_| headers.set("Authorization", &format!("Bearer {}", request.bearer_token)))
            .map_err(|e| HistoryError::Transport(format!("{e:?}")))?;

        let init = web_sys::RequestInit::new();
        init.set_method("POST");
        init.set_headers(&headers);
        init.set_body(&JsValue::from_str(&request.body));
        init.set_mode(web_sys::RequestMode::Cors);
        match Reflect::set(&init, &"keepalive".into(), &request.keepalive.into()) {
            Ok(true) => {}
            Ok(false) | Err(_) if request.keepalive => {
                tracing::warn!("keepalive not supported, write may not survive page unload");
            }
            _ => {}
        }

        let req = web_sys::Request::new_with_str_and_init(&request.endpoint, &init)
            .map_err(|e| HistoryError::Endpoint(format!("{}: {e:?}", request.endpoint)))?;
        let promise = window.fetch_with_request(&req);

        let endpoint = request.endpoint;
        wasm_bindgen_futures::spawn_local(async move {
            match wasm_bindgen_futures::JsFuture::from(promise).await {
                Ok(response) => {
                    let status = response
                        .dyn_into::<web_sys::Response>()
                        .map_or(0, |r| r.status());
                    if (200..300).contains(&status) {
                        tracing::debug!("History write to {endpoint}: HTTP {status}");
                    } else {
                        tracing::warn!("History write to {endpoint} failed: HTTP {status}");
                    }
                }
                Err(err) => tracing::warn!("History write to {endpoint} failed: {err:?}"),
            }
        });
        Ok(())
    }
}

/// Monotonic clock backed by `performance.now()`.
pub struct PerformanceClock {
    performance: Option<web_sys::Performance>,
}

impl PerformanceClock {
    pub fn new() -> Self {
        Self {
            performance: window().and_then(|w| w.performance()),
        }
    }
}

impl Default for PerformanceClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for PerformanceClock {
    fn now(&self) -> Duration {
        let ms = self.performance.as_ref().map_or(0.0, |p| p.now());
        Duration::from_secs_f64((ms / 1000.0).max(0.0))
    }
}
