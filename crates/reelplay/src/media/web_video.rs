//! Browser media sink and hls.js adaptive engine.
//!
//! The browser's `<video>` element does the decoding. It is placed behind the
//! (transparent) egui canvas and kept aligned with the widget rect; egui only
//! paints the overlays.
//!
//! ```text
//! Rust/WASM (this module)          JavaScript (player-bridge.js)
//! ┌─────────────────────┐          ┌──────────────────────────────┐
//! │ WebVideoSink        │◄────────►│ <video> element + listeners  │
//! │ HlsEngine           │◄────────►│ hls.js instance, event relay │
//! └─────────────────────┘          └──────────────────────────────┘
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use reelplay_core::error::{PlatformError, PlayRejection};
use reelplay_core::loader::{
    AdaptiveEngine, EngineConfig, EngineErrorKind, EngineEvent, EngineFactory, LevelInfo,
};
use reelplay_core::media::{MediaEvent, MediaSink};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlVideoElement};

type Listener = Closure<dyn FnMut(web_sys::Event)>;

/// Media sink over a browser `<video>` element.
pub struct WebVideoSink {
    video: HtmlVideoElement,
    events: Rc<RefCell<Vec<MediaEvent>>>,
    listeners: Vec<(&'static str, Listener)>,
}

impl WebVideoSink {
    /// Creates a `<video>` element and appends it to the document body.
    pub fn new() -> Result<Self, PlatformError> {
        let document = window()
            .and_then(|w| w.document())
            .ok_or_else(|| PlatformError::Rejected("No document available".to_string()))?;

        let video: HtmlVideoElement = document
            .create_element("video")
            .map_err(|e| PlatformError::Rejected(format!("Failed to create video element: {e:?}")))?
            .dyn_into()
            .map_err(|_| PlatformError::Rejected("Element is not a video".to_string()))?;

        video.set_cross_origin(Some("anonymous"));
        video.set_preload("auto");
        // Required for inline playback on iOS
        video.set_attribute("playsinline", "true").ok();

        let style = video.style();
        let _ = style.set_property("position", "absolute");
        let _ = style.set_property("z-index", "-1");
        let _ = style.set_property("background", "black");
        let _ = style.set_property("object-fit", "contain");

        document
            .body()
            .ok_or_else(|| PlatformError::Rejected("No document body".to_string()))?
            .append_child(&video)
            .map_err(|e| PlatformError::Rejected(format!("Failed to append video: {e:?}")))?;

        let mut sink = Self {
            video,
            events: Rc::new(RefCell::new(Vec::new())),
            listeners: Vec::new(),
        };
        sink.setup_event_listeners();
        Ok(sink)
    }

    /// Forwards the element's native events into the event queue.
    fn setup_event_listeners(&mut self) {
        const EVENTS: [&str; 10] = [
            "play",
            "pause",
            "timeupdate",
            "durationchange",
            "canplay",
            "waiting",
            "progress",
            "volumechange",
            "ended",
            "error",
        ];

        for name in EVENTS {
            let video = self.video.clone();
            let events = self.events.clone();
            let listener: Listener = Closure::new(move |_event: web_sys::Event| {
                if let Some(event) = media_event(name, &video) {
                    events.borrow_mut().push(event);
                }
            });
            if let Err(err) = self
                .video
                .add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
            {
                tracing::warn!("Failed to listen for {name}: {err:?}");
                continue;
            }
            self.listeners.push((name, listener));
        }
    }

    /// Aligns the element with the widget rect (egui points are CSS pixels).
    pub fn place(&self, rect: egui::Rect) {
        let style = self.video.style();
        let _ = style.set_property("left", &format!("{}px", rect.min.x));
        let _ = style.set_property("top", &format!("{}px", rect.min.y));
        let _ = style.set_property("width", &format!("{}px", rect.width()));
        let _ = style.set_property("height", &format!("{}px", rect.height()));
    }

    pub fn video_element(&self) -> &HtmlVideoElement {
        &self.video
    }

    /// Creates an hls.js factory bound to this element.
    pub fn engine_factory(&self) -> HlsEngineFactory {
        HlsEngineFactory {
            video: self.video.clone(),
        }
    }
}

/// Translates a DOM media event into a [`MediaEvent`], reading the element state.
fn media_event(name: &str, video: &HtmlVideoElement) -> Option<MediaEvent> {
    Some(match name {
        "play" => MediaEvent::Play,
        "pause" => MediaEvent::Pause {
            position: video.current_time(),
        },
        "timeupdate" => MediaEvent::TimeUpdate {
            position: video.current_time(),
        },
        "durationchange" => MediaEvent::DurationChange {
            duration: video.duration(),
        },
        "canplay" => MediaEvent::Ready,
        "waiting" => MediaEvent::Waiting,
        "progress" => {
            let buffered = video.buffered();
            let length = buffered.length();
            if length == 0 {
                return None;
            }
            MediaEvent::Progress {
                buffered_end: buffered.end(length - 1).ok()?,
            }
        }
        "volumechange" => MediaEvent::VolumeChange {
            volume: video.volume() as f32,
            muted: video.muted(),
        },
        "ended" => MediaEvent::Ended,
        "error" => MediaEvent::Error(
            video
                .error()
                .map(|e| format!("media error code {}: {}", e.code(), e.message()))
                .unwrap_or_else(|| "unknown media error".to_string()),
        ),
        _ => return None,
    })
}

impl MediaSink for WebVideoSink {
    fn set_source(&mut self, url: &str) {
        self.video.set_src(url);
        self.video.load();
    }

    fn clear_source(&mut self) {
        let _ = self.video.pause();
        let _ = self.video.remove_attribute("src");
        self.video.load();
    }

    fn supports_native_manifest(&self) -> bool {
        !self
            .video
            .can_play_type("application/vnd.apple.mpegurl")
            .is_empty()
    }

    fn play(&mut self) -> Result<(), PlayRejection> {
        let promise = self
            .video
            .play()
            .map_err(|e| PlayRejection::Other(format!("{e:?}")))?;

        // The promise settles after the autoplay decision; report refusals
        // through the event queue.
        let events = self.events.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = wasm_bindgen_futures::JsFuture::from(promise).await {
                let name = js_sys::Reflect::get(&err, &"name".into())
                    .ok()
                    .and_then(|v| v.as_string())
                    .unwrap_or_default();
                let rejection = if name == "NotAllowedError" {
                    PlayRejection::NotAllowed
                } else {
                    PlayRejection::Other(name)
                };
                events.borrow_mut().push(MediaEvent::PlayRejected(rejection));
            }
        });
        Ok(())
    }

    fn pause(&mut self) {
        self.video.pause().ok();
    }

    fn is_paused(&self) -> bool {
        self.video.paused()
    }

    fn seek(&mut self, position: f64) {
        self.video.set_current_time(position);
    }

    fn position(&self) -> f64 {
        self.video.current_time()
    }

    fn duration(&self) -> Option<f64> {
        let duration = self.video.duration();
        (duration.is_finite() && duration > 0.0).then_some(duration)
    }

    fn set_volume(&mut self, volume: f32) {
        self.video.set_volume(f64::from(volume.clamp(0.0, 1.0)));
    }

    fn volume(&self) -> f32 {
        self.video.volume() as f32
    }

    fn set_muted(&mut self, muted: bool) {
        self.video.set_muted(muted);
    }

    fn is_muted(&self) -> bool {
        self.video.muted()
    }

    fn set_brightness(&mut self, factor: f32) {
        let _ = self
            .video
            .style()
            .set_property("filter", &format!("brightness({factor})"));
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl Drop for WebVideoSink {
    fn drop(&mut self) {
        for (name, listener) in self.listeners.drain(..) {
            let _ = self
                .video
                .remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref());
        }
        if let Some(parent) = self.video.parent_node() {
            let _ = parent.remove_child(&self.video);
        }
    }
}

// ============================================================================
// hls.js
// ============================================================================

/// Creates hls.js engines for a `<video>` element.
#[derive(Clone)]
pub struct HlsEngineFactory {
    video: HtmlVideoElement,
}

impl EngineFactory for HlsEngineFactory {
    fn is_supported(&self) -> bool {
        js_hls_supported()
    }

    fn create(&self, config: &EngineConfig) -> Option<Box<dyn AdaptiveEngine>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let on_event: Closure<dyn FnMut(JsValue)> = Closure::new(move |event: JsValue| {
            if let Some(event) = parse_engine_event(&event) {
                sink.borrow_mut().push(event);
            }
        });

        let hls = match js_create_hls(
            config.max_buffer_length.as_secs_f64(),
            config.max_max_buffer_length.as_secs_f64(),
            on_event.as_ref().unchecked_ref(),
        ) {
            Ok(hls) => hls,
            Err(err) => {
                tracing::error!("hls.js initialization failed: {err:?}");
                return None;
            }
        };

        Some(Box::new(HlsEngine {
            hls: Some(hls),
            video: self.video.clone(),
            events,
            _on_event: on_event,
        }))
    }
}

/// An hls.js instance.
struct HlsEngine {
    /// `None` once destroyed
    hls: Option<JsValue>,
    video: HtmlVideoElement,
    events: Rc<RefCell<Vec<EngineEvent>>>,
    _on_event: Closure<dyn FnMut(JsValue)>,
}

impl AdaptiveEngine for HlsEngine {
    fn load_source(&mut self, url: &str) {
        if let Some(hls) = &self.hls {
            js_hls_load_source(hls, url);
        }
    }

    fn attach_media(&mut self) {
        if let Some(hls) = &self.hls {
            js_hls_attach_media(hls, &self.video);
        }
    }

    fn set_current_level(&mut self, level: i32) {
        if let Some(hls) = &self.hls {
            js_hls_set_level(hls, level);
        }
    }

    fn start_load(&mut self) {
        if let Some(hls) = &self.hls {
            js_hls_start_load(hls);
        }
    }

    fn recover_media_error(&mut self) {
        if let Some(hls) = &self.hls {
            js_hls_recover_media_error(hls);
        }
    }

    fn destroy(&mut self) {
        if let Some(hls) = self.hls.take() {
            js_destroy_hls(&hls);
        }
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl Drop for HlsEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn get_f64(value: &JsValue, key: &str) -> Option<f64> {
    js_sys::Reflect::get(value, &key.into())
        .ok()
        .and_then(|v| v.as_f64())
}

fn get_string(value: &JsValue, key: &str) -> Option<String> {
    js_sys::Reflect::get(value, &key.into())
        .ok()
        .and_then(|v| v.as_string())
}

/// Parses an event object relayed by the bridge.
fn parse_engine_event(event: &JsValue) -> Option<EngineEvent> {
    match get_string(event, "type")?.as_str() {
        "manifest" => {
            let levels = js_sys::Reflect::get(event, &"levels".into()).ok()?;
            if !js_sys::Array::is_array(&levels) {
                return None;
            }
            let levels = js_sys::Array::from(&levels)
                .iter()
                .filter(|item| !item.is_undefined() && !item.is_null())
                .map(|item| LevelInfo {
                    height: get_f64(&item, "height")
                        .filter(|h| *h > 0.0)
                        .map(|h| h as u32),
                    bitrate: get_f64(&item, "bitrate").map_or(0, |b| b as u32),
                })
                .collect();
            Some(EngineEvent::ManifestParsed { levels })
        }
        "error" => {
            let kind = match get_string(event, "kind").as_deref() {
                Some("network") => EngineErrorKind::Network,
                Some("media") => EngineErrorKind::Media,
                _ => EngineErrorKind::Other,
            };
            let fatal = js_sys::Reflect::get(event, &"fatal".into())
                .ok()
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            Some(EngineEvent::Error {
                kind,
                fatal,
                details: get_string(event, "details").unwrap_or_default(),
            })
        }
        _ => None,
    }
}

// ============================================================================
// wasm-bindgen extern declarations
// ============================================================================

#[wasm_bindgen(module = "/web/player-bridge.js")]
extern "C" {
    /// Whether hls.js is loaded and MediaSource is available.
    #[wasm_bindgen(js_name = "hlsSupported")]
    fn js_hls_supported() -> bool;

    /// Creates an hls.js instance that relays manifest and error events to
    /// `on_event`.
    #[wasm_bindgen(catch, js_name = "createHls")]
    fn js_create_hls(
        max_buffer_length: f64,
        max_max_buffer_length: f64,
        on_event: &js_sys::Function,
    ) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = "hlsLoadSource")]
    fn js_hls_load_source(hls: &JsValue, url: &str);

    #[wasm_bindgen(js_name = "hlsAttachMedia")]
    fn js_hls_attach_media(hls: &JsValue, video: &HtmlVideoElement);

    /// Sets the current level (-1 for auto).
    #[wasm_bindgen(js_name = "hlsSetLevel")]
    fn js_hls_set_level(hls: &JsValue, level: i32);

    #[wasm_bindgen(js_name = "hlsStartLoad")]
    fn js_hls_start_load(hls: &JsValue);

    #[wasm_bindgen(js_name = "hlsRecoverMediaError")]
    fn js_hls_recover_media_error(hls: &JsValue);

    #[wasm_bindgen(js_name = "destroyHls")]
    fn js_destroy_hls(hls: &JsValue);
}
