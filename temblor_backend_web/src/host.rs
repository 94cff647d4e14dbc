// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser [`Host`] implementation.
//!
//! [`WebHost`] maps the host contract onto browser globals:
//!
//! | contract | browser |
//! |---|---|
//! | `now` | `performance.now()` (falls back to `Date.now()`) |
//! | `set_timeout` | `setTimeout` |
//! | `request_animation_frame` | `requestAnimationFrame`, or a 1000/60 ms `setTimeout` where it is missing |
//! | `on_resize` | `window` `resize` listener |
//! | `on_transition_end` | `document` `transitionend` listener |
//! | `observe_mutations` | `MutationObserver` on `document` (attributes, child list, character data, subtree) |
//!
//! Capabilities are probed once in [`WebHost::new`]. Outside a window
//! context (workers, server-side) the host reports itself as headless and
//! every listener method returns an empty [`Subscription`].

use alloc::boxed::Box;
use core::fmt;
use core::time::Duration;

use js_sys::Reflect;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Event, EventTarget, MutationObserver, MutationObserverInit, Window};

use temblor_core::host::{
    Capabilities, Host, Listener, Subscription, Task, Timers, TransitionListener,
};

/// Delay used in place of `requestAnimationFrame` where it is unavailable.
pub const FRAME_FALLBACK_DELAY: Duration = Duration::from_millis(1000 / 60);

// Direct global bindings instead of `web_sys::Window` methods so that the
// timers also work where no `Window` object exists.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    fn performance_now() -> f64;

    #[wasm_bindgen(js_namespace = Date, js_name = "now")]
    fn date_now() -> f64;

    #[wasm_bindgen(js_name = "setTimeout")]
    fn set_timeout(callback: &JsValue, ms: i32) -> JsValue;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;
}

/// Logs a failed JavaScript call when the `tracing` feature is enabled.
fn report(context: &str, err: &JsValue) {
    #[cfg(feature = "tracing")]
    tracing::warn!(context, error = ?err, "JavaScript call failed");
    #[cfg(not(feature = "tracing"))]
    {
        _ = (context, err);
    }
}

fn has_global(name: &str) -> bool {
    Reflect::has(&js_sys::global(), &JsValue::from_str(name)).unwrap_or(false)
}

fn millis(delay: Duration) -> i32 {
    i32::try_from(delay.as_millis()).unwrap_or(i32::MAX)
}

/// Adds `closure` as a `kind` listener on `target`, returning a guard that
/// removes it and frees the closure.
fn listen(
    target: &EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(Event)>,
) -> Subscription {
    if let Err(err) = target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())
    {
        report(kind, &err);
        return Subscription::empty();
    }
    #[cfg(feature = "tracing")]
    tracing::debug!(kind, "listener attached");

    let target = target.clone();
    Subscription::new(move || {
        if let Err(err) =
            target.remove_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())
        {
            report(kind, &err);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(kind, "listener detached");
        drop(closure);
    })
}

/// The browser environment.
pub struct WebHost {
    window: Option<Window>,
    document: Option<Document>,
    capabilities: Capabilities,
    has_raf: bool,
    has_performance: bool,
}

impl fmt::Debug for WebHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebHost")
            .field("capabilities", &self.capabilities)
            .field("has_raf", &self.has_raf)
            .field("has_performance", &self.has_performance)
            .finish_non_exhaustive()
    }
}

impl Default for WebHost {
    fn default() -> Self {
        Self::new()
    }
}

impl WebHost {
    /// Probes the current JavaScript global.
    #[must_use]
    pub fn new() -> Self {
        let window = web_sys::window();
        let document = window.as_ref().and_then(Window::document);
        let browser = window.is_some() && document.is_some();

        Self {
            capabilities: Capabilities {
                browser,
                mutation_observer: browser && has_global("MutationObserver"),
            },
            has_raf: has_global("requestAnimationFrame"),
            has_performance: has_global("performance"),
            window,
            document,
        }
    }

    /// Returns the window, if any.
    #[must_use]
    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    /// Returns the document, if any.
    #[must_use]
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }
}

impl Timers for WebHost {
    fn now(&self) -> Duration {
        let ms = if self.has_performance {
            performance_now()
        } else {
            date_now()
        };
        #[expect(
            clippy::cast_possible_truncation,
            reason = "timestamps are small positive f64 milliseconds; µs fits in u64"
        )]
        let us = (ms * 1000.0) as u64;
        Duration::from_micros(us)
    }

    fn set_timeout(&self, delay: Duration, task: Task) {
        let callback = Closure::once_into_js(task);
        set_timeout(&callback, millis(delay));
    }

    fn request_animation_frame(&self, task: Task) {
        if self.has_raf {
            let callback = Closure::once_into_js(move |_timestamp_ms: f64| task());
            request_animation_frame(&callback);
        } else {
            self.set_timeout(FRAME_FALLBACK_DELAY, task);
        }
    }
}

impl Host for WebHost {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn on_resize(&self, listener: Listener) -> Subscription {
        let Some(window) = &self.window else {
            return Subscription::empty();
        };
        let closure = Closure::wrap(Box::new(move |_: Event| listener()) as Box<dyn FnMut(Event)>);
        listen(window, "resize", closure)
    }

    fn on_transition_end(&self, listener: TransitionListener) -> Subscription {
        let Some(document) = &self.document else {
            return Subscription::empty();
        };
        let closure = Closure::wrap(Box::new(move |event: Event| {
            let property = event
                .dyn_ref::<web_sys::TransitionEvent>()
                .map(web_sys::TransitionEvent::property_name)
                .unwrap_or_default();
            listener(&property);
        }) as Box<dyn FnMut(Event)>);
        listen(document, "transitionend", closure)
    }

    fn observe_mutations(&self, listener: Listener) -> Option<Subscription> {
        if !self.capabilities.mutation_observer {
            return None;
        }
        let document = self.document.as_ref()?;

        let closure = Closure::wrap(Box::new(move || listener()) as Box<dyn FnMut()>);
        let observer = MutationObserver::new(closure.as_ref().unchecked_ref())
            .map_err(|err| report("MutationObserver", &err))
            .ok()?;

        let init = MutationObserverInit::new();
        init.set_attributes(true);
        init.set_child_list(true);
        init.set_character_data(true);
        init.set_subtree(true);
        observer
            .observe_with_options(document, &init)
            .map_err(|err| report("MutationObserver.observe", &err))
            .ok()?;

        #[cfg(feature = "tracing")]
        tracing::debug!("mutation observer attached");

        Some(Subscription::new(move || {
            observer.disconnect();
            #[cfg(feature = "tracing")]
            tracing::debug!("mutation observer disconnected");
            drop(closure);
        }))
    }
}
