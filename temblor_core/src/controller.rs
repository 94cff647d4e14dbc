// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The update controller.
//!
//! The [`Controller`] owns the connected [`Session`]s, keeps environment
//! listeners attached exactly while at least one session is connected, and
//! drives the refresh cycle:
//!
//! ```text
//!   resize / mutation / transitionend / connect
//!                      │
//!                      ▼
//!          refresh coalescer (20 ms, rAF) ◄──────────────┐
//!                      │                                 │
//!                      ▼                                 │
//!   for each session: gather → has? → broadcast          │
//!                      │                                 │
//!          changed? ───┼── yes ──────────────────────────┤
//!                      │                                 │
//!                      no, continuous                    │
//!                      ▼                                 │
//!           idle coalescer (80 ms) ──────────────────────┘
//! ```
//!
//! A pass that finds changes schedules another pass through the refresh
//! coalescer, so a CSS transition is followed frame by frame until the
//! geometry settles. Without a mutation-detection primitive the controller
//! cannot tell when the page changed, so it keeps polling through the slower
//! idle coalescer for as long as listeners are attached.
//!
//! # State machine
//!
//! ```text
//!            first connect              set_continuous_mode(true)
//!   Idle ──────────────────► Listening ◄─────────────────────────► Listening
//!    ▲                       (event-driven)  set_continuous_mode(false)  (continuous)
//!    └──────────── last disconnect ────────────────────────────────────┘
//! ```

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::time::Duration;

use crate::coalesce::Coalescer;
use crate::host::{Capabilities, Host, Listener, Subscription, Timers};
use crate::session::Session;
use crate::trace::{
    ContinuousModeEvent, ListenersAttachedEvent, ListenersDetachedEvent, RefreshPassEvent,
    TraceSink, Tracer, TriggerEvent, TriggerKind,
};

/// Minimum spacing between refresh passes.
pub const REFRESH_DELAY: Duration = Duration::from_millis(20);

/// Spacing of idle polls in continuous mode.
pub const IDLE_REFRESH_DELAY: Duration = Duration::from_millis(80);

/// Substrings of CSS property names whose transitions can move or resize an
/// element. A `transitionend` for any other property is ignored.
pub const TRANSITION_KEYS: &[&str] = &[
    "top", "right", "bottom", "left", "width", "height", "size", "weight",
];

/// Returns `true` if a transition on `property` can affect geometry.
#[must_use]
pub fn is_reflow_property(property: &str) -> bool {
    TRANSITION_KEYS.iter().any(|key| property.contains(key))
}

/// Configuration for the [`Controller`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Minimum spacing between refresh passes. Passes are also deferred to
    /// the next animation frame.
    pub refresh_delay: Duration,
    /// Spacing of idle polls in continuous mode.
    pub idle_delay: Duration,
    /// Keep polling even when no change was detected.
    ///
    /// Ignored (forced on) when the host cannot observe mutations.
    pub continuous: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerConfig {
    /// Default configuration: 20 ms refresh spacing, 80 ms idle polling,
    /// event-driven.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            refresh_delay: REFRESH_DELAY,
            idle_delay: IDLE_REFRESH_DELAY,
            continuous: false,
        }
    }

    /// Sets the minimum spacing between refresh passes.
    #[must_use]
    pub const fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Sets the idle polling spacing.
    #[must_use]
    pub const fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    /// Sets the initial continuous mode.
    #[must_use]
    pub const fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }
}

/// Where the controller is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// No listeners attached.
    Idle,
    /// Listeners attached.
    Listening {
        /// Polling rather than waiting for events. Also `true` when
        /// continuous mode is off but no mutation watcher could be created
        /// for this attach.
        continuous: bool,
    },
}

/// Environment listeners held while sessions exist.
struct Listeners {
    _resize: Subscription,
    _transition_end: Subscription,
    mutation_watcher: Option<Subscription>,
}

struct ControllerInner {
    host: Rc<dyn Host>,
    capabilities: Capabilities,
    sessions: RefCell<Vec<Rc<dyn Session>>>,
    listeners_enabled: Cell<bool>,
    continuous: Cell<bool>,
    listeners: RefCell<Option<Listeners>>,
    refresh: Coalescer<()>,
    idle: Coalescer<()>,
    passes: Cell<u64>,
    tracer: Tracer,
}

impl ControllerInner {
    fn contains(&self, session: &Rc<dyn Session>) -> bool {
        self.sessions
            .borrow()
            .iter()
            .any(|s| Rc::ptr_eq(s, session))
    }

    fn request(&self, kind: TriggerKind) {
        self.tracer.trigger(&TriggerEvent {
            timestamp: self.host.now(),
            kind,
        });
        self.refresh.call(());
    }

    /// Polls without waiting for events: continuous mode, or a mutation
    /// watcher that could not be created despite the capability.
    fn polls(&self) -> bool {
        self.continuous.get()
            || self
                .listeners
                .borrow()
                .as_ref()
                .is_some_and(|l| l.mutation_watcher.is_none())
    }

    fn run_pass(&self) {
        let started = self.host.now();
        // Snapshot: subscribers may connect or disconnect sessions mid-pass.
        let sessions: Vec<Rc<dyn Session>> = self.sessions.borrow().clone();

        let mut changed = 0;
        for session in &sessions {
            if !self.contains(session) {
                continue;
            }
            session.gather_active();
            if session.has_active() {
                session.broadcast_active();
                changed += 1;
            }
        }

        let pass_index = self.passes.get();
        self.passes.set(pass_index + 1);
        self.tracer.refresh_pass(&RefreshPassEvent {
            pass_index,
            started,
            finished: self.host.now(),
            sessions: sessions.len(),
            changed,
        });

        if changed > 0 {
            self.request(TriggerKind::Rerun);
        } else if self.listeners_enabled.get() && self.polls() && !self.idle.is_pending() {
            // One follow-up poll per pass. A poll already waiting covers this one.
            self.idle.call(());
        }
    }

    fn attach(this: &Rc<Self>) {
        if !this.capabilities.browser || this.listeners_enabled.get() {
            return;
        }

        let weak = Rc::downgrade(this);
        let resize = this.host.on_resize(trigger(&weak, TriggerKind::Resize));

        let transition_end = {
            let weak = Weak::clone(&weak);
            this.host.on_transition_end(Rc::new(move |property: &str| {
                if !is_reflow_property(property) {
                    return;
                }
                if let Some(inner) = weak.upgrade() {
                    inner.request(TriggerKind::TransitionEnd);
                }
            }))
        };

        let mutation_watcher = if this.capabilities.mutation_observer {
            this.host
                .observe_mutations(trigger(&weak, TriggerKind::Mutation))
        } else {
            None
        };
        let has_watcher = mutation_watcher.is_some();

        *this.listeners.borrow_mut() = Some(Listeners {
            _resize: resize,
            _transition_end: transition_end,
            mutation_watcher,
        });
        this.listeners_enabled.set(true);

        this.tracer.listeners_attached(&ListenersAttachedEvent {
            timestamp: this.host.now(),
            mutation_watcher: has_watcher,
            continuous: this.continuous.get(),
        });

        if this.polls() {
            this.request(TriggerKind::Connect);
        }
    }

    fn detach(&self) {
        if !self.capabilities.browser || !self.listeners_enabled.get() {
            return;
        }

        // Dropping the subscriptions detaches them.
        let listeners = self.listeners.borrow_mut().take();
        drop(listeners);
        self.listeners_enabled.set(false);

        self.tracer.listeners_detached(&ListenersDetachedEvent {
            timestamp: self.host.now(),
        });
    }
}

fn trigger(weak: &Weak<ControllerInner>, kind: TriggerKind) -> Listener {
    let weak = Weak::clone(weak);
    Rc::new(move || {
        if let Some(inner) = weak.upgrade() {
            inner.request(kind);
        }
    })
}

/// Schedules re-measurement of every connected [`Session`].
///
/// The controller is a cheap, cloneable handle. All clones share state, and
/// the state lives until the last handle is dropped, at which point any
/// attached listeners are detached. Tasks still queued on the host after that
/// become no-ops.
///
/// # Usage
///
/// ```rust,ignore
/// let controller = Controller::new(host, ControllerConfig::new());
/// controller.connect(session.clone());   // attaches listeners
/// // ... resize, mutations, transitions trigger refresh passes ...
/// controller.disconnect(&session);       // detaches listeners
/// ```
#[derive(Clone)]
pub struct Controller {
    inner: Rc<ControllerInner>,
}

impl Controller {
    /// Creates a controller running on `host`.
    ///
    /// The host's [`Capabilities`] are probed once, here.
    #[must_use]
    pub fn new(host: Rc<dyn Host>, config: ControllerConfig) -> Self {
        let capabilities = host.capabilities();
        let timers: Rc<dyn Timers> = host.clone();

        let inner = Rc::new_cyclic(|weak: &Weak<ControllerInner>| {
            let refresh = {
                let weak = Weak::clone(weak);
                Coalescer::new(Rc::clone(&timers), config.refresh_delay, true, move |()| {
                    if let Some(inner) = weak.upgrade() {
                        inner.run_pass();
                    }
                })
            };
            let idle = {
                let weak = Weak::clone(weak);
                Coalescer::new(timers, config.idle_delay, false, move |()| {
                    if let Some(inner) = weak.upgrade() {
                        inner.request(TriggerKind::Idle);
                    }
                })
            };

            ControllerInner {
                host,
                capabilities,
                sessions: RefCell::new(Vec::new()),
                listeners_enabled: Cell::new(false),
                continuous: Cell::new(config.continuous || !capabilities.mutation_observer),
                listeners: RefCell::new(None),
                refresh,
                idle,
                passes: Cell::new(0),
                tracer: Tracer::none(),
            }
        });

        Self { inner }
    }

    /// Adds `session`. Connecting an already connected session does nothing.
    ///
    /// The first session attaches environment listeners and, in continuous
    /// mode, triggers a refresh right away.
    pub fn connect(&self, session: Rc<dyn Session>) {
        if self.inner.contains(&session) {
            return;
        }
        self.inner.sessions.borrow_mut().push(session);

        if !self.inner.listeners_enabled.get() {
            ControllerInner::attach(&self.inner);
        }
    }

    /// Removes `session`. Disconnecting an unknown session does nothing.
    ///
    /// Removing the last session detaches environment listeners.
    pub fn disconnect(&self, session: &Rc<dyn Session>) {
        let now_empty = {
            let mut sessions = self.inner.sessions.borrow_mut();
            let Some(idx) = sessions.iter().position(|s| Rc::ptr_eq(s, session)) else {
                return;
            };
            sessions.remove(idx);
            sessions.is_empty()
        };

        if now_empty {
            self.inner.detach();
        }
    }

    /// Returns `true` if `session` is connected.
    #[must_use]
    pub fn is_connected(&self, session: &Rc<dyn Session>) -> bool {
        self.inner.contains(session)
    }

    /// Returns the number of connected sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.inner.sessions.borrow().len()
    }

    /// Returns `true` if the controller keeps polling without events.
    #[must_use]
    pub fn continuous_mode(&self) -> bool {
        self.inner.continuous.get()
    }

    /// Switches continuous mode.
    ///
    /// Does nothing when the host cannot observe mutations; continuous mode
    /// then stays on. Enabling it while listening triggers a refresh.
    pub fn set_continuous_mode(&self, continuous: bool) {
        if !self.inner.capabilities.mutation_observer {
            return;
        }

        if self.inner.continuous.replace(continuous) != continuous {
            self.inner.tracer.continuous_mode(&ContinuousModeEvent {
                timestamp: self.inner.host.now(),
                enabled: continuous,
            });
        }

        if continuous && self.inner.listeners_enabled.get() {
            self.inner.request(TriggerKind::ContinuousMode);
        }
    }

    /// Requests a refresh pass.
    ///
    /// Returns immediately. The pass runs from the host's event loop after
    /// the refresh delay and the following animation frame; requests made in
    /// the meantime are merged into it or into the one after it.
    pub fn refresh(&self) {
        self.inner.request(TriggerKind::Manual);
    }

    /// Returns `true` while environment listeners are attached.
    #[must_use]
    pub fn listeners_enabled(&self) -> bool {
        self.inner.listeners_enabled.get()
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        if self.inner.listeners_enabled.get() {
            ControllerState::Listening {
                continuous: self.inner.polls(),
            }
        } else {
            ControllerState::Idle
        }
    }

    /// Returns the capabilities probed at construction.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.inner.capabilities
    }

    /// Returns the number of completed refresh passes.
    #[must_use]
    pub fn pass_count(&self) -> u64 {
        self.inner.passes.get()
    }

    /// Installs a trace sink. Requires the `trace` feature to receive events.
    pub fn set_trace_sink(&self, sink: Box<dyn TraceSink>) {
        self.inner.tracer.set_sink(sink);
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("capabilities", &self.inner.capabilities)
            .field("sessions", &self.inner.sessions.borrow().len())
            .field("state", &self.state())
            .field("passes", &self.inner.passes.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Task, TransitionListener};

    /// A host that is not a browser; any listener attach is a bug.
    struct Headless;

    impl Timers for Headless {
        fn now(&self) -> Duration {
            Duration::ZERO
        }

        fn set_timeout(&self, _delay: Duration, _task: Task) {}

        fn request_animation_frame(&self, _task: Task) {}
    }

    impl Host for Headless {
        fn capabilities(&self) -> Capabilities {
            Capabilities::HEADLESS
        }

        fn on_resize(&self, _listener: Listener) -> Subscription {
            panic!("headless host must not attach resize listeners");
        }

        fn on_transition_end(&self, _listener: TransitionListener) -> Subscription {
            panic!("headless host must not attach transition listeners");
        }

        fn observe_mutations(&self, _listener: Listener) -> Option<Subscription> {
            panic!("headless host must not observe mutations");
        }
    }

    struct Inert;

    impl Session for Inert {
        fn gather_active(&self) {}

        fn has_active(&self) -> bool {
            false
        }

        fn broadcast_active(&self) {}
    }

    #[test]
    fn reflow_properties() {
        assert!(is_reflow_property("width"));
        assert!(is_reflow_property("max-height"));
        assert!(is_reflow_property("border-left-width"));
        assert!(is_reflow_property("font-size"));
        assert!(is_reflow_property("font-weight"));
        assert!(!is_reflow_property("opacity"));
        assert!(!is_reflow_property("color"));
        assert!(!is_reflow_property(""));
    }

    #[test]
    fn config_builders() {
        let config = ControllerConfig::new()
            .with_refresh_delay(Duration::from_millis(5))
            .with_idle_delay(Duration::from_millis(50))
            .with_continuous(true);
        assert_eq!(config.refresh_delay, Duration::from_millis(5));
        assert_eq!(config.idle_delay, Duration::from_millis(50));
        assert!(config.continuous);
        assert_eq!(ControllerConfig::default().refresh_delay, REFRESH_DELAY);
    }

    #[test]
    fn headless_connect_never_attaches() {
        let controller = Controller::new(Rc::new(Headless), ControllerConfig::new());
        let session: Rc<dyn Session> = Rc::new(Inert);

        controller.connect(Rc::clone(&session));
        assert!(controller.is_connected(&session));
        assert!(!controller.listeners_enabled());
        assert_eq!(controller.state(), ControllerState::Idle);

        controller.disconnect(&session);
        assert!(!controller.is_connected(&session));
        assert_eq!(controller.session_count(), 0);
    }

    #[test]
    fn continuous_mode_forced_without_mutation_observer() {
        let controller = Controller::new(Rc::new(Headless), ControllerConfig::new());
        assert!(controller.continuous_mode());
        controller.set_continuous_mode(false);
        assert!(
            controller.continuous_mode(),
            "setter must be a no-op without mutation observation"
        );
    }

    #[test]
    fn connect_is_idempotent() {
        let controller = Controller::new(Rc::new(Headless), ControllerConfig::new());
        let session: Rc<dyn Session> = Rc::new(Inert);
        controller.connect(Rc::clone(&session));
        controller.connect(Rc::clone(&session));
        assert_eq!(controller.session_count(), 1);

        let other: Rc<dyn Session> = Rc::new(Inert);
        controller.disconnect(&other);
        assert_eq!(controller.session_count(), 1);
    }
}
