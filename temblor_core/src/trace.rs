// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the refresh cycle.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! controller calls as it attaches listeners, receives triggers, and runs
//! refresh passes. All method bodies default to no-ops, so implementing only
//! the events you care about is fine.
//!
//! [`Tracer`] owns an optional boxed sink. When the `trace` feature is
//! **off**, every `Tracer` method compiles to nothing and the sink is dropped
//! on installation. When **on**, each method performs a single `Option`
//! branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: Enables the `Tracer` method bodies (one branch per call).

use alloc::boxed::Box;
use core::cell::RefCell;
use core::time::Duration;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What asked for a refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Window resize.
    Resize,
    /// A batch of DOM mutations.
    Mutation,
    /// A `transitionend` on a geometry-affecting property.
    TransitionEnd,
    /// The first session connected while in continuous mode.
    Connect,
    /// Continuous mode was switched on while listening.
    ContinuousMode,
    /// The previous pass found changes.
    Rerun,
    /// Idle poll in continuous mode.
    Idle,
    /// A direct call to `Controller::refresh`.
    Manual,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when environment listeners are attached.
#[derive(Clone, Copy, Debug)]
pub struct ListenersAttachedEvent {
    /// Host time of the attach.
    pub timestamp: Duration,
    /// Whether a mutation watcher was created.
    pub mutation_watcher: bool,
    /// Whether continuous mode is in effect.
    pub continuous: bool,
}

/// Emitted when environment listeners are detached.
#[derive(Clone, Copy, Debug)]
pub struct ListenersDetachedEvent {
    /// Host time of the detach.
    pub timestamp: Duration,
}

/// Emitted when something requests a refresh.
#[derive(Clone, Copy, Debug)]
pub struct TriggerEvent {
    /// Host time of the request.
    pub timestamp: Duration,
    /// Where the request came from.
    pub kind: TriggerKind,
}

/// Emitted after each refresh pass.
#[derive(Clone, Copy, Debug)]
pub struct RefreshPassEvent {
    /// Zero-based pass counter.
    pub pass_index: u64,
    /// Host time when the pass started.
    pub started: Duration,
    /// Host time when the pass finished.
    pub finished: Duration,
    /// Number of sessions visited.
    pub sessions: usize,
    /// Number of sessions that broadcast changes.
    pub changed: usize,
}

/// Emitted when continuous mode changes.
#[derive(Clone, Copy, Debug)]
pub struct ContinuousModeEvent {
    /// Host time of the change.
    pub timestamp: Duration,
    /// New value.
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the controller.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about. Sinks must not call back into the
/// controller.
pub trait TraceSink {
    /// Called when environment listeners are attached.
    fn on_listeners_attached(&mut self, e: &ListenersAttachedEvent) {
        _ = e;
    }

    /// Called when environment listeners are detached.
    fn on_listeners_detached(&mut self, e: &ListenersDetachedEvent) {
        _ = e;
    }

    /// Called when a refresh is requested.
    fn on_trigger(&mut self, e: &TriggerEvent) {
        _ = e;
    }

    /// Called after each refresh pass.
    fn on_refresh_pass(&mut self, e: &RefreshPassEvent) {
        _ = e;
    }

    /// Called when continuous mode changes.
    fn on_continuous_mode(&mut self, e: &ContinuousModeEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Owner of an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
#[derive(Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: RefCell<Option<Box<dyn TraceSink>>>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<RefCell<()>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

macro_rules! emit {
    ($self:ident, $method:ident, $e:ident) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = $self.sink.borrow_mut().as_mut() {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (&$self, $e);
        }
    }};
}

impl Tracer {
    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Installs `sink`, replacing any previous sink.
    ///
    /// Without the `trace` feature the sink is dropped immediately.
    pub fn set_sink(&self, sink: Box<dyn TraceSink>) {
        #[cfg(feature = "trace")]
        {
            *self.sink.borrow_mut() = Some(sink);
        }
        #[cfg(not(feature = "trace"))]
        {
            drop(sink);
        }
    }

    /// Removes and returns the installed sink.
    pub fn take_sink(&self) -> Option<Box<dyn TraceSink>> {
        #[cfg(feature = "trace")]
        {
            self.sink.borrow_mut().take()
        }
        #[cfg(not(feature = "trace"))]
        {
            None
        }
    }

    /// Returns `true` if events reach a sink.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.borrow().is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`ListenersAttachedEvent`].
    #[inline]
    pub fn listeners_attached(&self, e: &ListenersAttachedEvent) {
        emit!(self, on_listeners_attached, e);
    }

    /// Emits a [`ListenersDetachedEvent`].
    #[inline]
    pub fn listeners_detached(&self, e: &ListenersDetachedEvent) {
        emit!(self, on_listeners_detached, e);
    }

    /// Emits a [`TriggerEvent`].
    #[inline]
    pub fn trigger(&self, e: &TriggerEvent) {
        emit!(self, on_trigger, e);
    }

    /// Emits a [`RefreshPassEvent`].
    #[inline]
    pub fn refresh_pass(&self, e: &RefreshPassEvent) {
        emit!(self, on_refresh_pass, e);
    }

    /// Emits a [`ContinuousModeEvent`].
    #[inline]
    pub fn continuous_mode(&self, e: &ContinuousModeEvent) {
        emit!(self, on_continuous_mode, e);
    }
}

#[cfg(all(test, feature = "trace"))]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    struct Collect(Rc<RefCell<Vec<TriggerKind>>>);

    impl TraceSink for Collect {
        fn on_trigger(&mut self, e: &TriggerEvent) {
            self.0.borrow_mut().push(e.kind);
        }
    }

    #[test]
    fn tracer_dispatches_to_installed_sink() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let tracer = Tracer::none();
        tracer.trigger(&TriggerEvent {
            timestamp: Duration::ZERO,
            kind: TriggerKind::Resize,
        });
        assert!(seen.borrow().is_empty());

        tracer.set_sink(Box::new(Collect(Rc::clone(&seen))));
        assert!(tracer.is_enabled());
        tracer.trigger(&TriggerEvent {
            timestamp: Duration::from_millis(5),
            kind: TriggerKind::Mutation,
        });
        assert_eq!(*seen.borrow(), [TriggerKind::Mutation]);
    }

    #[test]
    fn default_methods_are_noops() {
        let tracer = Tracer::none();
        tracer.set_sink(Box::new(NoopSink));
        tracer.refresh_pass(&RefreshPassEvent {
            pass_index: 0,
            started: Duration::ZERO,
            finished: Duration::ZERO,
            sessions: 0,
            changed: 0,
        });
        assert!(tracer.take_sink().is_some());
        assert!(!tracer.is_enabled());
    }
}
