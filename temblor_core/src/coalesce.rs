// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rate-limited call coalescing.
//!
//! A [`Coalescer`] wraps a callback `f(A)` and hands out a proxy with the same
//! calling convention. The first call opens a delay window; calls that land
//! inside the window are merged into a single trailing call that opens the
//! next window once `f` has run. The wrapped callback therefore never fires
//! more often than once per `delay`, and the most recent arguments are never
//! lost.
//!
//! ```text
//!  call(a) ─┬─► lead = a, arm timer
//!  call(b) ─┤   edge = b
//!  call(c) ─┤   edge = c          (b dropped)
//!           │
//!  timer ───┴─► [rAF] ─► f(a) ─► lead = ∅ ─► call(c) ─► lead = c, arm timer
//! ```
//!
//! The two-slot bookkeeping lives in [`PendingCalls`], which is independent of
//! any host and unit-tested on its own.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;
use core::time::Duration;

use crate::host::Timers;

/// The occupant of the lead slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lead<A> {
    /// Waiting for the timer (and frame, if deferred) to fire.
    Waiting(A),
    /// Arguments handed to the callback; the callback is running.
    Invoking,
}

/// Outstanding invocation contexts for one [`Coalescer`].
///
/// At most two calls are tracked:
///
/// - the **lead** call, scheduled to fire once the delay elapses, and kept
///   occupied while the callback runs;
/// - the **edge** call, the most recent call received while the lead slot was
///   occupied. Later calls overwrite it.
///
/// The edge slot is only ever populated while the lead slot is occupied.
#[derive(Debug)]
pub struct PendingCalls<A> {
    lead: Option<Lead<A>>,
    edge: Option<A>,
}

impl<A> Default for PendingCalls<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> PendingCalls<A> {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lead: None,
            edge: None,
        }
    }

    /// Returns `true` while a lead call is waiting or running.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.lead.is_some()
    }

    /// Returns `true` if a call is waiting behind the lead.
    #[must_use]
    pub const fn has_edge(&self) -> bool {
        self.edge.is_some()
    }

    /// Records a call.
    ///
    /// Returns `true` if the call became the lead and a new delay window must
    /// be armed. Otherwise the call replaced the edge.
    pub fn record(&mut self, args: A) -> bool {
        if self.lead.is_some() {
            self.edge = Some(args);
            false
        } else {
            self.lead = Some(Lead::Waiting(args));
            true
        }
    }

    /// Takes the lead call's arguments for invocation.
    ///
    /// The lead slot stays occupied until [`finish`](Self::finish), so calls
    /// made from inside the callback land in the edge slot. Returns `None` if
    /// there is no waiting lead.
    pub fn begin(&mut self) -> Option<A> {
        match self.lead.take() {
            Some(Lead::Waiting(args)) => {
                self.lead = Some(Lead::Invoking);
                Some(args)
            }
            other => {
                self.lead = other;
                None
            }
        }
    }

    /// Clears the lead slot and returns the edge call, if any.
    pub fn finish(&mut self) -> Option<A> {
        self.lead = None;
        self.edge.take()
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.lead = None;
        self.edge = None;
    }
}

struct Inner<A> {
    timers: Rc<dyn Timers>,
    delay: Duration,
    defer_to_frame: bool,
    callback: RefCell<Box<dyn FnMut(A)>>,
    pending: RefCell<PendingCalls<A>>,
}

/// Resets the pending record if the callback unwinds, so the coalescer does
/// not stay wedged in the invoking state.
struct ClearOnUnwind<'a, A>(&'a RefCell<PendingCalls<A>>);

impl<A> Drop for ClearOnUnwind<'_, A> {
    fn drop(&mut self) {
        self.0.borrow_mut().clear();
    }
}

impl<A: 'static> Inner<A> {
    fn call(this: &Rc<Self>, args: A) {
        let opened = this.pending.borrow_mut().record(args);
        if opened {
            let inner = Rc::clone(this);
            this.timers
                .set_timeout(this.delay, Box::new(move || Self::on_timeout(&inner)));
        }
    }

    fn on_timeout(this: &Rc<Self>) {
        if this.defer_to_frame {
            let inner = Rc::clone(this);
            this.timers
                .request_animation_frame(Box::new(move || Self::resolve(&inner)));
        } else {
            Self::resolve(this);
        }
    }

    fn resolve(this: &Rc<Self>) {
        let Some(args) = this.pending.borrow_mut().begin() else {
            return;
        };

        let guard = ClearOnUnwind(&this.pending);
        (this.callback.borrow_mut())(args);
        core::mem::forget(guard);

        let edge = this.pending.borrow_mut().finish();
        if let Some(args) = edge {
            Self::call(this, args);
        }
    }
}

/// A rate-limiting proxy around a callback.
///
/// Cloning the proxy is cheap and every clone feeds the same pending record.
///
/// # Spacing
///
/// Consecutive invocations of the wrapped callback are at least `delay`
/// apart, because a trailing call is re-issued through the proxy (opening a
/// fresh window) rather than fired immediately. With `defer_to_frame`, each
/// invocation additionally waits for the next animation frame after its
/// timer, so the actual spacing is `delay` plus up to one frame.
///
/// # Re-entrancy
///
/// The callback may call the proxy. Such calls land in the edge slot and
/// run in the next window, never recursively.
pub struct Coalescer<A> {
    inner: Rc<Inner<A>>,
}

impl<A> Clone for Coalescer<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: 'static> Coalescer<A> {
    /// Wraps `callback` so that it fires at most once per `delay`.
    ///
    /// When `defer_to_frame` is set, each invocation is moved from the timer
    /// into the next animation-frame callback.
    pub fn new(
        timers: Rc<dyn Timers>,
        delay: Duration,
        defer_to_frame: bool,
        callback: impl FnMut(A) + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                timers,
                delay,
                defer_to_frame,
                callback: RefCell::new(Box::new(callback)),
                pending: RefCell::new(PendingCalls::new()),
            }),
        }
    }

    /// Requests an invocation with `args`.
    ///
    /// Returns immediately; the callback runs later from the host's event
    /// loop.
    pub fn call(&self, args: A) {
        Inner::call(&self.inner, args);
    }

    /// Returns `true` while an invocation is waiting or running.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.borrow().is_pending()
    }

    /// Returns the minimum spacing between invocations.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Returns `true` if invocations are deferred to animation frames.
    #[must_use]
    pub fn defers_to_frame(&self) -> bool {
        self.inner.defer_to_frame
    }
}

impl<A> fmt::Debug for Coalescer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self.inner.pending.borrow();
        f.debug_struct("Coalescer")
            .field("delay", &self.inner.delay)
            .field("defer_to_frame", &self.inner.defer_to_frame)
            .field("pending", &pending.is_pending())
            .field("edge", &pending.has_edge())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_opens_window() {
        let mut calls = PendingCalls::new();
        assert!(calls.record(1), "first call should become the lead");
        assert!(calls.is_pending());
        assert!(!calls.has_edge());
    }

    #[test]
    fn later_calls_overwrite_edge() {
        let mut calls = PendingCalls::new();
        calls.record(1);
        assert!(!calls.record(2), "second call must not open a window");
        assert!(!calls.record(3), "third call must not open a window");

        assert_eq!(calls.begin(), Some(1));
        assert_eq!(calls.finish(), Some(3), "last write wins");
        assert!(!calls.is_pending());
    }

    #[test]
    fn calls_during_invocation_go_to_edge() {
        let mut calls = PendingCalls::new();
        calls.record("lead");
        assert_eq!(calls.begin(), Some("lead"));

        // The callback calls the proxy while it runs.
        assert!(!calls.record("reentrant"));
        assert!(calls.is_pending(), "lead stays occupied while invoking");

        assert_eq!(calls.finish(), Some("reentrant"));
    }

    #[test]
    fn begin_without_waiting_lead_is_none() {
        let mut calls = PendingCalls::<u8>::new();
        assert_eq!(calls.begin(), None);

        calls.record(7);
        assert_eq!(calls.begin(), Some(7));
        // A stray second fire must not invoke twice.
        assert_eq!(calls.begin(), None);
        assert!(calls.is_pending(), "a stray fire leaves the invocation intact");
    }

    #[test]
    fn edge_only_exists_with_lead() {
        let mut calls = PendingCalls::new();
        calls.record(());
        calls.record(());
        calls.begin();
        calls.finish();
        assert!(!calls.has_edge(), "finish hands the edge back to the caller");
        assert!(!calls.is_pending());
    }

    #[test]
    fn clear_resets_both_slots() {
        let mut calls = PendingCalls::new();
        calls.record(1);
        calls.record(2);
        calls.clear();
        assert!(!calls.is_pending());
        assert!(!calls.has_edge());
        assert!(calls.record(3), "cleared record accepts a new lead");
    }
}
