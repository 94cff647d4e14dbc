// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for environment integrations.
//!
//! Everything the scheduler needs from its environment goes through the
//! [`Host`] trait. A host provides:
//!
//! - **Capabilities**: whether it is a browser-like environment at all and
//!   whether it can watch the document for DOM mutations. The controller
//!   probes these once, at construction.
//!
//! - **Deferred tasks**: one-shot timers and animation-frame callbacks.
//!   These are the only suspension points in the system.
//!
//! - **Signals**: window resize, document `transitionend`, and (optionally)
//!   DOM mutation batches. Each subscription is returned as a
//!   [`Subscription`] guard; dropping the guard detaches the listener.
//!
//! # Crate boundaries
//!
//! `temblor_core` owns this contract and the scheduling logic. The browser
//! implementation lives in `temblor_backend_web`, and a deterministic
//! virtual-time implementation for tests lives in `temblor_harness`.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::fmt;
use core::time::Duration;

/// A one-shot deferred task.
pub type Task = Box<dyn FnOnce()>;

/// A listener for payload-free signals (resize, mutation batches).
pub type Listener = Rc<dyn Fn()>;

/// A listener for `transitionend`, receiving the transitioned CSS property
/// name.
pub type TransitionListener = Rc<dyn Fn(&str)>;

/// What the environment can do, probed once per controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Capabilities {
    /// Running inside a browser-like environment with a window and document.
    ///
    /// When `false`, every listener attach/detach is skipped.
    pub browser: bool,
    /// The environment can watch a document for DOM mutations.
    ///
    /// When `false`, the controller forces continuous mode on.
    pub mutation_observer: bool,
}

impl Capabilities {
    /// A browser with mutation observation.
    pub const FULL: Self = Self {
        browser: true,
        mutation_observer: true,
    };

    /// A browser without mutation observation.
    pub const NO_MUTATION_OBSERVER: Self = Self {
        browser: true,
        mutation_observer: false,
    };

    /// Not a browser at all.
    pub const HEADLESS: Self = Self {
        browser: false,
        mutation_observer: false,
    };
}

/// An attached environment listener.
///
/// Dropping the guard detaches the listener. Implementations must make the
/// detach idempotent.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Creates a subscription that runs `detach` when dropped.
    #[must_use]
    pub fn new(detach: impl FnOnce() + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Creates a subscription with nothing to detach.
    #[must_use]
    pub fn empty() -> Self {
        Self { detach: None }
    }

    /// Detaches the listener now.
    pub fn cancel(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

/// Timers and animation frames.
///
/// This is the part of [`Host`] that the [`Coalescer`] needs.
///
/// Tasks must never run synchronously from inside the scheduling call; they
/// run later, from the host's own event loop.
///
/// [`Coalescer`]: crate::coalesce::Coalescer
pub trait Timers {
    /// Returns the current monotonic time, measured from an arbitrary origin.
    fn now(&self) -> Duration;

    /// Runs `task` once, no earlier than `delay` from now.
    fn set_timeout(&self, delay: Duration, task: Task);

    /// Runs `task` once, before the next paint.
    fn request_animation_frame(&self, task: Task);
}

/// The environment the controller runs in.
///
/// Both the browser host and the virtual test host implement this trait,
/// enabling the same controller code to run against either.
pub trait Host: Timers {
    /// Probes the environment's capabilities.
    fn capabilities(&self) -> Capabilities;

    /// Subscribes `listener` to window resize events.
    fn on_resize(&self, listener: Listener) -> Subscription;

    /// Subscribes `listener` to document `transitionend` events.
    fn on_transition_end(&self, listener: TransitionListener) -> Subscription;

    /// Watches the document root for attribute, child-list, and character-data
    /// changes anywhere in its subtree, calling `listener` once per batch.
    ///
    /// Returns `None` if mutation observation is unavailable.
    fn observe_mutations(&self, listener: Listener) -> Option<Subscription>;
}
