// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scripted sessions.
//!
//! A [`ScriptedSession`] plays back a fixed sequence of "did anything
//! change?" answers, one per refresh pass, and counts how the controller
//! drove it. Sessions can share a [`CallLog`] to check ordering across
//! sessions.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use temblor_core::session::Session;

/// One session method call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionOp {
    /// `gather_active`.
    Gather,
    /// `has_active`.
    Has,
    /// `broadcast_active`.
    Broadcast,
}

/// Shared record of `(session name, op)` pairs in call order.
pub type CallLog = Rc<RefCell<Vec<(&'static str, SessionOp)>>>;

/// Creates an empty [`CallLog`].
#[must_use]
pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

type Hook = Box<dyn FnMut()>;

/// A [`Session`] that reports changes according to a script.
pub struct ScriptedSession {
    name: &'static str,
    script: RefCell<VecDeque<bool>>,
    staged: Cell<bool>,
    gathers: Cell<u32>,
    broadcasts: Cell<u32>,
    log: Option<CallLog>,
    on_broadcast: RefCell<Option<Hook>>,
}

impl fmt::Debug for ScriptedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedSession")
            .field("name", &self.name)
            .field("remaining", &self.script.borrow().len())
            .field("gathers", &self.gathers.get())
            .field("broadcasts", &self.broadcasts.get())
            .finish_non_exhaustive()
    }
}

impl ScriptedSession {
    /// Creates a session whose `n`th gather stages a change iff `script[n]`.
    /// Gathers beyond the end of the script stage nothing.
    #[must_use]
    pub fn new(name: &'static str, script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            name,
            script: RefCell::new(script.into_iter().collect()),
            staged: Cell::new(false),
            gathers: Cell::new(0),
            broadcasts: Cell::new(0),
            log: None,
            on_broadcast: RefCell::new(None),
        }
    }

    /// Creates a session that changes on each of its first `passes` gathers.
    #[must_use]
    pub fn changing_for(name: &'static str, passes: usize) -> Self {
        Self::new(name, core::iter::repeat_n(true, passes))
    }

    /// Creates a session that never changes.
    #[must_use]
    pub fn stable(name: &'static str) -> Self {
        Self::new(name, [])
    }

    /// Records every call into `log`.
    #[must_use]
    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = Some(Rc::clone(log));
        self
    }

    /// Runs `hook` at the end of every broadcast, after the session has
    /// released its own state.
    #[must_use]
    pub fn on_broadcast(self, hook: impl FnMut() + 'static) -> Self {
        *self.on_broadcast.borrow_mut() = Some(Box::new(hook));
        self
    }

    /// Appends more answers to the script.
    pub fn extend_script(&self, answers: impl IntoIterator<Item = bool>) {
        self.script.borrow_mut().extend(answers);
    }

    /// Returns the session's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns how many times `gather_active` ran.
    #[must_use]
    pub fn gathers(&self) -> u32 {
        self.gathers.get()
    }

    /// Returns how many times `broadcast_active` ran.
    #[must_use]
    pub fn broadcasts(&self) -> u32 {
        self.broadcasts.get()
    }

    fn record(&self, op: SessionOp) {
        if let Some(log) = &self.log {
            log.borrow_mut().push((self.name, op));
        }
    }
}

impl Session for ScriptedSession {
    fn gather_active(&self) {
        self.record(SessionOp::Gather);
        self.gathers.set(self.gathers.get() + 1);
        let changed = self.script.borrow_mut().pop_front().unwrap_or(false);
        self.staged.set(changed);
    }

    fn has_active(&self) -> bool {
        self.record(SessionOp::Has);
        self.staged.get()
    }

    fn broadcast_active(&self) {
        self.record(SessionOp::Broadcast);
        self.broadcasts.set(self.broadcasts.get() + 1);
        self.staged.set(false);

        // Taken out for the call so the hook may touch this session again.
        let hook = self.on_broadcast.borrow_mut().take();
        if let Some(mut hook) = hook {
            hook();
            let mut slot = self.on_broadcast.borrow_mut();
            if slot.is_none() {
                *slot = Some(hook);
            }
        }
    }
}
