// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Virtual-time host.
//!
//! [`VirtualHost`] implements [`Host`] on a simulated clock. Timers fire when
//! the clock is advanced past their deadline; animation frames fire on the
//! next frame boundary (a multiple of the frame interval). Nothing runs until
//! the test calls [`advance`](VirtualHost::advance) or
//! [`run_until_idle`](VirtualHost::run_until_idle), so every schedule is
//! reproducible.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::time::Duration;

use temblor_core::host::{
    Capabilities, Host, Listener, Subscription, Task, Timers, TransitionListener,
};

/// Default frame interval (60 Hz, rounded).
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Which queue a task came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// `set_timeout`.
    Timeout,
    /// `request_animation_frame`.
    Frame,
}

struct Queued {
    due: Duration,
    seq: u64,
    kind: TaskKind,
    task: Task,
}

/// Listener bookkeeping, shared with detach closures.
#[derive(Default)]
struct Registry {
    next_id: u64,
    resize: Vec<(u64, Listener)>,
    transition_end: Vec<(u64, TransitionListener)>,
    mutation: Vec<(u64, Listener)>,
    counts: ListenerCounts,
}

/// How often each kind of listener was attached and detached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenerCounts {
    /// Resize listeners attached.
    pub resize_attached: u32,
    /// Resize listeners detached.
    pub resize_detached: u32,
    /// Transition-end listeners attached.
    pub transition_attached: u32,
    /// Transition-end listeners detached.
    pub transition_detached: u32,
    /// Mutation watchers created.
    pub mutation_attached: u32,
    /// Mutation watchers disconnected.
    pub mutation_detached: u32,
}

/// A [`Host`] driven by a virtual clock.
pub struct VirtualHost {
    capabilities: Capabilities,
    frame_interval: Duration,
    refuse_mutation_observer: bool,
    now: Cell<Duration>,
    seq: Cell<u64>,
    queue: RefCell<Vec<Queued>>,
    registry: Rc<RefCell<Registry>>,
    executed: Cell<u64>,
}

impl fmt::Debug for VirtualHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualHost")
            .field("capabilities", &self.capabilities)
            .field("now", &self.now.get())
            .field("queued", &self.queue.borrow().len())
            .field("counts", &self.registry.borrow().counts)
            .finish_non_exhaustive()
    }
}

impl VirtualHost {
    /// Creates a host with the given capabilities and a 60 Hz frame clock.
    #[must_use]
    pub fn new(capabilities: Capabilities) -> Rc<Self> {
        Rc::new(Self::build(capabilities, FRAME_INTERVAL, false))
    }

    /// Creates a browser host with mutation observation.
    #[must_use]
    pub fn browser() -> Rc<Self> {
        Self::new(Capabilities::FULL)
    }

    /// Creates a host with a custom frame interval.
    #[must_use]
    pub fn with_frame_interval(capabilities: Capabilities, frame_interval: Duration) -> Rc<Self> {
        Rc::new(Self::build(capabilities, frame_interval, false))
    }

    /// Creates a host that advertises mutation observation but fails to
    /// create a watcher when asked.
    #[must_use]
    pub fn with_failing_mutation_observer() -> Rc<Self> {
        Rc::new(Self::build(Capabilities::FULL, FRAME_INTERVAL, true))
    }

    fn build(capabilities: Capabilities, frame_interval: Duration, refuse: bool) -> Self {
        assert!(
            !frame_interval.is_zero(),
            "frame interval must be non-zero"
        );
        Self {
            capabilities,
            frame_interval,
            refuse_mutation_observer: refuse,
            now: Cell::new(Duration::ZERO),
            seq: Cell::new(0),
            queue: RefCell::new(Vec::new()),
            registry: Rc::new(RefCell::new(Registry::default())),
            executed: Cell::new(0),
        }
    }

    /// Returns the frame interval.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Returns the number of queued tasks.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Returns the number of queued tasks of one kind.
    #[must_use]
    pub fn pending(&self, kind: TaskKind) -> usize {
        self.queue.borrow().iter().filter(|q| q.kind == kind).count()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Returns the total number of tasks run so far.
    #[must_use]
    pub fn executed_tasks(&self) -> u64 {
        self.executed.get()
    }

    /// Returns listener attach/detach counts.
    #[must_use]
    pub fn listener_counts(&self) -> ListenerCounts {
        self.registry.borrow().counts
    }

    /// Returns the number of currently attached resize listeners.
    #[must_use]
    pub fn resize_listeners(&self) -> usize {
        self.registry.borrow().resize.len()
    }

    /// Returns the number of currently attached transition-end listeners.
    #[must_use]
    pub fn transition_listeners(&self) -> usize {
        self.registry.borrow().transition_end.len()
    }

    /// Returns the number of live mutation watchers.
    #[must_use]
    pub fn mutation_watchers(&self) -> usize {
        self.registry.borrow().mutation.len()
    }

    /// Advances the clock by `by`, running every task that falls due, in
    /// deadline order. Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now.get() + by;
        let mut ran = 0;
        while let Some(q) = self.pop_due(Some(target)) {
            self.run(q);
            ran += 1;
        }
        self.now.set(target);
        ran
    }

    /// Runs queued tasks in deadline order until the queue is empty or
    /// `max_tasks` tasks have run, advancing the clock to each deadline.
    ///
    /// Returns the number of tasks run.
    pub fn run_until_idle(&self, max_tasks: usize) -> usize {
        let mut ran = 0;
        while ran < max_tasks {
            let Some(q) = self.pop_due(None) else {
                break;
            };
            self.run(q);
            ran += 1;
        }
        ran
    }

    /// Delivers a window resize to every resize listener.
    pub fn fire_resize(&self) {
        let listeners: Vec<Listener> = self
            .registry
            .borrow()
            .resize
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    /// Delivers a mutation batch to every mutation watcher.
    pub fn fire_mutation(&self) {
        let listeners: Vec<Listener> = self
            .registry
            .borrow()
            .mutation
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    /// Delivers a `transitionend` for `property` to every listener.
    pub fn fire_transition_end(&self, property: &str) {
        let listeners: Vec<TransitionListener> = self
            .registry
            .borrow()
            .transition_end
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(property);
        }
    }

    fn enqueue(&self, due: Duration, kind: TaskKind, task: Task) {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        self.queue.borrow_mut().push(Queued {
            due,
            seq,
            kind,
            task,
        });
    }

    fn pop_due(&self, limit: Option<Duration>) -> Option<Queued> {
        let mut queue = self.queue.borrow_mut();
        let idx = queue
            .iter()
            .enumerate()
            .filter(|(_, q)| limit.is_none_or(|limit| q.due <= limit))
            .min_by_key(|(_, q)| (q.due, q.seq))
            .map(|(idx, _)| idx)?;
        Some(queue.swap_remove(idx))
    }

    fn run(&self, q: Queued) {
        if q.due > self.now.get() {
            self.now.set(q.due);
        }
        self.executed.set(self.executed.get() + 1);
        (q.task)();
    }

    fn next_frame(&self) -> Duration {
        let interval = self.frame_interval.as_nanos();
        let now = self.now.get().as_nanos();
        let next = (now / interval + 1) * interval;
        Duration::from_nanos(u64::try_from(next).unwrap_or(u64::MAX))
    }

    fn subscription(&self, remove: fn(&mut Registry, u64), id: u64) -> Subscription {
        let registry = Rc::clone(&self.registry);
        Subscription::new(move || remove(&mut registry.borrow_mut(), id))
    }
}

impl Timers for VirtualHost {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn set_timeout(&self, delay: Duration, task: Task) {
        self.enqueue(self.now.get() + delay, TaskKind::Timeout, task);
    }

    fn request_animation_frame(&self, task: Task) {
        self.enqueue(self.next_frame(), TaskKind::Frame, task);
    }
}

impl Host for VirtualHost {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn on_resize(&self, listener: Listener) -> Subscription {
        let id = {
            let mut reg = self.registry.borrow_mut();
            let id = reg.next_id;
            reg.next_id += 1;
            reg.resize.push((id, listener));
            reg.counts.resize_attached += 1;
            id
        };
        self.subscription(
            |reg, id| {
                reg.resize.retain(|(i, _)| *i != id);
                reg.counts.resize_detached += 1;
            },
            id,
        )
    }

    fn on_transition_end(&self, listener: TransitionListener) -> Subscription {
        let id = {
            let mut reg = self.registry.borrow_mut();
            let id = reg.next_id;
            reg.next_id += 1;
            reg.transition_end.push((id, listener));
            reg.counts.transition_attached += 1;
            id
        };
        self.subscription(
            |reg, id| {
                reg.transition_end.retain(|(i, _)| *i != id);
                reg.counts.transition_detached += 1;
            },
            id,
        )
    }

    fn observe_mutations(&self, listener: Listener) -> Option<Subscription> {
        if !self.capabilities.mutation_observer || self.refuse_mutation_observer {
            return None;
        }
        let id = {
            let mut reg = self.registry.borrow_mut();
            let id = reg.next_id;
            reg.next_id += 1;
            reg.mutation.push((id, listener));
            reg.counts.mutation_attached += 1;
            id
        };
        Some(self.subscription(
            |reg, id| {
                reg.mutation.retain(|(i, _)| *i != id);
                reg.counts.mutation_detached += 1;
            },
            id,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn push(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> Task {
        let log = Rc::clone(log);
        Box::new(move || log.borrow_mut().push(tag))
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let host = VirtualHost::browser();
        let log = Rc::new(RefCell::new(Vec::new()));
        host.set_timeout(Duration::from_millis(30), push(&log, "b"));
        host.set_timeout(Duration::from_millis(10), push(&log, "a"));
        host.set_timeout(Duration::from_millis(30), push(&log, "c"));

        assert_eq!(host.advance(Duration::from_millis(20)), 1);
        assert_eq!(*log.borrow(), vec!["a"]);
        assert_eq!(host.advance(Duration::from_millis(20)), 2);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"], "ties run in FIFO order");
        assert_eq!(host.now(), Duration::from_millis(40));
    }

    #[test]
    fn frames_land_on_the_next_boundary() {
        let host = VirtualHost::with_frame_interval(Capabilities::FULL, Duration::from_millis(10));
        host.advance(Duration::from_millis(3));
        let log = Rc::new(RefCell::new(Vec::new()));
        host.request_animation_frame(push(&log, "frame"));

        host.advance(Duration::from_millis(6));
        assert!(log.borrow().is_empty(), "frame must wait for the boundary");
        host.advance(Duration::from_millis(1));
        assert_eq!(*log.borrow(), vec!["frame"]);
    }

    #[test]
    fn frame_requested_on_a_boundary_waits_a_full_interval() {
        let host = VirtualHost::with_frame_interval(Capabilities::FULL, Duration::from_millis(10));
        host.advance(Duration::from_millis(10));
        let log = Rc::new(RefCell::new(Vec::new()));
        host.request_animation_frame(push(&log, "frame"));
        host.run_until_idle(8);
        assert_eq!(host.now(), Duration::from_millis(20));
    }

    #[test]
    fn subscriptions_detach_on_drop() {
        let host = VirtualHost::browser();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = host.on_resize(Rc::new(move || h.set(h.get() + 1)));
        host.fire_resize();
        drop(sub);
        host.fire_resize();

        assert_eq!(hits.get(), 1);
        let counts = host.listener_counts();
        assert_eq!(counts.resize_attached, 1);
        assert_eq!(counts.resize_detached, 1);
        assert_eq!(host.resize_listeners(), 0);
    }

    #[test]
    fn mutation_observer_follows_capabilities() {
        let host = VirtualHost::new(Capabilities::NO_MUTATION_OBSERVER);
        assert!(host.observe_mutations(Rc::new(|| {})).is_none());

        let host = VirtualHost::with_failing_mutation_observer();
        assert!(host.capabilities().mutation_observer);
        assert!(host.observe_mutations(Rc::new(|| {})).is_none());

        let host = VirtualHost::browser();
        let watcher = host.observe_mutations(Rc::new(|| {}));
        assert!(watcher.is_some());
        assert_eq!(host.mutation_watchers(), 1);
    }

    #[test]
    fn run_until_idle_respects_budget() {
        let host = VirtualHost::browser();
        let log = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..5 {
            host.set_timeout(Duration::from_millis(1), push(&log, "t"));
        }
        assert_eq!(host.run_until_idle(3), 3);
        assert_eq!(host.pending(TaskKind::Timeout), 2);
        assert_eq!(host.run_until_idle(10), 2);
        assert!(host.is_idle());
        assert_eq!(host.executed_tasks(), 5);
    }
}
