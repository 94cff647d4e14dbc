// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording.
//!
//! The controller owns its sink once installed, so [`RecorderSink`] writes
//! into a shared [`Recording`] that the caller keeps a handle to:
//!
//! ```
//! use temblor_debug::recorder::RecorderSink;
//!
//! let sink = RecorderSink::new();
//! let recording = sink.recording();
//! // controller.set_trace_sink(Box::new(sink));
//! assert!(recording.is_empty());
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use temblor_core::trace::{
    ContinuousModeEvent, ListenersAttachedEvent, ListenersDetachedEvent, RefreshPassEvent,
    TraceSink, TriggerEvent, TriggerKind,
};

/// One recorded trace event.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// A [`ListenersAttachedEvent`].
    ListenersAttached(ListenersAttachedEvent),
    /// A [`ListenersDetachedEvent`].
    ListenersDetached(ListenersDetachedEvent),
    /// A [`TriggerEvent`].
    Trigger(TriggerEvent),
    /// A [`RefreshPassEvent`].
    RefreshPass(RefreshPassEvent),
    /// A [`ContinuousModeEvent`].
    ContinuousMode(ContinuousModeEvent),
}

/// Shared, growable list of [`RecordedEvent`]s.
#[derive(Clone, Debug, Default)]
pub struct Recording {
    events: Rc<RefCell<Vec<RecordedEvent>>>,
}

impl Recording {
    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.borrow().clone()
    }

    /// Returns the trigger kinds in arrival order.
    #[must_use]
    pub fn triggers(&self) -> Vec<TriggerKind> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::Trigger(t) => Some(t.kind),
                _ => None,
            })
            .collect()
    }

    /// Returns the refresh passes in order.
    #[must_use]
    pub fn passes(&self) -> Vec<RefreshPassEvent> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::RefreshPass(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// Removes and returns everything recorded so far.
    pub fn drain(&self) -> Vec<RecordedEvent> {
        core::mem::take(&mut *self.events.borrow_mut())
    }

    fn push(&self, event: RecordedEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// A [`TraceSink`] that appends every event to a [`Recording`].
#[derive(Debug, Default)]
pub struct RecorderSink {
    recording: Recording,
}

impl RecorderSink {
    /// Creates a recorder with an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the recording, valid after the sink is moved.
    #[must_use]
    pub fn recording(&self) -> Recording {
        self.recording.clone()
    }
}

impl TraceSink for RecorderSink {
    fn on_listeners_attached(&mut self, e: &ListenersAttachedEvent) {
        self.recording.push(RecordedEvent::ListenersAttached(*e));
    }

    fn on_listeners_detached(&mut self, e: &ListenersDetachedEvent) {
        self.recording.push(RecordedEvent::ListenersDetached(*e));
    }

    fn on_trigger(&mut self, e: &TriggerEvent) {
        self.recording.push(RecordedEvent::Trigger(*e));
    }

    fn on_refresh_pass(&mut self, e: &RefreshPassEvent) {
        self.recording.push(RecordedEvent::RefreshPass(*e));
    }

    fn on_continuous_mode(&mut self, e: &ContinuousModeEvent) {
        self.recording.push(RecordedEvent::ContinuousMode(*e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn handle_sees_events_after_sink_moves() {
        let sink = RecorderSink::new();
        let recording = sink.recording();
        let mut boxed: Box<dyn TraceSink> = Box::new(sink);

        boxed.on_trigger(&TriggerEvent {
            timestamp: Duration::from_millis(1),
            kind: TriggerKind::Resize,
        });
        boxed.on_refresh_pass(&RefreshPassEvent {
            pass_index: 0,
            started: Duration::from_millis(21),
            finished: Duration::from_millis(21),
            sessions: 1,
            changed: 0,
        });

        assert_eq!(recording.len(), 2);
        assert_eq!(recording.triggers(), [TriggerKind::Resize]);
        assert_eq!(recording.passes()[0].sessions, 1);
    }

    #[test]
    fn drain_empties_the_recording() {
        let mut sink = RecorderSink::new();
        let recording = sink.recording();
        sink.on_continuous_mode(&ContinuousModeEvent {
            timestamp: Duration::ZERO,
            enabled: true,
        });
        let drained = recording.drain();
        assert!(matches!(
            drained.as_slice(),
            [RecordedEvent::ContinuousMode(ContinuousModeEvent { enabled: true, .. })]
        ));
        assert!(recording.is_empty());
    }
}
