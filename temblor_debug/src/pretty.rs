// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in milliseconds.

use std::io::Write;
use std::time::Duration;

use temblor_core::trace::{
    ContinuousModeEvent, ListenersAttachedEvent, ListenersDetachedEvent, RefreshPassEvent,
    TraceSink, TriggerEvent, TriggerKind,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the writer.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn ms(t: Duration) -> f64 {
    t.as_secs_f64() * 1000.0
}

pub(crate) fn trigger_name(kind: TriggerKind) -> &'static str {
    match kind {
        TriggerKind::Resize => "resize",
        TriggerKind::Mutation => "mutation",
        TriggerKind::TransitionEnd => "transitionend",
        TriggerKind::Connect => "connect",
        TriggerKind::ContinuousMode => "continuous",
        TriggerKind::Rerun => "rerun",
        TriggerKind::Idle => "idle",
        TriggerKind::Manual => "manual",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_listeners_attached(&mut self, e: &ListenersAttachedEvent) {
        let _ = writeln!(
            self.writer,
            "[attach] at {:.1}ms mutation_watcher={} continuous={}",
            ms(e.timestamp),
            e.mutation_watcher,
            e.continuous,
        );
    }

    fn on_listeners_detached(&mut self, e: &ListenersDetachedEvent) {
        let _ = writeln!(self.writer, "[detach] at {:.1}ms", ms(e.timestamp));
    }

    fn on_trigger(&mut self, e: &TriggerEvent) {
        let _ = writeln!(
            self.writer,
            "[trigger] {} at {:.1}ms",
            trigger_name(e.kind),
            ms(e.timestamp),
        );
    }

    fn on_refresh_pass(&mut self, e: &RefreshPassEvent) {
        let _ = writeln!(
            self.writer,
            "[pass] #{} at {:.1}ms took {:.3}ms sessions={} changed={}",
            e.pass_index,
            ms(e.started),
            ms(e.finished.saturating_sub(e.started)),
            e.sessions,
            e.changed,
        );
    }

    fn on_continuous_mode(&mut self, e: &ContinuousModeEvent) {
        let state = if e.enabled { "on" } else { "off" };
        let _ = writeln!(
            self.writer,
            "[continuous] {state} at {:.1}ms",
            ms(e.timestamp),
        );
    }
}
