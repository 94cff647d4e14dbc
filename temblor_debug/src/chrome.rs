// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] writes [Chrome Trace Event Format][format] JSON for a list of
//! [`RecordedEvent`]s. Refresh passes become complete (`"X"`) slices and
//! everything else becomes an instant event.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};
use std::time::Duration;

use serde_json::{Value, json};

use crate::pretty::trigger_name;
use crate::recorder::RecordedEvent;

fn instant(name: &str, cat: &str, ts: Duration, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": cat,
        "ts": us(ts),
        "pid": 0,
        "tid": 0,
        "s": "g",
        "args": args,
    })
}

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array, suitable for loading into
/// `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/). Timestamps
/// are whole microseconds of host time.
pub fn export(recorded: &[RecordedEvent], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = recorded
        .iter()
        .map(|recorded| match recorded {
            RecordedEvent::ListenersAttached(e) => instant(
                "ListenersAttached",
                "Listeners",
                e.timestamp,
                json!({
                    "mutation_watcher": e.mutation_watcher,
                    "continuous": e.continuous,
                }),
            ),
            RecordedEvent::ListenersDetached(e) => {
                instant("ListenersDetached", "Listeners", e.timestamp, json!({}))
            }
            RecordedEvent::Trigger(e) => instant(
                trigger_name(e.kind),
                "Trigger",
                e.timestamp,
                json!({}),
            ),
            RecordedEvent::ContinuousMode(e) => instant(
                "ContinuousMode",
                "Controller",
                e.timestamp,
                json!({ "enabled": e.enabled }),
            ),
            RecordedEvent::RefreshPass(e) => json!({
                "ph": "X",
                "name": "RefreshPass",
                "cat": "Controller",
                "ts": us(e.started),
                "dur": us(e.finished.saturating_sub(e.started)),
                "pid": 0,
                "tid": 0,
                "args": {
                    "pass_index": e.pass_index,
                    "sessions": e.sessions,
                    "changed": e.changed,
                }
            }),
        })
        .collect();

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn us(t: Duration) -> u64 {
    u64::try_from(t.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use temblor_core::trace::{RefreshPassEvent, TraceSink, TriggerEvent, TriggerKind};

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        let recording = rec.recording();
        rec.on_trigger(&TriggerEvent {
            timestamp: Duration::from_millis(1),
            kind: TriggerKind::Mutation,
        });
        rec.on_refresh_pass(&RefreshPassEvent {
            pass_index: 0,
            started: Duration::from_millis(21),
            finished: Duration::from_micros(21_250),
            sessions: 3,
            changed: 1,
        });

        let mut out = Vec::new();
        export(&recording.events(), &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.len(), 2);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "mutation");
        assert_eq!(parsed[0]["ts"], 1000);

        assert_eq!(parsed[1]["ph"], "X");
        assert_eq!(parsed[1]["name"], "RefreshPass");
        assert_eq!(parsed[1]["ts"], 21_000);
        assert_eq!(parsed[1]["dur"], 250);
        assert_eq!(parsed[1]["args"]["changed"], 1);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert!(parsed.is_empty());
    }
}
