// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Update scheduling for polyfilled element resize observation.
//!
//! `temblor_core` decides *when* observed elements are re-measured. It has no
//! notion of elements or boxes itself: measurement and notification belong to
//! [`Session`](session::Session) implementations, and everything it needs
//! from the environment goes through the [`Host`](host::Host) trait. It is
//! `no_std` compatible (with `alloc`) and single-threaded by construction.
//!
//! # Architecture
//!
//! ```text
//!   Host signals (resize, mutation, transitionend)
//!       │
//!       ▼
//!   Controller::refresh() ──► Coalescer (rate limit, rAF) ──► refresh pass
//!                                   ▲                             │
//!                                   │                             ▼
//!                                   └── changed ◄── Session::gather/has/broadcast
//! ```
//!
//! **[`host`]**: The [`Host`](host::Host) and [`Timers`](host::Timers)
//! traits that environments implement, plus the RAII
//! [`Subscription`](host::Subscription) guard.
//!
//! **[`session`]**: The [`Session`](session::Session) trait the controller
//! drives on every pass.
//!
//! **[`coalesce`]**: [`Coalescer`](coalesce::Coalescer), a rate-limiting
//! proxy with explicit two-slot [`PendingCalls`](coalesce::PendingCalls)
//! bookkeeping.
//!
//! **[`controller`]**: [`Controller`](controller::Controller), which owns
//! sessions and listeners and runs the self-repeating refresh cycle.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! refresh-cycle instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer).
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod coalesce;
pub mod controller;
pub mod host;
pub mod session;
pub mod trace;
