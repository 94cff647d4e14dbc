// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic test tooling for temblor schedulers.
//!
//! - [`VirtualHost`]: a [`Host`](temblor_core::host::Host) on a virtual
//!   clock, with listener bookkeeping and signal injection.
//! - [`ScriptedSession`]: a [`Session`](temblor_core::session::Session) that
//!   plays back scripted change answers and counts calls.
//! - [`InvocationLog`]: invocation timestamps for spacing checks.

#![no_std]

extern crate alloc;

mod host;
mod session;
mod spacing;

pub use host::{FRAME_INTERVAL, ListenerCounts, TaskKind, VirtualHost};
pub use session::{CallLog, ScriptedSession, SessionOp, call_log};
pub use spacing::InvocationLog;
