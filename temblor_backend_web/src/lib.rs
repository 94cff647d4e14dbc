// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web host for temblor.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`WebHost`]: [`Host`] implementation on `setTimeout`,
//!   `requestAnimationFrame`, window/document event listeners and
//!   `MutationObserver`
//! - [`controller`]: a [`Controller`] wired to a fresh [`WebHost`]
//!
//! # Crate features
//!
//! - `tracing` (disabled by default): Logs listener attach/detach at debug
//!   level and failed JavaScript calls at warn level.

#![no_std]

extern crate alloc;

mod host;

pub use host::{FRAME_FALLBACK_DELAY, WebHost};
pub use temblor_core::host::Host;

use alloc::rc::Rc;

use temblor_core::controller::{Controller, ControllerConfig};

/// Creates a [`Controller`] running on the current JavaScript global.
///
/// Call once per page and share the returned handle; every clone drives the
/// same sessions and listeners.
#[must_use]
pub fn controller(config: ControllerConfig) -> Controller {
    let host: Rc<dyn Host> = Rc::new(WebHost::new());
    Controller::new(host, config)
}
