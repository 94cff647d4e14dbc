// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observation sessions.

/// One consumer's set of observed elements.
///
/// The controller drives every connected session through the same triple on
/// each refresh pass:
///
/// ```rust,ignore
/// session.gather_active();
/// if session.has_active() {
///     session.broadcast_active();
/// }
/// ```
///
/// Methods take `&self`. Sessions keep their staged measurements behind
/// their own interior mutability and must release any borrows before handing
/// them to a subscriber in [`broadcast_active`](Self::broadcast_active), since
/// the subscriber may call straight back into the session or the controller.
pub trait Session {
    /// Re-measures every observed element and stages the ones whose geometry
    /// changed since the last broadcast.
    fn gather_active(&self);

    /// Returns `true` if the last [`gather_active`](Self::gather_active)
    /// staged anything.
    fn has_active(&self) -> bool;

    /// Delivers staged measurements to the subscriber and clears them.
    fn broadcast_active(&self);
}
