// Copyright 2026 the Temblor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Invocation timing records.

use alloc::vec::Vec;
use core::time::Duration;

/// Timestamps and arguments of successive invocations of a callback.
#[derive(Clone, Debug, Default)]
pub struct InvocationLog<A> {
    entries: Vec<(Duration, A)>,
}

impl<A> InvocationLog<A> {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Records one invocation.
    pub fn push(&mut self, at: Duration, args: A) {
        self.entries.push((at, args));
    }

    /// Returns the number of recorded invocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the invocation times, oldest first.
    pub fn times(&self) -> impl Iterator<Item = Duration> + '_ {
        self.entries.iter().map(|(t, _)| *t)
    }

    /// Returns the arguments of the most recent invocation.
    #[must_use]
    pub fn last_args(&self) -> Option<&A> {
        self.entries.last().map(|(_, a)| a)
    }

    /// Returns the smallest gap between consecutive invocations, or `None`
    /// with fewer than two invocations.
    #[must_use]
    pub fn min_spacing(&self) -> Option<Duration> {
        self.entries
            .windows(2)
            .map(|w| w[1].0.saturating_sub(w[0].0))
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_spacing_over_gaps() {
        let mut log = InvocationLog::new();
        assert_eq!(log.min_spacing(), None);
        log.push(Duration::from_millis(0), 'a');
        log.push(Duration::from_millis(25), 'b');
        log.push(Duration::from_millis(45), 'c');
        assert_eq!(log.min_spacing(), Some(Duration::from_millis(20)));
        assert_eq!(log.last_args(), Some(&'c'));
        assert_eq!(log.len(), 3);
    }
}
