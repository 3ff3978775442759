// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fixed-capacity breadcrumb recorder.
//!
//! Keeps the most recent `capacity` breadcrumbs in insertion order. Older
//! entries are evicted from the front once the buffer is full.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use crate::types::{Breadcrumb, BreadcrumbInput};

/// Sliding window of recent user and navigation actions.
#[derive(Debug)]
pub struct BreadcrumbRecorder {
    entries: RwLock<VecDeque<Breadcrumb>>,
    capacity: usize,
    enabled: bool,
}

impl BreadcrumbRecorder {
    /// Create an enabled recorder.
    pub fn new(capacity: usize) -> Self {
        Self::with_enabled(capacity, true)
    }

    /// Create a recorder that is a no-op when `enabled` is false.
    pub fn with_enabled(capacity: usize, enabled: bool) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            enabled,
        }
    }

    /// Stamp and append a breadcrumb, evicting the oldest entries beyond
    /// capacity.
    pub fn record(&self, input: BreadcrumbInput) {
        if !self.enabled {
            return;
        }

        let crumb = Breadcrumb::stamp(input);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push_back(crumb);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Owned copy of the buffer, oldest first.
    pub fn snapshot(&self) -> Vec<Breadcrumb> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
