// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Durable multicast event log.
//!
//! A [`ReplayLog`] records every pushed item and an explicit completion marker. Readers
//! obtain a [`ReplayCursor`] which starts at the first item ever pushed, so a subscriber
//! that arrives after delivery still sees the whole history.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

struct ReplayState<T> {
    items: Vec<T>,
    completed: bool,
}

pub struct ReplayLog<T> {
    state: Mutex<ReplayState<T>>,
    notify: Notify,
}

impl<T: Clone> ReplayLog<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReplayState {
                items: Vec::new(),
                completed: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Appends an item. Returns `false` (and drops the item) once the log is completed.
    pub fn push(&self, item: T) -> bool {
        {
            let mut state = self.lock();
            if state.completed {
                return false;
            }
            state.items.push(item);
        }
        self.notify.notify_waiters();
        true
    }

    /// Appends an item only into an empty, open log. Returns `false` when an item is
    /// already present or the log is completed.
    pub fn push_once(&self, item: T) -> bool {
        {
            let mut state = self.lock();
            if state.completed || !state.items.is_empty() {
                return false;
            }
            state.items.push(item);
        }
        self.notify.notify_waiters();
        true
    }

    pub fn complete(&self) {
        self.lock().completed = true;
        self.notify.notify_waiters();
    }

    pub fn is_completed(&self) -> bool {
        self.lock().completed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    /// Most recent item matching `predicate`.
    pub fn last_matching(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.lock().items.iter().rev().find(|item| predicate(item)).cloned()
    }

    pub fn cursor(self: &Arc<Self>) -> ReplayCursor<T> {
        ReplayCursor {
            log: Arc::clone(self),
            position: 0,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReplayState<T>> {
        // Every mutation is a single push or flag write, so a poisoned state is still valid.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Clone> Default for ReplayLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Independent reader over a [`ReplayLog`].
pub struct ReplayCursor<T> {
    log: Arc<ReplayLog<T>>,
    position: usize,
}

impl<T: Clone> ReplayCursor<T> {
    /// Next item, waiting for one if needed. `None` once the log is completed and drained.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            // The Notified future registers on creation, so it is built under the lock to
            // avoid missing a push that happens between the check and the await.
            let notified = {
                let state = self.log.lock();
                if let Some(item) = state.items.get(self.position) {
                    self.position += 1;
                    return Some(item.clone());
                }
                if state.completed {
                    return None;
                }
                self.log.notify.notified()
            };
            notified.await;
        }
    }
}
