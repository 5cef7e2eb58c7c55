//! Deferred device bring-up.
//!
//! Connection-status notifications arrive on the inbound event path, which
//! must never block, so initialization is queued as a work item and executed
//! later — by the optional background worker or by whoever drains the queue.
//! The cross-driver device lock is only probed: a busy probe re-queues the
//! item up to the retry budget, after which the machine stands down until the
//! next connection notification. There is deliberately no terminal gave-up
//! state (see DESIGN.md).

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

/// Bring-up progress of one device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// Not initialized; nothing scheduled or in flight.
    Uninitialized,
    /// Last busy probe number `n`; the init work item is queued again.
    AwaitingRetry(u8),
    /// Device-specific init completed.
    Initialized,
}

/// Items on the deferred-work queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkItem {
    Init,
}

struct InitInner {
    state: InitState,
    retry: u8,
    queue: VecDeque<WorkItem>,
    shutdown: bool,
}

/// Synchronized init state plus the bounded deferred-work queue.
///
/// Policy (what to do on a busy probe or an init result) lives in the
/// session; this type only guards the transitions. Its lock is distinct from
/// the transaction slot and held for short critical sections only.
pub(crate) struct InitMachine {
    inner: Mutex<InitInner>,
    work_cond: Condvar,
}

impl InitMachine {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(InitInner {
                state: InitState::Uninitialized,
                retry: 0,
                queue: VecDeque::new(),
                shutdown: false,
            }),
            work_cond: Condvar::new(),
        }
    }

    pub(crate) fn state(&self) -> InitState {
        self.inner.lock().state
    }

    /// Coalesced enqueue of an init work item.
    ///
    /// Returns `false` when the item was dropped: already initialized, an
    /// init item already queued, or the queue at capacity.
    pub(crate) fn schedule(&self, capacity: usize) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == InitState::Initialized {
            return false;
        }
        if inner.queue.contains(&WorkItem::Init) {
            debug!("init work item already queued, not scheduling again");
            return false;
        }
        if inner.queue.len() >= capacity {
            warn!(capacity, "deferred-work queue full, dropping init request");
            return false;
        }
        inner.queue.push_back(WorkItem::Init);
        drop(inner);
        self.work_cond.notify_one();
        true
    }

    /// Take the next work item without blocking.
    pub(crate) fn pop(&self) -> Option<WorkItem> {
        self.inner.lock().queue.pop_front()
    }

    /// Block until a work item is queued; `None` once shut down.
    pub(crate) fn wait_pop(&self) -> Option<WorkItem> {
        let mut inner = self.inner.lock();
        loop {
            if inner.shutdown {
                return None;
            }
            if let Some(item) = inner.queue.pop_front() {
                return Some(item);
            }
            self.work_cond.wait(&mut inner);
        }
    }

    /// Cancel pending work and wake the worker so it can exit.
    pub(crate) fn shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shutdown = true;
        inner.queue.clear();
        drop(inner);
        self.work_cond.notify_all();
    }

    /// Account for a busy probe. Returns `true` when the caller should
    /// re-queue the work item; `false` when the budget is exhausted — the
    /// counter then resets to zero and the machine stands down until the next
    /// connection notification.
    pub(crate) fn note_lock_busy(&self, max_retries: u8) -> bool {
        let mut inner = self.inner.lock();
        if inner.retry < max_retries {
            inner.retry += 1;
            inner.state = InitState::AwaitingRetry(inner.retry);
            true
        } else {
            inner.retry = 0;
            inner.state = InitState::Uninitialized;
            false
        }
    }

    /// Record the outcome of the device-specific init routine.
    pub(crate) fn note_init_result(&self, ok: bool) {
        let mut inner = self.inner.lock();
        inner.state = if ok {
            inner.retry = 0;
            InitState::Initialized
        } else {
            InitState::Uninitialized
        };
    }
}
