// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! The fault queue: a bounded FIFO of outstanding faults, each carrying its own wake semaphore
//! and result slot. Guarded by its own lock, kept separate from the replacement lock so fault
//! admission never blocks behind a swap-disk read or write.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::FaultOutcome;
use crate::mmu::FaultCause;
use crate::sync::Semaphore;
use crate::types::{MAX_PROC, Page, Pid};

/// One in-flight fault. `wait` is acquired by the dispatcher and released by the pager that
/// services it; `result` is written by the pager before that release and read by the dispatcher
/// immediately after.
pub struct Fault {
    pub pid: Pid,
    pub page: Page,
    pub cause: FaultCause,
    pub wait: Arc<dyn Semaphore>,
    pub result: std::sync::Mutex<Option<FaultOutcome>>,
}

impl Fault {
    pub fn new(pid: Pid, page: Page, cause: FaultCause, wait: Arc<dyn Semaphore>) -> Arc<Self> {
        Arc::new(Fault { pid, page, cause, wait, result: std::sync::Mutex::new(None) })
    }

    pub fn set_result(&self, outcome: FaultOutcome) {
        *self.result.lock().unwrap() = Some(outcome);
    }

    pub fn take_result(&self) -> Option<FaultOutcome> {
        self.result.lock().unwrap().take()
    }
}

/// A bounded circular buffer, capacity `MAX_PROC`, of outstanding faults. Backed by a `VecDeque`
/// rather than the source's hand-rolled front/rear indices -- the capacity bound is still
/// enforced explicitly on `push`, matching the source's fixed-size array semantics.
pub struct FaultQueue {
    queue: VecDeque<Arc<Fault>>,
}

impl FaultQueue {
    pub fn new() -> Self {
        FaultQueue { queue: VecDeque::with_capacity(MAX_PROC) }
    }

    /// Enqueue a fault. Panics if the queue is already at `MAX_PROC` capacity: that bound is a
    /// hard configuration invariant (at most one outstanding fault per process, and there are
    /// never more than `MAX_PROC` processes), not a runtime condition callers are expected to
    /// recover from.
    pub fn push(&mut self, fault: Arc<Fault>) {
        assert!(self.queue.len() < MAX_PROC, "fault queue exceeded MAX_PROC outstanding faults");
        self.queue.push_back(fault);
    }

    pub fn pop(&mut self) -> Option<Arc<Fault>> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for FaultQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosted::sync::CountingSemaphore;

    #[test]
    fn fifo_order_is_preserved() {
        let mut q = FaultQueue::new();
        let a = Fault::new(Pid(1), Page(0), FaultCause::PageNotPresent, Arc::new(CountingSemaphore::new(0)));
        let b = Fault::new(Pid(2), Page(0), FaultCause::PageNotPresent, Arc::new(CountingSemaphore::new(0)));
        q.push(a.clone());
        q.push(b.clone());
        assert_eq!(q.pop().unwrap().pid, Pid(1));
        assert_eq!(q.pop().unwrap().pid, Pid(2));
        assert!(q.is_empty());
    }

    #[test]
    fn result_round_trips_through_the_mutex_slot() {
        let fault = Fault::new(Pid(1), Page(3), FaultCause::PageNotPresent, Arc::new(CountingSemaphore::new(0)));
        assert!(fault.take_result().is_none());
        fault.set_result(FaultOutcome::Resolved);
        assert_eq!(fault.take_result(), Some(FaultOutcome::Resolved));
        assert!(fault.take_result().is_none());
    }
}
