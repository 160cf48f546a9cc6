// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! An in-process stand-in for page-table and access-bit hardware, backed by plain `Vec<u8>`
//! frame buffers and a small pool of transient mapping slots.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{PagerError, PagerResult};
use crate::mmu::{FaultCause, Mmu, VirtAddr};
use crate::swap::PAGE_SIZE;
use crate::types::{AccessBits, Frame, Pid, Tid};

const MAX_TRANSIENT_SLOTS: usize = 64;

struct State {
    pages: Vec<Vec<u8>>,
    access: Vec<AccessBits>,
    /// slot index -> frame currently mapped there.
    transient: HashMap<usize, Frame>,
    pending_cause: HashMap<Pid, FaultCause>,
}

/// A simulated MMU over `frame_count` physical frames. Tests drive it directly through
/// [`SimMmu::touch`] and [`SimMmu::set_cause`] to stand in for real process memory accesses and
/// real trap causes.
pub struct SimMmu {
    state: Mutex<State>,
}

impl SimMmu {
    pub fn new(frame_count: usize) -> Self {
        SimMmu {
            state: Mutex::new(State {
                pages: vec![vec![0u8; PAGE_SIZE]; frame_count],
                access: vec![AccessBits::default(); frame_count],
                transient: HashMap::new(),
                pending_cause: HashMap::new(),
            }),
        }
    }

    /// Simulate the owning process touching `frame`: sets the reference bit, and the dirty bit
    /// too if `write` is true. Real hardware does this on every load/store; here a test calls it
    /// explicitly to model a process having read or written a page between faults.
    pub fn touch(&self, frame: Frame, write: bool) {
        let mut state = self.state.lock().unwrap();
        let bits = &mut state.access[frame.0];
        bits.referenced = true;
        bits.dirty |= write;
    }

    /// Make the next `cause()` query for `pid` return `cause`, instead of the default
    /// `PageNotPresent`. Used by tests that exercise the access-violation path.
    pub fn set_cause(&self, pid: Pid, cause: FaultCause) {
        self.state.lock().unwrap().pending_cause.insert(pid, cause);
    }
}

impl Mmu for SimMmu {
    fn page_size(&self) -> usize {
        PAGE_SIZE
    }

    fn cause(&self, pid: Pid, _tid: Tid) -> FaultCause {
        self.state
            .lock()
            .unwrap()
            .pending_cause
            .remove(&pid)
            .unwrap_or(FaultCause::PageNotPresent)
    }

    fn get_access(&self, frame: Frame) -> AccessBits {
        self.state.lock().unwrap().access[frame.0]
    }

    fn clear_reference(&self, frame: Frame) {
        self.state.lock().unwrap().access[frame.0].referenced = false;
    }

    fn clear_dirty(&self, frame: Frame) {
        self.state.lock().unwrap().access[frame.0].dirty = false;
    }

    fn commit_page_table(&self, _pid: Pid) {}

    fn map_transient(&self, frame: Frame) -> PagerResult<VirtAddr> {
        let mut state = self.state.lock().unwrap();
        if frame.0 >= state.pages.len() {
            return Err(PagerError::InvalidFrame);
        }
        for slot in 0..MAX_TRANSIENT_SLOTS {
            if !state.transient.contains_key(&slot) {
                state.transient.insert(slot, frame);
                return Ok(VirtAddr(slot));
            }
        }
        Err(PagerError::OutOfPages)
    }

    fn unmap_transient(&self, frame: Frame) -> PagerResult<()> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .transient
            .iter()
            .find(|(_, mapped)| **mapped == frame)
            .map(|(slot, _)| *slot)
            .ok_or(PagerError::FrameNotMapped)?;
        state.transient.remove(&slot);
        Ok(())
    }

    fn copy_out(&self, addr: VirtAddr, buf: &mut [u8]) {
        let state = self.state.lock().unwrap();
        let frame = state.transient[&addr.0];
        buf.copy_from_slice(&state.pages[frame.0][..buf.len()]);
    }

    fn copy_in(&self, addr: VirtAddr, buf: &[u8]) {
        let mut state = self.state.lock().unwrap();
        let frame = state.transient[&addr.0];
        state.pages[frame.0][..buf.len()].copy_from_slice(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_copy_unmap_round_trips_bytes() {
        let mmu = SimMmu::new(2);
        let addr = mmu.map_transient(Frame(0)).unwrap();
        mmu.copy_in(addr, &[1, 2, 3]);
        let mut out = [0u8; 3];
        mmu.copy_out(addr, &mut out);
        assert_eq!(out, [1, 2, 3]);
        mmu.unmap_transient(Frame(0)).unwrap();
        assert_eq!(mmu.unmap_transient(Frame(0)), Err(PagerError::FrameNotMapped));
    }

    #[test]
    fn touch_sets_reference_and_dirty() {
        let mmu = SimMmu::new(1);
        assert_eq!(mmu.get_access(Frame(0)), AccessBits::default());
        mmu.touch(Frame(0), true);
        let bits = mmu.get_access(Frame(0));
        assert!(bits.referenced && bits.dirty);
        mmu.clear_reference(Frame(0));
        assert!(!mmu.get_access(Frame(0)).referenced);
    }
}
