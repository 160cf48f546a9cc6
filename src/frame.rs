// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! The frame table: per-frame free/busy/in-use bookkeeping.

use crate::error::{PagerError, PagerResult};
use crate::mmu::Mmu;
use crate::process::{Pte, ProcessRegistry};
use crate::types::{Frame, Page, Pid};

/// A frame's current role in the replacement protocol. `Busy` is the exclusive-access state a
/// pager holds a frame in while it is mid-fault; no other thread may read or write its contents
/// or select it as a clock victim while it is `Busy`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FrameState {
    Free,
    Busy,
    InUse,
}

struct FrameRecord {
    state: FrameState,
    /// Which (pid, page) this frame currently backs, set when the frame transitions to `InUse`
    /// and cleared when it leaves that state. Plain id pair, not a pointer: lets the clock
    /// algorithm invalidate a victim's owning PTE without scanning every process's page table.
    owner: Option<(Pid, Page)>,
}

pub struct FrameTable {
    frames: Vec<FrameRecord>,
    pages: usize,
}

impl FrameTable {
    pub fn new(pages: usize, frame_count: usize) -> Self {
        let frames = (0..frame_count)
            .map(|_| FrameRecord { state: FrameState::Free, owner: None })
            .collect();
        FrameTable { frames, pages }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn free_count(&self) -> usize {
        self.frames.iter().filter(|f| f.state == FrameState::Free).count()
    }

    fn check_frame(&self, frame: Frame) -> PagerResult<()> {
        if frame.0 >= self.frames.len() {
            Err(PagerError::InvalidFrame)
        } else {
            Ok(())
        }
    }

    /// Take the first `Free` frame and mark it `Busy`, owned by nobody yet. The pager installs
    /// `owner` itself once it knows which (pid, page) the frame will back.
    pub fn allocate_busy(&mut self) -> Option<Frame> {
        let idx = self.frames.iter().position(|f| f.state == FrameState::Free)?;
        self.frames[idx].state = FrameState::Busy;
        Some(Frame(idx))
    }

    pub fn owner(&self, frame: Frame) -> PagerResult<Option<(Pid, Page)>> {
        self.check_frame(frame)?;
        Ok(self.frames[frame.0].owner)
    }

    /// Busy -> InUse, recording the frame's new owner. Called once the pager has installed the
    /// owning process's PTE.
    pub fn mark_in_use(&mut self, frame: Frame, owner: (Pid, Page)) -> PagerResult<()> {
        self.check_frame(frame)?;
        self.frames[frame.0].state = FrameState::InUse;
        self.frames[frame.0].owner = Some(owner);
        Ok(())
    }

    /// Busy -> Free, used when a fault fails after a frame was allocated for it (out of swap).
    pub fn release_busy(&mut self, frame: Frame) -> PagerResult<()> {
        self.check_frame(frame)?;
        self.frames[frame.0].state = FrameState::Free;
        self.frames[frame.0].owner = None;
        Ok(())
    }

    /// InUse -> Busy: the clock algorithm has chosen this frame as a victim and is about to
    /// evict it. Returns the evicted owner so the caller can write it back and invalidate its
    /// PTE.
    pub fn mark_victim_busy(&mut self, frame: Frame) -> PagerResult<(Pid, Page)> {
        self.check_frame(frame)?;
        let owner = self.frames[frame.0].owner.take().ok_or(PagerError::InvalidFrame)?;
        self.frames[frame.0].state = FrameState::Busy;
        Ok(owner)
    }

    pub fn state_in_use(&self, frame: Frame) -> PagerResult<bool> {
        self.check_frame(frame)?;
        Ok(self.frames[frame.0].state == FrameState::InUse)
    }

    pub fn each_in_use_frame(&self) -> impl Iterator<Item = Frame> + '_ {
        self.frames.iter().enumerate().filter_map(|(i, f)| {
            if f.state == FrameState::InUse {
                Some(Frame(i))
            } else {
                None
            }
        })
    }

    /// Release every frame belonging to `pid` and clear `incore` on the corresponding PTEs, so
    /// no stale page table entry is left pointing at a frame this table considers free.
    pub fn free_all(&mut self, pid: Pid, registry: &dyn ProcessRegistry) -> PagerResult<()> {
        let page_count = registry.page_count(pid)?;
        for record in self.frames.iter_mut() {
            if let Some((owner_pid, page)) = record.owner {
                if owner_pid == pid {
                    record.state = FrameState::Free;
                    record.owner = None;
                    if page.0 < page_count {
                        registry.set_pte(pid, page, Pte::unmapped())?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Map `frame`'s bytes into the calling thread's transient context and hand back the
    /// resulting virtual address, via the underlying MMU. `OutOfPages`/`InvalidFrame` bubble up
    /// from the MMU.
    pub fn map(&self, frame: Frame, mmu: &dyn Mmu) -> PagerResult<crate::mmu::VirtAddr> {
        self.check_frame(frame)?;
        mmu.map_transient(frame)
    }

    pub fn unmap(&self, frame: Frame, mmu: &dyn Mmu) -> PagerResult<()> {
        self.check_frame(frame)?;
        mmu.unmap_transient(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_free_cycle() {
        let mut table = FrameTable::new(16, 4);
        assert_eq!(table.free_count(), 4);
        let f = table.allocate_busy().unwrap();
        assert_eq!(table.free_count(), 3);
        table.mark_in_use(f, (Pid(1), Page(0))).unwrap();
        assert!(table.state_in_use(f).unwrap());
        let victim_owner = table.mark_victim_busy(f).unwrap();
        assert_eq!(victim_owner, (Pid(1), Page(0)));
        table.release_busy(f).unwrap();
        assert_eq!(table.free_count(), 4);
    }

    #[test]
    fn out_of_range_frame_is_rejected() {
        let table = FrameTable::new(16, 2);
        assert_eq!(table.owner(Frame(5)), Err(PagerError::InvalidFrame));
    }
}
