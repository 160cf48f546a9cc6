// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! The swap store: per-page-slot ownership on a raw block disk, and the page-sized reads/writes
//! that move bytes between a slot and a transiently-mapped frame.

use crate::disk::BlockDisk;
use crate::error::{PagerError, PagerResult};
use crate::mmu::Mmu;
use crate::process::ProcessRegistry;
use crate::types::{DiskAddr, Frame, Page, Pid};

pub const PAGE_SIZE: usize = 4096;

/// What happened on a `swap_in` call. `EmptyPage` is deliberately not a `PagerError`: it is the
/// expected outcome the first time a process touches a page, not a failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SwapInOutcome {
    Success,
    EmptyPage,
}

struct Slot {
    owner: Option<(Pid, Page)>,
    disk_addr: DiskAddr,
}

pub struct SwapStore {
    slots: Vec<Slot>,
    sectors_per_page: usize,
}

impl SwapStore {
    pub fn new(disk: &dyn BlockDisk) -> PagerResult<Self> {
        let geometry = disk.geometry();
        if geometry.sector_size == 0 {
            return Err(PagerError::OutOfSwap);
        }
        let sectors_per_page = PAGE_SIZE / geometry.sector_size;
        let total_slots = geometry.total_sectors() / sectors_per_page;
        let mut slots = Vec::with_capacity(total_slots);
        for i in 0..total_slots {
            let sector = i * sectors_per_page;
            slots.push(Slot {
                owner: None,
                disk_addr: DiskAddr {
                    track: sector / geometry.track_size,
                    first_sector: sector % geometry.track_size,
                },
            });
        }
        Ok(SwapStore { slots, sectors_per_page })
    }

    pub fn free_slot_count(&self) -> usize {
        self.slots.iter().filter(|s| s.owner.is_none()).count()
    }

    /// Clear ownership of every slot owned by `pid`, without touching its on-disk contents --
    /// the bytes are simply abandoned until the slot is reassigned.
    pub fn free_all(&mut self, pid: Pid) {
        for slot in self.slots.iter_mut() {
            if matches!(slot.owner, Some((owner, _)) if owner == pid) {
                slot.owner = None;
            }
        }
    }

    fn find_owned(&self, pid: Pid, page: Page) -> Option<usize> {
        self.slots.iter().position(|s| s.owner == Some((pid, page)))
    }

    fn allocate(&mut self, pid: Pid, page: Page) -> Option<usize> {
        let idx = self.slots.iter().position(|s| s.owner.is_none())?;
        self.slots[idx].owner = Some((pid, page));
        Some(idx)
    }

    pub fn owning_slot_addr(&self, pid: Pid, page: Page) -> Option<DiskAddr> {
        self.find_owned(pid, page).map(|idx| self.slots[idx].disk_addr)
    }

    /// Bring `page` of `pid` into `frame`. If `pid`/`page` already owns a slot, its on-disk
    /// bytes are read into the frame through a transient mapping; otherwise a slot is allocated
    /// for it right away (so a later eviction always has somewhere to write back to, even if the
    /// page is never dirtied before that eviction) and the caller is told to zero-fill.
    ///
    /// Validates `pid`/`page`/`frame` up front and returns immediately with no state change on
    /// the first failure: `InvalidPid` if `pid` has no page table, `OutOfPages` if `page` is
    /// outside it, `InvalidFrame` if `frame` is outside the frame table.
    pub fn swap_in(
        &mut self,
        pid: Pid,
        page: Page,
        frame: Frame,
        mmu: &dyn Mmu,
        disk: &dyn BlockDisk,
        registry: &dyn ProcessRegistry,
        frame_count: usize,
    ) -> PagerResult<SwapInOutcome> {
        let page_count = registry.page_count(pid)?;
        if page.0 >= page_count {
            return Err(PagerError::OutOfPages);
        }
        if frame.0 >= frame_count {
            return Err(PagerError::InvalidFrame);
        }

        match self.find_owned(pid, page) {
            Some(idx) => {
                let addr = self.slots[idx].disk_addr;
                let mut buf = vec![0u8; PAGE_SIZE];
                disk.read(addr, &mut buf)?;
                let vaddr = mmu.map_transient(frame)?;
                mmu.copy_in(vaddr, &buf);
                mmu.unmap_transient(frame)?;
                Ok(SwapInOutcome::Success)
            }
            None => {
                self.allocate(pid, page).ok_or(PagerError::OutOfSwap)?;
                Ok(SwapInOutcome::EmptyPage)
            }
        }
    }

    /// Write `frame`'s bytes out to the slot owned by `owner`. Called by the replacement engine
    /// only for a dirty victim, whose owner always already holds a slot -- `swap_in` allocates
    /// one on first touch, long before that page can become a clock victim.
    pub fn write_back(
        &mut self,
        owner: (Pid, Page),
        frame: Frame,
        mmu: &dyn Mmu,
        disk: &dyn BlockDisk,
    ) -> PagerResult<()> {
        let idx = self
            .find_owned(owner.0, owner.1)
            .expect("a dirty victim's owner must already hold a slot from its swap_in");
        let addr = self.slots[idx].disk_addr;
        let vaddr = mmu.map_transient(frame)?;
        let mut buf = vec![0u8; PAGE_SIZE];
        mmu.copy_out(vaddr, &mut buf);
        mmu.unmap_transient(frame)?;
        disk.write(addr, &buf)
    }

    pub fn sectors_per_page(&self) -> usize {
        self.sectors_per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosted::disk::RamDisk;

    fn small_disk() -> RamDisk {
        RamDisk::new(512, 8, 8)
    }

    #[test]
    fn fresh_slots_are_all_free() {
        let disk = small_disk();
        let store = SwapStore::new(&disk).unwrap();
        assert_eq!(store.free_slot_count(), store.slots.len());
    }

    #[test]
    fn free_all_clears_only_the_given_owner() {
        let disk = small_disk();
        let mut store = SwapStore::new(&disk).unwrap();
        let idx = store.allocate(Pid(1), Page(0)).unwrap();
        store.allocate(Pid(2), Page(0)).unwrap();
        store.free_all(Pid(1));
        assert!(store.slots[idx].owner.is_none());
        assert_eq!(store.free_slot_count(), store.slots.len() - 1);
    }
}
