// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! The replacement engine: clock-algorithm victim selection over the frame table, and the
//! write-back/invalidate sequence that turns an `InUse` frame back into a free one.
//!
//! Frame table, swap store, and clock hand share one lock (held by the caller, `Replacement` is
//! not internally synchronized) because a victim decision, its write-back, and its owner's PTE
//! invalidation must all be visible to the next pager as a single atomic step.

use crate::disk::BlockDisk;
use crate::error::{PagerError, PagerResult};
use crate::frame::FrameTable;
use crate::mmu::Mmu;
use crate::process::{Pte, ProcessRegistry};
use crate::swap::SwapStore;
use crate::types::{Frame, Page, Pid};

pub struct Replacement {
    pub frames: FrameTable,
    pub swap: SwapStore,
    hand: usize,
}

impl Replacement {
    pub fn new(frames: FrameTable, swap: SwapStore) -> Self {
        Replacement { frames, swap, hand: 0 }
    }

    /// Find a free frame, or evict one via the clock algorithm if none is free. Returns the
    /// frame in `Busy` state, ready for the caller to install a new owner into.
    pub fn acquire_frame(
        &mut self,
        mmu: &dyn Mmu,
        disk: &dyn BlockDisk,
        registry: &dyn ProcessRegistry,
    ) -> PagerResult<Frame> {
        if let Some(frame) = self.frames.allocate_busy() {
            return Ok(frame);
        }
        self.evict(mmu, disk, registry)
    }

    /// The clock sweep. Bounded by two full passes over the frame table: every `InUse` frame's
    /// reference bit is cleared on the first sweep at the latest, so the second sweep always
    /// finds a victim.
    fn evict(
        &mut self,
        mmu: &dyn Mmu,
        disk: &dyn BlockDisk,
        registry: &dyn ProcessRegistry,
    ) -> PagerResult<Frame> {
        let frame_count = self.frames.frame_count();
        let victim = {
            let mut victim = None;
            for _ in 0..(2 * frame_count.max(1)) {
                self.hand = (self.hand + 1) % frame_count;
                let candidate = Frame(self.hand);
                if !self.frames.state_in_use(candidate)? {
                    continue;
                }
                let access = mmu.get_access(candidate);
                if access.referenced {
                    mmu.clear_reference(candidate);
                } else {
                    victim = Some(candidate);
                    break;
                }
            }
            victim.ok_or(PagerError::OutOfPages)?
        };

        let owner = self.frames.mark_victim_busy(victim)?;
        if mmu.get_access(victim).dirty {
            if let Err(e) = self.swap.write_back(owner, victim, mmu, disk) {
                // Put the frame back exactly as it was: a failed write-back must not leave a
                // frame that still backs a resident PTE sitting outside `InUse`.
                self.frames.mark_in_use(victim, owner)?;
                return Err(e);
            }
            mmu.clear_dirty(victim);
        }
        invalidate_owner(registry, owner)?;
        mmu.commit_page_table(owner.0);
        Ok(victim)
    }
}

fn invalidate_owner(registry: &dyn ProcessRegistry, owner: (Pid, Page)) -> PagerResult<()> {
    registry.set_pte(owner.0, owner.1, Pte::unmapped())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosted::disk::RamDisk;
    use crate::hosted::mmu::SimMmu;
    use crate::hosted::process::ThreadRegistry;
    use crate::types::Config;

    #[test]
    fn acquire_frame_uses_free_frames_before_evicting() {
        let config = Config { pages: 4, frames: 2, pagers: 1 };
        let disk = RamDisk::new(512, 8, 8);
        let mmu = SimMmu::new(2);
        let registry = ThreadRegistry::new(config.pages);
        registry.register(Pid(1));

        let frames = FrameTable::new(config.pages, config.frames);
        let swap = SwapStore::new(&disk).unwrap();
        let mut replacement = Replacement::new(frames, swap);

        let f0 = replacement.acquire_frame(&mmu, &disk, &registry).unwrap();
        let f1 = replacement.acquire_frame(&mmu, &disk, &registry).unwrap();
        assert_ne!(f0, f1);
        assert_eq!(replacement.frames.free_count(), 0);
    }
}
