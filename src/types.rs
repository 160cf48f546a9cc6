// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

use core::fmt;

/// Maximum number of simultaneously outstanding faults, and the size of the fault queue's
/// backing circular buffer.
pub const MAX_PROC: usize = 64;

/// Upper bound on the pager pool's worker count. Kept well below any frame count the hosted
/// simulation is likely to configure, so that "all frames busy at once" cannot occur by
/// construction.
pub const K_MAX: usize = 16;

/// Process identifier. A plain `u32` newtype; unlike some process tables, PID 0 carries no
/// special reservation here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid{}", self.0)
    }
}

/// A page index within a process's virtual address space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Page(pub usize);

/// A physical frame index, 0..F-1.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Frame(pub usize);

/// Thread identifier within a process, used only to label which thread a fault originated on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Tid(pub u32);

/// Gate threaded through every privileged entry point. A single check at the top of each such
/// call, rather than scattered ad hoc checks, replaces the per-callsite privilege tests a
/// C-style implementation would otherwise repeat.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Privilege {
    Kernel,
    User,
}

impl Privilege {
    pub fn require_kernel(self) -> crate::error::PagerResult<()> {
        match self {
            Privilege::Kernel => Ok(()),
            Privilege::User => Err(crate::error::PagerError::PrivilegeViolation),
        }
    }
}

/// Disk geometry, queried once from `BlockDisk::geometry` at `SwapStore::init`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DiskGeometry {
    pub sector_size: usize,
    pub track_size: usize,
    pub track_count: usize,
}

impl DiskGeometry {
    pub fn total_sectors(&self) -> usize {
        self.track_size * self.track_count
    }
}

/// An on-disk (track, first-sector) address. Immutable once assigned to a slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DiskAddr {
    pub track: usize,
    pub first_sector: usize,
}

/// Reference/dirty bits for one frame, as read from the `Mmu` trait.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct AccessBits {
    pub referenced: bool,
    pub dirty: bool,
}

bitflags::bitflags! {
    /// Page permission bits installed into a PTE. The pager only ever installs `READ | WRITE` --
    /// finer-grained permission policy is out of scope for this subsystem.
    pub struct Permission: u8 {
        const READ  = 0b01;
        const WRITE = 0b10;
    }
}

/// Configuration captured once at subsystem construction.
#[derive(Debug, Copy, Clone)]
pub struct Config {
    pub pages: usize,
    pub frames: usize,
    pub pagers: usize,
}

impl Config {
    pub fn validate(&self) -> crate::error::PagerResult<()> {
        if self.pagers == 0 || self.pagers > K_MAX || (self.pagers > 1 && self.pagers >= self.frames) {
            // Pagers < frames is what makes "every frame busy at once" unreachable once more than
            // one pager can contend for frames concurrently; a single pager can never livelock
            // regardless of frame count, so K == 1 is always legal.
            return Err(crate::error::PagerError::InvalidNumPagers);
        }
        Ok(())
    }
}
