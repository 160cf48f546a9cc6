// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! The swap device contract. A real platform backs this with a flash or disk partition;
//! `hosted::RamDisk` backs it with an in-memory byte array, which is enough to exercise every
//! swap-store code path without touching the filesystem.

use crate::error::PagerResult;
use crate::types::{DiskAddr, DiskGeometry};

pub trait BlockDisk: Send + Sync {
    /// Queried once at swap-store startup and assumed fixed thereafter.
    fn geometry(&self) -> DiskGeometry;

    /// Read exactly one page's worth of bytes starting at `addr`. `buf.len()` must be a whole
    /// number of sectors; the swap store always calls this with a page-sized buffer.
    fn read(&self, addr: DiskAddr, buf: &mut [u8]) -> PagerResult<()>;

    /// Write exactly one page's worth of bytes starting at `addr`.
    fn write(&self, addr: DiskAddr, buf: &[u8]) -> PagerResult<()>;
}
