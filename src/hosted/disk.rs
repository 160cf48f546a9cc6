// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! An in-memory block disk, standing in for the real swap partition a platform would mount. One
//! flat byte buffer sized by the requested geometry; reads and writes are plain slice copies
//! under a single lock.

use std::sync::Mutex;

use crate::disk::BlockDisk;
use crate::error::{PagerError, PagerResult};
use crate::types::{DiskAddr, DiskGeometry};

pub struct RamDisk {
    geometry: DiskGeometry,
    bytes: Mutex<Vec<u8>>,
}

impl RamDisk {
    pub fn new(sector_size: usize, track_size: usize, track_count: usize) -> Self {
        let geometry = DiskGeometry { sector_size, track_size, track_count };
        let total_bytes = geometry.total_sectors() * sector_size;
        RamDisk { geometry, bytes: Mutex::new(vec![0u8; total_bytes]) }
    }

    fn byte_offset(&self, addr: DiskAddr) -> usize {
        let sector = addr.track * self.geometry.track_size + addr.first_sector;
        sector * self.geometry.sector_size
    }
}

impl BlockDisk for RamDisk {
    fn geometry(&self) -> DiskGeometry {
        self.geometry
    }

    fn read(&self, addr: DiskAddr, buf: &mut [u8]) -> PagerResult<()> {
        let offset = self.byte_offset(addr);
        let bytes = self.bytes.lock().unwrap();
        let end = offset.checked_add(buf.len()).ok_or(PagerError::InvalidFrame)?;
        if end > bytes.len() {
            return Err(PagerError::InvalidFrame);
        }
        buf.copy_from_slice(&bytes[offset..end]);
        Ok(())
    }

    fn write(&self, addr: DiskAddr, buf: &[u8]) -> PagerResult<()> {
        let offset = self.byte_offset(addr);
        let mut bytes = self.bytes.lock().unwrap();
        let end = offset.checked_add(buf.len()).ok_or(PagerError::InvalidFrame)?;
        if end > bytes.len() {
            return Err(PagerError::InvalidFrame);
        }
        bytes[offset..end].copy_from_slice(buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let disk = RamDisk::new(512, 4, 4);
        let addr = DiskAddr { track: 1, first_sector: 2 };
        let data = vec![7u8; 512];
        disk.write(addr, &data).unwrap();
        let mut out = vec![0u8; 512];
        disk.read(addr, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn out_of_range_access_is_rejected() {
        let disk = RamDisk::new(512, 2, 2);
        let addr = DiskAddr { track: 10, first_sector: 0 };
        let mut out = vec![0u8; 512];
        assert_eq!(disk.read(addr, &mut out), Err(PagerError::InvalidFrame));
    }
}
