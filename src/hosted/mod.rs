// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! The in-process implementation of every external-collaborator trait, enough to run the whole
//! subsystem under `cargo test` or `pager-demo` without any real hardware.

pub mod disk;
pub mod mmu;
pub mod process;
pub mod sync;

pub use disk::RamDisk;
pub use mmu::SimMmu;
pub use process::ThreadRegistry;
pub use sync::{CountingSemaphore, DefaultSemaphoreFactory};
