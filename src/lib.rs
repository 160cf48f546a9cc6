// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! Demand-paged virtual memory: a frame table, a swap store, a clock-algorithm replacement
//! engine, a bounded fault queue, a pool of pager worker threads, and the fault dispatcher that
//! ties them together.
//!
//! The hardware and OS primitives this subsystem depends on -- an MMU, a block disk, a process
//! table, counting semaphores -- are consumed as traits ([`mmu::Mmu`], [`disk::BlockDisk`],
//! [`process::ProcessRegistry`], [`sync::Semaphore`]). The [`hosted`] module is this crate's own
//! implementation of all four, built on plain `std::thread`/`std::sync`, sufficient to run the
//! whole fault pipeline standalone.

pub mod clock;
pub mod disk;
pub mod dispatcher;
pub mod error;
pub mod fault_queue;
pub mod frame;
pub mod hosted;
pub mod mmu;
pub mod pager_pool;
pub mod process;
pub mod subsystem;
pub mod swap;
pub mod sync;
pub mod types;

pub use error::{FaultOutcome, PagerError, PagerResult};
pub use subsystem::Subsystem;
pub use types::{Config, Frame, Page, Pid, Privilege, Tid};
