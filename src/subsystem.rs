// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! The top-level owned value tying the frame table, swap store, clock hand, fault queue, pager
//! pool, and dispatcher together. A real kernel would hold each of these as global statics built
//! up by a sequence of `P3*Init` calls; here they live as fields of one `Subsystem`, and
//! double-init / use-after-shutdown are caught by an `Option` rather than a sentinel flag.

use std::sync::{Arc, Mutex};

use log::info;

use crate::clock::Replacement;
use crate::disk::BlockDisk;
use crate::dispatcher::Dispatcher;
use crate::error::{PagerError, PagerResult};
use crate::fault_queue::FaultQueue;
use crate::frame::FrameTable;
use crate::mmu::Mmu;
use crate::pager_pool::PagerPool;
use crate::process::ProcessRegistry;
use crate::swap::SwapStore;
use crate::sync::SemaphoreFactory;
use crate::types::{Config, Pid, Privilege};

struct Inner {
    replacement: Arc<Mutex<Replacement>>,
    dispatcher: Dispatcher,
    pager_pool: PagerPool,
    registry: Arc<dyn ProcessRegistry>,
}

pub struct Subsystem {
    inner: Option<Inner>,
}

impl Subsystem {
    /// Validate `config`, build the frame table and swap store, bring up the pager pool, and
    /// return a running subsystem. Fails with `InvalidNumPagers` or `OutOfSwap` before any
    /// thread is spawned; everything past that point either succeeds or is a programmer error.
    pub fn init(
        privilege: Privilege,
        config: Config,
        mmu: Arc<dyn Mmu>,
        disk: Arc<dyn BlockDisk>,
        registry: Arc<dyn ProcessRegistry>,
        semaphores: Arc<dyn SemaphoreFactory>,
    ) -> PagerResult<Self> {
        privilege.require_kernel()?;
        config.validate()?;

        let frames = FrameTable::new(config.pages, config.frames);
        let swap = SwapStore::new(disk.as_ref())?;
        let replacement = Arc::new(Mutex::new(Replacement::new(frames, swap)));
        let fault_queue = Arc::new(Mutex::new(FaultQueue::new()));

        let pager_pool = PagerPool::init(
            privilege,
            &config,
            replacement.clone(),
            fault_queue.clone(),
            mmu.clone(),
            disk.clone(),
            registry.clone(),
            semaphores.as_ref(),
        )?;

        let dispatcher = Dispatcher::new(
            fault_queue,
            pager_pool.fault_semaphore(),
            mmu,
            registry.clone(),
            semaphores,
        );

        info!(
            "subsystem initialized: {} pages, {} frames, {} pagers",
            config.pages, config.frames, config.pagers
        );
        Ok(Subsystem { inner: Some(Inner { replacement, dispatcher, pager_pool, registry }) })
    }

    fn inner(&self) -> PagerResult<&Inner> {
        self.inner.as_ref().ok_or(PagerError::NotInitialized)
    }

    /// Entry point a host's MMU trap handler calls on every page-not-present or
    /// access-violation interrupt.
    pub fn handle_fault(&self, offset: usize) -> PagerResult<()> {
        self.inner()?.dispatcher.handle_fault(offset);
        Ok(())
    }

    /// Release every frame and swap slot belonging to `pid`, for use when a process exits.
    pub fn free_all(&self, privilege: Privilege, pid: Pid) -> PagerResult<()> {
        privilege.require_kernel()?;
        let inner = self.inner()?;
        let mut replacement = inner.replacement.lock().unwrap();
        replacement.frames.free_all(pid, inner.registry.as_ref())?;
        replacement.swap.free_all(pid);
        Ok(())
    }

    pub fn free_frame_count(&self) -> PagerResult<usize> {
        Ok(self.inner()?.replacement.lock().unwrap().frames.free_count())
    }

    pub fn free_swap_slot_count(&self) -> PagerResult<usize> {
        Ok(self.inner()?.replacement.lock().unwrap().swap.free_slot_count())
    }

    /// Tear the subsystem down: stop the pager pool and drop all internal state. Calling this
    /// twice, or calling any other method afterward, returns `NotInitialized` rather than
    /// panicking.
    pub fn shutdown(&mut self, privilege: Privilege) -> PagerResult<()> {
        let inner = self.inner.take().ok_or(PagerError::NotInitialized)?;
        inner.pager_pool.shutdown(privilege)?;
        info!("subsystem shut down");
        Ok(())
    }
}
