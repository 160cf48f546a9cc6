// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! The pager pool: a fixed set of worker threads that drain the fault queue, each fault served
//! by acquiring or evicting a frame, swapping its contents in, installing the page table entry,
//! and waking the faulting thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{bounded, Sender};
use log::{debug, trace, warn};

use crate::clock::Replacement;
use crate::disk::BlockDisk;
use crate::error::{FaultOutcome, PagerError, PagerResult};
use crate::fault_queue::FaultQueue;
use crate::mmu::{FaultCause, Mmu};
use crate::process::{Joinable, Pte, ProcessRegistry};
use crate::swap::SwapInOutcome;
use crate::sync::{Semaphore, SemaphoreFactory};
use crate::types::{Config, K_MAX, Permission, Privilege};

pub struct PagerPool {
    shutdown: Arc<AtomicBool>,
    fault_sem: Arc<dyn Semaphore>,
    pager_count: usize,
    workers: Mutex<Vec<Box<dyn Joinable>>>,
}

impl PagerPool {
    /// Spawn `config.pagers` worker threads and block until every one of them has entered its
    /// service loop. `privilege` must be `Kernel`: bringing up the pool is a privileged
    /// operation, exactly like `FrameTable::shutdown` and `SwapStore::shutdown`.
    #[allow(clippy::too_many_arguments)]
    pub fn init(
        privilege: Privilege,
        config: &Config,
        replacement: Arc<Mutex<Replacement>>,
        fault_queue: Arc<Mutex<FaultQueue>>,
        mmu: Arc<dyn Mmu>,
        disk: Arc<dyn BlockDisk>,
        registry: Arc<dyn ProcessRegistry>,
        semaphores: &dyn SemaphoreFactory,
    ) -> PagerResult<Self> {
        privilege.require_kernel()?;
        if config.pagers == 0 || config.pagers > K_MAX {
            return Err(PagerError::InvalidNumPagers);
        }

        let fault_sem: Arc<dyn Semaphore> = semaphores.create(0).into();
        let shutdown = Arc::new(AtomicBool::new(false));
        // A bounded rendezvous channel, not a semaphore: one ready-signal per worker, read back
        // here before `init` returns.
        let (ready_tx, ready_rx) = bounded::<()>(config.pagers);
        let mut workers: Vec<Box<dyn Joinable>> = Vec::with_capacity(config.pagers);

        for i in 0..config.pagers {
            let replacement = replacement.clone();
            let fault_queue = fault_queue.clone();
            let mmu = mmu.clone();
            let disk = disk.clone();
            let registry = registry.clone();
            let fault_sem = fault_sem.clone();
            let shutdown = shutdown.clone();
            let ready_tx = ready_tx.clone();
            let name = format!("pager-{i}");
            let registry_for_worker = registry.clone();
            let handle = registry.fork(
                &name,
                Box::new(move || {
                    worker_loop(
                        replacement,
                        fault_queue,
                        mmu.as_ref(),
                        disk.as_ref(),
                        registry_for_worker.as_ref(),
                        fault_sem.as_ref(),
                        shutdown.as_ref(),
                        &ready_tx,
                    )
                }),
            )?;
            workers.push(handle);
        }
        drop(ready_tx);

        for _ in 0..config.pagers {
            ready_rx.recv().expect("a pager thread dropped its ready sender without sending");
        }
        debug!("pager pool started with {} workers", config.pagers);
        Ok(PagerPool { shutdown, fault_sem, pager_count: config.pagers, workers: Mutex::new(workers) })
    }

    /// Signal every worker to exit after its current fault (if any) and wait for the pool to
    /// drain. `privilege` must be `Kernel`.
    pub fn shutdown(&self, privilege: Privilege) -> PagerResult<()> {
        privilege.require_kernel()?;
        self.shutdown.store(true, Ordering::SeqCst);
        for _ in 0..self.pager_count {
            self.fault_sem.release();
        }
        for worker in self.workers.lock().unwrap().drain(..) {
            worker.join();
        }
        Ok(())
    }

    pub fn fault_semaphore(&self) -> Arc<dyn Semaphore> {
        self.fault_sem.clone()
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    replacement: Arc<Mutex<Replacement>>,
    fault_queue: Arc<Mutex<FaultQueue>>,
    mmu: &dyn Mmu,
    disk: &dyn BlockDisk,
    registry: &dyn ProcessRegistry,
    fault_sem: &dyn Semaphore,
    shutdown: &AtomicBool,
    ready: &Sender<()>,
) {
    let _ = ready.send(());
    loop {
        fault_sem.acquire();
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        let fault = {
            let mut queue = fault_queue.lock().unwrap();
            match queue.pop() {
                Some(fault) => fault,
                None => continue,
            }
        };

        if fault.cause == FaultCause::AccessViolation {
            fault.set_result(FaultOutcome::AccessViolation);
            fault.wait.release();
            continue;
        }

        let mut replacement = replacement.lock().unwrap();
        let outcome = service_fault(&mut replacement, mmu, disk, registry, fault.pid, fault.page);
        match outcome {
            Ok(()) => {
                trace!("fault resolved for {} page {:?}", fault.pid, fault.page.0);
                fault.set_result(FaultOutcome::Resolved);
            }
            Err(PagerError::OutOfSwap) => {
                warn!("out of swap servicing {} page {:?}", fault.pid, fault.page.0);
                fault.set_result(FaultOutcome::OutOfSwap);
            }
            Err(e) => {
                warn!("unexpected error servicing fault: {e}");
                fault.set_result(FaultOutcome::AccessViolation);
            }
        }
        drop(replacement);
        fault.wait.release();
    }
}

fn service_fault(
    replacement: &mut Replacement,
    mmu: &dyn Mmu,
    disk: &dyn BlockDisk,
    registry: &dyn ProcessRegistry,
    pid: crate::types::Pid,
    page: crate::types::Page,
) -> PagerResult<()> {
    let frame = replacement.acquire_frame(mmu, disk, registry)?;
    let frame_count = replacement.frames.frame_count();
    match replacement.swap.swap_in(pid, page, frame, mmu, disk, registry, frame_count) {
        Ok(SwapInOutcome::Success) => {}
        Ok(SwapInOutcome::EmptyPage) => {
            let vaddr = mmu.map_transient(frame)?;
            let zeros = vec![0u8; crate::swap::PAGE_SIZE];
            mmu.copy_in(vaddr, &zeros);
            mmu.unmap_transient(frame)?;
        }
        Err(e) => {
            replacement.frames.release_busy(frame)?;
            return Err(e);
        }
    }

    registry.set_pte(
        pid,
        page,
        Pte { incore: true, frame: Some(frame), perm: Permission::READ | Permission::WRITE },
    )?;
    replacement.frames.mark_in_use(frame, (pid, page))?;
    Ok(())
}
