// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! The fault dispatcher: the MMU trap handler that turns a page-not-present or access-violation
//! trap into a queued fault, blocks the faulting thread, and acts on the pager's verdict once it
//! wakes.

use std::sync::{Arc, Mutex};

use log::{error, trace};

use crate::error::FaultOutcome;
use crate::fault_queue::{Fault, FaultQueue};
use crate::mmu::{FaultCause, Mmu};
use crate::process::{ProcessRegistry, TerminationCode};
use crate::sync::{Semaphore, SemaphoreFactory};
use crate::types::Page;

pub struct Dispatcher {
    fault_queue: Arc<Mutex<FaultQueue>>,
    fault_sem: Arc<dyn Semaphore>,
    mmu: Arc<dyn Mmu>,
    registry: Arc<dyn ProcessRegistry>,
    semaphores: Arc<dyn SemaphoreFactory>,
}

impl Dispatcher {
    pub fn new(
        fault_queue: Arc<Mutex<FaultQueue>>,
        fault_sem: Arc<dyn Semaphore>,
        mmu: Arc<dyn Mmu>,
        registry: Arc<dyn ProcessRegistry>,
        semaphores: Arc<dyn SemaphoreFactory>,
    ) -> Self {
        Dispatcher { fault_queue, fault_sem, mmu, registry, semaphores }
    }

    /// Entered on every MMU trap for the calling thread. Blocks until a pager has resolved the
    /// fault, then either returns (letting the faulting instruction re-execute) or terminates
    /// the process.
    pub fn handle_fault(&self, offset: usize) {
        let pid = self.registry.current_pid();
        let cause = self.mmu.cause(pid, crate::types::Tid(0));
        if !matches!(cause, FaultCause::PageNotPresent | FaultCause::AccessViolation) {
            error!("MMU trap with no recognized cause for {pid}");
            return;
        }

        let page = Page(offset / crate::swap::PAGE_SIZE);
        let wait = self.semaphores.create(0).into();
        let fault = Fault::new(pid, page, cause, wait);

        {
            let mut queue = self.fault_queue.lock().unwrap();
            queue.push(fault.clone());
        }
        self.fault_sem.release();

        fault.wait.acquire();

        match fault.take_result() {
            Some(FaultOutcome::Resolved) | None => {
                self.mmu.commit_page_table(pid);
                trace!("fault resolved for {pid} page {:?}", page.0);
            }
            Some(FaultOutcome::AccessViolation) => {
                self.registry.terminate(pid, TerminationCode::AccessViolation);
            }
            Some(FaultOutcome::OutOfSwap) => {
                self.registry.terminate(pid, TerminationCode::OutOfSwap);
            }
        }
    }
}

/// A simpler handler usable before any pagers exist: maps page `x` of the faulting process
/// directly to frame `x`. Used only for bring-up diagnostics; never active once the pager pool
/// is running.
pub fn identity_map_handler(
    registry: &dyn ProcessRegistry,
    mmu: &dyn Mmu,
    offset: usize,
) -> crate::error::PagerResult<()> {
    let pid = registry.current_pid();
    let page = Page(offset / crate::swap::PAGE_SIZE);
    registry.set_pte(
        pid,
        page,
        crate::process::Pte {
            incore: true,
            frame: Some(crate::types::Frame(page.0)),
            perm: crate::types::Permission::READ | crate::types::Permission::WRITE,
        },
    )?;
    mmu.commit_page_table(pid);
    Ok(())
}
