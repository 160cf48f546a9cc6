// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! A process table backed by real OS threads: one `std::thread` per simulated process, a
//! thread-local binding from the calling thread to its pid, and a plain `HashMap` of per-pid
//! page tables.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;

use crate::error::{PagerError, PagerResult};
use crate::process::{Joinable, Pte, ProcessRegistry, TerminationCode};
use crate::types::{Page, Pid};

struct ThreadJoinHandle(std::thread::JoinHandle<()>);

impl Joinable for ThreadJoinHandle {
    fn join(self: Box<Self>) {
        let _ = self.0.join();
    }
}

thread_local! {
    static CURRENT_PID: Cell<Option<Pid>> = const { Cell::new(None) };
}

struct ProcessState {
    table: Vec<Pte>,
}

pub struct ThreadRegistry {
    page_count: usize,
    processes: Mutex<HashMap<Pid, ProcessState>>,
    terminated: Mutex<HashMap<Pid, TerminationCode>>,
}

impl ThreadRegistry {
    pub fn new(page_count: usize) -> Self {
        ThreadRegistry {
            page_count,
            processes: Mutex::new(HashMap::new()),
            terminated: Mutex::new(HashMap::new()),
        }
    }

    /// Bind the calling thread to `pid` and give it a fresh, all-unmapped page table. Call this
    /// once from the thread that will simulate `pid` faulting, before it raises any fault.
    pub fn register(&self, pid: Pid) {
        CURRENT_PID.with(|cell| cell.set(Some(pid)));
        let table = vec![Pte::unmapped(); self.page_count];
        self.processes.lock().unwrap().insert(pid, ProcessState { table });
    }

    pub fn termination_code(&self, pid: Pid) -> Option<TerminationCode> {
        self.terminated.lock().unwrap().get(&pid).copied()
    }
}

impl ProcessRegistry for ThreadRegistry {
    fn current_pid(&self) -> Pid {
        CURRENT_PID
            .with(|cell| cell.get())
            .expect("current thread never called ThreadRegistry::register")
    }

    fn page_count(&self, pid: Pid) -> PagerResult<usize> {
        let processes = self.processes.lock().unwrap();
        processes.get(&pid).map(|_| self.page_count).ok_or(PagerError::InvalidPid)
    }

    fn pte(&self, pid: Pid, page: Page) -> PagerResult<Pte> {
        let processes = self.processes.lock().unwrap();
        let state = processes.get(&pid).ok_or(PagerError::InvalidPid)?;
        state.table.get(page.0).copied().ok_or(PagerError::InvalidPid)
    }

    fn set_pte(&self, pid: Pid, page: Page, pte: Pte) -> PagerResult<()> {
        let mut processes = self.processes.lock().unwrap();
        let state = processes.get_mut(&pid).ok_or(PagerError::InvalidPid)?;
        let slot = state.table.get_mut(page.0).ok_or(PagerError::InvalidPid)?;
        *slot = pte;
        Ok(())
    }

    fn fork(
        &self,
        name: &str,
        entry: Box<dyn FnOnce() + Send + 'static>,
    ) -> PagerResult<Box<dyn Joinable>> {
        std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(entry)
            .map(|handle| Box::new(ThreadJoinHandle(handle)) as Box<dyn Joinable>)
            .map_err(|_| PagerError::OutOfPages)
    }

    fn terminate(&self, pid: Pid, code: TerminationCode) {
        debug!("terminating {pid} with {code:?}");
        self.terminated.lock().unwrap().insert(pid, code);
    }
}
