// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! The process-table contract: everything this subsystem needs to know about the processes it
//! pages on behalf of, without owning process lifecycle itself. `hosted::ThreadRegistry` backs
//! this with one OS thread per simulated process, standing in for real process control blocks
//! during testing.

use crate::error::PagerResult;
use crate::types::{Frame, Page, Permission, Pid};

/// One page-table entry. `incore` is the authoritative "is this page resident" bit; `frame` is
/// only meaningful when `incore` is true. A page with `incore == false` and `frame == None` has
/// never been touched; `incore == false` with `frame == Some(_)` would mean a page that is
/// mapped to a frame the MMU doesn't know about yet, which this subsystem never produces.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Pte {
    pub incore: bool,
    pub frame: Option<Frame>,
    pub perm: Permission,
}

impl Pte {
    pub fn unmapped() -> Self {
        Pte { incore: false, frame: None, perm: Permission::empty() }
    }
}

/// A handle to a thread started via `ProcessRegistry::fork`, joinable once, mirroring
/// `std::thread::JoinHandle` without committing the trait to `std::thread` specifically.
pub trait Joinable: Send {
    fn join(self: Box<Self>);
}

/// Why a process ended, passed through to `ProcessRegistry::terminate` for bookkeeping.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TerminationCode {
    Exited,
    AccessViolation,
    OutOfSwap,
}

pub trait ProcessRegistry: Send + Sync {
    /// The pid of the calling thread. Used by the dispatcher to attribute an incoming fault.
    fn current_pid(&self) -> Pid;

    /// Number of pages in `pid`'s address space.
    fn page_count(&self, pid: Pid) -> PagerResult<usize>;

    fn pte(&self, pid: Pid, page: Page) -> PagerResult<Pte>;

    fn set_pte(&self, pid: Pid, page: Page, pte: Pte) -> PagerResult<()>;

    /// Start a named worker thread running `entry` and return immediately; the caller is
    /// responsible for any startup rendezvous it needs and for joining the returned handle at
    /// shutdown. Used by the pager pool to bring up its fixed set of workers.
    fn fork(
        &self,
        name: &str,
        entry: Box<dyn FnOnce() + Send + 'static>,
    ) -> PagerResult<Box<dyn Joinable>>;

    /// Record that `pid` is finished so its resources can be reclaimed; does not itself free
    /// frames or swap slots, which is the caller's responsibility.
    fn terminate(&self, pid: Pid, code: TerminationCode);
}
