// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

use core::fmt;

/// Status codes returned by the pager's public operations.
///
/// A flat, explicitly-matched error enum: no `thiserror`, just a `Display` impl and manual
/// `std::error::Error`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PagerError {
    AlreadyInitialized,
    NotInitialized,
    InvalidNumPagers,
    InvalidPid,
    InvalidFrame,
    OutOfPages,
    FrameNotMapped,
    OutOfSwap,
    PrivilegeViolation,
}

impl fmt::Display for PagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            PagerError::AlreadyInitialized => "subsystem already initialized",
            PagerError::NotInitialized => "subsystem not initialized",
            PagerError::InvalidNumPagers => "pager count out of range",
            PagerError::InvalidPid => "pid has no page table",
            PagerError::InvalidFrame => "frame index out of range",
            PagerError::OutOfPages => "no free page-table entry in the transient mapping context",
            PagerError::FrameNotMapped => "frame is not currently mapped into the caller's transient slot",
            PagerError::OutOfSwap => "swap disk has no free slots",
            PagerError::PrivilegeViolation => "privileged operation invoked outside kernel context",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for PagerError {}

pub type PagerResult<T> = Result<T, PagerError>;

/// Outcome of a completed fault, written by a pager into the fault's result slot and read by
/// the dispatcher. `AccessViolation` and `OutOfSwap` are not `PagerError`s: a core operation
/// never returns them directly, they only ever travel through a `Fault::result`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FaultOutcome {
    Resolved,
    AccessViolation,
    OutOfSwap,
}
