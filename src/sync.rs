// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! The named counting semaphore contract. The fault queue, the pager pool, and the dispatcher all
//! suspend and resume exclusively through this primitive -- never by polling, and never by
//! sharing a single semaphore across more than one fault; creating and destroying one per fault
//! is deliberate.

/// A counting semaphore: `acquire` is P, `release` is V. Implementations must allow `release`
/// to be called from a different thread than the one that will eventually `acquire`, which is
/// exactly how the dispatcher/pager handshake and the pager-pool/fault-queue handshake work.
pub trait Semaphore: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

/// Constructs fresh semaphores on demand. The fault dispatcher calls this once per fault to
/// create that fault's private wait semaphore; the pager pool calls it once at startup for the
/// shared fault semaphore and the startup rendezvous.
pub trait SemaphoreFactory: Send + Sync {
    fn create(&self, initial: usize) -> Box<dyn Semaphore>;
}
