// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! A `Mutex` + `Condvar` counting semaphore, the default implementation of the `Semaphore`
//! contract. Every blocking handshake in this crate -- dispatcher/pager, pool startup, pool
//! shutdown -- goes through one of these.

use std::sync::{Condvar, Mutex};

use crate::sync::{Semaphore, SemaphoreFactory};

pub struct CountingSemaphore {
    count: Mutex<usize>,
    cond: Condvar,
}

impl CountingSemaphore {
    pub fn new(initial: usize) -> Self {
        CountingSemaphore { count: Mutex::new(initial), cond: Condvar::new() }
    }
}

impl Semaphore for CountingSemaphore {
    fn acquire(&self) {
        let mut count = self.count.lock().unwrap();
        while *count == 0 {
            count = self.cond.wait(count).unwrap();
        }
        *count -= 1;
    }

    fn release(&self) {
        let mut count = self.count.lock().unwrap();
        *count += 1;
        self.cond.notify_one();
    }
}

#[derive(Default)]
pub struct DefaultSemaphoreFactory;

impl SemaphoreFactory for DefaultSemaphoreFactory {
    fn create(&self, initial: usize) -> Box<dyn Semaphore> {
        Box::new(CountingSemaphore::new(initial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn release_before_acquire_is_not_lost() {
        let sem = CountingSemaphore::new(0);
        sem.release();
        sem.acquire();
    }

    #[test]
    fn acquire_blocks_until_another_thread_releases() {
        let sem = Arc::new(CountingSemaphore::new(0));
        let sem2 = sem.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            sem2.release();
        });
        sem.acquire();
        handle.join().unwrap();
    }
}
