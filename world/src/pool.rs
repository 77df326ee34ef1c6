//! Reusable-instance registries that hand out and reclaim entity handles
//! without allocation churn.

use std::collections::{BTreeSet, VecDeque};

/// Registry of pooled instances for one entity kind.
///
/// Every handle this pool ever constructs is in exactly one of the available
/// queue or the active set at all times. Acquisition never fails: when the
/// queue runs dry the pool constructs a fresh handle on demand.
#[derive(Debug)]
pub(crate) struct Pool<T> {
    available: VecDeque<T>,
    active: BTreeSet<T>,
    constructed: u32,
    make: fn(u32) -> T,
}

impl<T: Copy + Ord> Pool<T> {
    pub(crate) fn new(initial: u32, make: fn(u32) -> T) -> Self {
        let mut pool = Self {
            available: VecDeque::new(),
            active: BTreeSet::new(),
            constructed: 0,
            make,
        };
        for _ in 0..initial {
            let id = pool.construct();
            pool.available.push_back(id);
        }
        pool
    }

    fn construct(&mut self) -> T {
        let id = (self.make)(self.constructed);
        self.constructed += 1;
        id
    }

    pub(crate) fn acquire(&mut self) -> T {
        let id = match self.available.pop_front() {
            Some(id) => id,
            None => self.construct(),
        };
        let _ = self.active.insert(id);
        id
    }

    /// Returns a handle to the available queue. Releasing a handle that is
    /// not currently active is a safe no-op.
    pub(crate) fn release(&mut self, id: T) {
        if self.active.remove(&id) {
            self.available.push_back(id);
        }
    }

    pub(crate) fn available(&self) -> impl Iterator<Item = T> + '_ {
        self.available.iter().copied()
    }

    pub(crate) fn active(&self) -> impl Iterator<Item = T> + '_ {
        self.active.iter().copied()
    }

    pub(crate) fn constructed(&self) -> u32 {
        self.constructed
    }
}
