//! Keyed async locks serializing work on one equipment, slot, student, booking or account

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::models::booking::SlotKey;

type LockMap<K, L> = Arc<DashMap<K, Arc<L>>>;

/// Holds a keyed lock; the key's entry is dropped with the last holder or waiter
pub struct KeyedGuard<K: Eq + Hash, L, G> {
    key: K,
    map: LockMap<K, L>,
    guard: Option<G>,
}

impl<K: Eq + Hash, L, G> Drop for KeyedGuard<K, L, G> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters clone the Arc under the shard lock, so a count of one means nobody else
        self.map
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

pub type KeyedMutexGuard<K> = KeyedGuard<K, Mutex<()>, OwnedMutexGuard<()>>;
pub type SharedGateGuard<K> = KeyedGuard<K, RwLock<()>, OwnedRwLockReadGuard<()>>;
pub type ExclusiveGateGuard<K> = KeyedGuard<K, RwLock<()>, OwnedRwLockWriteGuard<()>>;

/// One mutex per key, created on first use
pub struct KeyedMutex<K: Eq + Hash> {
    locks: LockMap<K, Mutex<()>>,
}

impl<K: Eq + Hash> Default for KeyedMutex<K> {
    fn default() -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedMutex<K> {
    pub async fn lock(&self, key: K) -> KeyedMutexGuard<K> {
        // Declared before the pending lock so a cancelled wait still evicts the key
        let mut held = KeyedGuard {
            key: key.clone(),
            map: self.locks.clone(),
            guard: None,
        };
        // The map shard guard must be released before awaiting
        let pending = self.locks.entry(key).or_default().clone().lock_owned();
        held.guard = Some(pending.await);
        held
    }

    /// Keys currently locked or awaited
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// One read/write gate per key: shared for bookers, exclusive for mutations
pub struct KeyedGate<K: Eq + Hash> {
    gates: LockMap<K, RwLock<()>>,
}

impl<K: Eq + Hash> Default for KeyedGate<K> {
    fn default() -> Self {
        Self {
            gates: Arc::new(DashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedGate<K> {
    pub async fn shared(&self, key: K) -> SharedGateGuard<K> {
        let mut held = KeyedGuard {
            key: key.clone(),
            map: self.gates.clone(),
            guard: None,
        };
        let pending = self.gates.entry(key).or_default().clone().read_owned();
        held.guard = Some(pending.await);
        held
    }

    pub async fn exclusive(&self, key: K) -> ExclusiveGateGuard<K> {
        let mut held = KeyedGuard {
            key: key.clone(),
            map: self.gates.clone(),
            guard: None,
        };
        let pending = self.gates.entry(key).or_default().clone().write_owned();
        held.guard = Some(pending.await);
        held
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

/// All locks of the booking model.
///
/// Acquisition order: equipment gate, slot, student, booking, supervisor.
#[derive(Default)]
pub struct LockTable {
    pub equipment: KeyedGate<i32>,
    pub slots: KeyedMutex<SlotKey>,
    /// Supervisor assignment of a student
    pub students: KeyedMutex<i32>,
    pub bookings: KeyedMutex<i32>,
    pub supervisors: KeyedMutex<i32>,
}
