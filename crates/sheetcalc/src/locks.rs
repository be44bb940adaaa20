//! Advisory cell locks for collaborative editing
//!
//! The engine never consults these; a collaboration layer checks
//! [`CellLockQuery::is_locked`] before forwarding a user's write.

use ahash::AHashMap;
use parking_lot::RwLock;
use sheetcalc_core::CellAddress;
use tracing::debug;

/// Read side of a lock table
pub trait CellLockQuery {
    /// Check if any owner holds a lock on `address`
    fn is_locked(&self, address: CellAddress) -> bool;

    /// Owner holding the lock on `address`, if any
    fn lock_owner(&self, _address: CellAddress) -> Option<String> {
        None
    }
}

/// Owner-tagged lock table
#[derive(Debug, Default)]
pub struct AdvisoryLocks {
    locks: RwLock<AHashMap<CellAddress, String>>,
}

impl AdvisoryLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock on `address` for `owner`
    ///
    /// Returns false if another owner holds it. Re-locking a cell you already
    /// hold succeeds.
    pub fn try_lock(&self, address: CellAddress, owner: &str) -> bool {
        let mut locks = self.locks.write();
        match locks.get(&address) {
            Some(holder) if holder != owner => {
                debug!(cell = %address, owner, holder = %holder, "lock refused");
                false
            }
            Some(_) => true,
            None => {
                debug!(cell = %address, owner, "lock taken");
                locks.insert(address, owner.to_string());
                true
            }
        }
    }

    /// Release the lock on `address` if `owner` holds it
    pub fn unlock(&self, address: CellAddress, owner: &str) -> bool {
        let mut locks = self.locks.write();
        if locks.get(&address).map(String::as_str) == Some(owner) {
            locks.remove(&address);
            debug!(cell = %address, owner, "lock released");
            true
        } else {
            false
        }
    }

    /// Release every lock held by `owner`, returning how many were held
    pub fn release_all(&self, owner: &str) -> usize {
        let mut locks = self.locks.write();
        let before = locks.len();
        locks.retain(|_, holder| holder != owner);
        before - locks.len()
    }

    /// Locked cells, sorted
    pub fn locked_cells(&self) -> Vec<CellAddress> {
        let mut cells: Vec<_> = self.locks.read().keys().copied().collect();
        cells.sort_unstable();
        cells
    }
}

impl CellLockQuery for AdvisoryLocks {
    fn is_locked(&self, address: CellAddress) -> bool {
        self.locks.read().contains_key(&address)
    }

    fn lock_owner(&self, address: CellAddress) -> Option<String> {
        self.locks.read().get(&address).cloned()
    }
}
