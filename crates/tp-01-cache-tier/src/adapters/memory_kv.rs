//! In-memory key-value store.
//!
//! Ordered map behind a `RwLock`, so prefix scans return keys in order like
//! the RocksDB adapter does. Supports injecting a number of upcoming
//! failures, and stalling the next write, to exercise transient-error paths.

use crate::ports::{BatchOperation, KeyValueStore};
use parking_lot::RwLock;
use shared_types::StoreError;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct InMemoryKVStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    failures_pending: AtomicU32,
    write_stall_ms: AtomicU64,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` operations fail with `StoreError::Unavailable`.
    pub fn fail_next(&self, count: u32) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Make the next write (`put` or batch) block for `stall` before it
    /// lands.
    pub fn stall_next_write(&self, stall: Duration) {
        self.write_stall_ms.store(stall.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        let consumed = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match consumed {
            Ok(_) => Err(StoreError::Unavailable("injected failure".into())),
            Err(_) => Ok(()),
        }
    }

    fn stall_if_requested(&self) {
        let stall = self.write_stall_ms.swap(0, Ordering::SeqCst);
        if stall > 0 {
            std::thread::sleep(Duration::from_millis(stall));
        }
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_available()?;
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.check_available()?;
        self.stall_if_requested();
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.check_available()?;
        self.data.write().remove(key);
        Ok(())
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        self.check_available()?;
        self.stall_if_requested();
        let mut data = self.data.write();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.check_available()?;
        Ok(self
            .data
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}
