//! Runner handles and record stores

use std::fmt;
use std::sync::{Arc, Mutex};

use log::debug;
use shellfn_core::{Result, ShellfnError};
use uuid::Uuid;

use crate::process::record::ExecutionRecord;

/// Destination of terminated execution records
pub trait RecordStore: Send + Sync {
    fn store(&self, record: &ExecutionRecord) -> Result<()>;
}

/// Record store keeping records in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ExecutionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<ExecutionRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryStore {
    fn store(&self, record: &ExecutionRecord) -> Result<()> {
        if !record.is_storable() {
            return Err(ShellfnError::Storage(
                record
                    .unstorable_message()
                    .unwrap_or("record is not storable")
                    .to_string(),
            ));
        }
        debug!("Storing record {} ({})", record.id(), record.label());
        let mut records = self.records.lock().unwrap_or_else(|poison| poison.into_inner());
        records.retain(|existing| existing.id() != record.id());
        records.push(record.clone());
        Ok(())
    }
}

/// Handle to the runner executing a process.
///
/// A persistent runner belongs to a long-lived worker; interrupting the host must not
/// kill the processes it runs, so no interrupt handler is installed for it.
#[derive(Clone)]
pub struct Runner {
    persistent: bool,
    store: Arc<dyn RecordStore>,
}

impl Runner {
    /// Runner for processes launched directly from the current program
    pub fn local(store: Arc<dyn RecordStore>) -> Self {
        Self {
            persistent: false,
            store,
        }
    }

    /// Runner owned by a long-lived worker
    pub fn persistent(store: Arc<dyn RecordStore>) -> Self {
        Self {
            persistent: true,
            store,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::local(Arc::new(MemoryStore::new()))
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("persistent", &self.persistent)
            .finish_non_exhaustive()
    }
}
