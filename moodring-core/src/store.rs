//! Durable mood history on top of a key-value blob store.
//!
//! The whole history lives under one key as a JSON array, oldest first.
//! Every append is a read-modify-write with no concurrency check.
//!
//! Nothing here returns an error to the caller: an unreadable or corrupted
//! blob is logged and treated as empty (a corrupted one is also erased), and
//! failed writes are logged and dropped.

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, error, warn};

use crate::error::{StoreError, StoreResult};
use crate::record::MoodRecord;

pub const STORAGE_KEY: &str = "mood_records";
pub const MAX_RECORDS: usize = 1000;

/// Key-value blob substrate (browser local storage, a directory of files, ...).
pub trait BlobStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&mut self, key: &str) -> StoreResult<()>;
}

/// In-process blob store for tests and headless use.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, String>,
    unavailable: bool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store where every call fails, like a disabled storage backend.
    pub fn unavailable() -> Self {
        Self {
            blobs: HashMap::new(),
            unavailable: true,
        }
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.blobs.get(key).map(String::as_str)
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store disabled".to_string()));
        }
        Ok(())
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check()?;
        Ok(self.blobs.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.check()?;
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.check()?;
        self.blobs.remove(key);
        Ok(())
    }
}

/// Owner of the persisted record list.
#[derive(Debug, Clone)]
pub struct MoodStore<B: BlobStore> {
    backend: B,
    capacity: usize,
}

impl<B: BlobStore> MoodStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_capacity(backend, MAX_RECORDS)
    }

    pub fn with_capacity(backend: B, capacity: usize) -> Self {
        Self {
            backend,
            capacity: capacity.max(1),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a record, evicting the oldest beyond capacity.
    /// Returns whether the write reached the backend.
    pub fn save_record(&mut self, record: MoodRecord) -> bool {
        let mut records = self.all_records();
        records.push(record);
        if records.len() > self.capacity {
            let excess = records.len() - self.capacity;
            records.drain(..excess);
            debug!(evicted = excess, "mood store at capacity");
        }
        match self.write(&records) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "failed to save mood record");
                false
            }
        }
    }

    /// Every stored record, oldest first.
    pub fn all_records(&mut self) -> Vec<MoodRecord> {
        let raw = match self.backend.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!(error = %e, "failed to load mood records");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<MoodRecord>>(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "mood records corrupted, discarding");
                if let Err(e) = self.backend.remove(STORAGE_KEY) {
                    error!(error = %e, "failed to clean up corrupted mood records");
                }
                Vec::new()
            }
        }
    }

    pub fn len(&mut self) -> usize {
        self.all_records().len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    pub fn records_by_date(&mut self, date: NaiveDate) -> Vec<MoodRecord> {
        self.all_records()
            .into_iter()
            .filter(|r| r.date == date)
            .collect()
    }

    /// Records whose date falls in `start..=end`.
    pub fn records_by_range(&mut self, start: NaiveDate, end: NaiveDate) -> Vec<MoodRecord> {
        self.all_records()
            .into_iter()
            .filter(|r| r.date >= start && r.date <= end)
            .collect()
    }

    pub fn clear_all(&mut self) {
        if let Err(e) = self.backend.remove(STORAGE_KEY) {
            error!(error = %e, "failed to clear mood records");
        }
    }

    /// Drop every record dated strictly before `date`.
    pub fn clear_before(&mut self, date: NaiveDate) {
        let kept: Vec<MoodRecord> = self
            .all_records()
            .into_iter()
            .filter(|r| r.date >= date)
            .collect();
        if let Err(e) = self.write(&kept) {
            error!(error = %e, %date, "failed to clear mood records before date");
        }
    }

    fn write(&mut self, records: &[MoodRecord]) -> StoreResult<()> {
        let json = serde_json::to_string(records)?;
        self.backend.set(STORAGE_KEY, &json)
    }
}
