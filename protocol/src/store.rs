//! # Keyed Record Store
//!
//! The one storage shape all three settlement engines share: records keyed
//! by a dense auto-incrementing id, plus a secondary uniqueness index from a
//! caller-chosen key (an invoice hash, an employer/worker pair) to the id,
//! plus a hard capacity ceiling.
//!
//! The store enforces *structural* invariants only — id density, key
//! uniqueness, the capacity ceiling. Business invariants (state machines,
//! authorization, conservation) live in the engines; [`LedgerStore::update`]
//! applies whatever transition the caller supplies without judging it.
//!
//! `create` is check-and-insert within a single call: when two logically
//! concurrent requests race on the same key, exactly one gets the id and the
//! other gets [`StoreError::DuplicateKey`], with no partial index write on
//! the losing side.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use thiserror::Error;

/// Rejections produced by [`LedgerStore::create`].
///
/// Lookup misses are not errors at this layer — `get`/`get_by_key` return
/// `Option` and the engines map `None` to their own not-found codes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The uniqueness key is already mapped to an existing record.
    #[error("uniqueness key already indexed")]
    DuplicateKey,

    /// The store holds `capacity` records and accepts no more.
    #[error("ledger at capacity: {capacity} records")]
    CapacityExceeded {
        /// The configured ceiling at the time of rejection.
        capacity: usize,
    },
}

/// A keyed record store with dense ids and a secondary uniqueness index.
#[derive(Clone, Debug)]
pub struct LedgerStore<K, R>
where
    K: Eq + Hash,
{
    records: BTreeMap<u64, R>,
    index: HashMap<K, u64>,
    next_id: u64,
    capacity: usize,
}

impl<K, R> LedgerStore<K, R>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty store with the given capacity ceiling.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: BTreeMap::new(),
            index: HashMap::new(),
            next_id: 0,
            capacity,
        }
    }

    /// Inserts a record under a fresh id and indexes its uniqueness key.
    ///
    /// Ids are assigned strictly increasing from 0 and never reused. The
    /// capacity and duplicate checks both happen before any write, so a
    /// rejected create leaves the store byte-for-byte unchanged.
    pub fn create(&mut self, key: K, record: R) -> Result<u64, StoreError> {
        if self.records.len() >= self.capacity {
            return Err(StoreError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        if self.index.contains_key(&key) {
            return Err(StoreError::DuplicateKey);
        }

        let id = self.next_id;
        self.next_id += 1;
        self.index.insert(key, id);
        self.records.insert(id, record);
        Ok(id)
    }

    /// Returns the record stored under `id`, if any.
    pub fn get(&self, id: u64) -> Option<&R> {
        self.records.get(&id)
    }

    /// Resolves a uniqueness key to its record id, if indexed.
    pub fn get_by_key(&self, key: &K) -> Option<u64> {
        self.index.get(key).copied()
    }

    /// Applies a full transition to the record under `id` and returns the
    /// updated record. Never touches the id or the uniqueness index.
    pub fn update<F>(&mut self, id: u64, mutate: F) -> Option<&R>
    where
        F: FnOnce(&mut R),
    {
        let record = self.records.get_mut(&id)?;
        mutate(record);
        Some(&*record)
    }

    /// `true` if the uniqueness key is already indexed.
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// `true` if a `create` would pass the capacity check right now.
    pub fn has_capacity(&self) -> bool {
        self.records.len() < self.capacity
    }

    /// The id the next successful `create` will assign.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The configured capacity ceiling.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replaces the capacity ceiling. Lowering it below the current record
    /// count is allowed: existing records stay, future creates are rejected
    /// until the count drops below the new ceiling.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }
}
