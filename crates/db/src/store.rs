//! Keyed record tables.
//!
//! Each table is a sharded concurrent map. Every read or write touches
//! exactly one record under that record's shard lock, which gives atomic
//! single-record updates without any cross-record locking.

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

use crate::DbError;

/// A record that can live in a [`Table`].
pub trait Record: Clone + Send + Sync + 'static {
    /// Human readable kind, used in error messages.
    const KIND: &'static str;

    fn id(&self) -> Uuid;

    fn created_at(&self) -> DateTime<Utc>;

    /// Stamp the record as modified at `now`.
    fn touch(&mut self, now: DateTime<Utc>);
}

#[derive(Debug)]
pub struct Table<T: Record> {
    rows: DashMap<Uuid, T>,
}

impl<T: Record> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }
}

impl<T: Record> Table<T> {
    pub fn insert(&self, record: T) -> Result<T, DbError> {
        match self.rows.entry(record.id()) {
            Entry::Occupied(_) => Err(DbError::Duplicate {
                kind: T::KIND,
                id: record.id(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Option<T> {
        self.rows.get(&id).map(|row| row.value().clone())
    }

    /// All records accepted by `filter`, newest first.
    pub fn list<F>(&self, filter: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut rows: Vec<T> = self
            .rows
            .iter()
            .filter(|row| filter(row.value()))
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        rows
    }

    /// Apply `change` to the record while holding its shard lock.
    pub fn update<F>(&self, id: Uuid, change: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut T),
    {
        let mut row = self.rows.get_mut(&id).ok_or(DbError::NotFound {
            kind: T::KIND,
            id,
        })?;
        change(row.value_mut());
        row.value_mut().touch(Utc::now());
        Ok(row.value().clone())
    }

    /// Remove a record, returning the number of rows removed.
    pub fn remove(&self, id: Uuid) -> u64 {
        u64::from(self.rows.remove(&id).is_some())
    }

    pub fn count<F>(&self, filter: F) -> usize
    where
        F: Fn(&T) -> bool,
    {
        self.rows.iter().filter(|row| filter(row.value())).count()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
