//! In-memory `Database` backend.
//!
//! Every entity kind lives in its own id-keyed table with its own identity
//! counter. All tables sit behind one `RwLock`, so each store operation is
//! atomic on its own; nothing spans operations.

mod legal_practice;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::db::{
    CaseRecord, CaseUpdateRecord, ClientRecord, Database, DeadlineRecord, DocumentRecord,
    EntityId, StoreCounts, UserRecord,
};
use crate::error::DatabaseError;

/// Source of "now" for server-assigned timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Id-keyed collection with monotonically increasing identity assignment.
///
/// Ids start at 1 and are never reused, even after deletes. Iteration follows
/// id order, which is also insertion order.
#[derive(Debug)]
pub(crate) struct Table<T> {
    entity: &'static str,
    rows: BTreeMap<EntityId, T>,
    next_id: EntityId,
}

impl<T: Clone> Table<T> {
    fn new(entity: &'static str) -> Self {
        Self {
            entity,
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn insert_with(&mut self, build: impl FnOnce(EntityId) -> T) -> Result<T, DatabaseError> {
        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(DatabaseError::IdSpaceExhausted {
            entity: self.entity,
        })?;
        let row = build(id);
        self.rows.insert(id, row.clone());
        Ok(row)
    }

    fn get(&self, id: EntityId) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn contains(&self, id: EntityId) -> bool {
        self.rows.contains_key(&id)
    }

    fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    fn all(&self) -> Vec<T> {
        self.rows.values().cloned().collect()
    }

    fn update_with(&mut self, id: EntityId, apply: impl FnOnce(&mut T)) -> Option<T> {
        let row = self.rows.get_mut(&id)?;
        apply(row);
        Some(row.clone())
    }

    fn remove(&mut self, id: EntityId) -> bool {
        self.rows.remove(&id).is_some()
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.next_id = 1;
    }
}

#[derive(Debug)]
pub(crate) struct Tables {
    users: Table<UserRecord>,
    clients: Table<ClientRecord>,
    cases: Table<CaseRecord>,
    case_updates: Table<CaseUpdateRecord>,
    deadlines: Table<DeadlineRecord>,
    documents: Table<DocumentRecord>,
}

impl Tables {
    fn new() -> Self {
        Self {
            users: Table::new("user"),
            clients: Table::new("client"),
            cases: Table::new("case"),
            case_updates: Table::new("case update"),
            deadlines: Table::new("deadline"),
            documents: Table::new("document"),
        }
    }
}

/// Process-resident store. Construct one per process (or per test) and share
/// it as `Arc<dyn Database>`.
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    clock: Clock,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    /// Backend whose document timestamps come from `clock`.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            tables: RwLock::new(Tables::new()),
            clock,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend").finish_non_exhaustive()
    }
}

#[async_trait]
impl Database for MemoryBackend {
    async fn reset(&self) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.users.clear();
        tables.clients.clear();
        tables.cases.clear();
        tables.case_updates.clear();
        tables.deadlines.clear();
        tables.documents.clear();
        tracing::debug!("In-memory store reset");
        Ok(())
    }

    async fn counts(&self) -> Result<StoreCounts, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(StoreCounts {
            users: tables.users.len(),
            clients: tables.clients.len(),
            cases: tables.cases.len(),
            case_updates: tables.case_updates.len(),
            deadlines: tables.deadlines.len(),
            documents: tables.documents.len(),
        })
    }
}
