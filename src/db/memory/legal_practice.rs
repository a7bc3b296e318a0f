use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use crate::db::{
    CaseRecord, CaseStore, CaseUpdateRecord, CaseUpdateStore, ClientRecord, ClientStore,
    CreateCaseParams, CreateCaseUpdateParams, CreateClientParams, CreateDeadlineParams,
    CreateDocumentParams, CreateUserParams, DeadlineRecord, DeadlineStore, DocumentRecord,
    DocumentStore, EntityId, UpdateCaseParams, UpdateCaseUpdateParams, UpdateClientParams,
    UpdateDeadlineParams, UpdateDocumentParams, UpdateUserParams, UserRecord, UserStore,
    normalize_case_number, normalize_document_number,
};
use crate::error::DatabaseError;

use super::{MemoryBackend, Table};

/// Overwrite `slot` when the patch carries a value for it.
fn merge<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *slot = value.clone();
    }
}

/// Fail with `Conflict` when a row other than `except` already maps to `key`.
fn ensure_unique(
    mut existing: impl Iterator<Item = (EntityId, String)>,
    except: Option<EntityId>,
    key: &str,
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), DatabaseError> {
    if existing.any(|(id, existing_key)| Some(id) != except && existing_key == key) {
        return Err(DatabaseError::Conflict {
            entity,
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn ensure_unique_username(
    table: &Table<UserRecord>,
    except: Option<EntityId>,
    username: &str,
) -> Result<(), DatabaseError> {
    ensure_unique(
        table.values().map(|row| (row.id, row.username.clone())),
        except,
        username,
        "user",
        "username",
        username,
    )
}

fn ensure_unique_document_number(
    table: &Table<ClientRecord>,
    except: Option<EntityId>,
    document_number: &str,
) -> Result<(), DatabaseError> {
    let key = normalize_document_number(document_number);
    if key.is_empty() {
        return Ok(());
    }
    ensure_unique(
        table
            .values()
            .map(|row| (row.id, normalize_document_number(&row.document_number))),
        except,
        &key,
        "client",
        "documentNumber",
        document_number,
    )
}

fn ensure_unique_case_number(
    table: &Table<CaseRecord>,
    except: Option<EntityId>,
    case_number: &str,
) -> Result<(), DatabaseError> {
    ensure_unique(
        table
            .values()
            .map(|row| (row.id, normalize_case_number(&row.case_number))),
        except,
        &normalize_case_number(case_number),
        "case",
        "caseNumber",
        case_number,
    )
}

#[async_trait]
impl UserStore for MemoryBackend {
    async fn list_users(&self) -> Result<Vec<UserRecord>, DatabaseError> {
        Ok(self.tables.read().await.users.all())
    }

    async fn get_user(&self, id: EntityId) -> Result<Option<UserRecord>, DatabaseError> {
        Ok(self.tables.read().await.users.get(id))
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, input: &CreateUserParams) -> Result<UserRecord, DatabaseError> {
        let mut tables = self.tables.write().await;
        ensure_unique_username(&tables.users, None, &input.username)?;
        tables.users.insert_with(|id| UserRecord {
            id,
            username: input.username.clone(),
            password: input.password.clone(),
            full_name: input.full_name.clone(),
            email: input.email.clone(),
        })
    }

    async fn update_user(
        &self,
        id: EntityId,
        input: &UpdateUserParams,
    ) -> Result<Option<UserRecord>, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains(id) {
            return Ok(None);
        }
        if let Some(username) = input.username.as_deref() {
            ensure_unique_username(&tables.users, Some(id), username)?;
        }
        Ok(tables.users.update_with(id, |user| {
            merge(&mut user.username, &input.username);
            merge(&mut user.password, &input.password);
            merge(&mut user.full_name, &input.full_name);
            merge(&mut user.email, &input.email);
        }))
    }

    async fn delete_user(&self, id: EntityId) -> Result<bool, DatabaseError> {
        Ok(self.tables.write().await.users.remove(id))
    }
}

#[async_trait]
impl ClientStore for MemoryBackend {
    async fn list_clients(&self) -> Result<Vec<ClientRecord>, DatabaseError> {
        Ok(self.tables.read().await.clients.all())
    }

    async fn get_client(&self, id: EntityId) -> Result<Option<ClientRecord>, DatabaseError> {
        Ok(self.tables.read().await.clients.get(id))
    }

    async fn create_client(
        &self,
        input: &CreateClientParams,
    ) -> Result<ClientRecord, DatabaseError> {
        let mut tables = self.tables.write().await;
        ensure_unique_document_number(&tables.clients, None, &input.document_number)?;
        tables.clients.insert_with(|id| ClientRecord {
            id,
            name: input.name.clone(),
            document_number: input.document_number.clone(),
            client_type: input.client_type,
            phone: input.phone.clone(),
            email: input.email.clone(),
            address: input.address.clone(),
            active: input.active,
            notes: input.notes.clone(),
        })
    }

    async fn update_client(
        &self,
        id: EntityId,
        input: &UpdateClientParams,
    ) -> Result<Option<ClientRecord>, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.clients.contains(id) {
            return Ok(None);
        }
        if let Some(document_number) = input.document_number.as_deref() {
            ensure_unique_document_number(&tables.clients, Some(id), document_number)?;
        }
        Ok(tables.clients.update_with(id, |client| {
            merge(&mut client.name, &input.name);
            merge(&mut client.document_number, &input.document_number);
            merge(&mut client.client_type, &input.client_type);
            merge(&mut client.phone, &input.phone);
            merge(&mut client.email, &input.email);
            merge(&mut client.address, &input.address);
            merge(&mut client.active, &input.active);
            merge(&mut client.notes, &input.notes);
        }))
    }

    async fn delete_client(&self, id: EntityId) -> Result<bool, DatabaseError> {
        let removed = self.tables.write().await.clients.remove(id);
        if removed {
            tracing::debug!(client_id = id, "Client removed; dependent cases are kept");
        }
        Ok(removed)
    }
}

#[async_trait]
impl CaseStore for MemoryBackend {
    async fn list_cases(&self) -> Result<Vec<CaseRecord>, DatabaseError> {
        Ok(self.tables.read().await.cases.all())
    }

    async fn get_case(&self, id: EntityId) -> Result<Option<CaseRecord>, DatabaseError> {
        Ok(self.tables.read().await.cases.get(id))
    }

    async fn list_cases_for_client(
        &self,
        client_id: EntityId,
    ) -> Result<Vec<CaseRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .cases
            .values()
            .filter(|case| case.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn create_case(&self, input: &CreateCaseParams) -> Result<CaseRecord, DatabaseError> {
        let mut tables = self.tables.write().await;
        ensure_unique_case_number(&tables.cases, None, &input.case_number)?;
        tables.cases.insert_with(|id| CaseRecord {
            id,
            case_number: input.case_number.clone(),
            client_id: input.client_id,
            court: input.court.clone(),
            jurisdiction: input.jurisdiction.clone(),
            case_type: input.case_type.clone(),
            status: input.status,
            filing_date: input.filing_date,
            case_value: input.case_value,
            description: input.description.clone(),
            notes: input.notes.clone(),
        })
    }

    async fn update_case(
        &self,
        id: EntityId,
        input: &UpdateCaseParams,
    ) -> Result<Option<CaseRecord>, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.cases.contains(id) {
            return Ok(None);
        }
        if let Some(case_number) = input.case_number.as_deref() {
            ensure_unique_case_number(&tables.cases, Some(id), case_number)?;
        }
        Ok(tables.cases.update_with(id, |case| {
            merge(&mut case.case_number, &input.case_number);
            merge(&mut case.client_id, &input.client_id);
            merge(&mut case.court, &input.court);
            merge(&mut case.jurisdiction, &input.jurisdiction);
            merge(&mut case.case_type, &input.case_type);
            merge(&mut case.status, &input.status);
            merge(&mut case.filing_date, &input.filing_date);
            merge(&mut case.case_value, &input.case_value);
            merge(&mut case.description, &input.description);
            merge(&mut case.notes, &input.notes);
        }))
    }

    async fn delete_case(&self, id: EntityId) -> Result<bool, DatabaseError> {
        Ok(self.tables.write().await.cases.remove(id))
    }
}

#[async_trait]
impl CaseUpdateStore for MemoryBackend {
    async fn list_case_updates(&self) -> Result<Vec<CaseUpdateRecord>, DatabaseError> {
        Ok(self.tables.read().await.case_updates.all())
    }

    async fn get_case_update(
        &self,
        id: EntityId,
    ) -> Result<Option<CaseUpdateRecord>, DatabaseError> {
        Ok(self.tables.read().await.case_updates.get(id))
    }

    async fn list_case_updates_for_case(
        &self,
        case_id: EntityId,
    ) -> Result<Vec<CaseUpdateRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut updates: Vec<CaseUpdateRecord> = tables
            .case_updates
            .values()
            .filter(|update| update.case_id == case_id)
            .cloned()
            .collect();
        // Stable sort: equal dates keep insertion order.
        updates.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(updates)
    }

    async fn create_case_update(
        &self,
        input: &CreateCaseUpdateParams,
    ) -> Result<CaseUpdateRecord, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.case_updates.insert_with(|id| CaseUpdateRecord {
            id,
            case_id: input.case_id,
            update_type: input.update_type.clone(),
            title: input.title.clone(),
            description: input.description.clone(),
            date: input.date,
            recorded_by: input.recorded_by.clone(),
            is_important: input.is_important,
        })
    }

    async fn update_case_update(
        &self,
        id: EntityId,
        input: &UpdateCaseUpdateParams,
    ) -> Result<Option<CaseUpdateRecord>, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables.case_updates.update_with(id, |update| {
            merge(&mut update.case_id, &input.case_id);
            merge(&mut update.update_type, &input.update_type);
            merge(&mut update.title, &input.title);
            merge(&mut update.description, &input.description);
            merge(&mut update.date, &input.date);
            merge(&mut update.recorded_by, &input.recorded_by);
            merge(&mut update.is_important, &input.is_important);
        }))
    }

    async fn delete_case_update(&self, id: EntityId) -> Result<bool, DatabaseError> {
        Ok(self.tables.write().await.case_updates.remove(id))
    }
}

fn sort_by_due_date(deadlines: &mut [DeadlineRecord]) {
    deadlines.sort_by(|a, b| a.due_date.cmp(&b.due_date));
}

#[async_trait]
impl DeadlineStore for MemoryBackend {
    async fn list_deadlines(&self) -> Result<Vec<DeadlineRecord>, DatabaseError> {
        Ok(self.tables.read().await.deadlines.all())
    }

    async fn get_deadline(&self, id: EntityId) -> Result<Option<DeadlineRecord>, DatabaseError> {
        Ok(self.tables.read().await.deadlines.get(id))
    }

    async fn list_deadlines_for_case(
        &self,
        case_id: EntityId,
    ) -> Result<Vec<DeadlineRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut deadlines: Vec<DeadlineRecord> = tables
            .deadlines
            .values()
            .filter(|deadline| deadline.case_id == Some(case_id))
            .cloned()
            .collect();
        sort_by_due_date(&mut deadlines);
        Ok(deadlines)
    }

    async fn list_upcoming_deadlines(
        &self,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Result<Vec<DeadlineRecord>, DatabaseError> {
        // An unrepresentable window end means "no upper bound".
        let until =
            TimeDelta::try_days(window_days).and_then(|window| now.checked_add_signed(window));
        let tables = self.tables.read().await;
        let mut deadlines: Vec<DeadlineRecord> = tables
            .deadlines
            .values()
            .filter(|deadline| {
                deadline.due_date >= now && until.is_none_or(|until| deadline.due_date <= until)
            })
            .cloned()
            .collect();
        sort_by_due_date(&mut deadlines);
        Ok(deadlines)
    }

    async fn create_deadline(
        &self,
        input: &CreateDeadlineParams,
    ) -> Result<DeadlineRecord, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.deadlines.insert_with(|id| DeadlineRecord {
            id,
            case_id: input.case_id,
            title: input.title.clone(),
            description: input.description.clone(),
            due_date: input.due_date,
            status: input.status,
            priority: input.priority,
            is_working_days: input.is_working_days,
            assigned_to: input.assigned_to.clone(),
        })
    }

    async fn update_deadline(
        &self,
        id: EntityId,
        input: &UpdateDeadlineParams,
    ) -> Result<Option<DeadlineRecord>, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables.deadlines.update_with(id, |deadline| {
            merge(&mut deadline.case_id, &input.case_id);
            merge(&mut deadline.title, &input.title);
            merge(&mut deadline.description, &input.description);
            merge(&mut deadline.due_date, &input.due_date);
            merge(&mut deadline.status, &input.status);
            merge(&mut deadline.priority, &input.priority);
            merge(&mut deadline.is_working_days, &input.is_working_days);
            merge(&mut deadline.assigned_to, &input.assigned_to);
        }))
    }

    async fn delete_deadline(&self, id: EntityId) -> Result<bool, DatabaseError> {
        Ok(self.tables.write().await.deadlines.remove(id))
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, DatabaseError> {
        Ok(self.tables.read().await.documents.all())
    }

    async fn get_document(&self, id: EntityId) -> Result<Option<DocumentRecord>, DatabaseError> {
        Ok(self.tables.read().await.documents.get(id))
    }

    async fn list_documents_for_case(
        &self,
        case_id: EntityId,
    ) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .documents
            .values()
            .filter(|document| document.case_id == Some(case_id))
            .cloned()
            .collect())
    }

    async fn create_document(
        &self,
        input: &CreateDocumentParams,
    ) -> Result<DocumentRecord, DatabaseError> {
        let now = self.now();
        let mut tables = self.tables.write().await;
        tables.documents.insert_with(|id| DocumentRecord {
            id,
            case_id: input.case_id,
            title: input.title.clone(),
            document_type: input.document_type.clone(),
            content: input.content.clone(),
            created_at: now,
            updated_at: now,
            status: input.status,
            created_by: input.created_by.clone(),
        })
    }

    async fn update_document(
        &self,
        id: EntityId,
        input: &UpdateDocumentParams,
    ) -> Result<Option<DocumentRecord>, DatabaseError> {
        let now = self.now();
        let mut tables = self.tables.write().await;
        Ok(tables.documents.update_with(id, |document| {
            merge(&mut document.case_id, &input.case_id);
            merge(&mut document.title, &input.title);
            merge(&mut document.document_type, &input.document_type);
            merge(&mut document.content, &input.content);
            merge(&mut document.status, &input.status);
            merge(&mut document.created_by, &input.created_by);
            document.updated_at = now;
        }))
    }

    async fn delete_document(&self, id: EntityId) -> Result<bool, DatabaseError> {
        Ok(self.tables.write().await.documents.remove(id))
    }
}
