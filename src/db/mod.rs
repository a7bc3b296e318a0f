//! Storage abstraction layer.
//!
//! Provides a backend-agnostic `Database` trait that unifies every persistence
//! operation of the practice: users, clients, cases, case updates (the case
//! timeline), deadlines and documents. One sub-trait exists per entity kind so
//! leaf consumers can depend on only what they touch.
//!
//! The only backend is [`memory::MemoryBackend`]: state lives in process
//! memory and is lost on restart. Callers construct it explicitly (see
//! [`connect_from_config`]) and share it as `Arc<dyn Database>`.

pub mod memory;
pub mod seed;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;

/// Process-local, auto-incrementing identifier. Unique per entity kind.
pub type EntityId = i32;

/// Build the in-memory store and, when configured, load the demonstration
/// dataset into it.
pub async fn connect_from_config(
    config: &crate::config::DatabaseConfig,
) -> Result<Arc<dyn Database>, DatabaseError> {
    let backend = memory::MemoryBackend::new();
    if config.seed_demo {
        let summary = seed::load_demo_data(&backend).await?;
        tracing::info!(
            clients = summary.clients,
            cases = summary.cases,
            deadlines = summary.deadlines,
            documents = summary.documents,
            "Seeded demonstration dataset"
        );
    }
    Ok(Arc::new(backend))
}

/// Entity kinds owned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Client,
    Case,
    CaseUpdate,
    Deadline,
    Document,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Client => "client",
            Self::Case => "case",
            Self::CaseUpdate => "case update",
            Self::Deadline => "deadline",
            Self::Document => "document",
        }
    }

    /// Capitalized form used in user-facing messages ("Client not found").
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Client => "Client",
            Self::Case => "Case",
            Self::CaseUpdate => "Case update",
            Self::Deadline => "Deadline",
            Self::Document => "Document",
        }
    }
}

/// Enumerated text column with a fixed set of accepted values.
pub trait FieldEnum: Sized + Copy {
    /// Canonical wire values, in declaration order.
    const ALLOWED: &'static [&'static str];

    fn as_str(self) -> &'static str;

    fn from_db_value(value: &str) -> Option<Self>;
}

/// Whether a client is a person (CPF) or a company (CNPJ).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    #[default]
    Individual,
    Organization,
}

impl FieldEnum for ClientType {
    const ALLOWED: &'static [&'static str] = &["individual", "organization"];

    fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Organization => "organization",
        }
    }

    /// Also accepts the Brazilian shorthand `PF` (pessoa física) and `PJ`
    /// (pessoa jurídica).
    fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "individual" | "PF" | "pf" => Some(Self::Individual),
            "organization" | "PJ" | "pj" => Some(Self::Organization),
            _ => None,
        }
    }
}

/// Case lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    #[default]
    Active,
    Closed,
    Archived,
    OnHold,
}

impl FieldEnum for CaseStatus {
    const ALLOWED: &'static [&'static str] = &["active", "closed", "archived", "on_hold"];

    fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
            Self::Archived => "archived",
            Self::OnHold => "on_hold",
        }
    }

    fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "closed" => Some(Self::Closed),
            "archived" => Some(Self::Archived),
            "on_hold" => Some(Self::OnHold),
            _ => None,
        }
    }
}

/// Deadline state as recorded by staff. Not recomputed from the due date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineStatus {
    #[default]
    Pending,
    Completed,
    Overdue,
}

impl FieldEnum for DeadlineStatus {
    const ALLOWED: &'static [&'static str] = &["pending", "completed", "overdue"];

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
        }
    }

    fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "overdue" => Some(Self::Overdue),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlinePriority {
    Low,
    #[default]
    Medium,
    High,
}

impl FieldEnum for DeadlinePriority {
    const ALLOWED: &'static [&'static str] = &["low", "medium", "high"];

    fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Finalized,
    Filed,
}

impl FieldEnum for DocumentStatus {
    const ALLOWED: &'static [&'static str] = &["draft", "finalized", "filed"];

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Finalized => "finalized",
            Self::Filed => "filed",
        }
    }

    fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "finalized" => Some(Self::Finalized),
            "filed" => Some(Self::Filed),
            _ => None,
        }
    }
}

// ==================== Records ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: EntityId,
    pub username: String,
    /// Never written to responses.
    #[serde(skip_serializing, default)]
    pub password: String,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserParams {
    pub username: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub id: EntityId,
    pub name: String,
    /// CPF or CNPJ, as entered.
    pub document_number: String,
    pub client_type: ClientType,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub active: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateClientParams {
    pub name: String,
    pub document_number: String,
    pub client_type: ClientType,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub active: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateClientParams {
    pub name: Option<String>,
    pub document_number: Option<String>,
    pub client_type: Option<ClientType>,
    pub phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub active: Option<bool>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub id: EntityId,
    /// Court tracking number (CNJ format in Brazilian courts).
    pub case_number: String,
    pub client_id: EntityId,
    pub court: Option<String>,
    pub jurisdiction: Option<String>,
    pub case_type: String,
    pub status: CaseStatus,
    pub filing_date: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::str_option", default)]
    pub case_value: Option<Decimal>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCaseParams {
    pub case_number: String,
    pub client_id: EntityId,
    pub court: Option<String>,
    pub jurisdiction: Option<String>,
    pub case_type: String,
    pub status: CaseStatus,
    pub filing_date: DateTime<Utc>,
    pub case_value: Option<Decimal>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCaseParams {
    pub case_number: Option<String>,
    pub client_id: Option<EntityId>,
    pub court: Option<Option<String>>,
    pub jurisdiction: Option<Option<String>>,
    pub case_type: Option<String>,
    pub status: Option<CaseStatus>,
    pub filing_date: Option<DateTime<Utc>>,
    pub case_value: Option<Option<Decimal>>,
    pub description: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

/// One entry in a case timeline (publication, petition, hearing, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseUpdateRecord {
    pub id: EntityId,
    pub case_id: EntityId,
    pub update_type: String,
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub recorded_by: String,
    pub is_important: bool,
}

#[derive(Debug, Clone)]
pub struct CreateCaseUpdateParams {
    pub case_id: EntityId,
    pub update_type: String,
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub recorded_by: String,
    pub is_important: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCaseUpdateParams {
    pub case_id: Option<EntityId>,
    pub update_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub date: Option<DateTime<Utc>>,
    pub recorded_by: Option<String>,
    pub is_important: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineRecord {
    pub id: EntityId,
    /// Deadlines may exist without a case (internal appointments).
    pub case_id: Option<EntityId>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub status: DeadlineStatus,
    pub priority: DeadlinePriority,
    /// Counted in business days (Mon-Fri) rather than calendar days.
    pub is_working_days: bool,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateDeadlineParams {
    pub case_id: Option<EntityId>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub status: DeadlineStatus,
    pub priority: DeadlinePriority,
    pub is_working_days: bool,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateDeadlineParams {
    pub case_id: Option<Option<EntityId>>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<DeadlineStatus>,
    pub priority: Option<DeadlinePriority>,
    pub is_working_days: Option<bool>,
    pub assigned_to: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: EntityId,
    pub case_id: Option<EntityId>,
    pub title: String,
    pub document_type: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: DocumentStatus,
    pub created_by: String,
}

#[derive(Debug, Clone)]
pub struct CreateDocumentParams {
    pub case_id: Option<EntityId>,
    pub title: String,
    pub document_type: String,
    pub content: String,
    pub status: DocumentStatus,
    pub created_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateDocumentParams {
    pub case_id: Option<Option<EntityId>>,
    pub title: Option<String>,
    pub document_type: Option<String>,
    pub content: Option<String>,
    pub status: Option<DocumentStatus>,
    pub created_by: Option<String>,
}

/// Record totals per entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCounts {
    pub users: usize,
    pub clients: usize,
    pub cases: usize,
    pub case_updates: usize,
    pub deadlines: usize,
    pub documents: usize,
}

/// Reduce a CPF/CNPJ to its digits so formatted and bare forms compare equal.
pub fn normalize_document_number(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Case numbers compare trimmed and case-insensitively.
pub fn normalize_case_number(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// ==================== Sub-traits ====================
//
// Each sub-trait groups the operations of one entity kind. The `Database`
// supertrait combines them all. Absence is never an error: lookups return
// `Ok(None)` and deletes `Ok(false)` for unknown ids.

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserRecord>, DatabaseError>;
    async fn get_user(&self, id: EntityId) -> Result<Option<UserRecord>, DatabaseError>;
    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, DatabaseError>;
    async fn create_user(&self, input: &CreateUserParams) -> Result<UserRecord, DatabaseError>;
    async fn update_user(
        &self,
        id: EntityId,
        input: &UpdateUserParams,
    ) -> Result<Option<UserRecord>, DatabaseError>;
    async fn delete_user(&self, id: EntityId) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn list_clients(&self) -> Result<Vec<ClientRecord>, DatabaseError>;
    async fn get_client(&self, id: EntityId) -> Result<Option<ClientRecord>, DatabaseError>;
    async fn create_client(
        &self,
        input: &CreateClientParams,
    ) -> Result<ClientRecord, DatabaseError>;
    async fn update_client(
        &self,
        id: EntityId,
        input: &UpdateClientParams,
    ) -> Result<Option<ClientRecord>, DatabaseError>;
    async fn delete_client(&self, id: EntityId) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn list_cases(&self) -> Result<Vec<CaseRecord>, DatabaseError>;
    async fn get_case(&self, id: EntityId) -> Result<Option<CaseRecord>, DatabaseError>;
    async fn list_cases_for_client(
        &self,
        client_id: EntityId,
    ) -> Result<Vec<CaseRecord>, DatabaseError>;
    async fn create_case(&self, input: &CreateCaseParams) -> Result<CaseRecord, DatabaseError>;
    async fn update_case(
        &self,
        id: EntityId,
        input: &UpdateCaseParams,
    ) -> Result<Option<CaseRecord>, DatabaseError>;
    async fn delete_case(&self, id: EntityId) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait CaseUpdateStore: Send + Sync {
    async fn list_case_updates(&self) -> Result<Vec<CaseUpdateRecord>, DatabaseError>;
    async fn get_case_update(
        &self,
        id: EntityId,
    ) -> Result<Option<CaseUpdateRecord>, DatabaseError>;
    /// Timeline of one case, most recent first.
    async fn list_case_updates_for_case(
        &self,
        case_id: EntityId,
    ) -> Result<Vec<CaseUpdateRecord>, DatabaseError>;
    async fn create_case_update(
        &self,
        input: &CreateCaseUpdateParams,
    ) -> Result<CaseUpdateRecord, DatabaseError>;
    async fn update_case_update(
        &self,
        id: EntityId,
        input: &UpdateCaseUpdateParams,
    ) -> Result<Option<CaseUpdateRecord>, DatabaseError>;
    async fn delete_case_update(&self, id: EntityId) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait DeadlineStore: Send + Sync {
    async fn list_deadlines(&self) -> Result<Vec<DeadlineRecord>, DatabaseError>;
    async fn get_deadline(&self, id: EntityId) -> Result<Option<DeadlineRecord>, DatabaseError>;
    /// Deadlines of one case, earliest due first.
    async fn list_deadlines_for_case(
        &self,
        case_id: EntityId,
    ) -> Result<Vec<DeadlineRecord>, DatabaseError>;
    /// Deadlines due in `[now, now + window_days]`, earliest first. Status is
    /// not consulted: a pending deadline whose date has passed drops out.
    async fn list_upcoming_deadlines(
        &self,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Result<Vec<DeadlineRecord>, DatabaseError>;
    async fn create_deadline(
        &self,
        input: &CreateDeadlineParams,
    ) -> Result<DeadlineRecord, DatabaseError>;
    async fn update_deadline(
        &self,
        id: EntityId,
        input: &UpdateDeadlineParams,
    ) -> Result<Option<DeadlineRecord>, DatabaseError>;
    async fn delete_deadline(&self, id: EntityId) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, DatabaseError>;
    async fn get_document(&self, id: EntityId) -> Result<Option<DocumentRecord>, DatabaseError>;
    async fn list_documents_for_case(
        &self,
        case_id: EntityId,
    ) -> Result<Vec<DocumentRecord>, DatabaseError>;
    async fn create_document(
        &self,
        input: &CreateDocumentParams,
    ) -> Result<DocumentRecord, DatabaseError>;
    async fn update_document(
        &self,
        id: EntityId,
        input: &UpdateDocumentParams,
    ) -> Result<Option<DocumentRecord>, DatabaseError>;
    async fn delete_document(&self, id: EntityId) -> Result<bool, DatabaseError>;
}

/// Backend-agnostic database supertrait.
#[async_trait]
pub trait Database:
    UserStore
    + ClientStore
    + CaseStore
    + CaseUpdateStore
    + DeadlineStore
    + DocumentStore
    + Send
    + Sync
{
    /// Drop every record and restart identity counters at 1.
    async fn reset(&self) -> Result<(), DatabaseError>;

    /// Number of stored records per entity kind.
    async fn counts(&self) -> Result<StoreCounts, DatabaseError>;
}
