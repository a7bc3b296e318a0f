//! Demonstration dataset: one user, three clients, five cases and their
//! timeline, deadlines and documents.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::{
    CaseStatus, CreateCaseParams, CreateCaseUpdateParams, CreateClientParams,
    CreateDeadlineParams, CreateDocumentParams, CreateUserParams, Database, DeadlinePriority,
    DeadlineStatus, DocumentStatus, EntityId, FieldEnum,
};
use crate::error::DatabaseError;
use crate::legal::schema::parse_timestamp;

const DEMO_SEED: &str = include_str!("demo_seed.toml");

/// Number of records inserted by a seed run, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub clients: usize,
    pub cases: usize,
    pub case_updates: usize,
    pub deadlines: usize,
    pub documents: usize,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    users: Vec<RawUser>,
    #[serde(default)]
    clients: Vec<RawClient>,
    #[serde(default)]
    cases: Vec<RawCase>,
    #[serde(default)]
    case_updates: Vec<RawCaseUpdate>,
    #[serde(default)]
    deadlines: Vec<RawDeadline>,
    #[serde(default)]
    documents: Vec<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    username: String,
    password: String,
    full_name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct RawClient {
    key: String,
    name: String,
    document_number: String,
    client_type: String,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    #[serde(default = "default_true")]
    active: bool,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCase {
    key: String,
    client: String,
    case_number: String,
    court: Option<String>,
    jurisdiction: Option<String>,
    case_type: String,
    status: Option<String>,
    filing_date: String,
    case_value: Option<String>,
    description: Option<String>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCaseUpdate {
    case: String,
    update_type: String,
    title: String,
    description: Option<String>,
    date: String,
    recorded_by: String,
    #[serde(default)]
    is_important: bool,
}

#[derive(Debug, Deserialize)]
struct RawDeadline {
    case: Option<String>,
    title: String,
    description: Option<String>,
    due_date: String,
    status: Option<String>,
    priority: Option<String>,
    #[serde(default = "default_true")]
    is_working_days: bool,
    assigned_to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    case: Option<String>,
    title: String,
    document_type: String,
    content: String,
    status: Option<String>,
    created_by: String,
}

fn default_true() -> bool {
    true
}

fn parse_enum<E: FieldEnum + Default>(field: &str, raw: Option<&str>) -> Result<E, DatabaseError> {
    match raw {
        None => Ok(E::default()),
        Some(value) => E::from_db_value(value).ok_or_else(|| invalid(field, value)),
    }
}

fn parse_date(field: &str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    parse_timestamp(raw).ok_or_else(|| invalid(field, raw))
}

fn invalid(field: &str, raw: &str) -> DatabaseError {
    DatabaseError::Seed(format!("invalid {} '{}'", field, raw))
}

fn resolve(
    keys: &HashMap<String, EntityId>,
    kind: &str,
    key: &str,
) -> Result<EntityId, DatabaseError> {
    keys.get(key)
        .copied()
        .ok_or_else(|| DatabaseError::Seed(format!("unknown {} key '{}'", kind, key)))
}

fn resolve_optional(
    keys: &HashMap<String, EntityId>,
    kind: &str,
    key: Option<&str>,
) -> Result<Option<EntityId>, DatabaseError> {
    key.map(|key| resolve(keys, kind, key)).transpose()
}

/// Load the bundled demonstration dataset into `db`.
pub async fn load_demo_data(db: &dyn Database) -> Result<SeedSummary, DatabaseError> {
    load_from_str(db, DEMO_SEED).await
}

/// Parse a seed document and insert it record by record through the store
/// traits, so uniqueness rules apply to seeded data too.
pub async fn load_from_str(db: &dyn Database, raw: &str) -> Result<SeedSummary, DatabaseError> {
    let parsed: SeedFile =
        toml::from_str(raw).map_err(|e| DatabaseError::Seed(format!("invalid TOML: {}", e)))?;
    let mut summary = SeedSummary::default();

    for user in parsed.users {
        db.create_user(&CreateUserParams {
            username: user.username,
            password: user.password,
            full_name: user.full_name,
            email: user.email,
        })
        .await?;
        summary.users += 1;
    }

    let mut client_ids = HashMap::new();
    for client in parsed.clients {
        let created = db
            .create_client(&CreateClientParams {
                name: client.name,
                document_number: client.document_number,
                client_type: parse_enum("client_type", Some(client.client_type.as_str()))?,
                phone: client.phone,
                email: client.email,
                address: client.address,
                active: client.active,
                notes: client.notes,
            })
            .await?;
        client_ids.insert(client.key, created.id);
        summary.clients += 1;
    }

    let mut case_ids = HashMap::new();
    for case in parsed.cases {
        let case_value = case
            .case_value
            .as_deref()
            .map(|raw| Decimal::from_str(raw).map_err(|_| invalid("case_value", raw)))
            .transpose()?;
        let created = db
            .create_case(&CreateCaseParams {
                case_number: case.case_number,
                client_id: resolve(&client_ids, "client", &case.client)?,
                court: case.court,
                jurisdiction: case.jurisdiction,
                case_type: case.case_type,
                status: parse_enum::<CaseStatus>("status", case.status.as_deref())?,
                filing_date: parse_date("filing_date", &case.filing_date)?,
                case_value,
                description: case.description,
                notes: case.notes,
            })
            .await?;
        case_ids.insert(case.key, created.id);
        summary.cases += 1;
    }

    for update in parsed.case_updates {
        db.create_case_update(&CreateCaseUpdateParams {
            case_id: resolve(&case_ids, "case", &update.case)?,
            update_type: update.update_type,
            title: update.title,
            description: update.description,
            date: parse_date("date", &update.date)?,
            recorded_by: update.recorded_by,
            is_important: update.is_important,
        })
        .await?;
        summary.case_updates += 1;
    }

    for deadline in parsed.deadlines {
        db.create_deadline(&CreateDeadlineParams {
            case_id: resolve_optional(&case_ids, "case", deadline.case.as_deref())?,
            title: deadline.title,
            description: deadline.description,
            due_date: parse_date("due_date", &deadline.due_date)?,
            status: parse_enum::<DeadlineStatus>("status", deadline.status.as_deref())?,
            priority: parse_enum::<DeadlinePriority>("priority", deadline.priority.as_deref())?,
            is_working_days: deadline.is_working_days,
            assigned_to: deadline.assigned_to,
        })
        .await?;
        summary.deadlines += 1;
    }

    for document in parsed.documents {
        db.create_document(&CreateDocumentParams {
            case_id: resolve_optional(&case_ids, "case", document.case.as_deref())?,
            title: document.title,
            document_type: document.document_type,
            content: document.content,
            status: parse_enum::<DocumentStatus>("status", document.status.as_deref())?,
            created_by: document.created_by,
        })
        .await?;
        summary.documents += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{SeedSummary, load_demo_data, load_from_str};
    use crate::db::memory::MemoryBackend;
    use crate::db::{
        CaseStore, CaseUpdateStore, ClientStore, ClientType, DeadlineStatus, DeadlineStore,
        DocumentStore, UserStore,
    };
    use crate::error::DatabaseError;

    #[tokio::test]
    async fn bundled_dataset_loads_completely() {
        let db = MemoryBackend::new();
        let summary = load_demo_data(&db).await.expect("seed should load");
        assert_eq!(
            summary,
            SeedSummary {
                users: 1,
                clients: 3,
                cases: 5,
                case_updates: 8,
                deadlines: 5,
                documents: 2,
            }
        );
    }

    #[tokio::test]
    async fn bundled_dataset_links_records_by_key() {
        let db = MemoryBackend::new();
        load_demo_data(&db).await.expect("seed should load");

        let silva = db.get_client(2).await.expect("get").expect("client 2");
        assert_eq!(silva.name, "João Silva");
        assert_eq!(silva.client_type, ClientType::Individual);

        let silva_cases: Vec<String> = db
            .list_cases_for_client(2)
            .await
            .expect("list")
            .into_iter()
            .map(|case| case.case_number)
            .collect();
        assert_eq!(
            silva_cases,
            vec!["0002345-67.2023.8.26.0100", "0004567-89.2023.8.26.0100"]
        );

        let timeline = db.list_case_updates_for_case(1).await.expect("timeline");
        assert_eq!(timeline.len(), 5);
        assert_eq!(timeline[0].title, "Publicação - Despacho Inicial");

        let overdue = db.list_deadlines_for_case(5).await.expect("deadlines");
        assert_eq!(overdue[0].status, DeadlineStatus::Overdue);

        assert_eq!(db.list_documents_for_case(1).await.expect("docs").len(), 2);
        assert!(
            db.get_user_by_username("demo")
                .await
                .expect("user")
                .is_some()
        );
    }

    #[tokio::test]
    async fn unknown_reference_key_is_rejected() {
        let db = MemoryBackend::new();
        let raw = r#"
[[cases]]
key = "orphan"
client = "missing"
case_number = "1"
case_type = "Test"
filing_date = "2024-01-01"
"#;
        let err = load_from_str(&db, raw).await.expect_err("missing client");
        assert!(matches!(err, DatabaseError::Seed(ref msg) if msg.contains("missing")));
    }

    #[tokio::test]
    async fn invalid_enum_value_is_rejected() {
        let db = MemoryBackend::new();
        let raw = r#"
[[clients]]
key = "x"
name = "X"
document_number = "1"
client_type = "company"
"#;
        assert!(load_from_str(&db, raw).await.is_err());
    }
}
