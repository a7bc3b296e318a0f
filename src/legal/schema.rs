//! Payload validation for every entity kind.
//!
//! Each `Create*Params` type is an [`InsertShape`]: the fields a caller may
//! supply on create, without server-assigned ones. Each `Update*Params` type
//! is a [`PatchShape`]: the same fields, all optional. Validation walks the
//! whole payload and reports every violated field at once.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::db::{
    CaseStatus, ClientType, CreateCaseParams, CreateCaseUpdateParams, CreateClientParams,
    CreateDeadlineParams, CreateDocumentParams, CreateUserParams, DeadlinePriority,
    DeadlineStatus, DocumentStatus, EntityId, EntityKind, FieldEnum, UpdateCaseParams,
    UpdateCaseUpdateParams, UpdateClientParams, UpdateDeadlineParams, UpdateDocumentParams,
    UpdateUserParams,
};
use crate::error::{FieldError, FieldErrorCode, ValidationError};
use crate::legal::docgen::GenerateDocument;

/// Parse a wire timestamp: RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]`
/// (read as UTC) or a bare `YYYY-MM-DD` (UTC midnight).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = raw.parse::<NaiveDateTime>() {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Insert payload for one entity kind.
pub trait InsertShape: Sized {
    const KIND: EntityKind;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError>;
}

/// Partial-update payload for one entity kind.
pub trait PatchShape: Sized {
    const KIND: EntityKind;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError>;
}

/// A create payload that passed validation, tagged by entity kind.
#[derive(Debug, Clone)]
pub enum ValidatedPayload {
    User(CreateUserParams),
    Client(CreateClientParams),
    Case(CreateCaseParams),
    CaseUpdate(CreateCaseUpdateParams),
    Deadline(CreateDeadlineParams),
    Document(CreateDocumentParams),
}

#[derive(Debug, Clone)]
pub enum ValidatedPatch {
    User(UpdateUserParams),
    Client(UpdateClientParams),
    Case(UpdateCaseParams),
    CaseUpdate(UpdateCaseUpdateParams),
    Deadline(UpdateDeadlineParams),
    Document(UpdateDocumentParams),
}

pub fn validate(kind: EntityKind, payload: &Value) -> Result<ValidatedPayload, ValidationError> {
    Ok(match kind {
        EntityKind::User => ValidatedPayload::User(CreateUserParams::from_payload(payload)?),
        EntityKind::Client => ValidatedPayload::Client(CreateClientParams::from_payload(payload)?),
        EntityKind::Case => ValidatedPayload::Case(CreateCaseParams::from_payload(payload)?),
        EntityKind::CaseUpdate => {
            ValidatedPayload::CaseUpdate(CreateCaseUpdateParams::from_payload(payload)?)
        }
        EntityKind::Deadline => {
            ValidatedPayload::Deadline(CreateDeadlineParams::from_payload(payload)?)
        }
        EntityKind::Document => {
            ValidatedPayload::Document(CreateDocumentParams::from_payload(payload)?)
        }
    })
}

pub fn validate_patch(
    kind: EntityKind,
    payload: &Value,
) -> Result<ValidatedPatch, ValidationError> {
    Ok(match kind {
        EntityKind::User => ValidatedPatch::User(UpdateUserParams::from_payload(payload)?),
        EntityKind::Client => ValidatedPatch::Client(UpdateClientParams::from_payload(payload)?),
        EntityKind::Case => ValidatedPatch::Case(UpdateCaseParams::from_payload(payload)?),
        EntityKind::CaseUpdate => {
            ValidatedPatch::CaseUpdate(UpdateCaseUpdateParams::from_payload(payload)?)
        }
        EntityKind::Deadline => {
            ValidatedPatch::Deadline(UpdateDeadlineParams::from_payload(payload)?)
        }
        EntityKind::Document => {
            ValidatedPatch::Document(UpdateDocumentParams::from_payload(payload)?)
        }
    })
}

// ==================== Field converters ====================

type Problem = (FieldErrorCode, String);

fn wrong_type(expected: &str) -> Problem {
    (FieldErrorCode::InvalidType, format!("must be {}", expected))
}

fn invalid(message: String) -> Problem {
    (FieldErrorCode::InvalidValue, message)
}

/// Required text: a non-blank string, stored trimmed.
fn text(value: &Value) -> Result<String, Problem> {
    let raw = value.as_str().ok_or_else(|| wrong_type("a string"))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err((FieldErrorCode::Required, "must not be blank".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Optional text is kept as given.
fn free_text(value: &Value) -> Result<String, Problem> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| wrong_type("a string"))
}

fn id(value: &Value) -> Result<EntityId, Problem> {
    let raw = value.as_i64().ok_or_else(|| wrong_type("an integer"))?;
    match EntityId::try_from(raw) {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(invalid("must be a positive identifier".to_string())),
    }
}

fn flag(value: &Value) -> Result<bool, Problem> {
    value.as_bool().ok_or_else(|| wrong_type("a boolean"))
}

fn timestamp(value: &Value) -> Result<DateTime<Utc>, Problem> {
    let raw = value
        .as_str()
        .ok_or_else(|| wrong_type("an ISO-8601 date string"))?;
    parse_timestamp(raw).ok_or_else(|| invalid(format!("'{}' is not a valid date", raw)))
}

fn decimal(value: &Value) -> Result<Decimal, Problem> {
    let raw = value
        .as_str()
        .ok_or_else(|| wrong_type("a string like \"1500.00\""))?;
    Decimal::from_str(raw.trim()).map_err(|_| invalid(format!("'{}' is not a decimal", raw)))
}

fn object(value: &Value) -> Result<Value, Problem> {
    if value.is_object() {
        Ok(value.clone())
    } else {
        Err(wrong_type("an object"))
    }
}

fn choice<E: FieldEnum>(value: &Value) -> Result<E, Problem> {
    let raw = value.as_str().ok_or_else(|| wrong_type("a string"))?;
    let allowed = E::ALLOWED.join(", ");
    E::from_db_value(raw).ok_or_else(|| invalid(format!("must be one of: {}", allowed)))
}

// ==================== Field reader ====================

enum Slot<'a> {
    Absent,
    Null,
    Present(&'a Value),
}

/// Pulls typed fields out of a JSON object while collecting violations.
/// Keys that are never read (unknown or server-assigned) are ignored.
struct FieldReader<'a> {
    kind: EntityKind,
    object: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    fn new(kind: EntityKind, payload: &'a Value) -> Result<Self, ValidationError> {
        let object = payload.as_object().ok_or_else(|| {
            ValidationError::single(
                kind.as_str(),
                FieldError::new(
                    "",
                    FieldErrorCode::InvalidType,
                    "payload must be a JSON object",
                ),
            )
        })?;
        Ok(Self {
            kind,
            object,
            errors: Vec::new(),
        })
    }

    fn slot(&self, field: &str) -> Slot<'a> {
        match self.object.get(field) {
            None => Slot::Absent,
            Some(Value::Null) => Slot::Null,
            Some(value) => Slot::Present(value),
        }
    }

    fn convert<T>(
        &mut self,
        field: &str,
        value: &Value,
        conv: impl Fn(&Value) -> Result<T, Problem>,
    ) -> Option<T> {
        match conv(value) {
            Ok(parsed) => Some(parsed),
            Err((code, message)) => {
                let message = format!("{} {}", field, message);
                self.errors.push(FieldError::new(field, code, message));
                None
            }
        }
    }

    /// Must be present and non-null.
    fn required<T>(
        &mut self,
        field: &str,
        conv: impl Fn(&Value) -> Result<T, Problem>,
    ) -> Option<T> {
        match self.slot(field) {
            Slot::Present(value) => self.convert(field, value, conv),
            Slot::Absent | Slot::Null => {
                self.errors.push(FieldError::new(
                    field,
                    FieldErrorCode::Required,
                    format!("{} is required", field),
                ));
                None
            }
        }
    }

    /// Absent or null reads as `None`.
    fn optional<T>(
        &mut self,
        field: &str,
        conv: impl Fn(&Value) -> Result<T, Problem>,
    ) -> Option<T> {
        match self.slot(field) {
            Slot::Present(value) => self.convert(field, value, conv),
            Slot::Absent | Slot::Null => None,
        }
    }

    /// Patch of a non-nullable field: absent leaves it alone, null is rejected.
    fn patch<T>(&mut self, field: &str, conv: impl Fn(&Value) -> Result<T, Problem>) -> Option<T> {
        match self.slot(field) {
            Slot::Absent => None,
            Slot::Null => {
                self.errors.push(FieldError::new(
                    field,
                    FieldErrorCode::InvalidType,
                    format!("{} may not be null", field),
                ));
                None
            }
            Slot::Present(value) => self.convert(field, value, conv),
        }
    }

    /// Patch of a nullable field: null clears it.
    fn patch_nullable<T>(
        &mut self,
        field: &str,
        conv: impl Fn(&Value) -> Result<T, Problem>,
    ) -> Option<Option<T>> {
        match self.slot(field) {
            Slot::Absent => None,
            Slot::Null => Some(None),
            Slot::Present(value) => self.convert(field, value, conv).map(Some),
        }
    }

    fn finish<T>(self, shape: T) -> Result<T, ValidationError> {
        if self.errors.is_empty() {
            Ok(shape)
        } else {
            Err(ValidationError {
                entity: self.kind.as_str(),
                errors: self.errors,
            })
        }
    }
}

// ==================== Insert shapes ====================

impl InsertShape for CreateUserParams {
    const KIND: EntityKind = EntityKind::User;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(Self::KIND, payload)?;
        let username = r.required("username", text);
        let password = r.required("password", free_text);
        let full_name = r.required("fullName", text);
        let email = r.required("email", text);
        r.finish(Self {
            username: username.unwrap_or_default(),
            password: password.unwrap_or_default(),
            full_name: full_name.unwrap_or_default(),
            email: email.unwrap_or_default(),
        })
    }
}

impl InsertShape for CreateClientParams {
    const KIND: EntityKind = EntityKind::Client;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(Self::KIND, payload)?;
        let name = r.required("name", text);
        let document_number = r.required("documentNumber", text);
        let client_type = r.required("clientType", choice::<ClientType>);
        let phone = r.optional("phone", free_text);
        let email = r.optional("email", free_text);
        let address = r.optional("address", free_text);
        let active = r.optional("active", flag);
        let notes = r.optional("notes", free_text);
        r.finish(Self {
            name: name.unwrap_or_default(),
            document_number: document_number.unwrap_or_default(),
            client_type: client_type.unwrap_or_default(),
            phone,
            email,
            address,
            active: active.unwrap_or(true),
            notes,
        })
    }
}

impl InsertShape for CreateCaseParams {
    const KIND: EntityKind = EntityKind::Case;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(Self::KIND, payload)?;
        let case_number = r.required("caseNumber", text);
        let client_id = r.required("clientId", id);
        let court = r.optional("court", free_text);
        let jurisdiction = r.optional("jurisdiction", free_text);
        let case_type = r.required("caseType", text);
        let status = r.optional("status", choice::<CaseStatus>);
        let filing_date = r.required("filingDate", timestamp);
        let case_value = r.optional("caseValue", decimal);
        let description = r.optional("description", free_text);
        let notes = r.optional("notes", free_text);
        r.finish(Self {
            case_number: case_number.unwrap_or_default(),
            client_id: client_id.unwrap_or_default(),
            court,
            jurisdiction,
            case_type: case_type.unwrap_or_default(),
            status: status.unwrap_or_default(),
            filing_date: filing_date.unwrap_or_default(),
            case_value,
            description,
            notes,
        })
    }
}

impl InsertShape for CreateCaseUpdateParams {
    const KIND: EntityKind = EntityKind::CaseUpdate;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(Self::KIND, payload)?;
        let case_id = r.required("caseId", id);
        let update_type = r.required("updateType", text);
        let title = r.required("title", text);
        let description = r.optional("description", free_text);
        let date = r.required("date", timestamp);
        let recorded_by = r.required("recordedBy", text);
        let is_important = r.optional("isImportant", flag);
        r.finish(Self {
            case_id: case_id.unwrap_or_default(),
            update_type: update_type.unwrap_or_default(),
            title: title.unwrap_or_default(),
            description,
            date: date.unwrap_or_default(),
            recorded_by: recorded_by.unwrap_or_default(),
            is_important: is_important.unwrap_or(false),
        })
    }
}

impl InsertShape for CreateDeadlineParams {
    const KIND: EntityKind = EntityKind::Deadline;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(Self::KIND, payload)?;
        let case_id = r.optional("caseId", id);
        let title = r.required("title", text);
        let description = r.optional("description", free_text);
        let due_date = r.required("dueDate", timestamp);
        let status = r.optional("status", choice::<DeadlineStatus>);
        let priority = r.optional("priority", choice::<DeadlinePriority>);
        let is_working_days = r.optional("isWorkingDays", flag);
        let assigned_to = r.optional("assignedTo", free_text);
        r.finish(Self {
            case_id,
            title: title.unwrap_or_default(),
            description,
            due_date: due_date.unwrap_or_default(),
            status: status.unwrap_or_default(),
            priority: priority.unwrap_or_default(),
            is_working_days: is_working_days.unwrap_or(true),
            assigned_to,
        })
    }
}

impl InsertShape for CreateDocumentParams {
    const KIND: EntityKind = EntityKind::Document;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(Self::KIND, payload)?;
        let case_id = r.optional("caseId", id);
        let title = r.required("title", text);
        let document_type = r.required("documentType", text);
        let content = r.required("content", free_text);
        let status = r.optional("status", choice::<DocumentStatus>);
        let created_by = r.required("createdBy", text);
        r.finish(Self {
            case_id,
            title: title.unwrap_or_default(),
            document_type: document_type.unwrap_or_default(),
            content: content.unwrap_or_default(),
            status: status.unwrap_or_default(),
            created_by: created_by.unwrap_or_default(),
        })
    }
}

/// Document generation request: a draft document rendered from `template`.
impl InsertShape for GenerateDocument {
    const KIND: EntityKind = EntityKind::Document;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(Self::KIND, payload)?;
        let title = r.required("title", text);
        let document_type = r.required("documentType", text);
        let template = r.required("template", free_text);
        let created_by = r.required("createdBy", text);
        let extra = r.optional("extra", object);
        r.finish(Self {
            title: title.unwrap_or_default(),
            document_type: document_type.unwrap_or_default(),
            template: template.unwrap_or_default(),
            created_by: created_by.unwrap_or_default(),
            extra,
        })
    }
}

// ==================== Patch shapes ====================

impl PatchShape for UpdateUserParams {
    const KIND: EntityKind = EntityKind::User;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(Self::KIND, payload)?;
        let patch = Self {
            username: r.patch("username", text),
            password: r.patch("password", free_text),
            full_name: r.patch("fullName", text),
            email: r.patch("email", text),
        };
        r.finish(patch)
    }
}

impl PatchShape for UpdateClientParams {
    const KIND: EntityKind = EntityKind::Client;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(Self::KIND, payload)?;
        let patch = Self {
            name: r.patch("name", text),
            document_number: r.patch("documentNumber", text),
            client_type: r.patch("clientType", choice::<ClientType>),
            phone: r.patch_nullable("phone", free_text),
            email: r.patch_nullable("email", free_text),
            address: r.patch_nullable("address", free_text),
            active: r.patch("active", flag),
            notes: r.patch_nullable("notes", free_text),
        };
        r.finish(patch)
    }
}

impl PatchShape for UpdateCaseParams {
    const KIND: EntityKind = EntityKind::Case;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(Self::KIND, payload)?;
        let patch = Self {
            case_number: r.patch("caseNumber", text),
            client_id: r.patch("clientId", id),
            court: r.patch_nullable("court", free_text),
            jurisdiction: r.patch_nullable("jurisdiction", free_text),
            case_type: r.patch("caseType", text),
            status: r.patch("status", choice::<CaseStatus>),
            filing_date: r.patch("filingDate", timestamp),
            case_value: r.patch_nullable("caseValue", decimal),
            description: r.patch_nullable("description", free_text),
            notes: r.patch_nullable("notes", free_text),
        };
        r.finish(patch)
    }
}

impl PatchShape for UpdateCaseUpdateParams {
    const KIND: EntityKind = EntityKind::CaseUpdate;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(Self::KIND, payload)?;
        let patch = Self {
            case_id: r.patch("caseId", id),
            update_type: r.patch("updateType", text),
            title: r.patch("title", text),
            description: r.patch_nullable("description", free_text),
            date: r.patch("date", timestamp),
            recorded_by: r.patch("recordedBy", text),
            is_important: r.patch("isImportant", flag),
        };
        r.finish(patch)
    }
}

impl PatchShape for UpdateDeadlineParams {
    const KIND: EntityKind = EntityKind::Deadline;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(Self::KIND, payload)?;
        let patch = Self {
            case_id: r.patch_nullable("caseId", id),
            title: r.patch("title", text),
            description: r.patch_nullable("description", free_text),
            due_date: r.patch("dueDate", timestamp),
            status: r.patch("status", choice::<DeadlineStatus>),
            priority: r.patch("priority", choice::<DeadlinePriority>),
            is_working_days: r.patch("isWorkingDays", flag),
            assigned_to: r.patch_nullable("assignedTo", free_text),
        };
        r.finish(patch)
    }
}

impl PatchShape for UpdateDocumentParams {
    const KIND: EntityKind = EntityKind::Document;

    fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(Self::KIND, payload)?;
        let patch = Self {
            case_id: r.patch_nullable("caseId", id),
            title: r.patch("title", text),
            document_type: r.patch("documentType", text),
            content: r.patch("content", free_text),
            status: r.patch("status", choice::<DocumentStatus>),
            created_by: r.patch("createdBy", text),
        };
        r.finish(patch)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn codes(err: &ValidationError) -> Vec<(&str, FieldErrorCode)> {
        err.errors
            .iter()
            .map(|e| (e.field.as_str(), e.code))
            .collect()
    }

    #[test]
    fn timestamps_accept_three_forms() {
        let midnight = Utc
            .with_ymd_and_hms(2023, 7, 5, 0, 0, 0)
            .single()
            .expect("valid date");
        assert_eq!(parse_timestamp("2023-07-05"), Some(midnight));
        assert_eq!(parse_timestamp("2023-07-05T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2023-07-05T03:00:00+03:00"), Some(midnight));
        assert_eq!(
            parse_timestamp("2023-07-05T11:30:00"),
            Some(midnight + chrono::TimeDelta::minutes(11 * 60 + 30))
        );
        assert_eq!(parse_timestamp("05/07/2023"), None);
    }

    #[test]
    fn client_insert_applies_defaults_and_strips_server_keys() {
        let client = CreateClientParams::from_payload(&json!({
            "id": 99,
            "name": "  Jane Doe ",
            "documentNumber": "123.456.789-00",
            "clientType": "individual",
            "somethingElse": true
        }))
        .expect("valid client");
        assert_eq!(client.name, "Jane Doe");
        assert_eq!(client.client_type, ClientType::Individual);
        assert!(client.active);
        assert_eq!(client.phone, None);
    }

    #[test]
    fn client_insert_reports_every_violation() {
        let err = CreateClientParams::from_payload(&json!({
            "documentNumber": 12345,
            "clientType": "company",
            "active": "yes"
        }))
        .expect_err("invalid client");
        assert_eq!(err.entity, "client");
        assert_eq!(
            codes(&err),
            vec![
                ("name", FieldErrorCode::Required),
                ("documentNumber", FieldErrorCode::InvalidType),
                ("clientType", FieldErrorCode::InvalidValue),
                ("active", FieldErrorCode::InvalidType),
            ]
        );
        assert!(err.errors[2].message.contains("individual, organization"));
    }

    #[test]
    fn blank_required_text_is_rejected() {
        let err = CreateDeadlineParams::from_payload(&json!({
            "title": "   ",
            "dueDate": "2023-08-10"
        }))
        .expect_err("blank title");
        assert!(err.has_field("title"));
        assert_eq!(err.errors.len(), 1);
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = validate(EntityKind::Case, &json!([1, 2, 3])).expect_err("array payload");
        assert_eq!(err.errors[0].code, FieldErrorCode::InvalidType);
    }

    #[test]
    fn case_insert_parses_value_and_date() {
        let case = CreateCaseParams::from_payload(&json!({
            "caseNumber": "0001-23",
            "clientId": 1,
            "caseType": "Collection",
            "filingDate": "2023-07-05",
            "caseValue": "150000.50"
        }))
        .expect("valid case");
        assert_eq!(case.status, CaseStatus::Active);
        assert_eq!(case.case_value, Some(dec!(150000.50)));
        assert_eq!(case.filing_date.date_naive().to_string(), "2023-07-05");
    }

    #[test]
    fn case_value_must_be_a_string() {
        let err = CreateCaseParams::from_payload(&json!({
            "caseNumber": "0001-23",
            "clientId": 0,
            "caseType": "Collection",
            "filingDate": "not a date",
            "caseValue": 150000
        }))
        .expect_err("invalid case");
        assert_eq!(
            codes(&err),
            vec![
                ("clientId", FieldErrorCode::InvalidValue),
                ("filingDate", FieldErrorCode::InvalidValue),
                ("caseValue", FieldErrorCode::InvalidType),
            ]
        );
    }

    #[test]
    fn deadline_defaults_match_the_data_model() {
        let deadline = CreateDeadlineParams::from_payload(&json!({
            "title": "Appeal",
            "dueDate": "2023-08-10T14:00:00Z"
        }))
        .expect("valid deadline");
        assert_eq!(deadline.case_id, None);
        assert_eq!(deadline.status, DeadlineStatus::Pending);
        assert_eq!(deadline.priority, DeadlinePriority::Medium);
        assert!(deadline.is_working_days);
    }

    #[test]
    fn document_insert_defaults_to_draft() {
        match validate(
            EntityKind::Document,
            &json!({
                "title": "Petition",
                "documentType": "Petition",
                "content": "",
                "createdBy": "Maria",
                "createdAt": "2020-01-01"
            }),
        )
        .expect("valid document")
        {
            ValidatedPayload::Document(document) => {
                assert_eq!(document.status, DocumentStatus::Draft);
                assert_eq!(document.content, "");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn generation_request_lists_missing_fields() {
        let err = GenerateDocument::from_payload(&json!({
            "documentType": "Notice",
            "createdBy": "  ",
            "extra": "not an object"
        }))
        .expect_err("incomplete request");
        assert_eq!(err.entity, "document");
        assert_eq!(
            codes(&err),
            vec![
                ("title", FieldErrorCode::Required),
                ("template", FieldErrorCode::Required),
                ("createdBy", FieldErrorCode::Required),
                ("extra", FieldErrorCode::InvalidType),
            ]
        );
    }

    #[test]
    fn generation_request_keeps_template_verbatim() {
        let request = GenerateDocument::from_payload(&json!({
            "title": " Notice ",
            "documentType": "Notice",
            "template": "  {{ case.case_number }}\n",
            "createdBy": "Maria",
            "extra": { "deadline": "2023-08-10" }
        }))
        .expect("valid request");
        assert_eq!(request.title, "Notice");
        assert_eq!(request.template, "  {{ case.case_number }}\n");
        assert_eq!(request.extra, Some(json!({ "deadline": "2023-08-10" })));
    }

    #[test]
    fn patch_distinguishes_absent_null_and_value() {
        let patch = UpdateClientParams::from_payload(&json!({
            "phone": "(11) 5555-1234",
            "email": null
        }))
        .expect("valid patch");
        assert_eq!(patch.phone, Some(Some("(11) 5555-1234".to_string())));
        assert_eq!(patch.email, Some(None));
        assert_eq!(patch.address, None);
        assert_eq!(patch.name, None);
    }

    #[test]
    fn patch_rejects_null_on_required_fields() {
        let payload = json!({ "caseType": null, "status": "done" });
        let err = validate_patch(EntityKind::Case, &payload).expect_err("invalid patch");
        assert_eq!(
            codes(&err),
            vec![
                ("caseType", FieldErrorCode::InvalidType),
                ("status", FieldErrorCode::InvalidValue),
            ]
        );
    }

    #[test]
    fn empty_patch_is_valid() {
        let patch = UpdateDeadlineParams::from_payload(&json!({})).expect("empty patch");
        assert!(patch.title.is_none() && patch.case_id.is_none());
    }
}
