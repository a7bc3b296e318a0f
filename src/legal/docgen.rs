use chrono::{DateTime, Utc};
use tera::Context;

use crate::db::{CaseRecord, ClientRecord, CreateDocumentParams, DocumentStatus, FieldEnum};

/// Format a CPF (11 digits) or CNPJ (14 digits) with its usual punctuation.
/// Anything else is returned as given.
pub fn format_document_number(raw: &str) -> String {
    let digits = crate::db::normalize_document_number(raw);
    match digits.len() {
        11 => format!(
            "{}.{}.{}-{}",
            &digits[0..3],
            &digits[3..6],
            &digits[6..9],
            &digits[9..11]
        ),
        14 => format!(
            "{}.{}.{}/{}-{}",
            &digits[0..2],
            &digits[2..5],
            &digits[5..8],
            &digits[8..12],
            &digits[12..14]
        ),
        _ => raw.to_string(),
    }
}

pub fn build_context(
    case: &CaseRecord,
    client: Option<&ClientRecord>,
    extra: Option<&serde_json::Value>,
    generated_at: DateTime<Utc>,
) -> serde_json::Value {
    let extra = extra.cloned().unwrap_or_else(|| serde_json::json!({}));
    let client = client.map(|client| {
        serde_json::json!({
            "id": client.id,
            "name": client.name,
            "document_number": format_document_number(&client.document_number),
            "type": client.client_type.as_str(),
            "email": client.email,
            "phone": client.phone,
            "address": client.address,
            "notes": client.notes,
        })
    });
    serde_json::json!({
        "generated_at": generated_at.to_rfc3339(),
        "case": {
            "id": case.id,
            "case_number": case.case_number,
            "court": case.court,
            "jurisdiction": case.jurisdiction,
            "case_type": case.case_type,
            "status": case.status.as_str(),
            "filing_date": case.filing_date.date_naive().to_string(),
            "case_value": case.case_value.map(|value| value.to_string()),
            "description": case.description,
        },
        "client": client,
        "extra": extra,
    })
}

pub fn render_template(body: &str, context: &serde_json::Value) -> Result<String, String> {
    let map = context
        .as_object()
        .ok_or_else(|| "template context must be a JSON object at the root".to_string())?;
    let mut tera_context = Context::new();
    for (key, value) in map {
        tera_context.insert(key, value);
    }

    tera::Tera::one_off(body, &tera_context, false)
        .map_err(|err| format!("failed to render template: {}", err))
}

/// What a caller supplies to generate a document for a case.
#[derive(Debug, Clone)]
pub struct GenerateDocument {
    pub title: String,
    pub document_type: String,
    pub template: String,
    pub created_by: String,
    pub extra: Option<serde_json::Value>,
}

/// Render `request.template` against the case and produce a draft document
/// attached to that case.
pub fn generate(
    case: &CaseRecord,
    client: Option<&ClientRecord>,
    request: &GenerateDocument,
    generated_at: DateTime<Utc>,
) -> Result<CreateDocumentParams, String> {
    let context = build_context(case, client, request.extra.as_ref(), generated_at);
    let content = render_template(&request.template, &context)?;
    Ok(CreateDocumentParams {
        case_id: Some(case.id),
        title: request.title.trim().to_string(),
        document_type: request.document_type.trim().to_string(),
        content,
        status: DocumentStatus::Draft,
        created_by: request.created_by.trim().to_string(),
    })
}
