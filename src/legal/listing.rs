//! Search filters and pagination over listed records.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::{CaseRecord, ClientRecord, DocumentRecord, EntityId};

/// Upper bound on caller-requested page sizes.
pub const MAX_PAGE_SIZE: usize = 100;

/// One page of results. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Slice `items` into the requested page. A page past the end is empty but
/// still reports the totals.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let total = items.len();
    let total_pages = total.div_ceil(page_size);
    let start = (page - 1).saturating_mul(page_size);
    let items = items.into_iter().skip(start).take(page_size).collect();
    Page {
        items,
        page,
        page_size,
        total,
        total_pages,
    }
}

fn contains_folded(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Clients whose name contains `query` (case-insensitive) or whose document
/// number contains it verbatim.
pub fn search_clients(clients: Vec<ClientRecord>, query: &str) -> Vec<ClientRecord> {
    let query = query.trim();
    if query.is_empty() {
        return clients;
    }
    let lower = query.to_lowercase();
    clients
        .into_iter()
        .filter(|client| {
            contains_folded(&client.name, &lower) || client.document_number.contains(query)
        })
        .collect()
}

/// Cases whose number or owning client's name contains `query`.
pub fn search_cases(
    cases: Vec<CaseRecord>,
    clients: &[ClientRecord],
    query: &str,
) -> Vec<CaseRecord> {
    let lower = query.trim().to_lowercase();
    if lower.is_empty() {
        return cases;
    }
    let client_names: HashMap<EntityId, &str> = clients
        .iter()
        .map(|client| (client.id, client.name.as_str()))
        .collect();
    cases
        .into_iter()
        .filter(|case| {
            contains_folded(&case.case_number, &lower)
                || client_names
                    .get(&case.client_id)
                    .is_some_and(|name| contains_folded(name, &lower))
        })
        .collect()
}

/// Documents matching `query` on title, type or the number of the case they
/// belong to, optionally restricted to one document type.
pub fn search_documents(
    documents: Vec<DocumentRecord>,
    cases: &[CaseRecord],
    query: &str,
    document_type: Option<&str>,
) -> Vec<DocumentRecord> {
    let lower = query.trim().to_lowercase();
    let wanted_type = document_type
        .map(|kind| kind.trim().to_lowercase())
        .filter(|kind| !kind.is_empty());
    let case_numbers: HashMap<EntityId, &str> = cases
        .iter()
        .map(|case| (case.id, case.case_number.as_str()))
        .collect();

    documents
        .into_iter()
        .filter(|document| {
            wanted_type
                .as_deref()
                .is_none_or(|kind| document.document_type.to_lowercase() == kind)
        })
        .filter(|document| {
            lower.is_empty()
                || contains_folded(&document.title, &lower)
                || contains_folded(&document.document_type, &lower)
                || document
                    .case_id
                    .and_then(|case_id| case_numbers.get(&case_id))
                    .is_some_and(|number| contains_folded(number, &lower))
        })
        .collect()
}

/// Distinct document types, lowercased, in first-seen order.
pub fn document_types(documents: &[DocumentRecord]) -> Vec<String> {
    let mut seen = Vec::new();
    for document in documents {
        let kind = document.document_type.to_lowercase();
        if !seen.contains(&kind) {
            seen.push(kind);
        }
    }
    seen
}
