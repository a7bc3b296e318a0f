//! Request and response DTOs for the web gateway API.
//!
//! Entity records serialize themselves (see [`crate::db`]); the types here
//! cover query strings, health and error bodies.

use serde::{Deserialize, Serialize};

use crate::error::FieldError;

// --- Errors ---

/// Body of every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub errors: Vec<FieldError>,
}

// --- Search ---

/// `?q=&page=&pageSize=&documentType=` on the search routes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    /// Only read by document search.
    pub document_type: Option<String>,
}

// --- Health ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
