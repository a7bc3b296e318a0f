//! Axum HTTP server for the web gateway.
//!
//! Serves the practice REST API: CRUD routes per entity kind, nested case
//! routes, search, the deadline agenda, the dashboard, document generation
//! and health.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Path, Query, Request, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::channels::web::types::*;
use crate::config::{MAX_UPCOMING_DAYS, PracticeConfig};
use crate::db::memory::Clock;
use crate::db::{
    CaseRecord, CaseStore, CaseUpdateRecord, CaseUpdateStore, ClientRecord, ClientStore,
    CreateCaseParams, CreateCaseUpdateParams, CreateClientParams, CreateDeadlineParams,
    CreateDocumentParams, Database, DeadlineRecord, DeadlineStore, DocumentRecord, DocumentStore,
    EntityId, EntityKind, FieldEnum, UpdateCaseParams, UpdateCaseUpdateParams, UpdateClientParams,
    UpdateDeadlineParams, UpdateDocumentParams,
};
use crate::error::{ChannelError, DatabaseError, ValidationError};
use crate::legal::calendar::{self, Agenda};
use crate::legal::dashboard::{self, Dashboard};
use crate::legal::docgen::{self, GenerateDocument};
use crate::legal::listing::{self, Page};
use crate::legal::schema::{InsertShape, PatchShape};

/// Request bodies above this size are rejected.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Longest caller-supplied request id that is propagated as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Shared state for all handlers.
pub struct GatewayState {
    pub store: Arc<dyn Database>,
    pub practice: PracticeConfig,
    /// Reference time for agenda, upcoming-window and generation timestamps.
    clock: Clock,
    /// Sender to trigger graceful shutdown of the listener.
    pub shutdown_tx: tokio::sync::RwLock<Option<oneshot::Sender<()>>>,
    /// The spawned `axum::serve` task, awaited on shutdown.
    serve_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl GatewayState {
    pub fn new(store: Arc<dyn Database>, practice: PracticeConfig) -> Self {
        Self::with_clock(store, practice, Arc::new(Utc::now))
    }

    pub fn with_clock(store: Arc<dyn Database>, practice: PracticeConfig, clock: Clock) -> Self {
        Self {
            store,
            practice,
            clock,
            shutdown_tx: tokio::sync::RwLock::new(None),
            serve_task: tokio::sync::Mutex::new(None),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Fire the shutdown signal, if the server is running, and wait until
    /// in-flight requests have drained and the listener is closed.
    pub async fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(());
        }
        let task = self.serve_task.lock().await.take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            tracing::error!("Web gateway task failed: {}", e);
        }
    }
}

/// Bind `addr`, spawn the server and return the address actually bound.
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<GatewayState>,
) -> Result<SocketAddr, ChannelError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ChannelError::StartupFailed {
            name: "gateway".to_string(),
            reason: format!("Failed to bind to {}: {}", addr, e),
        })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| ChannelError::StartupFailed {
            name: "gateway".to_string(),
            reason: format!("Failed to get local addr: {}", e),
        })?;

    let app = build_router(state.clone(), bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.write().await = Some(shutdown_tx);

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Web gateway shutting down");
            })
            .await
        {
            tracing::error!("Web gateway server error: {}", e);
        }
        tracing::info!("Web gateway stopped");
    });
    *state.serve_task.lock().await = Some(task);

    tracing::info!(addr = %bound_addr, "Web gateway listening");
    Ok(bound_addr)
}

/// The full application router. `addr` is the bound address and determines
/// the allowed CORS origins.
pub fn build_router(state: Arc<GatewayState>, addr: SocketAddr) -> Router {
    let api = Router::new()
        .route("/api/health", get(health_handler))
        // Clients
        .route(
            "/api/clients",
            get(clients_list_handler).post(clients_create_handler),
        )
        .route("/api/clients/search", get(clients_search_handler))
        .route(
            "/api/clients/{id}",
            get(clients_get_handler)
                .put(clients_update_handler)
                .delete(clients_delete_handler),
        )
        .route("/api/clients/{id}/cases", get(client_cases_handler))
        // Cases
        .route(
            "/api/cases",
            get(cases_list_handler).post(cases_create_handler),
        )
        .route("/api/cases/search", get(cases_search_handler))
        .route(
            "/api/cases/{id}",
            get(cases_get_handler)
                .put(cases_update_handler)
                .delete(cases_delete_handler),
        )
        .route(
            "/api/cases/{id}/updates",
            get(case_updates_list_handler).post(case_updates_create_handler),
        )
        .route("/api/cases/{id}/deadlines", get(case_deadlines_handler))
        .route("/api/cases/{id}/documents", get(case_documents_handler))
        .route(
            "/api/cases/{id}/documents/generate",
            post(case_documents_generate_handler),
        )
        // Case updates
        .route(
            "/api/updates/{id}",
            get(case_updates_get_handler)
                .put(case_updates_update_handler)
                .delete(case_updates_delete_handler),
        )
        // Deadlines
        .route(
            "/api/deadlines",
            get(deadlines_list_handler).post(deadlines_create_handler),
        )
        .route("/api/deadlines/agenda", get(deadlines_agenda_handler))
        .route(
            "/api/deadlines/upcoming/{days}",
            get(deadlines_upcoming_handler),
        )
        .route("/api/deadlines/on/{date}", get(deadlines_on_date_handler))
        .route(
            "/api/deadlines/{id}",
            get(deadlines_get_handler)
                .put(deadlines_update_handler)
                .delete(deadlines_delete_handler),
        )
        // Documents
        .route(
            "/api/documents",
            get(documents_list_handler).post(documents_create_handler),
        )
        .route("/api/documents/search", get(documents_search_handler))
        .route("/api/documents/types", get(documents_types_handler))
        .route(
            "/api/documents/{id}",
            get(documents_get_handler)
                .put(documents_update_handler)
                .delete(documents_delete_handler),
        )
        // Dashboard
        .route("/api/dashboard", get(dashboard_handler));

    let origins: Vec<HeaderValue> = [
        format!("http://{}:{}", addr.ip(), addr.port()),
        format!("http://localhost:{}", addr.port()),
    ]
    .into_iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, REQUEST_ID_HEADER])
        .expose_headers([REQUEST_ID_HEADER]);

    api.layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_context_middleware))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state)
}

// --- Request context ---

fn incoming_request_id(request: &Request) -> Option<String> {
    let raw = request
        .headers()
        .get(REQUEST_ID_HEADER)?
        .to_str()
        .ok()?
        .trim();
    if raw.is_empty()
        || raw.len() > MAX_REQUEST_ID_LEN
        || !raw.chars().all(|c| c.is_ascii_graphic())
    {
        return None;
    }
    Some(raw.to_string())
}

/// Tag each request with an `x-request-id` (the caller's, if usable, or a
/// fresh v4 uuid), run it inside a span carrying that id and echo the id on
/// the response.
async fn request_context_middleware(request: Request, next: Next) -> Response {
    let request_id =
        incoming_request_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        tracing::debug!(status = response.status().as_u16(), "Request completed");
    });
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

// --- Errors ---

/// Handler failure, rendered as an [`ErrorResponse`].
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    NotFound(EntityKind),
    BadRequest(String),
    Conflict(String),
    /// Detail is logged, never returned.
    Internal(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match &err {
            DatabaseError::Conflict { .. } => {
                tracing::warn!(error = %err, "Rejected conflicting write");
                Self::Conflict(err.to_string())
            }
            DatabaseError::IdSpaceExhausted { .. } | DatabaseError::Seed(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            Self::Validation(err) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid {} data", err.entity),
                err.errors,
            ),
            Self::NotFound(kind) => (
                StatusCode::NOT_FOUND,
                format!("{} not found", kind.label()),
                Vec::new(),
            ),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message, Vec::new()),
            Self::Conflict(message) => (StatusCode::CONFLICT, message, Vec::new()),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Vec::new(),
                )
            }
        };
        (status, Json(ErrorResponse { message, errors })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn parse_id(raw: &str, kind: EntityKind) -> ApiResult<EntityId> {
    raw.trim()
        .parse::<EntityId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {} id '{}'", kind.as_str(), raw)))
}

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn found<T>(record: Option<T>, kind: EntityKind) -> ApiResult<T> {
    record.ok_or(ApiError::NotFound(kind))
}

fn deleted(removed: bool, kind: EntityKind) -> ApiResult<StatusCode> {
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(kind))
    }
}

fn search_query(query: Result<Query<SearchQuery>, QueryRejection>) -> ApiResult<SearchQuery> {
    query
        .map(|Query(query)| query)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn page_of<T>(items: Vec<T>, query: &SearchQuery, practice: &PracticeConfig) -> Page<T> {
    listing::paginate(
        items,
        query.page.unwrap_or(1),
        query.page_size.unwrap_or(practice.page_size),
    )
}

/// Window for `/api/deadlines/upcoming/{days}`. Unparseable or zero falls
/// back to the configured default.
fn upcoming_window(raw: &str, default_days: i64) -> ApiResult<i64> {
    match raw.trim().parse::<i64>() {
        Err(_) | Ok(0) => Ok(default_days),
        Ok(days) if (1..=MAX_UPCOMING_DAYS).contains(&days) => Ok(days),
        Ok(days) => Err(ApiError::BadRequest(format!(
            "days must be between 1 and {}, got {}",
            MAX_UPCOMING_DAYS, days
        ))),
    }
}

// --- Health ---

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// --- Client handlers ---

async fn clients_list_handler(
    State(state): State<Arc<GatewayState>>,
) -> ApiResult<Json<Vec<ClientRecord>>> {
    Ok(Json(state.store.list_clients().await?))
}

async fn clients_get_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ClientRecord>> {
    let id = parse_id(&id, EntityKind::Client)?;
    let client = state.store.get_client(id).await?;
    Ok(Json(found(client, EntityKind::Client)?))
}

async fn clients_create_handler(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ClientRecord>)> {
    let params = CreateClientParams::from_payload(&json_body(payload)?)?;
    let client = state.store.create_client(&params).await?;
    tracing::info!(client_id = client.id, "Client created");
    Ok((StatusCode::CREATED, Json(client)))
}

async fn clients_update_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ClientRecord>> {
    let id = parse_id(&id, EntityKind::Client)?;
    let params = UpdateClientParams::from_payload(&json_body(payload)?)?;
    let client = state.store.update_client(id, &params).await?;
    let client = found(client, EntityKind::Client)?;
    tracing::info!(client_id = id, "Client updated");
    Ok(Json(client))
}

async fn clients_delete_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, EntityKind::Client)?;
    let removed = state.store.delete_client(id).await?;
    if removed {
        tracing::info!(client_id = id, "Client deleted");
    }
    deleted(removed, EntityKind::Client)
}

async fn client_cases_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<CaseRecord>>> {
    let id = parse_id(&id, EntityKind::Client)?;
    Ok(Json(state.store.list_cases_for_client(id).await?))
}

async fn clients_search_handler(
    State(state): State<Arc<GatewayState>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<Page<ClientRecord>>> {
    let query = search_query(query)?;
    let clients = state.store.list_clients().await?;
    let matches = listing::search_clients(clients, query.q.as_deref().unwrap_or_default());
    Ok(Json(page_of(matches, &query, &state.practice)))
}

// --- Case handlers ---

async fn cases_list_handler(
    State(state): State<Arc<GatewayState>>,
) -> ApiResult<Json<Vec<CaseRecord>>> {
    Ok(Json(state.store.list_cases().await?))
}

async fn cases_get_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CaseRecord>> {
    let id = parse_id(&id, EntityKind::Case)?;
    let case = state.store.get_case(id).await?;
    Ok(Json(found(case, EntityKind::Case)?))
}

async fn cases_create_handler(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CaseRecord>)> {
    let params = CreateCaseParams::from_payload(&json_body(payload)?)?;
    let case = state.store.create_case(&params).await?;
    tracing::info!(
        case_id = case.id,
        client_id = case.client_id,
        "Case created"
    );
    Ok((StatusCode::CREATED, Json(case)))
}

async fn cases_update_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<CaseRecord>> {
    let id = parse_id(&id, EntityKind::Case)?;
    let params = UpdateCaseParams::from_payload(&json_body(payload)?)?;
    let case = state.store.update_case(id, &params).await?;
    let case = found(case, EntityKind::Case)?;
    tracing::info!(case_id = id, "Case updated");
    Ok(Json(case))
}

async fn cases_delete_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, EntityKind::Case)?;
    let removed = state.store.delete_case(id).await?;
    if removed {
        tracing::info!(case_id = id, "Case deleted");
    }
    deleted(removed, EntityKind::Case)
}

async fn cases_search_handler(
    State(state): State<Arc<GatewayState>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<Page<CaseRecord>>> {
    let query = search_query(query)?;
    let cases = state.store.list_cases().await?;
    let clients = state.store.list_clients().await?;
    let matches = listing::search_cases(cases, &clients, query.q.as_deref().unwrap_or_default());
    Ok(Json(page_of(matches, &query, &state.practice)))
}

async fn case_deadlines_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<DeadlineRecord>>> {
    let id = parse_id(&id, EntityKind::Case)?;
    Ok(Json(state.store.list_deadlines_for_case(id).await?))
}

async fn case_documents_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<DocumentRecord>>> {
    let id = parse_id(&id, EntityKind::Case)?;
    Ok(Json(state.store.list_documents_for_case(id).await?))
}

async fn case_documents_generate_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DocumentRecord>)> {
    let case_id = parse_id(&id, EntityKind::Case)?;
    let request = GenerateDocument::from_payload(&json_body(payload)?)?;

    let case = found(state.store.get_case(case_id).await?, EntityKind::Case)?;
    let client = state.store.get_client(case.client_id).await?;
    let params = docgen::generate(&case, client.as_ref(), &request, state.now())
        .map_err(ApiError::BadRequest)?;
    let document = state.store.create_document(&params).await?;
    tracing::info!(case_id, document_id = document.id, "Document generated");
    Ok((StatusCode::CREATED, Json(document)))
}

// --- Case update handlers ---

async fn case_updates_list_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<CaseUpdateRecord>>> {
    let case_id = parse_id(&id, EntityKind::Case)?;
    Ok(Json(state.store.list_case_updates_for_case(case_id).await?))
}

async fn case_updates_create_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CaseUpdateRecord>)> {
    let case_id = parse_id(&id, EntityKind::Case)?;
    let mut payload = json_body(payload)?;
    // The path names the case; a caseId in the body is ignored.
    if let Some(fields) = payload.as_object_mut() {
        fields.insert("caseId".to_string(), Value::from(case_id));
    }
    let params = CreateCaseUpdateParams::from_payload(&payload)?;
    let update = state.store.create_case_update(&params).await?;
    tracing::info!(case_id, update_id = update.id, "Case update recorded");
    Ok((StatusCode::CREATED, Json(update)))
}

async fn case_updates_get_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CaseUpdateRecord>> {
    let id = parse_id(&id, EntityKind::CaseUpdate)?;
    let update = state.store.get_case_update(id).await?;
    Ok(Json(found(update, EntityKind::CaseUpdate)?))
}

async fn case_updates_update_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<CaseUpdateRecord>> {
    let id = parse_id(&id, EntityKind::CaseUpdate)?;
    let params = UpdateCaseUpdateParams::from_payload(&json_body(payload)?)?;
    let update = state.store.update_case_update(id, &params).await?;
    Ok(Json(found(update, EntityKind::CaseUpdate)?))
}

async fn case_updates_delete_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, EntityKind::CaseUpdate)?;
    deleted(
        state.store.delete_case_update(id).await?,
        EntityKind::CaseUpdate,
    )
}

// --- Deadline handlers ---

async fn deadlines_list_handler(
    State(state): State<Arc<GatewayState>>,
) -> ApiResult<Json<Vec<DeadlineRecord>>> {
    Ok(Json(state.store.list_deadlines().await?))
}

async fn deadlines_get_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeadlineRecord>> {
    let id = parse_id(&id, EntityKind::Deadline)?;
    let deadline = state.store.get_deadline(id).await?;
    Ok(Json(found(deadline, EntityKind::Deadline)?))
}

async fn deadlines_create_handler(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DeadlineRecord>)> {
    let params = CreateDeadlineParams::from_payload(&json_body(payload)?)?;
    let deadline = state.store.create_deadline(&params).await?;
    tracing::info!(deadline_id = deadline.id, due = %deadline.due_date, "Deadline created");
    Ok((StatusCode::CREATED, Json(deadline)))
}

async fn deadlines_update_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<DeadlineRecord>> {
    let id = parse_id(&id, EntityKind::Deadline)?;
    let params = UpdateDeadlineParams::from_payload(&json_body(payload)?)?;
    let deadline = found(
        state.store.update_deadline(id, &params).await?,
        EntityKind::Deadline,
    )?;
    tracing::info!(
        deadline_id = id,
        status = deadline.status.as_str(),
        "Deadline updated"
    );
    Ok(Json(deadline))
}

async fn deadlines_delete_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, EntityKind::Deadline)?;
    deleted(state.store.delete_deadline(id).await?, EntityKind::Deadline)
}

async fn deadlines_upcoming_handler(
    State(state): State<Arc<GatewayState>>,
    Path(days): Path<String>,
) -> ApiResult<Json<Vec<DeadlineRecord>>> {
    let window = upcoming_window(&days, state.practice.upcoming_days)?;
    let upcoming = state
        .store
        .list_upcoming_deadlines(state.now(), window)
        .await?;
    Ok(Json(upcoming))
}

async fn deadlines_agenda_handler(
    State(state): State<Arc<GatewayState>>,
) -> ApiResult<Json<Agenda>> {
    let deadlines = state.store.list_deadlines().await?;
    let agenda = calendar::build_agenda(deadlines, state.now(), state.practice.utc_offset);
    tracing::debug!(
        deadlines = agenda.total(),
        overdue = agenda.overdue.len(),
        "Agenda built"
    );
    Ok(Json(agenda))
}

async fn deadlines_on_date_handler(
    State(state): State<Arc<GatewayState>>,
    Path(date): Path<String>,
) -> ApiResult<Json<Vec<DeadlineRecord>>> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", date))
    })?;
    let deadlines = state.store.list_deadlines().await?;
    Ok(Json(calendar::deadlines_on_date(
        deadlines,
        day,
        state.practice.utc_offset,
    )))
}

// --- Document handlers ---

async fn documents_list_handler(
    State(state): State<Arc<GatewayState>>,
) -> ApiResult<Json<Vec<DocumentRecord>>> {
    Ok(Json(state.store.list_documents().await?))
}

async fn documents_get_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DocumentRecord>> {
    let id = parse_id(&id, EntityKind::Document)?;
    let document = state.store.get_document(id).await?;
    Ok(Json(found(document, EntityKind::Document)?))
}

async fn documents_create_handler(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DocumentRecord>)> {
    let params = CreateDocumentParams::from_payload(&json_body(payload)?)?;
    let document = state.store.create_document(&params).await?;
    tracing::info!(document_id = document.id, "Document created");
    Ok((StatusCode::CREATED, Json(document)))
}

async fn documents_update_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<DocumentRecord>> {
    let id = parse_id(&id, EntityKind::Document)?;
    let params = UpdateDocumentParams::from_payload(&json_body(payload)?)?;
    let document = state.store.update_document(id, &params).await?;
    Ok(Json(found(document, EntityKind::Document)?))
}

async fn documents_delete_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, EntityKind::Document)?;
    deleted(state.store.delete_document(id).await?, EntityKind::Document)
}

async fn documents_search_handler(
    State(state): State<Arc<GatewayState>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<Page<DocumentRecord>>> {
    let query = search_query(query)?;
    let documents = state.store.list_documents().await?;
    let cases = state.store.list_cases().await?;
    let matches = listing::search_documents(
        documents,
        &cases,
        query.q.as_deref().unwrap_or_default(),
        query.document_type.as_deref(),
    );
    Ok(Json(page_of(matches, &query, &state.practice)))
}

/// Distinct document types, for the search filter.
async fn documents_types_handler(
    State(state): State<Arc<GatewayState>>,
) -> ApiResult<Json<Vec<String>>> {
    let documents = state.store.list_documents().await?;
    Ok(Json(listing::document_types(&documents)))
}

// --- Dashboard ---

async fn dashboard_handler(State(state): State<Arc<GatewayState>>) -> ApiResult<Json<Dashboard>> {
    let clients = state.store.list_clients().await?;
    let cases = state.store.list_cases().await?;
    let deadlines = state.store.list_deadlines().await?;
    let documents = state.store.list_documents().await?;
    Ok(Json(dashboard::summarize(
        &clients, &cases, &deadlines, &documents,
    )))
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use chrono::{DateTime, TimeZone, Utc};
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::{ApiError, GatewayState, REQUEST_ID_HEADER, build_router, upcoming_window};
    use crate::config::PracticeConfig;
    use crate::db::Database;
    use crate::db::memory::MemoryBackend;
    use crate::db::seed::load_demo_data;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn local_addr() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 5000))
    }

    fn router_over(store: Arc<dyn Database>) -> axum::Router {
        let state = GatewayState::with_clock(store, PracticeConfig::default(), Arc::new(fixed_now));
        build_router(Arc::new(state), local_addr())
    }

    fn empty_router() -> axum::Router {
        router_over(Arc::new(MemoryBackend::new()))
    }

    async fn seeded_router() -> axum::Router {
        let db = MemoryBackend::with_clock(Arc::new(fixed_now));
        load_demo_data(&db).await.expect("seed");
        router_over(Arc::new(db))
    }

    async fn send(
        app: &axum::Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = empty_router();
        let (status, body) = send(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn client_lifecycle() {
        let app = empty_router();
        let (status, created) = send(
            &app,
            "POST",
            "/api/clients",
            Some(json!({
                "name": "Jane Doe",
                "documentNumber": "123.456.789-00",
                "clientType": "individual"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], 1);
        assert_eq!(created["active"], true);

        let (status, updated) = send(
            &app,
            "PUT",
            "/api/clients/1",
            Some(json!({ "phone": "(11) 99999-0000" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["phone"], "(11) 99999-0000");
        assert_eq!(updated["name"], "Jane Doe");

        let (status, body) = send(&app, "DELETE", "/api/clients/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, body) = send(&app, "GET", "/api/clients/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Client not found");

        let (status, _) = send(&app, "DELETE", "/api/clients/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_payload_lists_every_field() {
        let app = empty_router();
        let (status, body) = send(
            &app,
            "POST",
            "/api/clients",
            Some(json!({ "clientType": "company" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid client data");
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .expect("errors array")
            .iter()
            .filter_map(|e| e["field"].as_str())
            .collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"documentNumber"));
        assert!(fields.contains(&"clientType"));
    }

    #[tokio::test]
    async fn malformed_json_and_bad_ids_are_bad_requests() {
        let app = empty_router();
        let request = Request::builder()
            .method("POST")
            .uri("/api/cases")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        for uri in ["/api/cases/abc", "/api/cases/0", "/api/cases/-3"] {
            let (status, _) = send(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn duplicate_document_number_conflicts() {
        let app = empty_router();
        let client = json!({
            "name": "Jane Doe",
            "documentNumber": "123.456.789-00",
            "clientType": "individual"
        });
        let (status, _) = send(&app, "POST", "/api/clients", Some(client)).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(
            &app,
            "POST",
            "/api/clients",
            Some(json!({
                "name": "Other",
                "documentNumber": "12345678900",
                "clientType": "individual"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(
            body["message"]
                .as_str()
                .is_some_and(|m| m.contains("already exists"))
        );

        let (status, body) = send(
            &app,
            "PUT",
            "/api/clients/999",
            Some(json!({ "documentNumber": "12345678900" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Client not found");
    }

    #[tokio::test]
    async fn case_update_takes_case_id_from_path() {
        let app = seeded_router().await;
        let (status, created) = send(
            &app,
            "POST",
            "/api/cases/2/updates",
            Some(json!({
                "caseId": 5,
                "updateType": "Petição",
                "title": "Juntada de documentos",
                "date": "2026-03-01T10:00:00Z",
                "recordedBy": "Maria"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["caseId"], 2);

        let (status, timeline) = send(&app, "GET", "/api/cases/2/updates", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(timeline[0]["title"], "Juntada de documentos");

        let id = created["id"].as_i64().expect("id");
        let (status, _) = send(&app, "DELETE", &format!("/api/updates/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn upcoming_window_rules() {
        assert_eq!(upcoming_window("abc", 7).expect("fallback"), 7);
        assert_eq!(upcoming_window("0", 7).expect("fallback"), 7);
        assert_eq!(upcoming_window("30", 7).expect("explicit"), 30);
        assert!(matches!(
            upcoming_window("-1", 7),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            upcoming_window("36501", 7),
            Err(ApiError::BadRequest(_))
        ));

        let app = empty_router();
        let (status, _) = send(&app, "GET", "/api/deadlines/upcoming/-5", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = send(&app, "GET", "/api/deadlines/upcoming/soon", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn upcoming_uses_the_gateway_clock() {
        let app = empty_router();
        for (title, due) in [
            ("past", "2026-03-03T12:00:00Z"),
            ("edge", "2026-03-11T12:00:00Z"),
            ("soon", "2026-03-05T09:00:00Z"),
        ] {
            let (status, _) = send(
                &app,
                "POST",
                "/api/deadlines",
                Some(json!({ "title": title, "dueDate": due })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }
        let (_, body) = send(&app, "GET", "/api/deadlines/upcoming/7", None).await;
        let titles: Vec<&str> = body
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|d| d["title"].as_str())
            .collect();
        assert_eq!(titles, vec!["soon", "edge"]);
    }

    #[tokio::test]
    async fn agenda_and_calendar_day() {
        let app = empty_router();
        for (title, due, status) in [
            ("late", "2026-03-02T12:00:00Z", "pending"),
            ("tonight", "2026-03-04T20:00:00Z", "pending"),
            ("done", "2026-03-04T13:00:00Z", "completed"),
        ] {
            send(
                &app,
                "POST",
                "/api/deadlines",
                Some(json!({ "title": title, "dueDate": due, "status": status })),
            )
            .await;
        }

        let (status, agenda) = send(&app, "GET", "/api/deadlines/agenda", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(agenda["overdue"][0]["title"], "late");
        assert_eq!(agenda["overdue"][0]["bucket"], "overdue");
        assert_eq!(agenda["today"][0]["title"], "tonight");
        assert_eq!(agenda["completed"][0]["title"], "done");

        let (status, day) = send(&app, "GET", "/api/deadlines/on/2026-03-04", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(day.as_array().map(Vec::len), Some(2));

        let (status, _) = send(&app, "GET", "/api/deadlines/on/04-03-2026", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_routes_paginate() {
        let app = seeded_router().await;
        let (status, page) = send(&app, "GET", "/api/clients/search?q=silva", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 1);
        assert_eq!(page["items"][0]["name"], "João Silva");

        let (_, page) = send(&app, "GET", "/api/cases/search?pageSize=2&page=3", None).await;
        assert_eq!(page["total"], 5);
        assert_eq!(page["totalPages"], 3);
        assert_eq!(page["items"].as_array().map(Vec::len), Some(1));

        let (status, _) = send(&app, "GET", "/api/documents/search?page=first", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dashboard_summarizes_the_demo_practice() {
        let app = seeded_router().await;
        let (status, body) = send(&app, "GET", "/api/dashboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["clients"], 3);
        assert_eq!(body["stats"]["overdueDeadlines"], 1);
        assert_eq!(body["recentCases"].as_array().map(Vec::len), Some(4));
        assert_eq!(body["nextDeadlines"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn generate_document_for_case() {
        let app = seeded_router().await;
        let (status, document) = send(
            &app,
            "POST",
            "/api/cases/1/documents/generate",
            Some(json!({
                "title": "Notificação",
                "documentType": "Notificação",
                "template": "{{ client.name }} / {{ case.case_number }}",
                "createdBy": "Maria"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(document["status"], "draft");
        assert_eq!(document["caseId"], 1);
        assert_eq!(
            document["content"],
            "Empresa ABC Ltda. / 0001234-12.2023.8.26.0100"
        );
        assert_eq!(document["createdAt"], "2026-03-04T12:00:00Z");

        let (status, _) = send(
            &app,
            "POST",
            "/api/cases/99/documents/generate",
            Some(json!({
                "title": "x",
                "documentType": "x",
                "template": "x",
                "createdBy": "x"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            "POST",
            "/api/cases/1/documents/generate",
            Some(json!({
                "title": "x",
                "documentType": "x",
                "template": "{{ missing.value }}",
                "createdBy": "x"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["message"]
                .as_str()
                .is_some_and(|m| m.starts_with("failed to render template"))
        );
    }

    #[tokio::test]
    async fn generate_document_lists_missing_fields() {
        let app = seeded_router().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/cases/1/documents/generate",
            Some(json!({ "documentType": "Notice", "createdBy": "Maria" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid document data");
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .expect("errors array")
            .iter()
            .filter_map(|e| e["field"].as_str())
            .collect();
        assert_eq!(fields, vec!["title", "template"]);

        let (_, documents) = send(&app, "GET", "/api/cases/1/documents", None).await;
        assert_eq!(documents.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn document_types_are_distinct() {
        let app = empty_router();
        for (title, document_type) in [
            ("Initial petition", "Petition"),
            ("Power of attorney", "Power of Attorney"),
            ("Amended petition", "petition"),
        ] {
            let (status, _) = send(
                &app,
                "POST",
                "/api/documents",
                Some(json!({
                    "title": title,
                    "documentType": document_type,
                    "content": "",
                    "createdBy": "Maria"
                })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, types) = send(&app, "GET", "/api/documents/types", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(types, json!(["petition", "power of attorney"]));
    }

    #[tokio::test]
    async fn responses_carry_request_id_and_security_headers() {
        let app = empty_router();
        let request = Request::builder()
            .uri("/api/health")
            .header(REQUEST_ID_HEADER, "trace-abc")
            .body(Body::empty())
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        let headers = response.headers();
        assert_eq!(headers[REQUEST_ID_HEADER], "trace-abc");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");

        let request = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let generated = response.headers()[REQUEST_ID_HEADER]
            .to_str()
            .expect("ascii header");
        assert!(uuid::Uuid::parse_str(generated).is_ok());
    }
}
