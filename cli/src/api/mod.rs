// HTTP API
//
// Route handlers for the sheet endpoints. Each handler resolves the
// caller's target collection, runs one kernel operation on the blocking
// pool and renders the result as JSON.

mod error;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use gridstore_kernel::registry::{self, AddSheetOutcome};
use gridstore_kernel::session::{ActiveCollections, DEFAULT_SESSION};
use gridstore_kernel::sheet::TableView;
use gridstore_kernel::store::DocumentStore;
use gridstore_kernel::tables::{self, TableUpdate};

pub use error::ApiError;

/// Header naming the caller's session.
pub const SESSION_HEADER: &str = "x-session-id";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub collections: Arc<ActiveCollections>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, collections: ActiveCollections) -> Self {
        Self {
            store,
            collections: Arc::new(collections),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/api/setCollection", post(set_collection))
        .route("/api/addSheet", post(add_sheet))
        .route("/api/getSheets", get(get_sheets))
        .route("/api/getTable", get(get_table))
        .route("/api/saveTable", post(save_table))
        .route("/api/deleteSheet", delete(delete_sheet))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct SetCollectionBody {
    #[serde(default)]
    collection: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetNameBody {
    #[serde(default)]
    sheet_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionQuery {
    collection: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct OutcomeResponse {
    success: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct SheetsResponse {
    sheets: Vec<String>,
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

/// Decode a JSON request body.
///
/// Bodies that are empty or not sent as JSON decode as the default
/// value, so absent fields reach the presence checks.
fn parse_body<T: DeserializeOwned + Default>(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<T, ApiError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json") || v.contains("+json"))
        .unwrap_or(false);

    if !is_json || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    Ok(serde_json::from_slice(body)?)
}

/// Run a store-bound closure off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await?)
}

async fn liveness() -> &'static str {
    "✅ API is running!"
}

async fn set_collection(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let body: SetCollectionBody = parse_body(&headers, &body)?;
    let collection = body.collection.unwrap_or_default();
    let session = session_id(&headers);

    state.collections.set(&session, collection.clone());
    tracing::info!(session = %session, collection = %collection, "active collection changed");

    Ok(Json(MessageResponse {
        message: format!("Active collection set to {collection}"),
    }))
}

async fn add_sheet(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let body: SheetNameBody = parse_body(&headers, &body)?;
    let name = body.sheet_name.unwrap_or_default();
    let store = state.store.clone();

    let outcome = blocking(move || registry::add_sheet(&*store, &name))
        .await?
        .map_err(|err| {
            ApiError::from_registry(err, |e| ApiError::flagged_storage("Error adding sheet", e))
        })?;

    let message = match outcome {
        AddSheetOutcome::AlreadyExists => "Sheet already exists!",
        AddSheetOutcome::Created | AddSheetOutcome::Appended => "Sheet added successfully",
    };

    Ok(Json(OutcomeResponse {
        success: outcome.is_added(),
        message: message.into(),
    }))
}

async fn get_sheets(State(state): State<AppState>) -> Result<Json<SheetsResponse>, ApiError> {
    let store = state.store.clone();

    let sheets = blocking(move || registry::list_sheets(&*store))
        .await?
        .map_err(|err| {
            ApiError::from_registry(err, |e| ApiError::storage("Error fetching sheets", e))
        })?;

    Ok(Json(SheetsResponse { sheets }))
}

async fn get_table(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CollectionQuery>,
) -> Result<Json<TableView>, ApiError> {
    let collection = state
        .collections
        .resolve(&session_id(&headers), query.collection.as_deref());
    let store = state.store.clone();

    let view = blocking(move || tables::get_table(&*store, &collection))
        .await?
        .map_err(|e| ApiError::storage("Error fetching table data", e))?;

    Ok(Json(view))
}

async fn save_table(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CollectionQuery>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let update: TableUpdate = parse_body(&headers, &body)?;
    let collection = state
        .collections
        .resolve(&session_id(&headers), query.collection.as_deref());
    let store = state.store.clone();

    blocking(move || tables::save_table(&*store, &collection, update))
        .await?
        .map_err(|e| ApiError::storage("Error saving table data", e))?;

    Ok(Json(MessageResponse {
        message: "Table data saved successfully".into(),
    }))
}

async fn delete_sheet(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let body: SheetNameBody = parse_body(&headers, &body)?;
    let name = body.sheet_name.unwrap_or_default();
    let store = state.store.clone();
    let target = name.clone();

    blocking(move || registry::delete_sheet(&*store, &target))
        .await?
        .map_err(|err| ApiError::from_registry(err, ApiError::StorageVerbose))?;

    Ok(Json(OutcomeResponse {
        success: true,
        message: format!("Sheet \"{name}\" deleted successfully."),
    }))
}
