//! Form Endpoints
//!
//! # Endpoints
//!
//! - `GET /api` - List stored forms
//! - `GET /api/flush` - Drop cached catalog and storage responses
//! - `GET /api/:id?lang&format` - Compile a stored form
//! - `POST /api/transform?lang&format` - Compile a posted Master
//! - `POST /api` - Store a new form
//! - `PUT /api/:id` - Replace a stored form
//! - `DELETE /api/:id` - Delete a stored form
//!
//! `lang` is one of `fi`, `sv`, `en`; `format` is `schema` (default) or
//! `json`. Anything else is rejected with 422.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use formbuilder_core::{ConvertedForm, Format, Lang, Master};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppState, HttpError};

// ===== Type Definitions =====

/// Query parameters of the compiling endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ConvertQuery {
    pub lang: Option<String>,
    pub format: Option<String>,
}

impl ConvertQuery {
    fn parse(&self) -> Result<(Option<Lang>, Format), HttpError> {
        let lang = self
            .lang
            .as_deref()
            .map(str::parse::<Lang>)
            .transpose()?;
        let format = self
            .format
            .as_deref()
            .map(str::parse::<Format>)
            .transpose()?
            .unwrap_or_default();
        Ok((lang, format))
    }
}

#[derive(Debug, Serialize)]
pub struct FlushResponse {
    pub flushed: bool,
}

// ===== Endpoint Handlers =====

/// GET /api
async fn list_forms(State(state): State<AppState>) -> Result<Json<Vec<Value>>, HttpError> {
    let forms = state.field_service.store().get_forms().await?;
    Ok(Json(forms.as_ref().clone()))
}

/// GET /api/flush
async fn flush(State(state): State<AppState>) -> Json<FlushResponse> {
    state.field_service.flush().await;
    tracing::info!("Caches flushed");
    Json(FlushResponse { flushed: true })
}

/// GET /api/:id
///
/// ```bash
/// curl "http://localhost:8082/api/JX.519?lang=fi&format=schema"
/// ```
async fn get_form(
    Path(id): Path<String>,
    Query(query): Query<ConvertQuery>,
    State(state): State<AppState>,
) -> Result<Json<ConvertedForm>, HttpError> {
    let (lang, format) = query.parse()?;
    let master = state.field_service.store().get_form(&id).await?;
    let form = state.field_service.convert(master, format, lang).await?;
    Ok(Json(form))
}

/// POST /api/transform
async fn transform(
    Query(query): Query<ConvertQuery>,
    State(state): State<AppState>,
    Json(master): Json<Master>,
) -> Result<Json<ConvertedForm>, HttpError> {
    let (lang, format) = query.parse()?;
    let form = state.field_service.convert(master, format, lang).await?;
    Ok(Json(form))
}

/// POST /api
async fn create_form(
    State(state): State<AppState>,
    Json(master): Json<Master>,
) -> Result<Json<Master>, HttpError> {
    let created = state.field_service.store().create_form(master).await?;
    tracing::info!("Created form {:?}", created.id);
    Ok(Json(created))
}

/// PUT /api/:id
async fn update_form(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(master): Json<Master>,
) -> Result<Json<Master>, HttpError> {
    let updated = state.field_service.store().update_form(&id, master).await?;
    Ok(Json(updated))
}

/// DELETE /api/:id
async fn delete_form(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, HttpError> {
    state.field_service.store().delete_form(&id).await?;
    tracing::info!("Deleted form {}", id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api", get(list_forms).post(create_form))
        .route("/api/flush", get(flush))
        .route("/api/transform", post(transform))
        .route(
            "/api/:id",
            get(get_form).put(update_form).delete(delete_form),
        )
        .with_state(state)
}
