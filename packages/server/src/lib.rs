//! Form Builder HTTP Server
//!
//! REST API over the form compiler and the form storage.
//!
//! # Architecture
//!
//! Endpoints live in modules exposing `routes(state) -> Router`, merged in
//! [`create_router`]:
//! - `form_endpoints`: form listing, compilation and storage
//!
//! # Security
//!
//! - CORS restricted to the editor origins (configurable via
//!   `CORS_ALLOW_ORIGIN`)
//! - Storage authentication is handled by the storage service's access token

use axum::{
    http::{header, Method},
    Router,
};
use formbuilder_core::FieldService;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod form_endpoints;
mod http_error;

pub use form_endpoints::ConvertQuery;
pub use http_error::HttpError;

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub field_service: Arc<FieldService>,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(form_endpoints::routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// CORS layer for the form editor
///
/// Default origins cover the editor dev servers. Configure with
/// `CORS_ALLOW_ORIGIN="https://editor.example.org"`.
fn cors_layer() -> CorsLayer {
    let default_origins = [
        "http://localhost:8081", // Editor dev server
        "http://localhost:5173", // Vite default
    ];

    let origins: Vec<header::HeaderValue> = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(custom_origin) => match custom_origin.parse::<header::HeaderValue>() {
            Ok(origin) => vec![origin],
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS_ALLOW_ORIGIN {}", custom_origin);
                Vec::new()
            }
        },
        Err(_) => default_origins
            .iter()
            .filter_map(|o| o.parse::<header::HeaderValue>().ok())
            .collect(),
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
        .allow_credentials(false)
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns error if the server fails to bind or start.
pub async fn start_server(field_service: Arc<FieldService>, port: u16) -> anyhow::Result<()> {
    let app = create_router(AppState { field_service });

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("Form builder server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
