//! Form Builder Server Binary
//!
//! # Usage
//!
//! ```bash
//! LAJI_ACCESS_TOKEN=... cargo run --bin formbuilder-server
//!
//! # Custom port
//! FORM_BUILDER_PORT=3000 cargo run --bin formbuilder-server
//! ```
//!
//! # Environment Variables
//!
//! - `FORM_BUILDER_PORT`: Server port (default: 8082)
//! - `LAJI_API_BASE`, `LAJI_ACCESS_TOKEN`, `FORM_BUILDER_DEFAULT_LANG`,
//!   `LAJI_API_TIMEOUT_SECS`: see `FormBuilderConfig`
//! - `CORS_ALLOW_ORIGIN`: Allowed editor origin
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::env;
use std::sync::Arc;

use formbuilder_core::clients::LajiApiClient;
use formbuilder_core::{FieldService, FormBuilderConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port = env::var("FORM_BUILDER_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8082);

    let config = FormBuilderConfig::from_env();
    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("API base: {}", config.api_base);
    if config.access_token.is_none() {
        tracing::warn!("LAJI_ACCESS_TOKEN is not set; storage requests will be rejected");
    }

    let client = Arc::new(LajiApiClient::new(&config)?);
    let field_service = Arc::new(FieldService::with_collaborators(
        client.clone(),
        client.clone(),
        client,
        &config,
    ));

    formbuilder_server::start_server(field_service, port).await
}
