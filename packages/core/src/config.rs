/// Configuration for the form compiler and its remote collaborators
use crate::models::Lang;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Upper bound for remote request timeouts
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Compiler and API client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormBuilderConfig {
    /// Base URL of the platform REST API (metadata, taxa, forms)
    pub api_base: String,

    /// Access token passed to the platform REST API
    pub access_token: Option<String>,

    /// Language of catalog labels when no language is requested
    pub default_lang: Lang,

    /// Timeout for a single remote request, in seconds
    pub request_timeout_secs: u64,

    /// Root of the taxonomy used for species lookups
    pub species_root_taxon: String,
}

impl Default for FormBuilderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.laji.fi/v0".to_string(),
            access_token: None,
            default_lang: Lang::Fi,
            request_timeout_secs: 30,
            species_root_taxon: "MX.37600".to_string(),
        }
    }
}

impl FormBuilderConfig {
    /// Read configuration from the environment, defaulting missing values
    ///
    /// - `LAJI_API_BASE`: API base URL
    /// - `LAJI_ACCESS_TOKEN`: API access token
    /// - `FORM_BUILDER_DEFAULT_LANG`: fi, sv or en
    /// - `LAJI_API_TIMEOUT_SECS`: request timeout
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: env::var("LAJI_API_BASE").unwrap_or(defaults.api_base),
            access_token: env::var("LAJI_ACCESS_TOKEN").ok().filter(|t| !t.is_empty()),
            default_lang: env::var("FORM_BUILDER_DEFAULT_LANG")
                .ok()
                .and_then(|l| l.parse().ok())
                .unwrap_or(defaults.default_lang),
            request_timeout_secs: env::var("LAJI_API_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            species_root_taxon: defaults.species_root_taxon,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_base.is_empty() {
            return Err("api_base cannot be empty".to_string());
        }

        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(format!("api_base must be an http(s) URL, got '{}'", self.api_base));
        }

        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }

        if self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(format!(
                "request_timeout_secs cannot exceed {}",
                MAX_REQUEST_TIMEOUT_SECS
            ));
        }

        Ok(())
    }
}
