//! Platform REST API Client
//!
//! One reqwest client implements every collaborator contract against the
//! platform API:
//!
//! - `GET {base}/metadata/classes/{class}/properties`
//! - `GET {base}/metadata/alts[/{range}]`
//! - `GET {base}/taxa?taxonSets={id}`
//! - `GET {base}/taxa/{root}/species?informalGroupFilters={groups}`
//! - `GET|POST|PUT|DELETE {base}/forms[/{id}]`
//!
//! Metadata is always requested with `lang=multi`. Timeouts come from
//! [`FormBuilderConfig::request_timeout`]; there are no retries.

use crate::clients::{ClientError, FormStore, MetadataCatalog, TaxonSummary, TaxonomyCatalog};
use crate::config::FormBuilderConfig;
use crate::models::{Master, Property, RangeEntry};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Page size large enough to fetch whole taxon sets in one request
const TAXA_PAGE_SIZE: &str = "10000";

/// Paged list response of the platform API
#[derive(Debug, Deserialize)]
struct Paged<T> {
    results: Vec<T>,
}

/// reqwest-backed client for the platform REST API
#[derive(Debug, Clone)]
pub struct LajiApiClient {
    base_url: String,
    access_token: Option<String>,
    species_root_taxon: String,
    http_client: HttpClient,
}

impl LajiApiClient {
    /// Create a client from configuration
    pub fn new(config: &FormBuilderConfig) -> Result<Self, ClientError> {
        let http_client = HttpClient::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            base_url: config.api_base.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            species_root_taxon: config.species_root_taxon.clone(),
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.query(&[("access_token", token.as_str())]),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        debug!("GET {} {:?}", path, params);
        let request = self.authorize(self.http_client.get(self.url(path)).query(params));
        Self::decode(request.send().await?).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::http(status.as_u16(), message));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::decode(e.to_string()))
    }

    async fn check(response: Response) -> Result<(), ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(ClientError::http(status.as_u16(), message))
        }
    }
}

#[async_trait]
impl MetadataCatalog for LajiApiClient {
    async fn class_properties(&self, class: &str) -> Result<Vec<Property>, ClientError> {
        let page: Paged<Property> = self
            .get_json(
                &format!("metadata/classes/{}/properties", class),
                &[("lang", "multi")],
            )
            .await?;
        Ok(page.results)
    }

    async fn alt_ranges(&self, range: &str) -> Result<Vec<RangeEntry>, ClientError> {
        self.get_json(&format!("metadata/alts/{}", range), &[("lang", "multi")])
            .await
    }

    async fn all_alt_ranges(&self) -> Result<HashMap<String, Vec<RangeEntry>>, ClientError> {
        self.get_json("metadata/alts", &[("lang", "multi")]).await
    }
}

#[async_trait]
impl TaxonomyCatalog for LajiApiClient {
    async fn taxon_set(&self, set_id: &str) -> Result<Vec<String>, ClientError> {
        let page: Paged<TaxonSummary> = self
            .get_json(
                "taxa",
                &[
                    ("taxonSets", set_id),
                    ("selectedFields", "id"),
                    ("pageSize", TAXA_PAGE_SIZE),
                ],
            )
            .await?;
        Ok(page.results.into_iter().map(|taxon| taxon.id).collect())
    }

    async fn species_by_informal_groups(
        &self,
        groups: &[String],
    ) -> Result<Vec<TaxonSummary>, ClientError> {
        let groups = groups.join(",");
        let page: Paged<TaxonSummary> = self
            .get_json(
                &format!("taxa/{}/species", self.species_root_taxon),
                &[
                    ("informalGroupFilters", groups.as_str()),
                    ("selectedFields", "id,scientificName,vernacularName"),
                    ("onlyFinnish", "true"),
                    ("taxonRanks", "MX.species"),
                    ("pageSize", TAXA_PAGE_SIZE),
                ],
            )
            .await?;
        Ok(page.results)
    }
}

#[async_trait]
impl FormStore for LajiApiClient {
    async fn get_forms(&self) -> Result<Vec<Value>, ClientError> {
        let page: Paged<Value> = self.get_json("forms", &[("lang", "multi")]).await?;
        Ok(page.results)
    }

    async fn get_form(&self, id: &str) -> Result<Master, ClientError> {
        self.get_json(&format!("forms/{}", id), &[("format", "json")])
            .await
    }

    async fn create_form(&self, form: Master) -> Result<Master, ClientError> {
        let request = self.authorize(self.http_client.post(self.url("forms")).json(&form));
        Self::decode(request.send().await?).await
    }

    async fn update_form(&self, id: &str, form: Master) -> Result<Master, ClientError> {
        let request = self.authorize(
            self.http_client
                .put(self.url(&format!("forms/{}", id)))
                .json(&form),
        );
        Self::decode(request.send().await?).await
    }

    async fn delete_form(&self, id: &str) -> Result<(), ClientError> {
        let request = self.authorize(self.http_client.delete(self.url(&format!("forms/{}", id))));
        Self::check(request.send().await?).await
    }
}
