//! TaxonomyCatalog Trait - Taxonomy Lookups

use crate::clients::ClientError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Minimal taxon record used for prepopulating documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonSummary {
    pub id: String,

    #[serde(default)]
    pub scientific_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vernacular_name: Option<String>,
}

/// Taxonomy lookups needed by the compiler
#[async_trait]
pub trait TaxonomyCatalog: Send + Sync {
    /// Ids of the taxa belonging to a taxon set
    async fn taxon_set(&self, set_id: &str) -> Result<Vec<String>, ClientError>;

    /// Species belonging to any of the given informal taxon groups
    async fn species_by_informal_groups(
        &self,
        groups: &[String],
    ) -> Result<Vec<TaxonSummary>, ClientError>;
}
