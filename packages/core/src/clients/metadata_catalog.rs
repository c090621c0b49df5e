//! MetadataCatalog Trait - Property Catalog Abstraction
//!
//! The catalog is the source of truth for class property lists, alt ranges
//! and their labels. Labels are always requested as multi-language maps, so
//! responses do not depend on the active form language.

use crate::clients::ClientError;
use crate::models::{Property, RangeEntry};
use async_trait::async_trait;
use std::collections::HashMap;

/// Read access to the metadata catalog
///
/// Implementations must be `Send + Sync`; [`MetadataService`] shares one
/// instance across concurrent conversions and memoizes every call.
///
/// [`MetadataService`]: crate::services::MetadataService
#[async_trait]
pub trait MetadataCatalog: Send + Sync {
    /// Properties of a class, e.g. `MY.gathering`
    async fn class_properties(&self, class: &str) -> Result<Vec<Property>, ClientError>;

    /// Members of an alt range
    async fn alt_ranges(&self, range: &str) -> Result<Vec<RangeEntry>, ClientError>;

    /// Every alt range of the catalog, keyed by range id
    async fn all_alt_ranges(&self) -> Result<HashMap<String, Vec<RangeEntry>>, ClientError>;
}
