//! Collaborator Clients
//!
//! The compiler depends on three remote collaborators, each behind an
//! `async_trait` so services can be exercised against in-memory fakes:
//!
//! - [`MetadataCatalog`] - class property lists, alt ranges and labels
//! - [`TaxonomyCatalog`] - taxon sets and species by informal group
//! - [`FormStore`] - storage of Master form definitions
//!
//! [`LajiApiClient`] implements all three against the platform REST API.

mod error;
mod form_store;
mod laji_client;
mod metadata_catalog;
mod taxonomy;

pub use error::ClientError;
pub use form_store::FormStore;
pub use laji_client::LajiApiClient;
pub use metadata_catalog::MetadataCatalog;
pub use taxonomy::{TaxonSummary, TaxonomyCatalog};
