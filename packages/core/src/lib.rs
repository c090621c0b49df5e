//! Form Builder Core
//!
//! Compiles compact "Master" form definitions into renderable forms.
//!
//! # Architecture
//!
//! - **Master in, two formats out**: `SchemaFormat` (JSON Schema + uiSchema +
//!   validators) or `ExpandedJSONFormat` (typed field tree)
//! - **Catalog-driven**: field types, labels and cardinality come from the
//!   remote metadata catalog, memoized per process
//! - **Inheritance**: `baseFormID`, `formID` extensions and JSON Patch are
//!   resolved before compilation
//!
//! # Modules
//!
//! - [`models`] - Master, catalog property and output types
//! - [`services`] - The compiler pipeline (FieldService, SchemaService, etc.)
//! - [`clients`] - Collaborator traits and the REST API client
//! - [`config`] - Environment-driven configuration
//! - [`utils`] - JSON tree helpers

pub mod clients;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::FormBuilderConfig;
pub use models::*;
pub use services::*;
