//! Business Services
//!
//! This module contains the form compiler:
//!
//! - `FieldService` - Pipeline orchestration (inheritance, patches, root resolution)
//! - `MetadataService` - Memoized catalog access and property schemas
//! - `SchemaService` - SchemaFormat back-end
//! - `ExpandedJsonService` - ExpandedJSONFormat back-end
//! - `UiSchemaService` - Derived uiSchema fragments
//! - `StoreService` - Cached form storage access
//!
//! Services coordinate between the collaborator clients and the output
//! models; the HTTP layer only talks to `FieldService`.

pub mod converter_service;
pub mod default_validators;
pub mod error;
pub mod expanded_json_service;
pub mod field_service;
pub mod metadata_service;
pub mod schema_service;
pub mod store_service;
pub mod uischema_service;

pub use converter_service::{localize, resolve_field_tree, ConverterService, ResolvedField};
pub use error::FormServiceError;
pub use expanded_json_service::ExpandedJsonService;
pub use field_service::{FieldService, LinkedMaster};
pub use metadata_service::MetadataService;
pub use schema_service::SchemaService;
pub use store_service::StoreService;
pub use uischema_service::UiSchemaService;
