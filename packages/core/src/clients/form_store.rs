//! FormStore Trait - Form Storage Abstraction
//!
//! Persistence of Master definitions is delegated to a remote storage
//! service. The compiler only reads through it (to resolve `baseFormID` and
//! `formID` references); the HTTP layer passes mutations straight through.

use crate::clients::ClientError;
use crate::models::Master;
use async_trait::async_trait;
use serde_json::Value;

/// Storage of Master form definitions
///
/// A missing form must be reported as `ClientError::Http` with status 404
/// so the status can be propagated to the caller.
#[async_trait]
pub trait FormStore: Send + Sync {
    /// Summaries of every stored form
    async fn get_forms(&self) -> Result<Vec<Value>, ClientError>;

    /// A form by id
    async fn get_form(&self, id: &str) -> Result<Master, ClientError>;

    /// Store a new form, returning it with its assigned id
    async fn create_form(&self, form: Master) -> Result<Master, ClientError>;

    /// Replace a stored form
    async fn update_form(&self, id: &str, form: Master) -> Result<Master, ClientError>;

    /// Delete a stored form
    async fn delete_form(&self, id: &str) -> Result<(), ClientError>;
}
