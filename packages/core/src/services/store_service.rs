//! Store Service
//!
//! Caching facade over the [`FormStore`] collaborator. Reads are memoized;
//! any mutation drops the whole cache since inheriting forms may depend on
//! the changed one.

use crate::clients::FormStore;
use crate::models::Master;
use crate::services::FormServiceError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

pub struct StoreService {
    store: Arc<dyn FormStore>,

    /// form id → form
    forms: RwLock<HashMap<String, Master>>,

    list: RwLock<Option<Arc<Vec<Value>>>>,
}

impl StoreService {
    pub fn new(store: Arc<dyn FormStore>) -> Self {
        Self {
            store,
            forms: RwLock::new(HashMap::new()),
            list: RwLock::new(None),
        }
    }

    pub async fn get_forms(&self) -> Result<Arc<Vec<Value>>, FormServiceError> {
        if let Some(list) = self.list.read().await.as_ref() {
            return Ok(Arc::clone(list));
        }

        let list = Arc::new(
            self.store
                .get_forms()
                .await
                .map_err(FormServiceError::from_store)?,
        );
        *self.list.write().await = Some(Arc::clone(&list));
        Ok(list)
    }

    pub async fn get_form(&self, id: &str) -> Result<Master, FormServiceError> {
        if let Some(form) = self.forms.read().await.get(id) {
            debug!("Form cache hit: {}", id);
            return Ok(form.clone());
        }

        debug!("Form cache miss: {}", id);
        let form = self
            .store
            .get_form(id)
            .await
            .map_err(FormServiceError::from_store)?;
        self.forms
            .write()
            .await
            .insert(id.to_string(), form.clone());
        Ok(form)
    }

    pub async fn create_form(&self, form: Master) -> Result<Master, FormServiceError> {
        let created = self
            .store
            .create_form(form)
            .await
            .map_err(FormServiceError::from_store)?;
        self.flush().await;
        Ok(created)
    }

    pub async fn update_form(&self, id: &str, form: Master) -> Result<Master, FormServiceError> {
        let updated = self
            .store
            .update_form(id, form)
            .await
            .map_err(FormServiceError::from_store)?;
        self.flush().await;
        Ok(updated)
    }

    pub async fn delete_form(&self, id: &str) -> Result<(), FormServiceError> {
        self.store
            .delete_form(id)
            .await
            .map_err(FormServiceError::from_store)?;
        self.flush().await;
        Ok(())
    }

    pub async fn flush(&self) {
        self.forms.write().await.clear();
        *self.list.write().await = None;
    }
}
