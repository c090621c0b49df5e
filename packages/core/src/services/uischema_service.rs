//! UiSchema Service
//!
//! Derives the structural part of a uiSchema from catalog metadata. The
//! derived tree sits *under* the authored uiSchema: author keys always win.

use crate::models::{Lang, Property};
use crate::services::ResolvedField;
use crate::utils::{deep_merge, is_empty_object};
use serde_json::{json, Map, Value};

/// Widget used for `{fi, sv, en}` objects
pub const MULTI_LANGUAGE_FIELD: &str = "MultiLanguageField";

/// Derives uiSchema fragments from property metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct UiSchemaService;

impl UiSchemaService {
    pub fn new() -> Self {
        Self
    }

    /// uiSchema fragment of a single leaf property
    ///
    /// Multi-language properties get the multi-language widget, catalog
    /// comments become help texts, and repeated primitives carry the
    /// fragment under `items`.
    pub fn ui_schema_for_property(&self, property: &Property, lang: Lang) -> Value {
        let mut ui = Map::new();
        if property.multi_language {
            ui.insert("ui:field".to_string(), json!(MULTI_LANGUAGE_FIELD));
        }
        let comment = property.comment_in(lang);
        if !comment.is_empty() {
            ui.insert("ui:help".to_string(), Value::String(comment));
        }

        if ui.is_empty() {
            return Value::Object(ui);
        }
        if property.is_unbounded() && !property.is_embeddable {
            json!({ "items": ui })
        } else {
            Value::Object(ui)
        }
    }

    /// Derived uiSchema of the children of `node`
    ///
    /// Children of repeated embeddables nest under `items`; empty fragments
    /// are left out.
    pub fn derive(&self, node: &ResolvedField, lang: Lang) -> Value {
        let mut ui = Map::new();
        for child in &node.children {
            let fragment = if child.property.is_embeddable {
                let nested = self.derive(child, lang);
                if child.property.is_unbounded() && !is_empty_object(&nested) {
                    json!({ "items": nested })
                } else {
                    nested
                }
            } else {
                self.ui_schema_for_property(&child.property, lang)
            };
            if !is_empty_object(&fragment) {
                ui.insert(child.name().to_string(), fragment);
            }
        }
        Value::Object(ui)
    }

    /// Merge the authored uiSchema over the derived one
    pub fn merge_under(&self, derived: Value, authored: Option<Value>) -> Value {
        match authored {
            Some(authored) if !authored.is_null() => deep_merge(derived, authored),
            _ => derived,
        }
    }
}
