//! Compiled Form Formats
//!
//! The two compiler outputs:
//!
//! - [`SchemaFormat`] - JSON-Schema-shaped schema with uiSchema, validator
//!   trees and derived metadata
//! - [`ExpandedJsonFormat`] - simplified tree of typed field nodes
//!
//! [`ConvertedForm`] is the closed sum over both, serialized untagged so the
//! HTTP layer can return either shape as-is.

use crate::models::lang::{deserialize_translations, Lang, Translations};
use crate::services::FormServiceError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Requested output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Schema,
    Json,
}

impl FromStr for Format {
    type Err = FormServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schema" => Ok(Format::Schema),
            "json" => Ok(Format::Json),
            other => Err(FormServiceError::unprocessable(format!(
                "Invalid format '{}', must be one of schema, json",
                other
            ))),
        }
    }
}

/// JSON-Schema-shaped compiled form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub schema: Value,

    pub ui_schema: Value,

    pub validators: Value,

    pub warnings: Value,

    #[serde(default)]
    pub exclude_from_copy: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_schema_context: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,

    #[serde(
        default,
        deserialize_with = "deserialize_translations",
        skip_serializing_if = "Translations::is_empty"
    )]
    pub translations: Translations,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Lang>,

    /// Untouched authored top-level keys (`name`, `collectionID`, ...)
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Typed field node of the expanded JSON format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpandedField {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ExpandedField>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validators: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Value>,
}

/// Master with its field tree replaced by typed nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedJsonFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub fields: Vec<ExpandedField>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,

    #[serde(
        default,
        deserialize_with = "deserialize_translations",
        skip_serializing_if = "Translations::is_empty"
    )]
    pub translations: Translations,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_schema: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Lang>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Either compiler output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConvertedForm {
    Schema(SchemaFormat),
    Json(ExpandedJsonFormat),
}

impl ConvertedForm {
    pub fn format(&self) -> Format {
        match self {
            ConvertedForm::Schema(_) => Format::Schema,
            ConvertedForm::Json(_) => Format::Json,
        }
    }

    pub fn into_schema(self) -> Option<SchemaFormat> {
        match self {
            ConvertedForm::Schema(schema) => Some(schema),
            ConvertedForm::Json(_) => None,
        }
    }

    pub fn into_json(self) -> Option<ExpandedJsonFormat> {
        match self {
            ConvertedForm::Json(json) => Some(json),
            ConvertedForm::Schema(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_parsing() {
        assert_eq!("schema".parse::<Format>().unwrap(), Format::Schema);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert!("xml".parse::<Format>().unwrap_err().is_unprocessable());
    }

    #[test]
    fn test_converted_form_serializes_untagged() {
        let form = ConvertedForm::Schema(SchemaFormat {
            schema: json!({ "type": "object", "properties": {} }),
            ui_schema: json!({}),
            validators: json!({}),
            warnings: json!({}),
            ..Default::default()
        });

        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(value["schema"]["type"], "object");
        assert_eq!(value["excludeFromCopy"], json!([]));
        assert!(value.get("Schema").is_none());
    }

    #[test]
    fn test_expanded_field_type_rename() {
        let field = ExpandedField {
            name: "count".to_string(),
            field_type: "text".to_string(),
            ..Default::default()
        };

        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value, json!({ "name": "count", "type": "text" }));
    }
}
