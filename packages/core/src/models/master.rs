//! Master Form Definitions
//!
//! A `Master` is the compact, author-facing form definition. It names fields
//! by their unprefixed catalog property names and leaves everything the
//! catalog already knows (types, labels, cardinality) implicit.
//!
//! ## Example Master
//!
//! ```json
//! {
//!   "name": "Trip report",
//!   "baseFormID": "JX.519",
//!   "fields": [
//!     { "name": "secureLevel", "options": { "whitelist": ["MX.secureLevelKM5"] } },
//!     { "name": "gatherings", "fields": [{ "name": "geometry" }] },
//!     { "formID": "JX.652" }
//!   ],
//!   "translations": { "fi": { "@title": "Retkiraportti" } },
//!   "patch": [{ "op": "add", "path": "/uiSchema/ui:title", "value": "@title" }]
//! }
//! ```

use crate::models::lang::{deserialize_translations, Lang, Translations};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author-facing form definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Master {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,

    /// Form-level options (e.g. `prepopulatedDocument`)
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

    /// Form this one inherits from
    #[serde(rename = "baseFormID", skip_serializing_if = "Option::is_none")]
    pub base_form_id: Option<String>,

    /// JSON Patch document applied after inheritance is resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Value>,

    /// Unprefixed name of the root metadata class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Derived per-property metadata (alt range hierarchies)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Lang>,

    /// Authored top-level keys the compiler carries through untouched
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Master after inheritance, patches and language resolution
///
/// Same shape as [`Master`], but with no outstanding `baseFormID`, `patch`
/// or `formID` extension fields.
pub type ExpandedMaster = Master;

/// A node of the author's field tree
///
/// Either a regular field named after a catalog property, or an extension
/// field carrying only `formID`, which splices another form's fields in at
/// its position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(rename = "formID", skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,

    #[serde(default, skip_serializing_if = "FieldOptions::is_empty")]
    pub options: FieldOptions,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validators: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Literal type; gives unknown fields a shape and marks hidden fields
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
}

impl Field {
    /// Create a field with the given name and no options
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a field with children
    pub fn with_fields(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
            ..Default::default()
        }
    }

    /// Whether this is a `formID` extension field
    pub fn is_extension(&self) -> bool {
        self.form_id.is_some()
    }

    /// Whether the author declared `type: "hidden"`
    pub fn is_hidden(&self) -> bool {
        self.field_type.as_deref() == Some("hidden")
    }
}

/// Per-field options
///
/// Known keys are typed; anything else the author puts into `options` is
/// kept in `rest` and passed through to the expanded output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(
        rename = "excludeFromCopy",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub exclude_from_copy: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<Vec<String>>,

    /// Explicit enum members, `{value → label}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_options: Option<Map<String, Value>>,

    #[serde(rename = "uniqueItems", skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,

    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl FieldOptions {
    pub fn is_empty(&self) -> bool {
        self == &FieldOptions::default()
    }

    /// Apply whitelist then blacklist to a list of enum values
    ///
    /// Whitelist keeps only listed values, blacklist drops listed values. When
    /// both are declared both apply, blacklist last.
    pub fn allows(&self, value: &str) -> bool {
        let whitelisted = self
            .whitelist
            .as_ref()
            .map_or(true, |list| list.iter().any(|v| v == value));
        let blacklisted = self
            .blacklist
            .as_ref()
            .is_some_and(|list| list.iter().any(|v| v == value));
        whitelisted && !blacklisted
    }

    /// Whether any enum filtering is declared
    pub fn filters_enum(&self) -> bool {
        self.whitelist.is_some() || self.blacklist.is_some()
    }
}
