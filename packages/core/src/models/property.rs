//! Catalog Property Metadata
//!
//! Property and range definitions as served by the metadata catalog. A
//! property's `range` names either a primitive XSD-like type
//! (`xsd:string`, `xsd:boolean`, ...), an enumerable "alt range" whose
//! members are [`RangeEntry`] values, or an embeddable class with its own
//! property list.

use crate::models::lang::{pick_label, Lang, LangMap};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// `maxOccurs` value marking a repeated property
pub const UNBOUNDED: &str = "unbounded";

fn default_min_occurs() -> String {
    "0".to_string()
}

fn default_max_occurs() -> String {
    "1".to_string()
}

/// Metadata of a single catalog property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Fully qualified property id, e.g. `MY.gatherings`
    pub property: String,

    /// First element is the type or class of the property
    #[serde(default)]
    pub range: Vec<String>,

    #[serde(default)]
    pub is_embeddable: bool,

    #[serde(default)]
    pub multi_language: bool,

    #[serde(default = "default_min_occurs", deserialize_with = "deserialize_occurs")]
    pub min_occurs: String,

    #[serde(default = "default_max_occurs", deserialize_with = "deserialize_occurs")]
    pub max_occurs: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default, deserialize_with = "deserialize_lang_map")]
    pub label: LangMap,

    #[serde(default, deserialize_with = "deserialize_lang_map")]
    pub comment: LangMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
}

impl Property {
    /// Create a bare property with the given id and range, cardinality 0..1
    pub fn new(property: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            range: vec![range.into()],
            is_embeddable: false,
            multi_language: false,
            min_occurs: default_min_occurs(),
            max_occurs: default_max_occurs(),
            required: false,
            label: LangMap::new(),
            comment: LangMap::new(),
            short_name: None,
        }
    }

    /// Synthetic property for a field the catalog does not know
    ///
    /// The field's literal `type` decides the range, using the same type
    /// names the expanded JSON format emits.
    pub fn synthetic(name: &str, field_type: &str) -> Self {
        let range = match field_type {
            "checkbox" | "boolean" => "xsd:boolean",
            "integer" => "xsd:integer",
            "integer:nonNegativeInteger" => "xsd:nonNegativeInteger",
            "integer:positiveInteger" => "xsd:positiveInteger",
            "number" => "xsd:decimal",
            _ => "xsd:string",
        };
        let mut property = Property::new(name, range);
        match field_type {
            "fieldset" => {
                property.range = Vec::new();
                property.is_embeddable = true;
            }
            "collection" => property.max_occurs = UNBOUNDED.to_string(),
            _ => {}
        }
        property
    }

    /// Name the author uses for this property in a Master
    pub fn short_name(&self) -> &str {
        self.short_name
            .as_deref()
            .unwrap_or_else(|| unprefix(&self.property))
    }

    /// Type or class of the property, empty for untyped synthetic fieldsets
    pub fn range_id(&self) -> &str {
        self.range.first().map(String::as_str).unwrap_or("")
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_occurs == UNBOUNDED
    }

    /// Catalog `required` or a positive `minOccurs`
    pub fn is_required(&self) -> bool {
        self.required || self.min_occurs.parse::<u64>().map_or(false, |n| n > 0)
    }

    pub fn label_in(&self, lang: Lang) -> String {
        pick_label(&self.label, lang)
    }

    pub fn comment_in(&self, lang: Lang) -> String {
        pick_label(&self.comment, lang)
    }
}

/// One member of an alt range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeEntry {
    pub id: String,

    #[serde(default, deserialize_with = "deserialize_lang_map")]
    pub value: LangMap,

    /// Immediate parent member in the range hierarchy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_parent: Option<String>,
}

impl RangeEntry {
    pub fn label_in(&self, lang: Lang) -> String {
        pick_label(&self.value, lang)
    }
}

/// Strip the namespace prefix of a catalog id: `MY.gatherings` → `gatherings`
pub fn unprefix(id: &str) -> &str {
    id.rsplit_once('.').map_or(id, |(_, name)| name)
}

/// Strip the `xsd:` or namespace prefix of a primitive range tag
pub fn range_tag(range: &str) -> &str {
    unprefix(range.rsplit_once(':').map_or(range, |(_, tag)| tag))
}

/// Occurrence counts arrive as strings, but numbers are tolerated
fn deserialize_occurs<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "invalid occurrence value: {}",
            other
        ))),
    }
}

/// Accepts a `{lang: text}` map (unknown languages ignored) or a plain string
/// that then stands for every language
fn deserialize_lang_map<'de, D>(deserializer: D) -> Result<LangMap, D::Error>
where
    D: Deserializer<'de>,
{
    let mut labels = LangMap::new();
    match Value::deserialize(deserializer)? {
        Value::String(text) => {
            for lang in Lang::ALL {
                labels.insert(lang, text.clone());
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                if let (Ok(lang), Value::String(text)) = (key.parse::<Lang>(), value) {
                    labels.insert(lang, text);
                }
            }
        }
        _ => {}
    }
    Ok(labels)
}
