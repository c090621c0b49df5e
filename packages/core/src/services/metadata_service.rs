//! Metadata Service
//!
//! Memoizing facade over the [`MetadataCatalog`] collaborator, and the
//! conversion of a single catalog property into a JSON Schema fragment.
//!
//! # Caching
//!
//! Every catalog call is memoized for the lifetime of the service, keyed by
//! the exact argument (class id or range id). The bulk
//! `all_alt_ranges` response backs [`MetadataService::is_alt_range`], so range
//! checks are map lookups once it has been fetched. [`MetadataService::flush`]
//! clears everything; the HTTP layer calls it when catalog data changes.
//!
//! Labels are fetched as multi-language maps, so cache entries do not depend
//! on the active language. The language is an argument of the schema
//! producing operations instead.

use crate::clients::MetadataCatalog;
use crate::models::{range_tag, Lang, Property, RangeEntry};
use crate::services::FormServiceError;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type AllRanges = Arc<HashMap<String, Vec<RangeEntry>>>;

/// Memoizing metadata catalog access
pub struct MetadataService {
    catalog: Arc<dyn MetadataCatalog>,

    /// class id → property list
    properties: RwLock<HashMap<String, Arc<Vec<Property>>>>,

    /// range id → members
    ranges: RwLock<HashMap<String, Arc<Vec<RangeEntry>>>>,

    all_ranges: RwLock<Option<AllRanges>>,
}

impl MetadataService {
    pub fn new(catalog: Arc<dyn MetadataCatalog>) -> Self {
        Self {
            catalog,
            properties: RwLock::new(HashMap::new()),
            ranges: RwLock::new(HashMap::new()),
            all_ranges: RwLock::new(None),
        }
    }

    /// Properties of a class
    pub async fn get_properties(&self, class: &str) -> Result<Arc<Vec<Property>>, FormServiceError> {
        if let Some(cached) = self.properties.read().await.get(class) {
            return Ok(Arc::clone(cached));
        }

        debug!("Fetching properties of class {}", class);
        let properties = Arc::new(
            self.catalog
                .class_properties(class)
                .await
                .map_err(FormServiceError::from_catalog)?,
        );
        self.properties
            .write()
            .await
            .insert(class.to_string(), Arc::clone(&properties));
        Ok(properties)
    }

    /// Every alt range, fetched once
    pub async fn get_all_ranges(&self) -> Result<AllRanges, FormServiceError> {
        if let Some(cached) = self.all_ranges.read().await.as_ref() {
            return Ok(Arc::clone(cached));
        }

        debug!("Fetching all alt ranges");
        let ranges = Arc::new(
            self.catalog
                .all_alt_ranges()
                .await
                .map_err(FormServiceError::from_catalog)?,
        );
        *self.all_ranges.write().await = Some(Arc::clone(&ranges));
        Ok(ranges)
    }

    /// Whether `range` is an enumerable alt range
    pub async fn is_alt_range(&self, range: &str) -> Result<bool, FormServiceError> {
        Ok(self.get_all_ranges().await?.contains_key(range))
    }

    /// Members of an alt range
    ///
    /// Served from the bulk range map when it knows the range, otherwise
    /// fetched individually.
    pub async fn get_range(&self, range: &str) -> Result<Arc<Vec<RangeEntry>>, FormServiceError> {
        if let Some(cached) = self.ranges.read().await.get(range) {
            return Ok(Arc::clone(cached));
        }

        let all = self.get_all_ranges().await?;
        let entries = match all.get(range) {
            Some(entries) => Arc::new(entries.clone()),
            None => {
                debug!("Fetching alt range {}", range);
                Arc::new(
                    self.catalog
                        .alt_ranges(range)
                        .await
                        .map_err(FormServiceError::from_catalog)?,
                )
            }
        };
        self.ranges
            .write()
            .await
            .insert(range.to_string(), Arc::clone(&entries));
        Ok(entries)
    }

    /// Clear every memoized catalog response
    pub async fn flush(&self) {
        debug!("Flushing metadata caches");
        self.properties.write().await.clear();
        self.ranges.write().await.clear();
        *self.all_ranges.write().await = None;
    }

    /// JSON Schema fragment for a property, without array wrapping or title
    ///
    /// 1. Alt ranges become enums, see [`enum_schema`]
    /// 2. Multi-language properties become `{fi, sv, en}` string objects
    /// 3. Primitive ranges map to primitive schemas; unknown non-embeddable
    ///    ranges default to string; embeddable ranges expand to the full
    ///    object schema of the class
    pub async fn json_schema_for_range(
        &self,
        property: &Property,
        lang: Lang,
        use_enums: bool,
    ) -> Result<Value, FormServiceError> {
        self.range_schema(property, lang, use_enums, Vec::new()).await
    }

    /// JSON Schema fragment for a property, array-wrapped and titled
    pub async fn json_schema_from_property(
        &self,
        property: &Property,
        lang: Lang,
        use_enums: bool,
    ) -> Result<Value, FormServiceError> {
        self.property_schema(property, lang, use_enums, Vec::new())
            .await
    }

    fn property_schema<'a>(
        &'a self,
        property: &'a Property,
        lang: Lang,
        use_enums: bool,
        visited: Vec<String>,
    ) -> BoxFuture<'a, Result<Value, FormServiceError>> {
        async move {
            let schema = self.range_schema(property, lang, use_enums, visited).await?;
            self.wrap_property_schema(property, schema, lang).await
        }
        .boxed()
    }

    /// Give a property's value schema its cardinality and catalog title
    ///
    /// Unbounded properties wrap `schema` in an array, with `uniqueItems`
    /// when the range is an alt range.
    pub async fn wrap_property_schema(
        &self,
        property: &Property,
        schema: Value,
        lang: Lang,
    ) -> Result<Value, FormServiceError> {
        let mut schema = if property.is_unbounded() {
            let is_alt =
                !property.is_embeddable && self.is_alt_range(property.range_id()).await?;
            array_schema(schema, is_alt)
        } else {
            schema
        };

        let title = property.label_in(lang);
        if !title.is_empty() {
            if let Value::Object(map) = &mut schema {
                map.insert("title".to_string(), Value::String(title));
            }
        }
        Ok(schema)
    }

    fn range_schema<'a>(
        &'a self,
        property: &'a Property,
        lang: Lang,
        use_enums: bool,
        visited: Vec<String>,
    ) -> BoxFuture<'a, Result<Value, FormServiceError>> {
        async move {
            let range = property.range_id();

            if property.is_embeddable {
                // Recursive classes are cut off at the first repetition
                if range.is_empty() || visited.iter().any(|v| v == range) {
                    return Ok(object_schema(Map::new(), Vec::new()));
                }
                let mut visited = visited;
                visited.push(range.to_string());

                let children = self.get_properties(range).await?;
                let mut properties = Map::new();
                let mut required = Vec::new();
                for child in children.iter() {
                    let schema = self
                        .property_schema(child, lang, use_enums, visited.clone())
                        .await?;
                    if child.is_required() {
                        required.push(child.short_name().to_string());
                    }
                    properties.insert(child.short_name().to_string(), schema);
                }
                return Ok(object_schema(properties, required));
            }

            if self.is_alt_range(range).await? {
                let entries = self.get_range(range).await?;
                let include_empty = property.min_occurs != "1";
                return Ok(enum_schema(&entries, lang, use_enums, include_empty));
            }

            if property.multi_language {
                return Ok(multi_language_schema());
            }

            Ok(primitive_schema(range))
        }
        .boxed()
    }
}

/// Enum schema from alt range members
///
/// Members become `oneOf: [{const, title}]`, or parallel `enum`/`enumNames`
/// arrays when `use_enums` is set. An empty member is prepended when
/// `include_empty` is set.
pub fn enum_schema(entries: &[RangeEntry], lang: Lang, use_enums: bool, include_empty: bool) -> Value {
    let mut members: Vec<(String, String)> = Vec::with_capacity(entries.len() + 1);
    if include_empty {
        members.push((String::new(), String::new()));
    }
    members.extend(entries.iter().map(|e| (e.id.clone(), e.label_in(lang))));

    if use_enums {
        let (values, names): (Vec<_>, Vec<_>) = members.into_iter().unzip();
        json!({ "type": "string", "enum": values, "enumNames": names })
    } else {
        let one_of: Vec<Value> = members
            .into_iter()
            .map(|(value, title)| json!({ "const": value, "title": title }))
            .collect();
        json!({ "type": "string", "oneOf": one_of })
    }
}

/// Schema of a primitive range tag; unknown tags default to string
pub fn primitive_schema(range: &str) -> Value {
    match range_tag(range) {
        "boolean" => json!({ "type": "boolean" }),
        "integer" => json!({ "type": "integer" }),
        "nonNegativeInteger" => json!({ "type": "integer", "minimum": 0 }),
        "positiveInteger" => json!({ "type": "integer", "exclusiveMinimum": 0 }),
        "decimal" => json!({ "type": "number" }),
        "dateTime" => json!({ "type": "string", "format": "date-time" }),
        "keyValue" | "keyAny" => json!({ "type": "object", "properties": {} }),
        _ => json!({ "type": "string" }),
    }
}

/// `{fi, sv, en}` string object
pub fn multi_language_schema() -> Value {
    let properties: Map<String, Value> = Lang::ALL
        .iter()
        .map(|lang| (lang.as_str().to_string(), json!({ "type": "string" })))
        .collect();
    json!({ "type": "object", "properties": properties })
}

/// Object schema with an optional `required` list
pub fn object_schema(properties: Map<String, Value>, required: Vec<String>) -> Value {
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), json!(required));
    }
    Value::Object(schema)
}

/// Wrap `items` in an array schema; enum arrays get `uniqueItems`
pub fn array_schema(items: Value, unique_items: bool) -> Value {
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("array"));
    schema.insert("items".to_string(), items);
    if unique_items {
        schema.insert("uniqueItems".to_string(), json!(true));
    }
    Value::Object(schema)
}

#[cfg(test)]
#[path = "metadata_service_test.rs"]
mod metadata_service_test;
