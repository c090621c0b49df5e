//! Expanded JSON Service
//!
//! Compiles a resolved field tree into the simplified typed field tree of
//! [`ExpandedJsonFormat`]. Labels of catalog properties and alt range
//! members are written into a translations accumulator the first time they
//! are met; the accumulator lives for a single `convert` call and starts out
//! as the Master's own translations, so authored entries always win.

use crate::models::{range_tag, ExpandedField, ExpandedMaster, ExpandedJsonFormat, Lang, Property, Translations};
use crate::services::converter_service::{localize, ConverterService, ResolvedField};
use crate::services::{FormServiceError, MetadataService};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Type of repeated fields; the item type moves to `options.target_element`
pub const COLLECTION_TYPE: &str = "collection";

/// Compiles Masters into [`ExpandedJsonFormat`]
pub struct ExpandedJsonService {
    metadata: Arc<MetadataService>,
}

impl ExpandedJsonService {
    pub fn new(metadata: Arc<MetadataService>) -> Self {
        Self { metadata }
    }

    /// Typed node of one resolved field
    ///
    /// Children are expanded one after another since they share the
    /// accumulator.
    pub fn field_to_expanded<'a>(
        &'a self,
        node: &'a ResolvedField,
        translations: &'a mut Translations,
    ) -> BoxFuture<'a, Result<ExpandedField, FormServiceError>> {
        async move {
            let ResolvedField {
                field,
                property,
                children,
            } = node;

            let mut fields = Vec::with_capacity(children.len());
            for child in children {
                fields.push(self.field_to_expanded(child, &mut *translations).await?);
            }

            let mut options = match serde_json::to_value(&field.options)? {
                Value::Object(options) => options,
                _ => Map::new(),
            };

            let mut field_type = if property.is_embeddable {
                "fieldset".to_string()
            } else {
                self.map_range(property, &mut options, translations).await?
            };
            if let Some(explicit) = field.field_type.as_deref() {
                if explicit != COLLECTION_TYPE {
                    field_type = explicit.to_string();
                }
            }

            if field.options.filters_enum() {
                if let Some(Value::Object(value_options)) = options.get_mut("value_options") {
                    value_options.retain(|value, _| field.options.allows(value));
                }
            }
            options.remove("whitelist");
            options.remove("blacklist");

            if property.is_unbounded() {
                options.insert("target_element".to_string(), json!({ "type": field_type }));
                field_type = COLLECTION_TYPE.to_string();
            }

            let label = match &field.label {
                Some(label) => label.clone(),
                None => {
                    let key = format!("@{}", field.name);
                    for lang in Lang::ALL {
                        translations
                            .entry(lang)
                            .or_default()
                            .entry(key.clone())
                            .or_insert_with(|| property.label_in(lang));
                    }
                    key
                }
            };

            Ok(ExpandedField {
                name: field.name.clone(),
                field_type,
                label: Some(label),
                options,
                fields,
                validators: field.validators.clone(),
                warnings: field.warnings.clone(),
            })
        }
        .boxed()
    }

    /// Type tag of a non-embeddable property
    ///
    /// Alt ranges become `select` with `value_options` `{id → "@id"}` unless
    /// the author declared their own members; member labels are recorded
    /// in every language.
    pub async fn map_range(
        &self,
        property: &Property,
        options: &mut Map<String, Value>,
        translations: &mut Translations,
    ) -> Result<String, FormServiceError> {
        let range = property.range_id();
        if self.metadata.is_alt_range(range).await? {
            if !options.contains_key("value_options") {
                let entries = self.metadata.get_range(range).await?;
                let mut value_options = Map::new();
                for entry in entries.iter() {
                    let key = format!("@{}", entry.id);
                    for lang in Lang::ALL {
                        translations
                            .entry(lang)
                            .or_default()
                            .entry(key.clone())
                            .or_insert_with(|| entry.label_in(lang));
                    }
                    value_options.insert(entry.id.clone(), Value::String(key));
                }
                options.insert("value_options".to_string(), Value::Object(value_options));
            }
            return Ok("select".to_string());
        }

        if options.contains_key("value_options") {
            return Ok("select".to_string());
        }
        Ok(primitive_type(range).to_string())
    }
}

/// Field type of a primitive range
pub fn primitive_type(range: &str) -> &'static str {
    match range_tag(range) {
        "boolean" => "checkbox",
        "integer" => "integer",
        "nonNegativeInteger" => "integer:nonNegativeInteger",
        "positiveInteger" => "integer:positiveInteger",
        "decimal" => "number",
        "keyValue" | "keyAny" => "fieldset",
        _ => "text",
    }
}

#[async_trait]
impl ConverterService for ExpandedJsonService {
    type Output = ExpandedJsonFormat;

    async fn convert(
        &self,
        master: ExpandedMaster,
        root: ResolvedField,
        lang: Option<Lang>,
    ) -> Result<ExpandedJsonFormat, FormServiceError> {
        let mut translations = master.translations;
        let mut fields = Vec::with_capacity(root.children.len());
        for child in &root.children {
            fields.push(self.field_to_expanded(child, &mut translations).await?);
        }

        let format = ExpandedJsonFormat {
            id: master.id,
            fields,
            options: master.options,
            translations,
            ui_schema: master.ui_schema,
            extra: master.extra,
            context: master.context,
            language: master.language,
            rest: master.rest,
        };
        localize(format, lang)
    }
}
