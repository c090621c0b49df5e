//! Schema Service
//!
//! Compiles a resolved field tree into the JSON-Schema-shaped
//! [`SchemaFormat`]. Besides the schema itself it computes, from the same
//! tree:
//!
//! - `validators` / `warnings` trees shaped like the schema
//! - `excludeFromCopy` JSONPath-like paths (`$.a`, `$.a[*].b`)
//! - the derived uiSchema, merged under the authored one
//! - `uiSchemaContext` hierarchy trees from `extra[..].altParent`
//! - the prepopulated document for informal taxon group forms
//!
//! ## Leaf shaping order
//!
//! For non-embeddable fields the catalog fragment is shaped in a fixed
//! order: `value_options` injection, whitelist, blacklist, hidden stripping.
//! Then for every field: array wrapping, item count options, title, default.

use crate::clients::TaxonomyCatalog;
use crate::models::{ExpandedMaster, Field, FieldOptions, Lang, SchemaFormat};
use crate::services::converter_service::{localize, ConverterService, ResolvedField};
use crate::services::metadata_service::object_schema;
use crate::services::{FormServiceError, MetadataService, UiSchemaService};
use crate::utils::deep_merge;
use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Form option listing informal taxon groups to prepopulate units from
pub const PREPOPULATE_OPTION: &str = "prepopulateWithInformalTaxonGroups";

/// Form option holding the document new entries start from
pub const PREPOPULATED_DOCUMENT_OPTION: &str = "prepopulatedDocument";

/// Compiles Masters into [`SchemaFormat`]
pub struct SchemaService {
    metadata: Arc<MetadataService>,
    taxonomy: Arc<dyn TaxonomyCatalog>,
    ui_schema: UiSchemaService,
    default_lang: Lang,
}

impl SchemaService {
    pub fn new(
        metadata: Arc<MetadataService>,
        taxonomy: Arc<dyn TaxonomyCatalog>,
        default_lang: Lang,
    ) -> Self {
        Self {
            metadata,
            taxonomy,
            ui_schema: UiSchemaService::new(),
            default_lang,
        }
    }

    /// Schema of one resolved field
    ///
    /// Leaves start from the catalog schema of their property, embeddables
    /// from the object schema of their resolved children; siblings are built
    /// concurrently. Author options then shape the enum of a leaf (its
    /// `items` when repeated) and the array bounds. The author's label
    /// replaces the catalog title; the root gets no title.
    pub fn field_to_schema<'a>(
        &'a self,
        node: &'a ResolvedField,
        lang: Lang,
        is_root: bool,
    ) -> BoxFuture<'a, Result<Value, FormServiceError>> {
        async move {
            let ResolvedField {
                field,
                property,
                children,
            } = node;

            let mut schema = if property.is_embeddable {
                let child_schemas = try_join_all(
                    children
                        .iter()
                        .map(|child| self.field_to_schema(child, lang, false)),
                )
                .await?;

                let mut properties = Map::new();
                let mut required: Vec<String> = Vec::new();
                for (child, child_schema) in children.iter().zip(child_schemas) {
                    let name = child.name().to_string();
                    if child.property.is_required() && !required.contains(&name) {
                        required.push(name.clone());
                    }
                    properties.insert(name, child_schema);
                }
                self.metadata
                    .wrap_property_schema(property, object_schema(properties, required), lang)
                    .await?
            } else {
                let mut schema = self
                    .metadata
                    .json_schema_from_property(property, lang, false)
                    .await?;
                let value_schema = if property.is_unbounded() {
                    schema.get_mut("items")
                } else {
                    Some(&mut schema)
                };
                if let Some(value_schema) = value_schema {
                    shape_enum(value_schema, field);
                }
                schema
            };

            if let Value::Object(map) = &mut schema {
                apply_item_options(map, &field.options);
                if is_root {
                    map.remove("title");
                } else if let Some(label) = field.label.as_ref().filter(|l| !l.is_empty()) {
                    map.insert("title".to_string(), Value::String(label.clone()));
                }
                if let Some(default) = &field.options.default {
                    map.insert("default".to_string(), default.clone());
                }
            }

            Ok(schema)
        }
        .boxed()
    }

    /// Merge units for every species of the configured informal groups
    /// into `options.prepopulatedDocument`
    ///
    /// Units are built over the default form state of the unit schema and
    /// appended to the first gathering of the document.
    pub async fn prepopulate(
        &self,
        options: &mut Map<String, Value>,
        schema: &Value,
    ) -> Result<(), FormServiceError> {
        let groups: Vec<String> = match options.get(PREPOPULATE_OPTION) {
            Some(Value::Array(groups)) => groups
                .iter()
                .filter_map(|g| g.as_str().map(str::to_string))
                .collect(),
            _ => return Ok(()),
        };
        if groups.is_empty() {
            return Ok(());
        }

        debug!("Prepopulating document from informal groups {:?}", groups);
        let taxa = self
            .taxonomy
            .species_by_informal_groups(&groups)
            .await
            .map_err(FormServiceError::from_taxonomy)?;

        let gathering_schema = &schema["properties"]["gatherings"]["items"];
        let unit_schema = &gathering_schema["properties"]["units"]["items"];
        let unit_defaults = default_form_state(unit_schema);

        let units: Vec<Value> = taxa
            .iter()
            .map(|taxon| {
                deep_merge(
                    unit_defaults.clone(),
                    json!({
                        "identifications": [{
                            "taxonID": taxon.id,
                            "taxon": taxon.scientific_name.clone().unwrap_or_default()
                        }],
                        "unitFact": { "autocompleteSelectedTaxonID": taxon.id }
                    }),
                )
            })
            .collect();

        let mut document = match options.remove(PREPOPULATED_DOCUMENT_OPTION) {
            Some(Value::Object(document)) => document,
            _ => Map::new(),
        };
        let gatherings = document
            .entry("gatherings")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !gatherings.is_array() {
            *gatherings = Value::Array(Vec::new());
        }
        if let Value::Array(gatherings) = gatherings {
            if gatherings.is_empty() {
                gatherings.push(match default_form_state(gathering_schema) {
                    Value::Object(defaults) => Value::Object(defaults),
                    _ => json!({}),
                });
            }
            if let Value::Object(first) = &mut gatherings[0] {
                let existing = first
                    .entry("units")
                    .or_insert_with(|| Value::Array(Vec::new()));
                match existing {
                    Value::Array(existing) => existing.extend(units),
                    other => *other = Value::Array(units),
                }
            }
        }

        options.insert(
            PREPOPULATED_DOCUMENT_OPTION.to_string(),
            Value::Object(document),
        );
        Ok(())
    }
}

#[async_trait]
impl ConverterService for SchemaService {
    type Output = SchemaFormat;

    async fn convert(
        &self,
        master: ExpandedMaster,
        root: ResolvedField,
        lang: Option<Lang>,
    ) -> Result<SchemaFormat, FormServiceError> {
        let label_lang = lang.unwrap_or(self.default_lang);

        let schema = self.field_to_schema(&root, label_lang, true).await?;
        let validators = Value::Object(validator_tree(&root.children, |f| f.validators.as_ref()));
        let warnings = Value::Object(validator_tree(&root.children, |f| f.warnings.as_ref()));

        let mut exclude_from_copy = Vec::new();
        collect_exclude_from_copy(&root.children, "$", &mut exclude_from_copy);

        let derived = self.ui_schema.derive(&root, label_lang);
        let ui_schema = self.ui_schema.merge_under(derived, master.ui_schema);
        let ui_schema_context = master.extra.as_ref().and_then(ui_schema_context);

        let mut options = master.options;
        self.prepopulate(&mut options, &schema).await?;

        let format = SchemaFormat {
            attributes: master.id.as_ref().map(|id| json!({ "id": id })),
            id: master.id,
            schema,
            ui_schema,
            validators,
            warnings,
            exclude_from_copy,
            extra: master.extra,
            ui_schema_context,
            options,
            translations: master.translations,
            context: master.context,
            language: master.language,
            rest: master.rest,
        };
        localize(format, lang)
    }
}

/// Apply a leaf's value options, enum filters and hidden flag
fn shape_enum(schema: &mut Value, field: &Field) {
    if let Some(value_options) = &field.options.value_options {
        inject_value_options(schema, value_options);
    }
    if field.options.filters_enum() {
        filter_enum(schema, &field.options);
    }
    if field.is_hidden() {
        strip_enum(schema);
    }
}

/// Replace enum members with the author's `{value → label}` map
fn inject_value_options(schema: &mut Value, value_options: &Map<String, Value>) {
    let one_of: Vec<Value> = value_options
        .iter()
        .map(|(value, title)| json!({ "const": value, "title": title }))
        .collect();
    if let Value::Object(map) = schema {
        map.remove("enum");
        map.remove("enumNames");
        map.insert("type".to_string(), json!("string"));
        map.insert("oneOf".to_string(), Value::Array(one_of));
    }
}

/// Keep whitelisted members, then drop blacklisted ones
fn filter_enum(schema: &mut Value, options: &FieldOptions) {
    let Value::Object(map) = schema else {
        return;
    };

    if let Some(Value::Array(one_of)) = map.get_mut("oneOf") {
        one_of.retain(|member| {
            member
                .get("const")
                .and_then(Value::as_str)
                .map_or(true, |value| options.allows(value))
        });
    }

    if let Some(Value::Array(values)) = map.get("enum") {
        let keep: Vec<bool> = values
            .iter()
            .map(|v| v.as_str().map_or(true, |value| options.allows(value)))
            .collect();
        for key in ["enum", "enumNames"] {
            if let Some(Value::Array(items)) = map.get_mut(key) {
                let mut flags = keep.iter();
                items.retain(|_| *flags.next().unwrap_or(&true));
            }
        }
    }
}

/// Drop generated enum data, keeping the schema shape
fn strip_enum(schema: &mut Value) {
    if let Value::Object(map) = schema {
        map.remove("oneOf");
        map.remove("enum");
        map.remove("enumNames");
    }
}

fn apply_item_options(schema: &mut Map<String, Value>, options: &FieldOptions) {
    if let Some(unique) = options.unique_items {
        schema.insert("uniqueItems".to_string(), json!(unique));
    }
    if let Some(min) = options.min_items {
        schema.insert("minItems".to_string(), json!(min));
    }
    if let Some(max) = options.max_items {
        schema.insert("maxItems".to_string(), json!(max));
    }
}

/// Schema-shaped tree of validator configs
///
/// Only branches leading to a field that declares validators are emitted.
/// Children of repeated objects nest under `items.properties`, of single
/// objects under `properties`.
pub fn validator_tree(
    children: &[ResolvedField],
    pick: fn(&Field) -> Option<&Value>,
) -> Map<String, Value> {
    let mut tree = Map::new();
    for child in children {
        let mut entry = Map::new();

        let nested = validator_tree(&child.children, pick);
        if !nested.is_empty() {
            if child.property.is_unbounded() {
                entry.insert("items".to_string(), json!({ "properties": nested }));
            } else {
                entry.insert("properties".to_string(), Value::Object(nested));
            }
        }

        if let Some(Value::Object(own)) = pick(&child.field) {
            for (key, value) in own {
                entry.insert(key.clone(), value.clone());
            }
        }

        if !entry.is_empty() {
            tree.insert(child.name().to_string(), Value::Object(entry));
        }
    }
    tree
}

/// Paths of every field flagged `excludeFromCopy`
pub fn collect_exclude_from_copy(children: &[ResolvedField], path: &str, out: &mut Vec<String>) {
    for child in children {
        let child_path = format!("{}.{}", path, child.name());
        if child.field.options.exclude_from_copy {
            out.push(child_path.clone());
        }
        if !child.children.is_empty() {
            let nested = if child.property.is_unbounded() {
                format!("{}[*]", child_path)
            } else {
                child_path
            };
            collect_exclude_from_copy(&child.children, &nested, out);
        }
    }
}

/// `{name: {tree}}` hierarchy trees from `extra[name].altParent` maps
fn ui_schema_context(extra: &Map<String, Value>) -> Option<Map<String, Value>> {
    let mut context = Map::new();
    for (name, value) in extra {
        if let Some(Value::Object(alt_parent)) = value.get("altParent") {
            context.insert(name.clone(), json!({ "tree": alt_parent_tree(alt_parent) }));
        }
    }
    if context.is_empty() {
        None
    } else {
        Some(context)
    }
}

/// Materialize a `{member → [parent] | []}` map into nested
/// `{children, order}` nodes; members with an unknown parent become roots
pub fn alt_parent_tree(alt_parent: &Map<String, Value>) -> Value {
    let parent_of: Vec<(&str, Option<&str>)> = alt_parent
        .iter()
        .map(|(member, parents)| {
            let parent = parents
                .as_array()
                .and_then(|p| p.first())
                .or(Some(parents))
                .and_then(Value::as_str)
                .filter(|p| alt_parent.contains_key(*p));
            (member.as_str(), parent)
        })
        .collect();
    tree_node(None, &parent_of, 0)
}

fn tree_node(id: Option<&str>, parent_of: &[(&str, Option<&str>)], depth: usize) -> Value {
    let mut children = Map::new();
    let mut order = Vec::new();
    if depth <= parent_of.len() {
        for (member, parent) in parent_of {
            if *parent == id {
                children.insert(member.to_string(), tree_node(Some(*member), parent_of, depth + 1));
                order.push(json!(member));
            }
        }
    }
    json!({ "children": children, "order": order })
}

/// Default values of a schema, the way a form starts out empty
///
/// Explicit `default`s win; objects collect the defaults of their
/// properties; everything else has no default.
pub fn default_form_state(schema: &Value) -> Value {
    if let Some(default) = schema.get("default") {
        return default.clone();
    }
    match schema.get("type").and_then(Value::as_str) {
        Some("object") => {
            let mut state = Map::new();
            if let Some(Value::Object(properties)) = schema.get("properties") {
                for (name, property) in properties {
                    match default_form_state(property) {
                        Value::Null => {}
                        Value::Object(map) if map.is_empty() => {}
                        value => {
                            state.insert(name.clone(), value);
                        }
                    }
                }
            }
            Value::Object(state)
        }
        _ => Value::Null,
    }
}
