//! Field Service
//!
//! Orchestrates the compilation of a Master into one of the output formats.
//! Every stage consumes and returns a Master-shaped value:
//!
//! 1. [`FieldService::link_master`] resolves `baseFormID` inheritance and
//!    `formID` extension fields against the form store
//! 2. [`add_default_validators`] injects validators on well-known paths
//! 3. [`apply_patches`] applies the Master's own JSON Patch
//! 4. [`FieldService::add_taxon_sets`] expands `...taxonSet:<ids>` strings
//! 5. the root class is chosen and the field tree resolved against the
//!    catalog; [`place_nested_ui_schemas`] then merges the uiSchemas of
//!    nested extension forms
//! 6. [`FieldService::add_extra`] (schema format only) records alt range
//!    hierarchies in `extra`
//! 7. [`add_language`] stamps the requested language
//!
//! The resulting Master and resolved tree go to the [`ConverterService`] of
//! the requested format.

use crate::clients::{FormStore, MetadataCatalog, TaxonomyCatalog};
use crate::config::FormBuilderConfig;
use crate::models::{
    merge_translations, unprefix, ConvertedForm, ExpandedJsonFormat, ExpandedMaster, Field,
    Format, Lang, Master, Property, SchemaFormat, Translations,
};
use crate::services::converter_service::{resolve_field_tree, ConverterService, ResolvedField};
use crate::services::default_validators::add_default_validators;
use crate::services::{
    ExpandedJsonService, FormServiceError, MetadataService, SchemaService, StoreService,
};
use crate::utils::deep_merge;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use json_patch::PatchOperation;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Root classes tried in order when a Master has no `context`
pub const ROOT_CLASS_PRIORITY: [&str; 3] = ["MY.document", "MNP.namedPlace", "MAN.annotation"];

pub const DEFAULT_ROOT_CLASS: &str = "MY.document";

const TAXON_SET_PATTERN: &str = r"^\.\.\.taxonSet:(.+)$";

/// Form compiler entry point
pub struct FieldService {
    store: Arc<StoreService>,
    metadata: Arc<MetadataService>,
    taxonomy: Arc<dyn TaxonomyCatalog>,
    schema_service: SchemaService,
    expanded_json_service: ExpandedJsonService,
}

impl FieldService {
    pub fn new(
        store: Arc<StoreService>,
        metadata: Arc<MetadataService>,
        taxonomy: Arc<dyn TaxonomyCatalog>,
        default_lang: Lang,
    ) -> Self {
        Self {
            schema_service: SchemaService::new(
                Arc::clone(&metadata),
                Arc::clone(&taxonomy),
                default_lang,
            ),
            expanded_json_service: ExpandedJsonService::new(Arc::clone(&metadata)),
            store,
            metadata,
            taxonomy,
        }
    }

    /// Wire the caching services over raw collaborators
    pub fn with_collaborators(
        catalog: Arc<dyn MetadataCatalog>,
        taxonomy: Arc<dyn TaxonomyCatalog>,
        store: Arc<dyn FormStore>,
        config: &FormBuilderConfig,
    ) -> Self {
        Self::new(
            Arc::new(StoreService::new(store)),
            Arc::new(MetadataService::new(catalog)),
            taxonomy,
            config.default_lang,
        )
    }

    pub fn store(&self) -> &Arc<StoreService> {
        &self.store
    }

    pub fn metadata(&self) -> &Arc<MetadataService> {
        &self.metadata
    }

    /// Drop every cached catalog and storage response
    pub async fn flush(&self) {
        self.metadata.flush().await;
        self.store.flush().await;
    }

    /// Compile `master` into the requested format
    pub async fn convert(
        &self,
        master: Master,
        format: Format,
        lang: Option<Lang>,
    ) -> Result<ConvertedForm, FormServiceError> {
        Ok(match format {
            Format::Schema => ConvertedForm::Schema(self.master_to_schema_format(master, lang).await?),
            Format::Json => {
                ConvertedForm::Json(self.master_to_expanded_json_format(master, lang).await?)
            }
        })
    }

    pub async fn master_to_schema_format(
        &self,
        master: Master,
        lang: Option<Lang>,
    ) -> Result<SchemaFormat, FormServiceError> {
        self.run(&self.schema_service, master, lang, true).await
    }

    pub async fn master_to_expanded_json_format(
        &self,
        master: Master,
        lang: Option<Lang>,
    ) -> Result<ExpandedJsonFormat, FormServiceError> {
        self.run(&self.expanded_json_service, master, lang, false)
            .await
    }

    /// Conversion failure of `master`, if any
    pub async fn get_error(&self, master: Master) -> Option<FormServiceError> {
        self.master_to_schema_format(master, None).await.err()
    }

    async fn run<C: ConverterService>(
        &self,
        converter: &C,
        master: Master,
        lang: Option<Lang>,
        with_extra: bool,
    ) -> Result<C::Output, FormServiceError> {
        let (master, root) = self.expand(master, lang, with_extra).await?;
        converter.convert(master, root, lang).await
    }

    /// Run the Master-level stages and resolve the field tree
    pub async fn expand(
        &self,
        master: Master,
        lang: Option<Lang>,
        with_extra: bool,
    ) -> Result<(ExpandedMaster, ResolvedField), FormServiceError> {
        debug!("Expanding master {:?}", master.id);
        let LinkedMaster {
            master,
            nested_ui_schemas,
        } = self.link_master(master).await?;
        let master = add_default_validators(master);
        let master = apply_patches(master)?;
        let master = self.add_taxon_sets(master).await?;

        let root_class = self.get_root_class(&master).await?;
        debug!("Resolving field tree under {}", root_class);
        let root = resolve_field_tree(
            &self.metadata,
            get_root_field(&master, &root_class),
            get_root_property(&root_class),
        )
        .await?;
        let master = place_nested_ui_schemas(master, &root, nested_ui_schemas);

        let master = if with_extra {
            self.add_extra(master, &root).await?
        } else {
            master
        };
        Ok((add_language(master, lang), root))
    }

    /// Resolve `baseFormID` and `formID` references
    ///
    /// The base form is linked and patched before the Master is merged over
    /// it. Extension forms are linked, patched and spliced in at their
    /// position. A form reachable from itself is rejected.
    ///
    /// The uiSchema of a root-level extension is merged into the Master's
    /// own. The uiSchema of an extension under other fields is returned with
    /// the field names leading to it; [`place_nested_ui_schemas`] puts it in
    /// place once cardinalities are known.
    pub async fn link_master(&self, master: Master) -> Result<LinkedMaster, FormServiceError> {
        let chain = master.id.iter().cloned().collect();
        self.link_with(master, chain).await
    }

    fn link_with<'a>(
        &'a self,
        mut master: Master,
        chain: Vec<String>,
    ) -> BoxFuture<'a, Result<LinkedMaster, FormServiceError>> {
        async move {
            let mut nested_ui_schemas = Vec::new();
            if let Some(base_id) = master.base_form_id.take() {
                let base = self.linked_form(&base_id, &chain).await?;
                nested_ui_schemas = base.nested_ui_schemas;
                master = merge_over_base(base.master, master);
            }

            let fields = std::mem::take(&mut master.fields);
            let mut linking = Linking {
                chain: &chain,
                translations: std::mem::take(&mut master.translations),
                ui_schema: master.ui_schema.take(),
                nested_ui_schemas,
            };
            master.fields = self.link_fields(fields, &mut linking, Vec::new()).await?;
            master.translations = linking.translations;
            master.ui_schema = linking.ui_schema;
            Ok(LinkedMaster {
                master,
                nested_ui_schemas: linking.nested_ui_schemas,
            })
        }
        .boxed()
    }

    /// Fetch, link and patch a referenced form
    async fn linked_form(
        &self,
        id: &str,
        chain: &[String],
    ) -> Result<LinkedMaster, FormServiceError> {
        if chain.iter().any(|seen| seen == id) {
            return Err(FormServiceError::unprocessable(format!(
                "Form inheritance cycle: {} -> {}",
                chain.join(" -> "),
                id
            )));
        }

        debug!("Linking referenced form {}", id);
        let form = self.store.get_form(id).await?;
        let mut chain = chain.to_vec();
        chain.push(id.to_string());
        let linked = self.link_with(form, chain).await?;
        Ok(LinkedMaster {
            master: apply_patches(linked.master)?,
            nested_ui_schemas: linked.nested_ui_schemas,
        })
    }

    fn link_fields<'a>(
        &'a self,
        fields: Vec<Field>,
        linking: &'a mut Linking<'_>,
        path: Vec<String>,
    ) -> BoxFuture<'a, Result<Vec<Field>, FormServiceError>> {
        async move {
            let mut linked: Vec<Field> = Vec::with_capacity(fields.len());
            for mut field in fields {
                if let Some(form_id) = field.form_id.take() {
                    let extension = self.linked_form(&form_id, linking.chain).await?;
                    linking.splice_extension(&form_id, &path, extension.nested_ui_schemas);
                    let extension = extension.master;
                    linking.translations = merge_translations(
                        extension.translations,
                        std::mem::take(&mut linking.translations),
                    );
                    if let Some(extension_ui) = extension.ui_schema {
                        linking.add_ui_schema(&path, extension_ui);
                    }
                    for extension_field in extension.fields {
                        match linked.iter_mut().find(|f| f.name == extension_field.name) {
                            Some(existing) => {
                                let own = std::mem::take(existing);
                                *existing = merge_field(own, extension_field);
                            }
                            None => linked.push(extension_field),
                        }
                    }
                    continue;
                }

                let children = std::mem::take(&mut field.fields);
                let mut child_path = path.clone();
                child_path.push(field.name.clone());
                field.fields = self
                    .link_fields(children, &mut *linking, child_path)
                    .await?;
                match linked.iter_mut().find(|f| f.name == field.name) {
                    Some(existing) => {
                        let spliced = std::mem::take(existing);
                        *existing = merge_field(field, spliced);
                    }
                    None => linked.push(field),
                }
            }
            Ok(linked)
        }
        .boxed()
    }

    /// Expand every `...taxonSet:<id>[,<id>...]` string into taxon ids
    ///
    /// Each distinct set is fetched once, all concurrently.
    pub async fn add_taxon_sets(&self, master: Master) -> Result<Master, FormServiceError> {
        let value = serde_json::to_value(&master)?;
        let mut set_ids = Vec::new();
        collect_taxon_set_ids(&value, &mut set_ids);
        if set_ids.is_empty() {
            return Ok(master);
        }

        debug!("Fetching taxon sets {:?}", set_ids);
        let fetched = try_join_all(set_ids.into_iter().map(|id| async move {
            let taxa = self
                .taxonomy
                .taxon_set(&id)
                .await
                .map_err(FormServiceError::from_taxonomy)?;
            Ok::<_, FormServiceError>((id, taxa))
        }))
        .await?;
        let sets: HashMap<String, Vec<String>> = fetched.into_iter().collect();

        Ok(serde_json::from_value(substitute_taxon_sets(value, &sets))?)
    }

    /// Root metadata class of a Master
    ///
    /// An explicit `context` names the class (unprefixed). Otherwise the
    /// first class of [`ROOT_CLASS_PRIORITY`] having a property named like a
    /// root field wins.
    pub async fn get_root_class(&self, master: &Master) -> Result<String, FormServiceError> {
        if let Some(context) = &master.context {
            if context.contains('.') {
                return Err(FormServiceError::unprocessable(format!(
                    "Context {} shouldn't have a namespace prefix",
                    context
                )));
            }
            return Ok(ROOT_CLASS_PRIORITY
                .iter()
                .find(|class| unprefix(class) == context.as_str())
                .map(|class| class.to_string())
                .unwrap_or_else(|| format!("MY.{}", context)));
        }

        let names: HashSet<&str> = master.fields.iter().map(|f| f.name.as_str()).collect();
        if names.is_empty() {
            return Ok(DEFAULT_ROOT_CLASS.to_string());
        }
        for class in ROOT_CLASS_PRIORITY {
            let properties = self.metadata.get_properties(class).await?;
            if properties.iter().any(|p| names.contains(p.short_name())) {
                return Ok(class.to_string());
            }
        }
        Ok(DEFAULT_ROOT_CLASS.to_string())
    }

    /// Record the member hierarchy of every hierarchical alt range field
    ///
    /// `extra[name].altParent` maps each member to `[parent]`, or `[]` for
    /// top-level members. Authored `altParent` entries are kept.
    pub async fn add_extra(
        &self,
        mut master: Master,
        root: &ResolvedField,
    ) -> Result<Master, FormServiceError> {
        let mut leaves = Vec::new();
        for child in &root.children {
            child.walk(&mut |node| {
                if !node.property.is_embeddable {
                    leaves.push(node);
                }
            });
        }

        let mut extra = master.extra.take().unwrap_or_default();
        for node in leaves {
            let range = node.property.range_id();
            if !self.metadata.is_alt_range(range).await? {
                continue;
            }
            let entries = self.metadata.get_range(range).await?;
            if entries.iter().all(|entry| entry.alt_parent.is_none()) {
                continue;
            }

            let alt_parent: Map<String, Value> = entries
                .iter()
                .map(|entry| {
                    let parents = match &entry.alt_parent {
                        Some(parent) => json!([parent]),
                        None => json!([]),
                    };
                    (entry.id.clone(), parents)
                })
                .collect();

            let slot = extra
                .entry(node.name().to_string())
                .or_insert_with(|| json!({}));
            if let Value::Object(slot) = slot {
                slot.entry("altParent")
                    .or_insert_with(|| Value::Object(alt_parent));
            }
        }

        if !extra.is_empty() {
            master.extra = Some(extra);
        }
        Ok(master)
    }
}

/// A Master with its references resolved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkedMaster {
    pub master: Master,

    /// uiSchemas of extensions below the root, keyed by the field names
    /// leading to the extension's position
    pub nested_ui_schemas: Vec<(Vec<String>, Value)>,
}

/// Accumulators shared while linking the fields of one form
struct Linking<'c> {
    chain: &'c [String],
    translations: Translations,
    ui_schema: Option<Value>,
    nested_ui_schemas: Vec<(Vec<String>, Value)>,
}

impl Linking<'_> {
    /// Add an extension's uiSchema found at `path`, the form's own winning
    fn add_ui_schema(&mut self, path: &[String], extension_ui: Value) {
        if path.is_empty() {
            self.ui_schema = Some(match self.ui_schema.take() {
                Some(own) => deep_merge(extension_ui, own),
                None => extension_ui,
            });
        } else {
            self.nested_ui_schemas.push((path.to_vec(), extension_ui));
        }
    }

    /// Re-root the nested uiSchemas of an extension spliced in at `path`
    fn splice_extension(
        &mut self,
        form_id: &str,
        path: &[String],
        nested: Vec<(Vec<String>, Value)>,
    ) {
        if !nested.is_empty() {
            debug!("Re-rooting {} nested uiSchemas of {}", nested.len(), form_id);
        }
        for (inner, ui_schema) in nested {
            let mut full = path.to_vec();
            full.extend(inner);
            self.nested_ui_schemas.push((full, ui_schema));
        }
    }
}

/// Merge nested extension uiSchemas into the Master's uiSchema
///
/// Field names map to uiSchema keys, with `items` after every unbounded
/// embeddable field. Authored uiSchema keys win over extension ones.
pub fn place_nested_ui_schemas(
    mut master: Master,
    root: &ResolvedField,
    nested: Vec<(Vec<String>, Value)>,
) -> Master {
    if nested.is_empty() {
        return master;
    }

    let mut placed = json!({});
    for (path, ui_schema) in nested {
        let mut keys = Vec::with_capacity(path.len() * 2);
        let mut node = Some(root);
        for name in path {
            node = node.and_then(|n| n.children.iter().find(|c| c.name() == name));
            let items = node
                .is_some_and(|n| n.property.is_embeddable && n.property.is_unbounded());
            keys.push(name);
            if items {
                keys.push("items".to_string());
            }
        }

        let wrapped = keys
            .into_iter()
            .rev()
            .fold(ui_schema, |inner, key| Value::Object(Map::from_iter([(key, inner)])));
        placed = deep_merge(placed, wrapped);
    }

    master.ui_schema = Some(match master.ui_schema.take() {
        Some(own) => deep_merge(placed, own),
        None => placed,
    });
    master
}

/// Merge a Master over its linked base form
///
/// Top-level keys of the child replace the base's; translations merge per
/// language and uiSchemas merge deeply, the child winning both. The base's
/// `id` is discarded.
pub fn merge_over_base(base: Master, child: Master) -> Master {
    let mut rest = base.rest;
    rest.extend(child.rest);

    let ui_schema = match (base.ui_schema, child.ui_schema) {
        (Some(base), Some(child)) => Some(deep_merge(base, child)),
        (base, child) => child.or(base),
    };

    Master {
        id: child.id,
        fields: if child.fields.is_empty() {
            base.fields
        } else {
            child.fields
        },
        options: if child.options.is_empty() {
            base.options
        } else {
            child.options
        },
        translations: merge_translations(base.translations, child.translations),
        ui_schema,
        base_form_id: None,
        patch: child.patch,
        context: child.context.or(base.context),
        extra: child.extra.or(base.extra),
        language: child.language.or(base.language),
        rest,
    }
}

/// Merge two same-named fields, `own` winning recursively
pub fn merge_field(own: Field, other: Field) -> Field {
    let mut fields = own.fields;
    for other_child in other.fields {
        match fields.iter_mut().find(|f| f.name == other_child.name) {
            Some(existing) => {
                let own_child = std::mem::take(existing);
                *existing = merge_field(own_child, other_child);
            }
            None => fields.push(other_child),
        }
    }

    Field {
        name: own.name,
        form_id: None,
        fields,
        options: if own.options.is_empty() {
            other.options
        } else {
            own.options
        },
        validators: own.validators.or(other.validators),
        warnings: own.warnings.or(other.warnings),
        label: own.label.or(other.label),
        field_type: own.field_type.or(other.field_type),
    }
}

/// Apply and remove the Master's `patch`
///
/// Only `add`, `replace` and `remove` operations are accepted.
pub fn apply_patches(mut master: Master) -> Result<Master, FormServiceError> {
    let Some(patch) = master.patch.take() else {
        return Ok(master);
    };

    let operations: Vec<PatchOperation> =
        serde_json::from_value(patch).map_err(|e| FormServiceError::patch(e.to_string()))?;
    for operation in &operations {
        let unsupported = match operation {
            PatchOperation::Add(_) | PatchOperation::Replace(_) | PatchOperation::Remove(_) => None,
            PatchOperation::Move(_) => Some("move"),
            PatchOperation::Copy(_) => Some("copy"),
            PatchOperation::Test(_) => Some("test"),
        };
        if let Some(op) = unsupported {
            return Err(FormServiceError::patch(format!(
                "Unsupported operation {}",
                op
            )));
        }
    }

    let mut document = patch_document(&master)?;
    json_patch::patch(&mut document, &operations)
        .map_err(|e| FormServiceError::patch(e.to_string()))?;
    Ok(serde_json::from_value(document)?)
}

/// JSON view of a Master that patches address
///
/// Empty `fields`, `options` and `translations` are left out when a Master
/// serializes, so they are put back here at the top level and on every field.
/// Paths like `/fields/0/fields/-` then resolve against an authored `[]`.
fn patch_document(master: &Master) -> Result<Value, FormServiceError> {
    let mut document = serde_json::to_value(master)?;
    if let Value::Object(map) = &mut document {
        map.entry("translations").or_insert_with(|| json!({}));
        fill_containers(map);
    }
    Ok(document)
}

fn fill_containers(object: &mut Map<String, Value>) {
    object.entry("options").or_insert_with(|| json!({}));
    let fields = object.entry("fields").or_insert_with(|| json!([]));
    if let Value::Array(fields) = fields {
        for field in fields.iter_mut() {
            if let Value::Object(field) = field {
                fill_containers(field);
            }
        }
    }
}

/// Synthetic root field named after the root class
pub fn get_root_field(master: &Master, root_class: &str) -> Field {
    Field::with_fields(unprefix(root_class), master.fields.clone())
}

/// Synthetic embeddable property of the root class
pub fn get_root_property(root_class: &str) -> Property {
    let mut property = Property::new(root_class, root_class);
    property.is_embeddable = true;
    property
}

pub fn add_language(mut master: Master, lang: Option<Lang>) -> Master {
    if lang.is_some() {
        master.language = lang;
    }
    master
}

fn taxon_set_ids(value: &str) -> Option<Vec<&str>> {
    static TAXON_SET_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = TAXON_SET_REGEX.get_or_init(|| Regex::new(TAXON_SET_PATTERN).unwrap());

    let ids = regex.captures(value)?.get(1)?.as_str();
    Some(
        ids.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .collect(),
    )
}

/// Distinct taxon set ids referenced anywhere in `value`, in order
fn collect_taxon_set_ids(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for id in taxon_set_ids(s).unwrap_or_default() {
                if !out.iter().any(|seen| seen == id) {
                    out.push(id.to_string());
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_taxon_set_ids(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_taxon_set_ids(item, out)),
        _ => {}
    }
}

/// Replace taxon set references with taxon ids
///
/// Inside arrays the ids are spread into the array; elsewhere the string
/// becomes an array of ids.
fn substitute_taxon_sets(value: Value, sets: &HashMap<String, Vec<String>>) -> Value {
    let taxa_of = |ids: Vec<&str>| -> Vec<Value> {
        ids.into_iter()
            .flat_map(|id| sets.get(id).cloned().unwrap_or_default())
            .map(Value::String)
            .collect()
    };

    match value {
        Value::String(s) => {
            let taxa = taxon_set_ids(&s).map(taxa_of);
            match taxa {
                Some(taxa) => Value::Array(taxa),
                None => Value::String(s),
            }
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let taxa = item.as_str().and_then(taxon_set_ids).map(taxa_of);
                match taxa {
                    Some(taxa) => out.extend(taxa),
                    None => out.push(substitute_taxon_sets(item, sets)),
                }
            }
            Value::Array(out)
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (key, substitute_taxon_sets(item, sets)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
#[path = "field_service_test.rs"]
mod field_service_test;
