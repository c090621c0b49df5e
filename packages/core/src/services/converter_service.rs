//! Converter Service
//!
//! Shared machinery of the two compiler back-ends:
//!
//! - [`resolve_field_tree`] pairs every author field with its catalog
//!   property once, so both back-ends walk the same [`ResolvedField`] tree
//! - [`ConverterService`] is the strategy interface the orchestrator
//!   dispatches to, one implementation per output format
//! - [`localize`] is the final language pass both outputs go through

use crate::models::{ExpandedMaster, Field, Lang, Property, Translations};
use crate::services::{FormServiceError, MetadataService};
use crate::utils::translate;
use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// A field paired with its catalog property and resolved children
///
/// `field.fields` is emptied during resolution; the children live in
/// `children`, in authored order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub field: Field,
    pub property: Property,
    pub children: Vec<ResolvedField>,
}

impl ResolvedField {
    pub fn name(&self) -> &str {
        &self.field.name
    }

    /// Walk the tree depth-first, parents before children
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ResolvedField)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Resolve a field tree against the catalog
///
/// Children of an embeddable field are matched by short name against the
/// property list of the field's range. A child without a catalog property
/// must carry a literal `type`, which yields a synthetic property; otherwise
/// resolution fails with `Bad field <name>`. Siblings resolve concurrently.
pub fn resolve_field_tree<'a>(
    metadata: &'a MetadataService,
    mut field: Field,
    property: Property,
) -> BoxFuture<'a, Result<ResolvedField, FormServiceError>> {
    async move {
        let child_fields = std::mem::take(&mut field.fields);
        if !property.is_embeddable || child_fields.is_empty() {
            return Ok(ResolvedField {
                field,
                property,
                children: Vec::new(),
            });
        }

        let class_properties = match property.range_id() {
            "" => Arc::new(Vec::new()),
            range => metadata.get_properties(range).await?,
        };

        let children = try_join_all(child_fields.into_iter().map(|child| {
            let class_properties = Arc::clone(&class_properties);
            async move {
                let child_property = match_property(&class_properties, &child)?;
                resolve_field_tree(metadata, child, child_property).await
            }
        }))
        .await?;

        Ok(ResolvedField {
            field,
            property,
            children,
        })
    }
    .boxed()
}

/// Catalog property of `field`, or a synthetic one from its literal type
fn match_property(properties: &[Property], field: &Field) -> Result<Property, FormServiceError> {
    if let Some(property) = properties.iter().find(|p| p.short_name() == field.name) {
        return Ok(property.clone());
    }
    match &field.field_type {
        Some(field_type) => Ok(Property::synthetic(&field.name, field_type)),
        None => Err(FormServiceError::bad_field(&field.name)),
    }
}

/// Strategy interface of the compiler back-ends
#[async_trait]
pub trait ConverterService: Send + Sync {
    type Output: Serialize + DeserializeOwned + Send;

    /// Convert a self-contained Master whose field tree is already resolved
    ///
    /// `root` is the synthetic root field named after the root class, with
    /// the Master's fields as its children.
    async fn convert(
        &self,
        master: ExpandedMaster,
        root: ResolvedField,
        lang: Option<Lang>,
    ) -> Result<Self::Output, FormServiceError>;
}

/// Final language pass shared by both outputs
///
/// Without a language the output is returned untouched, carrying its
/// `translations` and literal `@key` placeholders. With a language every
/// placeholder found in `translations[lang]` is substituted, `translations`
/// is stripped and `language` is stamped.
pub fn localize<T>(output: T, lang: Option<Lang>) -> Result<T, FormServiceError>
where
    T: Serialize + DeserializeOwned,
{
    let Some(lang) = lang else {
        return Ok(output);
    };

    let mut value = serde_json::to_value(output)?;
    let translations: Translations = match value.as_object_mut().and_then(|o| o.remove("translations")) {
        Some(translations) => serde_json::from_value(translations)?,
        None => Translations::new(),
    };
    let dict = translations.get(&lang).cloned().unwrap_or_default();

    let mut value = translate(value, &dict);
    if let Value::Object(map) = &mut value {
        map.insert("language".to_string(), serde_json::to_value(lang)?);
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SchemaFormat;
    use serde_json::json;

    #[test]
    fn test_localize_without_language_is_identity() {
        let mut format = SchemaFormat {
            schema: json!({ "title": "@title" }),
            ..Default::default()
        };
        format
            .translations
            .entry(Lang::Fi)
            .or_default()
            .insert("@title".to_string(), "Otsikko".to_string());

        let localized = localize(format.clone(), None).unwrap();
        assert_eq!(localized, format);
    }

    #[test]
    fn test_localize_translates_and_strips_translations() {
        let mut format = SchemaFormat {
            schema: json!({ "title": "@title" }),
            ui_schema: json!({ "ui:help": "@help" }),
            ..Default::default()
        };
        format
            .translations
            .entry(Lang::Sv)
            .or_default()
            .insert("@title".to_string(), "Rubrik".to_string());

        let localized = localize(format, Some(Lang::Sv)).unwrap();
        assert_eq!(localized.schema["title"], "Rubrik");
        assert_eq!(localized.ui_schema["ui:help"], "@help");
        assert!(localized.translations.is_empty());
        assert_eq!(localized.language, Some(Lang::Sv));
    }

    #[test]
    fn test_walk_visits_parents_first() {
        let leaf = ResolvedField {
            field: Field::new("count"),
            property: Property::new("MY.count", "xsd:string"),
            children: Vec::new(),
        };
        let root = ResolvedField {
            field: Field::new("units"),
            property: Property::new("MY.units", "MY.unit"),
            children: vec![leaf],
        };

        let mut names = Vec::new();
        root.walk(&mut |node| names.push(node.name().to_string()));
        assert_eq!(names, vec!["units", "count"]);
    }
}
