//! Schema Format Tests
//!
//! Integration tests compiling Masters into `SchemaFormat` over the fixture
//! catalog in `common`.
//!
//! ## Test Coverage
//! - Object, array, enum and primitive schema shapes
//! - `required` lists from `minOccurs` and catalog `required`
//! - whitelist / blacklist / hidden / value_options shaping
//! - Default validators, excludeFromCopy, derived uiSchema and uiSchemaContext
//! - Localization with and without a requested language
//! - Root class selection and unknown fields
//! - Prepopulated documents from informal taxon groups

mod common;

#[cfg(test)]
mod schema_format_tests {
    use crate::common::{create_service, master, trip_report};
    use anyhow::Result;
    use formbuilder_core::{ConvertedForm, Format, Lang};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use tokio_test::assert_err;

    #[tokio::test]
    async fn test_trip_report_schema_shape() -> Result<()> {
        let ctx = create_service(vec![]);
        let form = ctx
            .service
            .master_to_schema_format(trip_report(), Some(Lang::Fi))
            .await?;

        let schema = &form.schema;
        assert_eq!(schema["type"], "object");
        assert!(schema.get("title").is_none());
        assert!(schema.get("required").is_none());

        assert_eq!(schema["properties"]["secureLevel"]["title"], "Karkeistus");
        assert_eq!(
            schema["properties"]["keywords"],
            json!({ "type": "array", "items": { "type": "string" }, "title": "Avainsanat" })
        );

        let event = &schema["properties"]["gatheringEvent"];
        assert_eq!(event["type"], "object");
        assert_eq!(event["required"], json!(["dateBegin"]));

        let gatherings = &schema["properties"]["gatherings"];
        assert_eq!(gatherings["type"], "array");
        assert_eq!(gatherings["title"], "Keruutapahtumat");
        assert_eq!(
            gatherings["items"]["properties"]["geometry"],
            json!({ "type": "object", "properties": {}, "title": "Kuvio" })
        );

        let unit = &gatherings["items"]["properties"]["units"]["items"];
        assert_eq!(unit["required"], json!(["recordBasis"]));
        assert_eq!(
            unit["properties"]["notes"]["properties"],
            json!({
                "fi": { "type": "string" },
                "sv": { "type": "string" },
                "en": { "type": "string" }
            })
        );
        assert_eq!(
            unit["properties"]["recordBasis"]["oneOf"],
            json!([
                { "const": "MY.recordBasisHumanObservation", "title": "Havainto" },
                { "const": "MY.recordBasisPreservedSpecimen", "title": "Näyte" }
            ])
        );

        assert_eq!(form.attributes, Some(json!({ "id": "JX.519" })));
        assert_eq!(form.rest["name"], "Trip report");
        assert_eq!(form.rest["collectionID"], "HR.1747");
        Ok(())
    }

    #[tokio::test]
    async fn test_default_validators_and_finnish_messages() -> Result<()> {
        let ctx = create_service(vec![]);
        let form = ctx
            .service
            .master_to_schema_format(trip_report(), Some(Lang::Fi))
            .await?;

        let geometry = &form.validators["gatherings"]["items"]["properties"]["geometry"]["geometry"];
        assert_eq!(geometry["requireShape"], true);
        assert_eq!(
            geometry["message"]["missingGeometries"],
            "Havainnolle täytyy merkitä paikka kartalle."
        );
        assert_eq!(
            form.validators["gatheringEvent"]["properties"]["dateBegin"]["datetime"]["latest"],
            "now"
        );
        assert_eq!(form.warnings, json!({}));
        Ok(())
    }

    #[tokio::test]
    async fn test_without_language_keeps_placeholders_and_translations() -> Result<()> {
        let ctx = create_service(vec![]);
        let form = ctx
            .service
            .master_to_schema_format(trip_report(), None)
            .await?;

        assert_eq!(form.ui_schema["ui:title"], "@title");
        assert_eq!(
            form.validators["gatherings"]["items"]["properties"]["geometry"]["geometry"]["message"]
                ["missingGeometries"],
            "@geometryValidation"
        );
        assert_eq!(form.translations[&Lang::Sv]["@title"], "Exkursionsrapport");
        assert!(form.translations[&Lang::En].contains_key("@geometryValidation"));
        assert!(form.language.is_none());

        // Catalog titles fall back to the default language
        assert_eq!(form.schema["properties"]["secureLevel"]["title"], "Karkeistus");
        Ok(())
    }

    #[tokio::test]
    async fn test_language_strips_translations() -> Result<()> {
        let ctx = create_service(vec![]);
        let form = ctx
            .service
            .master_to_schema_format(trip_report(), Some(Lang::Sv))
            .await?;

        assert_eq!(form.ui_schema["ui:title"], "Exkursionsrapport");
        assert!(form.translations.is_empty());
        assert_eq!(form.language, Some(Lang::Sv));
        assert_eq!(form.schema["properties"]["secureLevel"]["title"], "Förgrovning");
        Ok(())
    }

    #[tokio::test]
    async fn test_derived_ui_schema_merged_under_authored() -> Result<()> {
        let ctx = create_service(vec![]);
        let form = ctx
            .service
            .master_to_schema_format(trip_report(), Some(Lang::En))
            .await?;

        assert_eq!(
            form.ui_schema["gatherings"]["items"]["units"]["items"]["notes"],
            json!({ "ui:field": "MultiLanguageField", "ui:help": "Free-form notes" })
        );
        assert_eq!(form.ui_schema["ui:title"], "Trip report");
        Ok(())
    }

    #[tokio::test]
    async fn test_exclude_from_copy_and_ui_schema_context() -> Result<()> {
        let ctx = create_service(vec![]);
        let form = ctx
            .service
            .master_to_schema_format(trip_report(), None)
            .await?;

        assert_eq!(form.exclude_from_copy, vec!["$.gatherings[*].locality"]);

        let extra = form.extra.as_ref().expect("habitat hierarchy recorded");
        assert_eq!(
            extra["habitat"]["altParent"],
            json!({
                "MKV.forest": [],
                "MKV.heathForest": ["MKV.forest"],
                "MKV.mire": []
            })
        );

        let context = form.ui_schema_context.as_ref().expect("context derived");
        let tree = &context["habitat"]["tree"];
        assert_eq!(tree["order"], json!(["MKV.forest", "MKV.mire"]));
        assert_eq!(
            tree["children"]["MKV.forest"]["order"],
            json!(["MKV.heathForest"])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_whitelist_single_member() -> Result<()> {
        let ctx = create_service(vec![]);
        let form = ctx
            .service
            .master_to_schema_format(
                master(json!({
                    "fields": [{
                        "name": "secureLevel",
                        "options": { "whitelist": ["MX.secureLevelKM5"] }
                    }]
                })),
                Some(Lang::Fi),
            )
            .await?;

        assert_eq!(
            form.schema["properties"]["secureLevel"]["oneOf"],
            json!([{ "const": "MX.secureLevelKM5", "title": "5 km" }])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_whitelist_then_blacklist() -> Result<()> {
        let ctx = create_service(vec![]);
        let form = ctx
            .service
            .master_to_schema_format(
                master(json!({
                    "fields": [{
                        "name": "secureLevel",
                        "options": {
                            "whitelist": ["MX.secureLevelKM1", "MX.secureLevelKM5", "MX.secureLevelKM10"],
                            "blacklist": ["MX.secureLevelKM10", "MX.secureLevelNone"]
                        }
                    }]
                })),
                Some(Lang::En),
            )
            .await?;

        let members: Vec<&str> = form.schema["properties"]["secureLevel"]["oneOf"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["const"].as_str().unwrap())
            .collect();
        assert_eq!(members, vec!["MX.secureLevelKM1", "MX.secureLevelKM5"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_hidden_value_options_and_item_options() -> Result<()> {
        let ctx = create_service(vec![]);
        let form = ctx
            .service
            .master_to_schema_format(
                master(json!({
                    "fields": [
                        { "name": "secureLevel", "type": "hidden" },
                        {
                            "name": "keywords",
                            "label": "Tags",
                            "options": { "uniqueItems": true, "maxItems": 3, "default": ["bird"] }
                        },
                        {
                            "name": "gatherings",
                            "fields": [{
                                "name": "units",
                                "fields": [{
                                    "name": "count",
                                    "options": { "value_options": { "1": "@one", "2": "Two" } }
                                }]
                            }]
                        }
                    ],
                    "translations": { "en": { "@one": "One" } }
                })),
                Some(Lang::En),
            )
            .await?;

        let properties = &form.schema["properties"];
        assert_eq!(
            properties["secureLevel"],
            json!({ "type": "string", "title": "Coarsening" })
        );
        assert_eq!(
            properties["keywords"],
            json!({
                "type": "array",
                "items": { "type": "string" },
                "uniqueItems": true,
                "maxItems": 3,
                "title": "Tags",
                "default": ["bird"]
            })
        );
        assert_eq!(
            properties["gatherings"]["items"]["properties"]["units"]["items"]["properties"]["count"]
                ["oneOf"],
            json!([
                { "const": "1", "title": "One" },
                { "const": "2", "title": "Two" }
            ])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_field_options_shape_items() -> Result<()> {
        let ctx = create_service(vec![]);
        let form = ctx
            .service
            .master_to_schema_format(
                master(json!({
                    "fields": [{
                        "name": "keywords",
                        "options": { "value_options": { "bird": "Bird", "fish": "Fish" } }
                    }]
                })),
                Some(Lang::En),
            )
            .await?;

        assert_eq!(
            form.schema["properties"]["keywords"],
            json!({
                "type": "array",
                "items": {
                    "type": "string",
                    "oneOf": [
                        { "const": "bird", "title": "Bird" },
                        { "const": "fish", "title": "Fish" }
                    ]
                },
                "title": "Keywords"
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_fields() -> Result<()> {
        let ctx = create_service(vec![]);
        let form = ctx
            .service
            .master_to_schema_format(
                master(json!({
                    "fields": [
                        { "name": "secureLevel" },
                        { "name": "confirmed", "type": "checkbox", "label": "Confirmed" }
                    ]
                })),
                Some(Lang::En),
            )
            .await?;
        assert_eq!(
            form.schema["properties"]["confirmed"],
            json!({ "type": "boolean", "title": "Confirmed" })
        );

        let err = ctx
            .service
            .master_to_schema_format(
                master(json!({ "fields": [{ "name": "secureLevel" }, { "name": "unknownField" }] })),
                None,
            )
            .await
            .unwrap_err();
        assert!(err.is_unprocessable());
        assert_eq!(err.to_string(), "Bad field unknownField");
        Ok(())
    }

    #[tokio::test]
    async fn test_root_class_from_context_and_fields() -> Result<()> {
        let ctx = create_service(vec![]);

        let form = ctx
            .service
            .master_to_schema_format(master(json!({ "fields": [{ "name": "name" }] })), Some(Lang::En))
            .await?;
        assert_eq!(form.schema["properties"]["name"]["title"], "Name");

        let form = ctx
            .service
            .master_to_schema_format(
                master(json!({ "context": "namedPlace", "fields": [{ "name": "municipality" }] })),
                None,
            )
            .await?;
        assert_eq!(form.context.as_deref(), Some("namedPlace"));

        let err = ctx
            .service
            .master_to_schema_format(master(json!({ "context": "MY.document" })), None)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Context MY.document shouldn't have a namespace prefix"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_prepopulated_document_from_informal_groups() -> Result<()> {
        let ctx = create_service(vec![]);
        let form = ctx
            .service
            .master_to_schema_format(
                master(json!({
                    "fields": [{
                        "name": "gatherings",
                        "fields": [{
                            "name": "units",
                            "fields": [
                                { "name": "count", "options": { "default": "1" } },
                                { "name": "identifications", "fields": [{ "name": "taxon" }, { "name": "taxonID" }] },
                                { "name": "unitFact", "fields": [{ "name": "autocompleteSelectedTaxonID" }] }
                            ]
                        }]
                    }],
                    "options": {
                        "prepopulateWithInformalTaxonGroups": ["MVL.1"],
                        "prepopulatedDocument": { "gatherings": [{ "units": [] }] }
                    }
                })),
                None,
            )
            .await?;

        let units = &form.options["prepopulatedDocument"]["gatherings"][0]["units"];
        assert_eq!(units.as_array().map(Vec::len), Some(2));
        assert_eq!(
            units[0],
            json!({
                "count": "1",
                "identifications": [{ "taxonID": "MX.10", "taxon": "Parus major" }],
                "unitFact": { "autocompleteSelectedTaxonID": "MX.10" }
            })
        );
        assert_eq!(units[1]["identifications"][0]["taxon"], "Cyanistes caeruleus");
        Ok(())
    }

    #[tokio::test]
    async fn test_conversion_is_deterministic_and_noop_patch_is_invisible() -> Result<()> {
        let ctx = create_service(vec![]);
        let first = ctx.service.convert(trip_report(), Format::Schema, None).await?;
        let second = ctx.service.convert(trip_report(), Format::Schema, None).await?;
        assert_eq!(first, second);

        let mut patched = trip_report();
        patched.patch = Some(json!([]));
        let third = ctx.service.convert(patched, Format::Schema, None).await?;
        assert_eq!(
            serde_json::to_string(&first)?,
            serde_json::to_string(&third)?
        );
        assert!(matches!(first, ConvertedForm::Schema(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_catalog_calls_memoized_until_flush() -> Result<()> {
        let ctx = create_service(vec![]);
        ctx.service.master_to_schema_format(trip_report(), None).await?;
        let calls = ctx.catalog.class_calls.load(Ordering::SeqCst);

        ctx.service.master_to_schema_format(trip_report(), None).await?;
        assert_eq!(ctx.catalog.class_calls.load(Ordering::SeqCst), calls);

        ctx.service.flush().await;
        ctx.service.master_to_schema_format(trip_report(), None).await?;
        assert_eq!(ctx.catalog.class_calls.load(Ordering::SeqCst), calls * 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_error_reports_without_failing() {
        let ctx = create_service(vec![]);
        assert!(ctx.service.get_error(trip_report()).await.is_none());

        let err = ctx
            .service
            .get_error(master(json!({ "fields": [{ "name": "nope" }] })))
            .await;
        assert!(err.is_some_and(|e| e.is_unprocessable()));

        assert_err!(
            ctx.service
                .master_to_schema_format(master(json!({ "context": "MY.x" })), None)
                .await
        );
    }
}
