//! In-memory collaborators and catalog fixtures shared by the integration
//! tests
//!
//! The catalog models a small observation document:
//!
//! ```text
//! MY.document
//! ├── secureLevel      (MX.secureLevels)
//! ├── keywords         (string, unbounded)
//! ├── gatheringEvent   (MZ.gatheringEvent)
//! │   ├── dateBegin    (string, minOccurs 1)
//! │   └── dateEnd      (string)
//! └── gatherings       (MY.gathering, unbounded)
//!     ├── geometry     (keyAny)
//!     ├── locality     (string)
//!     ├── habitat      (MY.habitatEnum, hierarchical)
//!     └── units        (MY.unit, unbounded)
//!         ├── recordBasis      (MY.recordBases, minOccurs 1)
//!         ├── count            (string)
//!         ├── notes            (multi-language)
//!         ├── identifications  (MY.identification, unbounded)
//!         └── unitFact         (MY.unitFact)
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use formbuilder_core::clients::{
    ClientError, FormStore, MetadataCatalog, TaxonSummary, TaxonomyCatalog,
};
use formbuilder_core::{FieldService, FormBuilderConfig, Master, Property, RangeEntry};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct FixtureCatalog {
    classes: HashMap<String, Vec<Property>>,
    ranges: HashMap<String, Vec<RangeEntry>>,
    pub class_calls: AtomicUsize,
}

#[async_trait]
impl MetadataCatalog for FixtureCatalog {
    async fn class_properties(&self, class: &str) -> Result<Vec<Property>, ClientError> {
        self.class_calls.fetch_add(1, Ordering::SeqCst);
        self.classes
            .get(class)
            .cloned()
            .ok_or_else(|| ClientError::not_found(class))
    }

    async fn alt_ranges(&self, range: &str) -> Result<Vec<RangeEntry>, ClientError> {
        self.ranges
            .get(range)
            .cloned()
            .ok_or_else(|| ClientError::not_found(range))
    }

    async fn all_alt_ranges(&self) -> Result<HashMap<String, Vec<RangeEntry>>, ClientError> {
        Ok(self.ranges.clone())
    }
}

fn properties(values: Vec<Value>) -> Vec<Property> {
    values
        .into_iter()
        .map(|v| serde_json::from_value(v).expect("valid property fixture"))
        .collect()
}

fn entries(values: Value) -> Vec<RangeEntry> {
    serde_json::from_value(values).expect("valid range fixture")
}

pub fn create_catalog() -> FixtureCatalog {
    let mut classes = HashMap::new();
    classes.insert(
        "MY.document".to_string(),
        properties(vec![
            json!({
                "property": "MY.secureLevel",
                "range": ["MX.secureLevels"],
                "label": { "fi": "Karkeistus", "sv": "Förgrovning", "en": "Coarsening" }
            }),
            json!({
                "property": "MY.keywords",
                "range": ["xsd:string"],
                "maxOccurs": "unbounded",
                "label": { "fi": "Avainsanat", "en": "Keywords" }
            }),
            json!({
                "property": "MY.gatheringEvent",
                "range": ["MZ.gatheringEvent"],
                "isEmbeddable": true,
                "label": { "fi": "Keruutapahtuma", "en": "Gathering event" }
            }),
            json!({
                "property": "MY.gatherings",
                "range": ["MY.gathering"],
                "isEmbeddable": true,
                "maxOccurs": "unbounded",
                "label": { "fi": "Keruutapahtumat", "en": "Gatherings" }
            }),
        ]),
    );
    classes.insert(
        "MZ.gatheringEvent".to_string(),
        properties(vec![
            json!({
                "property": "MZ.dateBegin",
                "range": ["xsd:string"],
                "minOccurs": "1",
                "label": { "fi": "Alkupäivä", "en": "Start date" }
            }),
            json!({
                "property": "MZ.dateEnd",
                "range": ["xsd:string"],
                "label": { "fi": "Loppupäivä", "en": "End date" }
            }),
        ]),
    );
    classes.insert(
        "MY.gathering".to_string(),
        properties(vec![
            json!({
                "property": "MY.geometry",
                "range": ["MZ.keyAny"],
                "label": { "fi": "Kuvio", "en": "Geometry" }
            }),
            json!({
                "property": "MY.locality",
                "range": ["xsd:string"],
                "label": { "fi": "Paikannimi", "en": "Locality" }
            }),
            json!({
                "property": "MY.habitat",
                "range": ["MY.habitatEnum"],
                "label": { "fi": "Elinympäristö", "en": "Habitat" }
            }),
            json!({
                "property": "MY.units",
                "range": ["MY.unit"],
                "isEmbeddable": true,
                "maxOccurs": "unbounded",
                "label": { "fi": "Havainnot", "en": "Units" }
            }),
        ]),
    );
    classes.insert(
        "MY.unit".to_string(),
        properties(vec![
            json!({
                "property": "MY.recordBasis",
                "range": ["MY.recordBases"],
                "minOccurs": "1",
                "required": true,
                "label": { "fi": "Havaintotapa", "en": "Record basis" }
            }),
            json!({
                "property": "MY.count",
                "range": ["xsd:string"],
                "label": { "fi": "Määrä", "en": "Count" }
            }),
            json!({
                "property": "MY.notes",
                "range": ["xsd:string"],
                "multiLanguage": true,
                "label": { "fi": "Lisätiedot", "en": "Notes" },
                "comment": { "fi": "Vapaamuotoiset lisätiedot", "en": "Free-form notes" }
            }),
            json!({
                "property": "MY.identifications",
                "range": ["MY.identification"],
                "isEmbeddable": true,
                "maxOccurs": "unbounded"
            }),
            json!({
                "property": "MY.unitFact",
                "range": ["MY.unitFact"],
                "isEmbeddable": true
            }),
        ]),
    );
    classes.insert(
        "MY.identification".to_string(),
        properties(vec![
            json!({ "property": "MY.taxon", "range": ["xsd:string"], "label": { "en": "Taxon" } }),
            json!({ "property": "MY.taxonID", "range": ["xsd:string"] }),
        ]),
    );
    classes.insert(
        "MY.unitFact".to_string(),
        properties(vec![json!({
            "property": "MY.autocompleteSelectedTaxonID",
            "range": ["xsd:string"]
        })]),
    );
    classes.insert(
        "MNP.namedPlace".to_string(),
        properties(vec![
            json!({ "property": "MNP.name", "range": ["xsd:string"], "label": { "en": "Name" } }),
            json!({ "property": "MNP.municipality", "range": ["xsd:string"] }),
        ]),
    );
    classes.insert(
        "MAN.annotation".to_string(),
        properties(vec![json!({ "property": "MAN.opinion", "range": ["xsd:string"] })]),
    );

    let mut ranges = HashMap::new();
    ranges.insert(
        "MX.secureLevels".to_string(),
        entries(json!([
            { "id": "MX.secureLevelNone", "value": { "fi": "Ei karkeistusta", "en": "No coarsening" } },
            { "id": "MX.secureLevelKM1", "value": { "fi": "1 km", "sv": "1 km", "en": "1 km" } },
            { "id": "MX.secureLevelKM5", "value": { "fi": "5 km", "sv": "5 km", "en": "5 km" } },
            { "id": "MX.secureLevelKM10", "value": { "fi": "10 km", "sv": "10 km", "en": "10 km" } }
        ])),
    );
    ranges.insert(
        "MY.recordBases".to_string(),
        entries(json!([
            { "id": "MY.recordBasisHumanObservation", "value": { "fi": "Havainto", "en": "Observation" } },
            { "id": "MY.recordBasisPreservedSpecimen", "value": { "fi": "Näyte", "en": "Specimen" } }
        ])),
    );
    ranges.insert(
        "MY.habitatEnum".to_string(),
        entries(json!([
            { "id": "MKV.forest", "value": { "fi": "Metsä", "en": "Forest" } },
            { "id": "MKV.heathForest", "value": { "fi": "Kangasmetsä", "en": "Heath forest" }, "altParent": "MKV.forest" },
            { "id": "MKV.mire", "value": { "fi": "Suo", "en": "Mire" } }
        ])),
    );

    FixtureCatalog {
        classes,
        ranges,
        class_calls: AtomicUsize::new(0),
    }
}

/// Taxon sets and informal group species
#[derive(Default)]
pub struct FixtureTaxonomy {
    pub set_calls: AtomicUsize,
}

#[async_trait]
impl TaxonomyCatalog for FixtureTaxonomy {
    async fn taxon_set(&self, set_id: &str) -> Result<Vec<String>, ClientError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        match set_id {
            "MX.taxonSetBirds" => Ok(vec!["MX.1".to_string(), "MX.2".to_string()]),
            "MX.taxonSetMammals" => Ok(vec!["MX.3".to_string()]),
            other => Err(ClientError::not_found(other)),
        }
    }

    async fn species_by_informal_groups(
        &self,
        groups: &[String],
    ) -> Result<Vec<TaxonSummary>, ClientError> {
        if !groups.iter().any(|g| g == "MVL.1") {
            return Ok(Vec::new());
        }
        Ok(vec![
            TaxonSummary {
                id: "MX.10".to_string(),
                scientific_name: Some("Parus major".to_string()),
                vernacular_name: Some("talitiainen".to_string()),
            },
            TaxonSummary {
                id: "MX.11".to_string(),
                scientific_name: Some("Cyanistes caeruleus".to_string()),
                vernacular_name: None,
            },
        ])
    }
}

/// Form storage keeping Masters in memory
#[derive(Default)]
pub struct InMemoryStore {
    forms: Mutex<HashMap<String, Master>>,
    next_id: AtomicUsize,
}

impl InMemoryStore {
    pub fn with_forms(forms: Vec<Master>) -> Self {
        let store = Self::default();
        for form in forms {
            let id = form.id.clone().expect("fixture forms have ids");
            store.forms.lock().unwrap().insert(id, form);
        }
        store
    }
}

#[async_trait]
impl FormStore for InMemoryStore {
    async fn get_forms(&self) -> Result<Vec<Value>, ClientError> {
        let forms = self.forms.lock().unwrap();
        let mut list: Vec<Value> = forms
            .values()
            .map(|f| json!({ "id": f.id, "name": f.rest.get("name") }))
            .collect();
        list.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
        Ok(list)
    }

    async fn get_form(&self, id: &str) -> Result<Master, ClientError> {
        self.forms
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::not_found(id))
    }

    async fn create_form(&self, mut form: Master) -> Result<Master, ClientError> {
        let id = format!("JX.{}", 1000 + self.next_id.fetch_add(1, Ordering::SeqCst));
        form.id = Some(id.clone());
        self.forms.lock().unwrap().insert(id, form.clone());
        Ok(form)
    }

    async fn update_form(&self, id: &str, mut form: Master) -> Result<Master, ClientError> {
        let mut forms = self.forms.lock().unwrap();
        if !forms.contains_key(id) {
            return Err(ClientError::not_found(id));
        }
        form.id = Some(id.to_string());
        forms.insert(id.to_string(), form.clone());
        Ok(form)
    }

    async fn delete_form(&self, id: &str) -> Result<(), ClientError> {
        self.forms
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ClientError::not_found(id))
    }
}

pub struct TestContext {
    pub service: FieldService,
    pub catalog: Arc<FixtureCatalog>,
    pub taxonomy: Arc<FixtureTaxonomy>,
    pub store: Arc<InMemoryStore>,
}

/// Field service over the fixtures, with `forms` stored
pub fn create_service(forms: Vec<Master>) -> TestContext {
    let catalog = Arc::new(create_catalog());
    let taxonomy = Arc::new(FixtureTaxonomy::default());
    let store = Arc::new(InMemoryStore::with_forms(forms));
    let service = FieldService::with_collaborators(
        catalog.clone(),
        taxonomy.clone(),
        store.clone(),
        &FormBuilderConfig::default(),
    );
    TestContext {
        service,
        catalog,
        taxonomy,
        store,
    }
}

pub fn master(value: Value) -> Master {
    serde_json::from_value(value).expect("valid master fixture")
}

/// A typical trip report form
pub fn trip_report() -> Master {
    master(json!({
        "id": "JX.519",
        "name": "Trip report",
        "collectionID": "HR.1747",
        "fields": [
            { "name": "secureLevel" },
            { "name": "keywords" },
            {
                "name": "gatheringEvent",
                "fields": [{ "name": "dateBegin" }, { "name": "dateEnd" }]
            },
            {
                "name": "gatherings",
                "fields": [
                    { "name": "geometry" },
                    { "name": "locality", "options": { "excludeFromCopy": true } },
                    { "name": "habitat" },
                    {
                        "name": "units",
                        "fields": [
                            { "name": "recordBasis" },
                            { "name": "count" },
                            { "name": "notes" }
                        ]
                    }
                ]
            }
        ],
        "translations": {
            "fi": { "@title": "Retkiraportti" },
            "sv": { "@title": "Exkursionsrapport" },
            "en": { "@title": "Trip report" }
        },
        "uiSchema": { "ui:title": "@title" }
    }))
}
