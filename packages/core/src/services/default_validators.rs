//! Default validators injected into well-known field paths
//!
//! | Path | Key | |
//! |------|-----|-|
//! | `gatherings → geometry` | `geometry` | validators |
//! | `gatheringEvent → dateBegin` | `datetime` | validators |
//! | `gatheringEvent → dateEnd` | `datetime` | validators |
//!
//! Author declarations of the same key win. An author value of `false`
//! removes the key altogether. Companion translations are only added for
//! keys the Master does not translate itself.

use crate::models::{Field, Lang, Master};
use serde_json::{json, Map, Value};

struct DefaultValidator {
    parent: &'static str,
    field: &'static str,
    key: &'static str,
    config: fn() -> Value,
}

const DEFAULT_VALIDATORS: &[DefaultValidator] = &[
    DefaultValidator {
        parent: "gatherings",
        field: "geometry",
        key: "geometry",
        config: geometry_validator,
    },
    DefaultValidator {
        parent: "gatheringEvent",
        field: "dateBegin",
        key: "datetime",
        config: datetime_validator,
    },
    DefaultValidator {
        parent: "gatheringEvent",
        field: "dateEnd",
        key: "datetime",
        config: datetime_validator,
    },
];

fn geometry_validator() -> Value {
    json!({
        "requireShape": true,
        "message": {
            "missingGeometries": "@geometryValidation",
            "invalidBoundingBoxHectares": "@geometryHectaresMaxValidation",
            "notGeometry": "@geometryValidation",
            "missingType": "@geometryValidation",
            "invalidCoordinates": "@geometryValidation",
            "invalidGeometries": "@geometryValidation",
            "invalidRadius": "@geometryValidation"
        },
        "boundingBoxMaxHectares": 5_000_000
    })
}

fn datetime_validator() -> Value {
    json!({
        "earliest": "1000-01-01",
        "latest": "now",
        "message": {
            "earliest": "@dateTooEarlyValidation",
            "latest": "@dateLaterThanNowValidation"
        }
    })
}

/// `(key, fi, sv, en)` texts referenced by the default validators
const COMPANION_TRANSLATIONS: &[(&str, &str, &str, &str)] = &[
    (
        "@geometryValidation",
        "Havainnolle täytyy merkitä paikka kartalle.",
        "Platsen för observationen måste märkas på kartan.",
        "The observation must have a location on the map.",
    ),
    (
        "@geometryHectaresMaxValidation",
        "Kuvion rajaava suorakaide voi olla korkeintaan 50 000 km².",
        "Områdets omslutande rektangel får vara högst 50 000 km².",
        "The bounding box of the area can be at most 50 000 km².",
    ),
    (
        "@dateTooEarlyValidation",
        "Päivämäärä on liian aikaisin.",
        "Datumet är för tidigt.",
        "The date is too early.",
    ),
    (
        "@dateLaterThanNowValidation",
        "Päivämäärä ei voi olla tulevaisuudessa.",
        "Datumet kan inte vara i framtiden.",
        "The date can't be in the future.",
    ),
];

/// Inject the default validators and their translations into `master`
pub fn add_default_validators(mut master: Master) -> Master {
    let mut injected = false;
    for default in DEFAULT_VALIDATORS {
        let Some(field) = master
            .fields
            .iter_mut()
            .find(|f| f.name == default.parent)
            .and_then(|parent| parent.fields.iter_mut().find(|f| f.name == default.field))
        else {
            continue;
        };
        injected |= inject(field, default.key, (default.config)());
    }

    if injected {
        for (key, fi, sv, en) in COMPANION_TRANSLATIONS {
            for (lang, text) in [(Lang::Fi, fi), (Lang::Sv, sv), (Lang::En, en)] {
                master
                    .translations
                    .entry(lang)
                    .or_default()
                    .entry(key.to_string())
                    .or_insert_with(|| text.to_string());
            }
        }
    }
    master
}

/// Returns whether the default was injected
fn inject(field: &mut Field, key: &str, config: Value) -> bool {
    let mut validators = match field.validators.take() {
        Some(Value::Object(validators)) => validators,
        _ => Map::new(),
    };

    let injected = match validators.get(key) {
        Some(Value::Bool(false)) => {
            validators.remove(key);
            false
        }
        Some(_) => false,
        None => {
            validators.insert(key.to_string(), config);
            true
        }
    };

    if !validators.is_empty() {
        field.validators = Some(Value::Object(validators));
    }
    injected
}
