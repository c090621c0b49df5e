//! Language Codes and Translation Tables
//!
//! Forms are authored in three languages. Labels coming from the metadata
//! catalog are per-language maps, and authored strings beginning with `@`
//! are keys into the Master's `translations` table.

use crate::services::FormServiceError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Supported form languages
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Fi,
    Sv,
    En,
}

impl Lang {
    /// All languages, in the order translations are materialized
    pub const ALL: [Lang; 3] = [Lang::Fi, Lang::Sv, Lang::En];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Fi => "fi",
            Lang::Sv => "sv",
            Lang::En => "en",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lang {
    type Err = FormServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fi" => Ok(Lang::Fi),
            "sv" => Ok(Lang::Sv),
            "en" => Ok(Lang::En),
            other => Err(FormServiceError::unprocessable(format!(
                "Invalid lang '{}', must be one of fi, sv, en",
                other
            ))),
        }
    }
}

/// Per-language string map, as returned by the catalog with `lang=multi`
pub type LangMap = BTreeMap<Lang, String>;

/// `{lang → {key → text}}` translation table of a Master
pub type Translations = BTreeMap<Lang, BTreeMap<String, String>>;

/// Reads a translation table, skipping languages other than fi, sv and en
pub fn deserialize_translations<'de, D>(deserializer: D) -> Result<Translations, D::Error>
where
    D: Deserializer<'de>,
{
    let mut translations = Translations::new();
    for (key, entries) in Map::<String, Value>::deserialize(deserializer)? {
        let Ok(lang) = key.parse::<Lang>() else {
            continue;
        };
        let entries = serde_json::from_value(entries).map_err(serde::de::Error::custom)?;
        translations.insert(lang, entries);
    }
    Ok(translations)
}

/// Pick the label for `lang`, falling back to the other languages
///
/// Falls back in the order fi, en, sv and finally to an empty string.
pub fn pick_label(labels: &LangMap, lang: Lang) -> String {
    labels
        .get(&lang)
        .or_else(|| labels.get(&Lang::Fi))
        .or_else(|| labels.get(&Lang::En))
        .or_else(|| labels.get(&Lang::Sv))
        .cloned()
        .unwrap_or_default()
}

/// Merge `overlay` translations over `base`, `overlay` winning on key collision
pub fn merge_translations(base: Translations, overlay: Translations) -> Translations {
    let mut merged = base;
    for (lang, entries) in overlay {
        merged.entry(lang).or_default().extend(entries);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_parsing() {
        assert_eq!("fi".parse::<Lang>().unwrap(), Lang::Fi);
        assert_eq!("sv".parse::<Lang>().unwrap(), Lang::Sv);
        assert_eq!("en".parse::<Lang>().unwrap(), Lang::En);

        let err = "de".parse::<Lang>().unwrap_err();
        assert!(err.is_unprocessable());
    }

    #[test]
    fn test_translations_serialize_with_lang_keys() {
        let mut translations = Translations::new();
        translations
            .entry(Lang::Sv)
            .or_default()
            .insert("@hello".to_string(), "hej".to_string());

        let json = serde_json::to_value(&translations).unwrap();
        assert_eq!(json["sv"]["@hello"], "hej");
    }

    #[test]
    fn test_pick_label_fallback() {
        let mut labels = LangMap::new();
        labels.insert(Lang::En, "Locality".to_string());

        assert_eq!(pick_label(&labels, Lang::Sv), "Locality");
        assert_eq!(pick_label(&LangMap::new(), Lang::Fi), "");

        labels.insert(Lang::Sv, "Lokalitet".to_string());
        assert_eq!(pick_label(&labels, Lang::Sv), "Lokalitet");
    }

    #[test]
    fn test_merge_translations_overlay_wins() {
        let mut base = Translations::new();
        base.entry(Lang::Fi)
            .or_default()
            .extend([("@a".to_string(), "base".to_string()), ("@b".to_string(), "b".to_string())]);
        let mut overlay = Translations::new();
        overlay
            .entry(Lang::Fi)
            .or_default()
            .insert("@a".to_string(), "child".to_string());

        let merged = merge_translations(base, overlay);
        assert_eq!(merged[&Lang::Fi]["@a"], "child");
        assert_eq!(merged[&Lang::Fi]["@b"], "b");
    }
}
