//! Data Models
//!
//! This module contains the data structures the form compiler works on:
//!
//! - `Master` / `Field` - the author-facing form definition
//! - `Property` / `RangeEntry` - metadata served by the catalog
//! - `SchemaFormat` / `ExpandedJsonFormat` - the two compiled outputs
//! - `Lang` / `Translations` - language codes and translation tables

mod format;
mod lang;
mod master;
mod property;

pub use format::{ConvertedForm, ExpandedField, ExpandedJsonFormat, Format, SchemaFormat};
pub use lang::{merge_translations, pick_label, Lang, LangMap, Translations};
pub use master::{ExpandedMaster, Field, FieldOptions, Master};
pub use property::{range_tag, unprefix, Property, RangeEntry, UNBOUNDED};
