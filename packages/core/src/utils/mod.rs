//! Utility functions for the form compiler
//!
//! This module provides JSON tree helpers used across the services.

mod json;

pub use json::{deep_merge, is_empty_object, translate, TRANSLATION_KEY_PREFIX};
