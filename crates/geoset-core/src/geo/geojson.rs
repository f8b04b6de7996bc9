//! Minimal GeoJSON reading shared by the feature source and region filter.

use std::path::Path;

use serde_json::Value;

use crate::{Error, Result};

/// Extensions accepted as GeoJSON input.
pub const GEOJSON_EXTENSIONS: &[&str] = &["geojson", "json"];

pub fn is_geojson_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            GEOJSON_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Read the features of a `FeatureCollection` (or a single `Feature`).
pub fn read_features(path: &Path) -> Result<Vec<Value>> {
    if !path.is_file() {
        return Err(Error::config(format!("File '{}' not found", path.display())));
    }
    if !is_geojson_path(path) {
        return Err(Error::config(format!(
            "Unsupported file extension '{}': expected .geojson or .json",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("Failed to read {}: {e}", path.display())))?;
    let document: Value = serde_json::from_str(&content)
        .map_err(|e| Error::parse(format!("Invalid GeoJSON in {}: {e}", path.display())))?;

    match document.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => match document.get("features") {
            Some(Value::Array(features)) => Ok(features.clone()),
            _ => Err(Error::parse(format!(
                "{}: FeatureCollection has no 'features' array",
                path.display()
            ))),
        },
        Some("Feature") => Ok(vec![document]),
        other => Err(Error::parse(format!(
            "{}: expected a FeatureCollection, found {}",
            path.display(),
            other.unwrap_or("no type")
        ))),
    }
}

/// Look up a property, falling back to the feature-level `id` member.
pub fn property<'a>(feature: &'a Value, name: &str) -> Option<&'a Value> {
    feature
        .get("properties")
        .and_then(|props| props.get(name))
        .filter(|value| !value.is_null())
        .or_else(|| {
            (name == "id")
                .then(|| feature.get("id"))
                .flatten()
                .filter(|value| !value.is_null())
        })
}

/// Render a scalar property as text (`"7"`, not `"\"7\""`).
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `[x, y]` from a GeoJSON position array.
pub fn position(value: &Value) -> Option<(f64, f64)> {
    let coords = value.as_array()?;
    Some((coords.first()?.as_f64()?, coords.get(1)?.as_f64()?))
}
