//! Item source backed by a GeoJSON feature collection.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::geojson::{position, property, read_features, value_to_string};
use crate::{
    pipeline::{Geometry, ItemSource, SourceSize, WorkItem},
    Error, Result,
};

/// Materialized list of annotated features.
#[derive(Debug, Clone)]
pub struct FeatureSource {
    path: PathBuf,
    items: Vec<WorkItem>,
}

fn geometry_of(feature: &Value) -> Geometry {
    let Some(geometry) = feature.get("geometry").filter(|g| !g.is_null()) else {
        return Geometry::Other {
            kind: "None".to_string(),
        };
    };
    let kind = geometry
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("Unknown");
    match (kind, geometry.get("coordinates").and_then(position)) {
        ("Point", Some((x, y))) => Geometry::point(x, y),
        _ => Geometry::Other {
            kind: kind.to_string(),
        },
    }
}

impl FeatureSource {
    /// Load every feature, taking its id and label from the named properties.
    ///
    /// Non-point geometries are kept so the producer can report them skipped.
    pub fn open(path: &Path, id_column: &str, label_column: &str) -> Result<Self> {
        let features = read_features(path)?;
        let items = features
            .iter()
            .enumerate()
            .map(|(index, feature)| {
                let lookup = |column: &str| {
                    property(feature, column).map(value_to_string).ok_or_else(|| {
                        Error::parse(format!(
                            "{}: feature {index} has no '{column}' property",
                            path.display()
                        ))
                    })
                };
                Ok(WorkItem::new(
                    lookup(id_column)?,
                    lookup(label_column)?,
                    geometry_of(feature),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(path = %path.display(), features = items.len(), "Loaded feature source");
        Ok(Self {
            path: path.to_path_buf(),
            items,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ItemSource for FeatureSource {
    fn items(&self) -> Box<dyn Iterator<Item = WorkItem> + Send + '_> {
        Box::new(self.items.iter().cloned())
    }

    fn size_hint(&self) -> SourceSize {
        SourceSize::Exact(self.items.len())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn write_collection(dir: &Path) -> Result<PathBuf> {
        let path = dir.join("trees.geojson");
        let collection = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": 1, "properties": {"species": "oak"},
                 "geometry": {"type": "Point", "coordinates": [2.35, 48.85]}},
                {"type": "Feature", "id": 2, "properties": {"species": "pine"},
                 "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}},
                {"type": "Feature", "properties": {"id": "x-3", "species": "elm"},
                 "geometry": null}
            ]
        });
        std::fs::write(&path, collection.to_string())?;
        Ok(path)
    }

    #[test]
    fn test_loads_ids_labels_and_geometries() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = FeatureSource::open(&write_collection(dir.path())?, "id", "species")?;

        let items: Vec<WorkItem> = source.items().collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], WorkItem::at_point("1", "oak", 2.35, 48.85));
        assert_eq!(items[1].geometry.kind(), "LineString");
        assert_eq!(items[2].id, "x-3");
        assert_eq!(items[2].geometry.kind(), "None");
        assert_eq!(source.size_hint(), SourceSize::Exact(3));
        Ok(())
    }

    #[test]
    fn test_items_are_restartable() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = FeatureSource::open(&write_collection(dir.path())?, "id", "species")?;
        assert_eq!(source.items().count(), source.items().count());
        Ok(())
    }

    #[test]
    fn test_missing_label_column_is_parse_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let result = FeatureSource::open(&write_collection(dir.path())?, "id", "class");
        assert!(matches!(result, Err(Error::Parse(_))));
        Ok(())
    }
}
