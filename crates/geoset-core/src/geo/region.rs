//! Polygon region filter loaded from a GeoJSON boundary file.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use super::geojson::{position, property, read_features, value_to_string};
use crate::{
    pipeline::{BBox, Point},
    Error, Result,
};

/// Where a region came from, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionFilter {
    pub path: PathBuf,
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Polygon {
    exterior: Vec<Point>,
    holes: Vec<Vec<Point>>,
}

/// Ray casting; points exactly on an edge may land either side.
fn ring_contains(ring: &[Point], point: Point) -> bool {
    let mut inside = false;
    let mut j = ring.len().wrapping_sub(1);
    for (i, a) in ring.iter().enumerate() {
        let b = ring[j];
        if (a.y > point.y) != (b.y > point.y)
            && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

impl Polygon {
    fn contains(&self, point: Point) -> bool {
        ring_contains(&self.exterior, point) && !self.holes.iter().any(|hole| ring_contains(hole, point))
    }
}

fn parse_ring(value: &Value) -> Option<Vec<Point>> {
    value
        .as_array()?
        .iter()
        .map(|pos| position(pos).map(|(x, y)| Point::new(x, y)))
        .collect()
}

fn parse_polygon(rings: &Value) -> Option<Polygon> {
    let mut rings = rings
        .as_array()?
        .iter()
        .map(parse_ring)
        .collect::<Option<Vec<_>>>()?
        .into_iter();
    let exterior = rings.next()?;
    Some(Polygon {
        exterior,
        holes: rings.collect(),
    })
}

fn parse_geometry(geometry: &Value) -> Option<Vec<Polygon>> {
    let coords = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "Polygon" => Some(vec![parse_polygon(coords)?]),
        "MultiPolygon" => coords.as_array()?.iter().map(parse_polygon).collect(),
        _ => None,
    }
}

/// Union of the (multi)polygons of every matching feature.
#[derive(Debug, Clone)]
pub struct Region {
    polygons: Vec<Polygon>,
    filter: RegionFilter,
}

impl Region {
    /// Load the features of `path` whose `column` equals `value`, falling back
    /// to a case-insensitive match.
    pub fn load(path: &Path, column: &str, value: &str) -> Result<Self> {
        let features = read_features(path)?;

        if !features.iter().any(|f| property(f, column).is_some()) {
            let available: Vec<String> = features
                .first()
                .and_then(|f| f.get("properties"))
                .and_then(Value::as_object)
                .map(|props| props.keys().cloned().collect())
                .unwrap_or_default();
            return Err(Error::config(format!(
                "Column '{column}' not found in {}. Available columns: {}",
                path.display(),
                available.join(", ")
            )));
        }

        let values: Vec<Option<String>> = features
            .iter()
            .map(|f| property(f, column).map(value_to_string))
            .collect();

        let exact: Vec<usize> = (0..features.len())
            .filter(|&i| values[i].as_deref() == Some(value))
            .collect();
        let matched = if exact.is_empty() {
            (0..features.len())
                .filter(|&i| {
                    values[i]
                        .as_deref()
                        .is_some_and(|v| v.eq_ignore_ascii_case(value))
                })
                .collect()
        } else {
            exact
        };

        if matched.is_empty() {
            let mut available: Vec<&str> = values.iter().flatten().map(String::as_str).collect();
            available.dedup();
            available.truncate(10);
            return Err(Error::config(format!(
                "No region matches '{value}' in column '{column}'. Available values (first 10): {}",
                available.join(", ")
            )));
        }
        if matched.len() > 1 {
            tracing::warn!(value, matches = matched.len(), "Multiple regions matched, using their union");
        }

        let polygons = matched
            .iter()
            .map(|&i| {
                features[i]
                    .get("geometry")
                    .and_then(parse_geometry)
                    .ok_or_else(|| {
                        Error::parse(format!(
                            "{}: feature {i} is not a Polygon or MultiPolygon",
                            path.display()
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        tracing::info!(path = %path.display(), column, value, features = matched.len(), "Loaded region filter");
        Ok(Self {
            polygons,
            filter: RegionFilter {
                path: path.to_path_buf(),
                column: column.to_string(),
                value: value.to_string(),
            },
        })
    }

    pub fn contains(&self, point: Point) -> bool {
        self.polygons.iter().any(|polygon| polygon.contains(point))
    }

    /// Bounding box of the exterior rings.
    pub fn bounds(&self) -> Option<BBox> {
        self.polygons
            .iter()
            .flat_map(|polygon| polygon.exterior.iter())
            .map(|p| BBox::new(p.x, p.y, p.x, p.y))
            .reduce(|a, b| a.union(&b))
    }

    pub const fn filter(&self) -> &RegionFilter {
        &self.filter
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn write_regions(dir: &Path) -> Result<PathBuf> {
        let path = dir.join("regions.geojson");
        let square_with_hole = json!({
            "type": "Polygon",
            "coordinates": [
                [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                [[4, 4], [6, 4], [6, 6], [4, 6], [4, 4]]
            ]
        });
        let islands = json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[20, 20], [21, 20], [21, 21], [20, 21], [20, 20]]],
                [[[30, 30], [31, 30], [31, 31], [30, 31], [30, 30]]]
            ]
        });
        let collection = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"NAME": "Mainland"}, "geometry": square_with_hole},
                {"type": "Feature", "properties": {"NAME": "Islands"}, "geometry": islands}
            ]
        });
        std::fs::write(&path, collection.to_string())?;
        Ok(path)
    }

    #[test]
    fn test_polygon_with_hole() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let region = Region::load(&write_regions(dir.path())?, "NAME", "Mainland")?;

        assert!(region.contains(Point::new(2.0, 2.0)));
        assert!(!region.contains(Point::new(5.0, 5.0)));
        assert!(!region.contains(Point::new(11.0, 2.0)));
        assert_eq!(region.bounds(), Some(BBox::new(0.0, 0.0, 10.0, 10.0)));
        Ok(())
    }

    #[test]
    fn test_case_insensitive_fallback_and_multipolygon() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let region = Region::load(&write_regions(dir.path())?, "NAME", "ISLANDS")?;

        assert!(region.contains(Point::new(20.5, 20.5)));
        assert!(region.contains(Point::new(30.5, 30.5)));
        assert!(!region.contains(Point::new(25.0, 25.0)));
        Ok(())
    }

    #[test]
    fn test_unknown_column_and_value_are_config_errors() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_regions(dir.path())?;
        assert!(matches!(Region::load(&path, "ISO", "FRA"), Err(Error::Config(_))));
        assert!(matches!(Region::load(&path, "NAME", "Atlantis"), Err(Error::Config(_))));
        Ok(())
    }
}
