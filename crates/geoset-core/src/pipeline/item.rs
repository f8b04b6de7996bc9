//! Work items and the geometry primitives they carry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A lon/lat (or projected x/y) coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box `(minx, miny, maxx, maxy)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl BBox {
    pub const fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    /// Square box of side `size` centered on `center`.
    pub fn around(center: Point, size: f64) -> Self {
        let half = size / 2.0;
        Self::new(center.x - half, center.y - half, center.x + half, center.y + half)
    }

    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.minx + self.maxx) / 2.0,
            (self.miny + self.maxy) / 2.0,
        )
    }

    pub fn contains(&self, point: Point) -> bool {
        (self.minx..=self.maxx).contains(&point.x) && (self.miny..=self.maxy).contains(&point.y)
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            self.minx.min(other.minx),
            self.miny.min(other.miny),
            self.maxx.max(other.maxx),
            self.maxy.max(other.maxy),
        )
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.minx, self.miny, self.maxx, self.maxy]
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.6}, {:.6}, {:.6}, {:.6})",
            self.minx, self.miny, self.maxx, self.maxy
        )
    }
}

/// Payload of a work item. Producers only handle points; anything else is
/// carried through so the producer can report it as skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { x: f64, y: f64 },
    Other { kind: String },
}

impl Geometry {
    pub const fn point(x: f64, y: f64) -> Self {
        Self::Point { x, y }
    }

    pub const fn as_point(&self) -> Option<Point> {
        match self {
            Self::Point { x, y } => Some(Point::new(*x, *y)),
            Self::Other { .. } => None,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Point { .. } => "Point",
            Self::Other { kind } => kind,
        }
    }
}

/// One unit of work: one annotated location to turn into one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub label: String,
    pub geometry: Geometry,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            geometry,
        }
    }

    pub fn at_point(id: impl Into<String>, label: impl Into<String>, x: f64, y: f64) -> Self {
        Self::new(id, label, Geometry::point(x, y))
    }
}
