//! Regular point grid over a bbox, optionally clipped to a region.

use serde::Serialize;

use super::region::{Region, RegionFilter};
use crate::{
    pipeline::{BBox, ItemSource, Point, SourceSize, VecSource, WorkItem},
    Error, Result,
};

/// Rough meters per degree at the equator.
const METERS_PER_DEGREE: f64 = 111_000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridInfo {
    pub bbox: BBox,
    pub spacing_degrees: f64,
    pub spacing_meters: f64,
    pub num_points_x: usize,
    pub num_points_y: usize,
    /// Before region filtering.
    pub total_points: usize,
    pub has_region_filter: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_filter: Option<RegionFilter>,
    pub area_degrees2: f64,
    pub area_km2: f64,
    pub start_id: u64,
    pub start_label: u64,
}

#[derive(Debug, Clone)]
pub struct GridSource {
    bbox: BBox,
    spacing: f64,
    start_id: u64,
    start_label: u64,
    region: Option<Region>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn steps(span: f64, spacing: f64) -> usize {
    (span / spacing).ceil() as usize + 1
}

impl GridSource {
    /// Either `bbox` or `region` must be given; with only a region the bbox
    /// is the region's bounds. A region always clips the grid.
    pub fn new(
        bbox: Option<BBox>,
        spacing: f64,
        start_id: u64,
        start_label: u64,
        region: Option<Region>,
    ) -> Result<Self> {
        let bbox = match (bbox, &region) {
            (Some(bbox), _) => bbox,
            (None, Some(region)) => {
                let bounds = region
                    .bounds()
                    .ok_or_else(|| Error::config("Region filter has no polygon coordinates"))?;
                tracing::info!(bbox = %bounds, "Grid bbox derived from region");
                bounds
            }
            (None, None) => {
                return Err(Error::config(
                    "Grid needs either 'bbox' or a region filter (path, column, value)",
                ))
            }
        };

        if bbox.minx >= bbox.maxx || bbox.miny >= bbox.maxy {
            return Err(Error::config(format!(
                "Invalid grid bbox {bbox}: minx < maxx and miny < maxy required"
            )));
        }
        if spacing <= 0.0 || !spacing.is_finite() {
            return Err(Error::config(format!("Grid spacing must be positive, got {spacing}")));
        }

        Ok(Self {
            bbox,
            spacing,
            start_id,
            start_label,
            region,
        })
    }

    pub const fn bbox(&self) -> BBox {
        self.bbox
    }

    fn dimensions(&self) -> (usize, usize) {
        (
            steps(self.bbox.width(), self.spacing),
            steps(self.bbox.height(), self.spacing),
        )
    }

    /// Grid points row by row from `miny`, clamped to the bbox, region-filtered.
    #[allow(clippy::cast_precision_loss)]
    fn points(&self) -> impl Iterator<Item = Point> + Send + '_ {
        let (num_x, num_y) = self.dimensions();
        (0..num_y)
            .flat_map(move |i| {
                let y = (i as f64).mul_add(self.spacing, self.bbox.miny).min(self.bbox.maxy);
                (0..num_x).map(move |j| {
                    let x = (j as f64).mul_add(self.spacing, self.bbox.minx).min(self.bbox.maxx);
                    Point::new(x, y)
                })
            })
            .filter(|point| self.region.as_ref().map_or(true, |r| r.contains(*point)))
    }

    /// Collect every item up front.
    pub fn materialize(&self) -> VecSource {
        VecSource::new(self.items().collect())
    }

    pub fn grid_info(&self) -> GridInfo {
        let (num_x, num_y) = self.dimensions();
        let width = self.bbox.width();
        let height = self.bbox.height();
        GridInfo {
            bbox: self.bbox,
            spacing_degrees: self.spacing,
            spacing_meters: self.spacing * METERS_PER_DEGREE,
            num_points_x: num_x,
            num_points_y: num_y,
            total_points: num_x * num_y,
            has_region_filter: self.region.is_some(),
            region_filter: self.region.as_ref().map(|r| r.filter().clone()),
            area_degrees2: width * height,
            area_km2: (width * METERS_PER_DEGREE) * (height * METERS_PER_DEGREE) / 1_000_000.0,
            start_id: self.start_id,
            start_label: self.start_label,
        }
    }
}

impl ItemSource for GridSource {
    /// Ids count up from `start_id` over emitted points only.
    fn items(&self) -> Box<dyn Iterator<Item = WorkItem> + Send + '_> {
        let label = self.start_label.to_string();
        Box::new(self.points().zip(self.start_id..).map(move |(point, id)| {
            WorkItem::at_point(id.to_string(), label.clone(), point.x, point.y)
        }))
    }

    fn size_hint(&self) -> SourceSize {
        let (num_x, num_y) = self.dimensions();
        if self.region.is_some() {
            SourceSize::Approx(num_x * num_y)
        } else {
            SourceSize::Exact(num_x * num_y)
        }
    }
}
