//! Web-Mercator slippy-map tile math.

use std::f64::consts::PI;

use serde::Serialize;

use crate::pipeline::{BBox, Point};

/// Latitude limit of the Web-Mercator square.
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;

/// Nudge applied to the east/south edge so a bbox ending exactly on a tile
/// boundary does not pull in the neighbouring tile.
pub const LL_EPSILON: f64 = 1e-11;

/// Pixels per tile edge.
pub const TILE_SIZE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl Tile {
    pub const fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }
}

fn tiles_per_side(zoom: u8) -> f64 {
    f64::from(1_u32 << u32::from(zoom.min(31)))
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn clamp_index(fraction: f64, zoom: u8) -> u32 {
    let side = tiles_per_side(zoom);
    if fraction <= 0.0 {
        0
    } else if fraction >= 1.0 {
        (side - 1.0) as u32
    } else {
        ((fraction + 1e-14) * side).floor() as u32
    }
}

/// Tile containing a lon/lat point at `zoom`.
pub fn tile_for(lng: f64, lat: f64, zoom: u8) -> Tile {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = lng / 360.0 + 0.5;
    let sin_lat = lat.to_radians().sin();
    let y = 0.25f64.mul_add(-((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / PI, 0.5);
    Tile::new(clamp_index(x, zoom), clamp_index(y, zoom), zoom)
}

/// Geographic bounds of a tile.
pub fn tile_bounds(tile: Tile) -> BBox {
    let side = tiles_per_side(tile.z);
    let lng = |x: f64| x / side * 360.0 - 180.0;
    let lat = |y: f64| (PI * 2.0f64.mul_add(-y / side, 1.0)).sinh().atan().to_degrees();
    let x = f64::from(tile.x);
    let y = f64::from(tile.y);
    BBox::new(lng(x), lat(y + 1.0), lng(x + 1.0), lat(y))
}

/// Every tile at `zoom` intersecting `bbox`, row by row from the north-west.
pub fn tiles_covering(bbox: BBox, zoom: u8) -> Vec<Tile> {
    let west = bbox.minx.max(-180.0);
    let south = bbox.miny.max(-MAX_LATITUDE);
    let east = bbox.maxx.min(180.0);
    let north = bbox.maxy.min(MAX_LATITUDE);
    if west > east || south > north {
        return Vec::new();
    }

    let upper_left = tile_for(west, north, zoom);
    let lower_right = tile_for(east - LL_EPSILON, south + LL_EPSILON, zoom);

    (upper_left.y..=lower_right.y)
        .flat_map(|y| (upper_left.x..=lower_right.x).map(move |x| Tile::new(x, y, zoom)))
        .collect()
}

/// Square box of side `bbox_size` degrees centered on `point`.
pub fn bbox_around_point(point: Point, bbox_size: f64) -> BBox {
    BBox::around(point, bbox_size)
}

/// Degrees of longitude covered by one tile at `zoom`.
pub fn degrees_per_tile(zoom: u8) -> f64 {
    360.0 / tiles_per_side(zoom)
}

/// Output edge length in pixels for a `bbox_size`-degree box at `zoom`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn target_size_pixels(bbox_size: f64, zoom: u8) -> u32 {
    (bbox_size / degrees_per_tile(zoom) * f64::from(TILE_SIZE))
        .floor()
        .max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_tile_for_known_location() {
        // Null Island sits on the corner of four tiles; the south-east one wins.
        assert_eq!(tile_for(0.0, 0.0, 1), Tile::new(1, 1, 1));
        assert_eq!(tile_for(-0.1, 0.1, 1), Tile::new(0, 0, 1));
        assert_eq!(tile_for(180.0, -90.0, 2), Tile::new(3, 3, 2));
    }

    #[test]
    fn test_tile_bounds_of_root() {
        let bounds = tile_bounds(Tile::new(0, 0, 0));
        assert!((bounds.minx + 180.0).abs() < 1e-9);
        assert!((bounds.maxx - 180.0).abs() < 1e-9);
        assert!((bounds.maxy - MAX_LATITUDE).abs() < 1e-6);
    }

    #[test]
    fn test_bbox_on_tile_edge_does_not_spill() {
        let bounds = tile_bounds(Tile::new(10, 12, 5));
        let tiles = tiles_covering(bounds, 5);
        assert_eq!(tiles, vec![Tile::new(10, 12, 5)]);
    }

    #[test]
    fn test_target_size_pixels() {
        // One tile width maps to exactly one tile of pixels.
        assert_eq!(target_size_pixels(degrees_per_tile(18), 18), 256);
        assert_eq!(target_size_pixels(0.001, 18), 186);
        assert_eq!(target_size_pixels(0.0, 18), 0);
    }

    proptest! {
        #[test]
        fn prop_covering_tiles_intersect_and_cover(
            lng in -179.0f64..179.0,
            lat in -80.0f64..80.0,
            size in 0.0001f64..0.05,
            zoom in 10u8..19,
        ) {
            let bbox = bbox_around_point(Point::new(lng, lat), size);
            let tiles = tiles_covering(bbox, zoom);
            prop_assert!(!tiles.is_empty());

            let cover = tiles
                .iter()
                .map(|tile| tile_bounds(*tile))
                .reduce(|a, b| a.union(&b));
            prop_assert!(cover.is_some());
            if let Some(cover) = cover {
                prop_assert!(cover.minx <= bbox.minx + 1e-9);
                prop_assert!(cover.maxx >= bbox.maxx - 1e-9);
                prop_assert!(cover.miny <= bbox.miny + 1e-9);
                prop_assert!(cover.maxy >= bbox.maxy - 1e-9);
            }

            for tile in &tiles {
                let bounds = tile_bounds(*tile);
                prop_assert!(bounds.minx < bbox.maxx && bounds.maxx > bbox.minx);
                prop_assert!(bounds.miny < bbox.maxy && bounds.maxy > bbox.miny);
            }
        }

        #[test]
        fn prop_point_lies_in_its_tile(
            lng in -179.9f64..179.9,
            lat in -85.0f64..85.0,
            zoom in 0u8..20,
        ) {
            let bounds = tile_bounds(tile_for(lng, lat, zoom));
            prop_assert!(bounds.minx <= lng + 1e-9 && lng <= bounds.maxx + 1e-9);
            prop_assert!(bounds.miny <= lat + 1e-9 && lat <= bounds.maxy + 1e-9);
        }
    }
}
