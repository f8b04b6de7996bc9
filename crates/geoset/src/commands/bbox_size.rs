//! Bbox size calculator
//!
//! One slippy tile is 256 px and spans `360 / 2^z` degrees, so a target of
//! `n` pixels needs `n / 256` tiles' worth of degrees.

use anyhow::Result;
use geoset_core::geo::tiles::{degrees_per_tile, TILE_SIZE};
use serde::Serialize;

use crate::json::Envelope;

/// Rough meters per degree at the equator.
const METERS_PER_DEGREE: f64 = 111_000.0;

#[derive(Debug, Clone, Copy)]
pub struct BboxSizeOptions {
    pub width: u32,
    pub height: u32,
    pub zoom: u8,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BboxEstimate {
    pub zoom_level: u8,
    pub target_resolution: String,
    pub degrees_per_tile: f64,
    pub bbox_width_degrees: f64,
    pub bbox_height_degrees: f64,
    /// Square bbox covering the larger dimension.
    pub bbox_size_square_degrees: f64,
    pub bbox_width_meters: f64,
    pub bbox_height_meters: f64,
    pub bbox_size_square_meters: f64,
    pub aspect_ratio: f64,
}

pub fn estimate(width: u32, height: u32, zoom: u8) -> BboxEstimate {
    let per_tile = degrees_per_tile(zoom);
    let tile_px = f64::from(TILE_SIZE);
    let bbox_width = f64::from(width) / tile_px * per_tile;
    let bbox_height = f64::from(height) / tile_px * per_tile;
    let square = bbox_width.max(bbox_height);

    BboxEstimate {
        zoom_level: zoom,
        target_resolution: format!("{width}x{height}"),
        degrees_per_tile: per_tile,
        bbox_width_degrees: bbox_width,
        bbox_height_degrees: bbox_height,
        bbox_size_square_degrees: square,
        bbox_width_meters: bbox_width * METERS_PER_DEGREE,
        bbox_height_meters: bbox_height * METERS_PER_DEGREE,
        bbox_size_square_meters: square * METERS_PER_DEGREE,
        aspect_ratio: f64::from(width) / f64::from(height.max(1)),
    }
}

pub fn run(options: &BboxSizeOptions) -> Result<()> {
    let result = estimate(options.width, options.height, options.zoom);

    if options.json {
        return Envelope::new("bbox-size", &result).print();
    }

    println!(
        "Bbox size for {} pixels at zoom {}",
        result.target_resolution, result.zoom_level
    );
    println!();
    println!("Degrees per tile: {:.6}°", result.degrees_per_tile);
    println!();
    println!("Rectangular bbox (exact resolution):");
    println!(
        "  Width:  {:.6}° ({:.1} m)",
        result.bbox_width_degrees, result.bbox_width_meters
    );
    println!(
        "  Height: {:.6}° ({:.1} m)",
        result.bbox_height_degrees, result.bbox_height_meters
    );
    println!();
    println!("Square bbox (larger dimension):");
    println!(
        "  Size:   {:.6}° ({:.1} m)",
        result.bbox_size_square_degrees, result.bbox_size_square_meters
    );
    println!();
    println!("Aspect ratio: {:.2}:1", result.aspect_ratio);
    println!();
    println!(
        "Use bbox_size = {:.6} in a [[modalities]] table for roughly {w}x{w} pixels.",
        result.bbox_size_square_degrees,
        w = options.width.max(options.height)
    );
    Ok(())
}
