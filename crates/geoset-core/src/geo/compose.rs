//! Mosaic fetched tiles and cut the target-size image out of the middle.

use image::{imageops, RgbImage};

use super::tiles::{target_size_pixels, tile_bounds, Tile, TILE_SIZE};
use crate::{pipeline::BBox, Error, Result};

/// Paste `tiles` into one mosaic, then center-crop (or Lanczos-resize when the
/// crop does not fit) to the square target size for `bbox_size` at `zoom`.
///
/// The returned bbox is the mosaic center ± `bbox_size / 2`.
pub fn composite(tiles: &[(Tile, RgbImage)], bbox_size: f64, zoom: u8) -> Result<(RgbImage, BBox)> {
    let Some(mosaic_bounds) = tiles
        .iter()
        .map(|(tile, _)| tile_bounds(*tile))
        .reduce(|a, b| a.union(&b))
    else {
        return Err(Error::produce("No tiles to composite"));
    };

    let target = target_size_pixels(bbox_size, zoom);
    if target == 0 {
        return Err(Error::produce(format!(
            "bbox_size {bbox_size} is smaller than one pixel at zoom {zoom}"
        )));
    }

    let min_x = tiles.iter().map(|(t, _)| t.x).min().unwrap_or(0);
    let max_x = tiles.iter().map(|(t, _)| t.x).max().unwrap_or(0);
    let min_y = tiles.iter().map(|(t, _)| t.y).min().unwrap_or(0);
    let max_y = tiles.iter().map(|(t, _)| t.y).max().unwrap_or(0);

    let mut mosaic = RgbImage::new(
        (max_x - min_x + 1) * TILE_SIZE,
        (max_y - min_y + 1) * TILE_SIZE,
    );
    for (tile, image) in tiles {
        imageops::replace(
            &mut mosaic,
            image,
            i64::from((tile.x - min_x) * TILE_SIZE),
            i64::from((tile.y - min_y) * TILE_SIZE),
        );
    }

    let image = if mosaic.width() == target && mosaic.height() == target {
        mosaic
    } else if mosaic.width() >= target && mosaic.height() >= target {
        let crop_x = (mosaic.width() - target) / 2;
        let crop_y = (mosaic.height() - target) / 2;
        imageops::crop_imm(&mosaic, crop_x, crop_y, target, target).to_image()
    } else {
        imageops::resize(&mosaic, target, target, imageops::FilterType::Lanczos3)
    };

    Ok((image, BBox::around(mosaic_bounds.center(), bbox_size)))
}
