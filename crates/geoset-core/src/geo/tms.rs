//! TMS artifact producer: bbox around a point, fetch covering tiles,
//! composite to a fixed-size image.

use futures::future::try_join_all;
use serde_json::json;

use super::{
    compose::composite,
    fetch::{TileFetcher, TileServer},
    tiles::{bbox_around_point, target_size_pixels, tiles_covering},
};
use crate::{
    pipeline::{Artifact, ArtifactMetadata, ArtifactProducer, WorkItem},
    Error, Result,
};

pub struct TmsProducer {
    fetcher: TileFetcher,
    bbox_size: f64,
    zoom: u8,
    crs: String,
}

impl TmsProducer {
    pub fn new(server: TileServer, bbox_size: f64, zoom: u8, blank_on_fetch_error: bool) -> Result<Self> {
        if bbox_size <= 0.0 || !bbox_size.is_finite() {
            return Err(Error::config(format!("bbox_size must be positive, got {bbox_size}")));
        }
        if target_size_pixels(bbox_size, zoom) == 0 {
            return Err(Error::config(format!(
                "bbox_size {bbox_size} is smaller than one pixel at zoom {zoom}"
            )));
        }
        Ok(Self {
            fetcher: TileFetcher::new(server, blank_on_fetch_error)?,
            bbox_size,
            zoom,
            crs: "EPSG:4326".to_string(),
        })
    }

    pub fn target_size(&self) -> u32 {
        target_size_pixels(self.bbox_size, self.zoom)
    }
}

#[async_trait::async_trait]
impl ArtifactProducer for TmsProducer {
    async fn produce(&self, item: &WorkItem) -> Result<Option<Artifact>> {
        let Some(point) = item.geometry.as_point() else {
            tracing::debug!(item_id = %item.id, geometry = item.geometry.kind(), "Not a point, skipping");
            return Ok(None);
        };

        let bbox = bbox_around_point(point, self.bbox_size);
        let tiles = tiles_covering(bbox, self.zoom);
        if tiles.is_empty() {
            tracing::warn!(item_id = %item.id, bbox = %bbox, "No tiles cover bbox");
            return Ok(None);
        }
        tracing::debug!(item_id = %item.id, bbox = %bbox, tiles = tiles.len(), "Fetching tiles");

        let fetched = try_join_all(tiles.into_iter().map(|tile| async move {
            self.fetcher.fetch(tile).await.map(|image| (tile, image))
        }))
        .await?;

        let (bbox_size, zoom) = (self.bbox_size, self.zoom);
        let (image, final_bbox) =
            tokio::task::spawn_blocking(move || composite(&fetched, bbox_size, zoom))
                .await
                .map_err(|e| Error::produce(format!("Compositing task failed: {e}")))??;

        let metadata = ArtifactMetadata::new(final_bbox, self.crs.as_str())
            .with("zoom_level", self.zoom)
            .with("tile_server", self.fetcher.server().name())
            .with("bbox_size", self.bbox_size)
            .with("item_id", item.id.as_str())
            .with("item_label", item.label.as_str())
            .with("geometry_type", item.geometry.kind())
            .with("point_coords", json!([point.x, point.y]));

        Ok(Some(Artifact::new(image, metadata)))
    }
}
