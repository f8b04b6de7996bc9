//! Produced artifacts: an RGB raster plus its geographic metadata.

use image::RgbImage;
use serde::Serialize;
use serde_json::{Map, Value};

use super::item::BBox;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactMetadata {
    pub bbox: BBox,
    pub crs: String,
    /// Producer-specific fields (zoom, tile server, item id, ...).
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl ArtifactMetadata {
    pub fn new(bbox: BBox, crs: impl Into<String>) -> Self {
        Self {
            bbox,
            crs: crs.into(),
            properties: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Artifact {
    pub image: RgbImage,
    pub metadata: ArtifactMetadata,
}

impl Artifact {
    pub const fn new(image: RgbImage, metadata: ArtifactMetadata) -> Self {
        Self { image, metadata }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
