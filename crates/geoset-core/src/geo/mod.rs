//! Geographic collaborators: item sources and the TMS artifact producer.

pub mod compose;
pub mod features;
pub mod fetch;
pub mod geojson;
pub mod grid;
pub mod region;
pub mod tiles;
pub mod tms;

pub use features::FeatureSource;
pub use fetch::{RateLimiter, TileFetcher, TileServer};
pub use grid::{GridInfo, GridSource};
pub use region::{Region, RegionFilter};
pub use tiles::{bbox_around_point, target_size_pixels, tile_bounds, tiles_covering, Tile};
pub use tms::TmsProducer;
