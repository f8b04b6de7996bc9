//! Tile fetching: server URL templates, a shared rate limiter and the HTTP
//! client.

use std::{
    fmt,
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::tiles::{Tile, TILE_SIZE};
use crate::{Error, Result};

/// Per-request timeout so one stalled tile cannot wedge a worker.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const GOOGLE_TEMPLATE: &str = "https://mt1.google.com/vt/lyrs=s&x={x}&y={y}&z={z}";
const OSM_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TILE SERVER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TileServer {
    #[default]
    Google,
    Osm,
    /// URL template with `{x}`, `{y}` and `{z}` placeholders.
    Custom(String),
}

impl TileServer {
    pub fn name(&self) -> &str {
        match self {
            Self::Google => "google",
            Self::Osm => "osm",
            Self::Custom(template) => template,
        }
    }

    fn template(&self) -> &str {
        match self {
            Self::Google => GOOGLE_TEMPLATE,
            Self::Osm => OSM_TEMPLATE,
            Self::Custom(template) => template,
        }
    }

    pub fn url(&self, tile: Tile) -> String {
        self.template()
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
            .replace("{z}", &tile.z.to_string())
    }

    /// Minimum spacing between request starts. OSM allows two per second.
    pub const fn min_interval(&self) -> Duration {
        match self {
            Self::Osm => Duration::from_millis(500),
            Self::Google | Self::Custom(_) => Duration::from_millis(100),
        }
    }

    /// OSM's usage policy requires an identifying User-Agent.
    pub const fn user_agent(&self) -> &'static str {
        match self {
            Self::Osm => concat!("geoset/", env!("CARGO_PKG_VERSION")),
            Self::Google | Self::Custom(_) => "Mozilla/5.0",
        }
    }
}

impl fmt::Display for TileServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TileServer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "google" => Ok(Self::Google),
            "osm" => Ok(Self::Osm),
            template if ["{x}", "{y}", "{z}"].iter().all(|p| template.contains(p)) => {
                Ok(Self::Custom(template.to_string()))
            }
            other => Err(Error::config(format!(
                "Unknown tile server '{other}': expected 'google', 'osm' or a URL template with {{x}}, {{y}} and {{z}}"
            ))),
        }
    }
}

impl TryFrom<String> for TileServer {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_str(&value)
    }
}

impl From<TileServer> for String {
    fn from(server: TileServer) -> Self {
        server.name().to_string()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RATE LIMITER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Enforces a minimum interval between request starts across every worker
/// sharing it.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait for the next request slot.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TILE FETCHER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Gray stand-in for a tile that could not be fetched.
pub fn blank_tile() -> RgbImage {
    RgbImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgb([128, 128, 128]))
}

pub struct TileFetcher {
    client: reqwest::Client,
    server: TileServer,
    limiter: Arc<RateLimiter>,
    blank_on_error: bool,
}

impl TileFetcher {
    pub fn new(server: TileServer, blank_on_error: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(server.user_agent())
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;
        let limiter = Arc::new(RateLimiter::new(server.min_interval()));
        Ok(Self {
            client,
            server,
            limiter,
            blank_on_error,
        })
    }

    pub const fn server(&self) -> &TileServer {
        &self.server
    }

    /// Fetch and decode one tile.
    ///
    /// With `blank_on_error` a failed fetch or decode yields [`blank_tile`]
    /// instead of a produce error.
    pub async fn fetch(&self, tile: Tile) -> Result<RgbImage> {
        self.limiter.acquire().await;
        match self.try_fetch(tile).await {
            Ok(image) => Ok(image),
            Err(err) if self.blank_on_error => {
                tracing::warn!(x = tile.x, y = tile.y, z = tile.z, error = %err, "Tile fetch failed, using blank tile");
                Ok(blank_tile())
            }
            Err(err) => Err(err),
        }
    }

    async fn try_fetch(&self, tile: Tile) -> Result<RgbImage> {
        let url = self.server.url(tile);
        let bytes = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::produce(format!("Failed to fetch {url}: {e}")))?
            .bytes()
            .await
            .map_err(|e| Error::produce(format!("Failed to read {url}: {e}")))?;

        tokio::task::spawn_blocking(move || {
            image::load_from_memory(&bytes)
                .map(|decoded| decoded.to_rgb8())
                .map_err(|e| Error::produce(format!("Failed to decode tile: {e}")))
        })
        .await
        .map_err(|e| Error::produce(format!("Tile decode task failed: {e}")))?
    }
}
