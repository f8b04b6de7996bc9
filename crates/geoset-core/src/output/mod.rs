//! Artifact writers.
//!
//! - [`GeoTiffWriter`]: one georeferenced `.tif` per item
//! - [`ArchiveWriter`]: every record of a run in one `.tar.gz`

pub mod archive;
pub mod tif;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use archive::ArchiveWriter;
pub use tif::GeoTiffWriter;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Per-item GeoTIFF.
    Tif,
    /// Batched tar.gz container.
    Archive,
}

impl OutputFormat {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tif => "tif",
            Self::Archive => "archive",
        }
    }

    pub const fn is_batched(&self) -> bool {
        matches!(self, Self::Archive)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tif" | "tiff" | "geotiff" => Ok(Self::Tif),
            "archive" | "tar.gz" | "tgz" => Ok(Self::Archive),
            other => Err(Error::config(format!(
                "Unsupported output format '{other}' (supported: tif, archive)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Lzw,
    Deflate,
    Packbits,
    None,
}

impl Compression {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lzw => "lzw",
            Self::Deflate => "deflate",
            Self::Packbits => "packbits",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lzw" => Ok(Self::Lzw),
            "deflate" | "zip" => Ok(Self::Deflate),
            "packbits" => Ok(Self::Packbits),
            "none" => Ok(Self::None),
            other => Err(Error::config(format!("Unsupported compression '{other}'"))),
        }
    }
}

/// `<id>_<label>.<ext>` with path separators replaced.
pub fn output_filename(id: &str, label: &str, extension: &str) -> String {
    let stem: String = format!("{id}_{label}")
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    format!("{stem}.{extension}")
}

/// EPSG code from an `EPSG:NNNN` string.
pub fn epsg_code(crs: &str) -> Result<u16> {
    crs.trim()
        .strip_prefix("EPSG:")
        .or_else(|| crs.trim().strip_prefix("epsg:"))
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| Error::config(format!("Unsupported CRS '{crs}': expected EPSG:<code>")))
}
