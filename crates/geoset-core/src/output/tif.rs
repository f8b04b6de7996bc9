//! Per-item GeoTIFF writer.

use std::{
    io::{Cursor, Seek, Write},
    path::{Path, PathBuf},
};

use image::RgbImage;
use tiff::{
    encoder::{
        colortype,
        compression::{Compression as TiffCompression, Deflate, Lzw, Packbits, Uncompressed},
        TiffEncoder,
    },
    tags::Tag,
};

use super::{epsg_code, output_filename, Compression};
use crate::{
    pipeline::{Artifact, ArtifactWriter, BBox},
    Error, Result,
};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;

const EPSG_WGS84: u16 = 4326;

/// GeoKey directory: header, raster-is-area, then model type and CRS key.
fn geo_keys(epsg: u16) -> [u16; 16] {
    let (model_type, crs_key) = if epsg == EPSG_WGS84 {
        // ModelTypeGeographic, GeographicTypeGeoKey
        (2, 2048)
    } else {
        // ModelTypeProjected, ProjectedCSTypeGeoKey
        (1, 3072)
    };
    [
        1, 1, 0, 3, //
        1024, 0, 1, model_type, //
        1025, 0, 1, 1, //
        crs_key, 0, 1, epsg,
    ]
}

fn encode_with<W: Write + Seek, D: TiffCompression>(
    writer: &mut W,
    image: &RgbImage,
    bbox: BBox,
    epsg: u16,
    compression: D,
) -> tiff::TiffResult<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    let mut tiff = encoder.new_image_with_compression::<colortype::RGB8, D>(
        image.width(),
        image.height(),
        compression,
    )?;

    let scale = [
        bbox.width() / f64::from(image.width()),
        bbox.height() / f64::from(image.height()),
        0.0,
    ];
    let tiepoint = [0.0, 0.0, 0.0, bbox.minx, bbox.maxy, 0.0];
    let keys = geo_keys(epsg);

    let directory = tiff.encoder();
    directory.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])?;
    directory.write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])?;
    directory.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &keys[..])?;

    tiff.write_data(image.as_raw())
}

/// Encode an RGB image as a GeoTIFF in memory.
pub fn encode_geotiff(
    image: &RgbImage,
    bbox: BBox,
    epsg: u16,
    compression: Compression,
) -> Result<Vec<u8>> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::write("Cannot encode an empty image"));
    }
    let mut buffer = Cursor::new(Vec::new());
    match compression {
        Compression::Lzw => encode_with(&mut buffer, image, bbox, epsg, Lzw),
        Compression::Deflate => encode_with(&mut buffer, image, bbox, epsg, Deflate::default()),
        Compression::Packbits => encode_with(&mut buffer, image, bbox, epsg, Packbits),
        Compression::None => encode_with(&mut buffer, image, bbox, epsg, Uncompressed),
    }
    .map_err(|e| Error::write(format!("Failed to encode GeoTIFF: {e}")))?;
    Ok(buffer.into_inner())
}

/// Sibling `<path>.tmp` the encoded bytes land in before the rename.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes `<dir>/<id>_<label>.tif`. Distinct items never share a path, so
/// concurrent workers can share one writer.
#[derive(Debug, Clone)]
pub struct GeoTiffWriter {
    dir: PathBuf,
    crs: String,
    epsg: u16,
    compression: Compression,
}

impl GeoTiffWriter {
    pub fn new(dir: &Path, crs: &str, compression: Compression) -> Result<Self> {
        let epsg = epsg_code(crs)?;
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::io(format!("Failed to create {}: {e}", dir.display())))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            crs: crs.to_string(),
            epsg,
            compression,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }
}

#[async_trait::async_trait]
impl ArtifactWriter for GeoTiffWriter {
    async fn write(&self, artifact: &Artifact, id: &str, label: &str) -> Result<PathBuf> {
        let path = self.dir.join(output_filename(id, label, "tif"));
        let image = artifact.image.clone();
        let bbox = artifact.metadata.bbox;
        let (epsg, compression) = (self.epsg, self.compression);

        let bytes =
            tokio::task::spawn_blocking(move || encode_geotiff(&image, bbox, epsg, compression))
                .await
                .map_err(|e| Error::write(format!("GeoTIFF encode task failed: {e}")))??;

        // Consumers only ever see a complete file under the final name.
        let tmp = temp_path(&path);
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| Error::write(format!("Failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| {
                Error::write(format!("Failed to move {} into place: {e}", path.display()))
            })?;
        tracing::debug!(path = %path.display(), "Wrote GeoTIFF");
        Ok(path)
    }
}
