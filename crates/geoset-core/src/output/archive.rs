//! Batched tar.gz container writer.
//!
//! One `<modality>.tar.gz` per run holding, for every record, a PNG raster and
//! a JSON sidecar with the item and its geographic metadata, plus a
//! `manifest.json` describing the run.

use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use flate2::{write::GzEncoder, Compression as GzLevel};
use image::{ImageFormat, RgbImage};
use serde::Serialize;

use super::output_filename;
use crate::{
    pipeline::{Artifact, ArtifactMetadata, BatchWriter, WorkItem},
    Error, Result,
};

pub const MANIFEST_NAME: &str = "manifest.json";

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    modality_name: &'a str,
    num_records: usize,
    records: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RecordSidecar<'a> {
    id: &'a str,
    label: &'a str,
    width: u32,
    height: u32,
    #[serde(flatten)]
    metadata: &'a ArtifactMetadata,
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| Error::write(format!("Failed to encode PNG: {e}")))?;
    Ok(buffer.into_inner())
}

/// Stream named entries into a gzip'd tarball at `path`.
fn write_tarball(path: &Path, entries: &[(String, Vec<u8>)]) -> Result<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| Error::write(format!("Failed to create {}: {e}", path.display())))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, GzLevel::default()));
    let mtime = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();

    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(mtime);
        header.set_cksum();
        builder
            .append_data(&mut header, name, data.as_slice())
            .map_err(|e| Error::write(format!("Failed to append {name}: {e}")))?;
    }

    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .map_err(|e| Error::write(format!("Failed to finish {}: {e}", path.display())))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    dir: PathBuf,
    modality_name: String,
}

impl ArchiveWriter {
    pub fn new(dir: &Path, modality_name: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::io(format!("Failed to create {}: {e}", dir.display())))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            modality_name: modality_name.to_string(),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.tar.gz", self.modality_name))
    }
}

#[async_trait::async_trait]
impl BatchWriter for ArchiveWriter {
    async fn write_all(&self, records: &[(WorkItem, Artifact)]) -> Result<PathBuf> {
        if records.is_empty() {
            return Err(Error::write("No records to write"));
        }

        let mut entries = Vec::with_capacity(records.len() * 2 + 1);
        let mut names = Vec::with_capacity(records.len());
        for (item, artifact) in records {
            let image = artifact.image.clone();
            let png = tokio::task::spawn_blocking(move || encode_png(&image))
                .await
                .map_err(|e| Error::write(format!("PNG encode task failed: {e}")))??;

            let sidecar = RecordSidecar {
                id: &item.id,
                label: &item.label,
                width: artifact.width(),
                height: artifact.height(),
                metadata: &artifact.metadata,
            };
            let json = serde_json::to_vec_pretty(&sidecar)?;

            let png_name = output_filename(&item.id, &item.label, "png");
            entries.push((png_name.clone(), png));
            entries.push((output_filename(&item.id, &item.label, "json"), json));
            names.push(png_name);
        }

        let manifest = Manifest {
            modality_name: &self.modality_name,
            num_records: records.len(),
            records: names,
        };
        entries.push((MANIFEST_NAME.to_string(), serde_json::to_vec_pretty(&manifest)?));

        let path = self.path();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_tarball(&target, &entries))
            .await
            .map_err(|e| Error::write(format!("Archive task failed: {e}")))??;

        tracing::info!(path = %path.display(), records = records.len(), "Wrote archive");
        Ok(path)
    }
}
