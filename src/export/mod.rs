use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use thiserror::Error;

pub const EXPORT_FILE_NAME: &str = "meme.png";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to encode png: {0}")]
    Encode(#[from] image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// Lossless PNG bytes for a rendered surface.
pub fn encode_png(raster: &RgbaImage) -> ExportResult<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    raster.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

/// Writes exports under a fixed file name, replacing the previous one.
#[derive(Debug, Clone)]
pub struct ExportService {
    output_dir: PathBuf,
}

impl ExportService {
    pub fn with_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Exports into the working directory when no directory is configured.
    pub fn with_default_dir(configured: Option<&Path>) -> ExportResult<Self> {
        match configured {
            Some(dir) => Ok(Self::with_dir(dir)),
            None => Ok(Self::with_dir(std::env::current_dir()?)),
        }
    }

    pub fn target_path(&self) -> PathBuf {
        self.output_dir.join(EXPORT_FILE_NAME)
    }

    pub fn save(&self, raster: &RgbaImage) -> ExportResult<PathBuf> {
        let bytes = encode_png(raster)?;
        let target = self.target_path();
        save_overwrite(&bytes, &target)?;
        tracing::info!(
            path = %target.display(),
            width = raster.width(),
            height = raster.height(),
            "exported meme"
        );
        Ok(target)
    }
}

fn save_overwrite(bytes: &[u8], destination: &Path) -> ExportResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(destination, bytes)?;
    Ok(())
}
