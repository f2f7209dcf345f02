//! Writing displayed band images to disk.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use band_viewer::DecodedImage;
use image::ImageOutputFormat;

/// `<dir>/<stem>_band<N>.png`
pub fn band_path(dir: &Path, source: &Path, band: u32) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("raster");
    dir.join(format!("{}_band{}.png", stem, band))
}

/// Encode `image` as PNG and write it to `path`.
pub async fn write_png(image: &DecodedImage, path: &Path) -> Result<u64> {
    let mut buf = Cursor::new(Vec::new());
    image
        .image
        .write_to(&mut buf, ImageOutputFormat::Png)
        .context("Failed to encode band image as PNG")?;
    let data = buf.into_inner();
    tokio::fs::write(path, &data)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(data.len() as u64)
}
