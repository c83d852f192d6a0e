use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};
use tracing::debug;

use crate::error::{CatalogError, Result};

/// File extensions accepted as source images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Whether the path carries one of [`IMAGE_EXTENSIONS`].
pub fn is_image_path<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Regular files in `dir` with an image extension, sorted by path.
pub fn image_paths<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir)
        .map_err(|e| CatalogError::Input(format!("Cannot list {:?}: {}", dir, e)))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| CatalogError::Input(format!("Cannot list {:?}: {}", dir, e)))?
            .path();
        if path.is_file() && is_image_path(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Decode a source image as RGB, shrinking it so its longest side is at most
/// `max_size` when given.
pub fn load_source_image<P: AsRef<Path>>(path: P, max_size: Option<u32>) -> Result<DynamicImage> {
    let path = path.as_ref();
    let img = ImageReader::open(path)
        .map_err(|e| CatalogError::Input(format!("Cannot open source image {:?}: {}", path, e)))?
        .with_guessed_format()
        .map_err(|e| CatalogError::Input(format!("Cannot read source image {:?}: {}", path, e)))?
        .decode()
        .map_err(|e| CatalogError::Input(format!("Failed to decode image {:?}: {}", path, e)))?;

    let img = DynamicImage::ImageRgb8(img.to_rgb8());

    match max_size {
        Some(max) if img.width().max(img.height()) > max => {
            let resized = img.thumbnail(max, max);
            debug!(
                "Resized {:?} from {}x{} to {}x{}",
                path,
                img.width(),
                img.height(),
                resized.width(),
                resized.height()
            );
            Ok(resized)
        }
        _ => Ok(img),
    }
}
