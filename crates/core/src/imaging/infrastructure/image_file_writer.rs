use std::path::Path;

use crate::imaging::domain::image_writer::ImageWriter;
use crate::shared::image::Image;

/// Writes grayscale images with the `image` crate; the format follows the
/// path's extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        image: &Image,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let buffer = image::GrayImage::from_raw(image.width(), image.height(), image.data().to_vec())
            .ok_or("Failed to create image from pixel data")?;
        buffer.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let image = Image::from_fn(30, 20, |x, _| (x * 8) as u8);
        ImageFileWriter::new().write(&path, &image).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let image = Image::from_fn(16, 12, |x, y| (x * 10 + y) as u8);
        ImageFileWriter::new().write(&path, &image).unwrap();

        let back = image::open(&path).unwrap().to_luma8();
        assert_eq!(back.dimensions(), (16, 12));
        assert_eq!(back.into_raw(), image.data());
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.png");
        ImageFileWriter::new()
            .write(&path, &Image::from_fn(4, 4, |_, _| 7))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_unknown_extension_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.unknown");
        assert!(ImageFileWriter::new()
            .write(&path, &Image::from_fn(4, 4, |_, _| 7))
            .is_err());
    }
}
