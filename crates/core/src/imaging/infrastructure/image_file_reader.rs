use std::path::Path;

use crate::imaging::domain::image_reader::ImageReader;
use crate::shared::image::Image;

/// Decodes image files with the `image` crate and converts them to 8-bit
/// luminance, the pixel format both trainers consume.
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Image, Box<dyn std::error::Error + Send + Sync>> {
        let luma = image::open(path)?.to_luma8();
        let (width, height) = luma.dimensions();
        Ok(Image::try_new(luma.into_raw(), width, height)?)
    }
}
