use std::path::Path;

use crate::shared::image::Image;

/// Decodes an image file into a grayscale [`Image`].
pub trait ImageReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Image, Box<dyn std::error::Error + Send + Sync>>;
}
