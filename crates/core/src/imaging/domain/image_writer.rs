use std::path::Path;

use crate::shared::image::Image;

/// Writes a grayscale [`Image`] to an image file.
pub trait ImageWriter: Send + Sync {
    fn write(&self, path: &Path, image: &Image)
        -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
