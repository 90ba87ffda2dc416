use crate::shared::error::{Error, Result};
use crate::shared::point::{LandmarkPoint, Point};

/// Pairs each raw landmark with its image-relative position
/// (`x / image_width`, `y / image_height`). Order is preserved.
///
/// A zero-sized image has no relative coordinates and fails with
/// `InvalidImageDimensions`.
pub fn normalize(points: &[Point], image_width: u32, image_height: u32) -> Result<Vec<LandmarkPoint>> {
    if image_width == 0 || image_height == 0 {
        return Err(Error::InvalidImageDimensions {
            width: image_width,
            height: image_height,
        });
    }

    let width = image_width as f64;
    let height = image_height as f64;
    Ok(points
        .iter()
        .map(|p| LandmarkPoint {
            x: p.x,
            y: p.y,
            x_scaled: p.x / width,
            y_scaled: p.y / height,
        })
        .collect())
}
