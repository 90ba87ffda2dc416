use std::path::Path;

use super::dataset::{DetectionDataset, ShapeDataset};
use crate::shared::error::Result;

/// Loads an annotated image collection from a dataset descriptor.
///
/// Implementations fail with `DatasetLoad` when the descriptor is missing
/// or malformed, or when a referenced image cannot be read.
pub trait DatasetLoader: Send + Sync {
    /// Loads per-image bounding boxes for detector training.
    fn load_boxes(&self, descriptor: &Path) -> Result<DetectionDataset>;

    /// Loads per-image landmark shapes for shape predictor training.
    fn load_shapes(&self, descriptor: &Path) -> Result<ShapeDataset>;
}
