use thiserror::Error;

use crate::config::training_config::{DetectorTrainingConfig, PredictorTrainingConfig};
use crate::dataset::domain::dataset::LabeledShape;
use crate::shared::image::Image;
use crate::shared::point::Point;
use crate::shared::rect::{Corners, Rect};

/// Failures raised inside a vision backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("training failed: {0}")]
    Training(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid model data: {0}")]
    Format(String),
}

impl BackendError {
    /// The message without its category prefix.
    pub fn message(&self) -> &str {
        match self {
            BackendError::Training(m) | BackendError::Inference(m) | BackendError::Format(m) => m,
        }
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Feature extraction, optimisation and inference for both model kinds.
///
/// Weight types are opaque to callers: they are produced by training or
/// decoding, consumed by inference, and never inspected. Every call is
/// synchronous; a backend may parallelise internally but returns only
/// once the work is complete.
pub trait VisionBackend: Send + Sync {
    type DetectorWeights: Clone + Send + Sync;
    type PredictorWeights: Clone + Send + Sync;

    /// Trains a sliding-window detector. `boxes[i]` annotates `images[i]`.
    fn train_detector(
        &self,
        images: &[Image],
        boxes: &[Vec<Rect>],
        config: &DetectorTrainingConfig,
    ) -> BackendResult<Self::DetectorWeights>;

    /// Trains a landmark shape predictor. `shapes[i]` annotates `images[i]`.
    fn train_shape_predictor(
        &self,
        images: &[Image],
        shapes: &[Vec<LabeledShape>],
        config: &PredictorTrainingConfig,
    ) -> BackendResult<Self::PredictorWeights>;

    /// Runs a detector; `None` selects the backend's generic default weights.
    /// Rectangles come back in the backend's native order.
    fn run_detector(
        &self,
        weights: Option<&Self::DetectorWeights>,
        image: &Image,
    ) -> BackendResult<Vec<Rect>>;

    /// Predicts landmarks inside `region`, in part-index order.
    fn run_predictor(
        &self,
        weights: &Self::PredictorWeights,
        image: &Image,
        region: Corners,
    ) -> BackendResult<Vec<Point>>;

    fn default_detector_weights(&self) -> Self::DetectorWeights;

    fn encode_detector(&self, weights: &Self::DetectorWeights) -> BackendResult<Vec<u8>>;

    fn decode_detector(&self, bytes: &[u8]) -> BackendResult<Self::DetectorWeights>;

    fn encode_predictor(&self, weights: &Self::PredictorWeights) -> BackendResult<Vec<u8>>;

    fn decode_predictor(&self, bytes: &[u8]) -> BackendResult<Self::PredictorWeights>;

    /// Renders the detector's feature template as a grayscale image;
    /// `None` renders the default weights.
    fn render_detector(&self, weights: Option<&Self::DetectorWeights>) -> BackendResult<Image>;
}
