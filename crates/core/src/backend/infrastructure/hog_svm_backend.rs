use super::hog_detector::{self, HogDetectorWeights};
use super::shape_model::ShapeModel;
use super::{shape_trainer, svm_trainer, template_renderer};
use crate::backend::domain::vision_backend::{BackendError, BackendResult, VisionBackend};
use crate::config::training_config::{DetectorTrainingConfig, PredictorTrainingConfig};
use crate::dataset::domain::dataset::LabeledShape;
use crate::shared::image::Image;
use crate::shared::point::Point;
use crate::shared::rect::{Corners, Rect};

/// Reference backend: HOG windows scored by a linear SVM for detection,
/// and a regression-tree cascade for landmarks. Weights serialise with
/// bincode.
pub struct HogSvmBackend {
    default_weights: HogDetectorWeights,
}

impl HogSvmBackend {
    pub fn new() -> Self {
        Self {
            default_weights: HogDetectorWeights::default_template(),
        }
    }
}

impl Default for HogSvmBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl VisionBackend for HogSvmBackend {
    type DetectorWeights = HogDetectorWeights;
    type PredictorWeights = ShapeModel;

    fn train_detector(
        &self,
        images: &[Image],
        boxes: &[Vec<Rect>],
        config: &DetectorTrainingConfig,
    ) -> BackendResult<HogDetectorWeights> {
        svm_trainer::train_detector(images, boxes, config)
    }

    fn train_shape_predictor(
        &self,
        images: &[Image],
        shapes: &[Vec<LabeledShape>],
        config: &PredictorTrainingConfig,
    ) -> BackendResult<ShapeModel> {
        shape_trainer::train_shape_model(images, shapes, config)
    }

    fn run_detector(
        &self,
        weights: Option<&HogDetectorWeights>,
        image: &Image,
    ) -> BackendResult<Vec<Rect>> {
        let weights = weights.unwrap_or(&self.default_weights);
        if !weights.is_consistent() {
            return Err(BackendError::Inference(
                "detector weights do not match their window size".into(),
            ));
        }
        Ok(hog_detector::detect(weights, image))
    }

    fn run_predictor(
        &self,
        weights: &ShapeModel,
        image: &Image,
        region: Corners,
    ) -> BackendResult<Vec<Point>> {
        if weights.num_parts() == 0 {
            return Err(BackendError::Inference("shape model has no parts".into()));
        }
        Ok(weights.predict(image, region))
    }

    fn default_detector_weights(&self) -> HogDetectorWeights {
        self.default_weights.clone()
    }

    fn encode_detector(&self, weights: &HogDetectorWeights) -> BackendResult<Vec<u8>> {
        bincode::serialize(weights).map_err(|e| BackendError::Format(e.to_string()))
    }

    fn decode_detector(&self, bytes: &[u8]) -> BackendResult<HogDetectorWeights> {
        let weights: HogDetectorWeights =
            bincode::deserialize(bytes).map_err(|e| BackendError::Format(e.to_string()))?;
        if !weights.is_consistent() {
            return Err(BackendError::Format(format!(
                "expected {} detector weights, found {}",
                weights.feature_len(),
                weights.weights.len()
            )));
        }
        Ok(weights)
    }

    fn encode_predictor(&self, weights: &ShapeModel) -> BackendResult<Vec<u8>> {
        bincode::serialize(weights).map_err(|e| BackendError::Format(e.to_string()))
    }

    fn decode_predictor(&self, bytes: &[u8]) -> BackendResult<ShapeModel> {
        let model: ShapeModel =
            bincode::deserialize(bytes).map_err(|e| BackendError::Format(e.to_string()))?;
        validate_shape_model(&model)?;
        Ok(model)
    }

    fn render_detector(&self, weights: Option<&HogDetectorWeights>) -> BackendResult<Image> {
        Ok(template_renderer::render(
            weights.unwrap_or(&self.default_weights),
        ))
    }
}

/// Rejects decoded models whose trees or pools index out of range.
fn validate_shape_model(model: &ShapeModel) -> BackendResult<()> {
    use super::regression_tree::TreeNode;

    if model.mean_shape.is_empty() || model.mean_shape.len() % 2 != 0 {
        return Err(BackendError::Format("mean shape is malformed".into()));
    }
    let parts = model.num_parts() as u32;
    for level in &model.levels {
        let pool = level.pool.len() as u32;
        if level.pool.iter().any(|p| p.anchor >= parts) {
            return Err(BackendError::Format("feature anchor out of range".into()));
        }
        for tree in &level.trees {
            let nodes = tree.nodes.len() as u32;
            if nodes == 0 {
                return Err(BackendError::Format("empty regression tree".into()));
            }
            for node in &tree.nodes {
                let valid = match node {
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => feature.a < pool && feature.b < pool && *left < nodes && *right < nodes,
                    TreeNode::Leaf { delta } => delta.len() == model.mean_shape.len(),
                };
                if !valid {
                    return Err(BackendError::Format("regression tree is malformed".into()));
                }
            }
        }
    }
    Ok(())
}
