use std::path::Path;
use std::sync::Arc;

use crate::backend::domain::vision_backend::VisionBackend;
use crate::config::option_bag::OptionBag;
use crate::config::resolver::resolve_predictor;
use crate::config::training_config::PredictorTrainingConfig;
use crate::dataset::domain::augmentation::augment;
use crate::inference::normalizer::normalize;
use crate::lifecycle::model_context::ModelContext;
use crate::lifecycle::weight_slot::{PredictorState, WeightSlot};
use crate::serialization::model_file;
use crate::shared::error::{Error, Result};
use crate::shared::image::Image;
use crate::shared::model_kind::ModelKind;
use crate::shared::point::LandmarkPoint;
use crate::shared::rect::Rect;

/// A landmark shape predictor. Untrained predictors cannot infer or save.
pub struct Predictor<B: VisionBackend> {
    context: Arc<ModelContext<B>>,
    slot: WeightSlot<B::PredictorWeights>,
}

impl<B: VisionBackend> Predictor<B> {
    pub(crate) fn new(context: Arc<ModelContext<B>>) -> Self {
        Self {
            context,
            slot: WeightSlot::Empty,
        }
    }

    pub(crate) fn load(context: Arc<ModelContext<B>>, path: &Path) -> Result<Self> {
        let payload = model_file::read(path, ModelKind::Predictor)?;
        let weights = context
            .backend
            .decode_predictor(&payload)
            .map_err(|e| Error::deserialization(path, e.message()))?;
        log::info!("Loaded shape predictor from {}", path.display());
        Ok(Self {
            context,
            slot: WeightSlot::Loaded(weights),
        })
    }

    pub fn state(&self) -> PredictorState {
        self.slot.predictor_state()
    }

    /// Trains on the annotated dataset at `dataset`, mirroring it first when
    /// `includeMirrorFlips` is set. On failure the previous weights remain.
    pub fn train(&mut self, dataset: &Path, options: Option<&OptionBag>) -> Result<()> {
        let config = resolve_predictor(options.unwrap_or(&OptionBag::new()))?;
        log_config(&config);

        let dataset = self.context.dataset_loader.load_shapes(dataset)?;
        let dataset = augment(dataset, config.include_mirror_flips);
        if config.verbose {
            log::info!("Total samples: {}", dataset.len());
        }

        let (images, shapes) = dataset.into_parts();
        let weights = self
            .context
            .backend
            .train_shape_predictor(&images, &shapes, &config)
            .map_err(|e| Error::Training(e.message().to_string()))?;

        self.slot = WeightSlot::Trained(weights);
        log::info!("Shape predictor trained on {} images", images.len());
        Ok(())
    }

    /// Predicts landmarks inside `region` of the image at `path`.
    ///
    /// State and region, including whether its edges fit in `i32`, are
    /// checked before the image is decoded.
    pub fn predict_shape(&self, path: &Path, region: &Rect) -> Result<Vec<LandmarkPoint>> {
        if self.slot.weights().is_none() {
            return Err(Error::NotTrained {
                operation: "predictShape",
            });
        }
        region.checked_corners()?;

        let image = self
            .context
            .image_reader
            .read(path)
            .map_err(|e| Error::Inference(format!("cannot decode image {}: {e}", path.display())))?;
        self.predict_shape_in_image(&image, region)
    }

    pub fn predict_shape_in_image(&self, image: &Image, region: &Rect) -> Result<Vec<LandmarkPoint>> {
        let weights = self.slot.weights().ok_or(Error::NotTrained {
            operation: "predictShape",
        })?;
        let corners = region.checked_corners()?;

        let points = self
            .context
            .backend
            .run_predictor(weights, image, corners)
            .map_err(|e| Error::Inference(e.message().to_string()))?;
        normalize(&points, image.width(), image.height())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let weights = self.slot.weights().ok_or(Error::NotTrained {
            operation: "savePredictor",
        })?;
        let payload = self
            .context
            .backend
            .encode_predictor(weights)
            .map_err(|e| Error::serialization(path, e.message()))?;
        model_file::write(path, ModelKind::Predictor, &payload)
    }
}

fn log_config(config: &PredictorTrainingConfig) {
    if !config.verbose {
        return;
    }
    log::info!("Cascade depth set to {}", config.cascade_depth);
    log::info!("Trees per cascade level set to {}", config.trees_per_cascade_level);
    log::info!("Tree depth set to {}", config.tree_depth);
    log::info!("Oversampling amount set to {}", config.oversampling_amount);
    log::info!("Nu set to {}", config.regularization_nu);
    log::info!(
        "Mirrors: {}",
        if config.include_mirror_flips { "on" } else { "off" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::test_support::{Harness, StubBackend};
    use crate::shared::rect::Corners;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn trained(harness: &Harness) -> Predictor<StubBackend> {
        let mut predictor = Predictor::new(harness.context.clone());
        predictor.train(Path::new("shapes.xml"), None).unwrap();
        predictor
    }

    #[test]
    fn test_fresh_predictor_is_untrained() {
        let harness = Harness::new();
        let predictor = Predictor::new(harness.context.clone());
        assert_eq!(predictor.state(), PredictorState::Untrained);
    }

    #[test]
    fn test_predict_on_untrained_fails_before_decoding() {
        let harness = Harness::new();
        let predictor = Predictor::new(harness.context.clone());

        let result = predictor.predict_shape(Path::new("test.jpg"), &Rect::new(10, 10, 50, 50));

        match result {
            Err(Error::NotTrained { operation }) => assert_eq!(operation, "predictShape"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(harness.reads.lock().unwrap().is_empty());
        assert!(harness.backend_calls().is_empty());
    }

    #[rstest]
    #[case(Rect::new(0, 0, -1, 10))]
    #[case(Rect::new(0, 0, 10, -1))]
    #[case(Rect::new(i32::MAX - 5, 0, 10, 10))]
    #[case(Rect::new(0, i32::MAX, 10, 1))]
    fn test_invalid_region_is_rejected_without_backend(#[case] region: Rect) {
        let harness = Harness::new();
        let predictor = trained(&harness);
        let calls_before = harness.backend_calls().len();

        let result = predictor.predict_shape(Path::new("test.jpg"), &region);

        assert!(matches!(result, Err(Error::InvalidRegion { .. })));
        assert_eq!(harness.backend_calls().len(), calls_before);
        assert!(harness.reads.lock().unwrap().is_empty());
    }

    #[test]
    fn test_predict_passes_corners_and_normalizes() {
        let harness = Harness::new();
        let predictor = trained(&harness);

        let points = predictor
            .predict_shape(Path::new("test.jpg"), &Rect::new(10, 20, 30, 40))
            .unwrap();

        assert_eq!(
            *harness.backend().regions.lock().unwrap(),
            vec![Corners {
                left: 10,
                top: 20,
                right: 40,
                bottom: 60
            }]
        );
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].x, 25.0);
        assert_relative_eq!(points[0].x_scaled, 0.25);
        assert_relative_eq!(points[0].y_scaled, 0.2);
    }

    #[test]
    fn test_zero_width_region_is_accepted() {
        let harness = Harness::new();
        let predictor = trained(&harness);
        let result = predictor.predict_shape(Path::new("test.jpg"), &Rect::new(5, 5, 0, 0));
        assert!(result.is_ok());
    }

    #[test]
    fn test_predict_undecodable_image_is_inference_error() {
        let harness = Harness::new();
        let predictor = trained(&harness);
        let result = predictor.predict_shape(Path::new("corrupt.png"), &Rect::new(0, 0, 5, 5));
        assert!(matches!(result, Err(Error::Inference(_))));
    }

    #[rstest]
    #[case(None, 3)]
    #[case(Some(false), 3)]
    #[case(Some(true), 6)]
    fn test_mirroring_follows_option(#[case] mirrors: Option<bool>, #[case] expected: usize) {
        let harness = Harness::new();
        let mut predictor = Predictor::new(harness.context.clone());
        let mut options = OptionBag::new();
        if let Some(flag) = mirrors {
            options.set("includeMirrorFlips", flag);
        }

        predictor
            .train(Path::new("shapes.xml"), Some(&options))
            .unwrap();

        assert_eq!(
            *harness.backend().trained_image_counts.lock().unwrap(),
            vec![expected]
        );
    }

    #[test]
    fn test_invalid_config_fails_before_loading_dataset() {
        let harness = Harness::new();
        let mut predictor = Predictor::new(harness.context.clone());
        let options = OptionBag::new().with("cascadeDepth", -3);

        let result = predictor.train(Path::new("shapes.xml"), Some(&options));

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
        assert!(harness.loads.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_train_leaves_untrained() {
        let harness = Harness::with_backend(StubBackend::failing("empty dataset"));
        let mut predictor = Predictor::new(harness.context.clone());

        let result = predictor.train(Path::new("shapes.xml"), None);

        assert!(matches!(result, Err(Error::Training(_))));
        assert_eq!(predictor.state(), PredictorState::Untrained);
    }

    #[test]
    fn test_save_untrained_is_not_trained_error() {
        let harness = Harness::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sp.model");
        let predictor = Predictor::new(harness.context.clone());

        let result = predictor.save(&path);

        match result {
            Err(Error::NotTrained { operation }) => assert_eq!(operation, "savePredictor"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_save_then_load_restores_weights() {
        let harness = Harness::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sp.model");
        trained(&harness).save(&path).unwrap();

        let loaded = Predictor::load(harness.context.clone(), &path).unwrap();
        assert_eq!(loaded.state(), PredictorState::LoadedFromFile);

        loaded
            .predict_shape(Path::new("test.jpg"), &Rect::new(0, 0, 10, 10))
            .unwrap();
        assert_eq!(
            harness.backend_calls().last().map(String::as_str),
            Some("run_predictor:predictor:3")
        );
    }

    #[test]
    fn test_loading_detector_file_as_predictor_fails() {
        let harness = Harness::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detector.model");
        model_file::write(&path, ModelKind::Detector, b"detector:6").unwrap();

        let result = Predictor::load(harness.context.clone(), &path);

        assert!(matches!(result, Err(Error::Deserialization { .. })));
    }
}
