use std::path::Path;
use std::sync::Arc;

use crate::backend::domain::vision_backend::VisionBackend;
use crate::config::option_bag::OptionBag;
use crate::config::resolver::resolve_detector;
use crate::config::training_config::DetectorTrainingConfig;
use crate::dataset::domain::augmentation::add_mirror_flips;
use crate::lifecycle::model_context::ModelContext;
use crate::lifecycle::weight_slot::{DetectorState, WeightSlot};
use crate::serialization::model_file;
use crate::shared::error::{Error, Result};
use crate::shared::image::Image;
use crate::shared::model_kind::ModelKind;
use crate::shared::rect::Rect;

/// A sliding-window object detector.
///
/// A fresh detector holds no weights and runs the backend's default
/// detector until it is trained or loaded.
pub struct Detector<B: VisionBackend> {
    context: Arc<ModelContext<B>>,
    slot: WeightSlot<B::DetectorWeights>,
}

impl<B: VisionBackend> Detector<B> {
    pub(crate) fn new(context: Arc<ModelContext<B>>) -> Self {
        Self {
            context,
            slot: WeightSlot::Empty,
        }
    }

    pub(crate) fn load(context: Arc<ModelContext<B>>, path: &Path) -> Result<Self> {
        let payload = model_file::read(path, ModelKind::Detector)?;
        let weights = context
            .backend
            .decode_detector(&payload)
            .map_err(|e| Error::deserialization(path, e.message()))?;
        log::info!("Loaded detector from {}", path.display());
        Ok(Self {
            context,
            slot: WeightSlot::Loaded(weights),
        })
    }

    pub fn state(&self) -> DetectorState {
        self.slot.detector_state()
    }

    /// Trains on the annotated dataset at `dataset` and replaces the current
    /// weights. Mirror flips are always added to detector training data.
    ///
    /// On failure the detector keeps its previous weights and state.
    pub fn train(&mut self, dataset: &Path, options: Option<&OptionBag>) -> Result<()> {
        let config = resolve_detector(options.unwrap_or(&OptionBag::new()))?;
        log_config(&config);

        let dataset = self.context.dataset_loader.load_boxes(dataset)?;
        let dataset = add_mirror_flips(dataset);
        if config.verbose {
            log::info!("Total samples: {}", dataset.len());
        }

        let (images, boxes) = dataset.into_parts();
        let weights = self
            .context
            .backend
            .train_detector(&images, &boxes, &config)
            .map_err(|e| Error::Training(e.message().to_string()))?;

        self.slot = WeightSlot::Trained(weights);
        log::info!("Detector trained on {} images", images.len());
        Ok(())
    }

    /// Decodes the image at `path` and returns the detected rectangles.
    pub fn detect(&self, path: &Path) -> Result<Vec<Rect>> {
        let image = self
            .context
            .image_reader
            .read(path)
            .map_err(|e| Error::Inference(format!("cannot decode image {}: {e}", path.display())))?;
        self.detect_image(&image)
    }

    pub fn detect_image(&self, image: &Image) -> Result<Vec<Rect>> {
        let weights = self.slot.weights();
        if weights.is_none() {
            log::debug!("Using default detector weights");
        }
        self.context
            .backend
            .run_detector(weights, image)
            .map_err(|e| Error::Inference(e.message().to_string()))
    }

    /// Saves the current weights, or the default weights when untrained.
    pub fn save(&self, path: &Path) -> Result<()> {
        let backend = &self.context.backend;
        let payload = match self.slot.weights() {
            Some(weights) => backend.encode_detector(weights),
            None => backend.encode_detector(&backend.default_detector_weights()),
        }
        .map_err(|e| Error::serialization(path, e.message()))?;
        model_file::write(path, ModelKind::Detector, &payload)
    }

    /// Renders the feature template to an image file at `path`.
    pub fn save_visualization(&self, path: &Path) -> Result<()> {
        let image = self
            .context
            .backend
            .render_detector(self.slot.weights())
            .map_err(|e| Error::serialization(path, e.message()))?;
        self.context
            .image_writer
            .write(path, &image)
            .map_err(|e| Error::serialization(path, e))?;
        log::debug!("Saved detector visualization to {}", path.display());
        Ok(())
    }
}

fn log_config(config: &DetectorTrainingConfig) {
    if !config.verbose {
        return;
    }
    log::info!("Detection window size set to {}", config.detection_window_size);
    log::info!("C set to {}", config.regularization_c);
    log::info!("Epsilon set to {}", config.convergence_epsilon);
    log::info!("Threads set to {}", config.thread_count);
}
