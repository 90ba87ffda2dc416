use std::path::Path;
use std::sync::Arc;

use crate::backend::domain::vision_backend::VisionBackend;
use crate::backend::infrastructure::hog_svm_backend::HogSvmBackend;
use crate::config::option_bag::OptionBag;
use crate::dataset::domain::dataset_loader::DatasetLoader;
use crate::dataset::infrastructure::imglab_loader::ImglabDatasetLoader;
use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::domain::image_writer::ImageWriter;
use crate::imaging::infrastructure::image_file_reader::ImageFileReader;
use crate::imaging::infrastructure::image_file_writer::ImageFileWriter;
use crate::lifecycle::detector::Detector;
use crate::lifecycle::model::Model;
use crate::lifecycle::model_context::ModelContext;
use crate::lifecycle::predictor::Predictor;
use crate::shared::error::Result;
use crate::shared::model_kind::ModelKind;

/// Creates, loads and trains models that share one backend and one set of
/// I/O adapters. Build it once and pass it to every call site.
pub struct ModelFactory<B: VisionBackend> {
    context: Arc<ModelContext<B>>,
}

impl<B: VisionBackend> ModelFactory<B> {
    pub fn new(
        backend: B,
        dataset_loader: Box<dyn DatasetLoader>,
        image_reader: Box<dyn ImageReader>,
        image_writer: Box<dyn ImageWriter>,
    ) -> Self {
        Self::from_context(Arc::new(ModelContext::new(
            backend,
            dataset_loader,
            image_reader,
            image_writer,
        )))
    }

    pub fn from_context(context: Arc<ModelContext<B>>) -> Self {
        Self { context }
    }

    pub fn backend(&self) -> &B {
        self.context.backend()
    }

    /// A default detector, or one loaded from `source` when given.
    pub fn create_detector(&self, source: Option<&Path>) -> Result<Detector<B>> {
        match source {
            Some(path) => Detector::load(self.context.clone(), path),
            None => Ok(Detector::new(self.context.clone())),
        }
    }

    /// An untrained predictor, or one loaded from `source` when given.
    pub fn create_predictor(&self, source: Option<&Path>) -> Result<Predictor<B>> {
        match source {
            Some(path) => Predictor::load(self.context.clone(), path),
            None => Ok(Predictor::new(self.context.clone())),
        }
    }

    pub fn create(&self, kind: ModelKind, source: Option<&Path>) -> Result<Model<B>> {
        match kind {
            ModelKind::Detector => self.create_detector(source).map(Model::Detector),
            ModelKind::Predictor => self.create_predictor(source).map(Model::Predictor),
        }
    }

    /// Trains a new detector and returns it once training has finished.
    pub fn train_detector(&self, dataset: &Path, options: Option<&OptionBag>) -> Result<Detector<B>> {
        let mut detector = Detector::new(self.context.clone());
        detector.train(dataset, options)?;
        Ok(detector)
    }

    /// Trains a new shape predictor and returns it once training has finished.
    pub fn train_predictor(
        &self,
        dataset: &Path,
        options: Option<&OptionBag>,
    ) -> Result<Predictor<B>> {
        let mut predictor = Predictor::new(self.context.clone());
        predictor.train(dataset, options)?;
        Ok(predictor)
    }
}

impl ModelFactory<HogSvmBackend> {
    /// Factory wired to the HOG/SVM backend, imglab XML datasets and
    /// image files on disk.
    pub fn with_reference_backend() -> Self {
        Self::new(
            HogSvmBackend::default(),
            Box::new(ImglabDatasetLoader::default()),
            Box::new(ImageFileReader),
            Box::new(ImageFileWriter),
        )
    }
}
