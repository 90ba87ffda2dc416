//! Recording stubs shared by the lifecycle tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::backend::domain::vision_backend::{BackendError, BackendResult, VisionBackend};
use crate::config::training_config::{DetectorTrainingConfig, PredictorTrainingConfig};
use crate::dataset::domain::dataset::{DetectionDataset, LabeledShape, ShapeDataset};
use crate::dataset::domain::dataset_loader::DatasetLoader;
use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::domain::image_writer::ImageWriter;
use crate::lifecycle::model_context::ModelContext;
use crate::shared::error::{Error, Result};
use crate::shared::image::Image;
use crate::shared::point::Point;
use crate::shared::rect::{Corners, Rect};

pub type Calls = Arc<Mutex<Vec<String>>>;

// ── Backend ──

pub struct StubBackend {
    pub calls: Calls,
    pub train_error: Option<BackendError>,
    pub detections: Vec<Rect>,
    pub landmarks: Vec<Point>,
    pub detector_configs: Arc<Mutex<Vec<DetectorTrainingConfig>>>,
    pub predictor_configs: Arc<Mutex<Vec<PredictorTrainingConfig>>>,
    pub trained_image_counts: Arc<Mutex<Vec<usize>>>,
    pub regions: Arc<Mutex<Vec<Corners>>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            train_error: None,
            detections: vec![Rect::new(1, 2, 3, 4)],
            landmarks: vec![Point::new(25.0, 40.0)],
            detector_configs: Arc::new(Mutex::new(Vec::new())),
            predictor_configs: Arc::new(Mutex::new(Vec::new())),
            trained_image_counts: Arc::new(Mutex::new(Vec::new())),
            regions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            train_error: Some(BackendError::Training(message.to_string())),
            ..Self::new()
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl VisionBackend for StubBackend {
    type DetectorWeights = String;
    type PredictorWeights = String;

    fn train_detector(
        &self,
        images: &[Image],
        _boxes: &[Vec<Rect>],
        config: &DetectorTrainingConfig,
    ) -> BackendResult<String> {
        self.record("train_detector".into());
        self.trained_image_counts.lock().unwrap().push(images.len());
        self.detector_configs.lock().unwrap().push(config.clone());
        match &self.train_error {
            Some(e) => Err(e.clone()),
            None => Ok(format!("detector:{}", images.len())),
        }
    }

    fn train_shape_predictor(
        &self,
        images: &[Image],
        _shapes: &[Vec<LabeledShape>],
        config: &PredictorTrainingConfig,
    ) -> BackendResult<String> {
        self.record("train_shape_predictor".into());
        self.trained_image_counts.lock().unwrap().push(images.len());
        self.predictor_configs.lock().unwrap().push(config.clone());
        match &self.train_error {
            Some(e) => Err(e.clone()),
            None => Ok(format!("predictor:{}", images.len())),
        }
    }

    fn run_detector(&self, weights: Option<&String>, _image: &Image) -> BackendResult<Vec<Rect>> {
        let label = weights.cloned().unwrap_or_else(|| "default".into());
        self.record(format!("run_detector:{label}"));
        Ok(self.detections.clone())
    }

    fn run_predictor(
        &self,
        weights: &String,
        _image: &Image,
        region: Corners,
    ) -> BackendResult<Vec<Point>> {
        self.record(format!("run_predictor:{weights}"));
        self.regions.lock().unwrap().push(region);
        Ok(self.landmarks.clone())
    }

    fn default_detector_weights(&self) -> String {
        self.record("default_detector_weights".into());
        "default".into()
    }

    fn encode_detector(&self, weights: &String) -> BackendResult<Vec<u8>> {
        Ok(weights.as_bytes().to_vec())
    }

    fn decode_detector(&self, bytes: &[u8]) -> BackendResult<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| BackendError::Format(e.to_string()))
    }

    fn encode_predictor(&self, weights: &String) -> BackendResult<Vec<u8>> {
        Ok(weights.as_bytes().to_vec())
    }

    fn decode_predictor(&self, bytes: &[u8]) -> BackendResult<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| BackendError::Format(e.to_string()))
    }

    fn render_detector(&self, weights: Option<&String>) -> BackendResult<Image> {
        let label = weights.cloned().unwrap_or_else(|| "default".into());
        self.record(format!("render_detector:{label}"));
        Ok(Image::from_fn(4, 4, |_, _| 255))
    }
}

// ── Dataset loader ──

pub struct StubDatasetLoader {
    pub loads: Calls,
    pub images: usize,
}

impl StubDatasetLoader {
    pub fn new(images: usize) -> Self {
        Self {
            loads: Arc::new(Mutex::new(Vec::new())),
            images,
        }
    }
}

impl DatasetLoader for StubDatasetLoader {
    fn load_boxes(&self, descriptor: &Path) -> Result<DetectionDataset> {
        self.loads
            .lock()
            .unwrap()
            .push(descriptor.display().to_string());
        if descriptor.to_string_lossy().contains("missing") {
            return Err(Error::dataset_load(descriptor, "no such file"));
        }
        let mut ds = DetectionDataset::empty();
        for _ in 0..self.images {
            ds.push(test_image(), vec![Rect::new(10, 10, 40, 40)]);
        }
        Ok(ds)
    }

    fn load_shapes(&self, descriptor: &Path) -> Result<ShapeDataset> {
        self.loads
            .lock()
            .unwrap()
            .push(descriptor.display().to_string());
        if descriptor.to_string_lossy().contains("missing") {
            return Err(Error::dataset_load(descriptor, "no such file"));
        }
        let mut ds = ShapeDataset::empty();
        for _ in 0..self.images {
            ds.push(
                test_image(),
                vec![LabeledShape::new(
                    Rect::new(10, 10, 40, 40),
                    vec![Point::new(20.0, 20.0)],
                )],
            );
        }
        Ok(ds)
    }
}

// ── Image I/O ──

/// Decodes every path to a 100x200 image, except paths containing
/// "corrupt", which fail.
pub struct StubImageReader {
    pub reads: Arc<Mutex<Vec<PathBuf>>>,
}

impl StubImageReader {
    pub fn new() -> Self {
        Self {
            reads: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ImageReader for StubImageReader {
    fn read(&self, path: &Path) -> std::result::Result<Image, Box<dyn std::error::Error + Send + Sync>> {
        self.reads.lock().unwrap().push(path.to_path_buf());
        if path.to_string_lossy().contains("corrupt") {
            return Err("unsupported image format".into());
        }
        Ok(test_image())
    }
}

pub struct StubImageWriter {
    pub written: Arc<Mutex<Vec<(PathBuf, Image)>>>,
}

impl StubImageWriter {
    pub fn new() -> Self {
        Self {
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ImageWriter for StubImageWriter {
    fn write(
        &self,
        path: &Path,
        image: &Image,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.written
            .lock()
            .unwrap()
            .push((path.to_path_buf(), image.clone()));
        Ok(())
    }
}

// ── Harness ──

pub fn test_image() -> Image {
    Image::from_fn(100, 200, |x, _| x as u8)
}

/// A context wired with fresh stubs plus handles onto their recorders.
pub struct Harness {
    pub context: Arc<ModelContext<StubBackend>>,
    pub backend_calls: Calls,
    pub loads: Calls,
    pub reads: Arc<Mutex<Vec<PathBuf>>>,
    pub written: Arc<Mutex<Vec<(PathBuf, Image)>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_backend(StubBackend::new())
    }

    pub fn with_backend(backend: StubBackend) -> Self {
        let loader = StubDatasetLoader::new(3);
        let reader = StubImageReader::new();
        let writer = StubImageWriter::new();
        let backend_calls = backend.calls.clone();
        let loads = loader.loads.clone();
        let reads = reader.reads.clone();
        let written = writer.written.clone();
        Self {
            context: Arc::new(ModelContext::new(
                backend,
                Box::new(loader),
                Box::new(reader),
                Box::new(writer),
            )),
            backend_calls,
            loads,
            reads,
            written,
        }
    }

    pub fn backend_calls(&self) -> Vec<String> {
        self.backend_calls.lock().unwrap().clone()
    }

    pub fn backend(&self) -> &StubBackend {
        self.context.backend()
    }
}
