use crate::backend::domain::vision_backend::VisionBackend;
use crate::dataset::domain::dataset_loader::DatasetLoader;
use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::domain::image_writer::ImageWriter;

/// Collaborators shared by every model a factory creates.
pub struct ModelContext<B: VisionBackend> {
    pub(crate) backend: B,
    pub(crate) dataset_loader: Box<dyn DatasetLoader>,
    pub(crate) image_reader: Box<dyn ImageReader>,
    pub(crate) image_writer: Box<dyn ImageWriter>,
}

impl<B: VisionBackend> ModelContext<B> {
    pub fn new(
        backend: B,
        dataset_loader: Box<dyn DatasetLoader>,
        image_reader: Box<dyn ImageReader>,
        image_writer: Box<dyn ImageWriter>,
    ) -> Self {
        Self {
            backend,
            dataset_loader,
            image_reader,
            image_writer,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
