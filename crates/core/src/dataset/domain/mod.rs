pub mod augmentation;
pub mod dataset;
pub mod dataset_loader;
