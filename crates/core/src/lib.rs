//! Trainable object detectors and landmark shape predictors.
//!
//! [`ModelFactory`](lifecycle::model_factory::ModelFactory) is the entry
//! point: it creates, loads and trains models against a
//! [`VisionBackend`](backend::domain::vision_backend::VisionBackend).

pub mod backend;
pub mod config;
pub mod dataset;
pub mod imaging;
pub mod inference;
pub mod lifecycle;
pub mod serialization;
pub mod shared;
