pub mod hog_detector;
pub mod hog_features;
pub mod hog_svm_backend;
pub mod regression_tree;
pub mod shape_model;
pub mod shape_trainer;
pub mod svm_trainer;
pub mod template_renderer;
