use serde::Serialize;

use crate::shared::model_kind::ModelKind;

pub const DEFAULT_DETECTION_WINDOW_SIZE: u32 = 80;
pub const DEFAULT_REGULARIZATION_C: f64 = 1.0;
pub const DEFAULT_CONVERGENCE_EPSILON: f64 = 0.01;
pub const DEFAULT_THREAD_COUNT: u32 = 4;

pub const DEFAULT_CASCADE_DEPTH: u32 = 10;
pub const DEFAULT_OVERSAMPLING_AMOUNT: u32 = 20;
pub const DEFAULT_REGULARIZATION_NU: f64 = 0.1;
pub const DEFAULT_TREE_DEPTH: u32 = 5;
pub const DEFAULT_TREES_PER_CASCADE_LEVEL: u32 = 500;

/// Complete hyperparameters for sliding-window detector training.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorTrainingConfig {
    /// Side of the square detection window, in pixels.
    pub detection_window_size: u32,
    pub regularization_c: f64,
    pub convergence_epsilon: f64,
    pub thread_count: u32,
    pub verbose: bool,
    /// Always true: detector training adds mirrored samples unconditionally.
    pub include_mirror_flips: bool,
}

impl Default for DetectorTrainingConfig {
    fn default() -> Self {
        Self {
            detection_window_size: DEFAULT_DETECTION_WINDOW_SIZE,
            regularization_c: DEFAULT_REGULARIZATION_C,
            convergence_epsilon: DEFAULT_CONVERGENCE_EPSILON,
            thread_count: DEFAULT_THREAD_COUNT,
            verbose: true,
            include_mirror_flips: true,
        }
    }
}

/// Complete hyperparameters for regression-tree cascade training.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictorTrainingConfig {
    pub cascade_depth: u32,
    pub oversampling_amount: u32,
    pub regularization_nu: f64,
    pub tree_depth: u32,
    pub trees_per_cascade_level: u32,
    pub include_mirror_flips: bool,
    pub verbose: bool,
}

impl Default for PredictorTrainingConfig {
    fn default() -> Self {
        Self {
            cascade_depth: DEFAULT_CASCADE_DEPTH,
            oversampling_amount: DEFAULT_OVERSAMPLING_AMOUNT,
            regularization_nu: DEFAULT_REGULARIZATION_NU,
            tree_depth: DEFAULT_TREE_DEPTH,
            trees_per_cascade_level: DEFAULT_TREES_PER_CASCADE_LEVEL,
            include_mirror_flips: false,
            verbose: true,
        }
    }
}

/// A resolved configuration for either model kind.
#[derive(Clone, Debug, PartialEq)]
pub enum CompleteConfig {
    Detector(DetectorTrainingConfig),
    Predictor(PredictorTrainingConfig),
}

impl CompleteConfig {
    pub fn kind(&self) -> ModelKind {
        match self {
            CompleteConfig::Detector(_) => ModelKind::Detector,
            CompleteConfig::Predictor(_) => ModelKind::Predictor,
        }
    }

    pub fn include_mirror_flips(&self) -> bool {
        match self {
            CompleteConfig::Detector(c) => c.include_mirror_flips,
            CompleteConfig::Predictor(c) => c.include_mirror_flips,
        }
    }

    pub fn verbose(&self) -> bool {
        match self {
            CompleteConfig::Detector(c) => c.verbose,
            CompleteConfig::Predictor(c) => c.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_defaults() {
        let c = DetectorTrainingConfig::default();
        assert_eq!(c.detection_window_size, 80);
        assert_eq!(c.regularization_c, 1.0);
        assert_eq!(c.convergence_epsilon, 0.01);
        assert_eq!(c.thread_count, 4);
        assert!(c.verbose);
        assert!(c.include_mirror_flips);
    }

    #[test]
    fn test_predictor_defaults() {
        let c = PredictorTrainingConfig::default();
        assert_eq!(c.cascade_depth, 10);
        assert_eq!(c.oversampling_amount, 20);
        assert_eq!(c.regularization_nu, 0.1);
        assert_eq!(c.tree_depth, 5);
        assert_eq!(c.trees_per_cascade_level, 500);
        assert!(!c.include_mirror_flips);
        assert!(c.verbose);
    }

    #[test]
    fn test_complete_config_accessors() {
        let c = CompleteConfig::Predictor(PredictorTrainingConfig::default());
        assert_eq!(c.kind(), ModelKind::Predictor);
        assert!(!c.include_mirror_flips());
        let c = CompleteConfig::Detector(DetectorTrainingConfig::default());
        assert_eq!(c.kind(), ModelKind::Detector);
        assert!(c.include_mirror_flips());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(PredictorTrainingConfig::default()).unwrap();
        assert_eq!(json["treesPerCascadeLevel"], 500);
        assert_eq!(json["regularizationNu"], 0.1);
    }
}
