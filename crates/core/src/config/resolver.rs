//! Maps a sparse [`OptionBag`] onto a complete, validated training config.
//!
//! Resolution is a pure function of its input: absent or `null` keys take
//! the documented default, unknown keys are ignored, and numeric-like
//! values are coerced once here so the trainers only ever see typed fields.

use serde_json::Value;

use super::option_bag::{type_name, OptionBag};
use super::training_config::{CompleteConfig, DetectorTrainingConfig, PredictorTrainingConfig};
use crate::shared::error::{Error, Result};
use crate::shared::model_kind::ModelKind;

const WINDOW_SIZE_KEYS: &[&str] = &["detectionWindowSize", "windowSize"];
const C_KEYS: &[&str] = &["regularizationC", "c"];
const EPSILON_KEYS: &[&str] = &["convergenceEpsilon", "epsilon"];
const THREAD_KEYS: &[&str] = &["threadCount", "numThreads"];
const VERBOSE_KEYS: &[&str] = &["verbose"];

const CASCADE_DEPTH_KEYS: &[&str] = &["cascadeDepth"];
const OVERSAMPLING_KEYS: &[&str] = &["oversamplingAmount"];
const NU_KEYS: &[&str] = &["regularizationNu", "nu"];
const TREE_DEPTH_KEYS: &[&str] = &["treeDepth"];
const TREES_PER_LEVEL_KEYS: &[&str] = &["treesPerCascadeLevel"];
const MIRROR_KEYS: &[&str] = &["includeMirrorFlips", "includeMirrors"];

pub fn resolve(kind: ModelKind, options: &OptionBag) -> Result<CompleteConfig> {
    match kind {
        ModelKind::Detector => resolve_detector(options).map(CompleteConfig::Detector),
        ModelKind::Predictor => resolve_predictor(options).map(CompleteConfig::Predictor),
    }
}

pub fn resolve_detector(options: &OptionBag) -> Result<DetectorTrainingConfig> {
    let defaults = DetectorTrainingConfig::default();
    Ok(DetectorTrainingConfig {
        detection_window_size: count_or(options, WINDOW_SIZE_KEYS, defaults.detection_window_size)?,
        regularization_c: float_or(options, C_KEYS, defaults.regularization_c)?,
        convergence_epsilon: float_or(options, EPSILON_KEYS, defaults.convergence_epsilon)?,
        thread_count: count_or(options, THREAD_KEYS, defaults.thread_count)?,
        verbose: flag_or(options, VERBOSE_KEYS, defaults.verbose),
        include_mirror_flips: true,
    })
}

pub fn resolve_predictor(options: &OptionBag) -> Result<PredictorTrainingConfig> {
    let defaults = PredictorTrainingConfig::default();
    Ok(PredictorTrainingConfig {
        cascade_depth: count_or(options, CASCADE_DEPTH_KEYS, defaults.cascade_depth)?,
        oversampling_amount: count_or(options, OVERSAMPLING_KEYS, defaults.oversampling_amount)?,
        regularization_nu: float_or(options, NU_KEYS, defaults.regularization_nu)?,
        tree_depth: count_or(options, TREE_DEPTH_KEYS, defaults.tree_depth)?,
        trees_per_cascade_level: count_or(
            options,
            TREES_PER_LEVEL_KEYS,
            defaults.trees_per_cascade_level,
        )?,
        include_mirror_flips: flag_or(options, MIRROR_KEYS, defaults.include_mirror_flips),
        verbose: flag_or(options, VERBOSE_KEYS, defaults.verbose),
    })
}

fn float_or(options: &OptionBag, keys: &[&str], default: f64) -> Result<f64> {
    match options.lookup(keys) {
        Some((key, value)) => coerce_number(key, value),
        None => Ok(default),
    }
}

fn count_or(options: &OptionBag, keys: &[&str], default: u32) -> Result<u32> {
    match options.lookup(keys) {
        Some((key, value)) => coerce_count(key, value),
        None => Ok(default),
    }
}

fn flag_or(options: &OptionBag, keys: &[&str], default: bool) -> bool {
    options
        .lookup(keys)
        .map_or(default, |(_, value)| is_truthy(value))
}

/// Numeric-like values: numbers, numeric strings, and booleans (true = 1).
fn coerce_number(key: &str, value: &Value) -> Result<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        Error::invalid_config(key, format!("expected a number, got {}", type_name(value)))
    })?;

    if !number.is_finite() {
        return Err(Error::invalid_config(key, "must be finite"));
    }
    Ok(number)
}

/// Counts truncate toward zero and must not be negative.
fn coerce_count(key: &str, value: &Value) -> Result<u32> {
    let number = coerce_number(key, value)?;
    if number < 0.0 {
        return Err(Error::invalid_config(
            key,
            format!("must not be negative, got {number}"),
        ));
    }
    let truncated = number.trunc();
    if truncated > u32::MAX as f64 {
        return Err(Error::invalid_config(
            key,
            format!("is too large, got {number}"),
        ));
    }
    Ok(truncated as u32)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
