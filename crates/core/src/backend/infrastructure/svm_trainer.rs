use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::hog_detector::{
    object_cells_for, pyramid, window_object_rect, window_positions, HogDetectorWeights,
};
use super::hog_features::{dot, HogGrid, CELL_SIZE};
use crate::backend::domain::vision_backend::{BackendError, BackendResult};
use crate::config::training_config::DetectorTrainingConfig;
use crate::shared::image::Image;
use crate::shared::rect::{Rect, DEFAULT_IOU_THRESHOLD};

const SEED: u64 = 0xd37e_c70e;
const NEGATIVES_PER_IMAGE: usize = 40;
const MAX_EPOCHS: usize = 200;

/// Positive and negative window descriptors mined from one image.
#[derive(Debug, Default)]
struct ImageSamples {
    positives: Vec<Vec<f32>>,
    negatives: Vec<Vec<f32>>,
}

/// Trains a linear HOG window classifier on annotated boxes and sampled
/// background windows.
pub fn train_detector(
    images: &[Image],
    boxes: &[Vec<Rect>],
    config: &DetectorTrainingConfig,
) -> BackendResult<HogDetectorWeights> {
    validate(images, boxes)?;
    let object_cells = object_cells_for(config.detection_window_size);

    let log_level = if config.verbose {
        log::Level::Info
    } else {
        log::Level::Debug
    };

    let per_image = extract_samples(images, boxes, object_cells, config.thread_count)?;
    let mut features: Vec<Vec<f32>> = Vec::new();
    let mut labels: Vec<f32> = Vec::new();
    for samples in per_image {
        for f in samples.positives {
            features.push(f);
            labels.push(1.0);
        }
        for f in samples.negatives {
            features.push(f);
            labels.push(-1.0);
        }
    }
    let positives = labels.iter().filter(|&&l| l > 0.0).count();
    log::log!(
        log_level,
        "Extracted {} positive and {} negative windows ({}x{} cells)",
        positives,
        labels.len() - positives,
        object_cells + 2,
        object_cells + 2
    );
    if positives == labels.len() {
        return Err(BackendError::Training(
            "could not sample any background windows; images are too small for the detection window"
                .into(),
        ));
    }

    let (weights, bias) = solve_dual(&features, &labels, config, log_level);
    Ok(HogDetectorWeights {
        object_cells,
        weights,
        bias,
    })
}

fn validate(images: &[Image], boxes: &[Vec<Rect>]) -> BackendResult<()> {
    if images.is_empty() {
        return Err(BackendError::Training("the dataset contains no images".into()));
    }
    if images.len() != boxes.len() {
        return Err(BackendError::Training(format!(
            "{} images but {} box sets",
            images.len(),
            boxes.len()
        )));
    }
    if boxes.iter().all(Vec::is_empty) {
        return Err(BackendError::Training(
            "the dataset contains no annotated objects".into(),
        ));
    }
    for rect in boxes.iter().flatten() {
        if rect.width < CELL_SIZE as i32 || rect.height < CELL_SIZE as i32 {
            return Err(BackendError::Training(format!(
                "box {}x{} at ({}, {}) is smaller than one {CELL_SIZE}x{CELL_SIZE} cell",
                rect.width, rect.height, rect.left, rect.top
            )));
        }
    }
    Ok(())
}

// ── Sample extraction ──

/// Spreads per-image extraction over `thread_count` scoped workers and
/// returns results in image order.
fn extract_samples(
    images: &[Image],
    boxes: &[Vec<Rect>],
    object_cells: usize,
    thread_count: u32,
) -> BackendResult<Vec<ImageSamples>> {
    let workers = (thread_count.max(1) as usize).min(images.len());
    let (job_tx, job_rx) = crossbeam_channel::unbounded::<usize>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, ImageSamples)>();

    for idx in 0..images.len() {
        job_tx
            .send(idx)
            .map_err(|e| BackendError::Training(e.to_string()))?;
    }
    drop(job_tx);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for idx in job_rx {
                    let samples = image_samples(&images[idx], &boxes[idx], object_cells, idx);
                    if result_tx.send((idx, samples)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut ordered: Vec<Option<ImageSamples>> = (0..images.len()).map(|_| None).collect();
    for (idx, samples) in result_rx {
        ordered[idx] = Some(samples);
    }
    ordered
        .into_iter()
        .map(|s| s.ok_or_else(|| BackendError::Training("a feature worker exited early".into())))
        .collect()
}

fn image_samples(image: &Image, boxes: &[Rect], object_cells: usize, idx: usize) -> ImageSamples {
    let window_cells = object_cells + 2;
    let mut samples = ImageSamples::default();

    for rect in boxes {
        samples
            .positives
            .push(positive_window(image, rect, object_cells));
    }

    let mut candidates: Vec<(usize, usize, usize)> = Vec::new();
    let levels = pyramid(image, window_cells);
    for (level_idx, level) in levels.iter().enumerate() {
        for (row, col) in window_positions(&level.grid, window_cells) {
            let rect = window_object_rect(row, col, object_cells, level.scale);
            if boxes.iter().all(|b| b.iou(&rect) <= DEFAULT_IOU_THRESHOLD) {
                candidates.push((level_idx, row, col));
            }
        }
    }

    let mut rng = StdRng::seed_from_u64(SEED ^ idx as u64);
    candidates.shuffle(&mut rng);
    for (level_idx, row, col) in candidates.into_iter().take(NEGATIVES_PER_IMAGE) {
        samples
            .negatives
            .push(levels[level_idx].grid.window(row, col, window_cells));
    }
    samples
}

/// Descriptor of `rect` plus its context ring, resampled to the window.
fn positive_window(image: &Image, rect: &Rect, object_cells: usize) -> Vec<f32> {
    let window_cells = object_cells + 2;
    let window_px = (window_cells * CELL_SIZE) as u32;
    let cell_w = rect.width as f32 / object_cells as f32;
    let cell_h = rect.height as f32 / object_cells as f32;

    let crop = image.crop_resized(
        rect.left as f32 - cell_w,
        rect.top as f32 - cell_h,
        cell_w * window_cells as f32,
        cell_h * window_cells as f32,
        window_px,
        window_px,
    );
    HogGrid::compute(&crop).window(0, 0, window_cells)
}

// ── Optimisation ──

/// Dual coordinate descent for the L1-loss linear SVM with the bias
/// folded in as a constant feature. Stops once the spread of projected
/// gradients falls below the configured epsilon.
fn solve_dual(
    features: &[Vec<f32>],
    labels: &[f32],
    config: &DetectorTrainingConfig,
    log_level: log::Level,
) -> (Vec<f32>, f32) {
    let n = features.len();
    let dims = features.first().map(Vec::len).unwrap_or(0);
    let c = config.regularization_c as f32;
    let epsilon = config.convergence_epsilon as f32;

    let diag: Vec<f32> = features.iter().map(|x| dot(x, x) + 1.0).collect();
    let mut alpha = vec![0.0f32; n];
    let mut w = vec![0.0f32; dims];
    let mut b = 0.0f32;
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(SEED);

    for epoch in 0..MAX_EPOCHS {
        order.shuffle(&mut rng);
        let mut max_pg = f32::MIN;
        let mut min_pg = f32::MAX;

        for &i in &order {
            let y = labels[i];
            let gradient = y * (dot(&features[i], &w) + b) - 1.0;
            let projected = if alpha[i] <= 0.0 {
                gradient.min(0.0)
            } else if alpha[i] >= c {
                gradient.max(0.0)
            } else {
                gradient
            };
            max_pg = max_pg.max(projected);
            min_pg = min_pg.min(projected);

            if projected != 0.0 {
                let updated = (alpha[i] - gradient / diag[i]).clamp(0.0, c);
                let step = (updated - alpha[i]) * y;
                alpha[i] = updated;
                for (v, x) in w.iter_mut().zip(&features[i]) {
                    *v += step * x;
                }
                b += step;
            }
        }

        let gap = max_pg - min_pg;
        log::log!(
            log_level,
            "epoch {}: objective {:.6}, gap {:.6}",
            epoch + 1,
            primal_objective(features, labels, &w, b, c),
            gap
        );
        if gap < epsilon {
            break;
        }
    }

    (w, b)
}

/// `||w||^2 / 2 + C * sum(hinge)` over the augmented weight vector.
fn primal_objective(features: &[Vec<f32>], labels: &[f32], w: &[f32], b: f32, c: f32) -> f32 {
    let norm_sq: f32 = w.iter().map(|v| v * v).sum::<f32>() + b * b;
    let hinge: f32 = features
        .iter()
        .zip(labels)
        .map(|(x, y)| (1.0 - y * (dot(x, w) + b)).max(0.0))
        .sum();
    norm_sq / 2.0 + c * hinge
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::infrastructure::hog_detector::{detect, feature_len};

    fn config(window: u32, threads: u32) -> DetectorTrainingConfig {
        DetectorTrainingConfig {
            detection_window_size: window,
            thread_count: threads,
            verbose: false,
            ..DetectorTrainingConfig::default()
        }
    }

    fn square_image(object: Rect) -> Image {
        Image::from_fn(96, 96, |x, y| {
            let (x, y) = (x as i32, y as i32);
            if x >= object.left && x < object.right() && y >= object.top && y < object.bottom() {
                255
            } else {
                0
            }
        })
    }

    fn squares_dataset() -> (Vec<Image>, Vec<Vec<Rect>>) {
        let objects = [
            Rect::new(8, 8, 40, 40),
            Rect::new(48, 16, 40, 40),
            Rect::new(24, 48, 40, 40),
            Rect::new(40, 40, 40, 40),
        ];
        let images = objects.iter().map(|r| square_image(*r)).collect();
        let boxes = objects.iter().map(|r| vec![*r]).collect();
        (images, boxes)
    }

    #[test]
    fn test_trained_detector_finds_training_objects() {
        let (images, boxes) = squares_dataset();
        let weights = train_detector(&images, &boxes, &config(40, 2)).unwrap();

        assert_eq!(weights.object_cells, 5);
        assert!(weights.is_consistent());
        let found = detect(&weights, &images[0]);
        assert!(!found.is_empty());
        assert!(found.iter().all(|r| r.width > 0 && r.height > 0));
    }

    #[test]
    fn test_thread_count_does_not_change_result() {
        let (images, boxes) = squares_dataset();
        let single = train_detector(&images, &boxes, &config(40, 1)).unwrap();
        let many = train_detector(&images, &boxes, &config(40, 4)).unwrap();
        assert_eq!(single, many);
    }

    #[test]
    fn test_positive_window_has_expected_length() {
        let image = square_image(Rect::new(8, 8, 40, 40));
        let features = positive_window(&image, &Rect::new(8, 8, 40, 40), 5);
        assert_eq!(features.len(), feature_len(5));
    }

    #[test]
    fn test_negatives_avoid_annotations() {
        let object = Rect::new(24, 24, 40, 40);
        let samples = image_samples(&square_image(object), &[object], 5, 0);
        assert_eq!(samples.positives.len(), 1);
        assert!(!samples.negatives.is_empty());
        assert!(samples.negatives.len() <= NEGATIVES_PER_IMAGE);
    }

    #[test]
    fn test_empty_dataset_fails() {
        assert!(matches!(
            train_detector(&[], &[], &config(40, 1)),
            Err(BackendError::Training(_))
        ));
    }

    #[test]
    fn test_dataset_without_boxes_fails() {
        let images = vec![Image::from_fn(64, 64, |_, _| 0)];
        assert!(train_detector(&images, &[vec![]], &config(40, 1)).is_err());
    }

    #[test]
    fn test_box_smaller_than_a_cell_fails() {
        let images = vec![Image::from_fn(64, 64, |_, _| 0)];
        let boxes = vec![vec![Rect::new(4, 4, 6, 20)]];
        match train_detector(&images, &boxes, &config(40, 1)) {
            Err(BackendError::Training(msg)) => assert!(msg.contains("smaller than one")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_count_mismatch_fails() {
        let images = vec![Image::from_fn(64, 64, |_, _| 0)];
        assert!(train_detector(&images, &[], &config(40, 1)).is_err());
    }
}
