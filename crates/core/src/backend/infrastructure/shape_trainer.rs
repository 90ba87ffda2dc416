use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::regression_tree::{CascadeLevel, PoolPoint, RegressionTree, SplitFeature, TreeNode};
use super::shape_model::{add_assign, normalize, sample_pool, ShapeModel};
use crate::backend::domain::vision_backend::{BackendError, BackendResult};
use crate::config::training_config::PredictorTrainingConfig;
use crate::dataset::domain::dataset::LabeledShape;
use crate::shared::image::Image;
use crate::shared::rect::Corners;

const SEED: u64 = 0x5eed_5a9e;
const FEATURE_POOL_SIZE: usize = 400;
const FEATURE_POOL_PADDING: f32 = 0.1;
const SPLIT_CANDIDATES: usize = 20;

struct TrainingObject<'a> {
    image: &'a Image,
    region: Corners,
    target: Vec<f32>,
}

struct Sample {
    object: usize,
    current: Vec<f32>,
    residual: Vec<f32>,
}

/// Fits an ensemble-of-regression-trees cascade to labelled shapes.
pub fn train_shape_model(
    images: &[Image],
    shapes: &[Vec<LabeledShape>],
    config: &PredictorTrainingConfig,
) -> BackendResult<ShapeModel> {
    let objects = collect_objects(images, shapes)?;
    let mean_shape = mean_shape(&objects);
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut samples = initial_samples(&objects, &mean_shape, config.oversampling_amount, &mut rng);

    let log_level = if config.verbose {
        log::Level::Info
    } else {
        log::Level::Debug
    };
    log::log!(
        log_level,
        "Fitting {} cascade levels over {} samples",
        config.cascade_depth,
        samples.len()
    );

    let mut levels = Vec::with_capacity(config.cascade_depth as usize);
    for level_idx in 0..config.cascade_depth {
        let pool = feature_pool(&mean_shape, &mut rng);
        let intensities: Vec<Vec<f32>> = samples
            .iter()
            .map(|s| {
                let object = &objects[s.object];
                sample_pool(object.image, object.region, &s.current, &pool)
            })
            .collect();

        let mut trees = Vec::with_capacity(config.trees_per_cascade_level as usize);
        for _ in 0..config.trees_per_cascade_level {
            let tree = fit_tree(&intensities, &samples, pool.len(), config, &mut rng);
            for (sample, values) in samples.iter_mut().zip(&intensities) {
                let delta = tree.predict(values);
                add_assign(&mut sample.current, delta);
                for (r, d) in sample.residual.iter_mut().zip(delta) {
                    *r -= d;
                }
            }
            trees.push(tree);
        }

        log::log!(
            log_level,
            "Cascade level {}/{}: mean residual {:.5}",
            level_idx + 1,
            config.cascade_depth,
            mean_residual(&samples)
        );
        levels.push(CascadeLevel { pool, trees });
    }

    Ok(ShapeModel { mean_shape, levels })
}

fn collect_objects<'a>(
    images: &'a [Image],
    shapes: &[Vec<LabeledShape>],
) -> BackendResult<Vec<TrainingObject<'a>>> {
    if images.is_empty() {
        return Err(BackendError::Training("the dataset contains no images".into()));
    }
    if images.len() != shapes.len() {
        return Err(BackendError::Training(format!(
            "{} images but {} shape sets",
            images.len(),
            shapes.len()
        )));
    }

    let mut objects = Vec::new();
    let mut part_count: Option<usize> = None;
    for (image, image_shapes) in images.iter().zip(shapes) {
        for shape in image_shapes {
            if shape.parts.is_empty() {
                return Err(BackendError::Training(
                    "every shape must have at least one part".into(),
                ));
            }
            match part_count {
                Some(n) if n != shape.parts.len() => {
                    return Err(BackendError::Training(format!(
                        "all shapes must have the same number of parts: found {n} and {}",
                        shape.parts.len()
                    )));
                }
                _ => part_count = Some(shape.parts.len()),
            }
            if shape.rect.width <= 0 || shape.rect.height <= 0 {
                return Err(BackendError::Training(format!(
                    "shape box {}x{} has no area",
                    shape.rect.width, shape.rect.height
                )));
            }
            objects.push(TrainingObject {
                image,
                region: shape.rect.corners(),
                target: normalize(&shape.parts, &shape.rect),
            });
        }
    }

    if objects.is_empty() {
        return Err(BackendError::Training(
            "the dataset contains no labelled shapes".into(),
        ));
    }
    Ok(objects)
}

fn mean_shape(objects: &[TrainingObject]) -> Vec<f32> {
    let mut mean = vec![0.0; objects[0].target.len()];
    for object in objects {
        add_assign(&mut mean, &object.target);
    }
    let n = objects.len() as f32;
    mean.iter_mut().for_each(|v| *v /= n);
    mean
}

/// `oversampling` starting shapes per object: the mean shape first, then
/// shapes borrowed from other objects.
fn initial_samples(
    objects: &[TrainingObject],
    mean_shape: &[f32],
    oversampling: u32,
    rng: &mut StdRng,
) -> Vec<Sample> {
    let per_object = oversampling.max(1) as usize;
    let mut samples = Vec::with_capacity(objects.len() * per_object);
    for (idx, object) in objects.iter().enumerate() {
        for k in 0..per_object {
            let current = if k == 0 || objects.len() == 1 {
                mean_shape.to_vec()
            } else {
                let mut other = rng.gen_range(0..objects.len() - 1);
                if other >= idx {
                    other += 1;
                }
                objects[other].target.clone()
            };
            let residual = object
                .target
                .iter()
                .zip(&current)
                .map(|(t, c)| t - c)
                .collect();
            samples.push(Sample {
                object: idx,
                current,
                residual,
            });
        }
    }
    samples
}

/// Random pixel locations around the mean shape, each anchored to its
/// nearest landmark.
fn feature_pool(mean_shape: &[f32], rng: &mut StdRng) -> Vec<PoolPoint> {
    let (mut min_u, mut min_v) = (f32::MAX, f32::MAX);
    let (mut max_u, mut max_v) = (f32::MIN, f32::MIN);
    for uv in mean_shape.chunks_exact(2) {
        min_u = min_u.min(uv[0]);
        max_u = max_u.max(uv[0]);
        min_v = min_v.min(uv[1]);
        max_v = max_v.max(uv[1]);
    }
    min_u -= FEATURE_POOL_PADDING;
    min_v -= FEATURE_POOL_PADDING;
    max_u += FEATURE_POOL_PADDING;
    max_v += FEATURE_POOL_PADDING;

    (0..FEATURE_POOL_SIZE)
        .map(|_| {
            let u = min_u + rng.gen::<f32>() * (max_u - min_u);
            let v = min_v + rng.gen::<f32>() * (max_v - min_v);
            let anchor = nearest_part(mean_shape, u, v);
            PoolPoint {
                anchor: anchor as u32,
                dx: u - mean_shape[2 * anchor],
                dy: v - mean_shape[2 * anchor + 1],
            }
        })
        .collect()
}

fn nearest_part(shape: &[f32], u: f32, v: f32) -> usize {
    shape
        .chunks_exact(2)
        .enumerate()
        .map(|(i, p)| (i, (p[0] - u).powi(2) + (p[1] - v).powi(2)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

// ── Tree fitting ──

fn fit_tree(
    intensities: &[Vec<f32>],
    samples: &[Sample],
    pool_size: usize,
    config: &PredictorTrainingConfig,
    rng: &mut StdRng,
) -> RegressionTree {
    let mut nodes = Vec::new();
    let all: Vec<usize> = (0..samples.len()).collect();
    grow(
        &mut nodes,
        all,
        config.tree_depth,
        intensities,
        samples,
        pool_size,
        config.regularization_nu as f32,
        rng,
    );
    RegressionTree::new(nodes)
}

#[allow(clippy::too_many_arguments)]
fn grow(
    nodes: &mut Vec<TreeNode>,
    indices: Vec<usize>,
    depth_left: u32,
    intensities: &[Vec<f32>],
    samples: &[Sample],
    pool_size: usize,
    nu: f32,
    rng: &mut StdRng,
) -> u32 {
    let node_idx = nodes.len();
    let dims = samples[0].residual.len();

    if depth_left == 0 {
        let mut delta = residual_sum(&indices, samples, dims);
        if !indices.is_empty() {
            let scale = nu / indices.len() as f32;
            delta.iter_mut().for_each(|d| *d *= scale);
        }
        nodes.push(TreeNode::Leaf { delta });
        return node_idx as u32;
    }

    nodes.push(TreeNode::Leaf { delta: Vec::new() });
    let (feature, threshold) = best_split(&indices, intensities, samples, pool_size, rng);
    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| feature.value(&intensities[i]) > threshold);

    let left = grow(
        nodes,
        left,
        depth_left - 1,
        intensities,
        samples,
        pool_size,
        nu,
        rng,
    );
    let right = grow(
        nodes,
        right,
        depth_left - 1,
        intensities,
        samples,
        pool_size,
        nu,
        rng,
    );
    nodes[node_idx] = TreeNode::Split {
        feature,
        threshold,
        left,
        right,
    };
    node_idx as u32
}

/// Picks the best of `SPLIT_CANDIDATES` random splits by the reduction in
/// squared residual error.
fn best_split(
    indices: &[usize],
    intensities: &[Vec<f32>],
    samples: &[Sample],
    pool_size: usize,
    rng: &mut StdRng,
) -> (SplitFeature, f32) {
    let dims = samples[0].residual.len();
    let total = residual_sum(indices, samples, dims);

    let mut best = (random_feature(pool_size, rng), 0.0);
    let mut best_score = f32::MIN;
    for _ in 0..SPLIT_CANDIDATES {
        let feature = random_feature(pool_size, rng);
        let threshold = (rng.gen::<f32>() * 256.0 - 128.0) / 2.0;

        let mut left_sum = vec![0.0f32; dims];
        let mut left_count = 0usize;
        for &i in indices {
            if feature.value(&intensities[i]) > threshold {
                add_assign(&mut left_sum, &samples[i].residual);
                left_count += 1;
            }
        }
        let right_count = indices.len() - left_count;

        let mut score = 0.0;
        if left_count > 0 {
            score += squared_norm(&left_sum) / left_count as f32;
        }
        if right_count > 0 {
            let right_norm: f32 = total
                .iter()
                .zip(&left_sum)
                .map(|(t, l)| (t - l) * (t - l))
                .sum();
            score += right_norm / right_count as f32;
        }

        if score > best_score {
            best_score = score;
            best = (feature, threshold);
        }
    }
    best
}

fn random_feature(pool_size: usize, rng: &mut StdRng) -> SplitFeature {
    let a = rng.gen_range(0..pool_size);
    let mut b = rng.gen_range(0..pool_size);
    if pool_size > 1 && a == b {
        b = (b + 1) % pool_size;
    }
    SplitFeature {
        a: a as u32,
        b: b as u32,
    }
}

fn residual_sum(indices: &[usize], samples: &[Sample], dims: usize) -> Vec<f32> {
    let mut sum = vec![0.0; dims];
    for &i in indices {
        add_assign(&mut sum, &samples[i].residual);
    }
    sum
}

fn squared_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum()
}

fn mean_residual(samples: &[Sample]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let total: f32 = samples.iter().map(|s| squared_norm(&s.residual).sqrt()).sum();
    total / samples.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::point::Point;
    use crate::shared::rect::Rect;

    fn small_config() -> PredictorTrainingConfig {
        PredictorTrainingConfig {
            cascade_depth: 3,
            oversampling_amount: 4,
            regularization_nu: 0.1,
            tree_depth: 2,
            trees_per_cascade_level: 10,
            include_mirror_flips: false,
            verbose: false,
        }
    }

    /// A bright dot whose position inside the box varies per image; the
    /// single landmark sits on the dot.
    fn dot_dataset() -> (Vec<Image>, Vec<Vec<LabeledShape>>) {
        let mut images = Vec::new();
        let mut shapes = Vec::new();
        for i in 0..6u32 {
            let cx = 20 + i * 4;
            let cy = 24 + (i % 3) * 3;
            images.push(Image::from_fn(64, 64, move |x, y| {
                let dx = x as i32 - cx as i32;
                let dy = y as i32 - cy as i32;
                if dx * dx + dy * dy <= 9 {
                    255
                } else {
                    0
                }
            }));
            shapes.push(vec![LabeledShape::new(
                Rect::new(8, 8, 48, 48),
                vec![Point::new(cx as f64, cy as f64)],
            )]);
        }
        (images, shapes)
    }

    #[test]
    fn test_training_produces_requested_structure() {
        let (images, shapes) = dot_dataset();
        let config = small_config();
        let model = train_shape_model(&images, &shapes, &config).unwrap();

        assert_eq!(model.num_parts(), 1);
        assert_eq!(model.levels.len(), 3);
        for level in &model.levels {
            assert_eq!(level.trees.len(), 10);
            assert_eq!(level.pool.len(), FEATURE_POOL_SIZE);
            for tree in &level.trees {
                assert_eq!(tree.depth(), 2);
                assert_eq!(tree.num_nodes(), 7);
            }
        }
    }

    #[test]
    fn test_training_is_deterministic() {
        let (images, shapes) = dot_dataset();
        let a = train_shape_model(&images, &shapes, &small_config()).unwrap();
        let b = train_shape_model(&images, &shapes, &small_config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mean_shape_averages_normalised_targets() {
        let (images, shapes) = dot_dataset();
        let model = train_shape_model(&images, &shapes, &small_config()).unwrap();
        let expected_u: f32 = (0..6).map(|i| (12 + i * 4) as f32 / 48.0).sum::<f32>() / 6.0;
        assert!((model.mean_shape[0] - expected_u).abs() < 1e-5);
    }

    #[test]
    fn test_predictions_stay_near_the_box() {
        let (images, shapes) = dot_dataset();
        let model = train_shape_model(&images, &shapes, &small_config()).unwrap();
        let region = Rect::new(8, 8, 48, 48).corners();
        for image in &images {
            let points = model.predict(image, region);
            assert_eq!(points.len(), 1);
            assert!(points[0].x > 0.0 && points[0].x < 64.0);
            assert!(points[0].y > 0.0 && points[0].y < 64.0);
        }
    }

    #[test]
    fn test_empty_dataset_fails() {
        let result = train_shape_model(&[], &[], &small_config());
        assert!(matches!(result, Err(BackendError::Training(_))));
    }

    #[test]
    fn test_images_without_shapes_fail() {
        let images = vec![Image::from_fn(8, 8, |_, _| 0)];
        let result = train_shape_model(&images, &[vec![]], &small_config());
        assert!(matches!(result, Err(BackendError::Training(_))));
    }

    #[test]
    fn test_mismatched_part_counts_fail() {
        let images = vec![Image::from_fn(32, 32, |_, _| 0); 2];
        let shapes = vec![
            vec![LabeledShape::new(
                Rect::new(0, 0, 10, 10),
                vec![Point::new(1.0, 1.0)],
            )],
            vec![LabeledShape::new(
                Rect::new(0, 0, 10, 10),
                vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)],
            )],
        ];
        match train_shape_model(&images, &shapes, &small_config()) {
            Err(BackendError::Training(msg)) => assert!(msg.contains("same number of parts")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_zero_parts_fail() {
        let images = vec![Image::from_fn(32, 32, |_, _| 0)];
        let shapes = vec![vec![LabeledShape::new(Rect::new(0, 0, 10, 10), vec![])]];
        assert!(train_shape_model(&images, &shapes, &small_config()).is_err());
    }

    #[test]
    fn test_count_mismatch_fails() {
        let images = vec![Image::from_fn(32, 32, |_, _| 0)];
        assert!(train_shape_model(&images, &[], &small_config()).is_err());
    }
}
