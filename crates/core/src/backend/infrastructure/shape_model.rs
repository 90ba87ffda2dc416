use serde::{Deserialize, Serialize};

use super::regression_tree::{CascadeLevel, PoolPoint};
use crate::shared::image::Image;
use crate::shared::point::Point;
use crate::shared::rect::{Corners, Rect};

/// Trained cascade of regression-tree ensembles.
///
/// Shapes are stored flattened as `(x0, y0, x1, y1, ...)` in coordinates
/// normalised to the object box: `(0, 0)` is its top-left corner and
/// `(1, 1)` its bottom-right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeModel {
    pub mean_shape: Vec<f32>,
    pub levels: Vec<CascadeLevel>,
}

impl ShapeModel {
    pub fn num_parts(&self) -> usize {
        self.mean_shape.len() / 2
    }

    /// Landmark positions for the object inside `region`, in part order.
    pub fn predict(&self, image: &Image, region: Corners) -> Vec<Point> {
        let mut shape = self.mean_shape.clone();
        for level in &self.levels {
            let intensities = sample_pool(image, region, &shape, &level.pool);
            for tree in &level.trees {
                add_assign(&mut shape, tree.predict(&intensities));
            }
        }
        denormalize(&shape, region)
    }
}

/// Image intensity at every pool point, placed relative to `shape`.
pub fn sample_pool(image: &Image, region: Corners, shape: &[f32], pool: &[PoolPoint]) -> Vec<f32> {
    let left = region.left as f32;
    let top = region.top as f32;
    let width = region.width() as f32;
    let height = region.height() as f32;
    pool.iter()
        .map(|p| {
            let a = p.anchor as usize;
            let u = shape[2 * a] + p.dx;
            let v = shape[2 * a + 1] + p.dy;
            image.sample_bilinear(left + u * width, top + v * height)
        })
        .collect()
}

/// Flattens `parts` into box-normalised coordinates of `rect`.
pub fn normalize(parts: &[Point], rect: &Rect) -> Vec<f32> {
    let width = rect.width.max(1) as f64;
    let height = rect.height.max(1) as f64;
    parts
        .iter()
        .flat_map(|p| {
            [
                ((p.x - rect.left as f64) / width) as f32,
                ((p.y - rect.top as f64) / height) as f32,
            ]
        })
        .collect()
}

pub fn denormalize(shape: &[f32], region: Corners) -> Vec<Point> {
    let width = region.width() as f64;
    let height = region.height() as f64;
    shape
        .chunks_exact(2)
        .map(|uv| {
            Point::new(
                region.left as f64 + uv[0] as f64 * width,
                region.top as f64 + uv[1] as f64 * height,
            )
        })
        .collect()
}

pub fn add_assign(shape: &mut [f32], delta: &[f32]) {
    for (s, d) in shape.iter_mut().zip(delta) {
        *s += d;
    }
}
