use serde::{Deserialize, Serialize};

use super::hog_features::{dot, HogGrid, CELL_SIZE, ORIENTATION_BINS};
use crate::config::training_config::DEFAULT_DETECTION_WINDOW_SIZE;
use crate::shared::image::Image;
use crate::shared::rect::{Rect, DEFAULT_IOU_THRESHOLD};

/// Each pyramid level is 5/6 the size of the previous one.
pub const PYRAMID_DOWNSCALE: f32 = 5.0 / 6.0;

const MAX_PYRAMID_LEVELS: usize = 32;

/// Linear classifier over HOG windows.
///
/// A window is `object_cells + 2` cells square: the object occupies the
/// inner block and one ring of context cells surrounds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HogDetectorWeights {
    pub object_cells: usize,
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl HogDetectorWeights {
    pub fn window_cells(&self) -> usize {
        self.object_cells + 2
    }

    pub fn feature_len(&self) -> usize {
        feature_len(self.object_cells)
    }

    pub fn score(&self, features: &[f32]) -> f32 {
        dot(features, &self.weights) + self.bias
    }

    /// Generic box template: strong horizontal edges along the top and
    /// bottom of the object block and vertical edges along its sides.
    pub fn default_template() -> Self {
        let object_cells = object_cells_for(DEFAULT_DETECTION_WINDOW_SIZE);
        let window_cells = object_cells + 2;
        let last = window_cells - 2;

        let mut weights = vec![0.0; feature_len(object_cells)];
        let mut ring_cells = 0usize;
        for row in 1..=last {
            for col in 1..=last {
                let horizontal_edge = row == 1 || row == last;
                let vertical_edge = col == 1 || col == last;
                if !horizontal_edge && !vertical_edge {
                    continue;
                }
                ring_cells += 1;
                let base = (row * window_cells + col) * ORIENTATION_BINS;
                if horizontal_edge {
                    weights[base + ORIENTATION_BINS / 2] = 1.0;
                }
                if vertical_edge {
                    weights[base] = 1.0;
                }
            }
        }
        let scale = 1.0 / ring_cells as f32;
        weights.iter_mut().for_each(|w| *w *= scale);

        Self {
            object_cells,
            weights,
            bias: -0.6,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.object_cells > 0 && self.weights.len() == self.feature_len() && self.bias.is_finite()
    }
}

pub fn object_cells_for(window_size: u32) -> usize {
    ((window_size as f32 / CELL_SIZE as f32).round() as usize).max(1)
}

pub fn feature_len(object_cells: usize) -> usize {
    let window_cells = object_cells + 2;
    window_cells * window_cells * ORIENTATION_BINS
}

/// One level of the image pyramid.
pub struct PyramidLevel {
    pub scale: f32,
    pub grid: HogGrid,
}

/// HOG grids for successively smaller copies of `image`, stopping once a
/// window of `window_cells` no longer fits.
pub fn pyramid(image: &Image, window_cells: usize) -> Vec<PyramidLevel> {
    let mut levels = Vec::new();
    let mut scale = 1.0f32;
    for _ in 0..MAX_PYRAMID_LEVELS {
        let width = (image.width() as f32 * scale).round() as u32;
        let height = (image.height() as f32 * scale).round() as u32;
        if (width as usize) < window_cells * CELL_SIZE || (height as usize) < window_cells * CELL_SIZE
        {
            break;
        }
        let level_image = if levels.is_empty() {
            image.clone()
        } else {
            image.resized(width, height)
        };
        levels.push(PyramidLevel {
            scale,
            grid: HogGrid::compute(&level_image),
        });
        scale *= PYRAMID_DOWNSCALE;
    }
    levels
}

/// Object rectangle, in source image pixels, of the window whose top-left
/// cell is `(row, col)` at a pyramid level of the given scale.
pub fn window_object_rect(row: usize, col: usize, object_cells: usize, scale: f32) -> Rect {
    let cell = CELL_SIZE as f32 / scale;
    let size = (object_cells as f32 * cell).round() as i32;
    Rect::new(
        ((col + 1) as f32 * cell).round() as i32,
        ((row + 1) as f32 * cell).round() as i32,
        size,
        size,
    )
}

/// Every window position of a level as `(row, col)`.
pub fn window_positions(grid: &HogGrid, window_cells: usize) -> Vec<(usize, usize)> {
    if grid.rows() < window_cells || grid.cols() < window_cells {
        return Vec::new();
    }
    let mut positions = Vec::new();
    for row in 0..=grid.rows() - window_cells {
        for col in 0..=grid.cols() - window_cells {
            positions.push((row, col));
        }
    }
    positions
}

/// Scans the pyramid and returns non-overlapping detections with a
/// positive score, best first.
pub fn detect(weights: &HogDetectorWeights, image: &Image) -> Vec<Rect> {
    let window_cells = weights.window_cells();
    let mut candidates: Vec<(f32, Rect)> = Vec::new();

    for level in pyramid(image, window_cells) {
        for (row, col) in window_positions(&level.grid, window_cells) {
            let score = weights.score(&level.grid.window(row, col, window_cells));
            if score > 0.0 {
                candidates.push((
                    score,
                    window_object_rect(row, col, weights.object_cells, level.scale),
                ));
            }
        }
    }

    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    let ranked: Vec<Rect> = candidates.into_iter().map(|(_, r)| r).collect();
    Rect::deduplicate(&ranked, DEFAULT_IOU_THRESHOLD)
}
