use ndarray::{s, Array3};

use crate::shared::image::Image;

/// Side of a square HOG cell, in pixels.
pub const CELL_SIZE: usize = 8;

/// Unsigned orientation bins covering `[0, pi)`.
pub const ORIENTATION_BINS: usize = 9;

const NORM_EPSILON_SQ: f32 = 100.0;

/// Per-cell orientation histograms of an image, shaped
/// `(cell_rows, cell_cols, ORIENTATION_BINS)`.
#[derive(Clone, Debug)]
pub struct HogGrid {
    cells: Array3<f32>,
}

impl HogGrid {
    /// Accumulates gradient magnitudes into cell histograms, then
    /// L2-normalises every cell. Pixels beyond the last whole cell are
    /// dropped.
    pub fn compute(image: &Image) -> Self {
        let rows = image.height() as usize / CELL_SIZE;
        let cols = image.width() as usize / CELL_SIZE;
        let mut cells = Array3::<f32>::zeros((rows, cols, ORIENTATION_BINS));
        if rows == 0 || cols == 0 {
            return Self { cells };
        }

        let pixels = image.as_ndarray();
        let (h, w) = pixels.dim();
        for y in 0..rows * CELL_SIZE {
            for x in 0..cols * CELL_SIZE {
                let left = pixels[[y, x.saturating_sub(1)]] as f32;
                let right = pixels[[y, (x + 1).min(w - 1)]] as f32;
                let up = pixels[[y.saturating_sub(1), x]] as f32;
                let down = pixels[[(y + 1).min(h - 1), x]] as f32;
                let gx = right - left;
                let gy = down - up;

                let magnitude = (gx * gx + gy * gy).sqrt();
                if magnitude == 0.0 {
                    continue;
                }
                cells[[y / CELL_SIZE, x / CELL_SIZE, orientation_bin(gx, gy)]] += magnitude;
            }
        }

        for mut cell in cells.rows_mut() {
            let norm = (cell.iter().map(|v| v * v).sum::<f32>() + NORM_EPSILON_SQ).sqrt();
            cell.mapv_inplace(|v| v / norm);
        }

        Self { cells }
    }

    pub fn rows(&self) -> usize {
        self.cells.dim().0
    }

    pub fn cols(&self) -> usize {
        self.cells.dim().1
    }

    /// Flattened descriptor of the `size x size` cell block whose top-left
    /// cell is `(row, col)`. Cells outside the grid contribute zeros.
    pub fn window(&self, row: usize, col: usize, size: usize) -> Vec<f32> {
        let mut out = vec![0.0; size * size * ORIENTATION_BINS];
        let row_end = (row + size).min(self.rows());
        let col_end = (col + size).min(self.cols());
        if row >= row_end || col >= col_end {
            return out;
        }
        let block = self.cells.slice(s![row..row_end, col..col_end, ..]);
        for ((r, c, b), v) in block.indexed_iter() {
            out[(r * size + c) * ORIENTATION_BINS + b] = *v;
        }
        out
    }
}

/// Bin of the unsigned gradient orientation `atan2(gy, gx) mod pi`.
pub fn orientation_bin(gx: f32, gy: f32) -> usize {
    let angle = gy.atan2(gx).rem_euclid(std::f32::consts::PI);
    let bin = (angle / std::f32::consts::PI * ORIENTATION_BINS as f32) as usize;
    bin.min(ORIENTATION_BINS - 1)
}

/// Dot product of a window descriptor and a weight vector.
pub fn dot(features: &[f32], weights: &[f32]) -> f32 {
    features.iter().zip(weights).map(|(a, b)| a * b).sum()
}
