use super::hog_detector::HogDetectorWeights;
use super::hog_features::ORIENTATION_BINS;
use crate::shared::image::Image;

/// Side of the square patch drawn for each HOG cell.
pub const GLYPH_SIZE: usize = 20;

/// Draws every cell's positive weights as oriented strokes, one stroke
/// per orientation bin, brighter for larger weights.
///
/// Strokes run along the edge direction, perpendicular to the gradient
/// the bin measures, so a learned outline reads as an outline.
pub fn render(weights: &HogDetectorWeights) -> Image {
    let cells = weights.window_cells();
    let side = cells * GLYPH_SIZE;
    let mut canvas = vec![0.0f32; side * side];

    let max_weight = weights
        .weights
        .iter()
        .copied()
        .fold(0.0f32, f32::max);

    if max_weight > 0.0 {
        for row in 0..cells {
            for col in 0..cells {
                let base = (row * cells + col) * ORIENTATION_BINS;
                for bin in 0..ORIENTATION_BINS {
                    let w = weights.weights.get(base + bin).copied().unwrap_or(0.0);
                    if w <= 0.0 {
                        continue;
                    }
                    draw_stroke(&mut canvas, side, row, col, bin, w / max_weight);
                }
            }
        }
    }

    let data = canvas
        .into_iter()
        .map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect();
    Image::new(data, side as u32, side as u32)
}

fn draw_stroke(canvas: &mut [f32], side: usize, row: usize, col: usize, bin: usize, intensity: f32) {
    let gradient_angle = (bin as f32 + 0.5) * std::f32::consts::PI / ORIENTATION_BINS as f32;
    let edge_angle = gradient_angle + std::f32::consts::FRAC_PI_2;
    let (sin, cos) = edge_angle.sin_cos();

    let cx = (col * GLYPH_SIZE) as f32 + GLYPH_SIZE as f32 / 2.0;
    let cy = (row * GLYPH_SIZE) as f32 + GLYPH_SIZE as f32 / 2.0;
    let reach = GLYPH_SIZE as f32 / 2.0 - 1.0;

    let steps = (reach * 4.0) as i32;
    for step in -steps..=steps {
        let t = step as f32 / 4.0;
        let x = (cx + t * cos).round() as i64;
        let y = (cy + t * sin).round() as i64;
        if x < 0 || y < 0 || x as usize >= side || y as usize >= side {
            continue;
        }
        let px = &mut canvas[y as usize * side + x as usize];
        *px = px.max(intensity);
    }
}
