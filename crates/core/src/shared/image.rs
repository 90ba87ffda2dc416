use ndarray::{s, ArrayView2};

use crate::shared::error::{Error, Result};

/// An 8-bit grayscale image: contiguous intensities in row-major order.
///
/// Decoding happens at I/O boundaries only; training and inference see
/// a single luminance channel, as the detector and predictor consume.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Image {
    /// Wraps a row-major buffer, rejecting one whose length is not
    /// `width * height`.
    pub fn try_new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        if data.len() != (width as usize) * (height as usize) {
            return Err(Error::InvalidImageDimensions { width, height });
        }
        Ok(Self::new(data, width, height))
    }

    pub(crate) fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "data length must equal width * height"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: Fn(u32, u32) -> u8,
    {
        let mut data = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(data, width, height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intensity at `(x, y)`; out-of-bounds reads return 0.
    pub fn get_pixel(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Bilinear sample at sub-pixel position `(x, y)`.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor() as i32;
        let y0 = y.floor() as i32;
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let p00 = self.get_pixel(x0, y0) as f32;
        let p10 = self.get_pixel(x0 + 1, y0) as f32;
        let p01 = self.get_pixel(x0, y0 + 1) as f32;
        let p11 = self.get_pixel(x0 + 1, y0 + 1) as f32;

        let top = p00 * (1.0 - fx) + p10 * fx;
        let bottom = p01 * (1.0 - fx) + p11 * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// View as a `(height, width)` array.
    pub fn as_ndarray(&self) -> ArrayView2<'_, u8> {
        ArrayView2::from_shape((self.height as usize, self.width as usize), &self.data)
            .expect("Image data length must match dimensions")
    }

    /// Horizontally flipped copy.
    pub fn mirrored(&self) -> Image {
        let data: Vec<u8> = self
            .as_ndarray()
            .slice(s![.., ..;-1])
            .iter()
            .copied()
            .collect();
        Image::new(data, self.width, self.height)
    }

    /// Resamples the whole image to `width x height`.
    pub fn resized(&self, width: u32, height: u32) -> Image {
        self.crop_resized(
            0.0,
            0.0,
            self.width as f32,
            self.height as f32,
            width,
            height,
        )
    }

    /// Resamples the area `(left, top, width, height)` into an
    /// `out_width x out_height` image. Areas outside the source read as 0.
    pub fn crop_resized(
        &self,
        left: f32,
        top: f32,
        width: f32,
        height: f32,
        out_width: u32,
        out_height: u32,
    ) -> Image {
        if out_width == 0 || out_height == 0 {
            return Image::new(Vec::new(), out_width, out_height);
        }
        let sx = width / out_width as f32;
        let sy = height / out_height as f32;
        Image::from_fn(out_width, out_height, |x, y| {
            let src_x = left + (x as f32 + 0.5) * sx - 0.5;
            let src_y = top + (y as f32 + 0.5) * sy - 0.5;
            self.sample_bilinear(src_x, src_y).round().clamp(0.0, 255.0) as u8
        })
    }
}
