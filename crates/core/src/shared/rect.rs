use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shared::error::{Error, Result};

pub const DEFAULT_IOU_THRESHOLD: f64 = 0.3;

/// An axis-aligned rectangle in pixel units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

/// Rectangle expressed by its edges: `(left, top, left + width, top + height)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Corners {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Corners {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

impl Rect {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Saturates at `i32::MAX`; use [`Rect::checked_corners`] to reject
    /// regions whose edges do not fit.
    pub fn right(&self) -> i32 {
        self.left.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.top.saturating_add(self.height)
    }

    pub fn corners(&self) -> Corners {
        Corners {
            left: self.left,
            top: self.top,
            right: self.right(),
            bottom: self.bottom(),
        }
    }

    pub fn from_corners(corners: Corners) -> Self {
        Self::new(
            corners.left,
            corners.top,
            corners.width(),
            corners.height(),
        )
    }

    /// Edges of an inference region. Fails with `InvalidRegion` when the
    /// width or height is negative or an edge overflows `i32`.
    pub fn checked_corners(&self) -> Result<Corners> {
        if self.width < 0 || self.height < 0 {
            return Err(self.invalid("width and height must be non-negative"));
        }
        let right = self.left.checked_add(self.width);
        let bottom = self.top.checked_add(self.height);
        match (right, bottom) {
            (Some(right), Some(bottom)) => Ok(Corners {
                left: self.left,
                top: self.top,
                right,
                bottom,
            }),
            _ => Err(self.invalid("edges exceed the coordinate range")),
        }
    }

    fn invalid(&self, reason: &'static str) -> Error {
        Error::InvalidRegion {
            left: self.left,
            top: self.top,
            width: self.width,
            height: self.height,
            reason,
        }
    }

    /// Mirror image of this rectangle inside an image of `image_width` pixels.
    /// The new left edge saturates to the `i32` range.
    pub fn mirrored(&self, image_width: u32) -> Rect {
        let left = i64::from(image_width) - i64::from(self.left) - i64::from(self.width);
        Rect {
            left: left.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
            ..*self
        }
    }

    pub fn iou(&self, other: &Rect) -> f64 {
        let ix1 = self.left.max(other.left);
        let iy1 = self.top.max(other.top);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let area_a = self.width as f64 * self.height as f64;
        let area_b = other.width as f64 * other.height as f64;
        inter / (area_a + area_b - inter)
    }

    /// Greedy suppression: keeps a rectangle only if its IoU with every
    /// previously kept one is at or below the threshold. Input order is
    /// preserved, so callers pass candidates best-first.
    pub fn deduplicate(rects: &[Rect], iou_threshold: f64) -> Vec<Rect> {
        if rects.len() <= 1 {
            return rects.to_vec();
        }
        let mut kept: Vec<Rect> = Vec::with_capacity(rects.len());
        for r in rects {
            let dominated = kept.iter().any(|k| r.iou(k) > iou_threshold);
            if !dominated {
                kept.push(*r);
            }
        }
        kept
    }

    /// Parses a `{left, top, width, height}` object supplied by a caller.
    ///
    /// Every field must be present, numeric and within the `i32` range;
    /// fractional values truncate.
    pub fn from_json(value: &Value) -> Result<Rect> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::InvalidArgument("rect must be an object".into()))?;
        let field = |name: &str| -> Result<i32> {
            let v = object
                .get(name)
                .filter(|v| !v.is_null())
                .ok_or_else(|| Error::InvalidArgument(format!("rect {name} must be defined")))?;
            let n = v
                .as_f64()
                .filter(|n| n.is_finite())
                .ok_or_else(|| Error::InvalidArgument(format!("rect {name} must be a number")))?
                .trunc();
            if n < f64::from(i32::MIN) || n > f64::from(i32::MAX) {
                return Err(Error::InvalidArgument(format!(
                    "rect {name} is out of range: {n}"
                )));
            }
            Ok(n as i32)
        };
        Ok(Rect::new(
            field("left")?,
            field("top")?,
            field("width")?,
            field("height")?,
        ))
    }
}
