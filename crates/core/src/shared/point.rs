use serde::{Deserialize, Serialize};

/// A landmark position in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Mirror image of this point inside an image of `image_width` pixels.
    pub fn mirrored(&self, image_width: u32) -> Point {
        Point::new(image_width as f64 - self.x, self.y)
    }
}

/// A predicted landmark with raw pixel and image-relative coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    pub x_scaled: f64,
    pub y_scaled: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mirrored_reflects_x_only() {
        let p = Point::new(25.0, 40.0).mirrored(100);
        assert_relative_eq!(p.x, 75.0);
        assert_relative_eq!(p.y, 40.0);
    }

    #[test]
    fn test_landmark_serializes_camel_case() {
        let lp = LandmarkPoint {
            x: 25.0,
            y: 40.0,
            x_scaled: 0.25,
            y_scaled: 0.2,
        };
        let json = serde_json::to_value(lp).unwrap();
        assert_eq!(json["xScaled"], 0.25);
        assert_eq!(json["yScaled"], 0.2);
    }
}
