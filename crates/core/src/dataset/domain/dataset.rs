use crate::shared::error::{Error, Result};
use crate::shared::image::Image;
use crate::shared::point::Point;
use crate::shared::rect::Rect;

/// A fully labelled object: its bounding box plus landmark parts ordered
/// by part index.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledShape {
    pub rect: Rect,
    pub parts: Vec<Point>,
}

impl LabeledShape {
    pub fn new(rect: Rect, parts: Vec<Point>) -> Self {
        Self { rect, parts }
    }
}

/// An annotation that can be reflected along with its image.
pub trait Annotation: Clone {
    fn mirrored(&self, image_width: u32) -> Self;
}

impl Annotation for Rect {
    fn mirrored(&self, image_width: u32) -> Self {
        Rect::mirrored(self, image_width)
    }
}

impl Annotation for LabeledShape {
    /// Reflects the box and every part; left/right part relabelling is
    /// left to the trainer.
    fn mirrored(&self, image_width: u32) -> Self {
        LabeledShape {
            rect: self.rect.mirrored(image_width),
            parts: self.parts.iter().map(|p| p.mirrored(image_width)).collect(),
        }
    }
}

/// Ordered `(image, annotations)` pairs, index-aligned.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset<A> {
    images: Vec<Image>,
    annotations: Vec<Vec<A>>,
}

pub type DetectionDataset = Dataset<Rect>;
pub type ShapeDataset = Dataset<LabeledShape>;

impl<A> Dataset<A> {
    pub fn new(images: Vec<Image>, annotations: Vec<Vec<A>>) -> Result<Self> {
        if images.len() != annotations.len() {
            return Err(Error::Training(format!(
                "dataset has {} images but {} annotation sets",
                images.len(),
                annotations.len()
            )));
        }
        Ok(Self {
            images,
            annotations,
        })
    }

    pub fn empty() -> Self {
        Self {
            images: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn push(&mut self, image: Image, annotations: Vec<A>) {
        self.images.push(image);
        self.annotations.push(annotations);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn annotations(&self) -> &[Vec<A>] {
        &self.annotations
    }

    /// Total annotation count across all images.
    pub fn annotation_count(&self) -> usize {
        self.annotations.iter().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Image, &[A])> {
        self.images
            .iter()
            .zip(self.annotations.iter().map(Vec::as_slice))
    }

    pub fn into_parts(self) -> (Vec<Image>, Vec<Vec<A>>) {
        (self.images, self.annotations)
    }
}
