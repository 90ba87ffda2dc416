use super::dataset::{Annotation, Dataset};

/// Appends a horizontally mirrored copy of every image, with annotations
/// reflected to match.
///
/// Originals keep their positions; mirrored copies follow in the same
/// order, so image `i` and image `len + i` are a mirror pair.
pub fn add_mirror_flips<A: Annotation>(dataset: Dataset<A>) -> Dataset<A> {
    let (mut images, mut annotations) = dataset.into_parts();
    let originals = images.len();
    images.reserve(originals);
    annotations.reserve(originals);

    for i in 0..originals {
        let width = images[i].width();
        let flipped = images[i].mirrored();
        let reflected = annotations[i].iter().map(|a| a.mirrored(width)).collect();
        images.push(flipped);
        annotations.push(reflected);
    }

    let mut out = Dataset::empty();
    for (image, annots) in images.into_iter().zip(annotations) {
        out.push(image, annots);
    }
    out
}

/// Mirrors the dataset when `include_mirror_flips` is set, otherwise
/// passes it through untouched.
pub fn augment<A: Annotation>(dataset: Dataset<A>, include_mirror_flips: bool) -> Dataset<A> {
    if include_mirror_flips {
        add_mirror_flips(dataset)
    } else {
        dataset
    }
}
