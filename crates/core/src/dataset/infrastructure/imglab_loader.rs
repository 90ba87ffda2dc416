use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::dataset::domain::dataset::{DetectionDataset, LabeledShape, ShapeDataset};
use crate::dataset::domain::dataset_loader::DatasetLoader;
use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::infrastructure::image_file_reader::ImageFileReader;
use crate::shared::error::{Error, Result};
use crate::shared::image::Image;
use crate::shared::point::Point;
use crate::shared::rect::Rect;

/// Reads imglab-style XML dataset descriptors.
///
/// ```xml
/// <dataset><images>
///   <image file="faces/1.jpg">
///     <box top="10" left="20" width="80" height="80">
///       <part name="00" x="31" y="45"/>
///     </box>
///   </image>
/// </images></dataset>
/// ```
pub struct ImglabDatasetLoader {
    image_reader: Box<dyn ImageReader>,
}

impl ImglabDatasetLoader {
    pub fn new(image_reader: Box<dyn ImageReader>) -> Self {
        Self { image_reader }
    }

    fn load_entries(&self, descriptor: &Path) -> Result<Vec<(PathBuf, Vec<RawBox>)>> {
        let xml = std::fs::read_to_string(descriptor)
            .map_err(|e| Error::dataset_load(descriptor, e))?;
        let entries = parse_descriptor(&xml).map_err(|msg| Error::dataset_load(descriptor, msg))?;

        let base = descriptor.parent().unwrap_or_else(|| Path::new(""));
        Ok(entries
            .into_iter()
            .map(|entry| (base.join(&entry.file), entry.boxes))
            .collect())
    }

    fn read_image(&self, descriptor: &Path, image_path: &Path) -> Result<Image> {
        self.image_reader.read(image_path).map_err(|e| {
            Error::dataset_load(
                descriptor,
                format!("cannot read image {}: {e}", image_path.display()),
            )
        })
    }
}

impl Default for ImglabDatasetLoader {
    fn default() -> Self {
        Self::new(Box::new(ImageFileReader::new()))
    }
}

impl DatasetLoader for ImglabDatasetLoader {
    fn load_boxes(&self, descriptor: &Path) -> Result<DetectionDataset> {
        let mut dataset = DetectionDataset::empty();
        for (image_path, boxes) in self.load_entries(descriptor)? {
            let image = self.read_image(descriptor, &image_path)?;
            let rects = boxes
                .into_iter()
                .filter(|b| !b.ignore)
                .map(|b| b.rect)
                .collect();
            dataset.push(image, rects);
        }
        log::debug!(
            "Loaded {} images with {} boxes from {}",
            dataset.len(),
            dataset.annotation_count(),
            descriptor.display()
        );
        Ok(dataset)
    }

    fn load_shapes(&self, descriptor: &Path) -> Result<ShapeDataset> {
        let mut dataset = ShapeDataset::empty();
        for (image_path, boxes) in self.load_entries(descriptor)? {
            let image = self.read_image(descriptor, &image_path)?;
            let shapes = boxes
                .into_iter()
                .filter(|b| !b.ignore)
                .map(RawBox::into_shape)
                .collect();
            dataset.push(image, shapes);
        }
        log::debug!(
            "Loaded {} images with {} shapes from {}",
            dataset.len(),
            dataset.annotation_count(),
            descriptor.display()
        );
        Ok(dataset)
    }
}

// ── Descriptor parsing ──

#[derive(Debug)]
struct RawImage {
    file: String,
    boxes: Vec<RawBox>,
}

#[derive(Debug)]
struct RawBox {
    rect: Rect,
    ignore: bool,
    parts: Vec<(String, Point)>,
}

impl RawBox {
    fn into_shape(mut self) -> LabeledShape {
        self.parts.sort_by(|(a, _), (b, _)| compare_part_names(a, b));
        LabeledShape::new(self.rect, self.parts.into_iter().map(|(_, p)| p).collect())
    }
}

/// Numeric part names ("2" < "10") sort by value; anything else sorts
/// lexically after them.
fn compare_part_names(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn parse_descriptor(xml: &str) -> std::result::Result<Vec<RawImage>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut images: Vec<RawImage> = Vec::new();
    let mut current_image: Option<RawImage> = None;
    let mut current_box: Option<RawBox> = None;
    let mut saw_dataset = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"dataset" => saw_dataset = true,
                b"image" => current_image = Some(parse_image(e)?),
                b"box" => current_box = Some(parse_box(e)?),
                b"part" => push_part(&mut current_box, e)?,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"image" => images.push(parse_image(e)?),
                b"box" => {
                    let raw = parse_box(e)?;
                    attach_box(&mut current_image, raw)?;
                }
                b"part" => push_part(&mut current_box, e)?,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"box" => {
                    if let Some(raw) = current_box.take() {
                        attach_box(&mut current_image, raw)?;
                    }
                }
                b"image" => {
                    if let Some(image) = current_image.take() {
                        images.push(image);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "malformed XML at position {}: {e}",
                    reader.buffer_position()
                ))
            }
        }
        buf.clear();
    }

    if !saw_dataset {
        return Err("missing <dataset> root element".into());
    }
    if current_image.is_some() || current_box.is_some() {
        return Err("unexpected end of document".into());
    }
    Ok(images)
}

fn parse_image(e: &BytesStart) -> std::result::Result<RawImage, String> {
    Ok(RawImage {
        file: get_attribute(e, "file")?,
        boxes: Vec::new(),
    })
}

fn parse_box(e: &BytesStart) -> std::result::Result<RawBox, String> {
    let ignore = get_attribute_opt(e, "ignore")
        .map(|v| v.trim() == "1" || v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let rect = Rect::new(
        parse_int_attr(e, "left")?,
        parse_int_attr(e, "top")?,
        parse_int_attr(e, "width")?,
        parse_int_attr(e, "height")?,
    );
    if rect.left.checked_add(rect.width).is_none() || rect.top.checked_add(rect.height).is_none() {
        return Err("<box> edges exceed the coordinate range".into());
    }
    Ok(RawBox {
        rect,
        ignore,
        parts: Vec::new(),
    })
}

fn attach_box(image: &mut Option<RawImage>, raw: RawBox) -> std::result::Result<(), String> {
    match image {
        Some(image) => {
            image.boxes.push(raw);
            Ok(())
        }
        None => Err("<box> outside of <image>".into()),
    }
}

fn push_part(current_box: &mut Option<RawBox>, e: &BytesStart) -> std::result::Result<(), String> {
    let raw = current_box
        .as_mut()
        .ok_or_else(|| "<part> outside of <box>".to_string())?;
    let name = get_attribute(e, "name")?;
    let point = Point::new(parse_float_attr(e, "x")?, parse_float_attr(e, "y")?);
    raw.parts.push((name, point));
    Ok(())
}

fn get_attribute(e: &BytesStart, name: &str) -> std::result::Result<String, String> {
    get_attribute_opt(e, name)
        .ok_or_else(|| format!("<{}> is missing attribute `{name}`", element_name(e)))
}

fn get_attribute_opt(e: &BytesStart, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name.as_bytes() {
            return String::from_utf8(attr.value.to_vec()).ok();
        }
    }
    None
}

fn parse_float_attr(e: &BytesStart, name: &str) -> std::result::Result<f64, String> {
    let raw = get_attribute(e, name)?;
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("<{}> attribute `{name}` is not a number: {raw:?}", element_name(e)))
}

fn parse_int_attr(e: &BytesStart, name: &str) -> std::result::Result<i32, String> {
    let value = parse_float_attr(e, name)?;
    if value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(format!("<{}> attribute `{name}` is out of range", element_name(e)));
    }
    Ok(value.trunc() as i32)
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}
