/// Magic bytes opening every model file.
pub const MODEL_FILE_MAGIC: &[u8; 8] = b"ODMODEL\0";

/// Current model file envelope version.
pub const MODEL_FILE_VERSION: u16 = 1;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
