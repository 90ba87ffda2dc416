use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::shared::constants::{MODEL_FILE_MAGIC, MODEL_FILE_VERSION};
use crate::shared::error::{Error, Result};
use crate::shared::model_kind::ModelKind;

const HEADER_LEN: usize = MODEL_FILE_MAGIC.len() + 2 + 1;

/// Writes `payload` behind a model header: magic, format version and
/// model kind.
///
/// The file is written to a `.part` sibling first and renamed into place,
/// so a failed save never leaves a truncated model at `path`.
pub fn write(path: &Path, kind: ModelKind, payload: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::serialization(path, e))?;
        }
    }

    let temp_path = part_path(path);
    let written = write_file(&temp_path, kind, payload);
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::serialization(path, e));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::serialization(path, e)
    })?;

    log::debug!(
        "Saved {} model ({} bytes) to {}",
        kind,
        payload.len(),
        path.display()
    );
    Ok(())
}

/// Reads a model file and returns its payload after checking the header
/// against `expected`.
pub fn read(path: &Path, expected: ModelKind) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|e| Error::deserialization(path, e))?;
    if bytes.len() < HEADER_LEN || &bytes[..MODEL_FILE_MAGIC.len()] != MODEL_FILE_MAGIC {
        return Err(Error::deserialization(path, "not a model file"));
    }

    let offset = MODEL_FILE_MAGIC.len();
    let version = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
    if version != MODEL_FILE_VERSION {
        return Err(Error::deserialization(
            path,
            format!("unsupported model format version {version}"),
        ));
    }

    let tag = bytes[offset + 2];
    match ModelKind::from_tag(tag) {
        Some(kind) if kind == expected => {}
        Some(kind) => {
            return Err(Error::deserialization(
                path,
                format!("file holds a {kind} model, expected a {expected} model"),
            ))
        }
        None => {
            return Err(Error::deserialization(
                path,
                format!("unknown model kind tag {tag}"),
            ))
        }
    }

    Ok(bytes[HEADER_LEN..].to_vec())
}

fn write_file(path: &Path, kind: ModelKind, payload: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(MODEL_FILE_MAGIC)?;
    file.write_all(&MODEL_FILE_VERSION.to_le_bytes())?;
    file.write_all(&[kind.tag()])?;
    file.write_all(payload)?;
    file.flush()?;
    file.sync_all()
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
