//! Catalog pictures served from a flat directory on disk.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::limits::MAX_PICTURE_BYTES;

#[derive(Debug, Error)]
pub enum PictureError {
    #[error("invalid picture file name: {0}")]
    InvalidName(String),
    #[error("picture not found: {0}")]
    NotFound(String),
    #[error("picture {name} is {size} bytes, limit is {MAX_PICTURE_BYTES}")]
    TooLarge { name: String, size: u64 },
    #[error("reading picture failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

pub fn mime_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("bmp") => "image/bmp",
        Some("tiff") => "image/tiff",
        Some("wmf") => "image/wmf",
        Some("jp2") => "image/jp2",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Join `file_name` onto `dir`, refusing anything but a single plain component.
pub fn resolve(dir: &Path, file_name: &str) -> Result<PathBuf, PictureError> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Ok(dir.join(name)),
        _ => Err(PictureError::InvalidName(file_name.to_string())),
    }
}

pub async fn load(dir: &Path, file_name: &str) -> Result<Picture, PictureError> {
    let path = resolve(dir, file_name)?;
    let meta = match tokio::fs::metadata(&path).await {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(PictureError::NotFound(file_name.to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PictureError::NotFound(file_name.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    if meta.len() > MAX_PICTURE_BYTES {
        return Err(PictureError::TooLarge {
            name: file_name.to_string(),
            size: meta.len(),
        });
    }
    let bytes = tokio::fs::read(&path).await?;
    Ok(Picture {
        file_name: file_name.to_string(),
        mime_type: mime_type_for(file_name),
        bytes,
    })
}
