use std::error::Error;
use std::fmt;
use std::io::Cursor;

use image::ImageReader;

#[derive(Debug)]
pub enum IdentifyError {
    UnknownFormat,
    Decode(image::ImageError),
    Io(std::io::Error),
}

impl fmt::Display for IdentifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifyError::UnknownFormat => write!(f, "unrecognized image format"),
            IdentifyError::Decode(err) => write!(f, "image identification failed: {}", err),
            IdentifyError::Io(err) => write!(f, "image I/O error: {}", err),
        }
    }
}

impl Error for IdentifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IdentifyError::Decode(err) => Some(err),
            IdentifyError::Io(err) => Some(err),
            IdentifyError::UnknownFormat => None,
        }
    }
}

impl From<image::ImageError> for IdentifyError {
    fn from(value: image::ImageError) -> Self {
        IdentifyError::Decode(value)
    }
}

impl From<std::io::Error> for IdentifyError {
    fn from(value: std::io::Error) -> Self {
        IdentifyError::Io(value)
    }
}

/// Image-identification collaborator: pixel dimensions from encoded bytes.
pub trait ImageIdentifier {
    fn identify(&self, bytes: &[u8]) -> Result<(u32, u32), IdentifyError>;
}

/// Production identifier: sniffs the format from the bytes and reads the
/// header only, no full decode.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardIdentifier;

impl ImageIdentifier for StandardIdentifier {
    fn identify(&self, bytes: &[u8]) -> Result<(u32, u32), IdentifyError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        if reader.format().is_none() {
            return Err(IdentifyError::UnknownFormat);
        }
        Ok(reader.into_dimensions()?)
    }
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbaImage::new(width, height)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("in-memory PNG encoding should succeed");
    bytes
}
