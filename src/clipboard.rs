use std::io::Cursor;

use arboard::Clipboard;
use image::{ImageFormat, RgbaImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard image has inconsistent size {width}x{height}")]
    BadImage { width: usize, height: usize },
    #[error("PNG encoding failed: {0}")]
    Encoding(#[from] image::ImageError),
}

pub(crate) trait ClipboardSource: Send + Sync {
    /// `Ok(None)` when the clipboard holds something other than an image.
    fn read_image(&self) -> Result<Option<RgbaImage>, ClipboardError>;
}

#[derive(Debug, Default)]
pub(crate) struct SystemClipboard;

impl ClipboardSource for SystemClipboard {
    fn read_image(&self) -> Result<Option<RgbaImage>, ClipboardError> {
        let mut clipboard =
            Clipboard::new().map_err(|err| ClipboardError::Unavailable(err.to_string()))?;
        let data = match clipboard.get_image() {
            Ok(data) => data,
            Err(arboard::Error::ContentNotAvailable) => return Ok(None),
            Err(err) => return Err(ClipboardError::Unavailable(err.to_string())),
        };
        let (width, height) = (data.width, data.height);
        let bad_image = || ClipboardError::BadImage { width, height };
        let w = u32::try_from(width).map_err(|_| bad_image())?;
        let h = u32::try_from(height).map_err(|_| bad_image())?;
        RgbaImage::from_raw(w, h, data.bytes.into_owned())
            .map(Some)
            .ok_or_else(bad_image)
    }
}

pub(crate) fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ClipboardError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
pub(crate) struct MockClipboard {
    image: std::sync::Mutex<Option<RgbaImage>>,
    unavailable: bool,
}

#[cfg(test)]
impl MockClipboard {
    pub(crate) fn with_image(width: u32, height: u32) -> Self {
        Self {
            image: std::sync::Mutex::new(Some(RgbaImage::from_pixel(
                width,
                height,
                image::Rgba([10, 20, 30, 255]),
            ))),
            unavailable: false,
        }
    }

    pub(crate) fn empty() -> Self {
        Self {
            image: std::sync::Mutex::new(None),
            unavailable: false,
        }
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            image: std::sync::Mutex::new(None),
            unavailable: true,
        }
    }
}

#[cfg(test)]
impl ClipboardSource for MockClipboard {
    fn read_image(&self) -> Result<Option<RgbaImage>, ClipboardError> {
        if self.unavailable {
            return Err(ClipboardError::Unavailable("no display".to_string()));
        }
        Ok(self.image.lock().unwrap().clone())
    }
}
