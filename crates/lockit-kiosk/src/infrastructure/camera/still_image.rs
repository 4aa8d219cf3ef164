//! A frame source that serves one still image as a never-ending stream.
//!
//! Useful for headless kiosks, demos, and end-to-end tests: point it at a
//! PNG or JPEG of a QR code and the sampling loop decodes it on the first
//! tick.  The file is decoded on every `open`, so swapping the file between
//! scans changes what the next scan sees.

use std::path::{Path, PathBuf};

use lockit_core::Frame;
use tracing::debug;

use crate::application::scan_frames::{CameraError, FacingMode, FrameSource, VideoStream};

/// Serves an image file (or an in-memory frame) as a camera.
#[derive(Debug, Clone)]
pub struct StillImageSource {
    origin: Origin,
}

#[derive(Debug, Clone)]
enum Origin {
    File(PathBuf),
    Memory(Frame),
}

impl StillImageSource {
    /// Serves the image at `path`.  The file is read when the stream opens.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::File(path.into()),
        }
    }

    /// Serves an already-decoded frame.
    pub fn from_frame(frame: Frame) -> Self {
        Self {
            origin: Origin::Memory(frame),
        }
    }

    fn load(&self) -> Result<Frame, CameraError> {
        match &self.origin {
            Origin::File(path) => load_rgba(path),
            Origin::Memory(frame) => Ok(frame.clone()),
        }
    }
}

impl FrameSource for StillImageSource {
    fn open(&mut self, facing: FacingMode) -> Result<Box<dyn VideoStream>, CameraError> {
        // A still image has no facing; the request is accepted as-is.
        debug!(?facing, "opening still image source");
        let frame = self.load()?;
        if frame.is_empty() {
            return Err(CameraError::Unavailable("still image has no pixels".into()));
        }
        Ok(Box::new(StillStream { frame }))
    }
}

fn load_rgba(path: &Path) -> Result<Frame, CameraError> {
    let image = image::open(path)
        .map_err(|e| CameraError::Unavailable(format!("{}: {e}", path.display())))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Frame::from_rgba(width, height, image.into_raw())
        .map_err(|e| CameraError::Unavailable(e.to_string()))
}

struct StillStream {
    frame: Frame,
}

impl VideoStream for StillStream {
    fn has_enough_data(&mut self) -> bool {
        true
    }

    fn resolution(&self) -> (u32, u32) {
        (self.frame.width(), self.frame.height())
    }

    fn read_frame(&mut self, frame: &mut Frame) -> Result<(), CameraError> {
        let src = self.frame.pixels();
        let dst = frame.pixels_mut();
        if dst.len() != src.len() {
            return Err(CameraError::Capture(format!(
                "destination holds {} bytes, still image has {}",
                dst.len(),
                src.len()
            )));
        }
        dst.copy_from_slice(src);
        Ok(())
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> Frame {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 0 } else { 255 };
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Frame::from_rgba(width, height, pixels).expect("sizes match")
    }

    #[test]
    fn test_in_memory_frame_is_served_every_read() {
        // Arrange
        let original = checker(4, 3);
        let mut source = StillImageSource::from_frame(original.clone());
        let mut stream = source.open(FacingMode::Environment).expect("open");
        let mut frame = Frame::new();
        frame.resize(4, 3);

        // Act / Assert
        for _ in 0..3 {
            assert!(stream.has_enough_data());
            stream.read_frame(&mut frame).expect("read");
            assert_eq!(frame, original);
        }
    }

    #[test]
    fn test_read_into_wrong_size_buffer_is_capture_error() {
        let mut source = StillImageSource::from_frame(checker(4, 4));
        let mut stream = source.open(FacingMode::Environment).expect("open");
        let mut frame = Frame::new();
        frame.resize(2, 2);

        let result = stream.read_frame(&mut frame);

        assert!(matches!(result, Err(CameraError::Capture(_))));
    }

    #[test]
    fn test_empty_frame_is_unavailable() {
        let mut source = StillImageSource::from_frame(Frame::new());
        assert!(matches!(
            source.open(FacingMode::Environment),
            Err(CameraError::Unavailable(_))
        ));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let mut source = StillImageSource::from_path("/nonexistent/lockit/qr.png");
        let err = source.open(FacingMode::Environment).err().expect("must fail");
        assert!(err.to_string().contains("qr.png"));
    }

    #[test]
    fn test_png_file_loads_at_native_resolution() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("lockit_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("still.png");
        let img = image::RgbaImage::from_pixel(6, 5, image::Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();

        // Act
        let mut source = StillImageSource::from_path(&path);
        let stream = source.open(FacingMode::Environment).expect("open");

        // Assert
        assert_eq!(stream.resolution(), (6, 5));

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }
}
