//! Native webcam capture through `nokhwa` (cargo feature `camera`).
//!
//! Device choice follows the facing request: for [`FacingMode::Environment`]
//! a device whose name mentions "rear", "back" or "environment" wins, for
//! [`FacingMode::User`] one mentioning "front", "user" or "facetime".  If no
//! name matches, the first enumerated device is used.

use lockit_core::Frame;
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{ApiBackend, CameraInfo, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{info, warn};

use crate::application::scan_frames::{CameraError, FacingMode, FrameSource, VideoStream};

const REAR_HINTS: &[&str] = &["rear", "back", "environment"];
const FRONT_HINTS: &[&str] = &["front", "user", "facetime"];

/// Webcam frame source backed by the platform capture API.
#[derive(Debug, Default, Clone, Copy)]
pub struct NokhwaCamera;

impl NokhwaCamera {
    pub fn new() -> Self {
        Self
    }
}

impl FrameSource for NokhwaCamera {
    fn open(&mut self, facing: FacingMode) -> Result<Box<dyn VideoStream>, CameraError> {
        let devices = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;
        let device = pick_device(&devices, facing)
            .ok_or_else(|| CameraError::Unavailable("no camera found".into()))?;

        let format = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestResolution);
        let mut camera = Camera::new(device.index().clone(), format)
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;

        let resolution = camera.resolution();
        info!(
            device = %device.human_name(),
            width = resolution.width(),
            height = resolution.height(),
            "webcam stream opened"
        );
        Ok(Box::new(NokhwaStream { camera }))
    }
}

fn pick_device(devices: &[CameraInfo], facing: FacingMode) -> Option<&CameraInfo> {
    let hints = match facing {
        FacingMode::Environment => REAR_HINTS,
        FacingMode::User => FRONT_HINTS,
    };
    devices
        .iter()
        .find(|d| name_matches(&d.human_name(), hints))
        .or_else(|| devices.first())
}

fn name_matches(name: &str, hints: &[&str]) -> bool {
    let name = name.to_lowercase();
    hints.iter().any(|hint| name.contains(hint))
}

struct NokhwaStream {
    camera: Camera,
}

impl VideoStream for NokhwaStream {
    fn has_enough_data(&mut self) -> bool {
        self.camera.is_stream_open()
    }

    fn resolution(&self) -> (u32, u32) {
        let r = self.camera.resolution();
        (r.width(), r.height())
    }

    fn read_frame(&mut self, frame: &mut Frame) -> Result<(), CameraError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CameraError::Capture(e.to_string()))?;
        let image = buffer
            .decode_image::<RgbAFormat>()
            .map_err(|e| CameraError::Capture(e.to_string()))?;
        let (width, height) = image.dimensions();
        if (width, height) != (frame.width(), frame.height()) {
            frame.resize(width, height);
        }
        frame.pixels_mut().copy_from_slice(image.as_raw());
        Ok(())
    }

    fn close(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!("failed to stop webcam stream: {e}");
        }
    }
}
