//! Camera adapters implementing [`FrameSource`].
//!
//! | Adapter            | Used for                                         |
//! |--------------------|--------------------------------------------------|
//! | `NokhwaCamera`     | real webcams (cargo feature `camera`)            |
//! | `StillImageSource` | headless runs and demos: one image, forever      |
//! | `NoCamera`         | builds with no capture backend configured        |
//! | `mock::ScriptedCamera` | unit and integration tests                   |

pub mod mock;
#[cfg(feature = "camera")]
pub mod native;
pub mod still_image;

use crate::application::scan_frames::{CameraError, FacingMode, FrameSource, VideoStream};

#[cfg(feature = "camera")]
pub use native::NokhwaCamera;
pub use still_image::StillImageSource;

/// A frame source with no device behind it.
///
/// Every `open` fails with [`CameraError::Unavailable`], so the kiosk stays
/// usable through manual entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCamera;

impl FrameSource for NoCamera {
    fn open(&mut self, _facing: FacingMode) -> Result<Box<dyn VideoStream>, CameraError> {
        Err(CameraError::Unavailable(
            "no capture backend configured (pass --image or build with --features camera)".into(),
        ))
    }
}
