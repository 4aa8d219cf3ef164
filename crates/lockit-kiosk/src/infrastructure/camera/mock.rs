//! Scripted camera for unit testing.
//!
//! Allows tests to drive the sampling loop without a webcam.  The camera and
//! every stream it opens share one log, so a test can keep a clone of the
//! camera and inspect opens/closes after handing the original to the code
//! under test.

use std::sync::{Arc, Mutex};

use lockit_core::Frame;

use crate::application::scan_frames::{CameraError, FacingMode, FrameSource, VideoStream};

#[derive(Debug, Default)]
struct CameraLog {
    opens: usize,
    closes: usize,
    open: bool,
    last_facing: Option<FacingMode>,
}

/// A [`FrameSource`] whose streams follow a fixed script.
#[derive(Debug, Clone)]
pub struct ScriptedCamera {
    width: u32,
    height: u32,
    available: bool,
    warmup_ticks: u32,
    failing_reads: bool,
    log: Arc<Mutex<CameraLog>>,
}

impl ScriptedCamera {
    /// A camera that opens a `width` x `height` stream, ready immediately.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            available: true,
            warmup_ticks: 0,
            failing_reads: false,
            log: Arc::new(Mutex::new(CameraLog::default())),
        }
    }

    /// A camera whose `open` always fails with [`CameraError::Unavailable`].
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(0, 0)
        }
    }

    /// Streams report "not enough data" for the first `ticks` readiness checks.
    pub fn with_warmup(mut self, ticks: u32) -> Self {
        self.warmup_ticks = ticks;
        self
    }

    /// Streams are ready but every frame read fails.
    pub fn with_failing_reads(mut self) -> Self {
        self.failing_reads = true;
        self
    }

    /// `true` while a stream is open.
    pub fn is_open(&self) -> bool {
        self.log.lock().expect("lock poisoned").open
    }

    /// Number of successful `open` calls.
    pub fn opens(&self) -> usize {
        self.log.lock().expect("lock poisoned").opens
    }

    /// Number of `close` calls across all streams.
    pub fn closes(&self) -> usize {
        self.log.lock().expect("lock poisoned").closes
    }

    /// Facing mode requested by the most recent `open`.
    pub fn last_facing(&self) -> Option<FacingMode> {
        self.log.lock().expect("lock poisoned").last_facing
    }
}

impl FrameSource for ScriptedCamera {
    fn open(&mut self, facing: FacingMode) -> Result<Box<dyn VideoStream>, CameraError> {
        let mut log = self.log.lock().expect("lock poisoned");
        log.last_facing = Some(facing);
        if !self.available {
            return Err(CameraError::Unavailable("permission denied".into()));
        }
        log.opens += 1;
        log.open = true;
        Ok(Box::new(ScriptedStream {
            width: self.width,
            height: self.height,
            warmup_remaining: self.warmup_ticks,
            failing_reads: self.failing_reads,
            log: Arc::clone(&self.log),
        }))
    }
}

struct ScriptedStream {
    width: u32,
    height: u32,
    warmup_remaining: u32,
    failing_reads: bool,
    log: Arc<Mutex<CameraLog>>,
}

impl VideoStream for ScriptedStream {
    fn has_enough_data(&mut self) -> bool {
        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            return false;
        }
        true
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_frame(&mut self, frame: &mut Frame) -> Result<(), CameraError> {
        if self.failing_reads {
            return Err(CameraError::Capture("scripted read failure".into()));
        }
        frame.pixels_mut().fill(0x80);
        Ok(())
    }

    fn close(&mut self) {
        let mut log = self.log.lock().expect("lock poisoned");
        log.closes += 1;
        log.open = false;
    }
}
