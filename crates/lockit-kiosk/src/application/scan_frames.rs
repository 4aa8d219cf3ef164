//! ScanFramesUseCase: camera acquisition, frame sampling, and QR decoding.
//!
//! While the kiosk is in the Scanning view it runs a cooperative polling loop:
//!
//! ```text
//!  tick ─► stream ready? ──no──► request next tick
//!               │
//!              yes
//!               ▼
//!        copy frame into buffer ─► decode ──None──► request next tick
//!                                     │
//!                                   Some(text) ─► loop ends, text goes to the parser
//! ```
//!
//! Ticks come from a [`RefreshScheduler`], so the loop runs at the display's
//! refresh cadence (or whatever cadence the scheduler implements) and never
//! queues frames.  A decode miss is not an error; it is the common case.
//!
//! # Architecture
//!
//! This module depends only on traits (`FrameSource`, `VideoStream`,
//! `QrDecoder`, `RefreshScheduler`) and domain types.  All infrastructure
//! implementations are injected, making the loop fully unit-testable.
//!
//! # Camera lifetime
//!
//! An open camera holds an OS-level device lock.  The stream is therefore
//! wrapped in a [`CameraLease`] that closes it exactly once, either through
//! [`CameraLease::release`] or when the lease is dropped.  A [`ScanSession`]
//! owns the lease, and the view controller owns the session only while the
//! Scanning view is active.

use async_trait::async_trait;
use lockit_core::{Frame, ScanResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error type for camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// Permission was denied or no suitable device exists.
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    /// The stream is open but a frame could not be read.
    #[error("failed to capture frame: {0}")]
    Capture(String),
}

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FacingMode {
    /// Rear camera pointing away from the user, falling back to any camera.
    #[default]
    Environment,
    /// Front camera pointing at the user, falling back to any camera.
    User,
}

/// A live video stream bound to an open camera.
pub trait VideoStream {
    /// Returns `true` once the stream has buffered enough data to read a frame.
    fn has_enough_data(&mut self) -> bool;

    /// Native resolution of the stream as `(width, height)`.
    fn resolution(&self) -> (u32, u32);

    /// Copies the current frame into `frame`.
    ///
    /// The caller has already resized `frame` to [`VideoStream::resolution`].
    fn read_frame(&mut self, frame: &mut Frame) -> Result<(), CameraError>;

    /// Stops the stream and releases the device.
    fn close(&mut self);
}

/// Trait abstracting camera acquisition.
///
/// The production implementations are in `infrastructure::camera`; tests use
/// `infrastructure::camera::mock::ScriptedCamera`.
pub trait FrameSource {
    /// Opens a camera, preferring the requested facing mode.
    fn open(&mut self, facing: FacingMode) -> Result<Box<dyn VideoStream>, CameraError>;
}

/// Trait for extracting a QR payload from a pixel buffer.
#[cfg_attr(test, mockall::automock)]
pub trait QrDecoder {
    /// Returns the decoded text, or `None` when no QR code is in the frame.
    fn decode(&self, frame: &Frame) -> Option<ScanResult>;
}

/// Trait for the tick source that drives the sampling loop.
///
/// The scheduler is either *armed* (one tick pending) or *disarmed*.  Each
/// armed tick fires exactly once; the loop must call [`schedule`] again to get
/// another one.
///
/// [`schedule`]: RefreshScheduler::schedule
#[async_trait]
pub trait RefreshScheduler: Send {
    /// Arms the next tick.  Arming an already-armed scheduler is a no-op.
    fn schedule(&mut self);

    /// Disarms any pending tick.
    fn cancel(&mut self);

    /// `true` while a tick is pending.
    fn is_armed(&self) -> bool;

    /// Resolves when the pending tick fires and disarms the scheduler.
    ///
    /// Never resolves while disarmed.  Must be cancel-safe: dropping the
    /// future before it resolves leaves the tick pending.
    async fn fired(&mut self);
}

/// Scoped ownership of an open [`VideoStream`].
///
/// The stream is closed exactly once: by [`CameraLease::release`] or on drop.
pub struct CameraLease {
    stream: Option<Box<dyn VideoStream>>,
}

impl CameraLease {
    /// Opens a stream from `source` and wraps it in a lease.
    ///
    /// # Errors
    ///
    /// Propagates [`CameraError`] from [`FrameSource::open`].
    pub fn acquire(source: &mut dyn FrameSource, facing: FacingMode) -> Result<Self, CameraError> {
        let stream = source.open(facing)?;
        let (width, height) = stream.resolution();
        info!(?facing, width, height, "camera acquired");
        Ok(Self {
            stream: Some(stream),
        })
    }

    /// The leased stream, or `None` after release.
    pub fn stream_mut(&mut self) -> Option<&mut (dyn VideoStream + 'static)> {
        self.stream.as_deref_mut()
    }

    /// Closes the stream now instead of waiting for drop.
    pub fn release(mut self) {
        self.close_stream();
    }

    fn close_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
            info!("camera released");
        }
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        self.close_stream();
    }
}

/// Sampler state between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerState {
    /// The stream has not produced a readable frame yet (or stopped producing).
    #[default]
    WaitingForFrame,
    /// Frames are being copied and decoded.
    Sampling,
}

/// What one tick of the sampler produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    /// The stream was not ready (or the frame read failed).
    NotReady,
    /// A frame was decoded but contained no QR code.
    Miss,
    /// A QR code was found.
    Decoded(ScanResult),
}

impl SampleOutcome {
    /// `true` when the loop must request another tick.
    pub fn needs_reschedule(&self) -> bool {
        !matches!(self, SampleOutcome::Decoded(_))
    }
}

/// Copies frames from a stream into a reusable buffer and decodes them.
#[derive(Debug, Default)]
pub struct FrameSampler {
    state: SamplerState,
    frame: Frame,
    ticks: u64,
}

impl FrameSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Number of ticks processed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs one tick: readiness check, frame copy, decode.
    pub fn sample(&mut self, stream: &mut dyn VideoStream, decoder: &dyn QrDecoder) -> SampleOutcome {
        self.ticks += 1;

        if !stream.has_enough_data() {
            self.state = SamplerState::WaitingForFrame;
            return SampleOutcome::NotReady;
        }

        let (width, height) = stream.resolution();
        self.frame.resize(width, height);
        if let Err(e) = stream.read_frame(&mut self.frame) {
            warn!("frame read failed, waiting for next tick: {e}");
            self.state = SamplerState::WaitingForFrame;
            return SampleOutcome::NotReady;
        }

        self.state = SamplerState::Sampling;
        match decoder.decode(&self.frame) {
            Some(result) => SampleOutcome::Decoded(result),
            None => SampleOutcome::Miss,
        }
    }
}

/// One Scanning-view session: the camera lease plus the sampler.
///
/// Dropping the session releases the camera.
pub struct ScanSession {
    lease: CameraLease,
    sampler: FrameSampler,
}

impl ScanSession {
    /// Acquires the camera and prepares a fresh sampler.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError`] if the camera cannot be opened.
    pub fn start(source: &mut dyn FrameSource, facing: FacingMode) -> Result<Self, CameraError> {
        Ok(Self {
            lease: CameraLease::acquire(source, facing)?,
            sampler: FrameSampler::new(),
        })
    }

    /// Processes one scheduled tick.
    pub fn tick(&mut self, decoder: &dyn QrDecoder) -> SampleOutcome {
        let Some(stream) = self.lease.stream_mut() else {
            return SampleOutcome::NotReady;
        };
        let outcome = self.sampler.sample(stream, decoder);
        debug!(tick = self.sampler.ticks(), ?outcome, "sampled frame");
        outcome
    }

    pub fn sampler(&self) -> &FrameSampler {
        &self.sampler
    }

    /// Ends the session and releases the camera.
    pub fn stop(self) {
        let ticks = self.sampler.ticks();
        self.lease.release();
        debug!(ticks, "scan session stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
