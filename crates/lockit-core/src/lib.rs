//! # lockit-core
//!
//! Shared library for the LockIt kiosk containing the scan-token parser, the
//! unlock payload, the view state machine, and the pixel buffer type.
//!
//! It has zero dependencies on camera APIs, QR decoders, MQTT clients, or UI
//! frameworks.
//!
//! # Architecture overview (for beginners)
//!
//! LockIt is a parcel-box kiosk: a user holds a QR code up to the kiosk camera,
//! the kiosk reads the text `userId-boxId-pin` out of it, and publishes an
//! unlock request for that box to a message broker.  A box controller
//! subscribed to the same topic opens the door.
//!
//! ```text
//! camera ─► frame sampler ─► QR decoder ─► token parser ─► publisher ─► broker
//!                 ▲                                            │
//!                 └────────────── view controller ◄────────────┘
//! ```
//!
//! This crate (`lockit-core`) is the shared foundation.  Everything in it lives
//! under **`domain`**:
//!
//! - **`token`** – Splits raw text into a [`ScanToken`] or rejects it.
//! - **`payload`** – The JSON [`UnlockPayload`] sent to the box controller.
//! - **`view`** – The pure transition table of the kiosk views.
//! - **`connection`** – Connection states and delivery levels.
//! - **`frame`** – The RGBA [`Frame`] buffer handed to the decoder.

pub mod domain;

// Re-export the most-used types at the crate root so callers can write
// `lockit_core::ScanToken` instead of `lockit_core::domain::token::ScanToken`.
pub use domain::connection::{ConnectionState, Qos};
pub use domain::frame::{Frame, FrameSizeError, ScanResult};
pub use domain::payload::UnlockPayload;
pub use domain::token::{parse_token, ScanToken, TokenError, EXPECTED_FORMAT};
pub use domain::view::{ViewCommand, ViewState};
