//! Application layer use cases for the kiosk.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure business rules) and the infrastructure (camera, network, storage).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "scan a QR
//!   code and ask the broker to unlock the box").
//! - **Depend on abstractions** (traits) rather than concrete implementations,
//!   so the camera or the broker client can be swapped without changing this
//!   code.
//! - **Contain no OS calls, no network I/O, no file system access**.
//!
//! # Sub-modules
//!
//! - **`scan_frames`**     – Camera acquisition, the per-tick frame sampler,
//!   and the ports (`FrameSource`, `VideoStream`, `QrDecoder`,
//!   `RefreshScheduler`) it runs against.
//!
//! - **`publish_token`**   – Parses decoded text into a token and publishes
//!   the unlock payload through the `TokenPublisher` port.
//!
//! - **`view_controller`** – The Idle / Scanning / ManualInput / Result state
//!   machine that ties the other two together and owns the scan session.

pub mod publish_token;
pub mod scan_frames;
pub mod view_controller;
