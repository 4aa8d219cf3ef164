//! LockIt kiosk library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # Layers
//!
//! ```text
//! main.rs                 CLI, config, logging, wiring
//!  └─ infrastructure/     camera, decoder, scheduler, MQTT, config, console
//!      └─ application/    view controller, scan loop, publish use case (ports)
//!          └─ lockit_core token parser, payload, frame buffer, view states
//! ```

pub mod application;
pub mod infrastructure;
