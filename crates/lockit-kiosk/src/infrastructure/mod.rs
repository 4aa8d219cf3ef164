//! Infrastructure layer for the kiosk.
//!
//! Contains the adapters behind the application ports: camera capture, QR
//! decoding, refresh ticks, the MQTT client, file-system configuration, and
//! the console front end.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `lockit_core`, but MUST NOT be imported by the `application` or domain
//! layers (test doubles in the `mock` sub-modules excepted).

pub mod camera;
pub mod console;
pub mod decoder;
pub mod messaging;
pub mod scheduler;
pub mod storage;
