//! Domain entities for the LockIt kiosk.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain** (or "entities" layer).  Domain code:
//!
//! - Contains the core business rules of the application.
//! - Has **no** imports from camera APIs, MQTT clients, or UI frameworks.
//! - Can be compiled and tested on any platform without any external setup.
//!
//! For the kiosk those rules are small but strict: what a valid scan token
//! looks like, what JSON the box controller receives, which view may follow
//! which, and what a pixel buffer is.

/// Messaging connection state and delivery levels.
pub mod connection;
/// RGBA pixel buffers and decode results.
pub mod frame;
/// The outbound unlock payload.
pub mod payload;
/// Scan token parsing.
pub mod token;
/// The view state machine's transition table.
pub mod view;
