//! # Core Runtime Module
//!
//! Ambient infrastructure shared by the filesystem core:
//! - Logging and tracing setup
//! - Configuration builder
//! - An in-process event channel
//!
//! ## Overview
//!
//! Nothing in this crate touches files. It establishes the logging
//! conventions, the fail-fast configuration rules and a reference
//! [`EventChannel`](bridge_traits::EventChannel) implementation hosts can
//! emit native notifications into.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
