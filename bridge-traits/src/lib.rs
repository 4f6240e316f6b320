//! # Native Bridge Traits
//!
//! The contract between the filesystem core and each platform's native
//! module.
//!
//! ## Overview
//!
//! Disk access, asset bundles and network downloads are performed by native
//! code the core does not own. This crate describes what that code must
//! provide and in which shapes it reports results:
//!
//! - [`NativeFileSystem`](native::NativeFileSystem) - async file operations,
//!   exported constants and optional-capability flags
//! - [`EventChannel`](events::EventChannel) - publish/subscribe channel used
//!   for download begin/progress notifications
//! - [`NativeFailure`](error::NativeFailure) - the failure shapes a backend
//!   may surface (direct, or wrapped around a cause)
//! - [`LoggerSink`](logging::LoggerSink) - forward structured logs to the
//!   host logging system
//!
//! ## Platform Requirements
//!
//! | Operation          | iOS | Android |
//! |--------------------|-----|---------|
//! | `read_dir_assets`  | ❌  | ✅      |
//! | `read_file_assets` | ❌  | ✅      |
//! | `copy_from_assets` | ❌  | ✅      |
//! | everything else    | ✅  | ✅      |
//!
//! Optional operations are advertised through
//! [`NativeCapabilities`](native::NativeCapabilities); the core never calls
//! an operation the backend did not advertise.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a backend can be shared across
//! async tasks behind an `Arc`.

pub mod error;
pub mod events;
pub mod logging;
pub mod native;

pub use error::{ErrorCode, FailureDetail, NativeFailure};

pub use events::{EventCallback, EventChannel, Subscription};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use native::{
    EntryTypeTag, JobId, NativeCapabilities, NativeConstants, NativeFileSystem, RawDirEntry,
    RawDownloadResult, RawStat, WriteOptions,
};
