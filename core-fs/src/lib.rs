//! # Unified Filesystem Core
//!
//! One async filesystem API over heterogeneous native modules.
//!
//! ## Overview
//!
//! Disk access and downloads are delegated to an injected
//! [`NativeFileSystem`](bridge_traits::NativeFileSystem). This crate owns the
//! normalization around it:
//!
//! - [`codec`] - base64 transport ⇄ text in a declared encoding
//! - [`error`] - one [`FsError`] for every backend failure shape
//! - [`capability`] - fail fast on optional operations the platform lacks
//! - [`listing`] - native directory/stat records → [`FileEntry`] / [`StatResult`]
//! - [`download`] - job ids, per-job event routing and subscription teardown
//! - [`service`] - the [`FsService`] facade composing all of the above
//!
//! ## Usage
//!
//! ```ignore
//! use core_fs::{DownloadOptions, FsService};
//! use core_runtime::config::FsConfig;
//! use std::sync::Arc;
//!
//! let fs = FsService::new(
//!     FsConfig::builder()
//!         .backend(native_module)
//!         .event_channel(Arc::new(device_emitter))
//!         .build()?,
//! );
//!
//! let handle = fs.download_file(
//!     DownloadOptions::new("https://example.com/a.zip", "/tmp/a.zip")
//!         .on_progress(|p| println!("{} bytes", p.bytes_written)),
//! );
//! let job_id = handle.job_id();
//! let result = handle.await?;
//! ```

pub mod capability;
pub mod codec;
pub mod download;
pub mod error;
pub mod listing;
pub mod service;

pub use capability::{Capability, CapabilityGate};
pub use codec::{decode_text, encode_text, Encoding};
pub use download::{
    DownloadBegin, DownloadHandle, DownloadOptions, DownloadProgress, DownloadResult, JobRegistry,
    JobState,
};
pub use error::{FsError, Result};
pub use listing::{EntryKind, FileEntry, StatResult};
pub use service::{DirectoryPaths, FsService, MkdirOptions};

pub use bridge_traits::JobId;
