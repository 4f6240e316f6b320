//! Native File System Contract
//!
//! The operations every platform module exposes to the core. Paths are plain
//! strings because asset paths, bundle names and download URLs are not
//! necessarily host filesystem paths.
//!
//! Optional operations (bundled asset access) have default implementations
//! that fail; a backend advertises what it actually provides through
//! [`NativeFileSystem::capabilities`], which the core reads once at startup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{NativeFailure, Result};

/// Identifier of one download job.
///
/// Allocated by the core, handed to the native layer, and echoed back in the
/// event payloads the native layer emits for that job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend-defined value identifying an entry type.
///
/// iOS reports `"NSFileTypeRegular"`-style strings, Android reports small
/// integers. The core never hardcodes either; it compares against the
/// sentinels in [`NativeConstants`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryTypeTag {
    Code(i64),
    Name(String),
}

impl From<i64> for EntryTypeTag {
    fn from(value: i64) -> Self {
        EntryTypeTag::Code(value)
    }
}

impl From<&str> for EntryTypeTag {
    fn from(value: &str) -> Self {
        EntryTypeTag::Name(value.to_string())
    }
}

/// One directory entry as reported by the native layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDirEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub entry_type: EntryTypeTag,
}

/// Native stat record. Times are epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStat {
    pub ctime: i64,
    pub mtime: i64,
    pub size: u64,
    /// Permission bits; not every platform reports them.
    #[serde(default)]
    pub mode: Option<u32>,
    #[serde(rename = "type")]
    pub entry_type: EntryTypeTag,
}

/// Outcome of a completed native download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDownloadResult {
    pub job_id: JobId,
    pub status_code: u16,
    pub bytes_written: u64,
}

/// Platform-specific write attributes, passed through untouched
/// (e.g. file protection class on iOS).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteOptions {
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl WriteOptions {
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Values the native module exports at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeConstants {
    pub main_bundle_path: Option<String>,
    pub caches_directory_path: Option<String>,
    pub document_directory_path: Option<String>,
    pub external_directory_path: Option<String>,
    pub library_directory_path: Option<String>,
    pub pictures_directory_path: Option<String>,
    /// Sentinel identifying regular files in listings and stat records.
    pub file_type_regular: EntryTypeTag,
    /// Sentinel identifying directories in listings and stat records.
    pub file_type_directory: EntryTypeTag,
}

/// Presence flags for the optional native operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCapabilities {
    pub read_dir_assets: bool,
    pub read_file_assets: bool,
    pub copy_from_assets: bool,
}

impl NativeCapabilities {
    /// Every optional operation present.
    pub fn all() -> Self {
        Self {
            read_dir_assets: true,
            read_file_assets: true,
            copy_from_assets: true,
        }
    }
}

/// Native filesystem module trait
///
/// Implemented once per platform. All file content crosses this boundary as
/// base64 text.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::native::NativeFileSystem;
///
/// async fn probe(fs: &dyn NativeFileSystem, path: &str) -> bridge_traits::error::Result<bool> {
///     fs.exists(path).await
/// }
/// ```
#[async_trait]
pub trait NativeFileSystem: Send + Sync {
    /// Constants exported by the module (paths and entry-type sentinels).
    fn constants(&self) -> NativeConstants;

    /// Which optional operations this module provides.
    fn capabilities(&self) -> NativeCapabilities {
        NativeCapabilities::default()
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<RawDirEntry>>;

    /// List bundled assets (Android).
    async fn read_dir_assets(&self, _path: &str) -> Result<Vec<RawDirEntry>> {
        Err(NativeFailure::unsupported("readDirAssets"))
    }

    async fn exists(&self, path: &str) -> Result<bool>;

    async fn stat(&self, path: &str) -> Result<RawStat>;

    /// Read a file, returning its content as base64.
    async fn read_file(&self, path: &str) -> Result<String>;

    /// Read a bundled asset as base64 (Android).
    async fn read_file_assets(&self, _path: &str) -> Result<String> {
        Err(NativeFailure::unsupported("readFileAssets"))
    }

    /// Copy a bundled asset out to the filesystem (Android).
    async fn copy_from_assets(&self, _from: &str, _to: &str) -> Result<()> {
        Err(NativeFailure::unsupported("copyFromAssets"))
    }

    /// Write base64 content to a file.
    async fn write_file(&self, path: &str, base64_content: &str, options: &WriteOptions)
        -> Result<()>;

    async fn move_file(&self, from: &str, to: &str) -> Result<()>;

    /// Remove a file, or a directory recursively.
    async fn unlink(&self, path: &str) -> Result<()>;

    async fn mkdir(&self, path: &str, exclude_from_backup: bool) -> Result<()>;

    /// Start a download and settle when it finishes.
    ///
    /// Begin/progress notifications for the job are emitted on the platform's
    /// event channel under `DownloadBegin-<job_id>` / `DownloadProgress-<job_id>`.
    async fn download_file(&self, url: &str, dest_path: &str, job_id: JobId)
        -> Result<RawDownloadResult>;

    /// Ask the native layer to abort a download. Fire-and-forget.
    fn stop_download(&self, job_id: JobId);

    async fn path_for_bundle(&self, bundle_name: &str) -> Result<String>;
}
