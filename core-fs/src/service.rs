//! Public filesystem facade.

use bridge_traits::native::{JobId, NativeConstants, NativeFileSystem, WriteOptions};
use core_runtime::config::FsConfig;
use core_runtime::logging::strip_path;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::capability::{Capability, CapabilityGate};
use crate::codec::{decode_text, encode_text, Encoding};
use crate::download::{DownloadHandle, DownloadOptions, DownloadResult, DownloadRouter, JobState};
use crate::error::{FsError, Result};
use crate::listing::{FileEntry, ListingAdapter, StatResult};

/// Well-known directories exported by the native module at load time.
///
/// Each is `None` on platforms without an equivalent (e.g. no external
/// storage on iOS).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryPaths {
    pub main_bundle: Option<String>,
    pub caches: Option<String>,
    pub documents: Option<String>,
    pub external: Option<String>,
    pub library: Option<String>,
    pub pictures: Option<String>,
}

impl From<&NativeConstants> for DirectoryPaths {
    fn from(constants: &NativeConstants) -> Self {
        Self {
            main_bundle: constants.main_bundle_path.clone(),
            caches: constants.caches_directory_path.clone(),
            documents: constants.document_directory_path.clone(),
            external: constants.external_directory_path.clone(),
            library: constants.library_directory_path.clone(),
            pictures: constants.pictures_directory_path.clone(),
        }
    }
}

/// Options for [`FsService::mkdir`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MkdirOptions {
    /// Mark the directory as excluded from device backups (iOS).
    pub exclude_from_backup: bool,
}

/// Unified async filesystem API over an injected native module.
///
/// Every failure is an [`FsError`]; native failure shapes never escape.
///
/// # Example
///
/// ```ignore
/// use core_fs::FsService;
/// use core_runtime::config::FsConfig;
///
/// let fs = FsService::new(FsConfig::builder().backend(native).build()?);
/// fs.write_file("/tmp/a.txt", "hello", None, None).await?;
/// assert_eq!(fs.read_file("/tmp/a.txt", None).await?, "hello");
/// ```
pub struct FsService {
    backend: Arc<dyn NativeFileSystem>,
    paths: DirectoryPaths,
    gate: CapabilityGate,
    listing: ListingAdapter,
    downloads: DownloadRouter,
}

impl FsService {
    /// Builds the facade, reading constants and capability flags from the
    /// backend once.
    pub fn new(config: FsConfig) -> Self {
        let FsConfig {
            backend,
            event_channels,
            download_timeout,
            log_download_begin,
        } = config;

        let constants = backend.constants();
        let gate = CapabilityGate::new(backend.capabilities());
        let listing = ListingAdapter::from_constants(&constants);
        let downloads = DownloadRouter::new(
            Arc::clone(&backend),
            event_channels,
            download_timeout,
            log_download_begin,
        );

        Self {
            backend,
            paths: DirectoryPaths::from(&constants),
            gate,
            listing,
            downloads,
        }
    }

    pub fn paths(&self) -> &DirectoryPaths {
        &self.paths
    }

    pub fn is_available(&self, capability: Capability) -> bool {
        self.gate.is_available(capability)
    }

    pub async fn read_dir(&self, path: &str) -> Result<Vec<FileEntry>> {
        debug!(path = %strip_path(path), "readDir");
        let raw = self.backend.read_dir(path).await?;
        Ok(self.listing.entries(raw))
    }

    /// Lists bundled assets. Fails with `NotAvailable` where unsupported.
    pub async fn read_dir_assets(&self, path: &str) -> Result<Vec<FileEntry>> {
        let raw = self
            .gate
            .call(Capability::ReadDirAssets, || self.backend.read_dir_assets(path))
            .await?;
        Ok(self.listing.entries(raw))
    }

    /// Entry names only.
    pub async fn readdir(&self, path: &str) -> Result<Vec<String>> {
        let entries = self.read_dir(path).await?;
        Ok(entries.into_iter().map(|e| e.name().to_string()).collect())
    }

    pub async fn stat(&self, path: &str) -> Result<StatResult> {
        debug!(path = %strip_path(path), "stat");
        let raw = self.backend.stat(path).await?;
        self.listing.stat(raw)
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        debug!(path = %strip_path(path), "exists");
        Ok(self.backend.exists(path).await?)
    }

    /// Reads a file as text. `encoding` defaults to `utf8`.
    pub async fn read_file(&self, path: &str, encoding: Option<&str>) -> Result<String> {
        let encoding = Encoding::parse(encoding)?;
        debug!(path = %strip_path(path), %encoding, "readFile");
        let raw = self.backend.read_file(path).await?;
        decode_text(&raw, encoding)
    }

    /// Reads a bundled asset as text. Fails with `NotAvailable` where
    /// unsupported.
    pub async fn read_file_assets(&self, path: &str, encoding: Option<&str>) -> Result<String> {
        let encoding = Encoding::parse(encoding)?;
        let raw = self
            .gate
            .call(Capability::ReadFileAssets, || self.backend.read_file_assets(path))
            .await?;
        decode_text(&raw, encoding)
    }

    pub async fn copy_from_assets(&self, from: &str, to: &str) -> Result<()> {
        self.gate
            .call(Capability::CopyFromAssets, || self.backend.copy_from_assets(from, to))
            .await
    }

    /// Writes text to a file. `encoding` defaults to `utf8`.
    pub async fn write_file(
        &self,
        path: &str,
        contents: &str,
        encoding: Option<&str>,
        options: Option<WriteOptions>,
    ) -> Result<()> {
        let encoding = Encoding::parse(encoding)?;
        let b64 = encode_text(contents, encoding)?;
        let options = options.unwrap_or_default();
        debug!(path = %strip_path(path), %encoding, "writeFile");
        Ok(self.backend.write_file(path, &b64, &options).await?)
    }

    pub async fn move_file(&self, from: &str, to: &str) -> Result<()> {
        debug!(from = %strip_path(from), to = %strip_path(to), "moveFile");
        Ok(self.backend.move_file(from, to).await?)
    }

    /// Removes a file, or a directory and its contents.
    pub async fn unlink(&self, path: &str) -> Result<()> {
        debug!(path = %strip_path(path), "unlink");
        Ok(self.backend.unlink(path).await?)
    }

    pub async fn mkdir(&self, path: &str, options: MkdirOptions) -> Result<()> {
        debug!(path = %strip_path(path), exclude_from_backup = options.exclude_from_backup, "mkdir");
        Ok(self
            .backend
            .mkdir(path, options.exclude_from_backup)
            .await?)
    }

    /// Starts a download and returns its handle.
    ///
    /// The job id is known before the download settles, so it can be
    /// passed to [`FsService::stop_download`] while the handle is awaited.
    pub fn download_file(&self, options: DownloadOptions) -> DownloadHandle {
        self.downloads.start(options)
    }

    /// Starts a download and waits for it to settle.
    pub async fn download(&self, options: DownloadOptions) -> Result<DownloadResult> {
        self.downloads.start(options).await
    }

    /// Asks the native layer to abort a download. Fire-and-forget.
    pub fn stop_download(&self, job_id: JobId) {
        self.downloads.stop(job_id);
    }

    /// Downloads that have not settled yet.
    pub fn active_downloads(&self) -> Vec<(JobId, JobState)> {
        self.downloads.registry().active_jobs()
    }

    pub async fn path_for_bundle(&self, bundle_name: &str) -> Result<String> {
        self.backend
            .path_for_bundle(bundle_name)
            .await
            .map_err(FsError::from)
    }
}

impl fmt::Debug for FsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsService")
            .field("paths", &self.paths)
            .field("gate", &self.gate)
            .field("downloads", &self.downloads)
            .finish()
    }
}
