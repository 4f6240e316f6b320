//! # Filesystem Core Configuration
//!
//! Builder for the dependencies and settings the filesystem facade needs.
//!
//! ## Required Dependencies
//!
//! - `NativeFileSystem` - the platform module performing the actual I/O
//!
//! ## Optional Dependencies
//!
//! - `EventChannel` (0..N) - channels download notifications arrive on. With
//!   none registered downloads still work, but begin/progress callbacks are
//!   never invoked.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::FsConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = FsConfig::builder()
//!     .backend(Arc::new(MyNativeModule::new()))
//!     .event_channel(Arc::new(device_emitter))
//!     .event_channel(Arc::new(app_emitter))
//!     .download_timeout(Duration::from_secs(300))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{EventChannel, NativeFileSystem};
use std::sync::Arc;
use std::time::Duration;

/// Configuration consumed by the filesystem facade.
#[derive(Clone)]
pub struct FsConfig {
    /// Native module performing the operations
    pub backend: Arc<dyn NativeFileSystem>,

    /// Event channels download notifications may arrive on
    pub event_channels: Vec<Arc<dyn EventChannel>>,

    /// Upper bound on how long a download may stay unsettled. `None` waits
    /// for the native layer indefinitely.
    pub download_timeout: Option<Duration>,

    /// Whether the default begin callback (used when a caller supplies none)
    /// logs the begin payload at info level.
    pub log_download_begin: bool,
}

impl std::fmt::Debug for FsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsConfig")
            .field("backend", &"NativeFileSystem { ... }")
            .field(
                "event_channels",
                &self
                    .event_channels
                    .iter()
                    .map(|channel| channel.name().to_string())
                    .collect::<Vec<_>>(),
            )
            .field("download_timeout", &self.download_timeout)
            .field("log_download_begin", &self.log_download_begin)
            .finish()
    }
}

impl FsConfig {
    /// Creates a new builder for constructing an `FsConfig`.
    pub fn builder() -> FsConfigBuilder {
        FsConfigBuilder::default()
    }

    /// Validates settings that the builder cannot enforce by type.
    pub fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.download_timeout {
            if timeout.is_zero() {
                return Err(Error::Config(
                    "Download timeout must be greater than zero. \
                     Omit .download_timeout() to wait indefinitely."
                        .to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Builder for [`FsConfig`].
#[derive(Default)]
pub struct FsConfigBuilder {
    backend: Option<Arc<dyn NativeFileSystem>>,
    event_channels: Vec<Arc<dyn EventChannel>>,
    download_timeout: Option<Duration>,
    log_download_begin: Option<bool>,
}

impl FsConfigBuilder {
    /// Sets the native module (required).
    pub fn backend(mut self, backend: Arc<dyn NativeFileSystem>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Registers an event channel. May be called repeatedly.
    pub fn event_channel(mut self, channel: Arc<dyn EventChannel>) -> Self {
        self.event_channels.push(channel);
        self
    }

    /// Replaces all registered event channels.
    pub fn event_channels(mut self, channels: Vec<Arc<dyn EventChannel>>) -> Self {
        self.event_channels = channels;
        self
    }

    /// Fails downloads the native layer has not settled within `timeout`.
    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = Some(timeout);
        self
    }

    /// Controls logging in the default begin callback (default: `true`).
    pub fn log_download_begin(mut self, enabled: bool) -> Self {
        self.log_download_begin = Some(enabled);
        self
    }

    /// Builds the final `FsConfig`.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no backend was provided
    /// - [`Error::Config`] when a setting is out of range
    pub fn build(self) -> Result<FsConfig> {
        let backend = self.backend.ok_or_else(|| Error::CapabilityMissing {
            capability: "NativeFileSystem".to_string(),
            message: "A native filesystem module is required. \
                      Inject the platform module with .backend()."
                .to_string(),
        })?;

        let config = FsConfig {
            backend,
            event_channels: self.event_channels,
            download_timeout: self.download_timeout,
            log_download_begin: self.log_download_begin.unwrap_or(true),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LocalEventChannel;
    use async_trait::async_trait;
    use bridge_traits::error::Result as NativeResult;
    use bridge_traits::native::{
        EntryTypeTag, JobId, NativeConstants, RawDirEntry, RawDownloadResult, RawStat,
        WriteOptions,
    };

    struct NullBackend;

    #[async_trait]
    impl NativeFileSystem for NullBackend {
        fn constants(&self) -> NativeConstants {
            NativeConstants {
                main_bundle_path: None,
                caches_directory_path: None,
                document_directory_path: None,
                external_directory_path: None,
                library_directory_path: None,
                pictures_directory_path: None,
                file_type_regular: EntryTypeTag::Code(0),
                file_type_directory: EntryTypeTag::Code(1),
            }
        }

        async fn read_dir(&self, _path: &str) -> NativeResult<Vec<RawDirEntry>> {
            Ok(Vec::new())
        }

        async fn exists(&self, _path: &str) -> NativeResult<bool> {
            Ok(false)
        }

        async fn stat(&self, path: &str) -> NativeResult<RawStat> {
            Err(bridge_traits::NativeFailure::message(format!("{} not found", path)))
        }

        async fn read_file(&self, _path: &str) -> NativeResult<String> {
            Ok(String::new())
        }

        async fn write_file(&self, _path: &str, _content: &str, _options: &WriteOptions) -> NativeResult<()> {
            Ok(())
        }

        async fn move_file(&self, _from: &str, _to: &str) -> NativeResult<()> {
            Ok(())
        }

        async fn unlink(&self, _path: &str) -> NativeResult<()> {
            Ok(())
        }

        async fn mkdir(&self, _path: &str, _exclude_from_backup: bool) -> NativeResult<()> {
            Ok(())
        }

        async fn download_file(&self, _url: &str, _dest: &str, job_id: JobId) -> NativeResult<RawDownloadResult> {
            Ok(RawDownloadResult {
                job_id,
                status_code: 200,
                bytes_written: 0,
            })
        }

        fn stop_download(&self, _job_id: JobId) {}

        async fn path_for_bundle(&self, bundle_name: &str) -> NativeResult<String> {
            Ok(bundle_name.to_string())
        }
    }

    #[test]
    fn test_missing_backend_fails_fast() {
        let result = FsConfig::builder().build();
        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "NativeFileSystem");
            }
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let config = FsConfig::builder()
            .backend(Arc::new(NullBackend))
            .build()
            .unwrap();

        assert!(config.event_channels.is_empty());
        assert!(config.download_timeout.is_none());
        assert!(config.log_download_begin);
    }

    #[test]
    fn test_channels_accumulate() {
        let config = FsConfig::builder()
            .backend(Arc::new(NullBackend))
            .event_channel(Arc::new(LocalEventChannel::new("device")))
            .event_channel(Arc::new(LocalEventChannel::inactive("app")))
            .log_download_begin(false)
            .build()
            .unwrap();

        assert_eq!(config.event_channels.len(), 2);
        assert!(!config.log_download_begin);
        assert!(format!("{:?}", config).contains("device"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = FsConfig::builder()
            .backend(Arc::new(NullBackend))
            .download_timeout(Duration::ZERO)
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }
}
