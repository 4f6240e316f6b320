//! Capability gate for optional native operations.
//!
//! Presence of each optional operation is read from the backend once, when
//! the facade is constructed. A missing operation fails immediately with
//! [`FsError::NotAvailable`] and the backend is never called.

use bridge_traits::error::Result as NativeResult;
use bridge_traits::native::NativeCapabilities;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tracing::debug;

use crate::error::{FsError, Result};

/// Optional native operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    ReadDirAssets,
    ReadFileAssets,
    CopyFromAssets,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::ReadDirAssets,
        Capability::ReadFileAssets,
        Capability::CopyFromAssets,
    ];

    /// Name of the native entry point.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ReadDirAssets => "readDirAssets",
            Capability::ReadFileAssets => "readFileAssets",
            Capability::CopyFromAssets => "copyFromAssets",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability flags resolved at startup.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityGate {
    flags: NativeCapabilities,
}

impl CapabilityGate {
    pub fn new(flags: NativeCapabilities) -> Self {
        for capability in Capability::ALL {
            debug!(
                capability = capability.as_str(),
                available = is_flag_set(&flags, capability),
                "Resolved native capability"
            );
        }
        Self { flags }
    }

    pub fn is_available(&self, capability: Capability) -> bool {
        is_flag_set(&self.flags, capability)
    }

    pub fn check(&self, capability: Capability) -> Result<()> {
        if self.is_available(capability) {
            Ok(())
        } else {
            Err(FsError::NotAvailable { capability })
        }
    }

    /// Runs `op` only if `capability` is present, normalizing its failure.
    pub async fn call<T, F, Fut>(&self, capability: Capability, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = NativeResult<T>>,
    {
        self.check(capability)?;
        op().await.map_err(FsError::from)
    }
}

fn is_flag_set(flags: &NativeCapabilities, capability: Capability) -> bool {
    match capability {
        Capability::ReadDirAssets => flags.read_dir_assets,
        Capability::ReadFileAssets => flags.read_file_assets,
        Capability::CopyFromAssets => flags.copy_from_assets,
    }
}
