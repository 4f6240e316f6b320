//! Workspace umbrella crate.
//!
//! Host applications can depend on `unifs-workspace` alone and reach the
//! facade, the bridge contract and the runtime helpers through one path.

pub use bridge_traits as bridge;
pub use core_fs as fs;
pub use core_runtime as runtime;

pub use core_fs::{FsError, FsService};
