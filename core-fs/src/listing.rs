//! Directory listing and stat adapters.
//!
//! Native records carry an entry type as a backend-defined sentinel. The
//! sentinels come from the backend's exported constants, so the same adapter
//! works for iOS strings and Android integers alike.

use bridge_traits::native::{EntryTypeTag, NativeConstants, RawDirEntry, RawStat};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{FsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    /// Matches neither sentinel (symlink, socket, ...).
    Other,
}

/// A directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    name: String,
    path: String,
    size: u64,
    kind: EntryKind,
}

impl FileEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Result of `stat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatResult {
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    size: u64,
    mode: Option<u32>,
    kind: EntryKind,
}

impl StatResult {
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Permission bits, when the platform reports them.
    pub fn mode(&self) -> Option<u32> {
        self.mode
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Maps native records using the backend's entry-type sentinels.
#[derive(Debug, Clone)]
pub struct ListingAdapter {
    file_type_regular: EntryTypeTag,
    file_type_directory: EntryTypeTag,
}

impl ListingAdapter {
    pub fn new(file_type_regular: EntryTypeTag, file_type_directory: EntryTypeTag) -> Self {
        Self {
            file_type_regular,
            file_type_directory,
        }
    }

    pub fn from_constants(constants: &NativeConstants) -> Self {
        Self::new(
            constants.file_type_regular.clone(),
            constants.file_type_directory.clone(),
        )
    }

    pub fn classify(&self, entry_type: &EntryTypeTag) -> EntryKind {
        if *entry_type == self.file_type_regular {
            EntryKind::File
        } else if *entry_type == self.file_type_directory {
            EntryKind::Directory
        } else {
            EntryKind::Other
        }
    }

    /// Converts a native listing, preserving its order.
    pub fn entries(&self, raw: Vec<RawDirEntry>) -> Vec<FileEntry> {
        raw.into_iter()
            .map(|record| FileEntry {
                kind: self.classify(&record.entry_type),
                name: record.name,
                path: record.path,
                size: record.size,
            })
            .collect()
    }

    pub fn stat(&self, raw: RawStat) -> Result<StatResult> {
        Ok(StatResult {
            created_at: from_epoch_seconds(raw.ctime)?,
            modified_at: from_epoch_seconds(raw.mtime)?,
            size: raw.size,
            mode: raw.mode,
            kind: self.classify(&raw.entry_type),
        })
    }
}

fn from_epoch_seconds(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| FsError::Native {
        message: format!("Timestamp {} is out of range", secs),
        code: None,
    })
}
