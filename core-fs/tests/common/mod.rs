//! Shared test doubles for core-fs integration tests.
//!
//! `MemoryFs` keeps a flat path → node map and speaks the same base64
//! transport as a real native module. Downloads never touch the network:
//! each job gets a slot that the test settles with [`MemoryFs::complete`] or
//! [`MemoryFs::fail`], and events are emitted through a [`LocalEventChannel`].

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bridge_traits::error::{ErrorCode, NativeFailure, Result};
use bridge_traits::native::{
    EntryTypeTag, JobId, NativeCapabilities, NativeConstants, NativeFileSystem, RawDirEntry,
    RawDownloadResult, RawStat, WriteOptions,
};
use core_fs::download::{begin_event_name, progress_event_name};
use core_fs::FsService;
use core_runtime::config::FsConfig;
use core_runtime::events::LocalEventChannel;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

pub const FILE_TYPE: i64 = 0;
pub const DIR_TYPE: i64 = 1;
const FIXED_TIME: i64 = 1_700_000_000;

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir { exclude_from_backup: bool },
}

type Outcome = Result<RawDownloadResult>;

#[derive(Default)]
struct Slot {
    sender: Option<oneshot::Sender<Outcome>>,
    receiver: Option<oneshot::Receiver<Outcome>>,
    started: bool,
}

pub struct MemoryFs {
    nodes: Mutex<BTreeMap<String, Node>>,
    assets: Mutex<BTreeMap<String, Vec<u8>>>,
    capabilities: NativeCapabilities,
    channel: LocalEventChannel,
    slots: Mutex<HashMap<JobId, Slot>>,
    stopped: Mutex<Vec<JobId>>,
    settle_on_stop: bool,
    last_write_options: Mutex<Option<WriteOptions>>,
    calls: AtomicUsize,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::with_capabilities(NativeCapabilities::all())
    }

    pub fn with_capabilities(capabilities: NativeCapabilities) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir { exclude_from_backup: false });
        nodes.insert("/tmp".to_string(), Node::Dir { exclude_from_backup: false });

        Self {
            nodes: Mutex::new(nodes),
            assets: Mutex::new(BTreeMap::new()),
            capabilities,
            channel: LocalEventChannel::new("memory"),
            slots: Mutex::new(HashMap::new()),
            stopped: Mutex::new(Vec::new()),
            settle_on_stop: true,
            last_write_options: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Stop requests are recorded but the download is left unsettled.
    pub fn ignoring_stop(mut self) -> Self {
        self.settle_on_stop = false;
        self
    }

    pub fn with_asset(self, path: &str, content: &[u8]) -> Self {
        self.assets.lock().insert(path.to_string(), content.to_vec());
        self
    }

    pub fn channel(&self) -> LocalEventChannel {
        self.channel.clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> Vec<JobId> {
        self.stopped.lock().clone()
    }

    pub fn last_write_options(&self) -> Option<WriteOptions> {
        self.last_write_options.lock().clone()
    }

    pub fn raw_bytes(&self, path: &str) -> Option<Vec<u8>> {
        match self.nodes.lock().get(path) {
            Some(Node::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    pub fn is_excluded_from_backup(&self, path: &str) -> bool {
        matches!(
            self.nodes.lock().get(path),
            Some(Node::Dir { exclude_from_backup: true })
        )
    }

    pub fn emit_begin(&self, job_id: JobId, status_code: u16, content_length: i64) -> usize {
        self.channel.emit(
            &begin_event_name(job_id),
            &json!({
                "jobId": job_id.get(),
                "statusCode": status_code,
                "contentLength": content_length,
                "headers": { "Content-Type": "application/octet-stream" }
            }),
        )
    }

    pub fn emit_progress(&self, job_id: JobId, content_length: i64, bytes_written: u64) -> usize {
        self.emit_raw_progress(
            job_id,
            json!({
                "jobId": job_id.get(),
                "contentLength": content_length,
                "bytesWritten": bytes_written
            }),
        )
    }

    /// Emits on `job_id`'s progress event with an arbitrary payload.
    pub fn emit_raw_progress(&self, job_id: JobId, payload: Value) -> usize {
        self.channel.emit(&progress_event_name(job_id), &payload)
    }

    pub fn complete(&self, job_id: JobId, status_code: u16, bytes_written: u64) {
        self.settle(
            job_id,
            Ok(RawDownloadResult {
                job_id,
                status_code,
                bytes_written,
            }),
        );
    }

    pub fn fail(&self, job_id: JobId, failure: NativeFailure) {
        self.settle(job_id, Err(failure));
    }

    fn settle(&self, job_id: JobId, outcome: Outcome) {
        let sender = self.slot(job_id, |slot| slot.sender.take());
        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
    }

    fn slot<T>(&self, job_id: JobId, f: impl FnOnce(&mut Slot) -> T) -> T {
        let mut slots = self.slots.lock();
        let slot = slots.entry(job_id).or_insert_with(|| {
            let (sender, receiver) = oneshot::channel();
            Slot {
                sender: Some(sender),
                receiver: Some(receiver),
                started: false,
            }
        });
        f(slot)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn missing(path: &str) -> NativeFailure {
        NativeFailure::with_code(format!("ENOENT: no such file or directory, '{}'", path), "ENOENT")
    }
}

fn parent_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((parent, _)) => parent,
        None => "/",
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_within(candidate: &str, root: &str) -> bool {
    candidate == root || candidate.starts_with(&format!("{}/", root))
}

#[async_trait]
impl NativeFileSystem for MemoryFs {
    fn constants(&self) -> NativeConstants {
        NativeConstants {
            main_bundle_path: Some("/bundle".to_string()),
            caches_directory_path: Some("/caches".to_string()),
            document_directory_path: Some("/docs".to_string()),
            external_directory_path: None,
            library_directory_path: Some("/library".to_string()),
            pictures_directory_path: None,
            file_type_regular: EntryTypeTag::Code(FILE_TYPE),
            file_type_directory: EntryTypeTag::Code(DIR_TYPE),
        }
    }

    fn capabilities(&self) -> NativeCapabilities {
        self.capabilities
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<RawDirEntry>> {
        self.hit();
        let nodes = self.nodes.lock();
        match nodes.get(path) {
            Some(Node::Dir { .. }) => {}
            Some(Node::File(_)) => {
                return Err(NativeFailure::with_code(format!("ENOTDIR: '{}'", path), "ENOTDIR"))
            }
            None => return Err(Self::missing(path)),
        }

        Ok(nodes
            .iter()
            .filter(|(p, _)| p.as_str() != path && parent_of(p) == path)
            .map(|(p, node)| RawDirEntry {
                name: name_of(p).to_string(),
                path: p.clone(),
                size: match node {
                    Node::File(bytes) => bytes.len() as u64,
                    Node::Dir { .. } => 0,
                },
                entry_type: EntryTypeTag::Code(match node {
                    Node::File(_) => FILE_TYPE,
                    Node::Dir { .. } => DIR_TYPE,
                }),
            })
            .collect())
    }

    async fn read_dir_assets(&self, path: &str) -> Result<Vec<RawDirEntry>> {
        self.hit();
        Ok(self
            .assets
            .lock()
            .iter()
            .filter(|(p, _)| parent_of(p) == path)
            .map(|(p, bytes)| RawDirEntry {
                name: name_of(p).to_string(),
                path: p.clone(),
                size: bytes.len() as u64,
                entry_type: EntryTypeTag::Code(FILE_TYPE),
            })
            .collect())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.hit();
        Ok(self.nodes.lock().contains_key(path))
    }

    async fn stat(&self, path: &str) -> Result<RawStat> {
        self.hit();
        let nodes = self.nodes.lock();
        let node = nodes.get(path).ok_or_else(|| Self::missing(path))?;
        Ok(match node {
            Node::File(bytes) => RawStat {
                ctime: FIXED_TIME,
                mtime: FIXED_TIME + 60,
                size: bytes.len() as u64,
                mode: Some(0o644),
                entry_type: EntryTypeTag::Code(FILE_TYPE),
            },
            Node::Dir { .. } => RawStat {
                ctime: FIXED_TIME,
                mtime: FIXED_TIME,
                size: 0,
                mode: Some(0o755),
                entry_type: EntryTypeTag::Code(DIR_TYPE),
            },
        })
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        self.hit();
        match self.nodes.lock().get(path) {
            Some(Node::File(bytes)) => Ok(STANDARD.encode(bytes)),
            Some(Node::Dir { .. }) => Err(NativeFailure::with_code(
                format!("EISDIR: illegal operation on a directory, '{}'", path),
                "EISDIR",
            )),
            None => Err(Self::missing(path)),
        }
    }

    async fn read_file_assets(&self, path: &str) -> Result<String> {
        self.hit();
        self.assets
            .lock()
            .get(path)
            .map(|bytes| STANDARD.encode(bytes))
            .ok_or_else(|| Self::missing(path))
    }

    async fn copy_from_assets(&self, from: &str, to: &str) -> Result<()> {
        self.hit();
        let bytes = self
            .assets
            .lock()
            .get(from)
            .cloned()
            .ok_or_else(|| Self::missing(from))?;
        self.nodes.lock().insert(to.to_string(), Node::File(bytes));
        Ok(())
    }

    async fn write_file(&self, path: &str, base64_content: &str, options: &WriteOptions) -> Result<()> {
        self.hit();
        let bytes = STANDARD
            .decode(base64_content)
            .map_err(|e| NativeFailure::message(format!("bad base64: {}", e)))?;
        let mut nodes = self.nodes.lock();
        if !matches!(nodes.get(parent_of(path)), Some(Node::Dir { .. })) {
            return Err(Self::missing(parent_of(path)));
        }
        nodes.insert(path.to_string(), Node::File(bytes));
        *self.last_write_options.lock() = Some(options.clone());
        Ok(())
    }

    async fn move_file(&self, from: &str, to: &str) -> Result<()> {
        self.hit();
        let mut nodes = self.nodes.lock();
        if !nodes.contains_key(from) {
            return Err(Self::missing(from));
        }
        let moved: Vec<String> = nodes.keys().filter(|p| is_within(p, from)).cloned().collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let new = format!("{}{}", to, &old[from.len()..]);
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn unlink(&self, path: &str) -> Result<()> {
        self.hit();
        let mut nodes = self.nodes.lock();
        if !nodes.contains_key(path) {
            // iOS reports unlink failures wrapped in an operational error.
            return Err(NativeFailure::wrap(
                "OperationalError",
                NativeFailure::described(
                    "File does not exist",
                    Some(ErrorCode::Text("ENOENT".to_string())),
                ),
            ));
        }
        nodes.retain(|p, _| !is_within(p, path));
        Ok(())
    }

    async fn mkdir(&self, path: &str, exclude_from_backup: bool) -> Result<()> {
        self.hit();
        let mut nodes = self.nodes.lock();
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            match nodes.get(&current) {
                Some(Node::File(_)) => {
                    return Err(NativeFailure::with_code(format!("EEXIST: '{}'", current), "EEXIST"))
                }
                Some(Node::Dir { .. }) => {}
                None => {
                    nodes.insert(current.clone(), Node::Dir { exclude_from_backup });
                }
            }
        }
        Ok(())
    }

    async fn download_file(&self, _url: &str, _dest_path: &str, job_id: JobId) -> Result<RawDownloadResult> {
        self.hit();
        let receiver = self.slot(job_id, |slot| {
            slot.started = true;
            slot.receiver.take()
        });
        match receiver {
            Some(receiver) => receiver
                .await
                .unwrap_or_else(|_| Err(NativeFailure::message("download slot dropped"))),
            None => Err(NativeFailure::message("download already started")),
        }
    }

    fn stop_download(&self, job_id: JobId) {
        self.hit();
        self.stopped.lock().push(job_id);
        // A job the module never started is unknown to it; the stop is lost.
        let started = self
            .slots
            .lock()
            .get(&job_id)
            .map_or(false, |slot| slot.started);
        if self.settle_on_stop && started {
            self.fail(
                job_id,
                NativeFailure::with_code("Download has been aborted", "ECANCELED"),
            );
        }
    }

    async fn path_for_bundle(&self, bundle_name: &str) -> Result<String> {
        self.hit();
        if bundle_name.is_empty() {
            return Err(NativeFailure::message("Bundle name is empty"));
        }
        Ok(format!("/bundle/{}.bundle", bundle_name))
    }
}

/// A facade over a fresh `MemoryFs`, listening on its channel.
pub fn service() -> (FsService, Arc<MemoryFs>) {
    service_with(MemoryFs::new(), |builder| builder)
}

pub fn service_with(
    backend: MemoryFs,
    configure: impl FnOnce(core_runtime::config::FsConfigBuilder) -> core_runtime::config::FsConfigBuilder,
) -> (FsService, Arc<MemoryFs>) {
    let backend = Arc::new(backend);
    let builder = FsConfig::builder()
        .backend(backend.clone())
        .event_channel(Arc::new(backend.channel()));
    let config = configure(builder).build().expect("valid test config");
    (FsService::new(config), backend)
}
