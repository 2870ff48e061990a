//! Output sinks for encoded blocks.
//!
//! Three destinations are supported:
//!
//! - [`InPlaceWriter`]: seek into a working copy of the container and overwrite
//!   the slot.
//! - [`FolderDumper`]: write each block to `<root>/<dir>/<hex offset>_<name>`
//!   (or `<root>/<hex offset>` in single-folder mode) for later injection.
//! - [`RemoteUploader`]: the same layout, pushed through a [`RemoteStore`].

use crate::error::{Result, SinkError};
use crate::walker::ReplacementEntry;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::time::Duration;

/// Default timeout for remote requests.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Where one encoded block goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTarget {
    /// Slot offset in the container.
    pub offset: u64,
    /// Directory of the source file relative to the mod root.
    pub relative_dir: Utf8PathBuf,
    /// Source file name, region tag included.
    pub file_name: String,
}

impl DispatchTarget {
    pub fn for_entry(entry: &ReplacementEntry, offset: u64) -> Self {
        Self {
            offset,
            relative_dir: entry.relative_dir.clone(),
            file_name: entry.file_name.clone(),
        }
    }

    /// `<hex offset>_<file name>`, used by the mirrored layouts.
    pub fn mirrored_name(&self) -> String {
        format!("{:x}_{}", self.offset, self.file_name)
    }

    /// `<hex offset>`, used by the single-folder layouts.
    pub fn flat_name(&self) -> String {
        format!("{:x}", self.offset)
    }
}

/// Destination for encoded blocks.
///
/// Sinks are driven from a single thread; the orchestrator dispatches in walk
/// order.
pub trait Sink {
    /// Write one block. Must either write all of `bytes` or fail.
    fn dispatch(&mut self, target: &DispatchTarget, bytes: &[u8])
        -> std::result::Result<(), SinkError>;

    /// Flush anything buffered. Called once after the last dispatch.
    fn finish(&mut self) -> std::result::Result<(), SinkError> {
        Ok(())
    }

    /// `true` for sinks that write into the container itself.
    fn writes_archive(&self) -> bool {
        false
    }
}

/// Overwrites slots in an existing working copy of the container.
pub struct InPlaceWriter {
    path: Utf8PathBuf,
    file: File,
}

impl InPlaceWriter {
    /// Open the working copy for writing. The file must already exist; it is
    /// never created or truncated here.
    pub fn open(path: &Utf8Path) -> std::result::Result<Self, SinkError> {
        let file = OpenOptions::new().write(true).open(path.as_std_path())?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Sink for InPlaceWriter {
    fn dispatch(
        &mut self,
        target: &DispatchTarget,
        bytes: &[u8],
    ) -> std::result::Result<(), SinkError> {
        self.file.seek(SeekFrom::Start(target.offset))?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    fn finish(&mut self) -> std::result::Result<(), SinkError> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    fn writes_archive(&self) -> bool {
        true
    }
}

/// Writes encoded blocks as individual files under a dump directory.
pub struct FolderDumper {
    root: Utf8PathBuf,
    single_folder: bool,
}

impl FolderDumper {
    pub fn new(root: impl Into<Utf8PathBuf>, single_folder: bool) -> Self {
        Self {
            root: root.into(),
            single_folder,
        }
    }

    /// Output path for `target`.
    pub fn path_for(&self, target: &DispatchTarget) -> Utf8PathBuf {
        if self.single_folder {
            self.root.join(target.flat_name())
        } else {
            self.root
                .join(&target.relative_dir)
                .join(target.mirrored_name())
        }
    }
}

impl Sink for FolderDumper {
    fn dispatch(
        &mut self,
        target: &DispatchTarget,
        bytes: &[u8],
    ) -> std::result::Result<(), SinkError> {
        let path = self.path_for(target);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent.as_std_path())?;
        }
        std::fs::write(path.as_std_path(), bytes)?;
        Ok(())
    }
}

/// Minimal remote file store: create a directory, store a blob.
pub trait RemoteStore {
    fn make_dir(&self, path: &str) -> std::result::Result<(), SinkError>;
    fn store(&self, path: &str, bytes: &[u8]) -> std::result::Result<(), SinkError>;
}

/// [`RemoteStore`] over HTTP using WebDAV verbs (`MKCOL` / `PUT`).
pub struct HttpRemoteStore {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> std::result::Result<Self, SinkError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("arcpatch/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn check(
        path: &str,
        response: reqwest::Result<reqwest::blocking::Response>,
        accept: &[u16],
    ) -> std::result::Result<(), SinkError> {
        let response = response.map_err(|e| {
            if e.is_timeout() {
                SinkError::Timeout {
                    path: path.to_string(),
                }
            } else {
                SinkError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() || accept.contains(&status.as_u16()) {
            Ok(())
        } else {
            Err(SinkError::Http {
                status: status.as_u16(),
                path: path.to_string(),
            })
        }
    }
}

impl RemoteStore for HttpRemoteStore {
    fn make_dir(&self, path: &str) -> std::result::Result<(), SinkError> {
        let method = reqwest::Method::from_bytes(b"MKCOL")
            .map_err(|e| SinkError::Transport(e.to_string()))?;
        let response = self.client.request(method, self.url_for(path)).send();
        // 405: collection already exists
        Self::check(path, response, &[405])
    }

    fn store(&self, path: &str, bytes: &[u8]) -> std::result::Result<(), SinkError> {
        let response = self
            .client
            .put(self.url_for(path))
            .body(bytes.to_vec())
            .send();
        Self::check(path, response, &[])
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Uploads encoded blocks through a [`RemoteStore`].
///
/// In mirrored mode each directory prefix under `remote_root` is created once
/// (failures are logged and ignored, as the directory usually exists already)
/// before the blob is stored at `<remote_root>/<dir>/<hex offset>_<name>`. In
/// single-folder mode no directories are requested and blobs land at
/// `<remote_root>/<hex offset>`.
pub struct RemoteUploader<S: RemoteStore> {
    store: S,
    remote_root: String,
    single_folder: bool,
    created: HashSet<String>,
}

impl<S: RemoteStore> RemoteUploader<S> {
    pub fn new(store: S, remote_root: &str, single_folder: bool) -> Self {
        Self {
            store,
            remote_root: remote_root.trim_matches('/').to_string(),
            single_folder,
            created: HashSet::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Remote path a block for `target` is stored at.
    pub fn path_for(&self, target: &DispatchTarget) -> String {
        let name = if self.single_folder {
            target.flat_name()
        } else {
            target.mirrored_name()
        };

        let mut parts: Vec<&str> = Vec::new();
        if !self.remote_root.is_empty() {
            parts.push(&self.remote_root);
        }
        if !self.single_folder {
            parts.extend(target.relative_dir.components().map(|c| c.as_str()));
        }
        parts.push(&name);
        parts.join("/")
    }

    /// Create every prefix of a `/`-separated remote path, one request per
    /// segment. Returns the outcome per prefix; failures do not stop the chain.
    pub fn make_dir_chain(&mut self, path: &str) -> Vec<(String, std::result::Result<(), SinkError>)> {
        let mut results = Vec::new();
        let mut prefix = String::new();

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);

            let result = self.store.make_dir(&prefix);
            match &result {
                Ok(()) => {
                    self.created.insert(prefix.clone());
                }
                Err(e) => tracing::warn!("Make dir '{}' failed: {}", prefix, e),
            }
            results.push((prefix.clone(), result));
        }
        results
    }

    fn ensure_dirs(&mut self, relative_dir: &Utf8Path) {
        let mut prefix = self.remote_root.clone();
        for segment in relative_dir.components() {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment.as_str());

            if self.created.contains(&prefix) {
                continue;
            }
            tracing::debug!("Requesting make dir: {}", prefix);
            if let Err(e) = self.store.make_dir(&prefix) {
                tracing::warn!("Make dir '{}' failed: {}", prefix, e);
            }
            self.created.insert(prefix.clone());
        }
    }
}

impl<S: RemoteStore> Sink for RemoteUploader<S> {
    fn dispatch(
        &mut self,
        target: &DispatchTarget,
        bytes: &[u8],
    ) -> std::result::Result<(), SinkError> {
        if !self.single_folder {
            self.ensure_dirs(&target.relative_dir);
        }
        let path = self.path_for(target);
        self.store.store(&path, bytes)
    }
}

/// Declarative sink selection, opened at the start of a run.
#[derive(Debug, Clone)]
pub enum SinkConfig {
    /// Patch a pre-existing working copy of the container.
    InPlace { archive_path: Utf8PathBuf },
    /// Dump blocks into a local directory.
    Folder {
        root: Utf8PathBuf,
        single_folder: bool,
    },
    /// Upload blocks over HTTP.
    Remote {
        base_url: String,
        remote_root: String,
        single_folder: bool,
        timeout: Duration,
    },
}

impl SinkConfig {
    pub fn open(&self) -> Result<Box<dyn Sink>> {
        Ok(match self {
            SinkConfig::InPlace { archive_path } => Box::new(InPlaceWriter::open(archive_path)?),
            SinkConfig::Folder {
                root,
                single_folder,
            } => Box::new(FolderDumper::new(root.clone(), *single_folder)),
            SinkConfig::Remote {
                base_url,
                remote_root,
                single_folder,
                timeout,
            } => Box::new(RemoteUploader::new(
                HttpRemoteStore::new(base_url.clone(), *timeout)?,
                remote_root,
                *single_folder,
            )),
        })
    }

    pub fn writes_archive(&self) -> bool {
        matches!(self, SinkConfig::InPlace { .. })
    }
}
