//! Patch run orchestration.
//!
//! A run walks the mod tree and drives every replacement file through
//!
//! ```text
//! Resolve -> Claim -> Encode -> Dispatch -> Done
//!    \         \        \          \
//!     +---------+--------+----------+--> Failed
//! ```
//!
//! 1. **Resolve** the logical path (and region) against the [`ArchiveIndex`].
//!    No slot, or the reserved offset `0`, fails with [`Error::NotFound`].
//! 2. **Check** the offset against the run's [`OffsetLedger`]; a second file on
//!    the same offset fails with [`Error::DuplicateOffset`]. Patch and dump runs
//!    then reject files larger than the slot's decoded limit
//!    ([`Error::DecodedTooLarge`]) without claiming the offset.
//! 3. **Claim** the offset.
//! 4. **Encode** the file to the slot's exact size, or in
//!    [`RunMode::RestoreOriginal`] read the container's own bytes for the slot.
//! 5. **Dispatch** the block to the [`Sink`]. The offset stays claimed even if
//!    this fails.
//!
//! Planning (steps 1-3) and dispatch run on the calling thread in walk order.
//! Encoding runs in batches of [`with_jobs`](PatchOrchestrator::with_jobs)
//! entries on a rayon pool, so reports, output names and duplicate detection
//! do not depend on the job count.
//!
//! A failing entry never aborts the run; its error is recorded in the
//! [`RunReport`].

use crate::encoder::{BlockCodec, EncodeEvent, EncodedBlock, ExactSizeEncoder, ZstdCodec};
use crate::error::{Error, Result};
use crate::index::{ArchiveIndex, SlotDescriptor};
use crate::ledger::OffsetLedger;
use crate::region::Region;
use crate::sink::{DispatchTarget, Sink, SinkConfig};
use crate::walker::{logical_path_for, ModTreeWalker, ReplacementEntry};
use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What a run does with each resolved slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunMode {
    /// Encode replacement files into their slots.
    Patch,
    /// Write the container's own bytes for every slot the mod tree touches,
    /// undoing an earlier patch.
    RestoreOriginal,
    /// Encode replacement files, but only to a folder or remote sink.
    DumpOnly,
}

impl RunMode {
    fn checks_decoded_limit(self) -> bool {
        !matches!(self, RunMode::RestoreOriginal)
    }
}

/// Progress information emitted during a run.
///
/// `EncodeAttempt` and `EncodeAccepted` come from worker threads when more
/// than one job is configured; everything else is emitted in walk order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PatchProgress {
    /// An entry was taken from the walk. `index` is 0-based walk position.
    #[serde(rename_all = "camelCase")]
    EntryStarted { index: usize, logical_path: String },
    /// One compression level was tried for an entry.
    #[serde(rename_all = "camelCase")]
    EncodeAttempt {
        logical_path: String,
        level: i32,
        compressed_len: usize,
        pad: i64,
    },
    /// A level was accepted and padded.
    #[serde(rename_all = "camelCase")]
    EncodeAccepted {
        logical_path: String,
        level: i32,
        pad: usize,
    },
    /// An entry reached `Done` or `Failed`.
    #[serde(rename_all = "camelCase")]
    EntryFinished {
        index: usize,
        logical_path: String,
        success: bool,
    },
    /// The run is over.
    Complete { written: usize, failed: usize },
}

/// Final state of one entry.
#[derive(Debug)]
pub enum EntryOutcome {
    /// The block was handed to the sink. `level` is `None` for stored slots
    /// and restored bytes.
    Written { len: usize, level: Option<i32> },
    Failed(Error),
}

/// Result for one file of the mod tree.
#[derive(Debug)]
pub struct EntryReport {
    pub logical_path: String,
    pub relative_dir: Utf8PathBuf,
    pub file_name: String,
    pub region: Option<Region>,
    /// Slot the entry resolved to, if it got that far.
    pub slot: Option<SlotDescriptor>,
    pub outcome: EntryOutcome,
}

impl EntryReport {
    pub fn is_written(&self) -> bool {
        matches!(self.outcome, EntryOutcome::Written { .. })
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            EntryOutcome::Failed(e) => Some(e),
            EntryOutcome::Written { .. } => None,
        }
    }

    fn failed(entry: &ReplacementEntry, slot: Option<SlotDescriptor>, error: Error) -> Self {
        Self {
            logical_path: entry.logical_path.clone(),
            relative_dir: entry.relative_dir.clone(),
            file_name: entry.file_name.clone(),
            region: entry.region,
            slot,
            outcome: EntryOutcome::Failed(error),
        }
    }
}

/// Summary returned after a run completes.
#[derive(Debug)]
pub struct RunReport {
    pub mode: RunMode,
    /// One report per walked file, in walk order.
    pub entries: Vec<EntryReport>,
    pub written: usize,
    pub failed: usize,
    /// Wall-clock time for the entire run.
    pub elapsed: Duration,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|e| !e.is_written())
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// State that lives for exactly one run.
#[derive(Debug)]
pub struct RunContext {
    mode: RunMode,
    ledger: OffsetLedger,
}

impl RunContext {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            ledger: OffsetLedger::new(),
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn ledger(&self) -> &OffsetLedger {
        &self.ledger
    }

    /// Run the duplicate and size checks for a resolved slot, then claim it.
    pub fn admit(&mut self, file_len: u64, slot: &SlotDescriptor) -> Result<()> {
        if self.ledger.is_claimed(slot.offset) {
            return Err(Error::DuplicateOffset {
                offset: slot.offset,
            });
        }

        if self.mode.checks_decoded_limit() && file_len > u64::from(slot.decoded_size) {
            return Err(Error::DecodedTooLarge {
                size: file_len,
                limit: slot.decoded_size,
            });
        }

        self.ledger.claim(slot.offset);
        Ok(())
    }
}

type ProgressCallback = Arc<dyn Fn(PatchProgress) + Send + Sync>;

/// An entry taken from the walk, either ready to encode or already rejected.
enum Pending {
    Planned {
        walk_index: usize,
        entry: ReplacementEntry,
        slot: SlotDescriptor,
    },
    Rejected(EntryReport),
}

/// Drives a mod tree into a sink.
///
/// Construct with [`new`](Self::new), optionally add a progress callback,
/// cancel flag or job count, then call [`run`](Self::run).
pub struct PatchOrchestrator<'a, I: ArchiveIndex + Sync + ?Sized, C: BlockCodec = ZstdCodec> {
    index: &'a I,
    encoder: ExactSizeEncoder<C>,
    jobs: usize,
    progress_callback: Option<ProgressCallback>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl<'a, I: ArchiveIndex + Sync + ?Sized, C: BlockCodec> PatchOrchestrator<'a, I, C> {
    pub fn new(index: &'a I, encoder: ExactSizeEncoder<C>) -> Self {
        Self {
            index,
            encoder,
            jobs: 1,
            progress_callback: None,
            cancel_flag: None,
        }
    }

    /// Number of entries encoded concurrently. Must be at least 1.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Register a progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(PatchProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Stop the run once `flag` is set. Entries not yet dispatched are
    /// reported as [`Error::Cancelled`].
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// Open the sink described by `sink` and run against it.
    pub fn run(&self, mod_root: &Utf8Path, mode: RunMode, sink: &SinkConfig) -> Result<RunReport> {
        if mode == RunMode::DumpOnly && sink.writes_archive() {
            return Err(Error::ModeSinkMismatch);
        }
        let mut sink = sink.open()?;
        self.run_with_sink(mod_root, mode, sink.as_mut())
    }

    /// Run against an already opened sink.
    ///
    /// Only run-level preconditions fail here: a missing mod root, a dump run
    /// aimed at the container, a zero job count, or a sink that cannot flush.
    pub fn run_with_sink(
        &self,
        mod_root: &Utf8Path,
        mode: RunMode,
        sink: &mut dyn Sink,
    ) -> Result<RunReport> {
        let start_time = Instant::now();

        if mode == RunMode::DumpOnly && sink.writes_archive() {
            return Err(Error::ModeSinkMismatch);
        }
        if self.jobs == 0 {
            return Err(Error::InvalidJobs(self.jobs));
        }

        let walker = ModTreeWalker::new(mod_root)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| Error::Other(e.to_string()))?;

        tracing::info!("Starting {:?} run", mode);
        tracing::info!("Mod root: {}", mod_root);
        tracing::info!("Jobs: {}", self.jobs);

        let mut ctx = RunContext::new(mode);
        let mut reports = Vec::new();
        let mut pending = Vec::new();
        let mut planned = 0usize;
        let mut walk_index = 0usize;

        for item in walker {
            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable mod tree entry: {}", e);
                    continue;
                }
            };

            self.emit_progress(PatchProgress::EntryStarted {
                index: walk_index,
                logical_path: entry.logical_path.clone(),
            });

            let item = if self.is_cancelled() {
                Pending::Rejected(EntryReport::failed(&entry, None, Error::Cancelled))
            } else {
                self.plan(&mut ctx, walk_index, entry)
            };
            if matches!(item, Pending::Planned { .. }) {
                planned += 1;
            }
            pending.push(item);
            walk_index += 1;

            if planned == self.jobs {
                self.flush(&pool, mode, &mut pending, sink, &mut reports);
                planned = 0;
            }
        }
        self.flush(&pool, mode, &mut pending, sink, &mut reports);

        sink.finish()?;

        let written = reports.iter().filter(|r| r.is_written()).count();
        let failed = reports.len() - written;

        self.emit_progress(PatchProgress::Complete { written, failed });
        tracing::info!(
            "Run complete: {} written, {} failed, {} offsets claimed",
            written,
            failed,
            ctx.ledger().len()
        );

        Ok(RunReport {
            mode,
            entries: reports,
            written,
            failed,
            elapsed: start_time.elapsed(),
        })
    }

    fn plan(&self, ctx: &mut RunContext, walk_index: usize, entry: ReplacementEntry) -> Pending {
        let slot = match self
            .index
            .resolve(&entry.logical_path, entry.region)
            .filter(SlotDescriptor::is_valid)
        {
            Some(slot) => slot,
            None => {
                let error = Error::NotFound {
                    path: entry.logical_path.clone(),
                };
                return self.reject(walk_index, &entry, None, error);
            }
        };

        if entry.region.is_some() && !slot.is_regional {
            tracing::debug!(
                "{}: no regional slot, using the shared one",
                entry.logical_path
            );
        }

        match ctx.admit(entry.file_len, &slot) {
            Ok(()) => Pending::Planned {
                walk_index,
                entry,
                slot,
            },
            Err(e) => self.reject(walk_index, &entry, Some(slot), e),
        }
    }

    fn reject(
        &self,
        walk_index: usize,
        entry: &ReplacementEntry,
        slot: Option<SlotDescriptor>,
        error: Error,
    ) -> Pending {
        tracing::warn!("{}: {}", entry.logical_path, error);
        self.emit_progress(PatchProgress::EntryFinished {
            index: walk_index,
            logical_path: entry.logical_path.clone(),
            success: false,
        });
        Pending::Rejected(EntryReport::failed(entry, slot, error))
    }

    /// Encode every planned entry in `pending`, then dispatch in walk order.
    fn flush(
        &self,
        pool: &rayon::ThreadPool,
        mode: RunMode,
        pending: &mut Vec<Pending>,
        sink: &mut dyn Sink,
        reports: &mut Vec<EntryReport>,
    ) {
        let items = std::mem::take(pending);

        let jobs: Vec<(&ReplacementEntry, &SlotDescriptor)> = items
            .iter()
            .filter_map(|item| match item {
                Pending::Planned { entry, slot, .. } => Some((entry, slot)),
                Pending::Rejected(_) => None,
            })
            .collect();

        let mut blocks = if self.jobs > 1 {
            pool.install(|| {
                jobs.par_iter()
                    .map(|(entry, slot)| self.produce(mode, entry, slot))
                    .collect::<Vec<_>>()
            })
        } else {
            jobs.iter()
                .map(|(entry, slot)| self.produce(mode, entry, slot))
                .collect::<Vec<_>>()
        }
        .into_iter();

        for item in items {
            match item {
                Pending::Rejected(report) => reports.push(report),
                Pending::Planned {
                    walk_index,
                    entry,
                    slot,
                } => {
                    let block = blocks
                        .next()
                        .unwrap_or_else(|| Err(Error::Other("missing encoded block".into())));
                    let report = self.dispatch(sink, &entry, slot, block);

                    match report.error() {
                        None => tracing::info!(
                            "{} -> {:#x} ({} bytes)",
                            entry.logical_path,
                            slot.offset,
                            slot.encoded_size
                        ),
                        Some(e) => tracing::warn!("{}: {}", entry.logical_path, e),
                    }
                    self.emit_progress(PatchProgress::EntryFinished {
                        index: walk_index,
                        logical_path: entry.logical_path.clone(),
                        success: report.is_written(),
                    });
                    reports.push(report);
                }
            }
        }
    }

    /// Bytes to write for one planned entry.
    fn produce(
        &self,
        mode: RunMode,
        entry: &ReplacementEntry,
        slot: &SlotDescriptor,
    ) -> Result<EncodedBlock> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if mode == RunMode::RestoreOriginal {
            let raw = self
                .index
                .read_encoded_raw(&entry.logical_path, entry.region)?;
            return Ok(EncodedBlock::stored(raw));
        }

        let data = entry.read()?;
        let on_event = |event: EncodeEvent| {
            let progress = match event {
                EncodeEvent::Attempt {
                    level,
                    compressed_len,
                    pad,
                } => PatchProgress::EncodeAttempt {
                    logical_path: entry.logical_path.clone(),
                    level,
                    compressed_len,
                    pad,
                },
                EncodeEvent::Accepted { level, pad } => PatchProgress::EncodeAccepted {
                    logical_path: entry.logical_path.clone(),
                    level,
                    pad,
                },
            };
            self.emit_progress(progress);
        };
        self.encoder.encode_for_slot(&data, slot, &on_event)
    }

    fn dispatch(
        &self,
        sink: &mut dyn Sink,
        entry: &ReplacementEntry,
        slot: SlotDescriptor,
        block: Result<EncodedBlock>,
    ) -> EntryReport {
        let outcome = match block {
            Err(e) => EntryOutcome::Failed(e),
            Ok(_) if self.is_cancelled() => EntryOutcome::Failed(Error::Cancelled),
            Ok(block) => {
                let target = DispatchTarget::for_entry(entry, slot.offset);
                match sink.dispatch(&target, block.as_bytes()) {
                    Ok(()) => EntryOutcome::Written {
                        len: block.len(),
                        level: block.level(),
                    },
                    Err(e) => EntryOutcome::Failed(e.into()),
                }
            }
        };

        EntryReport {
            logical_path: entry.logical_path.clone(),
            relative_dir: entry.relative_dir.clone(),
            file_name: entry.file_name.clone(),
            region: entry.region,
            slot: Some(slot),
            outcome,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Emit a progress event if a callback was registered.
    fn emit_progress(&self, progress: PatchProgress) {
        if let Some(callback) = &self.progress_callback {
            callback(progress);
        }
    }
}

/// Result of extracting one path with [`extract_paths`].
#[derive(Debug)]
pub struct ExtractReport {
    pub path: String,
    pub output: Utf8PathBuf,
    /// Decoded length on success.
    pub result: Result<usize>,
}

/// Write the decoded content of each container path under `out_dir`.
///
/// Paths use the mod-tree spelling (`+<region>` suffixes are honoured), and
/// outputs are laid out so `out_dir` can be used as a mod tree directly: `:`
/// in a path is written back as `;`.
pub fn extract_paths<I: ArchiveIndex + ?Sized>(
    index: &I,
    paths: &[String],
    out_dir: &Utf8Path,
) -> Vec<ExtractReport> {
    paths
        .iter()
        .map(|path| {
            let on_disk = path.replace('\\', "/").replace(':', ";");
            let output = out_dir.join(&on_disk);
            let result = extract_one(index, &on_disk, &output);

            match &result {
                Ok(len) => tracing::info!("Extracted {} ({} bytes)", path, len),
                Err(e) => tracing::warn!("Failed to extract {}: {}", path, e),
            }
            ExtractReport {
                path: path.clone(),
                output,
                result,
            }
        })
        .collect()
}

fn extract_one<I: ArchiveIndex + ?Sized>(index: &I, on_disk: &str, output: &Utf8Path) -> Result<usize> {
    let as_path = Utf8Path::new(on_disk);
    let file_name = as_path.file_name().ok_or_else(|| Error::NotFound {
        path: on_disk.to_string(),
    })?;
    let parent = as_path.parent().unwrap_or(Utf8Path::new(""));
    let (logical_path, region) = logical_path_for(parent, file_name);

    let data = index.read_logical(&logical_path, region)?;
    if let Some(dir) = output.parent() {
        std::fs::create_dir_all(dir.as_std_path())?;
    }
    std::fs::write(output.as_std_path(), &data)?;
    Ok(data.len())
}
