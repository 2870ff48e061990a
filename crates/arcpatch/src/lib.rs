//! Exact-size zstd recompression and container patching.
//!
//! A container stores every entry in a byte range whose length was fixed when
//! the container was built. This crate replaces entries without moving
//! anything:
//!
//! - **Exact-size encoding**: search compression levels until the output can be
//!   padded with empty zstd blocks to the slot's exact length
//! - **Frame surgery**: splice that padding right after the frame header so the
//!   result still decodes to the original bytes
//! - **Mod tree walking**: map a directory of replacement files (with `+<region>`
//!   suffixes) to container paths in a deterministic order
//! - **Conflict detection**: refuse to write two files to the same offset
//! - **Sinks**: patch the container in place, dump blocks to a folder, or upload
//!   them to a remote store
//!
//! # Example
//!
//! ```no_run
//! use arcpatch::{
//!     EncoderConfig, ExactSizeEncoder, ManifestIndex, PatchOrchestrator, RunMode, SinkConfig,
//!     ZstdCodec,
//! };
//! use camino::Utf8Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let index = ManifestIndex::load(Utf8Path::new("slots.json"), "data.arc")?;
//! let encoder = ExactSizeEncoder::new(ZstdCodec, EncoderConfig::default());
//!
//! let report = PatchOrchestrator::new(&index, encoder)
//!     .with_jobs(4)
//!     .with_progress(|progress| println!("{:?}", progress))
//!     .run(
//!         Utf8Path::new("mods"),
//!         RunMode::Patch,
//!         &SinkConfig::InPlace {
//!             archive_path: "data.patched.arc".into(),
//!         },
//!     )?;
//!
//! println!("{} written, {} failed", report.written, report.failed);
//! # Ok(())
//! # }
//! ```

pub mod encoder;
pub mod error;
pub mod frame;
pub mod index;
pub mod ledger;
pub mod orchestrator;
pub mod region;
pub mod sink;
pub mod walker;

// Re-export main types
pub use encoder::{BlockCodec, EncodeEvent, EncodedBlock, EncoderConfig, ExactSizeEncoder, ZstdCodec};
pub use error::{Error, Result, SinkError};
pub use frame::locate_content_start;
pub use index::{ArchiveIndex, ManifestEntry, ManifestIndex, SlotDescriptor, SlotManifest};
pub use ledger::OffsetLedger;
pub use orchestrator::{
    extract_paths, EntryOutcome, EntryReport, ExtractReport, PatchOrchestrator, PatchProgress,
    RunContext, RunMode, RunReport,
};
pub use region::{split_region_tag, Region};
pub use sink::{
    DispatchTarget, FolderDumper, HttpRemoteStore, InPlaceWriter, RemoteStore, RemoteUploader,
    Sink, SinkConfig, DEFAULT_REMOTE_TIMEOUT,
};
pub use walker::{ModTreeWalker, ReplacementEntry};
