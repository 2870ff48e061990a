mod config;
mod dump;
mod extract;
mod patch;
mod remote;

pub use config::*;
pub use dump::*;
pub use extract::*;
pub use patch::*;
pub use remote::*;

use crate::errors::CliError;
use crate::utils::config::AppConfig;
use arcpatch::{EncoderConfig, ExactSizeEncoder, ManifestIndex, ZstdCodec};
use camino::{Utf8Path, Utf8PathBuf};
use miette::Result;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Where to find the archive and its slot manifest.
#[derive(Debug, Default)]
pub struct IndexArgs {
    pub archive: Option<String>,
    pub manifest: Option<String>,
}

/// Level range and worker count overrides.
#[derive(Debug, Default)]
pub struct EncodeArgs {
    pub level_start: Option<i32>,
    pub level_end: Option<i32>,
    pub jobs: Option<usize>,
}

/// Everything a run needs besides its sink.
pub struct RunSetup {
    pub archive: Utf8PathBuf,
    pub index: ManifestIndex,
    pub encoder: ExactSizeEncoder,
    pub jobs: usize,
    pub cancel: Arc<AtomicBool>,
}

pub fn resolve_archive(args: &IndexArgs, cfg: &AppConfig) -> Result<Utf8PathBuf> {
    let archive = args
        .archive
        .as_deref()
        .map(Utf8PathBuf::from)
        .or_else(|| cfg.archive_path.clone())
        .ok_or_else(|| CliError::missing_setting("archive_path", "archive"))?;

    if !archive.is_file() {
        return Err(CliError::ArchiveNotFound { path: archive }.into());
    }
    Ok(archive)
}

pub fn open_index(args: &IndexArgs, cfg: &AppConfig) -> Result<(Utf8PathBuf, ManifestIndex)> {
    let archive = resolve_archive(args, cfg)?;
    let manifest = args
        .manifest
        .as_deref()
        .map(Utf8PathBuf::from)
        .or_else(|| cfg.manifest_path.clone())
        .ok_or_else(|| CliError::missing_setting("manifest_path", "manifest"))?;

    if !manifest.is_file() {
        return Err(CliError::ManifestNotFound { path: manifest }.into());
    }

    let index = ManifestIndex::load(&manifest, archive.clone()).map_err(CliError::from)?;
    Ok((archive, index))
}

pub fn build_encoder(args: &EncodeArgs, cfg: &AppConfig) -> Result<(ExactSizeEncoder, usize)> {
    let config = EncoderConfig::new(
        args.level_start.unwrap_or(cfg.level_start),
        args.level_end.unwrap_or(cfg.level_end),
    )
    .map_err(CliError::from)?;
    let jobs = args.jobs.unwrap_or(cfg.jobs);
    Ok((ExactSizeEncoder::new(ZstdCodec, config), jobs))
}

pub fn prepare_run(
    index_args: &IndexArgs,
    encode_args: &EncodeArgs,
    cfg: &AppConfig,
    cancel: Arc<AtomicBool>,
) -> Result<RunSetup> {
    let (archive, index) = open_index(index_args, cfg)?;
    let (encoder, jobs) = build_encoder(encode_args, cfg)?;
    Ok(RunSetup {
        archive,
        index,
        encoder,
        jobs,
        cancel,
    })
}

pub fn check_mod_dir(path: &str) -> Result<Utf8PathBuf> {
    let path = Utf8PathBuf::from(path);
    if !path.is_dir() {
        return Err(CliError::ModDirNotFound { path }.into());
    }
    Ok(path)
}

pub fn remote_host(host: Option<String>, cfg: &AppConfig) -> Result<String> {
    host.or_else(|| cfg.remote_host.clone())
        .ok_or_else(|| CliError::missing_setting("remote_host", "host").into())
}

pub fn remote_timeout(secs: Option<u64>, cfg: &AppConfig) -> Duration {
    Duration::from_secs(secs.unwrap_or(cfg.remote_timeout_secs))
}

/// Two paths name the same file, following symlinks when both exist.
pub fn same_file(a: &Utf8Path, b: &Utf8Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
