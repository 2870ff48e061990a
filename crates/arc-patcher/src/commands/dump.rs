use super::{check_mod_dir, prepare_run, remote_host, remote_timeout, EncodeArgs, IndexArgs};
use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::load_config;
use crate::utils::report::print_report;
use arcpatch::{PatchOrchestrator, RunMode, SinkConfig};
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub struct DumpBlocksArgs {
    pub mods: String,
    pub index: IndexArgs,
    pub output_dir: String,
    pub single_folder: bool,
    pub restore: bool,
    pub encode: EncodeArgs,
}

pub struct UploadBlocksArgs {
    pub mods: String,
    pub index: IndexArgs,
    pub host: Option<String>,
    pub remote_root: Option<String>,
    pub single_folder: bool,
    pub restore: bool,
    pub timeout_secs: Option<u64>,
    pub encode: EncodeArgs,
}

fn mode_for(restore: bool) -> RunMode {
    if restore {
        RunMode::RestoreOriginal
    } else {
        RunMode::DumpOnly
    }
}

pub fn dump_blocks(args: DumpBlocksArgs, cancel: Arc<AtomicBool>) -> Result<()> {
    let cfg = load_config();
    let mods = check_mod_dir(&args.mods)?;

    let output_dir = Utf8PathBuf::from(&args.output_dir);
    if !output_dir.is_dir() {
        return Err(CliError::DumpDirNotFound { path: output_dir }.into());
    }

    let setup = prepare_run(&args.index, &args.encode, &cfg, cancel)?;

    println_pad!(
        "{} {}",
        "📦 Dumping blocks from:".bright_blue().bold(),
        mods.as_str().bright_cyan().bold()
    );
    println_pad!(
        "{} {}{}",
        "📁 Dumping to:".bright_yellow(),
        output_dir.as_str().bright_white().bold(),
        if args.single_folder { " (single folder)" } else { "" }
    );

    let report = PatchOrchestrator::new(&setup.index, setup.encoder)
        .with_jobs(setup.jobs)
        .with_cancel_flag(setup.cancel)
        .run(
            &mods,
            mode_for(args.restore),
            &SinkConfig::Folder {
                root: output_dir,
                single_folder: args.single_folder,
            },
        )
        .map_err(CliError::from)?;

    print_report(&report)
}

pub fn upload_blocks(args: UploadBlocksArgs, cancel: Arc<AtomicBool>) -> Result<()> {
    let cfg = load_config();
    let mods = check_mod_dir(&args.mods)?;
    let host = remote_host(args.host, &cfg)?;
    let remote_root = args.remote_root.unwrap_or_else(|| cfg.remote_root.clone());
    let timeout = remote_timeout(args.timeout_secs, &cfg);

    let setup = prepare_run(&args.index, &args.encode, &cfg, cancel)?;

    println_pad!(
        "{} {} {} {}/{}",
        "📡 Uploading blocks from:".bright_blue().bold(),
        mods.as_str().bright_cyan().bold(),
        "to".bright_blue(),
        host.bright_white().bold(),
        remote_root.bright_white()
    );

    let report = PatchOrchestrator::new(&setup.index, setup.encoder)
        .with_jobs(setup.jobs)
        .with_cancel_flag(setup.cancel)
        .run(
            &mods,
            mode_for(args.restore),
            &SinkConfig::Remote {
                base_url: host,
                remote_root,
                single_folder: args.single_folder,
                timeout,
            },
        )
        .map_err(CliError::from)?;

    print_report(&report)
}
