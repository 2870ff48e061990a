use super::{check_mod_dir, prepare_run, same_file, EncodeArgs, IndexArgs};
use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::load_config;
use crate::utils::report::print_report;
use arcpatch::{PatchOrchestrator, RunMode, SinkConfig};
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use miette::Result;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub struct PatchArchiveArgs {
    pub mods: String,
    pub index: IndexArgs,
    pub output: Option<String>,
    pub restore: bool,
    pub encode: EncodeArgs,
}

/// `data.arc` -> `data.patched.arc`, next to the input.
fn default_output_path(archive: &Utf8Path) -> Utf8PathBuf {
    let stem = archive.file_stem().unwrap_or("archive");
    let name = match archive.extension() {
        Some(ext) => format!("{}.patched.{}", stem, ext),
        None => format!("{}.patched", stem),
    };
    archive.with_file_name(name)
}

pub fn patch_archive(args: PatchArchiveArgs, cancel: Arc<AtomicBool>) -> Result<()> {
    let cfg = load_config();
    let mods = check_mod_dir(&args.mods)?;
    let setup = prepare_run(&args.index, &args.encode, &cfg, cancel)?;

    let output = args
        .output
        .map(Utf8PathBuf::from)
        .unwrap_or_else(|| default_output_path(&setup.archive));

    if same_file(&output, &setup.archive) {
        return Err(CliError::OutputIsInput { path: output }.into());
    }

    let mode = if args.restore {
        if !output.exists() {
            return Err(CliError::RestoreWithoutOutput { path: output }.into());
        }
        RunMode::RestoreOriginal
    } else {
        if !output.exists() {
            println_pad!(
                "{} {}",
                "📄 Copying archive to:".bright_yellow(),
                output.as_str().bright_white().bold()
            );
            std::fs::copy(&setup.archive, &output).map_err(CliError::from)?;
        }
        RunMode::Patch
    };

    println_pad!(
        "{} {} {} {}",
        if args.restore {
            "↩ Restoring originals from:".bright_blue().bold()
        } else {
            "🔧 Patching from:".bright_blue().bold()
        },
        mods.as_str().bright_cyan().bold(),
        "into".bright_blue(),
        output.as_str().bright_white().bold()
    );

    let report = PatchOrchestrator::new(&setup.index, setup.encoder)
        .with_jobs(setup.jobs)
        .with_cancel_flag(setup.cancel)
        .run(
            &mods,
            mode,
            &SinkConfig::InPlace {
                archive_path: output,
            },
        )
        .map_err(CliError::from)?;

    print_report(&report)
}
