use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    dump_blocks, extract_entries, patch_archive, remote_mkdir, reset_config, show_config,
    upload_blocks, DumpBlocksArgs, EncodeArgs, ExtractEntriesArgs, IndexArgs, PatchArchiveArgs,
    RemoteMkdirArgs, UploadBlocksArgs,
};
use miette::{IntoDiagnostic, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inject a mod folder into a patched copy of the archive
    Patch {
        /// Mod folder mirroring the archive layout
        mods: String,

        /// The original archive
        #[arg(short, long)]
        archive: Option<String>,

        /// JSON slot manifest of the archive
        #[arg(short, long)]
        manifest: Option<String>,

        /// Patched copy to write into (created from the archive if missing)
        #[arg(short, long)]
        output: Option<String>,

        /// Write the original bytes back for every file in the mod folder
        #[arg(long)]
        restore: bool,

        /// First compression level to try (1-22)
        #[arg(long)]
        level_start: Option<i32>,

        /// Last compression level to try (1-22)
        #[arg(long)]
        level_end: Option<i32>,

        /// Number of files to encode concurrently
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Encode a mod folder into per-slot files named by offset
    Dump {
        /// Mod folder mirroring the archive layout
        mods: String,

        /// The original archive
        #[arg(short, long)]
        archive: Option<String>,

        /// JSON slot manifest of the archive
        #[arg(short, long)]
        manifest: Option<String>,

        /// Existing directory to dump into
        #[arg(short, long)]
        output_dir: String,

        /// Write every block directly into the output directory
        #[arg(long)]
        single_folder: bool,

        /// Dump the archive's original bytes instead of the mod files
        #[arg(long)]
        restore: bool,

        #[arg(long)]
        level_start: Option<i32>,

        #[arg(long)]
        level_end: Option<i32>,

        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Encode a mod folder and upload the blocks to a remote store
    Upload {
        /// Mod folder mirroring the archive layout
        mods: String,

        #[arg(short, long)]
        archive: Option<String>,

        #[arg(short, long)]
        manifest: Option<String>,

        /// Base URL of the remote store
        #[arg(long)]
        host: Option<String>,

        /// Remote folder to upload under
        #[arg(long)]
        remote_root: Option<String>,

        #[arg(long)]
        single_folder: bool,

        /// Upload the archive's original bytes instead of the mod files
        #[arg(long)]
        restore: bool,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        #[arg(long)]
        level_start: Option<i32>,

        #[arg(long)]
        level_end: Option<i32>,

        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Extract decoded entries from the archive
    Extract {
        /// Archive paths to extract (e.g. ui/message/msg_name+eu_fr.msbt)
        #[arg(required = true)]
        paths: Vec<String>,

        #[arg(short, long)]
        archive: Option<String>,

        #[arg(short, long)]
        manifest: Option<String>,

        /// The directory to extract into
        #[arg(short, long, default_value = "extracted")]
        output_dir: String,
    },
    /// Create a directory (and all its parents) on the remote store
    RemoteMkdir {
        /// Remote path, e.g. SaltySD/mods/my_mod
        path: String,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Show or reset config.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Overwrite config.toml with defaults
    Reset,
}

fn parse_args() -> Result<Args> {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).into_diagnostic()
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "arc_patcher=info,arcpatch=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Ctrl+C stops the run after the entry in flight.
fn install_cancel_handler() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupted, finishing current entry...");
        flag.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!("Failed to set Ctrl+C handler: {}", e);
    }
    cancel
}

fn main() -> Result<()> {
    init_logging();

    let args = parse_args()?;
    let cancel = install_cancel_handler();

    match args.command {
        Commands::Patch {
            mods,
            archive,
            manifest,
            output,
            restore,
            level_start,
            level_end,
            jobs,
        } => patch_archive(
            PatchArchiveArgs {
                mods,
                index: IndexArgs { archive, manifest },
                output,
                restore,
                encode: EncodeArgs {
                    level_start,
                    level_end,
                    jobs,
                },
            },
            cancel,
        ),
        Commands::Dump {
            mods,
            archive,
            manifest,
            output_dir,
            single_folder,
            restore,
            level_start,
            level_end,
            jobs,
        } => dump_blocks(
            DumpBlocksArgs {
                mods,
                index: IndexArgs { archive, manifest },
                output_dir,
                single_folder,
                restore,
                encode: EncodeArgs {
                    level_start,
                    level_end,
                    jobs,
                },
            },
            cancel,
        ),
        Commands::Upload {
            mods,
            archive,
            manifest,
            host,
            remote_root,
            single_folder,
            restore,
            timeout,
            level_start,
            level_end,
            jobs,
        } => upload_blocks(
            UploadBlocksArgs {
                mods,
                index: IndexArgs { archive, manifest },
                host,
                remote_root,
                single_folder,
                restore,
                timeout_secs: timeout,
                encode: EncodeArgs {
                    level_start,
                    level_end,
                    jobs,
                },
            },
            cancel,
        ),
        Commands::Extract {
            paths,
            archive,
            manifest,
            output_dir,
        } => extract_entries(ExtractEntriesArgs {
            index: IndexArgs { archive, manifest },
            paths,
            output_dir,
        }),
        Commands::RemoteMkdir {
            path,
            host,
            timeout,
        } => remote_mkdir(RemoteMkdirArgs {
            host,
            path,
            timeout_secs: timeout,
        }),
        Commands::Config { action } => match action {
            ConfigAction::Show => show_config(),
            ConfigAction::Reset => reset_config(),
        },
    }
}
