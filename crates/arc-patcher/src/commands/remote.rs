use super::{remote_host, remote_timeout};
use crate::println_pad;
use crate::utils::config::load_config;
use arcpatch::{HttpRemoteStore, RemoteUploader};
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

pub struct RemoteMkdirArgs {
    pub host: Option<String>,
    pub path: String,
    pub timeout_secs: Option<u64>,
}

/// Create every prefix of a remote directory path. Individual failures are
/// reported but do not stop the chain.
pub fn remote_mkdir(args: RemoteMkdirArgs) -> Result<()> {
    let cfg = load_config();
    let host = remote_host(args.host, &cfg)?;
    let store = HttpRemoteStore::new(host.clone(), remote_timeout(args.timeout_secs, &cfg))
        .into_diagnostic()?;

    println_pad!(
        "{} {}",
        "📡 Creating directories on:".bright_blue().bold(),
        host.bright_cyan().bold()
    );

    let mut uploader = RemoteUploader::new(store, "", false);
    for (path, result) in uploader.make_dir_chain(&args.path) {
        match result {
            Ok(()) => println_pad!("{} {}", "✓".bright_green(), path.bright_white()),
            Err(e) => println_pad!(
                "{} {} {}",
                "•".bright_yellow(),
                path.bright_white(),
                e.to_string().bright_yellow()
            ),
        }
    }
    Ok(())
}
