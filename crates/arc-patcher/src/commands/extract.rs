use super::{open_index, IndexArgs};
use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::load_config;
use arcpatch::extract_paths;
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;

pub struct ExtractEntriesArgs {
    pub index: IndexArgs,
    pub paths: Vec<String>,
    pub output_dir: String,
}

pub fn extract_entries(args: ExtractEntriesArgs) -> Result<()> {
    let cfg = load_config();
    let (archive, index) = open_index(&args.index, &cfg)?;
    let output_dir = Utf8PathBuf::from(&args.output_dir);

    println_pad!(
        "{} {}",
        "📦 Extracting from:".bright_blue().bold(),
        archive.as_str().bright_cyan().bold()
    );
    println_pad!(
        "{} {}",
        "📁 Extracting to:".bright_yellow(),
        output_dir.as_str().bright_white().bold()
    );
    println!();

    let reports = extract_paths(&index, &args.paths, &output_dir);
    let mut failed = 0;
    for report in &reports {
        match &report.result {
            Ok(len) => println_pad!(
                "{} {} ({} bytes)",
                "✓".bright_green(),
                report.path.bright_white(),
                len
            ),
            Err(e) => {
                failed += 1;
                println_pad!(
                    "{} {} {}",
                    "✗".bright_red(),
                    report.path.bright_white(),
                    e.to_string().bright_red()
                );
            }
        }
    }

    if failed > 0 {
        return Err(CliError::EntriesFailed {
            failed,
            total: reports.len(),
        }
        .into());
    }

    println!();
    println_pad!("{}", "✅ Extraction complete!".bright_green().bold());
    Ok(())
}
