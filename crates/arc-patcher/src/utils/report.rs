use crate::errors::CliError;
use crate::println_pad;
use arcpatch::{EntryOutcome, EntryReport, RunReport};
use colored::Colorize;
use miette::Result;

fn describe(entry: &EntryReport) -> String {
    match entry.region {
        Some(region) => format!("{} [{}]", entry.logical_path, region),
        None => entry.logical_path.clone(),
    }
}

/// Print one line per entry plus a summary. Fails if any entry failed.
pub fn print_report(report: &RunReport) -> Result<()> {
    println!();
    for entry in &report.entries {
        match &entry.outcome {
            EntryOutcome::Written { len, level } => {
                let offset = entry.slot.map(|s| s.offset).unwrap_or_default();
                let how = match level {
                    Some(level) => format!("level {}", level),
                    None => "stored".to_string(),
                };
                println_pad!(
                    "{} {} {} ({} bytes, {})",
                    "✓".bright_green(),
                    describe(entry).bright_white(),
                    format!("@ {:#x}", offset).bright_cyan(),
                    len,
                    how
                );
            }
            EntryOutcome::Failed(error) => {
                println_pad!(
                    "{} {} {}",
                    "✗".bright_red(),
                    describe(entry).bright_white(),
                    error.to_string().bright_red()
                );
            }
        }
    }

    println!();
    println_pad!(
        "{} {} written, {} failed in {:.2?}",
        format!("{:?}:", report.mode).bright_blue().bold(),
        report.written.to_string().bright_green().bold(),
        if report.failed > 0 {
            report.failed.to_string().bright_red().bold()
        } else {
            report.failed.to_string().normal()
        },
        report.elapsed
    );

    if report.failed > 0 {
        return Err(CliError::EntriesFailed {
            failed: report.failed,
            total: report.entries.len(),
        }
        .into());
    }
    Ok(())
}
