use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Archive not found: {path}")]
    #[diagnostic(
        code(archive::not_found),
        help("Pass --archive or set archive_path in config.toml")
    )]
    ArchiveNotFound { path: Utf8PathBuf },

    #[error("Slot manifest not found: {path}")]
    #[diagnostic(
        code(manifest::not_found),
        help("Pass --manifest or set manifest_path in config.toml")
    )]
    ManifestNotFound { path: Utf8PathBuf },

    #[error("Missing setting: {name}")]
    #[diagnostic(
        code(config::missing_setting),
        help("Pass --{flag} or set {name} in config.toml")
    )]
    MissingSetting { name: &'static str, flag: &'static str },

    #[error("Mod directory not found: {path}")]
    #[diagnostic(
        code(mods::not_found),
        help("Point at the folder that mirrors the archive layout (e.g. mods/fighter/...)")
    )]
    ModDirNotFound { path: Utf8PathBuf },

    #[error("Output archive is the same as the input archive: {path}")]
    #[diagnostic(
        code(patch::output_is_input),
        help("Patching happens on a copy; choose a different --output path")
    )]
    OutputIsInput { path: Utf8PathBuf },

    #[error("Nothing to restore: {path} does not exist")]
    #[diagnostic(
        code(patch::restore_without_output),
        help("Restore only works on a previously patched copy of the archive")
    )]
    RestoreWithoutOutput { path: Utf8PathBuf },

    #[error("Dump directory not found: {path}")]
    #[diagnostic(
        code(dump::directory_missing),
        help("Create the directory first; dumps never create their root folder")
    )]
    DumpDirNotFound { path: Utf8PathBuf },

    #[error("{failed} of {total} files failed")]
    #[diagnostic(
        code(run::entries_failed),
        help("See the report above for the reason of each failure")
    )]
    EntriesFailed { failed: usize, total: usize },

    #[error(transparent)]
    #[diagnostic(code(arcpatch::error))]
    Patch(#[from] arcpatch::Error),

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn missing_setting(name: &'static str, flag: &'static str) -> Self {
        Self::MissingSetting { name, flag }
    }
}
