//! Mod tree traversal.
//!
//! A mod tree mirrors the container's logical layout:
//!
//! ```text
//! mods/
//!   fighter/mario/model/body/c00/
//!     model.numdlb
//!     def_mario_001_col.nutexb
//!   ui/message/
//!     msg_name+eu_fr.msbt        # regional variant of ui/message/msg_name.msbt
//! ```
//!
//! At every level subdirectories are visited (fully, in name order) before the
//! files of that level (in name order), so repeated runs over the same tree
//! report and name their outputs identically.

use crate::error::{Error, Result};
use crate::region::{split_region_tag, Region};
use camino::{Utf8Path, Utf8PathBuf};
use std::cmp::Ordering;
use walkdir::{DirEntry, WalkDir};

/// One replacement file discovered under the mod tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementEntry {
    /// Directory of the file relative to the mod root (empty at the root).
    pub relative_dir: Utf8PathBuf,
    /// File name as found on disk, region tag included.
    pub file_name: String,
    /// Container path used for slot lookup: region tag stripped, `/`
    /// separators, `;` mapped to `:`.
    pub logical_path: String,
    /// Region parsed from a `+<tag>` suffix, if any.
    pub region: Option<Region>,
    /// Absolute location of the file on disk.
    pub source_path: Utf8PathBuf,
    /// File length in bytes.
    pub file_len: u64,
}

impl ReplacementEntry {
    /// Read the file's bytes.
    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.source_path.as_std_path())?)
    }

    /// Path segments of [`relative_dir`](Self::relative_dir).
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.relative_dir.components().map(|c| c.as_str())
    }
}

/// Build the container path for a file at `relative_dir/file_name`.
///
/// Returns the logical path and the region parsed from the file name.
pub fn logical_path_for(relative_dir: &Utf8Path, file_name: &str) -> (String, Option<Region>) {
    let (name, region) = split_region_tag(file_name);

    let mut parts: Vec<&str> = relative_dir.components().map(|c| c.as_str()).collect();
    parts.push(&name);

    let logical = parts.join("/").replace('\\', "/").replace(';', ":");
    (logical, region)
}

/// Lazy, single-pass iterator over the replacement files of a mod tree.
///
/// Yields an error item (rather than stopping) when a directory entry cannot
/// be read; non-UTF-8 names are skipped with a warning.
pub struct ModTreeWalker {
    root: Utf8PathBuf,
    inner: walkdir::IntoIter,
}

impl ModTreeWalker {
    /// Start walking `root`. Fails if `root` is not a directory.
    pub fn new(root: &Utf8Path) -> Result<Self> {
        if !root.as_std_path().is_dir() {
            return Err(Error::InvalidModRoot(root.to_path_buf()));
        }

        let inner = WalkDir::new(root.as_std_path())
            .min_depth(1)
            .sort_by(dirs_first)
            .into_iter();

        Ok(Self {
            root: root.to_path_buf(),
            inner,
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn make_entry(&self, entry: DirEntry) -> Option<Result<ReplacementEntry>> {
        let path = match Utf8PathBuf::from_path_buf(entry.path().to_path_buf()) {
            Ok(p) => p,
            Err(p) => {
                tracing::warn!("Skipping non-UTF-8 path: {}", p.display());
                return None;
            }
        };

        let rel = path.strip_prefix(&self.root).unwrap_or(&path);
        let file_name = rel.file_name()?.to_string();
        let relative_dir = rel.parent().map(Utf8Path::to_path_buf).unwrap_or_default();

        let file_len = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => return Some(Err(e.into())),
        };

        let (logical_path, region) = logical_path_for(&relative_dir, &file_name);

        Some(Ok(ReplacementEntry {
            relative_dir,
            file_name,
            logical_path,
            region,
            source_path: path,
            file_len,
        }))
    }
}

impl Iterator for ModTreeWalker {
    type Item = Result<ReplacementEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };

            if entry.file_type().is_dir() {
                continue;
            }

            if let Some(item) = self.make_entry(entry) {
                return Some(item);
            }
        }
    }
}

/// Directories before files, then by file name.
fn dirs_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();
    b_dir.cmp(&a_dir).then_with(|| a.file_name().cmp(b.file_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn create_mod_tree() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();

        fs::create_dir_all(root.join("b_dir/nested")).unwrap();
        fs::create_dir_all(root.join("a_dir")).unwrap();
        fs::write(root.join("top.bin"), b"top").unwrap();
        fs::write(root.join("a_dir/one.bin"), b"one").unwrap();
        fs::write(root.join("b_dir/two+eu_fr.bin"), b"two").unwrap();
        fs::write(root.join("b_dir/nested/three.bin"), b"three!").unwrap();
        fs::write(root.join("aaa_first_file.bin"), b"x").unwrap();

        dir
    }

    fn utf8(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_walk_order_dirs_before_files() {
        let dir = create_mod_tree();
        let walker = ModTreeWalker::new(&utf8(&dir)).unwrap();

        let paths: Vec<String> = walker.map(|e| e.unwrap().logical_path).collect();
        assert_eq!(
            paths,
            vec![
                "a_dir/one.bin",
                "b_dir/nested/three.bin",
                "b_dir/two.bin",
                "aaa_first_file.bin",
                "top.bin",
            ]
        );
    }

    #[test]
    fn test_entry_fields() {
        let dir = create_mod_tree();
        let walker = ModTreeWalker::new(&utf8(&dir)).unwrap();

        let entry = walker
            .map(|e| e.unwrap())
            .find(|e| e.file_name == "two+eu_fr.bin")
            .unwrap();
        assert_eq!(entry.relative_dir, Utf8PathBuf::from("b_dir"));
        assert_eq!(entry.logical_path, "b_dir/two.bin");
        assert_eq!(entry.region, Some(Region::EuFr));
        assert_eq!(entry.file_len, 3);
        assert_eq!(entry.read().unwrap(), b"two");
        assert_eq!(entry.segments().collect::<Vec<_>>(), vec!["b_dir"]);
    }

    #[test]
    fn test_root_files_have_empty_dir() {
        let dir = create_mod_tree();
        let walker = ModTreeWalker::new(&utf8(&dir)).unwrap();

        let entry = walker
            .map(|e| e.unwrap())
            .find(|e| e.file_name == "top.bin")
            .unwrap();
        assert_eq!(entry.relative_dir, Utf8PathBuf::new());
        assert_eq!(entry.segments().count(), 0);
    }

    #[test]
    fn test_missing_root() {
        let dir = tempdir().unwrap();
        let missing = utf8(&dir).join("nope");
        assert!(matches!(
            ModTreeWalker::new(&missing),
            Err(Error::InvalidModRoot(_))
        ));
    }

    #[test]
    fn test_logical_path_normalization() {
        let (path, region) =
            logical_path_for(Utf8Path::new("prebuilt;/nro/release"), "lua2cpp_mario+jp_ja.nro");
        assert_eq!(path, "prebuilt:/nro/release/lua2cpp_mario.nro");
        assert_eq!(region, Some(Region::JpJa));

        let (path, region) = logical_path_for(Utf8Path::new(""), "model.bin");
        assert_eq!(path, "model.bin");
        assert_eq!(region, None);
    }
}
