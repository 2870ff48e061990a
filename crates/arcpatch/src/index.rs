//! Archive slot lookup.
//!
//! Parsing the container's own table of contents is outside this crate. The
//! orchestrator only needs the [`ArchiveIndex`] contract: turn a logical path
//! (plus an optional region) into a [`SlotDescriptor`], and read a slot's
//! bytes back out of the container.
//!
//! [`ManifestIndex`] is the implementation shipped with the crate. It reads a
//! JSON slot manifest exported from the container's table of contents:
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": [
//!     { "path": "ui/param/database/ui_chara_db.prc", "offset": 4096, "encodedSize": 2048, "decodedSize": 8192 },
//!     { "path": "ui/message/msg_name.msbt", "region": "eu_fr", "offset": 12288, "encodedSize": 900, "decodedSize": 3000 }
//!   ]
//! }
//! ```

use crate::error::{Error, Result};
use crate::region::Region;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

/// Location and size budget of one entry inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotDescriptor {
    /// Byte offset of the slot. `0` is reserved to mean "not found".
    pub offset: u64,
    /// Exact number of bytes the encoded replacement must occupy.
    pub encoded_size: u32,
    /// Maximum decoded size the container allows for this entry.
    pub decoded_size: u32,
    /// Whether the slot is specific to the requested region.
    pub is_regional: bool,
}

impl SlotDescriptor {
    /// `false` for the reserved offset `0`.
    pub fn is_valid(&self) -> bool {
        self.offset != 0
    }

    /// Stored slots hold their content uncompressed.
    pub fn is_stored(&self) -> bool {
        self.encoded_size == self.decoded_size
    }
}

/// Lookup service over a container's table of contents.
///
/// Implementations must be deterministic for a given container snapshot.
pub trait ArchiveIndex {
    /// Resolve a logical path. When `region` is given, the regional variant is
    /// requested; implementations report through
    /// [`SlotDescriptor::is_regional`] whether one actually exists.
    fn resolve(&self, logical_path: &str, region: Option<Region>) -> Option<SlotDescriptor>;

    /// Read and decode the entry's content.
    fn read_logical(&self, logical_path: &str, region: Option<Region>) -> Result<Vec<u8>>;

    /// Read the entry's bytes exactly as stored in the container.
    fn read_encoded_raw(&self, logical_path: &str, region: Option<Region>) -> Result<Vec<u8>>;
}

/// JSON slot manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotManifest {
    /// Schema version (current: `1`).
    pub version: u32,
    pub entries: Vec<ManifestEntry>,
}

/// One slot in a [`SlotManifest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    pub offset: u64,
    pub encoded_size: u32,
    pub decoded_size: u32,
}

type SlotKey = (String, Option<Region>);

/// [`ArchiveIndex`] backed by a [`SlotManifest`] and the container file.
pub struct ManifestIndex {
    archive_path: Utf8PathBuf,
    slots: HashMap<SlotKey, SlotDescriptor>,
}

impl ManifestIndex {
    /// Load a manifest from disk and bind it to `archive_path`.
    pub fn load(manifest_path: &Utf8Path, archive_path: impl Into<Utf8PathBuf>) -> Result<Self> {
        let contents = std::fs::read_to_string(manifest_path.as_std_path())?;
        let manifest: SlotManifest = serde_json::from_str(&contents)?;
        let index = Self::from_manifest(manifest, archive_path);

        tracing::info!(
            "Loaded slot manifest {} ({} slots)",
            manifest_path,
            index.len()
        );
        Ok(index)
    }

    pub fn from_manifest(manifest: SlotManifest, archive_path: impl Into<Utf8PathBuf>) -> Self {
        let slots = manifest
            .entries
            .into_iter()
            .map(|entry| {
                let key = (normalize_key(&entry.path), entry.region);
                let slot = SlotDescriptor {
                    offset: entry.offset,
                    encoded_size: entry.encoded_size,
                    decoded_size: entry.decoded_size,
                    is_regional: entry.region.is_some(),
                };
                (key, slot)
            })
            .collect();

        Self {
            archive_path: archive_path.into(),
            slots,
        }
    }

    pub fn archive_path(&self) -> &Utf8Path {
        &self.archive_path
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn require(&self, logical_path: &str, region: Option<Region>) -> Result<SlotDescriptor> {
        self.resolve(logical_path, region)
            .filter(SlotDescriptor::is_valid)
            .ok_or_else(|| Error::NotFound {
                path: logical_path.to_string(),
            })
    }
}

impl ArchiveIndex for ManifestIndex {
    fn resolve(&self, logical_path: &str, region: Option<Region>) -> Option<SlotDescriptor> {
        let key = normalize_key(logical_path);

        if region.is_some() {
            if let Some(slot) = self.slots.get(&(key.clone(), region)) {
                return Some(*slot);
            }
        }

        self.slots.get(&(key, None)).map(|slot| SlotDescriptor {
            is_regional: false,
            ..*slot
        })
    }

    fn read_logical(&self, logical_path: &str, region: Option<Region>) -> Result<Vec<u8>> {
        let slot = self.require(logical_path, region)?;
        let raw = read_slot(&self.archive_path, &slot)?;
        if slot.is_stored() {
            return Ok(raw);
        }
        zstd::stream::decode_all(raw.as_slice()).map_err(|e| Error::Compression(e.to_string()))
    }

    fn read_encoded_raw(&self, logical_path: &str, region: Option<Region>) -> Result<Vec<u8>> {
        let slot = self.require(logical_path, region)?;
        read_slot(&self.archive_path, &slot)
    }
}

/// Manifest keys are matched case-insensitively with `/` separators.
fn normalize_key(path: &str) -> String {
    path.replace('\\', "/").to_ascii_lowercase()
}

fn read_slot(archive_path: &Utf8Path, slot: &SlotDescriptor) -> Result<Vec<u8>> {
    let mut file = std::fs::File::open(archive_path.as_std_path())?;
    file.seek(SeekFrom::Start(slot.offset))?;
    let mut buf = vec![0u8; slot.encoded_size as usize];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn entry(path: &str, region: Option<Region>, offset: u64, enc: u32, dec: u32) -> ManifestEntry {
        ManifestEntry {
            path: path.to_string(),
            region,
            offset,
            encoded_size: enc,
            decoded_size: dec,
        }
    }

    fn manifest() -> SlotManifest {
        SlotManifest {
            version: 1,
            entries: vec![
                entry("ui/msg/title.msbt", None, 0x100, 16, 64),
                entry("ui/msg/title.msbt", Some(Region::EuFr), 0x200, 32, 64),
                entry("sound/bgm/menu.nus3audio", None, 0x300, 8, 8),
            ],
        }
    }

    #[test]
    fn test_resolve_plain() {
        let index = ManifestIndex::from_manifest(manifest(), "data.arc");
        let slot = index.resolve("ui/msg/title.msbt", None).unwrap();
        assert_eq!(slot.offset, 0x100);
        assert!(!slot.is_regional);
    }

    #[test]
    fn test_resolve_regional_variant() {
        let index = ManifestIndex::from_manifest(manifest(), "data.arc");
        let slot = index
            .resolve("ui/msg/title.msbt", Some(Region::EuFr))
            .unwrap();
        assert_eq!(slot.offset, 0x200);
        assert_eq!(slot.encoded_size, 32);
        assert!(slot.is_regional);
    }

    #[test]
    fn test_resolve_region_falls_back() {
        let index = ManifestIndex::from_manifest(manifest(), "data.arc");
        let slot = index
            .resolve("ui/msg/title.msbt", Some(Region::JpJa))
            .unwrap();
        assert_eq!(slot.offset, 0x100);
        assert!(!slot.is_regional);
    }

    #[test]
    fn test_resolve_case_and_separators() {
        let index = ManifestIndex::from_manifest(manifest(), "data.arc");
        assert!(index.resolve("UI\\msg\\Title.msbt", None).is_some());
        assert!(index.resolve("ui/msg/missing.msbt", None).is_none());
    }

    #[test]
    fn test_read_slots_from_container() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let archive = root.join("data.arc");

        let payload = b"menu theme pcm data ".repeat(10);
        let frame = zstd::bulk::compress(&payload, 3).unwrap();

        let mut container = vec![0u8; 0x1000];
        container[0x300..0x308].copy_from_slice(b"RAWBYTES");
        container[0x400..0x400 + frame.len()].copy_from_slice(&frame);
        fs::write(&archive, &container).unwrap();

        let mut m = manifest();
        m.entries.push(entry(
            "sound/bgm/title.nus3audio",
            None,
            0x400,
            frame.len() as u32,
            payload.len() as u32,
        ));
        let manifest_path = root.join("slots.json");
        fs::write(&manifest_path, serde_json::to_string_pretty(&m).unwrap()).unwrap();

        let index = ManifestIndex::load(&manifest_path, archive).unwrap();
        assert_eq!(index.len(), 4);

        assert_eq!(
            index.read_encoded_raw("sound/bgm/menu.nus3audio", None).unwrap(),
            b"RAWBYTES"
        );
        assert_eq!(
            index.read_logical("sound/bgm/menu.nus3audio", None).unwrap(),
            b"RAWBYTES"
        );
        assert_eq!(
            index.read_logical("sound/bgm/title.nus3audio", None).unwrap(),
            payload
        );
        assert!(matches!(
            index.read_logical("sound/bgm/none.nus3audio", None),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_manifest_format() {
        let json = serde_json::to_string(&manifest()).unwrap();
        assert!(json.contains("\"encodedSize\":16"));
        assert!(json.contains("\"region\":\"eu_fr\""));
        // region-less entries omit the field
        assert_eq!(json.matches("\"region\"").count(), 1);
    }
}
