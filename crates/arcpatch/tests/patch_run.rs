use arcpatch::{
    EncoderConfig, Error, ExactSizeEncoder, ManifestEntry, ManifestIndex, PatchOrchestrator,
    Region, RunMode, SinkConfig, SlotManifest, ZstdCodec,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

const CONTAINER_LEN: usize = 0x10000;

struct Fixture {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("mods")).unwrap();
        Self { _dir: dir, root }
    }

    fn mods(&self) -> Utf8PathBuf {
        self.root.join("mods")
    }

    fn patched(&self) -> Utf8PathBuf {
        self.root.join("data.patched.arc")
    }

    fn add_mod_file(&self, path: &str, data: &[u8]) {
        let full = self.mods().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, data).unwrap();
    }

    /// Write a container filled with `0xCC` plus the given original slot
    /// contents, and a working copy of it.
    fn container(&self, originals: &[(u64, &[u8])]) -> Utf8PathBuf {
        let mut data = vec![0xCCu8; CONTAINER_LEN];
        for (offset, bytes) in originals {
            let start = *offset as usize;
            data[start..start + bytes.len()].copy_from_slice(bytes);
        }
        let path = self.root.join("data.arc");
        fs::write(&path, &data).unwrap();
        fs::copy(&path, self.patched()).unwrap();
        path
    }

    fn index(&self, archive: &Utf8Path, entries: Vec<ManifestEntry>) -> ManifestIndex {
        let manifest_path = self.root.join("slots.json");
        let manifest = SlotManifest {
            version: 1,
            entries,
        };
        fs::write(&manifest_path, serde_json::to_vec(&manifest).unwrap()).unwrap();
        ManifestIndex::load(&manifest_path, archive).unwrap()
    }
}

fn slot(path: &str, offset: u64, encoded_size: u32, decoded_size: u32) -> ManifestEntry {
    ManifestEntry {
        path: path.to_string(),
        region: None,
        offset,
        encoded_size,
        decoded_size,
    }
}

fn encoder() -> ExactSizeEncoder {
    ExactSizeEncoder::new(ZstdCodec, EncoderConfig::default())
}

fn texture_bytes(len: usize) -> Vec<u8> {
    b"RGBA8 mip level pixel run "
        .iter()
        .cycle()
        .take(len)
        .enumerate()
        .map(|(i, &b)| b.wrapping_add((i / 256) as u8))
        .collect()
}

#[test]
fn patch_in_place_writes_exact_slot() {
    let fx = Fixture::new();
    let icon = texture_bytes(4096);
    fx.add_mod_file("textures/icon.bin", &icon);

    let archive = fx.container(&[]);
    let index = fx.index(&archive, vec![slot("textures/icon.bin", 0x2000, 2048, 8192)]);

    let report = PatchOrchestrator::new(&index, encoder())
        .run(
            &fx.mods(),
            RunMode::Patch,
            &SinkConfig::InPlace {
                archive_path: fx.patched(),
            },
        )
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.entries);
    assert_eq!(report.written, 1);

    let patched = fs::read(fx.patched()).unwrap();
    assert_eq!(patched.len(), CONTAINER_LEN);
    assert!(patched[..0x2000].iter().all(|&b| b == 0xCC));
    assert!(patched[0x2000 + 2048..].iter().all(|&b| b == 0xCC));

    let block = &patched[0x2000..0x2000 + 2048];
    assert_eq!(zstd::stream::decode_all(block).unwrap(), icon);

    // The source container is never touched.
    assert!(fs::read(&archive).unwrap().iter().all(|&b| b == 0xCC));
}

#[test]
fn duplicate_offset_keeps_first_write() {
    let fx = Fixture::new();
    let first = texture_bytes(3000);
    let second = vec![0x55u8; 3000];
    fx.add_mod_file("a/first.bin", &first);
    fx.add_mod_file("b/second.bin", &second);

    let archive = fx.container(&[]);
    let index = fx.index(
        &archive,
        vec![
            slot("a/first.bin", 0x4000, 2000, 4096),
            slot("b/second.bin", 0x4000, 2000, 4096),
        ],
    );

    let report = PatchOrchestrator::new(&index, encoder())
        .run(
            &fx.mods(),
            RunMode::Patch,
            &SinkConfig::InPlace {
                archive_path: fx.patched(),
            },
        )
        .unwrap();

    assert!(report.entries[0].is_written());
    assert!(matches!(
        report.entries[1].error(),
        Some(Error::DuplicateOffset { offset: 0x4000 })
    ));

    let patched = fs::read(fx.patched()).unwrap();
    let block = &patched[0x4000..0x4000 + 2000];
    assert_eq!(zstd::stream::decode_all(block).unwrap(), first);
}

#[test]
fn oversized_file_is_rejected_without_write() {
    let fx = Fixture::new();
    fx.add_mod_file("sound/voice.bin", &vec![3u8; 9000]);

    let archive = fx.container(&[]);
    let index = fx.index(&archive, vec![slot("sound/voice.bin", 0x6000, 1024, 8192)]);

    let report = PatchOrchestrator::new(&index, encoder())
        .run(
            &fx.mods(),
            RunMode::Patch,
            &SinkConfig::InPlace {
                archive_path: fx.patched(),
            },
        )
        .unwrap();

    assert!(matches!(
        report.entries[0].error(),
        Some(Error::DecodedTooLarge {
            size: 9000,
            limit: 8192
        })
    ));
    assert_eq!(fs::read(fx.patched()).unwrap(), fs::read(&archive).unwrap());
}

#[test]
fn regional_file_targets_regional_slot() {
    let fx = Fixture::new();
    let msg = texture_bytes(2500);
    fx.add_mod_file("ui/message/msg_name+eu_fr.msbt", &msg);

    let archive = fx.container(&[]);
    let mut regional = slot("ui/message/msg_name.msbt", 0x8000, 1500, 4096);
    regional.region = Some(Region::EuFr);
    let index = fx.index(
        &archive,
        vec![slot("ui/message/msg_name.msbt", 0x7000, 1500, 4096), regional],
    );

    let report = PatchOrchestrator::new(&index, encoder())
        .run(
            &fx.mods(),
            RunMode::Patch,
            &SinkConfig::InPlace {
                archive_path: fx.patched(),
            },
        )
        .unwrap();

    let entry = &report.entries[0];
    assert_eq!(entry.logical_path, "ui/message/msg_name.msbt");
    assert_eq!(entry.region, Some(Region::EuFr));
    assert_eq!(entry.slot.unwrap().offset, 0x8000);

    let patched = fs::read(fx.patched()).unwrap();
    assert!(patched[0x7000..0x7000 + 1500].iter().all(|&b| b == 0xCC));
    assert_eq!(
        zstd::stream::decode_all(&patched[0x8000..0x8000 + 1500]).unwrap(),
        msg
    );
}

#[test]
fn dump_mirrors_tree_with_hex_names() {
    let fx = Fixture::new();
    fx.add_mod_file("fighter/mario/body.bin", &texture_bytes(2000));
    fx.add_mod_file("top.bin", &texture_bytes(1000));

    let archive = fx.container(&[]);
    let index = fx.index(
        &archive,
        vec![
            slot("fighter/mario/body.bin", 0x1a00, 900, 4096),
            slot("top.bin", 0x3f0, 600, 4096),
        ],
    );

    let dump = fx.root.join("dump");
    fs::create_dir_all(&dump).unwrap();

    let report = PatchOrchestrator::new(&index, encoder())
        .run(
            &fx.mods(),
            RunMode::DumpOnly,
            &SinkConfig::Folder {
                root: dump.clone(),
                single_folder: false,
            },
        )
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.entries);

    let body = fs::read(dump.join("fighter/mario/1a00_body.bin")).unwrap();
    assert_eq!(body.len(), 900);
    assert_eq!(fs::read(dump.join("3f0_top.bin")).unwrap().len(), 600);

    // Dumping never touches the working copy.
    assert_eq!(fs::read(fx.patched()).unwrap(), fs::read(&archive).unwrap());
}

#[test]
fn dump_rejects_in_place_sink() {
    let fx = Fixture::new();
    let archive = fx.container(&[]);
    let index = fx.index(&archive, vec![]);

    let err = PatchOrchestrator::new(&index, encoder())
        .run(
            &fx.mods(),
            RunMode::DumpOnly,
            &SinkConfig::InPlace {
                archive_path: fx.patched(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::ModeSinkMismatch));
}

#[test]
fn restore_undoes_patch() {
    let fx = Fixture::new();
    let original = zstd::bulk::compress(&texture_bytes(3000), 3).unwrap();
    let replacement = vec![0x11u8; 3000];
    fx.add_mod_file("stage/floor.bin", &replacement);

    let archive = fx.container(&[(0x9000, &original)]);
    let index = fx.index(
        &archive,
        vec![slot("stage/floor.bin", 0x9000, original.len() as u32, 4096)],
    );
    let sink = SinkConfig::InPlace {
        archive_path: fx.patched(),
    };

    let orchestrator = PatchOrchestrator::new(&index, encoder());
    orchestrator
        .run(&fx.mods(), RunMode::Patch, &sink)
        .unwrap();
    assert_ne!(fs::read(fx.patched()).unwrap(), fs::read(&archive).unwrap());

    let report = orchestrator
        .run(&fx.mods(), RunMode::RestoreOriginal, &sink)
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(fs::read(fx.patched()).unwrap(), fs::read(&archive).unwrap());
}

#[test]
fn missing_working_copy_fails_run() {
    let fx = Fixture::new();
    let archive = fx.container(&[]);
    let index = fx.index(&archive, vec![]);

    let err = PatchOrchestrator::new(&index, encoder())
        .run(
            &fx.mods(),
            RunMode::Patch,
            &SinkConfig::InPlace {
                archive_path: fx.root.join("nope.arc"),
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Sink(_)));
}
