//! Exact-size zstd encoding.
//!
//! Every entry in the container occupies a slot whose encoded length is fixed.
//! [`ExactSizeEncoder`] compresses a replacement at successive levels until the
//! output is small enough that the remaining gap can be filled with empty blocks
//! (see [`crate::frame`]), then splices that padding in so the result is exactly
//! the slot size and still decodes to the original bytes.

use crate::error::{Error, Result};
use crate::frame::{is_paddable, splice_padding};
use crate::index::SlotDescriptor;
use std::io::Write;

/// Lowest accepted compression level.
pub const MIN_LEVEL: i32 = 1;
/// Highest accepted compression level.
pub const MAX_LEVEL: i32 = 22;

/// Black-box compressor used by the level search.
///
/// Implementations must be deterministic: the same input and level always
/// produce the same bytes.
pub trait BlockCodec: Send + Sync {
    fn compress(&self, data: &[u8], level: i32) -> Result<Vec<u8>>;
}

/// Streaming zstd compressor (no pledged size, so frames carry a window
/// descriptor rather than a content size).
#[derive(Debug, Clone, Copy, Default)]
pub struct ZstdCodec;

impl BlockCodec for ZstdCodec {
    fn compress(&self, data: &[u8], level: i32) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut encoder = zstd::Encoder::new(&mut out, level)
            .map_err(|e| Error::Compression(e.to_string()))?;
        encoder
            .write_all(data)
            .map_err(|e| Error::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| Error::Compression(e.to_string()))?;
        Ok(out)
    }
}

/// Compression level range searched by the encoder.
///
/// Levels are tried from `level_start` to `level_end` inclusive, in whichever
/// direction that implies. The default walks from 22 down to 1 so the densest
/// output that still fits is found first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    level_start: i32,
    level_end: i32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            level_start: MAX_LEVEL,
            level_end: MIN_LEVEL,
        }
    }
}

impl EncoderConfig {
    /// Create a level range, rejecting levels outside `1..=22`.
    pub fn new(level_start: i32, level_end: i32) -> Result<Self> {
        for level in [level_start, level_end] {
            if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
                return Err(Error::InvalidLevel(level));
            }
        }
        Ok(Self {
            level_start,
            level_end,
        })
    }

    pub fn level_start(&self) -> i32 {
        self.level_start
    }

    pub fn level_end(&self) -> i32 {
        self.level_end
    }

    /// Levels in search order.
    pub fn levels(&self) -> Vec<i32> {
        if self.level_start <= self.level_end {
            (self.level_start..=self.level_end).collect()
        } else {
            (self.level_end..=self.level_start).rev().collect()
        }
    }
}

/// Progress reported while searching for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeEvent {
    /// One compression attempt finished. `pad` is negative when the output
    /// was already larger than the target.
    Attempt {
        level: i32,
        compressed_len: usize,
        pad: i64,
    },
    /// The attempt at `level` was padded and accepted.
    Accepted { level: i32, pad: usize },
}

/// Encoded bytes whose length equals the slot's encoded size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlock {
    bytes: Vec<u8>,
    level: Option<i32>,
}

impl EncodedBlock {
    /// Wrap bytes stored without compression.
    pub fn stored(bytes: Vec<u8>) -> Self {
        Self { bytes, level: None }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Compression level that produced the block, `None` if stored as-is.
    pub fn level(&self) -> Option<i32> {
        self.level
    }
}

/// Searches compression levels and pads the result to an exact size.
pub struct ExactSizeEncoder<C: BlockCodec = ZstdCodec> {
    codec: C,
    config: EncoderConfig,
}

impl Default for ExactSizeEncoder<ZstdCodec> {
    fn default() -> Self {
        Self::new(ZstdCodec, EncoderConfig::default())
    }
}

impl<C: BlockCodec> ExactSizeEncoder<C> {
    pub fn new(codec: C, config: EncoderConfig) -> Self {
        Self { codec, config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode `input` to exactly `target` bytes.
    ///
    /// When `input` already has the target length it is returned unchanged.
    pub fn encode(&self, input: &[u8], target: u32) -> Result<EncodedBlock> {
        self.encode_observed(input, target, &|_| {})
    }

    /// [`encode`](Self::encode) with a callback for each level attempt.
    pub fn encode_observed(
        &self,
        input: &[u8],
        target: u32,
        on_event: &dyn Fn(EncodeEvent),
    ) -> Result<EncodedBlock> {
        if input.len() as u64 == u64::from(target) {
            return Ok(EncodedBlock::stored(input.to_vec()));
        }
        self.compress_to_size(input, target, on_event)
    }

    /// Encode `input` for a resolved slot.
    ///
    /// Stored slots (encoded size equal to decoded size) take the file verbatim
    /// and require it to be exactly that long. Every other slot expects a zstd
    /// frame, so the level search always runs.
    pub fn encode_for_slot(
        &self,
        input: &[u8],
        slot: &SlotDescriptor,
        on_event: &dyn Fn(EncodeEvent),
    ) -> Result<EncodedBlock> {
        if slot.is_stored() {
            if input.len() as u64 != u64::from(slot.encoded_size) {
                return Err(Error::SizeMismatch {
                    expected: slot.encoded_size,
                    actual: input.len() as u64,
                });
            }
            return Ok(EncodedBlock::stored(input.to_vec()));
        }
        self.compress_to_size(input, slot.encoded_size, on_event)
    }

    fn compress_to_size(
        &self,
        input: &[u8],
        target: u32,
        on_event: &dyn Fn(EncodeEvent),
    ) -> Result<EncodedBlock> {
        let levels = self.config.levels();

        for &level in &levels {
            let compressed = self.codec.compress(input, level)?;
            let pad = i64::from(target) - compressed.len() as i64;

            tracing::debug!(
                "level={} compressed={} target={} pad={}",
                level,
                compressed.len(),
                target,
                pad
            );
            on_event(EncodeEvent::Attempt {
                level,
                compressed_len: compressed.len(),
                pad,
            });

            if !is_paddable(pad) {
                continue;
            }

            let pad = pad as usize;
            let padded = splice_padding(&compressed, pad)?;
            if padded.len() != target as usize {
                return Err(Error::EncodeInternalError {
                    expected: target,
                    actual: padded.len(),
                });
            }

            on_event(EncodeEvent::Accepted { level, pad });
            return Ok(EncodedBlock {
                bytes: padded,
                level: Some(level),
            });
        }

        Err(Error::EncodeInfeasible {
            target,
            levels_tried: levels.len(),
        })
    }
}
