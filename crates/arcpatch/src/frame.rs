//! Zstd frame header inspection and padding splices.
//!
//! Only the fixed frame header is ever parsed here. Padding is inserted right
//! after it, as a run of empty non-final blocks, which every conforming decoder
//! skips without producing output:
//!
//! - three zero bytes are an empty raw block header (`last=0, type=raw, size=0`);
//! - `[2, 0, 0, 0]` is an empty RLE block (3-byte header plus its single byte).
//!
//! Any padding amount except `1`, `2` and `5` can be expressed as a combination
//! of those two shapes.

use crate::error::{Error, Result};

/// Magic number that opens every zstd frame.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Minimum bytes needed to read the frame header descriptor.
pub const MIN_FRAME_LEN: usize = 5;

/// Empty RLE block: header `0x000002` (non-final, RLE, size 0) plus the RLE byte.
const EMPTY_RLE_BLOCK: [u8; 4] = [2, 0, 0, 0];

/// Padding amounts the block shapes above cannot express.
pub const UNPADDABLE: [i64; 3] = [1, 2, 5];

/// Return the index of the first byte after the frame header.
///
/// Reads the Frame_Header_Descriptor at index 4 and adds up the optional
/// window descriptor, dictionary ID and frame content size fields it announces.
/// This is the only place extra blocks can be spliced in without touching the
/// compressed payload.
pub fn locate_content_start(encoded: &[u8]) -> Result<usize> {
    if encoded.len() < MIN_FRAME_LEN {
        return Err(Error::MalformedFrame { len: encoded.len() });
    }

    let descriptor = encoded[4];

    // Frame_Content_Size_flag selects the base; flag 0 with single segment still
    // carries one byte (either the 1-byte FCS or the window descriptor).
    let mut start = if descriptor >= 0xC0 {
        13
    } else if descriptor >= 0x80 {
        9
    } else if descriptor >= 0x40 {
        7
    } else {
        6
    };

    // Window descriptor present unless Single_Segment_flag is set
    if start > 6 && (descriptor & 0x3F) < 0x20 {
        start += 1;
    }

    start += match descriptor & 0x3 {
        1 => 1,
        2 => 2,
        3 => 4,
        _ => 0,
    };

    if start > encoded.len() {
        return Err(Error::MalformedFrame { len: encoded.len() });
    }

    Ok(start)
}

/// Whether `pad` extra bytes can be absorbed by [`padding_bytes`].
pub fn is_paddable(pad: i64) -> bool {
    pad >= 0 && !UNPADDABLE.contains(&pad)
}

/// Build the filler for `pad` bytes of padding.
///
/// Returns `None` for amounts rejected by [`is_paddable`].
pub fn padding_bytes(pad: usize) -> Option<Vec<u8>> {
    if !is_paddable(pad as i64) {
        return None;
    }

    let mut filler = Vec::with_capacity(pad);
    match pad % 3 {
        0 => filler.resize(pad, 0),
        1 => {
            filler.resize(pad - 4, 0);
            filler.extend_from_slice(&EMPTY_RLE_BLOCK);
        }
        _ => {
            filler.resize(pad - 8, 0);
            filler.extend_from_slice(&EMPTY_RLE_BLOCK);
            filler.extend_from_slice(&EMPTY_RLE_BLOCK);
        }
    }
    Some(filler)
}

/// Insert `pad` bytes of empty blocks right after the frame header of `frame`.
pub fn splice_padding(frame: &[u8], pad: usize) -> Result<Vec<u8>> {
    let start = locate_content_start(frame)?;
    let filler = padding_bytes(pad).ok_or_else(|| {
        Error::Other(format!("padding of {} bytes cannot be expressed", pad))
    })?;

    let mut out = Vec::with_capacity(frame.len() + pad);
    out.extend_from_slice(&frame[..start]);
    out.extend_from_slice(&filler);
    out.extend_from_slice(&frame[start..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn header(descriptor: u8) -> Vec<u8> {
        let mut frame = ZSTD_MAGIC.to_vec();
        frame.push(descriptor);
        frame.resize(32, 0xAA);
        frame
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            locate_content_start(&[0x28, 0xB5, 0x2F, 0xFD]),
            Err(Error::MalformedFrame { len: 4 })
        ));
    }

    #[test]
    fn test_base_offsets() {
        // single segment, 1-byte FCS
        assert_eq!(locate_content_start(&header(0x20)).unwrap(), 6);
        // window descriptor only
        assert_eq!(locate_content_start(&header(0x00)).unwrap(), 6);
        // 2-byte FCS, single segment
        assert_eq!(locate_content_start(&header(0x60)).unwrap(), 7);
        // 2-byte FCS plus window descriptor
        assert_eq!(locate_content_start(&header(0x40)).unwrap(), 8);
        assert_eq!(locate_content_start(&header(0xA0)).unwrap(), 9);
        assert_eq!(locate_content_start(&header(0x80)).unwrap(), 10);
        assert_eq!(locate_content_start(&header(0xE0)).unwrap(), 13);
        assert_eq!(locate_content_start(&header(0xC0)).unwrap(), 14);
    }

    #[test]
    fn test_dictionary_id_widths() {
        assert_eq!(locate_content_start(&header(0x21)).unwrap(), 7);
        assert_eq!(locate_content_start(&header(0x22)).unwrap(), 8);
        assert_eq!(locate_content_start(&header(0x23)).unwrap(), 10);
        assert_eq!(locate_content_start(&header(0xC3)).unwrap(), 18);
    }

    #[test]
    fn test_header_longer_than_buffer() {
        let frame = [0x28, 0xB5, 0x2F, 0xFD, 0xC3, 0, 0];
        assert!(matches!(
            locate_content_start(&frame),
            Err(Error::MalformedFrame { len: 7 })
        ));
    }

    #[test]
    fn test_real_zstd_frame() {
        let data = b"The quick brown fox jumps over the lazy dog. ".repeat(64);
        let frame = zstd::bulk::compress(&data, 3).unwrap();
        let start = locate_content_start(&frame).unwrap();
        // magic + descriptor + 2-byte FCS (single segment)
        assert_eq!(start, 7);
    }

    #[test]
    fn test_unpaddable_amounts() {
        for pad in [-3, -1, 1, 2, 5] {
            assert!(!is_paddable(pad), "pad {} should be rejected", pad);
        }
        for pad in [0, 3, 4, 6, 7, 8, 9, 10, 11] {
            assert!(is_paddable(pad), "pad {} should be accepted", pad);
        }
    }

    #[test]
    fn test_padding_shapes() {
        assert_eq!(padding_bytes(0).unwrap(), Vec::<u8>::new());
        assert_eq!(padding_bytes(3).unwrap(), vec![0, 0, 0]);
        assert_eq!(padding_bytes(4).unwrap(), vec![2, 0, 0, 0]);
        assert_eq!(padding_bytes(8).unwrap(), vec![2, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(
            padding_bytes(7).unwrap(),
            vec![0, 0, 0, 2, 0, 0, 0],
        );
        assert!(padding_bytes(5).is_none());
    }

    #[test]
    fn test_splice_keeps_header_and_payload() {
        let frame = header(0x20);
        let padded = splice_padding(&frame, 4).unwrap();
        assert_eq!(padded.len(), frame.len() + 4);
        assert_eq!(&padded[..6], &frame[..6]);
        assert_eq!(&padded[6..10], &[2, 0, 0, 0]);
        assert_eq!(&padded[10..], &frame[6..]);
    }

    proptest! {
        #[test]
        fn prop_content_start_stable(descriptor in any::<u8>()) {
            let frame = header(descriptor);
            let first = locate_content_start(&frame).unwrap();
            let second = locate_content_start(&frame).unwrap();
            prop_assert_eq!(first, second);
            prop_assert!(first >= MIN_FRAME_LEN);
        }

        #[test]
        fn prop_padding_has_exact_length(pad in 0usize..4096) {
            match padding_bytes(pad) {
                Some(filler) => prop_assert_eq!(filler.len(), pad),
                None => prop_assert!([1, 2, 5].contains(&pad)),
            }
        }
    }
}
