//! Container log decoding.
//!
//! Output of containers without a TTY is multiplexed: every write is
//! prefixed with an 8-byte header `[stream, 0, 0, 0, len (u32 BE)]` where
//! `stream` is 0 (stdin), 1 (stdout) or 2 (stderr). TTY output is raw.

/// Size of a multiplexed frame header.
pub const FRAME_HEADER_LEN: usize = 8;

/// Returns whether `raw` starts with a multiplexed frame header.
#[must_use]
pub fn is_multiplexed(raw: &[u8]) -> bool {
    raw.len() >= FRAME_HEADER_LEN && raw[0] <= 2 && raw[1..4] == [0, 0, 0]
}

/// Strips frame headers and returns the interleaved payloads.
///
/// Input that is not multiplexed is returned unchanged. A truncated final
/// frame contributes whatever payload bytes are present.
#[must_use]
pub fn demux(raw: &[u8]) -> Vec<u8> {
    if !is_multiplexed(raw) {
        return raw.to_vec();
    }
    let mut out = Vec::with_capacity(raw.len());
    let mut rest = raw;
    while rest.len() >= FRAME_HEADER_LEN {
        let len = u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]);
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        let end = FRAME_HEADER_LEN.saturating_add(len).min(rest.len());
        out.extend_from_slice(&rest[FRAME_HEADER_LEN..end]);
        rest = &rest[end..];
    }
    out
}
