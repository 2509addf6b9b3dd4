//! GIF table-based image data: a minimum code size byte followed by the LZW
//! stream cut into length-prefixed sub-blocks and a zero terminator.

use crate::compression::lzw::{LzwDecoder, LzwEncoder};
use crate::config::GifConfig;
use crate::error::{CodecError, CodecResult};

pub const MAX_SUB_BLOCK: usize = 255;

/// Result of unpacking one frame's image data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameData {
    pub indices: Vec<u8>,
    /// End code reached and no corruption seen.
    pub clean: bool,
    /// Bytes of input consumed, terminator included.
    pub consumed: usize,
}

pub fn write_sub_blocks(data: &[u8], out: &mut Vec<u8>) {
    for chunk in data.chunks(MAX_SUB_BLOCK) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
}

/// Joins sub-blocks until the zero terminator. Returns the payload and the
/// bytes consumed.
pub fn read_sub_blocks(data: &[u8]) -> CodecResult<(Vec<u8>, usize)> {
    let mut payload = Vec::with_capacity(data.len());
    let mut pos = 0;
    loop {
        let Some(&len) = data.get(pos) else {
            return Err(CodecError::UnexpectedEndOfStream);
        };
        pos += 1;
        if len == 0 {
            return Ok((payload, pos));
        }
        let end = pos + len as usize;
        if end > data.len() {
            return Err(CodecError::UnexpectedEndOfStream);
        }
        payload.extend_from_slice(&data[pos..end]);
        pos = end;
    }
}

/// Compresses palette indices into GIF image data.
pub fn encode_frame_data(indices: &[u8], config: &GifConfig) -> CodecResult<Vec<u8>> {
    config.validate()?;
    let mut encoder =
        LzwEncoder::new(config.min_code_size)?.with_clear_policy(config.clear_policy);
    encoder.write_all(indices)?;
    let clears = encoder.clears_emitted();
    let stream = encoder.signal_end_of_stream();

    log::debug!(
        "GIF image data: {} indices -> {} LZW bytes, {} dictionary resets",
        indices.len(),
        stream.len(),
        clears
    );

    let mut out = Vec::with_capacity(stream.len() + stream.len() / MAX_SUB_BLOCK + 3);
    out.push(config.min_code_size);
    write_sub_blocks(&stream, &mut out);
    Ok(out)
}

/// Unpacks GIF image data into exactly `expected_len` indices. A short
/// stream is zero-padded and a long one truncated, with a warning either way.
pub fn decode_frame_data(data: &[u8], expected_len: usize) -> CodecResult<FrameData> {
    let Some(&min_code_size) = data.first() else {
        return Err(CodecError::UnexpectedEndOfStream);
    };
    let (stream, used) = read_sub_blocks(&data[1..])?;

    let mut decoder = LzwDecoder::new(&stream, min_code_size)?;
    let mut indices: Vec<u8> = decoder.by_ref().take(expected_len).collect();
    let overflow = decoder.has_next();

    if indices.len() < expected_len {
        log::warn!(
            "GIF image data holds {} of {} pixels, padding with index 0",
            indices.len(),
            expected_len
        );
        indices.resize(expected_len, 0);
    } else if overflow {
        log::warn!(
            "GIF image data holds more than {} pixels, truncating",
            expected_len
        );
    }

    Ok(FrameData {
        indices,
        clean: !overflow && decoder.was_decode_clean() && decoder.fault().is_none(),
        consumed: used + 1,
    })
}
