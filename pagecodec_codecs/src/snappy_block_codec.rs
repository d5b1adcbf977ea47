use std::io::{self, Cursor, Read, Write};

use log::debug;
use snap::raw::max_compress_len;
use snap::read::FrameDecoder;
use snap::write::FrameEncoder;

use pagecodec_core::format::{
    DEFAULT_MAX_OUTPUT_LEN, SNAPPY_CHUNK_OVERHEAD, SNAPPY_FRAME_CHUNK_LEN,
    SNAPPY_STREAM_IDENTIFIER_LEN,
};
use pagecodec_core::{
    Algorithm, BlockOutput, BufferOwner, Codec, CodecBase, CodecError, Direction, Fill,
    OutputBound, Result,
};

/// Worst-case size of a snappy framed stream holding `len` bytes.
///
/// The library splits input into chunks of at most 64 KiB; each chunk costs
/// a header plus CRC and at most `max_compress_len` of payload.
pub fn frame_bound(len: usize) -> Option<usize> {
    let chunks = len.div_ceil(SNAPPY_FRAME_CHUNK_LEN);
    let per_chunk = max_compress_len(len.min(SNAPPY_FRAME_CHUNK_LEN))
        .checked_add(SNAPPY_CHUNK_OVERHEAD)?;
    chunks
        .checked_mul(per_chunk)?
        .checked_add(SNAPPY_STREAM_IDENTIFIER_LEN)
}

/// Snappy framed ("blocked") codec.
///
/// The library cuts each block into checksummed chunks that decode
/// independently. This codec never looks inside the framing: it feeds the
/// whole block to the library's frame encoder and reads it back through the
/// frame decoder.
pub struct SnappyBlockCodec<'a> {
    base: CodecBase<'a>,
}

impl<'a> SnappyBlockCodec<'a> {
    pub fn new(owner: &'a dyn BufferOwner, reuse_buffer: bool, direction: Direction) -> Self {
        Self {
            base: CodecBase::new(
                owner,
                Algorithm::SnappyBlocked,
                direction,
                reuse_buffer,
                DEFAULT_MAX_OUTPUT_LEN,
            ),
        }
    }

    pub fn with_max_output_len(mut self, max_output_len: usize) -> Self {
        self.base.set_max_output_len(max_output_len);
        self
    }
}

fn encode_frames(input: &[u8], out: &mut [u8]) -> Result<Fill> {
    let overflow = |e: &io::Error| {
        if e.kind() == io::ErrorKind::WriteZero {
            Ok(Fill::Full)
        } else {
            Err(CodecError::library(Algorithm::SnappyBlocked, e.to_string()))
        }
    };

    let mut encoder = FrameEncoder::new(Cursor::new(out));
    if let Err(e) = encoder.write_all(input) {
        return overflow(&e);
    }
    match encoder.into_inner() {
        Ok(cursor) => Ok(Fill::Done(cursor.position() as usize)),
        Err(e) => overflow(e.error()),
    }
}

fn decode_frames(input: &[u8], out: &mut [u8]) -> Result<Fill> {
    let decode_err = |e: io::Error| CodecError::decode(Algorithm::SnappyBlocked, e.to_string());

    let mut decoder = FrameDecoder::new(input);
    let mut produced = 0;
    loop {
        if produced == out.len() {
            let mut extra = [0u8; 1];
            return match decoder.read(&mut extra).map_err(decode_err)? {
                0 => Ok(Fill::Done(produced)),
                _ => Ok(Fill::Full),
            };
        }
        match decoder.read(&mut out[produced..]).map_err(decode_err)? {
            0 => return Ok(Fill::Done(produced)),
            n => produced += n,
        }
    }
}

impl Codec for SnappyBlockCodec<'_> {
    fn algorithm(&self) -> Algorithm {
        Algorithm::SnappyBlocked
    }

    fn direction(&self) -> Direction {
        self.base.direction()
    }

    fn reuse_buffer(&self) -> bool {
        self.base.reuse_buffer()
    }

    fn buffer_capacity(&self) -> usize {
        self.base.buffer_capacity()
    }

    fn init(&mut self) -> Result<()> {
        if !self.base.is_initialized() {
            debug!("{} {}: ready", self.algorithm(), self.base.direction());
        }
        self.base.set_initialized(true);
        Ok(())
    }

    fn process_block(&mut self, input: &[u8]) -> Result<BlockOutput<'_>> {
        self.base.ensure_initialized()?;
        match self.base.direction() {
            Direction::Compress => {
                let bound = frame_bound(input.len()).ok_or(CodecError::InputTooLarge {
                    algorithm: Algorithm::SnappyBlocked,
                    len: input.len(),
                })?;
                self.base.fill(input.len(), OutputBound::Exact(bound), |out| {
                    encode_frames(input, out)
                })
            }
            Direction::Decompress if input.is_empty() => self.base.empty(),
            Direction::Decompress => {
                let bound = self.base.decompress_estimate(input.len());
                self.base
                    .fill(input.len(), bound, |out| decode_frames(input, out))
            }
        }
    }

    fn release(&mut self) {
        self.base.set_initialized(false);
    }
}
