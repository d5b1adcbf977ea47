use bzip2::{Action, Compress, Compression, Decompress, Status};
use log::debug;

use pagecodec_core::format::{
    BZIP2_BOUND_SLACK, BZIP2_WORK_FACTOR, DEFAULT_BZIP2_LEVEL, DEFAULT_MAX_OUTPUT_LEN,
    MAX_BZIP2_LEVEL,
};
use pagecodec_core::{
    Algorithm, BlockOutput, BufferOwner, Codec, CodecBase, CodecError, Direction, Fill,
    OutputBound, Result,
};

/// Worst-case bzip2 output, from the libbzip2 manual: 1% over the input plus
/// 600 bytes.
pub fn bzip2_bound(len: usize) -> Option<usize> {
    len.checked_add(len.div_ceil(100))?.checked_add(BZIP2_BOUND_SLACK)
}

/// bzip2 block codec.
///
/// One-shot per block: a fresh library stream is set up and torn down inside
/// every `process_block`, so `init` has nothing to do.
///
/// Best for: cold pages where ratio matters more than speed.
pub struct BzipCodec<'a> {
    base: CodecBase<'a>,
    level: u32,
}

impl<'a> BzipCodec<'a> {
    pub fn new(owner: &'a dyn BufferOwner, reuse_buffer: bool, direction: Direction) -> Self {
        Self {
            base: CodecBase::new(
                owner,
                Algorithm::Bzip2,
                direction,
                reuse_buffer,
                DEFAULT_MAX_OUTPUT_LEN,
            ),
            level: DEFAULT_BZIP2_LEVEL,
        }
    }

    /// Block size in units of 100k (1..=9). Checked by `init`.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_max_output_len(mut self, max_output_len: usize) -> Self {
        self.base.set_max_output_len(max_output_len);
        self
    }
}

fn compress_block(level: u32, input: &[u8], out: &mut [u8]) -> Result<Fill> {
    let mut stream = Compress::new(Compression::new(level), BZIP2_WORK_FACTOR);
    loop {
        let consumed = stream.total_in() as usize;
        let produced = stream.total_out() as usize;
        let status = stream
            .compress(&input[consumed..], &mut out[produced..], Action::Finish)
            .map_err(|e| CodecError::library(Algorithm::Bzip2, e.to_string()))?;
        let now_produced = stream.total_out() as usize;
        match status {
            Status::StreamEnd => return Ok(Fill::Done(now_produced)),
            _ if now_produced == out.len() => return Ok(Fill::Full),
            _ if now_produced == produced && stream.total_in() as usize == consumed => {
                return Err(CodecError::library(Algorithm::Bzip2, "compressor made no progress"))
            }
            _ => {}
        }
    }
}

/// Decompress one block. Concatenated bzip2 streams, as parallel
/// compressors write them, decode one after another into the same output.
fn decompress_block(input: &[u8], out: &mut [u8]) -> Result<Fill> {
    let mut stream = Decompress::new(false);
    let mut consumed = 0;
    let mut produced = 0;
    loop {
        let (in_before, out_before) = (stream.total_in(), stream.total_out());
        let status = stream
            .decompress(&input[consumed..], &mut out[produced..])
            .map_err(|e| CodecError::decode(Algorithm::Bzip2, e.to_string()))?;
        let read = (stream.total_in() - in_before) as usize;
        let written = (stream.total_out() - out_before) as usize;
        consumed += read;
        produced += written;
        match status {
            Status::StreamEnd if consumed == input.len() => return Ok(Fill::Done(produced)),
            Status::StreamEnd => stream = Decompress::new(false),
            Status::MemNeeded => {
                return Err(CodecError::library(Algorithm::Bzip2, "out of memory"))
            }
            _ if produced == out.len() => return Ok(Fill::Full),
            _ if consumed == input.len() => {
                return Err(CodecError::decode(Algorithm::Bzip2, "truncated stream"))
            }
            _ if read == 0 && written == 0 => {
                return Err(CodecError::decode(Algorithm::Bzip2, "stream made no progress"))
            }
            _ => {}
        }
    }
}

impl Codec for BzipCodec<'_> {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Bzip2
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
        if !(1..=MAX_BZIP2_LEVEL).contains(&self.level) {
            return Err(CodecError::initialization(
                Algorithm::Bzip2,
                format!("block size {} outside 1..={MAX_BZIP2_LEVEL}", self.level),
            ));
        }
        if !self.base.is_initialized() {
            debug!("bzip2 {}: ready, block size {}00k", self.base.direction(), self.level);
        }
        self.base.set_initialized(true);
        Ok(())
    }

    fn process_block(&mut self, input: &[u8]) -> Result<BlockOutput<'_>> {
        self.base.ensure_initialized()?;
        match self.base.direction() {
            Direction::Compress => {
                let bound = bzip2_bound(input.len()).ok_or(CodecError::InputTooLarge {
                    algorithm: Algorithm::Bzip2,
                    len: input.len(),
                })?;
                let level = self.level;
                self.base.fill(input.len(), OutputBound::Exact(bound), |out| {
                    compress_block(level, input, out)
                })
            }
            Direction::Decompress if input.is_empty() => self.base.empty(),
            Direction::Decompress => {
                let bound = self.base.decompress_estimate(input.len());
                self.base
                    .fill(input.len(), bound, |out| decompress_block(input, out))
            }
        }
    }

    fn release(&mut self) {
        self.base.set_initialized(false);
    }
}
