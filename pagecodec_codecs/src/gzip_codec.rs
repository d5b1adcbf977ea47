use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use log::debug;

use pagecodec_core::format::{
    DEFAULT_DEFLATE_LEVEL, DEFAULT_MAX_OUTPUT_LEN, GZIP_CODEC, GZIP_WRAPPER_LEN, MAX_DEFLATE_LEVEL,
    WINDOW_BITS, ZLIB_WRAPPER_LEN,
};
use pagecodec_core::{
    Algorithm, BlockOutput, BufferOwner, Codec, CodecBase, CodecError, Direction, Fill,
    OutputBound, Result,
};

/// Deflate cannot expand data by more than about 1032:1.
const DEFLATE_MAX_RATIO: usize = 1032;

/// The `windowBits` value zlib receives for each container.
///
/// zlib has no separate "gzip" switch: adding `GZIP_CODEC` to the window size
/// asks for a gzip header and trailer instead of the zlib ones. flate2 applies
/// the offset itself when given `WINDOW_BITS` through its `*_gzip` entry points.
pub fn zlib_window_bits(is_gzip: bool) -> u8 {
    if is_gzip {
        WINDOW_BITS + GZIP_CODEC
    } else {
        WINDOW_BITS
    }
}

/// Worst-case deflate output for `len` input bytes, container included.
///
/// zlib's conservative `deflateBound`, which holds for every level and
/// window size.
pub fn deflate_bound(len: usize, is_gzip: bool) -> Option<usize> {
    let wrapper = if is_gzip {
        GZIP_WRAPPER_LEN
    } else {
        ZLIB_WRAPPER_LEN
    };
    len.checked_add(len.checked_add(7)? >> 3)?
        .checked_add(len.checked_add(63)? >> 6)?
        .checked_add(5 + wrapper)
}

enum ZStream {
    Deflate(Compress),
    Inflate(Decompress),
}

fn new_inflater(is_gzip: bool) -> Decompress {
    if is_gzip {
        Decompress::new_gzip(WINDOW_BITS)
    } else {
        Decompress::new_with_window_bits(true, WINDOW_BITS)
    }
}

/// Gzip / zlib block codec.
///
/// One deflate or inflate stream is created at `init` and kept for the
/// codec's lifetime. It is reset before every block, so blocks never share a
/// dictionary.
///
/// `is_gzip` picks the container: gzip (`1F 8B` magic, CRC32 and length
/// trailer, readable by standard gzip tools) or zlib (2-byte header, Adler-32
/// trailer, for callers with their own framing).
pub struct GzipCodec<'a> {
    base: CodecBase<'a>,
    is_gzip: bool,
    level: u32,
    stream: Option<ZStream>,
}

impl<'a> GzipCodec<'a> {
    pub fn new(
        owner: &'a dyn BufferOwner,
        reuse_buffer: bool,
        direction: Direction,
        is_gzip: bool,
    ) -> Self {
        let algorithm = if is_gzip {
            Algorithm::Gzip
        } else {
            Algorithm::Deflate
        };
        Self {
            base: CodecBase::new(
                owner,
                algorithm,
                direction,
                reuse_buffer,
                DEFAULT_MAX_OUTPUT_LEN,
            ),
            is_gzip,
            level: DEFAULT_DEFLATE_LEVEL,
            stream: None,
        }
    }

    /// Compression level (0 = stored, 9 = smallest). Checked by `init`.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_max_output_len(mut self, max_output_len: usize) -> Self {
        self.base.set_max_output_len(max_output_len);
        self
    }

    fn open_stream(&self) -> Result<ZStream> {
        match self.base.direction() {
            Direction::Compress => {
                if self.level > MAX_DEFLATE_LEVEL {
                    return Err(CodecError::initialization(
                        self.base.algorithm(),
                        format!("level {} outside 0..={MAX_DEFLATE_LEVEL}", self.level),
                    ));
                }
                let level = Compression::new(self.level);
                Ok(ZStream::Deflate(if self.is_gzip {
                    Compress::new_gzip(level, WINDOW_BITS)
                } else {
                    Compress::new_with_window_bits(level, true, WINDOW_BITS)
                }))
            }
            Direction::Decompress => Ok(ZStream::Inflate(new_inflater(self.is_gzip))),
        }
    }

    /// Starting output size for inflate.
    ///
    /// A gzip trailer ends with the input length mod 2^32. It is only a hint:
    /// corrupt trailers are capped by the maximum deflate ratio, and a wrong
    /// guess just means the buffer grows.
    fn inflate_estimate(&self, input: &[u8]) -> OutputBound {
        let fallback = self.base.decompress_estimate(input.len());
        if !self.is_gzip || input.len() < GZIP_WRAPPER_LEN {
            return fallback;
        }
        let mut isize_bytes = [0u8; 4];
        isize_bytes.copy_from_slice(&input[input.len() - 4..]);
        let hint = u32::from_le_bytes(isize_bytes) as usize;
        let ceiling = input.len().saturating_mul(DEFLATE_MAX_RATIO);
        if hint > ceiling {
            return fallback;
        }
        // One spare byte so a correct hint finishes without a retry.
        OutputBound::Estimate(hint.saturating_add(1).min(self.base.max_output_len()))
    }
}

fn deflate_block(
    stream: &mut Compress,
    input: &[u8],
    out: &mut [u8],
    algorithm: Algorithm,
) -> Result<Fill> {
    stream.reset();
    let before = stream.total_out();
    let status = stream
        .compress(input, out, FlushCompress::Finish)
        .map_err(|e| CodecError::library(algorithm, e.to_string()))?;
    let produced = (stream.total_out() - before) as usize;
    match status {
        Status::StreamEnd => Ok(Fill::Done(produced)),
        Status::Ok | Status::BufError => Ok(Fill::Full),
    }
}

/// Inflate one block. Gzip input may hold several members back to back, as
/// `cat a.gz b.gz` produces; they decode into one output. A zlib stream must
/// end exactly at the end of the input.
fn inflate_block(
    stream: &mut Decompress,
    is_gzip: bool,
    input: &[u8],
    out: &mut [u8],
    algorithm: Algorithm,
) -> Result<Fill> {
    let mut consumed = 0;
    let mut produced = 0;
    loop {
        let (in_before, out_before) = (stream.total_in(), stream.total_out());
        let status = stream
            .decompress(&input[consumed..], &mut out[produced..], FlushDecompress::Finish)
            .map_err(|e| CodecError::decode(algorithm, e.to_string()))?;
        let read = (stream.total_in() - in_before) as usize;
        let written = (stream.total_out() - out_before) as usize;
        consumed += read;
        produced += written;
        match status {
            Status::StreamEnd if consumed == input.len() => return Ok(Fill::Done(produced)),
            Status::StreamEnd if is_gzip => *stream = new_inflater(true),
            Status::StreamEnd => {
                return Err(CodecError::decode(
                    algorithm,
                    format!("{} trailing bytes after stream end", input.len() - consumed),
                ))
            }
            _ if produced == out.len() => return Ok(Fill::Full),
            _ if consumed == input.len() => {
                return Err(CodecError::decode(algorithm, "truncated stream"))
            }
            _ if read == 0 && written == 0 => {
                return Err(CodecError::decode(algorithm, "stream made no progress"))
            }
            _ => {}
        }
    }
}

impl Codec for GzipCodec<'_> {
    fn algorithm(&self) -> Algorithm {
        self.base.algorithm()
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
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = self.open_stream()?;
        debug!(
            "{} {}: stream ready, level {}, zlib window bits {}",
            self.base.algorithm(),
            self.base.direction(),
            self.level,
            zlib_window_bits(self.is_gzip)
        );
        self.stream = Some(stream);
        self.base.set_initialized(true);
        Ok(())
    }

    fn process_block(&mut self, input: &[u8]) -> Result<BlockOutput<'_>> {
        self.base.ensure_initialized()?;
        let algorithm = self.base.algorithm();
        let is_gzip = self.is_gzip;
        let bound = match self.base.direction() {
            Direction::Compress => OutputBound::Exact(deflate_bound(input.len(), is_gzip).ok_or(
                CodecError::InputTooLarge {
                    algorithm,
                    len: input.len(),
                },
            )?),
            Direction::Decompress if input.is_empty() => return self.base.empty(),
            Direction::Decompress => self.inflate_estimate(input),
        };

        match self.stream.as_mut() {
            Some(ZStream::Deflate(stream)) => self
                .base
                .fill(input.len(), bound, |out| deflate_block(stream, input, out, algorithm)),
            Some(ZStream::Inflate(stream)) => self.base.fill(input.len(), bound, |out| {
                // flate2's inflate reset always reselects the zlib container,
                // so a gzip inflater is rebuilt instead.
                if is_gzip {
                    *stream = new_inflater(true);
                } else {
                    stream.reset(true);
                }
                inflate_block(stream, is_gzip, input, out, algorithm)
            }),
            None => Err(CodecError::NotInitialized { algorithm }),
        }
    }

    fn release(&mut self) {
        self.stream = None;
        self.base.set_initialized(false);
    }
}
