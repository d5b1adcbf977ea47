use log::debug;
use snap::raw::{decompress_len, max_compress_len, Decoder, Encoder};

use pagecodec_core::format::DEFAULT_MAX_OUTPUT_LEN;
use pagecodec_core::{
    Algorithm, BlockOutput, BufferOwner, Codec, CodecBase, CodecError, Direction, Fill,
    OutputBound, Result,
};

/// Map a raw-format library error onto the codec taxonomy.
pub(crate) fn snap_error(algorithm: Algorithm, err: snap::Error) -> CodecError {
    match err {
        snap::Error::BufferTooSmall { given, .. } => CodecError::SizingDefect {
            algorithm,
            bound: given as usize,
        },
        snap::Error::TooBig { given, .. } => CodecError::InputTooLarge {
            algorithm,
            len: given as usize,
        },
        other => CodecError::decode(algorithm, other.to_string()),
    }
}

/// Snappy raw (unframed) codec.
///
/// The whole block is one compressed sequence with no checksum and no
/// internal boundaries, for callers whose container already delimits blocks.
/// The raw header records the decompressed length, so both directions size
/// their output exactly.
///
/// Best for: hot pages, lowest CPU cost per byte.
pub struct SnappyRawCodec<'a> {
    base: CodecBase<'a>,
}

impl<'a> SnappyRawCodec<'a> {
    pub fn new(owner: &'a dyn BufferOwner, reuse_buffer: bool, direction: Direction) -> Self {
        Self {
            base: CodecBase::new(
                owner,
                Algorithm::Snappy,
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

impl Codec for SnappyRawCodec<'_> {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Snappy
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
        let algorithm = Algorithm::Snappy;
        match self.base.direction() {
            Direction::Compress => {
                // max_compress_len reports 0 for inputs the format cannot hold.
                let bound = max_compress_len(input.len());
                if bound == 0 {
                    return Err(CodecError::InputTooLarge {
                        algorithm,
                        len: input.len(),
                    });
                }
                self.base.fill(input.len(), OutputBound::Exact(bound), |out| {
                    match Encoder::new().compress(input, out) {
                        Ok(n) => Ok(Fill::Done(n)),
                        Err(snap::Error::BufferTooSmall { .. }) => Ok(Fill::Full),
                        Err(e) => Err(snap_error(algorithm, e)),
                    }
                })
            }
            Direction::Decompress if input.is_empty() => self.base.empty(),
            Direction::Decompress => {
                let len = decompress_len(input).map_err(|e| snap_error(algorithm, e))?;
                if len > self.base.max_output_len() {
                    return Err(CodecError::decode(
                        algorithm,
                        format!(
                            "header claims {len} bytes, over the {}-byte limit",
                            self.base.max_output_len()
                        ),
                    ));
                }
                self.base.fill(input.len(), OutputBound::Exact(len), |out| {
                    match Decoder::new().decompress(input, out) {
                        Ok(n) => Ok(Fill::Done(n)),
                        Err(snap::Error::BufferTooSmall { .. }) => Ok(Fill::Full),
                        Err(e) => Err(snap_error(algorithm, e)),
                    }
                })
            }
        }
    }

    fn release(&mut self) {
        self.base.set_initialized(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecodec_core::MemPool;

    #[test]
    fn test_abcabc_round_trip_with_fresh_instances() {
        let pool = MemPool::new();
        let mut compressor = SnappyRawCodec::new(&pool, false, Direction::Compress);
        compressor.init().unwrap();
        let compressed = compressor.process_block(b"abcabc").unwrap();
        assert!(!compressed.is_reused());
        let compressed = compressed.into_vec();

        let mut decompressor = SnappyRawCodec::new(&pool, false, Direction::Decompress);
        decompressor.init().unwrap();
        let raw = decompressor.process_block(&compressed).unwrap();
        assert_eq!(&*raw, b"abcabc");
    }

    #[test]
    fn test_empty_block_both_directions() {
        let pool = MemPool::new();
        let mut compressor = SnappyRawCodec::new(&pool, true, Direction::Compress);
        compressor.init().unwrap();
        // A single varint zero: the encoded length.
        assert_eq!(&*compressor.process_block(b"").unwrap(), &[0u8]);

        let mut decompressor = SnappyRawCodec::new(&pool, true, Direction::Decompress);
        decompressor.init().unwrap();
        assert!(decompressor.process_block(b"").unwrap().is_empty());
        assert!(decompressor.process_block(&[0u8]).unwrap().is_empty());
    }

    #[test]
    fn test_header_over_limit_rejected_before_allocation() {
        let pool = MemPool::new();
        let mut compressor = SnappyRawCodec::new(&pool, false, Direction::Compress);
        compressor.init().unwrap();
        let compressed = compressor.process_block(&[9u8; 1000]).unwrap().into_vec();

        let mut decompressor =
            SnappyRawCodec::new(&pool, false, Direction::Decompress).with_max_output_len(100);
        decompressor.init().unwrap();
        let before = pool.allocation_count();
        let err = decompressor.process_block(&compressed).unwrap_err();
        assert!(err.is_decode());
        assert_eq!(pool.allocation_count(), before);
    }

    #[test]
    fn test_truncated_input_is_decode_error() {
        let pool = MemPool::new();
        let data: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 251) as u8).collect();
        let mut compressor = SnappyRawCodec::new(&pool, false, Direction::Compress);
        compressor.init().unwrap();
        let compressed = compressor.process_block(&data).unwrap().into_vec();

        let mut decompressor = SnappyRawCodec::new(&pool, false, Direction::Decompress);
        decompressor.init().unwrap();
        let err = decompressor
            .process_block(&compressed[..compressed.len() - 3])
            .unwrap_err();
        assert!(err.is_decode(), "got {err:?}");
    }
}
