use log::trace;

use crate::buffer::{BlockOutput, Fill, OutputBound, OutputBuffer};
use crate::config::{Algorithm, Direction};
use crate::error::{CodecError, Result};
use crate::format::{DECOMPRESS_EXPANSION_GUESS, MIN_DECOMPRESS_ESTIMATE};
use crate::pool::BufferOwner;

/// Core block compression abstraction.
///
/// Each `Codec` implementation:
/// - Is bound to one [`Algorithm`] and one [`Direction`] for its whole life.
/// - Must process every block independently; no dictionary or stream state
///   carries over from one block to the next.
/// - Sizes its output before calling the library and reports the produced
///   length, never the buffer's capacity.
///
/// Instances are not shareable between threads while in use: `process_block`
/// takes `&mut self`. Use one codec per thread, optionally over one shared
/// [`BufferOwner`].
pub trait Codec: Send {
    fn algorithm(&self) -> Algorithm;

    fn direction(&self) -> Direction;

    /// Whether results come from a persistent, reused buffer.
    fn reuse_buffer(&self) -> bool;

    /// Size of the persistent output buffer. Always zero without reuse.
    fn buffer_capacity(&self) -> usize;

    /// One-time library setup. A second call after success does nothing.
    fn init(&mut self) -> Result<()>;

    /// Compress or decompress one block.
    ///
    /// With buffer reuse the returned bytes borrow the codec and are only
    /// valid until the next call. Without reuse they are a fresh allocation
    /// from the buffer owner that the caller keeps.
    fn process_block(&mut self, input: &[u8]) -> Result<BlockOutput<'_>>;

    /// Drop library state. The codec must be re-initialized before reuse.
    fn release(&mut self);
}

/// State every codec carries regardless of algorithm.
pub struct CodecBase<'a> {
    owner: &'a dyn BufferOwner,
    algorithm: Algorithm,
    direction: Direction,
    output: OutputBuffer,
    max_output_len: usize,
    initialized: bool,
}

impl<'a> CodecBase<'a> {
    pub fn new(
        owner: &'a dyn BufferOwner,
        algorithm: Algorithm,
        direction: Direction,
        reuse_buffer: bool,
        max_output_len: usize,
    ) -> Self {
        Self {
            owner,
            algorithm,
            direction,
            output: OutputBuffer::new(reuse_buffer),
            max_output_len,
            initialized: false,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn reuse_buffer(&self) -> bool {
        self.output.is_reused()
    }

    pub fn buffer_capacity(&self) -> usize {
        self.output.capacity()
    }

    pub fn max_output_len(&self) -> usize {
        self.max_output_len
    }

    pub fn set_max_output_len(&mut self, max_output_len: usize) {
        self.max_output_len = max_output_len;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(CodecError::NotInitialized {
                algorithm: self.algorithm,
            })
        }
    }

    /// Starting output guess for a decompressor whose format does not record
    /// the decompressed size.
    pub fn decompress_estimate(&self, input_len: usize) -> OutputBound {
        let guess = input_len
            .saturating_mul(DECOMPRESS_EXPANSION_GUESS)
            .max(MIN_DECOMPRESS_ESTIMATE)
            .min(self.max_output_len);
        OutputBound::Estimate(guess)
    }

    /// Zero-length result for an empty block.
    pub fn empty(&mut self) -> Result<BlockOutput<'_>> {
        trace!("{} {}: empty block", self.algorithm, self.direction);
        self.output.empty(self.owner)
    }

    /// Run one block through the library. See [`OutputBuffer::fill`].
    pub fn fill<F>(&mut self, input_len: usize, bound: OutputBound, run: F) -> Result<BlockOutput<'_>>
    where
        F: FnMut(&mut [u8]) -> Result<Fill>,
    {
        let (algorithm, direction) = (self.algorithm, self.direction);
        let out = self
            .output
            .fill(self.owner, algorithm, bound, self.max_output_len, run)?;
        trace!(
            "{algorithm} {direction}: {input_len} -> {} bytes (bound {:?})",
            out.len(),
            bound
        );
        Ok(out)
    }
}
