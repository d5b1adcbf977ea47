//! Output sizing and the two buffer ownership modes.
//!
//! Every codec call follows the same shape: work out how large the output
//! can get, obtain a buffer at least that large, run the library once, and
//! hand back exactly the bytes it produced. [`OutputBuffer::fill`] owns that
//! shape so the codecs only supply the bound and the library call.

use std::ops::Deref;

use log::{debug, error};

use crate::config::Algorithm;
use crate::error::{CodecError, Result};
use crate::pool::BufferOwner;

/// How big the output of one block may get.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputBound {
    /// The library's own worst case. Running out of room is a bug.
    Exact(usize),
    /// A starting guess for formats that do not record their output size.
    /// Running out of room doubles the buffer and retries the block.
    Estimate(usize),
}

impl OutputBound {
    pub fn len(self) -> usize {
        match self {
            OutputBound::Exact(n) | OutputBound::Estimate(n) => n,
        }
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// What one library run did with the buffer it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Finished; this many bytes are valid.
    Done(usize),
    /// The buffer filled up before the library finished.
    Full,
}

/// Result bytes of one block.
#[derive(Debug)]
pub enum BlockOutput<'a> {
    /// Borrowed from the codec's persistent buffer. The borrow ends at the
    /// next call on the same codec.
    Reused(&'a [u8]),
    /// Freshly allocated from the buffer owner; the caller owns it.
    Allocated(Vec<u8>),
}

impl BlockOutput<'_> {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            BlockOutput::Reused(bytes) => bytes,
            BlockOutput::Allocated(bytes) => bytes,
        }
    }

    pub fn is_reused(&self) -> bool {
        matches!(self, BlockOutput::Reused(_))
    }

    /// Take the bytes out, copying only when they live in the codec.
    pub fn into_vec(self) -> Vec<u8> {
        match self {
            BlockOutput::Reused(bytes) => bytes.to_vec(),
            BlockOutput::Allocated(bytes) => bytes,
        }
    }
}

impl Deref for BlockOutput<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for BlockOutput<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Where a codec writes its output.
#[derive(Debug)]
pub enum OutputBuffer {
    /// One persistent buffer, grown on demand and never shrunk.
    Reused(Vec<u8>),
    /// A new buffer from the owner on every call.
    Fresh,
}

impl OutputBuffer {
    pub fn new(reuse: bool) -> Self {
        if reuse {
            OutputBuffer::Reused(Vec::new())
        } else {
            OutputBuffer::Fresh
        }
    }

    pub fn is_reused(&self) -> bool {
        matches!(self, OutputBuffer::Reused(_))
    }

    /// Current size of the persistent buffer; zero in `Fresh` mode.
    pub fn capacity(&self) -> usize {
        match self {
            OutputBuffer::Reused(scratch) => scratch.len(),
            OutputBuffer::Fresh => 0,
        }
    }

    /// An empty result that does not touch the library.
    pub fn empty(&mut self, owner: &dyn BufferOwner) -> Result<BlockOutput<'_>> {
        match self {
            OutputBuffer::Reused(scratch) => Ok(BlockOutput::Reused(&scratch[..0])),
            OutputBuffer::Fresh => Ok(BlockOutput::Allocated(owner.allocate(0)?)),
        }
    }

    /// Size a buffer for `bound`, run `run` into it, and return what it wrote.
    ///
    /// `run` receives a buffer of at least the requested length and must
    /// process the whole block from scratch each time it is called. It is
    /// only called again after returning [`Fill::Full`] for an estimate.
    pub fn fill<F>(
        &mut self,
        owner: &dyn BufferOwner,
        algorithm: Algorithm,
        bound: OutputBound,
        max_len: usize,
        mut run: F,
    ) -> Result<BlockOutput<'_>>
    where
        F: FnMut(&mut [u8]) -> Result<Fill>,
    {
        match self {
            OutputBuffer::Reused(scratch) => {
                let produced = drive(algorithm, bound, max_len, |len| {
                    if len > scratch.len() {
                        debug!("{algorithm}: growing reuse buffer {} -> {len}", scratch.len());
                        *scratch = owner.allocate(len)?;
                    }
                    let tried = scratch.len();
                    Ok((run(&mut scratch[..])?, tried))
                })?;
                Ok(BlockOutput::Reused(&scratch[..produced]))
            }
            OutputBuffer::Fresh => {
                let mut result = Vec::new();
                drive(algorithm, bound, max_len, |len| {
                    let mut buf = owner.allocate(len)?;
                    let fill = run(&mut buf)?;
                    if let Fill::Done(n) = fill {
                        buf.truncate(n);
                        result = buf;
                    }
                    Ok((fill, len))
                })?;
                Ok(BlockOutput::Allocated(result))
            }
        }
    }
}

/// Retry loop shared by both modes. `attempt` gets the requested length and
/// reports how it went plus the buffer length it actually used.
fn drive<A>(algorithm: Algorithm, bound: OutputBound, max_len: usize, mut attempt: A) -> Result<usize>
where
    A: FnMut(usize) -> Result<(Fill, usize)>,
{
    let mut len = match bound {
        OutputBound::Exact(n) => n,
        OutputBound::Estimate(n) => n.clamp(1, max_len.max(1)),
    };
    loop {
        let (fill, tried) = attempt(len)?;
        match (fill, bound) {
            (Fill::Done(n), _) => return Ok(n),
            (Fill::Full, OutputBound::Exact(_)) => {
                error!("{algorithm}: library overflowed an exact bound of {tried} bytes");
                return Err(CodecError::SizingDefect {
                    algorithm,
                    bound: tried,
                });
            }
            (Fill::Full, OutputBound::Estimate(_)) => {
                if tried >= max_len {
                    return Err(CodecError::decode(
                        algorithm,
                        format!("decompressed block exceeds the {max_len}-byte limit"),
                    ));
                }
                len = tried.saturating_mul(2).min(max_len);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::MemPool;

    fn copy_into(input: &[u8]) -> impl FnMut(&mut [u8]) -> Result<Fill> + '_ {
        move |buf| {
            if buf.len() < input.len() {
                return Ok(Fill::Full);
            }
            buf[..input.len()].copy_from_slice(input);
            Ok(Fill::Done(input.len()))
        }
    }

    #[test]
    fn test_fresh_mode_allocates_exact_bound_every_call() {
        let pool = MemPool::new();
        let mut out = OutputBuffer::new(false);
        for _ in 0..3 {
            let block = out
                .fill(&pool, Algorithm::Snappy, OutputBound::Exact(16), 1024, copy_into(b"abc"))
                .unwrap();
            assert!(!block.is_reused());
            assert_eq!(&*block, b"abc");
        }
        assert_eq!(pool.allocation_count(), 3);
        assert_eq!(pool.allocated_bytes(), 48);
        assert_eq!(out.capacity(), 0);
    }

    #[test]
    fn test_reused_mode_grows_only_when_needed() {
        let pool = MemPool::new();
        let mut out = OutputBuffer::new(true);

        let small = out
            .fill(&pool, Algorithm::Gzip, OutputBound::Exact(8), 1024, copy_into(b"xy"))
            .unwrap();
        assert!(small.is_reused());
        assert_eq!(small.len(), 2);
        assert_eq!(out.capacity(), 8);

        out.fill(&pool, Algorithm::Gzip, OutputBound::Exact(32), 1024, copy_into(b"longer"))
            .unwrap();
        assert_eq!(out.capacity(), 32);
        assert_eq!(pool.allocation_count(), 2);

        let again = out
            .fill(&pool, Algorithm::Gzip, OutputBound::Exact(4), 1024, copy_into(b"z"))
            .unwrap();
        assert_eq!(&*again, b"z");
        assert_eq!(out.capacity(), 32, "capacity never shrinks");
        assert_eq!(pool.allocation_count(), 2);
    }

    #[test_log::test]
    fn test_exact_bound_overflow_is_a_sizing_defect() {
        let pool = MemPool::new();
        let mut out = OutputBuffer::new(false);
        let err = out
            .fill(&pool, Algorithm::Bzip2, OutputBound::Exact(2), 1024, copy_into(b"abcd"))
            .unwrap_err();
        assert!(err.is_sizing_defect());
    }

    #[test_log::test]
    fn test_estimate_doubles_until_it_fits() {
        let pool = MemPool::new();
        let input = vec![7u8; 100];
        let mut out = OutputBuffer::new(true);
        let block = out
            .fill(&pool, Algorithm::Deflate, OutputBound::Estimate(10), 1024, copy_into(&input))
            .unwrap();
        assert_eq!(block.len(), 100);
        assert_eq!(out.capacity(), 160);
        assert_eq!(pool.allocation_count(), 5);
    }

    #[test]
    fn test_estimate_stops_at_limit() {
        let pool = MemPool::new();
        let input = vec![7u8; 100];
        let mut out = OutputBuffer::new(false);
        let err = out
            .fill(&pool, Algorithm::Bzip2, OutputBound::Estimate(10), 64, copy_into(&input))
            .unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_allocation_failure_propagates() {
        let pool = MemPool::with_limit(4);
        let mut out = OutputBuffer::new(false);
        let err = out
            .fill(&pool, Algorithm::Snappy, OutputBound::Exact(16), 1024, copy_into(b"abc"))
            .unwrap_err();
        assert!(matches!(err, CodecError::Allocation(_)));
    }

    #[test]
    fn test_empty_output() {
        let pool = MemPool::new();
        let mut reused = OutputBuffer::new(true);
        assert!(reused.empty(&pool).unwrap().is_empty());
        let mut fresh = OutputBuffer::new(false);
        let block = fresh.empty(&pool).unwrap();
        assert!(block.is_empty());
        assert!(!block.is_reused());
    }
}
