//! Library contract constants for the wrapped codecs.
//!
//! These are the magic numbers each library's API or wire format expects.
//! They live here so the codecs never scatter them inline.

// ── zlib ───────────────────────────────────────────────────────────────────

/// Maximum deflate window size (log2). zlib has no named constant for it.
pub const WINDOW_BITS: u8 = 15;

/// Offset zlib adds to `WINDOW_BITS` to select the gzip container.
pub const GZIP_CODEC: u8 = 16;

/// Default deflate compression level.
pub const DEFAULT_DEFLATE_LEVEL: u32 = 6;

/// Highest deflate compression level zlib accepts.
pub const MAX_DEFLATE_LEVEL: u32 = 9;

/// Gzip container magic (RFC 1952).
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Gzip header (10) + CRC32/ISIZE trailer (8).
pub const GZIP_WRAPPER_LEN: usize = 18;

/// zlib header (2) + Adler-32 trailer (4).
pub const ZLIB_WRAPPER_LEN: usize = 6;

// ── bzip2 ──────────────────────────────────────────────────────────────────

/// bzip2 stream magic: "BZh" followed by the block-size digit.
pub const BZIP2_MAGIC: [u8; 3] = *b"BZh";

/// Default bzip2 block size (x 100k).
pub const DEFAULT_BZIP2_LEVEL: u32 = 9;

/// Largest bzip2 block size (x 100k); the smallest is 1.
pub const MAX_BZIP2_LEVEL: u32 = 9;

/// Recommended bzip2 work factor (libbzip2 default).
pub const BZIP2_WORK_FACTOR: u32 = 30;

/// Fixed slack the bzip2 manual adds to its worst-case output bound.
pub const BZIP2_BOUND_SLACK: usize = 600;

// ── snappy ─────────────────────────────────────────────────────────────────

/// Largest uncompressed chunk the snappy framed format carries.
pub const SNAPPY_FRAME_CHUNK_LEN: usize = 1 << 16;

/// Stream identifier chunk that opens every snappy framed stream.
pub const SNAPPY_STREAM_IDENTIFIER_LEN: usize = 10;

/// Per-chunk header (type + 3-byte length) plus masked CRC32C.
pub const SNAPPY_CHUNK_OVERHEAD: usize = 8;

// ── Decompression sizing ───────────────────────────────────────────────────

/// Default cap on a single decompressed block: 1 GiB.
pub const DEFAULT_MAX_OUTPUT_LEN: usize = 1 << 30;

/// Smallest starting buffer for decompressors that have to guess.
pub const MIN_DECOMPRESS_ESTIMATE: usize = 4 * 1024;

/// Starting guess for decompressed size, as a multiple of the input.
pub const DECOMPRESS_EXPANSION_GUESS: usize = 4;
