mod bzip_codec;
mod gzip_codec;
mod snappy_block_codec;
mod snappy_codec;

pub use bzip_codec::{bzip2_bound, BzipCodec};
pub use gzip_codec::{deflate_bound, zlib_window_bits, GzipCodec};
pub use snappy_block_codec::{frame_bound, SnappyBlockCodec};
pub use snappy_codec::SnappyRawCodec;

use pagecodec_core::{Algorithm, BufferOwner, Codec, CodecConfig, Result};

/// Build and initialize the codec described by `config`.
///
/// The returned codec borrows `owner` for its whole life and is ready for
/// `process_block`. `Gzip` and `Deflate` share [`GzipCodec`]; they differ
/// only in the container written around the deflate stream.
pub fn create_codec<'a>(
    config: &CodecConfig,
    owner: &'a dyn BufferOwner,
) -> Result<Box<dyn Codec + 'a>> {
    config.validate()?;
    let (reuse, direction, max_len) = (
        config.reuse_buffer,
        config.direction,
        config.max_output_len,
    );
    let mut codec: Box<dyn Codec + 'a> = match config.algorithm {
        Algorithm::Gzip | Algorithm::Deflate => Box::new(
            GzipCodec::new(owner, reuse, direction, config.algorithm == Algorithm::Gzip)
                .with_level(config.effective_level())
                .with_max_output_len(max_len),
        ),
        Algorithm::Bzip2 => Box::new(
            BzipCodec::new(owner, reuse, direction)
                .with_level(config.effective_level())
                .with_max_output_len(max_len),
        ),
        Algorithm::SnappyBlocked => {
            Box::new(SnappyBlockCodec::new(owner, reuse, direction).with_max_output_len(max_len))
        }
        Algorithm::Snappy => {
            Box::new(SnappyRawCodec::new(owner, reuse, direction).with_max_output_len(max_len))
        }
    };
    codec.init()?;
    Ok(codec)
}
