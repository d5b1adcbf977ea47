pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod pool;

pub use buffer::{BlockOutput, Fill, OutputBound, OutputBuffer};
pub use codec::{Codec, CodecBase};
pub use config::{Algorithm, CodecConfig, Direction};
pub use error::{AllocationError, CodecError, Result};
pub use pool::{BufferOwner, MemPool};
