//! Image framing for the aidlink protocol.
//!
//! Every image travels as one frame:
//! - A 4-byte magic prefix (`"AID0"`)
//! - A 64-byte little-endian [`WireHeader`] with dimensions, section lengths,
//!   row stride and the per-channel display adjustments
//! - The pixel format, name and notes strings, unterminated, each only when
//!   its declared length is non-zero
//! - The raw payload, written in chunks of at most [`FrameConfig::max_chunk_size`]
//!
//! The receiver relies solely on the declared lengths; nothing is padded.

pub mod adjust;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod reader;
pub mod writer;

pub use adjust::{AuxFlags, Channel, ChannelAdjustments, CHANNEL_COUNT};
pub use codec::{FrameConfig, WireHeader, DEFAULT_MAX_CHUNK, HEADER_SIZE, MAGIC};
pub use descriptor::{
    capped, ImageDescriptor, FORMAT_CAPACITY, MAX_PAYLOAD_SIZE, NAME_CAPACITY, NOTES_CAPACITY,
};
pub use error::{FrameError, Result, Section};
pub use reader::{FrameReader, ImageFrame};
pub use writer::{FrameWriter, PayloadStats, PreambleStats};
