use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};

use crate::adjust::{AuxFlags, ChannelAdjustments, CHANNEL_COUNT};
use crate::descriptor::{ImageDescriptor, MAX_PAYLOAD_SIZE};
use crate::error::{FrameError, Result};

/// Magic bytes: "AID0".
pub const MAGIC: [u8; 4] = *b"AID0";

/// Header: seven u32 fields + four f32 gains + four f32 biases + u32 flags = 64 bytes.
pub const HEADER_SIZE: usize = 7 * 4 + 2 * CHANNEL_COUNT * 4 + 4;

/// Upper bound for a single payload write: 256 MiB.
pub const DEFAULT_MAX_CHUNK: usize = 0x1000_0000;

/// Fixed-layout record describing one image.
///
/// Wire format (all fields little-endian, no padding):
/// ```text
/// offset  size  field
///      0     4  width
///      4     4  height
///      8     4  format length
///     12     4  payload size in bytes
///     16     4  name length
///     20     4  notes length
///     24     4  row stride in bits
///     28    16  gain  [R, G, B, A] (f32)
///     44    16  bias  [R, G, B, A] (f32)
///     60     4  aux flags
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireHeader {
    pub width: u32,
    pub height: u32,
    pub format_len: u32,
    pub payload_size: u32,
    pub name_len: u32,
    pub notes_len: u32,
    pub row_stride_bits: u32,
    pub gain: [f32; CHANNEL_COUNT],
    pub bias: [f32; CHANNEL_COUNT],
    pub aux_flags: AuxFlags,
}

impl WireHeader {
    /// Build the header for `desc` using the current adjustments.
    ///
    /// String lengths are the measured, capped lengths, not the capacities.
    pub fn build(desc: &ImageDescriptor<'_>, adjustments: &ChannelAdjustments) -> Result<Self> {
        if desc.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge {
                size: desc.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        // All capped lengths fit in u32: capacities are at most 4096.
        Ok(Self {
            width: desc.width,
            height: desc.height,
            format_len: desc.format_bytes().len() as u32,
            payload_size: desc.payload.len() as u32,
            name_len: desc.name_bytes().len() as u32,
            notes_len: desc.notes_bytes().len() as u32,
            row_stride_bits: desc.row_stride_bits,
            gain: adjustments.gains(),
            bias: adjustments.biases(),
            aux_flags: adjustments.flags(),
        })
    }

    /// Append the encoded header to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u32_le(self.width);
        dst.put_u32_le(self.height);
        dst.put_u32_le(self.format_len);
        dst.put_u32_le(self.payload_size);
        dst.put_u32_le(self.name_len);
        dst.put_u32_le(self.notes_len);
        dst.put_u32_le(self.row_stride_bits);
        for gain in self.gain {
            dst.put_f32_le(gain);
        }
        for bias in self.bias {
            dst.put_f32_le(bias);
        }
        dst.put_u32_le(self.aux_flags.bits());
    }

    /// Decode a header from the front of `src`.
    ///
    /// Returns `None` if `src` is shorter than [`HEADER_SIZE`].
    pub fn decode(mut src: &[u8]) -> Option<Self> {
        if src.len() < HEADER_SIZE {
            return None;
        }

        let width = src.get_u32_le();
        let height = src.get_u32_le();
        let format_len = src.get_u32_le();
        let payload_size = src.get_u32_le();
        let name_len = src.get_u32_le();
        let notes_len = src.get_u32_le();
        let row_stride_bits = src.get_u32_le();
        let mut gain = [0.0f32; CHANNEL_COUNT];
        for slot in &mut gain {
            *slot = src.get_f32_le();
        }
        let mut bias = [0.0f32; CHANNEL_COUNT];
        for slot in &mut bias {
            *slot = src.get_f32_le();
        }
        let aux_flags = AuxFlags::from_bits_retain(src.get_u32_le());

        Some(Self {
            width,
            height,
            format_len,
            payload_size,
            name_len,
            notes_len,
            row_stride_bits,
            gain,
            bias,
            aux_flags,
        })
    }

    /// Total bytes of the string sections that follow the header.
    pub fn strings_len(&self) -> usize {
        self.format_len as usize + self.name_len as usize + self.notes_len as usize
    }
}

/// Configuration for frame writing and reading.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest single payload write. Default: 256 MiB.
    pub max_chunk_size: usize,
    /// Largest payload a reader accepts. Default: `i32::MAX` bytes.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK,
            max_payload_size: MAX_PAYLOAD_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> WireHeader {
        let payload = [0, 0, 0, 255, 255, 255];
        let desc = ImageDescriptor::new(2, 1, "R8G8B8", &payload).with_name("t");
        WireHeader::build(&desc, &ChannelAdjustments::default()).unwrap()
    }

    #[test]
    fn header_size_is_64_bytes() {
        assert_eq!(HEADER_SIZE, 64);
        let mut buf = BytesMut::new();
        sample_header().encode(&mut buf);
        assert_eq!(buf.len(), HEADER_SIZE);
    }

    #[test]
    fn build_uses_measured_lengths() {
        let header = sample_header();
        assert_eq!(header.width, 2);
        assert_eq!(header.height, 1);
        assert_eq!(header.format_len, 6);
        assert_eq!(header.payload_size, 6);
        assert_eq!(header.name_len, 1);
        assert_eq!(header.notes_len, 0);
        assert_eq!(header.gain, [1.0; 4]);
        assert_eq!(header.bias, [0.0; 4]);
        assert!(header.aux_flags.is_empty());
        assert_eq!(header.strings_len(), 7);
    }

    #[test]
    fn encode_layout_is_little_endian() {
        let mut adj = ChannelAdjustments::default();
        adj.set_gain(0, 0.5);
        adj.set_bias(3, -1.0);
        adj.set_flags(AuxFlags::AUTO_GAIN_BIAS);
        let payload = [1u8; 12];
        let desc = ImageDescriptor::new(0x0102_0304, 3, "f", &payload).with_row_stride_bits(96);
        let header = WireHeader::build(&desc, &adj).unwrap();

        let mut buf = BytesMut::new();
        header.encode(&mut buf);

        assert_eq!(&buf[0..4], &[0x04u8, 0x03, 0x02, 0x01]);
        assert_eq!(&buf[4..8], &3u32.to_le_bytes());
        assert_eq!(&buf[8..12], &1u32.to_le_bytes());
        assert_eq!(&buf[12..16], &12u32.to_le_bytes());
        assert_eq!(&buf[16..20], &0u32.to_le_bytes());
        assert_eq!(&buf[20..24], &0u32.to_le_bytes());
        assert_eq!(&buf[24..28], &96u32.to_le_bytes());
        assert_eq!(&buf[28..32], &0.5f32.to_le_bytes());
        assert_eq!(&buf[32..36], &1.0f32.to_le_bytes());
        assert_eq!(&buf[44..48], &0.0f32.to_le_bytes());
        assert_eq!(&buf[56..60], &(-1.0f32).to_le_bytes());
        assert_eq!(&buf[60..64], &1u32.to_le_bytes());
    }

    #[test]
    fn decode_inverts_encode() {
        let header = sample_header();
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(WireHeader::decode(&buf), Some(header));
    }

    #[test]
    fn decode_short_buffer_is_none() {
        assert!(WireHeader::decode(&[0u8; HEADER_SIZE - 1]).is_none());
    }

    #[test]
    fn repeated_builds_are_identical() {
        assert_eq!(sample_header(), sample_header());
    }

    #[test]
    fn truncated_strings_report_capped_lengths() {
        let long_format = "x".repeat(500);
        let long_notes = "n".repeat(10_000);
        let desc = ImageDescriptor::new(1, 1, long_format.as_str(), &[])
            .with_name(long_format.as_str())
            .with_notes(long_notes.as_str());
        let header = WireHeader::build(&desc, &ChannelAdjustments::default()).unwrap();
        assert_eq!(header.format_len, 127);
        assert_eq!(header.name_len, 127);
        assert_eq!(header.notes_len, 4095);
        assert_eq!(header.payload_size, 0);
    }
}
