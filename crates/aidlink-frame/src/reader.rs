use std::borrow::Cow;
use std::io::Read;

use bytes::Bytes;
use tracing::trace;

use crate::codec::{FrameConfig, WireHeader, HEADER_SIZE, MAGIC};
use crate::descriptor::{FORMAT_CAPACITY, NAME_CAPACITY, NOTES_CAPACITY};
use crate::error::{FrameError, Result, Section};

/// Up-front buffer reservation for a section; larger sections grow as data arrives.
const READ_CHUNK: usize = 64 * 1024;

/// A complete image frame as seen by the receiving viewer.
#[derive(Debug, Clone)]
pub struct ImageFrame {
    pub header: WireHeader,
    pub format: Bytes,
    pub name: Bytes,
    pub notes: Bytes,
    pub payload: Bytes,
}

impl ImageFrame {
    pub fn format_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.format)
    }

    pub fn name_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    pub fn notes_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.notes)
    }
}

/// Reads complete image frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached mid-frame.
    pub fn read_frame(&mut self) -> Result<ImageFrame> {
        let magic = self.read_section(MAGIC.len())?;
        if magic.as_ref() != MAGIC {
            let mut found = [0u8; 4];
            found.copy_from_slice(&magic);
            return Err(FrameError::InvalidMagic { found });
        }

        let raw = self.read_section(HEADER_SIZE)?;
        let header = WireHeader::decode(&raw).ok_or(FrameError::ConnectionClosed)?;

        let payload_size = header.payload_size as usize;
        if payload_size > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload_size,
                max: self.config.max_payload_size,
            });
        }

        let format = self.read_string(Section::Format, header.format_len, FORMAT_CAPACITY)?;
        let name = self.read_string(Section::Name, header.name_len, NAME_CAPACITY)?;
        let notes = self.read_string(Section::Notes, header.notes_len, NOTES_CAPACITY)?;
        let payload = self.read_section(payload_size)?;

        trace!(
            width = header.width,
            height = header.height,
            payload_size,
            "frame read"
        );
        Ok(ImageFrame {
            header,
            format,
            name,
            notes,
            payload,
        })
    }

    fn read_string(&mut self, section: Section, declared: u32, capacity: usize) -> Result<Bytes> {
        let len = declared as usize;
        if len >= capacity {
            return Err(FrameError::StringTooLong {
                section,
                len,
                max: capacity - 1,
            });
        }
        self.read_section(len)
    }

    /// Read exactly `len` bytes. The buffer grows with the data actually
    /// received, so a bogus declared length costs nothing until bytes arrive.
    fn read_section(&mut self, len: usize) -> Result<Bytes> {
        let mut buf = Vec::with_capacity(len.min(READ_CHUNK));
        (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut buf)
            .map_err(FrameError::Io)?;
        if buf.len() < len {
            return Err(FrameError::ConnectionClosed);
        }
        Ok(Bytes::from(buf))
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent frames.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::adjust::{AuxFlags, ChannelAdjustments};
    use crate::descriptor::ImageDescriptor;
    use crate::writer::FrameWriter;

    fn encode(desc: &ImageDescriptor<'_>, adj: &ChannelAdjustments) -> Vec<u8> {
        let header = WireHeader::build(desc, adj).unwrap();
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_preamble(&header, desc).unwrap();
        writer.write_payload(desc.payload).unwrap();
        writer.into_inner().into_inner()
    }

    #[test]
    fn reads_frame_written_by_writer() {
        let payload = [0u8, 0, 0, 255, 255, 255];
        let desc = ImageDescriptor::new(2, 1, "R8G8B8", &payload)
            .with_name("t")
            .with_notes("two pixels");
        let mut adj = ChannelAdjustments::default();
        adj.set_gain(1, 2.0);
        adj.set_flags(AuxFlags::AUTO_GAIN_BIAS);

        let wire = encode(&desc, &adj);
        let mut reader = FrameReader::new(Cursor::new(wire));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.header.width, 2);
        assert_eq!(frame.header.gain, [1.0, 2.0, 1.0, 1.0]);
        assert_eq!(frame.header.aux_flags, AuxFlags::AUTO_GAIN_BIAS);
        assert_eq!(frame.format_str(), "R8G8B8");
        assert_eq!(frame.name_str(), "t");
        assert_eq!(frame.notes_str(), "two pixels");
        assert_eq!(frame.payload.as_ref(), &payload);
    }

    #[test]
    fn read_frame_with_large_payload() {
        let payload = vec![0xAB; 64 * 1024];
        let desc = ImageDescriptor::new(128, 128, "R8G8B8A8", &payload);
        let wire = encode(&desc, &ChannelAdjustments::default());

        let mut reader = FrameReader::new(Cursor::new(wire));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.len(), payload.len());
        assert!(frame.name.is_empty());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut reader = FrameReader::new(Cursor::new(b"NOPE".to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::InvalidMagic { found } if &found == b"NOPE"));
    }

    #[test]
    fn truncated_stream_reports_connection_closed() {
        let desc = ImageDescriptor::new(1, 1, "R8", &[1u8, 2, 3]);
        let mut wire = encode(&desc, &ChannelAdjustments::default());
        wire.truncate(wire.len() - 1);

        let mut reader = FrameReader::new(Cursor::new(wire));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn payload_cap_is_enforced() {
        let payload = vec![0u8; 100];
        let desc = ImageDescriptor::new(10, 10, "R8", &payload);
        let wire = encode(&desc, &ChannelAdjustments::default());

        let mut reader = FrameReader::new(Cursor::new(wire));
        reader.set_max_payload_size(64);
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::PayloadTooLarge { size: 100, max: 64 })
        ));
    }

    #[test]
    fn huge_declared_payload_with_short_stream_is_closed() {
        let mut wire = BytesMut::new();
        wire.put_slice(&MAGIC);
        let header = WireHeader {
            width: 1,
            height: 1,
            format_len: 0,
            payload_size: i32::MAX as u32,
            name_len: 0,
            notes_len: 0,
            row_stride_bits: 0,
            gain: [1.0; 4],
            bias: [0.0; 4],
            aux_flags: AuxFlags::empty(),
        };
        header.encode(&mut wire);
        wire.put_slice(&[1, 2, 3]);

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn read_errors_surface_as_io() {
        struct Failing;

        impl Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset))
            }
        }

        let mut reader = FrameReader::new(Failing);
        assert!(matches!(reader.read_frame(), Err(FrameError::Io(_))));
    }

    #[test]
    fn oversized_string_length_is_rejected() {
        let mut wire = BytesMut::new();
        wire.put_slice(&MAGIC);
        let header = WireHeader {
            width: 1,
            height: 1,
            format_len: FORMAT_CAPACITY as u32,
            payload_size: 0,
            name_len: 0,
            notes_len: 0,
            row_stride_bits: 0,
            gain: [1.0; 4],
            bias: [0.0; 4],
            aux_flags: AuxFlags::empty(),
        };
        header.encode(&mut wire);

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::StringTooLong {
                section: Section::Format,
                ..
            })
        ));
    }
}
