use std::io::{ErrorKind, Write};

use aidlink_transport::Link;
use bytes::BytesMut;
use tracing::trace;

use crate::codec::{FrameConfig, WireHeader, HEADER_SIZE, MAGIC};
use crate::descriptor::ImageDescriptor;
use crate::error::{FrameError, Result, Section};

/// Bytes written for the magic, header and string sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreambleStats {
    pub header_bytes: usize,
    pub string_bytes: usize,
}

/// Bytes and write calls spent on the payload section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayloadStats {
    pub bytes: usize,
    pub chunks: usize,
}

/// Writes image frames to any `Write` stream.
///
/// Every section is written completely or the whole frame fails; nothing is
/// retried once a section write errors.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(HEADER_SIZE),
            config,
        }
    }

    /// Write the magic, `header` and the string sections of `desc`.
    ///
    /// `header` must have been built from `desc`; its lengths decide how many
    /// string bytes are sent.
    pub fn write_preamble(
        &mut self,
        header: &WireHeader,
        desc: &ImageDescriptor<'_>,
    ) -> Result<PreambleStats> {
        self.write_section(Section::Magic, &MAGIC)?;

        self.buf.clear();
        header.encode(&mut self.buf);
        let encoded = self.buf.split().freeze();
        self.write_section(Section::Header, &encoded)?;

        let strings = [
            (Section::Format, desc.format_bytes(), header.format_len),
            (Section::Name, desc.name_bytes(), header.name_len),
            (Section::Notes, desc.notes_bytes(), header.notes_len),
        ];
        let mut string_bytes = 0usize;
        for (section, bytes, declared) in strings {
            let declared = declared as usize;
            if declared == 0 {
                continue;
            }
            self.write_section(section, &bytes[..declared.min(bytes.len())])?;
            string_bytes += declared;
        }

        trace!(string_bytes, "frame preamble written");
        Ok(PreambleStats {
            header_bytes: MAGIC.len() + HEADER_SIZE,
            string_bytes,
        })
    }

    /// Write `payload` in chunks no larger than the configured maximum.
    pub fn write_payload(&mut self, payload: &[u8]) -> Result<PayloadStats> {
        let max_chunk = self.config.max_chunk_size.max(1);
        let mut stats = PayloadStats::default();

        for chunk in payload.chunks(max_chunk) {
            self.write_section(Section::Payload, chunk)?;
            stats.bytes += chunk.len();
            stats.chunks += 1;
            trace!(chunk = stats.chunks, sent = stats.bytes, "payload chunk written");
        }

        self.flush(Section::Payload)?;
        Ok(stats)
    }

    /// Write one section in full.
    fn write_section(&mut self, section: Section, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => {
                    return Err(FrameError::ShortWrite {
                        section,
                        written: offset,
                        expected: bytes.len(),
                    })
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(source) => return Err(FrameError::Send { section, source }),
            }
        }
        Ok(())
    }

    fn flush(&mut self, section: Section) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(source) => return Err(FrameError::Send { section, source }),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the maximum payload chunk size.
    pub fn set_max_chunk_size(&mut self, max_chunk_size: usize) {
        self.config.max_chunk_size = max_chunk_size;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<L: Link> FrameWriter<L> {
    /// Create a frame writer over a transport link and apply the configured
    /// write timeout to it.
    pub fn with_config_link(inner: L, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};
    use std::net::{TcpListener, TcpStream};
    use std::time::{Duration, Instant};

    use super::*;
    use crate::adjust::ChannelAdjustments;

    fn write_frame<W: Write>(
        writer: &mut FrameWriter<W>,
        desc: &ImageDescriptor<'_>,
    ) -> Result<(PreambleStats, PayloadStats)> {
        let header = WireHeader::build(desc, &ChannelAdjustments::default())?;
        let preamble = writer.write_preamble(&header, desc)?;
        let payload = writer.write_payload(desc.payload)?;
        Ok((preamble, payload))
    }

    #[test]
    fn writes_sections_in_order_without_separators() {
        let payload = [0u8, 0, 0, 255, 255, 255];
        let desc = ImageDescriptor::new(2, 1, "R8G8B8", &payload).with_name("t");
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let (preamble, stats) = write_frame(&mut writer, &desc).unwrap();
        let wire = writer.into_inner().into_inner();

        assert_eq!(&wire[..4], b"AID0");
        let header = WireHeader::decode(&wire[4..]).unwrap();
        assert_eq!(header.format_len, 6);
        assert_eq!(header.name_len, 1);
        assert_eq!(header.notes_len, 0);
        assert_eq!(&wire[68..74], b"R8G8B8");
        assert_eq!(&wire[74..75], b"t");
        assert_eq!(&wire[75..], &payload);

        assert_eq!(preamble.header_bytes, 68);
        assert_eq!(preamble.string_bytes, 7);
        assert_eq!(stats, PayloadStats { bytes: 6, chunks: 1 });
    }

    #[test]
    fn truncated_strings_put_exactly_capacity_minus_one_on_wire() {
        let name = "n".repeat(300);
        let desc = ImageDescriptor::new(1, 1, "", &[]).with_name(name.as_str());
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let (preamble, _) = write_frame(&mut writer, &desc).unwrap();
        let wire = writer.into_inner().into_inner();

        assert_eq!(preamble.string_bytes, 127);
        assert_eq!(wire.len(), 4 + HEADER_SIZE + 127);
    }

    #[test]
    fn payload_chunk_count_is_ceiling_division() {
        for (size, chunk) in [(1usize, 1usize), (10, 3), (12, 4), (4096, 1000), (7, 100)] {
            let payload = vec![0x5A; size];
            let sink = RecordingWriter::default();
            let config = FrameConfig {
                max_chunk_size: chunk,
                ..FrameConfig::default()
            };
            let mut writer = FrameWriter::with_config(sink, config);

            let stats = writer.write_payload(&payload).unwrap();
            let sink = writer.into_inner();

            assert_eq!(stats.chunks, size.div_ceil(chunk), "size={size} chunk={chunk}");
            assert_eq!(sink.writes.len(), size.div_ceil(chunk));
            assert!(sink.writes.iter().all(|&len| len <= chunk));
            assert_eq!(sink.writes.iter().sum::<usize>(), size);
        }
    }

    #[test]
    fn empty_payload_writes_nothing() {
        let mut writer = FrameWriter::new(RecordingWriter::default());
        let stats = writer.write_payload(&[]).unwrap();
        assert_eq!(stats, PayloadStats::default());
        assert!(writer.get_ref().writes.is_empty());
    }

    #[test]
    fn short_write_fails_the_section() {
        let mut writer = FrameWriter::new(LimitedWriter { remaining: 10 });
        let payload = [1u8; 20];
        let err = writer.write_payload(&payload).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortWrite {
                section: Section::Payload,
                written: 10,
                expected: 20,
            }
        ));
    }

    #[test]
    fn write_error_reports_section() {
        let desc = ImageDescriptor::new(1, 1, "R8", &[1u8]);
        let mut writer = FrameWriter::new(BrokenPipe);
        let err = write_frame(&mut writer, &desc).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Send {
                section: Section::Magic,
                ..
            }
        ));
    }

    #[test]
    fn handles_interrupted_write() {
        let mut writer = FrameWriter::new(InterruptedOnce {
            interrupted: false,
            data: Vec::new(),
        });
        writer.write_payload(b"retry").unwrap();
        assert_eq!(writer.into_inner().data, b"retry");
    }

    #[test]
    fn accessors_and_config() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.set_max_chunk_size(16);
        assert_eq!(writer.config().max_chunk_size, 16);
        let _ = writer.get_ref();
        let _ = writer.get_mut();
    }

    #[test]
    fn write_timeout_bounds_a_stalled_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        // Accepted but never read from.
        let (_peer, _) = listener.accept().unwrap();

        let config = FrameConfig {
            write_timeout: Some(Duration::from_millis(50)),
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config_link(stream, config).unwrap();
        assert_eq!(
            writer.get_ref().write_timeout().unwrap(),
            Some(Duration::from_millis(50))
        );

        let payload = vec![0u8; 64 * 1024 * 1024];
        let started = Instant::now();
        let err = writer.write_payload(&payload).unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(10));
        match err {
            FrameError::Send {
                section: Section::Payload,
                source,
            } => assert!(matches!(
                source.kind(),
                ErrorKind::WouldBlock | ErrorKind::TimedOut
            )),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn link_writer_without_timeout_still_writes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        let mut writer = FrameWriter::with_config_link(stream, FrameConfig::default()).unwrap();
        assert_eq!(writer.get_ref().write_timeout().unwrap(), None);
        writer.write_payload(b"pixels").unwrap();
        drop(writer);

        let mut received = Vec::new();
        peer.read_to_end(&mut received).unwrap();
        assert_eq!(received, b"pixels");
    }

    #[derive(Default)]
    struct RecordingWriter {
        writes: Vec<usize>,
    }

    impl Write for RecordingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.writes.push(buf.len());
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct LimitedWriter {
        remaining: usize,
    }

    impl Write for LimitedWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.remaining);
            self.remaining -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct InterruptedOnce {
        interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
