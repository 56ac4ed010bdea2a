use std::fmt;

/// The part of a frame an operation was working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Magic,
    Header,
    Format,
    Name,
    Notes,
    Payload,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Magic => "magic",
            Section::Header => "header",
            Section::Format => "format string",
            Section::Name => "name",
            Section::Notes => "notes",
            Section::Payload => "payload",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame does not start with the `AID0` magic.
    #[error("invalid frame magic {found:02x?} (expected \"AID0\")")]
    InvalidMagic { found: [u8; 4] },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A declared string length exceeds its section capacity.
    #[error("{section} length {len} exceeds capacity {max}")]
    StringTooLong {
        section: Section,
        len: usize,
        max: usize,
    },

    /// Writing a section failed.
    #[error("failed to send {section}: {source}")]
    Send {
        section: Section,
        source: std::io::Error,
    },

    /// The peer stopped accepting bytes before a section was complete.
    #[error("short write on {section} ({written} of {expected} bytes)")]
    ShortWrite {
        section: Section,
        written: usize,
        expected: usize,
    },

    /// An I/O error occurred while reading frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// Section a write failure happened in, if any.
    pub fn section(&self) -> Option<Section> {
        match self {
            FrameError::Send { section, .. }
            | FrameError::ShortWrite { section, .. }
            | FrameError::StringTooLong { section, .. } => Some(*section),
            FrameError::InvalidMagic { .. } => Some(Section::Magic),
            FrameError::PayloadTooLarge { .. } => Some(Section::Payload),
            FrameError::Io(_) | FrameError::ConnectionClosed => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
