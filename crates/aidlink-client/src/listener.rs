use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use aidlink_frame::{FrameConfig, FrameReader, ImageFrame};
use aidlink_transport::TransportError;
use tracing::{debug, info};

use crate::error::Result;
use crate::handshake::READY_BYTE;

/// Receiving end of the protocol: accepts transmitters and reads their images.
///
/// Serves one connection at a time, matching the one-image-per-connection
/// protocol.
pub struct ViewerListener {
    listener: TcpListener,
    ready_byte: u8,
    frame_config: FrameConfig,
}

impl ViewerListener {
    /// Bind to a TCP address.
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(TransportError::Io)?;
        info!(addr = ?listener.local_addr().ok(), "viewer listening");
        Ok(Self {
            listener,
            ready_byte: READY_BYTE,
            frame_config: FrameConfig::default(),
        })
    }

    /// Override the readiness byte.
    pub fn with_ready_byte(mut self, ready_byte: u8) -> Self {
        self.ready_byte = ready_byte;
        self
    }

    /// Override frame limits and the read timeout of accepted sessions.
    pub fn with_frame_config(mut self, config: FrameConfig) -> Self {
        self.frame_config = config;
        self
    }

    /// Bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr().map_err(TransportError::Io)?)
    }

    /// Accept the next transmitter connection (blocking).
    pub fn accept(&self) -> Result<ViewerSession> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Io)?;
        stream
            .set_read_timeout(self.frame_config.read_timeout)
            .map_err(TransportError::Io)?;
        debug!(%peer, "transmitter connected");
        Ok(ViewerSession {
            stream,
            peer,
            ready_byte: self.ready_byte,
            frame_config: self.frame_config.clone(),
        })
    }

    /// Accept a connection, signal readiness and read one image.
    pub fn accept_image(&self) -> Result<(SocketAddr, ImageFrame)> {
        let mut session = self.accept()?;
        session.signal_ready()?;
        let frame = session.read_image()?;
        Ok((session.peer(), frame))
    }
}

/// One accepted transmitter connection.
pub struct ViewerSession {
    stream: TcpStream,
    peer: SocketAddr,
    ready_byte: u8,
    frame_config: FrameConfig,
}

impl ViewerSession {
    /// Tell the transmitter it may start sending.
    pub fn signal_ready(&mut self) -> Result<()> {
        self.stream
            .write_all(&[self.ready_byte])
            .map_err(TransportError::Io)?;
        Ok(())
    }

    /// Read one complete image frame.
    pub fn read_image(&mut self) -> Result<ImageFrame> {
        let mut reader = FrameReader::with_config(&mut self.stream, self.frame_config.clone());
        let frame = reader.read_frame()?;
        debug!(
            peer = %self.peer,
            width = frame.header.width,
            height = frame.header.height,
            payload = frame.payload.len(),
            "image received"
        );
        Ok(frame)
    }

    /// Address of the transmitter.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Set the read timeout for the rest of the session.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream
            .set_read_timeout(timeout)
            .map_err(TransportError::Io)?;
        Ok(())
    }
}
