use std::net::SocketAddr;
use std::time::Duration;

use aidlink_frame::{
    AuxFlags, Channel, ChannelAdjustments, FrameConfig, FrameWriter, ImageDescriptor, WireHeader,
    DEFAULT_MAX_CHUNK,
};
use aidlink_transport::{
    connect_with, resolve, runtime, Dialer, RetryPolicy, TcpDialer, DEFAULT_LINGER,
};
use tracing::{debug, info, warn};

use crate::config::TransmissionConfig;
use crate::error::{Result, SendStage};
use crate::handshake::{await_ready_on, HandshakeConfig};

/// Outcome of a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    /// Viewer address the image went to.
    pub peer: SocketAddr,
    /// Connect attempts used.
    pub attempts: u32,
    /// Readiness polls used.
    pub polls: u32,
    /// Magic plus header bytes.
    pub header_bytes: usize,
    /// Format, name and notes bytes.
    pub string_bytes: usize,
    pub payload_bytes: usize,
    pub chunks: usize,
}

/// Sends images to a viewer, one connection per image.
///
/// Configuration and channel adjustments persist across sends. `send` takes
/// `&mut self`, so one instance never has two sends in flight; wrap it in a
/// `Mutex` to share it between threads.
pub struct Transmitter<D = TcpDialer> {
    config: TransmissionConfig,
    adjustments: ChannelAdjustments,
    retry: RetryPolicy,
    linger: Option<Duration>,
    handshake: HandshakeConfig,
    max_chunk_size: usize,
    dialer: D,
}

impl Transmitter<TcpDialer> {
    /// Transmitter for the default viewer at `127.0.0.1:5999`.
    pub fn new() -> Self {
        Self::with_dialer(TcpDialer)
    }
}

impl Default for Transmitter<TcpDialer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dialer> Transmitter<D> {
    /// Transmitter that opens connections through `dialer`.
    pub fn with_dialer(dialer: D) -> Self {
        if let Err(err) = runtime::init() {
            warn!(error = %err, "transport runtime setup failed; continuing");
        }
        Self {
            config: TransmissionConfig::default(),
            adjustments: ChannelAdjustments::default(),
            retry: RetryPolicy::default(),
            linger: Some(DEFAULT_LINGER),
            handshake: HandshakeConfig::default(),
            max_chunk_size: DEFAULT_MAX_CHUNK,
            dialer,
        }
    }

    /// Override the connect retry schedule.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the readiness wait.
    pub fn with_handshake_config(mut self, handshake: HandshakeConfig) -> Self {
        self.handshake = handshake;
        self
    }

    /// Override the maximum bytes per payload write.
    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size.max(1);
        self
    }

    /// Override the close linger period (`None` keeps the OS default).
    pub fn with_linger(mut self, linger: Option<Duration>) -> Self {
        self.linger = linger;
        self
    }

    /// Set viewer address and timeout.
    ///
    /// On error (host name over 255 bytes) the previous configuration is kept.
    pub fn configure(&mut self, port: u16, host: &str, timeout: Duration) -> Result<()> {
        self.config = TransmissionConfig::new(host, port, timeout)?;
        debug!(host, port, ?timeout, "transmitter configured");
        Ok(())
    }

    /// Set gain of channel slot `channel` (0..4); other indices are ignored.
    pub fn set_gain(&mut self, channel: usize, value: f32) {
        self.adjustments.set_gain(channel, value);
    }

    /// Set bias of channel slot `channel` (0..4); other indices are ignored.
    pub fn set_bias(&mut self, channel: usize, value: f32) {
        self.adjustments.set_bias(channel, value);
    }

    pub fn set_channel_gain(&mut self, channel: Channel, value: f32) {
        self.adjustments.set_channel_gain(channel, value);
    }

    pub fn set_channel_bias(&mut self, channel: Channel, value: f32) {
        self.adjustments.set_channel_bias(channel, value);
    }

    /// Replace the auxiliary flags.
    pub fn set_flags(&mut self, flags: AuxFlags) {
        self.adjustments.set_flags(flags);
    }

    pub fn config(&self) -> &TransmissionConfig {
        &self.config
    }

    pub fn adjustments(&self) -> &ChannelAdjustments {
        &self.adjustments
    }

    pub fn handshake_config(&self) -> &HandshakeConfig {
        &self.handshake
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send one image.
    ///
    /// Connects (with bounded retry), waits for the viewer's readiness byte,
    /// writes the frame and closes the connection. The connection is closed on
    /// every path; nothing is retried after the connection is established.
    pub fn send(&mut self, desc: &ImageDescriptor<'_>) -> Result<SendReport> {
        let result = self.send_frame(desc);
        match &result {
            Ok(report) => info!(
                peer = %report.peer,
                width = desc.width,
                height = desc.height,
                payload_bytes = report.payload_bytes,
                chunks = report.chunks,
                "image sent"
            ),
            Err(err) => warn!(
                host = self.config.host(),
                port = self.config.port,
                stage = %err.stage(),
                error = %err,
                "image send failed"
            ),
        }
        result
    }

    fn send_frame(&mut self, desc: &ImageDescriptor<'_>) -> Result<SendReport> {
        debug!(stage = %SendStage::Validating, "building header");
        let header = WireHeader::build(desc, &self.adjustments)?;

        debug!(stage = %SendStage::Resolving, host = self.config.host(), port = self.config.port);
        let addr = resolve(self.config.host(), self.config.port)?;

        debug!(stage = %SendStage::Connecting, %addr);
        let connect_config = self.config.connect_config(self.retry, self.linger);
        let mut conn = connect_with(&mut self.dialer, addr, &connect_config)?;
        let (peer, attempts) = (conn.peer(), conn.attempts());

        debug!(stage = %SendStage::Handshake, polls = self.handshake.max_polls);
        let polls = await_ready_on(&mut conn, &self.handshake)?;

        debug!(stage = %SendStage::SendingHeader, ?header);
        let frame_config = FrameConfig {
            max_chunk_size: self.max_chunk_size,
            write_timeout: self.config.io_timeout(),
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config_link(conn, frame_config)?;
        let preamble = writer.write_preamble(&header, desc)?;

        debug!(stage = %SendStage::SendingPayload, bytes = desc.payload.len());
        let payload = writer.write_payload(desc.payload)?;

        let report = SendReport {
            peer,
            attempts,
            polls,
            header_bytes: preamble.header_bytes,
            string_bytes: preamble.string_bytes,
            payload_bytes: payload.bytes,
            chunks: payload.chunks,
        };
        drop(writer);
        Ok(report)
    }
}
