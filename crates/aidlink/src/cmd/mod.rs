use std::path::PathBuf;
use std::time::Duration;

use aidlink_client::{HandshakeConfig, RetryPolicy, Transmitter, READY_BYTE};
use clap::{Args, Subcommand};

use crate::exit::{transmit_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod demo;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a raw pixel file as one image.
    Send(SendArgs),
    /// Synthesize and send the demonstration images.
    Demo(DemoArgs),
    /// Act as a viewer and print every received image.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Demo(args) => demo::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Viewer address and connection tuning shared by sending commands.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Viewer host name or address.
    #[arg(long, env = "AIDLINK_HOST", default_value = aidlink_client::DEFAULT_HOST)]
    pub host: String,
    /// Viewer TCP port.
    #[arg(long, env = "AIDLINK_PORT", default_value_t = aidlink_client::DEFAULT_PORT)]
    pub port: u16,
    /// Connect and write timeout (e.g. 60s, 500ms).
    #[arg(long, env = "AIDLINK_TIMEOUT", default_value = "60s")]
    pub timeout: String,
    /// Total connect attempts.
    #[arg(long, default_value_t = 3)]
    pub attempts: u32,
    /// Pause between failed connect attempts.
    #[arg(long, default_value = "2s")]
    pub retry_delay: String,
    /// How long each readiness poll waits.
    #[arg(long, default_value = "250ms")]
    pub poll_interval: String,
    /// Readiness polls before giving up.
    #[arg(long, default_value_t = aidlink_client::DEFAULT_MAX_POLLS)]
    pub max_polls: u32,
}

impl ConnectArgs {
    pub fn transmitter(&self) -> CliResult<Transmitter> {
        let timeout = parse_duration(&self.timeout)?;
        let retry = RetryPolicy {
            attempts: self.attempts,
            delay: parse_duration(&self.retry_delay)?,
        };
        let handshake = HandshakeConfig {
            poll_timeout: parse_duration(&self.poll_interval)?,
            max_polls: self.max_polls,
            ready_byte: READY_BYTE,
        };

        let mut transmitter = Transmitter::new()
            .with_retry_policy(retry)
            .with_handshake_config(handshake);
        transmitter
            .configure(self.port, &self.host, timeout)
            .map_err(|err| transmit_error("invalid connection settings", err))?;
        Ok(transmitter)
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Raw pixel file to send.
    #[arg(long)]
    pub file: PathBuf,
    /// Image width in pixels.
    #[arg(long)]
    pub width: u32,
    /// Image height in pixels.
    #[arg(long)]
    pub height: u32,
    /// Pixel format string understood by the viewer (e.g. R8G8B8).
    #[arg(long = "pixel-format", short = 'p')]
    pub pixel_format: String,
    /// Image name shown by the viewer.
    #[arg(long)]
    pub name: Option<String>,
    /// Free-form notes.
    #[arg(long)]
    pub notes: Option<String>,
    /// Row stride in bits (0 = tightly packed).
    #[arg(long, default_value_t = 0)]
    pub row_stride_bits: u32,
    /// Per-channel gain, R,G,B,A (missing trailing channels keep 1.0).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub gain: Option<Vec<f32>>,
    /// Per-channel bias, R,G,B,A (missing trailing channels keep 0.0).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub bias: Option<Vec<f32>>,
    /// Ask the viewer to compute gain and bias itself.
    #[arg(long)]
    pub auto_gain_bias: bool,
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Send only demonstration image N (1-4).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub only: Option<u8>,
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to accept transmitters on.
    #[arg(long, default_value = "127.0.0.1:5999")]
    pub bind: String,
    /// Exit after receiving N images.
    #[arg(long)]
    pub count: Option<usize>,
    /// Per-image read timeout (e.g. 30s).
    #[arg(long, default_value = "60s")]
    pub read_timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `250ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
