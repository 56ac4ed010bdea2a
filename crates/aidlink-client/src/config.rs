use std::time::Duration;

use aidlink_transport::{ConnectConfig, RetryPolicy, TransportError, DEFAULT_LINGER, MAX_HOST_LEN};

use crate::error::Result;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5999;
/// Bounds each connect attempt and each blocking write.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Where and how long to talk to the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmissionConfig {
    host: String,
    pub port: u16,
    /// Zero disables the timeout.
    pub timeout: Duration,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TransmissionConfig {
    /// Build a configuration, rejecting host names over 255 bytes.
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Result<Self> {
        let host = host.into();
        if host.len() > MAX_HOST_LEN {
            return Err(TransportError::HostTooLong {
                len: host.len(),
                max: MAX_HOST_LEN,
            }
            .into());
        }
        Ok(Self {
            host,
            port,
            timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Timeout as a socket option value.
    pub fn io_timeout(&self) -> Option<Duration> {
        (!self.timeout.is_zero()).then_some(self.timeout)
    }

    pub(crate) fn connect_config(&self, retry: RetryPolicy, linger: Option<Duration>) -> ConnectConfig {
        ConnectConfig {
            timeout: self.io_timeout(),
            retry,
            linger,
        }
    }
}

impl From<&TransmissionConfig> for ConnectConfig {
    fn from(config: &TransmissionConfig) -> Self {
        config.connect_config(RetryPolicy::default(), Some(DEFAULT_LINGER))
    }
}
