use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Result, TransportError};

/// Total connect attempts (the first try plus two retries).
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 3;
/// Pause between failed connect attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
/// Linger period applied so that close flushes pending data instead of resetting.
pub const DEFAULT_LINGER: Duration = Duration::from_secs(30);
/// Longest host name accepted by the protocol configuration.
pub const MAX_HOST_LEN: usize = 255;

/// Bounded retry schedule for connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts. Values below 1 are treated as 1.
    pub attempts: u32,
    /// Sleep between consecutive failed attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_CONNECT_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Connection establishment parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    /// Timeout for each individual connect attempt. `None` blocks on the OS default.
    pub timeout: Option<Duration>,
    /// Retry schedule.
    pub retry: RetryPolicy,
    /// Linger period for close. `None` leaves the OS default in place.
    pub linger: Option<Duration>,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            retry: RetryPolicy::default(),
            linger: Some(DEFAULT_LINGER),
        }
    }
}

/// A connected byte stream the protocol can run over.
pub trait Link: Read + Write {
    /// Bound the time a single read may block.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()>;

    /// Bound the time a single write may block.
    fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()>;
}

impl Link for TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        TcpStream::set_write_timeout(self, timeout)
    }
}

/// Opens links to a resolved address.
///
/// `dial` failures are retried by [`connect_with`]; `configure` failures are not.
pub trait Dialer {
    type Link: Link;

    /// Open a new stream to `addr`.
    fn dial(&mut self, addr: SocketAddr, timeout: Option<Duration>) -> std::io::Result<Self::Link>;

    /// Apply socket options to a freshly opened stream.
    fn configure(&self, link: &Self::Link, config: &ConnectConfig) -> Result<()>;
}

/// Dialer backed by `std::net::TcpStream`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    type Link = TcpStream;

    fn dial(&mut self, addr: SocketAddr, timeout: Option<Duration>) -> std::io::Result<TcpStream> {
        match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        }
    }

    fn configure(&self, link: &TcpStream, config: &ConnectConfig) -> Result<()> {
        set_linger(link, config.linger)
    }
}

/// An open connection to a viewer.
///
/// The underlying stream is closed when the connection is dropped.
pub struct Connection<L> {
    link: L,
    peer: SocketAddr,
    attempts: u32,
}

impl<L: Link> Connection<L> {
    /// Address of the remote viewer.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Number of connect attempts it took to open this connection.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &L {
        &self.link
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.link.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.link.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Consume the connection and return the inner stream.
    pub fn into_inner(self) -> L {
        self.link
    }
}

impl<L: Link> Read for Connection<L> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.link.read(buf)
    }
}

impl<L: Link> Write for Connection<L> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.link.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.link.flush()
    }
}

impl<L: Link> Link for Connection<L> {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        self.link.set_read_timeout(timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        self.link.set_write_timeout(timeout)
    }
}

impl<L> std::fmt::Debug for Connection<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("attempts", &self.attempts)
            .finish()
    }
}

/// Resolve `host:port` to a single socket address.
///
/// IPv4 results are preferred; the first IPv6 result is used otherwise.
/// Resolution failures are not retried.
pub fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    if host.len() > MAX_HOST_LEN {
        return Err(TransportError::HostTooLong {
            len: host.len(),
            max: MAX_HOST_LEN,
        });
    }

    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            host: host.to_string(),
            port,
            source,
        })?
        .collect();

    let addr = addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| TransportError::NoAddress {
            host: host.to_string(),
            port,
        })?;

    debug!(host, port, %addr, "resolved viewer address");
    Ok(addr)
}

/// Resolve and connect over TCP.
pub fn connect(host: &str, port: u16, config: &ConnectConfig) -> Result<Connection<TcpStream>> {
    let addr = resolve(host, port)?;
    connect_with(&mut TcpDialer, addr, config)
}

/// Connect to `addr` through `dialer`, retrying per `config.retry`.
pub fn connect_with<D: Dialer>(
    dialer: &mut D,
    addr: SocketAddr,
    config: &ConnectConfig,
) -> Result<Connection<D::Link>> {
    let attempts = config.retry.attempts.max(1);
    let mut attempt = 1;

    loop {
        match dialer.dial(addr, config.timeout) {
            Ok(link) => {
                // Option failures close the fresh stream on drop and are not retried.
                dialer.configure(&link, config)?;
                debug!(%addr, attempt, "connected to viewer");
                return Ok(Connection {
                    link,
                    peer: addr,
                    attempts: attempt,
                });
            }
            Err(source) => {
                warn!(%addr, attempt, max_attempts = attempts, error = %source, "connect attempt failed");
                if attempt >= attempts {
                    return Err(TransportError::ConnectRetriesExhausted {
                        addr,
                        attempts,
                        source,
                    });
                }
                std::thread::sleep(config.retry.delay);
                attempt += 1;
            }
        }
    }
}

/// Enable (or disable with `None`) lingering close on a TCP stream.
#[cfg(unix)]
pub fn set_linger(stream: &TcpStream, linger: Option<Duration>) -> Result<()> {
    use std::os::fd::AsRawFd;

    let value = libc::linger {
        l_onoff: libc::c_int::from(linger.is_some()),
        l_linger: linger
            .map(|d| d.as_secs().min(libc::c_int::MAX as u64) as libc::c_int)
            .unwrap_or(0),
    };

    // SAFETY: `value` is a valid `linger` struct that outlives the call, the length
    // matches its size, and the descriptor belongs to a live stream.
    let rc = unsafe {
        libc::setsockopt(
            stream.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_LINGER,
            (&value as *const libc::linger).cast::<libc::c_void>(),
            std::mem::size_of::<libc::linger>() as libc::socklen_t,
        )
    };

    if rc != 0 {
        return Err(TransportError::SocketOption {
            option: "SO_LINGER",
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Enable (or disable with `None`) lingering close on a TCP stream.
#[cfg(windows)]
pub fn set_linger(stream: &TcpStream, linger: Option<Duration>) -> Result<()> {
    use std::os::windows::io::AsRawSocket;
    use windows_sys::Win32::Networking::WinSock::{setsockopt, LINGER, SOCKET, SOL_SOCKET, SO_LINGER};

    let value = LINGER {
        l_onoff: u16::from(linger.is_some()),
        l_linger: linger
            .map(|d| d.as_secs().min(u64::from(u16::MAX)) as u16)
            .unwrap_or(0),
    };

    // SAFETY: `value` is a valid `LINGER` struct that outlives the call, the length
    // matches its size, and the socket belongs to a live stream.
    let rc = unsafe {
        setsockopt(
            stream.as_raw_socket() as SOCKET,
            SOL_SOCKET as i32,
            SO_LINGER as i32,
            (&value as *const LINGER).cast::<u8>(),
            std::mem::size_of::<LINGER>() as i32,
        )
    };

    if rc != 0 {
        return Err(TransportError::SocketOption {
            option: "SO_LINGER",
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Linger is not configurable on this platform; the OS default applies.
#[cfg(not(any(unix, windows)))]
pub fn set_linger(_stream: &TcpStream, linger: Option<Duration>) -> Result<()> {
    debug!(?linger, "SO_LINGER unsupported on this platform; skipping");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::net::TcpListener;

    use super::*;

    #[derive(Debug)]
    struct FakeLink(Cursor<Vec<u8>>);

    impl Read for FakeLink {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.0.read(buf)
        }
    }

    impl Write for FakeLink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Link for FakeLink {
        fn set_read_timeout(&self, _timeout: Option<Duration>) -> std::io::Result<()> {
            Ok(())
        }

        fn set_write_timeout(&self, _timeout: Option<Duration>) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Fails the first `failures` dials, then succeeds.
    struct ScriptedDialer {
        outcomes: VecDeque<bool>,
        dials: u32,
        fail_configure: bool,
    }

    impl ScriptedDialer {
        fn new(failures: usize, total: usize) -> Self {
            let outcomes = (0..total).map(|i| i >= failures).collect();
            Self {
                outcomes,
                dials: 0,
                fail_configure: false,
            }
        }
    }

    impl Dialer for ScriptedDialer {
        type Link = FakeLink;

        fn dial(&mut self, _addr: SocketAddr, _timeout: Option<Duration>) -> std::io::Result<FakeLink> {
            self.dials += 1;
            if self.outcomes.pop_front().unwrap_or(false) {
                Ok(FakeLink(Cursor::new(Vec::new())))
            } else {
                Err(std::io::Error::from(std::io::ErrorKind::ConnectionRefused))
            }
        }

        fn configure(&self, _link: &FakeLink, _config: &ConnectConfig) -> Result<()> {
            if self.fail_configure {
                return Err(TransportError::SocketOption {
                    option: "SO_LINGER",
                    source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
                });
            }
            Ok(())
        }
    }

    fn fast_config() -> ConnectConfig {
        ConnectConfig {
            timeout: Some(Duration::from_millis(200)),
            retry: RetryPolicy {
                attempts: 3,
                delay: Duration::from_millis(1),
            },
            linger: Some(DEFAULT_LINGER),
        }
    }

    fn loopback() -> SocketAddr {
        "127.0.0.1:5999".parse().unwrap()
    }

    #[test]
    fn defaults_match_protocol_constants() {
        let config = ConnectConfig::default();
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.retry.delay, Duration::from_secs(2));
        assert_eq!(config.linger, Some(Duration::from_secs(30)));
    }

    #[test]
    fn succeeds_after_two_failures() {
        let mut dialer = ScriptedDialer::new(2, 3);
        let conn = connect_with(&mut dialer, loopback(), &fast_config()).unwrap();
        assert_eq!(conn.attempts(), 3);
        assert_eq!(dialer.dials, 3);
        assert_eq!(conn.peer(), loopback());
    }

    #[test]
    fn gives_up_after_three_failures() {
        let mut dialer = ScriptedDialer::new(3, 5);
        let err = connect_with(&mut dialer, loopback(), &fast_config()).unwrap_err();
        assert!(matches!(
            err,
            TransportError::ConnectRetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(dialer.dials, 3, "no dial beyond the retry budget");
    }

    #[test]
    fn zero_attempts_still_dials_once() {
        let mut dialer = ScriptedDialer::new(0, 1);
        let config = ConnectConfig {
            retry: RetryPolicy {
                attempts: 0,
                delay: Duration::from_millis(1),
            },
            ..fast_config()
        };
        let conn = connect_with(&mut dialer, loopback(), &config).unwrap();
        assert_eq!(conn.attempts(), 1);
    }

    #[test]
    fn configure_failure_is_fatal_without_retry() {
        let mut dialer = ScriptedDialer::new(0, 3);
        dialer.fail_configure = true;
        let err = connect_with(&mut dialer, loopback(), &fast_config()).unwrap_err();
        assert!(matches!(err, TransportError::SocketOption { .. }));
        assert_eq!(dialer.dials, 1);
    }

    #[test]
    fn resolve_prefers_ipv4_loopback() {
        let addr = resolve("127.0.0.1", 5999).unwrap();
        assert!(addr.is_ipv4());
        assert_eq!(addr.port(), 5999);
    }

    #[test]
    fn resolve_rejects_unresolvable_host() {
        let err = resolve("definitely-not-a-host.invalid", 5999).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Resolve { .. } | TransportError::NoAddress { .. }
        ));
    }

    #[test]
    fn resolve_rejects_overlong_host() {
        let host = "a".repeat(MAX_HOST_LEN + 1);
        let err = resolve(&host, 5999).unwrap_err();
        assert!(matches!(err, TransportError::HostTooLong { len: 256, max: 255 }));
    }

    #[test]
    fn tcp_connect_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            stream.read_exact(&mut buf).unwrap();
            buf
        });

        let mut conn = connect("127.0.0.1", port, &fast_config()).unwrap();
        assert_eq!(conn.attempts(), 1);
        conn.write_all(b"hello").unwrap();
        drop(conn);

        assert_eq!(&server.join().unwrap(), b"hello");
    }

    #[test]
    fn tcp_connect_refused_exhausts_retries() {
        // Grab a free port and release it so nothing is listening there.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = connect("127.0.0.1", port, &fast_config()).unwrap_err();
        assert!(matches!(
            err,
            TransportError::ConnectRetriesExhausted { attempts: 3, .. }
        ));
    }

    #[test]
    #[cfg(unix)]
    fn linger_is_applied_to_stream() {
        use std::os::fd::AsRawFd;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = TcpStream::connect(addr).unwrap();
        set_linger(&stream, Some(DEFAULT_LINGER)).unwrap();

        let mut value = libc::linger {
            l_onoff: 0,
            l_linger: 0,
        };
        let mut len = std::mem::size_of::<libc::linger>() as libc::socklen_t;
        // SAFETY: `value` and `len` are valid writable pointers for the provided sizes.
        let rc = unsafe {
            libc::getsockopt(
                stream.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_LINGER,
                (&mut value as *mut libc::linger).cast::<libc::c_void>(),
                &mut len,
            )
        };
        assert_eq!(rc, 0);
        assert_ne!(value.l_onoff, 0);
        assert_eq!(value.l_linger, 30);
    }
}
