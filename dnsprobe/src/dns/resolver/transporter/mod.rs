//! # DNS Transporter
//!
//! The `transporter` module moves datagrams between the resolver and a name server. It
//! knows nothing about DNS: [`Transport`] is the seam the retry loop talks to, and
//! [`UdpTransport`] is the real implementation over [`std::net::UdpSocket`].
//!
//! Once [`UdpTransport`] has sent to a server, datagrams from any other source are
//! dropped while it waits, and the wait still ends at the original deadline.
//!
//! A receive that hits its deadline is reported as [`TransportErrors::Timeout`] so the
//! resolver can retry it. Every other socket failure is [`TransportErrors::SocketIo`]
//! and is never retried.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dnsprobe::dns::resolver::transporter::{Transport, UdpTransport};
//! use std::time::Duration;
//!
//! let mut transport = UdpTransport::bind("0.0.0.0:0".parse().unwrap()).unwrap();
//! transport.send_to(&[0u8; 12], "192.0.2.53:53".parse().unwrap()).unwrap();
//!
//! let mut buf = [0u8; 512];
//! match transport.receive(&mut buf, Duration::from_secs(1)) {
//!     Ok(len) => println!("{} bytes", len),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while moving datagrams.
#[derive(Debug, Error)]
pub enum TransportErrors {
    /// No datagram arrived before the deadline.
    #[error("timed out waiting for a datagram")]
    Timeout,
    #[error("socket error: {0}")]
    SocketIo(#[from] io::Error),
}

/// A datagram channel to a name server.
pub trait Transport {
    /// Sends one datagram to `server`.
    fn send_to(&mut self, payload: &[u8], server: SocketAddr) -> Result<(), TransportErrors>;

    /// Blocks for at most `timeout` waiting for one datagram from the last server sent to,
    /// and copies it into `buf`.
    ///
    /// Returns the number of bytes received. Datagrams longer than `buf` are cut short.
    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportErrors>;
}

/// [`Transport`] over a bound UDP socket. The socket is closed when this value drops.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    /// Last address passed to `send_to`. Replies from elsewhere are discarded.
    peer: Option<SocketAddr>,
}

impl UdpTransport {
    pub fn bind(addr: SocketAddr) -> Result<Self, TransportErrors> {
        let socket = UdpSocket::bind(addr)?;
        debug!(local = ?socket.local_addr().ok(), "bound UDP socket");
        Ok(Self { socket, peer: None })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportErrors> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    fn send_to(&mut self, payload: &[u8], server: SocketAddr) -> Result<(), TransportErrors> {
        self.socket.send_to(payload, server)?;
        self.peer = Some(server);
        debug!(%server, len = payload.len(), "sent datagram");
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportErrors> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportErrors::Timeout);
            }
            self.socket.set_read_timeout(Some(remaining))?;

            let (len, source) = self.socket.recv_from(buf).map_err(|e| {
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut {
                    TransportErrors::Timeout
                } else {
                    TransportErrors::SocketIo(e)
                }
            })?;

            match self.peer {
                Some(peer) if peer != source => {
                    warn!(%source, %peer, len, "discarding datagram from unexpected source");
                }
                _ => {
                    debug!(%source, len, "received datagram");
                    return Ok(len);
                }
            }
        }
    }
}
