//! Thin async TCP transport.
//!
//! [`Transport`] wraps a `tokio::net::TcpStream` and moves raw frames; all
//! protocol logic lives elsewhere — this module owns only byte I/O.  It
//! performs no retry of any kind: retransmission is the sender state
//! machine's job.
//!
//! Reads are bounded: [`Transport::recv`] waits at most the configured
//! timeout and then reports [`TransportError::RecvTimeout`], which callers
//! treat as expected steady-state behaviour, not a failure.  A closed or
//! reset connection is [`TransportError::Closed`] and is fatal to the
//! session.
//!
//! One frame per receive is assumed throughout the protocol core; splitting
//! or coalescing across stream reads is not handled here.  A coalesced read
//! decodes with a failing checksum, is NACKed or ignored, and the
//! retransmission path recovers.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Largest frame accepted per read.
pub const MAX_FRAME: usize = 1024;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can arise from transport operations.
#[derive(Debug)]
pub enum TransportError {
    /// Underlying I/O error from the OS.
    Io(std::io::Error),
    /// No frame arrived within the configured read timeout.  Expected
    /// steady-state behaviour for an idle peer.
    RecvTimeout,
    /// The peer closed or reset the connection; fatal to the session.
    Closed,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "transport I/O error: {e}"),
            Self::RecvTimeout => write!(f, "no frame within the read timeout"),
            Self::Closed => write!(f, "connection closed by peer"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// A bound, listening endpoint that accepts exactly one connection.
#[derive(Debug)]
pub struct Listener {
    /// Address this listener is bound to (resolved after the OS assigns an
    /// ephemeral port).
    pub local_addr: SocketAddr,
    inner: TcpListener,
}

impl Listener {
    /// Bind to `addr`.  Passing port 0 lets the OS choose.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let inner = TcpListener::bind(addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Accept a single connection, consuming the listener.
    ///
    /// Returns the connected transport and the peer address.
    pub async fn accept(self, recv_timeout: Duration) -> Result<(Transport, SocketAddr), TransportError> {
        let (stream, peer) = self.inner.accept().await?;
        Ok((Transport::new(stream, recv_timeout), peer))
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A connected, frame-oriented byte transport.
#[derive(Debug)]
pub struct Transport {
    stream: TcpStream,
    recv_timeout: Duration,
}

impl Transport {
    fn new(stream: TcpStream, recv_timeout: Duration) -> Self {
        Self {
            stream,
            recv_timeout,
        }
    }

    /// Connect to a listening peer at `addr`.
    pub async fn connect(addr: SocketAddr, recv_timeout: Duration) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream, recv_timeout))
    }

    /// Send one frame.  Blocks (suspends) under transport backpressure; no
    /// protocol-level retry.
    pub async fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(frame).await?;
        Ok(())
    }

    /// Receive the next frame, waiting at most the configured timeout.
    pub async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; MAX_FRAME];
        match tokio::time::timeout(self.recv_timeout, self.stream.read(&mut buf)).await {
            Err(_elapsed) => Err(TransportError::RecvTimeout),
            Ok(Ok(0)) => Err(TransportError::Closed),
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(buf)
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }
}
