//! TCP listener and framed connection.
//!
//! One connection at a time: the board accepts a single peer and keeps it
//! for the life of the process; the host connects once. Sockets close when
//! their owner is dropped, on every exit path.

use crate::error::{Error, ReceiveError, Result};
use crate::protocol::{Message, codec};
use crate::transport::framing::{read_frame, write_frame};
use log::{debug, info, warn};
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Initial capacity for frame buffers (typical reply without images)
const INITIAL_BUFFER_CAPACITY: usize = 4096;

/// Listening socket for the board side
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind and listen on `addr` (e.g. "0.0.0.0:12345")
    ///
    /// The standard library enables `SO_REUSEADDR` on Unix before binding,
    /// so a restarted board can rebind while old connections sit in
    /// TIME_WAIT.
    pub fn bind(addr: &str) -> Result<Self> {
        let inner = TcpListener::bind(addr).map_err(|source| Error::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = inner.local_addr().map_err(|source| Error::Listen {
            addr: addr.to_string(),
            source,
        })?;

        info!("Listening on {}", local_addr);
        Ok(Self { inner, local_addr })
    }

    /// Bind on all interfaces at `port`
    pub fn bind_port(port: u16) -> Result<Self> {
        Self::bind(&format!("0.0.0.0:{}", port))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Make `accept` return `WouldBlock` instead of waiting for a peer
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.inner.set_nonblocking(nonblocking)?;
        Ok(())
    }

    /// Block until one peer connects
    pub fn accept(&self) -> Result<Connection> {
        let (stream, peer) = self.inner.accept().map_err(Error::Accept)?;
        info!("Accepted connection from {}", peer);
        Ok(Connection::from_tcp(stream, peer.to_string()))
    }
}

/// Framed message stream over a byte transport
///
/// Generic over the stream so framing can be exercised with in-memory
/// transports; production code uses [`TcpStream`].
pub struct Connection<S = TcpStream> {
    stream: S,
    peer: String,
    /// Reusable buffer for inbound frames
    read_buffer: Vec<u8>,
    /// Reusable buffer for outbound frames
    write_buffer: Vec<u8>,
}

impl Connection<TcpStream> {
    /// Blocking connect to `addr` (e.g. "10.0.40.40:12345")
    pub fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).map_err(|source| Error::Connect {
            addr: addr.to_string(),
            source,
        })?;
        info!("Connected to {}", addr);
        Ok(Self::from_tcp(stream, addr.to_string()))
    }

    /// Connect with a bound on the time spent per resolved address
    pub fn connect_timeout(addr: &str, timeout: Duration) -> Result<Self> {
        let connect_err = |source| Error::Connect {
            addr: addr.to_string(),
            source,
        };
        let candidates: Vec<SocketAddr> = addr.to_socket_addrs().map_err(connect_err)?.collect();

        let mut last_err = std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "address resolved to nothing",
        );
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, timeout) {
                Ok(stream) => {
                    info!("Connected to {}", candidate);
                    return Ok(Self::from_tcp(stream, addr.to_string()));
                }
                Err(e) => {
                    debug!("Connect to {} failed: {}", candidate, e);
                    last_err = e;
                }
            }
        }
        Err(connect_err(last_err))
    }

    fn from_tcp(stream: TcpStream, peer: String) -> Self {
        // Request/reply traffic: don't hold small frames back
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }
        Self::from_stream(stream, peer)
    }

    /// Set read and write deadlines; `None` blocks indefinitely
    pub fn set_timeouts(&self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(read)?;
        self.stream.set_write_timeout(write)?;
        Ok(())
    }

    /// Shut down both directions; repeated calls are harmless
    pub fn shutdown(&self) {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => debug!("Connection to {} shut down", self.peer),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => {}
            Err(e) => debug!("Shutdown of {} failed: {}", self.peer, e),
        }
    }
}

impl<S: Read + Write> Connection<S> {
    pub fn from_stream(stream: S, peer: impl Into<String>) -> Self {
        Self {
            stream,
            peer: peer.into(),
            read_buffer: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
            write_buffer: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Stamp `time_sent` and write the message as one frame
    pub fn send(&mut self, message: &mut Message) -> Result<()> {
        message.stamp();
        let payload = codec::encode(message);
        write_frame(&mut self.stream, &payload, &mut self.write_buffer).map_err(Error::Send)?;

        debug!(
            "Sent {} id={} ({} bytes) to {}",
            message.command(),
            message.id,
            payload.len(),
            self.peer
        );
        Ok(())
    }

    /// Read and decode exactly one frame
    pub fn receive(&mut self) -> Result<Message> {
        read_frame(&mut self.stream, &mut self.read_buffer)?;
        let message = codec::decode(&self.read_buffer).map_err(ReceiveError::from)?;

        debug!(
            "Received {} id={} ({} bytes) from {}",
            message.command(),
            message.id,
            self.read_buffer.len(),
            self.peer
        );
        Ok(message)
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}
