use std::io::{BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use super::frame::{self, Message};
use super::stats::ChannelStats;
use crate::error::BridgeError;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Zero means "no timeout".
fn as_socket_timeout(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

/// Listening side of the bridge. Serves a single peer.
pub struct Endpoint {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Endpoint {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self, BridgeError> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        log::debug!("endpoint bound on {}", local_addr);
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits up to `timeout` for the peer to connect.
    pub fn accept(&self, timeout: Duration) -> Result<Channel, BridgeError> {
        let start = Instant::now();
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    log::info!("peer connected from {}", addr);
                    stream.set_nonblocking(false)?;
                    return Channel::from_stream(stream, timeout);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if !timeout.is_zero() && start.elapsed() >= timeout {
                        return Err(BridgeError::Timeout);
                    }
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Duplex message channel with per-operation timeouts.
pub struct Channel {
    reader: Option<BufReader<TcpStream>>,
    writer: Option<TcpStream>,
    peer_addr: SocketAddr,
    stats: ChannelStats,
}

impl Channel {
    pub fn connect<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<Self, BridgeError> {
        let mut last_err = None;
        for addr in addr.to_socket_addrs()? {
            let attempt = match as_socket_timeout(timeout) {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Self::from_stream(stream, timeout),
                Err(e) => last_err = Some(e),
            }
        }
        Err(match last_err {
            Some(e) => e.into(),
            None => BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "address resolved to nothing",
            )),
        })
    }

    fn from_stream(stream: TcpStream, timeout: Duration) -> Result<Self, BridgeError> {
        stream.set_read_timeout(as_socket_timeout(timeout))?;
        stream.set_write_timeout(as_socket_timeout(timeout))?;
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr()?;
        let reader = BufReader::new(stream.try_clone()?);

        Ok(Self {
            reader: Some(reader),
            writer: Some(stream),
            peer_addr,
            stats: ChannelStats::default(),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    pub fn send(&mut self, message: &Message) -> Result<(), BridgeError> {
        let writer = self.writer.as_mut().ok_or(BridgeError::PeerDisconnected)?;
        let mut buf = Vec::with_capacity(message.byte_len());
        let bytes = frame::write_message(&mut buf, message)?;
        writer.write_all(&buf)?;
        writer.flush()?;
        self.stats.record_sent(message, bytes);
        Ok(())
    }

    pub fn recv(&mut self) -> Result<Message, BridgeError> {
        let reader = self.reader.as_mut().ok_or(BridgeError::PeerDisconnected)?;
        let message = frame::read_message(reader)?;
        self.stats.record_received(&message);
        Ok(message)
    }

    pub fn request(&mut self, message: &Message) -> Result<Message, BridgeError> {
        self.send(message)?;
        self.recv()
    }

    /// Shuts both directions down without draining unsent data. Idempotent.
    pub fn close(&mut self) {
        if let Some(writer) = self.writer.take() {
            let _ = writer.shutdown(Shutdown::Both);
            log::debug!("channel to {} closed", self.peer_addr);
        }
        self.reader = None;
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}
