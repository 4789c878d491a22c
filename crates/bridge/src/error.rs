use std::io;

use crate::env::{ArrayError, EnvError};
use crate::net::FrameError;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("timed out waiting for the peer")]
    Timeout,
    #[error("peer disconnected")]
    PeerDisconnected,
    #[error("i/o error: {0}")]
    Io(io::Error),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("framing error: {0}")]
    Frame(FrameError),
    #[error("environment failure: {0}")]
    Adapter(#[from] EnvError),
    #[error("bad array payload: {0}")]
    Payload(#[from] ArrayError),
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl BridgeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout)
    }
}

fn is_timeout_kind(kind: io::ErrorKind) -> bool {
    matches!(kind, io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

fn is_disconnect_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

impl From<io::Error> for BridgeError {
    fn from(e: io::Error) -> Self {
        if is_timeout_kind(e.kind()) {
            BridgeError::Timeout
        } else if is_disconnect_kind(e.kind()) {
            BridgeError::PeerDisconnected
        } else {
            BridgeError::Io(e)
        }
    }
}

impl From<FrameError> for BridgeError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Closed => BridgeError::PeerDisconnected,
            FrameError::Io(io) => io.into(),
            other => BridgeError::Frame(other),
        }
    }
}
