use gymwire::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Closed,
    Timeout,
    PeerDisconnected,
    Failed,
}

impl ShutdownReason {
    pub fn from_result(result: &Result<(), BridgeError>) -> Self {
        match result {
            Ok(()) => ShutdownReason::Closed,
            Err(BridgeError::Timeout) => ShutdownReason::Timeout,
            Err(BridgeError::PeerDisconnected) => ShutdownReason::PeerDisconnected,
            Err(_) => ShutdownReason::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::Closed => "closed by client",
            ShutdownReason::Timeout => "timed out",
            ShutdownReason::PeerDisconnected => "client disconnected",
            ShutdownReason::Failed => "failed",
        }
    }
}
