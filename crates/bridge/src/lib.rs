pub mod env;
pub mod error;
pub mod net;
pub mod session;

pub use env::{Action, DType, EnvError, Environment, NdArray, Space};
pub use error::BridgeError;
pub use net::{
    Channel, ChannelStats, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT_MS, Endpoint, EnvClient,
    Frame, Message, MetadataFrame, Opcode,
};
pub use session::{EnvAdapter, EpisodeStats, MetadataLatch, PayloadKind, Session, SessionState};
