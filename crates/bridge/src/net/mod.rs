mod client;
mod frame;
mod protocol;
mod stats;
mod transport;

pub use client::{EnvClient, MetadataCounts};
pub use frame::{
    FRAME_HEADER_SIZE, Frame, FrameError, FrameFlags, MAX_FRAME_SIZE, MAX_MESSAGE_FRAMES, Message,
    read_message, write_message,
};
pub use protocol::{
    ActionSpaceReply, CloseReply, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT_MS, ErrorReply,
    INVALID_ACTION, MetadataFrame, ObservationSpaceReply, Opcode, SampleReply, StepReply,
    UNKNOWN_OPERATION,
};
pub use stats::ChannelStats;
pub use transport::{Channel, Endpoint};
