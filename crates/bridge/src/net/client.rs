use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use serde::de::DeserializeOwned;

use super::frame::{Frame, Message};
use super::protocol::{
    ActionSpaceReply, CloseReply, ErrorReply, MetadataFrame, ObservationSpaceReply, Opcode,
    SampleReply, StepReply,
};
use super::stats::ChannelStats;
use super::transport::Channel;
use crate::env::{Action, Info, NdArray, Reset, Transition};
use crate::error::BridgeError;

/// Descriptor frames received so far, per payload kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataCounts {
    pub state: u32,
    pub render: u32,
}

/// Drives a remote environment over the bridge protocol.
pub struct EnvClient {
    channel: Channel,
    state_metadata: Option<MetadataFrame>,
    render_metadata: Option<MetadataFrame>,
    metadata_counts: MetadataCounts,
}

impl EnvClient {
    pub fn connect<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<Self, BridgeError> {
        Ok(Self::new(Channel::connect(addr, timeout)?))
    }

    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            state_metadata: None,
            render_metadata: None,
            metadata_counts: MetadataCounts::default(),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.channel.peer_addr()
    }

    pub fn stats(&self) -> &ChannelStats {
        self.channel.stats()
    }

    pub fn metadata_counts(&self) -> MetadataCounts {
        self.metadata_counts
    }

    pub fn sample_action(&mut self) -> Result<Action, BridgeError> {
        let reply = self.call(Opcode::SampleAction)?;
        Ok(single::<SampleReply>(&reply)?.action)
    }

    pub fn action_space_str(&mut self) -> Result<String, BridgeError> {
        let reply = self.call(Opcode::ActionSpace)?;
        Ok(single::<ActionSpaceReply>(&reply)?.action_space_str)
    }

    pub fn observation_space_str(&mut self) -> Result<String, BridgeError> {
        let reply = self.call(Opcode::ObservationSpace)?;
        Ok(single::<ObservationSpaceReply>(&reply)?.observation_space_str)
    }

    pub fn reset(&mut self) -> Result<Reset, BridgeError> {
        let reply = self.call(Opcode::Reset)?;
        let frames = reply.frames();
        let (info, state) = match frames {
            [metadata, info, state] => {
                self.state_metadata = Some(parse(metadata)?);
                self.metadata_counts.state += 1;
                (info, state)
            }
            [info, state] => (info, state),
            _ => return Err(unexpected(&reply)),
        };

        Ok(Reset {
            info: parse::<Info>(info)?,
            observation: decode(self.state_metadata.as_ref(), state)?,
        })
    }

    pub fn step(&mut self, action: &Action) -> Result<Transition, BridgeError> {
        let mut request = Message::single(Frame::text(Opcode::Step.as_wire()));
        request.push(Frame::json(action)?);
        let reply = self.channel.request(&request)?;

        let [head, state] = reply.frames() else {
            return Err(unexpected(&reply));
        };
        let head: StepReply = parse(head)?;
        Ok(Transition {
            observation: decode(self.state_metadata.as_ref(), state)?,
            reward: head.reward,
            terminated: head.terminated,
            truncated: head.truncated,
            info: head.info,
        })
    }

    pub fn render(&mut self) -> Result<NdArray, BridgeError> {
        let reply = self.call(Opcode::Render)?;
        let frame = match reply.frames() {
            [metadata, frame] => {
                self.render_metadata = Some(parse(metadata)?);
                self.metadata_counts.render += 1;
                frame
            }
            [frame] => frame,
            _ => return Err(unexpected(&reply)),
        };
        decode(self.render_metadata.as_ref(), frame)
    }

    pub fn close(&mut self) -> Result<bool, BridgeError> {
        let reply = self.call(Opcode::Close)?;
        Ok(single::<CloseReply>(&reply)?.close)
    }

    /// Sends a raw request and returns the raw reply.
    pub fn request(&mut self, request: &Message) -> Result<Message, BridgeError> {
        self.channel.request(request)
    }

    pub fn disconnect(mut self) -> ChannelStats {
        self.channel.close();
        self.channel.stats().clone()
    }

    fn call(&mut self, opcode: Opcode) -> Result<Message, BridgeError> {
        self.channel
            .request(&Message::single(Frame::text(opcode.as_wire())))
    }
}

fn unexpected(reply: &Message) -> BridgeError {
    let error = reply
        .frames()
        .first()
        .and_then(|frame| frame.parse::<ErrorReply>().ok());
    match error {
        Some(reply) => BridgeError::UnexpectedReply(reply.error),
        None => BridgeError::UnexpectedReply(format!("{} frames", reply.len())),
    }
}

fn parse<T: DeserializeOwned>(frame: &Frame) -> Result<T, BridgeError> {
    if frame.is_binary() {
        return Err(BridgeError::UnexpectedReply(
            "binary frame where json was expected".into(),
        ));
    }
    match frame.parse::<T>() {
        Ok(value) => Ok(value),
        Err(e) => match frame.parse::<ErrorReply>() {
            Ok(reply) => Err(BridgeError::UnexpectedReply(reply.error)),
            Err(_) => Err(e.into()),
        },
    }
}

fn single<T: DeserializeOwned>(reply: &Message) -> Result<T, BridgeError> {
    match reply.frames() {
        [frame] => parse(frame),
        _ => Err(unexpected(reply)),
    }
}

fn decode(metadata: Option<&MetadataFrame>, frame: &Frame) -> Result<NdArray, BridgeError> {
    if !frame.is_binary() {
        return Err(unexpected(&Message::single(frame.clone())));
    }
    let metadata = metadata.ok_or_else(|| {
        BridgeError::UnexpectedReply("binary payload before its metadata".into())
    })?;
    Ok(NdArray::from_bytes(
        metadata.shape.clone(),
        metadata.dtype,
        frame.payload().to_vec(),
    )?)
}
