use std::io::{self, Read, Write};

use bitflags::bitflags;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;
pub const FRAME_HEADER_SIZE: usize = 5;
pub const MAX_MESSAGE_FRAMES: usize = 16;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FrameFlags: u8 {
        /// Another frame of the same message follows.
        const MORE = 0x01;
        /// Raw array bytes rather than UTF-8 JSON.
        const BINARY = 0x02;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame of {size} bytes exceeds limit of {max}")]
    TooLarge { size: usize, max: usize },
    #[error("invalid frame flags: {0:#04x}")]
    InvalidFlags(u8),
    #[error("message exceeds {max} frames")]
    TooManyFrames { max: usize },
    #[error("message has no frames")]
    EmptyMessage,
    #[error("stream closed before a frame")]
    Closed,
    #[error("frame is binary, expected text")]
    NotText,
    #[error("frame is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    binary: bool,
    payload: Vec<u8>,
}

impl Frame {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            binary: false,
            payload: text.into().into_bytes(),
        }
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            binary: false,
            payload: serde_json::to_vec(value)?,
        })
    }

    pub fn binary(payload: Vec<u8>) -> Self {
        Self {
            binary: true,
            payload,
        }
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn as_str(&self) -> Result<&str, FrameError> {
        if self.binary {
            return Err(FrameError::NotText);
        }
        Ok(std::str::from_utf8(&self.payload)?)
    }

    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// One request or reply: an ordered, non-empty run of frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    frames: Vec<Frame>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(frame: Frame) -> Self {
        Self {
            frames: vec![frame],
        }
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::single(Frame::json(value)?))
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.frames
            .iter()
            .map(|frame| FRAME_HEADER_SIZE + frame.payload.len())
            .sum()
    }
}

impl From<Vec<Frame>> for Message {
    fn from(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

pub fn write_message(writer: &mut impl Write, message: &Message) -> Result<usize, FrameError> {
    if message.is_empty() {
        return Err(FrameError::EmptyMessage);
    }

    let last = message.len() - 1;
    let mut written = 0;
    for (index, frame) in message.frames.iter().enumerate() {
        let size = frame.payload.len();
        if size > MAX_FRAME_SIZE {
            return Err(FrameError::TooLarge {
                size,
                max: MAX_FRAME_SIZE,
            });
        }

        let mut flags = FrameFlags::empty();
        flags.set(FrameFlags::MORE, index < last);
        flags.set(FrameFlags::BINARY, frame.binary);

        let mut header = [0u8; FRAME_HEADER_SIZE];
        header[0] = flags.bits();
        header[1..].copy_from_slice(&(size as u32).to_le_bytes());
        writer.write_all(&header)?;
        writer.write_all(&frame.payload)?;
        written += FRAME_HEADER_SIZE + size;
    }
    writer.flush()?;
    Ok(written)
}

pub fn read_message(reader: &mut impl Read) -> Result<Message, FrameError> {
    let mut frames = Vec::new();
    loop {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && frames.is_empty() => {
                return Err(FrameError::Closed);
            }
            Err(e) => return Err(FrameError::Io(e)),
        }

        if frames.len() == MAX_MESSAGE_FRAMES {
            return Err(FrameError::TooManyFrames {
                max: MAX_MESSAGE_FRAMES,
            });
        }

        let flags = FrameFlags::from_bits(header[0]).ok_or(FrameError::InvalidFlags(header[0]))?;
        let size = u32::from_le_bytes([header[1], header[2], header[3], header[4]]) as usize;
        if size > MAX_FRAME_SIZE {
            return Err(FrameError::TooLarge {
                size,
                max: MAX_FRAME_SIZE,
            });
        }

        let mut payload = vec![0u8; size];
        reader.read_exact(&mut payload)?;
        frames.push(Frame {
            binary: flags.contains(FrameFlags::BINARY),
            payload,
        });

        if !flags.contains(FrameFlags::MORE) {
            return Ok(Message { frames });
        }
    }
}
