use std::fmt;

use crate::env::NdArray;
use crate::net::{Frame, MetadataFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Render,
    State,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Render => "render",
            PayloadKind::State => "state",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedPayload {
    pub metadata: Option<Frame>,
    pub payload: Frame,
}

impl FramedPayload {
    pub fn into_frames(self) -> Vec<Frame> {
        self.metadata.into_iter().chain([self.payload]).collect()
    }
}

/// Tracks whether each payload kind's shape descriptor has gone out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataLatch {
    render_sent: bool,
    state_sent: bool,
}

impl MetadataLatch {
    pub fn is_sent(&self, kind: PayloadKind) -> bool {
        match kind {
            PayloadKind::Render => self.render_sent,
            PayloadKind::State => self.state_sent,
        }
    }

    pub fn rearm(&mut self) {
        self.render_sent = false;
        self.state_sent = false;
    }

    /// Frames `array`, preceded by its descriptor the first time this kind
    /// is emitted since the last re-arm.
    pub fn frame(
        &mut self,
        kind: PayloadKind,
        array: NdArray,
    ) -> Result<FramedPayload, serde_json::Error> {
        let mut metadata = None;
        let sent = match kind {
            PayloadKind::Render => &mut self.render_sent,
            PayloadKind::State => &mut self.state_sent,
        };
        if !*sent {
            let descriptor = MetadataFrame {
                shape: array.shape().to_vec(),
                dtype: array.dtype(),
            };
            metadata = Some(Frame::json(&descriptor)?);
            *sent = true;
            log::debug!(
                "sending {} metadata {:?} {}",
                kind,
                descriptor.shape,
                descriptor.dtype
            );
        }
        Ok(FramedPayload {
            metadata,
            payload: Frame::binary(array.into_bytes()),
        })
    }
}
