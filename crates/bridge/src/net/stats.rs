use std::fmt;

use super::frame::Message;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl ChannelStats {
    pub fn record_sent(&mut self, message: &Message, bytes: usize) {
        self.messages_sent += 1;
        self.frames_sent += message.len() as u64;
        self.bytes_sent += bytes as u64;
    }

    pub fn record_received(&mut self, message: &Message) {
        self.messages_received += 1;
        self.frames_received += message.len() as u64;
        self.bytes_received += message.byte_len() as u64;
    }
}

impl fmt::Display for ChannelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} messages / {} frames / {} bytes in, {} messages / {} frames / {} bytes out",
            self.messages_received,
            self.frames_received,
            self.bytes_received,
            self.messages_sent,
            self.frames_sent,
            self.bytes_sent
        )
    }
}
