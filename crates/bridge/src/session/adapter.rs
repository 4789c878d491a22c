use crate::env::{Action, Environment};
use crate::error::BridgeError;
use crate::net::{
    ActionSpaceReply, CloseReply, Frame, Message, ObservationSpaceReply, SampleReply, StepReply,
};

use super::metadata::{MetadataLatch, PayloadKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodeStats {
    pub episodes_finished: u64,
    pub total_steps: u64,
    pub steps: u64,
    pub episode_return: f64,
}

impl EpisodeStats {
    fn begin(&mut self) {
        self.steps = 0;
        self.episode_return = 0.0;
    }
}

/// Owns the environment and turns its results into reply messages.
pub struct EnvAdapter {
    env: Box<dyn Environment>,
    latch: MetadataLatch,
    first_reset_seed: Option<u64>,
    stats: EpisodeStats,
    closed: bool,
}

impl EnvAdapter {
    /// `seed` applies to the first reset only; later resets continue the
    /// environment's random stream.
    pub fn new(env: Box<dyn Environment>, seed: Option<u64>) -> Self {
        Self {
            env,
            latch: MetadataLatch::default(),
            first_reset_seed: seed,
            stats: EpisodeStats::default(),
            closed: false,
        }
    }

    pub fn env_id(&self) -> &str {
        self.env.id()
    }

    pub fn latch(&self) -> &MetadataLatch {
        &self.latch
    }

    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn sample_action(&mut self) -> Result<Message, BridgeError> {
        let action = self.env.sample_action();
        Ok(Message::json(&SampleReply { action })?)
    }

    pub fn action_space(&self) -> Result<Message, BridgeError> {
        Ok(Message::json(&ActionSpaceReply {
            action_space_str: self.env.action_space().to_string(),
        })?)
    }

    pub fn observation_space(&self) -> Result<Message, BridgeError> {
        Ok(Message::json(&ObservationSpaceReply {
            observation_space_str: self.env.observation_space().to_string(),
        })?)
    }

    /// Replies `[state metadata?] [info] [state]`. Both latches are re-armed,
    /// so the state descriptor always precedes the first state of an episode.
    pub fn reset(&mut self) -> Result<Message, BridgeError> {
        self.latch.rearm();
        let reset = self.env.reset(self.first_reset_seed.take())?;
        self.stats.begin();

        let state = self.latch.frame(PayloadKind::State, reset.observation)?;
        let mut message = Message::new();
        if let Some(metadata) = state.metadata {
            message.push(metadata);
        }
        message.push(Frame::json(&reset.info)?);
        message.push(state.payload);
        Ok(message)
    }

    pub fn step(&mut self, action: &Action) -> Result<Message, BridgeError> {
        let transition = self.env.step(action)?;
        let done = transition.done();

        self.stats.steps += 1;
        self.stats.total_steps += 1;
        self.stats.episode_return += transition.reward;
        if done {
            self.stats.episodes_finished += 1;
            log::info!(
                "episode {} {} after {} steps, return {}",
                self.stats.episodes_finished,
                if transition.terminated { "terminated" } else { "truncated" },
                self.stats.steps,
                self.stats.episode_return
            );
        }

        let reply = StepReply {
            reward: transition.reward,
            terminated: transition.terminated,
            truncated: transition.truncated,
            info: transition.info,
        };
        Ok(Message::from(vec![
            Frame::json(&reply)?,
            Frame::binary(transition.observation.into_bytes()),
        ]))
    }

    pub fn render(&mut self) -> Result<Message, BridgeError> {
        let frame = self.env.render()?;
        Ok(Message::from(
            self.latch.frame(PayloadKind::Render, frame)?.into_frames(),
        ))
    }

    pub fn close(&mut self) -> Result<Message, BridgeError> {
        self.release();
        Ok(Message::json(&CloseReply { close: true })?)
    }

    /// Closes the environment without producing a reply. Idempotent.
    pub fn release(&mut self) {
        if !self.closed {
            self.env.close();
            self.closed = true;
            log::debug!("released {}", self.env.id());
        }
    }
}
