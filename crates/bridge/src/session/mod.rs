mod adapter;
mod metadata;

pub use adapter::{EnvAdapter, EpisodeStats};
pub use metadata::{FramedPayload, MetadataLatch, PayloadKind};

use crate::env::Action;
use crate::error::BridgeError;
use crate::net::{Channel, ErrorReply, INVALID_ACTION, Message, Opcode, UNKNOWN_OPERATION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingOpcode,
    Handling,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub reply: Message,
    pub terminate: bool,
}

impl Dispatched {
    fn reply(reply: Message) -> Self {
        Self {
            reply,
            terminate: false,
        }
    }
}

/// Read-eval-reply loop over one channel. Every request gets exactly one
/// reply message; CLOSE ends the loop after its reply is sent.
pub struct Session {
    adapter: EnvAdapter,
    state: SessionState,
    requests: u64,
    rejected: u64,
}

impl Session {
    pub fn new(adapter: EnvAdapter) -> Self {
        Self {
            adapter,
            state: SessionState::AwaitingOpcode,
            requests: 0,
            rejected: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn adapter(&self) -> &EnvAdapter {
        &self.adapter
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Requests answered with an error reply.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn dispatch(&mut self, request: &Message) -> Result<Dispatched, BridgeError> {
        let frames = request.frames();
        let opcode = frames
            .first()
            .and_then(|frame| frame.as_str().ok())
            .and_then(Opcode::from_wire);

        let Some(opcode) = opcode else {
            log::warn!("unknown operation {:?}", frames.first().map(|f| f.payload()));
            return self.reject(UNKNOWN_OPERATION);
        };
        log::debug!("handling {}", opcode);

        if opcode != Opcode::Step && frames.len() > 1 {
            log::debug!("ignoring {} extra frames on {}", frames.len() - 1, opcode);
        }

        let reply = match opcode {
            Opcode::SampleAction => self.adapter.sample_action()?,
            Opcode::ActionSpace => self.adapter.action_space()?,
            Opcode::ObservationSpace => self.adapter.observation_space()?,
            Opcode::Reset => self.adapter.reset()?,
            Opcode::Step => {
                let action = frames.get(1).and_then(|frame| frame.parse::<Action>().ok());
                let Some(action) = action else {
                    log::warn!("step without a valid action");
                    return self.reject(INVALID_ACTION);
                };
                self.adapter.step(&action)?
            }
            Opcode::Render => self.adapter.render()?,
            Opcode::Close => {
                return Ok(Dispatched {
                    reply: self.adapter.close()?,
                    terminate: true,
                });
            }
        };
        Ok(Dispatched::reply(reply))
    }

    fn reject(&mut self, error: &str) -> Result<Dispatched, BridgeError> {
        self.rejected += 1;
        Ok(Dispatched::reply(Message::json(&ErrorReply::new(error))?))
    }

    /// Serves one request. Returns whether the session has terminated.
    pub fn serve_one(&mut self, channel: &mut Channel) -> Result<bool, BridgeError> {
        let request = channel.recv()?;
        self.state = SessionState::Handling;
        self.requests += 1;

        let dispatched = self.dispatch(&request)?;
        channel.send(&dispatched.reply)?;

        self.state = if dispatched.terminate {
            SessionState::Terminated
        } else {
            SessionState::AwaitingOpcode
        };
        Ok(dispatched.terminate)
    }

    pub fn run(&mut self, channel: &mut Channel) -> Result<(), BridgeError> {
        while self.state != SessionState::Terminated {
            if let Err(e) = self.serve_one(channel) {
                self.state = SessionState::Terminated;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Releases the environment. Safe to call after CLOSE.
    pub fn release(&mut self) {
        self.adapter.release();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::env;
    use crate::net::Frame;

    fn session() -> Session {
        let env = env::make("CartPole-v1", &json!({}), Some(11)).unwrap();
        Session::new(EnvAdapter::new(env, Some(11)))
    }

    fn op(code: &str) -> Message {
        Message::single(Frame::text(code))
    }

    fn body(dispatched: &Dispatched) -> Value {
        dispatched.reply.frames()[0].parse().unwrap()
    }

    #[test]
    fn every_opcode_yields_a_reply() {
        let mut session = session();
        session.dispatch(&op("4")).unwrap();
        for opcode in Opcode::ALL {
            let mut request = op(opcode.as_wire());
            if opcode == Opcode::Step {
                request.push(Frame::text("0"));
            }
            let dispatched = session.dispatch(&request).unwrap();
            assert!(!dispatched.reply.is_empty());
            assert_eq!(dispatched.terminate, opcode == Opcode::Close);
        }
    }

    #[test]
    fn unknown_operation_is_recoverable() {
        let mut session = session();
        for code in ["0", "8", "step", ""] {
            let dispatched = session.dispatch(&op(code)).unwrap();
            assert_eq!(body(&dispatched), json!({"error": "Unknown operation"}));
            assert!(!dispatched.terminate);
        }

        let binary = Message::single(Frame::binary(vec![0xff]));
        assert_eq!(
            body(&session.dispatch(&binary).unwrap()),
            json!({"error": "Unknown operation"})
        );
        assert_eq!(session.rejected(), 5);

        let sample = session.dispatch(&op("1")).unwrap();
        assert!(body(&sample).get("action").is_some());
    }

    #[test]
    fn step_without_action_is_rejected() {
        let mut session = session();
        session.dispatch(&op("4")).unwrap();

        let dispatched = session.dispatch(&op("5")).unwrap();
        assert_eq!(body(&dispatched), json!({"error": "Invalid action"}));

        let mut garbage = op("5");
        garbage.push(Frame::text("{not json"));
        let dispatched = session.dispatch(&garbage).unwrap();
        assert_eq!(body(&dispatched), json!({"error": "Invalid action"}));
    }

    #[test]
    fn out_of_space_action_is_fatal() {
        let mut session = session();
        session.dispatch(&op("4")).unwrap();
        let mut request = op("5");
        request.push(Frame::text("3"));
        assert!(matches!(
            session.dispatch(&request),
            Err(BridgeError::Adapter(env::EnvError::InvalidAction { .. }))
        ));
    }

    #[test]
    fn space_descriptions() {
        let mut session = session();
        let action = session.dispatch(&op("2")).unwrap();
        assert_eq!(body(&action), json!({"actionSpaceStr": "Discrete(2)"}));

        let observation = session.dispatch(&op("3")).unwrap();
        let text = body(&observation)["observationSpaceStr"].as_str().unwrap().to_string();
        assert!(text.starts_with("Box("));
        assert!(text.ends_with("(4,), float32)"));
    }
}
