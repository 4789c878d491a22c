use std::fmt;

use serde::{Deserialize, Serialize};

use super::array::{ArrayError, NdArray};
use super::space::Space;

pub type Info = serde_json::Map<String, serde_json::Value>;

/// An action as it travels on the wire: a bare integer for discrete spaces,
/// an array of floats for box spaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    Discrete(i64),
    Continuous(Vec<f32>),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Discrete(value) => write!(f, "{}", value),
            Action::Continuous(values) => write!(f, "{:?}", values),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reset {
    pub observation: NdArray,
    pub info: Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: NdArray,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: Info,
}

impl Transition {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("environment {0} doesn't exist")]
    UnknownEnvironment(String),
    #[error("invalid environment parameters: {0}")]
    InvalidParams(#[from] serde_json::Error),
    #[error("cannot call {op} before reset")]
    NotReset { op: &'static str },
    #[error("action {action} is not in {space}")]
    InvalidAction { action: String, space: String },
    #[error("environment is closed")]
    Closed,
    #[error(transparent)]
    Array(#[from] ArrayError),
}

pub trait Environment: Send {
    fn id(&self) -> &str;

    fn action_space(&self) -> &Space;

    fn observation_space(&self) -> &Space;

    fn sample_action(&mut self) -> Action;

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError>;

    fn step(&mut self, action: &Action) -> Result<Transition, EnvError>;

    fn render(&mut self) -> Result<NdArray, EnvError>;

    /// Releases the simulation. Calling it again is a no-op.
    fn close(&mut self);
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn action_space(&self) -> &Space {
        (**self).action_space()
    }

    fn observation_space(&self) -> &Space {
        (**self).observation_space()
    }

    fn sample_action(&mut self) -> Action {
        (**self).sample_action()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        (**self).reset(seed)
    }

    fn step(&mut self, action: &Action) -> Result<Transition, EnvError> {
        (**self).step(action)
    }

    fn render(&mut self) -> Result<NdArray, EnvError> {
        (**self).render()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
