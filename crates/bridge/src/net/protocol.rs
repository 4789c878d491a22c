use std::fmt;

use serde::{Deserialize, Serialize};

use crate::env::{Action, DType, Info};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5555;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

pub const UNKNOWN_OPERATION: &str = "Unknown operation";
pub const INVALID_ACTION: &str = "Invalid action";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    SampleAction,
    ActionSpace,
    ObservationSpace,
    Reset,
    Step,
    Render,
    Close,
}

impl Opcode {
    pub const ALL: [Opcode; 7] = [
        Opcode::SampleAction,
        Opcode::ActionSpace,
        Opcode::ObservationSpace,
        Opcode::Reset,
        Opcode::Step,
        Opcode::Render,
        Opcode::Close,
    ];

    pub fn from_wire(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Opcode::SampleAction),
            "2" => Some(Opcode::ActionSpace),
            "3" => Some(Opcode::ObservationSpace),
            "4" => Some(Opcode::Reset),
            "5" => Some(Opcode::Step),
            "6" => Some(Opcode::Render),
            "7" => Some(Opcode::Close),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            Opcode::SampleAction => "1",
            Opcode::ActionSpace => "2",
            Opcode::ObservationSpace => "3",
            Opcode::Reset => "4",
            Opcode::Step => "5",
            Opcode::Render => "6",
            Opcode::Close => "7",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Opcode::SampleAction => "sample",
            Opcode::ActionSpace => "action_space",
            Opcode::ObservationSpace => "observation_space",
            Opcode::Reset => "reset",
            Opcode::Step => "step",
            Opcode::Render => "render",
            Opcode::Close => "close",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.as_wire())
    }
}

/// Describes the binary frame that follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFrame {
    pub shape: Vec<usize>,
    pub dtype: DType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleReply {
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSpaceReply {
    pub action_space_str: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationSpaceReply {
    pub observation_space_str: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReply {
    pub reward: f64,
    #[serde(rename = "term")]
    pub terminated: bool,
    #[serde(rename = "trunc")]
    pub truncated: bool,
    pub info: Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseReply {
    pub close: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}

impl ErrorReply {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn opcodes_round_trip_through_wire_codes() {
        for opcode in Opcode::ALL {
            assert_eq!(Opcode::from_wire(opcode.as_wire()), Some(opcode));
        }
        for code in ["0", "8", "", "reset", " 4", "44"] {
            assert_eq!(Opcode::from_wire(code), None);
        }
    }

    #[test]
    fn reply_field_names_match_wire() {
        let step = StepReply {
            reward: 1.0,
            terminated: false,
            truncated: true,
            info: Info::new(),
        };
        assert_eq!(
            serde_json::to_value(&step).unwrap(),
            json!({"reward": 1.0, "term": false, "trunc": true, "info": {}})
        );

        let space = ActionSpaceReply {
            action_space_str: "Discrete(2)".into(),
        };
        assert_eq!(
            serde_json::to_value(&space).unwrap(),
            json!({"actionSpaceStr": "Discrete(2)"})
        );

        let meta = MetadataFrame {
            shape: vec![400, 600, 3],
            dtype: DType::Uint8,
        };
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            json!({"shape": [400, 600, 3], "dtype": "uint8"})
        );
    }
}
