mod array;
mod cartpole;
mod render;
mod space;
mod time_limit;
mod types;

pub use array::{ArrayError, DType, NdArray, UnknownDType};
pub use cartpole::{CartPole, CartPoleConfig, CartPoleState, Integrator};
pub use render::{CartPoleRenderer, SCREEN_HEIGHT, SCREEN_WIDTH, to_rgb_image};
pub use space::Space;
pub use time_limit::TimeLimit;
pub use types::{Action, EnvError, Environment, Info, Reset, Transition};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvSpec {
    pub id: &'static str,
    pub max_episode_steps: u32,
}

pub const REGISTRY: &[EnvSpec] = &[
    EnvSpec {
        id: "CartPole-v1",
        max_episode_steps: 500,
    },
    EnvSpec {
        id: "CartPole-v0",
        max_episode_steps: 200,
    },
];

pub fn spec(id: &str) -> Option<&'static EnvSpec> {
    REGISTRY.iter().find(|spec| spec.id == id)
}

/// Builds a registered environment. `params` must be a JSON object of
/// [`CartPoleConfig`] fields; `max_episode_steps` overrides the registered
/// limit.
pub fn make(
    id: &str,
    params: &serde_json::Value,
    seed: Option<u64>,
) -> Result<Box<dyn Environment>, EnvError> {
    let spec = spec(id).ok_or_else(|| EnvError::UnknownEnvironment(id.to_string()))?;
    let config = CartPoleConfig::from_json(params)?;
    let max_episode_steps = config.max_episode_steps.unwrap_or(spec.max_episode_steps);

    log::debug!("making {} (limit {} steps)", spec.id, max_episode_steps);
    let env = CartPole::new(spec.id, config, seed);
    Ok(Box::new(TimeLimit::new(env, max_episode_steps)))
}
