use super::array::NdArray;
use super::space::Space;
use super::types::{Action, EnvError, Environment, Reset, Transition};

/// Truncates episodes after `max_episode_steps` steps.
pub struct TimeLimit<E> {
    inner: E,
    max_episode_steps: u32,
    elapsed_steps: Option<u32>,
}

impl<E: Environment> TimeLimit<E> {
    pub fn new(inner: E, max_episode_steps: u32) -> Self {
        Self {
            inner,
            max_episode_steps,
            elapsed_steps: None,
        }
    }

    pub fn max_episode_steps(&self) -> u32 {
        self.max_episode_steps
    }

    pub fn elapsed_steps(&self) -> Option<u32> {
        self.elapsed_steps
    }

    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.inner
    }
}

impl<E: Environment> Environment for TimeLimit<E> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn action_space(&self) -> &Space {
        self.inner.action_space()
    }

    fn observation_space(&self) -> &Space {
        self.inner.observation_space()
    }

    fn sample_action(&mut self) -> Action {
        self.inner.sample_action()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        let reset = self.inner.reset(seed)?;
        self.elapsed_steps = Some(0);
        Ok(reset)
    }

    fn step(&mut self, action: &Action) -> Result<Transition, EnvError> {
        let elapsed = self
            .elapsed_steps
            .ok_or(EnvError::NotReset { op: "step" })?;

        let mut transition = self.inner.step(action)?;
        let elapsed = elapsed + 1;
        self.elapsed_steps = Some(elapsed);

        if elapsed >= self.max_episode_steps {
            transition.truncated = true;
        }
        Ok(transition)
    }

    fn render(&mut self) -> Result<NdArray, EnvError> {
        self.inner.render()
    }

    fn close(&mut self) {
        self.inner.close()
    }
}
