use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::array::NdArray;
use super::render::CartPoleRenderer;
use super::space::Space;
use super::types::{Action, EnvError, Environment, Info, Reset, Transition};

const THETA_THRESHOLD_RADIANS: f64 = 12.0 * 2.0 * std::f64::consts::PI / 360.0;
const X_THRESHOLD: f64 = 2.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Integrator {
    #[serde(rename = "euler")]
    Euler,
    #[serde(rename = "semi-implicit euler")]
    SemiImplicitEuler,
}

/// Construction parameters accepted from the command line as a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CartPoleConfig {
    pub max_episode_steps: Option<u32>,
    pub sutton_barto_reward: bool,
    pub gravity: f64,
    pub masscart: f64,
    pub masspole: f64,
    /// Half the pole's length.
    pub length: f64,
    pub force_mag: f64,
    /// Seconds between state updates.
    pub tau: f64,
    pub kinematics_integrator: Integrator,
    pub reset_bound: f64,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            max_episode_steps: None,
            sutton_barto_reward: false,
            gravity: 9.8,
            masscart: 1.0,
            masspole: 0.1,
            length: 0.5,
            force_mag: 10.0,
            tau: 0.02,
            kinematics_integrator: Integrator::Euler,
            reset_bound: 0.05,
        }
    }
}

impl CartPoleConfig {
    pub fn from_json(params: &serde_json::Value) -> Result<Self, EnvError> {
        let config: Self = serde_json::from_value(params.clone())?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the dynamics or the reset sampler cannot use.
    pub fn validate(&self) -> Result<(), EnvError> {
        let positive = [
            ("masscart", self.masscart),
            ("masspole", self.masspole),
            ("length", self.length),
            ("force_mag", self.force_mag),
            ("tau", self.tau),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid_param(name, value, "a positive finite number"));
            }
        }
        if !self.gravity.is_finite() {
            return Err(invalid_param("gravity", self.gravity, "finite"));
        }
        if !self.reset_bound.is_finite() || self.reset_bound < 0.0 {
            return Err(invalid_param(
                "reset_bound",
                self.reset_bound,
                "a non-negative finite number",
            ));
        }
        Ok(())
    }

    fn total_mass(&self) -> f64 {
        self.masspole + self.masscart
    }

    fn polemass_length(&self) -> f64 {
        self.masspole * self.length
    }
}

fn invalid_param(name: &str, value: f64, expected: &str) -> EnvError {
    EnvError::InvalidParams(serde::de::Error::custom(format!(
        "{} must be {}, got {}",
        name, expected, value
    )))
}

/// Cart position, cart velocity, pole angle, pole angular velocity.
pub type CartPoleState = [f64; 4];

pub struct CartPole {
    id: String,
    config: CartPoleConfig,
    state: Option<CartPoleState>,
    steps_beyond_terminated: Option<u32>,
    rng: ChaCha8Rng,
    action_rng: ChaCha8Rng,
    action_space: Space,
    observation_space: Space,
    renderer: CartPoleRenderer,
    closed: bool,
}

impl CartPole {
    pub fn new(id: impl Into<String>, config: CartPoleConfig, seed: Option<u64>) -> Self {
        let (rng, action_rng) = match seed {
            Some(seed) => (
                ChaCha8Rng::seed_from_u64(seed),
                ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (ChaCha8Rng::from_entropy(), ChaCha8Rng::from_entropy()),
        };

        let high = [
            (X_THRESHOLD * 2.0) as f32,
            f32::MAX,
            (THETA_THRESHOLD_RADIANS * 2.0) as f32,
            f32::MAX,
        ];
        let low = high.map(|v| -v);

        Self {
            id: id.into(),
            config,
            state: None,
            steps_beyond_terminated: None,
            rng,
            action_rng,
            action_space: Space::discrete(2),
            observation_space: Space::bounded(low.to_vec(), high.to_vec(), vec![4]),
            renderer: CartPoleRenderer::default(),
            closed: false,
        }
    }

    pub fn state(&self) -> Option<CartPoleState> {
        self.state
    }

    /// Overrides the physical state, e.g. to start from a known configuration.
    pub fn set_state(&mut self, state: CartPoleState) {
        self.state = Some(state);
        self.steps_beyond_terminated = None;
    }

    fn ensure_open(&self) -> Result<(), EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        Ok(())
    }

    fn observation(state: &CartPoleState) -> Result<NdArray, EnvError> {
        let values = state.map(|v| v as f32);
        Ok(NdArray::from_f32(vec![4], &values)?)
    }

    fn integrate(&self, state: CartPoleState, force: f64) -> CartPoleState {
        let [x, x_dot, theta, theta_dot] = state;
        let c = &self.config;
        let (sintheta, costheta) = theta.sin_cos();

        let temp =
            (force + c.polemass_length() * theta_dot * theta_dot * sintheta) / c.total_mass();
        let thetaacc = (c.gravity * sintheta - costheta * temp)
            / (c.length * (4.0 / 3.0 - c.masspole * costheta * costheta / c.total_mass()));
        let xacc = temp - c.polemass_length() * thetaacc * costheta / c.total_mass();

        match c.kinematics_integrator {
            Integrator::Euler => [
                x + c.tau * x_dot,
                x_dot + c.tau * xacc,
                theta + c.tau * theta_dot,
                theta_dot + c.tau * thetaacc,
            ],
            Integrator::SemiImplicitEuler => {
                let x_dot = x_dot + c.tau * xacc;
                let theta_dot = theta_dot + c.tau * thetaacc;
                [x + c.tau * x_dot, x_dot, theta + c.tau * theta_dot, theta_dot]
            }
        }
    }

    fn reward(&mut self, terminated: bool) -> f64 {
        let sutton = self.config.sutton_barto_reward;
        if !terminated {
            return if sutton { 0.0 } else { 1.0 };
        }
        match self.steps_beyond_terminated.as_mut() {
            None => {
                self.steps_beyond_terminated = Some(0);
                if sutton { -1.0 } else { 1.0 }
            }
            Some(steps) => {
                if *steps == 0 {
                    log::warn!(
                        "step() called after the episode terminated; call reset() first, \
                         further steps are undefined behavior"
                    );
                }
                *steps += 1;
                if sutton { -1.0 } else { 0.0 }
            }
        }
    }
}

impl Environment for CartPole {
    fn id(&self) -> &str {
        &self.id
    }

    fn action_space(&self) -> &Space {
        &self.action_space
    }

    fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    fn sample_action(&mut self) -> Action {
        self.action_space.sample(&mut self.action_rng)
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        self.ensure_open()?;
        if let Some(seed) = seed {
            self.rng = ChaCha8Rng::seed_from_u64(seed);
        }

        let bound = self.config.reset_bound;
        let state = [0; 4].map(|_| self.rng.gen_range(-bound..=bound));
        self.state = Some(state);
        self.steps_beyond_terminated = None;

        Ok(Reset {
            observation: Self::observation(&state)?,
            info: Info::new(),
        })
    }

    fn step(&mut self, action: &Action) -> Result<Transition, EnvError> {
        self.ensure_open()?;
        if !self.action_space.contains(action) {
            return Err(EnvError::InvalidAction {
                action: action.to_string(),
                space: self.action_space.to_string(),
            });
        }
        let state = self.state.ok_or(EnvError::NotReset { op: "step" })?;

        let force = match action {
            Action::Discrete(1) => self.config.force_mag,
            _ => -self.config.force_mag,
        };
        let next = self.integrate(state, force);
        self.state = Some(next);

        let [x, _, theta, _] = next;
        let terminated = !(-X_THRESHOLD..=X_THRESHOLD).contains(&x)
            || !(-THETA_THRESHOLD_RADIANS..=THETA_THRESHOLD_RADIANS).contains(&theta);
        let reward = self.reward(terminated);

        Ok(Transition {
            observation: Self::observation(&next)?,
            reward,
            terminated,
            truncated: false,
            info: Info::new(),
        })
    }

    fn render(&mut self) -> Result<NdArray, EnvError> {
        self.ensure_open()?;
        let [x, _, theta, _] = self.state.ok_or(EnvError::NotReset { op: "render" })?;
        Ok(self
            .renderer
            .draw(x, theta, X_THRESHOLD, self.config.length)?)
    }

    fn close(&mut self) {
        if !self.closed {
            log::debug!("{} closed", self.id);
        }
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> CartPole {
        CartPole::new("CartPole-v1", CartPoleConfig::default(), Some(42))
    }

    fn observation(values: &NdArray) -> Vec<f32> {
        values.to_f32_vec().unwrap()
    }

    #[test]
    fn reset_stays_within_bound() {
        let mut env = seeded();
        for _ in 0..20 {
            let reset = env.reset(None).unwrap();
            assert_eq!(reset.observation.shape(), &[4]);
            assert!(observation(&reset.observation).iter().all(|v| v.abs() <= 0.05));
            assert!(reset.info.is_empty());
        }
    }

    #[test]
    fn same_seed_same_start() {
        let mut a = seeded();
        let mut b = CartPole::new("CartPole-v1", CartPoleConfig::default(), None);
        let first = a.reset(Some(3)).unwrap().observation;
        let second = b.reset(Some(3)).unwrap().observation;
        assert_eq!(first, second);
    }

    #[test]
    fn push_right_accelerates_cart_right() {
        let mut env = seeded();
        env.reset(None).unwrap();
        env.set_state([0.0; 4]);
        let transition = env.step(&Action::Discrete(1)).unwrap();
        // Euler integration moves position only on the following step.
        let obs = observation(&transition.observation);
        assert_eq!(obs[0], 0.0);
        assert!(obs[1] > 0.0);
        assert!(obs[3] < 0.0, "pole should swing back when cart pushes right");
    }

    #[test]
    fn one_euler_step_matches_reference_equations() {
        let mut env = seeded();
        env.set_state([0.0; 4]);
        let transition = env.step(&Action::Discrete(0)).unwrap();
        let obs = observation(&transition.observation);

        // temp = -10 / 1.1, thetaacc = -costheta*temp / (0.5 * (4/3 - 0.1/1.1))
        let temp = -10.0 / 1.1;
        let thetaacc = -temp / (0.5 * (4.0 / 3.0 - 0.1 / 1.1));
        let xacc = temp - 0.05 * thetaacc / 1.1;
        assert!((obs[1] as f64 - 0.02 * xacc).abs() < 1e-6);
        assert!((obs[3] as f64 - 0.02 * thetaacc).abs() < 1e-6);
    }

    #[test]
    fn semi_implicit_euler_moves_position_immediately() {
        let config = CartPoleConfig {
            kinematics_integrator: Integrator::SemiImplicitEuler,
            ..Default::default()
        };
        let mut env = CartPole::new("CartPole-v1", config, Some(1));
        env.set_state([0.0; 4]);
        let obs = observation(&env.step(&Action::Discrete(1)).unwrap().observation);
        assert!(obs[0] > 0.0);
    }

    #[test]
    fn pole_falls_under_gravity() {
        let mut env = seeded();
        env.set_state([0.0, 0.0, 0.05, 0.0]);
        let mut terminated = false;
        let mut steps = 0;
        while !terminated && steps < 200 {
            // Alternate pushes so the cart itself stays near the center.
            let action = Action::Discrete(steps % 2);
            terminated = env.step(&action).unwrap().terminated;
            steps += 1;
        }
        assert!(terminated);
        let [_, _, theta, _] = env.state().unwrap();
        assert!(theta > THETA_THRESHOLD_RADIANS);
    }

    #[test]
    fn terminates_when_cart_leaves_track() {
        let mut env = seeded();
        env.set_state([2.39, 1.0, 0.0, 0.0]);
        let transition = env.step(&Action::Discrete(1)).unwrap();
        assert!(transition.terminated);
        assert!(!transition.truncated);
    }

    #[test]
    fn rewards_after_termination() {
        let mut env = seeded();
        env.set_state([2.39, 1.0, 0.0, 0.0]);
        assert_eq!(env.step(&Action::Discrete(1)).unwrap().reward, 1.0);
        assert_eq!(env.step(&Action::Discrete(1)).unwrap().reward, 0.0);
        assert_eq!(env.step(&Action::Discrete(1)).unwrap().reward, 0.0);
    }

    #[test]
    fn sutton_barto_rewards() {
        let config = CartPoleConfig {
            sutton_barto_reward: true,
            ..Default::default()
        };
        let mut env = CartPole::new("CartPole-v1", config, Some(1));
        env.set_state([0.0; 4]);
        assert_eq!(env.step(&Action::Discrete(1)).unwrap().reward, 0.0);
        env.set_state([2.39, 1.0, 0.0, 0.0]);
        assert_eq!(env.step(&Action::Discrete(1)).unwrap().reward, -1.0);
        assert_eq!(env.step(&Action::Discrete(1)).unwrap().reward, -1.0);
    }

    #[test]
    fn step_and_render_require_reset() {
        let mut env = seeded();
        assert!(matches!(
            env.step(&Action::Discrete(0)),
            Err(EnvError::NotReset { op: "step" })
        ));
        assert!(matches!(
            env.render(),
            Err(EnvError::NotReset { op: "render" })
        ));
    }

    #[test]
    fn rejects_actions_outside_space() {
        let mut env = seeded();
        env.reset(None).unwrap();
        let err = env.step(&Action::Discrete(2)).unwrap_err();
        assert!(matches!(err, EnvError::InvalidAction { .. }));
        assert!(err.to_string().contains("Discrete(2)"));
    }

    #[test]
    fn close_is_idempotent_and_final() {
        let mut env = seeded();
        env.reset(None).unwrap();
        env.close();
        env.close();
        assert!(matches!(env.reset(None), Err(EnvError::Closed)));
    }

    #[test]
    fn config_from_json_rejects_unknown_keys() {
        let config =
            CartPoleConfig::from_json(&serde_json::json!({ "sutton_barto_reward": true })).unwrap();
        assert!(config.sutton_barto_reward);
        assert_eq!(config.gravity, 9.8);

        let integrator = serde_json::json!({ "kinematics_integrator": "semi-implicit euler" });
        assert_eq!(
            CartPoleConfig::from_json(&integrator)
                .unwrap()
                .kinematics_integrator,
            Integrator::SemiImplicitEuler
        );

        let err = CartPoleConfig::from_json(&serde_json::json!({ "wind": 3 }));
        assert!(matches!(err, Err(EnvError::InvalidParams(_))));
    }

    #[test]
    fn config_rejects_unusable_values() {
        for params in [
            serde_json::json!({ "reset_bound": -0.1 }),
            serde_json::json!({ "tau": 0.0 }),
            serde_json::json!({ "length": -0.5 }),
            serde_json::json!({ "masscart": 0.0 }),
            serde_json::json!({ "masspole": -1.0 }),
            serde_json::json!({ "force_mag": 0.0 }),
        ] {
            let err = CartPoleConfig::from_json(&params).err().unwrap();
            assert!(matches!(err, EnvError::InvalidParams(_)), "{}", params);
        }

        let config = CartPoleConfig {
            reset_bound: f64::NAN,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reset_bound"));

        let config = CartPoleConfig {
            gravity: f64::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let zero_bound = CartPoleConfig::from_json(&serde_json::json!({ "reset_bound": 0.0 }));
        assert!(zero_bound.is_ok());
    }

    #[test]
    fn spaces_describe_cartpole() {
        let env = seeded();
        assert_eq!(env.action_space().to_string(), "Discrete(2)");
        let observation = env.observation_space().to_string();
        assert!(observation.starts_with("Box([-4.8 -3.4028235e+38 -0.418879"));
        assert!(observation.ends_with("(4,), float32)"));
    }
}
