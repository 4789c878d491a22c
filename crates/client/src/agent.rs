use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use gymwire::EnvClient;
use gymwire::env::to_rgb_image;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub addr: String,
    pub timeout: Duration,
    pub episodes: u32,
    pub max_steps: u32,
    pub frames_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            addr: format!("{}:{}", gymwire::DEFAULT_HOST, gymwire::DEFAULT_PORT),
            timeout: Duration::from_millis(gymwire::DEFAULT_TIMEOUT_MS),
            episodes: 1,
            max_steps: 500,
            frames_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub steps: u32,
    pub episode_return: f64,
    pub terminated: bool,
    pub truncated: bool,
}

/// Plays episodes with actions sampled by the server.
pub struct RandomAgent {
    client: EnvClient,
    config: AgentConfig,
}

impl RandomAgent {
    pub fn connect(config: AgentConfig) -> Result<Self> {
        let client = EnvClient::connect(config.addr.as_str(), config.timeout)
            .with_context(|| format!("Failed to connect to {}", config.addr))?;
        log::info!("Connected to {}", client.peer_addr());

        if let Some(dir) = &config.frames_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(Self { client, config })
    }

    pub fn describe(&mut self) -> Result<(String, String)> {
        let action_space = self.client.action_space_str()?;
        let observation_space = self.client.observation_space_str()?;
        Ok((action_space, observation_space))
    }

    pub fn run_episode(&mut self, episode: u32) -> Result<EpisodeSummary> {
        self.client.reset()?;
        let mut summary = EpisodeSummary {
            steps: 0,
            episode_return: 0.0,
            terminated: false,
            truncated: false,
        };

        while summary.steps < self.config.max_steps {
            let action = self.client.sample_action()?;
            let transition = self.client.step(&action)?;
            summary.steps += 1;
            summary.episode_return += transition.reward;

            if self.config.frames_dir.is_some() {
                self.save_frame(episode, summary.steps)?;
            }

            if transition.done() {
                summary.terminated = transition.terminated;
                summary.truncated = transition.truncated;
                break;
            }
        }
        Ok(summary)
    }

    fn save_frame(&mut self, episode: u32, step: u32) -> Result<()> {
        let Some(dir) = &self.config.frames_dir else {
            return Ok(());
        };
        let path = dir.join(format!("episode-{}-step-{}.png", episode, step));
        let frame = self.client.render()?;
        to_rgb_image(&frame)?
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn run(&mut self) -> Result<Vec<EpisodeSummary>> {
        let mut summaries = Vec::with_capacity(self.config.episodes as usize);
        for episode in 1..=self.config.episodes {
            let summary = self.run_episode(episode)?;
            log::info!(
                "Episode {}: {} steps, return {}",
                episode,
                summary.steps,
                summary.episode_return
            );
            summaries.push(summary);
        }
        Ok(summaries)
    }

    /// Sends CLOSE and drops the connection.
    pub fn finish(mut self) -> Result<()> {
        let closed = self.client.close()?;
        let stats = self.client.disconnect();
        log::info!("Closed ({}): {}", closed, stats);
        Ok(())
    }
}
