mod agent;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use agent::{AgentConfig, RandomAgent};

#[derive(Parser)]
#[command(name = "gymwire-agent")]
#[command(about = "Random agent for a gymwire server")]
struct Args {
    #[arg(short, long, default_value = "127.0.0.1:5555", help = "Server address")]
    addr: String,

    #[arg(short, long, default_value_t = gymwire::DEFAULT_TIMEOUT_MS, help = "I/O timeout in ms")]
    timeout: u64,

    #[arg(short, long, default_value_t = 1)]
    episodes: u32,

    #[arg(long, default_value_t = 500)]
    max_steps: u32,

    #[arg(long, help = "Render every step and save PNG frames here")]
    frames_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = AgentConfig {
        addr: args.addr,
        timeout: Duration::from_millis(args.timeout),
        episodes: args.episodes,
        max_steps: args.max_steps,
        frames_dir: args.frames_dir,
    };

    let mut agent = RandomAgent::connect(config)?;
    let (action_space, observation_space) = agent.describe()?;
    println!("Action space: {}", action_space);
    println!("Observation space: {}", observation_space);

    let summaries = agent.run()?;
    for (index, summary) in summaries.iter().enumerate() {
        let ending = match (summary.terminated, summary.truncated) {
            (true, _) => "terminated",
            (false, true) => "truncated",
            (false, false) => "step limit",
        };
        println!(
            "Episode {}: {} steps, return {} ({})",
            index + 1,
            summary.steps,
            summary.episode_return,
            ending
        );
    }

    agent.finish()?;
    Ok(())
}
