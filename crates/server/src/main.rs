mod config;
mod events;
mod server;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use config::ServerConfig;
use server::EnvServer;

#[derive(Parser)]
#[command(name = "gymwire-server")]
#[command(about = "Serves a simulation environment to one remote agent")]
struct Args {
    #[arg(long, default_value = gymwire::DEFAULT_HOST)]
    host: String,

    #[arg(short, long, default_value_t = gymwire::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = gymwire::DEFAULT_TIMEOUT_MS, help = "I/O timeout in ms")]
    timeout: u64,

    #[arg(long, default_value = "CartPole-v1")]
    env_name: String,

    #[arg(long, default_value = "{}", help = "Environment parameters as a JSON object")]
    env_params: String,

    #[arg(long, help = "Seed for the first reset and the action sampler")]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let env_params: serde_json::Value = serde_json::from_str(&args.env_params)
        .with_context(|| format!("Invalid --env-params: {}", args.env_params))?;

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        io_timeout: Duration::from_millis(args.timeout),
        env_name: args.env_name,
        env_params,
        seed: args.seed,
    };

    let server = EnvServer::new(config.clone())
        .with_context(|| format!("Failed to start {} on {}", config.env_name, config.bind_addr()))?;
    log::info!(
        "Serving {} on {} (timeout {} ms)",
        server.env_id(),
        server.local_addr(),
        config.io_timeout.as_millis()
    );

    let report = server.run();
    log::info!(
        "Session {}: {} requests ({} rejected), {} episodes, {} steps",
        report.reason.as_str(),
        report.requests,
        report.rejected,
        report.episodes.episodes_finished,
        report.episodes.total_steps
    );
    log::info!("Channel: {}", report.channel);
    log::info!("Server shut down");

    report.result.context("Session failed")?;
    Ok(())
}
