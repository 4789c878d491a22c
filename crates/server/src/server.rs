use std::net::SocketAddr;

use gymwire::{
    BridgeError, Channel, ChannelStats, Endpoint, EnvAdapter, EpisodeStats, Session, env,
};

use crate::config::ServerConfig;
use crate::events::ShutdownReason;

#[derive(Debug)]
pub struct SessionReport {
    pub reason: ShutdownReason,
    pub requests: u64,
    pub rejected: u64,
    pub episodes: EpisodeStats,
    pub channel: ChannelStats,
    pub result: Result<(), BridgeError>,
}

/// One bound endpoint serving one session.
pub struct EnvServer {
    endpoint: Endpoint,
    session: Session,
    config: ServerConfig,
}

impl EnvServer {
    /// Builds the environment before binding, so bad parameters never
    /// leave a listening socket behind.
    pub fn new(config: ServerConfig) -> Result<Self, BridgeError> {
        let env = env::make(&config.env_name, &config.env_params, config.seed)?;
        let session = Session::new(EnvAdapter::new(env, config.seed));
        let endpoint = Endpoint::bind(config.bind_addr())?;

        Ok(Self {
            endpoint,
            session,
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn env_id(&self) -> &str {
        self.session.adapter().env_id()
    }

    /// Serves until CLOSE, timeout or failure. The environment and the
    /// channel are released on every path.
    pub fn run(mut self) -> SessionReport {
        let mut channel: Option<Channel> = None;
        let result = match self.endpoint.accept(self.config.io_timeout) {
            Ok(accepted) => {
                let channel = channel.insert(accepted);
                self.session.run(channel)
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            log::error!("session ended with error: {}", e);
        }

        self.session.release();
        let channel_stats = match channel.as_mut() {
            Some(channel) => {
                channel.close();
                channel.stats().clone()
            }
            None => ChannelStats::default(),
        };

        SessionReport {
            reason: ShutdownReason::from_result(&result),
            requests: self.session.requests(),
            rejected: self.session.rejected(),
            episodes: self.session.adapter().stats().clone(),
            channel: channel_stats,
            result,
        }
    }
}
