use blogposts_common::snowflake::{ProcessId, WorkerId};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
}

/// Process configuration, read from environment variables of the same name in
/// upper case (`PORT`, `DATABASE_URL`, ...).
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    #[serde(default = "default_server_address")]
    pub server_address: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Without a database URL posts are kept in memory.
    pub database_url: Option<String>,
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,
    #[serde(default)]
    pub worker_id: WorkerId,
    #[serde(default)]
    pub process_id: ProcessId,
}

fn default_server_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

fn default_database_max_connections() -> u32 {
    5
}

impl Env {
    /// Loads `.env` if there is one, then reads the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if e.not_found() {
                debug!("No .env file found");
            } else {
                return Err(e.into());
            }
        }

        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars).map_err(ConfigError::from)
    }

    #[must_use]
    pub fn socket_address(&self) -> SocketAddr {
        SocketAddr::new(self.server_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Env;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn defaults() {
        let env = Env::from_vars(vars(&[])).unwrap();

        assert_eq!(env.socket_address(), SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(env.database_url, None);
        assert_eq!(env.database_max_connections, 5);
        assert_eq!(env.worker_id.get(), 0);
    }

    #[test]
    fn reads_upper_case_variables() {
        let env = Env::from_vars(vars(&[
            ("PORT", "3000"),
            ("SERVER_ADDRESS", "127.0.0.1"),
            ("DATABASE_URL", "postgres://localhost/blog"),
            ("WORKER_ID", "3"),
        ]))
        .unwrap();

        assert_eq!(env.port, 3000);
        assert_eq!(env.server_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(env.database_url.as_deref(), Some("postgres://localhost/blog"));
        assert_eq!(env.worker_id.get(), 3);
    }

    #[test]
    fn rejects_out_of_range_worker_id() {
        assert!(Env::from_vars(vars(&[("WORKER_ID", "32")])).is_err());
        assert!(Env::from_vars(vars(&[("PORT", "eighty")])).is_err());
    }
}
