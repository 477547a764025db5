use clap::Parser;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 6379;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid --replicaof value {0:?}, expected \"<host> <port>\"")]
    InvalidReplicaOf(String),
    #[error("invalid master port {0:?}")]
    InvalidMasterPort(String),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Single-threaded Redis-compatible server", long_about = None)]
pub struct Cli {
    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on. Use 0 for an ephemeral port.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Run as a replica of the given master, written as "<host> <port>"
    #[arg(long)]
    pub replicaof: Option<String>,
}

/// Address of the master a replica attaches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterAddress {
    pub host: String,
    pub port: u16,
}

impl MasterAddress {
    /// Parses the `"<host> <port>"` form used by `--replicaof`.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let mut parts = value.split_whitespace();

        let (Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ConfigError::InvalidReplicaOf(value.to_string()));
        };

        let port = port
            .parse::<u16>()
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| ConfigError::InvalidMasterPort(port.to_string()))?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn to_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub replicaof: Option<MasterAddress>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            replicaof: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl TryFrom<Cli> for ServerConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let replicaof = cli
            .replicaof
            .as_deref()
            .map(MasterAddress::parse)
            .transpose()?;

        Ok(Self {
            host: cli.host,
            port: cli.port,
            replicaof,
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, ConfigError, MasterAddress, ServerConfig};

    fn parse(args: &[&str]) -> Result<ServerConfig, ConfigError> {
        let cli = Cli::parse_from(std::iter::once("reactor-redis").chain(args.iter().copied()));
        ServerConfig::try_from(cli)
    }

    #[test]
    fn test_defaults() {
        assert_eq!(parse(&[]), Ok(ServerConfig::default()));
        assert_eq!(ServerConfig::default().bind_address(), "localhost:6379");
    }

    #[test]
    fn test_parse_flags() {
        let test_cases = vec![
            (
                vec!["--port", "6380"],
                Ok(ServerConfig {
                    port: 6380,
                    ..ServerConfig::default()
                }),
            ),
            (
                vec!["--host", "127.0.0.1", "-p", "7000"],
                Ok(ServerConfig {
                    host: "127.0.0.1".to_string(),
                    port: 7000,
                    replicaof: None,
                }),
            ),
            (
                vec!["--port", "6380", "--replicaof", "localhost 6379"],
                Ok(ServerConfig {
                    port: 6380,
                    replicaof: Some(MasterAddress {
                        host: "localhost".to_string(),
                        port: 6379,
                    }),
                    ..ServerConfig::default()
                }),
            ),
            (
                vec!["--replicaof", "localhost"],
                Err(ConfigError::InvalidReplicaOf("localhost".to_string())),
            ),
            (
                vec!["--replicaof", "localhost 6379 extra"],
                Err(ConfigError::InvalidReplicaOf(
                    "localhost 6379 extra".to_string(),
                )),
            ),
            (
                vec!["--replicaof", "localhost port"],
                Err(ConfigError::InvalidMasterPort("port".to_string())),
            ),
            (
                vec!["--replicaof", "localhost 0"],
                Err(ConfigError::InvalidMasterPort("0".to_string())),
            ),
        ];

        for (args, expected) in test_cases {
            assert_eq!(parse(&args), expected, "args {:?}", args);
        }
    }
}
