//! Resolver configuration.
//!
//! Defaults match a plain `dig`-style query: port 53, one second per attempt, five
//! attempts. Every field can be overridden from the environment:
//!
//! | Variable                    | Field           | Format                          |
//! |-----------------------------|-----------------|---------------------------------|
//! | `DNSPROBE_PORT`             | `port`          | `u16`                           |
//! | `DNSPROBE_TIMEOUT_MS`       | `timeout`       | milliseconds, > 0               |
//! | `DNSPROBE_MAX_RETRIES`      | `max_retries`   | total attempts, >= 1            |
//! | `DNSPROBE_BIND_ADDR`        | `bind_addr`     | `ip:port`                       |
//! | `DNSPROBE_REPARSE_QUESTION` | `question_mode` | `true`/`1` selects `Reparse`    |
use crate::dns::resolver::standard::QuestionMode;
use std::net::{Ipv6Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Longest per-attempt timeout accepted by [`ResolverConfig::validate`].
pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);
/// Largest attempt count accepted by [`ResolverConfig::validate`].
pub const MAX_ATTEMPTS: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigErrors {
    #[error("invalid port: {0}")]
    InvalidPort(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid max retries: {0}")]
    InvalidMaxRetries(String),
    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),
    #[error("invalid boolean for {key}: {value}")]
    InvalidFlag { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolverConfig {
    /// Destination port on the server.
    pub port: u16,
    /// How long each attempt waits for a reply.
    pub timeout: Duration,
    /// Total number of attempts, the first send included.
    pub max_retries: u32,
    /// Local address the per-query socket binds to.
    pub bind_addr: SocketAddr,
    pub question_mode: QuestionMode,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            port: 53,
            timeout: Duration::from_secs(1),
            max_retries: 5,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            question_mode: QuestionMode::Skip,
        }
    }
}

impl ResolverConfig {
    /// Defaults overridden by the `DNSPROBE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigErrors> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `DNSPROBE_*` key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigErrors>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("DNSPROBE_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigErrors::InvalidPort(port.clone()))?;
        }

        if let Some(timeout) = lookup("DNSPROBE_TIMEOUT_MS") {
            let millis = timeout
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigErrors::InvalidTimeout(timeout.clone()))?;
            config.timeout = Duration::from_millis(millis);
        }

        if let Some(retries) = lookup("DNSPROBE_MAX_RETRIES") {
            config.max_retries = retries
                .trim()
                .parse()
                .map_err(|_| ConfigErrors::InvalidMaxRetries(retries.clone()))?;
        }

        if let Some(bind_addr) = lookup("DNSPROBE_BIND_ADDR") {
            config.bind_addr = bind_addr
                .trim()
                .parse()
                .map_err(|_| ConfigErrors::InvalidBindAddress(bind_addr.clone()))?;
        }

        if let Some(flag) = lookup("DNSPROBE_REPARSE_QUESTION") {
            let reparse = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(ConfigErrors::InvalidFlag {
                        key: "DNSPROBE_REPARSE_QUESTION".to_string(),
                        value: flag,
                    });
                }
            };
            if reparse {
                config.question_mode = QuestionMode::Reparse;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigErrors> {
        if self.timeout.is_zero() {
            return Err(ConfigErrors::InvalidTimeout(
                "timeout must be greater than 0".to_string(),
            ));
        }
        if self.timeout > MAX_TIMEOUT {
            return Err(ConfigErrors::InvalidTimeout(format!(
                "timeout too large (max {} seconds)",
                MAX_TIMEOUT.as_secs()
            )));
        }
        if self.max_retries == 0 || self.max_retries > MAX_ATTEMPTS {
            return Err(ConfigErrors::InvalidMaxRetries(format!(
                "{} (expected 1..={})",
                self.max_retries, MAX_ATTEMPTS
            )));
        }
        Ok(())
    }

    /// Local address to bind for a query to `server`.
    ///
    /// An IPv6 server with the IPv4 wildcard configured gets the IPv6 wildcard instead.
    pub fn bind_addr_for(&self, server: &SocketAddr) -> SocketAddr {
        if server.is_ipv6() && self.bind_addr.is_ipv4() && self.bind_addr.ip().is_unspecified() {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, self.bind_addr.port()))
        } else {
            self.bind_addr
        }
    }
}
