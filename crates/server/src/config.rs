// crates/server/src/config.rs
//! Command-line and environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use jobcast_observability::{LogConfig, LogFormat};

use crate::work::WorkConfig;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 47900;

#[derive(Debug, Clone, Parser)]
#[command(name = "jobcast", version, about = "Run background jobs and stream their progress")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "JOBCAST_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    #[arg(long, env = "JOBCAST_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Steps per demo job when the request does not specify `steps`.
    #[arg(long, env = "JOBCAST_STEPS", default_value_t = 10)]
    pub steps: u32,

    /// Upper bound accepted for the `steps` query parameter.
    #[arg(long, env = "JOBCAST_MAX_STEPS", default_value_t = 1000)]
    pub max_steps: u32,

    /// Pause between demo job steps, in milliseconds.
    #[arg(long, env = "JOBCAST_STEP_INTERVAL_MS", default_value_t = 500)]
    pub step_interval_ms: u64,

    /// pretty, compact or json.
    #[arg(long, env = "JOBCAST_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Also write JSON logs to a daily-rolling file here.
    #[arg(long, env = "JOBCAST_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            bail!("--steps must be at least 1");
        }
        if self.steps > self.max_steps {
            bail!(
                "--steps ({}) must not exceed --max-steps ({})",
                self.steps,
                self.max_steps
            );
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn work(&self) -> WorkConfig {
        WorkConfig {
            default_steps: self.steps,
            max_steps: self.max_steps,
            step_interval: Duration::from_millis(self.step_interval_ms),
        }
    }

    pub fn log(&self) -> LogConfig {
        LogConfig {
            format: self.log_format,
            log_dir: self.log_dir.clone(),
            ..LogConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_flags() {
        let config = Config::try_parse_from([
            "jobcast",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--steps",
            "3",
            "--step-interval-ms",
            "20",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.log_format, LogFormat::Json);
        let work = config.work();
        assert_eq!(work.default_steps, 3);
        assert_eq!(work.step_interval, Duration::from_millis(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_log_format() {
        assert!(Config::try_parse_from(["jobcast", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn test_validate_step_bounds() {
        let zero = Config::try_parse_from(["jobcast", "--steps", "0"]).unwrap();
        assert!(zero.validate().is_err());

        let too_many =
            Config::try_parse_from(["jobcast", "--steps", "50", "--max-steps", "10"]).unwrap();
        assert!(too_many.validate().is_err());
    }
}
