//! Command line and file configuration for the server.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use brandcheck_backend_euipo::EuipoConfig;
use brandcheck_generation::GeminiConfig;
use brandcheck_pipeline::PipelineConfig;
use brandcheck_ratelimit::RateLimitConfig;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "brandcheck-server")]
#[command(about = "Trademark clearance search service", long_about = None)]
pub struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, env = "BRANDCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0")]
    pub listen: String,

    /// Listen port
    #[arg(short, long, default_value = "8080", env = "PORT")]
    pub port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Registry OAuth client id
    #[arg(long, env = "EUIPO_CLIENT_ID", hide_env_values = true)]
    pub euipo_client_id: String,

    /// Registry OAuth client secret
    #[arg(long, env = "EUIPO_CLIENT_SECRET", hide_env_values = true)]
    pub euipo_client_secret: String,

    /// Generation API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,

    /// Shared rate limit store; the in-memory limiter is used when absent
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,
}

/// File configuration. Every section has defaults, so an absent file works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub registry: EuipoConfig,
    pub generation: GeminiConfig,
    pub rate_limit: RateLimitConfig,
    pub pipeline: PipelineConfig,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            registry: EuipoConfig::default(),
            generation: GeminiConfig::default(),
            rate_limit: RateLimitConfig::default(),
            pipeline: PipelineConfig::default(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Load from `path`, or defaults when no path is given or the file is missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let config = Self::from_yaml(&contents)
                    .with_context(|| format!("parsing {}", path.display()))?;
                info!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
            Some(path) => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ServerConfig::from_yaml(
            "rate_limit:\n  max_requests: 3\n  window: 10\npipeline:\n  visual_comparison_limit: 1\n",
        )
        .unwrap();

        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window, Duration::from_secs(10));
        assert_eq!(config.rate_limit.cleanup_threshold, 1000);
        assert_eq!(config.pipeline.visual_comparison_limit, 1);
        assert_eq!(config.registry, EuipoConfig::default());
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServerConfig::load(Some(Path::new("/nonexistent/brandcheck.yaml"))).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "brandcheck-server",
            "--port",
            "9000",
            "--euipo-client-id",
            "id",
            "--euipo-client-secret",
            "secret",
            "--gemini-api-key",
            "key",
        ])
        .unwrap();
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.listen, "0.0.0.0");
        assert!(!cli.verbose);
    }
}
