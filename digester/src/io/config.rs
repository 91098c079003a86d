//! Agent configuration stored in `digester.toml` at the project root.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config filename, resolved against the project root.
pub const CONFIG_FILE_NAME: &str = "digester.toml";

/// Digest agent configuration (TOML).
///
/// Every field has a default, so a missing file or a partial file is valid.
/// Relative paths are resolved against the project root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DigestConfig {
    /// Model identifier sent with every request.
    pub model: String,

    /// Upper bound on output tokens per response.
    pub max_tokens: u32,

    /// Maximum request/response turns in the research pass.
    pub max_turns: u32,

    /// Cooldown between research turns and before the review pass, in seconds.
    pub turn_delay_secs: u64,

    /// Base URL of the Messages API.
    pub api_base_url: String,

    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,

    pub retry: RetryConfig,
    pub search: SearchConfig,
    pub paths: PathsConfig,
    pub images: ImagesConfig,
    pub escalation: EscalationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Wait before each retry, indexed by attempt; the last stage repeats.
    pub backoff_secs: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    /// Declare the server-side web search tool on research turns.
    pub enabled: bool,
    /// Maximum searches the service may run per request.
    pub max_uses: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub digests_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub images_dir: PathBuf,
    /// Optional directory with `system.md` / `review.md` template overrides.
    pub prompts_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImagesConfig {
    /// Allowed image extensions, without the dot.
    pub extensions: Vec<String>,
    /// Filename that is never offered as an image.
    pub placeholder: String,
    /// Site-relative prefix written into the `image` header field.
    pub url_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EscalationConfig {
    pub enabled: bool,
    /// Label attached to opened issues.
    pub label: String,
    pub timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: vec![60, 120, 240],
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_uses: 10,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            digests_dir: PathBuf::from("src/content/digests"),
            logs_dir: PathBuf::from("agent-logs"),
            images_dir: PathBuf::from("public/images/digests"),
            prompts_dir: PathBuf::from("agent/prompts"),
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            extensions: ["svg", "png", "jpg", "webp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            placeholder: ".gitkeep".to_string(),
            url_prefix: "/images/digests".to_string(),
        }
    }
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            label: "agent-failure".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 8192,
            max_turns: 25,
            turn_delay_secs: 65,
            api_base_url: "https://api.anthropic.com".to_string(),
            request_timeout_secs: 10 * 60,
            retry: RetryConfig::default(),
            search: SearchConfig::default(),
            paths: PathsConfig::default(),
            images: ImagesConfig::default(),
            escalation: EscalationConfig::default(),
        }
    }
}

impl DigestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be > 0"));
        }
        if self.max_turns == 0 {
            return Err(anyhow!("max_turns must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be > 0"));
        }
        if self.retry.backoff_secs.is_empty() {
            return Err(anyhow!("retry.backoff_secs must be a non-empty array"));
        }
        if self.images.extensions.is_empty() {
            return Err(anyhow!("images.extensions must be a non-empty array"));
        }
        if self.escalation.timeout_secs == 0 {
            return Err(anyhow!("escalation.timeout_secs must be > 0"));
        }
        Ok(())
    }

    pub fn turn_delay(&self) -> Duration {
        Duration::from_secs(self.turn_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `DigestConfig::default()`.
pub fn load_config(path: &Path) -> Result<DigestConfig> {
    if !path.exists() {
        let cfg = DigestConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: DigestConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
