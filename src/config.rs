use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::command::{ContextMode, EntryMode};

/// Framework-wide options. Library users fill this struct directly (or
/// deserialize it); [`FrameworkConfig::from_env`] covers the common
/// environment-variable deployment used by the demo binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Prefixes accepted when a guild has no dispatcher-provided override.
    pub prefixes: Vec<String>,
    pub case_sensitive_commands: bool,
    pub case_sensitive_prefixes: bool,
    /// Default entry-path routing for commands that do not pin their own.
    pub entry_mode: EntryMode,
    /// Default context-menu exposure.
    pub context_mode: ContextMode,
    /// Show a typing indicator while text-path handlers run.
    pub auto_typing: bool,
    /// Defer slash interactions before the handler runs.
    pub auto_defer: bool,
    /// How long an interactive argument prompt waits for a reply.
    #[serde(with = "humantime_serde")]
    pub prompt_timeout: Duration,
    /// Re-prompt attempts per argument before the command is abandoned.
    pub prompt_retries: u32,
    /// Cooldown for commands that do not declare one.
    #[serde(with = "humantime_serde")]
    pub default_cooldown: Option<Duration>,
    pub log_level: String,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        FrameworkConfig {
            prefixes: vec!["!".to_string()],
            case_sensitive_commands: false,
            case_sensitive_prefixes: false,
            entry_mode: EntryMode::Both,
            context_mode: ContextMode::Off,
            auto_typing: false,
            auto_defer: false,
            prompt_timeout: Duration::from_secs(30),
            prompt_retries: 3,
            default_cooldown: None,
            log_level: "info".to_string(),
        }
    }
}

impl FrameworkConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = FrameworkConfig::default();

        if let Ok(prefixes) = env::var("COMMAND_PREFIX") {
            config.prefixes = prefixes
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Ok(secs) = env::var("DEFAULT_COOLDOWN_SECS") {
            let secs: u64 = secs
                .parse()
                .context("DEFAULT_COOLDOWN_SECS must be a whole number of seconds")?;
            config.default_cooldown = Some(Duration::from_secs(secs));
        }
        if let Ok(secs) = env::var("PROMPT_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .context("PROMPT_TIMEOUT_SECS must be a whole number of seconds")?;
            config.prompt_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
