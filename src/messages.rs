//! # Reply Templates
//!
//! Localizable template strings for every user-facing rejection and prompt.
//! Templates use `{PLACEHOLDER}` markers that are substituted at render
//! time. A built-in English table is always present; additional languages
//! can be loaded from JSON and fall back to English per key.

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use log::warn;

/// Keys into the template table. One per user-facing message the dispatch
/// pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Cooldown,
    Nsfw,
    ChannelTextOnly,
    ChannelNewsOnly,
    ChannelThreadOnly,
    MissingPermissions,
    MissingClientPermissions,
    MissingRoles,
    ArgsTimeLimit,
    ArgPrompt,
    ArgInvalid,
    ArgChoices,
}

impl MessageKey {
    /// The key's name in loaded JSON tables.
    pub fn name(self) -> &'static str {
        match self {
            MessageKey::Cooldown => "COOLDOWN",
            MessageKey::Nsfw => "NSFW",
            MessageKey::ChannelTextOnly => "CHANNEL_TEXT_ONLY",
            MessageKey::ChannelNewsOnly => "CHANNEL_NEWS_ONLY",
            MessageKey::ChannelThreadOnly => "CHANNEL_THREAD_ONLY",
            MessageKey::MissingPermissions => "MISSING_PERMISSIONS",
            MessageKey::MissingClientPermissions => "MISSING_CLIENT_PERMISSIONS",
            MessageKey::MissingRoles => "MISSING_ROLES",
            MessageKey::ArgsTimeLimit => "ARGS_TIME_LIMIT",
            MessageKey::ArgPrompt => "ARG_PROMPT",
            MessageKey::ArgInvalid => "ARG_INVALID",
            MessageKey::ArgChoices => "ARG_CHOICES",
        }
    }
}

const DEFAULT_LANGUAGE: &str = "en";

fn english_table() -> HashMap<String, String> {
    let entries: &[(MessageKey, &str)] = &[
        (
            MessageKey::Cooldown,
            "Please wait {COOLDOWN} more second(s) before reusing `{CMDNAME}`.",
        ),
        (MessageKey::Nsfw, "This command only works in age-restricted channels."),
        (
            MessageKey::ChannelTextOnly,
            "This command only works in text channels.",
        ),
        (
            MessageKey::ChannelNewsOnly,
            "This command only works in announcement channels.",
        ),
        (
            MessageKey::ChannelThreadOnly,
            "This command only works in threads.",
        ),
        (
            MessageKey::MissingPermissions,
            "You need the following permission(s) to run this command: {PERMISSION}",
        ),
        (
            MessageKey::MissingClientPermissions,
            "I need the following permission(s) to run this command: {PERMISSION}",
        ),
        (
            MessageKey::MissingRoles,
            "You need the following role(s) to run this command: {ROLES}",
        ),
        (
            MessageKey::ArgsTimeLimit,
            "Time ran out, the command was cancelled.",
        ),
        (
            MessageKey::ArgPrompt,
            "Please provide a value for `{ARGUMENT}`. {HINT}",
        ),
        (
            MessageKey::ArgInvalid,
            "`{INPUT}` is not a valid value for `{ARGUMENT}`: {REASON}",
        ),
        (
            MessageKey::ArgChoices,
            "Valid options for `{ARGUMENT}`: {CHOICES}",
        ),
    ];

    entries
        .iter()
        .map(|(k, v)| (k.name().to_string(), (*v).to_string()))
        .collect()
}

/// The per-language template tables.
#[derive(Debug, Clone)]
pub struct Messages {
    tables: HashMap<String, HashMap<String, String>>,
}

impl Default for Messages {
    fn default() -> Self {
        let mut tables = HashMap::new();
        tables.insert(DEFAULT_LANGUAGE.to_string(), english_table());
        Messages { tables }
    }
}

impl Messages {
    /// Load (or overlay) a language table from a JSON object of
    /// `"KEY": "template"` pairs. Unknown keys are kept so user-defined
    /// templates can ride along; missing keys fall back to English.
    pub fn load_language(&mut self, language: &str, json: &str) -> Result<()> {
        let parsed: HashMap<String, String> = serde_json::from_str(json)
            .with_context(|| format!("invalid template table for language '{}'", language))?;
        self.tables
            .entry(language.to_string())
            .or_default()
            .extend(parsed);
        Ok(())
    }

    /// Render a template with `{NAME}` placeholder substitution.
    pub fn render(&self, language: &str, key: MessageKey, vars: &[(&str, String)]) -> String {
        let template = self
            .tables
            .get(language)
            .and_then(|t| t.get(key.name()))
            .or_else(|| {
                self.tables
                    .get(DEFAULT_LANGUAGE)
                    .and_then(|t| t.get(key.name()))
            });

        let mut out = match template {
            Some(t) => t.clone(),
            None => {
                warn!("no template registered for message key {}", key.name());
                return key.name().to_string();
            }
        };

        for (name, value) in vars {
            out = out.replace(&format!("{{{}}}", name), value);
        }
        out
    }
}
