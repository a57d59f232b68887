//! # Dispatcher
//!
//! The injected policy seam: where prefixes, per-guild language, and
//! cooldown state come from. Bots that persist these (database, cache
//! layer) implement [`Dispatcher`] themselves; [`MemoryDispatcher`] is the
//! in-process default and what the tests use.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{GuildId, UserId};

use crate::command::Command;
use crate::cooldown::{CooldownStatus, CooldownTracker};

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Prefixes accepted in this guild, checked in order.
    async fn prefixes(&self, guild_id: GuildId) -> Vec<String>;

    /// Language code used to render reply templates for this guild.
    async fn guild_language(&self, guild_id: GuildId) -> String;

    /// Cooldown state for this invocation. A ready answer is expected to
    /// arm the window; the pipeline asks exactly once per dispatch.
    async fn cooldown(&self, guild_id: GuildId, user_id: UserId, command: &Command)
        -> CooldownStatus;
}

pub struct MemoryDispatcher {
    prefixes: Vec<String>,
    languages: DashMap<u64, String>,
    cooldowns: CooldownTracker,
    default_cooldown: Option<Duration>,
}

impl MemoryDispatcher {
    pub fn new(prefixes: Vec<String>) -> Self {
        MemoryDispatcher {
            prefixes,
            languages: DashMap::new(),
            cooldowns: CooldownTracker::new(),
            default_cooldown: None,
        }
    }

    /// Cooldown applied to commands that do not declare their own.
    pub fn with_default_cooldown(mut self, cooldown: Duration) -> Self {
        self.default_cooldown = Some(cooldown);
        self
    }

    pub fn set_guild_language(&self, guild_id: GuildId, language: impl Into<String>) {
        self.languages.insert(guild_id.0, language.into());
    }
}

#[async_trait]
impl Dispatcher for MemoryDispatcher {
    async fn prefixes(&self, _guild_id: GuildId) -> Vec<String> {
        self.prefixes.clone()
    }

    async fn guild_language(&self, guild_id: GuildId) -> String {
        self.languages
            .get(&guild_id.0)
            .map(|l| l.clone())
            .unwrap_or_else(|| "en".to_string())
    }

    async fn cooldown(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        command: &Command,
    ) -> CooldownStatus {
        let window = match command.cooldown.or(self.default_cooldown) {
            Some(window) => window,
            None => return CooldownStatus::ready(),
        };
        self.cooldowns
            .check_and_arm(guild_id.0, user_id.0, &command.name, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_dispatcher_defaults() {
        let dispatcher = MemoryDispatcher::new(vec!["!".to_string()]);
        assert_eq!(dispatcher.prefixes(GuildId(1)).await, vec!["!".to_string()]);
        assert_eq!(dispatcher.guild_language(GuildId(1)).await, "en");
    }

    #[tokio::test]
    async fn test_guild_language_override() {
        let dispatcher = MemoryDispatcher::new(vec!["!".to_string()]);
        dispatcher.set_guild_language(GuildId(7), "de");
        assert_eq!(dispatcher.guild_language(GuildId(7)).await, "de");
        assert_eq!(dispatcher.guild_language(GuildId(8)).await, "en");
    }

    #[tokio::test]
    async fn test_cooldown_uses_command_window() {
        let dispatcher = MemoryDispatcher::new(vec!["!".to_string()]);
        let command = Command::new("slow").cooldown(Duration::from_secs(60));

        let first = dispatcher.cooldown(GuildId(1), UserId(2), &command).await;
        assert!(!first.on_cooldown);
        let second = dispatcher.cooldown(GuildId(1), UserId(2), &command).await;
        assert!(second.on_cooldown);
        assert!(second.wait_secs > 0);
    }

    #[tokio::test]
    async fn test_no_cooldown_without_window() {
        let dispatcher = MemoryDispatcher::new(vec!["!".to_string()]);
        let command = Command::new("fast");

        assert!(!dispatcher.cooldown(GuildId(1), UserId(2), &command).await.on_cooldown);
        assert!(!dispatcher.cooldown(GuildId(1), UserId(2), &command).await.on_cooldown);
    }

    #[tokio::test]
    async fn test_default_cooldown_fallback() {
        let dispatcher = MemoryDispatcher::new(vec!["!".to_string()])
            .with_default_cooldown(Duration::from_secs(60));
        let command = Command::new("fast");

        assert!(!dispatcher.cooldown(GuildId(1), UserId(2), &command).await.on_cooldown);
        assert!(dispatcher.cooldown(GuildId(1), UserId(2), &command).await.on_cooldown);
    }
}
