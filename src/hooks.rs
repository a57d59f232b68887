//! Observer hooks and inhibitors.
//!
//! Inhibitors run before every other check and can veto a dispatch
//! outright. Hooks observe the outcome: one callback after the checks pass
//! and the handler is about to run, one when the handler fails.

use async_trait::async_trait;
use log::{error, info};
use serenity::model::id::{ChannelId, GuildId, UserId};

/// What the pipeline knows about an invocation when hooks fire.
#[derive(Debug, Clone)]
pub struct CommandEvent {
    pub command: String,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
}

#[async_trait]
pub trait Hook: Send + Sync {
    async fn command_execute(&self, _event: &CommandEvent) {}
    async fn command_error(&self, _event: &CommandEvent, _error: &anyhow::Error) {}
}

/// Veto hook. Returning `true` drops the event without a reply; an
/// inhibitor that wants to tell the user why should do so itself.
#[async_trait]
pub trait Inhibitor: Send + Sync {
    async fn inhibit(&self, event: &CommandEvent) -> bool;
}

/// Default hook: command traffic into the log.
pub struct LogHook;

#[async_trait]
impl Hook for LogHook {
    async fn command_execute(&self, event: &CommandEvent) {
        info!(
            "Processing command: {} from user: {} in guild: {}",
            event.command, event.user_id, event.guild_id
        );
    }

    async fn command_error(&self, event: &CommandEvent, error: &anyhow::Error) {
        error!("Command '{}' failed: {:#}", event.command, error);
    }
}
