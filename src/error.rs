//! Dispatch error types shared by both entry paths.

use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::model::permissions::Permissions;

/// Every condition under which a matched command will not run its handler.
///
/// Some rejections produce a reply to the invoker, others drop the event
/// silently (allowlist mismatches, inhibitor vetoes). The reply text itself
/// comes from the [`crate::messages`] table so it can be localized.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// An inhibitor vetoed the command before any other check ran.
    #[error("command was vetoed by an inhibitor")]
    Inhibited,
    /// The per-(guild, user, command) cooldown window has not elapsed.
    #[error("command is on cooldown for {wait_secs} more seconds")]
    OnCooldown { wait_secs: u64 },
    /// The command carries a guild allowlist and this guild is not on it.
    #[error("guild {0} is not allowlisted for this command")]
    GuildNotAllowed(GuildId),
    /// The command carries a user allowlist and this user is not on it.
    #[error("user {0} is not allowlisted for this command")]
    UserNotAllowed(UserId),
    /// The command carries a channel allowlist and this channel is not on it.
    #[error("channel {0} is not allowlisted for this command")]
    ChannelNotAllowed(ChannelId),
    /// The command requires an age-restricted channel.
    #[error("channel is not marked NSFW")]
    NsfwRequired,
    /// The command is restricted to plain text channels.
    #[error("command only runs in text channels")]
    TextChannelOnly,
    /// The command is restricted to announcement channels.
    #[error("command only runs in announcement channels")]
    NewsChannelOnly,
    /// The command is restricted to threads.
    #[error("command only runs in threads")]
    ThreadOnly,
    /// The bot itself is missing permissions in the channel.
    #[error("bot is missing permissions: {0:?}")]
    MissingClientPermissions(Permissions),
    /// The invoking user is missing permissions.
    #[error("user is missing permissions: {0:?}")]
    MissingUserPermissions(Permissions),
    /// The invoking user holds none of the required roles. Carries the
    /// resolved role names for the reply template.
    #[error("user holds none of the required roles")]
    MissingRoles(Vec<String>),
    /// An interactive argument prompt ran out of time.
    #[error("argument prompt timed out")]
    PromptTimeout,
    /// The user typed the cancel keyword during an argument prompt.
    #[error("command cancelled at an argument prompt")]
    Cancelled,
    /// The user exhausted the re-prompt budget for one argument.
    #[error("argument prompt retries exhausted")]
    PromptRetriesExhausted,
    /// The platform client failed underneath us.
    #[error(transparent)]
    Platform(#[from] serenity::Error),
}

impl DispatchError {
    /// Rejections that drop the event without replying to the invoker.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            DispatchError::Inhibited
                | DispatchError::GuildNotAllowed(_)
                | DispatchError::UserNotAllowed(_)
                | DispatchError::ChannelNotAllowed(_)
                | DispatchError::Cancelled
        )
    }
}

pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_rejections() {
        assert!(DispatchError::Inhibited.is_silent());
        assert!(DispatchError::UserNotAllowed(UserId(1)).is_silent());
        assert!(DispatchError::Cancelled.is_silent());
        assert!(!DispatchError::OnCooldown { wait_secs: 3 }.is_silent());
        assert!(!DispatchError::NsfwRequired.is_silent());
    }

    #[test]
    fn test_display_includes_wait() {
        let err = DispatchError::OnCooldown { wait_secs: 7 };
        assert!(err.to_string().contains('7'));
    }
}
