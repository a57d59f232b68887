//! # Pre-run Checks
//!
//! The gauntlet between command lookup and argument resolution, in a fixed
//! order: allowlists, channel constraints, client permissions, user
//! permissions, required roles. (Inhibitors and cooldowns run earlier, in
//! the pipeline itself, because they need the dispatcher.)
//!
//! Guild data is fetched over HTTP at most once per dispatch and only when
//! a check actually needs it.

use serenity::http::Http;
use serenity::model::channel::{Channel, ChannelType};
use serenity::model::guild::PartialGuild;
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use serenity::model::permissions::Permissions;

use crate::command::Command;
use crate::error::{DispatchError, DispatchResult};
use crate::permissions::{combine_permissions, missing_permissions};

/// Everything the checks can know without fetching.
pub(crate) struct CheckContext<'a> {
    pub http: &'a Http,
    pub command: &'a Command,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub bot_id: UserId,
    /// Roles carried on the inbound event, when the gateway included them.
    pub member_roles: Option<Vec<RoleId>>,
    /// Pre-computed permissions carried on interactions.
    pub member_permissions: Option<Permissions>,
}

pub(crate) async fn run_checks(input: &CheckContext<'_>) -> DispatchResult<()> {
    let cmd = input.command;

    allowlists(cmd, input.guild_id, input.author_id, input.channel_id)?;

    if cmd.nsfw || cmd.channel_text_only || cmd.channel_news_only || cmd.channel_thread_only {
        let (kind, nsfw) = match input.http.get_channel(input.channel_id.0).await? {
            Channel::Guild(channel) => (channel.kind, channel.nsfw),
            _ => (ChannelType::Private, false),
        };
        channel_constraints(cmd, kind, nsfw)?;
    }

    let mut guild: Option<PartialGuild> = None;

    if !cmd.client_required_permissions.is_empty() {
        let bot_member = input
            .http
            .get_member(input.guild_id.0, input.bot_id.0)
            .await?;
        let held = effective_permissions(
            fetch_guild(&mut guild, input.http, input.guild_id).await?,
            input.bot_id,
            &bot_member.roles,
        );
        let missing = missing_permissions(cmd.client_required_permissions, held);
        if !missing.is_empty() {
            return Err(DispatchError::MissingClientPermissions(missing));
        }
    }

    if !cmd.user_required_permissions.is_empty() {
        let held = match input.member_permissions {
            Some(permissions) => permissions,
            None => {
                let roles = member_roles(input).await?;
                effective_permissions(
                    fetch_guild(&mut guild, input.http, input.guild_id).await?,
                    input.author_id,
                    &roles,
                )
            }
        };
        let missing = missing_permissions(cmd.user_required_permissions, held);
        if !missing.is_empty() {
            return Err(DispatchError::MissingUserPermissions(missing));
        }
    }

    if !cmd.user_required_roles.is_empty() {
        let roles = member_roles(input).await?;
        if !has_required_role(&roles, &cmd.user_required_roles) {
            let guild = fetch_guild(&mut guild, input.http, input.guild_id).await?;
            let names = cmd
                .user_required_roles
                .iter()
                .map(|id| match guild.roles.get(id) {
                    Some(role) => role.name.clone(),
                    None => id.0.to_string(),
                })
                .collect();
            return Err(DispatchError::MissingRoles(names));
        }
    }

    Ok(())
}

async fn fetch_guild<'a>(
    cache: &'a mut Option<PartialGuild>,
    http: &Http,
    guild_id: GuildId,
) -> DispatchResult<&'a PartialGuild> {
    if cache.is_none() {
        *cache = Some(http.get_guild(guild_id.0).await?);
    }
    // Just populated above.
    Ok(cache.as_ref().unwrap())
}

async fn member_roles(input: &CheckContext<'_>) -> DispatchResult<Vec<RoleId>> {
    match &input.member_roles {
        Some(roles) => Ok(roles.clone()),
        None => {
            let member = input
                .http
                .get_member(input.guild_id.0, input.author_id.0)
                .await?;
            Ok(member.roles)
        }
    }
}

fn effective_permissions(guild: &PartialGuild, user_id: UserId, roles: &[RoleId]) -> Permissions {
    let everyone = guild.roles.get(&RoleId(guild.id.0)).map(|r| r.permissions);
    let role_permissions: Vec<Permissions> = roles
        .iter()
        .filter_map(|id| guild.roles.get(id))
        .map(|r| r.permissions)
        .collect();
    combine_permissions(guild.owner_id == user_id, everyone, &role_permissions)
}

pub(crate) fn allowlists(
    cmd: &Command,
    guild_id: GuildId,
    author_id: UserId,
    channel_id: ChannelId,
) -> DispatchResult<()> {
    if !cmd.guild_only.is_empty() && !cmd.guild_only.contains(&guild_id) {
        return Err(DispatchError::GuildNotAllowed(guild_id));
    }
    if !cmd.user_only.is_empty() && !cmd.user_only.contains(&author_id) {
        return Err(DispatchError::UserNotAllowed(author_id));
    }
    if !cmd.channel_only.is_empty() && !cmd.channel_only.contains(&channel_id) {
        return Err(DispatchError::ChannelNotAllowed(channel_id));
    }
    Ok(())
}

pub(crate) fn channel_constraints(
    cmd: &Command,
    kind: ChannelType,
    nsfw: bool,
) -> DispatchResult<()> {
    if cmd.nsfw && !nsfw {
        return Err(DispatchError::NsfwRequired);
    }
    if cmd.channel_text_only && kind != ChannelType::Text {
        return Err(DispatchError::TextChannelOnly);
    }
    if cmd.channel_news_only && kind != ChannelType::News {
        return Err(DispatchError::NewsChannelOnly);
    }
    let is_thread = matches!(
        kind,
        ChannelType::NewsThread | ChannelType::PublicThread | ChannelType::PrivateThread
    );
    if cmd.channel_thread_only && !is_thread {
        return Err(DispatchError::ThreadOnly);
    }
    Ok(())
}

pub(crate) fn has_required_role(held: &[RoleId], required: &[RoleId]) -> bool {
    required.iter().any(|role| held.contains(role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowlists_pass_when_empty() {
        let cmd = Command::new("ping");
        assert!(allowlists(&cmd, GuildId(1), UserId(2), ChannelId(3)).is_ok());
    }

    #[test]
    fn test_guild_allowlist() {
        let cmd = Command::new("ping").only_in_guild(GuildId(1));
        assert!(allowlists(&cmd, GuildId(1), UserId(2), ChannelId(3)).is_ok());
        assert!(matches!(
            allowlists(&cmd, GuildId(9), UserId(2), ChannelId(3)),
            Err(DispatchError::GuildNotAllowed(_))
        ));
    }

    #[test]
    fn test_user_and_channel_allowlists() {
        let cmd = Command::new("ping")
            .only_for_user(UserId(2))
            .only_in_channel(ChannelId(3));
        assert!(allowlists(&cmd, GuildId(1), UserId(2), ChannelId(3)).is_ok());
        assert!(matches!(
            allowlists(&cmd, GuildId(1), UserId(9), ChannelId(3)),
            Err(DispatchError::UserNotAllowed(_))
        ));
        assert!(matches!(
            allowlists(&cmd, GuildId(1), UserId(2), ChannelId(9)),
            Err(DispatchError::ChannelNotAllowed(_))
        ));
    }

    #[test]
    fn test_nsfw_constraint() {
        let cmd = Command::new("lewd").nsfw(true);
        assert!(channel_constraints(&cmd, ChannelType::Text, true).is_ok());
        assert!(matches!(
            channel_constraints(&cmd, ChannelType::Text, false),
            Err(DispatchError::NsfwRequired)
        ));
    }

    #[test]
    fn test_channel_kind_constraints() {
        let text_only = Command::new("a").text_channel_only();
        assert!(channel_constraints(&text_only, ChannelType::Text, false).is_ok());
        assert!(channel_constraints(&text_only, ChannelType::News, false).is_err());

        let news_only = Command::new("b").news_channel_only();
        assert!(channel_constraints(&news_only, ChannelType::News, false).is_ok());
        assert!(channel_constraints(&news_only, ChannelType::Text, false).is_err());

        let thread_only = Command::new("c").thread_only();
        assert!(channel_constraints(&thread_only, ChannelType::PublicThread, false).is_ok());
        assert!(channel_constraints(&thread_only, ChannelType::PrivateThread, false).is_ok());
        assert!(matches!(
            channel_constraints(&thread_only, ChannelType::Text, false),
            Err(DispatchError::ThreadOnly)
        ));
    }

    #[test]
    fn test_unconstrained_command_ignores_channel_kind() {
        let cmd = Command::new("ping");
        assert!(channel_constraints(&cmd, ChannelType::Private, false).is_ok());
    }

    #[test]
    fn test_required_role_membership() {
        let held = vec![RoleId(1), RoleId(2)];
        assert!(has_required_role(&held, &[RoleId(2), RoleId(9)]));
        assert!(!has_required_role(&held, &[RoleId(9)]));
        assert!(!has_required_role(&[], &[RoleId(1)]));
    }
}
