//! # Command Definitions
//!
//! A [`Command`] is the unit the dispatch pipeline routes to: its name and
//! aliases, its declared arguments, the checks it demands, which entry
//! paths may trigger it, and the boxed async handler that finally runs.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use serenity::model::permissions::Permissions;

use crate::arguments::ArgumentSpec;
use crate::context::CommandContext;

pub type CommandResult = anyhow::Result<()>;
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
pub type Handler = Arc<dyn Fn(CommandContext) -> BoxFuture<CommandResult> + Send + Sync>;

/// Which entry paths may trigger a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    /// Text prefix and slash interaction both work.
    #[default]
    Both,
    /// Only the text prefix path.
    MessageOnly,
    /// Only the slash interaction path.
    SlashOnly,
    /// Registered but never dispatched.
    Disabled,
}

impl EntryMode {
    pub fn allows_message(self) -> bool {
        matches!(self, EntryMode::Both | EntryMode::MessageOnly)
    }

    pub fn allows_slash(self) -> bool {
        matches!(self, EntryMode::Both | EntryMode::SlashOnly)
    }
}

/// Which context-menu surfaces a command is exposed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    #[default]
    Off,
    User,
    Message,
    Both,
}

impl ContextMode {
    pub fn allows_user(self) -> bool {
        matches!(self, ContextMode::User | ContextMode::Both)
    }

    pub fn allows_message(self) -> bool {
        matches!(self, ContextMode::Message | ContextMode::Both)
    }
}

#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub description: String,
    pub category: String,
    pub aliases: Vec<String>,
    pub args: Vec<ArgumentSpec>,
    pub cooldown: Option<Duration>,
    pub user_required_permissions: Permissions,
    pub client_required_permissions: Permissions,
    pub user_required_roles: Vec<RoleId>,
    /// Allowlists; empty means unrestricted.
    pub user_only: Vec<UserId>,
    pub channel_only: Vec<ChannelId>,
    pub guild_only: Vec<GuildId>,
    pub nsfw: bool,
    pub channel_text_only: bool,
    pub channel_news_only: bool,
    pub channel_thread_only: bool,
    /// `None` inherits the framework default.
    pub entry_mode: Option<EntryMode>,
    pub context_mode: Option<ContextMode>,
    handler: Option<Handler>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Command {
            name: name.into(),
            description: String::new(),
            category: "general".to_string(),
            aliases: Vec::new(),
            args: Vec::new(),
            cooldown: None,
            user_required_permissions: Permissions::empty(),
            client_required_permissions: Permissions::empty(),
            user_required_roles: Vec::new(),
            user_only: Vec::new(),
            channel_only: Vec::new(),
            guild_only: Vec::new(),
            nsfw: false,
            channel_text_only: false,
            channel_news_only: false,
            channel_thread_only: false,
            entry_mode: None,
            context_mode: None,
            handler: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn arg(mut self, arg: ArgumentSpec) -> Self {
        self.args.push(arg);
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn user_permissions(mut self, permissions: Permissions) -> Self {
        self.user_required_permissions = permissions;
        self
    }

    pub fn client_permissions(mut self, permissions: Permissions) -> Self {
        self.client_required_permissions = permissions;
        self
    }

    pub fn required_role(mut self, role: RoleId) -> Self {
        self.user_required_roles.push(role);
        self
    }

    pub fn only_for_user(mut self, user: UserId) -> Self {
        self.user_only.push(user);
        self
    }

    pub fn only_in_channel(mut self, channel: ChannelId) -> Self {
        self.channel_only.push(channel);
        self
    }

    pub fn only_in_guild(mut self, guild: GuildId) -> Self {
        self.guild_only.push(guild);
        self
    }

    pub fn nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = nsfw;
        self
    }

    pub fn text_channel_only(mut self) -> Self {
        self.channel_text_only = true;
        self
    }

    pub fn news_channel_only(mut self) -> Self {
        self.channel_news_only = true;
        self
    }

    pub fn thread_only(mut self) -> Self {
        self.channel_thread_only = true;
        self
    }

    pub fn entry_mode(mut self, mode: EntryMode) -> Self {
        self.entry_mode = Some(mode);
        self
    }

    pub fn context_mode(mut self, mode: ContextMode) -> Self {
        self.context_mode = Some(mode);
        self
    }

    /// Attach the async handler invoked once dispatch succeeds.
    pub fn handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |ctx| Box::pin(f(ctx))));
        self
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Run the handler. Commands without one (e.g. registration-only
    /// definitions) dispatch as a no-op.
    pub(crate) async fn run(&self, ctx: CommandContext) -> CommandResult {
        match &self.handler {
            Some(handler) => handler(ctx).await,
            None => Ok(()),
        }
    }

    pub(crate) fn effective_entry_mode(&self, default: EntryMode) -> EntryMode {
        self.entry_mode.unwrap_or(default)
    }

    pub(crate) fn effective_context_mode(&self, default: ContextMode) -> ContextMode {
        self.context_mode.unwrap_or(default)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("category", &self.category)
            .field("args", &self.args.len())
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::ArgumentKind;

    #[test]
    fn test_builder_defaults() {
        let cmd = Command::new("ping");
        assert_eq!(cmd.name, "ping");
        assert_eq!(cmd.category, "general");
        assert!(cmd.aliases.is_empty());
        assert!(cmd.cooldown.is_none());
        assert!(cmd.entry_mode.is_none());
        assert!(!cmd.has_handler());
        assert!(cmd.user_required_permissions.is_empty());
    }

    #[test]
    fn test_entry_mode_gates() {
        assert!(EntryMode::Both.allows_message());
        assert!(EntryMode::Both.allows_slash());
        assert!(EntryMode::MessageOnly.allows_message());
        assert!(!EntryMode::MessageOnly.allows_slash());
        assert!(!EntryMode::SlashOnly.allows_message());
        assert!(!EntryMode::Disabled.allows_message());
        assert!(!EntryMode::Disabled.allows_slash());
    }

    #[test]
    fn test_effective_modes_inherit_default() {
        let cmd = Command::new("ping");
        assert_eq!(cmd.effective_entry_mode(EntryMode::SlashOnly), EntryMode::SlashOnly);

        let pinned = Command::new("ping").entry_mode(EntryMode::MessageOnly);
        assert_eq!(pinned.effective_entry_mode(EntryMode::SlashOnly), EntryMode::MessageOnly);
    }

    #[test]
    fn test_builder_accumulates() {
        let cmd = Command::new("tag")
            .description("Manage tags")
            .alias("t")
            .alias("tags")
            .arg(ArgumentSpec::new("name", ArgumentKind::String).required(true))
            .cooldown(Duration::from_secs(5))
            .nsfw(true);

        assert_eq!(cmd.aliases, vec!["t".to_string(), "tags".to_string()]);
        assert_eq!(cmd.args.len(), 1);
        assert_eq!(cmd.cooldown, Some(Duration::from_secs(5)));
        assert!(cmd.nsfw);
    }

    #[test]
    fn test_entry_mode_serde_round_trip() {
        let json = serde_json::to_string(&EntryMode::SlashOnly).unwrap();
        assert_eq!(json, r#""slash_only""#);
        let back: EntryMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EntryMode::SlashOnly);
    }
}
