//! # Dispatch Pipeline
//!
//! Unified command handling for the text prefix path and application
//! command interactions. Both converge here: prefix/trigger match, command
//! lookup, inhibitors, cooldown, pre-run checks, argument resolution,
//! handler invocation, outcome hooks.
//!
//! - **Version**: 1.0.0
//!
//! ## Changelog
//! - 1.0.0: Initial release with both entry paths and interactive prompts

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use log::{debug, error, info, warn};
use regex::Regex;
use serenity::http::Http;
use serenity::model::application::command::CommandType;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::{GuildId, UserId};
use serenity::prelude::Context;

use crate::arguments::resolver::{self, ChannelPrompter};
use crate::arguments::ResolvedArgs;
use crate::checks::{self, CheckContext};
use crate::command::Command;
use crate::config::FrameworkConfig;
use crate::context::{CommandContext, Trigger};
use crate::dispatcher::{Dispatcher, MemoryDispatcher};
use crate::error::{DispatchError, DispatchResult};
use crate::hooks::{CommandEvent, Hook, Inhibitor};
use crate::messages::{MessageKey, Messages};
use crate::permissions::format_permissions;
use crate::prompt::ReplyWaiter;
use crate::registrar;
use crate::registry::CommandRegistry;

/// The assembled dispatch layer. Built once with [`Framework::builder`],
/// then fed events from the gateway event handler.
pub struct Framework {
    config: FrameworkConfig,
    registry: CommandRegistry,
    dispatcher: Arc<dyn Dispatcher>,
    messages: Messages,
    waiter: ReplyWaiter<Message>,
    hooks: Vec<Arc<dyn Hook>>,
    inhibitors: Vec<Arc<dyn Inhibitor>>,
    mention: Regex,
    bot_id: AtomicU64,
}

pub struct FrameworkBuilder {
    config: FrameworkConfig,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    messages: Messages,
    commands: Vec<Command>,
    hooks: Vec<Arc<dyn Hook>>,
    inhibitors: Vec<Arc<dyn Inhibitor>>,
}

impl FrameworkBuilder {
    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn commands(mut self, commands: impl IntoIterator<Item = Command>) -> Self {
        self.commands.extend(commands);
        self
    }

    /// Swap in a persistence-backed policy provider. Defaults to
    /// [`MemoryDispatcher`] over the configured prefixes.
    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    pub fn hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn inhibitor(mut self, inhibitor: Arc<dyn Inhibitor>) -> Self {
        self.inhibitors.push(inhibitor);
        self
    }

    pub fn build(self) -> Result<Framework> {
        let registry = CommandRegistry::new(self.config.case_sensitive_commands);
        for command in self.commands {
            registry.register(command)?;
        }

        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(MemoryDispatcher::new(self.config.prefixes.clone())));

        Ok(Framework {
            config: self.config,
            registry,
            dispatcher,
            messages: self.messages,
            waiter: ReplyWaiter::new(),
            hooks: self.hooks,
            inhibitors: self.inhibitors,
            mention: Regex::new(r"^<@!?(\d{17,20})>\s*").unwrap(),
            bot_id: AtomicU64::new(0),
        })
    }
}

impl Framework {
    pub fn builder(config: FrameworkConfig) -> FrameworkBuilder {
        FrameworkBuilder {
            config,
            dispatcher: None,
            messages: Messages::default(),
            commands: Vec::new(),
            hooks: Vec::new(),
            inhibitors: Vec::new(),
        }
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Record the bot's own id from the ready payload so mention prefixes
    /// match without an HTTP round trip.
    pub fn note_ready(&self, ready: &Ready) {
        self.bot_id.store(ready.user.id.0, Ordering::Relaxed);
        info!(
            "dispatch ready as {}: {} command(s) registered",
            ready.user.name,
            self.registry.len()
        );
    }

    /// Register the slash/context payloads for every command globally.
    pub async fn register_global(&self, ctx: &Context) -> Result<()> {
        registrar::register_global(
            ctx,
            &self.registry.all(),
            self.config.entry_mode,
            self.config.context_mode,
        )
        .await
    }

    /// Register the payloads in a single guild (instant, good for testing).
    pub async fn register_in_guild(&self, ctx: &Context, guild_id: GuildId) -> Result<()> {
        registrar::register_in_guild(
            ctx,
            guild_id,
            &self.registry.all(),
            self.config.entry_mode,
            self.config.context_mode,
        )
        .await
    }

    /// Text entry path. Call from the gateway `message` event.
    pub async fn dispatch_message(&self, ctx: &Context, msg: &Message) -> Result<()> {
        if msg.author.bot {
            return Ok(());
        }

        // A pending argument prompt in this channel gets first claim.
        if self.waiter.has_pending(msg.channel_id.0, msg.author.id.0)
            && self.waiter.offer(msg.channel_id.0, msg.author.id.0, msg.clone())
        {
            return Ok(());
        }

        let Some(guild_id) = msg.guild_id else {
            return Ok(());
        };

        let bot_id = self.resolve_bot_id(&ctx.http).await?;
        let prefixes = self.dispatcher.prefixes(guild_id).await;
        let Some(rest) = self.strip_prefix(&msg.content, &prefixes, bot_id) else {
            return Ok(());
        };

        let mut parts = rest.split_whitespace();
        let Some(name) = parts.next() else {
            return Ok(());
        };
        let tokens: Vec<String> = parts.map(|s| s.to_string()).collect();

        let Some(command) = self.registry.get(name) else {
            debug!("no command registered for '{}'", name);
            return Ok(());
        };
        if !command
            .effective_entry_mode(self.config.entry_mode)
            .allows_message()
        {
            return Ok(());
        }

        let language = self.dispatcher.guild_language(guild_id).await;
        if let Err(rejection) = self
            .run_message_pipeline(ctx, msg, guild_id, bot_id, &command, tokens, &language)
            .await
        {
            self.report_message_rejection(ctx, msg, &command, &language, rejection)
                .await;
        }
        Ok(())
    }

    /// Edited messages re-enter dispatch only when the content changed.
    pub async fn dispatch_message_update(
        &self,
        ctx: &Context,
        old: Option<Message>,
        new: Option<Message>,
    ) -> Result<()> {
        let Some(new) = new else {
            return Ok(());
        };
        if let Some(old) = old {
            if old.content == new.content {
                return Ok(());
            }
        }
        self.dispatch_message(ctx, &new).await
    }

    /// Interaction entry path. Call from `interaction_create` for
    /// application commands (slash and context menu).
    pub async fn dispatch_interaction(
        &self,
        ctx: &Context,
        interaction: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let Some(guild_id) = interaction.guild_id else {
            return Ok(());
        };

        let Some(command) = self.registry.get(&interaction.data.name) else {
            warn!(
                "interaction for unregistered command '{}'",
                interaction.data.name
            );
            return Ok(());
        };

        let allowed = match interaction.data.kind {
            CommandType::ChatInput => command
                .effective_entry_mode(self.config.entry_mode)
                .allows_slash(),
            CommandType::User => command
                .effective_context_mode(self.config.context_mode)
                .allows_user(),
            CommandType::Message => command
                .effective_context_mode(self.config.context_mode)
                .allows_message(),
            _ => false,
        };
        if !allowed {
            return Ok(());
        }

        let language = self.dispatcher.guild_language(guild_id).await;
        if let Err(rejection) = self
            .run_interaction_pipeline(ctx, interaction, guild_id, &command, &language)
            .await
        {
            self.report_interaction_rejection(ctx, interaction, &command, &language, rejection)
                .await;
        }
        Ok(())
    }

    async fn run_message_pipeline(
        &self,
        ctx: &Context,
        msg: &Message,
        guild_id: GuildId,
        bot_id: UserId,
        command: &Arc<Command>,
        tokens: Vec<String>,
        language: &str,
    ) -> DispatchResult<()> {
        let event = CommandEvent {
            command: command.name.clone(),
            guild_id,
            channel_id: msg.channel_id,
            user_id: msg.author.id,
        };

        for inhibitor in &self.inhibitors {
            if inhibitor.inhibit(&event).await {
                return Err(DispatchError::Inhibited);
            }
        }

        let cooldown = self
            .dispatcher
            .cooldown(guild_id, msg.author.id, command)
            .await;
        if cooldown.on_cooldown {
            return Err(DispatchError::OnCooldown {
                wait_secs: cooldown.wait_secs,
            });
        }

        checks::run_checks(&CheckContext {
            http: &ctx.http,
            command,
            guild_id,
            channel_id: msg.channel_id,
            author_id: msg.author.id,
            bot_id,
            member_roles: msg.member.as_ref().map(|m| m.roles.clone()),
            member_permissions: None,
        })
        .await?;

        let args = if command.args.is_empty() {
            ResolvedArgs::empty()
        } else {
            let prompter = ChannelPrompter {
                ctx,
                msg,
                waiter: &self.waiter,
                timeout: self.config.prompt_timeout,
            };
            resolver::resolve_text(
                &command.args,
                tokens,
                &prompter,
                &self.messages,
                language,
                self.config.prompt_retries,
            )
            .await?
        };

        for hook in &self.hooks {
            hook.command_execute(&event).await;
        }

        let typing = if self.config.auto_typing {
            msg.channel_id.start_typing(&ctx.http).ok()
        } else {
            None
        };

        let command_ctx = CommandContext::new(
            ctx.clone(),
            Trigger::Message(msg.clone()),
            command.clone(),
            guild_id,
            msg.channel_id,
            msg.author.clone(),
            None,
            args,
            language.to_string(),
            false,
        );
        let outcome = command.run(command_ctx).await;

        if let Some(typing) = typing {
            let _ = typing.stop();
        }

        if let Err(err) = outcome {
            for hook in &self.hooks {
                hook.command_error(&event, &err).await;
            }
            error!("Command '{}' handler failed: {:#}", command.name, err);
        }
        Ok(())
    }

    async fn run_interaction_pipeline(
        &self,
        ctx: &Context,
        interaction: &ApplicationCommandInteraction,
        guild_id: GuildId,
        command: &Arc<Command>,
        language: &str,
    ) -> DispatchResult<()> {
        let event = CommandEvent {
            command: command.name.clone(),
            guild_id,
            channel_id: interaction.channel_id,
            user_id: interaction.user.id,
        };

        for inhibitor in &self.inhibitors {
            if inhibitor.inhibit(&event).await {
                return Err(DispatchError::Inhibited);
            }
        }

        let cooldown = self
            .dispatcher
            .cooldown(guild_id, interaction.user.id, command)
            .await;
        if cooldown.on_cooldown {
            return Err(DispatchError::OnCooldown {
                wait_secs: cooldown.wait_secs,
            });
        }

        let bot_id = self.resolve_bot_id(&ctx.http).await?;
        checks::run_checks(&CheckContext {
            http: &ctx.http,
            command,
            guild_id,
            channel_id: interaction.channel_id,
            author_id: interaction.user.id,
            bot_id,
            member_roles: interaction.member.as_ref().map(|m| m.roles.clone()),
            member_permissions: interaction.member.as_ref().and_then(|m| m.permissions),
        })
        .await?;

        let args = match interaction.data.kind {
            CommandType::ChatInput => {
                resolver::resolve_interaction_options(&interaction.data.options)
            }
            _ => {
                // Context menus carry no options; hand over the target id.
                let mut args = ResolvedArgs::empty();
                if let (Some(target), Some(map)) =
                    (interaction.data.target_id, args.object.as_object_mut())
                {
                    map.insert(
                        "target_id".to_string(),
                        serde_json::Value::String(target.0.to_string()),
                    );
                }
                args
            }
        };

        for hook in &self.hooks {
            hook.command_execute(&event).await;
        }

        let deferred = if self.config.auto_defer {
            interaction
                .create_interaction_response(&ctx.http, |r| {
                    r.kind(InteractionResponseType::DeferredChannelMessageWithSource)
                })
                .await
                .is_ok()
        } else {
            false
        };

        let command_ctx = CommandContext::new(
            ctx.clone(),
            Trigger::Slash(interaction.clone()),
            command.clone(),
            guild_id,
            interaction.channel_id,
            interaction.user.clone(),
            interaction.member.clone(),
            args,
            language.to_string(),
            deferred,
        );

        if let Err(err) = command.run(command_ctx).await {
            for hook in &self.hooks {
                hook.command_error(&event, &err).await;
            }
            error!("Command '{}' handler failed: {:#}", command.name, err);
        }
        Ok(())
    }

    /// Strip the matching prefix from message content: the bot mention
    /// first, then the dispatcher-provided prefixes in order.
    fn strip_prefix<'a>(
        &self,
        content: &'a str,
        prefixes: &[String],
        bot_id: UserId,
    ) -> Option<&'a str> {
        if let Some(captures) = self.mention.captures(content) {
            let mentions_bot = captures
                .get(1)
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .map_or(false, |id| id == bot_id.0);
            if mentions_bot {
                return captures.get(0).map(|m| &content[m.end()..]);
            }
        }

        for prefix in prefixes {
            let Some(candidate) = content.get(..prefix.len()) else {
                continue;
            };
            let matched = if self.config.case_sensitive_prefixes {
                candidate == prefix
            } else {
                candidate.eq_ignore_ascii_case(prefix)
            };
            if matched {
                return Some(&content[prefix.len()..]);
            }
        }
        None
    }

    async fn resolve_bot_id(&self, http: &Http) -> DispatchResult<UserId> {
        let cached = self.bot_id.load(Ordering::Relaxed);
        if cached != 0 {
            return Ok(UserId(cached));
        }
        let user = http.get_current_user().await?;
        self.bot_id.store(user.id.0, Ordering::Relaxed);
        Ok(user.id)
    }

    /// Map a rejection to its reply template. `None` means nothing is sent
    /// (silent drops and platform failures, which are logged instead).
    fn rejection_text(
        &self,
        command: &Command,
        language: &str,
        err: &DispatchError,
    ) -> Option<String> {
        let text = match err {
            DispatchError::OnCooldown { wait_secs } => self.messages.render(
                language,
                MessageKey::Cooldown,
                &[
                    ("COOLDOWN", wait_secs.to_string()),
                    ("CMDNAME", command.name.clone()),
                ],
            ),
            DispatchError::NsfwRequired => self.messages.render(language, MessageKey::Nsfw, &[]),
            DispatchError::TextChannelOnly => {
                self.messages.render(language, MessageKey::ChannelTextOnly, &[])
            }
            DispatchError::NewsChannelOnly => {
                self.messages.render(language, MessageKey::ChannelNewsOnly, &[])
            }
            DispatchError::ThreadOnly => {
                self.messages.render(language, MessageKey::ChannelThreadOnly, &[])
            }
            DispatchError::MissingClientPermissions(missing) => self.messages.render(
                language,
                MessageKey::MissingClientPermissions,
                &[("PERMISSION", format_permissions(*missing))],
            ),
            DispatchError::MissingUserPermissions(missing) => self.messages.render(
                language,
                MessageKey::MissingPermissions,
                &[("PERMISSION", format_permissions(*missing))],
            ),
            DispatchError::MissingRoles(names) => self.messages.render(
                language,
                MessageKey::MissingRoles,
                &[("ROLES", format!("`{}`", names.join(", ")))],
            ),
            DispatchError::PromptTimeout | DispatchError::PromptRetriesExhausted => {
                self.messages.render(language, MessageKey::ArgsTimeLimit, &[])
            }
            DispatchError::Platform(platform) => {
                error!(
                    "platform error while dispatching '{}': {}",
                    command.name, platform
                );
                return None;
            }
            _ => return None,
        };
        Some(text)
    }

    async fn report_message_rejection(
        &self,
        ctx: &Context,
        msg: &Message,
        command: &Command,
        language: &str,
        err: DispatchError,
    ) {
        if err.is_silent() {
            debug!("silently dropped '{}': {}", command.name, err);
            return;
        }
        let Some(text) = self.rejection_text(command, language, &err) else {
            return;
        };
        if let Err(send_err) = msg.reply(&ctx.http, text).await {
            error!("failed to send rejection reply: {}", send_err);
        }
    }

    async fn report_interaction_rejection(
        &self,
        ctx: &Context,
        interaction: &ApplicationCommandInteraction,
        command: &Command,
        language: &str,
        err: DispatchError,
    ) {
        if err.is_silent() {
            debug!("silently dropped '{}': {}", command.name, err);
            return;
        }
        let Some(text) = self.rejection_text(command, language, &err) else {
            return;
        };
        let sent = interaction
            .create_interaction_response(&ctx.http, |r| {
                r.kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|m| m.content(&text).ephemeral(true))
            })
            .await;
        if sent.is_err() {
            // The interaction may already be acknowledged; try a follow-up.
            if let Err(send_err) = interaction
                .create_followup_message(&ctx.http, |m| m.content(&text).ephemeral(true))
                .await
            {
                error!("failed to send rejection response: {}", send_err);
            }
        }
    }
}
