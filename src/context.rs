//! # Command Context
//!
//! The normalized object a handler receives, whichever door the
//! invocation came through. Wraps the trigger (message or interaction)
//! behind a unified responder: `respond` sends the first reply, `edit`
//! rewrites it, extra-long content is chunked at the platform message
//! limit.

use std::sync::Arc;

use anyhow::{bail, Result};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::channel::Message;
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, GuildId};
use serenity::model::user::User;
use serenity::prelude::Context;

use crate::arguments::ResolvedArgs;
use crate::command::Command;

/// The platform's per-message content ceiling.
pub const MESSAGE_CHAR_LIMIT: usize = 2000;

/// The inbound event that triggered the command.
pub enum Trigger {
    Message(Message),
    Slash(ApplicationCommandInteraction),
}

impl Trigger {
    pub fn is_slash(&self) -> bool {
        matches!(self, Trigger::Slash(_))
    }
}

pub struct CommandContext {
    pub ctx: Context,
    pub trigger: Trigger,
    pub command: Arc<Command>,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub author: User,
    pub member: Option<Member>,
    pub args: ResolvedArgs,
    /// Guild language, for handlers that render their own templates.
    pub language: String,
    deferred: bool,
    responded: bool,
    first_reply: Option<Message>,
}

impl CommandContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        ctx: Context,
        trigger: Trigger,
        command: Arc<Command>,
        guild_id: GuildId,
        channel_id: ChannelId,
        author: User,
        member: Option<Member>,
        args: ResolvedArgs,
        language: String,
        deferred: bool,
    ) -> Self {
        CommandContext {
            ctx,
            trigger,
            command,
            guild_id,
            channel_id,
            author,
            member,
            args,
            language,
            deferred,
            responded: false,
            first_reply: None,
        }
    }

    /// Reply to the invoker. The first call replies to the triggering
    /// message (or answers the interaction); later calls send follow-ups.
    pub async fn respond(&mut self, content: impl Into<String>) -> Result<()> {
        self.send(content.into(), false).await
    }

    /// Like [`respond`](Self::respond), but ephemeral on the interaction
    /// path. The text path has no ephemeral messages; the reply is public.
    pub async fn respond_ephemeral(&mut self, content: impl Into<String>) -> Result<()> {
        self.send(content.into(), true).await
    }

    /// Edit the first reply in place.
    pub async fn edit(&mut self, content: impl Into<String>) -> Result<()> {
        let content = content.into();
        match &self.trigger {
            Trigger::Message(_) => {
                let http = &self.ctx.http;
                match self.first_reply.as_mut() {
                    Some(reply) => {
                        reply.edit(http, |m| m.content(&content)).await?;
                    }
                    None => bail!("nothing to edit: respond first"),
                }
            }
            Trigger::Slash(interaction) => {
                if !self.responded && !self.deferred {
                    bail!("nothing to edit: respond first");
                }
                interaction
                    .edit_original_interaction_response(&self.ctx.http, |r| r.content(&content))
                    .await?;
                self.responded = true;
            }
        }
        Ok(())
    }

    /// Acknowledge a slash interaction without content yet. A no-op on the
    /// text path and after a response has already gone out.
    pub async fn defer(&mut self) -> Result<()> {
        if let Trigger::Slash(interaction) = &self.trigger {
            if !self.deferred && !self.responded {
                interaction
                    .create_interaction_response(&self.ctx.http, |r| {
                        r.kind(InteractionResponseType::DeferredChannelMessageWithSource)
                    })
                    .await?;
                self.deferred = true;
            }
        }
        Ok(())
    }

    async fn send(&mut self, content: String, ephemeral: bool) -> Result<()> {
        let chunks = chunk_message(&content, MESSAGE_CHAR_LIMIT);
        match &self.trigger {
            Trigger::Message(msg) => {
                let mut chunks = chunks.into_iter();
                if let Some(first) = chunks.next() {
                    let sent = msg.reply(&self.ctx.http, first).await?;
                    if self.first_reply.is_none() {
                        self.first_reply = Some(sent);
                    }
                }
                for chunk in chunks {
                    self.channel_id.say(&self.ctx.http, chunk).await?;
                }
                self.responded = true;
            }
            Trigger::Slash(interaction) => {
                let mut chunks = chunks.into_iter();
                if let Some(first) = chunks.next() {
                    if self.responded {
                        interaction
                            .create_followup_message(&self.ctx.http, |m| {
                                m.content(&first);
                                if ephemeral {
                                    m.ephemeral(true);
                                }
                                m
                            })
                            .await?;
                    } else if self.deferred {
                        interaction
                            .edit_original_interaction_response(&self.ctx.http, |r| {
                                r.content(&first)
                            })
                            .await?;
                    } else {
                        interaction
                            .create_interaction_response(&self.ctx.http, |r| {
                                r.kind(InteractionResponseType::ChannelMessageWithSource)
                                    .interaction_response_data(|m| {
                                        m.content(&first);
                                        if ephemeral {
                                            m.ephemeral(true);
                                        }
                                        m
                                    })
                            })
                            .await?;
                    }
                    self.responded = true;
                }
                for chunk in chunks {
                    interaction
                        .create_followup_message(&self.ctx.http, |m| {
                            m.content(&chunk);
                            if ephemeral {
                                m.ephemeral(true);
                            }
                            m
                        })
                        .await?;
                }
            }
        }
        Ok(())
    }
}

/// Split content into chunks of at most `limit` characters, preferring to
/// break at line boundaries.
pub fn chunk_message(content: &str, limit: usize) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;

    for line in content.split_inclusive('\n') {
        let line_len = line.chars().count();
        if count + line_len <= limit {
            current.push_str(line);
            count += line_len;
            continue;
        }
        if count > 0 {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        if line_len <= limit {
            current.push_str(line);
            count = line_len;
            continue;
        }
        // A single overlong line: hard-wrap on characters.
        for ch in line.chars() {
            if count == limit {
                chunks.push(std::mem::take(&mut current));
                count = 0;
            }
            current.push(ch);
            count += 1;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_content_is_one_chunk() {
        assert_eq!(chunk_message("hello", 2000), vec!["hello".to_string()]);
        assert!(chunk_message("", 2000).is_empty());
    }

    #[test]
    fn test_chunks_respect_limit() {
        let content = "word ".repeat(1000);
        for chunk in chunk_message(&content, 2000) {
            assert!(chunk.chars().count() <= 2000);
        }
    }

    #[test]
    fn test_breaks_at_line_boundaries() {
        let content = format!("{}\n{}", "a".repeat(6), "b".repeat(6));
        let chunks = chunk_message(&content, 8);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with('a'));
        assert!(chunks[1].starts_with('b'));
    }

    #[test]
    fn test_hard_wraps_overlong_line() {
        let content = "x".repeat(4500);
        let chunks = chunk_message(&content, 2000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 2000);
        assert_eq!(chunks[2].chars().count(), 500);
    }

    #[test]
    fn test_multibyte_content_splits_on_char_boundaries() {
        let content = "ü".repeat(3001);
        let chunks = chunk_message(&content, 2000);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 2000);
        assert_eq!(chunks[1].chars().count(), 1001);
    }

    #[test]
    fn test_nothing_lost_in_chunking() {
        let content = format!("{}\n{}\n{}", "a".repeat(1500), "b".repeat(1500), "c".repeat(100));
        let rejoined: String = chunk_message(&content, 2000).concat();
        assert_eq!(rejoined, content);
    }
}
