//! Argument resolution for both entry paths.
//!
//! The text path tokenizes the message tail, descends the subcommand tree,
//! coerces each token against its declared spec, and falls back to an
//! interactive prompt loop on missing or invalid input. The interaction
//! path converts the platform's option tree into the same [`ResolvedArgs`]
//! shape, so handlers never know which door the invocation came through.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use serenity::model::application::command::CommandOptionType;
use serenity::model::application::interaction::application_command::CommandDataOption;
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, RoleId, UserId};
use serenity::prelude::Context;

use crate::error::{DispatchError, DispatchResult};
use crate::messages::{MessageKey, Messages};
use crate::prompt::ReplyWaiter;

use super::coerce;
use super::{ArgValue, ArgumentSpec, ResolvedArgs};

/// Typing this during a prompt aborts the whole command.
pub const CANCEL_KEYWORD: &str = "cancel";
/// Typing this during a prompt skips an optional argument.
pub const SKIP_KEYWORD: &str = "skip";

/// Where prompt replies come from. The production implementation posts to
/// the channel and waits on the reply-waiter; tests script the exchange.
#[async_trait]
pub(crate) trait PromptSource: Send + Sync {
    /// Send `text` to the invoker and return their next message content.
    async fn ask(&self, text: &str) -> DispatchResult<String>;
}

/// Prompts in the invoking channel and waits for the same author's next
/// message there.
pub(crate) struct ChannelPrompter<'a> {
    pub ctx: &'a Context,
    pub msg: &'a Message,
    pub waiter: &'a ReplyWaiter<Message>,
    pub timeout: Duration,
}

#[async_trait]
impl PromptSource for ChannelPrompter<'_> {
    async fn ask(&self, text: &str) -> DispatchResult<String> {
        self.msg.channel_id.say(&self.ctx.http, text).await?;
        match self
            .waiter
            .await_reply(self.msg.channel_id.0, self.msg.author.id.0, self.timeout)
            .await
        {
            Some(reply) => Ok(reply.content),
            None => Err(DispatchError::PromptTimeout),
        }
    }
}

/// Case-insensitive lookup of a branch child by name.
pub(crate) fn select_child<'a>(
    children: &'a [ArgumentSpec],
    token: &str,
) -> Option<&'a ArgumentSpec> {
    children.iter().find(|c| c.name.eq_ignore_ascii_case(token))
}

/// The hint appended to a default prompt: declared choices if any,
/// otherwise the expected kind, plus the control keywords.
pub(crate) fn prompt_hint(spec: &ArgumentSpec) -> String {
    let mut hint = if spec.choices.is_empty() {
        format!("Expected: {}.", spec.kind.display_name())
    } else {
        let list = spec
            .choices
            .iter()
            .map(|c| format!("`{}`", c.value.display()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("One of: {}.", list)
    };
    hint.push_str(" Type `cancel` to abort");
    if !spec.required {
        hint.push_str(", or `skip` to leave it empty");
    }
    hint.push('.');
    hint
}

fn branch_names(branches: &[ArgumentSpec]) -> String {
    branches
        .iter()
        .map(|b| format!("`{}`", b.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve the text path: subcommand descent, token coercion, prompting.
///
/// `tokens` is the whitespace-split message tail after the command name.
/// When the (post-descent) level declares exactly one argument, all
/// remaining tokens join into a single free-text value.
pub(crate) async fn resolve_text(
    specs: &[ArgumentSpec],
    tokens: Vec<String>,
    prompter: &dyn PromptSource,
    messages: &Messages,
    language: &str,
    max_retries: u32,
) -> DispatchResult<ResolvedArgs> {
    let mut tokens: VecDeque<String> = tokens.into();
    let mut positional = Vec::new();
    let mut path = Vec::new();
    let mut current: Vec<ArgumentSpec> = specs.to_vec();

    loop {
        let branches: Vec<ArgumentSpec> = current
            .iter()
            .filter(|s| s.kind.is_branch())
            .cloned()
            .collect();
        if branches.is_empty() {
            break;
        }
        let chosen =
            pick_branch(&branches, &mut tokens, prompter, messages, language, max_retries).await?;
        positional.push(ArgValue::Path(chosen.name.clone()));
        path.push(chosen.name.clone());
        current = chosen.options;
    }

    let leaves: Vec<ArgumentSpec> = current.into_iter().filter(|s| !s.kind.is_branch()).collect();
    let remaining: Vec<String> = tokens.into_iter().collect();

    let mut leaf_map = Map::new();
    for (i, spec) in leaves.iter().enumerate() {
        let raw = if leaves.len() == 1 {
            // single declared argument swallows the whole tail
            if remaining.is_empty() {
                None
            } else {
                Some(remaining.join(" "))
            }
        } else {
            remaining.get(i).cloned()
        };

        let value = match raw {
            Some(raw) => match coerce::coerce(spec, &raw) {
                Ok(value) => Some(value),
                Err(reason) => {
                    prompt_for(spec, Some((raw, reason)), prompter, messages, language, max_retries)
                        .await?
                }
            },
            None => prompt_for(spec, None, prompter, messages, language, max_retries).await?,
        };

        if let Some(value) = value {
            leaf_map.insert(spec.name.clone(), value.to_json());
            positional.push(value);
        }
    }

    let mut object = Value::Object(leaf_map);
    for name in path.iter().rev() {
        let mut wrapper = Map::new();
        wrapper.insert(name.clone(), object);
        object = Value::Object(wrapper);
    }

    Ok(ResolvedArgs { positional, object })
}

/// Select one branch child at the current level, prompting when the next
/// token is missing or names no child. A present-but-invalid token is
/// consumed; it was meant to be the subcommand.
async fn pick_branch(
    branches: &[ArgumentSpec],
    tokens: &mut VecDeque<String>,
    prompter: &dyn PromptSource,
    messages: &Messages,
    language: &str,
    max_retries: u32,
) -> DispatchResult<ArgumentSpec> {
    let mut last_invalid: Option<String> = None;
    if let Some(front) = tokens.front() {
        if let Some(child) = select_child(branches, front) {
            let child = child.clone();
            tokens.pop_front();
            return Ok(child);
        }
        last_invalid = tokens.pop_front();
    }

    let choices = branch_names(branches);
    for _ in 0..max_retries {
        let text = match &last_invalid {
            Some(input) => {
                let mut t = messages.render(
                    language,
                    MessageKey::ArgInvalid,
                    &[
                        ("INPUT", input.clone()),
                        ("ARGUMENT", "subcommand".to_string()),
                        ("REASON", "not a known subcommand".to_string()),
                    ],
                );
                t.push(' ');
                t.push_str(&messages.render(
                    language,
                    MessageKey::ArgChoices,
                    &[
                        ("ARGUMENT", "subcommand".to_string()),
                        ("CHOICES", choices.clone()),
                    ],
                ));
                t
            }
            None => messages.render(
                language,
                MessageKey::ArgPrompt,
                &[
                    ("ARGUMENT", "subcommand".to_string()),
                    ("HINT", format!("One of: {}.", choices)),
                ],
            ),
        };

        let reply = prompter.ask(&text).await?;
        let content = reply.trim();
        if content.eq_ignore_ascii_case(CANCEL_KEYWORD) {
            return Err(DispatchError::Cancelled);
        }
        if let Some(child) = select_child(branches, content) {
            return Ok(child.clone());
        }
        last_invalid = Some(content.to_string());
    }

    Err(DispatchError::PromptRetriesExhausted)
}

/// The per-argument prompt loop. Returns `None` when an optional argument
/// was skipped.
async fn prompt_for(
    spec: &ArgumentSpec,
    invalid: Option<(String, String)>,
    prompter: &dyn PromptSource,
    messages: &Messages,
    language: &str,
    max_retries: u32,
) -> DispatchResult<Option<ArgValue>> {
    let mut last_invalid = invalid;

    for _ in 0..max_retries {
        let text = match &last_invalid {
            Some((input, reason)) => messages.render(
                language,
                MessageKey::ArgInvalid,
                &[
                    ("INPUT", input.clone()),
                    ("ARGUMENT", spec.name.clone()),
                    ("REASON", format!("{} {}", reason, prompt_hint(spec))),
                ],
            ),
            None => match &spec.prompt {
                Some(custom) => custom.clone(),
                None => messages.render(
                    language,
                    MessageKey::ArgPrompt,
                    &[
                        ("ARGUMENT", spec.name.clone()),
                        ("HINT", prompt_hint(spec)),
                    ],
                ),
            },
        };

        let reply = prompter.ask(&text).await?;
        let content = reply.trim().to_string();
        if content.eq_ignore_ascii_case(CANCEL_KEYWORD) {
            return Err(DispatchError::Cancelled);
        }
        if !spec.required && content.eq_ignore_ascii_case(SKIP_KEYWORD) {
            return Ok(None);
        }
        match coerce::coerce(spec, &content) {
            Ok(value) => return Ok(Some(value)),
            Err(reason) => last_invalid = Some((content, reason)),
        }
    }

    Err(DispatchError::PromptRetriesExhausted)
}

/// A platform option node lifted into an owned shape the resolver can walk
/// (and tests can build).
#[derive(Debug, Clone)]
pub(crate) struct OptNode {
    pub name: String,
    pub kind: CommandOptionType,
    pub value: Option<Value>,
    pub children: Vec<OptNode>,
}

fn node_from_option(opt: &CommandDataOption) -> OptNode {
    OptNode {
        name: opt.name.clone(),
        kind: opt.kind,
        value: opt.value.clone(),
        children: opt.options.iter().map(node_from_option).collect(),
    }
}

/// Convert an interaction's option tree into [`ResolvedArgs`].
pub fn resolve_interaction_options(options: &[CommandDataOption]) -> ResolvedArgs {
    let nodes: Vec<OptNode> = options.iter().map(node_from_option).collect();
    resolve_nodes(&nodes)
}

pub(crate) fn resolve_nodes(nodes: &[OptNode]) -> ResolvedArgs {
    let mut positional = Vec::new();
    let object = Value::Object(collect_nodes(nodes, &mut positional));
    ResolvedArgs { positional, object }
}

fn collect_nodes(nodes: &[OptNode], positional: &mut Vec<ArgValue>) -> Map<String, Value> {
    let mut map = Map::new();
    for node in nodes {
        match node.kind {
            CommandOptionType::SubCommand | CommandOptionType::SubCommandGroup => {
                positional.push(ArgValue::Path(node.name.clone()));
                map.insert(
                    node.name.clone(),
                    Value::Object(collect_nodes(&node.children, positional)),
                );
            }
            _ => {
                let value = node_value(node);
                map.insert(node.name.clone(), value.to_json());
                positional.push(value);
            }
        }
    }
    map
}

fn node_value(node: &OptNode) -> ArgValue {
    let raw = node.value.clone().unwrap_or(Value::Null);
    let parsed = match node.kind {
        CommandOptionType::Integer => raw.as_i64().map(ArgValue::Integer),
        CommandOptionType::Number => raw.as_f64().map(ArgValue::Number),
        CommandOptionType::Boolean => raw.as_bool().map(ArgValue::Boolean),
        CommandOptionType::User => snowflake_value(&raw).map(|id| ArgValue::User(UserId(id))),
        CommandOptionType::Channel => {
            snowflake_value(&raw).map(|id| ArgValue::Channel(ChannelId(id)))
        }
        CommandOptionType::Role => snowflake_value(&raw).map(|id| ArgValue::Role(RoleId(id))),
        CommandOptionType::Mentionable => snowflake_value(&raw).map(ArgValue::Mentionable),
        _ => raw.as_str().map(|s| ArgValue::String(s.to_string())),
    };
    // The platform already validated the option; a shape mismatch here means
    // a skew between the registered payload and the declaration. Degrade to
    // the raw string so the handler still sees something.
    parsed.unwrap_or_else(|| ArgValue::String(raw.to_string()))
}

fn snowflake_value(raw: &Value) -> Option<u64> {
    match raw {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}
