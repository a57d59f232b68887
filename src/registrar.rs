//! # Command Registration
//!
//! Builds the platform's application-command payloads from registered
//! command definitions: argument specs become option trees (choices
//! included, required options ahead of optional ones) and context-menu
//! modes become user/message command entries.

use std::sync::Arc;

use anyhow::Result;
use log::info;
use serenity::builder::{CreateApplicationCommand, CreateApplicationCommandOption};
use serenity::model::application::command::{
    Command as ApplicationCommand, CommandOptionType, CommandType,
};
use serenity::model::id::GuildId;
use serenity::prelude::Context;

use crate::arguments::{ArgumentKind, ArgumentSpec, ChoiceValue};
use crate::command::{Command, ContextMode, EntryMode};

fn option_kind(kind: ArgumentKind) -> CommandOptionType {
    match kind {
        ArgumentKind::SubCommand => CommandOptionType::SubCommand,
        ArgumentKind::SubCommandGroup => CommandOptionType::SubCommandGroup,
        ArgumentKind::String => CommandOptionType::String,
        ArgumentKind::Integer => CommandOptionType::Integer,
        ArgumentKind::Boolean => CommandOptionType::Boolean,
        ArgumentKind::User => CommandOptionType::User,
        ArgumentKind::Channel => CommandOptionType::Channel,
        ArgumentKind::Role => CommandOptionType::Role,
        ArgumentKind::Mentionable => CommandOptionType::Mentionable,
        ArgumentKind::Number => CommandOptionType::Number,
    }
}

/// Required options ahead of optional ones, each group in declaration
/// order; the platform rejects payloads ordered the other way.
fn ordered_options(options: &[ArgumentSpec]) -> Vec<&ArgumentSpec> {
    let (required, optional): (Vec<&ArgumentSpec>, Vec<&ArgumentSpec>) = options
        .iter()
        .partition(|o| o.kind.is_branch() || o.required);
    required.into_iter().chain(optional).collect()
}

fn build_option(spec: &ArgumentSpec) -> CreateApplicationCommandOption {
    let mut option = CreateApplicationCommandOption::default();
    option
        .name(&spec.name)
        .description(if spec.description.is_empty() {
            &spec.name
        } else {
            &spec.description
        })
        .kind(option_kind(spec.kind));

    if !spec.kind.is_branch() {
        option.required(spec.required);
    }

    for choice in &spec.choices {
        match &choice.value {
            ChoiceValue::String(value) => {
                option.add_string_choice(&choice.name, value);
            }
            ChoiceValue::Integer(value) => {
                option.add_int_choice(&choice.name, *value as i32);
            }
            ChoiceValue::Number(value) => {
                option.add_number_choice(&choice.name, *value);
            }
        }
    }

    for child in ordered_options(&spec.options) {
        option.create_sub_option(|sub| {
            *sub = build_option(child);
            sub
        });
    }

    option
}

/// Chat-input payloads for every command whose routing allows the slash
/// path.
pub fn build_chat_commands(
    commands: &[Arc<Command>],
    default_entry: EntryMode,
) -> Vec<CreateApplicationCommand> {
    commands
        .iter()
        .filter(|c| c.effective_entry_mode(default_entry).allows_slash())
        .map(|c| {
            let mut payload = CreateApplicationCommand::default();
            payload.name(&c.name).description(if c.description.is_empty() {
                "No description provided"
            } else {
                &c.description
            });
            for option in ordered_options(&c.args) {
                payload.create_option(|o| {
                    *o = build_option(option);
                    o
                });
            }
            payload
        })
        .collect()
}

/// Context-menu payloads per each command's context mode.
pub fn build_context_commands(
    commands: &[Arc<Command>],
    default_context: ContextMode,
) -> Vec<CreateApplicationCommand> {
    let mut payloads = Vec::new();
    for command in commands {
        let mode = command.effective_context_mode(default_context);
        if mode.allows_user() {
            payloads.push(context_payload(&command.name, CommandType::User));
        }
        if mode.allows_message() {
            payloads.push(context_payload(&command.name, CommandType::Message));
        }
    }
    payloads
}

fn context_payload(name: &str, kind: CommandType) -> CreateApplicationCommand {
    let mut payload = CreateApplicationCommand::default();
    payload.name(name).kind(kind);
    payload
}

/// Registers all payloads globally.
pub async fn register_global(
    ctx: &Context,
    commands: &[Arc<Command>],
    default_entry: EntryMode,
    default_context: ContextMode,
) -> Result<()> {
    let chat = build_chat_commands(commands, default_entry);
    let context = build_context_commands(commands, default_context);

    ApplicationCommand::set_global_application_commands(&ctx.http, |builder| {
        for payload in chat.into_iter().chain(context) {
            builder.add_application_command(payload);
        }
        builder
    })
    .await?;

    info!("Global slash commands and context menu commands registered successfully");
    Ok(())
}

/// Registers all payloads for a specific guild (faster for testing).
pub async fn register_in_guild(
    ctx: &Context,
    guild_id: GuildId,
    commands: &[Arc<Command>],
    default_entry: EntryMode,
    default_context: ContextMode,
) -> Result<()> {
    let chat = build_chat_commands(commands, default_entry);
    let context = build_context_commands(commands, default_context);

    guild_id
        .set_application_commands(&ctx.http, |builder| {
            for payload in chat.into_iter().chain(context) {
                builder.add_application_command(payload);
            }
            builder
        })
        .await?;

    info!(
        "Guild slash commands and context menu commands registered successfully for guild: {}",
        guild_id
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc(command: Command) -> Arc<Command> {
        Arc::new(command)
    }

    #[test]
    fn test_chat_payload_names_and_descriptions() {
        let commands = vec![
            arc(Command::new("ping").description("Test bot responsiveness")),
            arc(Command::new("bare")),
        ];
        let payloads = build_chat_commands(&commands, EntryMode::Both);
        assert_eq!(payloads.len(), 2);

        let names: Vec<String> = payloads
            .iter()
            .map(|p| p.0.get("name").unwrap().as_str().unwrap().to_string())
            .collect();
        assert!(names.contains(&"ping".to_string()));

        // A missing description gets a placeholder; the platform rejects
        // empty ones.
        let bare = payloads
            .iter()
            .find(|p| p.0.get("name").unwrap().as_str() == Some("bare"))
            .unwrap();
        assert_eq!(
            bare.0.get("description").unwrap().as_str(),
            Some("No description provided")
        );
    }

    #[test]
    fn test_message_only_commands_are_excluded() {
        let commands = vec![
            arc(Command::new("textual").entry_mode(crate::command::EntryMode::MessageOnly)),
            arc(Command::new("ping")),
        ];
        let payloads = build_chat_commands(&commands, EntryMode::Both);
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].0.get("name").unwrap().as_str(), Some("ping"));
    }

    #[test]
    fn test_required_options_come_first() {
        use crate::arguments::{ArgumentKind, ArgumentSpec};

        let command = arc(
            Command::new("remind")
                .arg(ArgumentSpec::new("note", ArgumentKind::String))
                .arg(ArgumentSpec::new("when", ArgumentKind::String).required(true)),
        );
        let payloads = build_chat_commands(&[command], EntryMode::Both);
        let options = payloads[0].0.get("options").unwrap().as_array().unwrap();

        assert_eq!(options[0].get("name").unwrap().as_str(), Some("when"));
        assert_eq!(options[0].get("required").unwrap().as_bool(), Some(true));
        assert_eq!(options[1].get("name").unwrap().as_str(), Some("note"));
    }

    #[test]
    fn test_subcommand_tree_nests() {
        use crate::arguments::{ArgumentKind, ArgumentSpec};

        let command = arc(
            Command::new("tag").arg(
                ArgumentSpec::new("add", ArgumentKind::SubCommand)
                    .description("Create a tag")
                    .option(ArgumentSpec::new("name", ArgumentKind::String).required(true)),
            ),
        );
        let payloads = build_chat_commands(&[command], EntryMode::Both);
        let options = payloads[0].0.get("options").unwrap().as_array().unwrap();

        let add = &options[0];
        assert_eq!(add.get("name").unwrap().as_str(), Some("add"));
        // Wire value 1 = sub-command.
        assert_eq!(add.get("type").unwrap().as_u64(), Some(1));
        let nested = add.get("options").unwrap().as_array().unwrap();
        assert_eq!(nested[0].get("name").unwrap().as_str(), Some("name"));
    }

    #[test]
    fn test_choices_are_emitted() {
        use crate::arguments::{ArgumentKind, ArgumentSpec};

        let command = arc(Command::new("color").arg(
            ArgumentSpec::new("value", ArgumentKind::String)
                .required(true)
                .string_choice("Red", "red")
                .string_choice("Blue", "blue"),
        ));
        let payloads = build_chat_commands(&[command], EntryMode::Both);
        let options = payloads[0].0.get("options").unwrap().as_array().unwrap();
        let choices = options[0].get("choices").unwrap().as_array().unwrap();

        assert_eq!(choices.len(), 2);
        assert_eq!(choices[0].get("name").unwrap().as_str(), Some("Red"));
        assert_eq!(choices[0].get("value").unwrap().as_str(), Some("red"));
    }

    #[test]
    fn test_context_commands_follow_mode() {
        let commands = vec![
            arc(Command::new("Inspect").context_mode(ContextMode::Both)),
            arc(Command::new("quiet")),
        ];
        let payloads = build_context_commands(&commands, ContextMode::Off);
        assert_eq!(payloads.len(), 2);

        let kinds: Vec<u64> = payloads
            .iter()
            .map(|p| p.0.get("type").unwrap().as_u64().unwrap())
            .collect();
        // Wire values 2 = user menu, 3 = message menu.
        assert!(kinds.contains(&2));
        assert!(kinds.contains(&3));
    }
}
