//! # Argument System
//!
//! Typed argument declarations, the coercion rules that turn raw user input
//! into values, and the resolver that walks subcommand trees for both entry
//! paths.
//!
//! - **Version**: 1.0.0
//!
//! ## Changelog
//! - 1.0.0: Initial implementation with ten argument kinds and choices

pub mod coerce;
pub mod resolver;

use serde_json::{Map, Value};
use serenity::model::id::{ChannelId, RoleId, UserId};

/// The declared type of a command argument.
///
/// `SubCommand` and `SubCommandGroup` are branch nodes: they carry nested
/// option lists instead of producing a value of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
}

impl ArgumentKind {
    /// Human-readable name used in prompts.
    pub fn display_name(self) -> &'static str {
        match self {
            ArgumentKind::SubCommand => "subcommand",
            ArgumentKind::SubCommandGroup => "subcommand group",
            ArgumentKind::String => "text",
            ArgumentKind::Integer => "integer",
            ArgumentKind::Boolean => "boolean",
            ArgumentKind::User => "user",
            ArgumentKind::Channel => "channel",
            ArgumentKind::Role => "role",
            ArgumentKind::Mentionable => "user or role",
            ArgumentKind::Number => "number",
        }
    }

    /// Branch nodes carry nested options and select a path rather than a value.
    pub fn is_branch(self) -> bool {
        matches!(self, ArgumentKind::SubCommand | ArgumentKind::SubCommandGroup)
    }
}

/// A declared choice for String/Integer/Number arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub name: String,
    pub value: ChoiceValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceValue {
    String(String),
    Integer(i64),
    Number(f64),
}

impl ChoiceValue {
    pub fn display(&self) -> String {
        match self {
            ChoiceValue::String(s) => s.clone(),
            ChoiceValue::Integer(i) => i.to_string(),
            ChoiceValue::Number(n) => n.to_string(),
        }
    }
}

/// A single argument declaration on a command.
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    pub name: String,
    pub description: String,
    pub kind: ArgumentKind,
    pub required: bool,
    /// Prompt text used when the argument has to be asked for interactively.
    /// Falls back to a templated default when absent.
    pub prompt: Option<String>,
    pub choices: Vec<Choice>,
    /// Nested options for branch kinds.
    pub options: Vec<ArgumentSpec>,
}

impl ArgumentSpec {
    pub fn new(name: impl Into<String>, kind: ArgumentKind) -> Self {
        ArgumentSpec {
            name: name.into(),
            description: String::new(),
            kind,
            required: false,
            prompt: None,
            choices: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn string_choice(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.choices.push(Choice {
            name: name.into(),
            value: ChoiceValue::String(value.into()),
        });
        self
    }

    pub fn int_choice(mut self, name: impl Into<String>, value: i64) -> Self {
        self.choices.push(Choice {
            name: name.into(),
            value: ChoiceValue::Integer(value),
        });
        self
    }

    pub fn number_choice(mut self, name: impl Into<String>, value: f64) -> Self {
        self.choices.push(Choice {
            name: name.into(),
            value: ChoiceValue::Number(value),
        });
        self
    }

    /// Add a nested option (only meaningful on branch kinds).
    pub fn option(mut self, option: ArgumentSpec) -> Self {
        self.options.push(option);
        self
    }
}

/// A coerced argument value handed to a command handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(UserId),
    Channel(ChannelId),
    Role(RoleId),
    /// A user-or-role mention; bare snowflakes stay untagged.
    Mentionable(u64),
    /// The name of a chosen subcommand or subcommand group.
    Path(String),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(s) | ArgValue::Path(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Number(n) => Some(*n),
            ArgValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_user_id(&self) -> Option<UserId> {
        match self {
            ArgValue::User(id) => Some(*id),
            ArgValue::Mentionable(id) => Some(UserId(*id)),
            _ => None,
        }
    }

    pub fn as_channel_id(&self) -> Option<ChannelId> {
        match self {
            ArgValue::Channel(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_role_id(&self) -> Option<RoleId> {
        match self {
            ArgValue::Role(id) => Some(*id),
            ArgValue::Mentionable(id) => Some(RoleId(*id)),
            _ => None,
        }
    }

    /// JSON rendering used by the object-args view. Snowflake kinds render
    /// as strings, matching the platform's own option payloads.
    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::String(s) | ArgValue::Path(s) => Value::String(s.clone()),
            ArgValue::Integer(i) => Value::from(*i),
            ArgValue::Number(n) => Value::from(*n),
            ArgValue::Boolean(b) => Value::Bool(*b),
            ArgValue::User(id) => Value::String(id.0.to_string()),
            ArgValue::Channel(id) => Value::String(id.0.to_string()),
            ArgValue::Role(id) => Value::String(id.0.to_string()),
            ArgValue::Mentionable(id) => Value::String(id.to_string()),
        }
    }
}

/// The fully resolved arguments for one invocation: the positional view
/// (subcommand path names followed by leaf values, in declaration order)
/// and the nested name-keyed object view.
#[derive(Debug, Clone, Default)]
pub struct ResolvedArgs {
    pub positional: Vec<ArgValue>,
    pub object: Value,
}

impl ResolvedArgs {
    pub fn empty() -> Self {
        ResolvedArgs {
            positional: Vec::new(),
            object: Value::Object(Map::new()),
        }
    }

    /// Look up a leaf value by name, descending through subcommand nesting.
    pub fn get(&self, name: &str) -> Option<&Value> {
        fn walk<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
            let map = value.as_object()?;
            if let Some(found) = map.get(name) {
                return Some(found);
            }
            map.values().find_map(|v| walk(v, name))
        }
        walk(&self.object, name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }
}
