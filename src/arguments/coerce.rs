//! Syntactic validation and coercion of raw tokens.
//!
//! Everything here is pure string work so the rules can be tested without a
//! gateway connection. Snowflake-typed arguments accept a platform mention
//! or a bare 17-20 digit id; existence is the platform's problem on the
//! interaction path and the handler's on the text path.

use serenity::model::id::{ChannelId, RoleId, UserId};

use super::{ArgValue, ArgumentKind, ArgumentSpec, ChoiceValue};

/// Coerce `raw` against `spec`. The error string is a human-readable reason
/// used to fill the `{REASON}` slot of the invalid-argument template.
pub fn coerce(spec: &ArgumentSpec, raw: &str) -> Result<ArgValue, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty input".to_string());
    }

    match spec.kind {
        ArgumentKind::String => {
            check_choice(spec, &ChoiceValue::String(raw.to_string()))?;
            Ok(ArgValue::String(raw.to_string()))
        }
        ArgumentKind::Integer => {
            let value: i64 = raw
                .parse()
                .map_err(|_| "expected a whole number".to_string())?;
            check_choice(spec, &ChoiceValue::Integer(value))?;
            Ok(ArgValue::Integer(value))
        }
        ArgumentKind::Number => {
            let value: f64 = raw.parse().map_err(|_| "expected a number".to_string())?;
            if !value.is_finite() {
                return Err("expected a finite number".to_string());
            }
            check_choice(spec, &ChoiceValue::Number(value))?;
            Ok(ArgValue::Number(value))
        }
        ArgumentKind::Boolean => parse_boolean(raw)
            .map(ArgValue::Boolean)
            .ok_or_else(|| "expected yes/no or true/false".to_string()),
        ArgumentKind::User => parse_user(raw)
            .map(ArgValue::User)
            .ok_or_else(|| "expected a user mention or id".to_string()),
        ArgumentKind::Channel => parse_channel(raw)
            .map(ArgValue::Channel)
            .ok_or_else(|| "expected a channel mention or id".to_string()),
        ArgumentKind::Role => parse_role(raw)
            .map(ArgValue::Role)
            .ok_or_else(|| "expected a role mention or id".to_string()),
        ArgumentKind::Mentionable => parse_mentionable(raw)
            .ok_or_else(|| "expected a user or role mention".to_string()),
        ArgumentKind::SubCommand | ArgumentKind::SubCommandGroup => {
            Err("subcommands are resolved by name".to_string())
        }
    }
}

fn check_choice(spec: &ArgumentSpec, value: &ChoiceValue) -> Result<(), String> {
    if spec.choices.is_empty() {
        return Ok(());
    }
    let matched = spec.choices.iter().any(|c| match (&c.value, value) {
        (ChoiceValue::String(a), ChoiceValue::String(b)) => a.eq_ignore_ascii_case(b),
        (ChoiceValue::Integer(a), ChoiceValue::Integer(b)) => a == b,
        (ChoiceValue::Number(a), ChoiceValue::Number(b)) => (a - b).abs() < f64::EPSILON,
        _ => false,
    });
    if matched {
        Ok(())
    } else {
        Err("not one of the declared choices".to_string())
    }
}

pub fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "on" => Some(true),
        "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// A bare snowflake: 17-20 digits.
pub fn parse_snowflake(raw: &str) -> Option<u64> {
    if (17..=20).contains(&raw.len()) && raw.bytes().all(|b| b.is_ascii_digit()) {
        raw.parse().ok()
    } else {
        None
    }
}

fn mention_body<'a>(raw: &'a str, prefix: &str) -> Option<&'a str> {
    raw.strip_prefix(prefix)?.strip_suffix('>')
}

pub fn parse_user(raw: &str) -> Option<UserId> {
    let body = mention_body(raw, "<@!")
        .or_else(|| mention_body(raw, "<@"))
        .unwrap_or(raw);
    parse_snowflake(body).map(UserId)
}

pub fn parse_channel(raw: &str) -> Option<ChannelId> {
    let body = mention_body(raw, "<#").unwrap_or(raw);
    parse_snowflake(body).map(ChannelId)
}

pub fn parse_role(raw: &str) -> Option<RoleId> {
    let body = mention_body(raw, "<@&").unwrap_or(raw);
    parse_snowflake(body).map(RoleId)
}

fn parse_mentionable(raw: &str) -> Option<ArgValue> {
    // Role mentions start with <@&, user mentions with <@ or <@!, so the
    // role form has to be tried first.
    if let Some(body) = mention_body(raw, "<@&") {
        return parse_snowflake(body).map(|id| ArgValue::Role(RoleId(id)));
    }
    if let Some(body) = mention_body(raw, "<@!").or_else(|| mention_body(raw, "<@")) {
        return parse_snowflake(body).map(|id| ArgValue::User(UserId(id)));
    }
    parse_snowflake(raw).map(ArgValue::Mentionable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: ArgumentKind) -> ArgumentSpec {
        ArgumentSpec::new("arg", kind)
    }

    #[test]
    fn test_string_passthrough() {
        let value = coerce(&spec(ArgumentKind::String), "hello").unwrap();
        assert_eq!(value, ArgValue::String("hello".to_string()));
    }

    #[test]
    fn test_string_choice_membership() {
        let spec = spec(ArgumentKind::String)
            .string_choice("Red", "red")
            .string_choice("Blue", "blue");
        assert_eq!(
            coerce(&spec, "RED").unwrap(),
            ArgValue::String("RED".to_string())
        );
        assert!(coerce(&spec, "green").is_err());
    }

    #[test]
    fn test_integer_parse_and_choices() {
        assert_eq!(
            coerce(&spec(ArgumentKind::Integer), "-42").unwrap(),
            ArgValue::Integer(-42)
        );
        assert!(coerce(&spec(ArgumentKind::Integer), "4.5").is_err());
        assert!(coerce(&spec(ArgumentKind::Integer), "abc").is_err());

        let limited = spec(ArgumentKind::Integer).int_choice("one", 1).int_choice("two", 2);
        assert!(coerce(&limited, "2").is_ok());
        assert!(coerce(&limited, "3").is_err());
    }

    #[test]
    fn test_number_rejects_non_finite() {
        assert_eq!(
            coerce(&spec(ArgumentKind::Number), "2.5").unwrap(),
            ArgValue::Number(2.5)
        );
        assert!(coerce(&spec(ArgumentKind::Number), "inf").is_err());
        assert!(coerce(&spec(ArgumentKind::Number), "NaN").is_err());
    }

    #[test]
    fn test_boolean_spellings() {
        for truthy in ["true", "YES", "y", "on"] {
            assert_eq!(parse_boolean(truthy), Some(true), "{}", truthy);
        }
        for falsy in ["false", "No", "n", "off"] {
            assert_eq!(parse_boolean(falsy), Some(false), "{}", falsy);
        }
        assert_eq!(parse_boolean("maybe"), None);
    }

    #[test]
    fn test_snowflake_bounds() {
        assert_eq!(parse_snowflake("12345678901234567"), Some(12345678901234567));
        assert!(parse_snowflake("1234").is_none());
        assert!(parse_snowflake("123456789012345678901").is_none());
        assert!(parse_snowflake("1234567890123456x").is_none());
    }

    #[test]
    fn test_user_mention_forms() {
        let id = UserId(123456789012345678);
        assert_eq!(parse_user("<@123456789012345678>"), Some(id));
        assert_eq!(parse_user("<@!123456789012345678>"), Some(id));
        assert_eq!(parse_user("123456789012345678"), Some(id));
        assert_eq!(parse_user("<@&123456789012345678>"), None);
        assert_eq!(parse_user("@someone"), None);
    }

    #[test]
    fn test_channel_and_role_mentions() {
        assert_eq!(
            parse_channel("<#123456789012345678>"),
            Some(ChannelId(123456789012345678))
        );
        assert_eq!(
            parse_role("<@&123456789012345678>"),
            Some(RoleId(123456789012345678))
        );
        assert_eq!(parse_role("<#123456789012345678>"), None);
    }

    #[test]
    fn test_mentionable_disambiguation() {
        assert_eq!(
            coerce(&spec(ArgumentKind::Mentionable), "<@&123456789012345678>").unwrap(),
            ArgValue::Role(RoleId(123456789012345678))
        );
        assert_eq!(
            coerce(&spec(ArgumentKind::Mentionable), "<@!123456789012345678>").unwrap(),
            ArgValue::User(UserId(123456789012345678))
        );
        assert_eq!(
            coerce(&spec(ArgumentKind::Mentionable), "123456789012345678").unwrap(),
            ArgValue::Mentionable(123456789012345678)
        );
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(coerce(&spec(ArgumentKind::String), "   ").is_err());
    }
}
