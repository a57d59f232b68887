//! Permission math without a gateway cache.
//!
//! The gateway features this crate runs with do not include a member/role
//! cache, so effective permissions are combined from role bits fetched
//! over HTTP. Channel-level overwrites are not applied; see the design
//! notes for the tradeoff.

use serenity::model::permissions::Permissions;

/// Combine a member's effective guild-level permissions: the @everyone
/// role, each held role, owner and Administrator short-circuits.
pub fn combine_permissions(
    is_owner: bool,
    everyone: Option<Permissions>,
    role_permissions: &[Permissions],
) -> Permissions {
    if is_owner {
        return Permissions::all();
    }

    let mut combined = everyone.unwrap_or_else(Permissions::empty);
    for permissions in role_permissions {
        combined |= *permissions;
    }

    if combined.contains(Permissions::ADMINISTRATOR) {
        Permissions::all()
    } else {
        combined
    }
}

/// The permission bits in `required` that `held` lacks.
pub fn missing_permissions(required: Permissions, held: Permissions) -> Permissions {
    required & !held
}

/// Render permissions the way they appear in replies: underscore names
/// unescaped into Title Case and comma-joined, e.g. "Manage Guild, Kick
/// Members".
pub fn format_permissions(permissions: Permissions) -> String {
    if permissions.is_empty() {
        return String::new();
    }
    format!("{:?}", permissions)
        .split(" | ")
        .map(title_case)
        .collect::<Vec<_>>()
        .join(", ")
}

fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_has_everything() {
        let perms = combine_permissions(true, None, &[]);
        assert_eq!(perms, Permissions::all());
    }

    #[test]
    fn test_roles_accumulate() {
        let perms = combine_permissions(
            false,
            Some(Permissions::SEND_MESSAGES),
            &[Permissions::KICK_MEMBERS, Permissions::MANAGE_GUILD],
        );
        assert!(perms.contains(Permissions::SEND_MESSAGES));
        assert!(perms.contains(Permissions::KICK_MEMBERS));
        assert!(perms.contains(Permissions::MANAGE_GUILD));
        assert!(!perms.contains(Permissions::BAN_MEMBERS));
    }

    #[test]
    fn test_administrator_short_circuits() {
        let perms = combine_permissions(false, None, &[Permissions::ADMINISTRATOR]);
        assert_eq!(perms, Permissions::all());
    }

    #[test]
    fn test_missing_permissions() {
        let required = Permissions::KICK_MEMBERS | Permissions::MANAGE_GUILD;
        let held = Permissions::KICK_MEMBERS | Permissions::SEND_MESSAGES;
        assert_eq!(missing_permissions(required, held), Permissions::MANAGE_GUILD);
        assert!(missing_permissions(required, Permissions::all()).is_empty());
    }

    #[test]
    fn test_format_permissions() {
        let formatted = format_permissions(Permissions::MANAGE_GUILD | Permissions::KICK_MEMBERS);
        assert!(formatted.contains("Manage Guild"));
        assert!(formatted.contains("Kick Members"));
        assert!(formatted.contains(", "));
        assert_eq!(format_permissions(Permissions::empty()), "");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("MANAGE_GUILD"), "Manage Guild");
        assert_eq!(title_case("NSFW"), "Nsfw");
    }
}
