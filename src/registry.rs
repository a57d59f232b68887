//! # Command Registry
//!
//! Concurrent name → command map with a separate alias → canonical-name
//! map, mirroring how the dispatch pipeline looks commands up: primary
//! name first, then aliases. Lookup case-sensitivity is fixed at
//! construction.

use std::sync::Arc;

use anyhow::{bail, Result};
use dashmap::DashMap;
use log::debug;

use crate::command::Command;

pub struct CommandRegistry {
    commands: DashMap<String, Arc<Command>>,
    aliases: DashMap<String, String>,
    case_sensitive: bool,
}

impl CommandRegistry {
    pub fn new(case_sensitive: bool) -> Self {
        CommandRegistry {
            commands: DashMap::new(),
            aliases: DashMap::new(),
            case_sensitive,
        }
    }

    fn key(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    /// Register a command. Name and alias collisions are errors so a typo
    /// cannot silently shadow an existing command.
    pub fn register(&self, command: Command) -> Result<()> {
        let key = self.key(&command.name);
        if self.commands.contains_key(&key) || self.aliases.contains_key(&key) {
            bail!("a command or alias named '{}' is already registered", command.name);
        }

        let alias_keys: Vec<String> = command.aliases.iter().map(|a| self.key(a)).collect();
        for (alias, alias_key) in command.aliases.iter().zip(&alias_keys) {
            if self.commands.contains_key(alias_key) || self.aliases.contains_key(alias_key) {
                bail!("alias '{}' collides with an existing command or alias", alias);
            }
        }

        for alias_key in alias_keys {
            self.aliases.insert(alias_key, key.clone());
        }
        debug!("registered command '{}'", command.name);
        self.commands.insert(key, Arc::new(command));
        Ok(())
    }

    /// Alias-aware lookup.
    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        let key = self.key(name);
        if let Some(command) = self.commands.get(&key) {
            return Some(command.clone());
        }
        let canonical = self.aliases.get(&key)?.clone();
        self.commands.get(&canonical).map(|c| c.clone())
    }

    /// Remove a command (by primary name) and its aliases.
    pub fn unregister(&self, name: &str) -> Option<Arc<Command>> {
        let key = self.key(name);
        let (_, command) = self.commands.remove(&key)?;
        self.aliases.retain(|_, canonical| *canonical != key);
        Some(command)
    }

    /// Snapshot of every registered command, sorted by name for stable
    /// help output and registration payloads.
    pub fn all(&self) -> Vec<Arc<Command>> {
        let mut commands: Vec<Arc<Command>> =
            self.commands.iter().map(|entry| entry.value().clone()).collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));
        commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = CommandRegistry::new(false);
        registry.register(Command::new("ping")).unwrap();

        assert!(registry.get("ping").is_some());
        assert!(registry.get("PING").is_some());
        assert!(registry.get("pong").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_case_sensitive_lookup() {
        let registry = CommandRegistry::new(true);
        registry.register(Command::new("Ping")).unwrap();

        assert!(registry.get("Ping").is_some());
        assert!(registry.get("ping").is_none());
    }

    #[test]
    fn test_alias_resolution() {
        let registry = CommandRegistry::new(false);
        registry
            .register(Command::new("configuration").alias("config").alias("cfg"))
            .unwrap();

        assert_eq!(registry.get("cfg").unwrap().name, "configuration");
        assert_eq!(registry.get("CONFIG").unwrap().name, "configuration");
    }

    #[test]
    fn test_name_collision_rejected() {
        let registry = CommandRegistry::new(false);
        registry.register(Command::new("ping")).unwrap();
        assert!(registry.register(Command::new("PING")).is_err());
    }

    #[test]
    fn test_alias_collision_rejected() {
        let registry = CommandRegistry::new(false);
        registry.register(Command::new("ping").alias("p")).unwrap();
        assert!(registry.register(Command::new("p")).is_err());
        assert!(registry.register(Command::new("pong").alias("p")).is_err());
        // The failed registration must not leave partial state behind.
        assert!(registry.get("pong").is_none());
    }

    #[test]
    fn test_unregister_removes_aliases() {
        let registry = CommandRegistry::new(false);
        registry.register(Command::new("ping").alias("p")).unwrap();
        assert!(registry.unregister("ping").is_some());

        assert!(registry.get("ping").is_none());
        assert!(registry.get("p").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_all_is_sorted() {
        let registry = CommandRegistry::new(false);
        registry.register(Command::new("zeta")).unwrap();
        registry.register(Command::new("alpha")).unwrap();

        let names: Vec<String> = registry.all().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
