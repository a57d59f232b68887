//! # Feature: Cooldowns
//!
//! Fixed-window per (guild, user, command) cooldown tracking with DashMap
//! for thread-safe concurrent access. Checking an expired or absent entry
//! arms a new window in the same call, so the dispatch pipeline only has
//! to ask once.
//!
//! - **Version**: 1.0.0
//!
//! ## Changelog
//! - 1.0.0: Initial release with fixed-window tracking

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// The answer to "may this user run this command right now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownStatus {
    pub on_cooldown: bool,
    /// Remaining wait, rounded up to whole seconds for display.
    pub wait_secs: u64,
}

impl CooldownStatus {
    pub fn ready() -> Self {
        CooldownStatus {
            on_cooldown: false,
            wait_secs: 0,
        }
    }
}

#[derive(Default)]
pub struct CooldownTracker {
    windows: DashMap<(u64, u64, String), Instant>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        CooldownTracker {
            windows: DashMap::new(),
        }
    }

    /// Check the (guild, user, command) window. If it has elapsed (or was
    /// never armed), arm it for `window` and report ready.
    pub fn check_and_arm(
        &self,
        guild: u64,
        user: u64,
        command: &str,
        window: Duration,
    ) -> CooldownStatus {
        if window.is_zero() {
            return CooldownStatus::ready();
        }

        let key = (guild, user, command.to_string());
        let now = Instant::now();

        if let Some(armed_at) = self.windows.get(&key) {
            let elapsed = now.duration_since(*armed_at);
            if elapsed < window {
                let remaining = window - elapsed;
                return CooldownStatus {
                    on_cooldown: true,
                    wait_secs: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
                };
            }
        }

        self.windows.insert(key, now);
        CooldownStatus::ready()
    }

    /// Drop windows that have already elapsed. Called opportunistically so
    /// the map does not grow with one entry per user forever.
    pub fn sweep(&self, window: Duration) {
        let now = Instant::now();
        self.windows
            .retain(|_, armed_at| now.duration_since(*armed_at) < window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_first_use_is_ready_and_arms() {
        let tracker = CooldownTracker::new();
        let status = tracker.check_and_arm(1, 2, "ping", Duration::from_secs(1));
        assert!(!status.on_cooldown);

        let status = tracker.check_and_arm(1, 2, "ping", Duration::from_secs(1));
        assert!(status.on_cooldown);
        assert!(status.wait_secs >= 1);
    }

    #[tokio::test]
    async fn test_window_elapses() {
        let tracker = CooldownTracker::new();
        assert!(!tracker.check_and_arm(1, 2, "ping", Duration::from_millis(50)).on_cooldown);
        assert!(tracker.check_and_arm(1, 2, "ping", Duration::from_millis(50)).on_cooldown);

        sleep(Duration::from_millis(80)).await;
        assert!(!tracker.check_and_arm(1, 2, "ping", Duration::from_millis(50)).on_cooldown);
    }

    #[tokio::test]
    async fn test_windows_are_scoped_per_user_and_command() {
        let tracker = CooldownTracker::new();
        let window = Duration::from_secs(5);

        assert!(!tracker.check_and_arm(1, 2, "ping", window).on_cooldown);
        assert!(!tracker.check_and_arm(1, 3, "ping", window).on_cooldown);
        assert!(!tracker.check_and_arm(1, 2, "echo", window).on_cooldown);
        assert!(!tracker.check_and_arm(9, 2, "ping", window).on_cooldown);
        assert!(tracker.check_and_arm(1, 2, "ping", window).on_cooldown);
    }

    #[tokio::test]
    async fn test_zero_window_never_blocks() {
        let tracker = CooldownTracker::new();
        assert!(!tracker.check_and_arm(1, 2, "ping", Duration::ZERO).on_cooldown);
        assert!(!tracker.check_and_arm(1, 2, "ping", Duration::ZERO).on_cooldown);
    }

    #[tokio::test]
    async fn test_sweep_removes_elapsed_windows() {
        let tracker = CooldownTracker::new();
        tracker.check_and_arm(1, 2, "ping", Duration::from_millis(10));
        sleep(Duration::from_millis(30)).await;
        tracker.sweep(Duration::from_millis(10));
        assert!(tracker.windows.is_empty());
    }
}
