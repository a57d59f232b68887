//! # Reply Waiter
//!
//! Routes an author's next message in a channel to a pending argument
//! prompt instead of the normal dispatch path. One pending slot per
//! (channel, author); arming a new prompt cancels the previous one.
//!
//! The waiter is generic over the payload so the routing logic stays
//! testable without constructing platform message objects.

use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;

pub struct ReplyWaiter<T> {
    pending: DashMap<(u64, u64), oneshot::Sender<T>>,
}

impl<T: Send + 'static> ReplyWaiter<T> {
    pub fn new() -> Self {
        ReplyWaiter {
            pending: DashMap::new(),
        }
    }

    /// True when a prompt is waiting on this (channel, author) pair.
    pub fn has_pending(&self, channel: u64, author: u64) -> bool {
        self.pending.contains_key(&(channel, author))
    }

    /// Offer an inbound message to a pending prompt. Returns `true` when it
    /// was consumed; the caller must then stop processing the message.
    pub fn offer(&self, channel: u64, author: u64, value: T) -> bool {
        match self.pending.remove(&(channel, author)) {
            Some((_, tx)) => tx.send(value).is_ok(),
            None => false,
        }
    }

    /// Arm a prompt and wait for the author's next message, up to `timeout`.
    pub async fn await_reply(&self, channel: u64, author: u64, timeout: Duration) -> Option<T> {
        let (tx, rx) = oneshot::channel();
        // Replacing an existing sender drops it, which cancels the older
        // prompt's wait.
        self.pending.insert((channel, author), tx);

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Some(value),
            _ => {
                self.pending.remove(&(channel, author));
                None
            }
        }
    }
}

impl<T: Send + 'static> Default for ReplyWaiter<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_reply_is_routed_to_waiter() {
        let waiter: Arc<ReplyWaiter<String>> = Arc::new(ReplyWaiter::new());

        let replier = waiter.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            assert!(replier.offer(1, 2, "hello".to_string()));
        });

        let reply = waiter.await_reply(1, 2, Duration::from_secs(1)).await;
        assert_eq!(reply, Some("hello".to_string()));
        assert!(!waiter.has_pending(1, 2));
    }

    #[tokio::test]
    async fn test_offer_without_pending_prompt() {
        let waiter: ReplyWaiter<String> = ReplyWaiter::new();
        assert!(!waiter.offer(1, 2, "orphan".to_string()));
    }

    #[tokio::test]
    async fn test_timeout_clears_pending_slot() {
        let waiter: ReplyWaiter<String> = ReplyWaiter::new();
        let reply = waiter.await_reply(1, 2, Duration::from_millis(30)).await;
        assert_eq!(reply, None);
        assert!(!waiter.has_pending(1, 2));
    }

    #[tokio::test]
    async fn test_wrong_author_is_not_consumed() {
        let waiter: Arc<ReplyWaiter<String>> = Arc::new(ReplyWaiter::new());

        let other = waiter.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            // Different author in the same channel: not consumed.
            assert!(!other.offer(1, 99, "intruder".to_string()));
            sleep(Duration::from_millis(10)).await;
            assert!(other.offer(1, 2, "owner".to_string()));
        });

        let reply = waiter.await_reply(1, 2, Duration::from_secs(1)).await;
        assert_eq!(reply, Some("owner".to_string()));
    }
}
