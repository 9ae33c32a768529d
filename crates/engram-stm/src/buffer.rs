//! Conversation buffer: bounded sliding window with token-aware eviction.

use std::collections::VecDeque;

use engram_types::Message;

use crate::budget::{TokenBudget, estimate_tokens};

/// Ordered window of recent messages. O(1) append; eviction always removes
/// from the oldest end, first by message count, then by token budget.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    messages: VecDeque<Message>,
    max_messages: usize,
    budget: TokenBudget,
}

impl ConversationBuffer {
    /// Create an empty buffer with the given message and token caps.
    #[must_use]
    pub fn new(max_messages: usize, max_tokens: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(max_messages.min(4096)),
            max_messages: max_messages.max(1),
            budget: TokenBudget::new(max_tokens),
        }
    }

    /// Append a message, evicting from the oldest end as needed.
    ///
    /// Returns the evicted messages, oldest first. After the call either the
    /// token budget holds, or the buffer contains exactly the one new message
    /// whose estimate alone exceeds the budget.
    pub fn add(&mut self, message: Message) -> Vec<Message> {
        let tokens = estimate_tokens(&message.content);
        let mut evicted = Vec::new();

        if self.messages.len() == self.max_messages {
            self.evict_oldest(&mut evicted);
        }
        loop {
            match self.budget.try_add(tokens) {
                Ok(()) => break,
                Err(_) if !self.messages.is_empty() => self.evict_oldest(&mut evicted),
                Err(overflow) => {
                    // Lone message above the cap: admit it anyway.
                    log::debug!(
                        "message of {} tokens exceeds empty-buffer budget of {}",
                        overflow.requested,
                        overflow.available
                    );
                    self.budget.add_unchecked(tokens);
                    break;
                }
            }
        }

        self.messages.push_back(message);

        if !evicted.is_empty() {
            log::debug!(
                "conversation buffer evicted {} message(s), now {} messages / {} tokens",
                evicted.len(),
                self.messages.len(),
                self.budget.current()
            );
        }
        evicted
    }

    fn evict_oldest(&mut self, evicted: &mut Vec<Message>) {
        let Some(oldest) = self.messages.pop_front() else {
            return;
        };
        self.budget.subtract(estimate_tokens(&oldest.content));
        evicted.push(oldest);
    }

    /// Last `n` messages in insertion order; `None` returns the full window.
    #[must_use]
    pub fn recent(&self, n: Option<usize>) -> Vec<&Message> {
        let take = n.unwrap_or(self.messages.len()).min(self.messages.len());
        if take == 0 {
            return Vec::new();
        }
        let mut out: Vec<&Message> = self.messages.iter().rev().take(take).collect();
        out.reverse();
        out
    }

    /// Full ordered message sequence.
    #[must_use]
    pub fn all(&self) -> Vec<&Message> {
        self.messages.iter().collect()
    }

    /// Number of messages currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the buffer holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Estimated tokens currently held.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.budget.current()
    }

    /// Configured message cap.
    #[must_use]
    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Configured token capacity.
    #[must_use]
    pub fn max_tokens(&self) -> usize {
        self.budget.max()
    }
}
