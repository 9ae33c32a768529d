//! Deterministic token estimation and budget accounting.

use serde::{Deserialize, Serialize};

/// Estimate the token cost of a text.
///
/// Approximates tokens as `chars / 4 + 1`. The engine runs before real
/// tokenizer counts exist, so a stable character-derived estimate keeps
/// eviction deterministic without a tokenizer dependency.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 1
}

/// Signal that an insertion would exceed the budget. Not fatal; the caller
/// decides whether to evict or reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetOverflow {
    /// Tokens the rejected insertion asked for.
    pub requested: usize,
    /// Tokens still available before the cap.
    pub available: usize,
}

/// Token capacity tracker for one conversation buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    max_tokens: usize,
    current_tokens: usize,
}

impl TokenBudget {
    /// Create an empty budget with the given capacity.
    #[must_use]
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            current_tokens: 0,
        }
    }

    /// Add tokens only if the result stays within capacity.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetOverflow`] when `current + tokens` would exceed the
    /// cap; the budget is unchanged in that case.
    pub fn try_add(&mut self, tokens: usize) -> Result<(), BudgetOverflow> {
        let next = self.current_tokens.saturating_add(tokens);
        if next > self.max_tokens {
            return Err(BudgetOverflow {
                requested: tokens,
                available: self.max_tokens.saturating_sub(self.current_tokens),
            });
        }
        self.current_tokens = next;
        Ok(())
    }

    /// Add tokens without enforcing the cap. Used for the single-oversized-
    /// message rule where a buffer may briefly hold more than its capacity.
    pub fn add_unchecked(&mut self, tokens: usize) {
        self.current_tokens = self.current_tokens.saturating_add(tokens);
    }

    /// Subtract tokens, saturating at zero.
    pub fn subtract(&mut self, tokens: usize) {
        self.current_tokens = self.current_tokens.saturating_sub(tokens);
    }

    /// Tokens currently accounted for.
    #[must_use]
    pub fn current(&self) -> usize {
        self.current_tokens
    }

    /// Configured capacity.
    #[must_use]
    pub fn max(&self) -> usize {
        self.max_tokens
    }

    /// Tokens still available before the cap.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.max_tokens.saturating_sub(self.current_tokens)
    }

    /// Whether the budget currently exceeds its capacity (only possible via
    /// [`TokenBudget::add_unchecked`]).
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.current_tokens > self.max_tokens
    }
}
