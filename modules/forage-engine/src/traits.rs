//! Trait abstractions for the engine's external collaborators.
//!
//! The LLM and vision services sit behind `FoodClassifier` and
//! `VisionDescriber`; the call-rate budget sits behind `EscalationGate`.
//! These enable deterministic testing with the mocks in `testing` — no
//! network, no API keys.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use forage_common::{ForageError, LlmVerdict};

/// A collaborator verdict plus the untrusted raw payload it was parsed from.
pub type VerdictWithPayload = (LlmVerdict, serde_json::Value);

// ---------------------------------------------------------------------------
// LLM text classification
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FoodClassifier: Send + Sync {
    /// Classify a borderline segment. Errors mean collaborator failure, not
    /// a deterministic reject — callers must fail closed and mark the
    /// segment retryable.
    async fn classify_text(&self, text: &str) -> Result<VerdictWithPayload, ForageError>;
}

// ---------------------------------------------------------------------------
// Vision escalation
// ---------------------------------------------------------------------------

#[async_trait]
pub trait VisionDescriber: Send + Sync {
    /// Classify an image-only post from its attached images plus whatever
    /// caption text exists. The returned verdict's `image_text` is folded
    /// into the segment's working text by the caller.
    async fn describe_images(
        &self,
        image_urls: &[String],
        caption: &str,
    ) -> Result<VerdictWithPayload, ForageError>;
}

// ---------------------------------------------------------------------------
// Escalation gate
// ---------------------------------------------------------------------------

/// Caller-supplied circuit breaker for the LLM call budget. When the gate
/// refuses, the engine rejects without calling — it never queues or blocks.
pub trait EscalationGate: Send + Sync {
    fn try_acquire(&self) -> bool;
}

/// Simple atomic countdown gate.
pub struct CallBudget {
    remaining: AtomicI64,
}

impl CallBudget {
    pub fn new(max_calls: u32) -> Self {
        Self {
            remaining: AtomicI64::new(max_calls as i64),
        }
    }

    pub fn remaining(&self) -> i64 {
        self.remaining.load(Ordering::Relaxed).max(0)
    }
}

impl EscalationGate for CallBudget {
    fn try_acquire(&self) -> bool {
        self.remaining.fetch_sub(1, Ordering::Relaxed) > 0
    }
}

/// A gate that never refuses, for callers that manage budgets elsewhere.
pub struct UnboundedGate;

impl EscalationGate for UnboundedGate {
    fn try_acquire(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_budget_counts_down_and_refuses() {
        let gate = CallBudget::new(2);
        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
        assert!(!gate.try_acquire());
        assert_eq!(gate.remaining(), 0);
    }

    #[test]
    fn unbounded_gate_always_allows() {
        let gate = UnboundedGate;
        for _ in 0..100 {
            assert!(gate.try_acquire());
        }
    }
}
