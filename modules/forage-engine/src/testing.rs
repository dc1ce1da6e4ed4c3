// Test mocks for the extraction pipeline.
//
// Two mocks matching the two collaborator boundaries:
// - MockLlm (FoodClassifier) — fixed verdict, call counting, optional failure
// - MockVision (VisionDescriber) — fixed verdict with an image description
//
// Plus helpers for constructing RawPost and Segment fixtures. Everything is
// deterministic: no network, no API keys.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Once;

use async_trait::async_trait;
use chrono::Utc;

use forage_common::{ForageError, LlmVerdict, RawPost, Segment};

use crate::traits::{FoodClassifier, VerdictWithPayload, VisionDescriber};

static TRACING: Once = Once::new();

/// Install a fmt subscriber once for test runs. Respects `RUST_LOG`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    });
}

// ---------------------------------------------------------------------------
// MockLlm
// ---------------------------------------------------------------------------

/// Fixed-verdict text classifier. Counts calls so tests can assert that the
/// budget and ladder short-circuits hold.
pub struct MockLlm {
    verdict: LlmVerdict,
    fail: bool,
    calls: AtomicU32,
}

impl MockLlm {
    pub fn accepting(verdict: LlmVerdict) -> Self {
        Self {
            verdict: LlmVerdict {
                is_food_event: true,
                ..verdict
            },
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn accepting_default() -> Self {
        Self::accepting(LlmVerdict::default())
    }

    pub fn declining() -> Self {
        Self {
            verdict: LlmVerdict::default(),
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            verdict: LlmVerdict::default(),
            fail: true,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FoodClassifier for MockLlm {
    async fn classify_text(&self, _text: &str) -> Result<VerdictWithPayload, ForageError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(ForageError::Collaborator("mock llm timeout".to_string()));
        }
        let payload = serde_json::to_value(&self.verdict).unwrap_or_default();
        Ok((self.verdict.clone(), payload))
    }
}

// ---------------------------------------------------------------------------
// MockVision
// ---------------------------------------------------------------------------

/// Fixed-verdict vision collaborator.
pub struct MockVision {
    verdict: LlmVerdict,
    fail: bool,
    calls: AtomicU32,
}

impl MockVision {
    pub fn accepting(verdict: LlmVerdict) -> Self {
        Self {
            verdict: LlmVerdict {
                is_food_event: true,
                ..verdict
            },
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    /// Accepts with the given poster description as `image_text`.
    pub fn accepting_with_description(description: &str) -> Self {
        Self::accepting(LlmVerdict {
            image_text: Some(description.to_string()),
            ..LlmVerdict::default()
        })
    }

    pub fn declining() -> Self {
        Self {
            verdict: LlmVerdict::default(),
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            verdict: LlmVerdict::default(),
            fail: true,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl VisionDescriber for MockVision {
    async fn describe_images(
        &self,
        _image_urls: &[String],
        _caption: &str,
    ) -> Result<VerdictWithPayload, ForageError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(ForageError::Collaborator("mock vision timeout".to_string()));
        }
        let payload = serde_json::to_value(&self.verdict).unwrap_or_default();
        Ok((self.verdict.clone(), payload))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A text-only post with no images and fresh `published_at`.
pub fn post_with_text(text: &str) -> RawPost {
    RawPost {
        post_id: "post-1".to_string(),
        text: text.to_string(),
        image_urls: Vec::new(),
        image_text: None,
        is_image_text_low_yield: false,
        published_at: Utc::now(),
    }
}

/// The post's combined text as a single segment, the way the segmenter's
/// identity fallback produces it.
pub fn segment_of(post: &RawPost) -> Segment {
    Segment {
        text: post.combined_text(),
        image_text: post.image_text.clone(),
        published_at: post.published_at,
        index: 0,
    }
}
