//! Claude-backed implementations of the collaborator traits.
//!
//! The engine only ever sees [`LlmVerdict`] values parsed leniently from the
//! raw tool payload, so a malformed field degrades to `None` instead of
//! failing the segment. Transport and contract failures surface as
//! `ForageError::Collaborator`, which the pipeline converts into a
//! retryable reject — an event is never fabricated from a failed call.

use ai_client::util::truncate_to_char_boundary;
use ai_client::{Claude, StructuredOutput};
use async_trait::async_trait;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use tracing::warn;

use forage_common::{ForageError, LlmVerdict};

use crate::traits::{FoodClassifier, VerdictWithPayload, VisionDescriber};

const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// Posts are short; anything longer than this is OCR garbage.
const MAX_PROMPT_BYTES: usize = 12_000;

const CLASSIFY_SYSTEM_PROMPT: &str = r#"You judge social media posts from campus societies. Decide whether a post announces an upcoming event where FREE FOOD is provided to general students.

Answer is_food_event = true only when ALL of these hold:
- food or drink is provided at no cost to attendees
- the event is open to general students (not committee/staff only)
- it happens on campus (or the location is unstated)
- it is upcoming, not a recap of a past event

Answer is_food_event = false for: paid events or anything ticketed, nightlife and club nights, off-campus venues, faith-restricted gatherings, giveaways and competitions where food is a prize, and posts with no food at all.

When is_food_event is true, also extract:
- title: a short event title taken from the post
- start_datetime / end_datetime: ISO 8601, only when the post states them; never invent a date or time
- location: the venue exactly as written in the post
- members_only: true when attendance requires society membership

Leave any field you cannot read from the post as null."#;

const VISION_SYSTEM_PROMPT: &str = r#"You read event posters from campus society posts. The caption said little, so the poster image is the primary source.

First transcribe the poster: put every piece of text you can read into image_text, preserving dates, times and room numbers exactly.

Then judge it with the same rules as any post: is_food_event = true only for an upcoming on-campus event with free food open to general students. Paid, ticketed, nightlife, off-campus, faith-restricted, members-closed and past events are all false.

When true, extract title, start_datetime/end_datetime (ISO 8601, only if printed on the poster), location and members_only. Leave unreadable fields null."#;

/// Production escalation collaborator backed by the Anthropic API.
pub struct ClaudeEscalator {
    claude: Claude,
}

impl ClaudeEscalator {
    pub fn new(api_key: &str) -> Self {
        Self {
            claude: Claude::new(api_key, DEFAULT_MODEL),
        }
    }

    pub fn from_env() -> Result<Self, ForageError> {
        let claude = Claude::from_env(DEFAULT_MODEL)
            .map_err(|e| ForageError::Config(e.to_string()))?;
        Ok(Self { claude })
    }

    pub fn with_model(api_key: &str, model: &str) -> Self {
        Self {
            claude: Claude::new(api_key, model),
        }
    }

    fn verdict_from(payload: serde_json::Value) -> VerdictWithPayload {
        let verdict = LlmVerdict::from_payload(&payload);
        if junk_title(verdict.title.as_deref()) {
            // The model reporting its own failure as a title is not an event.
            warn!(title = ?verdict.title, "Filtered junk verdict title");
            return (
                LlmVerdict {
                    is_food_event: false,
                    ..verdict
                },
                payload,
            );
        }
        (verdict, payload)
    }
}

#[async_trait]
impl FoodClassifier for ClaudeEscalator {
    async fn classify_text(&self, text: &str) -> Result<VerdictWithPayload, ForageError> {
        let content = truncate_to_char_boundary(text, MAX_PROMPT_BYTES);
        let payload = self
            .claude
            .extract_raw(
                CLASSIFY_SYSTEM_PROMPT,
                format!("Post text:\n\n{content}"),
                LlmVerdict::tool_schema(),
            )
            .await
            .map_err(|e| ForageError::Collaborator(e.to_string()))?;
        Ok(Self::verdict_from(payload))
    }
}

#[async_trait]
impl VisionDescriber for ClaudeEscalator {
    async fn describe_images(
        &self,
        image_urls: &[String],
        caption: &str,
    ) -> Result<VerdictWithPayload, ForageError> {
        let caption = truncate_to_char_boundary(caption, MAX_PROMPT_BYTES);
        let payload = self
            .claude
            .extract_raw_from_images(
                VISION_SYSTEM_PROMPT,
                image_urls,
                format!("Caption text:\n\n{caption}"),
                LlmVerdict::tool_schema(),
            )
            .await
            .map_err(|e| ForageError::Collaborator(e.to_string()))?;
        Ok(Self::verdict_from(payload))
    }
}

fn junk_title(title: Option<&str>) -> bool {
    let Some(title) = title else {
        return false;
    };
    let lowered = title.to_lowercase();
    ["unable to read", "unable to extract", "no text found", "error"]
        .iter()
        .any(|junk| lowered.contains(junk))
}

/// Cache key for escalation responses: content hash over the segment text,
/// the first image reference, and the reference date. The caller keys its
/// response cache on this so identical input is never re-escalated within
/// the caching window.
pub fn content_key(text: &str, image_ref: Option<&str>, reference_date: NaiveDate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b"\x00");
    hasher.update(image_ref.unwrap_or("").as_bytes());
    hasher.update(b"\x00");
    hasher.update(reference_date.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn junk_title_flips_verdict_to_reject() {
        let payload = json!({
            "is_food_event": true,
            "title": "Unable to read poster text",
        });
        let (verdict, raw) = ClaudeEscalator::verdict_from(payload.clone());
        assert!(!verdict.is_food_event);
        assert_eq!(raw, payload, "raw payload preserved for audit");
    }

    #[test]
    fn normal_title_passes_through() {
        let payload = json!({
            "is_food_event": true,
            "title": "Pizza Night",
            "location": "Newman Building",
        });
        let (verdict, _) = ClaudeEscalator::verdict_from(payload);
        assert!(verdict.is_food_event);
        assert_eq!(verdict.title.as_deref(), Some("Pizza Night"));
    }

    #[test]
    fn content_key_is_stable_and_input_sensitive() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let a = content_key("free pizza", None, day);
        let b = content_key("free pizza", None, day);
        let c = content_key("free pizza", Some("https://x/img.jpg"), day);
        let d = content_key("free pizza", None, day.succ_opt().unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }
}
