use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Input contract ---

/// A scraped social post, as handed over by the scraping/OCR collaborators.
/// Text fields are already UTF-8; decoding is not the engine's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPost {
    /// Platform-scoped post identifier (used for audit logging and cache keys).
    pub post_id: String,
    /// Caption text as published.
    pub text: String,
    /// URLs of attached images, in post order.
    pub image_urls: Vec<String>,
    /// OCR output for the attached images, if OCR ran.
    pub image_text: Option<String>,
    /// True when OCR produced near-empty output for an image-bearing post.
    pub is_image_text_low_yield: bool,
    pub published_at: DateTime<Utc>,
}

impl RawPost {
    /// Caption and OCR text joined into the single body the segmenter works on.
    pub fn combined_text(&self) -> String {
        match self.image_text.as_deref() {
            Some(ocr) if !ocr.trim().is_empty() => format!("{}\n\n{}", self.text, ocr),
            _ => self.text.clone(),
        }
    }
}

/// An independently classifiable slice of a post's combined text.
/// Created only by the segmenter; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub image_text: Option<String>,
    pub published_at: DateTime<Utc>,
    /// Position of this segment within the post (0-based).
    pub index: usize,
}

// --- Filter verdicts ---

/// Why a segment was rejected. Every reject is named — audit logging depends
/// on it, and retry policy keys off `CollaboratorFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Religious,
    PastRecap,
    StaffOnly,
    OtherInstitution,
    OffCampus,
    OnlineOnly,
    Paid,
    Nightlife,
    Giveaway,
    /// Classifier found no food signal at all.
    NoFoodSignal,
    /// The LLM collaborator said this is not a food event.
    LlmDeclined,
    /// The escalation gate refused the call (budget exhausted).
    EscalationBudget,
    /// The LLM/vision collaborator failed (timeout, malformed response).
    CollaboratorFailure,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::Religious => "religious",
            RejectReason::PastRecap => "past_recap",
            RejectReason::StaffOnly => "staff_only",
            RejectReason::OtherInstitution => "other_institution",
            RejectReason::OffCampus => "off_campus",
            RejectReason::OnlineOnly => "online_only",
            RejectReason::Paid => "paid",
            RejectReason::Nightlife => "nightlife",
            RejectReason::Giveaway => "giveaway",
            RejectReason::NoFoodSignal => "no_food_signal",
            RejectReason::LlmDeclined => "llm_declined",
            RejectReason::EscalationBudget => "escalation_budget",
            RejectReason::CollaboratorFailure => "collaborator_failure",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one hard filter, or of the whole chain. A filter either fully
/// accepts or fully rejects — there is no partial application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Pass,
    Reject(RejectReason),
}

impl FilterVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, FilterVerdict::Pass)
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            FilterVerdict::Pass => None,
            FilterVerdict::Reject(r) => Some(*r),
        }
    }
}

// --- Classification ---

/// Which path produced the accept/reject decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Rule,
    Llm,
    Vision,
}

impl std::fmt::Display for ClassificationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassificationSource::Rule => write!(f, "rule"),
            ClassificationSource::Llm => write!(f, "llm"),
            ClassificationSource::Vision => write!(f, "vision"),
        }
    }
}

/// What the LLM/vision collaborator returns for a segment. Parsed leniently:
/// a missing or malformed field becomes its default, never a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LlmVerdict {
    #[serde(default)]
    pub is_food_event: bool,
    #[serde(default)]
    pub title: Option<String>,
    /// ISO 8601 start, to be validated by the reconciler — never trusted as-is.
    #[serde(default)]
    pub start_datetime: Option<String>,
    #[serde(default)]
    pub end_datetime: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Text read off the image by the vision path.
    #[serde(default)]
    pub image_text: Option<String>,
    #[serde(default)]
    pub members_only: bool,
}

impl LlmVerdict {
    /// Field-by-field lenient parse of a collaborator payload. A field of the
    /// wrong JSON type is treated as absent, so one bad field can't poison
    /// the rest of the verdict.
    pub fn from_payload(value: &serde_json::Value) -> Self {
        let get_str = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            is_food_event: value
                .get("is_food_event")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            title: get_str("title"),
            start_datetime: get_str("start_datetime"),
            end_datetime: get_str("end_datetime"),
            location: get_str("location"),
            image_text: get_str("image_text"),
            members_only: value
                .get("members_only")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }
    }
}

/// Terminal decision for one segment.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub is_food_event: bool,
    pub source: ClassificationSource,
    pub reject_reason: Option<RejectReason>,
    /// The collaborator's structured verdict, when an escalation fired.
    pub llm_verdict: Option<LlmVerdict>,
    /// The untrusted raw payload, kept alongside for audit/debugging.
    pub raw_llm_payload: Option<serde_json::Value>,
}

impl ClassificationResult {
    pub fn rule_accept() -> Self {
        Self {
            is_food_event: true,
            source: ClassificationSource::Rule,
            reject_reason: None,
            llm_verdict: None,
            raw_llm_payload: None,
        }
    }

    pub fn rule_reject(reason: RejectReason) -> Self {
        Self {
            is_food_event: false,
            source: ClassificationSource::Rule,
            reject_reason: Some(reason),
            llm_verdict: None,
            raw_llm_payload: None,
        }
    }
}

// --- Date/time evidence ---

/// A calendar date read directly out of the text by the regex extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct DateEvidence {
    pub value: NaiveDate,
    /// Relative trust in the pattern family that matched (0.0-1.0).
    pub confidence_tier: f32,
    /// Which pattern family matched, for audit logging.
    pub pattern_kind: &'static str,
}

/// A clock time read directly out of the text. `end_*` is populated for
/// range expressions ("6-8pm").
#[derive(Debug, Clone, PartialEq)]
pub struct TimeEvidence {
    pub hour: u32,
    pub minute: u32,
    pub end_hour: Option<u32>,
    pub end_minute: Option<u32>,
    pub confidence_tier: f32,
    pub pattern_kind: &'static str,
}

/// The reconciler's authoritative output. `resolved_at = None` means
/// "time unknown" — a valid, displayable state, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledDatetime {
    pub resolved_at: Option<DateTime<Utc>>,
    pub confidence_modifier: f32,
}

impl ReconciledDatetime {
    pub fn unknown() -> Self {
        Self {
            resolved_at: None,
            confidence_modifier: 0.0,
        }
    }
}

// --- Locations ---

/// A campus location resolved against the building alias map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalLocation {
    /// Canonical building identifier (e.g. "newman").
    pub building: String,
    /// Display name for the building.
    pub building_name: String,
    /// Room within the building, when a room code matched (e.g. "Q014").
    pub room: Option<String>,
}

// --- Output contract ---

/// A structured event draft, ready for the downstream dedup/persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    pub id: Uuid,
    pub title: String,
    pub location: Option<CanonicalLocation>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    /// Base score (location found: 1.0, else 0.8) x reconciliation modifier.
    pub confidence_score: f32,
    pub members_only: bool,
    pub source_segment: Segment,
}

/// Audit record for a segment that did not become a draft. Rejected segments
/// never reach persistence; these records exist for logging and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRejection {
    pub segment_index: usize,
    pub reason: RejectReason,
    /// True when the reject came from a collaborator failure or refused
    /// escalation — the caller may re-queue the post instead of recording a
    /// permanent reject.
    pub retryable: bool,
}

/// Everything the engine produced for one post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub drafts: Vec<EventDraft>,
    pub rejections: Vec<SegmentRejection>,
}

impl ExtractionOutcome {
    /// True when any rejection is worth a later retry of the whole post.
    pub fn has_retryable_rejection(&self) -> bool {
        self.rejections.iter().any(|r| r.retryable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn combined_text_joins_caption_and_ocr() {
        let post = RawPost {
            post_id: "p1".to_string(),
            text: "Free pizza!".to_string(),
            image_urls: vec![],
            image_text: Some("Thursday 6pm Newman".to_string()),
            is_image_text_low_yield: false,
            published_at: Utc::now(),
        };
        assert_eq!(post.combined_text(), "Free pizza!\n\nThursday 6pm Newman");
    }

    #[test]
    fn combined_text_skips_blank_ocr() {
        let post = RawPost {
            post_id: "p1".to_string(),
            text: "Free pizza!".to_string(),
            image_urls: vec!["https://example.com/a.jpg".to_string()],
            image_text: Some("  ".to_string()),
            is_image_text_low_yield: true,
            published_at: Utc::now(),
        };
        assert_eq!(post.combined_text(), "Free pizza!");
    }

    #[test]
    fn verdict_lenient_parse_tolerates_malformed_fields() {
        let payload = json!({
            "is_food_event": true,
            "title": 42,
            "start_datetime": "2026-03-06T18:00:00Z",
            "location": null,
            "members_only": "yes"
        });
        let verdict = LlmVerdict::from_payload(&payload);
        assert!(verdict.is_food_event);
        assert!(verdict.title.is_none(), "non-string title becomes None");
        assert_eq!(
            verdict.start_datetime.as_deref(),
            Some("2026-03-06T18:00:00Z")
        );
        assert!(verdict.location.is_none());
        assert!(!verdict.members_only, "non-bool members_only becomes false");
    }

    #[test]
    fn verdict_lenient_parse_of_empty_object() {
        let verdict = LlmVerdict::from_payload(&json!({}));
        assert!(!verdict.is_food_event);
        assert!(verdict.title.is_none());
    }

    #[test]
    fn reject_reason_serializes_snake_case() {
        let j = serde_json::to_string(&RejectReason::OffCampus).unwrap();
        assert_eq!(j, "\"off_campus\"");
    }

    #[test]
    fn filter_verdict_reason_accessors() {
        assert!(FilterVerdict::Pass.passed());
        assert_eq!(FilterVerdict::Pass.reason(), None);
        let r = FilterVerdict::Reject(RejectReason::Paid);
        assert!(!r.passed());
        assert_eq!(r.reason(), Some(RejectReason::Paid));
    }
}
