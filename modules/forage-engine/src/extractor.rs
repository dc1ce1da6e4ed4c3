//! The per-post extraction pipeline.
//!
//! Segment → classify → fold vision text → regex evidence → reconcile →
//! canonicalize → draft. Stateless across posts; every entity is created and
//! fully consumed within one `extract` call, so posts can be processed in
//! parallel with no coordination. Only the escalation gate is shared.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use forage_common::{
    ClassificationResult, EngineConfig, EventDraft, ExtractionOutcome, ForageError, LlmVerdict,
    RawPost, RejectReason, Segment, SegmentRejection, TimeEvidence,
};

use crate::classifier::PrimaryClassifier;
use crate::lexicon::Lexicon;
use crate::location::CampusMap;
use crate::reconcile::{at_time, parse_llm_timestamp, reconcile};
use crate::segmenter;
use crate::time::extract_time;
use crate::traits::{EscalationGate, FoodClassifier, VisionDescriber};

const BASE_SCORE_WITH_LOCATION: f32 = 1.0;
const BASE_SCORE_WITHOUT_LOCATION: f32 = 0.8;

const MAX_TITLE_CHARS: usize = 80;

pub struct ExtractionEngine {
    lexicon: Lexicon,
    campus: CampusMap,
    config: EngineConfig,
    llm: Arc<dyn FoodClassifier>,
    vision: Arc<dyn VisionDescriber>,
    gate: Arc<dyn EscalationGate>,
}

impl ExtractionEngine {
    pub fn new(
        llm: Arc<dyn FoodClassifier>,
        vision: Arc<dyn VisionDescriber>,
        gate: Arc<dyn EscalationGate>,
    ) -> Self {
        Self {
            lexicon: Lexicon::default_campus(),
            campus: CampusMap::default_campus(),
            config: EngineConfig::default(),
            llm,
            vision,
            gate,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = lexicon;
        self
    }

    /// Process one post into zero or more event drafts plus audit records
    /// for every rejected segment.
    pub async fn extract(&self, post: &RawPost, reference_time: DateTime<Utc>) -> ExtractionOutcome {
        let combined = post.combined_text();
        let segments: Vec<Segment> = segmenter::segment(&combined, &self.config)
            .into_iter()
            .enumerate()
            .map(|(index, text)| Segment {
                text,
                image_text: post.image_text.clone(),
                published_at: post.published_at,
                index,
            })
            .collect();

        let classifier = PrimaryClassifier {
            lexicon: &self.lexicon,
            campus: &self.campus,
            config: &self.config,
            llm: self.llm.as_ref(),
            vision: self.vision.as_ref(),
            gate: self.gate.as_ref(),
        };

        let mut outcome = ExtractionOutcome::default();

        for segment in segments {
            match classifier.classify(&segment, post).await {
                Ok(result) if result.is_food_event => {
                    let draft = self.build_draft(segment, &result, reference_time);
                    info!(
                        post_id = post.post_id.as_str(),
                        title = draft.title.as_str(),
                        confidence = draft.confidence_score,
                        source = %result.source,
                        "Extracted event draft"
                    );
                    outcome.drafts.push(draft);
                }
                Ok(result) => {
                    let reason = result
                        .reject_reason
                        .unwrap_or(RejectReason::NoFoodSignal);
                    outcome.rejections.push(SegmentRejection {
                        segment_index: segment.index,
                        reason,
                        retryable: reason == RejectReason::EscalationBudget,
                    });
                }
                Err(ForageError::Collaborator(e)) => {
                    // Fail closed, but distinguishably: the caller may retry
                    // the whole post instead of recording a permanent reject.
                    warn!(
                        post_id = post.post_id.as_str(),
                        segment = segment.index,
                        error = e.as_str(),
                        "Collaborator failure degraded to retryable reject"
                    );
                    outcome.rejections.push(SegmentRejection {
                        segment_index: segment.index,
                        reason: RejectReason::CollaboratorFailure,
                        retryable: true,
                    });
                }
                Err(e) => {
                    warn!(
                        post_id = post.post_id.as_str(),
                        segment = segment.index,
                        error = %e,
                        "Unexpected engine error degraded to retryable reject"
                    );
                    outcome.rejections.push(SegmentRejection {
                        segment_index: segment.index,
                        reason: RejectReason::CollaboratorFailure,
                        retryable: true,
                    });
                }
            }
        }

        outcome
    }

    fn build_draft(
        &self,
        segment: Segment,
        result: &ClassificationResult,
        reference_time: DateTime<Utc>,
    ) -> EventDraft {
        let verdict = result.llm_verdict.clone().unwrap_or_default();

        // Vision descriptions carry information only visible in the image;
        // folding them in before evidence extraction lets the regex
        // extractors read poster dates and rooms.
        let working_text = match verdict.image_text.as_deref() {
            Some(description) if !description.trim().is_empty() => {
                format!("{}\n\n{}", segment.text, description)
            }
            _ => segment.text.clone(),
        };

        let reconciled = reconcile(
            verdict.start_datetime.as_deref(),
            &working_text,
            reference_time,
            &self.config,
        );
        let time_evidence = extract_time(&working_text);

        let end_at = self.resolve_end(
            &verdict,
            reconciled.resolved_at,
            time_evidence.as_ref(),
            reference_time,
        );

        let location = self
            .campus
            .canonicalize(verdict.location.as_deref())
            .or_else(|| self.campus.scan(&working_text));

        let base_score = if location.is_some() {
            BASE_SCORE_WITH_LOCATION
        } else {
            BASE_SCORE_WITHOUT_LOCATION
        };

        EventDraft {
            id: Uuid::new_v4(),
            title: verdict
                .title
                .clone()
                .unwrap_or_else(|| derive_title(&segment.text)),
            location,
            start_at: reconciled.resolved_at,
            end_at,
            confidence_score: base_score * reconciled.confidence_modifier,
            members_only: verdict.members_only,
            source_segment: segment,
        }
    }

    /// End time: the LLM's end when it validates against the resolved start,
    /// else the regex range's end, else none.
    fn resolve_end(
        &self,
        verdict: &LlmVerdict,
        start_at: Option<DateTime<Utc>>,
        time_evidence: Option<&TimeEvidence>,
        reference_time: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let start = start_at?;

        if let Some(raw) = verdict.end_datetime.as_deref() {
            if let Some((end, _)) = parse_llm_timestamp(raw) {
                let window = Duration::days(self.config.future_window_days);
                if end > start && end - start < Duration::hours(24) && end <= reference_time + window
                {
                    return Some(end);
                }
                warn!(%end, %start, "Discarded implausible LLM end datetime");
            }
        }

        let evidence = time_evidence?;
        let (end_hour, end_minute) = (evidence.end_hour?, evidence.end_minute?);
        let end_time = NaiveTime::from_hms_opt(end_hour, end_minute, 0)?;
        let mut end = at_time(start.date_naive(), end_time);
        if end <= start {
            // Ranges like "10pm till 1am" spill into the next day.
            end += Duration::days(1);
        }
        Some(end)
    }
}

/// Title fallback when the LLM offered none: the first non-empty line,
/// stripped of decoration and truncated on a character boundary.
fn derive_title(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| l.chars().any(|c| c.is_alphanumeric()))
        .unwrap_or("");
    let cleaned = line
        .trim_matches(|c: char| !c.is_alphanumeric())
        .trim()
        .to_string();
    if cleaned.is_empty() {
        return "Free food event".to_string();
    }
    cleaned.chars().take(MAX_TITLE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_title_takes_first_meaningful_line() {
        let text = "🍕🍕🍕\nFREE PIZZA FRIDAY\ndetails below";
        assert_eq!(derive_title(text), "FREE PIZZA FRIDAY");
    }

    #[test]
    fn derive_title_strips_decoration() {
        assert_eq!(derive_title("*** Pizza Night ***"), "Pizza Night");
    }

    #[test]
    fn derive_title_truncates_long_lines() {
        let long = "a".repeat(200);
        assert_eq!(derive_title(&long).chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn derive_title_has_fallback() {
        assert_eq!(derive_title("~~~\n\n"), "Free food event");
    }
}
