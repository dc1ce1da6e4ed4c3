//! The primary accept/reject decision for one segment.
//!
//! Decision ladder, first match wins:
//! 1. the hard filter chain (any reject is final — the LLM cannot override);
//! 2. strong food keyword → deterministic accept;
//! 3. weak keyword with a context modifier in proximity → deterministic accept;
//! 4. weak keyword alone → LLM escalation;
//! 5. image-only post with low-yield OCR → vision escalation, description
//!    folded into the working text for downstream evidence extraction;
//! 6. nothing food-shaped → reject without spending a call.
//!
//! Every terminal decision is attributable: rejects carry a named reason and
//! escalation outcomes are logged with their source.

use tracing::{debug, info, warn};

use forage_common::{
    ClassificationResult, ClassificationSource, EngineConfig, FilterVerdict, ForageError, RawPost,
    RejectReason, Segment,
};

use crate::filters;
use crate::lexicon::Lexicon;
use crate::location::CampusMap;
use crate::traits::{EscalationGate, FoodClassifier, VisionDescriber};

pub struct PrimaryClassifier<'a> {
    pub lexicon: &'a Lexicon,
    pub campus: &'a CampusMap,
    pub config: &'a EngineConfig,
    pub llm: &'a dyn FoodClassifier,
    pub vision: &'a dyn VisionDescriber,
    pub gate: &'a dyn EscalationGate,
}

impl PrimaryClassifier<'_> {
    /// Classify one segment. `Err` means a collaborator failed — the caller
    /// must fail closed (reject) and mark the segment retryable.
    pub async fn classify(
        &self,
        segment: &Segment,
        post: &RawPost,
    ) -> Result<ClassificationResult, ForageError> {
        let lowered = segment.text.to_lowercase();

        // Step 1: category exclusions. Cheap, high-precision, and final.
        let verdict = filters::evaluate(&segment.text, self.lexicon, self.campus, self.config);
        if let FilterVerdict::Reject(reason) = verdict {
            info!(
                post_id = post.post_id.as_str(),
                segment = segment.index,
                reason = %reason,
                "Segment rejected by hard filter chain"
            );
            return Ok(ClassificationResult::rule_reject(reason));
        }

        // Step 2: a strong keyword is sufficient on its own.
        if let Some(term) = self.lexicon.strong_food_hit(&lowered) {
            debug!(
                post_id = post.post_id.as_str(),
                segment = segment.index,
                term,
                "Accepted on strong food keyword"
            );
            return Ok(ClassificationResult::rule_accept());
        }

        // Steps 3 and 4: weak keyword, with or without a modifier nearby.
        if let Some((pos, term)) = self.lexicon.weak_food_hit(&lowered) {
            if self
                .lexicon
                .modifier_near(&lowered, pos, self.config.modifier_window_chars)
            {
                debug!(
                    post_id = post.post_id.as_str(),
                    segment = segment.index,
                    term,
                    "Accepted on weak keyword with context modifier"
                );
                return Ok(ClassificationResult::rule_accept());
            }
            return self.escalate_text(segment, post).await;
        }

        // Step 5: nothing in the text, but the images may say more.
        if post.is_image_text_low_yield && !post.image_urls.is_empty() {
            return self.escalate_vision(segment, post).await;
        }

        // Step 6: no food signal, no images worth a call.
        Ok(ClassificationResult::rule_reject(RejectReason::NoFoodSignal))
    }

    async fn escalate_text(
        &self,
        segment: &Segment,
        post: &RawPost,
    ) -> Result<ClassificationResult, ForageError> {
        if !self.gate.try_acquire() {
            warn!(
                post_id = post.post_id.as_str(),
                segment = segment.index,
                "Escalation budget exhausted; rejecting without call"
            );
            return Ok(ClassificationResult::rule_reject(
                RejectReason::EscalationBudget,
            ));
        }

        let (verdict, payload) = self.llm.classify_text(&segment.text).await?;
        info!(
            post_id = post.post_id.as_str(),
            segment = segment.index,
            accepted = verdict.is_food_event,
            "LLM escalation verdict"
        );

        let (is_food_event, reject_reason) = if verdict.is_food_event {
            (true, None)
        } else {
            (false, Some(RejectReason::LlmDeclined))
        };
        Ok(ClassificationResult {
            is_food_event,
            source: ClassificationSource::Llm,
            reject_reason,
            llm_verdict: Some(verdict),
            raw_llm_payload: Some(payload),
        })
    }

    async fn escalate_vision(
        &self,
        segment: &Segment,
        post: &RawPost,
    ) -> Result<ClassificationResult, ForageError> {
        if !self.gate.try_acquire() {
            warn!(
                post_id = post.post_id.as_str(),
                segment = segment.index,
                "Escalation budget exhausted; rejecting without vision call"
            );
            return Ok(ClassificationResult::rule_reject(
                RejectReason::EscalationBudget,
            ));
        }

        let (verdict, payload) = self
            .vision
            .describe_images(&post.image_urls, &segment.text)
            .await?;
        info!(
            post_id = post.post_id.as_str(),
            segment = segment.index,
            accepted = verdict.is_food_event,
            "Vision escalation verdict"
        );

        // The vision description is new text the chain never saw. The LLM
        // cannot override a reject, so the chain gets a second pass over it.
        if let Some(description) = verdict.image_text.as_deref() {
            let chain =
                filters::evaluate(description, self.lexicon, self.campus, self.config);
            if let FilterVerdict::Reject(reason) = chain {
                info!(
                    post_id = post.post_id.as_str(),
                    segment = segment.index,
                    reason = %reason,
                    "Vision description rejected by hard filter chain"
                );
                return Ok(ClassificationResult {
                    is_food_event: false,
                    source: ClassificationSource::Vision,
                    reject_reason: Some(reason),
                    llm_verdict: Some(verdict),
                    raw_llm_payload: Some(payload),
                });
            }
        }

        let (is_food_event, reject_reason) = if verdict.is_food_event {
            (true, None)
        } else {
            (false, Some(RejectReason::LlmDeclined))
        };
        Ok(ClassificationResult {
            is_food_event,
            source: ClassificationSource::Vision,
            reject_reason,
            llm_verdict: Some(verdict),
            raw_llm_payload: Some(payload),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{post_with_text, segment_of, MockLlm, MockVision};
    use crate::traits::CallBudget;

    struct Fixture {
        lexicon: Lexicon,
        campus: CampusMap,
        config: EngineConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                lexicon: Lexicon::default_campus(),
                campus: CampusMap::default_campus(),
                config: EngineConfig::default(),
            }
        }
    }

    async fn classify(
        fixture: &Fixture,
        llm: &MockLlm,
        vision: &MockVision,
        gate: &dyn EscalationGate,
        post: &RawPost,
    ) -> Result<ClassificationResult, ForageError> {
        let classifier = PrimaryClassifier {
            lexicon: &fixture.lexicon,
            campus: &fixture.campus,
            config: &fixture.config,
            llm,
            vision,
            gate,
        };
        let segment = segment_of(post);
        classifier.classify(&segment, post).await
    }

    #[tokio::test]
    async fn strong_keyword_accepts_without_any_call() {
        let f = Fixture::new();
        let llm = MockLlm::declining();
        let vision = MockVision::declining();
        let gate = CallBudget::new(10);

        let post = post_with_text("Free pizza this Friday in the Newman at 6pm!");
        let result = classify(&f, &llm, &vision, &gate, &post).await.unwrap();

        assert!(result.is_food_event);
        assert_eq!(result.source, ClassificationSource::Rule);
        assert_eq!(llm.calls(), 0);
        assert_eq!(vision.calls(), 0);
    }

    #[tokio::test]
    async fn filter_reject_precedes_strong_keyword() {
        let f = Fixture::new();
        let llm = MockLlm::accepting_default();
        let vision = MockVision::declining();
        let gate = CallBudget::new(10);

        let post = post_with_text("Free pizza! Tickets: €20");
        let result = classify(&f, &llm, &vision, &gate, &post).await.unwrap();

        assert!(!result.is_food_event);
        assert_eq!(result.reject_reason, Some(RejectReason::Paid));
        assert_eq!(llm.calls(), 0, "a chain reject must never cost a call");
    }

    #[tokio::test]
    async fn weak_keyword_with_modifier_accepts_deterministically() {
        let f = Fixture::new();
        let llm = MockLlm::declining();
        let vision = MockVision::declining();
        let gate = CallBudget::new(10);

        let post = post_with_text("AGM this Thursday, tea and biscuits included, room Q014");
        let result = classify(&f, &llm, &vision, &gate, &post).await.unwrap();

        assert!(result.is_food_event);
        assert_eq!(result.source, ClassificationSource::Rule);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn borderline_weak_keyword_escalates_to_llm() {
        let f = Fixture::new();
        let llm = MockLlm::accepting_default();
        let vision = MockVision::declining();
        let gate = CallBudget::new(10);

        let post = post_with_text("Come along Thursday, there will be cake at the meeting");
        let result = classify(&f, &llm, &vision, &gate, &post).await.unwrap();

        assert!(result.is_food_event);
        assert_eq!(result.source, ClassificationSource::Llm);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn llm_decline_is_a_named_reject() {
        let f = Fixture::new();
        let llm = MockLlm::declining();
        let vision = MockVision::declining();
        let gate = CallBudget::new(10);

        let post = post_with_text("There will be cake at the meeting");
        let result = classify(&f, &llm, &vision, &gate, &post).await.unwrap();

        assert!(!result.is_food_event);
        assert_eq!(result.reject_reason, Some(RejectReason::LlmDeclined));
        assert!(result.raw_llm_payload.is_some(), "payload kept for audit");
    }

    #[tokio::test]
    async fn budget_exhaustion_rejects_without_call() {
        let f = Fixture::new();
        let llm = MockLlm::accepting_default();
        let vision = MockVision::declining();
        let gate = CallBudget::new(0);

        let post = post_with_text("There will be cake at the meeting");
        let result = classify(&f, &llm, &vision, &gate, &post).await.unwrap();

        assert!(!result.is_food_event);
        assert_eq!(result.reject_reason, Some(RejectReason::EscalationBudget));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn collaborator_failure_propagates_as_error() {
        let f = Fixture::new();
        let llm = MockLlm::failing();
        let vision = MockVision::declining();
        let gate = CallBudget::new(10);

        let post = post_with_text("There will be cake at the meeting");
        let result = classify(&f, &llm, &vision, &gate, &post).await;

        assert!(matches!(result, Err(ForageError::Collaborator(_))));
    }

    #[tokio::test]
    async fn image_only_post_escalates_to_vision() {
        let f = Fixture::new();
        let llm = MockLlm::declining();
        let vision = MockVision::accepting_with_description(
            "FREE PIZZA Friday 6pm Newman Building, all welcome",
        );
        let gate = CallBudget::new(10);

        let mut post = post_with_text("link in bio");
        post.image_urls = vec!["https://example.com/poster.jpg".to_string()];
        post.is_image_text_low_yield = true;

        let result = classify(&f, &llm, &vision, &gate, &post).await.unwrap();

        assert!(result.is_food_event);
        assert_eq!(result.source, ClassificationSource::Vision);
        assert_eq!(vision.calls(), 1);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn vision_description_cannot_override_chain_reject() {
        let f = Fixture::new();
        let llm = MockLlm::declining();
        let vision = MockVision::accepting_with_description(
            "PIZZA NIGHT, tickets €15 at the door, Friday 8pm",
        );
        let gate = CallBudget::new(10);

        let mut post = post_with_text("big one this week");
        post.image_urls = vec!["https://example.com/poster.jpg".to_string()];
        post.is_image_text_low_yield = true;

        let result = classify(&f, &llm, &vision, &gate, &post).await.unwrap();

        assert!(!result.is_food_event);
        assert_eq!(result.reject_reason, Some(RejectReason::Paid));
        assert_eq!(result.source, ClassificationSource::Vision);
    }

    #[tokio::test]
    async fn no_signal_no_images_rejects_without_call() {
        let f = Fixture::new();
        let llm = MockLlm::accepting_default();
        let vision = MockVision::accepting_with_description("anything");
        let gate = CallBudget::new(10);

        let post = post_with_text("Committee minutes from this week are on the noticeboard");
        let result = classify(&f, &llm, &vision, &gate, &post).await.unwrap();

        assert!(!result.is_food_event);
        assert_eq!(result.reject_reason, Some(RejectReason::NoFoodSignal));
        assert_eq!(llm.calls(), 0);
        assert_eq!(vision.calls(), 0);
    }
}
