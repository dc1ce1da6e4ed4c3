//! Free-food event extraction engine.
//!
//! Takes scraped campus society posts and produces structured event drafts:
//! an ordered hard-filter chain, a rule-first classifier with LLM/vision
//! escalation for the borderline and image-only cases, multi-event text
//! segmentation, and a datetime reconciler that validates the LLM's proposed
//! timestamp against regex evidence from the text itself.

pub mod classifier;
pub mod date;
pub mod escalation;
pub mod extractor;
pub mod filters;
pub mod lexicon;
pub mod location;
pub mod reconcile;
pub mod segmenter;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod time;
pub mod traits;

pub use escalation::ClaudeEscalator;
pub use extractor::ExtractionEngine;
pub use lexicon::Lexicon;
pub use location::CampusMap;
pub use traits::{CallBudget, EscalationGate, FoodClassifier, UnboundedGate, VisionDescriber};
