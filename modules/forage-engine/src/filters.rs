//! The hard filter chain: ordered category-exclusion rules.
//!
//! Each filter fully accepts or fully rejects; the chain short-circuits on
//! the first reject and returns that filter's named reason for audit
//! logging. Cheap, high-precision filters run first so a reject never costs
//! an LLM escalation. The chain only encodes category exclusions — absence
//! of a food keyword is the classifier's reject, not this chain's.

use std::sync::LazyLock;

use regex::Regex;

use forage_common::{EngineConfig, FilterVerdict, RejectReason};

use crate::lexicon::{word_hit, Lexicon};
use crate::location::CampusMap;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything a filter predicate may look at. Built once per evaluation.
pub struct FilterContext<'a> {
    /// Lowercased segment text.
    pub lowered: String,
    pub lexicon: &'a Lexicon,
    pub campus: &'a CampusMap,
    pub config: &'a EngineConfig,
}

impl<'a> FilterContext<'a> {
    pub fn new(
        text: &str,
        lexicon: &'a Lexicon,
        campus: &'a CampusMap,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            lowered: text.to_lowercase(),
            lexicon,
            campus,
            config,
        }
    }

    fn any_hit(&self, list: &[String]) -> bool {
        list.iter().any(|term| word_hit(&self.lowered, term).is_some())
    }
}

// ---------------------------------------------------------------------------
// The chain
// ---------------------------------------------------------------------------

type FilterFn = for<'a> fn(&FilterContext<'a>) -> bool;

/// Fixed evaluation order, first-reject-wins. The order itself is part of
/// the contract and is exercised by tests.
pub const FILTER_CHAIN: &[(RejectReason, FilterFn)] = &[
    (RejectReason::Religious, religious_event),
    (RejectReason::PastRecap, past_recap),
    (RejectReason::StaffOnly, staff_only),
    (RejectReason::OtherInstitution, other_institution),
    (RejectReason::OffCampus, off_campus_venue),
    (RejectReason::OnlineOnly, online_only),
    (RejectReason::Paid, paid_event),
    (RejectReason::Nightlife, nightlife),
    (RejectReason::Giveaway, giveaway_contest),
];

/// Run the chain over a segment's text.
pub fn evaluate(
    text: &str,
    lexicon: &Lexicon,
    campus: &CampusMap,
    config: &EngineConfig,
) -> FilterVerdict {
    let ctx = FilterContext::new(text, lexicon, campus, config);
    for (reason, fires) in FILTER_CHAIN {
        if fires(&ctx) {
            return FilterVerdict::Reject(*reason);
        }
    }
    FilterVerdict::Pass
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

fn religious_event(ctx: &FilterContext) -> bool {
    // Multi-word phrases only; a bare "mass" or "faith" never fires.
    ctx.any_hit(&ctx.lexicon.religious_phrases)
}

fn past_recap(ctx: &FilterContext) -> bool {
    ctx.any_hit(&ctx.lexicon.recap_markers)
}

fn staff_only(ctx: &FilterContext) -> bool {
    ctx.any_hit(&ctx.lexicon.staff_only)
}

fn other_institution(ctx: &FilterContext) -> bool {
    ctx.any_hit(&ctx.lexicon.other_institutions)
}

fn off_campus_venue(ctx: &FilterContext) -> bool {
    ctx.any_hit(&ctx.lexicon.off_campus_venues)
}

fn online_only(ctx: &FilterContext) -> bool {
    ctx.any_hit(&ctx.lexicon.online_markers) && !ctx.campus.mentions_campus_location(&ctx.lowered)
}

/// Currency amounts, with an optional decimal part: "€5", "€ 7.50", "5 euro".
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:€\s*(\d+(?:[.,]\d{1,2})?))|(?:\b(\d+(?:[.,]\d{1,2})?)\s*(?:euro|eur)\b)")
        .expect("amount regex")
});

/// Words that mark a small amount as a membership fee rather than a ticket.
const MEMBERSHIP_WORDS: &[&str] = &["membership", "members fee", "member fee", "to join", "joining fee"];

/// Compound paid-event logic:
/// 1. any free-override phrase neutralises every paid signal;
/// 2. explicit ticket/admission language rejects;
/// 3. an amount above the membership cap rejects;
/// 4. an amount at or below the cap passes only as a membership fee.
fn paid_event(ctx: &FilterContext) -> bool {
    if ctx.any_hit(&ctx.lexicon.free_overrides) {
        return false;
    }

    if ctx.any_hit(&ctx.lexicon.paid_markers) {
        return true;
    }

    let is_membership = MEMBERSHIP_WORDS
        .iter()
        .any(|w| word_hit(&ctx.lowered, w).is_some());

    for caps in AMOUNT_RE.captures_iter(&ctx.lowered) {
        let raw = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().replace(',', "."));
        let Some(amount) = raw.and_then(|s| s.parse::<f64>().ok()) else {
            continue;
        };
        if amount > ctx.config.membership_fee_cap {
            return true;
        }
        if !is_membership {
            // A small amount with no membership context and no other paid
            // marker: "€2 at the door" style wording still implies payment.
            return true;
        }
    }

    false
}

fn nightlife(ctx: &FilterContext) -> bool {
    ctx.any_hit(&ctx.lexicon.nightlife)
}

fn giveaway_contest(ctx: &FilterContext) -> bool {
    ctx.any_hit(&ctx.lexicon.giveaway_markers)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixtures {
        lexicon: Lexicon,
        campus: CampusMap,
        config: EngineConfig,
    }

    impl Fixtures {
        fn new() -> Self {
            Self {
                lexicon: Lexicon::default_campus(),
                campus: CampusMap::default_campus(),
                config: EngineConfig::default(),
            }
        }

        fn verdict(&self, text: &str) -> FilterVerdict {
            evaluate(text, &self.lexicon, &self.campus, &self.config)
        }
    }

    #[test]
    fn clean_food_post_passes() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Free pizza this Friday at 6pm in the Newman!"),
            FilterVerdict::Pass
        );
    }

    #[test]
    fn paid_tickets_reject_despite_food_keyword() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Pizza party! Tickets: €20 at the door"),
            FilterVerdict::Reject(RejectReason::Paid)
        );
    }

    #[test]
    fn free_override_neutralises_paid_signal() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Free entry! No ticket needed, pizza provided"),
            FilterVerdict::Pass
        );
    }

    #[test]
    fn small_membership_fee_passes() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Pizza night! €2 membership to join on the day"),
            FilterVerdict::Pass
        );
    }

    #[test]
    fn large_amount_rejects_even_with_membership_wording() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("€25 membership covers pizza all year"),
            FilterVerdict::Reject(RejectReason::Paid)
        );
    }

    #[test]
    fn small_amount_without_membership_context_rejects() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Pizza slices €2 each"),
            FilterVerdict::Reject(RejectReason::Paid)
        );
    }

    #[test]
    fn religious_phrase_rejects_but_bare_word_does_not() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Bible study with snacks provided"),
            FilterVerdict::Reject(RejectReason::Religious)
        );
        // "mass" alone is a common word ("critical mass", "mass email").
        assert_eq!(
            f.verdict("mass email going out with free pizza details"),
            FilterVerdict::Pass
        );
    }

    #[test]
    fn past_recap_rejects() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Thanks to everyone who came for pizza last night!"),
            FilterVerdict::Reject(RejectReason::PastRecap)
        );
    }

    #[test]
    fn committee_only_rejects() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Committee only: pizza while we plan the semester"),
            FilterVerdict::Reject(RejectReason::StaffOnly)
        );
    }

    #[test]
    fn other_institution_rejects() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Joint pizza night over at Trinity"),
            FilterVerdict::Reject(RejectReason::OtherInstitution)
        );
    }

    #[test]
    fn off_campus_venue_rejects() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Free pizza before we head to Coppers"),
            FilterVerdict::Reject(RejectReason::OffCampus)
        );
    }

    #[test]
    fn online_only_rejects_without_campus_location() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Zoom social with snacks provided, link in bio"),
            FilterVerdict::Reject(RejectReason::OnlineOnly)
        );
    }

    #[test]
    fn online_marker_with_campus_room_passes() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Hybrid talk, pizza in Q014 and a Zoom link for remote folks"),
            FilterVerdict::Pass
        );
    }

    #[test]
    fn nightlife_rejects() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Club night afterparty, free food at pres"),
            FilterVerdict::Reject(RejectReason::Nightlife)
        );
    }

    #[test]
    fn giveaway_rejects() {
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Pizza giveaway! Tag a friend to enter"),
            FilterVerdict::Reject(RejectReason::Giveaway)
        );
    }

    #[test]
    fn no_food_keyword_is_not_this_chains_reject() {
        // Category-clean text with no food at all still passes the chain —
        // the classifier owns the no-food reject.
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Weekly committee minutes posted on the noticeboard"),
            FilterVerdict::Pass
        );
    }

    #[test]
    fn chain_pass_implies_no_individual_filter_fires() {
        // Chain-composition soundness: Pass means every predicate declined.
        let f = Fixtures::new();
        let text = "Free pizza this Friday at 6pm in the Newman!";
        let ctx = FilterContext::new(text, &f.lexicon, &f.campus, &f.config);
        assert_eq!(f.verdict(text), FilterVerdict::Pass);
        for (reason, fires) in FILTER_CHAIN {
            assert!(
                !fires(&ctx),
                "filter {reason} fired on text the chain passed"
            );
        }
    }

    #[test]
    fn first_reject_wins_in_chain_order() {
        // Both religious and paid would fire; religious sits earlier.
        let f = Fixtures::new();
        assert_eq!(
            f.verdict("Bible study, tickets €10"),
            FilterVerdict::Reject(RejectReason::Religious)
        );
    }
}
