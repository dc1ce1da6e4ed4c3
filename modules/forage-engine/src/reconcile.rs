//! Datetime reconciliation: merging an LLM-proposed timestamp with regex
//! evidence extracted from the same text.
//!
//! The LLM is a hint provider, never a sole source of truth for temporal
//! facts. Deterministic textual evidence wins every conflict, and an LLM
//! date with zero date-shaped text behind it is discarded outright — a
//! model inventing a date from world knowledge must never survive.
//!
//! Precedence table (confidence modifier):
//! - LLM and regex dates agree within 1 day  → LLM's full timestamp (1.0)
//! - LLM date only                           → LLM's validated timestamp (0.75)
//! - regex date only                         → regex date + regex time/noon (0.85)
//! - disagree by more than 1 day             → regex date wins (0.85)
//! - neither                                 → resolved_at = None (0.0)

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use tracing::warn;

use forage_common::{EngineConfig, ReconciledDatetime};

use crate::date::{extract_date, has_date_pattern};
use crate::time::{extract_time, has_time_pattern};

const MODIFIER_AGREEMENT: f32 = 1.0;
const MODIFIER_LLM_ONLY: f32 = 0.75;
const MODIFIER_REGEX_ONLY: f32 = 0.85;
const MODIFIER_DISAGREEMENT: f32 = 0.85;

/// Neutral midday stand-in when a date is known but no clock time is.
const NEUTRAL_HOUR: u32 = 12;

/// The LLM's timestamp after validation, plus whether its clock time is
/// worth anything: a stated clock with time-shaped text behind it.
struct LlmStamp {
    at: DateTime<Utc>,
    trusted_clock: bool,
}

/// Merge an LLM-proposed start timestamp with regex date/time evidence from
/// `text`. `llm_datetime` is the raw collaborator string; parsing and every
/// validation step happen here, never upstream.
pub fn reconcile(
    llm_datetime: Option<&str>,
    text: &str,
    reference: DateTime<Utc>,
    config: &EngineConfig,
) -> ReconciledDatetime {
    let llm = validated_llm_datetime(llm_datetime, text, reference, config);
    let regex_date = extract_date(text, reference, config);
    let regex_time = extract_time(text);

    match (llm, regex_date) {
        (Some(llm), Some(date_ev)) => {
            let gap = (llm.at.date_naive() - date_ev.value).num_days().abs();
            if gap <= 1 {
                ReconciledDatetime {
                    resolved_at: Some(llm.at),
                    confidence_modifier: MODIFIER_AGREEMENT,
                }
            } else {
                // Disagreement: the regex date wins, combined with the LLM's
                // time-of-day when it stated one, else the regex time.
                warn!(
                    llm = %llm.at,
                    regex = %date_ev.value,
                    gap_days = gap,
                    "LLM and regex dates disagree; trusting the regex date"
                );
                let time = if llm.trusted_clock {
                    llm.at.time()
                } else if let Some(ref t) = regex_time {
                    NaiveTime::from_hms_opt(t.hour, t.minute, 0)
                        .unwrap_or_else(neutral_midday)
                } else {
                    neutral_midday()
                };
                ReconciledDatetime {
                    resolved_at: Some(at_time(date_ev.value, time)),
                    confidence_modifier: MODIFIER_DISAGREEMENT,
                }
            }
        }
        (Some(llm), None) => ReconciledDatetime {
            resolved_at: Some(llm.at),
            confidence_modifier: MODIFIER_LLM_ONLY,
        },
        (None, Some(date_ev)) => {
            let time = regex_time
                .as_ref()
                .and_then(|t| NaiveTime::from_hms_opt(t.hour, t.minute, 0))
                .unwrap_or_else(neutral_midday);
            ReconciledDatetime {
                resolved_at: Some(at_time(date_ev.value, time)),
                confidence_modifier: MODIFIER_REGEX_ONLY,
            }
        }
        (None, None) => ReconciledDatetime::unknown(),
    }
}

/// Parse and validate the LLM's proposed timestamp. Returns `None` when it
/// is absent, unparsable, stale, implausibly far out, or textually
/// unsupported (the hallucination guard).
fn validated_llm_datetime(
    llm_datetime: Option<&str>,
    text: &str,
    reference: DateTime<Utc>,
    config: &EngineConfig,
) -> Option<LlmStamp> {
    let raw = llm_datetime?;
    let (mut ts, stated_clock) = parse_llm_timestamp(raw)?;

    if ts < reference - chrono::Duration::hours(config.llm_past_grace_hours) {
        warn!(llm = %ts, "Discarded LLM datetime: in the past");
        return None;
    }
    if ts > reference + chrono::Duration::days(config.future_window_days) {
        warn!(llm = %ts, "Discarded LLM datetime: beyond plausibility window");
        return None;
    }
    if !has_date_pattern(text) {
        // No date-shaped text at all: the model made the date up.
        warn!(llm = %ts, "Discarded LLM datetime: no date evidence in text");
        return None;
    }

    let trusted_clock = stated_clock && has_time_pattern(text);
    if !trusted_clock && ts.time() != neutral_midday() {
        // The date has textual support but the clock time does not — strip
        // the possibly-hallucinated time and fall back to neutral midday.
        ts = at_time(ts.date_naive(), neutral_midday());
    }

    Some(LlmStamp {
        at: ts,
        trusted_clock,
    })
}

/// Accept RFC 3339, or a bare `YYYY-MM-DDTHH:MM[:SS]` (LLMs frequently omit
/// the offset), or a bare date. Anything else is treated as absent. The
/// second value is whether the input stated a clock time at all.
pub(crate) fn parse_llm_timestamp(raw: &str) -> Option<(DateTime<Utc>, bool)> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some((dt.with_timezone(&Utc), true));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some((Utc.from_utc_datetime(&naive), true));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some((at_time(date, neutral_midday()), false));
    }
    warn!(raw, "Unparsable LLM datetime treated as absent");
    None
}

fn neutral_midday() -> NaiveTime {
    NaiveTime::from_hms_opt(NEUTRAL_HOUR, 0, 0).expect("valid constant time")
}

pub(crate) fn at_time(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(time))
}
