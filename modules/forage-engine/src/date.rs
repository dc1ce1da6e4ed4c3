//! Regex date extraction with plausibility validation.
//!
//! Pattern families are tried in a fixed priority order, highest-confidence
//! first, and the first plausible hit wins. A match that fails validation
//! (implausible, or an impossible calendar date) is dropped and extraction
//! continues with the weaker families.
//!
//! Numeric dates are always read day-before-month. "02/03" is 2 March,
//! never 3 February — the ambiguity is silent data corruption otherwise.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use regex::Regex;
use tracing::warn;

use forage_common::{DateEvidence, EngineConfig};

// ---------------------------------------------------------------------------
// Confidence tiers
// ---------------------------------------------------------------------------

const TIER_EXPLICIT_VALIDATED: f32 = 0.95;
const TIER_EXPLICIT: f32 = 0.85;
const TIER_WEEKDAY_DAY: f32 = 0.75;
const TIER_RELATIVE: f32 = 0.65;
const TIER_BARE_DAY: f32 = 0.5;

// ---------------------------------------------------------------------------
// Pattern building blocks
// ---------------------------------------------------------------------------

const MONTH: &str = "jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:t|tember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

/// Abbreviated weekdays — only valid next to a day number or after
/// "this"/"next", where the context disambiguates.
const WD_ABBR: &str =
    "mon(?:day)?|tue(?:s|sday)?|wed(?:nesday)?|thu(?:r|rs|rsday)?|fri(?:day)?|sat(?:urday)?|sun(?:day)?";

/// Full weekday names only. A bare "sat" or "wed" in running text is far
/// more often a verb than a date.
const WD_FULL: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";

static WEEKDAY_DAY_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({WD_ABBR})\s*,?\s+(?:the\s+)?(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({MONTH})\b"
    ))
    .expect("weekday day month regex")
});

static WEEKDAY_MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({WD_ABBR})\s*,?\s+({MONTH})\s+(?:the\s+)?(\d{{1,2}})(?:st|nd|rd|th)?\b"
    ))
    .expect("weekday month day regex")
});

static DAY_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({MONTH})\b"
    ))
    .expect("day month regex")
});

static MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({MONTH})\s+(?:the\s+)?(\d{{1,2}})(?:st|nd|rd|th)?\b"
    ))
    .expect("month day regex")
});

static NUMERIC_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[/.](\d{1,2})(?:[/.](\d{2,4}))?\b").expect("numeric date regex")
});

static WEEKDAY_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({WD_ABBR})\s+(?:the\s+)?(\d{{1,2}})(?:st|nd|rd|th)?\b"
    ))
    .expect("weekday day regex")
});

static TOMORROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:tomorrow|tmrw)\b").expect("tomorrow regex"));

static TODAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\btoday\b|\btonight\b|\bthis evening\b|\bhappening now\b")
        .expect("today regex")
});

static NEXT_WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bnext\s+({WD_ABBR})\b")).expect("next weekday regex")
});

static THIS_WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bthis\s+({WD_ABBR})\b")).expect("this weekday regex")
});

static BARE_WEEKDAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\b({WD_FULL})\b")).expect("bare weekday regex"));

static BARE_ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bthe\s+(\d{1,2})(?:st|nd|rd|th)\b").expect("bare ordinal regex")
});

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

type FamilyFn = fn(&str, NaiveDate) -> Option<DateEvidence>;

/// Priority order is the contract: the first family that yields a plausible
/// date wins. Reviewable as data, not as nested conditionals.
const DATE_FAMILIES: &[FamilyFn] = &[
    explicit_with_weekday,
    explicit_day_month,
    weekday_with_day,
    relative_keyword,
    bare_ordinal_day,
];

/// Extract the most trustworthy calendar date mentioned in `text`, relative
/// to `reference`. Returns `None` when nothing plausible is found — a normal
/// outcome, not an error.
pub fn extract_date(
    text: &str,
    reference: DateTime<Utc>,
    config: &EngineConfig,
) -> Option<DateEvidence> {
    let today = reference.date_naive();

    for family in DATE_FAMILIES {
        let Some(evidence) = family(text, today) else {
            continue;
        };
        if plausible(evidence.value, today, config) {
            return Some(evidence);
        }
        warn!(
            candidate = %evidence.value,
            pattern = evidence.pattern_kind,
            "Discarded implausible date candidate"
        );
    }

    None
}

/// True when any date pattern family matches at all, plausible or not.
/// The reconciler's hallucination guard needs raw pattern presence: an LLM
/// date with zero textual support is never trusted.
pub fn has_date_pattern(text: &str) -> bool {
    WEEKDAY_DAY_MONTH_RE.is_match(text)
        || WEEKDAY_MONTH_DAY_RE.is_match(text)
        || DAY_MONTH_RE.is_match(text)
        || MONTH_DAY_RE.is_match(text)
        || NUMERIC_DATE_RE.is_match(text)
        || WEEKDAY_DAY_RE.is_match(text)
        || TOMORROW_RE.is_match(text)
        || TODAY_RE.is_match(text)
        || NEXT_WEEKDAY_RE.is_match(text)
        || THIS_WEEKDAY_RE.is_match(text)
        || BARE_WEEKDAY_RE.is_match(text)
        || BARE_ORDINAL_RE.is_match(text)
}

fn plausible(date: NaiveDate, today: NaiveDate, config: &EngineConfig) -> bool {
    // Same-day is the grace window ("happening now"); anything earlier is a
    // past event, anything beyond the window is implausibly far out.
    date >= today && date <= today + Duration::days(config.future_window_days)
}

// ---------------------------------------------------------------------------
// Family: explicit day + month + weekday
// ---------------------------------------------------------------------------

fn explicit_with_weekday(text: &str, today: NaiveDate) -> Option<DateEvidence> {
    let (stated, day, month) = if let Some(caps) = WEEKDAY_DAY_MONTH_RE.captures(text) {
        (
            weekday_from_str(&caps[1])?,
            caps[2].parse::<u32>().ok()?,
            month_from_str(&caps[3])?,
        )
    } else if let Some(caps) = WEEKDAY_MONTH_DAY_RE.captures(text) {
        (
            weekday_from_str(&caps[1])?,
            caps[3].parse::<u32>().ok()?,
            month_from_str(&caps[2])?,
        )
    } else {
        return None;
    };

    let date = resolve_year(day, month, today)?;

    // The explicit date always wins over the stated weekday. A mismatch is
    // logged, never "corrected" by shifting the date to match the weekday.
    if date.weekday() == stated {
        Some(DateEvidence {
            value: date,
            confidence_tier: TIER_EXPLICIT_VALIDATED,
            pattern_kind: "explicit_validated_weekday",
        })
    } else {
        warn!(
            stated = %stated,
            computed = %date.weekday(),
            date = %date,
            "Weekday does not match explicit date; trusting the date"
        );
        Some(DateEvidence {
            value: date,
            confidence_tier: TIER_EXPLICIT,
            pattern_kind: "explicit_weekday_mismatch",
        })
    }
}

// ---------------------------------------------------------------------------
// Family: explicit day + month, no weekday
// ---------------------------------------------------------------------------

fn explicit_day_month(text: &str, today: NaiveDate) -> Option<DateEvidence> {
    let evidence = |date| {
        Some(DateEvidence {
            value: date,
            confidence_tier: TIER_EXPLICIT,
            pattern_kind: "explicit_day_month",
        })
    };

    if let Some(caps) = DAY_MONTH_RE.captures(text) {
        let day = caps[1].parse::<u32>().ok()?;
        let month = month_from_str(&caps[2])?;
        return evidence(resolve_year(day, month, today)?);
    }

    if let Some(caps) = MONTH_DAY_RE.captures(text) {
        let month = month_from_str(&caps[1])?;
        let day = caps[2].parse::<u32>().ok()?;
        return evidence(resolve_year(day, month, today)?);
    }

    for caps in NUMERIC_DATE_RE.captures_iter(text) {
        // Day before month, always. A "month" above 12 means this was not a
        // date at all — dropped, never swapped.
        let day = match caps[1].parse::<u32>() {
            Ok(d) => d,
            Err(_) => continue,
        };
        let month = match caps[2].parse::<u32>() {
            Ok(m) if (1..=12).contains(&m) => m,
            _ => continue,
        };
        let date = match caps.get(3) {
            Some(year_match) => {
                let year = match year_match.as_str().parse::<i32>() {
                    Ok(y) if y < 100 => 2000 + y,
                    Ok(y) => y,
                    Err(_) => continue,
                };
                match NaiveDate::from_ymd_opt(year, month, day) {
                    Some(d) => d,
                    None => continue,
                }
            }
            None => match resolve_year(day, month, today) {
                Some(d) => d,
                None => continue,
            },
        };
        return Some(DateEvidence {
            value: date,
            confidence_tier: TIER_EXPLICIT,
            pattern_kind: "numeric_day_month",
        });
    }

    None
}

// ---------------------------------------------------------------------------
// Family: weekday + day number, month inferred
// ---------------------------------------------------------------------------

fn weekday_with_day(text: &str, today: NaiveDate) -> Option<DateEvidence> {
    for caps in WEEKDAY_DAY_RE.captures_iter(text) {
        let whole = caps.get(0)?;
        if followed_by_time_marker(text, whole.end()) {
            // "Friday 6:30" is a time, not the 6th.
            continue;
        }
        if followed_by_month_name(text, whole.end()) {
            // "Friday 27 February" belongs to the explicit families; if they
            // discarded it, the month must not be re-inferred here.
            continue;
        }
        let stated = match weekday_from_str(&caps[1]) {
            Some(w) => w,
            None => continue,
        };
        let day = match caps[2].parse::<u32>() {
            Ok(d) => d,
            Err(_) => continue,
        };

        let date = match infer_month(day, today) {
            Some(d) => d,
            None => continue,
        };
        if date.weekday() != stated {
            warn!(
                stated = %stated,
                computed = %date.weekday(),
                date = %date,
                "Weekday does not match inferred date; trusting the day number"
            );
        }
        return Some(DateEvidence {
            value: date,
            confidence_tier: TIER_WEEKDAY_DAY,
            pattern_kind: "weekday_day_number",
        });
    }
    None
}

// ---------------------------------------------------------------------------
// Family: relative keywords
// ---------------------------------------------------------------------------

fn relative_keyword(text: &str, today: NaiveDate) -> Option<DateEvidence> {
    let evidence = |date, kind| {
        Some(DateEvidence {
            value: date,
            confidence_tier: TIER_RELATIVE,
            pattern_kind: kind,
        })
    };

    if TOMORROW_RE.is_match(text) {
        return evidence(today + Duration::days(1), "relative_tomorrow");
    }
    if TODAY_RE.is_match(text) {
        return evidence(today, "relative_today");
    }
    if let Some(caps) = NEXT_WEEKDAY_RE.captures(text) {
        let target = weekday_from_str(&caps[1])?;
        // "next Friday" never means today.
        let mut ahead = days_until(today.weekday(), target);
        if ahead == 0 {
            ahead = 7;
        }
        return evidence(today + Duration::days(ahead), "relative_next_weekday");
    }
    if let Some(caps) = THIS_WEEKDAY_RE.captures(text) {
        let target = weekday_from_str(&caps[1])?;
        let ahead = days_until(today.weekday(), target);
        return evidence(today + Duration::days(ahead), "relative_this_weekday");
    }
    for caps in BARE_WEEKDAY_RE.captures_iter(text) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        if weekday_bound_to_explicit_date(text, whole.end()) {
            // The weekday belongs to an explicit (possibly discarded) date
            // like "Friday 27th February" — never resurrect it as "next
            // Friday".
            continue;
        }
        let target = match weekday_from_str(&caps[1]) {
            Some(w) => w,
            None => continue,
        };
        let ahead = days_until(today.weekday(), target);
        return evidence(today + Duration::days(ahead), "relative_bare_weekday");
    }
    None
}

// ---------------------------------------------------------------------------
// Family: bare ordinal day of month
// ---------------------------------------------------------------------------

fn bare_ordinal_day(text: &str, today: NaiveDate) -> Option<DateEvidence> {
    for caps in BARE_ORDINAL_RE.captures_iter(text) {
        let whole = caps.get(0)?;
        if followed_by_time_marker(text, whole.end()) {
            continue;
        }
        if followed_by_month_name(text, whole.end()) {
            continue;
        }
        let day = match caps[1].parse::<u32>() {
            Ok(d) => d,
            Err(_) => continue,
        };
        if let Some(date) = infer_month(day, today) {
            return Some(DateEvidence {
                value: date,
                confidence_tier: TIER_BARE_DAY,
                pattern_kind: "bare_day_of_month",
            });
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn month_from_str(s: &str) -> Option<u32> {
    let prefix: String = s.to_lowercase().chars().take(3).collect();
    match prefix.as_str() {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}

fn weekday_from_str(s: &str) -> Option<Weekday> {
    let prefix: String = s.to_lowercase().chars().take(3).collect();
    match prefix.as_str() {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn days_until(from: Weekday, to: Weekday) -> i64 {
    let from = from.num_days_from_monday() as i64;
    let to = to.num_days_from_monday() as i64;
    (to - from).rem_euclid(7)
}

/// Pick the year for a day+month with none stated: this year if that lands
/// today or later, else next year. Plausibility filtering happens upstream.
fn resolve_year(day: u32, month: u32, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
    match this_year {
        Some(d) if d >= today => Some(d),
        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
    }
}

/// Pick the month for a bare day number: this month if the day is still
/// ahead (or today), else next month.
fn infer_month(day: u32, today: NaiveDate) -> Option<NaiveDate> {
    if day >= today.day() {
        if let Some(d) = NaiveDate::from_ymd_opt(today.year(), today.month(), day) {
            return Some(d);
        }
    }
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// True when the text right after a match continues into a clock-time
/// expression — "Friday 6:30" or "Friday 6-8pm" must not parse as day 6.
fn followed_by_time_marker(text: &str, end: usize) -> bool {
    let rest = text[end..].trim_start();
    if rest.starts_with(':') || rest.starts_with('-') || rest.starts_with('–') {
        return true;
    }
    let lowered = rest.to_lowercase();
    lowered.starts_with("am") || lowered.starts_with("pm")
}

const MONTH_PREFIXES: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// True when a month name (optionally "of <month>") follows a match.
fn followed_by_month_name(text: &str, end: usize) -> bool {
    let rest = text[end..].trim_start().to_lowercase();
    let rest = rest.strip_prefix("of ").map(str::trim_start).unwrap_or(&rest);
    MONTH_PREFIXES.iter().any(|m| rest.starts_with(m))
}

/// True when a bare weekday is immediately bound to an explicit day number
/// ("Friday 27th ..." or "Friday 27 February") rather than standing alone.
fn weekday_bound_to_explicit_date(text: &str, end: usize) -> bool {
    let rest = text[end..].trim_start();
    let rest = rest.strip_prefix("the ").unwrap_or(rest).trim_start();
    let digit_count = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digit_count == 0 {
        return false;
    }
    let after = rest[digit_count..].to_lowercase();
    if ["st", "nd", "rd", "th"].iter().any(|s| after.starts_with(s)) {
        return true;
    }
    let after = after.trim_start();
    let after = after.strip_prefix("of ").map(str::trim_start).unwrap_or(after);
    MONTH_PREFIXES.iter().any(|m| after.starts_with(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        // Sunday 1 March 2026, 10:00 UTC.
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
    }

    fn cfg() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn explicit_date_with_matching_weekday_is_top_tier() {
        let ev = extract_date("Free pizza Friday 6th March!", reference(), &cfg()).unwrap();
        assert_eq!(ev.value, NaiveDate::from_ymd_opt(2026, 3, 6).unwrap());
        assert_eq!(ev.pattern_kind, "explicit_validated_weekday");
        assert!(ev.confidence_tier > 0.9);
    }

    #[test]
    fn weekday_mismatch_trusts_explicit_date() {
        // 6 March 2026 is a Friday, not a Monday.
        let ev = extract_date("Monday 6th March", reference(), &cfg()).unwrap();
        assert_eq!(ev.value, NaiveDate::from_ymd_opt(2026, 3, 6).unwrap());
        assert_eq!(ev.pattern_kind, "explicit_weekday_mismatch");
    }

    #[test]
    fn numeric_date_is_day_before_month() {
        let ev = extract_date("Sign up by 02/03", reference(), &cfg()).unwrap();
        assert_eq!(ev.value, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(ev.pattern_kind, "numeric_day_month");
    }

    #[test]
    fn numeric_month_above_twelve_is_dropped_not_swapped() {
        assert!(extract_date("see 6/13 for details", reference(), &cfg()).is_none());
    }

    #[test]
    fn month_name_day_order_accepted() {
        let ev = extract_date("on March 6 in the atrium", reference(), &cfg()).unwrap();
        assert_eq!(ev.value, NaiveDate::from_ymd_opt(2026, 3, 6).unwrap());
    }

    #[test]
    fn weekday_day_infers_month_from_reference() {
        let ev = extract_date("see you Friday 6th", reference(), &cfg()).unwrap();
        assert_eq!(ev.value, NaiveDate::from_ymd_opt(2026, 3, 6).unwrap());
        assert_eq!(ev.pattern_kind, "weekday_day_number");
    }

    #[test]
    fn weekday_followed_by_time_is_not_a_day_number() {
        let ev = extract_date("Friday 6:30 in the Newman", reference(), &cfg()).unwrap();
        // Falls through to the relative family: next Friday.
        assert_eq!(ev.pattern_kind, "relative_bare_weekday");
        assert_eq!(ev.value, NaiveDate::from_ymd_opt(2026, 3, 6).unwrap());
    }

    #[test]
    fn tomorrow_resolves_from_reference() {
        let ev = extract_date("free lunch tomorrow!", reference(), &cfg()).unwrap();
        assert_eq!(ev.value, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(ev.pattern_kind, "relative_tomorrow");
    }

    #[test]
    fn today_is_accepted_as_same_day_grace() {
        let ev = extract_date("happening now, come down today", reference(), &cfg()).unwrap();
        assert_eq!(ev.value, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn next_weekday_never_means_today() {
        // Reference is a Sunday; "next sunday" must be 8 March, not 1 March.
        let ev = extract_date("next sunday", reference(), &cfg()).unwrap();
        assert_eq!(ev.value, NaiveDate::from_ymd_opt(2026, 3, 8).unwrap());
    }

    #[test]
    fn bare_full_weekday_resolves_to_upcoming() {
        let ev = extract_date("pizza on wednesday", reference(), &cfg()).unwrap();
        assert_eq!(ev.value, NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
    }

    #[test]
    fn abbreviated_weekday_alone_is_not_a_date() {
        // "sat" is a verb here; only full names count without context.
        assert!(extract_date("we sat together over exams", reference(), &cfg()).is_none());
    }

    #[test]
    fn bare_ordinal_day() {
        let ev = extract_date("doors open on the 14th", reference(), &cfg()).unwrap();
        assert_eq!(ev.value, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
        assert_eq!(ev.pattern_kind, "bare_day_of_month");
    }

    #[test]
    fn far_future_date_is_discarded() {
        assert!(extract_date("gala on 25th December", reference(), &cfg()).is_none());
    }

    #[test]
    fn past_date_is_discarded() {
        // 1 February rolls to next year, which is outside the window.
        assert!(extract_date("submissions closed 1st February", reference(), &cfg()).is_none());
    }

    #[test]
    fn discarded_explicit_date_is_not_resurrected_as_relative_weekday() {
        // "Friday 27th February" is in the past. The bare "Friday" must not
        // come back as next Friday, and the 27th must not be re-read as the
        // 27th of the reference month.
        assert!(extract_date("Pizza on Friday 27th February at 6pm", reference(), &cfg()).is_none());
    }

    #[test]
    fn same_day_is_plausible() {
        let ev = extract_date("1st March celebration", reference(), &cfg()).unwrap();
        assert_eq!(ev.value, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn no_date_words_yields_none() {
        assert!(extract_date("free pizza in the Newman", reference(), &cfg()).is_none());
        assert!(!has_date_pattern("free pizza in the Newman"));
    }

    #[test]
    fn pattern_presence_ignores_plausibility() {
        // Implausible as evidence, but the pattern is present — the
        // hallucination guard cares about presence only.
        assert!(has_date_pattern("gala on 25th December"));
        assert!(extract_date("gala on 25th December", reference(), &cfg()).is_none());
    }

    #[test]
    fn impossible_calendar_date_is_dropped() {
        assert!(extract_date("party on 31st June", reference(), &cfg()).is_none());
    }
}
