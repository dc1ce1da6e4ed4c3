//! Regex clock-time extraction.
//!
//! Pattern families in priority order: ranges with minutes, ranges without,
//! single times with minutes, single hours, 24-hour times, keywords. A bare
//! hour with no AM/PM marker defaults to PM — campus events skew toward the
//! evening. Invalid hour/minute combinations yield nothing, never a clamped
//! value.

use std::sync::LazyLock;

use regex::Regex;

use forage_common::TimeEvidence;

// ---------------------------------------------------------------------------
// Confidence tiers
// ---------------------------------------------------------------------------

const TIER_RANGE_MINUTES: f32 = 0.95;
const TIER_RANGE_HOURS: f32 = 0.9;
const TIER_SINGLE_MINUTES: f32 = 0.85;
const TIER_SINGLE_HOUR: f32 = 0.8;
const TIER_TWENTY_FOUR_HOUR: f32 = 0.7;
const TIER_KEYWORD: f32 = 0.6;
const TIER_ANCHORED_BARE: f32 = 0.5;

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

const RANGE_SEP: &str = r"(?:-|–|—|to|until|till)";

static RANGE_MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}}):(\d{{2}})\s*(am|pm)?\s*{RANGE_SEP}\s*(\d{{1,2}})(?::(\d{{2}}))?\s*(am|pm)?\b"
    ))
    .expect("range with minutes regex")
});

static RANGE_HOURS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})\s*(am|pm)?\s*{RANGE_SEP}\s*(\d{{1,2}})\s*(am|pm)\b"
    ))
    .expect("range of hours regex")
});

static SINGLE_MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}):(\d{2})\s*(am|pm)\b").expect("single time with minutes regex")
});

static SINGLE_HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})\s*(am|pm)\b").expect("single hour regex"));

static TWENTY_FOUR_HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("24-hour regex"));

static NOON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:noon|midday)\b").expect("noon regex"));

static MIDNIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmidnight\b").expect("midnight regex"));

/// Bare hour anchored by a time preposition: "at 6", "from 7". Without the
/// anchor a lone digit is a day number or a room code, not a time.
static ANCHORED_BARE_HOUR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:at|from)\s+|@\s*)(\d{1,2})\b").expect("anchored bare hour regex")
});

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

type FamilyFn = fn(&str) -> Option<TimeEvidence>;

/// Priority order is the contract — first family with a valid hit wins.
const TIME_FAMILIES: &[FamilyFn] = &[
    range_with_minutes,
    range_of_hours,
    single_with_minutes,
    single_hour,
    twenty_four_hour,
    keyword,
    anchored_bare_hour,
];

/// Extract the most trustworthy clock time mentioned in `text`. `None` is a
/// normal outcome.
pub fn extract_time(text: &str) -> Option<TimeEvidence> {
    TIME_FAMILIES.iter().find_map(|family| family(text))
}

/// True when any clock-time pattern is present at all. The reconciler uses
/// this to decide whether an LLM timestamp's time-of-day has textual support.
pub fn has_time_pattern(text: &str) -> bool {
    RANGE_MINUTES_RE.is_match(text)
        || RANGE_HOURS_RE.is_match(text)
        || SINGLE_MINUTES_RE.is_match(text)
        || SINGLE_HOUR_RE.is_match(text)
        || TWENTY_FOUR_HOUR_RE.is_match(text)
        || NOON_RE.is_match(text)
        || MIDNIGHT_RE.is_match(text)
        || anchored_bare_hour(text).is_some()
}

// ---------------------------------------------------------------------------
// Families
// ---------------------------------------------------------------------------

fn range_with_minutes(text: &str) -> Option<TimeEvidence> {
    for caps in RANGE_MINUTES_RE.captures_iter(text) {
        let start_hour = parse_num(&caps[1]);
        let start_minute = parse_num(&caps[2]);
        let start_mer = caps.get(3).map(|m| m.as_str());
        let end_hour = parse_num(&caps[4]);
        let end_minute = caps.get(5).map_or(Some(0), |m| parse_num(m.as_str()));
        let end_mer = caps.get(6).map(|m| m.as_str());

        let resolved = resolve_range(start_hour, start_minute, start_mer, end_hour, end_minute, end_mer);
        if let Some((h, m, eh, em)) = resolved {
            return Some(TimeEvidence {
                hour: h,
                minute: m,
                end_hour: Some(eh),
                end_minute: Some(em),
                confidence_tier: TIER_RANGE_MINUTES,
                pattern_kind: "range_with_minutes",
            });
        }
    }
    None
}

fn range_of_hours(text: &str) -> Option<TimeEvidence> {
    for caps in RANGE_HOURS_RE.captures_iter(text) {
        let start_hour = parse_num(&caps[1]);
        let start_mer = caps.get(2).map(|m| m.as_str());
        let end_hour = parse_num(&caps[3]);
        let end_mer = caps.get(4).map(|m| m.as_str());

        let resolved = resolve_range(start_hour, Some(0), start_mer, end_hour, Some(0), end_mer);
        if let Some((h, m, eh, em)) = resolved {
            return Some(TimeEvidence {
                hour: h,
                minute: m,
                end_hour: Some(eh),
                end_minute: Some(em),
                confidence_tier: TIER_RANGE_HOURS,
                pattern_kind: "range_of_hours",
            });
        }
    }
    None
}

fn single_with_minutes(text: &str) -> Option<TimeEvidence> {
    for caps in SINGLE_MINUTES_RE.captures_iter(text) {
        let hour = apply_meridiem(parse_num(&caps[1]), Some(&caps[3]));
        let minute = parse_num(&caps[2]);
        if let (Some(h), Some(m)) = (hour, minute) {
            if valid(h, m) {
                return Some(TimeEvidence {
                    hour: h,
                    minute: m,
                    end_hour: None,
                    end_minute: None,
                    confidence_tier: TIER_SINGLE_MINUTES,
                    pattern_kind: "single_with_minutes",
                });
            }
        }
    }
    None
}

fn single_hour(text: &str) -> Option<TimeEvidence> {
    for caps in SINGLE_HOUR_RE.captures_iter(text) {
        let hour = apply_meridiem(parse_num(&caps[1]), Some(&caps[2]));
        if let Some(h) = hour {
            if valid(h, 0) {
                return Some(TimeEvidence {
                    hour: h,
                    minute: 0,
                    end_hour: None,
                    end_minute: None,
                    confidence_tier: TIER_SINGLE_HOUR,
                    pattern_kind: "single_hour",
                });
            }
        }
    }
    None
}

fn twenty_four_hour(text: &str) -> Option<TimeEvidence> {
    let caps = TWENTY_FOUR_HOUR_RE.captures(text)?;
    let hour = parse_num(&caps[1])?;
    let minute = parse_num(&caps[2])?;
    if !valid(hour, minute) {
        return None;
    }
    Some(TimeEvidence {
        hour,
        minute,
        end_hour: None,
        end_minute: None,
        confidence_tier: TIER_TWENTY_FOUR_HOUR,
        pattern_kind: "twenty_four_hour",
    })
}

fn keyword(text: &str) -> Option<TimeEvidence> {
    let hour = if NOON_RE.is_match(text) {
        12
    } else if MIDNIGHT_RE.is_match(text) {
        0
    } else {
        return None;
    };
    Some(TimeEvidence {
        hour,
        minute: 0,
        end_hour: None,
        end_minute: None,
        confidence_tier: TIER_KEYWORD,
        pattern_kind: "keyword",
    })
}

fn anchored_bare_hour(text: &str) -> Option<TimeEvidence> {
    for caps in ANCHORED_BARE_HOUR_RE.captures_iter(text) {
        let whole = caps.get(0)?;
        if continues_into_date(text, whole.end()) {
            // "from 10 March" is a date, not ten o'clock.
            continue;
        }
        let raw = parse_num(&caps[1])?;
        if !(1..=12).contains(&raw) {
            continue;
        }
        return Some(TimeEvidence {
            hour: default_pm(raw),
            minute: 0,
            end_hour: None,
            end_minute: None,
            confidence_tier: TIER_ANCHORED_BARE,
            pattern_kind: "anchored_bare_hour",
        });
    }
    None
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_num(s: &str) -> Option<u32> {
    s.parse().ok()
}

fn valid(hour: u32, minute: u32) -> bool {
    hour <= 23 && minute <= 59
}

/// 12-hour to 24-hour. No meridiem leaves the hour untouched (caller decides
/// on a default).
fn apply_meridiem(hour: Option<u32>, meridiem: Option<&str>) -> Option<u32> {
    let hour = hour?;
    match meridiem.map(str::to_lowercase).as_deref() {
        Some("pm") if hour < 12 => Some(hour + 12),
        Some("am") if hour == 12 => Some(0),
        _ => Some(hour),
    }
}

/// True when the text right after a bare-hour match continues into a date
/// expression (slash date or a month name).
fn continues_into_date(text: &str, end: usize) -> bool {
    let rest = text[end..].trim_start();
    if rest.starts_with('/') || rest.starts_with('.') {
        return true;
    }
    const MONTH_PREFIXES: &[&str] = &[
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lowered = rest.to_lowercase();
    MONTH_PREFIXES.iter().any(|m| lowered.starts_with(m))
}

/// A bare 1-11 defaults to the evening.
fn default_pm(hour: u32) -> u32 {
    if (1..=11).contains(&hour) {
        hour + 12
    } else {
        hour
    }
}

/// Resolve a start/end pair with up to two meridiem markers.
///
/// Missing start marker inherits the end's ("6-8pm" is 18:00-20:00), and a
/// start that would land after its end flips to the other half of the day
/// ("11-1pm" is 11:00-13:00). A range with no marker at all takes the
/// evening default on both sides.
fn resolve_range(
    start_hour: Option<u32>,
    start_minute: Option<u32>,
    start_mer: Option<&str>,
    end_hour: Option<u32>,
    end_minute: Option<u32>,
    end_mer: Option<&str>,
) -> Option<(u32, u32, u32, u32)> {
    let (sh_raw, sm) = (start_hour?, start_minute?);
    let (eh_raw, em) = (end_hour?, end_minute?);

    let eh = match end_mer {
        Some(m) => apply_meridiem(Some(eh_raw), Some(m))?,
        None => match start_mer {
            Some(m) => apply_meridiem(Some(eh_raw), Some(m))?,
            None => default_pm(eh_raw),
        },
    };

    let sh = match start_mer {
        Some(m) => apply_meridiem(Some(sh_raw), Some(m))?,
        None => match end_mer {
            Some(m) => {
                let candidate = apply_meridiem(Some(sh_raw), Some(m))?;
                if candidate > eh && candidate >= 12 {
                    // "11-1pm": 23 > 13, so the start must be morning.
                    candidate - 12
                } else {
                    candidate
                }
            }
            None => default_pm(sh_raw),
        },
    };

    if valid(sh, sm) && valid(eh, em) {
        Some((sh, sm, eh, em))
    } else {
        None
    }
}
