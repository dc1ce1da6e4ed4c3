use std::env;

/// Engine tuning knobs, loaded once and passed by reference.
///
/// The plausibility window (`future_window_days`) is deliberately a single
/// parameter shared by the date extractor and the reconciler — the two must
/// never disagree about what "too far in the future" means.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// A candidate date more than this many days past the reference time is
    /// discarded as implausible.
    pub future_window_days: i64,
    /// An LLM timestamp more than this many hours in the past is discarded.
    pub llm_past_grace_hours: i64,
    /// Membership fees up to this amount (euro) do not count as a paid event.
    pub membership_fee_cap: f64,
    /// A weak food keyword needs a context modifier within this many bytes.
    pub modifier_window_chars: usize,
    /// Segments shorter than this are dropped as OCR noise.
    pub min_segment_len: usize,
    /// Hard cap on segments per post, guards against pathological input.
    pub max_segments: usize,
    /// Minimum length for an all-caps line to count as a schedule heading.
    pub heading_min_len: usize,
    /// Default per-run escalation budget for the built-in call gate.
    pub max_escalations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            future_window_days: 30,
            llm_past_grace_hours: 1,
            membership_fee_cap: 5.0,
            modifier_window_chars: 40,
            min_segment_len: 20,
            max_segments: 8,
            heading_min_len: 4,
            max_escalations: 25,
        }
    }
}

impl EngineConfig {
    /// Defaults with environment overrides. Unset or unparsable vars keep
    /// the default.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = parsed_env("FORAGE_FUTURE_WINDOW_DAYS") {
            cfg.future_window_days = v;
        }
        if let Some(v) = parsed_env("FORAGE_MEMBERSHIP_FEE_CAP") {
            cfg.membership_fee_cap = v;
        }
        if let Some(v) = parsed_env("FORAGE_MAX_ESCALATIONS") {
            cfg.max_escalations = v;
        }
        if let Some(v) = parsed_env("FORAGE_MAX_SEGMENTS") {
            cfg.max_segments = v;
        }
        cfg
    }
}

fn parsed_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.future_window_days, 30);
        assert_eq!(cfg.llm_past_grace_hours, 1);
        assert_eq!(cfg.max_segments, 8);
    }
}
