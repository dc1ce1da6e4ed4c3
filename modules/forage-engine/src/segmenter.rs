//! Splits multi-event "weekly schedule" posts into independent segments.
//!
//! A post splits only when at least two blank-line boundaries are followed
//! by a heading — an all-caps line or a line opening with a weekday name.
//! Anything else returns the whole text as one segment, so segmentation can
//! never make behaviour worse than not segmenting at all.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use forage_common::EngineConfig;

static WEEKDAY_OPENER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday|mon|tue|tues|wed|thu|thur|thurs|fri|sat|sun)\b")
        .expect("weekday opener regex")
});

/// Split `text` into candidate event segments. Always returns at least one
/// segment; with no qualifying boundaries the input comes back unchanged.
pub fn segment(text: &str, config: &EngineConfig) -> Vec<String> {
    let blocks: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .collect();

    let heading_starts: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, block)| is_heading(first_line(block), config))
        .map(|(i, _)| i)
        .collect();

    if heading_starts.len() < 2 {
        return vec![text.to_string()];
    }

    // Group each heading block with the non-heading blocks that follow it.
    // A preamble before the first heading stands alone.
    let mut segments: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        if heading_starts.contains(&i) && !current.is_empty() {
            segments.push(current.join("\n\n"));
            current = Vec::new();
        }
        current.push(block);
    }
    if !current.is_empty() {
        segments.push(current.join("\n\n"));
    }

    // Noise floor: stray OCR fragments are not candidate events.
    let mut segments: Vec<String> = segments
        .into_iter()
        .filter(|s| s.len() >= config.min_segment_len)
        .collect();

    if segments.len() > config.max_segments {
        warn!(
            total = segments.len(),
            kept = config.max_segments,
            "Capping pathological segment count"
        );
        segments.truncate(config.max_segments);
    }

    if segments.is_empty() {
        return vec![text.to_string()];
    }

    segments
}

fn first_line(block: &str) -> &str {
    block.lines().next().unwrap_or("").trim()
}

/// A heading is an all-caps line with enough letters, or a line opening with
/// a weekday name.
fn is_heading(line: &str, config: &EngineConfig) -> bool {
    if WEEKDAY_OPENER_RE.is_match(line) {
        return true;
    }
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= config.heading_min_len && letters.iter().all(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn plain_post_is_one_segment() {
        let text = "Free pizza this Friday at 6pm in the Newman!";
        assert_eq!(segment(text, &cfg()), vec![text.to_string()]);
    }

    #[test]
    fn single_heading_is_not_enough_to_split() {
        let text = "WEEKLY UPDATE\n\nFree pizza Friday in the Newman, 6pm sharp.";
        assert_eq!(segment(text, &cfg()), vec![text.to_string()]);
    }

    #[test]
    fn weekday_headed_schedule_splits() {
        let text = "MONDAY\n\nFree pizza in the Newman at 6pm for all members.\n\nWEDNESDAY\n\nBake sale leftovers in the Science Centre, free from noon.";
        let segments = segment(text, &cfg());
        assert_eq!(segments.len(), 2);
        assert!(segments[0].contains("MONDAY"));
        assert!(segments[0].contains("Newman"));
        assert!(segments[1].contains("WEDNESDAY"));
        assert!(segments[1].contains("Science Centre"));
    }

    #[test]
    fn preamble_before_first_heading_stands_alone() {
        let text = "Huge week ahead for the society, three events!\n\nTUESDAY EVENING\n\nFree doughnuts outside the library from 11am.\n\nFRIDAY\n\nEnd of term pizza in Q014 at 6pm.";
        let segments = segment(text, &cfg());
        assert_eq!(segments.len(), 3);
        assert!(segments[0].starts_with("Huge week"));
    }

    #[test]
    fn short_fragments_are_dropped() {
        let text = "MONDAY\n\nFree pizza in the Newman at 6pm, bring a friend.\n\nFRIDAY\n\nok";
        let segments = segment(text, &cfg());
        assert_eq!(segments.len(), 1);
        assert!(segments[0].contains("Newman"));
    }

    #[test]
    fn segment_count_is_capped() {
        let mut cfg = cfg();
        cfg.max_segments = 3;
        let day_block = "Free pizza in the Newman at 6pm for everyone.";
        let text = (0..6)
            .map(|i| format!("DAY {i} HEADING\n\n{day_block}"))
            .collect::<Vec<_>>()
            .join("\n\n");
        let segments = segment(&text, &cfg);
        assert_eq!(segments.len(), 3);
    }

    #[test]
    fn lowercase_lines_are_not_headings() {
        let text = "pizza maybe\n\nsome other chatter about the week\n\nmore chatter still";
        assert_eq!(segment(text, &cfg()).len(), 1);
    }
}
