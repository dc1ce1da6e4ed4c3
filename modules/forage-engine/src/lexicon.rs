//! Static keyword tables for classification and category filtering.
//!
//! Loaded once at process start and passed by reference into the pure
//! decision functions — no singleton mutable state. The context-modifier
//! list in particular is tunable data, not a fixed contract.

// ---------------------------------------------------------------------------
// Default tables
// ---------------------------------------------------------------------------

/// Terms sufficient on their own to signal free food provision.
const STRONG_FOOD: &[&str] = &[
    "free food",
    "free pizza",
    "free lunch",
    "free breakfast",
    "free dinner",
    "free bbq",
    "free coffee",
    "free snacks",
    "free doughnuts",
    "free donuts",
    "pizza",
    "doughnuts",
    "donuts",
    "krispy kreme",
    "sausage rolls",
    "cupcakes",
    "food provided",
    "pizza provided",
    "lunch provided",
    "dinner provided",
    "snacks provided",
    "refreshments provided",
    "refreshments will be provided",
    "breakfast included",
    "lunch included",
];

/// Ambiguous food mentions that need a nearby context modifier.
const WEAK_FOOD: &[&str] = &[
    "food",
    "lunch",
    "dinner",
    "breakfast",
    "brunch",
    "snacks",
    "coffee",
    "tea",
    "treats",
    "nibbles",
    "goodies",
    "sweets",
    "cake",
    "biscuits",
    "refreshments",
];

/// Phrases that convert a weak food mention into a free-provision claim.
const CONTEXT_MODIFIERS: &[&str] = &[
    "free",
    "included",
    "provided",
    "complimentary",
    "on us",
    "on the house",
    "at no cost",
    "no charge",
    "courtesy of",
    "first come first served",
    "while stocks last",
];

/// Payment signals. Compound logic in the paid filter decides whether a
/// match actually rejects (membership fees below the cap pass).
const PAID_MARKERS: &[&str] = &[
    "ticket",
    "tickets",
    "entry fee",
    "admission",
    "cover charge",
    "early bird",
    "on sale",
    "buy now",
    "pay at the door",
    "per person",
    "per head",
];

/// Phrases that neutralise a paid signal entirely.
const FREE_OVERRIDES: &[&str] = &[
    "free entry",
    "free admission",
    "free event",
    "entry is free",
    "entry free",
    "no entry fee",
    "no ticket needed",
    "no tickets needed",
    "free of charge",
    "free for members",
    "free for all students",
];

/// Nightlife signals. Compound phrases only — "club" alone is a society word.
const NIGHTLIFE: &[&str] = &[
    "club night",
    "night club",
    "nightclub",
    "pub crawl",
    "bar crawl",
    "pres",
    "prinks",
    "pre drinks",
    "predrinks",
    "afterparty",
    "after party",
    "night out",
    "drinks promo",
    "guestlist",
    "smoking area",
    "shots",
    "dj set",
];

/// Named off-campus venues and city-centre markers.
const OFF_CAMPUS_VENUES: &[&str] = &[
    "city centre",
    "town hall",
    "temple bar",
    "coppers",
    "copper face jacks",
    "diceys",
    "dicey's",
    "the academy",
    "whelans",
    "whelan's",
    "workmans",
    "the george",
    "house dublin",
    "opium",
    "everleigh",
];

/// Faith-restricted event signals. Multi-word phrases only, so a bare common
/// word ("mass", "faith") never fires this filter.
const RELIGIOUS_PHRASES: &[&str] = &[
    "bible study",
    "prayer meeting",
    "prayer night",
    "prayer room",
    "worship night",
    "praise and worship",
    "mass will be",
    "rosary group",
    "church service",
    "quran study",
    "jummah prayer",
    "friday prayer",
    "fellowship night",
];

/// Events closed to general students.
const STAFF_ONLY: &[&str] = &[
    "committee only",
    "committee members only",
    "staff only",
    "staff and faculty",
    "faculty only",
    "board members only",
    "closed meeting",
    "invite only",
    "invitation only",
];

/// Other institutions — their events are not our campus's events.
const OTHER_INSTITUTIONS: &[&str] = &[
    "trinity",
    "tcd",
    "dcu",
    "maynooth",
    "griffith college",
    "ncad",
    "rcsi",
    "tu dublin",
    "tud",
];

/// Past-tense recap markers — the event already happened.
const RECAP_MARKERS: &[&str] = &[
    "thanks to everyone who",
    "thank you to everyone",
    "thanks for coming",
    "hope you enjoyed",
    "what a great",
    "was a great success",
    "last night",
    "last week's",
    "yesterday's",
    "recap",
    "throwback",
    "tbt",
];

/// Giveaway/contest markers — food as a prize is not a food event.
const GIVEAWAY_MARKERS: &[&str] = &[
    "giveaway",
    "competition",
    "raffle",
    "prize",
    "enter to win",
    "winner will be",
    "lucky winner",
    "tag a friend",
    "like and share",
];

/// Online-only markers. Reject only when no campus location is present.
const ONLINE_MARKERS: &[&str] = &[
    "zoom",
    "webinar",
    "online event",
    "online only",
    "google meet",
    "ms teams",
    "teams link",
    "livestream",
    "live stream",
];

// ---------------------------------------------------------------------------
// Lexicon
// ---------------------------------------------------------------------------

/// Immutable keyword tables. Build once with [`Lexicon::default_campus`],
/// share by reference.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub strong_food: Vec<String>,
    pub weak_food: Vec<String>,
    pub context_modifiers: Vec<String>,
    pub paid_markers: Vec<String>,
    pub free_overrides: Vec<String>,
    pub nightlife: Vec<String>,
    pub off_campus_venues: Vec<String>,
    pub religious_phrases: Vec<String>,
    pub staff_only: Vec<String>,
    pub other_institutions: Vec<String>,
    pub recap_markers: Vec<String>,
    pub giveaway_markers: Vec<String>,
    pub online_markers: Vec<String>,
}

impl Lexicon {
    pub fn default_campus() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            strong_food: owned(STRONG_FOOD),
            weak_food: owned(WEAK_FOOD),
            context_modifiers: owned(CONTEXT_MODIFIERS),
            paid_markers: owned(PAID_MARKERS),
            free_overrides: owned(FREE_OVERRIDES),
            nightlife: owned(NIGHTLIFE),
            off_campus_venues: owned(OFF_CAMPUS_VENUES),
            religious_phrases: owned(RELIGIOUS_PHRASES),
            staff_only: owned(STAFF_ONLY),
            other_institutions: owned(OTHER_INSTITUTIONS),
            recap_markers: owned(RECAP_MARKERS),
            giveaway_markers: owned(GIVEAWAY_MARKERS),
            online_markers: owned(ONLINE_MARKERS),
        }
    }

    /// First strong food term present, if any. Input must be lowercased.
    pub fn strong_food_hit<'a>(&'a self, lowered: &str) -> Option<&'a str> {
        self.strong_food
            .iter()
            .find(|term| word_hit(lowered, term).is_some())
            .map(String::as_str)
    }

    /// First weak food term present with its byte offset. Input lowercased.
    pub fn weak_food_hit<'a>(&'a self, lowered: &str) -> Option<(usize, &'a str)> {
        self.weak_food
            .iter()
            .find_map(|term| word_hit(lowered, term).map(|pos| (pos, term.as_str())))
    }

    /// True when any context modifier sits within `window` bytes of `pos`.
    pub fn modifier_near(&self, lowered: &str, pos: usize, window: usize) -> bool {
        self.context_modifiers.iter().any(|modifier| {
            let mut search_from = 0;
            while let Some(rel) = word_hit(&lowered[search_from..], modifier) {
                let at = search_from + rel;
                if at.abs_diff(pos) <= window {
                    return true;
                }
                search_from = at + modifier.len();
                if search_from >= lowered.len() {
                    break;
                }
            }
            false
        })
    }

    /// True when the text contains any food signal at all, strong or weak.
    pub fn has_food_signal(&self, lowered: &str) -> bool {
        self.strong_food_hit(lowered).is_some() || self.weak_food_hit(lowered).is_some()
    }
}

// ---------------------------------------------------------------------------
// Word-boundary matching
// ---------------------------------------------------------------------------

/// Find `needle` in `haystack` at word boundaries, returning the byte offset
/// of the first such occurrence. Plain substring search would let "tea" fire
/// inside "team" and "pres" inside "president".
pub fn word_hit(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let mut search_from = 0;
    while let Some(rel) = haystack[search_from..].find(needle) {
        let at = search_from + rel;
        let end = at + needle.len();
        let before_ok = at == 0
            || !haystack[..at]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let after_ok = end == haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric());
        if before_ok && after_ok {
            return Some(at);
        }
        search_from = at + 1;
        if search_from >= haystack.len() {
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_hit_respects_boundaries() {
        assert_eq!(word_hit("free tea today", "tea"), Some(5));
        assert!(word_hit("join our team", "tea").is_none());
        assert!(word_hit("president speaking", "pres").is_none());
        assert_eq!(word_hit("pres in the village", "pres"), Some(0));
    }

    #[test]
    fn word_hit_matches_phrases() {
        let text = "doors open, food provided for all";
        assert_eq!(word_hit(text, "food provided"), Some(12));
    }

    #[test]
    fn strong_hit_finds_pizza() {
        let lex = Lexicon::default_campus();
        assert_eq!(lex.strong_food_hit("pizza in the atrium"), Some("pizza"));
        assert!(lex.strong_food_hit("no mention here").is_none());
    }

    #[test]
    fn weak_hit_needs_modifier_nearby() {
        let lex = Lexicon::default_campus();
        let text = "agm on thursday, coffee included";
        let (pos, term) = lex.weak_food_hit(text).unwrap();
        assert_eq!(term, "coffee");
        assert!(lex.modifier_near(text, pos, 40));
    }

    #[test]
    fn modifier_outside_window_does_not_count() {
        let lex = Lexicon::default_campus();
        let filler = "x".repeat(120);
        let text = format!("free entry to the talk. {filler} coffee afterwards");
        let (pos, _) = lex.weak_food_hit(&text).unwrap();
        assert!(!lex.modifier_near(&text, pos, 40));
    }

    #[test]
    fn religious_phrases_are_all_multi_word() {
        let lex = Lexicon::default_campus();
        for phrase in &lex.religious_phrases {
            assert!(
                phrase.contains(' '),
                "religious filter must never match a bare word: {phrase}"
            );
        }
    }
}
