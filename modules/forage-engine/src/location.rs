//! Maps free-text location mentions to canonical campus buildings.
//!
//! Alias lookup (case/whitespace-insensitive) plus a room-code pattern for
//! "Q014" / "AG 1.01" style mentions. No match returns `None` — the caller
//! treats that as lower confidence, not an error.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use forage_common::CanonicalLocation;

// ---------------------------------------------------------------------------
// Building table
// ---------------------------------------------------------------------------

struct BuildingDef {
    id: &'static str,
    name: &'static str,
    aliases: &'static [&'static str],
    /// Room-code letter prefixes that resolve to this building.
    room_prefixes: &'static [&'static str],
}

const BUILDINGS: &[BuildingDef] = &[
    BuildingDef {
        id: "newman",
        name: "Newman Building",
        aliases: &["newman", "newman building", "the newman"],
        room_prefixes: &["N"],
    },
    BuildingDef {
        id: "agriculture",
        name: "Agriculture & Food Science Centre",
        aliases: &[
            "agriculture building",
            "ag building",
            "ag science",
            "agriculture and food science",
            "agri building",
        ],
        room_prefixes: &["AG"],
    },
    BuildingDef {
        id: "science",
        name: "Science Centre",
        aliases: &[
            "science centre",
            "science center",
            "science hub",
            "science east",
            "science west",
            "science south",
            "science north",
        ],
        room_prefixes: &["S"],
    },
    BuildingDef {
        id: "engineering",
        name: "Engineering Building",
        aliases: &["engineering building", "eng building", "engineering block"],
        room_prefixes: &["E"],
    },
    BuildingDef {
        id: "quinn",
        name: "Quinn School of Business",
        aliases: &["quinn", "quinn school", "quinn building"],
        room_prefixes: &["Q"],
    },
    BuildingDef {
        id: "sutherland",
        name: "Sutherland School of Law",
        aliases: &["sutherland", "sutherland school", "law building"],
        room_prefixes: &["L"],
    },
    BuildingDef {
        id: "student_centre",
        name: "Student Centre",
        aliases: &[
            "student centre",
            "student center",
            "students union",
            "student union",
            "the atrium",
        ],
        room_prefixes: &[],
    },
    BuildingDef {
        id: "obrien",
        name: "O'Brien Centre",
        aliases: &["o'brien centre", "obrien centre", "o brien centre", "o'brien"],
        room_prefixes: &["OB"],
    },
    BuildingDef {
        id: "computer_science",
        name: "Computer Science Building",
        aliases: &[
            "computer science building",
            "cs building",
            "comp sci building",
        ],
        room_prefixes: &["CS"],
    },
    BuildingDef {
        id: "library",
        name: "Main Library",
        aliases: &["library", "main library", "library steps"],
        room_prefixes: &[],
    },
    BuildingDef {
        id: "conway",
        name: "Conway Institute",
        aliases: &["conway", "conway institute"],
        room_prefixes: &["C"],
    },
    BuildingDef {
        id: "health_sciences",
        name: "Health Sciences Centre",
        aliases: &["health sciences", "health sciences centre", "health science building"],
        room_prefixes: &["H"],
    },
    BuildingDef {
        id: "sports",
        name: "Sports Centre",
        aliases: &["sports centre", "sports center", "sports hall"],
        room_prefixes: &[],
    },
];

/// Room codes: a known letter prefix plus a digit suffix — up to three
/// leading digits with an optional `.nn` part ("Q014", "AG 1.01", "C1.06").
static ROOM_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z]{1,2})\s?(\d{1,3}(?:\.\d{1,2})?)\b").expect("room code regex")
});

// ---------------------------------------------------------------------------
// CampusMap
// ---------------------------------------------------------------------------

/// Alias dictionary plus room-prefix index, built once at startup.
pub struct CampusMap {
    alias_index: HashMap<String, usize>,
    prefix_index: HashMap<String, usize>,
    /// Aliases ordered longest-first so "science centre" wins over "science".
    scan_order: Vec<(String, usize)>,
}

impl CampusMap {
    pub fn default_campus() -> Self {
        let mut alias_index = HashMap::new();
        let mut prefix_index = HashMap::new();
        let mut scan_order = Vec::new();

        for (i, def) in BUILDINGS.iter().enumerate() {
            for alias in def.aliases {
                alias_index.insert(normalize(alias), i);
                scan_order.push((alias.to_string(), i));
            }
            for prefix in def.room_prefixes {
                prefix_index.insert(prefix.to_string(), i);
            }
        }

        scan_order.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            alias_index,
            prefix_index,
            scan_order,
        }
    }

    /// Resolve a free-text location mention. Tries the alias dictionary on
    /// the normalized whole string, then a room-code parse, then an alias
    /// scan within the string ("room Q014, Quinn School" resolves either way).
    pub fn canonicalize(&self, raw_location: Option<&str>) -> Option<CanonicalLocation> {
        let raw = raw_location?.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some(&i) = self.alias_index.get(&normalize(raw)) {
            return Some(self.location(i, None));
        }

        if let Some(found) = self.room_code(raw) {
            return Some(found);
        }

        self.scan(raw)
    }

    /// Find the first building alias mentioned anywhere in a longer text.
    /// Longest aliases are tried first.
    pub fn scan(&self, text: &str) -> Option<CanonicalLocation> {
        let lowered = text.to_lowercase();
        for (alias, i) in &self.scan_order {
            if crate::lexicon::word_hit(&lowered, alias).is_some() {
                let room = self.room_code(text).and_then(|loc| {
                    // Only keep the room when it belongs to the same building.
                    (loc.building == BUILDINGS[*i].id).then_some(loc.room).flatten()
                });
                return Some(self.location(*i, room));
            }
        }
        self.room_code(text)
    }

    /// True when the text names any campus building or room code. Used by
    /// the online-only filter.
    pub fn mentions_campus_location(&self, text: &str) -> bool {
        self.scan(text).is_some()
    }

    fn room_code(&self, text: &str) -> Option<CanonicalLocation> {
        for caps in ROOM_CODE_RE.captures_iter(text) {
            let prefix = caps[1].to_uppercase();
            let suffix = &caps[2];
            if let Some(&i) = self.prefix_index.get(&prefix) {
                return Some(self.location(i, Some(format!("{prefix}{suffix}"))));
            }
        }
        None
    }

    fn location(&self, i: usize, room: Option<String>) -> CanonicalLocation {
        CanonicalLocation {
            building: BUILDINGS[i].id.to_string(),
            building_name: BUILDINGS[i].name.to_string(),
            room,
        }
    }
}

/// Lowercase and collapse interior whitespace.
fn normalize(s: &str) -> String {
    s.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}
