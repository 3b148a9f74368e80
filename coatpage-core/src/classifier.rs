use crate::types::*;
use regex::Regex;
use std::sync::LazyLock;

// Synonym table, evaluated top to bottom. Grid frames come first so that
// chord codes like "XX3" never fall through to a broader category.
const CATEGORY_SYNONYMS: [(Category, &[&str]); 4] = [
    (
        Category::GridFrame,
        &[
            "网架", "WJ", "SPACE FRAME", "SPACEFRAME", "GRID", "GRID STRUCTURE",
            "桁架网架", "球节点", "网壳", "SJ", "XX", "SX", "FG", "上弦", "下弦", "腹杆",
        ],
    ),
    (Category::Bracing, &["支撑", "WZ", "ZC", "支架", "斜撑", "撑杆"]),
    (Category::ColumnSteel, &["钢柱", "柱", "GZ", "框架柱", "立柱", "H柱"]),
    (
        Category::BeamSteel,
        &["钢梁", "梁", "GL", "连系梁", "檩条", "楼梯梁", "平台梁", "屋架梁"],
    ),
];

static MACHINE_ROOM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"机房(?:层)?|\bjf\b|machine\s*room").expect("valid machine room regex")
});
static ROOF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"屋面|屋顶|顶\s*层|\b(?:wm|dc|roof)\b").expect("valid roof regex")
});
// A floor letter glued to a code ("GL3") is part of the code, not a floor marker.
static LEADING_FLOOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^A-Za-z])[FL]\s*(\d+)").expect("valid leading floor regex")
});
static TRAILING_FLOOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*[FL]").expect("valid trailing floor regex"));
static STOREY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*[层樓楼]").expect("valid storey regex"));
static BASEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bB\s*(\d+)\b|负\s*(\d+)\s*层?").expect("valid basement regex")
});

static LOWER_CHORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Z0-9])XX[-_]?\d|下\s*弦").expect("valid lower chord regex")
});
static WEB_MEMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Z0-9])FG[-_]?\d|腹\s*杆").expect("valid web member regex")
});
static UPPER_CHORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Z0-9])SX[-_]?\d|上\s*弦").expect("valid upper chord regex")
});

static LOWER_CHORD_NO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:XX|下\s*弦)\s*[-_]?(\d+)").expect("valid XX number regex"));
static WEB_MEMBER_NO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:FG|腹\s*杆)\s*[-_]?(\d+)").expect("valid FG number regex"));
static UPPER_CHORD_NO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:SX|上\s*弦)\s*[-_]?(\d+)").expect("valid SX number regex"));
static GRID_NO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:WJ|网架|SPACE\s*FRAME|GRID)\s*[-_]?(\d+)").expect("valid grid number regex")
});

static BRACING_CODE_NO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:WZ|ZC)\s*[-–—]?\s*(\d+)\b").expect("valid bracing code regex")
});
static BRACING_WORD_NO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"支撑\s*[-–—]?\s*(\d+)").expect("valid bracing word regex"));

/// Derives category, floor, numeric id and grid sub-kind from a component name.
///
/// Every function here is total: a name that matches nothing degrades to
/// `Other`, `Floor::Unknown` and `None`.
pub struct EntityClassifier;

impl Default for EntityClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, name: &str) -> Entity {
        let category = self.category_of(name);
        let (numeric_id, grid_part) = match category {
            Category::Bracing => (bracing_number(name), None),
            Category::GridFrame => {
                let part = grid_part_of(name);
                (grid_number(name, part), Some(part))
            }
            _ => (None, None),
        };

        Entity {
            name: name.to_string(),
            category,
            floor: self.floor_of(name),
            numeric_id,
            grid_part,
        }
    }

    /// First category in table order whose synonym list hits. ASCII synonyms
    /// match case-insensitively, the rest as exact substrings.
    pub fn category_of(&self, name: &str) -> Category {
        let upper = name.to_uppercase();
        for (category, words) in CATEGORY_SYNONYMS.iter() {
            let hit = words.iter().any(|w| {
                if w.is_ascii() {
                    upper.contains(&w.to_ascii_uppercase())
                } else {
                    name.contains(w)
                }
            });
            if hit {
                return *category;
            }
        }
        Category::Other
    }

    /// Machine room is checked before roof so "屋面机房层" lands on the machine room.
    pub fn floor_of(&self, name: &str) -> Floor {
        let s = normalize_dashes(name);
        let lower = s.to_lowercase();

        if MACHINE_ROOM_RE.is_match(&lower) {
            return Floor::MachineRoom;
        }
        if ROOF_RE.is_match(&lower) {
            return Floor::Roof;
        }

        let numbered = LEADING_FLOOR_RE
            .captures(&s)
            .or_else(|| TRAILING_FLOOR_RE.captures(&s))
            .or_else(|| STOREY_RE.captures(&s))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok());
        if let Some(n) = numbered {
            return Floor::Level(n);
        }

        if let Some(caps) = BASEMENT_RE.captures(&s) {
            let depth = caps
                .get(1)
                .or_else(|| caps.get(2))
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(0);
            return Floor::Basement(depth);
        }

        Floor::Unknown
    }
}

fn normalize_dashes(name: &str) -> String {
    name.replace(&['－', '—', '–'][..], "-")
}

/// Grid member kind. Codes only count when followed by a number ("XX3", "FG-12").
pub fn grid_part_of(name: &str) -> GridPart {
    let upper = name.to_uppercase();
    if LOWER_CHORD_RE.is_match(&upper) {
        GridPart::LowerChord
    } else if WEB_MEMBER_RE.is_match(&upper) {
        GridPart::WebMember
    } else if UPPER_CHORD_RE.is_match(&upper) {
        GridPart::UpperChord
    } else {
        GridPart::Generic
    }
}

fn first_number(re: &Regex, text: &str) -> Option<i64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Only parsed after an explicit prefix so stray floor digits are not picked up.
pub fn grid_number(name: &str, part: GridPart) -> Option<i64> {
    let upper = name.to_uppercase();
    let re: &Regex = match part {
        GridPart::LowerChord => &*LOWER_CHORD_NO_RE,
        GridPart::WebMember => &*WEB_MEMBER_NO_RE,
        GridPart::UpperChord => &*UPPER_CHORD_NO_RE,
        GridPart::Generic => &*GRID_NO_RE,
    };
    first_number(re, &upper)
}

pub fn bracing_number(name: &str) -> Option<i64> {
    first_number(&BRACING_CODE_NO_RE, name).or_else(|| first_number(&BRACING_WORD_NO_RE, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> EntityClassifier {
        EntityClassifier::new()
    }

    #[test]
    fn test_category_synonyms() {
        let c = classifier();
        assert_eq!(c.category_of("GZ1 3F"), Category::ColumnSteel);
        assert_eq!(c.category_of("gz-2"), Category::ColumnSteel);
        assert_eq!(c.category_of("钢梁 5层"), Category::BeamSteel);
        assert_eq!(c.category_of("wz12"), Category::Bracing);
        assert_eq!(c.category_of("下弦杆 XX3"), Category::GridFrame);
        assert_eq!(c.category_of("楼梯扶手"), Category::Other);
    }

    #[test]
    fn test_table_order_decides_shared_hits() {
        // "支撑柱" hits both bracing and column; bracing precedes column in the table.
        assert_eq!(classifier().category_of("支撑柱"), Category::Bracing);
        // "SX" inside a column name still wins for grid frames.
        assert_eq!(classifier().category_of("GZ SX1"), Category::GridFrame);
    }

    #[test]
    fn test_floor_markers() {
        let c = classifier();
        assert_eq!(c.floor_of("GZ1 3F"), Floor::Level(3));
        assert_eq!(c.floor_of("GL3 5F"), Floor::Level(5));
        assert_eq!(c.floor_of("F12-GZ"), Floor::Level(12));
        assert_eq!(c.floor_of("钢梁 7层"), Floor::Level(7));
        assert_eq!(c.floor_of("GZ B2"), Floor::Basement(2));
        assert_eq!(c.floor_of("负 2 柱"), Floor::Basement(2));
        assert_eq!(c.floor_of("钢柱"), Floor::Unknown);
    }

    #[test]
    fn test_machine_room_wins_over_roof() {
        let c = classifier();
        assert_eq!(c.floor_of("屋面机房层 GZ1"), Floor::MachineRoom);
        assert_eq!(c.floor_of("GL2 JF"), Floor::MachineRoom);
        assert_eq!(c.floor_of("屋顶 GL1"), Floor::Roof);
        assert_eq!(c.floor_of("GL WM"), Floor::Roof);
        assert!(c.floor_of("GZ roof").rank() > c.floor_of("GZ jf").rank());
    }

    #[test]
    fn test_grid_parts_and_numbers() {
        assert_eq!(grid_part_of("XX-12"), GridPart::LowerChord);
        assert_eq!(grid_part_of("腹杆 3"), GridPart::WebMember);
        assert_eq!(grid_part_of("sx_7"), GridPart::UpperChord);
        assert_eq!(grid_part_of("网架15"), GridPart::Generic);
        // Code embedded in a longer token is not a member code.
        assert_eq!(grid_part_of("AXX3"), GridPart::Generic);

        assert_eq!(grid_number("XX-12", GridPart::LowerChord), Some(12));
        assert_eq!(grid_number("下弦 4", GridPart::LowerChord), Some(4));
        assert_eq!(grid_number("网架-15", GridPart::Generic), Some(15));
        assert_eq!(grid_number("网架 A区", GridPart::Generic), None);
    }

    #[test]
    fn test_bracing_numbers() {
        assert_eq!(bracing_number("WZ3"), Some(3));
        assert_eq!(bracing_number("zc-8 2F"), Some(8));
        assert_eq!(bracing_number("支撑-5"), Some(5));
        assert_eq!(bracing_number("斜撑"), None);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let c = classifier();
        let a = c.classify("WZ7 屋面");
        let b = c.classify("WZ7 屋面");
        assert_eq!(a, b);
        assert_eq!(a.category, Category::Bracing);
        assert_eq!(a.floor, Floor::Roof);
        assert_eq!(a.numeric_id, Some(7));
        assert_eq!(a.grid_part, None);
    }
}
