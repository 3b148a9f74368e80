use super::engine::{GroupsByCategory, MatchStrategy, StrategySet};
use crate::cache::EntityCache;
use crate::types::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use tracing::info;

static BREAK_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,，;；、]+").expect("valid break separator regex"));
static BREAK_DASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[~～〜－—–−至到]").expect("valid break dash regex"));
static BREAK_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*-\s*(\d+)$").expect("valid break range regex"));
static FIRST_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)").expect("valid digits regex"));

// Ranges wider than this are not expanded into breakpoints.
const MAX_EXPANDED_RANGE: i64 = 10_000;

/// Parses breakpoint text: integers and `a-b` ranges (expanded), any other
/// token contributes its first digit run. Sorted and deduplicated.
pub fn parse_breaks(text: &str) -> Vec<i64> {
    let mut values = BTreeSet::new();
    for token in BREAK_SEPARATOR_RE.split(text.trim()).filter(|t| !t.is_empty()) {
        let normalized = BREAK_DASH_RE.replace_all(token, "-");
        if let Some(caps) = BREAK_RANGE_RE.captures(&normalized) {
            if let (Ok(a), Ok(b)) = (caps[1].parse::<i64>(), caps[2].parse::<i64>()) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                if hi - lo <= MAX_EXPANDED_RANGE {
                    values.extend(lo..=hi);
                } else {
                    values.insert(lo);
                    values.insert(hi);
                }
                continue;
            }
        }
        if let Some(n) = FIRST_DIGITS_RE
            .captures(token)
            .and_then(|caps| caps[1].parse::<i64>().ok())
        {
            values.insert(n);
        }
    }
    values.into_iter().collect()
}

/// Segment of a floor rank. Numeric floors land in the first segment whose
/// breakpoint they do not exceed (or the post-last one); the machine room and
/// the roof always take the two final segments.
pub fn segment_index(rank: Rank, breaks: &[i64]) -> usize {
    if breaks.is_empty() {
        return match rank {
            Rank::Num(_) => 0,
            Rank::MachineRoom => 1,
            Rank::Roof => 2,
        };
    }
    match rank {
        Rank::MachineRoom => breaks.len(),
        Rank::Roof => breaks.len() + 1,
        Rank::Num(n) => numeric_segment(n, breaks),
    }
}

fn numeric_segment(n: i64, breaks: &[i64]) -> usize {
    breaks
        .iter()
        .position(|&b| n <= b)
        .unwrap_or(breaks.len())
}

/// Segment of a numeric id. Entities without an id go to the post-last segment.
pub fn number_segment_index(id: Option<i64>, breaks: &[i64]) -> usize {
    match id {
        Some(n) => numeric_segment(n, breaks),
        None => breaks.len(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakSubMode {
    /// Columns and beams share one breakpoint list.
    #[default]
    Shared,
    /// Columns and beams each use their own list.
    Separate,
    /// No breakpoints for columns and beams; only the special floors split off.
    None,
}

/// Resolved breakpoint lists per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakPlan {
    pub column: Vec<i64>,
    pub beam: Vec<i64>,
    pub bracing: Vec<i64>,
    pub grid: Vec<i64>,
}

/// Raw breakpoint texts as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakTexts {
    pub sub_mode: BreakSubMode,
    pub shared: String,
    pub column: String,
    pub beam: String,
    pub bracing: String,
    pub grid: String,
}

impl BreakTexts {
    /// Bracing and grid lists default to the column/beam anchor when left empty.
    pub fn resolve(&self) -> BreakPlan {
        let shared = parse_breaks(&self.shared);
        let own_or_shared = |text: &str| {
            if text.trim().is_empty() {
                shared.clone()
            } else {
                parse_breaks(text)
            }
        };

        let (column, beam) = match self.sub_mode {
            BreakSubMode::Shared => {
                let union: BTreeSet<i64> = shared
                    .iter()
                    .chain(parse_breaks(&self.column).iter())
                    .chain(parse_breaks(&self.beam).iter())
                    .copied()
                    .collect();
                let anchor: Vec<i64> = union.into_iter().collect();
                (anchor.clone(), anchor)
            }
            BreakSubMode::Separate => (own_or_shared(&self.column), own_or_shared(&self.beam)),
            BreakSubMode::None => (Vec::new(), Vec::new()),
        };

        let anchor: Vec<i64> = column
            .iter()
            .chain(beam.iter())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let own_or_anchor = |text: &str| {
            if text.trim().is_empty() {
                anchor.clone()
            } else {
                parse_breaks(text)
            }
        };

        BreakPlan {
            bracing: own_or_anchor(&self.bracing),
            grid: own_or_anchor(&self.grid),
            column,
            beam,
        }
    }
}

pub type Segments = BTreeMap<usize, GroupsByCategory>;

/// Partitions entity groups into floor (or id) bands.
pub struct FloorSegmenter {
    strategies: StrategySet,
}

impl FloorSegmenter {
    pub fn new(strategies: StrategySet) -> Self {
        Self { strategies }
    }

    pub fn segment_of(&self, entity: &Entity, category: Category, plan: &BreakPlan) -> usize {
        let by_floor = |breaks: &[i64]| segment_index(entity.rank(), breaks);
        match category {
            Category::ColumnSteel => by_floor(&plan.column),
            Category::BeamSteel => by_floor(&plan.beam),
            Category::Bracing | Category::GridFrame => {
                let breaks = if category == Category::Bracing {
                    &plan.bracing
                } else {
                    &plan.grid
                };
                match self.strategies.for_category(category) {
                    MatchStrategy::Floor => by_floor(breaks),
                    MatchStrategy::Number => number_segment_index(entity.numeric_id, breaks),
                }
            }
            // Unsegmented.
            Category::Other => 0,
        }
    }

    /// Segment index -> category -> groups. Input order is kept inside each cell.
    pub fn segment(
        &self,
        groups: &GroupsByCategory,
        plan: &BreakPlan,
        cache: &EntityCache,
    ) -> Segments {
        let mut segments = Segments::new();
        for (cat, cat_groups) in groups {
            for group in cat_groups {
                let entity = cache.entity(&group.name);
                let seg = self.segment_of(&entity, *cat, plan);
                segments
                    .entry(seg)
                    .or_default()
                    .entry(*cat)
                    .or_default()
                    .push(group.clone());
            }
        }
        info!("🧱 Split groups into {} floor segments", segments.len());
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::EntityGroup;

    #[test]
    fn test_parse_breaks() {
        assert_eq!(parse_breaks("5 10，3"), vec![3, 5, 10]);
        assert_eq!(parse_breaks("3-5、5"), vec![3, 4, 5]);
        assert_eq!(parse_breaks("7~6"), vec![6, 7]);
        assert_eq!(parse_breaks("8F；x"), vec![8]);
        assert!(parse_breaks("").is_empty());
    }

    #[test]
    fn test_segment_without_breaks() {
        assert_eq!(segment_index(Rank::Num(12), &[]), 0);
        assert_eq!(segment_index(Rank::MachineRoom, &[]), 1);
        assert_eq!(segment_index(Rank::Roof, &[]), 2);
    }

    #[test]
    fn test_segment_with_breaks() {
        let breaks = [5, 10];
        assert_eq!(segment_index(Rank::Num(0), &breaks), 0);
        assert_eq!(segment_index(Rank::Num(5), &breaks), 0);
        assert_eq!(segment_index(Rank::Num(6), &breaks), 1);
        assert_eq!(segment_index(Rank::Num(11), &breaks), 2);
        assert_eq!(segment_index(Rank::MachineRoom, &breaks), 2);
        assert_eq!(segment_index(Rank::Roof, &breaks), 3);
    }

    #[test]
    fn test_number_segments() {
        assert_eq!(number_segment_index(Some(3), &[5]), 0);
        assert_eq!(number_segment_index(Some(9), &[5]), 1);
        assert_eq!(number_segment_index(None, &[5]), 1);
        assert_eq!(number_segment_index(None, &[]), 0);
    }

    #[test]
    fn test_break_texts_resolution() {
        let texts = BreakTexts {
            sub_mode: BreakSubMode::Shared,
            shared: "5".into(),
            column: "8".into(),
            bracing: "2".into(),
            ..BreakTexts::default()
        };
        let plan = texts.resolve();
        assert_eq!(plan.column, vec![5, 8]);
        assert_eq!(plan.beam, vec![5, 8]);
        assert_eq!(plan.bracing, vec![2]);
        assert_eq!(plan.grid, vec![5, 8]);

        let separate = BreakTexts {
            sub_mode: BreakSubMode::Separate,
            shared: "4".into(),
            beam: "6".into(),
            ..BreakTexts::default()
        }
        .resolve();
        assert_eq!(separate.column, vec![4]);
        assert_eq!(separate.beam, vec![6]);
        assert_eq!(separate.grid, vec![4, 6]);

        let none = BreakTexts {
            sub_mode: BreakSubMode::None,
            shared: "4".into(),
            ..BreakTexts::default()
        }
        .resolve();
        assert!(none.column.is_empty());
        assert!(none.bracing.is_empty());
    }

    #[test]
    fn test_segment_groups() {
        let cache = EntityCache::new();
        let mut groups = GroupsByCategory::new();
        let g = |name: &str| EntityGroup {
            name: name.to_string(),
            rows: vec![ReadingRow::placeholder()],
        };
        groups.insert(
            Category::ColumnSteel,
            vec![g("GZ1 3F"), g("GZ2 7F"), g("GZ3 屋面"), g("GZ4 机房层")],
        );
        groups.insert(Category::Bracing, vec![g("WZ9 1F"), g("斜撑 1F")]);
        groups.insert(Category::Other, vec![g("栏杆 9F")]);

        let plan = BreakTexts {
            shared: "5".into(),
            ..BreakTexts::default()
        }
        .resolve();
        let segments = FloorSegmenter::new(StrategySet::default()).segment(&groups, &plan, &cache);

        let names = |seg: usize, cat: Category| -> Vec<String> {
            segments
                .get(&seg)
                .and_then(|m| m.get(&cat))
                .map(|gs| gs.iter().map(|g| g.name.clone()).collect())
                .unwrap_or_default()
        };
        assert_eq!(names(0, Category::ColumnSteel), ["GZ1 3F"]);
        assert_eq!(names(1, Category::ColumnSteel), ["GZ2 7F", "GZ4 机房层"]);
        assert_eq!(names(2, Category::ColumnSteel), ["GZ3 屋面"]);
        assert_eq!(names(1, Category::Bracing), ["WZ9 1F", "斜撑 1F"]);
        assert_eq!(names(0, Category::Other), ["栏杆 9F"]);
    }
}
