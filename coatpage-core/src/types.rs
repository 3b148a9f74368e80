use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// ===== LAYOUT CONSTANTS =====
// Every report sheet carries 5 blocks, every block 5 reading rows,
// every row 8 readings followed by the aggregate.

pub const ROWS_PER_BLOCK: usize = 5;
pub const BLOCKS_PER_PAGE: usize = 5;
pub const READINGS_PER_ROW: usize = 8;
pub const CELLS_PER_ROW: usize = READINGS_PER_ROW + 1;

/// Written into every cell that has no measurement.
pub const PLACEHOLDER: &str = "/";

/// A pure digit run of this length (or longer) marks a block as amplified.
pub const AMPLIFIED_DIGITS_THRESHOLD: usize = 4;

/// Any parsed reading at or above this magnitude marks a block as amplified.
pub const AMPLIFIED_MAGNITUDE: f64 = 1000.0;

// ===== COMPONENT CATEGORIES =====

/// Construction-component category. The declaration order is the print order
/// used for page ordering; synonym matching uses its own fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ColumnSteel,
    BeamSteel,
    Bracing,
    GridFrame,
    Other,
}

impl Category {
    pub const PRINT_ORDER: [Category; 5] = [
        Category::ColumnSteel,
        Category::BeamSteel,
        Category::Bracing,
        Category::GridFrame,
        Category::Other,
    ];

    /// Sheet label used by the report template.
    pub fn label(&self) -> &'static str {
        match self {
            Category::ColumnSteel => "钢柱",
            Category::BeamSteel => "钢梁",
            Category::Bracing => "支撑",
            Category::GridFrame => "网架",
            Category::Other => "其他",
        }
    }

    /// Accepts either the sheet label or the snake_case config name.
    pub fn parse(text: &str) -> Option<Category> {
        let t = text.trim();
        Self::PRINT_ORDER.into_iter().find(|c| {
            c.label() == t || c.config_name().eq_ignore_ascii_case(t)
        })
    }

    pub fn config_name(&self) -> &'static str {
        match self {
            Category::ColumnSteel => "column_steel",
            Category::BeamSteel => "beam_steel",
            Category::Bracing => "bracing",
            Category::GridFrame => "grid_frame",
            Category::Other => "other",
        }
    }

    /// `Other` has no template sheets of its own and borrows the column layout.
    pub fn template_source(&self) -> Category {
        match self {
            Category::Other => Category::ColumnSteel,
            c => *c,
        }
    }

    /// Bracing and grid frames can be matched by numeric id instead of floor.
    pub fn has_numeric_id(&self) -> bool {
        matches!(self, Category::Bracing | Category::GridFrame)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Grid-frame member kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridPart {
    UpperChord,
    LowerChord,
    WebMember,
    Generic,
}

impl GridPart {
    pub const ALL: [GridPart; 4] = [
        GridPart::UpperChord,
        GridPart::LowerChord,
        GridPart::WebMember,
        GridPart::Generic,
    ];

    /// Drawing-code prefix of the member kind.
    pub fn code(&self) -> &'static str {
        match self {
            GridPart::UpperChord => "SX",
            GridPart::LowerChord => "XX",
            GridPart::WebMember => "FG",
            GridPart::Generic => "GEN",
        }
    }

    pub fn parse(text: &str) -> Option<GridPart> {
        let t = text.trim();
        match t.to_ascii_uppercase().as_str() {
            "SX" | "UPPER_CHORD" => Some(GridPart::UpperChord),
            "XX" | "LOWER_CHORD" => Some(GridPart::LowerChord),
            "FG" | "WEB_MEMBER" => Some(GridPart::WebMember),
            "GEN" | "GENERIC" => Some(GridPart::Generic),
            _ => match t {
                "上弦" => Some(GridPart::UpperChord),
                "下弦" => Some(GridPart::LowerChord),
                "腹杆" => Some(GridPart::WebMember),
                "泛称" => Some(GridPart::Generic),
                _ => None,
            },
        }
    }
}

// ===== FLOORS =====

/// Numeric projection of a floor (or of a numeric id) used by rules and
/// segmentation. Variant order is the sort order: every numeric value sorts
/// before the machine room, which sorts before the roof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Num(i64),
    MachineRoom,
    Roof,
}

impl Rank {
    /// Next representable rank, used when coalescing adjacent intervals.
    pub fn successor(&self) -> Option<Rank> {
        match self {
            Rank::Num(n) => n.checked_add(1).map(Rank::Num),
            Rank::MachineRoom => Some(Rank::Roof),
            Rank::Roof => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Num(n) => write!(f, "{n}"),
            Rank::MachineRoom => f.write_str("机房层"),
            Rank::Roof => f.write_str("屋面"),
        }
    }
}

/// Floor recognized from a component name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Floor {
    Basement(u32),
    Level(u32),
    MachineRoom,
    Roof,
    Unknown,
}

impl Floor {
    /// Basements and unrecognized floors collapse into floor 0.
    pub fn rank(&self) -> Rank {
        match self {
            Floor::Level(n) => Rank::Num(i64::from(*n)),
            Floor::Basement(_) | Floor::Unknown => Rank::Num(0),
            Floor::MachineRoom => Rank::MachineRoom,
            Floor::Roof => Rank::Roof,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Floor::Basement(n) => format!("B{n}"),
            Floor::Level(n) => format!("{n}F"),
            Floor::MachineRoom => "机房层".to_string(),
            Floor::Roof => "屋面".to_string(),
            Floor::Unknown => "F?".to_string(),
        }
    }

    /// Deepest basement first, then numeric floors, machine room, roof, unknown.
    fn sort_key(&self) -> (u8, i64) {
        match self {
            Floor::Basement(n) => (0, -i64::from(*n)),
            Floor::Level(n) => (1, i64::from(*n)),
            Floor::MachineRoom => (2, 0),
            Floor::Roof => (3, 0),
            Floor::Unknown => (4, 0),
        }
    }
}

impl PartialOrd for Floor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Floor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for Floor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ===== ENTITIES =====

/// One inspected component, derived once from its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub category: Category,
    pub floor: Floor,
    /// Only extracted for bracing and grid frames.
    pub numeric_id: Option<i64>,
    /// Only present for grid frames.
    pub grid_part: Option<GridPart>,
}

impl Entity {
    pub fn rank(&self) -> Rank {
        self.floor.rank()
    }
}

// ===== READINGS =====

/// One measurement line: 8 readings plus the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingRow {
    readings: [String; READINGS_PER_ROW],
    aggregate: String,
}

fn cell_or_placeholder(value: &str) -> String {
    let v = value.trim();
    if v.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        v.to_string()
    }
}

impl ReadingRow {
    /// Row of placeholders, used to pad short blocks.
    pub fn placeholder() -> Self {
        Self {
            readings: std::array::from_fn(|_| PLACEHOLDER.to_string()),
            aggregate: PLACEHOLDER.to_string(),
        }
    }

    /// Raw readings: blanks become placeholders, extra values are dropped.
    pub fn from_readings<S: AsRef<str>>(values: &[S], aggregate: &str) -> Self {
        Self {
            readings: std::array::from_fn(|i| {
                values
                    .get(i)
                    .map(|v| cell_or_placeholder(v.as_ref()))
                    .unwrap_or_else(|| PLACEHOLDER.to_string())
            }),
            aggregate: cell_or_placeholder(aggregate),
        }
    }

    /// Measurement-point values, each occupying two reading cells.
    pub fn from_points<S: AsRef<str>>(points: &[S], aggregate: &str) -> Self {
        let doubled: Vec<String> = points
            .iter()
            .flat_map(|p| {
                let v = cell_or_placeholder(p.as_ref());
                [v.clone(), v]
            })
            .collect();
        Self::from_readings(&doubled, aggregate)
    }

    pub fn readings(&self) -> &[String] {
        &self.readings
    }

    pub fn aggregate(&self) -> &str {
        &self.aggregate
    }

    /// All 9 cells in column order.
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.readings
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.aggregate.as_str()))
    }

    pub fn is_placeholder(&self) -> bool {
        self.cells().all(|c| c == PLACEHOLDER)
    }
}

// ===== STREAMS & PAGES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamTag {
    Normal,
    Amplified,
}

impl StreamTag {
    pub fn is_amplified(&self) -> bool {
        matches!(self, StreamTag::Amplified)
    }
}

/// The (category, stream) pair a page is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageKind {
    pub category: Category,
    pub stream: StreamTag,
}

impl PageKind {
    pub fn new(category: Category, stream: StreamTag) -> Self {
        Self { category, stream }
    }

    /// Template pages this kind is cloned from.
    pub fn template(&self) -> PageKind {
        PageKind::new(self.category.template_source(), self.stream)
    }

    pub fn base_title(&self) -> String {
        match self.stream {
            StreamTag::Normal => self.category.label().to_string(),
            StreamTag::Amplified => format!("{}μ", self.category.label()),
        }
    }

    /// Sheet title for the n-th page of this kind: `钢柱`, `钢柱（2）`, `钢梁μ（3）`.
    pub fn title(&self, number: u32) -> String {
        if number <= 1 {
            self.base_title()
        } else {
            format!("{}（{}）", self.base_title(), number)
        }
    }

    /// Inverse of [`PageKind::title`]. Only titles of the four template
    /// categories and `其他` are recognized.
    pub fn parse_title(title: &str) -> Option<(PageKind, u32)> {
        Category::PRINT_ORDER.into_iter().find_map(|category| {
            let rest = title.strip_prefix(category.label())?;
            let (stream, rest) = match rest.strip_prefix('μ') {
                Some(r) => (StreamTag::Amplified, r),
                None => (StreamTag::Normal, rest),
            };
            let number = if rest.is_empty() {
                1
            } else {
                let digits = rest.strip_prefix('（')?.strip_suffix('）')?;
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok()?
            };
            Some((PageKind::new(category, stream), number))
        })
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ordering_places_special_floors_last() {
        assert!(Rank::Num(i64::MAX) < Rank::MachineRoom);
        assert!(Rank::MachineRoom < Rank::Roof);
        assert!(Rank::Num(-3) < Rank::Num(2));
    }

    #[test]
    fn test_floor_label_ordering() {
        let mut floors = vec![
            Floor::Unknown,
            Floor::Roof,
            Floor::Level(3),
            Floor::Basement(1),
            Floor::MachineRoom,
            Floor::Basement(2),
            Floor::Level(1),
        ];
        floors.sort();
        let labels: Vec<String> = floors.iter().map(Floor::label).collect();
        assert_eq!(labels, ["B2", "B1", "1F", "3F", "机房层", "屋面", "F?"]);
    }

    #[test]
    fn test_reading_row_normalization() {
        let row = ReadingRow::from_readings(&["101", " ", "99"], "");
        let cells: Vec<&str> = row.cells().collect();
        assert_eq!(cells.len(), CELLS_PER_ROW);
        assert_eq!(cells[0], "101");
        assert_eq!(cells[1], PLACEHOLDER);
        assert_eq!(cells[2], "99");
        assert_eq!(cells[8], PLACEHOLDER);
    }

    #[test]
    fn test_points_fill_two_cells_each() {
        let row = ReadingRow::from_points(&["120", "130", "140"], "130");
        assert_eq!(
            row.readings(),
            ["120", "120", "130", "130", "140", "140", "/", "/"]
        );
        assert_eq!(row.aggregate(), "130");
    }

    #[test]
    fn test_page_titles() {
        let normal = PageKind::new(Category::ColumnSteel, StreamTag::Normal);
        let amplified = PageKind::new(Category::BeamSteel, StreamTag::Amplified);
        assert_eq!(normal.title(1), "钢柱");
        assert_eq!(normal.title(2), "钢柱（2）");
        assert_eq!(amplified.title(3), "钢梁μ（3）");
        assert_eq!(
            PageKind::new(Category::Other, StreamTag::Amplified).template(),
            PageKind::new(Category::ColumnSteel, StreamTag::Amplified)
        );
    }

    #[test]
    fn test_parse_title() {
        let amplified = PageKind::new(Category::BeamSteel, StreamTag::Amplified);
        assert_eq!(PageKind::parse_title("钢梁μ（3）"), Some((amplified, 3)));
        assert_eq!(
            PageKind::parse_title("其他"),
            Some((PageKind::new(Category::Other, StreamTag::Normal), 1))
        );
        assert_eq!(PageKind::parse_title("钢柱（x）"), None);
        assert_eq!(PageKind::parse_title("封面"), None);
        assert_eq!(PageKind::parse_title("钢柱汇总"), None);
    }
}
