use crate::error::{EngineError, EngineResult};
use crate::rules::distribution::DateEntry;
use crate::rules::engine::{
    AssignOptions, BucketRules, GridRule, LeftoverPolicy, MatchStrategy, StrategySet,
};
use crate::rules::range::parse_rule;
use crate::rules::segmentation::BreakTexts;
use crate::types::{Category, GridPart};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_strategy() -> String {
    "number".to_string()
}

/// How entities are partitioned into buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Per-date range rules.
    #[default]
    DateBuckets,
    /// Floor breakpoints.
    FloorBreaks,
    /// Everything in one bucket.
    SingleDay,
    /// Per-floor date plans with quotas.
    FloorDatePlan,
}

impl RunMode {
    pub const ALL: [RunMode; 4] = [
        RunMode::DateBuckets,
        RunMode::FloorBreaks,
        RunMode::SingleDay,
        RunMode::FloorDatePlan,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RunMode::DateBuckets => "date_buckets",
            RunMode::FloorBreaks => "floor_breaks",
            RunMode::SingleDay => "single_day",
            RunMode::FloorDatePlan => "floor_date_plan",
        }
    }
}

impl FromStr for RunMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        match key.as_str() {
            "1" | "date_buckets" | "dates" => Ok(RunMode::DateBuckets),
            "2" | "floor_breaks" | "floors" => Ok(RunMode::FloorBreaks),
            "3" | "single_day" | "single" => Ok(RunMode::SingleDay),
            "4" | "floor_date_plan" | "plan" => Ok(RunMode::FloorDatePlan),
            _ => Err(EngineError::InvalidMode(s.trim().to_string())),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A category rule as written in the config: plain range text, or per-part
/// texts for grid frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleText {
    Text(String),
    Parts {
        parts: BTreeMap<String, String>,
        /// Overrides `grid_strategy` for this bucket.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strategy: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub date: String,
    /// Category (label or config name) -> rule text.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleText>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl BucketConfig {
    pub fn to_rules(&self) -> BucketRules {
        let mut bucket = BucketRules::new(&self.date).keywords(self.keywords.clone());
        for (key, text) in &self.rules {
            let Some(category) = Category::parse(key) else {
                warn!("⚠️  Unknown category '{}' in bucket {}, ignored", key, self.date);
                continue;
            };
            bucket = match text {
                RuleText::Text(text) => bucket.rule(category, parse_rule(text)),
                RuleText::Parts { parts, strategy } => {
                    if category != Category::GridFrame {
                        warn!("⚠️  Part rules only apply to grid frames, ignored for {}", category);
                        continue;
                    }
                    let mut rule = grid_rule(parts);
                    if let Some(text) = strategy {
                        match text.parse::<MatchStrategy>() {
                            Ok(strategy) => rule = rule.with_strategy(strategy),
                            Err(e) => warn!("⚠️  {} in bucket {}, using the run default", e, self.date),
                        }
                    }
                    bucket.grid(rule)
                }
            };
        }
        bucket
    }
}

fn grid_rule(parts: &BTreeMap<String, String>) -> GridRule {
    let mut rule = GridRule::new();
    for (key, text) in parts {
        match GridPart::parse(key) {
            Some(part) => rule = rule.with_part(part, parse_rule(text)),
            None => warn!("⚠️  Unknown grid part '{}', ignored", key),
        }
    }
    rule
}

/// Dates stamped on floor segments: the first segment gets `first`, every
/// later one gets `rest` (or `first` when `rest` is blank).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDates {
    #[serde(default)]
    pub first: String,
    #[serde(default)]
    pub rest: String,
}

impl SegmentDates {
    pub fn for_position(&self, position: usize) -> Option<&str> {
        let first = self.first.trim();
        let rest = self.rest.trim();
        let date = if position == 0 || rest.is_empty() {
            first
        } else {
            rest
        };
        (!date.is_empty()).then_some(date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleDayConfig {
    #[serde(default)]
    pub date: String,
}

/// Category key -> floor label (or `*`) -> dates, as written in the config.
pub type FloorPlanConfig = BTreeMap<String, BTreeMap<String, Vec<DateEntry>>>;

/// Resolved per-category floor plans.
pub type FloorPlan = BTreeMap<Category, BTreeMap<String, Vec<DateEntry>>>;

/// Everything one run needs besides the source rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub mode: RunMode,
    /// `number` or `floor`.
    #[serde(default = "default_strategy")]
    pub bracing_strategy: String,
    #[serde(default = "default_strategy")]
    pub grid_strategy: String,
    /// Later buckets win on overlap.
    #[serde(default = "default_true")]
    pub later_priority: bool,
    #[serde(default = "default_true")]
    pub include_bracing: bool,
    #[serde(default)]
    pub leftover: LeftoverPolicy,
    #[serde(default)]
    pub buckets: Vec<BucketConfig>,
    #[serde(default)]
    pub breaks: BreakTexts,
    #[serde(default)]
    pub segment_dates: SegmentDates,
    #[serde(default)]
    pub single_day: SingleDayConfig,
    #[serde(default)]
    pub floor_plan: FloorPlanConfig,
    /// Page titles the in-memory workbook starts with. Empty means the
    /// standard normal and μ template pages.
    #[serde(default)]
    pub templates: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            bracing_strategy: default_strategy(),
            grid_strategy: default_strategy(),
            later_priority: true,
            include_bracing: true,
            leftover: LeftoverPolicy::default(),
            buckets: Vec::new(),
            breaks: BreakTexts::default(),
            segment_dates: SegmentDates::default(),
            single_day: SingleDayConfig::default(),
            floor_plan: FloorPlanConfig::new(),
            templates: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn for_mode(mode: RunMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Load config from a YAML or JSON file (by extension) and validate it.
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        let is_json = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let config: RunConfig = if is_json {
            serde_json::from_str(&content).with_context(|| format!("parsing JSON config {}", path))?
        } else {
            serde_yaml::from_str(&content).with_context(|| format!("parsing YAML config {}", path))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!("⚠️  Failed to load config from {}: {:#}, using defaults", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Configuration errors that must stop the run before it starts.
    pub fn validate(&self) -> EngineResult<()> {
        self.strategies()?;
        for bucket in &self.buckets {
            for text in bucket.rules.values() {
                if let RuleText::Parts {
                    strategy: Some(strategy),
                    ..
                } = text
                {
                    strategy.parse::<MatchStrategy>()?;
                }
            }
        }
        if let LeftoverPolicy::MergeInto { index } = self.leftover {
            if self.mode == RunMode::DateBuckets && index >= self.buckets.len() {
                return Err(EngineError::InvalidLeftoverTarget {
                    index,
                    count: self.buckets.len(),
                });
            }
        }
        Ok(())
    }

    pub fn strategies(&self) -> EngineResult<StrategySet> {
        Ok(StrategySet {
            bracing: self.bracing_strategy.parse()?,
            grid: self.grid_strategy.parse()?,
        })
    }

    pub fn assign_options(&self) -> EngineResult<AssignOptions> {
        Ok(AssignOptions {
            strategies: self.strategies()?,
            later_priority: self.later_priority,
        })
    }

    pub fn bucket_rules(&self) -> Vec<BucketRules> {
        self.buckets.iter().map(BucketConfig::to_rules).collect()
    }

    pub fn resolved_floor_plan(&self) -> FloorPlan {
        let mut plan = FloorPlan::new();
        for (key, floors) in &self.floor_plan {
            match Category::parse(key) {
                Some(category) => {
                    plan.entry(category).or_default().extend(floors.clone());
                }
                None => warn!("⚠️  Unknown category '{}' in floor plan, ignored", key),
            }
        }
        plan
    }
}

/// Named run presets, listed by `--show-configs`.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    configs: BTreeMap<String, RunConfig>,
}

impl ConfigManager {
    pub fn new() -> Self {
        let mut manager = Self {
            configs: BTreeMap::new(),
        };
        manager.load_builtin_configs();
        manager
    }

    pub fn get_config(&self, name: &str) -> Option<&RunConfig> {
        self.configs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    pub fn load_config_from_file(&mut self, name: &str, path: &str) -> Result<()> {
        let config = RunConfig::load_from_file(path)?;
        self.configs.insert(name.to_string(), config);
        Ok(())
    }

    fn load_builtin_configs(&mut self) {
        for mode in RunMode::ALL {
            self.configs
                .insert(mode.name().to_string(), RunConfig::for_mode(mode));
        }

        // Floor-number matching for bracing and grids, earlier buckets win.
        let by_floor = RunConfig {
            bracing_strategy: "floor".to_string(),
            grid_strategy: "floor".to_string(),
            later_priority: false,
            ..RunConfig::for_mode(RunMode::DateBuckets)
        };
        self.configs.insert("date_buckets_by_floor".to_string(), by_floor);

        let strict = RunConfig {
            leftover: LeftoverPolicy::Raise,
            ..RunConfig::for_mode(RunMode::DateBuckets)
        };
        self.configs.insert("date_buckets_strict".to_string(), strict);
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
