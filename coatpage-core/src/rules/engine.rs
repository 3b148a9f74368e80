use super::distribution::DateEntry;
use super::range::Rule;
use crate::blocks::EntityGroup;
use crate::cache::EntityCache;
use crate::error::{EngineError, EngineResult};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// How bracing and grid-frame entities are matched against bucket rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Match the numeric id extracted from the name (WZ3, XX-12).
    #[default]
    Number,
    /// Match the floor rank, like columns and beams.
    Floor,
}

impl FromStr for MatchStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "number" | "num" | "n" | "编号" => Ok(MatchStrategy::Number),
            "floor" | "f" | "楼层" => Ok(MatchStrategy::Floor),
            other => Err(EngineError::InvalidStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::Number => f.write_str("number"),
            MatchStrategy::Floor => f.write_str("floor"),
        }
    }
}

/// Per-run strategy choice, fixed for the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySet {
    pub bracing: MatchStrategy,
    pub grid: MatchStrategy,
}

impl StrategySet {
    pub fn for_category(&self, category: Category) -> MatchStrategy {
        match category {
            Category::Bracing => self.bracing,
            Category::GridFrame => self.grid,
            _ => MatchStrategy::Floor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignOptions {
    pub strategies: StrategySet,
    /// When buckets overlap, the later-declared one wins.
    pub later_priority: bool,
}

impl Default for AssignOptions {
    fn default() -> Self {
        Self {
            strategies: StrategySet::default(),
            later_priority: true,
        }
    }
}

/// Grid-frame rules keyed by member kind. A kind without its own entry uses
/// the `Generic` entry; an explicit `Reject` does not fall back.
///
/// `strategy` overrides the run-wide grid strategy for this bucket only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRule {
    parts: BTreeMap<GridPart, Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    strategy: Option<MatchStrategy>,
}

impl GridRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_part(mut self, part: GridPart, rule: Rule) -> Self {
        self.parts.insert(part, rule);
        self
    }

    pub fn rule_for(&self, part: GridPart) -> Option<&Rule> {
        self.parts
            .get(&part)
            .or_else(|| self.parts.get(&GridPart::Generic))
    }

    pub fn parts(&self) -> &BTreeMap<GridPart, Rule> {
        &self.parts
    }

    pub fn with_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn strategy(&self) -> Option<MatchStrategy> {
        self.strategy
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryRule {
    Simple(Rule),
    Grid(GridRule),
}

impl CategoryRule {
    fn rule_for(&self, part: Option<GridPart>) -> Option<&Rule> {
        match self {
            CategoryRule::Simple(rule) => Some(rule),
            CategoryRule::Grid(grid) => grid.rule_for(part.unwrap_or(GridPart::Generic)),
        }
    }

    fn strategy(&self) -> Option<MatchStrategy> {
        match self {
            CategoryRule::Simple(_) => None,
            CategoryRule::Grid(grid) => grid.strategy(),
        }
    }
}

/// One target partition with its per-category rules and keyword filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRules {
    pub label: String,
    pub rules: BTreeMap<Category, CategoryRule>,
    /// Case-insensitive substrings; empty matches every name.
    pub keywords: Vec<String>,
}

impl BucketRules {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    pub fn rule(mut self, category: Category, rule: Rule) -> Self {
        self.rules.insert(category, CategoryRule::Simple(rule));
        self
    }

    pub fn grid(mut self, rule: GridRule) -> Self {
        self.rules.insert(Category::GridFrame, CategoryRule::Grid(rule));
        self
    }

    pub fn keywords<S: Into<String>>(mut self, keywords: impl IntoIterator<Item = S>) -> Self {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn matches_keywords(&self, name: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let lower = name.to_lowercase();
        self.keywords
            .iter()
            .any(|k| lower.contains(&k.to_lowercase()))
    }
}

pub type GroupsByCategory = BTreeMap<Category, Vec<EntityGroup>>;

/// What happens to groups that matched no bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum LeftoverPolicy {
    /// Append to the last bucket.
    #[default]
    MergeLast,
    MergeInto {
        index: usize,
    },
    /// Spread over these dates with the date distribution rules.
    FallbackPlan {
        entries: Vec<DateEntry>,
    },
    Raise,
}

impl fmt::Display for LeftoverPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeftoverPolicy::MergeLast => f.write_str("merge into last bucket"),
            LeftoverPolicy::MergeInto { index } => write!(f, "merge into bucket {}", index + 1),
            LeftoverPolicy::FallbackPlan { entries } => {
                write!(f, "fallback plan over {} dates", entries.len())
            }
            LeftoverPolicy::Raise => f.write_str("raise"),
        }
    }
}

/// Result of one assignment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    /// Indexed like the bucket list.
    pub by_bucket: Vec<GroupsByCategory>,
    pub leftovers: GroupsByCategory,
}

impl Assignment {
    pub fn leftover_count(&self) -> usize {
        self.leftovers.values().map(Vec::len).sum()
    }

    pub fn leftover_names(&self) -> BTreeMap<Category, Vec<String>> {
        self.leftovers
            .iter()
            .filter(|(_, groups)| !groups.is_empty())
            .map(|(cat, groups)| (*cat, groups.iter().map(|g| g.name.clone()).collect()))
            .collect()
    }

    /// Appends every leftover to the end of the given bucket.
    pub fn merge_leftovers_into(&mut self, index: usize) -> EngineResult<()> {
        let count = self.by_bucket.len();
        let Some(target) = self.by_bucket.get_mut(index) else {
            return Err(EngineError::InvalidLeftoverTarget { index, count });
        };
        for (cat, groups) in std::mem::take(&mut self.leftovers) {
            target.entry(cat).or_default().extend(groups);
        }
        Ok(())
    }

    pub fn raise_if_unassigned(&self) -> EngineResult<()> {
        if self.leftover_count() == 0 {
            Ok(())
        } else {
            Err(EngineError::Unassigned {
                leftovers: self.leftover_names(),
            })
        }
    }
}

/// Matches entity groups against bucket rules, first match wins.
pub struct AssignmentEngine {
    options: AssignOptions,
}

impl AssignmentEngine {
    pub fn new(options: AssignOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AssignOptions {
        &self.options
    }

    fn bucket_order(&self, count: usize) -> Box<dyn Iterator<Item = usize>> {
        if self.options.later_priority {
            Box::new((0..count).rev())
        } else {
            Box::new(0..count)
        }
    }

    /// Does this bucket's rule for the entity's category accept it?
    pub fn rule_matches(&self, entity: &Entity, bucket: &BucketRules) -> bool {
        let Some(category_rule) = bucket.rules.get(&entity.category) else {
            return false;
        };
        let Some(rule) = category_rule.rule_for(entity.grid_part) else {
            return false;
        };
        if !rule.is_enabled() {
            return false;
        }

        let strategy = category_rule
            .strategy()
            .unwrap_or_else(|| self.options.strategies.for_category(entity.category));
        match strategy {
            MatchStrategy::Floor => rule.contains(entity.rank()),
            // Bracing without an id still fits an accept-all rule; grid
            // members always need their number.
            MatchStrategy::Number => match entity.numeric_id {
                Some(id) => rule.contains_number(id),
                None => entity.category == Category::Bracing && rule.is_accept_all(),
            },
        }
    }

    /// Index of the winning bucket for one entity, if any.
    pub fn find_bucket(&self, entity: &Entity, buckets: &[BucketRules]) -> Option<usize> {
        self.bucket_order(buckets.len()).find(|&bi| {
            let bucket = &buckets[bi];
            self.rule_matches(entity, bucket) && bucket.matches_keywords(&entity.name)
        })
    }

    pub fn assign(
        &self,
        groups: &GroupsByCategory,
        buckets: &[BucketRules],
        cache: &EntityCache,
    ) -> Assignment {
        let mut by_bucket: Vec<GroupsByCategory> = vec![GroupsByCategory::new(); buckets.len()];
        let mut leftovers = GroupsByCategory::new();

        for (cat, cat_groups) in groups {
            for group in cat_groups {
                // The caller's grouping decides the category, e.g. bracing folded into Other.
                let mut entity = cache.entity(&group.name);
                entity.category = *cat;
                match self.find_bucket(&entity, buckets) {
                    Some(bi) => {
                        debug!("{} -> {}", group.name, buckets[bi].label);
                        by_bucket[bi].entry(*cat).or_default().push(group.clone());
                    }
                    None => leftovers.entry(*cat).or_default().push(group.clone()),
                }
            }
        }

        let assignment = Assignment {
            by_bucket,
            leftovers,
        };
        let leftover_count = assignment.leftover_count();
        info!(
            "🗂️  Assigned groups into {} buckets ({} leftover)",
            buckets.len(),
            leftover_count
        );
        if leftover_count > 0 {
            for (cat, names) in assignment.leftover_names() {
                warn!("⚠️  {} unassigned {}: {}", names.len(), cat, names.join(", "));
            }
        }
        assignment
    }
}
