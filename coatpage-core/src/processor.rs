use crate::blocks::{expand_blocks, group_rows, EntityGroup};
use crate::cache::{calculate_json_hash, EntityCache, RunFingerprint};
use crate::config::{FloorPlan, RunMode, SegmentDates};
use crate::dates::DateLabel;
use crate::error::{EngineError, EngineResult};
use crate::input::InputProvider;
use crate::pages::{
    allocate_category, fill_blocks_to_pages, BucketPages, PageHandle, PageLayout, PageValidator,
    TemplateWriter, ValidationReport,
};
use crate::rules::distribution::{distribute_by_dates, DateEntry};
use crate::rules::engine::{
    AssignOptions, Assignment, AssignmentEngine, BucketRules, GroupsByCategory, LeftoverPolicy,
    StrategySet,
};
use crate::rules::segmentation::{BreakTexts, FloorSegmenter};
use crate::source::SourceReader;
use crate::types::*;
use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static FIRST_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid first number regex"));

/// Simple profiler that collects timings for run steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        info!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        info!("📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            info!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        info!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// One partition of the run: a date, a floor segment, or the single day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub date: Option<DateLabel>,
    pub groups: GroupsByCategory,
}

impl Bucket {
    /// Bucket whose label is also its date.
    fn dated(label: &str, groups: GroupsByCategory) -> Self {
        let date = DateLabel::parse(label);
        Self {
            label: label.to_string(),
            date: (!date.is_empty()).then_some(date),
            groups,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Answers collected from the input provider, kept for the report and the
/// run fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInput {
    pub strategies: StrategySet,
    pub later_priority: Option<bool>,
    pub include_bracing: bool,
    pub buckets: Vec<BucketRules>,
    pub breaks: Option<BreakTexts>,
    pub segment_dates: Option<SegmentDates>,
    pub single_day: Option<String>,
    pub floor_plan: FloorPlan,
    pub leftover: Option<LeftoverPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub label: String,
    pub date: Option<String>,
    pub entities: BTreeMap<Category, Vec<String>>,
    pub pages: Vec<String>,
}

/// Everything a run produced, serialized by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub generated_at: DateTime<Utc>,
    pub fingerprint: String,
    pub entity_count: usize,
    pub settings: ResolvedInput,
    pub buckets: Vec<BucketSummary>,
    pub pages: Vec<PageLayout>,
    pub deleted_pages: Vec<String>,
    pub warnings: Vec<String>,
    pub validation: ValidationReport,
}

/// Output of the page phase.
#[derive(Debug, Default)]
struct Rendered {
    pages_by_bucket: Vec<Vec<String>>,
    layouts: Vec<PageLayout>,
    dropped: Vec<String>,
    deleted: Vec<String>,
}

pub struct ReportProcessor {
    reader: Box<dyn SourceReader>,
    cache: EntityCache,
}

impl ReportProcessor {
    pub fn new(reader: Box<dyn SourceReader>) -> Self {
        Self {
            reader,
            cache: EntityCache::new(),
        }
    }

    /// Reads the source, partitions it according to `mode`, writes the pages
    /// and validates the result.
    pub fn run(
        &mut self,
        mode: RunMode,
        input: &mut dyn InputProvider,
        writer: &mut dyn TemplateWriter,
        enable_profiling: bool,
    ) -> Result<RunReport> {
        let start_time = Instant::now();
        let mut profiler = StepProfiler::new(enable_profiling);
        let mut warnings = Vec::new();

        info!("📄 Reading source rows from {}", self.reader.name());
        let table = profiler.time_step("1. Read source", || self.reader.read_table())?;
        let groups = profiler.time_step("2. Group rows", || group_rows(&table.rows, table.layout));
        let mut by_category = profiler.time_step("3. Classify", || self.classify_groups(&groups));
        info!(
            "📋 {} components in {} categories",
            groups.len(),
            by_category.len()
        );

        let mut resolved = ResolvedInput {
            include_bracing: true,
            ..ResolvedInput::default()
        };
        if by_category.contains_key(&Category::Bracing) {
            resolved.include_bracing = input.include_bracing()?;
            if !resolved.include_bracing {
                let skipped = by_category.remove(&Category::Bracing).map_or(0, |g| g.len());
                info!("🚫 Skipping {} bracing components", skipped);
                warnings.push(format!("{skipped} bracing components excluded from the report"));
            }
        }
        let present: Vec<Category> = by_category.keys().copied().collect();

        let buckets = profiler.time_step("4. Partition", || match mode {
            RunMode::DateBuckets => {
                self.date_buckets(&by_category, &present, input, &mut resolved, &mut warnings)
            }
            RunMode::FloorBreaks => {
                self.floor_breaks(&by_category, &present, input, &mut resolved)
            }
            RunMode::SingleDay => single_day(by_category.clone(), input, &mut resolved),
            RunMode::FloorDatePlan => {
                self.floor_date_plan(&by_category, input, &mut resolved, &mut warnings)
            }
        })?;
        info!("🗂️  {} buckets for mode {}", buckets.len(), mode);

        let rendered = profiler.time_step("5. Write pages", || render(&buckets, writer))?;
        if !rendered.dropped.is_empty() {
            warnings.push(format!(
                "{} blocks did not fit and were dropped",
                rendered.dropped.len()
            ));
        }

        let validation = profiler.time_step("6. Validate", || {
            PageValidator::new().validate(&rendered.layouts, &rendered.dropped)
        });
        if !validation.is_clean() {
            warnings.push(format!("{} page validation issues", validation.issues.len()));
        }

        let fingerprint =
            RunFingerprint::new(calculate_json_hash(&table)?, calculate_json_hash(&resolved)?);

        let summaries = buckets
            .iter()
            .zip(rendered.pages_by_bucket)
            .map(|(bucket, pages)| BucketSummary {
                label: bucket.label.clone(),
                date: bucket.date.as_ref().map(ToString::to_string),
                entities: bucket
                    .groups
                    .iter()
                    .map(|(cat, groups)| (*cat, groups.iter().map(|g| g.name.clone()).collect()))
                    .collect(),
                pages,
            })
            .collect();

        profiler.print_summary();
        info!(
            "⏱️  Total run time: {:.0}ms",
            start_time.elapsed().as_millis()
        );

        Ok(RunReport {
            mode,
            generated_at: Utc::now(),
            fingerprint: fingerprint.to_hash(),
            entity_count: groups.len(),
            settings: resolved,
            buckets: summaries,
            pages: rendered.layouts,
            deleted_pages: rendered.deleted,
            warnings,
            validation,
        })
    }

    fn classify_groups(&self, groups: &[EntityGroup]) -> GroupsByCategory {
        let mut by_category = GroupsByCategory::new();
        for group in groups {
            by_category
                .entry(self.cache.category(&group.name))
                .or_default()
                .push(group.clone());
        }
        by_category
    }

    fn date_buckets(
        &self,
        groups: &GroupsByCategory,
        present: &[Category],
        input: &mut dyn InputProvider,
        resolved: &mut ResolvedInput,
        warnings: &mut Vec<String>,
    ) -> EngineResult<Vec<Bucket>> {
        resolved.strategies = input.strategies(present)?;
        let later_priority = input.later_priority()?;
        resolved.later_priority = Some(later_priority);
        resolved.buckets = input.buckets(present)?;
        if resolved.buckets.is_empty() {
            return Err(EngineError::EmptyBucketSet);
        }

        let engine = AssignmentEngine::new(AssignOptions {
            strategies: resolved.strategies,
            later_priority,
        });
        let mut assignment = engine.assign(groups, &resolved.buckets, &self.cache);
        let mut labels: Vec<String> = resolved.buckets.iter().map(|b| b.label.clone()).collect();
        self.dispose_leftovers(&mut assignment, &mut labels, input, resolved, warnings)?;

        Ok(labels
            .iter()
            .zip(assignment.by_bucket)
            .map(|(label, groups)| Bucket::dated(label, groups))
            .collect())
    }

    fn floor_breaks(
        &self,
        groups: &GroupsByCategory,
        present: &[Category],
        input: &mut dyn InputProvider,
        resolved: &mut ResolvedInput,
    ) -> EngineResult<Vec<Bucket>> {
        resolved.strategies = input.strategies(present)?;
        let texts = input.breaks()?;
        let plan = texts.resolve();
        debug!("Break plan: {:?}", plan);
        resolved.breaks = Some(texts);

        let segments = FloorSegmenter::new(resolved.strategies).segment(groups, &plan, &self.cache);
        let dates = input.segment_dates(segments.len())?;
        let buckets = segments
            .into_iter()
            .enumerate()
            .map(|(position, (index, groups))| Bucket {
                label: format!("segment {}", index + 1),
                date: dates.for_position(position).map(DateLabel::parse),
                groups,
            })
            .collect();
        resolved.segment_dates = Some(dates);
        Ok(buckets)
    }

    fn floor_date_plan(
        &self,
        groups: &GroupsByCategory,
        input: &mut dyn InputProvider,
        resolved: &mut ResolvedInput,
        warnings: &mut Vec<String>,
    ) -> EngineResult<Vec<Bucket>> {
        let mut by_floor: BTreeMap<Category, BTreeMap<Floor, Vec<EntityGroup>>> = BTreeMap::new();
        for (cat, cat_groups) in groups {
            for group in cat_groups {
                let floor = self.cache.entity(&group.name).floor;
                by_floor
                    .entry(*cat)
                    .or_default()
                    .entry(floor)
                    .or_default()
                    .push(group.clone());
            }
        }
        let floor_labels: BTreeMap<Category, Vec<String>> = by_floor
            .iter()
            .map(|(cat, floors)| (*cat, floors.keys().map(Floor::label).collect()))
            .collect();

        resolved.floor_plan = input.floor_plan(&floor_labels)?;
        let mut labels: Vec<String> = Vec::new();
        let mut assignment = Assignment::default();

        for (cat, floors) in by_floor {
            let cat_plan = resolved.floor_plan.get(&cat);
            for (floor, mut floor_groups) in floors {
                floor_groups.sort_by_key(|g| name_sort_key(&g.name));
                match cat_plan.and_then(|p| self.plan_for_floor(p, floor)) {
                    Some(entries) => {
                        for (date, slice) in distribute_by_dates(&floor_groups, entries) {
                            if slice.is_empty() {
                                continue;
                            }
                            let idx = bucket_for_date(&mut labels, &mut assignment, &date);
                            assignment.by_bucket[idx]
                                .entry(cat)
                                .or_default()
                                .extend_from_slice(slice);
                        }
                    }
                    None => {
                        debug!("No plan for {} {}", cat, floor);
                        assignment.leftovers.entry(cat).or_default().extend(floor_groups);
                    }
                }
            }
        }

        sort_by_date(&mut labels, &mut assignment);
        self.dispose_leftovers(&mut assignment, &mut labels, input, resolved, warnings)?;
        sort_by_date(&mut labels, &mut assignment);

        Ok(labels
            .iter()
            .zip(assignment.by_bucket)
            .map(|(label, groups)| Bucket::dated(label, groups))
            .collect())
    }

    /// The plan for this floor, else the `*` plan. Empty plans count as none.
    fn plan_for_floor<'p>(
        &self,
        plan: &'p BTreeMap<String, Vec<DateEntry>>,
        floor: Floor,
    ) -> Option<&'p [DateEntry]> {
        let classifier = self.cache.classifier();
        let matches = |key: &str| {
            let key = key.trim();
            if key == floor.label() {
                return true;
            }
            if let Ok(n) = key.parse::<u32>() {
                return floor == Floor::Level(n);
            }
            floor != Floor::Unknown && classifier.floor_of(key) == floor
        };
        plan.iter()
            .find(|(key, entries)| key.as_str() != "*" && !entries.is_empty() && matches(key))
            .or_else(|| plan.get_key_value("*").filter(|(_, e)| !e.is_empty()))
            .map(|(_, entries)| entries.as_slice())
    }

    fn dispose_leftovers(
        &self,
        assignment: &mut Assignment,
        labels: &mut Vec<String>,
        input: &mut dyn InputProvider,
        resolved: &mut ResolvedInput,
        warnings: &mut Vec<String>,
    ) -> EngineResult<()> {
        let count = assignment.leftover_count();
        if count == 0 {
            return Ok(());
        }
        let policy = input.leftover_policy(&assignment.leftover_names(), labels.len())?;
        info!("📦 {} leftover components: {}", count, policy);
        warnings.push(format!("{count} leftover components ({policy})"));

        match &policy {
            LeftoverPolicy::Raise => assignment.raise_if_unassigned()?,
            LeftoverPolicy::MergeLast => {
                if labels.is_empty() {
                    return Err(EngineError::EmptyBucketSet);
                }
                assignment.merge_leftovers_into(labels.len() - 1)?;
            }
            LeftoverPolicy::MergeInto { index } => assignment.merge_leftovers_into(*index)?,
            LeftoverPolicy::FallbackPlan { entries } => {
                if entries.is_empty() {
                    return Err(EngineError::MissingFallbackPlan);
                }
                for (cat, groups) in std::mem::take(&mut assignment.leftovers) {
                    for (date, slice) in distribute_by_dates(&groups, entries) {
                        if slice.is_empty() {
                            continue;
                        }
                        let idx = bucket_for_date(labels, assignment, &date);
                        assignment.by_bucket[idx]
                            .entry(cat)
                            .or_default()
                            .extend_from_slice(slice);
                    }
                }
            }
        }
        resolved.leftover = Some(policy);
        Ok(())
    }
}

fn single_day(
    groups: GroupsByCategory,
    input: &mut dyn InputProvider,
    resolved: &mut ResolvedInput,
) -> EngineResult<Vec<Bucket>> {
    let date = input.single_day()?;
    resolved.single_day = date.clone();
    let bucket = match date {
        Some(date) => Bucket::dated(&date, groups),
        None => Bucket {
            label: "all".to_string(),
            date: None,
            groups,
        },
    };
    Ok(vec![bucket])
}

/// Orders names by their first number, then by the full name.
fn name_sort_key(name: &str) -> (i64, String) {
    let number = FIRST_NUMBER_RE
        .find(name)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(i64::MAX);
    (number, name.to_string())
}

/// Index of the bucket for `date`, merging by normalized date.
fn bucket_for_date(labels: &mut Vec<String>, assignment: &mut Assignment, date: &str) -> usize {
    let key = DateLabel::parse(date).key();
    if let Some(idx) = labels.iter().position(|l| DateLabel::parse(l).key() == key) {
        return idx;
    }
    labels.push(date.trim().to_string());
    assignment.by_bucket.push(GroupsByCategory::new());
    labels.len() - 1
}

fn sort_by_date(labels: &mut Vec<String>, assignment: &mut Assignment) {
    let mut paired: Vec<(String, GroupsByCategory)> = std::mem::take(labels)
        .into_iter()
        .zip(std::mem::take(&mut assignment.by_bucket))
        .collect();
    paired.sort_by_cached_key(|(label, _)| DateLabel::parse(label));
    for (label, groups) in paired {
        labels.push(label);
        assignment.by_bucket.push(groups);
    }
}

/// Allocates, orders, fills, annotates and cleans up the pages of every bucket.
fn render(buckets: &[Bucket], writer: &mut dyn TemplateWriter) -> EngineResult<Rendered> {
    let categories: Vec<Category> = Category::PRINT_ORDER
        .into_iter()
        .filter(|cat| {
            buckets
                .iter()
                .any(|b| b.groups.get(cat).is_some_and(|g| !g.is_empty()))
        })
        .collect();

    // Every page is materialized before anything is written, so templates
    // are still blank when they are cloned.
    let mut slices: BTreeMap<Category, Vec<BucketPages>> = BTreeMap::new();
    for &cat in &categories {
        let blocks_by_bucket: Vec<_> = buckets
            .iter()
            .map(|b| b.groups.get(&cat).map(|g| expand_blocks(g, cat)).unwrap_or_default())
            .collect();
        slices.insert(cat, allocate_category(writer, cat, &blocks_by_bucket)?);
    }

    let bucket_slices = |bi: usize| {
        categories
            .iter()
            .filter_map(|cat| slices.get(cat).and_then(|s| s.get(bi)).map(|s| (*cat, s)))
            .collect::<Vec<_>>()
    };

    let order: Vec<PageHandle> = (0..buckets.len())
        .flat_map(bucket_slices)
        .flat_map(|(_, slice)| slice.pages.iter().map(|p| p.handle.clone()))
        .collect();
    writer.reorder_pages(&order)?;

    let mut rendered = Rendered::default();
    for (bi, bucket) in buckets.iter().enumerate() {
        let mut titles = Vec::new();
        for (cat, slice) in bucket_slices(bi) {
            if slice.blocks.is_empty() {
                continue;
            }
            let outcome = fill_blocks_to_pages(writer, &slice.pages, &slice.blocks)?;
            info!(
                "✍️  {} {}: wrote {}/{} blocks on {} pages",
                bucket.label,
                cat,
                outcome.written(),
                slice.blocks.len(),
                slice.pages.len()
            );
            if let Some(date) = &bucket.date {
                let stamp = date.to_string();
                for page in &slice.pages {
                    writer.annotate_page(&page.handle, &stamp)?;
                }
            }
            titles.extend(slice.pages.iter().map(|p| p.handle.title.clone()));
            rendered
                .layouts
                .extend(PageLayout::from_fill(&slice.pages, &outcome, &bucket.label));
            rendered.dropped.extend(outcome.dropped);
        }
        rendered.pages_by_bucket.push(titles);
    }

    rendered.deleted = cleanup_unused_pages(writer, &order)?;
    Ok(rendered)
}

/// Deletes template-kind pages nothing was allocated to. Skipped when no page
/// was used, and never empties the workbook.
fn cleanup_unused_pages(
    writer: &mut dyn TemplateWriter,
    used: &[PageHandle],
) -> EngineResult<Vec<String>> {
    if used.is_empty() {
        return Ok(Vec::new());
    }
    let used: HashSet<_> = used.iter().map(|h| h.id).collect();
    let all = writer.pages();
    let doomed: Vec<PageHandle> = all
        .iter()
        .filter(|p| !used.contains(&p.id) && PageKind::parse_title(&p.title).is_some())
        .cloned()
        .collect();
    if doomed.is_empty() {
        return Ok(Vec::new());
    }
    if doomed.len() == all.len() {
        warn!("⚠️  Refusing to delete every page of the workbook");
        return Ok(Vec::new());
    }
    writer.delete_pages(&doomed)?;
    info!("🧹 Removed {} unused template pages", doomed.len());
    Ok(doomed.into_iter().map(|h| h.title).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::input::PresetInput;
    use crate::pages::MemoryWorkbook;
    use crate::source::{SourceRow, ValueLayout, VecSource};

    fn rows(names: &[&str], value: &str) -> Vec<SourceRow> {
        names.iter().map(|n| SourceRow::new(n, &[value], "")).collect()
    }

    fn processor(rows: Vec<SourceRow>) -> ReportProcessor {
        ReportProcessor::new(Box::new(VecSource::new(ValueLayout::Readings, rows)))
    }

    #[test]
    fn test_name_sort_key() {
        let mut names = vec!["GZ10 3F", "GZ2 3F", "柱 3F", "GZ2 3F"];
        names.sort_by_key(|n| name_sort_key(n));
        assert_eq!(names, ["GZ2 3F", "GZ2 3F", "GZ10 3F", "柱 3F"]);
    }

    #[test]
    fn test_bucket_for_date_merges_same_day() {
        let mut labels = vec!["2025-08-27".to_string()];
        let mut assignment = Assignment {
            by_bucket: vec![GroupsByCategory::new()],
            ..Assignment::default()
        };
        assert_eq!(bucket_for_date(&mut labels, &mut assignment, "2025.8.27"), 0);
        assert_eq!(bucket_for_date(&mut labels, &mut assignment, "2025-08-26"), 1);
        sort_by_date(&mut labels, &mut assignment);
        assert_eq!(labels, ["2025-08-26", "2025-08-27"]);
        assert_eq!(assignment.by_bucket.len(), 2);
    }

    #[test]
    fn test_single_day_run() {
        let names: Vec<String> = (1..=7).map(|i| format!("GZ{i} 3F")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut processor = processor(rows(&names, "120"));
        let mut input = PresetInput::new(RunConfig::for_mode(RunMode::SingleDay));
        let mut wb = MemoryWorkbook::standard_template();

        let report = processor
            .run(RunMode::SingleDay, &mut input, &mut wb, false)
            .unwrap();
        assert_eq!(report.entity_count, 7);
        assert_eq!(report.buckets.len(), 1);
        assert_eq!(report.buckets[0].pages, ["钢柱", "钢柱（2）"]);
        assert!(report.validation.is_clean(), "{:?}", report.validation.issues);
        // Unused templates are gone, the used ones lead the workbook.
        assert_eq!(wb.titles(), ["钢柱", "钢柱（2）"]);
        assert_eq!(report.deleted_pages.len(), 7);
    }

    #[test]
    fn test_plan_lookup_prefers_floor_over_star() {
        let processor = processor(Vec::new());
        let plan: BTreeMap<String, Vec<DateEntry>> = [
            ("*".to_string(), vec![DateEntry::new("d0", None)]),
            ("3".to_string(), vec![DateEntry::new("d3", None)]),
            ("屋面".to_string(), vec![DateEntry::new("droof", None)]),
            ("5F".to_string(), Vec::new()),
        ]
        .into_iter()
        .collect();
        let date_of = |floor| processor.plan_for_floor(&plan, floor).map(|e| e[0].date.clone());
        assert_eq!(date_of(Floor::Level(3)).as_deref(), Some("d3"));
        assert_eq!(date_of(Floor::Roof).as_deref(), Some("droof"));
        assert_eq!(date_of(Floor::Level(5)).as_deref(), Some("d0"));
        assert_eq!(date_of(Floor::Unknown).as_deref(), Some("d0"));
    }

    #[test]
    fn test_raise_policy_fails_after_assignment() {
        let mut processor = processor(rows(&["GZ1 3F", "GZ2 9F"], "120"));
        let config: RunConfig = serde_yaml::from_str(
            r#"
leftover: { policy: raise }
buckets:
  - date: "2025-08-27"
    rules: { 钢柱: "1-5" }
"#,
        )
        .unwrap();
        let mut input = PresetInput::new(config);
        let mut wb = MemoryWorkbook::standard_template();
        let err = processor
            .run(RunMode::DateBuckets, &mut input, &mut wb, false)
            .unwrap_err();
        match err.downcast_ref::<EngineError>() {
            Some(EngineError::Unassigned { leftovers }) => {
                assert_eq!(leftovers[&Category::ColumnSteel], ["GZ2 9F"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
