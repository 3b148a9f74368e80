// Input providers
//
// Everything the orchestrator has to ask a person for goes through
// `InputProvider`. `PresetInput` answers from a `RunConfig`, `ConsoleInput`
// asks on any reader/writer pair.

use crate::config::{FloorPlan, RunConfig, SegmentDates};
use crate::error::{EngineError, EngineResult};
use crate::rules::distribution::DateEntry;
use crate::rules::engine::{BucketRules, GridRule, LeftoverPolicy, MatchStrategy, StrategySet};
use crate::rules::range::{is_skip_token, parse_rule};
use crate::rules::segmentation::{BreakSubMode, BreakTexts};
use crate::types::{Category, GridPart};
use regex::Regex;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::sync::LazyLock;

static PLAN_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,，、;；\s]+").expect("valid plan separator regex"));

pub trait InputProvider {
    /// Only asked for categories present in the source.
    fn strategies(&mut self, present: &[Category]) -> EngineResult<StrategySet>;

    fn later_priority(&mut self) -> EngineResult<bool>;

    fn include_bracing(&mut self) -> EngineResult<bool>;

    fn buckets(&mut self, present: &[Category]) -> EngineResult<Vec<BucketRules>>;

    fn breaks(&mut self) -> EngineResult<BreakTexts>;

    fn segment_dates(&mut self, segments: usize) -> EngineResult<SegmentDates>;

    fn single_day(&mut self) -> EngineResult<Option<String>>;

    /// `floors` lists the floor labels present per category.
    fn floor_plan(&mut self, floors: &BTreeMap<Category, Vec<String>>) -> EngineResult<FloorPlan>;

    /// Only asked when something is left over.
    fn leftover_policy(
        &mut self,
        leftovers: &BTreeMap<Category, Vec<String>>,
        bucket_count: usize,
    ) -> EngineResult<LeftoverPolicy>;
}

/// Answers every question from a pre-supplied configuration.
pub struct PresetInput {
    config: RunConfig,
}

impl PresetInput {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }
}

impl InputProvider for PresetInput {
    fn strategies(&mut self, _present: &[Category]) -> EngineResult<StrategySet> {
        self.config.strategies()
    }

    fn later_priority(&mut self) -> EngineResult<bool> {
        Ok(self.config.later_priority)
    }

    fn include_bracing(&mut self) -> EngineResult<bool> {
        Ok(self.config.include_bracing)
    }

    fn buckets(&mut self, _present: &[Category]) -> EngineResult<Vec<BucketRules>> {
        Ok(self.config.bucket_rules())
    }

    fn breaks(&mut self) -> EngineResult<BreakTexts> {
        Ok(self.config.breaks.clone())
    }

    fn segment_dates(&mut self, _segments: usize) -> EngineResult<SegmentDates> {
        Ok(self.config.segment_dates.clone())
    }

    fn single_day(&mut self) -> EngineResult<Option<String>> {
        let date = self.config.single_day.date.trim();
        Ok((!date.is_empty()).then(|| date.to_string()))
    }

    fn floor_plan(&mut self, _floors: &BTreeMap<Category, Vec<String>>) -> EngineResult<FloorPlan> {
        Ok(self.config.resolved_floor_plan())
    }

    fn leftover_policy(
        &mut self,
        _leftovers: &BTreeMap<Category, Vec<String>>,
        _bucket_count: usize,
    ) -> EngineResult<LeftoverPolicy> {
        Ok(self.config.leftover.clone())
    }
}

/// Reads `date[:limit]` tokens, e.g. `2025-08-27:5 2025-08-28`.
pub fn parse_plan_entries(text: &str) -> Vec<DateEntry> {
    PLAN_SEPARATOR_RE
        .split(text.trim())
        .filter(|t| !t.is_empty())
        .map(|token| {
            let token = token.replace('：', ":");
            match token.rsplit_once(':') {
                Some((date, limit)) => match limit.trim().parse::<usize>() {
                    Ok(limit) => DateEntry::new(date.trim(), Some(limit)),
                    Err(_) => DateEntry::new(&token, None),
                },
                None => DateEntry::new(&token, None),
            }
        })
        .collect()
}

/// Interactive prompts over any line reader and writer.
///
/// `q` on any prompt raises `BackStep`; end of input raises `Aborted`.
pub struct ConsoleInput<R: BufRead, W: Write> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> ConsoleInput<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn say(&mut self, text: &str) -> EngineResult<()> {
        writeln!(self.writer, "{text}")?;
        Ok(())
    }

    fn prompt(&mut self, question: &str) -> EngineResult<String> {
        write!(self.writer, "{question}")?;
        self.writer.flush()?;
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(EngineError::Aborted);
        }
        let answer = line.trim().to_string();
        if answer.eq_ignore_ascii_case("q") {
            return Err(EngineError::BackStep);
        }
        Ok(answer)
    }

    fn ask_yes_no(&mut self, question: &str, default: bool) -> EngineResult<bool> {
        loop {
            let answer = self.prompt(question)?.to_lowercase();
            match answer.as_str() {
                "" => return Ok(default),
                "y" | "yes" | "是" => return Ok(true),
                "n" | "no" | "否" => return Ok(false),
                _ => self.say("Please answer y or n.")?,
            }
        }
    }

    fn ask_strategy(&mut self, category: Category) -> EngineResult<MatchStrategy> {
        loop {
            let answer = self.prompt(&format!(
                "{category} matching [number/floor] (default number): "
            ))?;
            if answer.is_empty() {
                return Ok(MatchStrategy::default());
            }
            match answer.parse() {
                Ok(strategy) => return Ok(strategy),
                Err(e) => self.say(&e.to_string())?,
            }
        }
    }

    /// Per-part grid rules. Blank repeats the previous part, `lk` declines.
    fn ask_grid_rule(&mut self, date: &str) -> EngineResult<GridRule> {
        let mut rule = GridRule::new();
        let mut previous = String::new();
        for part in GridPart::ALL {
            let answer = self.prompt(&format!(
                "  [{date}] 网架 {} range (blank = same as previous, lk = skip): ",
                part.code()
            ))?;
            let text = if answer.is_empty() {
                previous.clone()
            } else {
                answer
            };
            rule = rule.with_part(part, parse_rule(&text));
            if !is_skip_token(&text) {
                previous = text;
            }
        }
        Ok(rule)
    }

    fn ask_bucket(&mut self, date: &str, present: &[Category]) -> EngineResult<BucketRules> {
        let mut bucket = BucketRules::new(date);
        for &category in present {
            if category == Category::GridFrame {
                bucket = bucket.grid(self.ask_grid_rule(date)?);
            } else {
                let text =
                    self.prompt(&format!("  [{date}] {category} range (blank or lk = none): "))?;
                bucket = bucket.rule(category, parse_rule(&text));
            }
        }
        let keywords = self.prompt(&format!("  [{date}] keywords (comma separated, optional): "))?;
        Ok(bucket.keywords(
            PLAN_SEPARATOR_RE
                .split(&keywords)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
        ))
    }

    fn ask_entries(&mut self, question: &str) -> EngineResult<Vec<DateEntry>> {
        let text = self.prompt(question)?;
        Ok(parse_plan_entries(&text))
    }
}

impl<R: BufRead, W: Write> InputProvider for ConsoleInput<R, W> {
    fn strategies(&mut self, present: &[Category]) -> EngineResult<StrategySet> {
        let mut set = StrategySet::default();
        if present.contains(&Category::Bracing) {
            set.bracing = self.ask_strategy(Category::Bracing)?;
        }
        if present.contains(&Category::GridFrame) {
            set.grid = self.ask_strategy(Category::GridFrame)?;
        }
        Ok(set)
    }

    fn later_priority(&mut self) -> EngineResult<bool> {
        self.ask_yes_no("Later dates win on overlap? [Y/n]: ", true)
    }

    fn include_bracing(&mut self) -> EngineResult<bool> {
        self.ask_yes_no("Include 支撑 pages? [Y/n]: ", true)
    }

    fn buckets(&mut self, present: &[Category]) -> EngineResult<Vec<BucketRules>> {
        let mut buckets: Vec<BucketRules> = Vec::new();
        loop {
            let date = match self.prompt(&format!(
                "Date of bucket {} (blank to finish, q = back): ",
                buckets.len() + 1
            )) {
                Ok(date) => date,
                Err(EngineError::BackStep) if !buckets.is_empty() => {
                    buckets.pop();
                    continue;
                }
                Err(e) => return Err(e),
            };
            if date.is_empty() {
                return Ok(buckets);
            }
            match self.ask_bucket(&date, present) {
                Ok(bucket) => buckets.push(bucket),
                // Re-enter the same bucket from its date.
                Err(EngineError::BackStep) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn breaks(&mut self) -> EngineResult<BreakTexts> {
        let sub_mode = loop {
            let answer = self.prompt("Breakpoints [shared/separate/none] (default shared): ")?;
            match answer.to_lowercase().as_str() {
                "" | "shared" | "s" => break BreakSubMode::Shared,
                "separate" | "sep" => break BreakSubMode::Separate,
                "none" | "n" => break BreakSubMode::None,
                _ => self.say("Please answer shared, separate or none.")?,
            }
        };
        let mut texts = BreakTexts {
            sub_mode,
            ..BreakTexts::default()
        };
        match sub_mode {
            BreakSubMode::Shared => {
                texts.shared = self.prompt("  Floor breakpoints (e.g. 3 6 10): ")?;
            }
            BreakSubMode::Separate => {
                texts.column = self.prompt("  钢柱 breakpoints: ")?;
                texts.beam = self.prompt("  钢梁 breakpoints: ")?;
            }
            BreakSubMode::None => {}
        }
        texts.bracing = self.prompt("  支撑 breakpoints (blank = same as floors): ")?;
        texts.grid = self.prompt("  网架 breakpoints (blank = same as floors): ")?;
        Ok(texts)
    }

    fn segment_dates(&mut self, segments: usize) -> EngineResult<SegmentDates> {
        let first = self.prompt("Date of the first segment (optional): ")?;
        let rest = if segments > 1 {
            self.prompt("Date of later segments (blank = same): ")?
        } else {
            String::new()
        };
        Ok(SegmentDates { first, rest })
    }

    fn single_day(&mut self) -> EngineResult<Option<String>> {
        let date = self.prompt("Date (optional): ")?;
        Ok((!date.is_empty()).then_some(date))
    }

    fn floor_plan(&mut self, floors: &BTreeMap<Category, Vec<String>>) -> EngineResult<FloorPlan> {
        let mut plan = FloorPlan::new();
        for (category, labels) in floors {
            let mut per_floor = BTreeMap::new();
            let default = self.ask_entries(&format!(
                "{category} default dates for every floor (date[:limit] ..., optional): "
            ))?;
            if !default.is_empty() {
                per_floor.insert("*".to_string(), default);
            }
            for label in labels {
                let entries = self.ask_entries(&format!(
                    "  {category} {label} dates (blank = default): "
                ))?;
                if !entries.is_empty() {
                    per_floor.insert(label.clone(), entries);
                }
            }
            plan.insert(*category, per_floor);
        }
        Ok(plan)
    }

    fn leftover_policy(
        &mut self,
        leftovers: &BTreeMap<Category, Vec<String>>,
        bucket_count: usize,
    ) -> EngineResult<LeftoverPolicy> {
        for (category, names) in leftovers {
            self.say(&format!("{} unassigned {}: {}", names.len(), category, names.join(", ")))?;
        }
        loop {
            let answer = self.prompt(
                "Leftovers: [m]erge into last / merge [i]nto bucket / [f]allback dates / [r]aise: ",
            )?;
            match answer.to_lowercase().as_str() {
                "" | "m" => return Ok(LeftoverPolicy::MergeLast),
                "r" => return Ok(LeftoverPolicy::Raise),
                "f" => {
                    let entries = self.ask_entries("  Fallback dates (date[:limit] ...): ")?;
                    if !entries.is_empty() {
                        return Ok(LeftoverPolicy::FallbackPlan { entries });
                    }
                }
                "i" => {
                    let index = self.prompt(&format!("  Bucket number (1-{bucket_count}): "))?;
                    match index.parse::<usize>() {
                        Ok(n) if (1..=bucket_count).contains(&n) => {
                            return Ok(LeftoverPolicy::MergeInto { index: n - 1 })
                        }
                        _ => self.say("No such bucket.")?,
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rank;
    use std::io::Cursor;

    fn console(script: &str) -> ConsoleInput<Cursor<Vec<u8>>, Vec<u8>> {
        ConsoleInput::new(Cursor::new(script.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_plan_entries() {
        let entries = parse_plan_entries("2025-08-27:5，2025-08-28 2025-08-29：0");
        assert_eq!(
            entries,
            [
                DateEntry::new("2025-08-27", Some(5)),
                DateEntry::new("2025-08-28", None),
                DateEntry::new("2025-08-29", Some(0)),
            ]
        );
    }

    #[test]
    fn test_console_buckets_with_grid_parts() {
        let mut input = console("2025-08-27\n1-3\n2-4\n\nlk\n\nGZ,GL\n\n");
        let buckets = input
            .buckets(&[Category::ColumnSteel, Category::GridFrame])
            .unwrap();
        assert_eq!(buckets.len(), 1);
        let bucket = &buckets[0];
        assert_eq!(bucket.label, "2025-08-27");
        assert_eq!(bucket.keywords, ["GZ", "GL"]);

        let engine_rule = |part| match &bucket.rules[&Category::GridFrame] {
            crate::rules::engine::CategoryRule::Grid(g) => g.rule_for(part).cloned(),
            _ => None,
        };
        // Blank repeats the previous part; lk declines but does not reset "previous".
        assert!(engine_rule(GridPart::LowerChord).is_some_and(|r| r.contains(Rank::Num(4))));
        assert!(engine_rule(GridPart::WebMember).is_some_and(|r| !r.is_enabled()));
        assert!(engine_rule(GridPart::Generic).is_some_and(|r| r.contains(Rank::Num(3))));
    }

    #[test]
    fn test_back_step_drops_previous_bucket() {
        let mut input = console("d1\n1\n\nq\nd2\n2\n\n\n");
        let buckets = input.buckets(&[Category::ColumnSteel]).unwrap();
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["d2"]);
    }

    #[test]
    fn test_back_step_on_first_prompt_propagates() {
        let mut input = console("q\n");
        assert!(matches!(
            input.buckets(&[Category::ColumnSteel]),
            Err(EngineError::BackStep)
        ));
    }

    #[test]
    fn test_end_of_input_aborts() {
        let mut input = console("");
        assert!(matches!(input.later_priority(), Err(EngineError::Aborted)));
    }

    #[test]
    fn test_strategy_prompt_retries_invalid_answers() {
        let mut input = console("sideways\nfloor\n");
        let set = input.strategies(&[Category::Bracing]).unwrap();
        assert_eq!(set.bracing, MatchStrategy::Floor);
        assert_eq!(set.grid, MatchStrategy::Number);
        let transcript = String::from_utf8(input.into_writer()).unwrap();
        assert!(transcript.contains("invalid match strategy"));
    }

    #[test]
    fn test_leftover_merge_into() {
        let leftovers: BTreeMap<Category, Vec<String>> =
            [(Category::ColumnSteel, vec!["GZ9".to_string()])].into_iter().collect();
        let mut input = console("i\n7\ni\n2\n");
        assert_eq!(
            input.leftover_policy(&leftovers, 3).unwrap(),
            LeftoverPolicy::MergeInto { index: 1 }
        );
    }

    #[test]
    fn test_preset_input_answers_from_config() {
        let config = RunConfig {
            later_priority: false,
            ..RunConfig::default()
        };
        let mut input = PresetInput::new(config);
        assert!(!input.later_priority().unwrap());
        assert_eq!(input.single_day().unwrap(), None);
        assert_eq!(
            input.leftover_policy(&BTreeMap::new(), 0).unwrap(),
            LeftoverPolicy::MergeLast
        );
    }
}
