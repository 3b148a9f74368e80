use crate::types::Rank;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

static DASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[－—–−~～〜至到]").expect("valid dash regex"));
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,，、;；\s]+").expect("valid separator regex"));
static INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)$").expect("valid int regex"));
static NUM_NUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)-(\d+)$").expect("valid num-num regex"));
static NUM_SPECIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)-([^\d\s-]+)$").expect("valid num-special regex"));
static SPECIAL_NUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^\d\s-]+)-(\d+)$").expect("valid special-num regex"));
static SPECIAL_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\d\s-]+)-([^\d\s-]+)$").expect("valid special-special regex")
});

/// Closed interval over ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankInterval {
    pub lo: Rank,
    pub hi: Rank,
}

impl RankInterval {
    /// Endpoints are swapped when given in reverse.
    pub fn new(a: Rank, b: Rank) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    pub fn single(v: Rank) -> Self {
        Self { lo: v, hi: v }
    }

    pub fn contains(&self, v: Rank) -> bool {
        self.lo <= v && v <= self.hi
    }
}

impl fmt::Display for RankInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lo == self.hi {
            write!(f, "{}", self.lo)
        } else {
            write!(f, "{}-{}", self.lo, self.hi)
        }
    }
}

/// Parsed inclusion predicate over floor ranks or numeric ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Matches nothing. Produced by empty input, "lk", or input with no usable token.
    #[default]
    Reject,
    /// Matches everything. Produced by "*", "all", "全部", "所有".
    Accept,
    /// Sorted, merged, non-empty interval list.
    Ranges(Vec<RankInterval>),
}

impl Rule {
    pub fn contains(&self, v: Rank) -> bool {
        match self {
            Rule::Reject => false,
            Rule::Accept => true,
            Rule::Ranges(ranges) => ranges.iter().any(|r| r.contains(v)),
        }
    }

    pub fn contains_number(&self, n: i64) -> bool {
        self.contains(Rank::Num(n))
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Rule::Reject)
    }

    pub fn is_accept_all(&self) -> bool {
        matches!(self, Rule::Accept)
    }

    /// Builds a rule from raw intervals, coalescing overlapping or adjacent ones.
    pub fn from_intervals(mut intervals: Vec<RankInterval>) -> Rule {
        if intervals.is_empty() {
            return Rule::Reject;
        }
        intervals.sort_by(|a, b| (a.lo, a.hi).cmp(&(b.lo, b.hi)));

        let mut merged: Vec<RankInterval> = Vec::with_capacity(intervals.len());
        for iv in intervals {
            match merged.last_mut() {
                Some(last) if iv.lo <= last.hi || Some(iv.lo) == last.hi.successor() => {
                    if iv.hi > last.hi {
                        last.hi = iv.hi;
                    }
                }
                _ => merged.push(iv),
            }
        }
        Rule::Ranges(merged)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Reject => f.write_str("(none)"),
            Rule::Accept => f.write_str("*"),
            Rule::Ranges(ranges) => {
                let parts: Vec<String> = ranges.iter().map(|r| r.to_string()).collect();
                f.write_str(&parts.join(","))
            }
        }
    }
}

/// Tokens that were dropped while parsing a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeDiagnostics {
    pub unrecognized: Vec<String>,
}

impl RangeDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.unrecognized.is_empty()
    }
}

fn nfkc(text: &str) -> String {
    text.nfkc().collect::<String>()
}

/// "lk" in any case or width: decline this prompt.
pub fn is_skip_token(text: &str) -> bool {
    nfkc(text).trim().to_lowercase() == "lk"
}

pub fn is_accept_all_token(text: &str) -> bool {
    let token = nfkc(text);
    let token = token.trim();
    matches!(token, "*" | "全部" | "所有") || token.to_lowercase() == "all"
}

/// Special floor names accepted inside rules and breakpoints.
pub fn special_rank(token: &str) -> Option<Rank> {
    let key = token.trim().to_lowercase();
    match key.as_str() {
        "机房" | "机房层" | "jf" => Some(Rank::MachineRoom),
        "屋面" | "屋顶" | "屋顶层" | "顶层" | "wm" | "roof" => Some(Rank::Roof),
        _ => None,
    }
}

fn parse_num(text: &str) -> Option<Rank> {
    text.parse::<i64>().ok().map(Rank::Num)
}

fn parse_token(token: &str) -> Option<RankInterval> {
    if let Some(c) = INT_RE.captures(token) {
        return parse_num(&c[1]).map(RankInterval::single);
    }
    if let Some(c) = NUM_NUM_RE.captures(token) {
        return Some(RankInterval::new(parse_num(&c[1])?, parse_num(&c[2])?));
    }
    if let Some(c) = NUM_SPECIAL_RE.captures(token) {
        return Some(RankInterval::new(parse_num(&c[1])?, special_rank(&c[2])?));
    }
    if let Some(c) = SPECIAL_NUM_RE.captures(token) {
        return Some(RankInterval::new(special_rank(&c[1])?, parse_num(&c[2])?));
    }
    if let Some(c) = SPECIAL_SPECIAL_RE.captures(token) {
        return Some(RankInterval::new(special_rank(&c[1])?, special_rank(&c[2])?));
    }
    special_rank(token).map(RankInterval::single)
}

/// Parses a rule expression and reports the tokens it had to drop.
///
/// Accepts integers, `a-b` ranges (any dash, `~`, `至`, `到`), the special
/// floors and any mix of them, separated by whitespace or ASCII/full-width
/// punctuation.
pub fn parse_rule_with_diagnostics(text: &str) -> (Rule, RangeDiagnostics) {
    let mut diagnostics = RangeDiagnostics::default();
    let trimmed = text.trim();

    if trimmed.is_empty() || is_skip_token(trimmed) {
        return (Rule::Reject, diagnostics);
    }
    if is_accept_all_token(trimmed) {
        return (Rule::Accept, diagnostics);
    }

    let normalized = nfkc(trimmed);
    let normalized = DASH_RE.replace_all(&normalized, "-");

    let mut intervals = Vec::new();
    for token in SEPARATOR_RE.split(&normalized).filter(|t| !t.is_empty()) {
        match parse_token(token) {
            Some(iv) => intervals.push(iv),
            None => {
                warn!("⚠️  Ignoring unrecognized range token '{}'", token);
                diagnostics.unrecognized.push(token.to_string());
            }
        }
    }

    (Rule::from_intervals(intervals), diagnostics)
}

pub fn parse_rule(text: &str) -> Rule {
    parse_rule_with_diagnostics(text).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_reject_all() {
        let rule = parse_rule("");
        assert_eq!(rule, Rule::Reject);
        assert!(!rule.contains_number(0));
        assert!(!rule.contains(Rank::Roof));
        assert_eq!(parse_rule("   "), Rule::Reject);
    }

    #[test]
    fn test_star_is_accept_all() {
        for text in ["*", "＊", "all", "ALL", "全部", "所有"] {
            let rule = parse_rule(text);
            assert!(rule.is_accept_all(), "{text}");
            assert!(rule.contains_number(-5));
            assert!(rule.contains(Rank::MachineRoom));
        }
    }

    #[test]
    fn test_skip_token_is_reject_all() {
        assert_eq!(parse_rule("lk"), Rule::Reject);
        assert_eq!(parse_rule("ＬＫ"), Rule::Reject);
    }

    #[test]
    fn test_numbers_and_ranges() {
        let rule = parse_rule("1-3 5");
        for n in [1, 2, 3, 5] {
            assert!(rule.contains_number(n));
        }
        assert!(!rule.contains_number(4));
        assert!(!rule.contains_number(6));
    }

    #[test]
    fn test_reversed_range_is_swapped() {
        assert_eq!(parse_rule("5-1"), parse_rule("1-5"));
        assert!(parse_rule("5-1").contains_number(3));
    }

    #[test]
    fn test_adjacent_and_overlapping_intervals_merge() {
        let rule = parse_rule("1-3，4；6~8、7至9");
        assert_eq!(
            rule,
            Rule::Ranges(vec![
                RankInterval::new(Rank::Num(1), Rank::Num(4)),
                RankInterval::new(Rank::Num(6), Rank::Num(9)),
            ])
        );
    }

    #[test]
    fn test_special_floors() {
        let rule = parse_rule("8-屋面");
        assert!(rule.contains_number(8));
        assert!(rule.contains_number(1_000_000));
        assert!(rule.contains(Rank::MachineRoom));
        assert!(rule.contains(Rank::Roof));
        assert!(!rule.contains_number(7));

        let rule = parse_rule("机房-屋面");
        assert!(rule.contains(Rank::MachineRoom));
        assert!(rule.contains(Rank::Roof));
        assert!(!rule.contains_number(99));

        let rule = parse_rule("JF");
        assert!(rule.contains(Rank::MachineRoom));
        assert!(!rule.contains(Rank::Roof));
    }

    #[test]
    fn test_unrecognized_tokens_are_dropped() {
        let (rule, diagnostics) = parse_rule_with_diagnostics("2 abc 4");
        assert_eq!(diagnostics.unrecognized, vec!["abc".to_string()]);
        assert!(rule.contains_number(2));
        assert!(rule.contains_number(4));
        assert!(!rule.contains_number(3));

        let (rule, diagnostics) = parse_rule_with_diagnostics("foo");
        assert_eq!(rule, Rule::Reject);
        assert!(!diagnostics.is_clean());
    }

    #[test]
    fn test_display() {
        assert_eq!(parse_rule("3 1-2 屋面").to_string(), "1-3,屋面");
        assert_eq!(parse_rule("*").to_string(), "*");
    }
}
