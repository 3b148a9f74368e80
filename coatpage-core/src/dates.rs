use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid digits regex"));
static COMPACT_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("valid compact date regex"));
static MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\s*[-/.月]\s*(\d{1,2})\s*日?$").expect("valid month-day regex")
});
static DATE_LIST_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s，、]+").expect("valid date list separator regex"));

/// A bucket date as entered, plus the calendar date when it could be read.
///
/// Parsed dates sort chronologically and render as `YYYY年M月D日`; anything
/// else is kept verbatim and sorts after every parsed date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateLabel {
    pub raw: String,
    pub date: Option<NaiveDate>,
}

impl DateLabel {
    pub fn parse(text: &str) -> Self {
        let raw = text.trim().to_string();
        let date = parse_date(&raw);
        Self { raw, date }
    }

    /// Merge key: two labels for the same day are the same bucket.
    pub fn key(&self) -> String {
        match self.date {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => self.raw.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.date.is_none()
    }
}

impl fmt::Display for DateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date {
            Some(d) => write!(f, "{}年{}月{}日", d.year(), d.month(), d.day()),
            None => f.write_str(&self.raw),
        }
    }
}

impl PartialOrd for DateLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DateLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.date, other.date) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.raw.cmp(&other.raw)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

/// Reads `20250101`, `2025-1-1`, `2025.1.1`, `2025/1/1`, `2025年1月1日` and
/// `2025 1 1`. The first three digit runs are year, month, day.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    if let Some(c) = COMPACT_DATE_RE.captures(s) {
        return NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?);
    }
    let nums: Vec<&str> = DIGITS_RE.find_iter(s).map(|m| m.as_str()).take(3).collect();
    if nums.len() < 3 || nums[0].len() != 4 {
        return None;
    }
    NaiveDate::from_ymd_opt(nums[0].parse().ok()?, nums[1].parse().ok()?, nums[2].parse().ok()?)
}

/// Month-day shorthand (`8-27`, `8/27`, `8月27日`) against a base year.
fn parse_month_day(text: &str, year: i32) -> Option<NaiveDate> {
    let c = MONTH_DAY_RE.captures(text.trim())?;
    NaiveDate::from_ymd_opt(year, c[1].parse().ok()?, c[2].parse().ok()?)
}

/// Parses a list of dates separated by whitespace or commas.
///
/// Full dates set the base year for later month-day shorthands; before the
/// first full date the current year is used. `2025 8 27` split by spaces is
/// read as one date. Returns the dates and the tokens that were ignored.
pub fn parse_date_list(text: &str) -> (Vec<DateLabel>, Vec<String>) {
    let tokens: Vec<&str> = DATE_LIST_SEPARATOR_RE
        .split(text.trim())
        .filter(|t| !t.is_empty())
        .collect();
    let mut base_year: Option<i32> = None;
    let mut dates: Vec<DateLabel> = Vec::new();
    let mut ignored = Vec::new();

    let is_digits = |t: &str| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit());
    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];
        let year = base_year.unwrap_or_else(|| Local::now().year());
        let mut consumed = 1;

        let mut parsed = parse_date(tok).or_else(|| parse_month_day(tok, year));
        if parsed.is_none() && is_digits(tok) {
            if tok.len() == 4 && i + 2 < tokens.len() && is_digits(tokens[i + 1]) && is_digits(tokens[i + 2]) {
                parsed = parse_date(&format!("{}-{}-{}", tok, tokens[i + 1], tokens[i + 2]));
                consumed = 3;
            } else if i + 1 < tokens.len() && is_digits(tokens[i + 1]) {
                parsed = parse_month_day(&format!("{}-{}", tok, tokens[i + 1]), year);
                consumed = 2;
            }
        }

        match parsed {
            Some(date) => {
                if base_year.is_none() {
                    base_year = Some(date.year());
                }
                let raw = tokens[i..i + consumed].join(" ");
                let label = DateLabel {
                    raw,
                    date: Some(date),
                };
                if !dates.iter().any(|d| d.key() == label.key()) {
                    dates.push(label);
                }
                i += consumed;
            }
            None => {
                ignored.push(tok.to_string());
                i += 1;
            }
        }
    }
    (dates, ignored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 1);
        for text in ["20250101", "2025-1-1", "2025.1.1", "2025/1/1", "2025年1月1日", "2025 1 1"] {
            assert_eq!(parse_date(text), expected, "{text}");
        }
        assert_eq!(parse_date("2025-13-01"), None);
        assert_eq!(parse_date("next monday"), None);
    }

    #[test]
    fn test_label_rendering() {
        assert_eq!(DateLabel::parse("2025-08-07").to_string(), "2025年8月7日");
        assert_eq!(DateLabel::parse("第一批").to_string(), "第一批");
    }

    #[test]
    fn test_unparsed_dates_sort_last() {
        let mut labels = vec![
            DateLabel::parse("第二批"),
            DateLabel::parse("2025-3-1"),
            DateLabel::parse("2024年12月30日"),
        ];
        labels.sort();
        let keys: Vec<String> = labels.iter().map(DateLabel::key).collect();
        assert_eq!(keys, ["2024-12-30", "2025-03-01", "第二批"]);
    }

    #[test]
    fn test_same_day_same_key() {
        assert_eq!(
            DateLabel::parse("2025.8.27").key(),
            DateLabel::parse("20250827").key()
        );
    }

    #[test]
    fn test_date_list() {
        let (dates, ignored) = parse_date_list("2025-08-27 8-28, 2025 9 1 bogus 8月30日");
        let keys: Vec<String> = dates.iter().map(DateLabel::key).collect();
        assert_eq!(keys, ["2025-08-27", "2025-08-28", "2025-09-01", "2025-08-30"]);
        assert_eq!(ignored, ["bogus"]);
    }
}
