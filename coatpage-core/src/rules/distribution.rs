use serde::{Deserialize, Serialize};

/// One date of a distribution plan. `limit: None` (or 0) means "no quota".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateEntry {
    pub date: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl DateEntry {
    pub fn new(date: &str, limit: Option<usize>) -> Self {
        Self {
            date: date.to_string(),
            limit,
        }
    }

    fn quota(&self) -> Option<usize> {
        self.limit.filter(|&l| l > 0)
    }
}

/// Spreads `items` over the dates, in order.
///
/// Even mode (no entry has a quota): every day but the last takes
/// `ceil(total / days)`, the last day takes the rest.
///
/// Quota mode: a day with a quota takes up to its quota. A non-last day
/// without a quota takes what is left after reserving the quotas of the
/// days after it. The last day always takes everything that remains.
///
/// The concatenation of the returned slices is always `items`.
pub fn distribute_by_dates<'a, T>(items: &'a [T], entries: &[DateEntry]) -> Vec<(String, &'a [T])> {
    let mut result = Vec::with_capacity(entries.len());
    if entries.is_empty() {
        return result;
    }

    let total = items.len();
    let days = entries.len();
    let even_mode = entries.iter().all(|e| e.quota().is_none());
    let per_day = total.div_ceil(days);
    let mut cursor = 0usize;

    for (i, entry) in entries.iter().enumerate() {
        let remaining = total - cursor;
        let take = if i == days - 1 {
            remaining
        } else if even_mode {
            per_day.min(remaining)
        } else {
            match entry.quota() {
                Some(limit) => limit.min(remaining),
                None => {
                    let reserved: usize = entries[i + 1..].iter().filter_map(DateEntry::quota).sum();
                    remaining.saturating_sub(reserved)
                }
            }
        };
        result.push((entry.date.clone(), &items[cursor..cursor + take]));
        cursor += take;
    }
    result
}
