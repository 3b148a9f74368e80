// Rules module - bucket rules and the engines that apply them
// - range.rs: range/keyword expression parsing into `Rule`
// - engine.rs: bucket assignment, strategies and leftover handling
// - segmentation.rs: floor breakpoints and segments
// - distribution.rs: spreading entities over dates

pub mod distribution;
pub mod engine;
pub mod range;
pub mod segmentation;

pub use distribution::{distribute_by_dates, DateEntry};
pub use engine::*;
pub use range::{parse_rule, parse_rule_with_diagnostics, RangeDiagnostics, RankInterval, Rule};
pub use segmentation::{parse_breaks, BreakPlan, BreakSubMode, BreakTexts, FloorSegmenter};
