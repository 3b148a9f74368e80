// Coatpage Core Library
//
// Classifies coating-thickness inspection records, partitions them into dated
// or floor-segmented buckets and lays them out on paginated report sheets.

pub mod blocks;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod dates;
pub mod error;
pub mod input;
pub mod pages;
pub mod processor;
pub mod rules;
pub mod source;
pub mod stream;
pub mod types;

// Re-export main types and functions for easy use
pub use types::*;
pub use classifier::EntityClassifier;
pub use config::{ConfigManager, RunConfig, RunMode};
pub use error::{EngineError, EngineResult};
pub use input::{ConsoleInput, InputProvider, PresetInput};
pub use pages::{MemoryWorkbook, TemplateWriter};
pub use processor::{ReportProcessor, RunReport};
pub use source::{JsonSourceReader, SourceReader, SourceRow, SourceTable, ValueLayout, VecSource};
