use crate::cache::EntityCache;
use crate::source::{SourceRow, ValueLayout};
use crate::stream::classify_rows;
use crate::types::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// All reading rows of one component, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityGroup {
    pub name: String,
    pub rows: Vec<ReadingRow>,
}

/// Turns source rows into per-component groups.
///
/// Header rows are skipped. A named row starts a new group unless it repeats
/// the current name; a blank name continues the current group. Rows seen
/// before the first name have no owner and are dropped.
pub fn group_rows(rows: &[SourceRow], layout: ValueLayout) -> Vec<EntityGroup> {
    let mut groups: Vec<EntityGroup> = Vec::new();
    let mut current: Option<EntityGroup> = None;
    let mut orphaned = 0usize;

    for row in rows.iter().filter(|r| !r.is_header) {
        let name = row.name.trim();
        if !name.is_empty() && current.as_ref().map(|g| g.name.as_str()) != Some(name) {
            if let Some(done) = current.take() {
                if !done.rows.is_empty() {
                    groups.push(done);
                }
            }
            current = Some(EntityGroup {
                name: name.to_string(),
                rows: Vec::new(),
            });
        }

        let Some(group) = current.as_mut() else {
            orphaned += 1;
            continue;
        };
        let reading = match layout {
            ValueLayout::Readings => ReadingRow::from_readings(&row.values, &row.aggregate),
            ValueLayout::Points => ReadingRow::from_points(&row.values, &row.aggregate),
        };
        group.rows.push(reading);
    }

    if let Some(done) = current {
        if !done.rows.is_empty() {
            groups.push(done);
        }
    }
    if orphaned > 0 {
        debug!("Dropped {} rows before the first component name", orphaned);
    }
    groups
}

/// Exactly 5 reading rows of one component, tagged with its stream.
///
/// The stream is computed from the rows when the block is built and never
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    entity_name: String,
    category: Category,
    rows: Vec<ReadingRow>,
    stream: StreamTag,
}

impl Block {
    /// Splits rows into windows of 5; the last window is padded with placeholder rows.
    pub fn chunk(entity_name: &str, category: Category, rows: &[ReadingRow]) -> Vec<Block> {
        rows.chunks(ROWS_PER_BLOCK)
            .map(|window| {
                let mut rows = window.to_vec();
                rows.resize_with(ROWS_PER_BLOCK, ReadingRow::placeholder);
                let stream = classify_rows(&rows);
                Block {
                    entity_name: entity_name.to_string(),
                    category,
                    rows,
                    stream,
                }
            })
            .collect()
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn rows(&self) -> &[ReadingRow] {
        &self.rows
    }

    pub fn stream(&self) -> StreamTag {
        self.stream
    }

    pub fn kind(&self) -> PageKind {
        PageKind::new(self.category, self.stream)
    }

    /// Same block filed under another category. The stream stays as computed.
    pub fn with_category(mut self, category: Category) -> Block {
        self.category = category;
        self
    }
}

/// Blocks of a single group, classified through the cache.
pub fn group_blocks(group: &EntityGroup, cache: &EntityCache) -> Vec<Block> {
    Block::chunk(&group.name, cache.category(&group.name), &group.rows)
}

/// Blocks of many groups filed under one category, in group order.
///
/// The category comes from the caller because assignment may fold a group
/// into a category other than the one its name classifies as.
pub fn expand_blocks<'a, I>(groups: I, category: Category) -> Vec<Block>
where
    I: IntoIterator<Item = &'a EntityGroup>,
{
    groups
        .into_iter()
        .flat_map(|g| Block::chunk(&g.name, category, &g.rows))
        .collect()
}

/// Splits blocks into (normal, amplified), keeping relative order.
pub fn split_streams(blocks: Vec<Block>) -> (Vec<Block>, Vec<Block>) {
    blocks
        .into_iter()
        .partition(|b| b.stream() == StreamTag::Normal)
}
