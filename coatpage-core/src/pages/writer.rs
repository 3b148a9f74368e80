// Template writer abstraction
//
// The engine never touches spreadsheet files. Everything it needs from the
// report template goes through this trait: look up pages, clone pages from a
// template, write names and cells into block slots, reorder and delete.

use crate::error::EngineResult;
use crate::types::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of one page in the target workbook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageHandle {
    pub id: Uuid,
    pub title: String,
}

impl PageHandle {
    pub fn new(title: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
        }
    }
}

/// One reading cell inside a page: block slot 0..5, row 0..5, column 0..9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellAddress {
    pub slot: usize,
    pub row: usize,
    pub column: usize,
}

impl CellAddress {
    pub fn new(slot: usize, row: usize, column: usize) -> Self {
        Self { slot, row, column }
    }

    pub fn is_valid(&self) -> bool {
        self.slot < BLOCKS_PER_PAGE && self.row < ROWS_PER_BLOCK && self.column < CELLS_PER_ROW
    }
}

/// Clone `template` once per title, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub template: PageKind,
    pub titles: Vec<String>,
}

pub trait TemplateWriter {
    /// All pages in workbook order.
    fn pages(&self) -> Vec<PageHandle>;

    fn find_page(&self, title: &str) -> Option<PageHandle> {
        self.pages().into_iter().find(|p| p.title == title)
    }

    /// The template of a kind is the page carrying the kind's base title.
    fn has_template(&self, template: PageKind) -> bool {
        self.find_page(&template.base_title()).is_some()
    }

    fn create_pages(&mut self, request: &PageRequest) -> EngineResult<Vec<PageHandle>>;

    /// Component name cell of a block slot.
    fn write_name(&mut self, page: &PageHandle, slot: usize, name: &str) -> EngineResult<()>;

    fn write_cell(&mut self, page: &PageHandle, at: CellAddress, value: &str) -> EngineResult<()>;

    /// Moves the given pages to the front, in this order. Other pages keep
    /// their relative order after them.
    fn reorder_pages(&mut self, order: &[PageHandle]) -> EngineResult<()>;

    fn delete_pages(&mut self, pages: &[PageHandle]) -> EngineResult<()>;

    /// Stamps the inspection date on a page. Writers without a date field
    /// ignore it.
    fn annotate_page(&mut self, _page: &PageHandle, _date: &str) -> EngineResult<()> {
        Ok(())
    }
}

/// Writes a full block into a slot.
pub fn write_block_slot(
    writer: &mut dyn TemplateWriter,
    page: &PageHandle,
    slot: usize,
    name: &str,
    rows: &[ReadingRow],
) -> EngineResult<()> {
    writer.write_name(page, slot, name)?;
    for (r, row) in rows.iter().enumerate().take(ROWS_PER_BLOCK) {
        for (c, value) in row.cells().enumerate() {
            writer.write_cell(page, CellAddress::new(slot, r, c), value)?;
        }
    }
    Ok(())
}

/// Fills every slot from `from` to the end of the page with placeholders.
pub fn slash_tail(writer: &mut dyn TemplateWriter, page: &PageHandle, from: usize) -> EngineResult<()> {
    for slot in from..BLOCKS_PER_PAGE {
        writer.write_name(page, slot, PLACEHOLDER)?;
        for r in 0..ROWS_PER_BLOCK {
            for c in 0..CELLS_PER_ROW {
                writer.write_cell(page, CellAddress::new(slot, r, c), PLACEHOLDER)?;
            }
        }
    }
    Ok(())
}
