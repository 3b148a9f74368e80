use super::writer::{CellAddress, PageHandle, PageRequest, TemplateWriter};
use crate::error::{EngineError, EngineResult};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One sheet of the in-memory workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryPage {
    pub handle: PageHandle,
    /// Name cell per block slot, empty until written.
    pub names: Vec<String>,
    /// slot -> row -> column.
    pub cells: Vec<Vec<Vec<String>>>,
    pub date: Option<String>,
}

impl MemoryPage {
    fn blank(title: &str) -> Self {
        Self {
            handle: PageHandle::new(title),
            names: vec![String::new(); BLOCKS_PER_PAGE],
            cells: vec![vec![vec![String::new(); CELLS_PER_ROW]; ROWS_PER_BLOCK]; BLOCKS_PER_PAGE],
            date: None,
        }
    }

    fn clone_as(&self, title: &str) -> Self {
        Self {
            handle: PageHandle::new(title),
            ..self.clone()
        }
    }

    pub fn title(&self) -> &str {
        &self.handle.title
    }

    pub fn cell(&self, at: CellAddress) -> &str {
        &self.cells[at.slot][at.row][at.column]
    }

    /// A slot counts as written once its name cell is set.
    pub fn is_slot_written(&self, slot: usize) -> bool {
        !self.names[slot].is_empty()
    }
}

/// Template writer that keeps the whole workbook in memory. Used by the CLI
/// report and by tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryWorkbook {
    pages: Vec<MemoryPage>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workbook holding one blank template page per kind.
    pub fn with_templates(kinds: &[PageKind]) -> Self {
        let mut wb = Self::new();
        for kind in kinds {
            wb.add_page(&kind.base_title());
        }
        wb
    }

    /// The usual report template: normal and μ pages for every category
    /// that owns templates.
    pub fn standard_template() -> Self {
        let kinds: Vec<PageKind> = Category::PRINT_ORDER
            .into_iter()
            .filter(|c| c.template_source() == *c)
            .flat_map(|c| {
                [
                    PageKind::new(c, StreamTag::Normal),
                    PageKind::new(c, StreamTag::Amplified),
                ]
            })
            .collect();
        Self::with_templates(&kinds)
    }

    pub fn add_page(&mut self, title: &str) -> PageHandle {
        let page = MemoryPage::blank(title);
        let handle = page.handle.clone();
        self.pages.push(page);
        handle
    }

    pub fn page(&self, handle: &PageHandle) -> Option<&MemoryPage> {
        self.pages.iter().find(|p| p.handle.id == handle.id)
    }

    pub fn page_by_title(&self, title: &str) -> Option<&MemoryPage> {
        self.pages.iter().find(|p| p.title() == title)
    }

    pub fn titles(&self) -> Vec<String> {
        self.pages.iter().map(|p| p.title().to_string()).collect()
    }

    pub fn all_pages(&self) -> &[MemoryPage] {
        &self.pages
    }

    fn page_mut(&mut self, handle: &PageHandle) -> EngineResult<&mut MemoryPage> {
        self.pages
            .iter_mut()
            .find(|p| p.handle.id == handle.id)
            .ok_or_else(|| EngineError::Writer(format!("unknown page '{}'", handle.title)))
    }
}

impl TemplateWriter for MemoryWorkbook {
    fn pages(&self) -> Vec<PageHandle> {
        self.pages.iter().map(|p| p.handle.clone()).collect()
    }

    fn create_pages(&mut self, request: &PageRequest) -> EngineResult<Vec<PageHandle>> {
        let template_title = request.template.base_title();
        let template = self
            .page_by_title(&template_title)
            .cloned()
            .ok_or(EngineError::MissingTemplate {
                category: request.template.category,
                stream: request.template.stream,
            })?;

        let mut created = Vec::with_capacity(request.titles.len());
        for title in &request.titles {
            if self.page_by_title(title).is_some() {
                return Err(EngineError::Writer(format!("page '{title}' already exists")));
            }
            let page = template.clone_as(title);
            created.push(page.handle.clone());
            self.pages.push(page);
        }
        Ok(created)
    }

    fn write_name(&mut self, page: &PageHandle, slot: usize, name: &str) -> EngineResult<()> {
        if slot >= BLOCKS_PER_PAGE {
            return Err(EngineError::Writer(format!("slot {slot} out of range")));
        }
        self.page_mut(page)?.names[slot] = name.to_string();
        Ok(())
    }

    fn write_cell(&mut self, page: &PageHandle, at: CellAddress, value: &str) -> EngineResult<()> {
        if !at.is_valid() {
            return Err(EngineError::Writer(format!("cell {at:?} out of range")));
        }
        self.page_mut(page)?.cells[at.slot][at.row][at.column] = value.to_string();
        Ok(())
    }

    fn reorder_pages(&mut self, order: &[PageHandle]) -> EngineResult<()> {
        let wanted: HashSet<_> = order.iter().map(|h| h.id).collect();
        let mut front = Vec::with_capacity(order.len());
        for handle in order {
            let idx = self
                .pages
                .iter()
                .position(|p| p.handle.id == handle.id)
                .ok_or_else(|| EngineError::Writer(format!("unknown page '{}'", handle.title)))?;
            front.push(self.pages.remove(idx));
        }
        let rest: Vec<MemoryPage> = std::mem::take(&mut self.pages)
            .into_iter()
            .filter(|p| !wanted.contains(&p.handle.id))
            .collect();
        front.extend(rest);
        self.pages = front;
        Ok(())
    }

    fn delete_pages(&mut self, pages: &[PageHandle]) -> EngineResult<()> {
        let doomed: HashSet<_> = pages.iter().map(|h| h.id).collect();
        self.pages.retain(|p| !doomed.contains(&p.handle.id));
        Ok(())
    }

    fn annotate_page(&mut self, page: &PageHandle, date: &str) -> EngineResult<()> {
        self.page_mut(page)?.date = Some(date.to_string());
        Ok(())
    }
}
