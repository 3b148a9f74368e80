use super::allocator::AllocatedPage;
use super::writer::{slash_tail, write_block_slot, TemplateWriter};
use crate::blocks::Block;
use crate::error::EngineResult;
use crate::types::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One block written into one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub page: String,
    pub slot: usize,
    pub entity: String,
    pub kind: PageKind,
}

/// Slots `from..5` of a page were filled with placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailPadding {
    pub page: String,
    pub from: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillOutcome {
    pub placements: Vec<Placement>,
    pub padding: Vec<TailPadding>,
    /// Entity names of blocks that found no page.
    pub dropped: Vec<String>,
    /// Empty pages passed over because their kind did not match.
    pub skipped_pages: usize,
}

impl FillOutcome {
    pub fn written(&self) -> usize {
        self.placements.len()
    }
}

/// Writes blocks into pages in order, five per page.
///
/// A block is only written to a page of its own (category, stream). On a
/// mismatch an empty page is skipped and a started page is closed with
/// placeholders, so nothing ever changes kind mid-page. The tail of the last
/// page written to is padded the same way. Blocks left over once the pages
/// run out are reported in `dropped`.
pub fn fill_blocks_to_pages(
    writer: &mut dyn TemplateWriter,
    pages: &[AllocatedPage],
    blocks: &[Block],
) -> EngineResult<FillOutcome> {
    let mut outcome = FillOutcome::default();
    let mut page_idx = 0usize;
    let mut pos = 0usize;
    let mut remaining = blocks.iter().peekable();

    while let Some(block) = remaining.peek() {
        let Some(page) = pages.get(page_idx) else {
            break;
        };

        if page.kind != block.kind() {
            if pos == 0 {
                debug!(
                    "Skipping empty page {} ({} does not take {})",
                    page.handle.title,
                    page.kind,
                    block.kind()
                );
                outcome.skipped_pages += 1;
            } else {
                close_page(writer, page, pos, &mut outcome)?;
            }
            page_idx += 1;
            pos = 0;
            continue;
        }

        write_block_slot(writer, &page.handle, pos, block.entity_name(), block.rows())?;
        outcome.placements.push(Placement {
            page: page.handle.title.clone(),
            slot: pos,
            entity: block.entity_name().to_string(),
            kind: block.kind(),
        });
        remaining.next();
        pos += 1;

        if pos == BLOCKS_PER_PAGE {
            page_idx += 1;
            pos = 0;
        }
    }

    if pos > 0 {
        if let Some(page) = pages.get(page_idx) {
            close_page(writer, page, pos, &mut outcome)?;
        }
    }

    outcome.dropped = remaining.map(|b| b.entity_name().to_string()).collect();
    if !outcome.dropped.is_empty() {
        warn!(
            "⚠️  {} blocks did not fit into {} pages and were dropped: {}",
            outcome.dropped.len(),
            pages.len(),
            outcome.dropped.join(", ")
        );
    }
    Ok(outcome)
}

fn close_page(
    writer: &mut dyn TemplateWriter,
    page: &AllocatedPage,
    from: usize,
    outcome: &mut FillOutcome,
) -> EngineResult<()> {
    slash_tail(writer, &page.handle, from)?;
    outcome.padding.push(TailPadding {
        page: page.handle.title.clone(),
        from,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::allocator::allocate_category;
    use crate::pages::memory::MemoryWorkbook;
    use crate::pages::writer::CellAddress;

    fn block(name: &str, category: Category, value: &str) -> Block {
        Block::chunk(name, category, &[ReadingRow::from_readings(&[value], "")]).remove(0)
    }

    fn column(name: &str) -> Block {
        block(name, Category::ColumnSteel, "120")
    }

    fn column_amplified(name: &str) -> Block {
        block(name, Category::ColumnSteel, "4070")
    }

    #[test]
    fn test_two_blocks_on_one_page() {
        let mut wb = MemoryWorkbook::standard_template();
        let blocks = vec![column("GZ1 3F"), column("GZ2 3F")];
        let slices = allocate_category(&mut wb, Category::ColumnSteel, &[blocks]).unwrap();
        let slice = &slices[0];
        assert_eq!(slice.pages.len(), 1);

        let outcome = fill_blocks_to_pages(&mut wb, &slice.pages, &slice.blocks).unwrap();
        assert_eq!(outcome.written(), 2);
        assert_eq!(outcome.padding, [TailPadding { page: "钢柱".into(), from: 2 }]);

        let page = wb.page_by_title("钢柱").unwrap();
        assert_eq!(page.names[..2], ["GZ1 3F".to_string(), "GZ2 3F".to_string()]);
        for slot in 2..BLOCKS_PER_PAGE {
            assert_eq!(page.names[slot], PLACEHOLDER);
            assert_eq!(page.cell(CellAddress::new(slot, 4, 8)), PLACEHOLDER);
        }
    }

    #[test]
    fn test_stream_change_closes_the_page() {
        let mut wb = MemoryWorkbook::standard_template();
        let normal = PageKind::new(Category::ColumnSteel, StreamTag::Normal);
        let amplified = PageKind::new(Category::ColumnSteel, StreamTag::Amplified);
        let pages = vec![
            AllocatedPage {
                handle: wb.find_page("钢柱").unwrap(),
                kind: normal,
                number: 1,
            },
            AllocatedPage {
                handle: wb.find_page("钢柱μ").unwrap(),
                kind: amplified,
                number: 2,
            },
        ];
        let blocks = vec![column("GZ1"), column_amplified("GZ2"), column_amplified("GZ3")];
        let outcome = fill_blocks_to_pages(&mut wb, &pages, &blocks).unwrap();

        let on_first: Vec<&str> = outcome
            .placements
            .iter()
            .filter(|p| p.page == "钢柱")
            .map(|p| p.entity.as_str())
            .collect();
        assert_eq!(on_first, ["GZ1"]);
        assert_eq!(wb.page_by_title("钢柱").unwrap().names[1], PLACEHOLDER);
        assert_eq!(wb.page_by_title("钢柱μ").unwrap().names[..2], ["GZ2".to_string(), "GZ3".to_string()]);
        assert!(outcome.dropped.is_empty());
    }

    #[test]
    fn test_mismatched_empty_page_is_skipped() {
        let mut wb = MemoryWorkbook::standard_template();
        let pages = vec![
            AllocatedPage {
                handle: wb.find_page("钢梁").unwrap(),
                kind: PageKind::new(Category::BeamSteel, StreamTag::Normal),
                number: 1,
            },
            AllocatedPage {
                handle: wb.find_page("钢柱").unwrap(),
                kind: PageKind::new(Category::ColumnSteel, StreamTag::Normal),
                number: 1,
            },
        ];
        let outcome = fill_blocks_to_pages(&mut wb, &pages, &[column("GZ1")]).unwrap();
        assert_eq!(outcome.skipped_pages, 1);
        assert_eq!(outcome.placements[0].page, "钢柱");
        assert!(!wb.page_by_title("钢梁").unwrap().is_slot_written(0));
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut wb = MemoryWorkbook::standard_template();
        let pages = vec![AllocatedPage {
            handle: wb.find_page("钢柱").unwrap(),
            kind: PageKind::new(Category::ColumnSteel, StreamTag::Normal),
            number: 1,
        }];
        let blocks: Vec<Block> = (1..=7).map(|i| column(&format!("GZ{i}"))).collect();
        let outcome = fill_blocks_to_pages(&mut wb, &pages, &blocks).unwrap();
        assert_eq!(outcome.written(), 5);
        assert_eq!(outcome.dropped, ["GZ6", "GZ7"]);
        assert!(outcome.padding.is_empty());
    }

    #[test]
    fn test_no_page_ever_mixes_kinds() {
        let mut wb = MemoryWorkbook::standard_template();
        let mut blocks = Vec::new();
        for i in 0..13 {
            if i % 3 == 0 {
                blocks.push(column_amplified(&format!("A{i}")));
            } else {
                blocks.push(column(&format!("N{i}")));
            }
        }
        let slices = allocate_category(&mut wb, Category::ColumnSteel, &[blocks]).unwrap();
        let slice = &slices[0];
        let outcome = fill_blocks_to_pages(&mut wb, &slice.pages, &slice.blocks).unwrap();
        assert_eq!(outcome.written(), 13);
        for page in &slice.pages {
            assert!(outcome
                .placements
                .iter()
                .filter(|p| p.page == page.handle.title)
                .all(|p| p.kind == page.kind));
        }
    }
}
