use super::writer::{PageHandle, PageRequest, TemplateWriter};
use crate::blocks::{split_streams, Block};
use crate::error::{EngineError, EngineResult};
use crate::types::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A page bound to one (category, stream) pair and its running number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedPage {
    pub handle: PageHandle,
    pub kind: PageKind,
    pub number: u32,
}

/// Pages and blocks of one category in one bucket: normal pages first, then
/// amplified pages, with the blocks in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketPages {
    pub pages: Vec<AllocatedPage>,
    pub blocks: Vec<Block>,
}

pub fn pages_needed(blocks: usize) -> usize {
    blocks.div_ceil(BLOCKS_PER_PAGE)
}

/// Reuses pages that already carry the wanted titles and clones the rest
/// from the kind's template. Returned in number order.
fn materialize(
    writer: &mut dyn TemplateWriter,
    kind: PageKind,
    numbers: std::ops::RangeInclusive<u32>,
) -> EngineResult<Vec<AllocatedPage>> {
    let mut slots: Vec<(u32, Option<PageHandle>)> = numbers
        .map(|n| (n, writer.find_page(&kind.title(n))))
        .collect();

    let missing: Vec<String> = slots
        .iter()
        .filter(|(_, existing)| existing.is_none())
        .map(|(n, _)| kind.title(*n))
        .collect();

    if !missing.is_empty() {
        let template = kind.template();
        if !writer.has_template(template) {
            return Err(EngineError::MissingTemplate {
                category: template.category,
                stream: template.stream,
            });
        }
        debug!("Cloning {} pages from template {}", missing.len(), template);
        let mut created = writer
            .create_pages(&PageRequest {
                template,
                titles: missing,
            })?
            .into_iter();
        for (_, handle) in slots.iter_mut().filter(|(_, h)| h.is_none()) {
            *handle = created.next();
        }
    }

    slots
        .into_iter()
        .map(|(number, handle)| {
            let handle = handle.ok_or_else(|| {
                EngineError::Writer(format!("writer did not create page '{}'", kind.title(number)))
            })?;
            Ok(AllocatedPage {
                handle,
                kind,
                number,
            })
        })
        .collect()
}

/// Allocates pages for one category across all buckets.
///
/// Numbering is continuous over every bucket's normal-then-amplified pages.
/// Pages are only materialized for sub-lists that have blocks, so a bucket
/// with amplified blocks only never gets an empty normal page.
pub fn allocate_category(
    writer: &mut dyn TemplateWriter,
    category: Category,
    blocks_by_bucket: &[Vec<Block>],
) -> EngineResult<Vec<BucketPages>> {
    let mut numbered: u32 = 0;
    let mut result = Vec::with_capacity(blocks_by_bucket.len());

    for blocks in blocks_by_bucket {
        let (normal, amplified) = split_streams(blocks.clone());
        let mut pages = Vec::new();

        for (stream, sub) in [(StreamTag::Normal, &normal), (StreamTag::Amplified, &amplified)] {
            let need = pages_needed(sub.len()) as u32;
            if need == 0 {
                continue;
            }
            let kind = PageKind::new(category, stream);
            pages.extend(materialize(writer, kind, numbered + 1..=numbered + need)?);
            numbered += need;
        }

        let mut ordered = normal;
        ordered.extend(amplified);
        result.push(BucketPages {
            pages,
            blocks: ordered,
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::memory::MemoryWorkbook;

    fn blocks(category: Category, normal: usize, amplified: usize) -> Vec<Block> {
        let mut out = Vec::new();
        for i in 0..normal {
            let rows = [ReadingRow::from_readings(&["120"], "")];
            out.extend(Block::chunk(&format!("N{i}"), category, &rows));
        }
        for i in 0..amplified {
            let rows = [ReadingRow::from_readings(&["4070"], "")];
            out.extend(Block::chunk(&format!("A{i}"), category, &rows));
        }
        out
    }

    fn titles(slices: &[BucketPages]) -> Vec<Vec<String>> {
        slices
            .iter()
            .map(|s| s.pages.iter().map(|p| p.handle.title.clone()).collect())
            .collect()
    }

    #[test]
    fn test_pages_needed() {
        assert_eq!(pages_needed(0), 0);
        assert_eq!(pages_needed(1), 1);
        assert_eq!(pages_needed(5), 1);
        assert_eq!(pages_needed(6), 2);
    }

    #[test]
    fn test_continuous_numbering_without_phantom_pages() {
        let mut wb = MemoryWorkbook::standard_template();
        let buckets = vec![
            blocks(Category::ColumnSteel, 6, 1),
            blocks(Category::ColumnSteel, 0, 2),
            blocks(Category::ColumnSteel, 3, 0),
        ];
        let slices = allocate_category(&mut wb, Category::ColumnSteel, &buckets).unwrap();
        assert_eq!(
            titles(&slices),
            vec![
                vec!["钢柱".to_string(), "钢柱（2）".into(), "钢柱μ（3）".into()],
                vec!["钢柱μ（4）".to_string()],
                vec!["钢柱（5）".to_string()],
            ]
        );
        let numbers: Vec<u32> = slices
            .iter()
            .flat_map(|s| s.pages.iter().map(|p| p.number))
            .collect();
        assert_eq!(numbers, [1, 2, 3, 4, 5]);
        // Normal blocks lead inside a bucket.
        assert_eq!(slices[0].blocks[6].entity_name(), "A0");
    }

    #[test]
    fn test_existing_pages_are_reused() {
        let mut wb = MemoryWorkbook::standard_template();
        let existing = wb.add_page("钢梁（2）");
        let buckets = vec![blocks(Category::BeamSteel, 8, 0)];
        let slices = allocate_category(&mut wb, Category::BeamSteel, &buckets).unwrap();
        assert_eq!(slices[0].pages[1].handle.id, existing.id);
        assert_eq!(wb.titles().iter().filter(|t| t.starts_with("钢梁")).count(), 3);
    }

    #[test]
    fn test_other_clones_column_templates() {
        let mut wb = MemoryWorkbook::standard_template();
        let buckets = vec![blocks(Category::Other, 1, 1)];
        let slices = allocate_category(&mut wb, Category::Other, &buckets).unwrap();
        assert_eq!(titles(&slices), vec![vec!["其他".to_string(), "其他μ（2）".into()]]);
    }

    #[test]
    fn test_missing_amplified_template_is_an_error() {
        let mut wb =
            MemoryWorkbook::with_templates(&[PageKind::new(Category::Bracing, StreamTag::Normal)]);
        let buckets = vec![blocks(Category::Bracing, 1, 1)];
        let err = allocate_category(&mut wb, Category::Bracing, &buckets).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingTemplate {
                category: Category::Bracing,
                stream: StreamTag::Amplified
            }
        ));
    }

    #[test]
    fn test_empty_buckets_allocate_nothing() {
        let mut wb = MemoryWorkbook::standard_template();
        let before = wb.titles().len();
        let slices = allocate_category(&mut wb, Category::GridFrame, &[Vec::new(), Vec::new()]).unwrap();
        assert_eq!(slices.len(), 2);
        assert!(slices.iter().all(|s| s.pages.is_empty()));
        assert_eq!(wb.titles().len(), before);
    }
}
