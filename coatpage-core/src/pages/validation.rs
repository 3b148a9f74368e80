use super::allocator::AllocatedPage;
use super::fill::FillOutcome;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotState {
    Empty,
    Placeholder,
    Block { entity: String, kind: PageKind },
}

/// What ended up on one page after the write phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLayout {
    pub title: String,
    pub bucket: String,
    pub kind: PageKind,
    pub number: u32,
    pub slots: Vec<SlotState>,
}

impl PageLayout {
    /// Rebuilds the layout of each allocated page from a fill outcome.
    pub fn from_fill(pages: &[AllocatedPage], outcome: &FillOutcome, bucket: &str) -> Vec<PageLayout> {
        pages
            .iter()
            .map(|page| {
                let title = &page.handle.title;
                let mut slots = vec![SlotState::Empty; BLOCKS_PER_PAGE];
                for placement in outcome.placements.iter().filter(|p| &p.page == title) {
                    if placement.slot >= slots.len() {
                        slots.resize(placement.slot + 1, SlotState::Empty);
                    }
                    slots[placement.slot] = SlotState::Block {
                        entity: placement.entity.clone(),
                        kind: placement.kind,
                    };
                }
                for pad in outcome.padding.iter().filter(|p| &p.page == title) {
                    for slot in slots.iter_mut().skip(pad.from) {
                        if *slot == SlotState::Empty {
                            *slot = SlotState::Placeholder;
                        }
                    }
                }
                PageLayout {
                    title: title.clone(),
                    bucket: bucket.to_string(),
                    kind: page.kind,
                    number: page.number,
                    slots,
                }
            })
            .collect()
    }

    pub fn written(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, SlotState::Block { .. }))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    CrossBleed {
        page: String,
        slot: usize,
        expected: PageKind,
        found: PageKind,
    },
    OverCapacity {
        page: String,
        slots: usize,
    },
    UnfilledSlot {
        page: String,
        slot: usize,
    },
    UnusedPage {
        page: String,
    },
    NumberingGap {
        category: Category,
        previous: u32,
        found: u32,
    },
    DroppedBlocks {
        entities: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub quality_score: f32,
    pub pages_checked: usize,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Post-write consistency checks over the final page layouts.
#[derive(Debug, Default)]
pub struct PageValidator;

impl PageValidator {
    pub fn new() -> Self {
        Self
    }

    /// `layouts` must be in final workbook order.
    pub fn validate(&self, layouts: &[PageLayout], dropped: &[String]) -> ValidationReport {
        info!("🔍 Validating {} written pages", layouts.len());
        let mut issues = Vec::new();

        self.validate_page_contents(layouts, &mut issues);
        self.validate_numbering(layouts, &mut issues);
        if !dropped.is_empty() {
            issues.push(ValidationIssue::DroppedBlocks {
                entities: dropped.to_vec(),
            });
        }

        let quality_score = if layouts.is_empty() {
            1.0
        } else {
            (1.0 - (issues.len() as f32 / layouts.len() as f32)).max(0.0)
        };
        let report = ValidationReport {
            issues,
            quality_score,
            pages_checked: layouts.len(),
        };
        self.log_report(&report);
        report
    }

    fn validate_page_contents(&self, layouts: &[PageLayout], issues: &mut Vec<ValidationIssue>) {
        for layout in layouts {
            if layout.slots.len() > BLOCKS_PER_PAGE {
                issues.push(ValidationIssue::OverCapacity {
                    page: layout.title.clone(),
                    slots: layout.slots.len(),
                });
            }
            if layout.written() == 0 {
                issues.push(ValidationIssue::UnusedPage {
                    page: layout.title.clone(),
                });
                continue;
            }
            for (slot, state) in layout.slots.iter().enumerate() {
                match state {
                    SlotState::Block { kind, .. } if *kind != layout.kind => {
                        issues.push(ValidationIssue::CrossBleed {
                            page: layout.title.clone(),
                            slot,
                            expected: layout.kind,
                            found: *kind,
                        });
                    }
                    SlotState::Empty => issues.push(ValidationIssue::UnfilledSlot {
                        page: layout.title.clone(),
                        slot,
                    }),
                    _ => {}
                }
            }
        }
    }

    /// Page numbers of a category rise by exactly one across buckets.
    fn validate_numbering(&self, layouts: &[PageLayout], issues: &mut Vec<ValidationIssue>) {
        let mut last: BTreeMap<Category, u32> = BTreeMap::new();
        for layout in layouts {
            let category = layout.kind.category;
            let previous = last.get(&category).copied().unwrap_or(0);
            if layout.number != previous + 1 {
                issues.push(ValidationIssue::NumberingGap {
                    category,
                    previous,
                    found: layout.number,
                });
            }
            last.insert(category, layout.number);
        }
    }

    fn log_report(&self, report: &ValidationReport) {
        if report.is_clean() {
            info!(
                "✅ Page validation passed ({} pages)",
                report.pages_checked
            );
            return;
        }
        warn!(
            "⚠️  Page validation found {} issues (quality {:.2})",
            report.issues.len(),
            report.quality_score
        );
        for issue in &report.issues {
            warn!("   {:?}", issue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column() -> PageKind {
        PageKind::new(Category::ColumnSteel, StreamTag::Normal)
    }

    fn layout(title: &str, number: u32, slots: Vec<SlotState>) -> PageLayout {
        PageLayout {
            title: title.into(),
            bucket: "2025年8月27日".into(),
            kind: column(),
            number,
            slots,
        }
    }

    fn written(entity: &str, kind: PageKind) -> SlotState {
        SlotState::Block {
            entity: entity.into(),
            kind,
        }
    }

    fn full_page(title: &str, number: u32) -> PageLayout {
        let mut slots = vec![written("GZ1", column())];
        slots.extend(vec![SlotState::Placeholder; 4]);
        layout(title, number, slots)
    }

    #[test]
    fn test_clean_layout() {
        let report = PageValidator::new().validate(&[full_page("钢柱", 1), full_page("钢柱（2）", 2)], &[]);
        assert!(report.is_clean());
        assert_eq!(report.quality_score, 1.0);
    }

    #[test]
    fn test_cross_bleed_detected() {
        let amplified = PageKind::new(Category::ColumnSteel, StreamTag::Amplified);
        let mut page = full_page("钢柱", 1);
        page.slots[1] = written("GZ2", amplified);
        let report = PageValidator::new().validate(&[page], &[]);
        assert!(matches!(
            report.issues[0],
            ValidationIssue::CrossBleed { slot: 1, .. }
        ));
    }

    #[test]
    fn test_numbering_gap_and_unused_page() {
        let pages = [
            full_page("钢柱", 1),
            layout("钢柱（2）", 2, vec![SlotState::Empty; 5]),
            full_page("钢柱（4）", 4),
        ];
        let report = PageValidator::new().validate(&pages, &["GZ9".to_string()]);
        assert!(report.issues.contains(&ValidationIssue::UnusedPage {
            page: "钢柱（2）".into()
        }));
        assert!(report.issues.contains(&ValidationIssue::NumberingGap {
            category: Category::ColumnSteel,
            previous: 2,
            found: 4
        }));
        assert!(matches!(
            report.issues.last(),
            Some(ValidationIssue::DroppedBlocks { .. })
        ));
    }

    #[test]
    fn test_unfilled_slot() {
        let mut page = full_page("钢柱", 1);
        page.slots[3] = SlotState::Empty;
        let report = PageValidator::new().validate(&[page], &[]);
        assert_eq!(
            report.issues,
            [ValidationIssue::UnfilledSlot {
                page: "钢柱".into(),
                slot: 3
            }]
        );
    }
}
