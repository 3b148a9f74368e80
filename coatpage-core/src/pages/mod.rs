// Page layer: allocation, the strict-guard write pass, post-write validation
// and the template writer seam.

pub mod allocator;
pub mod fill;
pub mod memory;
pub mod validation;
pub mod writer;

pub use allocator::{allocate_category, pages_needed, AllocatedPage, BucketPages};
pub use fill::{fill_blocks_to_pages, FillOutcome, Placement, TailPadding};
pub use memory::{MemoryPage, MemoryWorkbook};
pub use validation::{PageLayout, PageValidator, SlotState, ValidationIssue, ValidationReport};
pub use writer::{CellAddress, PageHandle, PageRequest, TemplateWriter};
