// All engine functionality lives in coatpage-core.
// The CLI is a thin wrapper around it.

pub use coatpage_core::*;
