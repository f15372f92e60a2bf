//! Field Template Registry
//!
//! Per content category, the canonical set of destination fields, their
//! value types and category-specific option sets.

mod builtins;
mod store;

pub use builtins::{BUILTIN_COUNTS, builtin_templates};
pub use store::TemplateRegistry;
