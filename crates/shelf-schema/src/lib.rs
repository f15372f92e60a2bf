//! Content schema for shelf-sync
//!
//! Defines the closed vocabulary shared by every other crate:
//!
//! - **Categories**: book, movie, music and game, each with its own status options
//! - **Field keys**: abstract attributes independent of destination column names
//! - **Templates**: the canonical column set per category, served by [`TemplateRegistry`]
//! - **Values**: source-side [`FieldValue`], destination-side [`CellValue`] and
//!   the conversion rules between them

pub mod category;
pub mod error;
pub mod field;
pub mod record;
pub mod registry;
pub mod template;
pub mod value;

pub use category::{ContentCategory, StatusOption};
pub use error::{ConversionError, Error, Result};
pub use field::FieldKey;
pub use record::ContentRecord;
pub use registry::{TemplateRegistry, builtin_templates};
pub use template::{FieldKind, FieldProperty, FieldTemplate, SelectOption};
pub use value::{CellValue, FieldValue, to_cell};
