//! Core abstractions shared by the export and import paths.
//!
//! - [`value`]: the tagged [`TypedValue`] carried from cursor to serializer
//! - [`schema`]: column descriptors and type-category classification
//! - [`traits`]: the row-cursor and session seams implemented by backends

pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{ColumnDescriptor, TypeCategory};
pub use traits::{RowSource, SqlSession};
pub use value::{Row, SourceEncoding, TypedValue};
