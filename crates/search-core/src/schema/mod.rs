// search-core/src/schema/mod.rs
//! 索引 schema 定义

pub mod builder;
pub mod document;
pub mod fields;

pub use builder::{SchemaFields, build_schema};
pub use document::{IndexDocument, title_from_path};
pub use fields::*;
