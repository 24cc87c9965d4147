// search-core/src/schema/builder.rs
//! Schema 构建器

use tantivy::schema::*;

use super::fields::*;
use crate::tokenizer::ANALYZER_NAME;

/// 字段句柄，在构建 schema 时解析
#[derive(Debug, Clone, Copy)]
pub struct SchemaFields {
    pub title: Field,
    pub body: Field,
    pub path: Field,
    pub path_text: Field,
}

/// 构建笔记索引 schema
///
/// - `title`、`body`：分词、记录位置、存储
/// - `path`：原始字符串主键，存储
/// - `path_text`：分词后的路径，不存储（由 `path` 还原）
pub fn build_schema() -> (Schema, SchemaFields) {
    let mut schema_builder = Schema::builder();

    let indexing = TextFieldIndexing::default()
        .set_tokenizer(ANALYZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let stored_text = TextOptions::default()
        .set_indexing_options(indexing.clone())
        .set_stored();
    let indexed_text = TextOptions::default().set_indexing_options(indexing);

    let fields = SchemaFields {
        title: schema_builder.add_text_field(FIELD_TITLE, stored_text.clone()),
        body: schema_builder.add_text_field(FIELD_BODY, stored_text),
        path: schema_builder.add_text_field(FIELD_PATH, STRING | STORED),
        path_text: schema_builder.add_text_field(FIELD_PATH_TEXT, indexed_text),
    };

    (schema_builder.build(), fields)
}
