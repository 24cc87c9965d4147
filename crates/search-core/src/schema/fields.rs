// search-core/src/schema/fields.rs
//! 字段名称常量

/// 笔记标题，索引时由文件名得出
pub const FIELD_TITLE: &str = "title";

/// 笔记正文（主要全文检索字段）
pub const FIELD_BODY: &str = "body";

/// 相对根目录的笔记路径（主键，精确匹配）
pub const FIELD_PATH: &str = "path";

/// 分词后的路径副本，参与打分
pub const FIELD_PATH_TEXT: &str = "path_text";
