// search-core/src/schema/document.rs
//! 索引文档表示

use serde::{Deserialize, Serialize};
use tantivy::schema::Value;
use tantivy::{TantivyDocument, doc};

use super::builder::SchemaFields;

/// 写入索引和快照的笔记
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// 相对根目录的路径，以 `/` 分隔
    pub path: String,
    /// 不含扩展名的文件名，在索引时确定
    pub title: String,
    pub content: String,
}

impl IndexDocument {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let title = title_from_path(&path);
        Self {
            path,
            title,
            content: content.into(),
        }
    }

    pub fn to_tantivy(&self, fields: &SchemaFields) -> TantivyDocument {
        doc!(
            fields.path => self.path.as_str(),
            fields.path_text => self.path.as_str(),
            fields.title => self.title.as_str(),
            fields.body => self.content.as_str(),
        )
    }

    /// 从存储字段还原；缺少路径时返回 `None`
    pub fn from_tantivy(doc: &TantivyDocument, fields: &SchemaFields) -> Option<Self> {
        let path = doc.get_first(fields.path).and_then(|v| v.as_str())?.to_string();
        let title = doc
            .get_first(fields.title)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let content = doc
            .get_first(fields.body)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        Some(Self { path, title, content })
    }
}

/// 去掉最后一个扩展名的文件名：`b/c.md` -> `c`
pub fn title_from_path(path: &str) -> String {
    let base = path.rsplit('/').next().unwrap_or(path);
    match base.rfind('.') {
        Some(dot) if dot > 0 => base[..dot].to_string(),
        _ => base.to_string(),
    }
}
