// search-core/src/error.rs
//! 错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 文档存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("not a document: {0}")]
    NotADocument(String),

    #[error("path escapes the notes root: {0}")]
    OutsideRoot(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 快照读写错误，均可通过重建索引恢复
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot not found at {0}")]
    Missing(PathBuf),

    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot is not valid json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("snapshot format version {found}, expected {expected}")]
    Version { found: u32, expected: u32 },

    #[error("snapshot was built with the {found} tokenizer, index uses {expected}")]
    Tokenizer { found: String, expected: String },

    #[error("snapshot paths ({paths}) disagree with its documents ({documents})")]
    Inconsistent { paths: usize, documents: usize },
}

/// 索引错误
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("snapshot write timed out after {0}s")]
    SaveTimeout(u64),
}
