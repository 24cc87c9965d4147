// search-core/src/snapshot.rs
//! 索引快照持久化
//!
//! 格式：`{ "version": u32, "data": { "tokenizer", "documents" }, "paths": [..] }`。
//! 索引本身在内存中，`data` 保存重放索引所需的存储字段。
//! 写入经过临时文件、fsync 和 rename，崩溃后磁盘上
//! 只会是旧快照或新快照之一。

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::SnapshotError;
use crate::schema::IndexDocument;
use crate::tokenizer::TokenizerKind;

/// 快照格式或分词方式不兼容变更时递增
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub data: SnapshotData,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    pub tokenizer: TokenizerKind,
    pub documents: Vec<IndexDocument>,
}

impl Snapshot {
    pub fn new(tokenizer: TokenizerKind, documents: Vec<IndexDocument>, paths: Vec<String>) -> Self {
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            data: SnapshotData { tokenizer, documents },
            paths,
        }
    }

    /// 拒绝当前版本无法信任的快照
    pub fn validate(&self, tokenizer: TokenizerKind) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::Version {
                found: self.version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        if self.data.tokenizer != tokenizer {
            return Err(SnapshotError::Tokenizer {
                found: self.data.tokenizer.to_string(),
                expected: tokenizer.to_string(),
            });
        }

        let paths: BTreeSet<&str> = self.paths.iter().map(String::as_str).collect();
        let documents: BTreeSet<&str> = self.data.documents.iter().map(|d| d.path.as_str()).collect();
        if paths != documents || documents.len() != self.data.documents.len() {
            return Err(SnapshotError::Inconsistent {
                paths: self.paths.len(),
                documents: self.data.documents.len(),
            });
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// 原子地将 `snapshot` 写入 `path`
pub async fn write_atomic(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_vec(snapshot)?;
    let tmp = temp_path(path);
    {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
    }
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// 读取并解析 `path` 处的快照
pub async fn load(path: &Path) -> Result<Snapshot, SnapshotError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SnapshotError::Missing(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&bytes)?)
}

/// 删除快照；不存在时返回 `false`
pub async fn remove(path: &Path) -> Result<bool, SnapshotError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
