// search-core/src/config.rs
//! 配置模块

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::tokenizer::TokenizerKind;

/// 搜索子系统配置
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchConfig {
    /// 快照文件路径；`None` 表示索引只保存在内存中
    pub snapshot_path: Option<PathBuf>,
    pub index: IndexConfig,
    pub query: QueryConfig,
    pub walker: WalkerConfig,
}

/// 索引写入配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IndexConfig {
    /// 写入器内存预算（字节，tantivy 至少需要 15MB）
    pub writer_memory: usize,
    pub tokenizer: TokenizerKind,
    /// 单次快照写入的超时上限；`None` 表示不限时
    pub save_timeout_secs: Option<u64>,
}

/// 排序与结果配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct QueryConfig {
    pub title_boost: f32,
    pub body_boost: f32,
    pub path_boost: f32,
    /// 模糊匹配的最大编辑距离，上限为 2
    pub fuzzy_distance: u8,
    /// 短于此长度（字符）的词只做精确或前缀匹配
    pub fuzzy_min_term_len: usize,
    /// 前缀/模糊匹配在字段权重上的乘数
    pub fuzzy_weight: f32,
    pub default_limit: usize,
    pub suggestion_limit: usize,
    /// 摘要中首个匹配两侧保留的字符数
    pub snippet_radius: usize,
}

/// 文档遍历配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WalkerConfig {
    /// 以此前缀开头的路径段视为隐藏
    pub hidden_prefix: String,
    /// 支持的文件扩展名（不带点）
    pub supported_extensions: Vec<String>,
    pub follow_symlinks: bool,
    /// 0 表示不限制
    pub max_depth: usize,
    /// 是否遵循笔记目录中的 `.ignore` 文件
    pub respect_ignore: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            writer_memory: 50_000_000,
            tokenizer: TokenizerKind::default(),
            save_timeout_secs: Some(30),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            title_boost: 3.0,
            body_boost: 1.0,
            path_boost: 0.5,
            fuzzy_distance: 1,
            fuzzy_min_term_len: 4,
            fuzzy_weight: 0.5,
            default_limit: 50,
            suggestion_limit: 10,
            snippet_radius: 60,
        }
    }
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            hidden_prefix: ".".to_string(),
            supported_extensions: vec!["md".to_string()],
            follow_symlinks: false,
            max_depth: 0,
            respect_ignore: false,
        }
    }
}

impl SearchConfig {
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }
}
