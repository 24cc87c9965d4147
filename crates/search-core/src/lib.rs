// search-core/src/lib.rs
//! 笔记目录全文索引
//!
//! - 内存中的 Tantivy 索引，从 JSON 快照或笔记目录重建
//! - 由文件变更事件驱动的增量更新
//! - 支持前缀、模糊匹配和范围过滤的排序搜索
//! - 词汇自动补全

pub mod changes;
pub mod config;
pub mod error;
pub mod index;
pub mod persister;
pub mod schema;
pub mod search;
pub mod snapshot;
pub mod store;
pub mod tokenizer;

// RPC 适配层（可选）
#[cfg(feature = "rpc-compat")]
pub mod rpc_compat;

pub use changes::{ChangeAdapter, ChangeEvent, ChangeKind, ChangeOutcome};
pub use config::{IndexConfig, QueryConfig, SearchConfig, WalkerConfig};
pub use error::{IndexError, SnapshotError, StoreError};
pub use index::{BuildReport, BuildSource, NoteIndex};
pub use persister::SnapshotScheduler;
pub use schema::{IndexDocument, SchemaFields, build_schema};
pub use search::{FieldMatch, MatchField, SearchHit};
pub use snapshot::{SNAPSHOT_FORMAT_VERSION, Snapshot};
pub use store::{DocumentEntry, DocumentFilter, DocumentStore, FsDocumentStore};
pub use tokenizer::TokenizerKind;
