// search-core/src/changes.rs
//! 变更适配层 - 将文件变更事件应用到索引

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::index::NoteIndex;
use crate::persister::SnapshotScheduler;
use crate::store::normalize_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Renamed,
}

/// 单个变更事件，路径相对笔记根目录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: String,
    /// 原路径，仅用于重命名
    pub old_path: Option<String>,
}

impl ChangeEvent {
    pub fn created(path: impl Into<String>) -> Self {
        Self { kind: ChangeKind::Created, path: path.into(), old_path: None }
    }

    pub fn modified(path: impl Into<String>) -> Self {
        Self { kind: ChangeKind::Modified, path: path.into(), old_path: None }
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self { kind: ChangeKind::Deleted, path: path.into(), old_path: None }
    }

    pub fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { kind: ChangeKind::Renamed, path: to.into(), old_path: Some(from.into()) }
    }
}

/// 事件对索引产生的影响
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeOutcome {
    pub indexed: bool,
    pub removed: bool,
}

impl ChangeOutcome {
    pub fn touched(self) -> bool {
        self.indexed || self.removed
    }
}

/// 按顺序逐个处理变更事件
pub struct ChangeAdapter {
    index: Arc<NoteIndex>,
    scheduler: SnapshotScheduler,
}

impl ChangeAdapter {
    pub fn new(index: Arc<NoteIndex>, scheduler: SnapshotScheduler) -> Self {
        Self { index, scheduler }
    }

    fn accepts(&self, path: &str) -> bool {
        self.index.filter().is_indexable(path)
    }

    async fn upsert(&self, path: &str) -> bool {
        if !self.accepts(path) {
            tracing::trace!("忽略变更: {}", path);
            return false;
        }
        self.index.index_document(path).await
    }

    async fn remove(&self, path: &str) -> bool {
        if !self.accepts(path) {
            tracing::trace!("忽略删除: {}", path);
            return false;
        }
        self.index.remove_document(path).await
    }

    /// 应用单个事件并请求保存快照
    pub async fn handle(&self, event: ChangeEvent) -> ChangeOutcome {
        let path = normalize_path(&event.path);
        let mut outcome = ChangeOutcome::default();
        let mut relevant = false;

        match event.kind {
            ChangeKind::Created | ChangeKind::Modified => {
                relevant = self.accepts(&path);
                outcome.indexed = self.upsert(&path).await;
            }
            ChangeKind::Deleted => {
                relevant = self.accepts(&path);
                outcome.removed = self.remove(&path).await;
            }
            ChangeKind::Renamed => {
                if let Some(old) = event.old_path.as_deref().map(normalize_path) {
                    relevant |= self.accepts(&old);
                    outcome.removed = self.remove(&old).await;
                }
                relevant |= self.accepts(&path);
                outcome.indexed = self.upsert(&path).await;
            }
        }

        if relevant {
            tracing::debug!("{:?} {} -> {:?}", event.kind, path, outcome);
            self.scheduler.request();
        }
        outcome
    }

    /// 持续处理 `events`，直到发送端关闭
    pub async fn run(self, mut events: mpsc::Receiver<ChangeEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        tracing::debug!("变更事件流已关闭");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::store::FsDocumentStore;
    use std::fs;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Arc<NoteIndex>, ChangeAdapter) {
        let notes = tempfile::tempdir().unwrap();
        fs::write(notes.path().join("a.md"), "roadmap and milestones").unwrap();
        let config = SearchConfig::default();
        let store = Arc::new(FsDocumentStore::new(notes.path(), config.walker.clone()));
        let index = Arc::new(NoteIndex::new(config, store).unwrap());
        index.build_index().await;
        let (scheduler, _worker) = SnapshotScheduler::spawn(index.clone());
        let adapter = ChangeAdapter::new(index.clone(), scheduler);
        (notes, index, adapter)
    }

    #[tokio::test]
    async fn create_modify_delete() {
        let (notes, index, adapter) = setup().await;

        fs::write(notes.path().join("new.md"), "fresh idea").unwrap();
        assert!(adapter.handle(ChangeEvent::created("new.md")).await.indexed);
        assert_eq!(index.search("fresh", None, 10).len(), 1);

        fs::write(notes.path().join("new.md"), "revised thought").unwrap();
        adapter.handle(ChangeEvent::modified("new.md")).await;
        assert!(index.search("fresh", None, 10).is_empty());
        assert_eq!(index.search("revised", None, 10).len(), 1);

        fs::remove_file(notes.path().join("new.md")).unwrap();
        assert!(adapter.handle(ChangeEvent::deleted("new.md")).await.removed);
        assert!(index.search("revised", None, 10).is_empty());
        assert_eq!(index.indexed_paths().await, vec!["a.md"]);
    }

    #[tokio::test]
    async fn hidden_and_ineligible_paths_are_dropped() {
        let (notes, index, adapter) = setup().await;
        fs::create_dir_all(notes.path().join(".trash")).unwrap();
        fs::write(notes.path().join(".trash/x.md"), "secret").unwrap();
        fs::write(notes.path().join("pic.png"), "secret").unwrap();

        assert!(!adapter.handle(ChangeEvent::created(".trash/x.md")).await.touched());
        assert!(!adapter.handle(ChangeEvent::created("pic.png")).await.touched());
        assert!(index.search("secret", None, 10).is_empty());
    }

    #[tokio::test]
    async fn rename_is_delete_plus_create() {
        let (notes, index, adapter) = setup().await;
        fs::rename(notes.path().join("a.md"), notes.path().join("plan.md")).unwrap();

        let outcome = adapter.handle(ChangeEvent::renamed("a.md", "plan.md")).await;
        assert_eq!(outcome, ChangeOutcome { indexed: true, removed: true });
        assert_eq!(index.indexed_paths().await, vec!["plan.md"]);

        let hits = index.search("roadmap", None, 10);
        assert_eq!(hits[0].path, "plan.md");
        assert_eq!(hits[0].name, "plan");
    }

    #[tokio::test]
    async fn rename_into_hidden_folder_only_removes() {
        let (notes, index, adapter) = setup().await;
        fs::create_dir_all(notes.path().join(".archive")).unwrap();
        fs::rename(notes.path().join("a.md"), notes.path().join(".archive/a.md")).unwrap();

        let outcome = adapter.handle(ChangeEvent::renamed("a.md", ".archive/a.md")).await;
        assert_eq!(outcome, ChangeOutcome { indexed: false, removed: true });
        assert!(index.indexed_paths().await.is_empty());
    }

    #[tokio::test]
    async fn run_applies_events_in_order() {
        let (notes, index, adapter) = setup().await;
        fs::write(notes.path().join("b.md"), "draft").unwrap();

        let (tx, rx) = mpsc::channel(8);
        tx.send(ChangeEvent::created("b.md")).await.unwrap();
        tx.send(ChangeEvent::deleted("b.md")).await.unwrap();
        tx.send(ChangeEvent::created("b.md")).await.unwrap();
        drop(tx);
        adapter.run(rx).await;

        assert_eq!(index.indexed_paths().await, vec!["a.md", "b.md"]);
    }
}
