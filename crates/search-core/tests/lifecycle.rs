//! 在真实笔记目录上的端到端测试

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rstest::rstest;
use search_core::{
    BuildSource, ChangeAdapter, ChangeEvent, FsDocumentStore, IndexDocument, NoteIndex, SearchConfig,
    Snapshot, SnapshotScheduler, TokenizerKind, snapshot,
};
use tempfile::TempDir;

struct Fixture {
    notes: TempDir,
    _cache: TempDir,
    snapshot_path: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let notes = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let snapshot_path = cache.path().join("search-index.json");
        Self { notes, _cache: cache, snapshot_path }
    }

    /// roadmap 场景中的 `a.md` 和 `b/c.md`
    fn roadmap() -> Self {
        let fixture = Self::new();
        fixture.write("a.md", "roadmap and milestones");
        fixture.write("b/c.md", "roadmap changes for Q3");
        fixture
    }

    fn write(&self, path: &str, content: &str) {
        let full = self.notes.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    fn root(&self) -> &Path {
        self.notes.path()
    }

    fn index(&self) -> Arc<NoteIndex> {
        let config = SearchConfig::default().with_snapshot_path(&self.snapshot_path);
        let store = Arc::new(FsDocumentStore::new(self.root(), config.walker.clone()));
        Arc::new(NoteIndex::new(config, store).unwrap())
    }
}

fn paths(hits: &[search_core::SearchHit]) -> Vec<&str> {
    let mut paths: Vec<&str> = hits.iter().map(|hit| hit.path.as_str()).collect();
    paths.sort();
    paths
}

#[tokio::test]
async fn roadmap_scenario() {
    let fixture = Fixture::roadmap();
    let index = fixture.index();
    index.build_index().await;

    assert_eq!(paths(&index.search("roadmap", None, 50)), vec!["a.md", "b/c.md"]);
    assert_eq!(paths(&index.search("roadmap", Some("b"), 50)), vec!["b/c.md"]);

    index.remove_document("a.md").await;
    assert_eq!(paths(&index.search("roadmap", None, 50)), vec!["b/c.md"]);
}

#[tokio::test]
async fn snapshot_round_trip_restores_identical_results() {
    let fixture = Fixture::roadmap();
    let first = fixture.index();
    let report = first.build_index().await;
    assert_eq!(report.source, BuildSource::Rebuild);
    assert!(fixture.snapshot_path.exists());

    let second = fixture.index();
    let report = second.build_index().await;
    assert_eq!(report.source, BuildSource::Snapshot);
    assert_eq!(report.documents, 2);

    assert_eq!(first.indexed_paths().await, second.indexed_paths().await);
    for query in ["roadmap", "milestones", "q3", "changes roadmap"] {
        assert_eq!(first.search(query, None, 50), second.search(query, None, 50), "query {query}");
    }
}

#[tokio::test]
async fn restart_after_incremental_updates_scores_identically() {
    let fixture = Fixture::roadmap();
    fixture.write("e.md", "milestones for Q4");
    let live = fixture.index();
    live.build_index().await;

    fixture.write("a.md", "roadmap and milestones revised twice");
    assert!(live.index_document("a.md").await);
    fixture.write("d.md", "roadmap roadmap draft");
    assert!(live.index_document("d.md").await);
    assert!(live.index_document("d.md").await);
    assert!(live.remove_document("b/c.md").await);
    assert!(live.save_snapshot().await);

    let restarted = fixture.index();
    assert_eq!(restarted.build_index().await.source, BuildSource::Snapshot);
    assert_eq!(live.indexed_paths().await, restarted.indexed_paths().await);
    for query in ["roadmap", "milestones", "draft", "revised roadmap"] {
        let before = live.search(query, None, 50);
        assert!(!before.is_empty(), "query {query}");
        assert_eq!(before, restarted.search(query, None, 50), "query {query}");
    }

    // 从头重建的结果也一致
    let rebuilt = fixture.index();
    rebuilt.rebuild_index().await;
    assert_eq!(live.search("roadmap", None, 50), rebuilt.search("roadmap", None, 50));
}

#[tokio::test]
async fn snapshot_is_trusted_without_traversal() {
    let fixture = Fixture::roadmap();
    fixture.index().build_index().await;

    // 在快照之后写入，只有重建才能看到
    fixture.write("later.md", "unsaved addition");
    let index = fixture.index();
    assert_eq!(index.build_index().await.source, BuildSource::Snapshot);
    assert!(index.search("unsaved", None, 50).is_empty());

    index.rebuild_index().await;
    assert_eq!(paths(&index.search("unsaved", None, 50)), vec!["later.md"]);
}

#[tokio::test]
async fn removed_documents_leave_no_trace() {
    let fixture = Fixture::roadmap();
    fixture.write("zebra.md", "zeppelin notes");
    let index = fixture.index();
    index.build_index().await;
    assert_eq!(index.get_suggestions("zep", 10), vec!["zeppelin"]);

    assert!(index.remove_document("zebra.md").await);
    assert!(index.search("zeppelin", None, 50).is_empty());
    assert!(index.get_suggestions("zep", 10).is_empty());
    assert!(!index.indexed_paths().await.contains(&"zebra.md".to_string()));
}

#[rstest]
#[case("b")]
#[case("/b/")]
#[case("work")]
#[case("work/2024")]
#[tokio::test]
async fn scoped_results_are_a_prefix_filtered_subset(#[case] scope: &str) {
    let fixture = Fixture::roadmap();
    fixture.write("work/2024/plan.md", "roadmap for the year");
    fixture.write("work/notes.md", "roadmap review");
    fixture.write("workshop.md", "roadmap workshop");
    let index = fixture.index();
    index.build_index().await;

    let all = index.search("roadmap", None, 50);
    let scoped = index.search("roadmap", Some(scope), 50);
    let trimmed = scope.trim_matches('/');

    assert!(!scoped.is_empty());
    for hit in &scoped {
        assert!(hit.path.starts_with(trimmed), "{} outside {}", hit.path, trimmed);
        assert!(all.iter().any(|other| other.path == hit.path));
    }
}

#[tokio::test]
async fn scope_applies_before_limit() {
    let fixture = Fixture::new();
    for i in 0..5 {
        fixture.write(&format!("roadmap-{i}.md"), "roadmap roadmap roadmap");
    }
    fixture.write("deep/x.md", "roadmap");
    let index = fixture.index();
    index.build_index().await;

    assert_eq!(paths(&index.search("roadmap", Some("deep"), 1)), vec!["deep/x.md"]);
    assert_eq!(index.search("roadmap", None, 3).len(), 3);
}

#[tokio::test]
async fn title_matches_outrank_body_matches() {
    let fixture = Fixture::new();
    fixture.write("roadmap.md", "overview of the quarter");
    fixture.write("meeting.md", "we discussed the roadmap today");
    let index = fixture.index();
    index.build_index().await;

    let hits = index.search("roadmap", None, 50);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].path, "roadmap.md");
    assert!(hits[0].score > hits[1].score);
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("\t\n")]
#[tokio::test]
async fn blank_input_returns_nothing(#[case] input: &str) {
    let fixture = Fixture::roadmap();
    let index = fixture.index();
    index.build_index().await;

    assert!(index.search(input, None, 50).is_empty());
    assert!(index.get_suggestions(input, 10).is_empty());
}

#[tokio::test]
async fn unsaved_mutation_is_lost_to_last_snapshot() {
    let fixture = Fixture::roadmap();
    let index = fixture.index();
    index.build_index().await;

    fixture.write("fresh.md", "never persisted");
    assert!(index.index_document("fresh.md").await);
    drop(index);

    let restarted = fixture.index();
    assert_eq!(restarted.build_index().await.source, BuildSource::Snapshot);
    assert_eq!(restarted.indexed_paths().await, vec!["a.md", "b/c.md"]);
}

#[rstest]
#[case(b"{\"version\": 1, \"data\": {".as_slice())]
#[case(b"".as_slice())]
#[case(b"[]".as_slice())]
#[tokio::test]
async fn corrupt_snapshot_triggers_rebuild(#[case] contents: &[u8]) {
    let fixture = Fixture::roadmap();
    fs::write(&fixture.snapshot_path, contents).unwrap();

    let index = fixture.index();
    let report = index.build_index().await;
    assert_eq!(report.source, BuildSource::Rebuild);
    assert_eq!(report.documents, 2);

    // 重建后立即写入新的快照
    let saved = snapshot::load(&fixture.snapshot_path).await.unwrap();
    assert_eq!(saved.paths, vec!["a.md", "b/c.md"]);
}

#[tokio::test]
async fn incompatible_snapshot_triggers_rebuild() {
    let fixture = Fixture::roadmap();
    let foreign = Snapshot::new(TokenizerKind::Jieba, vec![IndexDocument::new("ghost.md", "boo")], vec!["ghost.md".into()]);
    snapshot::write_atomic(&fixture.snapshot_path, &foreign).await.unwrap();

    let index = fixture.index();
    assert_eq!(index.build_index().await.source, BuildSource::Rebuild);
    assert!(index.search("boo", None, 50).is_empty());
}

#[tokio::test]
async fn snapshot_titles_survive_renames_until_reindexed() {
    let fixture = Fixture::new();
    fixture.write("renamed.md", "quarterly roadmap");
    let mut doc = IndexDocument::new("renamed.md", "quarterly roadmap");
    doc.title = "original".into();
    let saved = Snapshot::new(TokenizerKind::Simple, vec![doc], vec!["renamed.md".into()]);
    snapshot::write_atomic(&fixture.snapshot_path, &saved).await.unwrap();

    let index = fixture.index();
    index.build_index().await;

    let hits = index.search("original", None, 50);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "renamed");

    index.index_document("renamed.md").await;
    assert!(index.search("original", None, 50).is_empty());
}

#[tokio::test]
async fn change_stream_keeps_snapshot_current() {
    let fixture = Fixture::roadmap();
    let index = fixture.index();
    index.build_index().await;

    let (scheduler, worker) = SnapshotScheduler::spawn(index.clone());
    let adapter = ChangeAdapter::new(index.clone(), scheduler);
    let (tx, rx) = tokio::sync::mpsc::channel(16);
    let consumer = tokio::spawn(adapter.run(rx));

    fixture.write("b/d.md", "roadmap appendix");
    tx.send(ChangeEvent::created("b/d.md")).await.unwrap();
    fs::remove_file(fixture.root().join("a.md")).unwrap();
    tx.send(ChangeEvent::deleted("a.md")).await.unwrap();
    tx.send(ChangeEvent::created(".obsidian/workspace.md")).await.unwrap();
    drop(tx);

    consumer.await.unwrap();
    worker.await.unwrap();

    assert_eq!(paths(&index.search("roadmap", None, 50)), vec!["b/c.md", "b/d.md"]);
    let saved = snapshot::load(&fixture.snapshot_path).await.unwrap();
    assert_eq!(saved.paths, vec!["b/c.md", "b/d.md"]);
}
