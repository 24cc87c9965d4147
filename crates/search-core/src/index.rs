// search-core/src/index.rs
//! 索引模块 - 构建、增量更新与快照持久化
//!
//! 所有写操作经过同一把异步锁，锁内持有 tantivy 写入器和已索引路径集合，
//! 两者始终一致。查询读取最近一次提交的 searcher，
//! 不获取该锁。

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tantivy::collector::DocSetCollector;
use tantivy::indexer::NoMergePolicy;
use tantivy::query::AllQuery;
use tantivy::tokenizer::TextAnalyzer;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::Mutex;

use crate::config::SearchConfig;
use crate::error::{IndexError, SnapshotError};
use crate::schema::{IndexDocument, SchemaFields, build_schema};
use crate::search::{QueryEngine, SearchHit};
use crate::snapshot::{self, Snapshot};
use crate::store::{DocumentFilter, DocumentStore, normalize_path};

/// 构建时文档的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSource {
    Snapshot,
    Rebuild,
}

/// `build_index` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub source: BuildSource,
    pub documents: usize,
    /// 无法读取的可索引文档数
    pub skipped: usize,
}

struct Inner {
    writer: IndexWriter,
    paths: BTreeSet<String>,
}

impl Inner {
    /// 丢弃未提交的修改并清空所有文档
    fn clear(&mut self) -> Result<(), IndexError> {
        self.rollback()?;
        self.writer.delete_all_documents()?;
        self.paths.clear();
        Ok(())
    }

    fn upsert(&mut self, fields: &SchemaFields, doc: &IndexDocument) -> Result<(), IndexError> {
        self.writer.delete_term(Term::from_field_text(fields.path, &doc.path));
        self.writer.add_document(doc.to_tantivy(fields))?;
        self.paths.insert(doc.path.clone());
        Ok(())
    }

    /// 回滚会重建写入器，需重新设置合并策略
    fn rollback(&mut self) -> Result<(), IndexError> {
        self.writer.rollback()?;
        self.writer.set_merge_policy(Box::new(NoMergePolicy));
        Ok(())
    }

    /// 丢弃上次提交后暂存的修改
    fn discard_staged(&mut self) {
        if let Err(e) = self.rollback() {
            tracing::error!("回滚索引写入失败: {}", e);
        }
    }
}

pub struct NoteIndex {
    config: SearchConfig,
    store: Arc<dyn DocumentStore>,
    filter: DocumentFilter,
    fields: SchemaFields,
    analyzer: TextAnalyzer,
    index: Index,
    reader: IndexReader,
    inner: Mutex<Inner>,
    save_lock: Mutex<()>,
    ready: AtomicBool,
}

impl NoteIndex {
    /// 基于 `store` 创建未就绪的空索引
    pub fn new(config: SearchConfig, store: Arc<dyn DocumentStore>) -> Result<Self, IndexError> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);
        let analyzer = config.index.tokenizer.register(&index);

        let writer: IndexWriter = index.writer_with_num_threads(1, config.index.writer_memory)?;
        // 段合并在 `commit` 中显式进行
        writer.set_merge_policy(Box::new(NoMergePolicy));
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            filter: DocumentFilter::from_config(&config.walker),
            config,
            store,
            fields,
            analyzer,
            index,
            reader,
            inner: Mutex::new(Inner {
                writer,
                paths: BTreeSet::new(),
            }),
            save_lock: Mutex::new(()),
            ready: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn filter(&self) -> &DocumentFilter {
        &self.filter
    }

    /// 构建完成后为 `true`
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub async fn indexed_paths(&self) -> Vec<String> {
        self.inner.lock().await.paths.iter().cloned().collect()
    }

    pub async fn document_count(&self) -> usize {
        self.inner.lock().await.paths.len()
    }

    /// 提交，并合并掉已删除的文档
    ///
    /// 段合并前 BM25 统计仍计入已删除文档，
    /// 否则替换一篇笔记会影响所有文档的得分。
    fn commit(&self, inner: &mut Inner) -> Result<(), IndexError> {
        inner.writer.commit()?;
        self.reader.reload()?;

        let has_deletes = self
            .reader
            .searcher()
            .segment_readers()
            .iter()
            .any(|segment| segment.has_deletes());
        if has_deletes {
            // 合并失败不影响已完成的提交
            if let Err(e) = self.compact(inner) {
                tracing::warn!("合并索引段失败: {}", e);
            }
        }
        Ok(())
    }

    fn compact(&self, inner: &mut Inner) -> Result<(), IndexError> {
        let segments = self.index.searchable_segment_ids()?;
        inner.writer.merge(&segments).wait()?;
        self.reader.reload()?;
        Ok(())
    }

    // ---------------------------------------------------------------- 构建

    /// 从快照恢复；快照不可用时从文档存储重建
    pub async fn build_index(&self) -> BuildReport {
        self.build_index_with_progress(|_, _| {}).await
    }

    /// 带进度回调的 `build_index`，重建时报告 `(done, total)`
    pub async fn build_index_with_progress<F>(&self, progress: F) -> BuildReport
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        match self.try_restore().await {
            Ok(Some(report)) => {
                self.ready.store(true, Ordering::Release);
                tracing::info!("已从快照恢复 {} 个文档", report.documents);
                return report;
            }
            Ok(None) => tracing::info!("未找到快照，开始从笔记目录构建索引"),
            Err(e) => tracing::warn!("快照不可用，重建索引: {}", e),
        }
        self.rebuild_index_with_progress(progress).await
    }

    /// 忽略快照，重新索引所有可索引文档
    pub async fn rebuild_index(&self) -> BuildReport {
        self.rebuild_index_with_progress(|_, _| {}).await
    }

    pub async fn rebuild_index_with_progress<F>(&self, progress: F) -> BuildReport
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let report = match self.try_rebuild(&progress).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("重建索引失败，使用空索引: {}", e);
                self.reset_empty().await;
                BuildReport {
                    source: BuildSource::Rebuild,
                    documents: 0,
                    skipped: 0,
                }
            }
        };
        self.ready.store(true, Ordering::Release);
        tracing::info!(
            "索引完成，共 {} 个文档（跳过 {} 个）",
            report.documents,
            report.skipped
        );
        self.save_snapshot().await;
        report
    }

    async fn reset_empty(&self) {
        let mut inner = self.inner.lock().await;
        if let Err(e) = inner.clear().and_then(|_| self.commit(&mut inner)) {
            tracing::error!("清空索引失败: {}", e);
        }
    }

    async fn try_restore(&self) -> Result<Option<BuildReport>, IndexError> {
        let Some(path) = self.config.snapshot_path.as_deref() else {
            return Ok(None);
        };
        let snapshot = match snapshot::load(path).await {
            Ok(snapshot) => snapshot,
            Err(SnapshotError::Missing(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        snapshot.validate(self.config.index.tokenizer)?;

        let mut inner = self.inner.lock().await;
        inner.clear()?;
        for doc in &snapshot.data.documents {
            inner.upsert(&self.fields, doc)?;
        }
        self.commit(&mut inner)?;

        Ok(Some(BuildReport {
            source: BuildSource::Snapshot,
            documents: inner.paths.len(),
            skipped: 0,
        }))
    }

    async fn try_rebuild<F>(&self, progress: &F) -> Result<BuildReport, IndexError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let mut inner = self.inner.lock().await;
        inner.clear()?;

        let entries = self.store.list_documents("").await?;
        let candidates: Vec<String> = entries
            .into_iter()
            .filter(|entry| !entry.is_directory)
            .map(|entry| normalize_path(&entry.path))
            .filter(|path| self.filter.is_indexable(path))
            .collect();
        let total = candidates.len();
        tracing::info!("正在扫描笔记... (共 {} 个支持的文件)", total);

        let mut skipped = 0;
        for (done, path) in candidates.into_iter().enumerate() {
            match self.store.read_document(&path).await {
                Ok(content) => {
                    inner.upsert(&self.fields, &IndexDocument::new(path.as_str(), content))?;
                    tracing::debug!("已索引: {}", path);
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("跳过 {}: {}", path, e);
                }
            }
            progress(done + 1, total);
        }
        self.commit(&mut inner)?;

        Ok(BuildReport {
            source: BuildSource::Rebuild,
            documents: inner.paths.len(),
            skipped,
        })
    }

    // ---------------------------------------------------------- 增量更新

    /// 读取 `path` 并替换其索引项；跳过时返回 `false`
    pub async fn index_document(&self, path: &str) -> bool {
        match self.try_index_document(path).await {
            Ok(indexed) => indexed,
            Err(e) => {
                tracing::error!("索引失败 {}: {}", path, e);
                false
            }
        }
    }

    async fn try_index_document(&self, path: &str) -> Result<bool, IndexError> {
        let path = normalize_path(path);
        if !self.filter.is_indexable(&path) {
            tracing::debug!("不可索引: {}", path);
            return Ok(false);
        }

        let mut inner = self.inner.lock().await;
        let content = match self.store.read_document(&path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("跳过 {}: {}", path, e);
                return Ok(false);
            }
        };
        let was_tracked = inner.paths.contains(&path);
        let staged = inner
            .upsert(&self.fields, &IndexDocument::new(path.as_str(), content))
            .and_then(|_| self.commit(&mut inner));
        if let Err(e) = staged {
            inner.discard_staged();
            if !was_tracked {
                inner.paths.remove(&path);
            }
            return Err(e);
        }
        tracing::debug!("已索引: {}", path);
        Ok(true)
    }

    /// 从索引中删除 `path`；未被索引时返回 `false`
    pub async fn remove_document(&self, path: &str) -> bool {
        match self.try_remove_document(path).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::error!("删除索引失败 {}: {}", path, e);
                false
            }
        }
    }

    async fn try_remove_document(&self, path: &str) -> Result<bool, IndexError> {
        let path = normalize_path(path);
        let mut inner = self.inner.lock().await;
        if !inner.paths.contains(&path) {
            return Ok(false);
        }
        inner.writer.delete_term(Term::from_field_text(self.fields.path, &path));
        if let Err(e) = self.commit(&mut inner) {
            inner.discard_staged();
            return Err(e);
        }
        inner.paths.remove(&path);
        tracing::debug!("已从索引删除: {}", path);
        Ok(true)
    }

    // ------------------------------------------------------------- 持久化

    fn capture(&self, inner: &Inner) -> Result<Snapshot, IndexError> {
        let searcher = self.reader.searcher();
        let addresses = searcher.search(&AllQuery, &DocSetCollector)?;

        let mut documents = Vec::with_capacity(addresses.len());
        for address in addresses {
            let stored: TantivyDocument = searcher.doc(address)?;
            if let Some(doc) = IndexDocument::from_tantivy(&stored, &self.fields) {
                documents.push(doc);
            }
        }
        documents.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(Snapshot::new(
            self.config.index.tokenizer,
            documents,
            inner.paths.iter().cloned().collect(),
        ))
    }

    /// 持久化当前索引；跳过或失败时返回 `false`
    pub async fn save_snapshot(&self) -> bool {
        let Some(path) = self.config.snapshot_path.as_deref() else {
            return false;
        };
        if !self.is_ready() {
            tracing::debug!("索引尚未构建，跳过保存");
            return false;
        }
        match self.try_save(path).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("保存快照失败 {:?}: {}", path, e);
                false
            }
        }
    }

    async fn try_save(&self, path: &Path) -> Result<(), IndexError> {
        // 在采集和写入期间持有，保证写入顺序与采集顺序一致
        let _guard = self.save_lock.lock().await;
        let snapshot = {
            let inner = self.inner.lock().await;
            self.capture(&inner)?
        };

        let write = snapshot::write_atomic(path, &snapshot);
        match self.config.index.save_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), write)
                .await
                .map_err(|_| IndexError::SaveTimeout(secs))??,
            None => write.await?,
        }
        tracing::debug!("已保存 {} 个文档到 {:?}", snapshot.paths.len(), path);
        Ok(())
    }

    // --------------------------------------------------------------- 查询

    fn engine<'a>(&'a self, searcher: &'a tantivy::Searcher) -> QueryEngine<'a> {
        QueryEngine {
            searcher,
            fields: &self.fields,
            analyzer: &self.analyzer,
            config: &self.config.query,
        }
    }

    /// 排序搜索；空查询、索引未就绪或内部错误时返回 `[]`
    pub fn search(&self, query: &str, scope: Option<&str>, limit: usize) -> Vec<SearchHit> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        if !self.is_ready() {
            tracing::warn!("索引尚未构建，搜索返回空结果");
            return Vec::new();
        }
        let searcher = self.reader.searcher();
        match self.engine(&searcher).search(query, scope, limit) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::error!("搜索 {:?} 失败: {}", query, e);
                Vec::new()
            }
        }
    }

    /// 使用配置的默认数量上限搜索
    pub fn search_default(&self, query: &str, scope: Option<&str>) -> Vec<SearchHit> {
        self.search(query, scope, self.config.query.default_limit)
    }

    /// 补全 `prefix` 最后一个词的索引词汇
    pub fn get_suggestions(&self, prefix: &str, limit: usize) -> Vec<String> {
        if prefix.trim().is_empty() {
            return Vec::new();
        }
        if !self.is_ready() {
            tracing::warn!("索引尚未构建，补全返回空结果");
            return Vec::new();
        }
        let searcher = self.reader.searcher();
        match self.engine(&searcher).suggest(prefix, limit) {
            Ok(terms) => terms,
            Err(e) => {
                tracing::error!("补全 {:?} 失败: {}", prefix, e);
                Vec::new()
            }
        }
    }

    pub fn suggestions_default(&self, prefix: &str) -> Vec<String> {
        self.get_suggestions(prefix, self.config.query.suggestion_limit)
    }
}
