use super::Command;
use crate::config::Config;
use crate::error::{Result, error};
use crate::watcher::NotesWatcher;
use futures::{future, prelude::*};
use std::fs;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use rpc::{
    NoteSearch,
    search::{IndexStatus, SearchHit, SearchRequest},
};
use tarpc::{
    context::Context,
    server::{self, Channel},
    tokio_serde::formats::Bincode,
};

use search_core::{ChangeAdapter, FsDocumentStore, NoteIndex, SnapshotScheduler, rpc_compat};

/// 构建索引期间缓存的文件事件数量
const CHANGE_QUEUE_CAPACITY: usize = 1024;

async fn spawn(fut: impl Future<Output = ()> + Send + 'static) {
    tokio::spawn(fut);
}

#[derive(Clone)]
struct Server {
    index: Arc<NoteIndex>,
    scheduler: SnapshotScheduler,
}

impl NoteSearch for Server {
    async fn ping(self, _c: Context) -> String {
        "Pong".to_string()
    }

    async fn search(self, _c: Context, req: SearchRequest) -> Vec<SearchHit> {
        let hits = rpc_compat::handle_search(&self.index, &req);
        info!("搜索 {:?} 返回 {} 条结果", req.query, hits.len());
        hits
    }

    async fn suggest(self, _c: Context, prefix: String, limit: Option<usize>) -> Vec<String> {
        rpc_compat::handle_suggest(&self.index, &prefix, limit)
    }

    async fn reindex_file(self, _c: Context, path: String) -> bool {
        let indexed = self.index.index_document(&path).await;
        if indexed {
            self.scheduler.request();
        }
        indexed
    }

    async fn remove_file(self, _c: Context, path: String) -> bool {
        let removed = self.index.remove_document(&path).await;
        if removed {
            self.scheduler.request();
        }
        removed
    }

    async fn save_index(self, _c: Context) -> bool {
        self.index.save_snapshot().await
    }

    async fn status(self, _c: Context) -> IndexStatus {
        rpc_compat::status(&self.index).await
    }
}

pub struct ServeCommand {
    config: Config,
}

impl ServeCommand {
    pub fn new(cfg: Config) -> Self {
        Self { config: cfg }
    }
}

#[async_trait::async_trait]
impl Command for ServeCommand {
    async fn execute(&self) -> Result<()> {
        let unix_socket_path = self.config.socket_path();

        if let Some(parent) = unix_socket_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if unix_socket_path.exists() {
            fs::remove_file(&unix_socket_path)?;
        }

        let root = self.config.notes_root(None)?;
        let search_config = self.config.search_config();
        info!("笔记目录 {:?}，快照 {:?}", root, search_config.snapshot_path);

        let store = Arc::new(FsDocumentStore::new(&root, search_config.walker.clone()));
        let index = Arc::new(
            NoteIndex::new(search_config, store).map_err(|e| error!("failed to create index: {}", e))?,
        );

        // 先启动监控再构建，构建期间的修改会在之后重放
        let (tx, rx) = mpsc::channel(CHANGE_QUEUE_CAPACITY);
        let _watcher = NotesWatcher::start(&root, tx)?;

        let report = index.build_index().await;
        info!("索引就绪: {} 个文档，来源 {:?}", report.documents, report.source);

        let (scheduler, saver) = SnapshotScheduler::spawn(index.clone());
        let changes = tokio::spawn(ChangeAdapter::new(index.clone(), scheduler.clone()).run(rx));

        info!("监听: {:?}", unix_socket_path);
        let mut listener = tarpc::serde_transport::unix::listen(&unix_socket_path, Bincode::default).await?;
        listener.config_mut().max_frame_length(usize::MAX);

        let server = Server {
            index: index.clone(),
            scheduler,
        };

        let serving = listener
            .filter_map(|r| future::ready(r.ok()))
            .map(server::BaseChannel::with_defaults)
            .map(|channel| {
                let server = server.clone();
                channel.execute(server.serve()).for_each(spawn)
            })
            .buffer_unordered(10)
            .for_each(|_| async {});

        tokio::select! {
            _ = serving => {}
            _ = tokio::signal::ctrl_c() => info!("正在关闭"),
        }

        changes.abort();
        saver.abort();
        if index.save_snapshot().await {
            info!("快照已保存");
        }
        let _ = fs::remove_file(&unix_socket_path);

        Ok(())
    }
}
