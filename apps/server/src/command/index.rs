use super::Command;
use crate::config::Config;
use crate::error::{Result, error};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;

use search_core::{FsDocumentStore, NoteIndex};

pub struct IndexCommand {
    config: Config,
    root_path: Option<PathBuf>,
}

impl IndexCommand {
    pub fn new(cfg: Config, root_path: Option<PathBuf>) -> Self {
        Self {
            config: cfg,
            root_path,
        }
    }
}

#[async_trait::async_trait]
impl Command for IndexCommand {
    async fn execute(&self) -> Result<()> {
        let root = self.config.notes_root(self.root_path.as_deref())?;
        let search_config = self.config.search_config();
        let snapshot_path = search_config.snapshot_path.clone();

        let store = Arc::new(FsDocumentStore::new(&root, search_config.walker.clone()));
        let index = NoteIndex::new(search_config, store).map_err(|e| error!("failed to create index: {}", e))?;

        let bar = ProgressBar::new(0);
        bar.set_style(ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")?.progress_chars("=> "));
        bar.set_message(format!("{}", root.display()));

        let report = index
            .rebuild_index_with_progress(|done, total| {
                bar.set_length(total as u64);
                bar.set_position(done as u64);
            })
            .await;
        bar.finish_and_clear();

        println!("✅ 已索引 {} 篇笔记，目录: {}", report.documents, root.display());
        if report.skipped > 0 {
            println!("⚠️  跳过 {} 篇无法读取的笔记（使用 -v 查看详情）", report.skipped);
        }
        if let Some(path) = snapshot_path {
            println!("📂 快照: {}", path.display());
        }
        Ok(())
    }
}
