// apps/server/src/command/clear_cache.rs
//! 删除索引快照

use super::Command;
use crate::config::Config;
use crate::error::Result;
use search_core::snapshot;

pub struct ClearCacheCommand {
    config: Config,
}

impl ClearCacheCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl Command for ClearCacheCommand {
    async fn execute(&self) -> Result<()> {
        let Some(path) = self.config.search_config().snapshot_path else {
            println!("⏭️  未配置快照路径");
            return Ok(());
        };

        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if snapshot::remove(&path).await? {
            println!("✅ 已删除 {} ({} 字节)", path.display(), size);
            println!("运行 'notes-server index' 重建索引");
        } else {
            println!("⏭️  {} 不存在，跳过", path.display());
        }
        Ok(())
    }
}
