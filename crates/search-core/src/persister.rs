// search-core/src/persister.rs
//! 快照保存队列 - 后台写入，最多一个待处理请求
//!
//! 同一时间最多一个保存在执行，另有最多一个在等待。
//! 已有待处理保存时的新请求会并入该保存，
//! 它在开始时采集索引状态。

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::index::NoteIndex;

/// 请求保存快照的句柄
#[derive(Debug, Clone)]
pub struct SnapshotScheduler {
    tx: mpsc::Sender<()>,
}

impl SnapshotScheduler {
    /// 为 `index` 启动保存任务
    ///
    /// 所有句柄被释放后，任务在完成待处理的保存后退出。
    pub fn spawn(index: Arc<NoteIndex>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let handle = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                index.save_snapshot().await;
            }
            tracing::debug!("快照保存任务已停止");
        });
        (Self { tx }, handle)
    }

    /// 请求保存；并入已有的待处理保存时返回 `false`
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => {
                tracing::trace!("已有待处理的快照保存");
                false
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                tracing::warn!("快照保存任务已退出，丢弃本次保存");
                false
            }
        }
    }
}
