//! 文件监控 - 将文件系统事件送入变更适配层

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use search_core::ChangeEvent;
use search_core::store::normalize_path;
use tokio::sync::mpsc;

use crate::error::{Result, WrapErr};

/// 持有系统监控句柄；释放后事件流停止
pub struct NotesWatcher {
    _watcher: RecommendedWatcher,
}

impl NotesWatcher {
    /// 递归监控 `root`，按到达顺序将相对路径事件发送到 `tx`
    pub fn start(root: &Path, tx: mpsc::Sender<ChangeEvent>) -> Result<Self> {
        let root = root
            .canonicalize()
            .wrap_err_with(|| format!("notes directory {:?} is not accessible", root))?;
        let event_root = root.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for change in translate(&event_root, &event) {
                        // 运行在 notify 线程上，不在 tokio 运行时内
                        if tx.blocking_send(change).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => tracing::warn!("监控错误: {}", e),
            },
            NotifyConfig::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::info!("开始监控: {:?}", root);

        Ok(Self { _watcher: watcher })
    }
}

fn relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let key = normalize_path(&rel.to_string_lossy());
    (!key.is_empty()).then_some(key)
}

fn each(root: &Path, paths: &[PathBuf], make: fn(String) -> ChangeEvent) -> Vec<ChangeEvent> {
    paths.iter().filter_map(|p| relative(root, p)).map(make).collect()
}

/// 将 notify 事件转换为变更事件；目录交由适配层过滤
pub fn translate(root: &Path, event: &Event) -> Vec<ChangeEvent> {
    match &event.kind {
        EventKind::Create(_) => each(root, &event.paths, |p| ChangeEvent::created(p)),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => match (relative(root, from), relative(root, to)) {
                (Some(from), Some(to)) => vec![ChangeEvent::renamed(from, to)],
                (Some(from), None) => vec![ChangeEvent::deleted(from)],
                (None, Some(to)) => vec![ChangeEvent::created(to)],
                (None, None) => Vec::new(),
            },
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(root, &event.paths, |p| ChangeEvent::deleted(p)),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(root, &event.paths, |p| ChangeEvent::created(p)),
        // 无方向的重命名事件，按当前文件是否存在判断
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .filter_map(|p| {
                let rel = relative(root, p)?;
                Some(if p.exists() { ChangeEvent::modified(rel) } else { ChangeEvent::deleted(rel) })
            })
            .collect(),
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => each(root, &event.paths, |p| ChangeEvent::modified(p)),
        EventKind::Remove(_) => each(root, &event.paths, |p| ChangeEvent::deleted(p)),
        _ => Vec::new(),
    }
}
