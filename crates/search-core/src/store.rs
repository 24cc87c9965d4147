// search-core/src/store.rs
//! 文档存储访问与可索引规则

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chardetng::EncodingDetector;
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};

use crate::config::WalkerConfig;
use crate::error::StoreError;

/// 递归列表中的一项，路径相对笔记根目录
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub path: String,
    pub is_directory: bool,
}

/// 笔记目录的只读访问
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 递归列出 `root` 下的条目（空字符串表示整个目录）
    async fn list_documents(&self, root: &str) -> Result<Vec<DocumentEntry>, StoreError>;

    /// 读取单个文档的全文
    async fn read_document(&self, path: &str) -> Result<String, StoreError>;
}

/// 规范化为索引主键：`/` 分隔，无前导分隔符，无 `.` 段
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// 隐藏路径与扩展名规则，遍历器和变更适配器共用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFilter {
    hidden_prefix: String,
    extensions: Vec<String>,
}

impl DocumentFilter {
    pub fn new(hidden_prefix: impl Into<String>, extensions: &[String]) -> Self {
        Self {
            hidden_prefix: hidden_prefix.into(),
            extensions: extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &WalkerConfig) -> Self {
        Self::new(config.hidden_prefix.clone(), &config.supported_extensions)
    }

    /// 任一路径段以隐藏前缀开头
    pub fn is_hidden(&self, path: &str) -> bool {
        if self.hidden_prefix.is_empty() {
            return false;
        }
        normalize_path(path)
            .split('/')
            .any(|segment| segment.starts_with(&self.hidden_prefix))
    }

    pub fn is_eligible(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    pub fn is_indexable(&self, path: &str) -> bool {
        !self.is_hidden(path) && self.is_eligible(path)
    }
}

impl Default for DocumentFilter {
    fn default() -> Self {
        Self::from_config(&WalkerConfig::default())
    }
}

/// 解码文档字节，非 UTF-8 时自动检测编码
pub fn decode_text(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding: &'static encoding_rs::Encoding = detector.guess(None, true);
    let (decoded, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::warn!("使用 {} 解码时遇到非法字节", used.name());
    } else {
        tracing::debug!("按 {} 解码文档", used.name());
    }
    decoded.into_owned()
}

/// 本地文件系统上的笔记，限制在 `root` 之内
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
    walker: WalkerConfig,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>, walker: WalkerConfig) -> Self {
        Self {
            root: root.into(),
            walker,
        }
    }

    /// 相对路径转绝对路径；拒绝 `..` 段
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let normalized = normalize_path(path);
        if normalized.split('/').any(|segment| segment == "..") {
            return Err(StoreError::OutsideRoot(path.to_string()));
        }
        if normalized.is_empty() {
            return Ok(self.root.clone());
        }
        Ok(self.root.join(normalized))
    }

    /// 根目录下绝对路径对应的相对主键
    pub fn relative_path(&self, absolute: &Path) -> Option<String> {
        let relative = absolute.strip_prefix(&self.root).ok()?;
        let key = normalize_path(&relative.to_string_lossy());
        (!key.is_empty()).then_some(key)
    }

    fn walk(&self, dir: &Path) -> Vec<DocumentEntry> {
        let mut builder = WalkBuilder::new(dir);
        builder
            .hidden(false)
            .parents(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(self.walker.respect_ignore)
            .follow_links(self.walker.follow_symlinks);

        if self.walker.max_depth > 0 {
            builder.max_depth(Some(self.walker.max_depth));
        }

        let prefix = self.walker.hidden_prefix.clone();
        if !prefix.is_empty() {
            builder.filter_entry(move |entry| {
                entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with(&prefix)
            });
        }

        tracing::debug!("开始遍历目录: {:?}", dir);

        let mut entries = Vec::new();
        for result in builder.build() {
            match result {
                Ok(entry) => {
                    if entry.depth() == 0 {
                        continue;
                    }
                    let Some(path) = self.relative_path(entry.path()) else {
                        continue;
                    };
                    let is_directory = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                    entries.push(DocumentEntry { path, is_directory });
                }
                Err(e) => {
                    tracing::warn!("遍历错误: {}", e);
                }
            }
        }
        entries.sort();
        entries
    }

    /// 未开启跟随符号链接时，拒绝指向根目录之外的链接
    async fn check_inside_root(&self, path: &str, full: &Path) -> Result<(), StoreError> {
        if self.walker.follow_symlinks {
            return Ok(());
        }
        let io_err = |source| StoreError::Io {
            path: path.to_string(),
            source,
        };
        let root = tokio::fs::canonicalize(&self.root).await.map_err(io_err)?;
        let target = tokio::fs::canonicalize(full).await.map_err(io_err)?;
        if target.starts_with(&root) {
            Ok(())
        } else {
            Err(StoreError::OutsideRoot(path.to_string()))
        }
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn list_documents(&self, root: &str) -> Result<Vec<DocumentEntry>, StoreError> {
        let dir = self.resolve(root)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(StoreError::NotADocument(root.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(root.to_string()));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: root.to_string(),
                    source,
                });
            }
        }

        let store = self.clone();
        tokio::task::spawn_blocking(move || store.walk(&dir))
            .await
            .map_err(|e| StoreError::Io {
                path: root.to_string(),
                source: std::io::Error::other(e),
            })
    }

    async fn read_document(&self, path: &str) -> Result<String, StoreError> {
        let full = self.resolve(path)?;
        let meta = match tokio::fs::metadata(&full).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_string()));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_string(),
                    source,
                });
            }
        };
        if !meta.is_file() {
            return Err(StoreError::NotADocument(path.to_string()));
        }
        self.check_inside_root(path, &full).await?;

        let bytes = tokio::fs::read(&full).await.map_err(|source| StoreError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(decode_text(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn notes_tree() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "roadmap and milestones").unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/c.md"), "roadmap changes for Q3").unwrap();
        fs::create_dir_all(dir.path().join(".trash")).unwrap();
        fs::write(dir.path().join(".trash/old.md"), "deleted").unwrap();
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        dir
    }

    #[rstest]
    #[case("a.md", "a.md")]
    #[case("/b/c.md", "b/c.md")]
    #[case("b\\c.md", "b/c.md")]
    #[case("./b//c.md/", "b/c.md")]
    #[case("", "")]
    fn normalizes_to_index_keys(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_path(input), expected);
    }

    #[rstest]
    #[case("a.md", true)]
    #[case("b/c.MD", true)]
    #[case(".trash/old.md", false)]
    #[case("b/.draft.md", false)]
    #[case("image.png", false)]
    #[case("README", false)]
    fn filter_decides_indexability(#[case] path: &str, #[case] indexable: bool) {
        assert_eq!(DocumentFilter::default().is_indexable(path), indexable);
    }

    #[test]
    fn empty_hidden_prefix_hides_nothing() {
        let filter = DocumentFilter::new("", &["md".to_string()]);
        assert!(filter.is_indexable(".trash/old.md"));
    }

    #[tokio::test]
    async fn listing_skips_hidden_entries() {
        let dir = notes_tree();
        let store = FsDocumentStore::new(dir.path(), WalkerConfig::default());
        let entries = store.list_documents("").await.unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.md", "b", "b/c.md", "image.png"]);
        assert!(entries.iter().find(|e| e.path == "b").unwrap().is_directory);
    }

    #[tokio::test]
    async fn listing_a_subfolder_keeps_root_relative_paths() {
        let dir = notes_tree();
        let store = FsDocumentStore::new(dir.path(), WalkerConfig::default());
        let entries = store.list_documents("b").await.unwrap();
        assert_eq!(entries, vec![DocumentEntry { path: "b/c.md".into(), is_directory: false }]);
    }

    #[tokio::test]
    async fn reads_and_reports_errors() {
        let dir = notes_tree();
        let store = FsDocumentStore::new(dir.path(), WalkerConfig::default());
        assert_eq!(store.read_document("b/c.md").await.unwrap(), "roadmap changes for Q3");
        assert!(matches!(store.read_document("missing.md").await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.read_document("b").await, Err(StoreError::NotADocument(_))));
        assert!(matches!(store.read_document("../etc/passwd").await, Err(StoreError::OutsideRoot(_))));
        assert!(matches!(store.list_documents("nope").await, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn non_utf8_bytes_are_decoded() {
        let text = decode_text(b"caf\xe9 au lait");
        assert!(text.contains("au lait"));
        assert_eq!(decode_text("plain utf8".as_bytes()), "plain utf8");
    }

    #[test]
    fn relative_path_strips_root() {
        let store = FsDocumentStore::new("/notes", WalkerConfig::default());
        assert_eq!(store.relative_path(Path::new("/notes/b/c.md")).as_deref(), Some("b/c.md"));
        assert_eq!(store.relative_path(Path::new("/elsewhere/x.md")), None);
        assert_eq!(store.relative_path(Path::new("/notes")), None);
    }
}
