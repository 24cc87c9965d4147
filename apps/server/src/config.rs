use crate::error::{OptionExt, Result};
use config::{AppStrategy, create_strategy, resolve_dir};
use search_core::SearchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default = "default_config", deny_unknown_fields)]
pub struct Config {
    pub runtime_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// 笔记所在目录
    pub notes_root: Option<PathBuf>,
    pub search: SearchConfig,
}

fn default_config() -> Config {
    let (runtime_dir, cache_dir) = match create_strategy() {
        Ok(strategy) => (
            resolve_dir("RUNTIME_DIRECTORY", &strategy, |s| s.runtime_dir()),
            resolve_dir("CACHE_DIRECTORY", &strategy, |s| Some(s.cache_dir())),
        ),
        Err(_) => {
            let fallback = std::env::temp_dir().join(config::constants::APP_NAME);
            (fallback.clone(), fallback)
        }
    };

    Config {
        runtime_dir,
        cache_dir,
        notes_root: None,
        search: SearchConfig::default(),
    }
}

impl Default for Config {
    fn default() -> Self {
        default_config()
    }
}

impl Config {
    fn load_str(user_config_str: &str) -> Result<Config> {
        let user_config: Config = toml::from_str(user_config_str)?;
        Ok(user_config)
    }

    pub fn load() -> Result<Config> {
        let strategy = create_strategy()?;
        let config_path = strategy.config_dir().join(config::constants::SERVER_CONFIG_FILE_NAME);

        match std::fs::read_to_string(&config_path) {
            Ok(user_config_str) => Self::load_str(&user_config_str),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::create_example_config(&config_path)?;
                Self::load_str("")
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 搜索配置；未指定快照路径时放在缓存目录下
    pub fn search_config(&self) -> SearchConfig {
        let mut search = self.search.clone();
        if search.snapshot_path.is_none() {
            search.snapshot_path = Some(self.cache_dir.join(config::constants::SNAPSHOT_FILE_NAME));
        }
        search
    }

    pub fn socket_path(&self) -> PathBuf {
        config::socket_path(&self.runtime_dir)
    }

    /// 优先使用 `override_root`，否则使用配置文件中的 `notes-root`
    pub fn notes_root(&self, override_root: Option<&Path>) -> Result<PathBuf> {
        override_root
            .map(Path::to_path_buf)
            .or_else(|| self.notes_root.clone())
            .ok_or_eyre("no notes directory: set `notes-root` in the config file")
    }

    fn create_example_config(config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let example_config = r#"# notes-server configuration
#
# Created on first run. Restart the server after editing.

# Directory holding your notes
# notes-root = "/home/you/notes"

# Optional: custom runtime directory (unix socket)
# runtime-dir = "/custom/runtime/path"

# Optional: custom cache directory (index snapshot)
# cache-dir = "/custom/cache/path"

# [search]
# snapshot-path = "/custom/search-index.json"
#
# [search.index]
# tokenizer = "simple"        # or "jieba" for Chinese notes
# save-timeout-secs = 30
#
# [search.query]
# title-boost = 3.0
# body-boost = 1.0
# path-boost = 0.5
# fuzzy-distance = 1
#
# [search.walker]
# hidden-prefix = "."
# supported-extensions = ["md"]
"#;

        std::fs::write(config_path, example_config)?;

        eprintln!("\n已创建配置文件: {:?}", config_path);
        eprintln!("请设置 `notes-root`，然后运行: notes-server index\n");

        Ok(())
    }
}
