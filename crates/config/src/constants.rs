// config/src/constants.rs
//! 服务端与客户端共用的名称常量

pub const TOP_LEVEL_DOMAIN: &str = "org";
pub const AUTHOR: &str = "notes";
pub const APP_NAME: &str = "notes-server";

pub const SERVER_CONFIG_FILE_NAME: &str = "server.toml";
pub const UNIX_SOCKET_FILE_NAME: &str = "notes-server.sock";
pub const SNAPSHOT_FILE_NAME: &str = "search-index.json";
