// rpc/src/lib.rs
//! 服务端与客户端之间的 RPC 接口

pub mod search;

use search::{IndexStatus, SearchHit, SearchRequest};

#[tarpc::service]
pub trait NoteSearch {
    /// 心跳检测
    async fn ping() -> String;

    /// 全文排序搜索，可限定文件夹
    async fn search(req: SearchRequest) -> Vec<SearchHit>;

    /// 对未输入完的词进行补全
    async fn suggest(prefix: String, limit: Option<usize>) -> Vec<String>;

    /// 重新读取一篇笔记并替换索引项；被跳过时返回 `false`
    async fn reindex_file(path: String) -> bool;

    /// 从索引中删除一篇笔记；未被索引时返回 `false`
    async fn remove_file(path: String) -> bool;

    /// 立即保存索引快照
    async fn save_index() -> bool;

    /// 索引是否就绪及文档数量
    async fn status() -> IndexStatus;
}
