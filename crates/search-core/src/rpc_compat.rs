// search-core/src/rpc_compat.rs
//! RPC 适配层 - 在 `rpc` 类型与核心类型之间转换

use rpc::search::{
    FieldMatch as RpcFieldMatch, IndexStatus, SearchHit as RpcSearchHit, SearchRequest as RpcSearchRequest,
};

use crate::index::NoteIndex;
use crate::search::{FieldMatch, SearchHit};

impl From<FieldMatch> for RpcFieldMatch {
    fn from(m: FieldMatch) -> Self {
        Self {
            field: m.field.to_string(),
            terms: m.terms,
            positions: m.positions,
            snippet: m.snippet,
        }
    }
}

impl From<SearchHit> for RpcSearchHit {
    fn from(hit: SearchHit) -> Self {
        Self {
            path: hit.path,
            name: hit.name,
            score: hit.score,
            matches: hit.matches.into_iter().map(Into::into).collect(),
        }
    }
}

/// 在 `index` 上执行 RPC 搜索请求
pub fn handle_search(index: &NoteIndex, req: &RpcSearchRequest) -> Vec<RpcSearchHit> {
    tracing::info!("搜索 {:?} scope={:?} limit={:?}", req.query, req.scope, req.limit);
    let hits = match req.limit {
        Some(limit) => index.search(&req.query, req.scope.as_deref(), limit),
        None => index.search_default(&req.query, req.scope.as_deref()),
    };
    hits.into_iter().map(Into::into).collect()
}

pub fn handle_suggest(index: &NoteIndex, prefix: &str, limit: Option<usize>) -> Vec<String> {
    match limit {
        Some(limit) => index.get_suggestions(prefix, limit),
        None => index.suggestions_default(prefix),
    }
}

pub async fn status(index: &NoteIndex) -> IndexStatus {
    IndexStatus {
        ready: index.is_ready(),
        documents: index.document_count().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::search::MatchField;
    use crate::store::FsDocumentStore;
    use std::sync::Arc;

    #[test]
    fn hit_conversion_keeps_match_details() {
        let hit = SearchHit {
            path: "b/c.md".into(),
            name: "c".into(),
            score: 1.5,
            matches: vec![FieldMatch {
                field: MatchField::Body,
                terms: vec!["roadmap".into()],
                positions: vec![0],
                snippet: "roadmap changes for Q3".into(),
            }],
        };
        let wire: RpcSearchHit = hit.into();
        assert_eq!(wire.path, "b/c.md");
        assert_eq!(wire.matches[0].field, "body");
        assert_eq!(wire.matches[0].positions, vec![0]);
    }

    #[tokio::test]
    async fn missing_limits_fall_back_to_configured_defaults() {
        let notes = tempfile::tempdir().unwrap();
        for i in 0..3 {
            std::fs::write(notes.path().join(format!("road{i}.md")), format!("roadmap r{i}x")).unwrap();
        }
        let mut config = SearchConfig::default();
        config.query.default_limit = 2;
        config.query.suggestion_limit = 1;
        let store = Arc::new(FsDocumentStore::new(notes.path(), config.walker.clone()));
        let index = NoteIndex::new(config, store).unwrap();
        index.build_index().await;

        let req = RpcSearchRequest { query: "roadmap".into(), scope: None, limit: None };
        assert_eq!(handle_search(&index, &req).len(), 2);
        let req = RpcSearchRequest { limit: Some(usize::MAX), ..req };
        assert_eq!(handle_search(&index, &req).len(), 3);

        assert_eq!(handle_suggest(&index, "r", None).len(), 1);
        assert_eq!(handle_suggest(&index, "r", Some(10)), vec!["r0x", "r1x", "r2x", "road0", "road1", "road2", "roadmap"]);
        assert_eq!(status(&index).await, IndexStatus { ready: true, documents: 3 });
    }
}
