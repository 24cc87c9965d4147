// search-core/src/tokenizer.rs
//! 分词模块 - 索引、查询与匹配定位共用

use serde::{Deserialize, Serialize};
use tantivy::Index;
use tantivy::tokenizer::{
    AsciiFoldingFilter, LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer, TokenStream,
};
use tantivy_jieba::JiebaTokenizer;

/// 分词器在索引上的注册名
pub const ANALYZER_NAME: &str = "notes";

/// 超过此长度（字节）的词被丢弃
const MAX_TOKEN_LEN: usize = 40;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// 按 Unicode 词边界切分，转小写并做 ASCII 折叠
    #[default]
    Simple,
    /// Jieba 中文分词，转小写
    Jieba,
}

impl TokenizerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenizerKind::Simple => "simple",
            TokenizerKind::Jieba => "jieba",
        }
    }

    pub fn build(self) -> TextAnalyzer {
        match self {
            TokenizerKind::Simple => TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
                .filter(LowerCaser)
                .filter(AsciiFoldingFilter)
                .build(),
            TokenizerKind::Jieba => TextAnalyzer::builder(JiebaTokenizer {})
                .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
                .filter(LowerCaser)
                .build(),
        }
    }

    /// 在 `index` 上注册分词器并返回其句柄
    pub fn register(self, index: &Index) -> TextAnalyzer {
        let analyzer = self.build();
        index.tokenizers().register(ANALYZER_NAME, analyzer.clone());
        analyzer
    }
}

impl std::fmt::Display for TokenizerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分词结果，附带在原文中的字节区间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedToken {
    pub text: String,
    pub position: usize,
    pub offset_from: usize,
    pub offset_to: usize,
}

/// 使用 `analyzer` 对 `text` 分词
pub fn analyze(analyzer: &TextAnalyzer, text: &str) -> Vec<AnalyzedToken> {
    let mut analyzer = analyzer.clone();
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while let Some(token) = stream.next() {
        if token.text.is_empty() {
            continue;
        }
        tokens.push(AnalyzedToken {
            text: token.text.clone(),
            position: token.position,
            offset_from: token.offset_from,
            offset_to: token.offset_to,
        });
    }
    tokens
}

/// `text` 中去重后的词，按首次出现顺序
pub fn analyze_terms(analyzer: &TextAnalyzer, text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in analyze(analyzer, text) {
        if !terms.contains(&token.text) {
            terms.push(token.text);
        }
    }
    terms
}
