// search-core/src/search.rs
//! 搜索模块 - 基于 reader 快照的排序搜索与自动补全

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::TextAnalyzer;
use tantivy::{Searcher, TantivyDocument, Term};

use crate::config::QueryConfig;
use crate::error::IndexError;
use crate::schema::{IndexDocument, SchemaFields, title_from_path};
use crate::tokenizer::{analyze, analyze_terms};

/// 模糊匹配自动机支持的最大编辑距离
const MAX_FUZZY_DISTANCE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    Title,
    Body,
    Path,
}

impl MatchField {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchField::Title => "title",
            MatchField::Body => "body",
            MatchField::Path => "path",
        }
    }
}

impl std::fmt::Display for MatchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 命中在单个字段中的匹配情况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field: MatchField,
    /// 匹配查询词的文档词（去重）
    pub terms: Vec<String>,
    /// 这些匹配在字段中的词位置
    pub positions: Vec<u32>,
    pub snippet: String,
}

/// 搜索结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub path: String,
    /// `path` 的文件名（不含扩展名）
    pub name: String,
    pub score: f32,
    pub matches: Vec<FieldMatch>,
}

/// 去掉两端分隔符；为空表示不限范围
pub fn normalize_scope(scope: Option<&str>) -> Option<String> {
    let trimmed = scope?.trim_matches(|c| c == '/' || c == '\\');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// 查询词允许的编辑距离
pub fn fuzzy_distance(term: &str, config: &QueryConfig) -> u8 {
    if term.chars().count() < config.fuzzy_min_term_len {
        0
    } else {
        config.fuzzy_distance.min(MAX_FUZZY_DISTANCE)
    }
}

/// `term` 与 `candidate` 任意前缀之间的最小 OSA 编辑距离
pub fn prefix_edit_distance(term: &str, candidate: &str) -> usize {
    let a: Vec<char> = term.chars().collect();
    let b: Vec<char> = candidate.chars().collect();
    let (m, n) = (a.len(), b.len());

    let mut d = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        d[0][j] = j;
    }

    for i in 1..=m {
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            d[i][j] = (d[i - 1][j] + 1)
                .min(d[i][j - 1] + 1)
                .min(d[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                d[i][j] = d[i][j].min(d[i - 2][j - 2] + 1);
            }
        }
    }

    d[m].iter().copied().min().unwrap_or(m)
}

/// 文档词是否匹配查询词（精确、前缀或模糊前缀）
fn token_matches(token: &str, term: &str, config: &QueryConfig) -> bool {
    if token.starts_with(term) {
        return true;
    }
    let distance = fuzzy_distance(term, config);
    distance > 0 && prefix_edit_distance(term, token) <= usize::from(distance)
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// 字节区间 `from..to` 周围的上下文，合并空白
pub fn snippet(text: &str, from: usize, to: usize, radius: usize) -> String {
    let start = floor_boundary(text, from.saturating_sub(radius));
    let end = ceil_boundary(text, to.saturating_add(radius));
    let body = text[start..end].split_whitespace().collect::<Vec<_>>().join(" ");

    let mut out = String::with_capacity(body.len() + 6);
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(&body);
    if end < text.len() {
        out.push_str("...");
    }
    out
}

/// 单次查询使用的只读视图
pub(crate) struct QueryEngine<'a> {
    pub searcher: &'a Searcher,
    pub fields: &'a SchemaFields,
    pub analyzer: &'a TextAnalyzer,
    pub config: &'a QueryConfig,
}

impl QueryEngine<'_> {
    fn build_query(&self, terms: &[String]) -> BooleanQuery {
        let boosted = [
            (self.fields.title, self.config.title_boost),
            (self.fields.body, self.config.body_boost),
            (self.fields.path_text, self.config.path_boost),
        ];

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for text in terms {
            let distance = fuzzy_distance(text, self.config);
            for (field, boost) in boosted {
                let term = Term::from_field_text(field, text);
                let exact = TermQuery::new(term.clone(), IndexRecordOption::WithFreqs);
                clauses.push((Occur::Should, Box::new(BoostQuery::new(Box::new(exact), boost))));

                let fuzzy = FuzzyTermQuery::new_prefix(term, distance, true);
                clauses.push((
                    Occur::Should,
                    Box::new(BoostQuery::new(Box::new(fuzzy), boost * self.config.fuzzy_weight)),
                ));
            }
        }
        BooleanQuery::new(clauses)
    }

    fn field_match(&self, field: MatchField, text: &str, terms: &[String]) -> Option<FieldMatch> {
        let mut matched_terms: Vec<String> = Vec::new();
        let mut positions = Vec::new();
        let mut first_span = None;

        for token in analyze(self.analyzer, text) {
            if !terms.iter().any(|term| token_matches(&token.text, term, self.config)) {
                continue;
            }
            first_span.get_or_insert((token.offset_from, token.offset_to));
            positions.push(token.position as u32);
            if !matched_terms.contains(&token.text) {
                matched_terms.push(token.text);
            }
        }

        let (from, to) = first_span?;
        Some(FieldMatch {
            field,
            terms: matched_terms,
            positions,
            snippet: snippet(text, from, to, self.config.snippet_radius),
        })
    }

    fn hydrate(&self, doc: IndexDocument, score: f32, terms: &[String]) -> SearchHit {
        let matches = [
            (MatchField::Title, doc.title.as_str()),
            (MatchField::Body, doc.content.as_str()),
            (MatchField::Path, doc.path.as_str()),
        ]
        .into_iter()
        .filter_map(|(field, text)| self.field_match(field, text, terms))
        .collect();

        SearchHit {
            name: title_from_path(&doc.path),
            path: doc.path,
            score,
            matches,
        }
    }

    pub fn search(&self, query: &str, scope: Option<&str>, limit: usize) -> Result<Vec<SearchHit>, IndexError> {
        let terms = analyze_terms(self.analyzer, query);
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let scope = normalize_scope(scope);

        // 范围过滤在排序之后进行，因此对全部文档排序
        let num_docs = self.searcher.num_docs() as usize;
        let fetch = match scope {
            Some(_) => num_docs,
            None => limit.min(num_docs),
        };
        if fetch == 0 {
            return Ok(Vec::new());
        }

        let query = self.build_query(&terms);
        let top_docs = self.searcher.search(&query, &TopDocs::with_limit(fetch))?;
        tracing::debug!("查询 {:?} 命中 {} 个文档", terms, top_docs.len());

        let mut hits = Vec::new();
        for (score, address) in top_docs {
            let stored: TantivyDocument = self.searcher.doc(address)?;
            let Some(doc) = IndexDocument::from_tantivy(&stored, self.fields) else {
                continue;
            };
            if scope.as_deref().is_some_and(|scope| !doc.path.starts_with(scope)) {
                continue;
            }
            hits.push(self.hydrate(doc, score, &terms));
            if hits.len() >= limit {
                break;
            }
        }
        Ok(hits)
    }

    fn is_live(&self, field: Field, text: &str) -> Result<bool, IndexError> {
        let query = TermQuery::new(Term::from_field_text(field, text), IndexRecordOption::Basic);
        Ok(self.searcher.search(&query, &Count)? > 0)
    }

    pub fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>, IndexError> {
        let Some(stem) = analyze(self.analyzer, prefix).pop().map(|token| token.text) else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut found: BTreeSet<String> = BTreeSet::new();
        for field in [self.fields.title, self.fields.body] {
            for segment_reader in self.searcher.segment_readers() {
                let inverted = segment_reader.inverted_index(field)?;
                let mut stream = inverted
                    .terms()
                    .range()
                    .ge(stem.as_bytes())
                    .into_stream()
                    .map_err(tantivy::TantivyError::from)?;

                while stream.advance() {
                    let Ok(text) = std::str::from_utf8(stream.key()) else {
                        continue;
                    };
                    if !text.starts_with(stem.as_str()) {
                        break;
                    }
                    if found.len() >= limit && found.last().is_some_and(|last| text > last.as_str()) {
                        break;
                    }
                    // 已删除文档的词在段合并前仍留在词典中
                    if !found.contains(text) && self.is_live(field, text)? {
                        found.insert(text.to_string());
                    }
                }
            }
        }

        Ok(found.into_iter().take(limit).collect())
    }
}
