use crate::db::queries;
use crate::models::TagTable;
use dashmap::DashMap;
use futures::future::join_all;
use sqlx::PgPool;
use std::fmt::Display;

/// 每次查询的物料编码上限
const LOOKUP_CHUNK: usize = 1000;

/// 一次标签解析的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagResolution {
    pub tags: TagTable,
    /// 查询失败、按无标签处理的物料编码
    pub unresolved: Vec<String>,
}

impl TagResolution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// 标签缓存内容 (不涉及数据库)
///
/// 以物料编码为键，只增不减。`None` 表示已确认无标签 (含物料不存在)。
#[derive(Debug, Default)]
pub struct TagStore {
    entries: DashMap<String, Option<String>>,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 尚未缓存的物料编码 (保序)
    pub fn missing<'a>(&self, item_codes: &[&'a str]) -> Vec<&'a str> {
        item_codes
            .iter()
            .copied()
            .filter(|code| !self.entries.contains_key(*code))
            .collect()
    }

    /// 合并一次批量查询结果。
    /// 成功时，查询过但没有返回行的物料记为无标签；失败时什么都不缓存，返回这些编码。
    pub fn merge<E: Display>(
        &self,
        requested: &[&str],
        result: Result<Vec<(String, Option<String>)>, E>,
    ) -> Vec<String> {
        match result {
            Ok(rows) => {
                for (code, tag) in rows {
                    self.entries.insert(code, tag.filter(|t| !t.is_empty()));
                }
                for code in requested {
                    if !self.entries.contains_key(*code) {
                        self.entries.insert(code.to_string(), None);
                    }
                }
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(
                    "{} 个物料标签查询失败, 按无标签处理且不缓存: {}",
                    requested.len(), e
                );
                requested.iter().map(|c| c.to_string()).collect()
            }
        }
    }

    /// 从缓存组装标签表，只包含有标签的物料
    pub fn table(&self, item_codes: &[&str]) -> TagTable {
        item_codes
            .iter()
            .filter_map(|code| {
                let entry = self.entries.get(*code)?;
                let tag = entry.value().clone()?;
                Some((code.to_string(), tag))
            })
            .collect()
    }
}

/// 物料标签缓存，缺失的编码按块批量查询 (各块并发)
pub struct TagCache {
    pool: PgPool,
    store: TagStore,
}

impl TagCache {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            store: TagStore::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub async fn resolve_all(&self, item_codes: &[&str]) -> TagResolution {
        let missing = self.store.missing(item_codes);
        let mut unresolved = Vec::new();

        if !missing.is_empty() {
            tracing::debug!("查询 {} 个物料标签 (缓存 {} 条)", missing.len(), self.store.len());
            let lookups = missing.chunks(LOOKUP_CHUNK).map(|chunk| async move {
                (chunk, queries::get_item_tags(&self.pool, chunk).await)
            });
            for (chunk, result) in join_all(lookups).await {
                unresolved.extend(self.store.merge(chunk, result));
            }
        }

        TagResolution {
            tags: self.store.table(item_codes),
            unresolved,
        }
    }
}
