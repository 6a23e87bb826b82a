#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use news_aggregator::cache::CacheGateway;
use news_aggregator::persist::ArticlePersister;
use news_aggregator::providers::NewsProvider;
use news_aggregator::store::{MemoryStore, NewsStore};
use news_aggregator::types::{ArticleDraft, NewsError, Result};

/// Provider that serves a canned batch of drafts.
pub struct StaticProvider {
    pub name: String,
    pub drafts: Vec<ArticleDraft>,
}

impl StaticProvider {
    pub fn new(name: &str, drafts: Vec<ArticleDraft>) -> Self {
        Self {
            name: name.to_string(),
            drafts,
        }
    }
}

#[async_trait]
impl NewsProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_news(&self) -> Result<Vec<ArticleDraft>> {
        Ok(self.drafts.clone())
    }
}

/// Provider that always fails the way a dead upstream does.
pub struct FailingProvider {
    pub name: String,
}

impl FailingProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl NewsProvider for FailingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_news(&self) -> Result<Vec<ArticleDraft>> {
        Err(NewsError::Provider {
            provider: self.name.clone(),
            message: "API request failed with status 500".to_string(),
            status: Some(500),
        })
    }
}

pub fn draft(external_id: &str, title: &str, source: &str, category: &str, author: &str) -> ArticleDraft {
    ArticleDraft {
        external_id: external_id.to_string(),
        title: title.to_string(),
        description: format!("{title} description"),
        content: format!("{title} content"),
        url: format!("https://example.com/{external_id}"),
        image_url: None,
        published_at: Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
        source_name: source.to_string(),
        category_name: category.to_string(),
        author_name: author.to_string(),
    }
}

pub struct TestStore {
    pub store: Arc<MemoryStore>,
    pub dyn_store: Arc<dyn NewsStore>,
    pub cache: Arc<CacheGateway>,
}

pub fn test_store() -> TestStore {
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn NewsStore> = store.clone();
    let cache = Arc::new(CacheGateway::in_memory());

    TestStore {
        store,
        dyn_store,
        cache,
    }
}

pub fn persister(ctx: &TestStore) -> ArticlePersister {
    ArticlePersister::new(ctx.dyn_store.clone(), ctx.cache.clone())
}
