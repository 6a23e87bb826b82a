use std::sync::Arc;

use crate::cache::CacheGateway;
use crate::store::NewsStore;
use crate::types::{Article, ArticleFilter, ArticleWithRelated, Page, Result};
use crate::utils::md5_hex;

/// Detail views surface at most this many related articles.
const RELATED_LIMIT: usize = 3;

/// Read side of the article store: filtered listings and cached single
/// lookups. Listing cache keys are derived from the full normalized
/// filter, so every distinct filter combination caches separately.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn NewsStore>,
    cache: Arc<CacheGateway>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn NewsStore>, cache: Arc<CacheGateway>) -> Self {
        Self { store, cache }
    }

    pub async fn paginate(&self, filter: &ArticleFilter) -> Result<Page<Article>> {
        let key = format!("articles:listing:{}", filter_hash(filter));
        let store = self.store.clone();
        let filter = filter.clone();

        self.cache
            .remember(&key, None, || async move {
                store.query_articles(&filter).await
            })
            .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Article>> {
        let key = format!("articles:single:{id}");
        let store = self.store.clone();

        self.cache
            .remember(&key, None, || async move { store.find_article(id).await })
            .await
    }

    pub async fn find_by_id_with_related(&self, id: i64) -> Result<Option<ArticleWithRelated>> {
        let key = format!("articles:with_related:{id}");
        let store = self.store.clone();

        self.cache
            .remember(&key, None, || async move {
                let Some(article) = store.find_article(id).await? else {
                    return Ok(None);
                };
                let related = store.related_articles(id, RELATED_LIMIT).await?;

                Ok(Some(ArticleWithRelated { article, related }))
            })
            .await
    }
}

/// Deterministic digest of every filter field, for listing cache keys.
pub(crate) fn filter_hash(filter: &ArticleFilter) -> String {
    md5_hex(&serde_json::to_string(filter).unwrap_or_default())
}
