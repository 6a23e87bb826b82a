mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use news_aggregator::cache::{CacheGateway, CacheStore, MemoryCacheStore, PrefixDelete};
use news_aggregator::query::QueryEngine;
use news_aggregator::store::{NewArticle, NewsStore};
use news_aggregator::types::{ArticleFilter, TaxonomyKind};

use common::{draft, persister, test_store};

#[tokio::test]
async fn forget_by_prefix_only_touches_matching_keys() {
    let store = Arc::new(MemoryCacheStore::new());
    let gateway = CacheGateway::new(store.clone());

    let _: u32 = gateway
        .remember("articles:listing:a", None, || async { Ok(1) })
        .await
        .unwrap();
    let _: u32 = gateway
        .remember("articles:single:1", None, || async { Ok(2) })
        .await
        .unwrap();
    let _: u32 = gateway
        .remember("categories", None, || async { Ok(3) })
        .await
        .unwrap();

    gateway.forget_by_prefix("articles:").await;

    // Listing keys recompute, the taxonomy key survives.
    let listing: u32 = gateway
        .remember("articles:listing:a", None, || async { Ok(10) })
        .await
        .unwrap();
    assert_eq!(listing, 10);

    let categories: u32 = gateway
        .remember("categories", None, || async { Ok(30) })
        .await
        .unwrap();
    assert_eq!(categories, 3);
}

/// A backend that can only flush wholesale, like a plain file cache.
#[derive(Default)]
struct FlushOnlyStore {
    entries: RwLock<std::collections::HashMap<String, Value>>,
}

#[async_trait]
impl CacheStore for FlushOnlyStore {
    async fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: Value, _ttl: Duration) {
        self.entries.write().await.insert(key.to_string(), value);
    }

    async fn delete(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    async fn delete_by_prefix(&self, _prefix: &str) -> PrefixDelete {
        PrefixDelete::Unsupported
    }

    async fn flush(&self) {
        self.entries.write().await.clear();
    }
}

#[tokio::test]
async fn degraded_backend_falls_back_to_full_flush() {
    let gateway = CacheGateway::new(Arc::new(FlushOnlyStore::default()));

    let _: u32 = gateway
        .remember("articles:listing:a", None, || async { Ok(1) })
        .await
        .unwrap();
    let _: u32 = gateway
        .remember("categories", None, || async { Ok(2) })
        .await
        .unwrap();

    gateway.forget_by_prefix("articles:").await;

    // Correctness over hit rate: everything went, including the
    // unrelated taxonomy key.
    let listing: u32 = gateway
        .remember("articles:listing:a", None, || async { Ok(10) })
        .await
        .unwrap();
    let categories: u32 = gateway
        .remember("categories", None, || async { Ok(20) })
        .await
        .unwrap();
    assert_eq!(listing, 10);
    assert_eq!(categories, 20);
}

#[tokio::test]
async fn successful_save_invalidates_cached_listings() {
    let ctx = test_store();
    let engine = QueryEngine::new(ctx.dyn_store.clone(), ctx.cache.clone());

    // Prime the listing cache on an empty store.
    let empty = engine.paginate(&ArticleFilter::default()).await.unwrap();
    assert_eq!(empty.total, 0);

    let saved = persister(&ctx)
        .save(&[draft("c_1", "Fresh", "BBC", "Tech", "X")])
        .await
        .unwrap();
    assert_eq!(saved, 1);

    // The previously cached key misses and recomputes.
    let page = engine.paginate(&ArticleFilter::default()).await.unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn zero_save_batches_do_not_invalidate() {
    let ctx = test_store();
    let engine = QueryEngine::new(ctx.dyn_store.clone(), ctx.cache.clone());
    let persister = persister(&ctx);

    let batch = vec![draft("c_1", "Fresh", "BBC", "Tech", "X")];
    persister.save(&batch).await.unwrap();

    let page = engine.paginate(&ArticleFilter::default()).await.unwrap();
    assert_eq!(page.total, 1);

    // Write behind the persister's back so the cached listing goes stale
    // without any invalidation having fired.
    let category = ctx
        .dyn_store
        .resolve_entity(TaxonomyKind::Category, "Tech", "tech")
        .await
        .unwrap();
    let source = ctx
        .dyn_store
        .resolve_entity(TaxonomyKind::Source, "BBC", "bbc")
        .await
        .unwrap();
    let author = ctx
        .dyn_store
        .resolve_entity(TaxonomyKind::Author, "X", "x")
        .await
        .unwrap();
    ctx.dyn_store
        .insert_article(NewArticle {
            external_id: "c_2".to_string(),
            title: "Sneaky".to_string(),
            description: String::new(),
            content: String::new(),
            url: "https://example.com/c_2".to_string(),
            image_url: None,
            published_at: None,
            category_id: category.id,
            source_id: source.id,
            author_id: author.id,
        })
        .await
        .unwrap();

    // An all-duplicates batch saves nothing, so the stale page survives.
    assert_eq!(persister.save(&batch).await.unwrap(), 0);
    let cached = engine.paginate(&ArticleFilter::default()).await.unwrap();
    assert_eq!(cached.total, 1);

    // A batch that does save invalidates, and both writes become visible.
    assert_eq!(
        persister
            .save(&[draft("c_3", "Newest", "BBC", "Tech", "X")])
            .await
            .unwrap(),
        1
    );
    let fresh = engine.paginate(&ArticleFilter::default()).await.unwrap();
    assert_eq!(fresh.total, 3);
}
