use std::sync::Arc;

use crate::cache::CacheGateway;
use crate::store::NewsStore;
use crate::types::{FilterOptions, Result, TaxonomyKind, TaxonomySummary};

/// Listings show the first N entities ordered by name, mirroring the
/// filter dropdowns they feed.
const LISTING_LIMIT: usize = 10;

/// Cached category/source/author listings with article counts.
pub struct TaxonomyService {
    store: Arc<dyn NewsStore>,
    cache: Arc<CacheGateway>,
}

impl TaxonomyService {
    pub fn new(store: Arc<dyn NewsStore>, cache: Arc<CacheGateway>) -> Self {
        Self { store, cache }
    }

    pub async fn categories(&self, search: Option<&str>) -> Result<Vec<TaxonomySummary>> {
        self.listing(TaxonomyKind::Category, "categories", search).await
    }

    pub async fn sources(&self, search: Option<&str>) -> Result<Vec<TaxonomySummary>> {
        self.listing(TaxonomyKind::Source, "sources", search).await
    }

    pub async fn authors(&self, search: Option<&str>) -> Result<Vec<TaxonomySummary>> {
        self.listing(TaxonomyKind::Author, "authors", search).await
    }

    pub async fn filter_options(&self, search: Option<&str>) -> Result<FilterOptions> {
        let key = cache_key("filter_options", search);

        self.cache
            .remember(&key, None, || async move {
                Ok(FilterOptions {
                    categories: self.categories(search).await?,
                    sources: self.sources(search).await?,
                    authors: self.authors(search).await?,
                })
            })
            .await
    }

    async fn listing(
        &self,
        kind: TaxonomyKind,
        key_base: &str,
        search: Option<&str>,
    ) -> Result<Vec<TaxonomySummary>> {
        let key = cache_key(key_base, search);
        let store = self.store.clone();
        let search = search.map(str::to_string);

        self.cache
            .remember(&key, None, || async move {
                store
                    .list_entities(kind, search.as_deref(), LISTING_LIMIT)
                    .await
            })
            .await
    }
}

fn cache_key(base: &str, search: Option<&str>) -> String {
    match search {
        Some(query) => format!("{base}_search_{query}"),
        None => base.to_string(),
    }
}
