use std::sync::Arc;

use tracing::debug;

use crate::cache::CacheGateway;
use crate::query::{filter_hash, QueryEngine};
use crate::store::NewsStore;
use crate::types::{Article, ArticleFilter, Page, PreferenceData, Result, UserPreference};
use crate::utils::md5_hex;

/// Builds personalized feeds by overlaying a user's stored preference
/// lists onto an incoming filter before querying.
pub struct PersonalizationComposer {
    store: Arc<dyn NewsStore>,
    query: QueryEngine,
    cache: Arc<CacheGateway>,
}

impl PersonalizationComposer {
    pub fn new(store: Arc<dyn NewsStore>, query: QueryEngine, cache: Arc<CacheGateway>) -> Self {
        Self {
            store,
            query,
            cache,
        }
    }

    /// Returns the user's feed. Users without stored preferences (or with
    /// empty preference lists) transparently get the unpersonalized
    /// listing for the same filter.
    ///
    /// Stored lists replace the request's own category/source/author
    /// filters outright; a preference record with only categories set also
    /// clears any requested sources and authors.
    pub async fn personalized_feed(
        &self,
        user_id: i64,
        filter: &ArticleFilter,
    ) -> Result<Page<Article>> {
        let preference = self.store.get_preferences(user_id).await?;

        let Some(preference) = preference else {
            return self.query.paginate(filter).await;
        };
        if !preference.preferences.has_feed_preferences() {
            debug!(user_id, "no feed preferences stored, serving base listing");
            return self.query.paginate(filter).await;
        }

        let mut effective = filter.clone();
        effective.categories = preference.preferences.categories.clone();
        effective.sources = preference.preferences.sources.clone();
        effective.authors = preference.preferences.authors.clone();

        // Keyed by user and the effective filter, so one user's feed can
        // never be served to another.
        let key = format!(
            "personalized_feed:{}",
            md5_hex(&format!("{user_id}:{}", filter_hash(&effective)))
        );
        let store = self.store.clone();

        self.cache
            .remember(&key, None, || async move {
                store.query_articles(&effective).await
            })
            .await
    }
}

/// Stored-preference access for the profile surface: reads fall back to a
/// default profile, writes upsert the user's single record.
pub struct PreferencesService {
    store: Arc<dyn NewsStore>,
}

impl PreferencesService {
    pub fn new(store: Arc<dyn NewsStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, user_id: i64) -> Result<PreferenceData> {
        match self.store.get_preferences(user_id).await? {
            Some(preference) => Ok(preference.preferences.with_defaults()),
            None => Ok(PreferenceData::default_profile()),
        }
    }

    pub async fn update(&self, user_id: i64, data: PreferenceData) -> Result<UserPreference> {
        self.store.upsert_preferences(user_id, data).await
    }
}
