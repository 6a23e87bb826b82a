use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{
    Article, ArticleFilter, Page, PreferenceData, Result, TaxonomyEntity, TaxonomyKind,
    TaxonomySummary, UserPreference,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Column values for an article whose taxonomy labels have been resolved
/// to entity rows.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub category_id: i64,
    pub source_id: i64,
    pub author_id: i64,
}

/// Repository boundary over the relational store.
///
/// The persister is the only writer of articles and taxonomy rows; the
/// read side goes through `query_articles` and the lookup methods. Both
/// uniqueness invariants the core relies on (article `external_id`,
/// taxonomy `slug`) are enforced here.
#[async_trait]
pub trait NewsStore: Send + Sync {
    async fn article_exists(&self, external_id: &str) -> Result<bool>;

    /// Get-or-create by slug. The slug is the idempotent join key: two
    /// drafts naming the same entity resolve to the same row.
    async fn resolve_entity(
        &self,
        kind: TaxonomyKind,
        name: &str,
        slug: &str,
    ) -> Result<TaxonomyEntity>;

    /// Inserts an article, returning `None` when the external id is
    /// already present.
    async fn insert_article(&self, article: NewArticle) -> Result<Option<Article>>;

    async fn query_articles(&self, filter: &ArticleFilter) -> Result<Page<Article>>;

    async fn find_article(&self, id: i64) -> Result<Option<Article>>;

    async fn related_articles(&self, id: i64, limit: usize) -> Result<Vec<Article>>;

    /// Name-ordered listing with per-entity article counts, optionally
    /// narrowed by a name substring.
    async fn list_entities(
        &self,
        kind: TaxonomyKind,
        search: Option<&str>,
        limit: usize,
    ) -> Result<Vec<TaxonomySummary>>;

    async fn get_preferences(&self, user_id: i64) -> Result<Option<UserPreference>>;

    async fn upsert_preferences(
        &self,
        user_id: i64,
        data: PreferenceData,
    ) -> Result<UserPreference>;
}
