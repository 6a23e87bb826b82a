use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::CacheGateway;
use crate::store::{NewArticle, NewsStore};
use crate::types::{ArticleDraft, Result, TaxonomyKind};
use crate::utils::slugify;

/// Writes provider drafts into the store, deduplicating by external id and
/// resolving taxonomy labels to entity rows on the way in. The sole writer
/// of article and taxonomy data.
pub struct ArticlePersister {
    store: Arc<dyn NewsStore>,
    cache: Arc<CacheGateway>,
}

impl ArticlePersister {
    pub fn new(store: Arc<dyn NewsStore>, cache: Arc<CacheGateway>) -> Self {
        Self { store, cache }
    }

    /// Saves a batch of drafts and returns the number of newly inserted
    /// articles. A failing record is logged and skipped; it never takes
    /// the rest of the batch down with it.
    pub async fn save(&self, drafts: &[ArticleDraft]) -> Result<usize> {
        let mut saved = 0usize;

        for draft in drafts {
            match self.save_one(draft).await {
                Ok(true) => saved += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        external_id = %draft.external_id,
                        title = %draft.title,
                        error = %e,
                        "failed to save article"
                    );
                }
            }
        }

        if saved > 0 {
            self.invalidate_read_caches().await;
        }

        info!(saved, fetched = drafts.len(), "persisted article batch");
        Ok(saved)
    }

    async fn save_one(&self, draft: &ArticleDraft) -> Result<bool> {
        if self.store.article_exists(&draft.external_id).await? {
            return Ok(false);
        }

        let category = self
            .store
            .resolve_entity(
                TaxonomyKind::Category,
                &draft.category_name,
                &slugify(&draft.category_name),
            )
            .await?;
        let source = self
            .store
            .resolve_entity(
                TaxonomyKind::Source,
                &draft.source_name,
                &slugify(&draft.source_name),
            )
            .await?;
        let author = self
            .store
            .resolve_entity(
                TaxonomyKind::Author,
                &draft.author_name,
                &slugify(&draft.author_name),
            )
            .await?;

        let inserted = self
            .store
            .insert_article(NewArticle {
                external_id: draft.external_id.clone(),
                title: draft.title.clone(),
                description: draft.description.clone(),
                content: draft.content.clone(),
                url: draft.url.clone(),
                image_url: draft.image_url.clone(),
                published_at: draft.published_at,
                category_id: category.id,
                source_id: source.id,
                author_id: author.id,
            })
            .await?;

        Ok(inserted.is_some())
    }

    /// New articles change taxonomy counts and every listing, so the
    /// taxonomy keys are dropped and the listing/feed prefixes purged.
    async fn invalidate_read_caches(&self) {
        for key in ["categories", "sources", "authors", "filter_options"] {
            self.cache.forget(key).await;
        }

        self.cache.forget_by_prefix("personalized_feed:").await;
        self.cache.forget_by_prefix("articles:").await;

        info!("cache cleared after saving new articles");
    }
}
