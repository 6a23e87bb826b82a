use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{NewArticle, NewsStore};
use crate::types::{
    Article, ArticleFilter, Page, PreferenceData, Result, SortDirection, SortField,
    TaxonomyEntity, TaxonomyKind, TaxonomySummary, UserPreference,
};

#[derive(Debug, Clone)]
struct ArticleRow {
    id: i64,
    external_id: String,
    title: String,
    description: String,
    content: String,
    url: String,
    image_url: Option<String>,
    published_at: Option<DateTime<Utc>>,
    category_id: i64,
    source_id: i64,
    author_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    next_article_id: i64,
    next_entity_id: i64,
    articles: Vec<ArticleRow>,
    entities: HashMap<TaxonomyKind, Vec<TaxonomyEntity>>,
    related: HashMap<i64, Vec<i64>>,
    preferences: HashMap<i64, UserPreference>,
}

/// In-process [`NewsStore`] with the same query semantics as the Postgres
/// backend. Used by the test suite and for running the pipeline without a
/// database.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates two stored articles for the related-articles detail
    /// view. Relations are created out of band of ingestion.
    pub async fn link_related(&self, article_id: i64, related_id: i64) {
        let mut inner = self.inner.write().await;
        inner.related.entry(article_id).or_default().push(related_id);
    }
}

impl Inner {
    fn entity(&self, kind: TaxonomyKind, id: i64) -> Option<&TaxonomyEntity> {
        self.entities
            .get(&kind)
            .and_then(|entities| entities.iter().find(|entity| entity.id == id))
    }

    fn assemble(&self, row: &ArticleRow) -> Option<Article> {
        Some(Article {
            id: row.id,
            external_id: row.external_id.clone(),
            title: row.title.clone(),
            description: row.description.clone(),
            content: row.content.clone(),
            url: row.url.clone(),
            image_url: row.image_url.clone(),
            published_at: row.published_at,
            category: self.entity(TaxonomyKind::Category, row.category_id)?.clone(),
            source: self.entity(TaxonomyKind::Source, row.source_id)?.clone(),
            author: self.entity(TaxonomyKind::Author, row.author_id)?.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn matches(&self, row: &ArticleRow, filter: &ArticleFilter) -> bool {
        if let Some(q) = &filter.q {
            let needle = q.to_lowercase();
            let haystack = [&row.title, &row.description, &row.content];
            if !haystack
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            {
                return false;
            }
        }

        let label_match = |kind: TaxonomyKind, id: i64, labels: &[String]| {
            if labels.is_empty() {
                return true;
            }
            self.entity(kind, id)
                .map(|entity| {
                    labels
                        .iter()
                        .any(|label| *label == entity.slug || *label == entity.name)
                })
                .unwrap_or(false)
        };

        if !label_match(TaxonomyKind::Category, row.category_id, &filter.categories) {
            return false;
        }
        if !label_match(TaxonomyKind::Source, row.source_id, &filter.sources) {
            return false;
        }
        if !label_match(TaxonomyKind::Author, row.author_id, &filter.authors) {
            return false;
        }

        if filter.date_from.is_some() || filter.date_to.is_some() {
            let Some(published) = row.published_at else {
                return false;
            };
            let date = published.date_naive();
            if let Some(from) = filter.date_from {
                if date < from {
                    return false;
                }
            }
            if let Some(to) = filter.date_to {
                if date > to {
                    return false;
                }
            }
        }

        true
    }
}

#[async_trait]
impl NewsStore for MemoryStore {
    async fn article_exists(&self, external_id: &str) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .articles
            .iter()
            .any(|row| row.external_id == external_id))
    }

    async fn resolve_entity(
        &self,
        kind: TaxonomyKind,
        name: &str,
        slug: &str,
    ) -> Result<TaxonomyEntity> {
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner
            .entities
            .get(&kind)
            .and_then(|entities| entities.iter().find(|entity| entity.slug == slug))
        {
            return Ok(existing.clone());
        }

        inner.next_entity_id += 1;
        let now = Utc::now();
        let entity = TaxonomyEntity {
            id: inner.next_entity_id,
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: now,
            updated_at: now,
        };
        inner.entities.entry(kind).or_default().push(entity.clone());

        Ok(entity)
    }

    async fn insert_article(&self, article: NewArticle) -> Result<Option<Article>> {
        let mut inner = self.inner.write().await;

        if inner
            .articles
            .iter()
            .any(|row| row.external_id == article.external_id)
        {
            return Ok(None);
        }

        inner.next_article_id += 1;
        let now = Utc::now();
        let row = ArticleRow {
            id: inner.next_article_id,
            external_id: article.external_id,
            title: article.title,
            description: article.description,
            content: article.content,
            url: article.url,
            image_url: article.image_url,
            published_at: article.published_at,
            category_id: article.category_id,
            source_id: article.source_id,
            author_id: article.author_id,
            created_at: now,
            updated_at: now,
        };
        let assembled = inner.assemble(&row);
        inner.articles.push(row);

        Ok(assembled)
    }

    async fn query_articles(&self, filter: &ArticleFilter) -> Result<Page<Article>> {
        let inner = self.inner.read().await;

        let mut matched: Vec<&ArticleRow> = inner
            .articles
            .iter()
            .filter(|row| inner.matches(row, filter))
            .collect();

        matched.sort_by(|a, b| {
            let ordering = match filter.sort_field {
                SortField::Title => a.title.cmp(&b.title),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                // Unknown publish dates sort last regardless of direction,
                // matching the SQL backend's NULLS LAST.
                SortField::PublishedAt => match (a.published_at, b.published_at) {
                    (Some(a), Some(b)) => a.cmp(&b),
                    (None, Some(_)) => return std::cmp::Ordering::Greater,
                    (Some(_), None) => return std::cmp::Ordering::Less,
                    (None, None) => std::cmp::Ordering::Equal,
                },
            };
            match filter.sort_direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total = matched.len() as u64;
        let offset = (filter.page as usize - 1) * filter.per_page as usize;
        let items: Vec<Article> = matched
            .into_iter()
            .skip(offset)
            .take(filter.per_page as usize)
            .filter_map(|row| inner.assemble(row))
            .collect();

        Ok(Page::new(items, total, filter.page, filter.per_page))
    }

    async fn find_article(&self, id: i64) -> Result<Option<Article>> {
        let inner = self.inner.read().await;
        Ok(inner
            .articles
            .iter()
            .find(|row| row.id == id)
            .and_then(|row| inner.assemble(row)))
    }

    async fn related_articles(&self, id: i64, limit: usize) -> Result<Vec<Article>> {
        let inner = self.inner.read().await;

        let related_ids = inner.related.get(&id).cloned().unwrap_or_default();
        let related = related_ids
            .into_iter()
            .take(limit)
            .filter_map(|related_id| {
                inner
                    .articles
                    .iter()
                    .find(|row| row.id == related_id)
                    .and_then(|row| inner.assemble(row))
            })
            .collect();

        Ok(related)
    }

    async fn list_entities(
        &self,
        kind: TaxonomyKind,
        search: Option<&str>,
        limit: usize,
    ) -> Result<Vec<TaxonomySummary>> {
        let inner = self.inner.read().await;

        let count_for = |entity_id: i64| {
            inner
                .articles
                .iter()
                .filter(|row| match kind {
                    TaxonomyKind::Category => row.category_id == entity_id,
                    TaxonomyKind::Source => row.source_id == entity_id,
                    TaxonomyKind::Author => row.author_id == entity_id,
                })
                .count() as u64
        };

        let mut entities: Vec<&TaxonomyEntity> = inner
            .entities
            .get(&kind)
            .map(|entities| entities.iter().collect())
            .unwrap_or_default();

        if let Some(search) = search {
            let needle = search.to_lowercase();
            entities.retain(|entity| entity.name.to_lowercase().contains(&needle));
        }

        entities.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(entities
            .into_iter()
            .take(limit)
            .map(|entity| TaxonomySummary {
                name: entity.name.clone(),
                slug: entity.slug.clone(),
                count: count_for(entity.id),
            })
            .collect())
    }

    async fn get_preferences(&self, user_id: i64) -> Result<Option<UserPreference>> {
        let inner = self.inner.read().await;
        Ok(inner.preferences.get(&user_id).cloned())
    }

    async fn upsert_preferences(
        &self,
        user_id: i64,
        data: PreferenceData,
    ) -> Result<UserPreference> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        let preference = match inner.preferences.get_mut(&user_id) {
            Some(existing) => {
                existing.preferences = data;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let preference = UserPreference {
                    user_id,
                    preferences: data,
                    created_at: now,
                    updated_at: now,
                };
                inner.preferences.insert(user_id, preference.clone());
                preference
            }
        };

        Ok(preference)
    }
}
