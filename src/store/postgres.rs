use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use super::{NewArticle, NewsStore};
use crate::types::{
    Article, ArticleFilter, Page, PreferenceData, Result, SortDirection, SortField,
    TaxonomyEntity, TaxonomyKind, TaxonomySummary, UserPreference,
};

const ARTICLE_SELECT: &str = "SELECT a.id, a.external_id, a.title, a.description, a.content, \
     a.url, a.image_url, a.published_at, a.created_at, a.updated_at, \
     c.id AS category_id, c.name AS category_name, c.slug AS category_slug, \
     c.created_at AS category_created_at, c.updated_at AS category_updated_at, \
     s.id AS source_id, s.name AS source_name, s.slug AS source_slug, \
     s.created_at AS source_created_at, s.updated_at AS source_updated_at, \
     au.id AS author_id, au.name AS author_name, au.slug AS author_slug, \
     au.created_at AS author_created_at, au.updated_at AS author_updated_at \
     FROM articles a \
     JOIN categories c ON c.id = a.category_id \
     JOIN sources s ON s.id = a.source_id \
     JOIN authors au ON au.id = a.author_id";

fn taxonomy_table(kind: TaxonomyKind) -> (&'static str, &'static str) {
    match kind {
        TaxonomyKind::Category => ("categories", "category_id"),
        TaxonomyKind::Source => ("sources", "source_id"),
        TaxonomyKind::Author => ("authors", "author_id"),
    }
}

fn entity_from_row(row: &PgRow, prefix: &str) -> Result<TaxonomyEntity> {
    Ok(TaxonomyEntity {
        id: row.try_get(format!("{prefix}_id").as_str())?,
        name: row.try_get(format!("{prefix}_name").as_str())?,
        slug: row.try_get(format!("{prefix}_slug").as_str())?,
        created_at: row.try_get(format!("{prefix}_created_at").as_str())?,
        updated_at: row.try_get(format!("{prefix}_updated_at").as_str())?,
    })
}

fn article_from_row(row: &PgRow) -> Result<Article> {
    Ok(Article {
        id: row.try_get("id")?,
        external_id: row.try_get("external_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        content: row.try_get("content")?,
        url: row.try_get("url")?,
        image_url: row.try_get("image_url")?,
        published_at: row.try_get("published_at")?,
        category: entity_from_row(row, "category")?,
        source: entity_from_row(row, "source")?,
        author: entity_from_row(row, "author")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_filters(qb: &mut QueryBuilder<Postgres>, filter: &ArticleFilter) {
    if let Some(q) = &filter.q {
        if !q.is_empty() {
            let like = format!("%{q}%");
            qb.push(" AND (a.title ILIKE ")
                .push_bind(like.clone())
                .push(" OR a.description ILIKE ")
                .push_bind(like.clone())
                .push(" OR a.content ILIKE ")
                .push_bind(like)
                .push(")");
        }
    }

    if !filter.categories.is_empty() {
        qb.push(" AND (c.slug = ANY(")
            .push_bind(filter.categories.clone())
            .push(") OR c.name = ANY(")
            .push_bind(filter.categories.clone())
            .push("))");
    }

    if !filter.sources.is_empty() {
        qb.push(" AND (s.slug = ANY(")
            .push_bind(filter.sources.clone())
            .push(") OR s.name = ANY(")
            .push_bind(filter.sources.clone())
            .push("))");
    }

    if !filter.authors.is_empty() {
        qb.push(" AND (au.slug = ANY(")
            .push_bind(filter.authors.clone())
            .push(") OR au.name = ANY(")
            .push_bind(filter.authors.clone())
            .push("))");
    }

    if let Some(from) = filter.date_from {
        qb.push(" AND a.published_at::date >= ").push_bind(from);
    }

    if let Some(to) = filter.date_to {
        qb.push(" AND a.published_at::date <= ").push_bind(to);
    }
}

fn order_clause(filter: &ArticleFilter) -> String {
    let direction = match filter.sort_direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };

    match filter.sort_field {
        // Articles with no known publish date sort after everything else.
        SortField::PublishedAt => format!("a.published_at {direction} NULLS LAST"),
        field => format!("a.{} {direction}", field.as_str()),
    }
}

/// Postgres-backed [`NewsStore`].
///
/// Uniqueness is enforced by the schema (`articles.external_id`,
/// `<taxonomy>.slug`); writes use `ON CONFLICT DO NOTHING` so repeated
/// ingestion and concurrent get-or-create both resolve to the existing row.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl NewsStore for PgStore {
    async fn article_exists(&self, external_id: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM articles WHERE external_id = $1)")
                .bind(external_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn resolve_entity(
        &self,
        kind: TaxonomyKind,
        name: &str,
        slug: &str,
    ) -> Result<TaxonomyEntity> {
        let (table, _) = taxonomy_table(kind);
        let now = Utc::now();

        // Insert-then-select through the unique slug constraint: losing a
        // race just means the select finds the winner's row.
        let insert = format!(
            "INSERT INTO {table} (name, slug, created_at, updated_at) \
             VALUES ($1, $2, $3, $3) ON CONFLICT (slug) DO NOTHING"
        );
        sqlx::query(&insert)
            .bind(name)
            .bind(slug)
            .bind(now)
            .execute(&self.pool)
            .await?;

        let select =
            format!("SELECT id, name, slug, created_at, updated_at FROM {table} WHERE slug = $1");
        let row = sqlx::query(&select).bind(slug).fetch_one(&self.pool).await?;

        Ok(TaxonomyEntity {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn insert_article(&self, article: NewArticle) -> Result<Option<Article>> {
        let now = Utc::now();

        let inserted = sqlx::query(
            "INSERT INTO articles (external_id, title, description, content, url, image_url, \
             published_at, category_id, source_id, author_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11) \
             ON CONFLICT (external_id) DO NOTHING RETURNING id",
        )
        .bind(&article.external_id)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.content)
        .bind(&article.url)
        .bind(&article.image_url)
        .bind(article.published_at)
        .bind(article.category_id)
        .bind(article.source_id)
        .bind(article.author_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => {
                let id: i64 = row.try_get("id")?;
                self.find_article(id).await
            }
            None => Ok(None),
        }
    }

    async fn query_articles(&self, filter: &ArticleFilter) -> Result<Page<Article>> {
        let mut count_qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT COUNT(*) FROM articles a \
             JOIN categories c ON c.id = a.category_id \
             JOIN sources s ON s.id = a.source_id \
             JOIN authors au ON au.id = a.author_id WHERE 1=1",
        );
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("{ARTICLE_SELECT} WHERE 1=1"));
        push_filters(&mut qb, filter);
        qb.push(format!(" ORDER BY {}", order_clause(filter)));
        qb.push(" LIMIT ")
            .push_bind(filter.per_page as i64)
            .push(" OFFSET ")
            .push_bind((filter.page as i64 - 1) * filter.per_page as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(article_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(items, total as u64, filter.page, filter.per_page))
    }

    async fn find_article(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!("{ARTICLE_SELECT} WHERE a.id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn related_articles(&self, id: i64, limit: usize) -> Result<Vec<Article>> {
        let sql = format!(
            "{ARTICLE_SELECT} JOIN article_related r ON r.related_article_id = a.id \
             WHERE r.article_id = $1 LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(article_from_row).collect()
    }

    async fn list_entities(
        &self,
        kind: TaxonomyKind,
        search: Option<&str>,
        limit: usize,
    ) -> Result<Vec<TaxonomySummary>> {
        let (table, fk) = taxonomy_table(kind);

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT t.name, t.slug, COUNT(a.id) AS article_count \
             FROM {table} t LEFT JOIN articles a ON a.{fk} = t.id"
        ));
        if let Some(search) = search {
            qb.push(" WHERE t.name ILIKE ").push_bind(format!("%{search}%"));
        }
        qb.push(" GROUP BY t.id, t.name, t.slug ORDER BY t.name LIMIT ");
        qb.push_bind(limit as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(TaxonomySummary {
                    name: row.try_get("name")?,
                    slug: row.try_get("slug")?,
                    count: row.try_get::<i64, _>("article_count")? as u64,
                })
            })
            .collect()
    }

    async fn get_preferences(&self, user_id: i64) -> Result<Option<UserPreference>> {
        let row = sqlx::query(
            "SELECT user_id, preferences, created_at, updated_at \
             FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let value: serde_json::Value = row.try_get("preferences")?;
            Ok(UserPreference {
                user_id: row.try_get("user_id")?,
                preferences: serde_json::from_value::<PreferenceData>(value)?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .transpose()
    }

    async fn upsert_preferences(
        &self,
        user_id: i64,
        data: PreferenceData,
    ) -> Result<UserPreference> {
        let now = Utc::now();
        let payload = serde_json::to_value(&data)?;

        let row = sqlx::query(
            "INSERT INTO user_preferences (user_id, preferences, created_at, updated_at) \
             VALUES ($1, $2, $3, $3) \
             ON CONFLICT (user_id) DO UPDATE \
             SET preferences = EXCLUDED.preferences, updated_at = EXCLUDED.updated_at \
             RETURNING user_id, preferences, created_at, updated_at",
        )
        .bind(user_id)
        .bind(payload)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let value: serde_json::Value = row.try_get("preferences")?;

        Ok(UserPreference {
            user_id: row.try_get("user_id")?,
            preferences: serde_json::from_value::<PreferenceData>(value)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
