use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A provider-normalized article that has not been persisted yet.
///
/// Description and content are empty strings when the provider omits them;
/// the taxonomy fields are display labels that still need to be resolved to
/// entity rows by the persister.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source_name: String,
    pub category_name: String,
    pub author_name: String,
}

/// The three taxonomy dimensions an article is classified by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyKind {
    Category,
    Source,
    Author,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyEntity {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row for filter options, carrying the entity's article count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomySummary {
    pub name: String,
    pub slug: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOptions {
    pub categories: Vec<TaxonomySummary>,
    pub sources: Vec<TaxonomySummary>,
    pub authors: Vec<TaxonomySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub category: TaxonomyEntity,
    pub source: TaxonomyEntity,
    pub author: TaxonomyEntity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Detail view of an article together with a capped list of related ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleWithRelated {
    pub article: Article,
    pub related: Vec<Article>,
}

/// Structured preference payload stored per user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceData {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl PreferenceData {
    /// Whether any feed-shaping preference list is set.
    pub fn has_feed_preferences(&self) -> bool {
        !self.categories.is_empty() || !self.sources.is_empty() || !self.authors.is_empty()
    }

    /// The profile served for users who never saved preferences.
    pub fn default_profile() -> Self {
        Self {
            language: Some("en".to_string()),
            theme: Some("light".to_string()),
            ..Self::default()
        }
    }

    pub fn with_defaults(mut self) -> Self {
        self.language.get_or_insert_with(|| "en".to_string());
        self.theme.get_or_insert_with(|| "light".to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_id: i64,
    pub preferences: PreferenceData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Title,
    PublishedAt,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Parses the field portion of a combined sort string such as
    /// `-published_at`; unknown fields fall back to the published date.
    pub fn from_sort(sort: &str) -> Self {
        match sort.trim_start_matches('-') {
            "title" => Self::Title,
            "created_at" => Self::CreatedAt,
            "updated_at" => Self::UpdatedAt,
            _ => Self::PublishedAt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::PublishedAt => "published_at",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn from_sort(sort: &str) -> Self {
        if sort.starts_with('-') {
            Self::Desc
        } else {
            Self::Asc
        }
    }
}

/// One-or-many query parameter, the way request layers submit label lists.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LabelParam {
    One(String),
    Many(Vec<String>),
}

impl LabelParam {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Raw request parameters accepted at the article-listing boundary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    pub q: Option<String>,
    pub categories: Option<LabelParam>,
    pub sources: Option<LabelParam>,
    pub authors: Option<LabelParam>,
    #[serde(alias = "dateFrom")]
    pub date_from: Option<String>,
    #[serde(alias = "dateTo")]
    pub date_to: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort: Option<String>,
}

/// Normalized article query: label filters, date bounds, sort and paging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleFilter {
    pub q: Option<String>,
    pub categories: Vec<String>,
    pub sources: Vec<String>,
    pub authors: Vec<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page: u32,
    pub per_page: u32,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

impl Default for ArticleFilter {
    fn default() -> Self {
        Self {
            q: None,
            categories: Vec::new(),
            sources: Vec::new(),
            authors: Vec::new(),
            date_from: None,
            date_to: None,
            page: 1,
            per_page: 15,
            sort_field: SortField::PublishedAt,
            sort_direction: SortDirection::Desc,
        }
    }
}

impl ArticleFilter {
    /// Builds a filter from raw request parameters, clamping the paging
    /// bounds and decoding the `-published_at` style sort string.
    pub fn from_params(params: FilterParams) -> Self {
        let sort = params.sort.unwrap_or_else(|| "-published_at".to_string());

        Self {
            q: params.q.filter(|q| !q.is_empty()),
            categories: params.categories.map(LabelParam::into_vec).unwrap_or_default(),
            sources: params.sources.map(LabelParam::into_vec).unwrap_or_default(),
            authors: params.authors.map(LabelParam::into_vec).unwrap_or_default(),
            date_from: params
                .date_from
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            date_to: params
                .date_to
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            page: params.page.unwrap_or(1).max(1),
            per_page: params.per_page.unwrap_or(15).clamp(1, 100),
            sort_field: SortField::from_sort(&sort),
            sort_direction: SortDirection::from_sort(&sort),
        }
    }

    pub fn sort_string(&self) -> String {
        let prefix = match self.sort_direction {
            SortDirection::Desc => "-",
            SortDirection::Asc => "",
        };

        format!("{}{}", prefix, self.sort_field.as_str())
    }
}

/// One page of query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub last_page: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, per_page: u32) -> Self {
        let last_page = (total.div_ceil(per_page.max(1) as u64)).max(1) as u32;

        Self {
            items,
            total,
            page,
            per_page,
            last_page,
        }
    }
}

/// Per-source outcome of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    pub saved: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of one ingestion run across all configured providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchReport {
    pub total_articles: usize,
    pub sources: Vec<SourceReport>,
}

#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    #[error("API configuration missing for {service}: set {missing_key} in the environment")]
    Configuration {
        service: &'static str,
        missing_key: &'static str,
    },

    #[error("news provider [{provider}]: {message}")]
    Provider {
        provider: String,
        message: String,
        status: Option<u16>,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, NewsError>;
