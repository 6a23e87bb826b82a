use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use super::{parse_published, provider_error, NewsProvider, GENERAL_CATEGORY};
use crate::config::NewsConfig;
use crate::types::{ArticleDraft, NewsError, Result};
use crate::utils::{clean_text, md5_hex, squash_whitespace};

pub const PROVIDER_NAME: &str = "New York Times";

const REQUESTED_FIELDS: &str =
    "headline,abstract,lead_paragraph,web_url,multimedia,pub_date,byline,section_name";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Default, Deserialize)]
struct SearchBody {
    #[serde(default)]
    docs: Vec<Doc>,
}

#[derive(Debug, Deserialize)]
struct Doc {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(default)]
    headline: Headline,
    #[serde(rename = "abstract")]
    summary: Option<String>,
    lead_paragraph: Option<String>,
    #[serde(default)]
    web_url: String,
    #[serde(default)]
    multimedia: Vec<Multimedia>,
    #[serde(default)]
    pub_date: String,
    byline: Option<Byline>,
    section_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Headline {
    main: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Multimedia {
    url: Option<String>,
    #[serde(rename = "type")]
    media_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Byline {
    original: Option<String>,
    #[serde(default)]
    person: Vec<Person>,
}

#[derive(Debug, Deserialize)]
struct Person {
    firstname: Option<String>,
    middlename: Option<String>,
    lastname: Option<String>,
}

/// Adapter for the New York Times article search API.
pub struct NyTimes {
    client: Client,
    api_key: String,
    base_url: String,
    max_articles: usize,
}

impl NyTimes {
    pub fn new(config: &NewsConfig, client: Client) -> Result<Self> {
        let provider = config.nytimes.as_ref().ok_or(NewsError::Configuration {
            service: "New York Times",
            missing_key: "NYTIMES_API_KEY",
        })?;

        Ok(Self {
            client,
            api_key: provider.api_key.clone(),
            base_url: provider.base_url.trim_end_matches('/').to_string(),
            max_articles: config.max_articles_per_source,
        })
    }

    fn normalize(&self, docs: Vec<Doc>) -> Vec<ArticleDraft> {
        let mut drafts = Vec::with_capacity(docs.len().min(self.max_articles));

        // The search API has no page-size parameter, so the cap is applied
        // client-side.
        for doc in docs.into_iter().take(self.max_articles) {
            if doc.web_url.is_empty() {
                debug!(provider = PROVIDER_NAME, "dropping doc without a web URL");
                continue;
            }

            drafts.push(ArticleDraft {
                external_id: format!("nytimes_{}", md5_hex(&doc.id)),
                title: clean_text(doc.headline.main.as_deref().unwrap_or_default()),
                description: clean_text(doc.summary.as_deref().unwrap_or_default()),
                content: clean_text(doc.lead_paragraph.as_deref().unwrap_or_default()),
                url: doc.web_url,
                image_url: extract_image_url(&doc.multimedia),
                published_at: parse_published(&doc.pub_date, PROVIDER_NAME),
                source_name: PROVIDER_NAME.to_string(),
                category_name: doc
                    .section_name
                    .unwrap_or_else(|| GENERAL_CATEGORY.to_string()),
                author_name: extract_author(doc.byline),
            });
        }

        drafts
    }
}

fn extract_image_url(multimedia: &[Multimedia]) -> Option<String> {
    multimedia
        .iter()
        .find(|media| media.media_type.as_deref() == Some("image") && media.url.is_some())
        .and_then(|media| media.url.as_deref())
        .map(|path| format!("https://www.nytimes.com/{path}"))
}

fn extract_author(byline: Option<Byline>) -> String {
    let Some(byline) = byline else {
        return PROVIDER_NAME.to_string();
    };

    if let Some(original) = byline.original {
        let cleaned = clean_text(&original);
        if !cleaned.is_empty() {
            return cleaned;
        }
    }

    if let Some(person) = byline.person.first() {
        let name = squash_whitespace(&format!(
            "{} {} {}",
            person.firstname.as_deref().unwrap_or_default(),
            person.middlename.as_deref().unwrap_or_default(),
            person.lastname.as_deref().unwrap_or_default(),
        ));
        if !name.is_empty() {
            return name;
        }
    }

    PROVIDER_NAME.to_string()
}

#[async_trait]
impl NewsProvider for NyTimes {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch_news(&self) -> Result<Vec<ArticleDraft>> {
        let url = format!("{}/articlesearch.json", self.base_url);
        let params: Vec<(&str, String)> = vec![
            ("api-key", self.api_key.clone()),
            ("sort", "newest".to_string()),
            ("page", "0".to_string()),
            ("fl", REQUESTED_FIELDS.to_string()),
        ];

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| provider_error(PROVIDER_NAME, e.to_string(), None))?;

        let status = response.status();
        if !status.is_success() {
            error!(
                provider = PROVIDER_NAME,
                status = status.as_u16(),
                "API request failed"
            );
            return Err(provider_error(
                PROVIDER_NAME,
                format!("API request failed with status {}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| provider_error(PROVIDER_NAME, e.to_string(), None))?;

        Ok(self.normalize(body.response.docs))
    }
}
