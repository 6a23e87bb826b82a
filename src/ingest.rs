use tracing::{debug, error, info};

use crate::persist::ArticlePersister;
use crate::providers::NewsProvider;
use crate::types::{FetchReport, SourceReport};

/// Drives every configured provider in registration order and hands the
/// resulting drafts to the persister.
///
/// One provider's outage never blocks the others: a failed fetch or save
/// is recorded against that source's report entry and the sweep continues.
/// Retry policy belongs to whatever scheduler invokes the run, not here.
pub struct IngestionOrchestrator {
    providers: Vec<Box<dyn NewsProvider>>,
    persister: ArticlePersister,
}

impl IngestionOrchestrator {
    pub fn new(providers: Vec<Box<dyn NewsProvider>>, persister: ArticlePersister) -> Self {
        Self {
            providers,
            persister,
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Fetches and persists from all providers, returning the per-source
    /// breakdown. With `dry_run` the persister is skipped entirely and
    /// every source reports `saved = 0`.
    pub async fn run_all(&self, dry_run: bool) -> FetchReport {
        let mut sources = Vec::with_capacity(self.providers.len());
        let mut total_articles = 0usize;

        for provider in &self.providers {
            let name = provider.name();
            info!(source = name, "fetching news");

            match provider.fetch_news().await {
                Ok(drafts) => {
                    let fetched = drafts.len();

                    if dry_run {
                        debug!(source = name, fetched, "dry run, skipping persistence");
                        total_articles += fetched;
                        sources.push(SourceReport {
                            source: name.to_string(),
                            fetched,
                            saved: 0,
                            error: None,
                        });
                        continue;
                    }

                    match self.persister.save(&drafts).await {
                        Ok(saved) => {
                            total_articles += fetched;
                            sources.push(SourceReport {
                                source: name.to_string(),
                                fetched,
                                saved,
                                error: None,
                            });
                        }
                        Err(e) => {
                            error!(source = name, error = %e, "failed to persist articles");
                            sources.push(SourceReport {
                                source: name.to_string(),
                                fetched: 0,
                                saved: 0,
                                error: Some(e.to_string()),
                            });
                        }
                    }
                }
                Err(e) => {
                    error!(source = name, error = %e, "failed to fetch news");
                    sources.push(SourceReport {
                        source: name.to_string(),
                        fetched: 0,
                        saved: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        FetchReport {
            total_articles,
            sources,
        }
    }
}
