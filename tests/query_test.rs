mod common;

use chrono::{NaiveDate, TimeZone, Utc};

use news_aggregator::personalize::{PersonalizationComposer, PreferencesService};
use news_aggregator::query::QueryEngine;
use news_aggregator::taxonomy::TaxonomyService;
use news_aggregator::types::{
    ArticleFilter, FilterParams, LabelParam, PreferenceData, SortDirection, SortField,
};

use common::{draft, persister, test_store, TestStore};

/// Seeds one article per (category, month) pair used by the filter tests.
async fn seed(ctx: &TestStore) {
    let mut batch = Vec::new();

    let mut science = draft("a_1", "Quantum leap", "BBC", "Science", "Ada");
    science.published_at = Some(Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap());
    batch.push(science);

    let mut tech = draft("a_2", "New framework released", "TechCrunch", "Technology", "Grace");
    tech.description = "A deep dive into the framework internals".to_string();
    tech.published_at = Some(Utc.with_ymd_and_hms(2025, 2, 15, 9, 0, 0).unwrap());
    batch.push(tech);

    let mut politics = draft("a_3", "Election results", "BBC", "Politics", "Ada");
    politics.published_at = Some(Utc.with_ymd_and_hms(2025, 3, 20, 9, 0, 0).unwrap());
    batch.push(politics);

    let mut undated = draft("a_4", "Timeless piece", "TechCrunch", "Technology", "Grace");
    undated.published_at = None;
    batch.push(undated);

    assert_eq!(persister(ctx).save(&batch).await.unwrap(), 4);
}

#[tokio::test]
async fn category_filter_returns_only_matching_articles() {
    let ctx = test_store();
    seed(&ctx).await;
    let engine = QueryEngine::new(ctx.dyn_store.clone(), ctx.cache.clone());

    let filter = ArticleFilter {
        categories: vec!["science".to_string()],
        ..ArticleFilter::default()
    };
    let page = engine.paginate(&filter).await.unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].external_id, "a_1");

    // Labels match display names as well as slugs.
    let filter = ArticleFilter {
        categories: vec!["Science".to_string()],
        ..ArticleFilter::default()
    };
    assert_eq!(engine.paginate(&filter).await.unwrap().total, 1);
}

#[tokio::test]
async fn filters_combine_across_fields() {
    let ctx = test_store();
    seed(&ctx).await;
    let engine = QueryEngine::new(ctx.dyn_store.clone(), ctx.cache.clone());

    // Same source, two categories: AND across fields narrows to one.
    let filter = ArticleFilter {
        sources: vec!["bbc".to_string()],
        categories: vec!["politics".to_string()],
        ..ArticleFilter::default()
    };
    let page = engine.paginate(&filter).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].external_id, "a_3");

    // OR within a field widens back out.
    let filter = ArticleFilter {
        categories: vec!["politics".to_string(), "science".to_string()],
        ..ArticleFilter::default()
    };
    assert_eq!(engine.paginate(&filter).await.unwrap().total, 2);
}

#[tokio::test]
async fn free_text_search_scans_title_description_and_content() {
    let ctx = test_store();
    seed(&ctx).await;
    let engine = QueryEngine::new(ctx.dyn_store.clone(), ctx.cache.clone());

    let filter = ArticleFilter {
        q: Some("quantum".to_string()),
        ..ArticleFilter::default()
    };
    assert_eq!(engine.paginate(&filter).await.unwrap().total, 1);

    // Matches in the description, case-insensitively.
    let filter = ArticleFilter {
        q: Some("INTERNALS".to_string()),
        ..ArticleFilter::default()
    };
    let page = engine.paginate(&filter).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].external_id, "a_2");

    let filter = ArticleFilter {
        q: Some("no such phrase".to_string()),
        ..ArticleFilter::default()
    };
    assert_eq!(engine.paginate(&filter).await.unwrap().total, 0);
}

#[tokio::test]
async fn date_bounds_are_inclusive_and_exclude_undated_articles() {
    let ctx = test_store();
    seed(&ctx).await;
    let engine = QueryEngine::new(ctx.dyn_store.clone(), ctx.cache.clone());

    let filter = ArticleFilter {
        date_from: NaiveDate::from_ymd_opt(2025, 2, 15),
        date_to: NaiveDate::from_ymd_opt(2025, 3, 20),
        ..ArticleFilter::default()
    };
    let page = engine.paginate(&filter).await.unwrap();

    let ids: Vec<&str> = page.items.iter().map(|a| a.external_id.as_str()).collect();
    assert_eq!(page.total, 2);
    assert!(ids.contains(&"a_2"));
    assert!(ids.contains(&"a_3"));
}

#[tokio::test]
async fn sorting_and_default_order() {
    let ctx = test_store();
    seed(&ctx).await;
    let engine = QueryEngine::new(ctx.dyn_store.clone(), ctx.cache.clone());

    // Default: newest published first, undated articles last.
    let page = engine.paginate(&ArticleFilter::default()).await.unwrap();
    let ids: Vec<&str> = page.items.iter().map(|a| a.external_id.as_str()).collect();
    assert_eq!(ids, vec!["a_3", "a_2", "a_1", "a_4"]);

    let filter = ArticleFilter {
        sort_field: SortField::Title,
        sort_direction: SortDirection::Asc,
        ..ArticleFilter::default()
    };
    let page = engine.paginate(&filter).await.unwrap();
    let titles: Vec<&str> = page.items.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Election results",
            "New framework released",
            "Quantum leap",
            "Timeless piece"
        ]
    );
}

#[tokio::test]
async fn pagination_respects_clamped_bounds() {
    let ctx = test_store();
    seed(&ctx).await;
    let engine = QueryEngine::new(ctx.dyn_store.clone(), ctx.cache.clone());

    let filter = ArticleFilter::from_params(FilterParams {
        per_page: Some(500),
        ..FilterParams::default()
    });
    let page = engine.paginate(&filter).await.unwrap();
    assert_eq!(page.per_page, 100);
    assert_eq!(page.total, 4);

    let filter = ArticleFilter {
        per_page: 3,
        page: 2,
        ..ArticleFilter::default()
    };
    let page = engine.paginate(&filter).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.last_page, 2);
    assert_eq!(page.items[0].external_id, "a_4");

    // Pages past the end are empty, not an error.
    let filter = ArticleFilter {
        page: 9,
        ..ArticleFilter::default()
    };
    assert!(engine.paginate(&filter).await.unwrap().items.is_empty());
}

#[tokio::test]
async fn single_article_lookups_and_related_cap() {
    let ctx = test_store();
    seed(&ctx).await;
    let engine = QueryEngine::new(ctx.dyn_store.clone(), ctx.cache.clone());

    let page = engine.paginate(&ArticleFilter::default()).await.unwrap();
    let first = page.items.iter().find(|a| a.external_id == "a_1").unwrap();

    let found = engine.find_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(found.external_id, "a_1");
    assert_eq!(found.category.slug, "science");

    assert!(engine.find_by_id(9999).await.unwrap().is_none());

    // Relate a_1 to every other article; the detail view caps at three.
    for other in page.items.iter().filter(|a| a.id != first.id) {
        ctx.store.link_related(first.id, other.id).await;
    }
    ctx.cache.forget_by_prefix("articles:").await;

    let detail = engine
        .find_by_id_with_related(first.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.article.id, first.id);
    assert_eq!(detail.related.len(), 3);
}

#[tokio::test]
async fn personalization_falls_back_without_preferences() {
    let ctx = test_store();
    seed(&ctx).await;
    let engine = QueryEngine::new(ctx.dyn_store.clone(), ctx.cache.clone());
    let composer =
        PersonalizationComposer::new(ctx.dyn_store.clone(), engine.clone(), ctx.cache.clone());

    let base = engine.paginate(&ArticleFilter::default()).await.unwrap();
    let feed = composer
        .personalized_feed(7, &ArticleFilter::default())
        .await
        .unwrap();

    assert_eq!(feed.total, base.total);

    // A stored record with no preference lists behaves the same way.
    ctx.dyn_store
        .upsert_preferences(7, PreferenceData::default())
        .await
        .unwrap();
    let feed = composer
        .personalized_feed(7, &ArticleFilter::default())
        .await
        .unwrap();
    assert_eq!(feed.total, base.total);
}

#[tokio::test]
async fn stored_preferences_override_request_filters() {
    let ctx = test_store();
    seed(&ctx).await;
    let engine = QueryEngine::new(ctx.dyn_store.clone(), ctx.cache.clone());
    let composer =
        PersonalizationComposer::new(ctx.dyn_store.clone(), engine, ctx.cache.clone());

    ctx.dyn_store
        .upsert_preferences(
            7,
            PreferenceData {
                categories: vec!["science".to_string()],
                ..PreferenceData::default()
            },
        )
        .await
        .unwrap();

    // The request asks for technology; the stored preference wins.
    let request = ArticleFilter {
        categories: vec!["technology".to_string()],
        ..ArticleFilter::default()
    };
    let feed = composer.personalized_feed(7, &request).await.unwrap();

    assert_eq!(feed.total, 1);
    assert_eq!(feed.items[0].category.slug, "science");

    // A different user with the same request is unaffected.
    let other = composer.personalized_feed(8, &request).await.unwrap();
    assert_eq!(other.total, 2);
    assert!(other
        .items
        .iter()
        .all(|article| article.category.slug == "technology"));
}

#[tokio::test]
async fn preferences_service_defaults_and_upserts() {
    let ctx = test_store();
    let service = PreferencesService::new(ctx.dyn_store.clone());

    let defaults = service.get(1).await.unwrap();
    assert!(defaults.categories.is_empty());
    assert_eq!(defaults.language.as_deref(), Some("en"));
    assert_eq!(defaults.theme.as_deref(), Some("light"));

    let first = service
        .update(
            1,
            PreferenceData {
                categories: vec!["science".to_string()],
                theme: Some("dark".to_string()),
                ..PreferenceData::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(first.user_id, 1);

    // Saving again replaces the record instead of duplicating it.
    let second = service
        .update(
            1,
            PreferenceData {
                categories: vec!["politics".to_string()],
                ..PreferenceData::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(second.created_at, first.created_at);

    let stored = service.get(1).await.unwrap();
    assert_eq!(stored.categories, vec!["politics".to_string()]);
    // Unset fields read back with profile defaults applied.
    assert_eq!(stored.language.as_deref(), Some("en"));
}

#[tokio::test]
async fn taxonomy_listings_carry_article_counts() {
    let ctx = test_store();
    seed(&ctx).await;
    let taxonomy = TaxonomyService::new(ctx.dyn_store.clone(), ctx.cache.clone());

    let categories = taxonomy.categories(None).await.unwrap();
    let slugs: Vec<&str> = categories.iter().map(|c| c.slug.as_str()).collect();
    assert_eq!(slugs, vec!["politics", "science", "technology"]);

    let technology = categories.iter().find(|c| c.slug == "technology").unwrap();
    assert_eq!(technology.count, 2);

    let searched = taxonomy.categories(Some("sci")).await.unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].slug, "science");

    let options = taxonomy.filter_options(None).await.unwrap();
    assert_eq!(options.categories.len(), 3);
    assert_eq!(options.sources.len(), 2);
    assert_eq!(options.authors.len(), 2);
}

#[tokio::test]
async fn wire_params_round_trip_through_the_engine() {
    let ctx = test_store();
    seed(&ctx).await;
    let engine = QueryEngine::new(ctx.dyn_store.clone(), ctx.cache.clone());

    let filter = ArticleFilter::from_params(FilterParams {
        categories: Some(LabelParam::One("technology".to_string())),
        sort: Some("-published_at".to_string()),
        ..FilterParams::default()
    });
    let page = engine.paginate(&filter).await.unwrap();

    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].external_id, "a_2");
}
