mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Catalog, ids};
use corral::{
    CollectionController, CollectionState, ControllerConfig, LoadOutcome, QueryCache, SortSpec,
};
use pretty_assertions::assert_eq;
use serde_json::Value;

fn controller(catalog: &Arc<Catalog>, cache: &QueryCache) -> CollectionController<Value> {
    CollectionController::new(
        "products",
        cache.clone(),
        catalog.clone(),
        ControllerConfig::default(),
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn first_load_goes_through_loading_to_ready() {
    let catalog = Arc::new(Catalog::with_products(35));
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);
    assert_eq!(products.view().state, CollectionState::Idle);

    let reload = products.load();
    assert_eq!(products.view().state, CollectionState::Loading);
    assert_eq!(reload.await, LoadOutcome::Applied);

    let view = products.view();
    assert_eq!(view.state, CollectionState::Ready);
    assert_eq!(view.items().len(), 10);
    assert_eq!(view.total_pages(), Some(4));
}

#[tokio::test(start_paused = true)]
async fn next_page_fetches_the_following_rows() {
    let catalog = Arc::new(Catalog::with_products(35));
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);
    products.load().await;

    let reload = products.next_page();
    let view = products.view();
    assert_eq!((view.key.page(), view.key.limit()), (2, 10));
    assert_eq!(view.state, CollectionState::Refetching);
    assert_eq!(reload.await, LoadOutcome::Applied);

    let view = products.view();
    assert_eq!(
        ids(view.items()),
        vec!["11", "12", "13", "14", "15", "16", "17", "18", "19", "20"]
    );
    assert_eq!(catalog.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn page_changes_are_clamped_and_same_page_is_a_no_op() {
    let catalog = Arc::new(Catalog::with_products(35));
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);
    products.load().await;

    assert_eq!(products.on_page_change(0).await, LoadOutcome::Unchanged);
    assert_eq!(products.view().query.page, 1);

    products.on_page_change(4 + 5).await;
    assert_eq!(products.view().query.page, 4);
    assert_eq!(ids(products.view().items()), vec!["31", "32", "33", "34", "35"]);

    assert_eq!(products.on_page_change(4).await, LoadOutcome::Unchanged);
}

#[tokio::test(start_paused = true)]
async fn limit_change_returns_to_first_page() {
    let catalog = Arc::new(Catalog::with_products(100));
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);
    products.load().await;
    products.on_page_change(5).await;
    assert_eq!(products.view().query.page, 5);

    products.on_limit_change(50).await;
    let view = products.view();
    assert_eq!((view.query.page, view.query.limit), (1, 50));
    assert_eq!(view.items().len(), 50);
}

#[tokio::test(start_paused = true)]
async fn sort_header_clicks_cycle_and_reorder() {
    let catalog = Arc::new(Catalog::with_products(12));
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);

    products.on_sort("price").await;
    assert_eq!(products.view().query.sort, Some(SortSpec::asc("price")));
    assert_eq!(ids(products.view().items())[0], "1");

    products.on_sort("price").await;
    assert_eq!(products.view().query.sort, Some(SortSpec::desc("price")));
    assert_eq!(ids(products.view().items())[0], "12");

    products.on_sort("title").await;
    assert_eq!(products.view().query.sort, Some(SortSpec::asc("title")));
}

#[tokio::test(start_paused = true)]
async fn superseded_response_is_discarded() {
    let catalog = Arc::new(
        Catalog::with_products(35)
            .delay_page(1, Duration::from_millis(200))
            .delay_page(2, Duration::from_millis(50)),
    );
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);

    let first = products.load();
    let second = products.on_page_change(2);
    let (first, second) = tokio::join!(first, second);

    assert_eq!(second, LoadOutcome::Applied);
    assert_eq!(first, LoadOutcome::Discarded);
    let view = products.view();
    assert_eq!(view.key.page(), 2);
    assert_eq!(ids(view.items())[0], "11");
    assert_eq!(view.state, CollectionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn fresh_cache_hit_is_applied_synchronously() {
    let catalog = Arc::new(Catalog::with_products(35));
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);
    products.load().await;
    products.next_page().await;

    let back = products.previous_page();
    assert!(back.is_ready());
    assert_eq!(products.view().state, CollectionState::Ready);
    assert_eq!(ids(products.view().items())[0], "1");
    assert_eq!(back.await, LoadOutcome::Applied);
    assert_eq!(catalog.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn search_settles_after_quiet_period_and_resets_page() {
    let catalog = Arc::new(Catalog::with_products(35));
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);
    products.load().await;
    products.on_page_change(3).await;

    for term in ["p", "pr", "product-3"] {
        products.on_search_input(term);
        assert_eq!(products.view().query.search_term, term);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(products.query_key().filter("search"), None);

    tokio::time::sleep(Duration::from_millis(600)).await;
    let view = products.view();
    assert_eq!(view.query.page, 1);
    assert_eq!(view.key.filter("search"), Some("product-3"));
    assert_eq!(view.state, CollectionState::Ready);
    assert_eq!(ids(view.items()), vec!["30", "31", "32", "33", "34", "35"]);

    let searched: Vec<_> = catalog
        .requested()
        .into_iter()
        .filter(|key| key.filter("search").is_some())
        .collect();
    assert_eq!(searched.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_result_is_not_an_error() {
    let catalog = Arc::new(Catalog::with_products(5));
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);

    products.on_search_input("nothing matches");
    tokio::time::sleep(Duration::from_secs(1)).await;

    let view = products.view();
    assert_eq!(view.state, CollectionState::Ready);
    assert!(view.is_empty_result());
    assert!(view.last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn failure_without_data_is_blocking() {
    let catalog = Arc::new(Catalog::with_products(5));
    catalog.fail(true);
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);

    assert_eq!(products.load().await, LoadOutcome::Failed);
    let view = products.view();
    assert_eq!(view.state, CollectionState::Error);
    assert_eq!(view.last_error.and_then(|e| e.as_fetch().and_then(|f| f.status())), Some(503));
}

#[tokio::test(start_paused = true)]
async fn failure_with_data_keeps_previous_rows() {
    let catalog = Arc::new(Catalog::with_products(35));
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);
    products.load().await;

    catalog.fail(true);
    assert_eq!(products.refresh().await, LoadOutcome::Failed);
    let view = products.view();
    assert_eq!(view.state, CollectionState::ReadyWithStaleError);
    assert_eq!(view.items().len(), 10);

    catalog.fail(false);
    assert_eq!(products.refresh().await, LoadOutcome::Applied);
    assert_eq!(products.view().state, CollectionState::Ready);
    assert!(products.view().last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn invalidation_triggers_refetch() {
    let catalog = Arc::new(Catalog::with_products(35));
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);
    products.load().await;
    assert_eq!(catalog.calls(), 1);

    cache.invalidate("products");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(catalog.calls(), 2);
    assert_eq!(products.view().state, CollectionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn filter_change_resets_page() {
    let catalog = Arc::new(Catalog::with_products(35));
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);
    products.load().await;
    products.on_page_change(3).await;

    products.set_filter("region", "north").await;
    let view = products.view();
    assert_eq!(view.query.page, 1);
    assert_eq!(view.key.filter("region"), Some("north"));

    products.remove_filter("region").await;
    assert_eq!(products.view().key.filter("region"), None);
}

#[tokio::test(start_paused = true)]
async fn dropped_controller_stops_pending_search() {
    let catalog = Arc::new(Catalog::with_products(5));
    let cache = QueryCache::default();
    let products = controller(&catalog, &cache);
    products.on_search_input("product");
    drop(products);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(catalog.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn two_controllers_share_one_load() {
    let catalog = Arc::new(Catalog::with_products(35));
    let cache = QueryCache::default();
    let left = controller(&catalog, &cache);
    let right = controller(&catalog, &cache);

    let (a, b) = tokio::join!(left.load(), right.load());
    assert_eq!((a, b), (LoadOutcome::Applied, LoadOutcome::Applied));
    assert_eq!(catalog.calls(), 1);
    assert_eq!(ids(left.view().items()), ids(right.view().items()));
}
