//! Single-flight, TTL, and sweep behavior of the field metadata cache

mod common;

use common::fixtures::text_definition;
use common::mocks::MockDefinitionSource;
use formwork::{DefinitionSource, FieldMetadataCache, FieldRef};
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (Arc<MockDefinitionSource>, Arc<FieldMetadataCache>) {
    let source = Arc::new(MockDefinitionSource::new());
    let cache = FieldMetadataCache::new(Arc::clone(&source) as Arc<dyn DefinitionSource>);
    (source, cache)
}

#[tokio::test(start_paused = true)]
async fn concurrent_lookups_share_one_fetch() {
    let (source, cache) = setup();
    source.insert(text_definition("door_style"));
    source.set_delay(Duration::from_millis(10));

    let field_ref = FieldRef::from("door_style");
    let mut handles = Vec::new();
    for _ in 0..5 {
        let cache = Arc::clone(&cache);
        let field_ref = field_ref.clone();
        handles.push(tokio::spawn(async move { cache.get_entry(&field_ref).await }));
    }
    for handle in handles {
        let entry = handle.await.unwrap();
        assert_eq!(entry.unwrap().id, field_ref);
    }

    assert_eq!(source.fetch_count(), 1);
    assert_eq!(cache.stats().valid, 1);
}

#[tokio::test(start_paused = true)]
async fn expired_entry_is_refetched() {
    let (source, cache) = setup();
    source.insert(text_definition("door_style"));
    let field_ref = FieldRef::from("door_style");

    cache.get_entry(&field_ref).await;
    assert_eq!(source.fetch_count(), 1);

    // Within the TTL: still served from cache.
    tokio::time::sleep(Duration::from_secs(60)).await;
    cache.get_entry(&field_ref).await;
    assert_eq!(source.fetch_count(), 1);

    // Past the TTL: treated as invalid and fetched again.
    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    cache.get_entry(&field_ref).await;
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn sweep_removes_expired_but_spares_loading() {
    let (source, cache) = setup();
    source.insert(text_definition("fast"));
    source.insert(text_definition("slow"));

    cache.get_entry(&FieldRef::from("fast")).await;
    assert_eq!(cache.stats().valid, 1);

    // Start a fetch that stays in flight across the sweep.
    source.set_delay(Duration::from_secs(30 * 60));
    let slow = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get_entry(&FieldRef::from("slow")).await })
    };
    tokio::task::yield_now().await;
    assert_eq!(cache.stats().loading, 1);

    // Past the TTL the background sweep has run several times: the expired
    // entry is gone, the loading entry is untouched.
    tokio::time::sleep(Duration::from_secs(6 * 60)).await;
    let stats = cache.stats();
    assert_eq!(stats.valid, 0);
    assert_eq!(stats.expired, 0);
    assert_eq!(stats.loading, 1);

    // The in-flight fetch still completes for its waiters.
    let entry = slow.await.unwrap();
    assert_eq!(entry.unwrap().id, FieldRef::from("slow"));
}

#[tokio::test(start_paused = true)]
async fn failed_lookup_cached_as_empty_entry() {
    let (source, cache) = setup();
    let field_ref = FieldRef::from("broken");
    source.fail_ref(&field_ref);

    assert!(cache.get_entry(&field_ref).await.is_none());
    assert!(cache.get_entry(&field_ref).await.is_none());

    // The failure is cached; the source is not hammered.
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(cache.stats().valid, 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_reference_yields_none_without_error() {
    let (source, cache) = setup();
    assert!(cache.get_entry(&FieldRef::from("missing")).await.is_none());
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn get_entries_settles_every_reference() {
    let (source, cache) = setup();
    source.insert(text_definition("title"));
    source.insert(text_definition("width"));
    source.fail_ref(&FieldRef::from("broken"));

    let refs = [
        FieldRef::from("title"),
        FieldRef::from("width"),
        FieldRef::from("broken"),
    ];
    let entries = cache.get_entries(&refs).await;

    assert_eq!(entries.len(), 3);
    assert!(entries[&FieldRef::from("title")].is_some());
    assert!(entries[&FieldRef::from("width")].is_some());
    assert!(entries[&FieldRef::from("broken")].is_none());
}

#[tokio::test(start_paused = true)]
async fn preload_warms_only_missing_references() {
    let (source, cache) = setup();
    for field in ["title", "width", "height"] {
        source.insert(text_definition(field));
    }
    let title = FieldRef::from("title");
    let width = FieldRef::from("width");
    let height = FieldRef::from("height");

    cache.preload(&[title.clone(), width.clone()]).await;
    assert_eq!(source.fetch_count(), 2);

    // Already-valid entries are not fetched again.
    cache
        .preload(&[title.clone(), width.clone(), height.clone()])
        .await;
    assert_eq!(source.fetch_count(), 3);
    assert_eq!(source.fetches_for(&title), 1);
    assert_eq!(source.fetches_for(&height), 1);
}

#[tokio::test(start_paused = true)]
async fn clear_drops_all_entries() {
    let (source, cache) = setup();
    source.insert(text_definition("title"));
    let title = FieldRef::from("title");

    cache.get_entry(&title).await;
    cache.clear();
    assert_eq!(cache.stats(), formwork::CacheStats::default());

    cache.get_entry(&title).await;
    assert_eq!(source.fetch_count(), 2);
}
