use anyhow::Result;
use async_trait::async_trait;
use list_aggregator::adapters::FailingBackend;
use list_aggregator::config::AggregationConfig;
use list_aggregator::core::{DedupeState, List, ListStore, SectionScoper};
use list_aggregator::domain::model::ContentItem;
use list_aggregator::{
    AggregateRequest, AggregatorError, ListAggregator, ListSelector, MemoryContentBackend,
    MemoryDedupe, MemoryListStore, PassthroughScoper, SectionContext,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

type Aggregator = ListAggregator<MemoryListStore, PassthroughScoper, MemoryContentBackend>;

fn setup() -> (MemoryListStore, MemoryContentBackend, Aggregator) {
    let store = MemoryListStore::new();
    let backend = MemoryContentBackend::new();
    let aggregator = ListAggregator::new(store.clone(), PassthroughScoper, backend.clone());
    (store, backend, aggregator)
}

fn article(title: &str) -> ContentItem {
    ContentItem::new(
        serde_json::from_value(json!({
            "type": "article",
            "state": "Published",
            "shortTitle": title,
            "section": "news"
        }))
        .unwrap(),
    )
}

async fn manual_list(store: &MemoryListStore, articles: Vec<Value>) -> Result<String> {
    let list = json!({"type": "manual", "name": "manual", "articles": articles});
    Ok(store.create_from_json(&list.to_string()).await?)
}

fn refs(ids: &[&str]) -> Vec<Value> {
    ids.iter().map(|id| json!({"articleId": id})).collect()
}

fn identities(results: &[list_aggregator::ResolvedItem]) -> Vec<Option<&str>> {
    results.iter().map(|r| r.identity()).collect()
}

#[tokio::test]
async fn test_malformed_selector_returns_empty() -> Result<()> {
    let (_store, _backend, aggregator) = setup();

    let results = aggregator
        .aggregate(AggregateRequest::new(ListSelector::from_value(&json!({}))))
        .await?;

    assert!(results.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_list_contributes_nothing() -> Result<()> {
    let (store, backend, aggregator) = setup();
    let a = backend.insert(article("a")).await;
    let list_id = manual_list(&store, refs(&[&a])).await?;

    let results = aggregator
        .aggregate(AggregateRequest::new(vec![
            "missing".to_string(),
            list_id,
        ]))
        .await?;

    assert_eq!(identities(&results), vec![Some(a.as_str())]);
    Ok(())
}

#[tokio::test]
async fn test_lists_are_concatenated_in_input_order() -> Result<()> {
    let (store, backend, aggregator) = setup();
    let a = backend.insert(article("a")).await;
    let b = backend.insert(article("b")).await;
    let c = backend.insert(article("c")).await;

    let first = manual_list(&store, refs(&[&c, &a])).await?;
    let second = manual_list(&store, refs(&[&b])).await?;

    let results = aggregator
        .aggregate(AggregateRequest::new(vec![second, first]))
        .await?;

    assert_eq!(
        identities(&results),
        vec![Some(b.as_str()), Some(c.as_str()), Some(a.as_str())]
    );
    Ok(())
}

#[tokio::test]
async fn test_duplicate_list_ids_are_aggregated_once() -> Result<()> {
    let (store, backend, aggregator) = setup();
    let a = backend.insert(article("a")).await;
    let list_id = manual_list(&store, refs(&[&a])).await?;

    let results = aggregator
        .aggregate(AggregateRequest::new(
            ListSelector::from_value(&json!([list_id, list_id])),
        ))
        .await?;

    assert_eq!(results.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_dedupes_across_lists() -> Result<()> {
    let (store, backend, aggregator) = setup();
    let a = backend.insert(article("a")).await;
    let b = backend.insert(article("b")).await;

    let first = manual_list(&store, refs(&[&a, &b])).await?;
    let mut second_items = refs(&[&b]);
    second_items.push(json!({"type": "custom", "shortTitle": "custom"}));
    second_items.push(json!({"type": "custom", "shortTitle": "custom"}));
    let second = manual_list(&store, second_items).await?;

    let results = aggregator
        .aggregate(AggregateRequest::new(vec![first, second]))
        .await?;

    // 自訂項目永遠視為唯一
    assert_eq!(
        identities(&results),
        vec![Some(a.as_str()), Some(b.as_str()), None, None]
    );
    Ok(())
}

#[tokio::test]
async fn test_dedupe_state_excludes_seen_items_and_records_emitted() -> Result<()> {
    let (store, backend, aggregator) = setup();
    let a = backend.insert(article("a")).await;
    let b = backend.insert(article("b")).await;
    let list_id = manual_list(&store, refs(&[&a, &b])).await?;

    let dedupe = MemoryDedupe::new();
    dedupe.mark_seen(&a);

    let results = aggregator
        .aggregate(AggregateRequest::new(list_id.clone()).with_dedupe(&dedupe))
        .await?;
    assert_eq!(identities(&results), vec![Some(b.as_str())]);
    assert!(dedupe.has_seen(&b));

    // 第二次呼叫共用同一份狀態，不再輸出任何項目
    let again = aggregator
        .aggregate(AggregateRequest::new(list_id).with_dedupe(&dedupe))
        .await?;
    assert!(again.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_overall_limit_applies_after_dedupe() -> Result<()> {
    let (store, backend, aggregator) = setup();
    let a = backend.insert(article("a")).await;
    let b = backend.insert(article("b")).await;
    let c = backend.insert(article("c")).await;

    let first = manual_list(&store, refs(&[&a, &b])).await?;
    let second = manual_list(&store, refs(&[&a, &c])).await?;

    let results = aggregator
        .aggregate(AggregateRequest::new(vec![first, second]).with_limit(3))
        .await?;

    assert_eq!(
        identities(&results),
        vec![Some(a.as_str()), Some(b.as_str()), Some(c.as_str())]
    );
    Ok(())
}

#[tokio::test]
async fn test_config_supplies_default_limit() -> Result<()> {
    let (store, backend, aggregator) = setup();
    let aggregator = aggregator.with_config(AggregationConfig {
        overall_limit: Some(1),
        ..AggregationConfig::default()
    });
    let a = backend.insert(article("a")).await;
    let b = backend.insert(article("b")).await;
    let list_id = manual_list(&store, refs(&[&a, &b])).await?;

    let limited = aggregator
        .aggregate(AggregateRequest::new(list_id.clone()))
        .await?;
    assert_eq!(limited.len(), 1);

    let overridden = aggregator
        .aggregate(AggregateRequest::new(list_id).with_limit(5))
        .await?;
    assert_eq!(overridden.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_unsupported_list_type_fails_the_whole_call() -> Result<()> {
    let (store, backend, aggregator) = setup();
    let a = backend.insert(article("a")).await;
    let good = manual_list(&store, refs(&[&a])).await?;
    let bad = store
        .create_from_json(r#"{"type": "weird", "name": "bad"}"#)
        .await?;

    let err = aggregator
        .aggregate(AggregateRequest::new(vec![good, bad]))
        .await
        .unwrap_err();

    assert!(matches!(err, AggregatorError::UnsupportedListType { ref kind } if kind == "weird"));
    assert_eq!(err.to_string(), "Unsupported list type \"weird\"");
    Ok(())
}

#[tokio::test]
async fn test_backend_failure_propagates() -> Result<()> {
    let store = MemoryListStore::new();
    let aggregator = ListAggregator::new(
        store.clone(),
        PassthroughScoper,
        FailingBackend::new("connection reset"),
    );
    let list_id = store
        .create_from_json(r#"{"type": "auto", "name": "auto"}"#)
        .await?;

    let err = aggregator
        .aggregate(AggregateRequest::new(list_id))
        .await
        .unwrap_err();

    assert!(matches!(err, AggregatorError::BackendQueryFailed { .. }));
    Ok(())
}

/// 依區塊 id 限制自動清單的版面
struct SectionRestrictingScoper;

#[async_trait]
impl SectionScoper for SectionRestrictingScoper {
    async fn scope(
        &self,
        mut list: List,
        section: &SectionContext,
    ) -> list_aggregator::Result<List> {
        if let Some(id) = &section.id {
            list.filters.sections = vec![id.clone()];
        }
        Ok(list)
    }
}

#[tokio::test]
async fn test_section_scoper_narrows_auto_lists() -> Result<()> {
    let store = MemoryListStore::new();
    let backend = MemoryContentBackend::new();
    let aggregator = ListAggregator::new(store.clone(), SectionRestrictingScoper, backend.clone());

    backend.insert(article("news")).await;
    let mut sport = article("sport");
    sport.data.insert("section".to_string(), json!("sport"));
    let sport_id = backend.insert(sport).await;

    let list_id = store
        .create_from_json(r#"{"type": "auto", "name": "auto"}"#)
        .await?;

    let unscoped = aggregator
        .aggregate(AggregateRequest::new(list_id.clone()))
        .await?;
    assert_eq!(unscoped.len(), 2);

    let scoped = aggregator
        .aggregate(AggregateRequest::new(list_id).with_section(SectionContext::new("sport")))
        .await?;
    assert_eq!(identities(&scoped), vec![Some(sport_id.as_str())]);
    Ok(())
}

/// 所有清單都必須同時在查詢中才會繼續；指定的清單會最後完成
struct RendezvousListStore {
    inner: MemoryListStore,
    barrier: Arc<Barrier>,
    slow: String,
    completed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ListStore for RendezvousListStore {
    async fn get_list(&self, id: &str) -> list_aggregator::Result<Option<List>> {
        self.barrier.wait().await;
        if id == self.slow {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.completed.lock().unwrap().push(id.to_string());
        self.inner.get_list(id).await
    }
}

#[tokio::test]
async fn test_lists_run_concurrently_and_keep_input_order() -> Result<()> {
    let store = MemoryListStore::new();
    let backend = MemoryContentBackend::new();
    let a = backend.insert(article("a")).await;
    let b = backend.insert(article("b")).await;

    let first = manual_list(&store, refs(&[&a])).await?;
    let second = manual_list(&store, refs(&[&b])).await?;

    let completed = Arc::new(Mutex::new(Vec::new()));
    let aggregator = ListAggregator::new(
        RendezvousListStore {
            inner: store,
            barrier: Arc::new(Barrier::new(2)),
            slow: first.clone(),
            completed: completed.clone(),
        },
        PassthroughScoper,
        backend,
    );

    // 若逐一處理，第一個清單會永遠等在 barrier 上
    let results = tokio::time::timeout(
        Duration::from_secs(5),
        aggregator.aggregate(AggregateRequest::new(vec![first.clone(), second.clone()])),
    )
    .await??;

    assert_eq!(*completed.lock().unwrap(), vec![second, first]);
    assert_eq!(
        identities(&results),
        vec![Some(a.as_str()), Some(b.as_str())]
    );
    Ok(())
}
