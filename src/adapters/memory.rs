use crate::core::query::{ListQuery, SortDirection, SortSpec};
use crate::core::visibility::is_visible;
use crate::domain::model::{ContentItem, List, SectionContext, VisibilityWindow, ID_FIELD};
use crate::domain::ports::{ContentBackend, DedupeState, ListStore, SectionScoper};
use crate::utils::error::{AggregatorError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, PoisonError};
use tokio::sync::Mutex;

pub const STATE_FIELD: &str = "state";
pub const PUBLISHED_STATE: &str = "Published";

/// 記憶體內容後端
#[derive(Debug, Clone, Default)]
pub struct MemoryContentBackend {
    items: Arc<Mutex<Vec<ContentItem>>>,
}

impl MemoryContentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON array of content objects.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let items: Vec<ContentItem> = serde_json::from_str(content)?;
        Ok(Self {
            items: Arc::new(Mutex::new(items)),
        })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Stores an item, assigning an id when it has none. Returns the id.
    pub async fn insert(&self, mut item: ContentItem) -> String {
        let mut items = self.items.lock().await;
        let existing = item.id().map(|id| id.into_owned());
        let id = match existing {
            Some(id) => id,
            None => {
                let id = format!("article-{}", items.len());
                item.data
                    .insert(ID_FIELD.to_string(), serde_json::Value::String(id.clone()));
                id
            }
        };
        items.push(item);
        id
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

fn is_published(item: &ContentItem) -> bool {
    item.get(STATE_FIELD).and_then(|v| v.as_str()) == Some(PUBLISHED_STATE)
}

fn compare_values(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> Ordering {
    use serde_json::Value;

    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// 穩定排序；缺少排序欄位的項目排在最後
fn sort_items(items: &mut [ContentItem], sort: &SortSpec) {
    items.sort_by(|a, b| {
        let (a_val, b_val) = (a.get(&sort.field), b.get(&sort.field));
        match (a_val, b_val, sort.direction) {
            (Some(_), Some(_), SortDirection::Desc) => compare_values(b_val, a_val),
            _ => compare_values(a_val, b_val),
        }
    });
}

fn project_fields(item: &ContentItem, fields: &[String]) -> ContentItem {
    let data = item
        .data
        .iter()
        .filter(|(key, _)| key.as_str() == ID_FIELD || fields.iter().any(|f| f == *key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    ContentItem::new(data)
}

#[async_trait]
impl ContentBackend for MemoryContentBackend {
    async fn query_public(&self, query: &ListQuery) -> Result<Vec<ContentItem>> {
        let as_of = query.options.as_of.unwrap_or_else(Utc::now);
        let items = self.items.lock().await;

        let mut matched: Vec<ContentItem> = items
            .iter()
            .filter(|item| is_published(item))
            .filter(|item| is_visible(&VisibilityWindow::from_fields(&item.data), as_of))
            .filter(|item| query.matches(item))
            .cloned()
            .collect();

        if let Some(sort) = &query.options.sort {
            sort_items(&mut matched, sort);
        }

        if let Some(limit) = query.options.limit {
            matched.truncate(limit);
        }

        Ok(matched
            .iter()
            .map(|item| project_fields(item, &query.options.fields))
            .collect())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<ContentItem>> {
        let items = self.items.lock().await;
        Ok(items.iter().find(|item| item.id().as_deref() == Some(id)).cloned())
    }
}

/// 記憶體清單儲存
#[derive(Debug, Clone, Default)]
pub struct MemoryListStore {
    lists: Arc<Mutex<HashMap<String, List>>>,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a list under a generated id (`_0`, `_1`, ...) and returns it.
    pub async fn create(&self, mut list: List) -> String {
        let mut lists = self.lists.lock().await;
        let id = format!("_{}", lists.len());
        list.id = id.clone();
        lists.insert(id.clone(), list);
        id
    }

    /// Parses a list from its JSON representation and stores it.
    pub async fn create_from_json(&self, content: &str) -> Result<String> {
        let list: List = serde_json::from_str(content)?;
        Ok(self.create(list).await)
    }
}

#[async_trait]
impl ListStore for MemoryListStore {
    async fn get_list(&self, id: &str) -> Result<Option<List>> {
        Ok(self.lists.lock().await.get(id).cloned())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughScoper;

#[async_trait]
impl SectionScoper for PassthroughScoper {
    async fn scope(&self, list: List, _section: &SectionContext) -> Result<List> {
        Ok(list)
    }
}

/// Dedupe state backed by a shared set; safe to share between concurrent calls.
#[derive(Debug, Default)]
pub struct MemoryDedupe {
    seen: std::sync::Mutex<HashSet<String>>,
}

impl MemoryDedupe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DedupeState for MemoryDedupe {
    fn has_seen(&self, identity: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(identity)
    }

    fn mark_seen(&self, identity: &str) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity.to_string());
    }
}

/// 後端錯誤注入，用於測試失敗傳遞
#[derive(Debug, Clone, Default)]
pub struct FailingBackend {
    message: String,
}

impl FailingBackend {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ContentBackend for FailingBackend {
    async fn query_public(&self, _query: &ListQuery) -> Result<Vec<ContentItem>> {
        Err(AggregatorError::backend(self.message.clone()))
    }

    async fn fetch_by_id(&self, _id: &str) -> Result<Option<ContentItem>> {
        Err(AggregatorError::backend(self.message.clone()))
    }
}
