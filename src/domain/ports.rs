use crate::core::query::ListQuery;
use crate::domain::model::{ContentItem, List, SectionContext};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 內容後端：負責發佈狀態與預設可見性過濾
#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Runs a query over publicly visible content, honoring sort, limit and fields.
    async fn query_public(&self, query: &ListQuery) -> Result<Vec<ContentItem>>;

    /// Full item by identity, regardless of its own visibility window.
    async fn fetch_by_id(&self, id: &str) -> Result<Option<ContentItem>>;
}

#[async_trait]
pub trait ListStore: Send + Sync {
    async fn get_list(&self, id: &str) -> Result<Option<List>>;
}

/// Narrows a list's rules for a section before it is aggregated.
#[async_trait]
pub trait SectionScoper: Send + Sync {
    async fn scope(&self, list: List, section: &SectionContext) -> Result<List>;
}

/// Cross-call dedupe capability owned by the caller.
///
/// Implementations must tolerate concurrent calls when shared between aggregations.
pub trait DedupeState: Send + Sync {
    fn has_seen(&self, identity: &str) -> bool;
    fn mark_seen(&self, identity: &str);
}
