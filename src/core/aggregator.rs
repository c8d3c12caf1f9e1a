use crate::config::toml_config::AggregationConfig;
use crate::core::list_pipeline::ListPipeline;
use crate::core::projection::FieldSpec;
use crate::domain::model::{ListSelector, ResolvedItem, SectionContext};
use crate::domain::ports::{ContentBackend, DedupeState, ListStore, SectionScoper};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::collections::HashSet;

/// 一次聚合呼叫的參數
pub struct AggregateRequest<'a> {
    lists: ListSelector,
    dedupe: Option<&'a dyn DedupeState>,
    limit: Option<usize>,
    section: SectionContext,
    as_of: Option<DateTime<Utc>>,
    fields: Option<Vec<String>>,
}

impl<'a> AggregateRequest<'a> {
    pub fn new(lists: impl Into<ListSelector>) -> Self {
        Self {
            lists: lists.into(),
            dedupe: None,
            limit: None,
            section: SectionContext::default(),
            as_of: None,
            fields: None,
        }
    }

    pub fn with_dedupe(mut self, dedupe: &'a dyn DedupeState) -> Self {
        self.dedupe = Some(dedupe);
        self
    }

    /// Overall limit applied after dedupe.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_section(mut self, section: SectionContext) -> Self {
        self.section = section;
        self
    }

    pub fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// Merges the output of several lists into one deduplicated, limited feed.
pub struct ListAggregator<L: ListStore, S: SectionScoper, B: ContentBackend> {
    lists: L,
    scoper: S,
    backend: B,
    config: AggregationConfig,
}

impl<L: ListStore, S: SectionScoper, B: ContentBackend> ListAggregator<L, S, B> {
    pub fn new(lists: L, scoper: S, backend: B) -> Self {
        Self {
            lists,
            scoper,
            backend,
            config: AggregationConfig::default(),
        }
    }

    /// 以設定檔提供預設值；請求層級的選項仍優先
    pub fn with_config(mut self, config: AggregationConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn aggregate(&self, request: AggregateRequest<'_>) -> Result<Vec<ResolvedItem>> {
        let ids = request.lists.normalize();
        let limit = request.limit.or(self.config.overall_limit);
        let as_of = request.as_of.or(self.config.as_of);
        let fields =
            FieldSpec::from_option(request.fields.clone().or_else(|| self.config.fields.clone()));

        if ids.is_empty() {
            tracing::debug!("No list ids to aggregate");
            return Ok(Vec::new());
        }

        tracing::debug!("Aggregating lists {:?} (limit: {:?})", ids, limit);

        // 各清單並行處理，結果依輸入順序組合
        let tasks = ids
            .iter()
            .map(|id| self.aggregate_list(id, &request.section, &fields, as_of));
        let aggregations = try_join_all(tasks).await?;

        let total: usize = aggregations.iter().map(Vec::len).sum();
        let items = dedupe_items(aggregations.into_iter().flatten(), request.dedupe, limit);

        tracing::info!(
            "📊 Aggregated {} items from {} lists ({} before dedupe and limit)",
            items.len(),
            ids.len(),
            total
        );
        Ok(items)
    }

    async fn aggregate_list(
        &self,
        id: &str,
        section: &SectionContext,
        fields: &FieldSpec,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<ResolvedItem>> {
        let list = match self.lists.get_list(id).await? {
            Some(list) => list,
            None => {
                tracing::debug!("List '{}' not found, contributing nothing", id);
                return Ok(Vec::new());
            }
        };

        let list = self.scoper.scope(list, section).await?;

        ListPipeline::new(&self.backend)
            .with_fields(fields.clone())
            .with_as_of(as_of)
            .run(&list)
            .await
            .map_err(|e| {
                tracing::error!(
                    "❌ List '{}' failed: {} (Category: {:?})",
                    id,
                    e,
                    e.category()
                );
                e
            })
    }
}

/// Drops repeated identities within the call and, when a dedupe state is
/// supplied, identities it has already seen. Custom items are always kept.
/// Stops once `limit` items are collected; only emitted items are marked seen.
fn dedupe_items(
    items: impl IntoIterator<Item = ResolvedItem>,
    dedupe: Option<&dyn DedupeState>,
    limit: Option<usize>,
) -> Vec<ResolvedItem> {
    let mut seen = HashSet::new();
    let mut output = Vec::new();

    for item in items {
        if limit.is_some_and(|limit| output.len() >= limit) {
            break;
        }

        if let Some(identity) = item.identity() {
            if !seen.insert(identity.to_string()) {
                continue;
            }
            if let Some(state) = dedupe {
                if state.has_seen(identity) {
                    continue;
                }
                state.mark_seen(identity);
            }
        }

        output.push(item);
    }

    output
}
