use crate::core::placement::{place_custom_items, PlacedItem};
use crate::core::projection::{apply_overrides, project, FieldSpec};
use crate::core::query::{build_query, ListQuery};
use crate::core::resolver::resolve_references;
use crate::domain::model::{
    ContentItem, Fields, ItemOrigin, List, ListItem, ListKind, ResolvedItem,
};
use crate::domain::ports::ContentBackend;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};

/// Aggregates a single list: query, resolve, place custom items, override and project.
pub struct ListPipeline<'a, B: ContentBackend + ?Sized> {
    backend: &'a B,
    fields: FieldSpec,
    as_of: Option<DateTime<Utc>>,
}

impl<'a, B: ContentBackend + ?Sized> ListPipeline<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            fields: FieldSpec::Default,
            as_of: None,
        }
    }

    pub fn with_fields(mut self, fields: FieldSpec) -> Self {
        self.fields = fields;
        self
    }

    /// 指定評估時間；未指定時使用目前時間
    pub fn with_as_of(mut self, as_of: Option<DateTime<Utc>>) -> Self {
        self.as_of = as_of;
        self
    }

    pub async fn run(&self, list: &List) -> Result<Vec<ResolvedItem>> {
        let as_of = self.as_of.unwrap_or_else(Utc::now);

        let query = build_query(list, &self.fields, self.as_of)?;
        let raw = self.extract(&query).await?;
        tracing::debug!("📥 List '{}': backend returned {} items", list.name, raw.len());

        let results = match list.kind {
            ListKind::Manual => {
                let resolved =
                    resolve_references(self.backend, raw, &list.items, as_of).await?;
                tracing::debug!(
                    "🔄 List '{}': resolved {} of {} descriptors",
                    list.name,
                    resolved.len(),
                    list.items.len()
                );

                let placed = place_custom_items(resolved, &list.items, as_of, list.limit);
                self.prepare(placed, &list.items)
            }
            _ => {
                let limit = list.limit.unwrap_or(raw.len());
                let placed = raw
                    .into_iter()
                    .take(limit)
                    .map(PlacedItem::Reference)
                    .collect();
                self.prepare(placed, &[])
            }
        };

        tracing::debug!("✅ List '{}': {} items aggregated", list.name, results.len());
        Ok(results)
    }

    async fn extract(&self, query: &ListQuery) -> Result<Vec<ContentItem>> {
        self.backend.query_public(query).await
    }

    /// 套用覆寫後再做欄位投影
    fn prepare(&self, placed: Vec<PlacedItem<'_>>, items: &[ListItem]) -> Vec<ResolvedItem> {
        placed
            .into_iter()
            .map(|entry| match entry {
                PlacedItem::Reference(content) => self.prepare_reference(content, items),
                PlacedItem::Custom(custom) => ResolvedItem {
                    origin: ItemOrigin::Custom,
                    data: project(&custom.data, &self.fields),
                },
            })
            .collect()
    }

    fn prepare_reference(&self, content: ContentItem, items: &[ListItem]) -> ResolvedItem {
        let identity = content.id().map(|id| id.into_owned());
        let overrides = identity.as_deref().and_then(|id| find_overrides(items, id));
        let origin = match identity {
            Some(id) => ItemOrigin::Reference(id),
            None => ItemOrigin::Custom,
        };

        let data = match overrides {
            Some(overrides) => project(&apply_overrides(&content.data, overrides), &self.fields),
            None => project(&content.data, &self.fields),
        };

        ResolvedItem { origin, data }
    }
}

fn find_overrides<'a>(items: &'a [ListItem], id: &str) -> Option<&'a Fields> {
    items
        .iter()
        .find(|item| item.reference_id() == Some(id))
        .and_then(ListItem::overrides)
}
