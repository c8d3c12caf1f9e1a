use crate::core::visibility::is_visible;
use crate::domain::model::{ContentItem, ListItem};
use crate::domain::ports::ContentBackend;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::collections::HashMap;

/// Turns the bulk query results of a manual list into the ordered sequence of
/// referenced items.
///
/// Plain references are taken from `raw` when present (anything missing was
/// filtered out by the backend). Overridden references are re-checked against
/// their own window and, when visible, fetched one by one. Fetches run
/// sequentially in descriptor order; the first failure aborts the whole list.
pub async fn resolve_references<B: ContentBackend + ?Sized>(
    backend: &B,
    raw: Vec<ContentItem>,
    items: &[ListItem],
    as_of: DateTime<Utc>,
) -> Result<Vec<ContentItem>> {
    let by_id: HashMap<Cow<'_, str>, &ContentItem> = raw
        .iter()
        .filter_map(|item| item.id().map(|id| (id, item)))
        .collect();

    let mut resolved = Vec::with_capacity(items.len());

    for item in items {
        match item {
            ListItem::Reference(reference) => {
                if let Some(found) = by_id.get(reference.reference_id.as_str()) {
                    resolved.push((*found).clone());
                } else {
                    tracing::debug!(
                        "Reference '{}' not in query results, skipping",
                        reference.reference_id
                    );
                }
            }
            ListItem::Overridden(reference) => {
                if !is_visible(&reference.window(), as_of) {
                    tracing::debug!(
                        "Overridden reference '{}' not visible at {}, skipping",
                        reference.reference_id,
                        as_of
                    );
                    continue;
                }

                // 覆寫可能改變可見性，需單獨取回完整內容
                match backend.fetch_by_id(&reference.reference_id).await? {
                    Some(found) => resolved.push(found),
                    None => tracing::debug!(
                        "Overridden reference '{}' not found",
                        reference.reference_id
                    ),
                }
            }
            ListItem::Custom(_) => {}
        }
    }

    Ok(resolved)
}
