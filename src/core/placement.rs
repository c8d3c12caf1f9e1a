use crate::core::visibility::is_visible;
use crate::domain::model::{ContentItem, CustomItem, ListItem};
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::collections::HashSet;

/// An entry of a manual list after custom items have been slotted in.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacedItem<'a> {
    Reference(ContentItem),
    Custom(&'a CustomItem),
}

/// Gives each visible custom item the slot it had in the descriptor sequence,
/// counting only descriptors that survived resolution.
///
/// References that were not resolved reserve no slot. Invisible custom items
/// are dropped and reserve no slot either.
pub fn custom_positions<'a>(
    resolved: &[ContentItem],
    items: &'a [ListItem],
    as_of: DateTime<Utc>,
) -> Vec<(usize, &'a CustomItem)> {
    let resolved_ids: HashSet<Cow<'_, str>> = resolved.iter().filter_map(ContentItem::id).collect();

    let mut positions = Vec::new();
    let mut position = 0;

    for item in items {
        match item {
            ListItem::Custom(custom) => {
                if !is_visible(&custom.window(), as_of) {
                    continue;
                }
                positions.push((position, custom));
                position += 1;
            }
            ListItem::Reference(reference) | ListItem::Overridden(reference) => {
                if resolved_ids.contains(reference.reference_id.as_str()) {
                    position += 1;
                }
            }
        }
    }

    positions
}

/// 將自訂項目插入到目標位置，其餘位置依序填入已取得的內容
///
/// `customs` must be ordered by descriptor order. When two custom items claim
/// the same slot the earlier one takes it and the later one takes the next slot.
pub fn merge_positions<'a>(
    resolved: Vec<ContentItem>,
    customs: &[(usize, &'a CustomItem)],
    limit: Option<usize>,
) -> Vec<PlacedItem<'a>> {
    let total = resolved.len() + customs.len();
    let length = limit.map_or(total, |limit| limit.min(total));

    let mut references = resolved.into_iter();
    let mut next_custom = 0;
    let mut placed = Vec::with_capacity(length);

    for index in 0..length {
        let claimed = customs
            .get(next_custom)
            .filter(|(target, _)| *target <= index);

        if let Some((_, custom)) = claimed {
            placed.push(PlacedItem::Custom(*custom));
            next_custom += 1;
            continue;
        }

        match references.next() {
            Some(item) => placed.push(PlacedItem::Reference(item)),
            None => {
                // 內容已用完，剩餘自訂項目依序補上
                if let Some((_, custom)) = customs.get(next_custom) {
                    placed.push(PlacedItem::Custom(*custom));
                    next_custom += 1;
                }
            }
        }
    }

    placed
}

pub fn place_custom_items<'a>(
    resolved: Vec<ContentItem>,
    items: &'a [ListItem],
    as_of: DateTime<Utc>,
    limit: Option<usize>,
) -> Vec<PlacedItem<'a>> {
    let customs = custom_positions(&resolved, items, as_of);
    tracing::debug!(
        "Placing {} custom items among {} references",
        customs.len(),
        resolved.len()
    );
    merge_positions(resolved, &customs, limit)
}
