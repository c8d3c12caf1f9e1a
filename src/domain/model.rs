use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// 內容欄位（鍵值對）
pub type Fields = HashMap<String, serde_json::Value>;

/// Identity key of a persisted content item.
pub const ID_FIELD: &str = "id";

pub const LIVE_DATE_FIELD: &str = "liveDate";
pub const EXPIRY_DATE_FIELD: &str = "expiryDate";

/// A content item as stored by the backend. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentItem {
    pub data: Fields,
}

impl ContentItem {
    pub fn new(data: Fields) -> Self {
        Self { data }
    }

    pub fn id(&self) -> Option<Cow<'_, str>> {
        self.data.get(ID_FIELD).and_then(identity_value)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }
}

/// 識別值：字串原樣使用，數字轉為十進位字串
pub fn identity_value(value: &serde_json::Value) -> Option<Cow<'_, str>> {
    match value {
        serde_json::Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        serde_json::Value::Number(n) => Some(Cow::Owned(n.to_string())),
        _ => None,
    }
}

/// `null` deserializes to the type's default, same as an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 可見時間窗：`[liveDate, expiryDate]`，任一端缺少即視為無界
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityWindow {
    pub live_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl VisibilityWindow {
    pub fn new(live_date: Option<DateTime<Utc>>, expiry_date: Option<DateTime<Utc>>) -> Self {
        Self {
            live_date,
            expiry_date,
        }
    }

    pub fn from_fields(fields: &Fields) -> Self {
        Self {
            live_date: date_field(fields, LIVE_DATE_FIELD),
            expiry_date: date_field(fields, EXPIRY_DATE_FIELD),
        }
    }
}

/// Reads an RFC3339 date field. Null, absent and unparseable values all map to `None`.
pub fn date_field(fields: &Fields, key: &str) -> Option<DateTime<Utc>> {
    match fields.get(key)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(date) => Some(date.with_timezone(&Utc)),
            Err(e) => {
                tracing::warn!("Ignoring unparseable {} '{}': {}", key, s, e);
                None
            }
        },
        other => {
            tracing::warn!("Ignoring non-string {}: {}", key, other);
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListKind {
    Auto,
    Manual,
    Unsupported(String),
}

impl From<String> for ListKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "auto" => Self::Auto,
            "manual" => Self::Manual,
            _ => Self::Unsupported(value),
        }
    }
}

impl<'de> Deserialize<'de> for ListKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from(value.unwrap_or_default()))
    }
}

impl Default for ListKind {
    fn default() -> Self {
        Self::Unsupported(String::new())
    }
}

/// Auto list rules. Empty arrays impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilters {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sections: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub article_types: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub article_sub_types: Vec<String>,
    #[serde(default)]
    pub secondary_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    #[serde(default, alias = "_id", deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(rename = "type", alias = "kind", default)]
    pub kind: ListKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// `None` 代表不限數量
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(flatten)]
    pub filters: ListFilters,
    #[serde(
        default,
        rename = "articles",
        alias = "items",
        deserialize_with = "null_as_default"
    )]
    pub items: Vec<ListItem>,
}

/// A reference from a manual list to a persisted item.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceItem {
    pub reference_id: String,
    pub overrides: Fields,
}

impl ReferenceItem {
    pub fn new(reference_id: impl Into<String>) -> Self {
        Self {
            reference_id: reference_id.into(),
            overrides: Fields::new(),
        }
    }

    pub fn with_override(mut self, key: &str, value: serde_json::Value) -> Self {
        self.overrides.insert(key.to_string(), value);
        self
    }

    /// Window after the overrides are taken into account.
    pub fn window(&self) -> VisibilityWindow {
        VisibilityWindow::from_fields(&self.overrides)
    }
}

/// 手動清單中的自訂項目（沒有對應的持久化內容）
#[derive(Debug, Clone, PartialEq)]
pub struct CustomItem {
    pub data: Fields,
}

impl CustomItem {
    pub fn new(data: Fields) -> Self {
        Self { data }
    }

    pub fn window(&self) -> VisibilityWindow {
        VisibilityWindow::from_fields(&self.data)
    }
}

/// A manual list entry, classified once when the list is read.
#[derive(Debug, Clone, PartialEq)]
pub enum ListItem {
    /// Satisfied from the bulk query results.
    Reference(ReferenceItem),
    /// Carries overrides that may move its visibility window; re-checked and fetched on its own.
    Overridden(ReferenceItem),
    Custom(CustomItem),
}

const REFERENCE_KEYS: [&str; 2] = ["articleId", "referenceId"];
const CUSTOM_ID_KEY: &str = "customId";
const OVERRIDE_FIELDS_KEY: &str = "overrideFields";

impl ListItem {
    pub fn reference_id(&self) -> Option<&str> {
        match self {
            Self::Reference(item) | Self::Overridden(item) => Some(&item.reference_id),
            Self::Custom(_) => None,
        }
    }

    pub fn overrides(&self) -> Option<&Fields> {
        match self {
            Self::Reference(item) | Self::Overridden(item) => Some(&item.overrides),
            Self::Custom(_) => None,
        }
    }
}

impl From<Fields> for ListItem {
    fn from(mut data: Fields) -> Self {
        let is_custom_type = data.get("type").and_then(|v| v.as_str()) == Some("custom");

        let reference_id = REFERENCE_KEYS
            .iter()
            .filter_map(|key| data.get(*key))
            .find_map(|value| identity_value(value).map(Cow::into_owned));

        let reference_id = match reference_id {
            Some(id) if !is_custom_type => id,
            _ => return Self::Custom(CustomItem::new(data)),
        };

        let overridden = matches!(data.get(CUSTOM_ID_KEY), Some(serde_json::Value::Null));

        for key in REFERENCE_KEYS.iter().chain(std::iter::once(&CUSTOM_ID_KEY)) {
            data.remove(*key);
        }

        if let Some(serde_json::Value::Object(nested)) = data.remove(OVERRIDE_FIELDS_KEY) {
            data.extend(nested);
        }

        let item = ReferenceItem {
            reference_id,
            overrides: data,
        };

        if overridden {
            Self::Overridden(item)
        } else {
            Self::Reference(item)
        }
    }
}

impl<'de> Deserialize<'de> for ListItem {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Fields::deserialize(deserializer).map(Self::from)
    }
}

/// 產生來源：持久化內容或自訂項目
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOrigin {
    Reference(String),
    Custom,
}

/// An item after overrides and projection; the unit emitted by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedItem {
    #[serde(skip)]
    pub origin: ItemOrigin,
    #[serde(flatten)]
    pub data: Fields,
}

impl ResolvedItem {
    /// Dedupe identity. Custom items have none and are always unique.
    pub fn identity(&self) -> Option<&str> {
        match &self.origin {
            ItemOrigin::Reference(id) => Some(id),
            ItemOrigin::Custom => None,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.origin == ItemOrigin::Custom
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }
}

/// Opaque section-scoping context handed to the `SectionScoper`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionContext {
    pub id: Option<String>,
    pub data: Fields,
}

impl SectionContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            data: Fields::new(),
        }
    }
}

/// 清單選擇：單一 id、多個 id，或無法辨識的輸入（視為空）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSelector {
    ids: Vec<String>,
}

impl ListSelector {
    pub fn from_value(value: &serde_json::Value) -> Self {
        let ids = match value {
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|item| identity_value(item).map(Cow::into_owned))
                .collect(),
            other => identity_value(other).map(Cow::into_owned).into_iter().collect(),
        };
        Self { ids }
    }

    /// Ids in input order with duplicates removed.
    pub fn normalize(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut ids = Vec::new();
        for id in &self.ids {
            if seen.insert(id.as_str()) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

impl From<&str> for ListSelector {
    fn from(id: &str) -> Self {
        Self {
            ids: vec![id.to_string()],
        }
    }
}

impl From<String> for ListSelector {
    fn from(id: String) -> Self {
        Self { ids: vec![id] }
    }
}

impl From<Vec<String>> for ListSelector {
    fn from(ids: Vec<String>) -> Self {
        Self { ids }
    }
}

impl From<&[&str]> for ListSelector {
    fn from(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|id| id.to_string()).collect(),
        }
    }
}
