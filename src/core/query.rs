use crate::core::projection::FieldSpec;
use crate::domain::model::{ContentItem, List, ListItem, ListKind, ID_FIELD};
use crate::utils::error::{AggregatorError, Result};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    fn new(field: &str, direction: SortDirection) -> Self {
        Self {
            field: field.to_string(),
            direction,
        }
    }
}

/// 自動清單的排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    Recent,
    MostComments,
    Popular,
    Alphabetical,
    EventDate,
    ExpiryDate,
}

impl ListOrder {
    pub fn parse(order: &str) -> Option<Self> {
        match order {
            "recent" => Some(Self::Recent),
            "most comments" => Some(Self::MostComments),
            "popular" => Some(Self::Popular),
            "alphabetical" => Some(Self::Alphabetical),
            "event date" => Some(Self::EventDate),
            "expiry date" => Some(Self::ExpiryDate),
            _ => None,
        }
    }

    pub fn sort_spec(self) -> SortSpec {
        match self {
            Self::Recent => SortSpec::new("displayDate", SortDirection::Desc),
            Self::MostComments => SortSpec::new("commentCount", SortDirection::Desc),
            Self::Popular => SortSpec::new("viewCount", SortDirection::Desc),
            Self::Alphabetical => SortSpec::new("shortTitle", SortDirection::Asc),
            Self::EventDate => SortSpec::new("eventDate", SortDirection::Asc),
            Self::ExpiryDate => SortSpec::new("expiryDate", SortDirection::Desc),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterClause {
    /// Field value (or any element of an array value) is one of `values`.
    /// An empty set matches nothing.
    In { field: String, values: Vec<String> },
    Eq { field: String, value: String },
}

impl FilterClause {
    pub fn matches(&self, item: &ContentItem) -> bool {
        match self {
            Self::In { field, values } => match item.get(field) {
                Some(serde_json::Value::Array(elements)) => elements
                    .iter()
                    .any(|element| value_in(element, values)),
                Some(value) => value_in(value, values),
                None => false,
            },
            Self::Eq { field, value } => item
                .get(field)
                .map(|v| value_in(v, std::slice::from_ref(value)))
                .unwrap_or(false),
        }
    }
}

fn value_in(value: &serde_json::Value, values: &[String]) -> bool {
    match value {
        serde_json::Value::String(s) => values.iter().any(|v| v == s),
        serde_json::Value::Number(n) => values.iter().any(|v| *v == n.to_string()),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub sort: Option<SortSpec>,
    pub limit: Option<usize>,
    pub fields: Vec<String>,
    pub as_of: Option<DateTime<Utc>>,
}

/// Backend-agnostic query descriptor. Clauses are ANDed together.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filter: Vec<FilterClause>,
    pub options: QueryOptions,
}

impl ListQuery {
    pub fn matches(&self, item: &ContentItem) -> bool {
        self.filter.iter().all(|clause| clause.matches(item))
    }
}

/// 將清單規則轉成查詢描述
pub fn build_query(
    list: &List,
    fields: &FieldSpec,
    as_of: Option<DateTime<Utc>>,
) -> Result<ListQuery> {
    let (filter, sort) = match &list.kind {
        ListKind::Auto => (auto_filter(list), list.order.as_deref().and_then(ListOrder::parse)),
        ListKind::Manual => (manual_filter(&list.items), None),
        ListKind::Unsupported(kind) => {
            return Err(AggregatorError::UnsupportedListType { kind: kind.clone() })
        }
    };

    let query = ListQuery {
        filter,
        options: QueryOptions {
            sort: sort.map(ListOrder::sort_spec),
            limit: list.limit,
            fields: fields.names(),
            as_of,
        },
    };

    tracing::debug!("Built query for list '{}': {:?}", list.name, query);
    Ok(query)
}

fn auto_filter(list: &List) -> Vec<FilterClause> {
    let rules = &list.filters;
    let mut filter = Vec::new();

    let in_rules = [
        ("tags", &rules.tags),
        ("section", &rules.sections),
        ("type", &rules.article_types),
        ("subType", &rules.article_sub_types),
    ];

    for (field, values) in in_rules {
        if !values.is_empty() {
            filter.push(FilterClause::In {
                field: field.to_string(),
                values: values.clone(),
            });
        }
    }

    if let Some(secondary_type) = rules.secondary_type.as_deref().filter(|s| !s.is_empty()) {
        filter.push(FilterClause::Eq {
            field: "secondaryType".to_string(),
            value: secondary_type.to_string(),
        });
    }

    filter
}

/// 只查詢非自訂項目的 id；id 集合為空時不會匹配任何內容
fn manual_filter(items: &[ListItem]) -> Vec<FilterClause> {
    let values = items
        .iter()
        .filter_map(ListItem::reference_id)
        .map(str::to_string)
        .collect();

    vec![FilterClause::In {
        field: ID_FIELD.to_string(),
        values,
    }]
}
