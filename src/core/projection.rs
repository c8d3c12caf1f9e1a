use crate::domain::model::{Fields, ID_FIELD};

/// 預設輸出欄位
pub const DEFAULT_FIELDS: [&str; 16] = [
    "id",
    "type",
    "shortTitle",
    "longTitle",
    "subTitle",
    "crops",
    "displayPath",
    "liteSection",
    "displayDate",
    "showDisplayDate",
    "tags",
    "images",
    "downloads",
    "commentCount",
    "viewCount",
    "standfirst",
];

/// Which fields survive projection. The identity field is always kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldSpec {
    #[default]
    Default,
    Only(Vec<String>),
}

impl FieldSpec {
    pub fn from_option(fields: Option<Vec<String>>) -> Self {
        fields.map(Self::Only).unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Default => DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            Self::Only(fields) => {
                let mut names = fields.clone();
                if !names.iter().any(|f| f == ID_FIELD) {
                    names.push(ID_FIELD.to_string());
                }
                names
            }
        }
    }

    fn keeps(&self, key: &str) -> bool {
        if key == ID_FIELD {
            return true;
        }
        match self {
            Self::Default => DEFAULT_FIELDS.contains(&key),
            Self::Only(fields) => fields.iter().any(|f| f == key),
        }
    }
}

/// Returns a new map where each override replaces a field the item already has.
/// Overrides for fields the item lacks are ignored.
pub fn apply_overrides(item: &Fields, overrides: &Fields) -> Fields {
    let mut result = item.clone();
    for (key, value) in overrides {
        if let Some(slot) = result.get_mut(key) {
            *slot = value.clone();
        }
    }
    result
}

pub fn project(item: &Fields, spec: &FieldSpec) -> Fields {
    item.iter()
        .filter(|(key, _)| spec.keeps(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
