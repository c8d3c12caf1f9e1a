pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::{MemoryContentBackend, MemoryDedupe, MemoryListStore, PassthroughScoper};
pub use crate::config::AggregatorConfig;
pub use crate::core::{
    aggregator::{AggregateRequest, ListAggregator},
    projection::FieldSpec,
    visibility::is_visible,
};
pub use crate::domain::model::{ListSelector, ResolvedItem, SectionContext};
pub use crate::utils::error::{AggregatorError, Result};
