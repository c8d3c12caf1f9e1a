pub mod aggregator;
pub mod list_pipeline;
pub mod placement;
pub mod projection;
pub mod query;
pub mod resolver;
pub mod visibility;

pub use crate::domain::model::{ContentItem, List, ListItem, ResolvedItem};
pub use crate::domain::ports::{ContentBackend, DedupeState, ListStore, SectionScoper};
pub use crate::utils::error::Result;
