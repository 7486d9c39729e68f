//! Application services - Use case implementations

mod collection_service;
mod health_service;

pub use collection_service::{CollectionService, CycleOutcome, CycleStage};
pub use health_service::{CollectorHealth, LocationHealth};
