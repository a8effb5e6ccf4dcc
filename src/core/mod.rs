//! Core module - fundamental types and utilities

pub mod address;
pub mod config;
pub mod entity;
pub mod identity;
pub mod loader;
pub mod project;
pub mod records;
pub mod repository;
pub mod shortid;
pub mod subscription;

pub use address::{AddressError, AddressResolver, OfflineAddressResolver};
pub use config::{Config, Preferences};
pub use entity::Entity;
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use project::{Project, ProjectError};
pub use records::{
    Confidence, Enrichment, EnrichmentUnavailable, NoEnrichment, RecordEnricher, RecordFileEnricher,
};
pub use repository::{
    FilePropertyStore, MemoryPropertyStore, PersistenceError, PropertyRepository,
};
pub use shortid::ShortIdIndex;
pub use subscription::{
    FileSubscription, MemorySubscription, Subscription, SubscriptionError, SubscriptionService,
    TierChangeRecord,
};
