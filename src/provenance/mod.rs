//! Provenance service integration: source keys, trust badges, and links.
//!
//! - [`types`] - `SourceKey`, `Grade`, `SourceBadge`
//! - [`client`] - HTTP client for the badge endpoints
//! - [`cache`] - `BadgeCache`, the coalescing TTL cache in front of the client
//! - [`links`] - navigation URLs into the provenance UI

mod cache;
mod client;
mod links;
mod types;

pub use cache::{BadgeCache, EntryStatus, BADGE_TTL};
pub use client::ProvenanceClient;
pub use links::{LinkStyle, ProvenanceLinks};
pub use types::{Grade, SourceBadge, SourceKey};
