//! Client-side data layer for a chronological feed annotated with
//! best-effort provenance trust badges.
//!
//! - [`feed`] loads the ordered item list
//! - [`provenance`] derives source keys and caches badges per source
//! - [`presenter`] turns an item into display state
//! - [`theme`] resolves and tracks the light/dark theme
//! - [`app`] ties them together into a mountable view session

pub mod app;
pub mod config;
pub mod feed;
pub mod http;
pub mod presenter;
pub mod provenance;
pub mod render;
pub mod theme;
pub mod util;
