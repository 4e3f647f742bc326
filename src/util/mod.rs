//! Terminal text helpers used by the renderer.

mod text;

pub use text::{display_width, sanitize, truncate_to_width};
