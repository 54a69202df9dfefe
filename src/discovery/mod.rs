//! Scenario discovery
//!
//! Locates feature files and selects scenarios by tag.

mod loader;
mod tags;

pub use loader::discover;
pub use tags::TagFilter;
