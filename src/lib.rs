//! Personal carbon footprint estimation with a chat assistant.
//!
//! [`core`] holds the pure calculation engine (factor table, calculator,
//! comparator, tips, conversation state). [`assistant`] answers chat turns,
//! delegating to a language model from [`ai_provider`] when one is
//! configured and falling back to keyword replies otherwise.

pub mod ai_provider;
pub mod assistant;
pub mod config;
pub mod core;
pub mod report;

pub use assistant::Assistant;
pub use config::Config;
