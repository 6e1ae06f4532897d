//! Topic-to-Manim-script generation.
//!
//! A topic is turned into a runnable Manim scene by a schema-constrained model
//! call, then validated, repaired, re-indented and paced toward a target
//! runtime. Finished scripts are cached by topic.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod schema;
pub mod script;

pub use api::{BackendError, GenerationBackend, OpenRouterClient};
pub use cache::{CacheEntry, CacheStore, FileCache, MemoryCache};
pub use config::Config;
pub use error::{Result, ScriptError, Stage};
pub use generation::ConstrainedGenerator;
pub use pipeline::ScriptPipeline;
pub use schema::OutputSchema;
pub use script::{DurationBalancer, PacingPolicy, RepairEngine, ScriptProcessor};
