//! Batch job ranking verified users by the total reach (likes + retweets)
//! of their posts, built on Polars.

pub mod config;
pub mod context;
pub mod error;
pub mod loader;
pub mod location;
pub mod logging;
pub mod pipeline;
pub mod stages;
pub mod writer;

pub use config::PipelineConfig;
pub use context::ExecutionContext;
pub use error::{PipelineError, Result};
pub use location::Location;
pub use pipeline::{run, Pipeline, RunSummary};
