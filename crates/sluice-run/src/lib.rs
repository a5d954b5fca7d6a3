//! sluice-run - execution engine for Sluice
//!
//! [`Pipeline::prepare`] performs every configuration-time check (registry,
//! reference resolution, cycle detection) before touching the database. Only
//! a prepared pipeline can [`run`](Pipeline::run), which hands ready models to
//! a bounded worker pool that materializes them through [`Materializer`].

pub mod compile;
pub mod error;
pub mod materialize;
pub mod pipeline;
pub mod project;
pub mod report;
pub mod scheduler;

pub use compile::{CompiledModel, Manifest};
pub use error::{MaterializeCause, RunError, RunResult};
pub use materialize::{Materializer, RelationHandle};
pub use pipeline::{Pipeline, RunOptions};
pub use report::{ModelSummary, RunReport};
pub use scheduler::{ModelResult, ModelStatus, NoopObserver, RunObserver, Scheduler};
