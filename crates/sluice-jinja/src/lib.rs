//! sluice-jinja - templating layer for Sluice
//!
//! Two entry points:
//!
//! - [`render`] turns a model template into executable SQL. Every `ref()` and
//!   `source()` call is answered from an explicit [`Bindings`] value, never from
//!   ambient state.
//! - [`JinjaEnvironment`] renders in parse mode, where references echo their
//!   names and `config(...)` calls are captured so the loader can merge them
//!   over YAML config.
//!
//! Both expose `var()`, `surrogate_key()` and `date_spine()`.

pub mod bindings;
pub mod environment;
pub mod error;
pub mod functions;
pub mod render;

pub use bindings::Bindings;
pub use environment::JinjaEnvironment;
pub use error::{JinjaError, JinjaResult};
pub use render::render;
