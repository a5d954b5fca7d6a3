//! sluice-test - data-quality assertions for Sluice
//!
//! The generator turns declared tests into [`Assertion`]s, each a query that
//! returns violating rows. The runner executes them against whatever was
//! materialized and reports pass, fail, skip or error per assertion.

pub mod generator;
pub mod runner;

pub use generator::{
    generate_assertions, generate_schema_assertion, generate_singular_assertion,
    generate_source_assertion, Assertion, AssertionKind, TestGenError, TestGenResult,
};
pub use runner::{AssertionResult, AssertionStatus, SkipReason, TestRunner, TestSummary};
