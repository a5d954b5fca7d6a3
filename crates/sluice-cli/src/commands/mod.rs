//! CLI command implementations

pub(crate) mod build;
pub(crate) mod common;
pub(crate) mod compile;
pub(crate) mod ls;
pub(crate) mod output;
pub(crate) mod run;
pub(crate) mod test;
