//! Pure rendering of model templates against explicit bindings

use crate::bindings::Bindings;
use crate::error::{JinjaError, JinjaResult};
use crate::functions::{
    date_spine, make_config_fn, make_ref_fn, make_source_fn, make_var_fn, surrogate_key,
};
use minijinja::Environment;
use sluice_core::resolver::extract_references;
use sluice_core::sql_utils::quote_qualified;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Render a template to executable SQL.
///
/// `ref()` and `source()` calls become quoted relation names taken from
/// `bindings`; `config()` renders nothing. The result depends only on the
/// arguments.
///
/// Fails with [`JinjaError::UnboundReference`] before rendering when the
/// template names a relation that `bindings` does not carry.
pub fn render(template: &str, bindings: &Bindings) -> JinjaResult<String> {
    if let Some(missing) = extract_references(template)
        .into_iter()
        .find(|r| bindings.relation_for(r).is_none())
    {
        return Err(JinjaError::UnboundReference {
            reference: missing.to_string(),
        });
    }

    let shared = Arc::new(bindings.clone());
    let mut env = Environment::new();

    let models = Arc::clone(&shared);
    env.add_function(
        "ref",
        make_ref_fn(move |name: &str| models.model_relation(name).map(quote_qualified)),
    );
    let sources = Arc::clone(&shared);
    env.add_function(
        "source",
        make_source_fn(move |group: &str, table: &str| {
            sources.source_relation(group, table).map(quote_qualified)
        }),
    );
    env.add_function("config", make_config_fn(Arc::new(Mutex::new(HashMap::new()))));
    env.add_function("var", make_var_fn(shared.vars().clone()));
    env.add_function("surrogate_key", surrogate_key);
    env.add_function("date_spine", date_spine);

    Ok(env.render_str(template, ())?)
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
