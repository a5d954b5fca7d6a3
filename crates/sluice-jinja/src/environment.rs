//! Parse-mode environment used while loading models
//!
//! References render as their bare names and `config(...)` calls are captured,
//! so a template can be inspected without knowing any relation.

use crate::error::{JinjaError, JinjaResult};
use crate::functions::{
    config_value_to_string, date_spine, make_config_fn, make_ref_fn, make_source_fn,
    make_var_fn, surrogate_key, yaml_to_json, ConfigCapture,
};
use minijinja::{Environment, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Templating environment for inspecting model templates
pub struct JinjaEnvironment<'a> {
    env: Environment<'a>,
    config_capture: ConfigCapture,
}

impl<'a> JinjaEnvironment<'a> {
    /// Create a new environment with variables from sluice.yml
    pub fn new(vars: &HashMap<String, serde_yaml::Value>) -> Self {
        let mut env = Environment::new();
        let config_capture: ConfigCapture = Arc::new(Mutex::new(HashMap::new()));

        let json_vars: HashMap<String, serde_json::Value> = vars
            .iter()
            .map(|(k, v)| (k.clone(), yaml_to_json(v)))
            .collect();

        env.add_function("ref", make_ref_fn(|name: &str| Some(name.to_string())));
        env.add_function(
            "source",
            make_source_fn(|group: &str, table: &str| Some(format!("{}.{}", group, table))),
        );
        env.add_function("config", make_config_fn(config_capture.clone()));
        env.add_function("var", make_var_fn(json_vars));
        env.add_function("surrogate_key", surrogate_key);
        env.add_function("date_spine", date_spine);

        Self {
            env,
            config_capture,
        }
    }

    fn capture(&self) -> JinjaResult<std::sync::MutexGuard<'_, HashMap<String, Value>>> {
        self.config_capture
            .lock()
            .map_err(|_| JinjaError::ConfigCapture)
    }

    /// Render a template in parse mode
    pub fn render(&self, template: &str) -> JinjaResult<String> {
        self.capture()?.clear();
        Ok(self.env.render_str(template, ())?)
    }

    /// Render a template and return both the result and captured config
    pub fn render_with_config(
        &self,
        template: &str,
    ) -> JinjaResult<(String, HashMap<String, Value>)> {
        let rendered = self.render(template)?;
        let config = self.capture()?.clone();
        Ok((rendered, config))
    }

    /// Inline `config(...)` values of a template, flattened to text.
    ///
    /// List values are joined with commas, matching how YAML config is read.
    pub fn extract_config(&self, template: &str) -> JinjaResult<BTreeMap<String, String>> {
        let (_, captured) = self.render_with_config(template)?;
        captured
            .iter()
            .map(|(key, value)| {
                config_value_to_string(key, value)
                    .map(|v| (key.clone(), v))
                    .map_err(|reason| JinjaError::InvalidConfigValue {
                        key: key.clone(),
                        reason,
                    })
            })
            .collect()
    }
}

impl Default for JinjaEnvironment<'_> {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

#[cfg(test)]
#[path = "environment_test.rs"]
mod tests;
