//! Template functions: ref(), source(), config(), var(), surrogate_key() and
//! date_spine().

use minijinja::value::{Kwargs, Rest, Value, ValueKind};
use minijinja::{Error, ErrorKind};
use regex::Regex;
use sluice_core::sql_utils::sql_literal;
use sluice_core::surrogate_key_sql;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// Captured config values from config() calls
pub(crate) type ConfigCapture = Arc<Mutex<HashMap<String, Value>>>;

/// Create the ref() function
///
/// `lookup` maps a model name to the text the call renders to.
///
/// ```jinja
/// SELECT * FROM {{ ref('stg_messages') }}
/// ```
pub(crate) fn make_ref_fn<F>(
    lookup: F,
) -> impl Fn(&str) -> Result<String, Error> + Send + Sync + Clone + 'static
where
    F: Fn(&str) -> Option<String> + Send + Sync + Clone + 'static,
{
    move |name: &str| {
        lookup(name).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("ref('{}') is not bound to a relation", name),
            )
        })
    }
}

/// Create the source() function
///
/// ```jinja
/// SELECT * FROM {{ source('raw', 'telegram_messages') }}
/// ```
pub(crate) fn make_source_fn<F>(
    lookup: F,
) -> impl Fn(&str, &str) -> Result<String, Error> + Send + Sync + Clone + 'static
where
    F: Fn(&str, &str) -> Option<String> + Send + Sync + Clone + 'static,
{
    move |group: &str, table: &str| {
        lookup(group, table).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("source('{}', '{}') is not bound to a relation", group, table),
            )
        })
    }
}

/// Create the config() function that captures model configuration
///
/// Usage in templates:
/// ```jinja
/// {{ config(materialized='table', schema='marts') }}
/// ```
pub(crate) fn make_config_fn(
    capture: ConfigCapture,
) -> impl Fn(Kwargs) -> Result<String, Error> + Send + Sync + Clone + 'static {
    move |kwargs: Kwargs| {
        let mut captured = capture.lock().map_err(|e| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("config mutex poisoned: {e}"),
            )
        })?;

        for key in kwargs.args() {
            let value = kwargs.get::<Value>(key).map_err(|e| {
                Error::new(
                    ErrorKind::InvalidOperation,
                    format!("failed to get config kwarg '{}': {}", key, e),
                )
            })?;
            captured.insert(key.to_string(), value);
        }

        Ok(String::new())
    }
}

/// Create the var() function that retrieves project variables
///
/// ```jinja
/// {{ var('start_date') }}
/// {{ var('missing', 'default_value') }}
/// ```
pub(crate) fn make_var_fn(
    vars: HashMap<String, serde_json::Value>,
) -> impl Fn(&str, Option<Value>) -> Result<Value, Error> + Send + Sync + Clone + 'static {
    move |name: &str, default: Option<Value>| {
        if let Some(value) = vars.get(name) {
            Ok(json_to_minijinja_value(value))
        } else if let Some(default_val) = default {
            Ok(default_val)
        } else {
            Err(Error::new(
                ErrorKind::UndefinedError,
                format!("Variable '{}' is not defined and no default provided", name),
            ))
        }
    }
}

/// `surrogate_key(['channel', 'date_day'])` or `surrogate_key('channel', 'date_day')`
///
/// Renders the SHA-256 expression from [`sluice_core::surrogate_key_sql`].
pub(crate) fn surrogate_key(args: Rest<Value>) -> Result<String, Error> {
    let mut columns: Vec<String> = Vec::new();
    for arg in args.iter() {
        if arg.kind() == ValueKind::Seq {
            for item in arg.try_iter()? {
                columns.push(column_expression(&item)?);
            }
        } else {
            columns.push(column_expression(arg)?);
        }
    }

    if columns.is_empty() {
        return Err(Error::new(
            ErrorKind::MissingArgument,
            "surrogate_key: at least one column is required",
        ));
    }
    Ok(surrogate_key_sql(&columns))
}

fn column_expression(value: &Value) -> Result<String, Error> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("surrogate_key: '{}' is not a column expression", value),
        )),
    }
}

fn date_format_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"))
}

/// Generate a day spine between two dates, inclusive
///
/// Usage: `{{ date_spine('2024-01-01', '2024-12-31') }}`
///
/// Both dates must be in `YYYY-MM-DD` format.
pub(crate) fn date_spine(start_date: &str, end_date: &str) -> Result<String, Error> {
    for (label, value) in [("start_date", start_date), ("end_date", end_date)] {
        if !date_format_regex().is_match(value) {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                format!(
                    "date_spine: {} '{}' is not in YYYY-MM-DD format",
                    label, value
                ),
            ));
        }
    }

    Ok(format!(
        "SELECT CAST(unnest AS DATE) AS date_day \
         FROM unnest(generate_series(DATE {}, DATE {}, INTERVAL '1 day'))",
        sql_literal(start_date),
        sql_literal(end_date)
    ))
}

/// Flatten a captured config value to the string form the registry validates.
///
/// Sequences are joined with commas; mappings are rejected.
pub(crate) fn config_value_to_string(key: &str, value: &Value) -> Result<String, String> {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => Ok(String::new()),
        ValueKind::String => Ok(value.as_str().unwrap_or_default().to_string()),
        ValueKind::Bool | ValueKind::Number => Ok(value.to_string()),
        ValueKind::Seq => {
            let items = value
                .try_iter()
                .map_err(|e| e.to_string())?
                .map(|item| config_value_to_string(key, &item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(items.join(","))
        }
        _ => Err(format!("expected text or a list for '{}'", key)),
    }
}

/// Convert serde_json::Value to minijinja::Value
pub(crate) fn json_to_minijinja_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::from(()),
        serde_json::Value::Bool(b) => Value::from(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(f) = n.as_f64() {
                Value::from(f)
            } else {
                Value::from(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::from(s.as_str()),
        serde_json::Value::Array(arr) => {
            let values: Vec<Value> = arr.iter().map(json_to_minijinja_value).collect();
            Value::from(values)
        }
        serde_json::Value::Object(obj) => {
            let map: HashMap<String, Value> = obj
                .iter()
                .map(|(k, v)| (k.clone(), json_to_minijinja_value(v)))
                .collect();
            Value::from_iter(map)
        }
    }
}

/// Convert serde_yaml::Value to serde_json::Value
pub(crate) fn yaml_to_json(yaml: &serde_yaml::Value) -> serde_json::Value {
    match yaml {
        serde_yaml::Value::Null => serde_json::Value::Null,
        serde_yaml::Value::Bool(b) => serde_json::Value::Bool(*b),
        serde_yaml::Value::Number(n) => convert_yaml_number(n),
        serde_yaml::Value::String(s) => serde_json::Value::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => {
            serde_json::Value::Array(seq.iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(map) => {
            let obj: serde_json::Map<String, serde_json::Value> = map
                .iter()
                .filter_map(|(k, v)| k.as_str().map(|key| (key.to_string(), yaml_to_json(v))))
                .collect();
            serde_json::Value::Object(obj)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

fn convert_yaml_number(n: &serde_yaml::Number) -> serde_json::Value {
    if let Some(i) = n.as_i64() {
        return serde_json::Value::Number(serde_json::Number::from(i));
    }
    if let Some(f) = n.as_f64() {
        return match serde_json::Number::from_f64(f) {
            Some(num) => serde_json::Value::Number(num),
            None => {
                log::warn!(
                    "YAML number {} is NaN or Infinity; converting to JSON null",
                    f
                );
                serde_json::Value::Null
            }
        };
    }
    serde_json::Value::Null
}

#[cfg(test)]
#[path = "functions_test.rs"]
mod tests;
