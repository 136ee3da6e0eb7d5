//! Small helpers for pulling typed fields out of a module's JSON kwargs map.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde_json::Value;

pub fn require_str<'a>(args: &'a BTreeMap<String, Value>, key: &str) -> Result<&'a str> {
    args.get(key)
        .ok_or_else(|| anyhow!("missing required argument '{key}'"))?
        .as_str()
        .ok_or_else(|| anyhow!("argument '{key}' must be a string"))
}

pub fn opt_str<'a>(args: &'a BTreeMap<String, Value>, key: &str, default: &'a str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or(default)
}

pub fn opt_u64(args: &BTreeMap<String, Value>, key: &str, default: u64) -> u64 {
    args.get(key).and_then(Value::as_u64).unwrap_or(default)
}

pub fn opt_i64(args: &BTreeMap<String, Value>, key: &str, default: i64) -> i64 {
    args.get(key).and_then(Value::as_i64).unwrap_or(default)
}

pub fn opt_f64(args: &BTreeMap<String, Value>, key: &str, default: f64) -> f64 {
    args.get(key).and_then(Value::as_f64).unwrap_or(default)
}

pub fn opt_str_list(args: &BTreeMap<String, Value>, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
