//! Configuration loading and environment parsing.

use super::validation::validate_config_security;
use super::Config;
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Prefix of per-field environment overrides, e.g. `SESSION_SIGNAL__PORT=8080`.
pub const ENV_OVERRIDE_PREFIX: &str = "SESSION_SIGNAL__";

/// Load configuration. Later layers override earlier ones:
/// 1) Defaults compiled into the binary
/// 2) config.json next to the executable
/// 3) config.json in the current working directory
/// 4) File pointed to by `SESSION_SIGNAL_CONFIG_PATH`
/// 5) JSON from stdin when `SESSION_SIGNAL_CONFIG_STDIN` is truthy
/// 6) Raw JSON in `SESSION_SIGNAL_CONFIG_JSON`
/// 7) `SESSION_SIGNAL__SECTION__FIELD` variables (nested with `__`)
///
/// Read and parse problems are reported on stderr and the layer is skipped.
/// Validation problems are reported but not propagated; callers that need a
/// hard failure call [`validate_config_security`] themselves.
#[must_use]
pub fn load() -> Config {
    let defaults = Config::default();
    let mut merged = serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(Map::new()));

    if let Ok(exe_path) = env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            merge_file_source(&mut merged, &exe_dir.join("config.json"));
        }
    }

    merge_file_source(&mut merged, Path::new("config.json"));

    if let Ok(path) = env::var("SESSION_SIGNAL_CONFIG_PATH") {
        merge_file_source(&mut merged, &PathBuf::from(path));
    }

    if env::var("SESSION_SIGNAL_CONFIG_STDIN").is_ok_and(|v| env_var_truthy(&v)) {
        let mut buf = String::new();
        match std::io::stdin().read_to_string(&mut buf) {
            Ok(_) => merge_document(&mut merged, &buf, "stdin"),
            Err(e) => eprintln!("Failed to read config from stdin: {e}"),
        }
    }

    if let Ok(json) = env::var("SESSION_SIGNAL_CONFIG_JSON") {
        merge_document(&mut merged, &json, "SESSION_SIGNAL_CONFIG_JSON");
    }

    apply_env_overrides(&mut merged, env::vars());

    let config = serde_json::from_value::<Config>(merged).unwrap_or_else(|e| {
        eprintln!("Failed to deserialize config; using defaults: {e}");
        defaults
    });

    if let Err(e) = validate_config_security(&config) {
        eprintln!("Configuration validation error: {e}");
    }

    config
}

fn merge_document(target: &mut Value, raw: &str, label: &str) {
    if raw.trim().is_empty() {
        return;
    }
    match serde_json::from_str(raw) {
        Ok(value) => merge_values(target, value),
        Err(err) => eprintln!("Failed to parse config from {label}: {err}"),
    }
}

fn merge_file_source(target: &mut Value, path: &Path) {
    if path.as_os_str().is_empty() || !path.exists() {
        return;
    }
    match fs::read_to_string(path) {
        Ok(contents) => merge_document(target, &contents, &format!("file {}", path.display())),
        Err(err) => eprintln!("Failed to read config from {}: {err}", path.display()),
    }
}

/// Deep-merge `source` into `target`; objects merge key by key, anything else replaces.
pub(crate) fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

pub(crate) fn apply_env_overrides<I>(root: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, raw_value) in vars {
        let Some(stripped) = key.strip_prefix(ENV_OVERRIDE_PREFIX) else {
            continue;
        };

        let path: Vec<String> = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        if path.is_empty() {
            continue;
        }

        set_nested_value(root, &path, parse_env_value(&raw_value));
    }
}

fn env_var_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn parse_env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::String(String::new());
    }
    // Plain strings (origins, tokens) are not valid JSON and stay strings.
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

fn set_nested_value(target: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *target = value;
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(map) = target else {
        return;
    };

    if rest.is_empty() {
        map.insert(head.clone(), value);
    } else {
        let child = map
            .entry(head.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        set_nested_value(child, rest, value);
    }
}
