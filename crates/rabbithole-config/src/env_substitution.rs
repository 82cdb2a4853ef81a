use once_cell::sync::Lazy;
use rabbithole_core::{RabbitHoleError, Result};
use regex::{Captures, Regex};
use serde_json::Value;
use std::env;

// ${VAR} or ${VAR:-default}
static ENV_VAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").expect("Invalid regex pattern")
});

/// Expand environment references in every string of a parsed config tree.
pub fn substitute_env_vars(value: &mut Value) -> Result<()> {
    let mut missing = Vec::new();
    walk(value, &mut missing);

    if missing.is_empty() {
        return Ok(());
    }
    missing.sort();
    missing.dedup();
    Err(RabbitHoleError::ConfigError(format!(
        "Missing required environment variables: {}",
        missing.join(", ")
    )))
}

fn walk(value: &mut Value, missing: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            if ENV_VAR_REGEX.is_match(s) {
                *s = expand(s, missing);
            }
        }
        Value::Object(map) => map.values_mut().for_each(|v| walk(v, missing)),
        Value::Array(items) => items.iter_mut().for_each(|v| walk(v, missing)),
        _ => {}
    }
}

fn expand(input: &str, missing: &mut Vec<String>) -> String {
    ENV_VAR_REGEX
        .replace_all(input, |caps: &Captures| {
            let name = &caps[1];
            if let Some(value) = lookup(name) {
                return value;
            }
            match caps.get(2) {
                Some(default) => default.as_str().to_string(),
                None => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        })
        .into_owned()
}

fn lookup(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => Some(value),
        // Windows has no HOME
        Err(_) if name == "HOME" => env::var("USERPROFILE").ok(),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_substitute_env_vars() {
        env::set_var("RH_SUBST_SITE", "Warren");

        let mut value = json!({
            "site": { "name": "${RH_SUBST_SITE} Findings" },
            "api": { "base_url": "${RH_SUBST_UNSET_URL:-http://localhost:3001/api}" },
            "list": ["${RH_SUBST_SITE}", 7]
        });

        substitute_env_vars(&mut value).unwrap();

        assert_eq!(value["site"]["name"], "Warren Findings");
        assert_eq!(value["api"]["base_url"], "http://localhost:3001/api");
        assert_eq!(value["list"][0], "Warren");
        assert_eq!(value["list"][1], 7);

        env::remove_var("RH_SUBST_SITE");
    }

    #[test]
    fn test_missing_variables_are_reported() {
        let mut value = json!({ "a": "${RH_SUBST_MISSING_B}", "b": "${RH_SUBST_MISSING_A}/x" });
        let err = substitute_env_vars(&mut value).unwrap_err().to_string();
        assert!(err.contains("RH_SUBST_MISSING_A, RH_SUBST_MISSING_B"), "{err}");
    }
}
