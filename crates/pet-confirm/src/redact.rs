//! Redaction and truncation of tool arguments for confirmation prompts
//!
//! Tool arguments may carry credentials. Anything shown to a human in a
//! confirmation dialog passes through [`redact_arguments`] first so full
//! secrets never reach the UI layer.

use serde_json::Value;

/// Key fragments that mark a value as secret-like (matched
/// case-insensitively as substrings of the key)
const SECRET_KEY_FRAGMENTS: &[&str] = &[
    "apikey",
    "api_key",
    "token",
    "password",
    "passwd",
    "secret",
    "credential",
    "authorization",
    "private_key",
];

const MAX_STRING_LEN: usize = 120;
const MAX_ARRAY_ITEMS: usize = 8;
const MAX_DEPTH: usize = 3;

fn is_secret_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SECRET_KEY_FRAGMENTS.iter().any(|f| lower.contains(f))
}

fn redact_value(value: &Value, depth: usize) -> Value {
    if depth >= MAX_DEPTH {
        return Value::String("…".to_string());
    }

    match value {
        Value::String(s) if s.chars().count() > MAX_STRING_LEN => {
            let prefix: String = s.chars().take(MAX_STRING_LEN).collect();
            Value::String(format!("{}…({} chars)", prefix, s.chars().count()))
        }
        Value::Array(items) => {
            let mut out: Vec<Value> = items
                .iter()
                .take(MAX_ARRAY_ITEMS)
                .map(|v| redact_value(v, depth + 1))
                .collect();
            if items.len() > MAX_ARRAY_ITEMS {
                out.push(Value::String(format!(
                    "…({} more items)",
                    items.len() - MAX_ARRAY_ITEMS
                )));
            }
            Value::Array(out)
        }
        Value::Object(map) => {
            let out = map
                .iter()
                .map(|(k, v)| {
                    let redacted = if is_secret_key(k) {
                        Value::String("***".to_string())
                    } else {
                        redact_value(v, depth + 1)
                    };
                    (k.clone(), redacted)
                })
                .collect();
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Redact secret-like keys and truncate long values in tool arguments
pub fn redact_arguments(args: &Value) -> Value {
    redact_value(args, 0)
}

/// Render redacted arguments as a prompt body
pub fn format_arguments(args: &Value) -> String {
    let redacted = redact_arguments(args);
    serde_json::to_string_pretty(&redacted).unwrap_or_else(|_| redacted.to_string())
}
