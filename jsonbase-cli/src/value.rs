use serde_json::Value;

/// Interprets a command-line or query-string value as JSON, falling back to
/// a plain string when it does not parse (`dark` becomes `"dark"`).
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Renders a value for terminal output: strings without quotes, everything
/// else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
