//! Coercion of tool call arguments.
//!
//! Agents do not always send numbers as JSON numbers, so numeric arguments
//! accept integers, integral floats and numeric strings alike.

use serde_json::Value;

use super::ToolError;

/// Reads an optional integer argument. `null` counts as absent.
pub fn optional_i64(arguments: &Value, key: &str) -> Result<Option<i64>, ToolError> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => coerce_i64(value)
            .map(Some)
            .ok_or_else(|| ToolError::invalid(format!("Invalid parameter '{key}': expected a number"))),
    }
}

/// Reads a required integer argument.
pub fn required_i64(arguments: &Value, key: &str) -> Result<i64, ToolError> {
    optional_i64(arguments, key)?
        .ok_or_else(|| ToolError::invalid(format!("Missing required parameter: {key}")))
}

/// Reads a required text argument. Numbers are accepted and stringified.
pub fn required_str(arguments: &Value, key: &str) -> Result<String, ToolError> {
    match arguments.get(key) {
        None | Some(Value::Null) => Err(ToolError::invalid(format!(
            "Missing required parameter: {key}"
        ))),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(ToolError::invalid(format!(
            "Invalid parameter '{key}': expected a string"
        ))),
    }
}

#[allow(clippy::cast_possible_truncation)] // range and integrality are checked first
fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let args = json!({"a": 5, "b": "12", "c": 3.0, "d": " 7 "});
        assert_eq!(optional_i64(&args, "a").unwrap(), Some(5));
        assert_eq!(optional_i64(&args, "b").unwrap(), Some(12));
        assert_eq!(optional_i64(&args, "c").unwrap(), Some(3));
        assert_eq!(optional_i64(&args, "d").unwrap(), Some(7));
    }

    #[test]
    fn absent_and_null_are_none() {
        let args = json!({"typeId": null});
        assert_eq!(optional_i64(&args, "typeId").unwrap(), None);
        assert_eq!(optional_i64(&args, "page").unwrap(), None);
        assert_eq!(optional_i64(&Value::Null, "page").unwrap(), None);
    }

    #[test]
    fn rejects_non_numeric() {
        let args = json!({"a": "abc", "b": 2.5, "c": true, "d": [1]});
        for key in ["a", "b", "c", "d"] {
            let err = optional_i64(&args, key).unwrap_err();
            assert!(err.to_string().contains(key));
        }
    }

    #[test]
    fn required_missing() {
        let err = required_i64(&json!({}), "trimId").unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter: trimId");

        let err = required_str(&json!({}), "q").unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter: q");
    }

    #[test]
    fn required_str_stringifies_numbers() {
        assert_eq!(required_str(&json!({"q": 2020}), "q").unwrap(), "2020");
        assert_eq!(required_str(&json!({"q": "Camry"}), "q").unwrap(), "Camry");
        assert!(required_str(&json!({"q": {}}), "q").is_err());
    }
}
