//! Actions flowing through the dispatch pipeline.
//!
//! An action is an immutable record with a discriminant "type" used for
//! matching. Everything else it carries is passed through unexamined.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A discriminated record observed by semaphores.
///
/// Actions must be:
/// - `'static + Send + Sync`: waiters may be settled from any thread
/// - `Clone`: one action can settle many waiters
/// - `Debug`: for diagnostics and error messages
pub trait Action: 'static + Send + Sync + Clone + Debug {
    /// The discriminant matched by type and type-set patterns.
    fn action_type(&self) -> &str;
}

/// A JSON-shaped action: a `type` string plus free-form payload fields.
///
/// Serializes as a flat object, e.g. `{"type": "LOGIN_OK", "user": "ada"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonAction {
    /// Action discriminant.
    #[serde(rename = "type")]
    pub action_type: String,

    /// Remaining fields of the action.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl JsonAction {
    /// Creates an action with an empty payload.
    #[must_use]
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            payload: Map::new(),
        }
    }

    /// Adds a payload field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Looks up a payload field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

impl Action for JsonAction {
    fn action_type(&self) -> &str {
        &self.action_type
    }
}

/// Raw JSON objects are actions too; the type is read from the `"type"` field.
///
/// Values without a string `"type"` have the empty type.
impl Action for Value {
    fn action_type(&self) -> &str {
        self.get("type").and_then(Value::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_action_serializes_flat() {
        let action = JsonAction::new("LOGIN_OK").with("user", "ada");
        let v = serde_json::to_value(&action).unwrap();
        assert_eq!(v, json!({"type": "LOGIN_OK", "user": "ada"}));
    }

    #[test]
    fn json_action_deserializes_payload() {
        let action: JsonAction =
            serde_json::from_value(json!({"type": "ADD", "amount": 3})).unwrap();
        assert_eq!(action.action_type(), "ADD");
        assert_eq!(action.get("amount"), Some(&json!(3)));
    }

    #[test]
    fn json_action_requires_type() {
        let res: Result<JsonAction, _> = serde_json::from_value(json!({"amount": 3}));
        assert!(res.is_err());
    }

    #[test]
    fn raw_value_action_type() {
        assert_eq!(json!({"type": "X", "n": 1}).action_type(), "X");
        assert_eq!(json!({"type": 7}).action_type(), "");
        assert_eq!(json!("X").action_type(), "");
    }
}
