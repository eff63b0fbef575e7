//! Match patterns and predicate normalization.
//!
//! A `Pattern` is what callers hand to a semaphore: an exact action type,
//! a set of types, or a predicate. Normalization turns any of them into a
//! `Predicate`, the single shape the registry evaluates.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::action::Action;
use crate::error::ValidationError;

/// A pure boolean test over actions.
///
/// Predicates are shared between the registry and in-flight notify passes,
/// so they may be invoked after their waiter has settled.
pub struct Predicate<A> {
    test: Arc<dyn Fn(&A) -> bool + Send + Sync>,
}

impl<A: Action> Predicate<A> {
    /// Wraps a closure.
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        Self { test: Arc::new(test) }
    }

    /// Matches every action. Default for resolve patterns.
    #[must_use]
    pub fn any() -> Self {
        Self::new(|_| true)
    }

    /// Matches no action. Default for reject patterns.
    #[must_use]
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    /// Evaluates the predicate.
    #[inline]
    pub fn matches(&self, action: &A) -> bool {
        (self.test)(action)
    }
}

impl<A> Clone for Predicate<A> {
    fn clone(&self) -> Self {
        Self {
            test: Arc::clone(&self.test),
        }
    }
}

impl<A> fmt::Debug for Predicate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Ways of describing which actions a waiter is interested in.
#[derive(Debug, Clone)]
pub enum Pattern<A> {
    /// Action type equals the given string.
    Exact(String),

    /// Action type is one of the given strings. An empty set never matches.
    AnyOf(Vec<String>),

    /// Arbitrary user predicate.
    Predicate(Predicate<A>),
}

impl<A: Action> Pattern<A> {
    /// Builds a predicate pattern from a closure.
    pub fn when<F>(test: F) -> Self
    where
        F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Predicate::new(test))
    }

    /// Converts the pattern into a predicate.
    #[must_use]
    pub fn into_predicate(self) -> Predicate<A> {
        match self {
            Self::Exact(action_type) => Predicate::new(move |a: &A| a.action_type() == action_type),
            Self::AnyOf(types) => {
                Predicate::new(move |a: &A| types.iter().any(|t| t == a.action_type()))
            }
            Self::Predicate(p) => p,
        }
    }

    /// Reads a pattern from a dynamic JSON spec, permissively.
    ///
    /// Strings match exactly; arrays match membership over their string
    /// elements. Any other value means "no pattern supplied".
    #[must_use]
    pub fn from_json(spec: &Value) -> Option<Self> {
        match spec {
            Value::String(s) => Some(Self::Exact(s.clone())),
            Value::Array(items) => Some(Self::AnyOf(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Reads a pattern from a dynamic JSON spec, failing on malformed input.
    ///
    /// `null` is still "absent". Arrays must contain only strings.
    pub fn from_json_strict(spec: &Value) -> Result<Option<Self>, ValidationError> {
        match spec {
            Value::Null => Ok(None),
            Value::String(_) => Ok(Self::from_json(spec)),
            Value::Array(items) => {
                if let Some(bad) = items.iter().find(|v| !v.is_string()) {
                    return Err(ValidationError::InvalidPattern {
                        reason: format!("array elements must be action types, got {bad}"),
                    });
                }
                Ok(Self::from_json(spec))
            }
            other => Err(ValidationError::InvalidPattern {
                reason: format!("expected action type or array of action types, got {other}"),
            }),
        }
    }
}

/// Normalizes an optional pattern, substituting `default` when absent.
pub fn normalize<A: Action>(pattern: Option<Pattern<A>>, default: Predicate<A>) -> Predicate<A> {
    pattern.map_or(default, Pattern::into_predicate)
}

impl<A> From<&str> for Pattern<A> {
    fn from(action_type: &str) -> Self {
        Self::Exact(action_type.to_string())
    }
}

impl<A> From<String> for Pattern<A> {
    fn from(action_type: String) -> Self {
        Self::Exact(action_type)
    }
}

impl<A> From<Vec<String>> for Pattern<A> {
    fn from(types: Vec<String>) -> Self {
        Self::AnyOf(types)
    }
}

impl<A> From<Vec<&str>> for Pattern<A> {
    fn from(types: Vec<&str>) -> Self {
        Self::AnyOf(types.into_iter().map(str::to_string).collect())
    }
}

impl<A> From<&[&str]> for Pattern<A> {
    fn from(types: &[&str]) -> Self {
        Self::AnyOf(types.iter().map(|t| (*t).to_string()).collect())
    }
}

impl<A, const N: usize> From<[&str; N]> for Pattern<A> {
    fn from(types: [&str; N]) -> Self {
        Self::AnyOf(types.iter().map(|t| (*t).to_string()).collect())
    }
}

impl<A> From<Predicate<A>> for Pattern<A> {
    fn from(p: Predicate<A>) -> Self {
        Self::Predicate(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::JsonAction;
    use serde_json::json;

    fn act(t: &str) -> JsonAction {
        JsonAction::new(t)
    }

    #[test]
    fn exact_matches_only_that_type() {
        let p = Pattern::<JsonAction>::from("LOGIN_OK").into_predicate();
        assert!(p.matches(&act("LOGIN_OK")));
        assert!(!p.matches(&act("LOGIN_FAIL")));
    }

    #[test]
    fn any_of_matches_membership() {
        let p = Pattern::<JsonAction>::from(["A", "B"]).into_predicate();
        assert!(p.matches(&act("A")));
        assert!(p.matches(&act("B")));
        assert!(!p.matches(&act("C")));
    }

    #[test]
    fn empty_any_of_never_matches() {
        let p = Pattern::<JsonAction>::AnyOf(Vec::new()).into_predicate();
        assert!(!p.matches(&act("")));
        assert!(!p.matches(&act("A")));
    }

    #[test]
    fn predicate_passes_through() {
        let p = Pattern::<JsonAction>::when(|a| a.get("ok") == Some(&json!(true))).into_predicate();
        assert!(p.matches(&act("X").with("ok", true)));
        assert!(!p.matches(&act("X")));
    }

    #[test]
    fn normalize_uses_default_when_absent() {
        let resolve = normalize::<JsonAction>(None, Predicate::any());
        let reject = normalize::<JsonAction>(None, Predicate::never());
        assert!(resolve.matches(&act("anything")));
        assert!(!reject.matches(&act("anything")));
    }

    #[test]
    fn normalize_prefers_supplied_pattern() {
        let p = normalize(Some(Pattern::<JsonAction>::from("A")), Predicate::any());
        assert!(!p.matches(&act("B")));
    }

    #[test]
    fn from_json_is_permissive() {
        assert!(matches!(
            Pattern::<JsonAction>::from_json(&json!("A")),
            Some(Pattern::Exact(t)) if t == "A"
        ));
        assert!(Pattern::<JsonAction>::from_json(&json!(42)).is_none());
        assert!(Pattern::<JsonAction>::from_json(&json!({"type": "A"})).is_none());
        assert!(Pattern::<JsonAction>::from_json(&Value::Null).is_none());

        let mixed = Pattern::<JsonAction>::from_json(&json!(["A", 1, "B"])).unwrap();
        let p = mixed.into_predicate();
        assert!(p.matches(&act("A")));
        assert!(p.matches(&act("B")));
        assert!(!p.matches(&act("1")));
    }

    #[test]
    fn from_json_strict_rejects_malformed() {
        assert!(Pattern::<JsonAction>::from_json_strict(&Value::Null).unwrap().is_none());
        assert!(Pattern::<JsonAction>::from_json_strict(&json!(["A", "B"])).unwrap().is_some());

        let err = Pattern::<JsonAction>::from_json_strict(&json!(true)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPattern { .. }));

        let err = Pattern::<JsonAction>::from_json_strict(&json!(["A", 2])).unwrap_err();
        assert!(format!("{err}").contains("array elements"));
    }
}
