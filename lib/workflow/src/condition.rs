//! Condition trees evaluated against event payloads.
//!
//! A condition is either a composite node, `{"all": [...]}` or
//! `{"any": [...]}`, or a leaf comparing one field of the payload:
//!
//! ```json
//! {"field": "document.tags.0", "operator": "eq", "value": 7}
//! ```
//!
//! Field paths are dot-separated. Each segment looks up a key in an object,
//! or, when it is all digits, an index in an array. Anything that cannot be
//! followed resolves to absent, and JSON `null` counts as absent too.
//!
//! Evaluation is total: malformed trees evaluate to `false` instead of
//! failing.

use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

/// Comparison operators understood by leaf conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Contains,
    In,
    Matches,
    Gt,
    Lt,
    Exists,
}

impl Operator {
    /// Parses an operator name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "contains" => Some(Self::Contains),
            "in" => Some(Self::In),
            "matches" => Some(Self::Matches),
            "gt" => Some(Self::Gt),
            "lt" => Some(Self::Lt),
            "exists" => Some(Self::Exists),
            _ => None,
        }
    }

    /// Applies the operator to a resolved field value and the expected value.
    ///
    /// `actual` is `None` when the field is absent or null.
    #[must_use]
    pub fn apply(self, actual: Option<&JsonValue>, expected: Option<&JsonValue>) -> bool {
        match self {
            Self::Eq => optional_equal(actual, expected),
            Self::Ne => !optional_equal(actual, expected),
            Self::Contains => match actual {
                Some(JsonValue::String(text)) => text.contains(&display_text(expected)),
                Some(JsonValue::Array(items)) => {
                    items.iter().any(|item| optional_equal(Some(item), expected))
                }
                _ => false,
            },
            Self::In => match expected {
                Some(JsonValue::Array(items)) => {
                    items.iter().any(|item| optional_equal(actual, Some(item)))
                }
                _ => false,
            },
            Self::Matches => match (actual, expected) {
                (Some(JsonValue::String(text)), Some(JsonValue::String(pattern))) => {
                    match Regex::new(pattern) {
                        Ok(re) => re.is_match(text),
                        Err(e) => {
                            warn!(pattern = %pattern, error = %e, "Invalid regex in condition");
                            false
                        }
                    }
                }
                _ => false,
            },
            Self::Gt => match (to_number(actual), to_number(expected)) {
                (Some(a), Some(b)) => a > b,
                _ => false,
            },
            Self::Lt => match (to_number(actual), to_number(expected)) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            },
            Self::Exists => actual.is_some() == expected.is_some_and(is_truthy),
        }
    }
}

/// Evaluates `condition` against `data`.
///
/// `all` is checked before `any`; an empty `all` is true and an empty `any`
/// is false. A leaf without a `field` places no constraint and passes.
#[must_use]
pub fn evaluate(condition: &JsonValue, data: &JsonValue) -> bool {
    let Some(node) = condition.as_object() else {
        warn!(condition = %condition, "Condition is not an object");
        return false;
    };

    if let Some(children) = node.get("all") {
        return match children.as_array() {
            Some(children) => children.iter().all(|c| evaluate(c, data)),
            None => false,
        };
    }

    if let Some(children) = node.get("any") {
        return match children.as_array() {
            Some(children) => children.iter().any(|c| evaluate(c, data)),
            None => false,
        };
    }

    evaluate_leaf(node, data)
}

fn evaluate_leaf(node: &Map<String, JsonValue>, data: &JsonValue) -> bool {
    let path = match node.get("field") {
        None | Some(JsonValue::Null) => {
            warn!(condition = ?node, "Condition missing 'field'");
            return true;
        }
        Some(JsonValue::String(path)) => path,
        Some(other) => {
            warn!(field = %other, "Condition field is not a string");
            return false;
        }
    };

    let operator = match node.get("operator") {
        None => Operator::Eq,
        Some(value) => match value.as_str().and_then(Operator::parse) {
            Some(op) => op,
            None => {
                warn!(operator = %value, "Unknown operator");
                return false;
            }
        },
    };

    let expected = node.get("value").filter(|v| !v.is_null());
    operator.apply(resolve_field(path, data), expected)
}

/// Follows a dot-separated path into `data`.
///
/// Returns `None` when the path cannot be followed or ends on `null`.
#[must_use]
pub fn resolve_field<'a>(path: &str, data: &'a JsonValue) -> Option<&'a JsonValue> {
    let mut current = data;
    for segment in path.split('.') {
        current = match current {
            JsonValue::Object(map) => map.get(segment)?,
            JsonValue::Array(items) if is_index(segment) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Truthiness of a JSON value: null, `false`, zero, and empty text or
/// collections are falsy.
#[must_use]
pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
    }
}

/// Structural equality where numbers compare by value and booleans count as
/// `0` and `1`.
#[must_use]
pub fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Bool(flag), JsonValue::Number(n))
        | (JsonValue::Number(n), JsonValue::Bool(flag)) => {
            n.as_f64() == Some(if *flag { 1.0 } else { 0.0 })
        }
        (JsonValue::Number(x), JsonValue::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (JsonValue::Array(xs), JsonValue::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (JsonValue::Object(xs), JsonValue::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Equality with null and absent treated as the same value.
fn optional_equal(a: Option<&JsonValue>, b: Option<&JsonValue>) -> bool {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => values_equal(a, b),
        _ => false,
    }
}

/// Text form used for substring tests against a text field.
fn display_text(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => "None".to_string(),
        Some(JsonValue::Bool(true)) => "True".to_string(),
        Some(JsonValue::Bool(false)) => "False".to_string(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn to_number(value: Option<&JsonValue>) -> Option<f64> {
    match value? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event() -> JsonValue {
        json!({
            "source": "paperless",
            "document": {
                "title": "Invoice 2024-17",
                "tags": [3, 7],
                "amount": 120.5,
                "correspondent": null
            },
            "items": [{"sku": "A-1"}, {"sku": "B-2"}]
        })
    }

    #[test]
    fn resolves_nested_paths() {
        let data = event();
        assert_eq!(resolve_field("document.title", &data), Some(&json!("Invoice 2024-17")));
        assert_eq!(resolve_field("document.tags.1", &data), Some(&json!(7)));
        assert_eq!(resolve_field("items.0.sku", &data), Some(&json!("A-1")));
    }

    #[test]
    fn unresolvable_paths_are_absent() {
        let data = event();
        assert_eq!(resolve_field("document.tags.9", &data), None);
        assert_eq!(resolve_field("items.first", &data), None);
        assert_eq!(resolve_field("source.length", &data), None);
        assert_eq!(resolve_field("missing", &data), None);
        assert_eq!(resolve_field("document.correspondent", &data), None);
    }

    #[test]
    fn leaf_defaults_to_equality() {
        let data = event();
        assert!(evaluate(&json!({"field": "source", "value": "paperless"}), &data));
        assert!(!evaluate(&json!({"field": "source", "value": "lexoffice"}), &data));
    }

    #[test]
    fn equality_with_absent_value() {
        let data = event();
        assert!(evaluate(&json!({"field": "document.correspondent"}), &data));
        assert!(evaluate(&json!({"field": "missing", "operator": "eq", "value": null}), &data));
        assert!(!evaluate(&json!({"field": "missing", "operator": "ne"}), &data));
    }

    #[test]
    fn numbers_compare_by_value() {
        let data = json!({"total": 100});
        assert!(evaluate(&json!({"field": "total", "value": 100.0}), &data));
        assert!(evaluate(&json!({"field": "total", "operator": "in", "value": [5, 100.0]}), &data));
    }

    #[test]
    fn booleans_equal_one_and_zero() {
        let data = json!({"paid": true, "count": 1, "open": false});
        assert!(evaluate(&json!({"field": "paid", "value": 1}), &data));
        assert!(evaluate(&json!({"field": "count", "operator": "in", "value": [true]}), &data));
        assert!(evaluate(&json!({"field": "open", "value": 0.0}), &data));
        assert!(!evaluate(&json!({"field": "paid", "value": 2}), &data));
        assert!(evaluate(&json!({"field": "paid", "operator": "ne", "value": 0}), &data));
    }

    #[test]
    fn contains_on_text_and_lists() {
        let data = event();
        assert!(evaluate(
            &json!({"field": "document.title", "operator": "contains", "value": "Invoice"}),
            &data
        ));
        assert!(evaluate(
            &json!({"field": "document.title", "operator": "contains", "value": 2024}),
            &data
        ));
        assert!(evaluate(
            &json!({"field": "document.tags", "operator": "contains", "value": 7}),
            &data
        ));
        assert!(!evaluate(
            &json!({"field": "document.amount", "operator": "contains", "value": 1}),
            &data
        ));
    }

    #[test]
    fn contains_uses_text_form_of_expected() {
        let data = json!({"note": "flag=True, owner=None"});
        assert!(evaluate(&json!({"field": "note", "operator": "contains", "value": true}), &data));
        assert!(evaluate(&json!({"field": "note", "operator": "contains"}), &data));
    }

    #[test]
    fn in_requires_list() {
        let data = event();
        assert!(evaluate(
            &json!({"field": "source", "operator": "in", "value": ["lexoffice", "paperless"]}),
            &data
        ));
        assert!(!evaluate(
            &json!({"field": "source", "operator": "in", "value": "paperless"}),
            &data
        ));
    }

    #[test]
    fn matches_searches_anywhere() {
        let data = event();
        assert!(evaluate(
            &json!({"field": "document.title", "operator": "matches", "value": r"\d{4}-\d+"}),
            &data
        ));
        assert!(!evaluate(
            &json!({"field": "document.title", "operator": "matches", "value": "^2024"}),
            &data
        ));
    }

    #[test]
    fn invalid_regex_is_false() {
        let data = event();
        assert!(!evaluate(
            &json!({"field": "document.title", "operator": "matches", "value": "(unclosed"}),
            &data
        ));
    }

    #[test]
    fn ordering_coerces_numeric_text() {
        let data = json!({"amount": "250.00", "flag": true, "name": "ACME"});
        assert!(evaluate(&json!({"field": "amount", "operator": "gt", "value": 100}), &data));
        assert!(evaluate(&json!({"field": "amount", "operator": "lt", "value": "1000"}), &data));
        assert!(evaluate(&json!({"field": "flag", "operator": "gt", "value": 0}), &data));
        assert!(!evaluate(&json!({"field": "name", "operator": "gt", "value": 0}), &data));
        assert!(!evaluate(&json!({"field": "missing", "operator": "lt", "value": 0}), &data));
    }

    #[test]
    fn exists_compares_presence_with_truthiness() {
        let data = event();
        assert!(evaluate(&json!({"field": "source", "operator": "exists", "value": true}), &data));
        assert!(evaluate(&json!({"field": "missing", "operator": "exists", "value": false}), &data));
        assert!(evaluate(&json!({"field": "missing", "operator": "exists"}), &data));
        assert!(!evaluate(&json!({"field": "source", "operator": "exists", "value": 0}), &data));
        assert!(!evaluate(
            &json!({"field": "document.correspondent", "operator": "exists", "value": true}),
            &data
        ));
    }

    #[test]
    fn composites_and_empty_lists() {
        let data = event();
        assert!(evaluate(&json!({"all": []}), &data));
        assert!(!evaluate(&json!({"any": []}), &data));
        assert!(evaluate(
            &json!({"any": [
                {"field": "source", "value": "lexoffice"},
                {"all": [
                    {"field": "document.amount", "operator": "gt", "value": 100},
                    {"field": "document.tags", "operator": "contains", "value": 3}
                ]}
            ]}),
            &data
        ));
    }

    #[test]
    fn all_takes_precedence_over_any() {
        let data = event();
        let condition = json!({
            "all": [{"field": "source", "value": "lexoffice"}],
            "any": [{"field": "source", "value": "paperless"}]
        });
        assert!(!evaluate(&condition, &data));
    }

    #[test]
    fn leaf_without_field_passes() {
        assert!(evaluate(&json!({"operator": "eq", "value": 1}), &event()));
        assert!(evaluate(&json!({}), &event()));
    }

    #[test]
    fn malformed_nodes_are_false() {
        let data = event();
        assert!(!evaluate(&json!("source"), &data));
        assert!(!evaluate(&json!({"all": "nope"}), &data));
        assert!(!evaluate(&json!({"any": [42]}), &data));
        assert!(!evaluate(&json!({"field": 5, "value": 5}), &data));
        assert!(!evaluate(&json!({"field": "source", "operator": "like", "value": "p"}), &data));
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!(-1)));
        assert!(is_truthy(&json!([0])));
    }
}
