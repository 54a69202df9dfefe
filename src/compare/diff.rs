//! Structural JSON diff
//!
//! Object keys are compared by name and arrays as multisets, so element order
//! never produces a difference. Paths are rendered as `root['key'][0]`.

use serde_json::Value;

/// Kind of a single structural difference
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffKind {
    DictionaryItemAdded,
    DictionaryItemRemoved,
    ValuesChanged,
    TypeChanges,
    IterableItemAdded,
    IterableItemRemoved,
}

impl DiffKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffKind::DictionaryItemAdded => "dictionary_item_added",
            DiffKind::DictionaryItemRemoved => "dictionary_item_removed",
            DiffKind::ValuesChanged => "values_changed",
            DiffKind::TypeChanges => "type_changes",
            DiffKind::IterableItemAdded => "iterable_item_added",
            DiffKind::IterableItemRemoved => "iterable_item_removed",
        }
    }
}

/// One difference between two JSON documents
#[derive(Clone, Debug, PartialEq)]
pub struct Difference {
    pub kind: DiffKind,
    pub path: String,
    pub detail: String,
}

impl std::fmt::Display for Difference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} - {}", self.kind.as_str(), self.path, self.detail)
    }
}

/// Differences turning `left` into `right`
pub fn diff(left: &Value, right: &Value) -> Vec<Difference> {
    let mut out = Vec::new();
    diff_at("root", left, right, &mut out);
    out
}

fn diff_at(path: &str, left: &Value, right: &Value, out: &mut Vec<Difference>) {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            for (key, lv) in l {
                let child = format!("{path}['{key}']");
                match r.get(key) {
                    Some(rv) => diff_at(&child, lv, rv, out),
                    None => out.push(Difference {
                        kind: DiffKind::DictionaryItemRemoved,
                        path: child,
                        detail: lv.to_string(),
                    }),
                }
            }
            for (key, rv) in r {
                if !l.contains_key(key) {
                    out.push(Difference {
                        kind: DiffKind::DictionaryItemAdded,
                        path: format!("{path}['{key}']"),
                        detail: rv.to_string(),
                    });
                }
            }
        }
        (Value::Array(l), Value::Array(r)) => diff_unordered(path, l, r, out),
        _ if type_name(left) != type_name(right) => out.push(Difference {
            kind: DiffKind::TypeChanges,
            path: path.to_string(),
            detail: format!(
                "{} {} -> {} {}",
                type_name(left),
                left,
                type_name(right),
                right
            ),
        }),
        _ if !scalar_eq(left, right) => out.push(Difference {
            kind: DiffKind::ValuesChanged,
            path: path.to_string(),
            detail: format!("{left} -> {right}"),
        }),
        _ => {}
    }
}

/// Multiset comparison; unmatched elements are reported at their own index
fn diff_unordered(path: &str, left: &[Value], right: &[Value], out: &mut Vec<Difference>) {
    let right_keys: Vec<String> = right.iter().map(canonical).collect();
    let mut matched = vec![false; right.len()];

    for (i, item) in left.iter().enumerate() {
        let key = canonical(item);
        let hit = right_keys
            .iter()
            .enumerate()
            .position(|(j, k)| !matched[j] && *k == key);
        match hit {
            Some(j) => matched[j] = true,
            None => out.push(Difference {
                kind: DiffKind::IterableItemRemoved,
                path: format!("{path}[{i}]"),
                detail: item.to_string(),
            }),
        }
    }

    for (j, item) in right.iter().enumerate() {
        if !matched[j] {
            out.push(Difference {
                kind: DiffKind::IterableItemAdded,
                path: format!("{path}[{j}]"),
                detail: item.to_string(),
            });
        }
    }
}

/// Order-insensitive rendering used to match array elements
fn canonical(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical(v)))
                .collect();
            entries.sort();
            format!("{{{}}}", entries.join(","))
        }
        Value::Array(items) => {
            let mut entries: Vec<String> = items.iter().map(canonical).collect();
            entries.sort();
            format!("[{}]", entries.join(","))
        }
        Value::Number(n) => n
            .as_f64()
            .map(|f| f.to_string())
            .unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

fn scalar_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l == r || l.as_f64() == r.as_f64(),
        _ => left == right,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Remove the value at a JSON pointer; `*` matches every array element
///
/// Returns whether anything was removed.
pub fn remove_pointer(value: &mut Value, pointer: &str) -> bool {
    let tokens: Vec<String> = pointer
        .trim_start_matches('/')
        .split('/')
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect();
    if pointer.is_empty() || tokens.is_empty() {
        return false;
    }
    remove_tokens(value, &tokens)
}

fn remove_tokens(value: &mut Value, tokens: &[String]) -> bool {
    let (head, rest) = match tokens.split_first() {
        Some(split) => split,
        None => return false,
    };

    if rest.is_empty() {
        return match value {
            Value::Object(map) => map.remove(head).is_some(),
            Value::Array(items) if head == "*" => {
                let removed = !items.is_empty();
                items.clear();
                removed
            }
            Value::Array(items) => match head.parse::<usize>() {
                Ok(i) if i < items.len() => {
                    items.remove(i);
                    true
                }
                _ => false,
            },
            _ => false,
        };
    }

    match value {
        Value::Object(map) => map
            .get_mut(head)
            .map(|child| remove_tokens(child, rest))
            .unwrap_or(false),
        Value::Array(items) if head == "*" => items
            .iter_mut()
            .fold(false, |acc, child| remove_tokens(child, rest) || acc),
        Value::Array(items) => head
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get_mut(i))
            .map(|child| remove_tokens(child, rest))
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kinds(diffs: &[Difference]) -> Vec<DiffKind> {
        diffs.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_equal_documents() {
        let a = json!({"total": 2, "data": [{"id": 1}, {"id": 2}]});
        let b = json!({"data": [{"id": 2}, {"id": 1}], "total": 2});
        assert!(diff(&a, &b).is_empty());
    }

    #[test]
    fn test_dictionary_changes() {
        let a = json!({"name": "bukhari", "old": true});
        let b = json!({"name": "muslim", "new": 1});
        let diffs = diff(&a, &b);

        assert_eq!(
            kinds(&diffs),
            vec![
                DiffKind::ValuesChanged,
                DiffKind::DictionaryItemRemoved,
                DiffKind::DictionaryItemAdded
            ]
        );
        assert_eq!(
            diffs[0].to_string(),
            "values_changed: root['name'] - \"bukhari\" -> \"muslim\""
        );
    }

    #[test]
    fn test_type_change() {
        let diffs = diff(&json!({"total": 2}), &json!({"total": "2"}));
        assert_eq!(kinds(&diffs), vec![DiffKind::TypeChanges]);
        assert_eq!(diffs[0].path, "root['total']");
    }

    #[test]
    fn test_array_items() {
        let diffs = diff(&json!([1, 2, 3]), &json!([3, 4, 1]));
        assert_eq!(
            kinds(&diffs),
            vec![DiffKind::IterableItemRemoved, DiffKind::IterableItemAdded]
        );
        assert_eq!(diffs[0].path, "root[1]");
        assert_eq!(diffs[1].path, "root[1]");
    }

    #[test]
    fn test_duplicate_array_items_counted() {
        let diffs = diff(&json!([1, 1]), &json!([1]));
        assert_eq!(kinds(&diffs), vec![DiffKind::IterableItemRemoved]);
    }

    #[test]
    fn test_integer_and_float_equal() {
        assert!(diff(&json!({"n": 1}), &json!({"n": 1.0})).is_empty());
    }

    #[test]
    fn test_remove_pointer() {
        let mut value = json!({
            "generatedAt": "now",
            "data": [{"id": 1, "ts": 1}, {"id": 2, "ts": 2}]
        });
        assert!(remove_pointer(&mut value, "/generatedAt"));
        assert!(remove_pointer(&mut value, "/data/*/ts"));
        assert!(!remove_pointer(&mut value, "/missing"));
        assert_eq!(value, json!({"data": [{"id": 1}, {"id": 2}]}));
    }
}
