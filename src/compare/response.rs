//! Primary vs secondary response comparison

use serde_json::Value;

use super::diff::{diff, remove_pointer};
use crate::http::HttpResponse;
use crate::models::CompareDef;

/// How two responses are compared
#[derive(Clone, Debug, Default)]
pub struct CompareOptions {
    /// Compare pagination metadata and the `data` array separately
    pub paginated: bool,
    /// JSON pointers removed from both bodies first
    pub ignore: Vec<String>,
}

impl From<&CompareDef> for CompareOptions {
    fn from(def: &CompareDef) -> Self {
        Self {
            paginated: def.paginated,
            ignore: def.ignore.clone(),
        }
    }
}

/// Every difference between the two responses; empty means they match
pub fn compare_responses(
    primary: &HttpResponse,
    secondary: &HttpResponse,
    options: &CompareOptions,
) -> Vec<String> {
    let mut differences = Vec::new();

    if primary.status_code != secondary.status_code {
        differences.push(format!(
            "Status codes differ: {} vs {}",
            primary.status_code, secondary.status_code
        ));
    }
    if let Some(error) = &primary.error {
        differences.push(format!("Primary error: {error}"));
    }
    if let Some(error) = &secondary.error {
        differences.push(format!("Secondary error: {error}"));
    }

    if !(primary.is_success() && secondary.is_success()) {
        return differences;
    }

    match (primary.json(), secondary.json()) {
        (Some(mut left), Some(mut right)) => {
            for pointer in &options.ignore {
                remove_pointer(&mut left, pointer);
                remove_pointer(&mut right, pointer);
            }
            if options.paginated {
                compare_paginated(&left, &right, &mut differences);
            } else {
                differences.extend(diff(&left, &right).iter().map(|d| d.to_string()));
            }
        }
        _ => {
            if primary.body != secondary.body {
                differences.push("Response bodies differ (non-JSON)".to_string());
            }
        }
    }

    differences
}

fn compare_paginated(left: &Value, right: &Value, differences: &mut Vec<String>) {
    let (left_meta, left_data) = split_page(left);
    let (right_meta, right_data) = split_page(right);

    differences.extend(
        diff(&left_meta, &right_meta)
            .iter()
            .map(|d| format!("Pagination {d}")),
    );

    if left_data.len() != right_data.len() {
        differences.push(format!(
            "Data length differs: {} vs {}",
            left_data.len(),
            right_data.len()
        ));
    }

    differences.extend(
        diff(&Value::Array(left_data), &Value::Array(right_data))
            .iter()
            .map(|d| format!("Data {d}")),
    );
}

/// Split a page into its metadata object and its `data` items
fn split_page(body: &Value) -> (Value, Vec<Value>) {
    match body {
        Value::Object(map) => {
            let mut meta = map.clone();
            let data = match meta.remove("data") {
                Some(Value::Array(items)) => items,
                Some(other) => vec![other],
                None => Vec::new(),
            };
            (Value::Object(meta), data)
        }
        _ => (Value::Object(Default::default()), Vec::new()),
    }
}
