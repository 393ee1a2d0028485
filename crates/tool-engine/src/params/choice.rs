//! Fixed-domain string choices

use serde::{Deserialize, Serialize};

/// A choice among a fixed set of strings with a parallel label list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub value: Option<String>,
    allowed: Vec<String>,
    labels: Vec<String>,
}

impl Choice {
    /// Choice whose labels are the values themselves
    pub fn new(allowed: Vec<String>) -> Self {
        let labels = allowed.clone();
        Self {
            value: None,
            allowed,
            labels,
        }
    }

    /// Choice with explicit labels; missing labels fall back to the value
    pub fn with_labels(allowed: Vec<String>, labels: Vec<String>) -> Self {
        let labels = allowed
            .iter()
            .enumerate()
            .map(|(i, v)| labels.get(i).cloned().unwrap_or_else(|| v.clone()))
            .collect();
        Self {
            value: None,
            allowed,
            labels,
        }
    }

    /// Domain, with the implicit "" choice prepended when optional
    pub fn allowed_values(&self, optional: bool) -> Vec<String> {
        with_empty(&self.allowed, optional)
    }

    /// Labels parallel to [`allowed_values`](Self::allowed_values)
    pub fn labels(&self, optional: bool) -> Vec<String> {
        with_empty(&self.labels, optional)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.allowed.iter().any(|a| a == value)
    }
}

fn with_empty(values: &[String], optional: bool) -> Vec<String> {
    let mut out = Vec::with_capacity(values.len() + 1);
    if optional {
        out.push(String::new());
    }
    out.extend(values.iter().cloned());
    out
}

/// Whether a restriction set is exactly {"true", "false"}
pub(crate) fn is_boolean_domain(values: &[String]) -> bool {
    values.len() == 2
        && values.iter().any(|v| v == "true")
        && values.iter().any(|v| v == "false")
}
