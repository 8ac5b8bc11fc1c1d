//! SPARQL 1.1 JSON results model.

use std::collections::HashMap;

use serde::Deserialize;

/// Parsed response to a SELECT query.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SelectResults {
    #[serde(default)]
    pub results: BindingSet,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BindingSet {
    #[serde(default)]
    pub bindings: Vec<HashMap<String, BoundValue>>,
}

/// One bound RDF value. `kind` is `uri`, `literal`, `typed-literal` or
/// `bnode` depending on the endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub datatype: Option<String>,
    #[serde(rename = "xml:lang")]
    pub language: Option<String>,
}

impl SelectResults {
    pub fn is_empty(&self) -> bool {
        self.results.bindings.is_empty()
    }

    pub fn rows(&self) -> &[HashMap<String, BoundValue>] {
        &self.results.bindings
    }

    /// Values bound to `var`, in row order. Rows without the binding are
    /// skipped (OPTIONAL clauses).
    pub fn column(&self, var: &str) -> Vec<String> {
        self.results
            .bindings
            .iter()
            .filter_map(|row| row.get(var).map(|v| v.value.clone()))
            .collect()
    }

    /// First value bound to `var`, if any row binds it.
    pub fn first(&self, var: &str) -> Option<&str> {
        self.results
            .bindings
            .iter()
            .find_map(|row| row.get(var).map(|v| v.value.as_str()))
    }

    // Constructors for mocks and tests.

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a result set binding `var` to the given URI values, one row each.
    pub fn uris(var: &str, values: &[&str]) -> Self {
        Self::rows_from(values.iter().map(|v| vec![(var, "uri", *v)]))
    }

    /// Build a result set from rows of (var, kind, value) triples.
    pub fn rows_from<'a>(
        rows: impl IntoIterator<Item = Vec<(&'a str, &'a str, &'a str)>>,
    ) -> Self {
        let bindings = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(var, kind, value)| {
                        (
                            var.to_string(),
                            BoundValue {
                                kind: kind.to_string(),
                                value: value.to_string(),
                                datatype: None,
                                language: None,
                            },
                        )
                    })
                    .collect()
            })
            .collect();
        Self {
            results: BindingSet { bindings },
        }
    }
}
