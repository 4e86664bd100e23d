use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Ordered, duplicate-free set of column labels.
///
/// Labels are trimmed on construction. Blank entries (a stray empty line in a
/// text area, say) are dropped; a set with no labels left is rejected, as is
/// any exact duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ColumnSet {
    labels: Vec<String>,
}

impl ColumnSet {
    pub fn new<I, S>(labels: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels: Vec<String> = labels
            .into_iter()
            .map(|label| label.as_ref().trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();

        if labels.is_empty() {
            return Err(Error::validation("column list must not be empty"));
        }

        let mut seen = HashSet::with_capacity(labels.len());
        let duplicates: Vec<&str> = labels
            .iter()
            .filter(|label| !seen.insert(label.as_str()))
            .map(String::as_str)
            .collect();
        if !duplicates.is_empty() {
            return Err(Error::validation(format!(
                "duplicate column names: {}",
                duplicates.join(", ")
            )));
        }

        Ok(Self { labels })
    }

    /// One label per line, as typed into a multi-line text box.
    pub fn from_lines(text: &str) -> Result<Self, Error> {
        Self::new(text.lines())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.labels.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}

impl TryFrom<Vec<String>> for ColumnSet {
    type Error = Error;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(labels)
    }
}

impl From<ColumnSet> for Vec<String> {
    fn from(columns: ColumnSet) -> Self {
        columns.labels
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

impl std::fmt::Display for ColumnSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.labels.join(", "))
    }
}
