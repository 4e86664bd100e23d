use serde::{Deserialize, Serialize};

use crate::columns::ColumnSet;
use crate::error::Error;

/// A validated request for `row_count` rows over `columns`.
///
/// Construction fails fast on a blank prompt or an out-of-range row count,
/// so nothing downstream has to re-check its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    columns: ColumnSet,
    prompt: String,
    row_count: usize,
}

impl GenerationRequest {
    pub fn new(
        columns: ColumnSet,
        prompt: &str,
        row_count: usize,
        max_rows: usize,
    ) -> Result<Self, Error> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::validation("prompt must not be empty"));
        }
        if row_count < 1 || row_count > max_rows {
            return Err(Error::validation(format!(
                "row count must be between 1 and {max_rows}, got {row_count}"
            )));
        }
        Ok(Self {
            columns,
            prompt: prompt.to_string(),
            row_count,
        })
    }

    /// A follow-up request over the same columns.
    ///
    /// Only used for deficits, which are strictly smaller than the original
    /// count, so the row bound is inherited rather than re-checked.
    pub fn follow_up(&self, prompt: impl Into<String>, row_count: usize) -> Result<Self, Error> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(Error::validation("prompt must not be empty"));
        }
        if row_count == 0 || row_count > self.row_count {
            return Err(Error::validation(format!(
                "follow-up row count must be between 1 and {}, got {row_count}",
                self.row_count
            )));
        }
        Ok(Self {
            columns: self.columns.clone(),
            prompt,
            row_count,
        })
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }
}
