//! Data preview snapshot used to ground a question.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ContextFetchError;

/// Sample size used when the server omits `sample_rows` or sends zero.
pub const DEFAULT_SAMPLE_ROWS: usize = 5;

/// Wire shape of `GET /api/preview_data/{task_id}/{file_name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub columns: Vec<String>,
    pub total_rows: u64,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
    #[serde(default)]
    pub sample_rows: Option<usize>,
    #[serde(default)]
    pub report_name: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Immutable snapshot fetched once per outgoing question.
#[derive(Debug, Clone, PartialEq)]
pub struct DataContext {
    columns: Vec<String>,
    total_rows: u64,
    sample_rows: Vec<Vec<Value>>,
    requested_sample_size: usize,
}

impl DataContext {
    pub fn new(
        columns: Vec<String>,
        total_rows: u64,
        sample_rows: Vec<Vec<Value>>,
        requested_sample_size: usize,
    ) -> Result<Self, ContextFetchError> {
        let mut seen = HashSet::with_capacity(columns.len());
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(ContextFetchError::InvalidPayload(format!(
                "duplicate column name {dup:?}"
            )));
        }

        let requested_sample_size = if requested_sample_size == 0 {
            DEFAULT_SAMPLE_ROWS
        } else {
            requested_sample_size
        };

        Ok(Self {
            columns,
            total_rows,
            sample_rows,
            requested_sample_size,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn sample_rows(&self) -> &[Vec<Value>] {
        &self.sample_rows
    }

    pub fn requested_sample_size(&self) -> usize {
        self.requested_sample_size
    }

    /// Rows that go into the prompt: `min(len(data), sample_rows)`.
    pub fn visible_samples(&self) -> &[Vec<Value>] {
        let n = self.sample_rows.len().min(self.requested_sample_size);
        &self.sample_rows[..n]
    }
}

impl TryFrom<PreviewResponse> for DataContext {
    type Error = ContextFetchError;

    fn try_from(preview: PreviewResponse) -> Result<Self, Self::Error> {
        DataContext::new(
            preview.columns,
            preview.total_rows,
            preview.data,
            preview.sample_rows.unwrap_or(DEFAULT_SAMPLE_ROWS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_or_zero_sample_rows_falls_back_to_default() {
        let preview: PreviewResponse =
            serde_json::from_value(json!({"columns": ["a"], "total_rows": 3, "data": []}))
                .unwrap();
        let ctx = DataContext::try_from(preview).unwrap();
        assert_eq!(ctx.requested_sample_size(), DEFAULT_SAMPLE_ROWS);

        let ctx = DataContext::new(vec!["a".into()], 0, vec![], 0).unwrap();
        assert_eq!(ctx.requested_sample_size(), DEFAULT_SAMPLE_ROWS);
    }

    #[test]
    fn visible_samples_is_bounded_by_both_sizes() {
        let rows: Vec<Vec<Value>> = (0..8).map(|i| vec![json!(i)]).collect();

        let ctx = DataContext::new(vec!["n".into()], 8, rows.clone(), 3).unwrap();
        assert_eq!(ctx.visible_samples().len(), 3);

        let ctx = DataContext::new(vec!["n".into()], 8, rows[..2].to_vec(), 5).unwrap();
        assert_eq!(ctx.visible_samples().len(), 2);
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let err = DataContext::new(vec!["a".into(), "b".into(), "a".into()], 1, vec![], 5)
            .unwrap_err();
        assert!(matches!(err, ContextFetchError::InvalidPayload(_)));
    }

    #[test]
    fn preview_tolerates_extra_fields() {
        let preview: PreviewResponse = serde_json::from_str(
            r#"{"columns":["x","y"],"data":[[1,"a"]],"total_rows":10,"sample_rows":5,"report_name":"Q3","file_name":"out.csv"}"#,
        )
        .unwrap();
        assert_eq!(preview.report_name.as_deref(), Some("Q3"));
        let ctx = DataContext::try_from(preview).unwrap();
        assert_eq!(ctx.total_rows(), 10);
        assert_eq!(ctx.columns(), ["x", "y"]);
    }
}
