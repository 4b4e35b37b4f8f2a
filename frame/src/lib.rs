//! Canopy Frame
//!
//! Per-node metric store: each call-graph node owns one or more rows of
//! named metric values. Columns are typed; the type is fixed by the first
//! value inserted into a column.
//!
//! Multi-indexed data (one row per node per measurement rank) is supported:
//! inserting with a rank marks the frame multi-indexed, and query engines
//! must pick an aggregation mode before filtering such a frame.

use canopy_core::{NodeId, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Result type for frame operations.
pub type FrameResult<T> = Result<T, FrameError>;

/// Errors raised while building a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Column '{column}' holds {existing} values, cannot insert {offered}")]
    ColumnTypeConflict {
        column: String,
        existing: &'static str,
        offered: &'static str,
    },
}

/// The type of a metric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Numeric,
    Str,
    Boolean,
}

impl ColumnType {
    fn of(value: &Value) -> Option<ColumnType> {
        match value {
            Value::Int(_) | Value::Float(_) => Some(ColumnType::Numeric),
            Value::String(_) => Some(ColumnType::Str),
            Value::Bool(_) => Some(ColumnType::Boolean),
            // Nulls carry no type information.
            Value::Null => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Str => "string",
            ColumnType::Boolean => "boolean",
        }
    }
}

/// One observation for one node: metric name -> value.
pub type MetricRow = HashMap<String, Value>;

/// Per-node metric table.
#[derive(Debug, Clone, Default)]
pub struct MetricFrame {
    rows: HashMap<NodeId, Vec<MetricRow>>,
    columns: HashMap<String, ColumnType>,
    multi_indexed: bool,
}

impl MetricFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a single-index row for `node`. A node given two single-index
    /// rows becomes multi-valued, which also marks the frame multi-indexed.
    pub fn insert(&mut self, node: NodeId, values: MetricRow) -> FrameResult<()> {
        self.record_columns(&values)?;
        let rows = self.rows.entry(node).or_default();
        rows.push(values);
        if rows.len() > 1 {
            self.multi_indexed = true;
        }
        Ok(())
    }

    /// Insert a row for `node` at a specific measurement rank. Ranked data
    /// is always multi-indexed, even with one row per node.
    pub fn insert_ranked(
        &mut self,
        node: NodeId,
        _rank: usize,
        values: MetricRow,
    ) -> FrameResult<()> {
        self.record_columns(&values)?;
        self.rows.entry(node).or_default().push(values);
        self.multi_indexed = true;
        Ok(())
    }

    fn record_columns(&mut self, values: &MetricRow) -> FrameResult<()> {
        for (name, value) in values {
            let Some(offered) = ColumnType::of(value) else {
                continue;
            };
            match self.columns.get(name) {
                None => {
                    self.columns.insert(name.clone(), offered);
                }
                Some(existing) if *existing != offered => {
                    return Err(FrameError::ColumnTypeConflict {
                        column: name.clone(),
                        existing: existing.name(),
                        offered: offered.name(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// All rows recorded for `node`. Nodes absent from the frame have no rows.
    pub fn rows(&self, node: NodeId) -> &[MetricRow] {
        self.rows.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The type of a column, if any value was ever inserted for it.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.get(name).copied()
    }

    /// True when any node carries more than one row (or ranked rows).
    pub fn is_multi_indexed(&self) -> bool {
        self.multi_indexed
    }

    /// Nodes present in the frame, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.rows.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::metrics;

    #[test]
    fn test_column_types_inferred() {
        let mut frame = MetricFrame::new();
        frame
            .insert(NodeId::new(0), metrics! { "name" => "main", "time" => 5.0 })
            .unwrap();

        assert_eq!(frame.column_type("name"), Some(ColumnType::Str));
        assert_eq!(frame.column_type("time"), Some(ColumnType::Numeric));
        assert_eq!(frame.column_type("missing"), None);
        assert!(!frame.is_multi_indexed());
    }

    #[test]
    fn test_column_type_conflict() {
        let mut frame = MetricFrame::new();
        frame
            .insert(NodeId::new(0), metrics! { "time" => 5.0 })
            .unwrap();
        let err = frame
            .insert(NodeId::new(1), metrics! { "time" => "fast" })
            .unwrap_err();
        assert!(matches!(err, FrameError::ColumnTypeConflict { .. }));
    }

    #[test]
    fn test_int_and_float_share_numeric() {
        let mut frame = MetricFrame::new();
        frame
            .insert(NodeId::new(0), metrics! { "calls" => 3i64 })
            .unwrap();
        frame
            .insert(NodeId::new(1), metrics! { "calls" => 2.5 })
            .unwrap();
        assert_eq!(frame.column_type("calls"), Some(ColumnType::Numeric));
    }

    #[test]
    fn test_ranked_rows_mark_multi_indexed() {
        let mut frame = MetricFrame::new();
        frame
            .insert_ranked(NodeId::new(0), 0, metrics! { "time" => 1.0 })
            .unwrap();
        frame
            .insert_ranked(NodeId::new(0), 1, metrics! { "time" => 9.0 })
            .unwrap();

        assert!(frame.is_multi_indexed());
        assert_eq!(frame.rows(NodeId::new(0)).len(), 2);
        assert!(frame.rows(NodeId::new(5)).is_empty());
    }
}
