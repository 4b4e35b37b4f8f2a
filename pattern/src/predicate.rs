//! Composed predicate objects evaluated against per-node metric rows.

use crate::error::{PatternError, PatternResult};
use canopy_frame::{ColumnType, MetricFrame, MetricRow};
use regex_lite::Regex;

/// What a check reads: node metadata or a metric column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Distance from the nearest root.
    Depth,
    /// The node's identity.
    NodeIndex,
    /// A named metric column.
    Attr(String),
}

impl Field {
    /// Resolve a surface name. `depth` and `node_id` are reserved and read
    /// node metadata; everything else reads the metric row.
    pub fn named(name: &str) -> Field {
        match name {
            "depth" => Field::Depth,
            "node_id" => Field::NodeIndex,
            other => Field::Attr(other.to_string()),
        }
    }

    fn display_name(&self) -> &str {
        match self {
            Field::Depth => "depth",
            Field::NodeIndex => "node_id",
            Field::Attr(name) => name,
        }
    }
}

/// Numeric comparison operator. NaN operands follow IEEE semantics: every
/// ordering and equality comparison is false, `Ne` is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CmpOp {
    pub fn eval(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
        }
    }
}

/// One atomic check on one field.
#[derive(Debug, Clone)]
pub enum Check {
    /// Exact string equality.
    StrEq(Field, String),
    StartsWith(Field, String),
    EndsWith(Field, String),
    Contains(Field, String),
    /// Anchored full-string regex match.
    Matches(Field, Regex),
    /// Numeric comparison against a constant.
    Cmp(Field, CmpOp, f64),
    IsNan(Field),
    IsInf(Field),
    IsNone(Field),
    IsLeaf,
}

impl Check {
    /// Build a regex check. The pattern is anchored so it must match the
    /// whole value.
    pub fn matches(field: Field, pattern: &str) -> PatternResult<Check> {
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|err| {
            PatternError::invalid_filter(format!("bad regex '{}': {}", pattern, err))
        })?;
        Ok(Check::Matches(field, regex))
    }

    fn eval(&self, ctx: &RowContext<'_>) -> PatternResult<bool> {
        match self {
            Check::StrEq(field, want) => {
                Ok(ctx.string_field(field)?.is_some_and(|v| v == want.as_str()))
            }
            Check::StartsWith(field, prefix) => Ok(ctx
                .string_field(field)?
                .is_some_and(|v| v.starts_with(prefix.as_str()))),
            Check::EndsWith(field, suffix) => Ok(ctx
                .string_field(field)?
                .is_some_and(|v| v.ends_with(suffix.as_str()))),
            Check::Contains(field, needle) => Ok(ctx
                .string_field(field)?
                .is_some_and(|v| v.contains(needle.as_str()))),
            Check::Matches(field, regex) => {
                Ok(ctx.string_field(field)?.is_some_and(|v| regex.is_match(v)))
            }
            Check::Cmp(field, op, rhs) => {
                Ok(ctx.numeric_field(field)?.is_some_and(|lhs| op.eval(lhs, *rhs)))
            }
            Check::IsNan(field) => Ok(ctx.numeric_field(field)?.is_some_and(f64::is_nan)),
            Check::IsInf(field) => Ok(ctx.numeric_field(field)?.is_some_and(f64::is_infinite)),
            Check::IsNone(field) => Ok(ctx.field_is_none(field)),
            Check::IsLeaf => Ok(ctx.is_leaf),
        }
    }
}

/// A predicate over one row of one node. Built once per query, evaluated
/// many times during candidate generation.
#[derive(Debug, Clone, Default)]
pub enum Predicate {
    /// Always true.
    #[default]
    True,
    Check(Check),
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// Conjunction of all given predicates; empty input is `True`.
    pub fn all(predicates: Vec<Predicate>) -> Predicate {
        let mut iter = predicates.into_iter();
        let Some(first) = iter.next() else {
            return Predicate::True;
        };
        iter.fold(first, |acc, p| acc.and(p))
    }

    /// Evaluate against one row. Missing columns make a check false; a
    /// check whose operand type contradicts the column type is an error.
    pub fn eval(&self, ctx: &RowContext<'_>) -> PatternResult<bool> {
        match self {
            Predicate::True => Ok(true),
            Predicate::Check(check) => check.eval(ctx),
            Predicate::Not(inner) => Ok(!inner.eval(ctx)?),
            Predicate::And(lhs, rhs) => Ok(lhs.eval(ctx)? && rhs.eval(ctx)?),
            Predicate::Or(lhs, rhs) => Ok(lhs.eval(ctx)? || rhs.eval(ctx)?),
        }
    }
}

impl From<Check> for Predicate {
    fn from(check: Check) -> Self {
        Predicate::Check(check)
    }
}

/// Evaluation context: one metric row plus the node's graph metadata.
pub struct RowContext<'a> {
    pub depth: i64,
    pub node_index: u64,
    pub is_leaf: bool,
    pub row: &'a MetricRow,
    pub frame: &'a MetricFrame,
}

impl<'a> RowContext<'a> {
    /// Numeric view of a field. `None` means the check should be false
    /// (unknown column, missing value, or null).
    fn numeric_field(&self, field: &Field) -> PatternResult<Option<f64>> {
        match field {
            Field::Depth => Ok(Some(self.depth as f64)),
            Field::NodeIndex => Ok(Some(self.node_index as f64)),
            Field::Attr(name) => match self.frame.column_type(name) {
                None => Ok(None),
                Some(ColumnType::Numeric) => {
                    Ok(self.row.get(name).and_then(|v| v.as_f64()))
                }
                Some(other) => Err(PatternError::invalid_filter(format!(
                    "numeric comparison on {} column '{}'",
                    other.name(),
                    name
                ))),
            },
        }
    }

    /// String view of a field, with the same missing/typed rules.
    fn string_field(&self, field: &Field) -> PatternResult<Option<&str>> {
        match field {
            Field::Depth | Field::NodeIndex => Err(PatternError::invalid_filter(format!(
                "string operation on numeric field '{}'",
                field.display_name()
            ))),
            Field::Attr(name) => match self.frame.column_type(name) {
                None => Ok(None),
                Some(ColumnType::Str) => Ok(self.row.get(name).and_then(|v| v.as_str())),
                Some(other) => Err(PatternError::invalid_filter(format!(
                    "string operation on {} column '{}'",
                    other.name(),
                    name
                ))),
            },
        }
    }

    fn field_is_none(&self, field: &Field) -> bool {
        match field {
            // Metadata fields always carry a value.
            Field::Depth | Field::NodeIndex => false,
            Field::Attr(name) => {
                if self.frame.column_type(name).is_none() {
                    return false;
                }
                self.row.get(name).is_none_or(|v| v.is_null())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::metrics;
    use canopy_core::NodeId;

    fn frame() -> MetricFrame {
        let mut frame = MetricFrame::new();
        frame
            .insert(
                NodeId::new(0),
                metrics! { "name" => "mpi_send", "time" => 5.0 },
            )
            .unwrap();
        frame
    }

    fn ctx<'a>(frame: &'a MetricFrame, row: &'a MetricRow) -> RowContext<'a> {
        RowContext {
            depth: 2,
            node_index: 7,
            is_leaf: false,
            row,
            frame,
        }
    }

    #[test]
    fn test_numeric_comparisons() {
        let frame = frame();
        let row = metrics! { "time" => 5.0 };
        let ctx = ctx(&frame, &row);

        let check = |op, rhs| {
            Predicate::from(Check::Cmp(Field::Attr("time".into()), op, rhs))
                .eval(&ctx)
                .unwrap()
        };
        assert!(check(CmpOp::Eq, 5.0));
        assert!(check(CmpOp::Ge, 5.0));
        assert!(!check(CmpOp::Lt, 5.0));
        assert!(check(CmpOp::Ne, 4.0));
    }

    #[test]
    fn test_nan_compares_false() {
        let frame = frame();
        let row = metrics! { "time" => f64::NAN };
        let ctx = ctx(&frame, &row);

        for op in [CmpOp::Eq, CmpOp::Lt, CmpOp::Gt, CmpOp::Le, CmpOp::Ge] {
            let pred = Predicate::from(Check::Cmp(Field::Attr("time".into()), op, 5.0));
            assert!(!pred.eval(&ctx).unwrap(), "{:?} should be false on NaN", op);
        }
        let is_nan = Predicate::from(Check::IsNan(Field::Attr("time".into())));
        assert!(is_nan.eval(&ctx).unwrap());
    }

    #[test]
    fn test_missing_column_is_false_not_error() {
        let frame = frame();
        let row = metrics! { "time" => 5.0 };
        let ctx = ctx(&frame, &row);

        let pred = Predicate::from(Check::Cmp(Field::Attr("nonexistent".into()), CmpOp::Gt, 0.0));
        assert!(!pred.eval(&ctx).unwrap());
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let frame = frame();
        let row = metrics! { "name" => "mpi_send" };
        let ctx = ctx(&frame, &row);

        // WHEN comparing a string column numerically
        let err = Predicate::from(Check::Cmp(Field::Attr("name".into()), CmpOp::Gt, 0.0))
            .eval(&ctx)
            .unwrap_err();
        assert!(matches!(err, PatternError::InvalidFilter { .. }));

        // AND WHEN string-matching a numeric column
        let err = Predicate::from(Check::StrEq(Field::Attr("time".into()), "x".into()))
            .eval(&ctx)
            .unwrap_err();
        assert!(matches!(err, PatternError::InvalidFilter { .. }));
    }

    #[test]
    fn test_regex_is_anchored() {
        let frame = frame();
        let row = metrics! { "name" => "mpi_send" };
        let ctx = ctx(&frame, &row);

        let full = Check::matches(Field::Attr("name".into()), "mpi_.*").unwrap();
        assert!(Predicate::from(full).eval(&ctx).unwrap());

        // Partial match is not enough.
        let partial = Check::matches(Field::Attr("name".into()), "mpi").unwrap();
        assert!(!Predicate::from(partial).eval(&ctx).unwrap());
    }

    #[test]
    fn test_metadata_fields() {
        let frame = frame();
        let row = metrics! { "time" => 5.0 };
        let ctx = ctx(&frame, &row);

        let depth = Predicate::from(Check::Cmp(Field::Depth, CmpOp::Eq, 2.0));
        assert!(depth.eval(&ctx).unwrap());
        let node = Predicate::from(Check::Cmp(Field::NodeIndex, CmpOp::Eq, 7.0));
        assert!(node.eval(&ctx).unwrap());
        let leaf = Predicate::from(Check::IsLeaf);
        assert!(!leaf.eval(&ctx).unwrap());
    }

    #[test]
    fn test_is_none_on_null_and_absent_values() {
        let mut frame = frame();
        frame
            .insert(NodeId::new(1), metrics! { "time" => 1.0 })
            .unwrap();

        let null_row: MetricRow = [("time".to_string(), canopy_core::Value::Null)]
            .into_iter()
            .collect();
        let pred = Predicate::from(Check::IsNone(Field::Attr("time".into())));
        assert!(pred.eval(&ctx(&frame, &null_row)).unwrap());

        // Column exists but this row has no value for it.
        let empty_row: MetricRow = metrics!();
        assert!(pred.eval(&ctx(&frame, &empty_row)).unwrap());

        // Unknown column follows the missing-column rule.
        let pred = Predicate::from(Check::IsNone(Field::Attr("bogus".into())));
        assert!(!pred.eval(&ctx(&frame, &empty_row)).unwrap());
    }

    #[test]
    fn test_boolean_combinators() {
        let frame = frame();
        let row = metrics! { "time" => 5.0 };
        let ctx = ctx(&frame, &row);

        let gt = || Predicate::from(Check::Cmp(Field::Attr("time".into()), CmpOp::Gt, 4.0));
        let lt = || Predicate::from(Check::Cmp(Field::Attr("time".into()), CmpOp::Lt, 4.0));

        assert!(gt().and(gt()).eval(&ctx).unwrap());
        assert!(!gt().and(lt()).eval(&ctx).unwrap());
        assert!(gt().or(lt()).eval(&ctx).unwrap());
        assert!(lt().negate().eval(&ctx).unwrap());
        assert!(Predicate::all(vec![]).eval(&ctx).unwrap());
    }
}
