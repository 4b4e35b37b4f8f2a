//! Structured dialect: patterns described as a list of path elements.
//!
//! Each element carries a quantifier, an attribute filter, or both. This is
//! the programmatic counterpart of the textual dialect and compiles into the
//! same `Pattern` representation.

use crate::error::{PatternError, PatternResult};
use crate::pattern::{Pattern, QuantSpec};
use crate::predicate::{Check, CmpOp, Field, Predicate};

/// One filter value in the structured dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Numeric equality.
    Num(f64),
    /// Anchored full-match regex over a string column.
    Str(String),
    /// Numeric comparison, usually written as an operator-prefixed
    /// string like `"> 5"` or `"<= 2.0"`.
    Compare(CmpOp, f64),
    /// Conjunction of several conditions on the same attribute.
    AllOf(Vec<FilterValue>),
}

impl FilterValue {
    /// Interpret a raw string literal: operator-prefixed strings become
    /// numeric comparisons, everything else is a regex.
    pub fn from_str_literal(raw: &str) -> PatternResult<FilterValue> {
        let trimmed = raw.trim();
        // Two-character operators first so "<=" does not lex as "<".
        let prefixes: [(&str, CmpOp); 8] = [
            ("<=", CmpOp::Le),
            (">=", CmpOp::Ge),
            ("==", CmpOp::Eq),
            ("!=", CmpOp::Ne),
            ("<>", CmpOp::Ne),
            ("<", CmpOp::Lt),
            (">", CmpOp::Gt),
            ("=", CmpOp::Eq),
        ];
        for (prefix, op) in prefixes {
            if let Some(rest) = trimmed.strip_prefix(prefix) {
                let value = rest.trim().parse::<f64>().map_err(|_| {
                    PatternError::invalid_filter(format!(
                        "expected a number after '{}' in '{}'",
                        prefix, raw
                    ))
                })?;
                return Ok(FilterValue::Compare(op, value));
            }
        }
        Ok(FilterValue::Str(trimmed.to_string()))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Num(n)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Num(n as f64)
    }
}

/// Ordered attribute conditions for one path position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrFilter {
    checks: Vec<(String, FilterValue)>,
}

impl AttrFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attr: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.checks.push((attr.into(), value.into()));
        self
    }

    /// Add a raw string condition, parsing operator prefixes.
    pub fn with_str(mut self, attr: impl Into<String>, raw: &str) -> PatternResult<Self> {
        self.checks
            .push((attr.into(), FilterValue::from_str_literal(raw)?));
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

/// One position in a structured-dialect path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathElement {
    /// Quantifier only, matching any node.
    Quant(QuantSpec),
    /// Filter only, with the default exactly-one quantifier.
    Filter(AttrFilter),
    /// Both quantifier and filter.
    Both(QuantSpec, AttrFilter),
}

/// Compile a structured-dialect path into a pattern.
pub fn compile_object_dialect(path: &[PathElement]) -> PatternResult<Pattern> {
    if path.is_empty() {
        return Err(PatternError::invalid_path(
            "structured query must have at least one path element",
        ));
    }

    let mut pattern = Pattern::new();
    for (index, element) in path.iter().enumerate() {
        let (spec, predicate) = match element {
            PathElement::Quant(spec) => (*spec, Predicate::True),
            PathElement::Filter(filter) => (QuantSpec::One, compile_filter(filter)?),
            PathElement::Both(spec, filter) => (*spec, compile_filter(filter)?),
        };
        pattern = if index == 0 {
            pattern.start(spec, predicate)
        } else {
            pattern.relate(spec, predicate)?
        };
    }
    Ok(pattern)
}

fn compile_filter(filter: &AttrFilter) -> PatternResult<Predicate> {
    if filter.is_empty() {
        tracing::warn!("empty attribute filter matches every node");
        return Ok(Predicate::True);
    }
    let mut predicates = Vec::with_capacity(filter.checks.len());
    for (attr, value) in &filter.checks {
        predicates.push(compile_condition(attr, value)?);
    }
    Ok(Predicate::all(predicates))
}

fn compile_condition(attr: &str, value: &FilterValue) -> PatternResult<Predicate> {
    let field = Field::named(attr);
    match value {
        // depth -1 is shorthand for "node is a leaf"
        FilterValue::Num(n) if field == Field::Depth && *n == -1.0 => {
            Ok(Predicate::Check(Check::IsLeaf))
        }
        FilterValue::Num(n) => Ok(Predicate::Check(Check::Cmp(field, CmpOp::Eq, *n))),
        FilterValue::Compare(op, n) => Ok(Predicate::Check(Check::Cmp(field, *op, *n))),
        FilterValue::Str(pattern) => {
            if matches!(field, Field::Depth | Field::NodeIndex) {
                return Err(PatternError::invalid_filter(format!(
                    "'{}' takes a numeric condition, got string '{}'",
                    attr, pattern
                )));
            }
            Ok(Predicate::Check(Check::matches(field, pattern)?))
        }
        FilterValue::AllOf(values) => {
            let parts = values
                .iter()
                .map(|v| compile_condition(attr, v))
                .collect::<PatternResult<Vec<_>>>()?;
            Ok(Predicate::all(parts))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Quantifier;

    #[test]
    fn test_compile_mixed_path() {
        // GIVEN quantifier-only, filter-only, and combined elements
        let path = vec![
            PathElement::Quant(QuantSpec::ZeroOrMore),
            PathElement::Filter(AttrFilter::new().with("time", 5.0)),
            PathElement::Both(
                QuantSpec::OneOrMore,
                AttrFilter::new().with_str("name", "mpi_.*").unwrap(),
            ),
        ];

        // WHEN compiled
        let pattern = compile_object_dialect(&path).unwrap();

        // THEN "+" expanded the path to four positions
        assert_eq!(pattern.len(), 4);
        assert_eq!(pattern[0].quantifier, Quantifier::ZeroOrMore);
        assert_eq!(pattern[1].quantifier, Quantifier::One);
        assert_eq!(pattern[2].quantifier, Quantifier::One);
        assert_eq!(pattern[3].quantifier, Quantifier::ZeroOrMore);
    }

    #[test]
    fn test_operator_prefixed_strings() {
        assert_eq!(
            FilterValue::from_str_literal("> 5").unwrap(),
            FilterValue::Compare(CmpOp::Gt, 5.0)
        );
        assert_eq!(
            FilterValue::from_str_literal("<=2.5").unwrap(),
            FilterValue::Compare(CmpOp::Le, 2.5)
        );
        assert_eq!(
            FilterValue::from_str_literal("!= 0").unwrap(),
            FilterValue::Compare(CmpOp::Ne, 0.0)
        );
        assert_eq!(
            FilterValue::from_str_literal("<> 0").unwrap(),
            FilterValue::Compare(CmpOp::Ne, 0.0)
        );
        assert_eq!(
            FilterValue::from_str_literal("mpi_.*").unwrap(),
            FilterValue::Str("mpi_.*".into())
        );
        assert!(FilterValue::from_str_literal("> fast").is_err());
    }

    #[test]
    fn test_depth_minus_one_means_leaf() {
        let path = vec![PathElement::Filter(AttrFilter::new().with("depth", -1i64))];
        let pattern = compile_object_dialect(&path).unwrap();
        assert!(matches!(
            pattern[0].predicate,
            Predicate::Check(Check::IsLeaf)
        ));
    }

    #[test]
    fn test_string_condition_on_metadata_is_error() {
        let path = vec![PathElement::Filter(
            AttrFilter::new().with_str("depth", "deep").unwrap(),
        )];
        let err = compile_object_dialect(&path).unwrap_err();
        assert!(matches!(err, PatternError::InvalidFilter { .. }));
    }

    #[test]
    fn test_empty_path_is_error() {
        assert!(matches!(
            compile_object_dialect(&[]).unwrap_err(),
            PatternError::InvalidPath { .. }
        ));
    }

    #[test]
    fn test_all_of_conjoins_on_one_attribute() {
        let filter = AttrFilter::new().with(
            "time",
            FilterValue::AllOf(vec![
                FilterValue::Compare(CmpOp::Gt, 1.0),
                FilterValue::Compare(CmpOp::Lt, 10.0),
            ]),
        );
        let pattern = compile_object_dialect(&[PathElement::Filter(filter)]).unwrap();
        assert!(matches!(pattern[0].predicate, Predicate::And(_, _)));
    }
}
