//! Textual dialect: `MATCH ... WHERE ...` queries, plus the curly-brace
//! grouping extension that combines several queries with AND/OR/XOR.
//!
//! Grouping comes in two shapes that cannot be mixed:
//! - whole queries: `{MATCH ... WHERE ...} OR {MATCH ... WHERE ...}`
//! - shared-path fragments: `MATCH (p)->(q) WHERE {p."a" > 1} AND {q."b" > 2}`

use std::collections::HashMap;

use canopy_parser::{
    parse_query, Condition, ConditionKind, Connector, NumOpKind, QuantToken, StringOpKind,
};

use crate::compound::{CompoundQuery, Query, SetOp};
use crate::error::{PatternError, PatternResult};
use crate::pattern::{Pattern, QuantSpec};
use crate::predicate::{Check, CmpOp, Field, Predicate};

/// Compile textual-dialect input into a query.
pub fn compile_string_dialect(input: &str) -> PatternResult<Query> {
    let grouping = split_groups(input)?;
    let Some(grouping) = grouping else {
        return Ok(Query::Pattern(compile_single(input)?));
    };

    let whole_queries = grouping
        .groups
        .iter()
        .map(|g| starts_with_match(g))
        .collect::<Vec<_>>();
    if whole_queries.iter().any(|w| *w) && whole_queries.iter().any(|w| !*w) {
        return Err(PatternError::invalid_path(
            "cannot mix full queries and predicate fragments in one grouping",
        ));
    }

    let subqueries: Vec<Query> = if whole_queries[0] {
        if !grouping.prefix.trim().is_empty() {
            return Err(PatternError::invalid_path(
                "unexpected text before a full-query group",
            ));
        }
        grouping
            .groups
            .iter()
            .map(|g| compile_string_dialect(g))
            .collect::<PatternResult<_>>()?
    } else {
        // Fragments share one MATCH clause taken from the prefix.
        let path = shared_match_path(&grouping.prefix)?;
        grouping
            .groups
            .iter()
            .map(|g| compile_string_dialect(&format!("MATCH {} WHERE {}", path, g)))
            .collect::<PatternResult<_>>()?
    };

    let mut iter = subqueries.into_iter();
    let mut result = iter
        .next()
        .ok_or_else(|| PatternError::invalid_path("empty query grouping"))?;
    for (op, sub) in grouping.ops.into_iter().zip(iter) {
        result = Query::Compound(CompoundQuery {
            op,
            subqueries: vec![result, sub],
        });
    }
    Ok(result)
}

struct Grouping {
    /// Text before the first group (the shared MATCH clause, if any).
    prefix: String,
    groups: Vec<String>,
    /// Connectors between consecutive groups; always `groups.len() - 1`.
    ops: Vec<SetOp>,
}

/// Split top-level `{...}` groups out of the input. Returns `None` when the
/// input has no groups and should compile as a single query.
fn split_groups(input: &str) -> PatternResult<Option<Grouping>> {
    let mut prefix = String::new();
    let mut groups: Vec<String> = Vec::new();
    let mut between: Vec<String> = Vec::new();
    let mut outside = String::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string {
            if depth == 0 {
                outside.push(c);
            } else {
                current.push(c);
            }
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                if depth == 0 {
                    outside.push(c);
                } else {
                    current.push(c);
                }
            }
            '{' => {
                if depth == 0 {
                    if groups.is_empty() {
                        prefix = std::mem::take(&mut outside);
                    } else {
                        between.push(std::mem::take(&mut outside));
                    }
                } else {
                    current.push(c);
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    return Err(PatternError::invalid_path("unbalanced '}' in query"));
                }
                depth -= 1;
                if depth == 0 {
                    groups.push(std::mem::take(&mut current));
                } else {
                    current.push(c);
                }
            }
            _ => {
                if depth == 0 {
                    outside.push(c);
                } else {
                    current.push(c);
                }
            }
        }
    }
    if depth != 0 || in_string {
        return Err(PatternError::invalid_path("unbalanced '{' in query"));
    }
    if groups.is_empty() {
        return Ok(None);
    }
    if !outside.trim().is_empty() {
        return Err(PatternError::invalid_path(
            "unexpected text after the last query group",
        ));
    }

    let ops = between
        .iter()
        .map(|text| match text.trim().to_uppercase().as_str() {
            "AND" => Ok(SetOp::And),
            "OR" => Ok(SetOp::Or),
            "XOR" => Ok(SetOp::Xor),
            other => Err(PatternError::invalid_path(format!(
                "expected AND, OR, or XOR between query groups, found '{}'",
                other
            ))),
        })
        .collect::<PatternResult<Vec<_>>>()?;

    Ok(Some(Grouping {
        prefix,
        groups,
        ops,
    }))
}

fn starts_with_match(group: &str) -> bool {
    group
        .trim_start()
        .get(..5)
        .is_some_and(|head| head.eq_ignore_ascii_case("MATCH"))
}

/// Extract the path text from a shared `MATCH <path> WHERE` prefix.
fn shared_match_path(prefix: &str) -> PatternResult<&str> {
    let trimmed = prefix.trim();
    let after_match = trimmed
        .get(..5)
        .filter(|head| head.eq_ignore_ascii_case("MATCH"))
        .map(|_| &trimmed[5..])
        .ok_or_else(|| {
            PatternError::invalid_path("predicate fragments need a shared MATCH clause")
        })?;
    let body = after_match.trim_end();
    let split = body.len().checked_sub(5).filter(|at| {
        body.is_char_boundary(*at) && body[*at..].eq_ignore_ascii_case("WHERE")
    });
    let Some(at) = split else {
        return Err(PatternError::invalid_path(
            "shared MATCH clause must end with WHERE",
        ));
    };
    Ok(body[..at].trim())
}

/// Column type a condition expects of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expected {
    Numeric,
    Str,
}

impl Expected {
    fn name(&self) -> &'static str {
        match self {
            Expected::Numeric => "numeric",
            Expected::Str => "string",
        }
    }
}

/// Compile one brace-free `MATCH ... WHERE ...` query into a pattern.
fn compile_single(input: &str) -> PatternResult<Pattern> {
    let ast = parse_query(input)?;

    // Bind names to path positions.
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut specs = Vec::with_capacity(ast.path.len());
    for (index, node_ref) in ast.path.iter().enumerate() {
        if let Some(name) = &node_ref.name {
            if positions.insert(name.as_str(), index).is_some() {
                return Err(PatternError::invalid_path(format!(
                    "name '{}' is bound twice in the MATCH clause",
                    name
                )));
            }
        }
        let spec = match &node_ref.quant {
            None => QuantSpec::One,
            Some(QuantToken::Str(token)) => QuantSpec::parse_str(token)?,
            Some(QuantToken::Int(count)) => QuantSpec::parse_int(*count)?,
        };
        specs.push(spec);
    }

    // One predicate accumulator per path position; the WHERE chain folds
    // left to right into the position each condition names.
    let mut predicates: Vec<Option<Predicate>> = vec![None; ast.path.len()];
    let mut expectations: HashMap<(usize, String), Expected> = HashMap::new();
    for condition in &ast.conditions {
        let name = condition.kind.binding();
        let &index = positions.get(name).ok_or_else(|| {
            PatternError::invalid_path(format!(
                "condition references '{}', which is not bound in the MATCH clause",
                name
            ))
        })?;
        record_expectation(&mut expectations, index, condition)?;
        let predicate = compile_condition(condition)?;
        predicates[index] = Some(match (predicates[index].take(), condition.connector) {
            (None, _) => predicate,
            (Some(acc), Connector::Or) => acc.or(predicate),
            (Some(acc), _) => acc.and(predicate),
        });
    }

    let mut pattern = Pattern::new();
    for (index, spec) in specs.into_iter().enumerate() {
        let predicate = predicates[index].take().unwrap_or(Predicate::True);
        pattern = if index == 0 {
            pattern.start(spec, predicate)
        } else {
            pattern.relate(spec, predicate)?
        };
    }
    Ok(pattern)
}

/// Reject a metric used as two incompatible types across the WHERE chain.
fn record_expectation(
    expectations: &mut HashMap<(usize, String), Expected>,
    index: usize,
    condition: &Condition,
) -> PatternResult<()> {
    let (metric, expected) = match &condition.kind {
        ConditionKind::StringCmp { metric, .. } => (metric, Expected::Str),
        ConditionKind::NumberCmp { metric, .. } => (metric, Expected::Numeric),
        ConditionKind::IsNan { metric, .. } | ConditionKind::IsInf { metric, .. } => {
            (metric, Expected::Numeric)
        }
        // IS NONE and IS LEAF constrain no column type.
        ConditionKind::IsNone { .. } | ConditionKind::IsLeaf { .. } => return Ok(()),
    };
    match expectations.insert((index, metric.clone()), expected) {
        Some(previous) if previous != expected => Err(PatternError::invalid_filter(format!(
            "metric '{}' is used as both {} and {}",
            metric,
            previous.name(),
            expected.name()
        ))),
        _ => Ok(()),
    }
}

fn compile_condition(condition: &Condition) -> PatternResult<Predicate> {
    let check = match &condition.kind {
        ConditionKind::StringCmp {
            metric, op, value, ..
        } => {
            let field = Field::named(metric);
            if matches!(field, Field::Depth | Field::NodeIndex) {
                return Err(PatternError::invalid_filter(format!(
                    "'{}' takes a numeric condition, got string '{}'",
                    metric, value
                )));
            }
            match op {
                StringOpKind::Eq => Predicate::Check(Check::StrEq(field, value.clone())),
                StringOpKind::StartsWith => {
                    Predicate::Check(Check::StartsWith(field, value.clone()))
                }
                StringOpKind::EndsWith => Predicate::Check(Check::EndsWith(field, value.clone())),
                StringOpKind::Contains => Predicate::Check(Check::Contains(field, value.clone())),
                StringOpKind::Matches => Predicate::Check(Check::matches(field, value)?),
            }
        }
        ConditionKind::NumberCmp {
            metric, op, value, ..
        } => {
            let cmp = match op {
                NumOpKind::Eq => CmpOp::Eq,
                NumOpKind::Lt => CmpOp::Lt,
                NumOpKind::Gt => CmpOp::Gt,
                NumOpKind::Le => CmpOp::Le,
                NumOpKind::Ge => CmpOp::Ge,
            };
            Predicate::Check(Check::Cmp(Field::named(metric), cmp, *value))
        }
        ConditionKind::IsNone {
            metric, negated, ..
        } => negatable(Check::IsNone(Field::named(metric)), *negated),
        ConditionKind::IsNan {
            metric, negated, ..
        } => negatable(Check::IsNan(Field::named(metric)), *negated),
        ConditionKind::IsInf {
            metric, negated, ..
        } => negatable(Check::IsInf(Field::named(metric)), *negated),
        ConditionKind::IsLeaf { negated, .. } => negatable(Check::IsLeaf, *negated),
    };
    Ok(if condition.negated {
        check.negate()
    } else {
        check
    })
}

fn negatable(check: Check, negated: bool) -> Predicate {
    let predicate = Predicate::Check(check);
    if negated {
        predicate.negate()
    } else {
        predicate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Quantifier;

    fn pattern(query: &Query) -> &Pattern {
        match query {
            Query::Pattern(p) => p,
            other => panic!("expected a plain pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_single_query() {
        // GIVEN a two-position query with conditions on both names
        let q = compile_string_dialect(
            r#"MATCH ("*", p)->(q) WHERE p."time" > 5 AND q."name" = "main""#,
        )
        .unwrap();

        // THEN both positions carry their predicates
        let p = pattern(&q);
        assert_eq!(p.len(), 2);
        assert_eq!(p[0].quantifier, Quantifier::ZeroOrMore);
        assert!(matches!(p[0].predicate, Predicate::Check(_)));
        assert_eq!(p[1].quantifier, Quantifier::One);
        assert!(matches!(p[1].predicate, Predicate::Check(_)));
    }

    #[test]
    fn test_unconstrained_name_matches_anything() {
        let q = compile_string_dialect(r#"MATCH (p)->(q) WHERE p."time" > 5"#).unwrap();
        assert!(matches!(pattern(&q)[1].predicate, Predicate::True));
    }

    #[test]
    fn test_condition_chain_folds_per_name() {
        let q = compile_string_dialect(
            r#"MATCH (p) WHERE p."time" > 5 OR p."time" IS NAN AND NOT p."name" = "main""#,
        )
        .unwrap();
        // ((time > 5 OR time IS NAN) AND NOT name = "main")
        assert!(matches!(pattern(&q)[0].predicate, Predicate::And(_, _)));
    }

    #[test]
    fn test_unbound_name_is_error() {
        let err = compile_string_dialect(r#"MATCH (p) WHERE q."time" > 5"#).unwrap_err();
        assert!(matches!(err, PatternError::InvalidPath { .. }));
    }

    #[test]
    fn test_duplicate_name_is_error() {
        let err = compile_string_dialect(r#"MATCH (p)->(p) WHERE p IS LEAF"#).unwrap_err();
        assert!(matches!(err, PatternError::InvalidPath { .. }));
    }

    #[test]
    fn test_conflicting_metric_types_is_error() {
        let err = compile_string_dialect(
            r#"MATCH (p) WHERE p."time" > 5 AND p."time" = "fast""#,
        )
        .unwrap_err();
        assert!(matches!(err, PatternError::InvalidFilter { .. }));
    }

    #[test]
    fn test_parse_failure_becomes_invalid_path() {
        let err = compile_string_dialect("MATCH (p WHERE p IS LEAF").unwrap_err();
        let PatternError::InvalidPath { message } = err else {
            panic!("expected InvalidPath");
        };
        assert!(message.contains("Parse error"));
    }

    #[test]
    fn test_integer_quantifier_expands() {
        let q = compile_string_dialect(r#"MATCH (2, p)->(q) WHERE p."time" > 0"#).unwrap();
        // 2 expands to two exactly-one positions sharing p's predicate
        assert_eq!(pattern(&q).len(), 3);
        assert_eq!(pattern(&q)[0].quantifier, Quantifier::One);
        assert_eq!(pattern(&q)[1].quantifier, Quantifier::One);
    }

    #[test]
    fn test_whole_query_groups() {
        let q = compile_string_dialect(
            r#"{MATCH (p) WHERE p."time" > 5} OR {MATCH (p) WHERE p."time" < 1}"#,
        )
        .unwrap();
        let Query::Compound(compound) = q else {
            panic!("expected compound");
        };
        assert_eq!(compound.op, SetOp::Or);
        assert_eq!(compound.subqueries.len(), 2);
        assert!(matches!(compound.subqueries[0], Query::Pattern(_)));
    }

    #[test]
    fn test_fragment_groups_share_the_match_clause() {
        let q = compile_string_dialect(
            r#"MATCH ("*", p)->(q) WHERE {p."time" > 5} AND {q."name" = "main"}"#,
        )
        .unwrap();
        let Query::Compound(compound) = q else {
            panic!("expected compound");
        };
        assert_eq!(compound.op, SetOp::And);
        // Each fragment becomes a full two-position pattern.
        assert_eq!(pattern(&compound.subqueries[0]).len(), 2);
        assert_eq!(pattern(&compound.subqueries[1]).len(), 2);
    }

    #[test]
    fn test_mixed_group_kinds_is_error() {
        let err = compile_string_dialect(
            r#"MATCH (p) WHERE {p."time" > 5} AND {MATCH (q) WHERE q IS LEAF}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PatternError::InvalidPath { .. }));
    }

    #[test]
    fn test_bad_group_connector_is_error() {
        let err = compile_string_dialect(
            r#"{MATCH (p) WHERE p IS LEAF} NAND {MATCH (q) WHERE q IS LEAF}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PatternError::InvalidPath { .. }));
    }

    #[test]
    fn test_unbalanced_braces_is_error() {
        assert!(compile_string_dialect(r#"{MATCH (p) WHERE p IS LEAF"#).is_err());
        assert!(compile_string_dialect(r#"MATCH (p) WHERE p IS LEAF}"#).is_err());
    }

    #[test]
    fn test_left_fold_over_three_groups() {
        let q = compile_string_dialect(
            r#"{MATCH (p) WHERE p."a" > 1} AND {MATCH (p) WHERE p."b" > 2} XOR {MATCH (p) WHERE p."c" > 3}"#,
        )
        .unwrap();
        // ((a AND b) XOR c)
        let Query::Compound(outer) = q else {
            panic!("expected compound");
        };
        assert_eq!(outer.op, SetOp::Xor);
        assert!(matches!(
            &outer.subqueries[0],
            Query::Compound(CompoundQuery { op: SetOp::And, .. })
        ));
    }
}
