//! Query algebra: single patterns combined with set operations.

use crate::error::{PatternError, PatternResult};
use crate::object::PathElement;
use crate::pattern::Pattern;

/// A query in any surface form.
///
/// `Object` and `Text` hold unparsed dialect input; the engine compiles
/// them lazily at evaluation time, so a malformed subquery only surfaces
/// when it is actually applied.
#[derive(Debug, Clone)]
pub enum Query {
    Pattern(Pattern),
    Compound(CompoundQuery),
    Object(Vec<PathElement>),
    Text(String),
}

impl From<Pattern> for Query {
    fn from(pattern: Pattern) -> Self {
        Query::Pattern(pattern)
    }
}

impl From<CompoundQuery> for Query {
    fn from(compound: CompoundQuery) -> Self {
        Query::Compound(compound)
    }
}

impl From<Vec<PathElement>> for Query {
    fn from(path: Vec<PathElement>) -> Self {
        Query::Object(path)
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Query::Text(text.to_string())
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Query::Text(text)
    }
}

/// Set operation combining subquery results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    /// Intersection.
    And,
    /// Union.
    Or,
    /// Symmetric difference.
    Xor,
    /// Complement against all graph nodes.
    Not,
}

/// A set operation applied to subquery results.
#[derive(Debug, Clone)]
pub struct CompoundQuery {
    pub op: SetOp,
    pub subqueries: Vec<Query>,
}

impl CompoundQuery {
    /// Intersection of two or more subqueries.
    pub fn and(subqueries: Vec<Query>) -> PatternResult<Self> {
        Self::multi(SetOp::And, subqueries)
    }

    /// Union of two or more subqueries.
    pub fn or(subqueries: Vec<Query>) -> PatternResult<Self> {
        Self::multi(SetOp::Or, subqueries)
    }

    /// Symmetric difference of two or more subqueries.
    pub fn xor(subqueries: Vec<Query>) -> PatternResult<Self> {
        Self::multi(SetOp::Xor, subqueries)
    }

    /// Complement of exactly one subquery.
    pub fn negate(subquery: impl Into<Query>) -> Self {
        Self {
            op: SetOp::Not,
            subqueries: vec![subquery.into()],
        }
    }

    fn multi(op: SetOp, subqueries: Vec<Query>) -> PatternResult<Self> {
        if subqueries.len() < 2 {
            return Err(PatternError::bad_arity(format!(
                "{:?} requires at least 2 subqueries, got {}",
                op,
                subqueries.len()
            )));
        }
        Ok(Self { op, subqueries })
    }

    fn pair(op: SetOp, lhs: Query, rhs: Query) -> Self {
        Self {
            op,
            subqueries: vec![lhs, rhs],
        }
    }
}

// Operator sugar. Operands are consumed; clone first to keep a query
// around for reuse.

impl std::ops::BitAnd for Query {
    type Output = Query;
    fn bitand(self, rhs: Query) -> Query {
        Query::Compound(CompoundQuery::pair(SetOp::And, self, rhs))
    }
}

impl std::ops::BitOr for Query {
    type Output = Query;
    fn bitor(self, rhs: Query) -> Query {
        Query::Compound(CompoundQuery::pair(SetOp::Or, self, rhs))
    }
}

impl std::ops::BitXor for Query {
    type Output = Query;
    fn bitxor(self, rhs: Query) -> Query {
        Query::Compound(CompoundQuery::pair(SetOp::Xor, self, rhs))
    }
}

impl std::ops::Not for Query {
    type Output = Query;
    fn not(self) -> Query {
        Query::Compound(CompoundQuery::negate(self))
    }
}

impl std::ops::BitAnd for Pattern {
    type Output = Query;
    fn bitand(self, rhs: Pattern) -> Query {
        Query::from(self) & Query::from(rhs)
    }
}

impl std::ops::BitOr for Pattern {
    type Output = Query;
    fn bitor(self, rhs: Pattern) -> Query {
        Query::from(self) | Query::from(rhs)
    }
}

impl std::ops::BitXor for Pattern {
    type Output = Query;
    fn bitxor(self, rhs: Pattern) -> Query {
        Query::from(self) ^ Query::from(rhs)
    }
}

impl std::ops::Not for Pattern {
    type Output = Query;
    fn not(self) -> Query {
        !Query::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::QuantSpec;
    use crate::predicate::Predicate;

    fn any_node() -> Pattern {
        Pattern::new().start(QuantSpec::One, Predicate::True)
    }

    #[test]
    fn test_multi_constructors_require_two_subqueries() {
        let err = CompoundQuery::and(vec![any_node().into()]).unwrap_err();
        assert!(matches!(err, PatternError::BadArity { .. }));
        assert!(CompoundQuery::or(vec![]).is_err());

        let ok = CompoundQuery::xor(vec![any_node().into(), any_node().into()]).unwrap();
        assert_eq!(ok.op, SetOp::Xor);
        assert_eq!(ok.subqueries.len(), 2);
    }

    #[test]
    fn test_operator_sugar_builds_compounds() {
        let q = any_node() & any_node();
        let Query::Compound(compound) = q else {
            panic!("expected compound");
        };
        assert_eq!(compound.op, SetOp::And);

        let q = !(any_node() | any_node());
        let Query::Compound(outer) = q else {
            panic!("expected compound");
        };
        assert_eq!(outer.op, SetOp::Not);
        assert_eq!(outer.subqueries.len(), 1);
        assert!(matches!(
            outer.subqueries[0],
            Query::Compound(CompoundQuery { op: SetOp::Or, .. })
        ));
    }

    #[test]
    fn test_raw_dialect_forms_embed_unparsed() {
        let q = Query::from(r#"MATCH (p) WHERE p."time" > 5"#) & any_node().into();
        let Query::Compound(compound) = q else {
            panic!("expected compound");
        };
        assert!(matches!(compound.subqueries[0], Query::Text(_)));
    }
}
