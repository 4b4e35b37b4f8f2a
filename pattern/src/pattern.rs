//! Path patterns: ordered runs of (quantifier, predicate) elements.

use crate::error::{PatternError, PatternResult};
use crate::predicate::Predicate;

/// Normalized quantifier. Every surface form reduces to a run of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    /// Exactly one node at this position (`.`).
    One,
    /// Zero or more consecutive nodes (`*`).
    ZeroOrMore,
}

/// Surface quantifier as written in a query.
///
/// `OneOrMore` and `Exactly(n)` are sugar and expand into runs of the
/// normalized forms during pattern construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantSpec {
    One,
    ZeroOrMore,
    OneOrMore,
    Exactly(u32),
}

impl QuantSpec {
    /// Parse a string quantifier token (`"."`, `"*"`, `"+"`).
    pub fn parse_str(token: &str) -> PatternResult<Self> {
        match token {
            "." => Ok(Self::One),
            "*" => Ok(Self::ZeroOrMore),
            "+" => Ok(Self::OneOrMore),
            other => Err(PatternError::invalid_path(format!(
                "unknown quantifier '{}'",
                other
            ))),
        }
    }

    /// Parse an integer quantifier (a fixed repeat count).
    pub fn parse_int(count: i64) -> PatternResult<Self> {
        if count >= 1 {
            Ok(Self::Exactly(count as u32))
        } else {
            Err(PatternError::invalid_path(format!(
                "quantifier count must be at least 1, got {}",
                count
            )))
        }
    }

    /// Number of normalized elements this spec expands into.
    fn expansion_len(&self) -> usize {
        match self {
            Self::One | Self::ZeroOrMore => 1,
            Self::OneOrMore => 2,
            Self::Exactly(n) => *n as usize,
        }
    }
}

/// One position in a pattern.
#[derive(Debug, Clone)]
pub struct PatternElement {
    pub quantifier: Quantifier,
    pub predicate: Predicate,
}

/// An ordered downward path shape.
///
/// Matching requires at least one element; an empty pattern is rejected
/// at evaluation time.
#[derive(Debug, Clone, Default)]
pub struct Pattern {
    elements: Vec<PatternElement>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a pattern with a first run, discarding any prior elements.
    pub fn start(mut self, spec: QuantSpec, predicate: impl Into<Predicate>) -> Self {
        self.elements.clear();
        self.push_expanded(spec, predicate.into());
        self
    }

    /// Append a run to a non-empty pattern.
    pub fn relate(
        mut self,
        spec: QuantSpec,
        predicate: impl Into<Predicate>,
    ) -> PatternResult<Self> {
        if self.elements.is_empty() {
            return Err(PatternError::invalid_path(
                "cannot extend an empty pattern; call start first",
            ));
        }
        self.push_expanded(spec, predicate.into());
        Ok(self)
    }

    fn push_expanded(&mut self, spec: QuantSpec, predicate: Predicate) {
        self.elements.reserve(spec.expansion_len());
        match spec {
            QuantSpec::One => self.elements.push(PatternElement {
                quantifier: Quantifier::One,
                predicate,
            }),
            QuantSpec::ZeroOrMore => self.elements.push(PatternElement {
                quantifier: Quantifier::ZeroOrMore,
                predicate,
            }),
            // "+" is "." then "*" with the same predicate
            QuantSpec::OneOrMore => {
                self.elements.push(PatternElement {
                    quantifier: Quantifier::One,
                    predicate: predicate.clone(),
                });
                self.elements.push(PatternElement {
                    quantifier: Quantifier::ZeroOrMore,
                    predicate,
                });
            }
            QuantSpec::Exactly(n) => {
                for _ in 0..n {
                    self.elements.push(PatternElement {
                        quantifier: Quantifier::One,
                        predicate: predicate.clone(),
                    });
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PatternElement> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatternElement> {
        self.elements.iter()
    }
}

impl std::ops::Index<usize> for Pattern {
    type Output = PatternElement;

    fn index(&self, index: usize) -> &PatternElement {
        &self.elements[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quant_spec_parsing() {
        assert_eq!(QuantSpec::parse_str(".").unwrap(), QuantSpec::One);
        assert_eq!(QuantSpec::parse_str("*").unwrap(), QuantSpec::ZeroOrMore);
        assert_eq!(QuantSpec::parse_str("+").unwrap(), QuantSpec::OneOrMore);
        assert!(QuantSpec::parse_str("?").is_err());
        assert_eq!(QuantSpec::parse_int(3).unwrap(), QuantSpec::Exactly(3));
        assert!(QuantSpec::parse_int(0).is_err());
        assert!(QuantSpec::parse_int(-2).is_err());
    }

    #[test]
    fn test_one_or_more_expands_to_one_then_zero_or_more() {
        // GIVEN a pattern starting with "+"
        let pattern = Pattern::new().start(QuantSpec::OneOrMore, Predicate::True);

        // THEN it holds "." followed by "*"
        assert_eq!(pattern.len(), 2);
        assert_eq!(pattern[0].quantifier, Quantifier::One);
        assert_eq!(pattern[1].quantifier, Quantifier::ZeroOrMore);
    }

    #[test]
    fn test_exactly_expands_to_repeated_one() {
        let pattern = Pattern::new().start(QuantSpec::Exactly(3), Predicate::True);
        assert_eq!(pattern.len(), 3);
        assert!(pattern.iter().all(|e| e.quantifier == Quantifier::One));
    }

    #[test]
    fn test_relate_appends_and_start_resets() {
        let pattern = Pattern::new()
            .start(QuantSpec::One, Predicate::True)
            .relate(QuantSpec::ZeroOrMore, Predicate::True)
            .unwrap();
        assert_eq!(pattern.len(), 2);

        let restarted = pattern.start(QuantSpec::One, Predicate::True);
        assert_eq!(restarted.len(), 1);
    }

    #[test]
    fn test_relate_on_empty_pattern_is_error() {
        let err = Pattern::new()
            .relate(QuantSpec::One, Predicate::True)
            .unwrap_err();
        assert!(matches!(err, PatternError::InvalidPath { .. }));
    }
}
