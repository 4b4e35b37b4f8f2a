//! AST for the textual query dialect.

/// Source location for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// A parsed `MATCH ... WHERE ...` query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAst {
    pub path: Vec<NodeRef>,
    pub conditions: Vec<Condition>,
}

/// One parenthesized node reference in the MATCH path.
///
/// Any of quantifier and binding name may be omitted:
/// `("*", p)`, `("*")`, `(p)`, `(2, q)` are all valid.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    pub quant: Option<QuantToken>,
    pub name: Option<String>,
    pub span: Span,
}

/// Surface quantifier token, validated later by the pattern compiler.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantToken {
    Int(i64),
    Str(String),
}

/// How a condition chains onto the previous one. The WHERE clause is a
/// flat left-to-right chain with no precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    First,
    And,
    Or,
}

/// One condition in the WHERE chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub connector: Connector,
    /// Prefix NOT on the whole condition.
    pub negated: bool,
    pub kind: ConditionKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionKind {
    StringCmp {
        name: String,
        metric: String,
        op: StringOpKind,
        value: String,
    },
    NumberCmp {
        name: String,
        metric: String,
        op: NumOpKind,
        value: f64,
    },
    /// `name."metric" IS [NOT] NONE`
    IsNone {
        name: String,
        metric: String,
        negated: bool,
    },
    /// `name."metric" IS [NOT] NAN`
    IsNan {
        name: String,
        metric: String,
        negated: bool,
    },
    /// `name."metric" IS [NOT] INF`
    IsInf {
        name: String,
        metric: String,
        negated: bool,
    },
    /// `name IS [NOT] LEAF`
    IsLeaf { name: String, negated: bool },
}

impl ConditionKind {
    /// The MATCH binding name this condition constrains.
    pub fn binding(&self) -> &str {
        match self {
            ConditionKind::StringCmp { name, .. } => name,
            ConditionKind::NumberCmp { name, .. } => name,
            ConditionKind::IsNone { name, .. } => name,
            ConditionKind::IsNan { name, .. } => name,
            ConditionKind::IsInf { name, .. } => name,
            ConditionKind::IsLeaf { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOpKind {
    Eq,
    StartsWith,
    EndsWith,
    Contains,
    /// `=~`, anchored full match.
    Matches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumOpKind {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
}
